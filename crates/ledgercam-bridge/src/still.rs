// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A camera that "streams" one still image. Used on the desktop, where a
// photo on disk stands in for the live preview.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use ledgercam_core::error::{LedgercamError, Result};
use ledgercam_core::types::FacingMode;
use tracing::{debug, info, instrument};

use crate::traits::{CameraDevice, VideoSource};

/// Camera backed by a single decoded image.
#[derive(Debug, Clone)]
pub struct StillImageCamera {
    image: Arc<RgbaImage>,
}

impl StillImageCamera {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Decode an image file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let image = image::open(path.as_ref()).map_err(|err| {
            LedgercamError::CameraUnavailable(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = image.width(), height = image.height(), "Still image loaded");
        Ok(Self::new(image.to_rgba8()))
    }
}

impl CameraDevice for StillImageCamera {
    fn open_stream(&self, facing: FacingMode) -> Result<Arc<dyn VideoSource>> {
        debug!(?facing, "Opening still-image stream");
        Ok(Arc::new(StillImageSource {
            image: Arc::clone(&self.image),
            facing,
            live: AtomicBool::new(true),
        }))
    }
}

/// The stream handed out by [`StillImageCamera`].
#[derive(Debug)]
pub struct StillImageSource {
    image: Arc<RgbaImage>,
    facing: FacingMode,
    live: AtomicBool,
}

impl VideoSource for StillImageSource {
    fn current_frame(&self) -> Result<RgbaImage> {
        if !self.is_live() {
            return Err(LedgercamError::CameraLost("stream stopped".into()));
        }
        Ok(self.image.as_ref().clone())
    }

    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn facing(&self) -> FacingMode {
        self.facing
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            debug!("Still-image stream stopped");
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}
