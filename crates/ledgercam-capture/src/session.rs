// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture session — one open camera, its tracker, and its detection loop.
//
// Lifecycle: `open` acquires the camera (failures here are fatal and
// returned), pointer events and resets edit the tracked corners, `capture`
// rectifies and encodes the current frame, and `close` tears everything
// down. Switching the camera facing is a close-and-reopen of the stream
// that keeps the session itself alive.

use std::sync::{Arc, Mutex};

use image::RgbaImage;
use ledgercam_bridge::{CameraDevice, VideoSource};
use ledgercam_core::error::{LedgercamError, Result};
use ledgercam_core::types::FacingMode;
use ledgercam_core::{CaptureConfig, Quadrilateral};
use ledgercam_document::{
    CaptureFormat, EncodedImage, QUALITY_LADDER, QuadDetector, Rectifier, encode,
    encode_within_budget,
};
use tracing::{error, info, instrument, warn};

use crate::handoff::CaptureArtifact;
use crate::mapping::DisplayMapping;
use crate::overlay::{OverlayStyle, render_overlay};
use crate::readiness::ReadinessGate;
use crate::scheduler::{DetectionLoop, lock_tracker, run_detection_tick};
use crate::tracker::{CornerTracker, HitTest, TrackerState};

/// An interactive capture session.
pub struct CaptureSession {
    camera: Arc<dyn CameraDevice>,
    source: Arc<dyn VideoSource>,
    detector: Arc<dyn QuadDetector>,
    tracker: Arc<Mutex<CornerTracker>>,
    rectifier: Rectifier,
    config: CaptureConfig,
    /// `None` for sessions that only detect on demand.
    gate: Option<ReadinessGate>,
    detection: Option<DetectionLoop>,
    closed: bool,
}

impl CaptureSession {
    /// Open the rear camera and start automatic detection once `gate`
    /// reports the vision engine ready.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(
        camera: Arc<dyn CameraDevice>,
        config: CaptureConfig,
        detector: Arc<dyn QuadDetector>,
        gate: ReadinessGate,
    ) -> Result<Self> {
        Self::open_with(camera, FacingMode::default(), config, detector, Some(gate))
    }

    /// Open the camera without a background loop; detection runs only when
    /// [`detect_now`](Self::detect_now) is called.
    pub fn open_manual(
        camera: Arc<dyn CameraDevice>,
        config: CaptureConfig,
        detector: Arc<dyn QuadDetector>,
    ) -> Result<Self> {
        Self::open_with(camera, FacingMode::default(), config, detector, None)
    }

    #[instrument(skip(camera, config, detector, gate), fields(automatic = gate.is_some()))]
    fn open_with(
        camera: Arc<dyn CameraDevice>,
        facing: FacingMode,
        config: CaptureConfig,
        detector: Arc<dyn QuadDetector>,
        gate: Option<ReadinessGate>,
    ) -> Result<Self> {
        config.validate()?;
        let source = camera.open_stream(facing).map_err(|err| {
            error!(error = %err, ?facing, "Camera acquisition failed");
            err
        })?;
        let (width, height) = source.dimensions();
        info!(width, height, ?facing, "Capture session opened");

        let tracker = Arc::new(Mutex::new(CornerTracker::new(HitTest::from_config(&config))));
        let rectifier = Rectifier::new(config.min_output_dimension, config.enhance.clone());

        let mut session = Self {
            camera,
            source,
            detector,
            tracker,
            rectifier,
            config,
            gate,
            detection: None,
            closed: false,
        };
        session.start_detection();
        Ok(session)
    }

    fn start_detection(&mut self) {
        if let Some(gate) = &self.gate {
            self.detection = Some(DetectionLoop::spawn(
                Arc::clone(&self.tracker),
                Arc::clone(&self.source),
                Arc::clone(&self.detector),
                gate.clone(),
                &self.config,
            ));
        }
    }

    async fn stop_detection(&mut self) {
        if let Some(mut detection) = self.detection.take() {
            detection.stop().await;
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(LedgercamError::SessionClosed)
        } else {
            Ok(())
        }
    }

    // -- Queries --------------------------------------------------------------

    pub fn state(&self) -> TrackerState {
        lock_tracker(&self.tracker).state()
    }

    /// Current corners in native frame pixels.
    pub fn quadrilateral(&self) -> Option<Quadrilateral> {
        lock_tracker(&self.tracker).quadrilateral()
    }

    pub fn facing(&self) -> FacingMode {
        self.source.facing()
    }

    /// Native size of the current stream.
    pub fn frame_size(&self) -> (u32, u32) {
        self.source.dimensions()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mapping for a preview letterboxed into a viewport of the given size.
    pub fn display_mapping(&self, viewport_width: f32, viewport_height: f32) -> DisplayMapping {
        let (width, height) = self.frame_size();
        DisplayMapping::contain(viewport_width, viewport_height, width, height)
    }

    // -- Pointer input --------------------------------------------------------

    /// Pointer pressed at display coordinates `(x, y)`. Returns the corner
    /// picked up, if any.
    pub fn pointer_down(&self, mapping: &DisplayMapping, x: f32, y: f32) -> Option<usize> {
        lock_tracker(&self.tracker).pointer_down(mapping.to_frame(x, y))
    }

    pub fn pointer_move(&self, mapping: &DisplayMapping, x: f32, y: f32) -> bool {
        lock_tracker(&self.tracker).pointer_move(mapping.to_frame(x, y))
    }

    pub fn pointer_up(&self) {
        lock_tracker(&self.tracker).pointer_up();
    }

    pub fn pointer_cancel(&self) {
        lock_tracker(&self.tracker).pointer_cancel();
    }

    /// Drop the corners and resume automatic detection.
    pub fn reset(&self) {
        lock_tracker(&self.tracker).reset();
    }

    // -- Detection ------------------------------------------------------------

    /// Run one detection cycle right away. Returns true when corners locked.
    pub async fn detect_now(&self) -> Result<bool> {
        self.ensure_open()?;
        run_detection_tick(
            &self.tracker,
            &self.source,
            &self.detector,
            self.config.max_processing_dimension,
        )
        .await
    }

    /// The current frame with the tracked corners drawn on it.
    pub fn overlay(&self, style: &OverlayStyle) -> Result<RgbaImage> {
        self.ensure_open()?;
        let frame = self.source.current_frame()?;
        let tracker = lock_tracker(&self.tracker);
        Ok(render_overlay(
            &frame,
            tracker.quadrilateral().as_ref(),
            tracker.selected_corner(),
            style,
        ))
    }

    // -- Camera ---------------------------------------------------------------

    /// Flip between the front and rear camera. The tracker goes back to Idle.
    ///
    /// A failure to reopen is fatal: the session is closed and the error
    /// returned.
    pub async fn switch_facing(&mut self) -> Result<FacingMode> {
        self.ensure_open()?;
        let facing = self.source.facing().toggled();

        self.stop_detection().await;
        lock_tracker(&self.tracker).reset();
        self.source.stop();

        match self.camera.open_stream(facing) {
            Ok(source) => {
                self.source = source;
                self.start_detection();
                info!(?facing, "Camera facing switched");
                Ok(facing)
            }
            Err(err) => {
                error!(error = %err, ?facing, "Could not reopen camera");
                lock_tracker(&self.tracker).teardown();
                self.closed = true;
                Err(err)
            }
        }
    }

    // -- Capture --------------------------------------------------------------

    /// Rectify and encode the current frame.
    ///
    /// Uses the tracked corners when there are any and the raw frame
    /// otherwise. Only the camera can make this fail.
    #[instrument(skip(self))]
    pub fn capture(&self) -> Result<CaptureArtifact> {
        self.ensure_open()?;
        let frame = self.source.current_frame()?;

        let quad = {
            let tracker = lock_tracker(&self.tracker);
            match tracker.tracked() {
                Some(tracked) if (tracked.frame_width, tracked.frame_height) == frame.dimensions() => {
                    Some(tracked.quad)
                }
                Some(_) => {
                    warn!("Tracked corners belong to a different frame size; capturing raw frame");
                    None
                }
                None => None,
            }
        };

        let rectified = self.rectifier.rectify(&frame, quad.as_ref());
        let (image, rectified_ok, encoded) = if rectified.outcome.is_warped() {
            match self.encode_capture(&rectified.image) {
                Ok(encoded) => (rectified.image, true, encoded),
                Err(err) => {
                    warn!(error = %err, "Rectified image could not be encoded; capturing raw frame");
                    let encoded = self.encode_capture(&frame)?;
                    (frame, false, encoded)
                }
            }
        } else {
            let encoded = self.encode_capture(&rectified.image)?;
            (rectified.image, false, encoded)
        };
        let (width, height) = image.dimensions();

        if !encoded.within_budget {
            warn!(
                bytes = encoded.bytes.len(),
                quality = encoded.quality,
                "Capture is over the upload budget even at the lowest quality"
            );
        }
        info!(
            width,
            height,
            quality = encoded.quality,
            bytes = encoded.bytes.len(),
            rectified = rectified_ok,
            "Capture encoded"
        );
        Ok(CaptureArtifact::new(
            encoded.bytes,
            encoded.format,
            width,
            height,
            rectified_ok,
        ))
    }

    /// JPEG at the configured quality, or walked down the quality ladder
    /// when an upload budget is set.
    fn encode_capture(&self, image: &RgbaImage) -> Result<EncodedImage> {
        match self.config.max_upload_bytes {
            Some(max_bytes) => encode_within_budget(image, max_bytes, &self.quality_ladder()),
            None => {
                let quality = self.config.jpeg_quality;
                Ok(EncodedImage {
                    bytes: encode(image, CaptureFormat::Jpeg, quality)?,
                    format: CaptureFormat::Jpeg,
                    quality,
                    within_budget: true,
                })
            }
        }
    }

    /// The configured quality first, then the lower rungs of the ladder.
    fn quality_ladder(&self) -> Vec<u8> {
        let top = self.config.jpeg_quality;
        std::iter::once(top)
            .chain(QUALITY_LADDER.iter().copied().filter(|q| *q < top))
            .collect()
    }

    // -- Teardown -------------------------------------------------------------

    /// End the session: no detection runs afterwards and the camera is
    /// released. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        lock_tracker(&self.tracker).teardown();
        self.stop_detection().await;
        self.source.stop();
        self.closed = true;
        info!("Capture session closed");
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if !self.closed {
            lock_tracker(&self.tracker).teardown();
            self.source.stop();
        }
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("facing", &self.source.facing())
            .field("state", &self.state())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
