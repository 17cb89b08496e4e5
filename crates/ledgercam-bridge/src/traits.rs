// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the capture collaborators.
//
// The capture pipeline only ever sees these traits. Camera access is the one
// collaborator whose failures are fatal to a session; OCR and upload failures
// are reported to the caller and never stop capturing.

use std::sync::Arc;

use image::RgbaImage;
use ledgercam_core::error::Result;
use ledgercam_core::types::{FacingMode, StorageKey};
use ledgercam_core::OcrExtraction;

/// Unified bridge that groups every collaborator a capture needs.
///
/// Platforms lacking a capability return
/// `LedgercamError::PlatformUnavailable` from the stub implementation.
pub trait PlatformBridge: CameraDevice + OcrService + UploadService {
    /// Human-readable platform name (e.g. "iOS 17", "Android 14").
    fn platform_name(&self) -> &str;
}

/// A camera that can be asked for a live stream.
pub trait CameraDevice: Send + Sync {
    /// Start streaming from the camera facing `facing`.
    ///
    /// Errors: `CameraPermissionDenied` when the user refused access,
    /// `CameraUnavailable` when no matching camera exists or it is busy.
    fn open_stream(&self, facing: FacingMode) -> Result<Arc<dyn VideoSource>>;
}

/// A live stream of frames.
pub trait VideoSource: Send + Sync {
    /// A copy of the picture currently on screen, at native resolution.
    ///
    /// Fails with `CameraLost` once the stream has stopped or the device
    /// went away.
    fn current_frame(&self) -> Result<RgbaImage>;

    /// Native frame size.
    fn dimensions(&self) -> (u32, u32);

    fn facing(&self) -> FacingMode;

    /// Stop streaming and release the device. Idempotent.
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Reads date, amount, and payee off a captured document.
pub trait OcrService: Send + Sync {
    fn extract(&self, image: &[u8], mime_type: &str) -> Result<OcrExtraction>;
}

/// Stores captured files under a storage key.
pub trait UploadService: Send + Sync {
    fn upload(&self, key: &StorageKey, bytes: &[u8], mime_type: &str) -> Result<()>;
}
