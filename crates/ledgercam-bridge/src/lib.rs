// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ledgercam-bridge — The collaborators a capture session talks to.
//
// Defines the camera, OCR, and upload traits, a stub bridge for builds with
// no native platform, and desktop implementations: a still-image camera, a
// canned OCR responder, and a directory-backed upload store.

pub mod desktop;
pub mod still;
pub mod stub;
pub mod traits;

pub use desktop::{CannedOcr, DirectoryUpload};
pub use still::{StillImageCamera, StillImageSource};
pub use traits::{CameraDevice, OcrService, PlatformBridge, UploadService, VideoSource};

/// The bridge for the current build target.
///
/// Native camera integrations are supplied by the embedding application;
/// on their own, all targets get the stub.
pub fn platform_bridge() -> Box<dyn traits::PlatformBridge> {
    Box::new(stub::StubBridge)
}
