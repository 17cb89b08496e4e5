// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for builds where no native platform is wired in.
//
// Every trait method returns `PlatformUnavailable`.

use std::sync::Arc;

use ledgercam_core::error::{LedgercamError, Result};
use ledgercam_core::types::{FacingMode, StorageKey};
use ledgercam_core::OcrExtraction;

use crate::traits::*;

/// No-op bridge.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl CameraDevice for StubBridge {
    fn open_stream(&self, _facing: FacingMode) -> Result<Arc<dyn VideoSource>> {
        tracing::warn!("CameraDevice::open_stream called on stub bridge");
        Err(LedgercamError::PlatformUnavailable)
    }
}

impl OcrService for StubBridge {
    fn extract(&self, _image: &[u8], _mime_type: &str) -> Result<OcrExtraction> {
        tracing::warn!("OcrService::extract called on stub bridge");
        Err(LedgercamError::PlatformUnavailable)
    }
}

impl UploadService for StubBridge {
    fn upload(&self, _key: &StorageKey, _bytes: &[u8], _mime_type: &str) -> Result<()> {
        tracing::warn!("UploadService::upload called on stub bridge");
        Err(LedgercamError::PlatformUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_capability_is_unavailable() {
        let bridge = crate::platform_bridge();
        assert_eq!(bridge.platform_name(), "Desktop (stub)");
        assert!(matches!(
            bridge.open_stream(FacingMode::Environment),
            Err(LedgercamError::PlatformUnavailable)
        ));
        assert!(matches!(
            bridge.extract(b"", "image/jpeg"),
            Err(LedgercamError::PlatformUnavailable)
        ));
    }
}
