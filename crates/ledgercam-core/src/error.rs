// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Ledgercam.

use thiserror::Error;

use crate::types::ErrorClass;

/// Top-level error type for all Ledgercam operations.
#[derive(Debug, Error)]
pub enum LedgercamError {
    // -- Camera acquisition --
    #[error("camera permission denied")]
    CameraPermissionDenied,

    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("camera stream lost: {0}")]
    CameraLost(String),

    #[error("vision engine not ready after {waited_ms} ms")]
    EngineTimeout { waited_ms: u64 },

    // -- Image pipeline --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("image encoding failed: {0}")]
    EncodeError(String),

    // -- Collaborators --
    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("upload failed: {0}")]
    UploadError(String),

    #[error("capture hand-off failed: {0}")]
    HandoffError(String),

    // -- Session --
    #[error("capture session is closed")]
    SessionClosed,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl LedgercamError {
    /// Whether this error ends the capture session.
    ///
    /// Only losing the camera is fatal. Everything the vision stages produce is
    /// converted to a no-op result before it reaches the session.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CameraPermissionDenied
            | Self::CameraUnavailable(_)
            | Self::CameraLost(_)
            | Self::SessionClosed => ErrorClass::Fatal,
            _ => ErrorClass::Recoverable,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LedgercamError>;
