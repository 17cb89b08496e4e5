// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop collaborators: an OCR service that replays a recorded response,
// and an upload service that writes into a local directory.

use std::path::{Path, PathBuf};

use ledgercam_core::error::{LedgercamError, Result};
use ledgercam_core::types::StorageKey;
use ledgercam_core::OcrExtraction;
use tracing::{debug, info, instrument};

use crate::traits::{OcrService, UploadService};

/// Answers every OCR request with the same recorded collaborator response.
#[derive(Debug, Clone)]
pub struct CannedOcr {
    response: String,
}

impl CannedOcr {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }
}

impl OcrService for CannedOcr {
    fn extract(&self, image: &[u8], mime_type: &str) -> Result<OcrExtraction> {
        if self.response.trim().is_empty() {
            return Err(LedgercamError::OcrError("recorded response is empty".into()));
        }
        debug!(bytes = image.len(), mime_type, "Replaying recorded OCR response");
        Ok(OcrExtraction::parse_response(&self.response))
    }
}

/// Upload store rooted at a local directory; the key becomes the relative path.
#[derive(Debug, Clone)]
pub struct DirectoryUpload {
    root: PathBuf,
}

impl DirectoryUpload {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where `key` lands on disk.
    pub fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

impl UploadService for DirectoryUpload {
    #[instrument(skip_all, fields(key = %key, bytes = bytes.len()))]
    fn upload(&self, key: &StorageKey, bytes: &[u8], mime_type: &str) -> Result<()> {
        let path = self.path_for(key);
        let fail = |err: std::io::Error| {
            LedgercamError::UploadError(format!("failed to write {}: {}", path.display(), err))
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(fail)?;
        }
        std::fs::write(&path, bytes).map_err(fail)?;
        info!(path = %path.display(), mime_type, "Capture stored");
        Ok(())
    }
}
