// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — resolves configuration and wires the collaborators that
// a command needs.
//
// OCR and upload sit behind the bridge traits. On the desktop, OCR is either
// a canned collaborator response read from disk or the stub (which always
// fails, yielding empty fields), and uploads go to a local directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ledgercam_bridge::stub::StubBridge;
use ledgercam_bridge::{CannedOcr, DirectoryUpload, OcrService, UploadService};
use ledgercam_core::error::Result;
use ledgercam_core::CaptureConfig;
use ledgercam_document::CornerDetector;
use tracing::{debug, info};

use super::data_dir;

/// Collaborators for one command invocation. Cheap to clone.
#[derive(Clone)]
pub struct AppServices {
    config: CaptureConfig,
    detector: Arc<CornerDetector>,
    ocr: Arc<dyn OcrService>,
    uploader: Arc<DirectoryUpload>,
    upload_root: PathBuf,
}

impl AppServices {
    /// Build services from the command-line overrides.
    ///
    /// `config_path` wins over the default config file, which wins over the
    /// built-in defaults. `upload_root` defaults to the data directory.
    pub fn init(
        config_path: Option<&Path>,
        ocr_response: Option<&Path>,
        upload_root: Option<PathBuf>,
    ) -> Result<Self> {
        let config = load_config(config_path)?;

        let ocr: Arc<dyn OcrService> = match ocr_response {
            Some(path) => Arc::new(CannedOcr::from_file(path)?),
            None => Arc::new(StubBridge),
        };

        let upload_root = upload_root.unwrap_or_else(|| data_dir::data_subdir("uploads"));
        info!(uploads = %upload_root.display(), "App services initialised");

        Ok(Self {
            detector: Arc::new(CornerDetector::new(config.detector.clone())),
            config,
            ocr,
            uploader: Arc::new(DirectoryUpload::new(upload_root.clone())),
            upload_root,
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn detector(&self) -> Arc<CornerDetector> {
        Arc::clone(&self.detector)
    }

    pub fn ocr(&self) -> &dyn OcrService {
        self.ocr.as_ref()
    }

    pub fn uploader(&self) -> &dyn UploadService {
        self.uploader.as_ref()
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }
}

/// Explicit path, else the default file if present, else defaults.
fn load_config(explicit: Option<&Path>) -> Result<CaptureConfig> {
    if let Some(path) = explicit {
        return CaptureConfig::load(path);
    }
    let default_path = data_dir::config_path();
    if default_path.exists() {
        debug!(path = %default_path.display(), "Loading default config");
        return CaptureConfig::load(&default_path);
    }
    Ok(CaptureConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_is_loaded_and_validated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"jpeg_quality": 90}"#).expect("write");

        let services = AppServices::init(Some(&path), None, Some(dir.path().to_path_buf())).expect("init");
        assert_eq!(services.config().jpeg_quality, 90);
        assert_eq!(services.upload_root(), dir.path());

        std::fs::write(&path, r#"{"jpeg_quality": 0}"#).expect("write");
        assert!(AppServices::init(Some(&path), None, Some(dir.path().to_path_buf())).is_err());
    }
}
