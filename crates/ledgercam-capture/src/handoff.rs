// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture hand-off — packaging the encoded capture and delivering it, with
// whatever OCR managed to read, to an explicitly chosen sink.

use chrono::NaiveDate;
use ledgercam_bridge::{OcrService, UploadService};
use ledgercam_core::error::{LedgercamError, Result};
use ledgercam_core::types::{CaptureTarget, StorageKey};
use ledgercam_core::OcrExtraction;
use ledgercam_document::CaptureFormat;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

/// Base name every capture is delivered under.
pub const CAPTURE_BASENAME: &str = "receipt";

/// The encoded result of one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    pub bytes: Vec<u8>,
    pub format: CaptureFormat,
    /// `receipt.jpg` (or `receipt.png`).
    pub filename: String,
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: String,
    pub width: u32,
    pub height: u32,
    /// False when the raw frame was encoded without rectification.
    pub rectified: bool,
}

impl CaptureArtifact {
    pub fn new(bytes: Vec<u8>, format: CaptureFormat, width: u32, height: u32, rectified: bool) -> Self {
        let sha256 = hash_bytes(&bytes);
        Self {
            filename: format!("{}.{}", CAPTURE_BASENAME, format.extension()),
            bytes,
            format,
            sha256,
            width,
            height,
            rectified,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Whether `bytes` still match the recorded fingerprint.
    pub fn verify(&self) -> bool {
        hash_bytes(&self.bytes) == self.sha256
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// What a sink receives: the artifact, where it belongs, and the OCR result.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureMessage {
    pub artifact: CaptureArtifact,
    pub target: CaptureTarget,
    pub extraction: OcrExtraction,
}

/// Receiver of finished captures (a form, an upload queue, a channel).
pub trait CaptureSink: Send + Sync {
    fn deliver(&self, message: CaptureMessage) -> Result<()>;
}

impl CaptureSink for mpsc::UnboundedSender<CaptureMessage> {
    fn deliver(&self, message: CaptureMessage) -> Result<()> {
        self.send(message)
            .map_err(|_| LedgercamError::HandoffError("capture receiver has gone away".into()))
    }
}

/// Run OCR on `artifact`. Any failure yields an empty extraction.
#[instrument(skip_all, fields(bytes = artifact.bytes.len()))]
pub fn recognise(ocr: &dyn OcrService, artifact: &CaptureArtifact) -> OcrExtraction {
    match ocr.extract(&artifact.bytes, artifact.mime_type()) {
        Ok(extraction) => extraction,
        Err(err) => {
            warn!(error = %err, "OCR failed; continuing with empty fields");
            OcrExtraction::empty()
        }
    }
}

/// OCR the artifact and deliver it to `sink` tagged with `target`.
///
/// Only the delivery itself can fail.
#[instrument(skip(artifact, ocr, sink), fields(sha256 = %artifact.sha256))]
pub fn dispatch(
    artifact: CaptureArtifact,
    target: CaptureTarget,
    ocr: &dyn OcrService,
    sink: &dyn CaptureSink,
) -> Result<()> {
    let extraction = recognise(ocr, &artifact);
    info!(
        ?target,
        date = ?extraction.date,
        amount = ?extraction.amount,
        "Delivering capture"
    );
    sink.deliver(CaptureMessage {
        artifact,
        target,
        extraction,
    })
}

/// Store the artifact under a fresh storage key for `target` and `date`.
#[instrument(skip(uploader, artifact), fields(bytes = artifact.bytes.len()))]
pub fn upload_artifact(
    uploader: &dyn UploadService,
    artifact: &CaptureArtifact,
    target: CaptureTarget,
    date: NaiveDate,
    user_id: u64,
) -> Result<StorageKey> {
    let key = StorageKey::generate(target, date, user_id, &artifact.filename);
    uploader.upload(&key, &artifact.bytes, artifact.mime_type())?;
    info!(key = %key, "Capture uploaded");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgercam_bridge::stub::StubBridge;
    use ledgercam_bridge::{CannedOcr, DirectoryUpload};

    fn artifact() -> CaptureArtifact {
        CaptureArtifact::new(b"jpeg bytes".to_vec(), CaptureFormat::Jpeg, 10, 20, true)
    }

    #[test]
    fn artifact_is_named_and_fingerprinted() {
        let artifact = artifact();
        assert_eq!(artifact.filename, "receipt.jpg");
        assert_eq!(artifact.mime_type(), "image/jpeg");
        assert_eq!(artifact.sha256.len(), 64);
        assert!(artifact.verify());

        let mut tampered = artifact.clone();
        tampered.bytes.push(0);
        assert!(!tampered.verify());
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn ocr_failure_still_delivers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatch(artifact(), CaptureTarget::Invoice, &StubBridge, &tx).expect("dispatch");
        let message = rx.try_recv().expect("message");
        assert_eq!(message.target, CaptureTarget::Invoice);
        assert!(message.extraction.is_empty());
        assert_eq!(message.artifact, artifact());
    }

    #[test]
    fn ocr_fields_travel_with_the_artifact() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ocr = CannedOcr::new(r#"{"date": "2025-11-14", "amount": 3400, "payee": "Garage"}"#);
        dispatch(artifact(), CaptureTarget::Receipt, &ocr, &tx).expect("dispatch");
        let message = rx.try_recv().expect("message");
        assert_eq!(message.extraction.amount, Some(3400));
    }

    #[test]
    fn closed_sink_is_a_handoff_error() {
        let (tx, rx) = mpsc::unbounded_channel::<CaptureMessage>();
        drop(rx);
        let err = dispatch(artifact(), CaptureTarget::Receipt, &StubBridge, &tx).unwrap_err();
        assert!(matches!(err, LedgercamError::HandoffError(_)));
    }

    #[test]
    fn upload_uses_storage_key_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectoryUpload::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2025, 11, 14).expect("valid date");
        let key = upload_artifact(&store, &artifact(), CaptureTarget::Payment, date, 5).expect("upload");
        assert!(key.as_str().starts_with("payments/2025/11/14/user_5_"));
        assert!(key.as_str().ends_with(".jpg"));
        assert_eq!(std::fs::read(store.path_for(&key)).expect("read"), b"jpeg bytes");
    }
}
