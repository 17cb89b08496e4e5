// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Ledgercam capture.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which way the camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FacingMode {
    /// Front camera, towards the user.
    User,
    /// Rear camera, towards the document. The default for capture.
    #[default]
    Environment,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::User => Self::Environment,
            Self::Environment => Self::User,
        }
    }
}

/// The kind of record a captured image is attached to.
///
/// Selected explicitly by whoever dispatches the capture; it determines the
/// storage category of the uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureTarget {
    Receipt,
    Invoice,
    Payment,
    PaymentDetail,
    ClPayment,
}

impl CaptureTarget {
    /// Top-level storage key segment.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Receipt => "receipts",
            Self::Invoice => "invoices",
            Self::Payment => "payments",
            Self::PaymentDetail => "payment_details",
            Self::ClPayment => "cl_payments",
        }
    }
}

impl std::str::FromStr for CaptureTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "receipt" | "receipts" => Ok(Self::Receipt),
            "invoice" | "invoices" => Ok(Self::Invoice),
            "payment" | "payments" => Ok(Self::Payment),
            "payment_detail" | "payment_details" => Ok(Self::PaymentDetail),
            "cl_payment" | "cl_payments" => Ok(Self::ClPayment),
            other => Err(format!("unknown capture target: {other}")),
        }
    }
}

/// Whether an error ends the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// The session cannot continue (camera gone).
    Fatal,
    /// Converted to a no-op; the session carries on.
    Recoverable,
}

/// Alphabet for random key tokens (base58: no 0, O, I, l).
const TOKEN_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const TOKEN_LEN: usize = 24;

/// Deterministic storage key for an uploaded capture:
/// `{category}/{yyyy}/{mm}/{dd}/user_{id}_{token}{ext}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKey(String);

impl StorageKey {
    /// Build a key with a fresh random token. `filename` only contributes its
    /// extension (`receipt.jpg` -> `.jpg`).
    pub fn generate(target: CaptureTarget, date: NaiveDate, user_id: u64, filename: &str) -> Self {
        Self::with_token(target, date, user_id, filename, &random_token())
    }

    /// Build a key with a caller-chosen token.
    pub fn with_token(
        target: CaptureTarget,
        date: NaiveDate,
        user_id: u64,
        filename: &str,
        token: &str,
    ) -> Self {
        let ext = extension_of(filename);
        Self(format!(
            "{}/{}/{:02}/{:02}/user_{}_{}{}",
            target.category(),
            date.year(),
            date.month(),
            date.day(),
            user_id,
            token,
            ext
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extension including the leading dot, or empty when there is none.
fn extension_of(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < filename.len() => &filename[idx..],
        _ => "",
    }
}

/// 24 base58 characters drawn from two v4 UUIDs.
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes
        .iter()
        .take(TOKEN_LEN)
        .map(|b| TOKEN_ALPHABET[*b as usize % TOKEN_ALPHABET.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date");
        let key = StorageKey::with_token(CaptureTarget::Receipt, date, 42, "receipt.jpg", "abc");
        assert_eq!(key.as_str(), "receipts/2025/03/07/user_42_abc.jpg");
    }

    #[test]
    fn generated_token_has_expected_shape() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 14).expect("valid date");
        let key = StorageKey::generate(CaptureTarget::PaymentDetail, date, 3, "payment.pdf");
        let prefix = "payment_details/2025/11/14/user_3_";
        assert!(key.as_str().starts_with(prefix));
        assert!(key.as_str().ends_with(".pdf"));
        let token = &key.as_str()[prefix.len()..key.as_str().len() - 4];
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
    }

    #[test]
    fn missing_extension_is_empty() {
        assert_eq!(extension_of("receipt"), "");
        assert_eq!(extension_of(".hidden"), "");
        assert_eq!(extension_of("scan.jpeg"), ".jpeg");
    }

    #[test]
    fn facing_toggles() {
        assert_eq!(FacingMode::default(), FacingMode::Environment);
        assert_eq!(FacingMode::Environment.toggled(), FacingMode::User);
        assert_eq!(FacingMode::User.toggled(), FacingMode::Environment);
    }

    #[test]
    fn target_parses_singular_and_plural() {
        assert_eq!("invoice".parse::<CaptureTarget>(), Ok(CaptureTarget::Invoice));
        assert_eq!("Receipts".parse::<CaptureTarget>(), Ok(CaptureTarget::Receipt));
        assert!("ledger".parse::<CaptureTarget>().is_err());
    }
}
