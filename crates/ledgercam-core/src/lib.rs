// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ledgercam — Core types, configuration, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod extraction;
pub mod geometry;
pub mod human_errors;
pub mod types;

pub use config::{CaptureConfig, DetectorParams, EnhanceParams};
pub use error::LedgercamError;
pub use extraction::OcrExtraction;
pub use geometry::{Corner, Quadrilateral};
pub use types::*;
