// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ledgercam-document — The document capture vision pipeline.
//
// Provides frame sampling and capture encoding (image), and the scanning
// pipeline proper (scan): corner detection, perspective rectification, OCR
// legibility enhancement, and text-region trimming.

pub mod image;
pub mod scan;

// Re-export the primary types so callers can use `ledgercam_document::CornerDetector` etc.
pub use self::image::encode::{CaptureFormat, EncodedImage, QUALITY_LADDER, encode, encode_within_budget};
pub use self::image::frame::{Frame, SampledFrame, Sampling};
pub use scan::detect::{CornerDetector, QuadDetector};
pub use scan::enhance::ScanEnhancer;
pub use scan::rectify::{RectifiedImage, RectifyOutcome, Rectifier};
