// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan module — locating, straightening, and cleaning up a photographed document.

pub mod clahe;
pub mod contour;
pub mod detect;
pub mod enhance;
pub mod rectify;
pub mod trim;

pub use detect::{CornerDetector, QuadDetector};
pub use enhance::ScanEnhancer;
pub use rectify::{RectifiedImage, RectifyOutcome, Rectifier};
pub use trim::{TextRegion, trim_to_regions};
