// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — frame sampling from a live source and capture encoding.

pub mod encode;
pub mod frame;

pub use encode::{CaptureFormat, encode};
pub use frame::{Frame, SampledFrame};
