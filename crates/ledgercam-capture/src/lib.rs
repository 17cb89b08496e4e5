// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ledgercam-capture — The interactive side of document capture.
//
// A `CaptureSession` owns the camera stream, a `CornerTracker` (the
// detect / lock / drag state machine), and a `DetectionLoop` that feeds the
// tracker on a fixed cadence once the vision engine is ready. Capturing maps
// the locked corners onto the full-resolution frame, rectifies, encodes, and
// hands the artifact to an explicit sink.

pub mod handoff;
pub mod mapping;
pub mod overlay;
pub mod readiness;
pub mod scheduler;
pub mod session;
pub mod tracker;

pub use handoff::{CaptureArtifact, CaptureMessage, CaptureSink, dispatch, recognise, upload_artifact};
pub use mapping::{DisplayMapping, DisplayRect};
pub use overlay::{OverlayStyle, render_overlay};
pub use readiness::{Readiness, ReadinessGate, ReadinessSignal, readiness};
pub use scheduler::DetectionLoop;
pub use session::CaptureSession;
pub use tracker::{CornerTracker, DetectionTicket, HitTest, TrackedQuad, TrackerState};
