// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner tracker — the detect / lock / drag state machine behind the preview.
//
// States:
//
//   Idle ──begin_detection──▶ Detecting ──found──▶ Locked ──pointer_down──▶ Dragging
//     ▲                           │                  ▲  │                       │
//     │                           └──nothing found───┘  │◀──pointer_up/cancel───┘
//     └──────────────────────── reset / teardown ───────┘
//
// A successful detection pauses automatic detection, so the corners stay put
// until the user resets. Every detection carries a ticket stamped with the
// tracker's epoch; pointer input and resets bump the epoch, and a result
// arriving with an old ticket is thrown away.

use ledgercam_core::{CaptureConfig, Corner, Quadrilateral};
use serde::Serialize;
use tracing::{debug, info};

/// Externally visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackerState {
    /// No corners; detection may run.
    Idle,
    /// A detection is in flight.
    Detecting,
    /// Corners are shown and detection is paused.
    Locked,
    /// The user is dragging corner `corner`.
    Dragging { corner: usize },
}

/// A quadrilateral in native frame pixels, with the frame it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedQuad {
    pub quad: Quadrilateral,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// Proof that a detection was started, used to accept or discard its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionTicket {
    epoch: u64,
}

/// Pointer hit-test tuning, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTest {
    pub touch_radius: f32,
    /// Radius multiplier for corners close to the frame border.
    pub edge_zone_multiplier: f32,
    /// Border zone width as a fraction of the shorter frame side.
    pub edge_zone_fraction: f32,
}

impl HitTest {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            touch_radius: config.touch_radius,
            edge_zone_multiplier: config.edge_zone_multiplier,
            edge_zone_fraction: config.edge_zone_fraction,
        }
    }

    /// Effective radius for a corner at `corner` in a `width` x `height` frame.
    pub fn radius_at(&self, corner: Corner, width: u32, height: u32) -> f32 {
        let zone = self.edge_zone_fraction * width.min(height) as f32;
        let (w, h) = (width as f32, height as f32);
        let border_distance = corner.x.min(corner.y).min(w - corner.x).min(h - corner.y);
        if border_distance < zone {
            self.touch_radius * self.edge_zone_multiplier
        } else {
            self.touch_radius
        }
    }

    /// Index of the nearest corner within reach of `point`, if any.
    pub fn pick(&self, tracked: &TrackedQuad, point: Corner) -> Option<usize> {
        tracked
            .quad
            .corners()
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let d = c.distance(&point);
                let reach = self.radius_at(*c, tracked.frame_width, tracked.frame_height) as f64;
                (d <= reach).then_some((i, d))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

impl Default for HitTest {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

/// The tracker itself. Holds no frames, only geometry and flags.
#[derive(Debug, Clone)]
pub struct CornerTracker {
    hit: HitTest,
    tracked: Option<TrackedQuad>,
    selected: Option<usize>,
    paused: bool,
    in_flight: bool,
    closed: bool,
    epoch: u64,
}

impl CornerTracker {
    pub fn new(hit: HitTest) -> Self {
        Self {
            hit,
            tracked: None,
            selected: None,
            paused: false,
            in_flight: false,
            closed: false,
            epoch: 0,
        }
    }

    pub fn state(&self) -> TrackerState {
        match (self.selected, &self.tracked, self.in_flight) {
            (Some(corner), Some(_), _) => TrackerState::Dragging { corner },
            (_, Some(_), _) => TrackerState::Locked,
            (_, None, true) => TrackerState::Detecting,
            (_, None, false) => TrackerState::Idle,
        }
    }

    pub fn tracked(&self) -> Option<&TrackedQuad> {
        self.tracked.as_ref()
    }

    pub fn quadrilateral(&self) -> Option<Quadrilateral> {
        self.tracked.map(|t| t.quad)
    }

    pub fn selected_corner(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether a detection tick should run now.
    pub fn wants_detection(&self) -> bool {
        !self.closed && !self.paused && !self.in_flight && self.tracked.is_none()
    }

    // -- Detection ------------------------------------------------------------

    /// Claim the next detection. `None` when paused, busy, locked, or closed.
    pub fn begin_detection(&mut self) -> Option<DetectionTicket> {
        if !self.wants_detection() {
            return None;
        }
        self.in_flight = true;
        Some(DetectionTicket { epoch: self.epoch })
    }

    /// Deliver a detection result. Returns true when corners were locked.
    ///
    /// Results from before the last pointer event, reset, or teardown are
    /// discarded.
    pub fn complete_detection(&mut self, ticket: DetectionTicket, result: Option<TrackedQuad>) -> bool {
        if ticket.epoch != self.epoch {
            debug!(ticket = ticket.epoch, epoch = self.epoch, "Discarding stale detection result");
            return false;
        }
        self.in_flight = false;
        if self.closed || self.paused || self.tracked.is_some() {
            return false;
        }
        match result {
            Some(tracked) => {
                info!(corners = ?tracked.quad.to_tuples(), "Corners locked");
                self.tracked = Some(tracked);
                self.paused = true;
                true
            }
            None => false,
        }
    }

    // -- Pointer input --------------------------------------------------------

    /// Start dragging the corner under `point` (frame pixels).
    pub fn pointer_down(&mut self, point: Corner) -> Option<usize> {
        if self.closed {
            return None;
        }
        let tracked = self.tracked.as_ref()?;
        let corner = self.hit.pick(tracked, point)?;
        self.selected = Some(corner);
        self.epoch += 1;
        debug!(corner, "Corner selected");
        Some(corner)
    }

    /// Move the selected corner to `point`, clamped to the frame.
    /// Returns false when nothing is being dragged.
    pub fn pointer_move(&mut self, point: Corner) -> bool {
        let (Some(corner), Some(tracked)) = (self.selected, self.tracked.as_mut()) else {
            return false;
        };
        let clamped = Corner::new(
            point.x.clamp(0.0, tracked.frame_width as f32),
            point.y.clamp(0.0, tracked.frame_height as f32),
        );
        tracked.quad.set_corner(corner, clamped);
        true
    }

    pub fn pointer_up(&mut self) {
        if let Some(corner) = self.selected.take() {
            debug!(corner, "Corner released");
        }
    }

    pub fn pointer_cancel(&mut self) {
        self.pointer_up();
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Forget the corners and resume automatic detection.
    pub fn reset(&mut self) {
        self.tracked = None;
        self.selected = None;
        self.paused = false;
        self.in_flight = false;
        self.epoch += 1;
        info!("Tracker reset; detection resumed");
    }

    /// Back to Idle for good: no further detections are accepted or started.
    pub fn teardown(&mut self) {
        self.reset();
        self.closed = true;
    }
}
