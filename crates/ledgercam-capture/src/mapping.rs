// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion between on-screen pointer positions and frame pixels.
//
// The preview is drawn letterboxed ("contain") inside the viewport, so the
// displayed frame may be smaller than the viewport and offset within it.

use ledgercam_core::Corner;
use serde::{Deserialize, Serialize};

/// Where the frame is drawn, in display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Maps between display coordinates and the pixel space of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMapping {
    rect: DisplayRect,
    frame_width: u32,
    frame_height: u32,
}

impl DisplayMapping {
    /// The frame occupies exactly `rect`.
    pub fn new(rect: DisplayRect, frame_width: u32, frame_height: u32) -> Self {
        Self {
            rect,
            frame_width: frame_width.max(1),
            frame_height: frame_height.max(1),
        }
    }

    /// Fit the frame inside a `viewport_width` x `viewport_height` viewport,
    /// preserving aspect ratio and centring it.
    pub fn contain(viewport_width: f32, viewport_height: f32, frame_width: u32, frame_height: u32) -> Self {
        let (fw, fh) = (frame_width.max(1) as f32, frame_height.max(1) as f32);
        let scale = (viewport_width / fw).min(viewport_height / fh);
        let (width, height) = (fw * scale, fh * scale);
        Self::new(
            DisplayRect {
                x: (viewport_width - width) / 2.0,
                y: (viewport_height - height) / 2.0,
                width,
                height,
            },
            frame_width,
            frame_height,
        )
    }

    /// Identity mapping: display units are frame pixels.
    pub fn identity(frame_width: u32, frame_height: u32) -> Self {
        Self::new(
            DisplayRect {
                x: 0.0,
                y: 0.0,
                width: frame_width as f32,
                height: frame_height as f32,
            },
            frame_width,
            frame_height,
        )
    }

    pub fn rect(&self) -> DisplayRect {
        self.rect
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    /// Display point to frame pixels.
    pub fn to_frame(&self, x: f32, y: f32) -> Corner {
        let sx = self.frame_width as f32 / self.rect.width.max(f32::EPSILON);
        let sy = self.frame_height as f32 / self.rect.height.max(f32::EPSILON);
        Corner::new((x - self.rect.x) * sx, (y - self.rect.y) * sy)
    }

    /// Frame pixels to a display point.
    pub fn to_display(&self, corner: Corner) -> (f32, f32) {
        let sx = self.rect.width / self.frame_width as f32;
        let sy = self.rect.height / self.frame_height as f32;
        (self.rect.x + corner.x * sx, self.rect.y + corner.y * sy)
    }
}
