// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Draws the tracked quadrilateral and its corner handles over a preview frame.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use ledgercam_core::Quadrilateral;

/// Colours and sizes of the overlay, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub outline: Rgba<u8>,
    pub handle: Rgba<u8>,
    pub selected: Rgba<u8>,
    pub line_width: u32,
    pub handle_radius: i32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            outline: Rgba([0, 200, 255, 255]),
            handle: Rgba([255, 255, 255, 255]),
            selected: Rgba([255, 170, 0, 255]),
            line_width: 3,
            handle_radius: 14,
        }
    }
}

/// Copy `frame` and draw `quad` on it. The selected corner gets a larger,
/// differently coloured handle.
pub fn render_overlay(
    frame: &RgbaImage,
    quad: Option<&Quadrilateral>,
    selected: Option<usize>,
    style: &OverlayStyle,
) -> RgbaImage {
    let mut canvas = frame.clone();
    let Some(quad) = quad else {
        return canvas;
    };

    let corners = quad.to_tuples();
    let half = style.line_width as f32 / 2.0;
    for i in 0..4 {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        // Thick lines as a bundle of offset one-pixel segments.
        for step in 0..style.line_width.max(1) {
            let offset = step as f32 - half + 0.5;
            draw_line_segment_mut(&mut canvas, (a.0 + offset, a.1), (b.0 + offset, b.1), style.outline);
            draw_line_segment_mut(&mut canvas, (a.0, a.1 + offset), (b.0, b.1 + offset), style.outline);
        }
    }

    for (i, (x, y)) in corners.iter().enumerate() {
        let center = (x.round() as i32, y.round() as i32);
        if selected == Some(i) {
            let radius = style.handle_radius + style.handle_radius / 2;
            draw_filled_circle_mut(&mut canvas, center, radius, style.selected);
        } else {
            draw_filled_circle_mut(&mut canvas, center, style.handle_radius, style.handle);
            draw_hollow_circle_mut(&mut canvas, center, style.handle_radius, style.outline);
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_quad_returns_plain_copy() {
        let frame = RgbaImage::from_pixel(32, 32, Rgba([5, 5, 5, 255]));
        assert_eq!(render_overlay(&frame, None, None, &OverlayStyle::default()), frame);
    }

    #[test]
    fn draws_outline_and_handles() {
        let frame = RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 255]));
        let quad = Quadrilateral::axis_aligned(40.0, 40.0, 160.0, 160.0);
        let style = OverlayStyle::default();
        let out = render_overlay(&frame, Some(&quad), Some(2), &style);

        assert_eq!(*out.get_pixel(100, 40), style.outline);
        assert_eq!(*out.get_pixel(40, 40), style.handle);
        assert_eq!(*out.get_pixel(160, 160), style.selected);
        assert_eq!(*out.get_pixel(100, 100), Rgba([0, 0, 0, 255]));
    }
}
