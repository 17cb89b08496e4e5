// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification of a detected (or hand-placed) document.

use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use ledgercam_core::{EnhanceParams, Quadrilateral};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::scan::enhance::ScanEnhancer;

/// Sides shorter than this (in pixels) make a quadrilateral unusable.
pub const MIN_SIDE_PX: f64 = 8.0;

/// Upper bound on either side of a rectified image. A thin quadrilateral
/// scaled up to the minimum dimension would otherwise outgrow what JPEG can
/// hold (and what memory can).
pub const MAX_OUTPUT_SIDE: u32 = 8192;

/// What the rectifier did with the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RectifyOutcome {
    /// The quadrilateral was warped to an upright rectangle.
    Warped,
    /// No quadrilateral was supplied; the frame passes through unchanged.
    NoQuadrilateral,
    /// The quadrilateral was unusable; the frame passes through unchanged.
    Degenerate(String),
}

impl RectifyOutcome {
    pub fn is_warped(&self) -> bool {
        matches!(self, Self::Warped)
    }
}

/// Result of [`Rectifier::rectify`].
#[derive(Debug, Clone)]
pub struct RectifiedImage {
    pub image: RgbaImage,
    pub outcome: RectifyOutcome,
}

/// Warps the document inside a quadrilateral onto an upright rectangle.
#[derive(Debug, Clone)]
pub struct Rectifier {
    min_output_dimension: u32,
    enhance: EnhanceParams,
}

impl Rectifier {
    pub fn new(min_output_dimension: u32, enhance: EnhanceParams) -> Self {
        Self {
            min_output_dimension: min_output_dimension.max(1),
            enhance,
        }
    }

    pub fn min_output_dimension(&self) -> u32 {
        self.min_output_dimension
    }

    /// Rectify `frame` using `quad` (corners in `frame`'s pixel space).
    ///
    /// Without a quadrilateral, or with a degenerate one, the unmodified
    /// frame comes back and the outcome says why. Rectification is never
    /// the reason a capture fails.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    pub fn rectify(&self, frame: &RgbaImage, quad: Option<&Quadrilateral>) -> RectifiedImage {
        let Some(quad) = quad else {
            debug!("No quadrilateral; passing frame through");
            return RectifiedImage {
                image: frame.clone(),
                outcome: RectifyOutcome::NoQuadrilateral,
            };
        };

        if let Some(reason) = quad.degeneracy(MIN_SIDE_PX) {
            warn!(%reason, "Degenerate quadrilateral; passing frame through");
            return passthrough(frame, reason);
        }

        let (out_w, out_h) = target_dimensions(quad, self.min_output_dimension);
        if out_w.max(out_h) > MAX_OUTPUT_SIDE {
            let reason = format!("output {out_w}x{out_h} exceeds the {MAX_OUTPUT_SIDE} px side limit");
            warn!(%reason, "Quadrilateral too elongated; passing frame through");
            return passthrough(frame, reason);
        }
        let to = [
            (0.0, 0.0),
            (out_w as f32, 0.0),
            (out_w as f32, out_h as f32),
            (0.0, out_h as f32),
        ];
        let Some(projection) = Projection::from_control_points(quad.to_tuples(), to) else {
            warn!("Could not compute a projective transform; passing frame through");
            return passthrough(frame, "projective transform is singular".into());
        };

        let mut warped = RgbaImage::new(out_w, out_h);
        warp_into(
            frame,
            &projection,
            Interpolation::Bicubic,
            Rgba([255, 255, 255, 255]),
            &mut warped,
        );

        let image = if self.enhance.enabled {
            enhance_for_ocr(warped, &self.enhance)
        } else {
            warped
        };

        info!(out_w, out_h, "Document rectified");
        RectifiedImage {
            image,
            outcome: RectifyOutcome::Warped,
        }
    }
}

fn passthrough(frame: &RgbaImage, reason: String) -> RectifiedImage {
    RectifiedImage {
        image: frame.clone(),
        outcome: RectifyOutcome::Degenerate(reason),
    }
}

/// Run the post-rectification legibility chain configured by `params`.
pub fn enhance_for_ocr(image: RgbaImage, params: &EnhanceParams) -> RgbaImage {
    let mut enhancer = ScanEnhancer::from_rgba(image)
        .equalize_luminance(params.clahe_tiles, params.clahe_clip_limit)
        .sharpen(params.sharpen_sigma, params.sharpen_amount);
    if params.level_clamp {
        enhancer = enhancer.clamp_levels(0.08, 0.92);
    }
    enhancer.into_rgba()
}

/// Output size for a quadrilateral.
///
/// Width is the longer of the top and bottom sides, height the longer of the
/// left and right sides. When the shorter output side would be below
/// `min_dimension`, both sides are scaled up by the same factor so that the
/// shorter side lands exactly on the minimum.
pub fn target_dimensions(quad: &Quadrilateral, min_dimension: u32) -> (u32, u32) {
    let [top, right, bottom, left] = quad.side_lengths();
    let width = top.max(bottom).round().max(1.0);
    let height = left.max(right).round().max(1.0);
    let min = min_dimension.max(1) as f64;

    let shorter = width.min(height);
    if shorter >= min {
        return (width as u32, height as u32);
    }

    let factor = min / shorter;
    if width <= height {
        (min as u32, ((height * factor).round() as u32).max(min as u32))
    } else {
        (((width * factor).round() as u32).max(min as u32), min as u32)
    }
}
