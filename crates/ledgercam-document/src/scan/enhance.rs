// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement pipeline — OCR legibility passes applied to a rectified
// document: shadow suppression, sharpening, and optional level clamping.
//
// Every pass works on luminance only. A pass computes a new luma value per
// pixel and shifts R, G, and B by the same delta, which moves Y while leaving
// both chroma components (B - Y, R - Y) untouched.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, instrument};

use crate::scan::clahe::clahe;

/// Chainable enhancement passes over an RGBA image.
pub struct ScanEnhancer {
    image: RgbaImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    // -- Passes ---------------------------------------------------------------

    /// Tile-based contrast equalisation of the luminance channel.
    ///
    /// Evens out shadows and uneven lighting across the page.
    #[instrument(skip(self))]
    pub fn equalize_luminance(self, tiles: u32, clip_limit: f32) -> Self {
        let luma = luminance(&self.image);
        let equalised = clahe(&luma, tiles, clip_limit);
        debug!("Luminance equalised");
        self.shift_to(&luma, &equalised)
    }

    /// Unsharp mask on luminance: `y + amount * (y - blur(y))`.
    #[instrument(skip(self))]
    pub fn sharpen(self, sigma: f32, amount: f32) -> Self {
        if amount <= 0.0 || sigma <= 0.0 {
            return self;
        }
        let luma = luminance(&self.image);
        let blurred = gaussian_blur_f32(&luma, sigma);
        let sharpened = GrayImage::from_fn(luma.width(), luma.height(), |x, y| {
            let v = luma.get_pixel(x, y)[0] as f32;
            let b = blurred.get_pixel(x, y)[0] as f32;
            Luma([(v + amount * (v - b)).round().clamp(0.0, 255.0) as u8])
        });
        self.shift_to(&luma, &sharpened)
    }

    /// Force near-black pixels to black and near-white pixels to white.
    ///
    /// `black` and `white` are fractions of the luminance range; pixels at or
    /// below `black` become pure black, at or above `white` pure white.
    #[instrument(skip(self))]
    pub fn clamp_levels(mut self, black: f32, white: f32) -> Self {
        let black = (black.clamp(0.0, 1.0) * 255.0).round() as u8;
        let white = (white.clamp(0.0, 1.0) * 255.0).round() as u8;
        let mut cleared = 0usize;
        for pixel in self.image.pixels_mut() {
            let y = luma_of(pixel[0], pixel[1], pixel[2]);
            if y >= white {
                pixel.0 = [255, 255, 255, pixel[3]];
                cleared += 1;
            } else if y <= black {
                pixel.0 = [0, 0, 0, pixel[3]];
                cleared += 1;
            }
        }
        debug!(cleared, "Levels clamped");
        self
    }

    /// Move every pixel's luminance from `before` to `after`.
    fn shift_to(mut self, before: &GrayImage, after: &GrayImage) -> Self {
        for (x, y, pixel) in self.image.enumerate_pixels_mut() {
            let delta = after.get_pixel(x, y)[0] as i16 - before.get_pixel(x, y)[0] as i16;
            if delta == 0 {
                continue;
            }
            for c in 0..3 {
                pixel[c] = (pixel[c] as i16 + delta).clamp(0, 255) as u8;
            }
        }
        self
    }
}

/// BT.601 luma.
fn luma_of(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round().clamp(0.0, 255.0) as u8
}

fn luminance(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        Luma([luma_of(p[0], p[1], p[2])])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn equalisation_lifts_shadowed_half() {
        // Right half is a "shadowed" copy of the left half.
        let image = RgbaImage::from_fn(128, 64, |x, y| {
            let ink = (x % 16 < 2) || (y % 16 < 2);
            let base: u8 = if ink { 40 } else { 220 };
            let v = if x >= 64 { base / 2 } else { base };
            Rgba([v, v, v, 255])
        });
        let out = ScanEnhancer::from_rgba(image.clone())
            .equalize_luminance(4, 8.0)
            .into_rgba();
        let before = image.get_pixel(100, 40)[0] as i32;
        let after = out.get_pixel(100, 40)[0] as i32;
        assert!(after > before, "shadowed paper not lifted: {before} -> {after}");
    }

    #[test]
    fn luminance_shift_preserves_colour_differences() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([200, 120, 60, 255]));
        let luma = luminance(&image);
        let brighter = GrayImage::from_fn(8, 8, |x, y| Luma([luma.get_pixel(x, y)[0] + 20]));
        let out = ScanEnhancer::from_rgba(image).shift_to(&luma, &brighter).into_rgba();
        assert_eq!(out.get_pixel(3, 3).0, [220, 140, 80, 255]);
    }

    #[test]
    fn sharpen_increases_edge_contrast() {
        let image = RgbaImage::from_fn(40, 40, |x, _| {
            let v = if x < 20 { 80 } else { 180 };
            Rgba([v, v, v, 255])
        });
        let out = ScanEnhancer::from_rgba(image).sharpen(1.0, 1.0).into_rgba();
        assert!(out.get_pixel(18, 20)[0] < 80);
        assert!(out.get_pixel(21, 20)[0] > 180);
    }

    #[test]
    fn zero_amount_sharpen_is_identity() {
        let image = RgbaImage::from_fn(10, 10, |x, y| Rgba([(x * 20) as u8, (y * 20) as u8, 9, 255]));
        let out = ScanEnhancer::from_rgba(image.clone()).sharpen(1.0, 0.0).into_rgba();
        assert_eq!(out, image);
    }

    #[test]
    fn level_clamp_snaps_extremes() {
        let image = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([10, 10, 10, 255]),
            1 => Rgba([128, 128, 128, 255]),
            _ => Rgba([245, 245, 245, 255]),
        });
        let out = ScanEnhancer::from_rgba(image).clamp_levels(0.08, 0.92).into_rgba();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [128, 128, 128, 255]);
        assert_eq!(out.get_pixel(2, 0).0, [255, 255, 255, 255]);
    }

}
