// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frames and the frame sampler.
//
// A `Frame` is one immutable RGBA snapshot of the live preview. The sampler
// copies the current picture out of a video source, downscaling it when it is
// larger than the processing budget, and remembers the scale so detected
// corners can be mapped back onto the full-resolution frame.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbaImage};
use ledgercam_core::{Corner, Quadrilateral};
use tracing::{debug, instrument};

/// An immutable RGBA raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::new(image.to_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    /// Single-channel copy for the vision pipeline.
    pub fn to_luma(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }

    /// Copy `native` into a frame no larger than `max_dimension` on either side.
    ///
    /// Frames that already fit are copied unchanged with scale 1. Larger frames
    /// are resized with a triangle filter so that thin document edges do not
    /// pick up ringing. The source image is never modified.
    #[instrument(skip(native), fields(width = native.width(), height = native.height()))]
    pub fn sample(native: &RgbaImage, max_dimension: u32) -> SampledFrame {
        let (width, height) = native.dimensions();
        let max_dimension = max_dimension.max(1);

        if width <= max_dimension && height <= max_dimension {
            return SampledFrame {
                frame: Frame::new(native.clone()),
                sampling: Sampling::identity(width, height),
            };
        }

        let scale = (max_dimension as f32 / width as f32).min(max_dimension as f32 / height as f32);
        let target_w = ((width as f32 * scale).round() as u32).clamp(1, max_dimension);
        let target_h = ((height as f32 * scale).round() as u32).clamp(1, max_dimension);
        let resized = image::imageops::resize(native, target_w, target_h, FilterType::Triangle);

        debug!(scale, target_w, target_h, "Frame downscaled for detection");

        SampledFrame {
            frame: Frame::new(resized),
            sampling: Sampling {
                native_width: width,
                native_height: height,
                sampled_width: target_w,
                sampled_height: target_h,
                scale,
            },
        }
    }
}

impl From<RgbaImage> for Frame {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

/// How a sampled frame relates to the native frame it was taken from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub native_width: u32,
    pub native_height: u32,
    pub sampled_width: u32,
    pub sampled_height: u32,
    /// Requested downscale factor; 1.0 when no downscale happened. Rounding
    /// the sampled size makes the per-axis factors differ slightly from it.
    pub scale: f32,
}

impl Sampling {
    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            native_width: width,
            native_height: height,
            sampled_width: width,
            sampled_height: height,
            scale: 1.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        (self.sampled_width, self.sampled_height) == (self.native_width, self.native_height)
    }

    /// Exact horizontal and vertical factors of the resize that was done.
    pub fn axis_scales(&self) -> (f32, f32) {
        (
            self.sampled_width as f32 / self.native_width.max(1) as f32,
            self.sampled_height as f32 / self.native_height.max(1) as f32,
        )
    }

    /// Map a point from sampled pixel space into native pixel space.
    ///
    /// Pixel centres are aligned the same way the resampler aligns them, so
    /// `(u + 0.5) / scale - 0.5` on each axis; with scale 1 this is the
    /// identity.
    pub fn to_native(&self, corner: Corner) -> Corner {
        if self.is_identity() {
            return corner;
        }
        let (sx, sy) = self.axis_scales();
        Corner::new((corner.x + 0.5) / sx - 0.5, (corner.y + 0.5) / sy - 0.5)
    }

    /// Inverse of [`Sampling::to_native`].
    pub fn to_sampled(&self, corner: Corner) -> Corner {
        if self.is_identity() {
            return corner;
        }
        let (sx, sy) = self.axis_scales();
        Corner::new((corner.x + 0.5) * sx - 0.5, (corner.y + 0.5) * sy - 0.5)
    }

    pub fn quad_to_native(&self, quad: &Quadrilateral) -> Quadrilateral {
        Quadrilateral::from_ordered(quad.corners().map(|c| self.to_native(c)))
    }
}

/// A frame handed to the detector, plus its sampling geometry.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub frame: Frame,
    pub sampling: Sampling,
}

impl SampledFrame {
    pub fn scale(&self) -> f32 {
        self.sampling.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn small_frame_is_copied_at_scale_one() {
        let native = RgbaImage::from_pixel(640, 480, Rgba([10, 20, 30, 255]));
        let sampled = Frame::sample(&native, 1920);
        assert_eq!(sampled.scale(), 1.0);
        assert_eq!(sampled.frame.dimensions(), (640, 480));
        assert_eq!(sampled.frame.as_rgba(), &native);
    }

    #[test]
    fn large_frame_is_downscaled_on_longest_side() {
        let native = RgbaImage::from_pixel(3840, 2160, Rgba([200, 200, 200, 255]));
        let sampled = Frame::sample(&native, 1920);
        assert!((sampled.scale() - 0.5).abs() < 1e-6);
        assert_eq!(sampled.frame.dimensions(), (1920, 1080));
    }

    #[test]
    fn portrait_frame_is_bounded_by_height() {
        let native = RgbaImage::new(1000, 4000);
        let sampled = Frame::sample(&native, 1000);
        assert_eq!(sampled.frame.dimensions(), (250, 1000));
    }

    #[test]
    fn native_mapping_round_trips() {
        let sampling = Sampling {
            native_width: 2400,
            native_height: 1600,
            sampled_width: 1200,
            sampled_height: 800,
            scale: 0.5,
        };
        let sampled = Corner::new(59.5, 100.0);
        let native = sampling.to_native(sampled);
        assert!((native.x - 119.5).abs() < 1e-4);
        let back = sampling.to_sampled(native);
        assert!((back.x - sampled.x).abs() < 1e-4 && (back.y - sampled.y).abs() < 1e-4);
    }

    #[test]
    fn mapping_uses_the_rounded_size_of_each_axis() {
        // 2500 * 0.4 is exactly 1000, but 1003 * 0.4 = 401.2 rounds to 401.
        let native = RgbaImage::new(2500, 1003);
        let sampled = Frame::sample(&native, 1000);
        assert_eq!(sampled.frame.dimensions(), (1000, 401));

        let (sx, sy) = sampled.sampling.axis_scales();
        assert!((sx - 0.4).abs() < 1e-6);
        assert!((sy - 401.0 / 1003.0).abs() < 1e-6);

        // The sampled frame's far corner lands exactly on the native one.
        let far = sampled.sampling.to_native(Corner::new(999.5, 400.5));
        assert!((far.x - 2499.5).abs() < 1e-3, "{far:?}");
        assert!((far.y - 1002.5).abs() < 1e-3, "{far:?}");
    }

    #[test]
    fn identity_sampling_leaves_quad_alone() {
        let quad = Quadrilateral::axis_aligned(1.0, 2.0, 30.0, 40.0);
        assert_eq!(Sampling::identity(50, 50).quad_to_native(&quad), quad);
    }
}
