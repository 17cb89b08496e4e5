// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Crop a document down to the area that actually carries text.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Margin kept around the text when none is given.
pub const DEFAULT_MARGIN: u32 = 20;

/// Axis-aligned box around a block of text, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::str::FromStr for TextRegion {
    type Err = String;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|err| format!("invalid region {s:?}: {err}"))?;
        match parts[..] {
            [x, y, width, height] => Ok(Self::new(x, y, width, height)),
            _ => Err(format!("region {s:?} must be x,y,width,height")),
        }
    }
}

/// Crop `image` to the union of `regions` grown by `margin` on every side.
///
/// The crop is clamped to the image. With no usable regions the image comes
/// back unchanged.
#[instrument(skip(image, regions), fields(regions = regions.len(), margin))]
pub fn trim_to_regions(image: &RgbaImage, regions: &[TextRegion], margin: u32) -> RgbaImage {
    let (img_w, img_h) = image.dimensions();
    let bounds = regions
        .iter()
        .filter(|r| !r.is_empty() && r.x < img_w && r.y < img_h)
        .fold(None, |acc: Option<(u32, u32, u32, u32)>, r| {
            let (l, t) = (r.x, r.y);
            let (rt, b) = (r.x.saturating_add(r.width), r.y.saturating_add(r.height));
            Some(match acc {
                None => (l, t, rt, b),
                Some((al, at, ar, ab)) => (al.min(l), at.min(t), ar.max(rt), ab.max(b)),
            })
        });

    let Some((left, top, right, bottom)) = bounds else {
        debug!("No usable text regions; leaving image untouched");
        return image.clone();
    };

    let left = left.saturating_sub(margin);
    let top = top.saturating_sub(margin);
    let right = right.saturating_add(margin).min(img_w);
    let bottom = bottom.saturating_add(margin).min(img_h);

    info!(left, top, width = right - left, height = bottom - top, "Trimming to text");
    image::imageops::crop_imm(image, left, top, right - left, bottom - top).to_image()
}
