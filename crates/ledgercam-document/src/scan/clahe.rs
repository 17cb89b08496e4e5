// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalisation.
//
// The image is split into a grid of tiles. Each tile gets its own equalisation
// lookup table built from a clipped histogram (excess counts are spread evenly
// over all bins), and every pixel is mapped through a bilinear blend of the
// four nearest tile tables so tile borders do not show.

use image::{GrayImage, Luma};

const BINS: usize = 256;

/// Equalise `gray` with a `tiles` x `tiles` grid and the given clip limit.
///
/// A clip limit of 1.0 means no bin may exceed the tile's mean bin count,
/// which leaves a flat histogram and so (almost) the identity mapping. Larger limits
/// allow stronger local contrast.
pub fn clahe(gray: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let tiles_x = tiles.clamp(1, width);
    let tiles_y = tiles.clamp(1, height);
    let bounds_x = tile_bounds(width, tiles_x);
    let bounds_y = tile_bounds(height, tiles_y);

    let mut tables = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y as usize {
        for tx in 0..tiles_x as usize {
            tables.push(tile_table(gray, bounds_x[tx], bounds_y[ty], clip_limit));
        }
    }

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;

    GrayImage::from_fn(width, height, |x, y| {
        let (x0, x1, wx) = neighbours(x, tile_w, tiles_x);
        let (y0, y1, wy) = neighbours(y, tile_h, tiles_y);
        let v = gray.get_pixel(x, y)[0] as usize;
        let at = |tx: usize, ty: usize| tables[ty * tiles_x as usize + tx][v] as f32;

        let top = at(x0, y0) * (1.0 - wx) + at(x1, y0) * wx;
        let bottom = at(x0, y1) * (1.0 - wx) + at(x1, y1) * wx;
        let value = top * (1.0 - wy) + bottom * wy;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Half-open pixel ranges of each tile along one axis.
fn tile_bounds(len: u32, tiles: u32) -> Vec<(u32, u32)> {
    (0..tiles)
        .map(|i| (i * len / tiles, (i + 1) * len / tiles))
        .collect()
}

/// The two tiles whose centres bracket `coord`, and the weight of the second.
fn neighbours(coord: u32, tile_len: f32, tiles: u32) -> (usize, usize, f32) {
    let g = (coord as f32 + 0.5) / tile_len - 0.5;
    let last = tiles as usize - 1;
    if g <= 0.0 {
        return (0, 0, 0.0);
    }
    let lo = (g.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let weight = if hi == lo { 0.0 } else { g - lo as f32 };
    (lo, hi, weight)
}

fn tile_table(gray: &GrayImage, (x0, x1): (u32, u32), (y0, y1): (u32, u32), clip_limit: f32) -> [u8; BINS] {
    let mut hist = [0u32; BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let count: u32 = hist.iter().sum();
    let mut table = [0u8; BINS];
    if count == 0 {
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8;
        }
        return table;
    }

    let limit = ((clip_limit.max(1.0) * count as f32 / BINS as f32).ceil() as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / BINS as u32;
    let remainder = (excess % BINS as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += share;
    }
    if remainder > 0 {
        let step = (BINS / remainder).max(1);
        for k in 0..remainder {
            hist[k * step] += 1;
        }
    }

    let total: u32 = hist.iter().sum();
    let mut cdf = 0u32;
    for (slot, bin) in table.iter_mut().zip(hist.iter()) {
        cdf += bin;
        *slot = ((cdf as f64 * 255.0) / total as f64).round() as u8;
    }
    table
}
