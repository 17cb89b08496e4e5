// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the ledgercam-document crate: one detection tick
// on a preview-sized frame, and rectification of a full capture.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use ledgercam_core::{EnhanceParams, Quadrilateral};
use ledgercam_document::{CornerDetector, Frame, QuadDetector, Rectifier};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Light page on a dark desk, the common case for a detection tick.
fn synthetic_page(width: u32, height: u32) -> RgbaImage {
    let (left, top) = (width / 8, height / 8);
    let (right, bottom) = (width - width / 8, height - height / 8);
    RgbaImage::from_fn(width, height, |x, y| {
        if (left..right).contains(&x) && (top..bottom).contains(&y) {
            Rgba([235, 232, 228, 255])
        } else {
            Rgba([40, 36, 32, 255])
        }
    })
}

/// One detection on a 640x480 frame (sampling included).
fn bench_detection_tick(c: &mut Criterion) {
    let native = synthetic_page(640, 480);
    let detector = CornerDetector::default();

    c.bench_function("detection_tick (640x480)", |b| {
        b.iter(|| {
            let sampled = Frame::sample(black_box(&native), 1920);
            black_box(detector.detect_sampled(&sampled));
        });
    });
}

/// Warp plus OCR enhancement of a 1280x960 capture up to the 1400px minimum.
fn bench_rectify(c: &mut Criterion) {
    let native = synthetic_page(1280, 960);
    let quad = Quadrilateral::axis_aligned(160.0, 120.0, 1120.0, 840.0);
    let rectifier = Rectifier::new(1400, EnhanceParams::default());

    c.bench_function("rectify_and_enhance (1280x960)", |b| {
        b.iter(|| {
            black_box(rectifier.rectify(black_box(&native), Some(&quad)));
        });
    });
}

criterion_group!(benches, bench_detection_tick, bench_rectify);
criterion_main!(benches);
