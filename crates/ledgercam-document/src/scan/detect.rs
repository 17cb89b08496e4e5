// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document corner detection.
//
// Finds the most plausible document-shaped quadrilateral in a frame. The
// detector is a pure function of its input: no state survives between calls,
// and every failure (nothing found, odd geometry, tiny frame) is reported as
// `None` rather than an error.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{dilate, erode};
use ledgercam_core::geometry::shoelace_area;
use ledgercam_core::{Corner, DetectorParams, Quadrilateral};
use tracing::{debug, instrument, trace};

use crate::image::frame::{Frame, SampledFrame};
use crate::scan::clahe::clahe;
use crate::scan::contour::{Line, approximate_closed, closed_arc_length, fit_line};

/// Frames smaller than this on either side are not searched.
const MIN_FRAME_SIDE: u32 = 32;

/// Share of each side, at both ends, ignored when refitting it.
const SIDE_TRIM: f64 = 0.15;

/// Anything that can find a document quadrilateral in a frame.
pub trait QuadDetector: Send + Sync {
    /// Corners in the pixel space of `frame`, or `None` when nothing qualifies.
    fn detect(&self, frame: &Frame) -> Option<Quadrilateral>;

    /// Detect on a sampled frame and map the result into native pixel space.
    fn detect_sampled(&self, sampled: &SampledFrame) -> Option<Quadrilateral> {
        let quad = self.detect(&sampled.frame)?;
        trace!(scale = sampled.scale(), "Mapping detection back to native frame");
        Some(sampled.sampling.quad_to_native(&quad))
    }
}

/// Contour-based document detector.
///
/// ## Pipeline
///
/// 1. Grayscale, then CLAHE to even out lighting
/// 2. Gaussian blur
/// 3. Canny edge detection
/// 4. Dilation (optionally followed by erosion) to close small edge gaps
/// 5. Outermost contours only; nested contours (text, logos) are ignored
/// 6. Filter by area, simplify to a polygon, keep convex quadrilaterals with
///    near-right angles and balanced opposite sides
/// 7. Score by area, centring, and perimeter; keep the best
/// 8. Refit each side of the winner against the raw edge map
#[derive(Debug, Clone, Default)]
pub struct CornerDetector {
    params: DetectorParams,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    quad: Quadrilateral,
    score: f64,
}

impl CornerDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Run the pipeline on a single-channel image.
    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    pub fn detect_gray(&self, gray: &GrayImage) -> Option<Quadrilateral> {
        let (width, height) = gray.dimensions();
        if width < MIN_FRAME_SIDE || height < MIN_FRAME_SIDE {
            debug!("Frame too small for detection");
            return None;
        }
        let p = &self.params;

        let equalised = clahe(gray, p.clahe_tiles, p.clahe_clip_limit);
        let blurred = gaussian_blur_f32(&equalised, p.blur_sigma);
        let edges = canny(&blurred, p.canny_low, p.canny_high);

        let mut closed = dilate(&edges, Norm::LInf, p.dilate_radius);
        if p.close_edges {
            closed = erode(&closed, Norm::LInf, p.dilate_radius);
        }

        let contours: Vec<Contour<i32>> = find_contours(&closed);
        let mut best: Option<Candidate> = None;
        let mut examined = 0usize;

        for contour in contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        {
            examined += 1;
            if let Some(candidate) = self.evaluate(contour, width, height) {
                if best.is_none_or(|b| candidate.score > b.score) {
                    best = Some(candidate);
                }
            }
        }

        let Some(best) = best else {
            debug!(contours = contours.len(), examined, "No document quadrilateral found");
            return None;
        };

        let quad = if p.refine_sides {
            refine_sides(&best.quad, &edges, p.dilate_radius as f64 + 3.0)
        } else {
            best.quad
        };

        debug!(
            examined,
            score = best.score,
            corners = ?quad.to_tuples(),
            "Document quadrilateral detected"
        );
        Some(quad)
    }

    /// Apply the geometric filters to one contour and score it.
    fn evaluate(&self, contour: &Contour<i32>, width: u32, height: u32) -> Option<Candidate> {
        let p = &self.params;
        if contour.points.len() < 4 {
            return None;
        }
        let frame_area = width as f64 * height as f64;
        let outline: Vec<Corner> = contour
            .points
            .iter()
            .map(|pt| Corner::new(pt.x as f32, pt.y as f32))
            .collect();
        let area_fraction = shoelace_area(&outline) / frame_area;
        if area_fraction < p.min_area_fraction || area_fraction > p.max_area_fraction {
            trace!(area_fraction, "Contour rejected by area");
            return None;
        }

        let epsilon = p.approx_epsilon_fraction * closed_arc_length(&contour.points);
        let polygon = approximate_closed(&contour.points, epsilon);
        let [a, b, c, d] = polygon.as_slice() else {
            trace!(vertices = polygon.len(), "Contour is not a quadrilateral");
            return None;
        };
        let quad = Quadrilateral::from_unordered([*a, *b, *c, *d]);

        if !quad.is_convex() {
            trace!("Quadrilateral rejected: not convex");
            return None;
        }
        if quad
            .interior_angles()
            .iter()
            .any(|angle| *angle < p.min_angle_deg || *angle > p.max_angle_deg)
        {
            trace!(angles = ?quad.interior_angles(), "Quadrilateral rejected by angle");
            return None;
        }
        let (horizontal, vertical) = quad.opposite_side_ratios();
        let ratio_ok = |r: f64| r >= p.min_side_ratio && r <= p.max_side_ratio;
        if !ratio_ok(horizontal) || !ratio_ok(vertical) {
            trace!(horizontal, vertical, "Quadrilateral rejected by side ratio");
            return None;
        }

        Some(Candidate {
            quad,
            score: self.score(&quad, width, height),
        })
    }

    /// Weighted blend of normalised area, centring, and perimeter.
    fn score(&self, quad: &Quadrilateral, width: u32, height: u32) -> f64 {
        let p = &self.params;
        let (w, h) = (width as f64, height as f64);

        let area = (quad.area() / (w * h)).clamp(0.0, 1.0);

        let centre = Corner::new((w / 2.0) as f32, (h / 2.0) as f32);
        let half_diagonal = w.hypot(h) / 2.0;
        let centring = (1.0 - quad.centroid().distance(&centre) / half_diagonal).clamp(0.0, 1.0);

        let perimeter = (quad.perimeter() / (2.0 * (w + h))).clamp(0.0, 1.0);

        p.area_weight * area + p.center_weight * centring + p.perimeter_weight * perimeter
    }
}

impl QuadDetector for CornerDetector {
    fn detect(&self, frame: &Frame) -> Option<Quadrilateral> {
        self.detect_gray(&frame.to_luma())
    }
}

/// Move each corner onto the intersection of its two sides, each side refit
/// through the raw edge pixels near it.
///
/// The polygon vertices sit on the outside of the dilated edge band and are
/// rounded off by the blur; the middle of each side is not. Only the central
/// part of each side (away from the corners) feeds the fit. A side without
/// enough support, or a corner that would move more than a few band widths,
/// keeps its original position.
fn refine_sides(quad: &Quadrilateral, edges: &GrayImage, band: f64) -> Quadrilateral {
    let mut lines: [Option<Line>; 4] = [None; 4];
    for (side, slot) in lines.iter_mut().enumerate() {
        let a = quad.corner(side);
        let b = quad.corner((side + 1) % 4);
        *slot = fit_side(edges, a, b, band);
    }

    let mut refined = *quad;
    for corner in 0..4 {
        let before = lines[(corner + 3) % 4];
        let after = lines[corner];
        if let (Some(l1), Some(l2)) = (before, after) {
            if let Some(point) = l1.intersect(&l2) {
                if point.x.is_finite()
                    && point.y.is_finite()
                    && point.distance(&quad.corner(corner)) <= band * 3.0
                {
                    refined.set_corner(corner, point);
                }
            }
        }
    }

    if refined.is_convex() {
        refined
    } else {
        *quad
    }
}

fn fit_side(edges: &GrayImage, a: Corner, b: Corner, band: f64) -> Option<Line> {
    let guide = Line::through(a, b)?;
    let length = a.distance(&b);
    let (width, height) = edges.dimensions();

    let min_x = ((a.x.min(b.x) as f64 - band).floor().max(0.0)) as u32;
    let max_x = ((a.x.max(b.x) as f64 + band).ceil().min(width as f64 - 1.0)).max(0.0) as u32;
    let min_y = ((a.y.min(b.y) as f64 - band).floor().max(0.0)) as u32;
    let max_y = ((a.y.max(b.y) as f64 + band).ceil().min(height as f64 - 1.0)).max(0.0) as u32;

    let mut support = Vec::new();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            if edges.get_pixel(x, y)[0] == 0 {
                continue;
            }
            let pt = (x as f64, y as f64);
            let t = guide.project(pt);
            if t < SIDE_TRIM * length || t > (1.0 - SIDE_TRIM) * length {
                continue;
            }
            if guide.distance(pt) <= band {
                support.push(pt);
            }
        }
    }

    let needed = ((length * (1.0 - 2.0 * SIDE_TRIM)) * 0.3).max(10.0) as usize;
    if support.len() < needed {
        trace!(support = support.len(), needed, "Not enough edge support to refit side");
        return None;
    }
    fit_line(&support)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point;

    use crate::image::frame::Frame;

    fn assert_near(actual: Corner, expected: (f32, f32), tolerance: f32) {
        assert!(
            (actual.x - expected.0).abs() <= tolerance && (actual.y - expected.1).abs() <= tolerance,
            "corner {actual:?} not within {tolerance} of {expected:?}"
        );
    }

    fn bright_rectangle(width: u32, height: u32, left: u32, top: u32, right: u32, bottom: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (left..right).contains(&x) && (top..bottom).contains(&y) {
                Rgba([240, 240, 240, 255])
            } else {
                Rgba([30, 30, 30, 255])
            }
        })
    }

    #[test]
    fn finds_axis_aligned_document() {
        let image = bright_rectangle(1000, 1000, 100, 100, 900, 700);
        let quad = CornerDetector::default()
            .detect(&Frame::new(image))
            .expect("document should be found");
        assert_near(quad.top_left(), (100.0, 100.0), 3.0);
        assert_near(quad.top_right(), (900.0, 100.0), 3.0);
        assert_near(quad.bottom_right(), (900.0, 700.0), 3.0);
        assert_near(quad.bottom_left(), (100.0, 700.0), 3.0);
    }

    #[test]
    fn finds_rotated_document_in_clockwise_order() {
        let (cx, cy) = (400.0f32, 300.0f32);
        let (half_w, half_h) = (220.0f32, 160.0f32);
        let angle = 15.0f32.to_radians();
        let rotate = |dx: f32, dy: f32| {
            (
                cx + dx * angle.cos() - dy * angle.sin(),
                cy + dx * angle.sin() + dy * angle.cos(),
            )
        };
        let expected = [
            rotate(-half_w, -half_h),
            rotate(half_w, -half_h),
            rotate(half_w, half_h),
            rotate(-half_w, half_h),
        ];

        let mut image = RgbaImage::from_pixel(800, 600, Rgba([25, 25, 25, 255]));
        let polygon: Vec<Point<i32>> = expected
            .iter()
            .map(|(x, y)| Point::new(x.round() as i32, y.round() as i32))
            .collect();
        draw_polygon_mut(&mut image, &polygon, Rgba([235, 235, 235, 255]));

        let quad = CornerDetector::default()
            .detect(&Frame::new(image))
            .expect("rotated document should be found");
        for (i, exp) in expected.iter().enumerate() {
            assert_near(quad.corner(i), *exp, 4.0);
        }
        assert!(quad.is_convex());
    }

    #[test]
    fn uniform_frame_has_no_document() {
        let image = RgbaImage::from_pixel(640, 480, Rgba([128, 128, 128, 255]));
        assert!(CornerDetector::default().detect(&Frame::new(image)).is_none());
    }

    #[test]
    fn tiny_document_is_rejected_by_area() {
        // 60x60 on 640x480 is about 1.2% of the frame.
        let image = bright_rectangle(640, 480, 290, 210, 350, 270);
        assert!(CornerDetector::default().detect(&Frame::new(image)).is_none());
    }

    #[test]
    fn elongated_trapezoid_is_rejected_by_side_ratio() {
        // Top side 500px, bottom side 200px: ratio 2.5.
        let mut image = RgbaImage::from_pixel(800, 600, Rgba([20, 20, 20, 255]));
        let polygon = [
            Point::new(150, 100),
            Point::new(650, 100),
            Point::new(500, 500),
            Point::new(300, 500),
        ];
        draw_polygon_mut(&mut image, &polygon, Rgba([230, 230, 230, 255]));
        assert!(CornerDetector::default().detect(&Frame::new(image)).is_none());
    }

    #[test]
    fn text_inside_document_does_not_win() {
        let mut image = bright_rectangle(900, 700, 150, 100, 750, 600);
        // Dark "text lines" inside the page produce nested contours.
        for row in 0..6 {
            let y0 = 180 + row * 60;
            for y in y0..y0 + 14 {
                for x in 220..680 {
                    image.put_pixel(x, y, Rgba([20, 20, 20, 255]));
                }
            }
        }
        let quad = CornerDetector::default()
            .detect(&Frame::new(image))
            .expect("page should be found");
        assert_near(quad.top_left(), (150.0, 100.0), 3.0);
        assert_near(quad.bottom_right(), (750.0, 600.0), 3.0);
    }

    #[test]
    fn sampled_detection_matches_native_detection() {
        let native = bright_rectangle(1200, 1200, 120, 120, 1080, 840);
        let detector = CornerDetector::default();

        let direct = detector
            .detect_sampled(&Frame::sample(&native, 1200))
            .expect("direct detection");
        let downscaled = Frame::sample(&native, 600);
        assert!((downscaled.scale() - 0.5).abs() < 1e-6);
        let mapped = detector.detect_sampled(&downscaled).expect("sampled detection");

        for i in 0..4 {
            let (a, b) = (direct.corner(i), mapped.corner(i));
            assert!(
                (a.x.round() - b.x.round()).abs() <= 1.0 && (a.y.round() - b.y.round()).abs() <= 1.0,
                "corner {i}: direct {a:?} vs sampled {b:?}"
            );
        }
    }

    #[test]
    fn gray_entry_point_rejects_tiny_frames() {
        let gray = GrayImage::from_pixel(16, 16, Luma([255]));
        assert!(CornerDetector::default().detect_gray(&gray).is_none());
    }
}
