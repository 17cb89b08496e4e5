// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour geometry helpers for the corner detector: closed-polygon
// simplification on top of imageproc's Douglas-Peucker, and
// total-least-squares line fitting.

use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use ledgercam_core::Corner;

/// Length of the closed polyline through `points`.
pub fn closed_arc_length(points: &[Point<i32>]) -> f64 {
    arc_length(points, true)
}

/// Simplify a closed contour with Douglas-Peucker.
///
/// `approximate_polygon_dp` always keeps the first point, and contours from
/// `find_contours` usually start part-way along a side. The contour is
/// rotated to start at the point farthest from its first point first; on a
/// convex outline that point is a true vertex.
pub fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Corner> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.iter().map(to_corner).collect();
    }

    let start = farthest_from(points, points[0]);
    let mut rotated = points.to_vec();
    rotated.rotate_left(start);
    approximate_polygon_dp(&rotated, epsilon, true)
        .iter()
        .map(to_corner)
        .collect()
}

fn to_corner(p: &Point<i32>) -> Corner {
    Corner::new(p.x as f32, p.y as f32)
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    let squared = |p: &Point<i32>| {
        let (dx, dy) = ((p.x - origin.x) as i64, (p.y - origin.y) as i64);
        dx * dx + dy * dy
    };
    points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| squared(p))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// An infinite line through `point` along the unit vector `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub point: (f64, f64),
    pub direction: (f64, f64),
}

impl Line {
    pub fn through(a: Corner, b: Corner) -> Option<Self> {
        let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
        let len = dx.hypot(dy);
        (len > f64::EPSILON).then(|| Self {
            point: (a.x as f64, a.y as f64),
            direction: (dx / len, dy / len),
        })
    }

    /// Perpendicular distance from `(x, y)`.
    pub fn distance(&self, (x, y): (f64, f64)) -> f64 {
        let (dx, dy) = self.direction;
        (dy * (x - self.point.0) - dx * (y - self.point.1)).abs()
    }

    /// Signed position of the foot of the perpendicular from `(x, y)`.
    pub fn project(&self, (x, y): (f64, f64)) -> f64 {
        (x - self.point.0) * self.direction.0 + (y - self.point.1) * self.direction.1
    }

    /// Intersection point, or `None` for (near-)parallel lines.
    pub fn intersect(&self, other: &Line) -> Option<Corner> {
        let (d1x, d1y) = self.direction;
        let (d2x, d2y) = other.direction;
        let denom = d1x * d2y - d1y * d2x;
        if denom.abs() < 1e-6 {
            return None;
        }
        let (wx, wy) = (other.point.0 - self.point.0, other.point.1 - self.point.1);
        let t = (wx * d2y - wy * d2x) / denom;
        Some(Corner::new(
            (self.point.0 + t * d1x) as f32,
            (self.point.1 + t * d1y) as f32,
        ))
    }
}

/// Total-least-squares line through `points` (principal axis of their spread).
pub fn fit_line(points: &[(f64, f64)]) -> Option<Line> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let (mx, my) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
    let (mx, my) = (mx / n, my / n);

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in points {
        let (dx, dy) = (x - mx, y - my);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx + syy < f64::EPSILON {
        return None;
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    Some(Line {
        point: (mx, my),
        direction: (theta.cos(), theta.sin()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Outline of an axis-aligned rectangle, one point per pixel step,
    /// starting part-way along the top side.
    fn rectangle_outline(left: i32, top: i32, right: i32, bottom: i32) -> Vec<Point<i32>> {
        let mut pts = Vec::new();
        pts.extend(((left + 40)..right).map(|x| Point::new(x, top)));
        pts.extend((top..bottom).map(|y| Point::new(right, y)));
        pts.extend(((left + 1)..=right).rev().map(|x| Point::new(x, bottom)));
        pts.extend(((top + 1)..=bottom).rev().map(|y| Point::new(left, y)));
        pts.extend((left..(left + 40)).map(|x| Point::new(x, top)));
        pts
    }

    #[test]
    fn rectangle_simplifies_to_four_vertices() {
        let outline = rectangle_outline(10, 20, 110, 80);
        let eps = 0.02 * closed_arc_length(&outline);
        let poly = approximate_closed(&outline, eps);
        assert_eq!(poly.len(), 4, "got {poly:?}");
        for expected in [(10.0, 20.0), (110.0, 20.0), (110.0, 80.0), (10.0, 80.0)] {
            assert!(
                poly.iter().any(|c| (c.x - expected.0).abs() < 1.0 && (c.y - expected.1).abs() < 1.0),
                "missing vertex {expected:?} in {poly:?}"
            );
        }
    }

    #[test]
    fn mid_side_start_point_would_add_a_fifth_vertex() {
        let outline = rectangle_outline(10, 20, 110, 80);
        let eps = 0.02 * closed_arc_length(&outline);

        let unrotated = approximate_polygon_dp(&outline, eps, true);
        assert_eq!(unrotated.len(), 5, "got {unrotated:?}");
        assert!(unrotated.contains(&Point::new(50, 20)));
        assert_eq!(approximate_closed(&outline, eps).len(), 4);
    }

    #[test]
    fn triangle_keeps_three_vertices() {
        let corners = [(0.0f32, 0.0f32), (100.0, 0.0), (50.0, 80.0)];
        let mut outline = Vec::new();
        for i in 0..3 {
            let (a, b) = (corners[i], corners[(i + 1) % 3]);
            for k in 0..50 {
                let t = k as f32 / 50.0;
                outline.push(Point::new(
                    (a.0 + (b.0 - a.0) * t).round() as i32,
                    (a.1 + (b.1 - a.1) * t).round() as i32,
                ));
            }
        }
        let poly = approximate_closed(&outline, 0.02 * closed_arc_length(&outline));
        assert_eq!(poly.len(), 3, "got {poly:?}");
    }

    #[test]
    fn arc_length_closes_the_loop() {
        let square = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)];
        assert!((closed_arc_length(&square) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn fits_noisy_horizontal_line() {
        let points: Vec<(f64, f64)> = (0..100)
            .map(|i| (i as f64, 50.0 + if i % 2 == 0 { 0.5 } else { -0.5 }))
            .collect();
        let line = fit_line(&points).expect("line");
        assert!(line.direction.1.abs() < 0.01);
        assert!((line.point.1 - 50.0).abs() < 0.01);
    }

    #[test]
    fn perpendicular_lines_intersect() {
        let h = Line::through(Corner::new(0.0, 5.0), Corner::new(10.0, 5.0)).expect("line");
        let v = Line::through(Corner::new(3.0, 0.0), Corner::new(3.0, 10.0)).expect("line");
        let p = h.intersect(&v).expect("intersection");
        assert!((p.x - 3.0).abs() < 1e-5 && (p.y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn parallel_lines_do_not_intersect() {
        let a = Line::through(Corner::new(0.0, 0.0), Corner::new(10.0, 0.0)).expect("line");
        let b = Line::through(Corner::new(0.0, 4.0), Corner::new(10.0, 4.0)).expect("line");
        assert!(a.intersect(&b).is_none());
    }
}
