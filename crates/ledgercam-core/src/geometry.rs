// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corners and quadrilaterals in frame pixel space.

use serde::{Deserialize, Serialize};

/// A point in the pixel space of one specific frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Corner {
    pub x: f32,
    pub y: f32,
}

impl Corner {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Corner) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Multiply both coordinates by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl From<(f32, f32)> for Corner {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// Index of each corner inside a [`Quadrilateral`].
pub const TOP_LEFT: usize = 0;
pub const TOP_RIGHT: usize = 1;
pub const BOTTOM_RIGHT: usize = 2;
pub const BOTTOM_LEFT: usize = 3;

/// Exactly four corners, always clockwise from the top-left:
/// top-left, top-right, bottom-right, bottom-left.
///
/// The fixed-size array makes three- or five-point "quadrilaterals"
/// unrepresentable. Construction through [`Quadrilateral::from_unordered`]
/// establishes the ordering; [`Quadrilateral::from_ordered`] trusts the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    corners: [Corner; 4],
}

impl Quadrilateral {
    /// Wrap four corners that are already in clockwise order from top-left.
    pub const fn from_ordered(corners: [Corner; 4]) -> Self {
        Self { corners }
    }

    /// Sort four arbitrary points into clockwise order from top-left.
    pub fn from_unordered(points: [Corner; 4]) -> Self {
        Self {
            corners: order_corners(points),
        }
    }

    /// Axis-aligned rectangle spanning `(left, top)` to `(right, bottom)`.
    pub fn axis_aligned(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::from_ordered([
            Corner::new(left, top),
            Corner::new(right, top),
            Corner::new(right, bottom),
            Corner::new(left, bottom),
        ])
    }

    pub fn corners(&self) -> &[Corner; 4] {
        &self.corners
    }

    pub fn corner(&self, index: usize) -> Corner {
        self.corners[index]
    }

    /// Replace one corner, leaving the other three untouched.
    pub fn set_corner(&mut self, index: usize, corner: Corner) {
        self.corners[index] = corner;
    }

    pub fn top_left(&self) -> Corner {
        self.corners[TOP_LEFT]
    }

    pub fn top_right(&self) -> Corner {
        self.corners[TOP_RIGHT]
    }

    pub fn bottom_right(&self) -> Corner {
        self.corners[BOTTOM_RIGHT]
    }

    pub fn bottom_left(&self) -> Corner {
        self.corners[BOTTOM_LEFT]
    }

    /// Side lengths in order: top, right, bottom, left.
    pub fn side_lengths(&self) -> [f64; 4] {
        let c = &self.corners;
        [
            c[0].distance(&c[1]),
            c[1].distance(&c[2]),
            c[2].distance(&c[3]),
            c[3].distance(&c[0]),
        ]
    }

    pub fn perimeter(&self) -> f64 {
        self.side_lengths().iter().sum()
    }

    /// Unsigned area via the shoelace formula.
    pub fn area(&self) -> f64 {
        shoelace_area(&self.corners)
    }

    /// Mean of the four corners.
    pub fn centroid(&self) -> Corner {
        centroid(&self.corners)
    }

    /// All turns go the same way and no three consecutive corners are collinear.
    pub fn is_convex(&self) -> bool {
        let mut sign = 0.0f64;
        for i in 0..4 {
            let cross = turn(&self.corners[i], &self.corners[(i + 1) % 4], &self.corners[(i + 2) % 4]);
            if cross.abs() < 1e-9 {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Interior angle at each corner, in degrees.
    pub fn interior_angles(&self) -> [f64; 4] {
        let mut angles = [0.0; 4];
        for (i, angle) in angles.iter_mut().enumerate() {
            let prev = self.corners[(i + 3) % 4];
            let here = self.corners[i];
            let next = self.corners[(i + 1) % 4];
            let (ax, ay) = ((prev.x - here.x) as f64, (prev.y - here.y) as f64);
            let (bx, by) = ((next.x - here.x) as f64, (next.y - here.y) as f64);
            let norm = (ax.hypot(ay)) * (bx.hypot(by));
            *angle = if norm < f64::EPSILON {
                0.0
            } else {
                ((ax * bx + ay * by) / norm).clamp(-1.0, 1.0).acos().to_degrees()
            };
        }
        angles
    }

    /// Ratios top/bottom and left/right. Infinite when a side has zero length.
    pub fn opposite_side_ratios(&self) -> (f64, f64) {
        let [top, right, bottom, left] = self.side_lengths();
        (ratio(top, bottom), ratio(left, right))
    }

    /// Why this quadrilateral cannot be warped, if it cannot.
    ///
    /// Catches coincident corners, sides shorter than `min_side`, collinear
    /// triples, and near-zero area.
    pub fn degeneracy(&self, min_side: f64) -> Option<String> {
        if self.corners.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Some("non-finite corner coordinate".into());
        }
        for i in 0..4 {
            for j in (i + 1)..4 {
                if self.corners[i].distance(&self.corners[j]) < 1e-3 {
                    return Some(format!("corners {i} and {j} coincide"));
                }
            }
        }
        let sides = self.side_lengths();
        if let Some(shortest) = sides.iter().copied().reduce(f64::min) {
            if shortest < min_side {
                return Some(format!("shortest side {shortest:.2}px is below {min_side:.2}px"));
            }
        }
        for i in 0..4 {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            let c = self.corners[(i + 2) % 4];
            let span = a.distance(&b) * b.distance(&c);
            if span > 0.0 && (turn(&a, &b, &c).abs() / span) < 1e-3 {
                return Some(format!("corners {i}, {}, {} are collinear", (i + 1) % 4, (i + 2) % 4));
            }
        }
        if self.area() < min_side * min_side {
            return Some(format!("area {:.2}px^2 is too small", self.area()));
        }
        None
    }

    /// Same shape with every coordinate multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self::from_ordered(self.corners.map(|c| c.scaled(factor)))
    }

    /// Corner coordinates as `(x, y)` tuples, the form the warp API takes.
    pub fn to_tuples(&self) -> [(f32, f32); 4] {
        self.corners.map(|c| (c.x, c.y))
    }
}

/// Order four points clockwise starting at the top-left.
///
/// Points are sorted by their angle around the centroid (clockwise on screen,
/// where y grows downwards). The cycle then starts at the point in the
/// centroid's upper-left quadrant; for rotations where that is ambiguous, the
/// point with the smallest `x + y` wins, then the smallest `y`. The result
/// depends only on the set of points, never on their input order.
pub fn order_corners(points: [Corner; 4]) -> [Corner; 4] {
    let center = centroid(&points);
    let mut sorted = points;
    sorted.sort_by(|a, b| {
        let angle_a = ((a.y - center.y) as f64).atan2((a.x - center.x) as f64);
        let angle_b = ((b.y - center.y) as f64).atan2((b.x - center.x) as f64);
        angle_a
            .total_cmp(&angle_b)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    });

    let in_upper_left: Vec<usize> = (0..4)
        .filter(|&i| sorted[i].x < center.x && sorted[i].y < center.y)
        .collect();
    let start = if in_upper_left.len() == 1 {
        in_upper_left[0]
    } else {
        (0..4)
            .min_by(|&i, &j| {
                let (a, b) = (sorted[i], sorted[j]);
                (a.x + a.y)
                    .total_cmp(&(b.x + b.y))
                    .then(a.y.total_cmp(&b.y))
                    .then(a.x.total_cmp(&b.x))
            })
            .unwrap_or(0)
    };
    sorted.rotate_left(start);
    sorted
}

/// Unsigned polygon area via the shoelace formula.
pub fn shoelace_area(points: &[Corner]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x as f64 * points[j].y as f64;
        area -= points[j].x as f64 * points[i].y as f64;
    }
    area.abs() / 2.0
}

fn centroid(points: &[Corner; 4]) -> Corner {
    let (sx, sy) = points
        .iter()
        .fold((0.0f64, 0.0f64), |(sx, sy), c| (sx + c.x as f64, sy + c.y as f64));
    Corner::new((sx / 4.0) as f32, (sy / 4.0) as f32)
}

/// Z component of (b - a) x (c - b).
fn turn(a: &Corner, b: &Corner, c: &Corner) -> f64 {
    let (abx, aby) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let (bcx, bcy) = ((c.x - b.x) as f64, (c.y - b.y) as f64);
    abx * bcy - aby * bcx
}

fn ratio(a: f64, b: f64) -> f64 {
    if b <= f64::EPSILON { f64::INFINITY } else { a / b }
}
