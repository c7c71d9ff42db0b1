//! Planar geometry kernel shared by the analysis stages.

use serde::{Deserialize, Serialize};

pub const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn sub(&self, other: &Point2) -> Point2 {
        Point2::new(self.x - other.x, self.y - other.y)
    }

    pub fn add(&self, other: &Point2) -> Point2 {
        Point2::new(self.x + other.x, self.y + other.y)
    }

    pub fn scale(&self, factor: f64) -> Point2 {
        Point2::new(self.x * factor, self.y * factor)
    }

    pub fn dot(&self, other: &Point2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn cross(&self, other: &Point2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BoundingBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn expand(&self, margin: f64) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Ordered sequence of vertices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline {
    pub vertices: Vec<Point2>,
}

impl Polyline {
    pub fn new(vertices: Vec<Point2>) -> Self {
        Self { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        self.vertices.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn length(&self) -> f64 {
        self.segments().map(|(a, b)| a.distance(&b)).sum()
    }

    pub fn end_to_end(&self) -> f64 {
        match (self.vertices.first(), self.vertices.last()) {
            (Some(a), Some(b)) => a.distance(b),
            _ => 0.0,
        }
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }

    /// Mean of the vertex coordinates.
    pub fn vertex_centroid(&self) -> Option<Point2> {
        if self.vertices.is_empty() {
            return None;
        }
        let n = self.vertices.len() as f64;
        let sum = self
            .vertices
            .iter()
            .fold(Point2::new(0.0, 0.0), |acc, p| acc.add(p));
        Some(sum.scale(1.0 / n))
    }

    /// Smallest distance from `point` to any segment (or the lone vertex).
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        match self.vertices.len() {
            0 => f64::INFINITY,
            1 => self.vertices[0].distance(point),
            _ => self
                .segments()
                .map(|(a, b)| point_segment_distance(point, &a, &b))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Point at arc-length `distance` from the start, clamped to the ends.
    pub fn interpolate(&self, distance: f64) -> Option<Point2> {
        let first = *self.vertices.first()?;
        if distance <= 0.0 {
            return Some(first);
        }
        let mut walked = 0.0;
        for (a, b) in self.segments() {
            let seg = a.distance(&b);
            if walked + seg >= distance && seg > 0.0 {
                let t = (distance - walked) / seg;
                return Some(a.add(&b.sub(&a).scale(t)));
            }
            walked += seg;
        }
        self.vertices.last().copied()
    }

    /// True when any segment of `self` crosses or touches any segment of `other`.
    pub fn intersects(&self, other: &Polyline) -> bool {
        self.segments().any(|(a, b)| {
            other
                .segments()
                .any(|(c, d)| segments_intersect(&a, &b, &c, &d))
        })
    }
}

/// Distance from `p` to the closed segment `[a, b]`.
pub fn point_segment_distance(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b.sub(a);
    let len_sq = ab.dot(&ab);
    if len_sq <= EPSILON {
        return p.distance(a);
    }
    let t = (p.sub(a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    p.distance(&a.add(&ab.scale(t)))
}

fn orientation(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    b.sub(a).cross(&c.sub(a))
}

fn on_segment(a: &Point2, b: &Point2, p: &Point2, margin: f64) -> bool {
    p.x >= a.x.min(b.x) - margin
        && p.x <= a.x.max(b.x) + margin
        && p.y >= a.y.min(b.y) - margin
        && p.y <= a.y.max(b.y) + margin
}

/// Closed segment intersection test, collinear overlaps included.
///
/// Orientation tolerances grow with coordinate magnitude and segment length,
/// so projected coordinates in the millions behave like small ones.
pub fn segments_intersect(a: &Point2, b: &Point2, c: &Point2, d: &Point2) -> bool {
    let magnitude = [a, b, c, d]
        .iter()
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(1.0, f64::max);
    let margin = EPSILON * magnitude;
    let tol = margin * (a.distance(b) + c.distance(d)).max(1.0);

    let d1 = orientation(c, d, a);
    let d2 = orientation(c, d, b);
    let d3 = orientation(a, b, c);
    let d4 = orientation(a, b, d);

    if ((d1 > tol && d2 < -tol) || (d1 < -tol && d2 > tol))
        && ((d3 > tol && d4 < -tol) || (d3 < -tol && d4 > tol))
    {
        return true;
    }

    (d1.abs() <= tol && on_segment(c, d, a, margin))
        || (d2.abs() <= tol && on_segment(c, d, b, margin))
        || (d3.abs() <= tol && on_segment(a, b, c, margin))
        || (d4.abs() <= tol && on_segment(a, b, d, margin))
}

/// Shortest distance between two closed segments.
pub fn segment_segment_distance(a: &Point2, b: &Point2, c: &Point2, d: &Point2) -> f64 {
    if segments_intersect(a, b, c, d) {
        return 0.0;
    }
    point_segment_distance(a, c, d)
        .min(point_segment_distance(b, c, d))
        .min(point_segment_distance(c, a, b))
        .min(point_segment_distance(d, a, b))
}

/// Even-odd point-in-polygon test; points on the boundary count as inside.
pub fn point_in_ring(point: &Point2, ring: &[Point2]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let n = ring.len();
    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        if point_segment_distance(point, a, b) <= EPSILON {
            return true;
        }
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (&ring[i], &ring[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Discrete Hausdorff distance between the vertices of `a` and the segments of `b`, symmetrised.
pub fn hausdorff_distance(a: &Polyline, b: &Polyline) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let directed = |from: &Polyline, to: &Polyline| {
        from.vertices
            .iter()
            .map(|p| to.distance_to_point(p))
            .fold(0.0_f64, f64::max)
    };
    Some(directed(a, b).max(directed(b, a)))
}
