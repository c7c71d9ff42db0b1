//! Tolerance corridors around polylines.
//!
//! A corridor is the Minkowski sum of a polyline with a disc, represented as
//! the union of one capsule per segment. Each capsule is a convex polygon made
//! of the two offset edges and two semicircular caps approximated with
//! `quadrant_segments` edges per quarter circle.
//!
//! Intersection tests run against the capsule polygons, so matching follows the
//! polygonal approximation rather than the exact disc.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::algorithms::spatial_index::GridSpatialIndex;
use crate::core::domain::TrackwayId;
use crate::core::geometry::{
    point_in_ring, segments_intersect, BoundingBox, Point2, Polyline, EPSILON,
};

/// Buffered segment.
#[derive(Debug, Clone)]
pub struct Capsule {
    pub start: Point2,
    pub end: Point2,
    /// Counter-clockwise polygon ring, not closed.
    pub ring: Vec<Point2>,
    pub bounds: BoundingBox,
}

fn arc(center: &Point2, radius: f64, from: f64, to: f64, steps: usize, out: &mut Vec<Point2>) {
    for k in 0..=steps {
        let angle = from + (to - from) * k as f64 / steps as f64;
        out.push(Point2::new(
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
        ));
    }
}

impl Capsule {
    pub fn new(start: Point2, end: Point2, radius: f64, quadrant_segments: usize) -> Self {
        let q = quadrant_segments.max(1);
        let mut ring = Vec::with_capacity(4 * q + 2);

        if radius > 0.0 {
            if start.distance(&end) <= EPSILON {
                // Full circle, last vertex would duplicate the first.
                arc(&start, radius, 0.0, 2.0 * PI, 4 * q, &mut ring);
                ring.pop();
            } else {
                let heading = (end.y - start.y).atan2(end.x - start.x);
                arc(&end, radius, heading - FRAC_PI_2, heading + FRAC_PI_2, 2 * q, &mut ring);
                arc(
                    &start,
                    radius,
                    heading + FRAC_PI_2,
                    heading + 3.0 * FRAC_PI_2,
                    2 * q,
                    &mut ring,
                );
            }
        }

        let bounds = BoundingBox::from_points([&start, &end])
            .map(|b| b.expand(radius.max(0.0)))
            .unwrap_or(BoundingBox {
                min_x: start.x,
                min_y: start.y,
                max_x: start.x,
                max_y: start.y,
            });

        Self {
            start,
            end,
            ring,
            bounds,
        }
    }

    /// True when the closed segment `[a, b]` touches the capsule.
    pub fn touches_segment(&self, a: &Point2, b: &Point2) -> bool {
        if self.ring.len() < 3 {
            return segments_intersect(&self.start, &self.end, a, b);
        }
        if point_in_ring(a, &self.ring) || point_in_ring(b, &self.ring) {
            return true;
        }
        let n = self.ring.len();
        (0..n).any(|i| segments_intersect(&self.ring[i], &self.ring[(i + 1) % n], a, b))
    }
}

/// Buffered polyline belonging to one trackway.
#[derive(Debug, Clone)]
pub struct Corridor {
    pub id: TrackwayId,
    pub capsules: Vec<Capsule>,
}

impl Corridor {
    pub fn new(id: TrackwayId, line: &Polyline, radius: f64, quadrant_segments: usize) -> Self {
        let capsules = match line.len() {
            0 => Vec::new(),
            1 => vec![Capsule::new(
                line.vertices[0],
                line.vertices[0],
                radius,
                quadrant_segments,
            )],
            _ => line
                .segments()
                .map(|(a, b)| Capsule::new(a, b, radius, quadrant_segments))
                .collect(),
        };
        Self { id, capsules }
    }

    pub fn intersects(&self, line: &Polyline) -> bool {
        query_segments(line)
            .any(|(a, b)| self.capsules.iter().any(|c| c.touches_segment(&a, &b)))
    }
}

/// Segments of `line`; a lone vertex is reported as a zero-length segment.
fn query_segments(line: &Polyline) -> Box<dyn Iterator<Item = (Point2, Point2)> + '_> {
    if line.len() == 1 {
        Box::new(std::iter::once((line.vertices[0], line.vertices[0])))
    } else {
        Box::new(line.segments())
    }
}

/// Indexed set of corridors supporting "which corridors does this line hit".
#[derive(Debug, Clone)]
pub struct CorridorSet {
    corridors: Vec<Corridor>,
    /// (corridor, capsule) per indexed item.
    owners: Vec<(usize, usize)>,
    index: GridSpatialIndex,
}

impl CorridorSet {
    pub fn build<'a>(
        lines: impl IntoIterator<Item = (TrackwayId, &'a Polyline)>,
        radius: f64,
        quadrant_segments: usize,
    ) -> Self {
        let corridors: Vec<Corridor> = lines
            .into_iter()
            .map(|(id, line)| Corridor::new(id, line, radius, quadrant_segments))
            .collect();

        let mut owners = Vec::new();
        let mut bounds = Vec::new();
        for (ci, corridor) in corridors.iter().enumerate() {
            for (ki, capsule) in corridor.capsules.iter().enumerate() {
                owners.push((ci, ki));
                bounds.push(capsule.bounds);
            }
        }
        let index = GridSpatialIndex::from_bounds(&bounds);

        Self {
            corridors,
            owners,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.corridors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corridors.is_empty()
    }

    /// Ids of all corridors `line` intersects, ascending and deduplicated.
    pub fn matching_ids(&self, line: &Polyline) -> Vec<TrackwayId> {
        let mut hit = vec![false; self.corridors.len()];
        for (a, b) in query_segments(line) {
            let Some(seg_bounds) = BoundingBox::from_points([&a, &b]) else {
                continue;
            };
            for item in self.index.query(&seg_bounds) {
                let (ci, ki) = self.owners[item];
                if hit[ci] {
                    continue;
                }
                if self.corridors[ci].capsules[ki].touches_segment(&a, &b) {
                    hit[ci] = true;
                }
            }
        }

        let mut ids: Vec<TrackwayId> = hit
            .iter()
            .enumerate()
            .filter(|(_, &h)| h)
            .map(|(ci, _)| self.corridors[ci].id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
