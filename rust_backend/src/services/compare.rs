//! Change detection between a baseline and a comparison period.
//!
//! Trackways are compared by existence and overlap, not by geometric delta:
//! every baseline trackway is buffered into a tolerance corridor, and each
//! comparison trackway is either `modified` (it touches some corridor) or
//! `new`. Baseline trackways touched by nothing are `abandoned`.
//!
//! The intensity-change grid rasterises both periods onto a shared north-up
//! grid and reports `period2 - period1` per cell.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::algorithms::buffer::CorridorSet;
use crate::core::domain::{ChangeSummary, Trackway, TrackwayId};
use crate::core::geometry::{Point2, Polyline};
use crate::raster::GeoTransform;

/// Vertices per quarter circle in corridor end caps.
pub const DEFAULT_QUADRANT_SEGMENTS: usize = 8;

/// Classify trackways of two periods with the default corridor resolution.
pub fn compare_trackways(
    period1: &[Trackway],
    period2: &[Trackway],
    buffer_distance: f64,
) -> ChangeSummary {
    TemporalDiff::new(buffer_distance, DEFAULT_QUADRANT_SEGMENTS).compare(period1, period2)
}

/// Corridor-based temporal diff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalDiff {
    pub buffer_distance: f64,
    pub quadrant_segments: usize,
}

impl TemporalDiff {
    pub fn new(buffer_distance: f64, quadrant_segments: usize) -> Self {
        Self {
            buffer_distance,
            quadrant_segments,
        }
    }

    pub fn compare(&self, period1: &[Trackway], period2: &[Trackway]) -> ChangeSummary {
        let baseline: Vec<(TrackwayId, Polyline)> =
            period1.iter().map(|t| (t.id, t.polyline())).collect();
        let comparison: Vec<(TrackwayId, Polyline)> =
            period2.iter().map(|t| (t.id, t.polyline())).collect();
        self.compare_lines(&baseline, &comparison)
    }

    /// Same classification over bare id/polyline pairs.
    pub fn compare_lines(
        &self,
        period1: &[(TrackwayId, Polyline)],
        period2: &[(TrackwayId, Polyline)],
    ) -> ChangeSummary {
        let baseline_ids: BTreeSet<TrackwayId> = period1.iter().map(|(id, _)| *id).collect();

        if period1.is_empty() {
            return ChangeSummary {
                new: unique_sorted(period2.iter().map(|(id, _)| *id)),
                ..ChangeSummary::default()
            };
        }
        if period2.is_empty() {
            return ChangeSummary {
                abandoned: baseline_ids.into_iter().collect(),
                ..ChangeSummary::default()
            };
        }

        let corridors = CorridorSet::build(
            period1.iter().map(|(id, line)| (*id, line)),
            self.buffer_distance,
            self.quadrant_segments,
        );

        let mut new = BTreeSet::new();
        let mut modified = BTreeSet::new();
        let mut retained = BTreeSet::new();

        for (id, line) in period2 {
            let matched = corridors.matching_ids(line);
            if matched.is_empty() {
                new.insert(*id);
            } else {
                modified.insert(*id);
                retained.extend(matched);
            }
        }

        let abandoned: Vec<TrackwayId> = baseline_ids.difference(&retained).copied().collect();

        log::info!(
            "Temporal diff: {} new, {} modified, {} abandoned (buffer {})",
            new.len(),
            modified.len(),
            abandoned.len(),
            self.buffer_distance
        );

        ChangeSummary {
            new: new.into_iter().collect(),
            abandoned,
            modified: modified.into_iter().collect(),
            retained: retained.into_iter().collect(),
        }
    }
}

fn unique_sorted(ids: impl Iterator<Item = TrackwayId>) -> Vec<TrackwayId> {
    ids.collect::<BTreeSet<_>>().into_iter().collect()
}

/// Signed per-cell change in trackway count between two periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityGrid {
    pub width: usize,
    pub height: usize,
    pub cell_size: f64,
    pub transform: GeoTransform,
    /// Row-major, row 0 at the northern edge.
    pub cells: Vec<i64>,
}

impl IntensityGrid {
    pub fn get(&self, row: usize, col: usize) -> Option<i64> {
        if row < self.height && col < self.width {
            Some(self.cells[row * self.width + col])
        } else {
            None
        }
    }

    /// Net change summed over the grid.
    pub fn total(&self) -> i64 {
        self.cells.iter().sum()
    }

    pub fn gained_cells(&self) -> usize {
        self.cells.iter().filter(|&&v| v > 0).count()
    }

    pub fn lost_cells(&self) -> usize {
        self.cells.iter().filter(|&&v| v < 0).count()
    }

    /// Lower-left corner, as ESRI grids expect.
    pub fn lower_left(&self) -> Point2 {
        Point2::new(
            self.transform.origin_x,
            self.transform.origin_y - self.height as f64 * self.cell_size,
        )
    }
}

/// Cell grid over a bounding box, rows running south from `max_y`.
struct GridFrame {
    min_x: f64,
    max_y: f64,
    cell: f64,
    width: usize,
    height: usize,
}

impl GridFrame {
    fn to_grid(&self, p: &Point2) -> (f64, f64) {
        ((p.x - self.min_x) / self.cell, (self.max_y - p.y) / self.cell)
    }

    fn clamp_col(&self, v: f64) -> i64 {
        (v.floor() as i64).clamp(0, self.width as i64 - 1)
    }

    fn clamp_row(&self, v: f64) -> i64 {
        (v.floor() as i64).clamp(0, self.height as i64 - 1)
    }

    /// Cells the segment `[a, b]` passes through, by grid traversal.
    ///
    /// The start cell is always included. A segment that ends exactly on a
    /// cell boundary does not enter the cell beyond it.
    fn touched_cells(&self, a: &Point2, b: &Point2, out: &mut BTreeSet<(usize, usize)>) {
        let (x0, y0) = self.to_grid(a);
        let (x1, y1) = self.to_grid(b);

        let mut col = self.clamp_col(x0);
        let mut row = self.clamp_row(y0);

        let dx = x1 - x0;
        let dy = y1 - y0;
        let step_col: i64 = if dx > 0.0 { 1 } else { -1 };
        let step_row: i64 = if dy > 0.0 { 1 } else { -1 };

        let next_boundary = |cell: i64, step: i64| {
            if step > 0 {
                (cell + 1) as f64
            } else {
                cell as f64
            }
        };
        let mut t_max_col = if dx != 0.0 {
            (next_boundary(col, step_col) - x0) / dx
        } else {
            f64::INFINITY
        };
        let mut t_max_row = if dy != 0.0 {
            (next_boundary(row, step_row) - y0) / dy
        } else {
            f64::INFINITY
        };
        let t_delta_col = if dx != 0.0 { (1.0 / dx).abs() } else { f64::INFINITY };
        let t_delta_row = if dy != 0.0 { (1.0 / dy).abs() } else { f64::INFINITY };

        let last_col = self.width as i64 - 1;
        let last_row = self.height as i64 - 1;
        out.insert((row as usize, col as usize));

        for _ in 0..(self.width + self.height) {
            let t = t_max_col.min(t_max_row);
            if t >= 1.0 {
                break;
            }
            if t_max_col <= t {
                col = (col + step_col).clamp(0, last_col);
                t_max_col += t_delta_col;
            }
            if t_max_row <= t {
                row = (row + step_row).clamp(0, last_row);
                t_max_row += t_delta_row;
            }
            out.insert((row as usize, col as usize));
        }
    }

    /// Count, per cell, how many lines touch it.
    fn rasterize(&self, lines: &[Polyline]) -> Vec<i64> {
        let mut cells = vec![0i64; self.width * self.height];
        for line in lines {
            let mut touched = BTreeSet::new();
            if line.len() == 1 {
                let v = line.vertices[0];
                self.touched_cells(&v, &v, &mut touched);
            }
            for (a, b) in line.segments() {
                self.touched_cells(&a, &b, &mut touched);
            }
            for (row, col) in touched {
                cells[row * self.width + col] += 1;
            }
        }
        cells
    }
}

/// Intensity-change grid for two sets of trackways.
///
/// `None` when both periods are empty, when either grid dimension rounds to
/// zero, or when `cell_size` is not positive.
pub fn intensity_change_grid(
    period1: &[Trackway],
    period2: &[Trackway],
    cell_size: f64,
) -> Option<IntensityGrid> {
    let lines1: Vec<Polyline> = period1.iter().map(Trackway::polyline).collect();
    let lines2: Vec<Polyline> = period2.iter().map(Trackway::polyline).collect();
    intensity_change_grid_for_lines(&lines1, &lines2, cell_size)
}

pub fn intensity_change_grid_for_lines(
    period1: &[Polyline],
    period2: &[Polyline],
    cell_size: f64,
) -> Option<IntensityGrid> {
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return None;
    }

    let bounds = period1
        .iter()
        .chain(period2.iter())
        .filter_map(Polyline::bounds)
        .reduce(|a, b| a.union(&b))?;

    let width = (bounds.width() / cell_size).ceil() as usize;
    let height = (bounds.height() / cell_size).ceil() as usize;
    if width == 0 || height == 0 {
        log::warn!("Intensity grid extent collapses to {}x{} cells", width, height);
        return None;
    }

    let frame = GridFrame {
        min_x: bounds.min_x,
        max_y: bounds.max_y,
        cell: cell_size,
        width,
        height,
    };
    let grid1 = frame.rasterize(period1);
    let grid2 = frame.rasterize(period2);
    let cells = grid2.iter().zip(&grid1).map(|(b, a)| b - a).collect();

    Some(IntensityGrid {
        width,
        height,
        cell_size,
        transform: GeoTransform::north_up(bounds.min_x, bounds.max_y, cell_size),
        cells,
    })
}
