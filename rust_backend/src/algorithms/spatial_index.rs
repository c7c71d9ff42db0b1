//! Uniform-grid spatial index over bounding boxes.
//!
//! Each item is registered in every cell its bounding box overlaps. Queries
//! return candidate item indices, which callers then test exactly. Items that
//! would span more than [`MAX_CELLS_PER_ITEM`] cells are kept in a side list
//! that every query returns.

use std::collections::{BTreeSet, HashMap};

use crate::core::geometry::BoundingBox;

/// Cap on the number of cells a single item is registered in.
pub const MAX_CELLS_PER_ITEM: i64 = 4096;

type CellKey = (i64, i64);

#[derive(Debug, Clone)]
pub struct GridSpatialIndex {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
    oversized: Vec<usize>,
    bounds: Vec<BoundingBox>,
}

impl GridSpatialIndex {
    /// Create an empty index. Non-positive or non-finite cell sizes fall back to 1.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            oversized: Vec::new(),
            bounds: Vec::new(),
        }
    }

    /// Build an index choosing the cell size from the mean item extent.
    pub fn from_bounds(items: &[BoundingBox]) -> Self {
        let extent = if items.is_empty() {
            1.0
        } else {
            items
                .iter()
                .map(|b| b.width().max(b.height()))
                .sum::<f64>()
                / items.len() as f64
        };
        let mut index = Self::new(extent);
        for bbox in items {
            index.insert(*bbox);
        }
        index
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    fn cell_range(&self, bbox: &BoundingBox) -> (CellKey, CellKey) {
        let lo = (
            (bbox.min_x / self.cell_size).floor() as i64,
            (bbox.min_y / self.cell_size).floor() as i64,
        );
        let hi = (
            (bbox.max_x / self.cell_size).floor() as i64,
            (bbox.max_y / self.cell_size).floor() as i64,
        );
        (lo, hi)
    }

    /// Register an item and return its index.
    pub fn insert(&mut self, bbox: BoundingBox) -> usize {
        let idx = self.bounds.len();
        self.bounds.push(bbox);

        let ((x0, y0), (x1, y1)) = self.cell_range(&bbox);
        let span = (x1 - x0 + 1).saturating_mul(y1 - y0 + 1);
        if span > MAX_CELLS_PER_ITEM || span <= 0 {
            self.oversized.push(idx);
            return idx;
        }

        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(idx);
            }
        }
        idx
    }

    /// Indices of items whose bounding box intersects `bbox`, ascending.
    pub fn query(&self, bbox: &BoundingBox) -> Vec<usize> {
        let mut found: BTreeSet<usize> = BTreeSet::new();

        let ((x0, y0), (x1, y1)) = self.cell_range(bbox);
        let span = (x1 - x0 + 1).saturating_mul(y1 - y0 + 1);
        if span > MAX_CELLS_PER_ITEM || span <= 0 {
            found.extend(0..self.bounds.len());
        } else {
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    if let Some(items) = self.cells.get(&(cx, cy)) {
                        found.extend(items.iter().copied());
                    }
                }
            }
            found.extend(self.oversized.iter().copied());
        }

        found
            .into_iter()
            .filter(|&idx| self.bounds[idx].intersects(bbox))
            .collect()
    }
}
