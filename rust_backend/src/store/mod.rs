//! Append-only detection store.
//!
//! The store is the only shared mutable resource of the system. Writers only
//! ever append; readers take a full snapshot at the start of a request and
//! work from that snapshot for the rest of it, so an append racing a read is
//! either fully in the snapshot or not in it at all.
//!
//! # Module Organization
//!
//! - [`local`]: In-memory store for tests and embedding
//! - [`csv_store`]: CSV detection log on disk
//! - [`checksum`]: Snapshot fingerprinting

pub mod checksum;
pub mod csv_store;
pub mod local;

pub use csv_store::CsvDetectionStore;
pub use local::LocalDetectionStore;

use serde::{Deserialize, Serialize};

use crate::core::domain::{DetectionPoint, TimeWindow};
use crate::error::{AnalysisError, AnalysisResult};

/// Storage backend for detection records.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; appends may race snapshots.
pub trait DetectionStore: Send + Sync {
    /// Append a single detection to the end of the log.
    fn append(&self, point: &DetectionPoint) -> AnalysisResult<()>;

    /// Append several detections, preserving their order.
    fn append_batch(&self, points: &[DetectionPoint]) -> AnalysisResult<()> {
        for point in points {
            self.append(point)?;
        }
        Ok(())
    }

    /// Read the full log as it is right now.
    fn snapshot(&self) -> AnalysisResult<DetectionSnapshot>;

    /// Number of records currently in the log.
    fn len(&self) -> AnalysisResult<usize> {
        Ok(self.snapshot()?.points.len())
    }

    fn is_empty(&self) -> AnalysisResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Point-in-time copy of the detection log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSnapshot {
    pub points: Vec<DetectionPoint>,
    /// SHA-256 over the snapshot contents, hex encoded.
    pub checksum: String,
}

impl DetectionSnapshot {
    pub fn new(points: Vec<DetectionPoint>) -> Self {
        let checksum = checksum::snapshot_checksum(&points);
        Self { points, checksum }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points whose timestamp falls in `window`, in log order.
    pub fn within(&self, window: &TimeWindow) -> Vec<DetectionPoint> {
        self.points
            .iter()
            .filter(|p| window.contains(&p.timestamp))
            .cloned()
            .collect()
    }

    /// Like [`within`](Self::within), but an empty window is `DataUnavailable`.
    pub fn require_within(&self, window: &TimeWindow) -> AnalysisResult<Vec<DetectionPoint>> {
        let points = self.within(window);
        if points.is_empty() {
            return Err(AnalysisError::DataUnavailable(format!(
                "no detections in window {:?} .. {:?} ({} in snapshot)",
                window.start,
                window.end,
                self.points.len()
            )));
        }
        Ok(points)
    }
}
