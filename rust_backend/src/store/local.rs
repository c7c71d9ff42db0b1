//! In-memory detection store.

use std::sync::{Arc, RwLock};

use super::{DetectionSnapshot, DetectionStore};
use crate::core::domain::DetectionPoint;
use crate::error::AnalysisResult;

/// In-memory append-only detection log.
///
/// Clones share the same underlying log, which makes it convenient for tests
/// that append from one handle and analyse from another.
///
/// # Example
/// ```
/// use chrono::Utc;
/// use trackway_analysis::core::domain::DetectionPoint;
/// use trackway_analysis::store::{DetectionStore, LocalDetectionStore};
///
/// let store = LocalDetectionStore::new();
/// store.append(&DetectionPoint::new(Utc::now(), 0.0, 0.0, 0.9, "deer")).unwrap();
/// assert_eq!(store.len().unwrap(), 1);
/// ```
#[derive(Clone, Default)]
pub struct LocalDetectionStore {
    data: Arc<RwLock<Vec<DetectionPoint>>>,
}

impl LocalDetectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_points(points: Vec<DetectionPoint>) -> Self {
        Self {
            data: Arc::new(RwLock::new(points)),
        }
    }
}

impl DetectionStore for LocalDetectionStore {
    fn append(&self, point: &DetectionPoint) -> AnalysisResult<()> {
        // A poisoned lock still guards a consistent prefix: writes only push.
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.push(point.clone());
        Ok(())
    }

    fn append_batch(&self, points: &[DetectionPoint]) -> AnalysisResult<()> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.extend_from_slice(points);
        Ok(())
    }

    fn snapshot(&self) -> AnalysisResult<DetectionSnapshot> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        Ok(DetectionSnapshot::new(data.clone()))
    }

    fn len(&self) -> AnalysisResult<usize> {
        Ok(self.data.read().unwrap_or_else(|e| e.into_inner()).len())
    }
}
