//! Checksum calculation for detection snapshots.

use sha2::{Digest, Sha256};

use crate::core::domain::DetectionPoint;

/// Calculate a SHA-256 checksum over the ordered snapshot contents.
///
/// Two snapshots share a checksum exactly when they hold the same records in
/// the same order.
///
/// # Returns
/// Hexadecimal string representation of the hash.
pub fn snapshot_checksum(points: &[DetectionPoint]) -> String {
    let mut hasher = Sha256::new();
    for point in points {
        hasher.update(point.timestamp.to_rfc3339().as_bytes());
        hasher.update(b"|");
        hasher.update(point.x.to_bits().to_le_bytes());
        hasher.update(point.y.to_bits().to_le_bytes());
        hasher.update(point.confidence.to_bits().to_le_bytes());
        hasher.update(point.label.as_bytes());
        hasher.update(b"|");
        if let Some(source) = &point.source {
            hasher.update(source.as_bytes());
        }
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
