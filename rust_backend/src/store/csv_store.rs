//! CSV detection log.
//!
//! The log keeps the detector's column layout
//! (`timestamp,filename,x_center,y_center,score,label`). Writes open the file
//! in append mode and never rewrite existing rows.
//!
//! A new log is created with its header already in it: the header goes to a
//! staging file that is hard-linked to the log path, and only one writer can
//! win that link. Every writer then appends rows without a header.

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{DetectionSnapshot, DetectionStore};
use crate::core::domain::DetectionPoint;
use crate::error::{AnalysisError, AnalysisResult};
use crate::time::{format_timestamp, parse_timestamp};

const HEADER: [&str; 6] = ["timestamp", "filename", "x_center", "y_center", "score", "label"];

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Create `path` holding only the header, unless it already exists.
fn create_with_header(path: &Path) -> AnalysisResult<()> {
    if path.exists() {
        return Ok(());
    }
    let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
    let staging = path.with_extension(format!("header-{}-{}", std::process::id(), seq));

    let mut writer = csv::Writer::from_path(&staging)?;
    writer.write_record(HEADER)?;
    writer.flush()?;
    drop(writer);

    let linked = fs::hard_link(&staging, path);
    if let Err(e) = fs::remove_file(&staging) {
        log::debug!("Could not remove {}: {}", staging.display(), e);
    }
    match linked {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// One row of the detection log.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DetectionRecord {
    timestamp: String,
    #[serde(default)]
    filename: Option<String>,
    x_center: f64,
    y_center: f64,
    #[serde(default = "default_score")]
    score: f64,
    #[serde(default)]
    label: String,
}

fn default_score() -> f64 {
    1.0
}

impl DetectionRecord {
    fn from_point(point: &DetectionPoint) -> Self {
        Self {
            timestamp: format_timestamp(&point.timestamp),
            filename: point.source.clone(),
            x_center: point.x,
            y_center: point.y,
            score: point.confidence,
            label: point.label.clone(),
        }
    }

    fn into_point(self, row: usize) -> AnalysisResult<DetectionPoint> {
        let timestamp = parse_timestamp(&self.timestamp).map_err(|e| {
            AnalysisError::UpstreamFailure(format!("Bad timestamp at row {}: {}", row, e))
        })?;
        if !(0.0..=1.0).contains(&self.score) {
            return Err(AnalysisError::UpstreamFailure(format!(
                "Confidence {} outside [0, 1] at row {}",
                self.score, row
            )));
        }
        Ok(DetectionPoint {
            timestamp,
            x: self.x_center,
            y: self.y_center,
            confidence: self.score,
            label: self.label,
            source: self.filename.filter(|f| !f.is_empty()),
        })
    }
}

/// Append-only detection log stored as CSV.
#[derive(Debug, Clone)]
pub struct CsvDetectionStore {
    path: PathBuf,
}

impl CsvDetectionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_records(&self, points: &[DetectionPoint]) -> AnalysisResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        create_with_header(&self.path)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        // A pre-existing empty file never got a header.
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for point in points {
            writer.serialize(DetectionRecord::from_point(point))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl DetectionStore for CsvDetectionStore {
    fn append(&self, point: &DetectionPoint) -> AnalysisResult<()> {
        self.write_records(std::slice::from_ref(point))
    }

    fn append_batch(&self, points: &[DetectionPoint]) -> AnalysisResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        self.write_records(points)
    }

    fn snapshot(&self) -> AnalysisResult<DetectionSnapshot> {
        if !self.path.exists() {
            log::warn!(
                "Detections file {} not found; treating the log as empty",
                self.path.display()
            );
            return Ok(DetectionSnapshot::new(Vec::new()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let mut points = Vec::new();
        for (row, record) in reader.deserialize::<DetectionRecord>().enumerate() {
            points.push(record?.into_point(row + 1)?);
        }

        log::debug!(
            "Read {} detections from {}",
            points.len(),
            self.path.display()
        );
        Ok(DetectionSnapshot::new(points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", content).unwrap();
        temp_file
    }

    #[test]
    fn test_read_detector_log() {
        let temp_file = create_temp_csv(
            "timestamp,filename,x_center,y_center,score,label\n\
             2025-09-05 10:00:00,image1.jpg,100,100,0.9,deer\n\
             2025-09-05 10:00:01,image1.jpg,110,110,0.8,deer\n",
        );
        let store = CsvDetectionStore::new(temp_file.path());
        let snapshot = store.snapshot().unwrap();

        assert_eq!(snapshot.points.len(), 2);
        assert_eq!(snapshot.points[1].x, 110.0);
        assert_eq!(snapshot.points[1].confidence, 0.8);
        assert_eq!(snapshot.points[0].source.as_deref(), Some("image1.jpg"));
        assert_eq!(
            snapshot.points[0].timestamp,
            Utc.with_ymd_and_hms(2025, 9, 5, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_optional_columns() {
        let temp_file = create_temp_csv(
            "x_center,y_center,timestamp\n0.5,1.5,2023-01-01 12:00:00\n3.5,1.5,2023-01-01 12:01:00\n",
        );
        let snapshot = CsvDetectionStore::new(temp_file.path()).snapshot().unwrap();
        assert_eq!(snapshot.points.len(), 2);
        assert_eq!(snapshot.points[0].confidence, 1.0);
        assert!(snapshot.points[0].source.is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = CsvDetectionStore::new(dir.path().join("missing.csv"));
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_append_creates_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detections").join("detections.csv");
        let store = CsvDetectionStore::new(&path);

        let point = DetectionPoint::new(
            Utc.with_ymd_and_hms(2025, 9, 5, 10, 0, 0).unwrap(),
            1.0,
            2.0,
            0.7,
            "deer",
        )
        .with_source("img.jpg");
        store.append(&point).unwrap();
        store.append_batch(&[point.clone(), point.clone()]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("timestamp").count(), 1);

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.points.len(), 3);
        assert_eq!(snapshot.points[2], point);
    }

    #[test]
    fn test_concurrent_writers_share_one_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detections.csv");
        let barrier = std::sync::Barrier::new(8);

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = CsvDetectionStore::new(&path);
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    for i in 0..25 {
                        let point = DetectionPoint::new(
                            Utc.timestamp_opt(worker * 100 + i, 0).unwrap(),
                            worker as f64,
                            i as f64,
                            0.5,
                            "deer",
                        );
                        store.append(&point).unwrap();
                    }
                });
            }
        });

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("timestamp").count(), 1);
        assert!(content.starts_with("timestamp,"));
        assert_eq!(CsvDetectionStore::new(&path).snapshot().unwrap().points.len(), 200);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_bad_timestamp_is_upstream_failure() {
        let temp_file = create_temp_csv(
            "timestamp,filename,x_center,y_center,score,label\nnot-a-date,a.jpg,1,1,0.5,deer\n",
        );
        let result = CsvDetectionStore::new(temp_file.path()).snapshot();
        assert!(matches!(result, Err(AnalysisError::UpstreamFailure(_))));
    }

    #[test]
    fn test_bad_number_is_csv_error() {
        let temp_file = create_temp_csv(
            "timestamp,filename,x_center,y_center,score,label\n2025-09-05,a.jpg,abc,1,0.5,deer\n",
        );
        let result = CsvDetectionStore::new(temp_file.path()).snapshot();
        assert!(matches!(result, Err(AnalysisError::Csv(_))));
    }
}
