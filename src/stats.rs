use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::observability::MetricsSnapshot;
use crate::scheduler::{ClipFailure, ClipScore};

/// One scored clip inside the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipRecord {
    pub mean_luma: u32,
    pub label: String,
    pub input_index: usize,
}

/// Cross-video aggregate, ordered by score.
///
/// Every record is retained, duplicates of the same luminosity value
/// included. Ordering ties are resolved by original input position, so the
/// aggregate and the median drawn from it are deterministic.
#[derive(Debug, Default)]
pub struct LumaAggregate {
    records: Vec<ClipRecord>,
}

impl LumaAggregate {
    pub fn collect(scores: &[ClipScore]) -> Self {
        let mut records: Vec<ClipRecord> = scores
            .iter()
            .map(|score| ClipRecord {
                mean_luma: score.mean_luma,
                label: score.label.clone(),
                input_index: score.input_index,
            })
            .collect();
        records.sort_by_key(|record| (record.mean_luma, record.input_index));
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ClipRecord] {
        &self.records
    }

    pub fn min(&self) -> Result<&ClipRecord> {
        self.records.first().ok_or(Error::EmptyAggregate)
    }

    pub fn max(&self) -> Result<&ClipRecord> {
        self.records.last().ok_or(Error::EmptyAggregate)
    }

    /// Truncated integer mean across all records.
    pub fn mean(&self) -> Result<u32> {
        if self.records.is_empty() {
            return Err(Error::EmptyAggregate);
        }
        let sum: u64 = self
            .records
            .iter()
            .map(|record| u64::from(record.mean_luma))
            .sum();
        Ok((sum / self.records.len() as u64) as u32)
    }

    /// The record at position `count / 2` in score order. For an even count
    /// this is the upper of the two middle records, a deliberate departure
    /// from the textbook midpoint average.
    pub fn median(&self) -> Result<&ClipRecord> {
        self.records
            .get(self.records.len() / 2)
            .ok_or(Error::EmptyAggregate)
    }

    pub fn summary(&self) -> Result<LumaSummary> {
        Ok(LumaSummary {
            generated_at: Utc::now(),
            clip_count: self.records.len(),
            mean_luma: self.mean()?,
            min: self.min()?.clone(),
            max: self.max()?.clone(),
            median: self.median()?.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LumaSummary {
    pub generated_at: DateTime<Utc>,
    pub clip_count: usize,
    pub mean_luma: u32,
    pub min: ClipRecord,
    pub max: ClipRecord,
    pub median: ClipRecord,
}

/// Everything a run produced, in one serializable document.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub summary: LumaSummary,
    pub scores: Vec<ClipScore>,
    pub failures: Vec<ClipFailure>,
    pub metrics: MetricsSnapshot,
}
