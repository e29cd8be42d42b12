//! Partitioning of time-series windows into calendar buckets.
//!
//! Bucket counts are derived from integer month arithmetic so that variable month
//! lengths never cause drift. Every bucket is a whole calendar month, so buckets
//! snap outward to month boundaries: a window starting mid-month begins with the
//! whole of that month, and one ending mid-month includes the whole trailing
//! month. Aggregation queries each bucket's full month.

use crate::error::{AnalysisError, Result};
use crate::models::{MonthlyBucket, TimeWindow};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Bucketing cadence for a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    #[default]
    Monthly,
}

/// Number of calendar months touched by a window
pub fn month_count(window: &TimeWindow) -> i64 {
    let start = window.start.year() as i64 * 12 + window.start.month() as i64;
    let end = window.end.year() as i64 * 12 + window.end.month() as i64;
    let partial_tail = if window.end.day() > 1 { 1 } else { 0 };
    end - start + partial_tail
}

/// Ordered, consecutive buckets spanning the window
pub fn list_buckets(window: &TimeWindow, cadence: Cadence) -> Result<Vec<MonthlyBucket>> {
    window.validate()?;

    match cadence {
        Cadence::Monthly => {
            let count = month_count(window);
            if count <= 0 {
                return Err(AnalysisError::invalid_window(
                    window.start,
                    window.end,
                    "window spans zero months",
                ));
            }

            let first = MonthlyBucket::new(window.start.year(), window.start.month())?;
            (0..count)
                .map(|offset| MonthlyBucket::from_ordinal(first.ordinal() + offset))
                .collect()
        }
    }
}

/// Window of the `index`-th month counted from January of `anchor_year`
pub fn bucket_for(index: u32, anchor_year: i32) -> Result<TimeWindow> {
    let anchor = MonthlyBucket::new(anchor_year, 1)?;
    Ok(MonthlyBucket::from_ordinal(anchor.ordinal() + index as i64)?.window())
}
