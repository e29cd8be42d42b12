//! Tests for the backend adapters
//!
//! Shared fixtures: a small 1-degree grid, a region covering its centre and
//! scripted backends that fail or stall on demand.

pub mod memory_tests;

use super::{Backend, QueryResult, QuerySpec};
use crate::error::{AnalysisError, Result};
use crate::models::Region;
use crate::raster::GridSpec;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 4x4 grid of 1-degree cells spanning lon 0..4, lat 0..4
pub fn test_grid() -> GridSpec {
    GridSpec {
        west: 0.0,
        north: 4.0,
        cell_size: 1.0,
        width: 4,
        height: 4,
    }
}

/// Square covering the whole test grid
pub fn test_region() -> Region {
    Region::polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]).unwrap()
}

pub fn constant_cells(value: f64) -> Vec<Option<f64>> {
    vec![Some(value); test_grid().len()]
}

/// Backend that fails with the configured error `failures` times, then answers
pub struct ScriptedBackend {
    failures: usize,
    retryable: bool,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            retryable: true,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            failures: usize::MAX,
            retryable: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn stalling(delay: Duration) -> Self {
        Self {
            failures: 0,
            retryable: true,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, spec: &QuerySpec) -> Result<QueryResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.failures {
            return Err(if self.retryable {
                AnalysisError::backend_unavailable(1, "503 service unavailable")
            } else {
                AnalysisError::backend(spec.collection(), "bad request")
            });
        }
        Ok(QueryResult::Scalar(Some(42.0)))
    }
}
