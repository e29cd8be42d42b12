//! Adapter to the geospatial imagery backend
//!
//! Queries are built in two phases. [`query`] and the [`Query`] builder describe
//! what to fetch and how to reduce it without touching the backend; the resulting
//! [`QuerySpec`] is handed to [`Backend::execute`], the only suspending operation.
//! This keeps aggregation logic testable against a fake `execute`.
//!
//! # Components
//!
//! - [`query`] - Query specification types and builders
//! - [`memory`] - In-process backend over a catalog of exported scenes
//! - [`retry`] - Timeout and retry-with-backoff wrapper for any backend

pub mod memory;
pub mod query;
pub mod retry;

#[cfg(test)]
pub mod tests;

pub use memory::{CollectionData, MemoryBackend, Scene};
pub use query::{
    BandRescale, PropertyFilter, Query, QueryResult, QuerySpec, Reduction, SpatialParams, query,
};
pub use retry::{RetryPolicy, RetryingBackend};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A geospatial backend able to evaluate query specifications
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn execute(&self, spec: &QuerySpec) -> Result<QueryResult>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn execute(&self, spec: &QuerySpec) -> Result<QueryResult> {
        (**self).execute(spec).await
    }
}
