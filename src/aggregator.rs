//! Monthly aggregation of a pollutant band over the study region
//!
//! Each monthly bucket becomes one backend query: filter the collection to the
//! bucket window and region, take the temporal mean, select the band and reduce it
//! to an areal mean at the configured scale. Buckets are queried concurrently on a
//! bounded pool and reassembled in calendar order.

use crate::backend::{Backend, QuerySpec, query};
use crate::buckets::{Cadence, list_buckets};
use crate::catalog::{BandSpec, Catalog};
use crate::config::ReductionParams;
use crate::error::{AnalysisError, Result};
use crate::models::{AggregatedSample, MonthlyBucket, ReducerKind, Region, TimeWindow};
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::ProgressBar;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ordered monthly samples for one band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySeries {
    pub collection: String,
    pub band: String,
    pub unit: String,
    pub samples: Vec<AggregatedSample>,
}

impl MonthlySeries {
    /// Samples for buckets with no imagery
    pub fn missing(&self) -> Vec<&AggregatedSample> {
        self.samples.iter().filter(|s| s.is_missing()).collect()
    }

    pub fn present_count(&self) -> usize {
        self.samples.len() - self.missing().len()
    }
}

pub struct MonthlyAggregator {
    backend: Arc<dyn Backend>,
    catalog: Arc<Catalog>,
    reduction: ReductionParams,
    workers: usize,
}

impl MonthlyAggregator {
    pub fn new(backend: Arc<dyn Backend>, catalog: Arc<Catalog>) -> Self {
        Self {
            backend,
            catalog,
            reduction: ReductionParams::default(),
            workers: 1,
        }
    }

    pub fn with_reduction(mut self, reduction: ReductionParams) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Query for one bucket; pure, no backend access
    pub fn build_query(
        &self,
        band: &str,
        collection: &str,
        region: &Region,
        bucket: &MonthlyBucket,
    ) -> QuerySpec {
        query(collection, region, bucket.window()).reduce_spatial(
            band,
            ReducerKind::Mean,
            self.reduction.spatial(ReducerKind::Mean),
        )
    }

    /// Areal mean of the monthly mean composite for one bucket
    pub async fn aggregate(
        &self,
        band: &str,
        collection: &str,
        region: &Region,
        bucket: &MonthlyBucket,
    ) -> Result<AggregatedSample> {
        let spec = self.catalog.resolve(collection, band, ReducerKind::Mean)?;
        self.sample(spec, collection, region, bucket).await
    }

    async fn sample(
        &self,
        band: &BandSpec,
        collection: &str,
        region: &Region,
        bucket: &MonthlyBucket,
    ) -> Result<AggregatedSample> {
        let spec = self.build_query(&band.name, collection, region, bucket);
        let value = self
            .backend
            .execute(&spec)
            .await?
            .into_scalar(collection)?;

        match value {
            None => warn!("No {} imagery for {}", band.name, bucket.label()),
            Some(v) if !band.in_valid_range(v) => warn!(
                "{} {} = {} outside plausible range {:?}",
                band.name,
                bucket.label(),
                v,
                band.valid_range
            ),
            Some(v) => debug!("{} {} = {}", band.name, bucket.label(), v),
        }

        Ok(AggregatedSample {
            label: bucket.label(),
            window: bucket.window(),
            value,
        })
    }

    /// Monthly series across `window`, one sample per bucket in calendar order.
    ///
    /// The band and window are validated before any query is issued.
    pub async fn series(
        &self,
        band: &str,
        collection: &str,
        region: &Region,
        window: &TimeWindow,
        progress: Option<&ProgressBar>,
    ) -> Result<MonthlySeries> {
        let spec = self.catalog.resolve(collection, band, ReducerKind::Mean)?;
        let buckets = list_buckets(window, Cadence::Monthly)?;
        info!(
            "Aggregating {} over {} monthly buckets ({} workers)",
            band,
            buckets.len(),
            self.workers
        );

        let mut indexed: Vec<(usize, AggregatedSample)> = stream::iter(buckets.iter().enumerate())
            .map(|(index, bucket)| async move {
                let sample = self.sample(spec, collection, region, bucket).await?;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                Ok::<_, AnalysisError>((index, sample))
            })
            .buffer_unordered(self.workers)
            .try_collect()
            .await?;
        indexed.sort_by_key(|(index, _)| *index);

        let series = MonthlySeries {
            collection: collection.to_string(),
            band: band.to_string(),
            unit: spec.unit.clone(),
            samples: indexed.into_iter().map(|(_, sample)| sample).collect(),
        };

        let missing = series.missing().len();
        if missing > 0 {
            warn!(
                "{}: {} of {} months have no imagery",
                band,
                missing,
                series.samples.len()
            );
        }
        Ok(series)
    }
}
