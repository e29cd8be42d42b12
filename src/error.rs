//! Error handling for analysis operations.
//!
//! Validation errors (window, region, band) are fatal for a run. Missing imagery is
//! reported inline for monthly series and as [`AnalysisError::MissingData`] for
//! composites, which the pipeline records instead of aborting.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("No imagery in {collection} for {start} .. {end}")]
    MissingData {
        collection: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Invalid time window {start} .. {end}: {reason}")]
    InvalidWindow {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    #[error("Invalid region: {reason}")]
    InvalidRegion { reason: String },

    #[error("Backend unavailable after {attempts} attempt(s): {reason}")]
    BackendUnavailable { attempts: usize, reason: String },

    #[error("Unsupported band '{band}' in {collection}: {reason}")]
    UnsupportedBand {
        collection: String,
        band: String,
        reason: String,
    },

    #[error("Backend rejected query on {collection}: {reason}")]
    Backend { collection: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Catalog error in {path}: {reason}")]
    Catalog { path: PathBuf, reason: String },

    #[error("Analysis cancelled: {reason}")]
    Cancelled { reason: String },
}

impl AnalysisError {
    pub fn missing_data(collection: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self::MissingData {
            collection: collection.into(),
            start,
            end,
        }
    }

    pub fn invalid_window(start: NaiveDate, end: NaiveDate, reason: impl Into<String>) -> Self {
        Self::InvalidWindow {
            start,
            end,
            reason: reason.into(),
        }
    }

    pub fn invalid_region(reason: impl Into<String>) -> Self {
        Self::InvalidRegion {
            reason: reason.into(),
        }
    }

    pub fn backend_unavailable(attempts: usize, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            attempts,
            reason: reason.into(),
        }
    }

    pub fn unsupported_band(
        collection: impl Into<String>,
        band: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnsupportedBand {
            collection: collection.into(),
            band: band.into(),
            reason: reason.into(),
        }
    }

    pub fn backend(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn catalog(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Catalog {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Transient backend failures are the only errors worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }

    /// Errors that invalidate the whole run rather than a single output
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MissingData { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
