//! Generation outcome counters.
//!
//! Recorded through the `metrics` facade. With `enable_metrics` set, the recorder installed by
//! `axum-prometheus` exports them at `/internal/metrics`; otherwise they are no-ops.

use crate::errors::Error;
use crate::types::MediaKind;

pub const GENERATIONS_TOTAL: &str = "gemini_gateway_generations_total";

/// Stable label for a pipeline result
pub fn outcome_label<T>(result: &Result<T, Error>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(Error::BadRequest { .. }) => "validation_error",
        Err(Error::EmptyResult) => "empty_result",
        Err(Error::Upstream { .. }) => "upstream_error",
        Err(Error::Io { .. }) => "io_error",
        Err(Error::Other(_)) => "error",
    }
}

pub fn record_generation<T>(kind: MediaKind, result: &Result<T, Error>) {
    metrics::counter!(GENERATIONS_TOTAL, "kind" => kind.as_str(), "outcome" => outcome_label(result)).increment(1);
}
