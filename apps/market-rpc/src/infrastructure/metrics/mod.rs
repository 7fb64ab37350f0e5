//! Query Metrics
//!
//! Records query outcomes and round-trip latency through the `metrics`
//! facade. Installing a recorder or exporter is left to the application;
//! without one every call here is a no-op.
//!
//! # Metrics
//!
//! - `market_rpc_queries_total{operation, outcome}`
//! - `market_rpc_query_duration_seconds{operation}`

use std::sync::Once;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

use crate::domain::query::OperationKind;
use crate::error::MarketQueryError;

static DESCRIBE: Once = Once::new();

/// Register metric descriptions with the installed recorder.
///
/// Call after installing a recorder. Repeated calls are ignored.
pub fn describe_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!(
            "market_rpc_queries_total",
            "Market-history queries by operation and outcome"
        );
        describe_histogram!(
            "market_rpc_query_duration_seconds",
            "Round-trip time of market-history transport calls"
        );
    });
}

/// Label for a finished query.
#[must_use]
pub const fn outcome_label(result: Result<(), &MarketQueryError>) -> &'static str {
    match result {
        Ok(()) => "ok",
        Err(err) => err.kind().as_str(),
    }
}

/// Count a finished query.
pub fn record_query(operation: OperationKind, outcome: &'static str) {
    counter!(
        "market_rpc_queries_total",
        "operation" => operation.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the transport round trip.
pub fn record_query_duration(operation: OperationKind, elapsed: Duration) {
    histogram!(
        "market_rpc_query_duration_seconds",
        "operation" => operation.as_str()
    )
    .record(elapsed.as_secs_f64());
}
