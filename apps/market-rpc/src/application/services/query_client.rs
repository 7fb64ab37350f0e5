//! Market Query Client
//!
//! Validates a query, wraps it in a request envelope, performs one transport
//! round trip and unwraps the `data` payload. All three operations share
//! [`MarketQueryClient::execute`]; they differ only in their
//! [`OperationKind`].

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::application::ports::MarketHistoryTransport;
use crate::domain::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::domain::query::{OperationKind, QueryOptions, QueryParameters, QueryRequest};
use crate::domain::time::{TimeInput, TimeNormalizer};
use crate::error::MarketQueryError;
use crate::infrastructure::metrics;

/// Client for the market-history service.
///
/// Holds no per-call state; calls may run concurrently.
#[derive(Debug, Clone)]
pub struct MarketQueryClient<T> {
    transport: T,
    normalizer: TimeNormalizer,
}

impl<T: MarketHistoryTransport> MarketQueryClient<T> {
    /// Create a client using the default (`Asia/Shanghai`) time zone.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            normalizer: TimeNormalizer::default(),
        }
    }

    /// Use `normalizer` for date-string bounds.
    #[must_use]
    pub const fn with_normalizer(mut self, normalizer: TimeNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Time normalizer in use.
    pub const fn normalizer(&self) -> &TimeNormalizer {
        &self.normalizer
    }

    /// Fetch klines for `[start_time, end_time]`.
    #[allow(clippy::too_many_arguments)]
    pub async fn market_kline(
        &self,
        exchange: &str,
        account_type: &str,
        symbol: &str,
        interval_seconds: i64,
        start_time: impl Into<TimeInput> + Send,
        end_time: impl Into<TimeInput> + Send,
        options: QueryOptions,
    ) -> Result<Vec<Value>, MarketQueryError> {
        let request = QueryRequest::kline(
            exchange,
            account_type,
            symbol,
            interval_seconds,
            start_time,
            end_time,
        )
        .with_options(options);
        self.execute(&request).await
    }

    /// Fetch aggregated trades for `[start_time, end_time]`.
    pub async fn market_aggtrade(
        &self,
        exchange: &str,
        account_type: &str,
        symbol: &str,
        start_time: impl Into<TimeInput> + Send,
        end_time: impl Into<TimeInput> + Send,
        options: QueryOptions,
    ) -> Result<Vec<Value>, MarketQueryError> {
        let request = QueryRequest::agg_trade(exchange, account_type, symbol, start_time, end_time)
            .with_options(options);
        self.execute(&request).await
    }

    /// Fetch order-book snapshots.
    ///
    /// Unset bounds are sent as 0 and a reversed range is passed through.
    pub async fn market_orderbook(
        &self,
        exchange: &str,
        account_type: &str,
        symbol: &str,
        time_range: Option<(TimeInput, TimeInput)>,
        options: QueryOptions,
    ) -> Result<Vec<Value>, MarketQueryError> {
        let mut request = QueryRequest::order_book(exchange, account_type, symbol);
        if let Some((start_time, end_time)) = time_range {
            request = request.with_time_range(start_time, end_time);
        }
        self.execute(&request.with_options(options)).await
    }

    /// Run any query.
    ///
    /// Returns a one-element sequence holding the response's `data` value.
    /// Validation failures are returned before the transport is touched.
    pub async fn execute(&self, request: &QueryRequest) -> Result<Vec<Value>, MarketQueryError> {
        let operation = request.operation();
        let result = self.execute_inner(request).await;

        let outcome = metrics::outcome_label(result.as_ref().map(|_| ()));
        metrics::record_query(operation, outcome);
        if let Err(ref e) = result {
            warn!(
                operation = operation.as_str(),
                error_kind = outcome,
                error = %e,
                "Market query failed"
            );
        }

        result
    }

    async fn execute_inner(&self, request: &QueryRequest) -> Result<Vec<Value>, MarketQueryError> {
        let operation = request.operation();
        let params = request.validate(&self.normalizer)?;
        let envelope =
            RequestEnvelope::encode(request.type_tag(), &params).map_err(MarketQueryError::Encode)?;

        log_request(operation, &envelope.type_tag, &params);

        let started = Instant::now();
        let response = self
            .transport
            .query_data(envelope, request.options().call.clone())
            .await;
        let elapsed = started.elapsed();
        metrics::record_query_duration(operation, elapsed);

        let response = response?;

        log_response(operation, params.debug, &response, elapsed);

        Ok(response.into_rows()?)
    }
}

fn log_response(
    operation: OperationKind,
    verbose: bool,
    response: &ResponseEnvelope,
    elapsed: Duration,
) {
    if verbose {
        info!(
            operation = operation.as_str(),
            code = response.code,
            msg = %response.msg,
            success = response.success,
            response_type = %response.type_tag,
            payload_bytes = response.json_data.len(),
            elapsed_ms = elapsed.as_millis(),
            "Received market query response"
        );
    } else {
        debug!(
            operation = operation.as_str(),
            code = response.code,
            msg = %response.msg,
            success = response.success,
            response_type = %response.type_tag,
            payload_bytes = response.json_data.len(),
            elapsed_ms = elapsed.as_millis(),
            "Received market query response"
        );
    }
}

fn log_request(operation: OperationKind, type_tag: &str, params: &QueryParameters) {
    if params.debug {
        info!(
            operation = operation.as_str(),
            request_type = type_tag,
            exchange = %params.exchange,
            account_type = %params.account_type,
            symbol = %params.symbol,
            start_time = params.start_time,
            end_time = params.end_time,
            limit = params.limit,
            "Sending market query"
        );
    } else {
        debug!(
            operation = operation.as_str(),
            request_type = type_tag,
            symbol = %params.symbol,
            start_time = params.start_time,
            end_time = params.end_time,
            limit = params.limit,
            "Sending market query"
        );
    }
}
