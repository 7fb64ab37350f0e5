//! Query Parameters and Validation
//!
//! A [`QueryRequest`] holds caller input for one of the three operations.
//! [`QueryRequest::validate`] checks it, normalizes the time bounds and
//! produces the immutable [`QueryParameters`] sent on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::time::{TimeError, TimeInput, TimeNormalizer};
use super::call::CallOptions;

/// Schema tag used when the caller does not supply one.
pub const DEFAULT_SCHEMA: &str = "BINANCE";

/// Smallest accepted row limit.
pub const MIN_LIMIT: i64 = 1;

/// Largest accepted row limit (also the default).
pub const MAX_LIMIT: i64 = 10_000;

// =============================================================================
// Operation Descriptor
// =============================================================================

/// Query operation served by the market-history service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Candlestick series.
    Kline,
    /// Aggregated trade events.
    AggTrade,
    /// Order-book snapshots.
    OrderBook,
}

impl OperationKind {
    /// All operations.
    pub const ALL: [Self; 3] = [Self::Kline, Self::AggTrade, Self::OrderBook];

    /// Request type tag sent when the caller does not override it.
    #[must_use]
    pub const fn default_type_tag(self) -> &'static str {
        match self {
            Self::Kline => "KLINE",
            Self::AggTrade => "AGG_TRADE",
            Self::OrderBook => "ORDER_BOOK",
        }
    }

    /// Short name for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kline => "kline",
            Self::AggTrade => "agg_trade",
            Self::OrderBook => "order_book",
        }
    }

    /// Whether the operation needs `kline_interval_second`.
    #[must_use]
    pub const fn requires_interval(self) -> bool {
        matches!(self, Self::Kline)
    }

    /// Whether the time bounds are mandatory and must be ordered.
    ///
    /// Order-book queries accept unset bounds (sent as 0) and skip the
    /// `start <= end` check.
    #[must_use]
    pub const fn requires_time_range(self) -> bool {
        !matches!(self, Self::OrderBook)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_type_tag())
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Identifier fields that must not be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    /// Exchange name.
    Exchange,
    /// Account type.
    AccountType,
    /// Instrument symbol.
    Symbol,
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exchange => "exchange",
            Self::AccountType => "account type",
            Self::Symbol => "symbol",
        })
    }
}

/// First precondition a query violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required identifier was empty.
    #[error("{0} cannot be empty")]
    EmptyField(RequiredField),

    /// A time bound could not be normalized.
    #[error(transparent)]
    InvalidTime(#[from] TimeError),

    /// The time range is reversed.
    #[error("start time {start} must be less than or equal to end time {end}")]
    StartAfterEnd {
        /// Normalized start (ms).
        start: i64,
        /// Normalized end (ms).
        end: i64,
    },

    /// Kline interval was zero or negative.
    #[error("kline interval second must be greater than 0, got {0}")]
    NonPositiveInterval(i64),

    /// Limit outside `[1, 10000]`.
    #[error("limit must be between 1 and 10000, got {0}")]
    LimitOutOfRange(i64),
}

// =============================================================================
// Query Options
// =============================================================================

/// Optional query settings shared by all operations.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Market family tag.
    pub schema: String,
    /// Request type tag override.
    pub type_tag: Option<String>,
    /// Starting id cursor.
    pub start_id: i64,
    /// Ending id cursor.
    pub end_id: i64,
    /// Maximum number of rows.
    pub limit: i64,
    /// Ascending ordering.
    pub ascending: bool,
    /// Allow the server to compress the payload.
    pub gzip: bool,
    /// Verbose diagnostics for this call.
    pub debug: bool,
    /// Deadline and cancellation forwarded to the transport.
    pub call: CallOptions,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            type_tag: None,
            start_id: 0,
            end_id: 0,
            limit: MAX_LIMIT,
            ascending: true,
            gzip: false,
            debug: false,
            call: CallOptions::default(),
        }
    }
}

impl QueryOptions {
    /// Set the schema tag.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Override the request type tag.
    #[must_use]
    pub fn with_type_tag(mut self, type_tag: impl Into<String>) -> Self {
        self.type_tag = Some(type_tag.into());
        self
    }

    /// Set the id cursors.
    #[must_use]
    pub const fn with_ids(mut self, start_id: i64, end_id: i64) -> Self {
        self.start_id = start_id;
        self.end_id = end_id;
        self
    }

    /// Set the row limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set the ordering.
    #[must_use]
    pub const fn with_ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    /// Set the gzip flag.
    #[must_use]
    pub const fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Enable or disable verbose diagnostics.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set deadline and cancellation for the call.
    #[must_use]
    pub fn with_call_options(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }
}

// =============================================================================
// Query Request
// =============================================================================

/// Caller input for a single query.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    operation: OperationKind,
    exchange: String,
    account_type: String,
    symbol: String,
    interval_seconds: Option<i64>,
    start_time: Option<TimeInput>,
    end_time: Option<TimeInput>,
    options: QueryOptions,
}

impl QueryRequest {
    fn new(
        operation: OperationKind,
        exchange: impl Into<String>,
        account_type: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            exchange: exchange.into(),
            account_type: account_type.into(),
            symbol: symbol.into(),
            interval_seconds: None,
            start_time: None,
            end_time: None,
            options: QueryOptions::default(),
        }
    }

    /// Kline query. The interval is always explicit.
    #[must_use]
    pub fn kline(
        exchange: impl Into<String>,
        account_type: impl Into<String>,
        symbol: impl Into<String>,
        interval_seconds: i64,
        start_time: impl Into<TimeInput>,
        end_time: impl Into<TimeInput>,
    ) -> Self {
        let mut request = Self::new(OperationKind::Kline, exchange, account_type, symbol)
            .with_time_range(start_time, end_time);
        request.interval_seconds = Some(interval_seconds);
        request
    }

    /// Aggregated trade query.
    #[must_use]
    pub fn agg_trade(
        exchange: impl Into<String>,
        account_type: impl Into<String>,
        symbol: impl Into<String>,
        start_time: impl Into<TimeInput>,
        end_time: impl Into<TimeInput>,
    ) -> Self {
        Self::new(OperationKind::AggTrade, exchange, account_type, symbol)
            .with_time_range(start_time, end_time)
    }

    /// Order-book query. Time bounds are optional; see
    /// [`with_time_range`](Self::with_time_range).
    #[must_use]
    pub fn order_book(
        exchange: impl Into<String>,
        account_type: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self::new(OperationKind::OrderBook, exchange, account_type, symbol)
    }

    /// Set both time bounds.
    #[must_use]
    pub fn with_time_range(
        mut self,
        start_time: impl Into<TimeInput>,
        end_time: impl Into<TimeInput>,
    ) -> Self {
        self.start_time = Some(start_time.into());
        self.end_time = Some(end_time.into());
        self
    }

    /// Replace the optional settings.
    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Operation this request targets.
    #[must_use]
    pub const fn operation(&self) -> OperationKind {
        self.operation
    }

    /// Optional settings.
    #[must_use]
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Type tag sent with the request: the override, or the operation default.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        self.options
            .type_tag
            .as_deref()
            .unwrap_or_else(|| self.operation.default_type_tag())
    }

    /// Check every precondition and build the wire parameters.
    ///
    /// Rules run in a fixed order and the first failure is returned:
    /// exchange, account type, symbol, time normalization, range ordering,
    /// kline interval, limit.
    pub fn validate(&self, normalizer: &TimeNormalizer) -> Result<QueryParameters, ValidationError> {
        if self.exchange.is_empty() {
            return Err(ValidationError::EmptyField(RequiredField::Exchange));
        }
        if self.account_type.is_empty() {
            return Err(ValidationError::EmptyField(RequiredField::AccountType));
        }
        if self.symbol.is_empty() {
            return Err(ValidationError::EmptyField(RequiredField::Symbol));
        }

        let start_time = self.normalize_bound(normalizer, self.start_time.as_ref())?;
        let end_time = self.normalize_bound(normalizer, self.end_time.as_ref())?;

        if self.operation.requires_time_range() && start_time > end_time {
            return Err(ValidationError::StartAfterEnd {
                start: start_time,
                end: end_time,
            });
        }

        let interval_seconds = if self.operation.requires_interval() {
            match self.interval_seconds {
                Some(seconds) if seconds > 0 => Some(seconds),
                other => return Err(ValidationError::NonPositiveInterval(other.unwrap_or(0))),
            }
        } else {
            None
        };

        let limit = self.options.limit;
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
            return Err(ValidationError::LimitOutOfRange(limit));
        }

        Ok(QueryParameters {
            schema: self.options.schema.to_uppercase(),
            exchange: self.exchange.to_uppercase(),
            account_type: self.account_type.to_uppercase(),
            symbol: self.symbol.to_uppercase(),
            interval_seconds,
            start_time,
            end_time,
            start_id: self.options.start_id,
            end_id: self.options.end_id,
            limit,
            ascending: self.options.ascending,
            gzip: self.options.gzip,
            debug: self.options.debug,
        })
    }

    fn normalize_bound(
        &self,
        normalizer: &TimeNormalizer,
        bound: Option<&TimeInput>,
    ) -> Result<i64, TimeError> {
        let ranged = self.operation.requires_time_range();
        match bound {
            // Order book treats 0 as "no bound", same as leaving it unset.
            Some(TimeInput::Integer(0)) if !ranged => Ok(0),
            Some(input) => normalizer.normalize(input),
            None if ranged => Err(TimeError::Empty),
            None => Ok(0),
        }
    }
}

// =============================================================================
// Wire Parameters
// =============================================================================

/// Validated query parameters, serialized as the request's JSON payload.
///
/// Identifier fields are upper-cased and time bounds are millisecond epochs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParameters {
    /// Market family tag.
    pub schema: String,
    /// Exchange name.
    pub exchange: String,
    /// Account type.
    pub account_type: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Kline bucket width; present only for kline queries.
    #[serde(
        rename = "kline_interval_second",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub interval_seconds: Option<i64>,
    /// Range start (ms).
    pub start_time: i64,
    /// Range end (ms).
    pub end_time: i64,
    /// Starting id cursor.
    pub start_id: i64,
    /// Ending id cursor.
    pub end_id: i64,
    /// Maximum number of rows.
    pub limit: i64,
    /// Ascending ordering.
    #[serde(rename = "is_asc")]
    pub ascending: bool,
    /// Server may compress the payload.
    #[serde(rename = "is_gzip")]
    pub gzip: bool,
    /// Verbose diagnostics flag.
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const NOON: &str = "2024-11-06 12:00:00";
    const FIVE_PAST: &str = "2024-11-06 12:05:00";

    fn kline() -> QueryRequest {
        QueryRequest::kline("binance", "future", "btcusdt", 1, NOON, FIVE_PAST)
    }

    fn validate(request: &QueryRequest) -> Result<QueryParameters, ValidationError> {
        request.validate(&TimeNormalizer::default())
    }

    #[test]
    fn valid_kline_is_normalized_and_uppercased() {
        let params = validate(&kline()).unwrap();
        assert_eq!(params.schema, "BINANCE");
        assert_eq!(params.exchange, "BINANCE");
        assert_eq!(params.account_type, "FUTURE");
        assert_eq!(params.symbol, "BTCUSDT");
        assert_eq!(params.interval_seconds, Some(1));
        assert_eq!(params.end_time - params.start_time, 300_000);
        assert_eq!(params.limit, MAX_LIMIT);
        assert!(params.ascending);
        assert!(!params.gzip);
        assert!(!params.debug);
    }

    #[test]
    fn empty_exchange_is_rejected() {
        let request = QueryRequest::kline("", "future", "BTCUSDT", 1, NOON, FIVE_PAST);
        assert_eq!(
            validate(&request).unwrap_err(),
            ValidationError::EmptyField(RequiredField::Exchange)
        );
    }

    #[test]
    fn empty_account_type_is_rejected() {
        let request = QueryRequest::agg_trade("BINANCE", "", "BTCUSDT", NOON, FIVE_PAST);
        assert_eq!(
            validate(&request).unwrap_err(),
            ValidationError::EmptyField(RequiredField::AccountType)
        );
    }

    #[test]
    fn empty_symbol_is_rejected() {
        let request = QueryRequest::order_book("BINANCE", "future", "");
        assert_eq!(
            validate(&request).unwrap_err(),
            ValidationError::EmptyField(RequiredField::Symbol)
        );
    }

    #[test]
    fn first_failure_wins() {
        let request = QueryRequest::kline("", "", "", 0, "bad", "bad")
            .with_options(QueryOptions::default().with_limit(0));
        assert_eq!(
            validate(&request).unwrap_err(),
            ValidationError::EmptyField(RequiredField::Exchange)
        );

        let request = QueryRequest::kline("BINANCE", "future", "BTCUSDT", 0, "bad", FIVE_PAST);
        assert!(matches!(
            validate(&request).unwrap_err(),
            ValidationError::InvalidTime(TimeError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn time_errors_propagate_unchanged() {
        let request = QueryRequest::agg_trade("BINANCE", "future", "BTCUSDT", "", FIVE_PAST);
        assert_eq!(
            validate(&request).unwrap_err(),
            ValidationError::InvalidTime(TimeError::Empty)
        );

        let request = QueryRequest::agg_trade("BINANCE", "future", "BTCUSDT", 12_345_i64, FIVE_PAST);
        assert_eq!(
            validate(&request).unwrap_err(),
            ValidationError::InvalidTime(TimeError::InvalidEpoch { value: 12_345 })
        );
    }

    #[test]
    fn reversed_range_is_rejected() {
        let request = QueryRequest::agg_trade("BINANCE", "future", "BTCUSDT", FIVE_PAST, NOON);
        assert!(matches!(
            validate(&request).unwrap_err(),
            ValidationError::StartAfterEnd { .. }
        ));
    }

    #[test]
    fn equal_bounds_are_accepted() {
        let request = QueryRequest::agg_trade("BINANCE", "future", "BTCUSDT", NOON, NOON);
        assert!(validate(&request).is_ok());
    }

    #[test]
    fn mixed_time_units_are_accepted() {
        let request = QueryRequest::agg_trade(
            "BINANCE",
            "future",
            "BTCUSDT",
            1_730_865_600_i64,
            1_730_865_900_000_i64,
        );
        let params = validate(&request).unwrap();
        assert_eq!(params.start_time, 1_730_865_600_000);
        assert_eq!(params.end_time, 1_730_865_900_000);
    }

    #[test_case(0 ; "zero")]
    #[test_case(-60 ; "negative")]
    fn kline_rejects_non_positive_interval(interval: i64) {
        let request = QueryRequest::kline("BINANCE", "future", "BTCUSDT", interval, NOON, FIVE_PAST);
        assert_eq!(
            validate(&request).unwrap_err(),
            ValidationError::NonPositiveInterval(interval)
        );
    }

    #[test]
    fn agg_trade_and_order_book_do_not_need_interval() {
        let agg = validate(&QueryRequest::agg_trade("BINANCE", "future", "BTCUSDT", NOON, FIVE_PAST))
            .unwrap();
        assert_eq!(agg.interval_seconds, None);

        let book = validate(&QueryRequest::order_book("BINANCE", "future", "BTCUSDT")).unwrap();
        assert_eq!(book.interval_seconds, None);
    }

    #[test_case(0, false ; "zero rejected")]
    #[test_case(1, true ; "one accepted")]
    #[test_case(10_000, true ; "max accepted")]
    #[test_case(10_001, false ; "above max rejected")]
    #[test_case(-5, false ; "negative rejected")]
    fn limit_bounds_are_inclusive(limit: i64, accepted: bool) {
        for operation in OperationKind::ALL {
            let request = match operation {
                OperationKind::Kline => kline(),
                OperationKind::AggTrade => {
                    QueryRequest::agg_trade("BINANCE", "future", "BTCUSDT", NOON, FIVE_PAST)
                }
                OperationKind::OrderBook => QueryRequest::order_book("BINANCE", "future", "BTCUSDT"),
            }
            .with_options(QueryOptions::default().with_limit(limit));

            match validate(&request) {
                Ok(params) => {
                    assert!(accepted, "{operation} accepted limit {limit}");
                    assert_eq!(params.limit, limit);
                }
                Err(err) => {
                    assert!(!accepted, "{operation} rejected limit {limit}");
                    assert_eq!(err, ValidationError::LimitOutOfRange(limit));
                }
            }
        }
    }

    #[test]
    fn order_book_tolerates_unset_and_reversed_range() {
        let params = validate(&QueryRequest::order_book("BINANCE", "future", "BTCUSDT")).unwrap();
        assert_eq!(params.start_time, 0);
        assert_eq!(params.end_time, 0);

        let reversed = QueryRequest::order_book("BINANCE", "future", "BTCUSDT")
            .with_time_range(FIVE_PAST, NOON);
        let params = validate(&reversed).unwrap();
        assert!(params.start_time > params.end_time);
    }

    #[test]
    fn order_book_accepts_explicit_zero_bounds() {
        let request = QueryRequest::order_book("BINANCE", "future", "BTCUSDT")
            .with_time_range(0_i64, 0_i64);
        let params = validate(&request).unwrap();
        assert_eq!((params.start_time, params.end_time), (0, 0));

        let kline = QueryRequest::kline("BINANCE", "future", "BTCUSDT", 1, 0_i64, 0_i64);
        assert!(matches!(
            validate(&kline).unwrap_err(),
            ValidationError::InvalidTime(TimeError::InvalidEpoch { value: 0 })
        ));

        let agg = QueryRequest::agg_trade("BINANCE", "future", "BTCUSDT", 0_i64, 0_i64);
        assert!(matches!(
            validate(&agg).unwrap_err(),
            ValidationError::InvalidTime(TimeError::InvalidEpoch { value: 0 })
        ));
    }

    #[test]
    fn order_book_still_normalizes_supplied_bounds() {
        let request = QueryRequest::order_book("BINANCE", "future", "BTCUSDT")
            .with_time_range("not-a-date", NOON);
        assert!(matches!(
            validate(&request).unwrap_err(),
            ValidationError::InvalidTime(TimeError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn type_tag_defaults_per_operation_and_can_be_overridden() {
        assert_eq!(kline().type_tag(), "KLINE");
        assert_eq!(
            QueryRequest::agg_trade("a", "b", "c", NOON, NOON).type_tag(),
            "AGG_TRADE"
        );
        assert_eq!(QueryRequest::order_book("a", "b", "c").type_tag(), "ORDER_BOOK");

        let overridden = kline().with_options(QueryOptions::default().with_type_tag("KLINE_V2"));
        assert_eq!(overridden.type_tag(), "KLINE_V2");
    }

    #[test]
    fn payload_keys_match_wire_names() {
        let params = validate(&kline()).unwrap();
        let value = serde_json::to_value(&params).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "schema",
            "exchange",
            "account_type",
            "symbol",
            "kline_interval_second",
            "start_time",
            "end_time",
            "start_id",
            "end_id",
            "limit",
            "is_asc",
            "is_gzip",
            "debug",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(object.len(), 13);

        let book = validate(&QueryRequest::order_book("BINANCE", "future", "BTCUSDT")).unwrap();
        let value = serde_json::to_value(&book).unwrap();
        assert!(!value.as_object().unwrap().contains_key("kline_interval_second"));
    }

    #[test]
    fn payload_decodes_back_to_identical_parameters() {
        let params = validate(&kline().with_options(
            QueryOptions::default()
                .with_ids(7, 9)
                .with_limit(5)
                .with_ascending(false)
                .with_gzip(true)
                .with_debug(true),
        ))
        .unwrap();
        let json = serde_json::to_string(&params).unwrap();
        let decoded: QueryParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, params);
    }

    #[test]
    fn uppercasing_is_idempotent() {
        let lower = validate(&kline()).unwrap();
        let upper = validate(&QueryRequest::kline(
            "BINANCE", "FUTURE", "BTCUSDT", 1, NOON, FIVE_PAST,
        ))
        .unwrap();
        assert_eq!(lower, upper);
    }
}
