#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Market RPC - Market History Query Client
//!
//! Client for a market-history gRPC service exposing one unary method,
//! `queryData`. Three queries are built on top of it: klines, aggregated
//! trades and order-book snapshots.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: time normalization, query validation, envelopes, typed rows
//! - **Application**: the transport port and [`MarketQueryClient`]
//! - **Infrastructure**: tonic transports, configuration, metrics, telemetry
//!
//! # Request Flow
//!
//! ```text
//! QueryRequest ──► validate ──► QueryParameters ──► RequestEnvelope
//!                                                        │
//!                                              MarketHistoryTransport
//!                                                        │
//! Vec<Value> ◄── data ◄── ResponseEnvelope ◄─────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let config = ClientConfig::new("10.100.52.41:19999");
//! let client = connect_client(&config)?;
//! let rows = client
//!     .market_kline(
//!         "BINANCE",
//!         "future",
//!         "BTCUSDT",
//!         1,
//!         "2024-11-06 12:00:00",
//!         "2024-11-06 12:05:00",
//!         QueryOptions::default().with_limit(5),
//!     )
//!     .await?;
//! let klines: Vec<KlineRow> = decode_rows(&rows)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Query model with no I/O.
pub mod domain;

/// Application layer - Port and query client.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Error types.
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::call::CallOptions;
pub use domain::envelope::{RequestEnvelope, ResponseEnvelope};
pub use domain::query::{
    OperationKind, QueryOptions, QueryParameters, QueryRequest, RequiredField, ValidationError,
};
pub use domain::records::{
    AggTradeRow, KlineRow, MarketRow, OrderBookSnapshot, PriceLevel, decode_rows,
};
pub use domain::time::{TimeError, TimeInput, TimeNormalizer, TimeValue, normalize, range_progress};

// Application
pub use application::ports::MarketHistoryTransport;
pub use application::services::MarketQueryClient;

// Infrastructure
pub use infrastructure::config::{ChannelMode, ClientConfig, ConfigError};
pub use infrastructure::grpc::{
    GrpcTransport, SharedChannelTransport, connect_client, connect_transport,
};

// Errors
pub use error::{ErrorKind, MarketQueryError, TransportError};
