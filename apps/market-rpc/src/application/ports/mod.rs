//! Application Ports
//!
//! - **Driven Ports** (Secondary/Outbound): the market-history transport.

mod market_history_port;

pub use market_history_port::MarketHistoryTransport;
#[cfg(test)]
pub use market_history_port::MockMarketHistoryTransport;

pub use crate::domain::call::CallOptions;
