//! Application Services

mod query_client;

pub use query_client::MarketQueryClient;
