//! Typed Result Rows
//!
//! The service returns loosely typed JSON rows. These types give callers a
//! checked view over the three row shapes. Prices and quantities are
//! [`Decimal`] and accept either JSON numbers or strings.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MarketQueryError;

/// A row shape that can be decoded from a query result.
pub trait MarketRow: DeserializeOwned {
    /// Name used in decode errors.
    const NAME: &'static str;
}

/// One kline (OHLCV bar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KlineRow {
    /// Bar open time as formatted by the server.
    pub time: String,
    /// Bar open time (ms).
    pub timestamp: i64,
    /// Bar width in seconds.
    pub interval_second: i64,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Base volume.
    pub volume: Decimal,
    /// Bar close time (ms).
    pub end_timestamp: i64,
    /// Trades in the bar.
    pub transaction_number: i64,
    /// Quote volume.
    pub transaction_volume: Decimal,
    /// Taker-buy base volume.
    pub buy_transaction_volume: Decimal,
    /// Taker-buy quote volume.
    pub buy_transaction_amount: Decimal,
    /// First aggregated trade id in the bar.
    pub start_id: i64,
    /// Last aggregated trade id in the bar.
    pub end_id: i64,
}

impl MarketRow for KlineRow {
    const NAME: &'static str = "kline";
}

/// One aggregated trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AggTradeRow {
    /// Trade time as formatted by the server.
    pub time: String,
    /// Trade time (ms).
    pub timestamp: i64,
    /// Aggregated trade id.
    pub a_id: i64,
    /// First underlying trade id.
    pub first: i64,
    /// Last underlying trade id.
    pub last: i64,
    /// Price.
    pub price: Decimal,
    /// Quantity.
    pub quantity: Decimal,
    /// Whether the buyer was the maker.
    pub is_buyer: bool,
}

impl MarketRow for AggTradeRow {
    const NAME: &'static str = "agg trade";
}

/// One price level of an order book side.
///
/// Decodes from `[price, quantity]` or `{"Price": .., "Quantity": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", from = "RawPriceLevel")]
pub struct PriceLevel {
    /// Price.
    pub price: Decimal,
    /// Quantity.
    pub quantity: Decimal,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPriceLevel {
    Pair(Decimal, Decimal),
    #[serde(rename_all = "PascalCase")]
    Object { price: Decimal, quantity: Decimal },
}

impl From<RawPriceLevel> for PriceLevel {
    fn from(raw: RawPriceLevel) -> Self {
        match raw {
            RawPriceLevel::Pair(price, quantity) | RawPriceLevel::Object { price, quantity } => {
                Self { price, quantity }
            }
        }
    }
}

/// One order-book snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderBookSnapshot {
    /// Snapshot time as formatted by the server.
    pub time: String,
    /// Snapshot time (ms).
    pub timestamp: i64,
    /// Update id of this snapshot.
    pub u_id: i64,
    /// Update id of the previous snapshot.
    pub pre_u_id: i64,
    /// Bid levels.
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    /// Ask levels.
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    /// Highest bid, if any.
    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.iter().max_by_key(|level| level.price)
    }

    /// Lowest ask, if any.
    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.iter().min_by_key(|level| level.price)
    }
}

impl MarketRow for OrderBookSnapshot {
    const NAME: &'static str = "order book";
}

/// Decode the payload of a query result into typed rows.
///
/// `rows` is the one-element sequence returned by the client. An array
/// payload yields one row per element, a single object yields one row and
/// `null` or an empty result yields none.
pub fn decode_rows<R: MarketRow>(rows: &[Value]) -> Result<Vec<R>, MarketQueryError> {
    let to_error = |source: serde_json::Error| MarketQueryError::RowDecode {
        row: R::NAME,
        source,
    };

    match rows.first() {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| R::deserialize(item).map_err(to_error))
            .collect(),
        Some(item) => R::deserialize(item).map(|row| vec![row]).map_err(to_error),
    }
}
