//! Market RPC Binary
//!
//! Fetches five one-second klines for 2024-11-06 12:00:00 to 12:05:00 and
//! logs their times, newest first.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-rpc -- BINANCE future BTCUSDT
//! cargo run --bin market-rpc -- BINANCE future BTCUSDT "2024-11-06 12:00:00" "2024-11-06 12:05:00"
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKET_RPC_ADDRESS`: service address, `host:port` or a full URI
//!
//! ## Optional
//! - `MARKET_RPC_MAX_SEND_MESSAGE_BYTES`: request size limit (default: 100 MiB)
//! - `MARKET_RPC_MAX_RECEIVE_MESSAGE_BYTES`: response size limit (default: 100 MiB)
//! - `MARKET_RPC_CONNECT_TIMEOUT_SECS`: connect timeout (default: 10)
//! - `MARKET_RPC_TIMEZONE`: zone for date strings (default: Asia/Shanghai)
//! - `MARKET_RPC_CHANNEL_MODE`: per-call | shared (default: per-call)
//! - `OTEL_ENABLED`: export spans over OTLP (default: false)
//! - `RUST_LOG`: log filter (default: market_rpc=info)

use anyhow::Context;
use market_rpc::infrastructure::{metrics, telemetry};
use market_rpc::{ClientConfig, KlineRow, QueryOptions, connect_client, decode_rows};

const DEFAULT_START: &str = "2024-11-06 12:00:00";
const DEFAULT_END: &str = "2024-11-06 12:05:00";
const KLINE_INTERVAL_SECONDS: i64 = 1;
const KLINE_LIMIT: i64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init()?;
    metrics::describe_metrics();

    let config = ClientConfig::from_env()?;
    log_config(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg = |index: usize, default: &'static str| -> String {
        args.get(index).cloned().unwrap_or_else(|| default.to_string())
    };
    let exchange = arg(0, "BINANCE");
    let account_type = arg(1, "future");
    let symbol = arg(2, "BTCUSDT");
    let start_time = arg(3, DEFAULT_START);
    let end_time = arg(4, DEFAULT_END);

    let client = connect_client(&config)?;

    let rows = client
        .market_kline(
            &exchange,
            &account_type,
            &symbol,
            KLINE_INTERVAL_SECONDS,
            start_time.as_str(),
            end_time.as_str(),
            QueryOptions::default().with_limit(KLINE_LIMIT),
        )
        .await
        .with_context(|| format!("kline query for {symbol} failed"))?;

    let klines: Vec<KlineRow> = decode_rows(&rows)?;
    tracing::info!(%symbol, count = klines.len(), "Fetched klines");

    for kline in klines.iter().rev() {
        tracing::info!(time = %kline.time, close = %kline.close, volume = %kline.volume, "Kline");
    }

    Ok(())
}

fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    tracing::info!(
        address = %config.address,
        channel_mode = config.channel_mode.as_str(),
        timezone = %config.timezone,
        "Configuration loaded"
    );
    tracing::debug!(
        max_send_message_size = config.max_send_message_size,
        max_receive_message_size = config.max_receive_message_size,
        connect_timeout_secs = config.connect_timeout.as_secs(),
        "Transport limits"
    );
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
