//! gRPC Transport Integration Tests
//!
//! Runs a real tonic server on an ephemeral port and drives it through both
//! transports.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

use market_rpc::infrastructure::grpc::proto::marketrpc::v1::{
    DataRequest, DataResponse,
    market_history_service_server::{MarketHistoryService, MarketHistoryServiceServer},
};
use market_rpc::{
    CallOptions, ChannelMode, ClientConfig, MarketQueryClient, MarketQueryError, QueryOptions,
    RequestEnvelope, ResponseEnvelope, SharedChannelTransport, TransportError, connect_client,
};

const SLOW_TYPE: &str = "SLOW";

/// Echoes the request type and parameters back under `data`.
struct EchoService {
    calls: Arc<AtomicUsize>,
}

#[tonic::async_trait]
impl MarketHistoryService for EchoService {
    async fn query_data(
        &self,
        request: Request<DataRequest>,
    ) -> Result<Response<DataResponse>, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request = RequestEnvelope::from(request.into_inner());

        if request.type_tag == SLOW_TYPE {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }

        let params: Value = serde_json::from_str(&request.json_data)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let response = ResponseEnvelope::with_data(
            request.type_tag.clone(),
            &json!({ "type": request.type_tag, "params": params }),
        );
        Ok(Response::new(DataResponse::from(response)))
    }
}

/// Start a test gRPC server on a random port.
async fn setup_test_server() -> (SocketAddr, Arc<AtomicUsize>, tokio::task::JoinHandle<()>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let service = EchoService {
        calls: Arc::clone(&calls),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_handle = tokio::spawn(async move {
        Server::builder()
            .add_service(MarketHistoryServiceServer::new(service))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, calls, server_handle)
}

fn slow_options() -> QueryOptions {
    QueryOptions::default().with_type_tag(SLOW_TYPE)
}

#[tokio::test]
async fn per_call_transport_round_trip() {
    let (addr, calls, handle) = setup_test_server().await;
    let client = connect_client(&ClientConfig::new(addr.to_string())).unwrap();

    let rows = client
        .market_kline(
            "binance",
            "future",
            "btcusdt",
            1,
            "2024-11-06 12:00:00",
            "2024-11-06 12:05:00",
            QueryOptions::default().with_limit(5),
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["type"], "KLINE");
    assert_eq!(rows[0]["params"]["symbol"], "BTCUSDT");
    assert_eq!(rows[0]["params"]["limit"], 5);
    assert_eq!(rows[0]["params"]["kline_interval_second"], 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    handle.abort();
}

#[tokio::test]
async fn shared_transport_serves_repeated_calls() {
    let (addr, calls, handle) = setup_test_server().await;
    let config = ClientConfig::new(format!("http://{addr}")).with_channel_mode(ChannelMode::Shared);
    let transport = SharedChannelTransport::connect(&config).await.unwrap();
    let client = MarketQueryClient::new(transport);

    for _ in 0..3 {
        let rows = client
            .market_orderbook("BINANCE", "spot", "ETHUSDT", None, QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(rows[0]["type"], "ORDER_BOOK");
        assert_eq!(rows[0]["params"]["start_time"], 0);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    handle.abort();
}

#[tokio::test]
async fn deadline_bounds_the_call() {
    let (addr, _calls, handle) = setup_test_server().await;

    for mode in [ChannelMode::PerCall, ChannelMode::Shared] {
        let client =
            connect_client(&ClientConfig::new(addr.to_string()).with_channel_mode(mode)).unwrap();
        let options = slow_options()
            .with_call_options(CallOptions::new().with_timeout(Duration::from_millis(200)));

        let started = Instant::now();
        let err = client
            .market_aggtrade(
                "BINANCE",
                "future",
                "BTCUSDT",
                "2024-11-06 12:00:00",
                "2024-11-06 12:05:00",
                options,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, MarketQueryError::Transport(_)), "{mode:?}: {err}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    handle.abort();
}

#[tokio::test]
async fn cancellation_aborts_the_call() {
    let (addr, _calls, handle) = setup_test_server().await;
    let client = connect_client(&ClientConfig::new(addr.to_string())).unwrap();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let err = client
        .market_aggtrade(
            "BINANCE",
            "future",
            "BTCUSDT",
            "2024-11-06 12:00:00",
            "2024-11-06 12:05:00",
            slow_options().with_call_options(CallOptions::new().with_cancellation(token)),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MarketQueryError::Transport(TransportError::Cancelled)
    ));
    assert!(started.elapsed() < Duration::from_secs(2));

    handle.abort();
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::new(addr.to_string()).with_connect_timeout(Duration::from_secs(1));
    let client = connect_client(&config).unwrap();

    let err = client
        .market_orderbook("BINANCE", "future", "BTCUSDT", None, QueryOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MarketQueryError::Transport(TransportError::Connect(_))
    ));
}

#[tokio::test]
async fn oversized_response_is_rejected() {
    let (addr, _calls, handle) = setup_test_server().await;
    let config = ClientConfig::new(addr.to_string()).with_max_receive_message_size(16);
    let client = connect_client(&config).unwrap();

    let err = client
        .market_orderbook("BINANCE", "future", "BTCUSDT", None, QueryOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MarketQueryError::Transport(TransportError::Status(_))
    ));

    handle.abort();
}
