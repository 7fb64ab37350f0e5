//! gRPC transports for the market-history service.
//!
//! [`GrpcTransport`] opens a channel for each call and drops it when the
//! call finishes, on success and failure alike. [`SharedChannelTransport`]
//! keeps one lazily connected channel for the lifetime of the value.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};

use super::proto::marketrpc::v1::DataRequest;
use super::proto::marketrpc::v1::market_history_service_client::MarketHistoryServiceClient;
use crate::application::ports::{CallOptions, MarketHistoryTransport};
use crate::application::services::MarketQueryClient;
use crate::domain::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::domain::time::TimeNormalizer;
use crate::error::TransportError;
use crate::infrastructure::config::{ChannelMode, ClientConfig};

/// Transport that opens a fresh channel for every call.
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    config: ClientConfig,
}

impl GrpcTransport {
    /// Create a per-call transport.
    ///
    /// # Errors
    ///
    /// Returns error if the configured address is not a valid URI.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        create_endpoint(&config)?;
        Ok(Self { config })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl MarketHistoryTransport for GrpcTransport {
    async fn query_data(
        &self,
        request: RequestEnvelope,
        options: CallOptions,
    ) -> Result<ResponseEnvelope, TransportError> {
        let endpoint = create_endpoint(&self.config)?;
        let request = grpc_request(request, options.timeout);
        let config = &self.config;

        run_call(
            async move {
                let channel = endpoint.connect().await?;
                tracing::trace!(address = %config.address, "Opened per-call channel");

                let mut client = service_client(channel, config);
                let response = client.query_data(request).await?;
                Ok(ResponseEnvelope::from(response.into_inner()))
            },
            &options,
        )
        .await
    }
}

/// Transport that reuses one channel across calls.
#[derive(Debug, Clone)]
pub struct SharedChannelTransport {
    client: MarketHistoryServiceClient<Channel>,
    address: String,
}

impl SharedChannelTransport {
    /// Connect eagerly.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or the connection fails.
    pub async fn connect(config: &ClientConfig) -> Result<Self, TransportError> {
        let channel = create_endpoint(config)?.connect().await?;

        tracing::info!(address = %config.address, "Connected to market-history service");

        Ok(Self {
            client: service_client(channel, config),
            address: config.address.clone(),
        })
    }

    /// Connect lazily (connection established on first request).
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid.
    pub fn connect_lazy(config: &ClientConfig) -> Result<Self, TransportError> {
        let channel = create_endpoint(config)?.connect_lazy();

        tracing::debug!(address = %config.address, "Created lazy connection to market-history service");

        Ok(Self {
            client: service_client(channel, config),
            address: config.address.clone(),
        })
    }

    /// Address this transport targets.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl MarketHistoryTransport for SharedChannelTransport {
    async fn query_data(
        &self,
        request: RequestEnvelope,
        options: CallOptions,
    ) -> Result<ResponseEnvelope, TransportError> {
        let mut client = self.client.clone();
        let request = grpc_request(request, options.timeout);

        run_call(
            async move {
                let response = client.query_data(request).await?;
                Ok(ResponseEnvelope::from(response.into_inner()))
            },
            &options,
        )
        .await
    }
}

/// Build the transport selected by `config.channel_mode`.
///
/// # Errors
///
/// Returns error if the configured address is not a valid URI.
pub fn connect_transport(
    config: &ClientConfig,
) -> Result<Arc<dyn MarketHistoryTransport>, TransportError> {
    let transport: Arc<dyn MarketHistoryTransport> = match config.channel_mode {
        ChannelMode::PerCall => Arc::new(GrpcTransport::new(config.clone())?),
        ChannelMode::Shared => Arc::new(SharedChannelTransport::connect_lazy(config)?),
    };
    Ok(transport)
}

/// Build a query client from configuration, honoring its time zone.
///
/// # Errors
///
/// Returns error if the configured address is not a valid URI.
pub fn connect_client(
    config: &ClientConfig,
) -> Result<MarketQueryClient<Arc<dyn MarketHistoryTransport>>, TransportError> {
    let transport = connect_transport(config)?;
    Ok(MarketQueryClient::new(transport).with_normalizer(TimeNormalizer::new(config.timezone)))
}

fn create_endpoint(config: &ClientConfig) -> Result<Endpoint, TransportError> {
    let uri = config.endpoint_uri();
    let endpoint = Channel::from_shared(uri.clone())
        .map_err(|e| TransportError::InvalidEndpoint {
            endpoint: uri,
            message: e.to_string(),
        })?
        .connect_timeout(config.connect_timeout)
        .tcp_nodelay(true);

    Ok(endpoint)
}

fn service_client(channel: Channel, config: &ClientConfig) -> MarketHistoryServiceClient<Channel> {
    MarketHistoryServiceClient::new(channel)
        .max_encoding_message_size(config.max_send_message_size)
        .max_decoding_message_size(config.max_receive_message_size)
}

fn grpc_request(envelope: RequestEnvelope, timeout: Option<Duration>) -> tonic::Request<DataRequest> {
    let mut request = tonic::Request::new(DataRequest::from(envelope));
    if let Some(timeout) = timeout {
        request.set_timeout(timeout);
    }
    request
}

/// Bound `call` by the caller's deadline and race it against cancellation.
async fn run_call<F, T>(call: F, options: &CallOptions) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    let bounded = async {
        match options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .unwrap_or(Err(TransportError::DeadlineExceeded { timeout })),
            None => call.await,
        }
    };

    match &options.cancellation {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(TransportError::Cancelled),
            result = bounded => result,
        },
        None => bounded.await,
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;

    #[test]
    fn invalid_address_is_rejected_up_front() {
        let err = GrpcTransport::new(ClientConfig::new("not a uri")).unwrap_err();
        assert!(matches!(err, TransportError::InvalidEndpoint { .. }));
    }

    #[test]
    fn request_carries_timeout_header() {
        let request = grpc_request(
            RequestEnvelope {
                type_tag: "KLINE".into(),
                json_data: "{}".into(),
            },
            Some(Duration::from_millis(1500)),
        );
        assert!(request.metadata().get("grpc-timeout").is_some());
        assert_eq!(request.get_ref().r#type, "KLINE");
    }

    #[tokio::test]
    async fn run_call_enforces_deadline() {
        let options = CallOptions::new().with_timeout(Duration::from_millis(20));
        let result: Result<(), _> = run_call(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            &options,
        )
        .await;
        assert!(matches!(result, Err(TransportError::DeadlineExceeded { .. })));
    }

    #[tokio::test]
    async fn run_call_observes_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let options = CallOptions::new().with_cancellation(token);
        let result: Result<(), _> = run_call(std::future::pending(), &options).await;
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn run_call_passes_results_through() {
        let result = run_call(async { Ok(7) }, &CallOptions::new()).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn transport_follows_channel_mode() {
        let per_call = ClientConfig::new("127.0.0.1:1");
        assert!(connect_transport(&per_call).is_ok());

        let shared = per_call.with_channel_mode(ChannelMode::Shared);
        assert!(connect_transport(&shared).is_ok());
    }
}
