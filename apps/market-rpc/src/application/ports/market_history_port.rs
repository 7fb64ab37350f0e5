//! Market History Port (Driven Port)
//!
//! Interface for the single unary `queryData` call.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::call::CallOptions;
use crate::domain::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::error::TransportError;

/// Port for the market-history service.
///
/// Implementations perform exactly one round trip per call and honor the
/// deadline and cancellation in `options`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketHistoryTransport: Send + Sync {
    /// Send one request envelope and return the response envelope.
    async fn query_data(
        &self,
        request: RequestEnvelope,
        options: CallOptions,
    ) -> Result<ResponseEnvelope, TransportError>;
}

#[async_trait]
impl<T: MarketHistoryTransport + ?Sized> MarketHistoryTransport for Arc<T> {
    async fn query_data(
        &self,
        request: RequestEnvelope,
        options: CallOptions,
    ) -> Result<ResponseEnvelope, TransportError> {
        (**self).query_data(request, options).await
    }
}
