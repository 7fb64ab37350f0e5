//! gRPC Transport Adapter
//!
//! Implements [`MarketHistoryTransport`](crate::application::ports::MarketHistoryTransport)
//! over tonic. The generated code is in `packages/schema-gen/rust/marketrpc/v1/`.

mod converters;
mod transport;

// Allow clippy warnings and missing docs in generated code
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    pub mod marketrpc {
        pub mod v1 {
            include!("../../../../../packages/schema-gen/rust/marketrpc/v1/marketrpc.v1.rs");
            include!("../../../../../packages/schema-gen/rust/marketrpc/v1/marketrpc.v1.tonic.rs");
        }
    }
}

pub use transport::{GrpcTransport, SharedChannelTransport, connect_client, connect_transport};
