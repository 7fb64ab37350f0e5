//! Infrastructure Layer
//!
//! - `grpc`: tonic transports (per-call and shared channel)
//! - `config`: client configuration from code or environment
//! - `metrics`: query counters and latency histogram
//! - `telemetry`: tracing subscriber and optional OTLP export for binaries

pub mod config;
pub mod grpc;
pub mod metrics;
pub mod telemetry;
