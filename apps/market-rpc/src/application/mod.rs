//! Application Layer
//!
//! The transport port and the query client that drives it.

pub mod ports;
pub mod services;
