//! Domain Layer
//!
//! Time normalization, query validation, envelopes and typed rows. Nothing
//! here performs I/O.

pub mod call;
pub mod envelope;
pub mod query;
pub mod records;
pub mod time;
