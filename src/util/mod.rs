//! Utility types shared across the crate.
//!
//! - [`money_amount`] - Human-readable currency amount parsing
//! - [`telemetry`] - Logging and OpenTelemetry tracing setup

pub mod money_amount;
pub mod telemetry;

pub use money_amount::*;
pub use telemetry::*;
