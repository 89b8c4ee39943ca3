//! Aero Exec Engine - risk-gated on-chain execution strategies
//!
//! Three strategies share one execution engine and one portfolio risk gate:
//! priority-fee block positioning, mirror trading of tracked accounts, and
//! transient liquidity provision around large pending swaps.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod risk;
pub mod execution;
pub mod strategies;
pub mod volatility;
pub mod utils;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use errors::{BotError, BotResult};
pub use types::*;

// Type alias for our concrete provider
pub type ConcreteProvider = alloy::providers::RootProvider<alloy::transports::BoxTransport>;
