//! Execution strategies, each gated by the shared risk gate

pub mod block_positioning;
pub mod mirror_trading;
pub mod transient_liquidity;

pub use block_positioning::BlockPositioningStrategy;
pub use mirror_trading::MirrorTradingStrategy;
pub use transient_liquidity::TransientLiquidityStrategy;
