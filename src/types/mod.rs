//! Core data types and structures

pub mod opportunity;
pub mod portfolio;
pub mod risk;
pub mod block;
pub mod mirror;
pub mod liquidity;
pub mod execution;

pub use opportunity::*;
pub use portfolio::*;
pub use risk::*;
pub use block::*;
pub use mirror::*;
pub use liquidity::*;
pub use execution::*;
