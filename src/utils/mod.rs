//! Utility functions and helpers

pub mod math;
pub mod logging;
pub mod periodic;
pub mod display;

pub use math::*;
pub use logging::*;
pub use periodic::*;
pub use display::*;
