//! Risk gate, historical-simulation metrics and stress scenarios

pub mod gate;
pub mod metrics;
pub mod stress;

pub use gate::*;
pub use metrics::*;
pub use stress::*;
