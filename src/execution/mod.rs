//! Shared execution path: signing, broadcast, inclusion and bundles

pub mod engine;
pub mod wait;
pub mod bundle;

pub use engine::*;
pub use wait::*;
pub use bundle::*;
