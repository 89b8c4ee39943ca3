//! Collaborator seams, providers and connection management

pub mod collaborators;
pub mod providers;
pub mod http;
pub mod retry;

pub use collaborators::*;
pub use providers::*;
pub use http::*;
pub use retry::*;
