//! Client-facing HTTP API and the relay encoder

pub mod handler;
pub mod parsing;
pub mod relay;

// Re-export the router pieces for convenience
pub use handler::{AppState, build_router};
pub use relay::{RelayStream, encode_event};
