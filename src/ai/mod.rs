//! Upstream side of the relay: decoders, provider adapters and dispatch

pub mod decoder;
pub mod events;
pub mod ndjson;
pub mod providers;
pub mod router;
pub mod sse;
pub mod stream;

// Re-export main types for convenience
pub use events::{EventStream, FailureKind, NormalizedEvent};
pub use providers::ChatProvider;
pub use router::ProviderRegistry;
