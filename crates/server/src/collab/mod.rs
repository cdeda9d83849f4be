// Client for the Y-Sweet compatible document server that owns live
// collaborative state.

pub mod client;
pub mod connection;

pub use client::{CollabClient, CollabError};
pub use connection::ConnectionString;

/// Used when the configured server is unreachable and differs from it.
pub const FALLBACK_CONNECTION_STRING: &str = "ys://127.0.0.1:4001";

/// Prefix the web client puts in front of sanitized document ids.
pub const DEFAULT_DOC_PREFIX: &str = "doc_";
