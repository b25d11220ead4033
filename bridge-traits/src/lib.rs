//! # Host Bridge Traits
//!
//! Capability traits the timing core needs from its host platform.
//!
//! ## Overview
//!
//! The timing core never talks to the network, the filesystem or the wall
//! clock directly. Every such capability is expressed as a trait here and
//! injected at configuration time, so that desktop builds can use the adapters
//! from `bridge-desktop` while tests (and other hosts) supply their own.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests for the remote timing API
//! - [`ResourceStore`](resources::ResourceStore) - Read-only access to bundled timing files
//! - [`Clock`](time::Clock) - Time source for TTL bookkeeping and deterministic tests
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform-specific failures into it and keep the messages
//! actionable (URL, path, status).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single implementation can be
//! shared across the async tasks spawned by the core.

pub mod error;
pub mod http;
pub mod resources;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use resources::{InMemoryResourceStore, ResourceStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
