//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with retry and exponential backoff
//! - `ResourceStore` using `tokio::fs`, rooted at the directory holding the
//!   bundled timing files
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DirectoryResourceStore, ReqwestHttpClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::with_timeout(Duration::from_secs(30))?;
//!     let resources = DirectoryResourceStore::new("/usr/share/recitation/resources");
//!
//!     // Inject into TimingConfig
//!     Ok(())
//! }
//! ```

mod http;
mod resources;

pub use http::ReqwestHttpClient;
pub use resources::DirectoryResourceStore;
