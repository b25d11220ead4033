//! Bundled Resource Abstraction
//!
//! Read-only access to resources packaged with the host application, such as
//! the per-reciter timing files. Paths are forward-slash separated and
//! relative to the resource root (`timings/reciter_5.json`).

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

use crate::error::{BridgeError, Result};

/// Read-only resource store
///
/// Hosts decide where packaged resources live: a directory next to the
/// executable, an app bundle, or an embedded manifest compiled into the
/// binary. The core only ever asks for one canonical path per resource.
///
/// # Errors
///
/// A missing resource must surface as [`BridgeError::NotFound`] (or an
/// `Io` error of kind `NotFound`) so callers can tell "absent" apart from
/// "unreadable".
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Read the full contents of a resource.
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Check whether a resource exists.
    async fn exists(&self, path: &str) -> Result<bool> {
        match self.read(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Embedded resource manifest
///
/// Holds resources in memory, keyed by their canonical path. Useful for
/// hosts that compile timing files into the binary with `include_bytes!`
/// and for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceStore {
    entries: HashMap<String, Bytes>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource, replacing any previous contents at the same path.
    pub fn with_resource(mut self, path: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Bytes>) {
        self.entries
            .insert(normalize(&path.into()).to_string(), contents.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn read(&self, path: &str) -> Result<Bytes> {
        self.entries
            .get(normalize(path))
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(path.to_string()))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.entries.contains_key(normalize(path)))
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}
