//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the timing core:
//! - Configuration management (`TimingConfig` and its builder)
//! - Logging and tracing infrastructure
//!
//! ## Overview
//!
//! This crate wires host bridges into a validated configuration and sets up
//! the `tracing` conventions used throughout the workspace. It holds no
//! timing logic of its own.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
