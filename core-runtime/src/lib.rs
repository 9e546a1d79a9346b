//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for album-sync:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the other crates and the
//! binary depend on. It establishes the logging conventions and the
//! validated configuration that wires host bridges into the sync engine.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
