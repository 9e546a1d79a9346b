//! # Google Drive Provider
//!
//! Implements the `RemoteStore` trait for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated, filtered file listing (`files.list`)
//! - Folder creation under a parent (`files.create`)
//! - Linking an existing file into another folder (`files.update?addParents`)
//! - Rendering of abstract queries into Drive's `q` syntax
//!
//! Transport-level retries are delegated to the injected `HttpClient`.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{render_query, GoogleDriveConnector};
pub use error::{GoogleDriveError, Result};
