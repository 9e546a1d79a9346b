//! # Host Bridge Traits
//!
//! Capability traits the sync engine depends on, implemented per host.
//!
//! ## Overview
//!
//! The engine never talks to the network or the disk directly. Each
//! capability it needs is a trait here, with desktop implementations in
//! `bridge-desktop` and the Drive transport in `provider-google-drive`.
//! Tests swap in in-memory fakes.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP with retry policy
//! - [`RemoteStore`](storage::RemoteStore) - List files, create folders, add parents
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Directory listing and file reads
//! - [`SecureStore`](storage::SecureStore) - Credential persistence
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert their native errors into it and keep enough context (status code,
//! path) for the message to be actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be held behind `Arc`.

pub mod error;
pub mod http;
pub mod storage;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{
    DirEntry, FileListPage, FileQuery, FileSystemAccess, QueryOrder, RemoteFile, RemoteStore,
    SecureStore, FOLDER_MIME_TYPE,
};
