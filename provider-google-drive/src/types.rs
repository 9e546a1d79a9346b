//! Google Drive API response types
//!
//! Data structures for the Google Drive API v3 `files` resource.

use serde::{Deserialize, Serialize};

/// Google Drive API file resource, limited to the requested fields
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub mime_type: Option<String>,

    /// File size in bytes, as a decimal string (omitted for folders)
    #[serde(default)]
    pub size: Option<String>,

    /// Creation time (RFC 3339)
    #[serde(default)]
    pub created_time: Option<String>,

    /// MD5 checksum (binary files only)
    #[serde(default)]
    pub md5_checksum: Option<String>,

    #[serde(default)]
    pub parents: Vec<String>,
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page
    #[serde(default)]
    pub next_page_token: Option<String>,

    /// Set when Drive could not search the whole corpus
    #[serde(default)]
    pub incomplete_search: bool,
}

/// Body of a files.create call for a folder
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest<'a> {
    pub name: &'a str,
    pub mime_type: &'a str,
    pub parents: [&'a str; 1],
}

/// Error envelope returned by Drive on non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}
