//! Google Drive API connector implementation
//!
//! Implements the `RemoteStore` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{
    FileListPage, FileQuery, QueryOrder, RemoteFile, RemoteStore, FOLDER_MIME_TYPE,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{GoogleDriveError, Result};
use crate::types::{ApiErrorResponse, CreateFolderRequest, DriveFile, FilesListResponse};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Maximum results per page (Google Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Fields to request for file resources
const FILE_FIELDS: &str = "id,name,mimeType,size,createdTime,md5Checksum,parents";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Render an abstract query as a Drive `q` expression
///
/// ```
/// use bridge_traits::storage::FileQuery;
/// use provider_google_drive::render_query;
///
/// let q = render_query(&FileQuery::new().in_parent("root").named("Google Photos"));
/// assert_eq!(q, "'root' in parents and name = 'Google Photos'");
/// ```
pub fn render_query(query: &FileQuery) -> String {
    let mut clauses = Vec::new();

    if let Some(parent) = &query.parent_id {
        clauses.push(format!("'{}' in parents", escape_literal(parent)));
    }
    if let Some(mime_type) = &query.mime_type {
        clauses.push(format!("mimeType = '{}'", escape_literal(mime_type)));
    }
    if let Some(name) = &query.name {
        clauses.push(format!("name = '{}'", escape_literal(name)));
    }
    if let Some(trashed) = query.trashed {
        clauses.push(format!("trashed = {}", trashed));
    }

    clauses.join(" and ")
}

/// Drive string literals escape `\` and `'` with a backslash
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn order_by_param(order: QueryOrder) -> &'static str {
    match order {
        QueryOrder::CreatedDescending => "createdTime desc",
    }
}

/// Google Drive API connector
///
/// Implements `RemoteStore` for Google Drive API v3.
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::storage::{FileQuery, RemoteStore};
///
/// let connector = GoogleDriveConnector::new(http_client, access_token);
/// let page = connector.list_files(&FileQuery::new().in_parent("root"), None, 100).await?;
/// ```
pub struct GoogleDriveConnector {
    http_client: Arc<dyn HttpClient>,

    /// OAuth 2.0 access token with the `drive` scope
    access_token: String,

    base_url: String,
}

impl GoogleDriveConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
            base_url: DRIVE_API_BASE.to_string(),
        }
    }

    /// Point the connector at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, format!("{}{}", self.base_url, path))
            .bearer_token(&self.access_token)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
    }

    /// Convert DriveFile to RemoteFile
    fn convert_file(drive_file: DriveFile) -> RemoteFile {
        RemoteFile {
            id: drive_file.id,
            name: drive_file.name,
            mime_type: drive_file.mime_type,
            md5_checksum: drive_file.md5_checksum,
            size: drive_file.size.and_then(|s| s.parse().ok()),
            created_time: drive_file.created_time,
            parent_ids: drive_file.parents,
        }
    }

    /// Send through the client's retry policy and classify the final status
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await
            .map_err(|e| GoogleDriveError::NetworkError(e.to_string()))?;

        if response.is_success() {
            debug!(status = response.status, "API request succeeded");
            return Ok(response);
        }

        if response.status == 429 {
            let retry_after_seconds = response
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("retry-after"))
                .and_then(|(_, v)| v.trim().parse().ok())
                .unwrap_or(0);
            warn!(retry_after_seconds, "Drive rate limit exceeded");
            return Err(GoogleDriveError::RateLimitExceeded {
                retry_after_seconds,
            });
        }

        let message = match response.json::<ApiErrorResponse>() {
            Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
            _ => response.text_lossy(),
        };
        warn!(status = response.status, message = %message, "API request failed");
        Err(GoogleDriveError::ApiError {
            status_code: response.status,
            message,
        })
    }

    async fn list_files_inner(
        &self,
        query: &FileQuery,
        page_token: Option<&str>,
        page_size: u32,
    ) -> Result<FileListPage> {
        let q = render_query(query);
        let mut request = self
            .request(HttpMethod::Get, "/files")
            .query("pageSize", page_size.clamp(1, MAX_PAGE_SIZE).to_string())
            .query(
                "fields",
                format!("nextPageToken,incompleteSearch,files({})", FILE_FIELDS),
            );

        if !q.is_empty() {
            request = request.query("q", &q);
        }
        if let Some(order) = query.order {
            request = request.query("orderBy", order_by_param(order));
        }
        if let Some(space) = &query.space {
            request = request.query("spaces", space);
        }
        if let Some(token) = page_token {
            request = request.query("pageToken", token);
        }

        let response = self.send(request).await?;
        let list_response: FilesListResponse = response.json().map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse files list response: {}", e))
        })?;

        if list_response.incomplete_search {
            warn!(q = %q, "Drive reported an incomplete search");
        }

        let files: Vec<RemoteFile> = list_response
            .files
            .into_iter()
            .map(Self::convert_file)
            .collect();

        debug!(
            count = files.len(),
            has_more = list_response.next_page_token.is_some(),
            "Listed files"
        );

        Ok(FileListPage {
            files,
            next_page_token: list_response.next_page_token,
        })
    }

    async fn create_folder_inner(&self, name: &str, parent_id: &str) -> Result<String> {
        let body = CreateFolderRequest {
            name,
            mime_type: FOLDER_MIME_TYPE,
            parents: [parent_id],
        };
        let request = self
            .request(HttpMethod::Post, "/files")
            .query("fields", "id")
            .json(&body)?;

        let response = self.send(request).await?;
        let created: DriveFile = response.json().map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse created folder: {}", e))
        })?;

        info!(name = %name, folder_id = %created.id, "Created folder");
        Ok(created.id)
    }

    async fn add_parent_inner(&self, file_id: &str, parent_id: &str) -> Result<()> {
        let path = format!("/files/{}", urlencoding::encode(file_id));
        let request = self
            .request(HttpMethod::Patch, &path)
            .query("addParents", parent_id)
            .query("fields", "id,parents")
            .json(&serde_json::json!({}))?;

        self.send(request).await?;
        debug!(file_id = %file_id, parent_id = %parent_id, "Added parent");
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for GoogleDriveConnector {
    #[instrument(skip(self, query))]
    async fn list_files(
        &self,
        query: &FileQuery,
        page_token: Option<&str>,
        page_size: u32,
    ) -> bridge_traits::error::Result<FileListPage> {
        Ok(self.list_files_inner(query, page_token, page_size).await?)
    }

    #[instrument(skip(self))]
    async fn create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> bridge_traits::error::Result<String> {
        Ok(self.create_folder_inner(name, parent_id).await?)
    }

    #[instrument(skip(self))]
    async fn add_parent(&self, file_id: &str, parent_id: &str) -> bridge_traits::error::Result<()> {
        Ok(self.add_parent_inner(file_id, parent_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        })
    }

    fn connector(mock_http: MockHttpClient) -> GoogleDriveConnector {
        GoogleDriveConnector::new(Arc::new(mock_http), "test_token".to_string())
            .with_base_url("https://drive.test/v3")
    }

    #[test]
    fn test_render_query_full() {
        let query = FileQuery::new()
            .in_parent("albums")
            .mime_type("image/jpeg")
            .named("Trip")
            .not_trashed();

        assert_eq!(
            render_query(&query),
            "'albums' in parents and mimeType = 'image/jpeg' and name = 'Trip' and trashed = false"
        );
    }

    #[test]
    fn test_render_query_escapes_quotes() {
        let query = FileQuery::new().named(r"Bob's \ Trip");
        assert_eq!(render_query(&query), r"name = 'Bob\'s \\ Trip'");
    }

    #[test]
    fn test_render_query_empty() {
        assert_eq!(render_query(&FileQuery::new()), "");
    }

    #[tokio::test]
    async fn test_list_files_success() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url.starts_with("https://drive.test/v3/files?")
                    && req.url.contains("orderBy=createdTime%20desc")
                    && req.url.contains("spaces=photos")
                    && req.url.contains("pageSize=1000")
                    && req.url.contains("pageToken=tok1")
                    && req.url.contains("q=mimeType%20%3D%20%27image%2Fjpeg%27%20and%20trashed%20%3D%20false")
                    && req.headers.get("Authorization").map(String::as_str)
                        == Some("Bearer test_token")
            })
            .returning(|_| {
                response(
                    200,
                    r#"{
                        "files": [
                            {
                                "id": "file1",
                                "name": "a.jpg",
                                "mimeType": "image/jpeg",
                                "size": "1024",
                                "createdTime": "2024-01-01T00:00:00.000Z",
                                "md5Checksum": "d41d8cd98f00b204e9800998ecf8427e",
                                "parents": ["p1"]
                            }
                        ],
                        "nextPageToken": "tok2"
                    }"#,
                )
            });

        let query = FileQuery::new()
            .mime_type("image/jpeg")
            .not_trashed()
            .order_by(QueryOrder::CreatedDescending)
            .in_space("photos");
        let page = connector(mock_http)
            .list_files(&query, Some("tok1"), 1000)
            .await
            .unwrap();

        assert_eq!(page.files.len(), 1);
        let file = &page.files[0];
        assert_eq!(file.id, "file1");
        assert_eq!(file.size, Some(1024));
        assert_eq!(
            file.md5_checksum.as_deref(),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );
        assert_eq!(file.created_time.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(file.parent_ids, vec!["p1"]);
        assert_eq!(page.next_page_token.as_deref(), Some("tok2"));
    }

    #[tokio::test]
    async fn test_list_files_clamps_page_size() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|req| req.url.contains("pageSize=1000&"))
            .returning(|_| response(200, r#"{"files": []}"#));

        let page = connector(mock_http)
            .list_files(&FileQuery::new(), None, 5000)
            .await
            .unwrap();
        assert!(page.files.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_create_folder_posts_folder_body() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .withf(|req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body.as_deref().unwrap_or_default()).unwrap();
                req.method == HttpMethod::Post
                    && req.url.starts_with("https://drive.test/v3/files?")
                    && body["name"] == "Trip"
                    && body["mimeType"] == FOLDER_MIME_TYPE
                    && body["parents"][0] == "albums"
            })
            .returning(|_| response(200, r#"{"id": "new-folder"}"#));

        let id = connector(mock_http)
            .create_folder("Trip", "albums")
            .await
            .unwrap();
        assert_eq!(id, "new-folder");
    }

    #[tokio::test]
    async fn test_add_parent_patches_file() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .withf(|req| {
                req.method == HttpMethod::Patch
                    && req.url.starts_with("https://drive.test/v3/files/file1?addParents=album1")
            })
            .returning(|_| response(200, r#"{"id": "file1", "parents": ["p1", "album1"]}"#));

        connector(mock_http)
            .add_parent("file1", "album1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_api_error_uses_message_from_envelope() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            response(
                403,
                r#"{"error": {"code": 403, "message": "Insufficient Permission"}}"#,
            )
        });

        let err = connector(mock_http)
            .add_parent("file1", "album1")
            .await
            .unwrap_err();

        match err {
            BridgeError::OperationFailed(message) => {
                assert!(message.contains("403"));
                assert!(message.contains("Insufficient Permission"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_reports_retry_after() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            let mut headers = HashMap::new();
            headers.insert("Retry-After".to_string(), "12".to_string());
            Ok(HttpResponse {
                status: 429,
                headers,
                body: Bytes::new(),
            })
        });

        let err = connector(mock_http)
            .list_files(&FileQuery::new(), None, 10)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("retry after 12 seconds"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("connection reset".to_string())));

        let err = connector(mock_http)
            .create_folder("Trip", "albums")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Network error"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_unparseable_listing_is_parse_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| response(200, "<html>"));

        let err = connector(mock_http)
            .list_files(&FileQuery::new(), None, 10)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
