//! HTTP client for the Google Drive v3 files API.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use super::{AccessTokenSource, DriveError, RemoteFile, ServiceAccountAuth, SourceFolder};
use crate::config::Config;

const PAGE_SIZE: &str = "1000";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";

/// Lists and downloads the files of a single Drive folder.
pub struct GoogleDriveFolder {
    client: Client,
    base_url: String,
    folder_id: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl GoogleDriveFolder {
    /// Construct a folder client against `base_url` (normally `https://www.googleapis.com`).
    pub fn new(
        base_url: &str,
        folder_id: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, DriveError> {
        let client = Client::builder().user_agent("tgp-ingest/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(DriveError::InvalidUrl)?;
        let folder_id = folder_id.into();
        tracing::debug!(url = %base_url, folder = %folder_id, "Initialized Drive client");
        Ok(Self {
            client,
            base_url,
            folder_id,
            tokens,
        })
    }

    /// Construct a folder client authenticated with the configured service account.
    pub fn from_config(config: &Config) -> Result<Self, DriveError> {
        let auth = ServiceAccountAuth::new(
            config.google_service_account_email.clone(),
            &config.google_private_key,
            config.google_token_uri.clone(),
        )?;
        Self::new(
            &config.google_drive_api_url,
            config.google_drive_folder_id.clone(),
            Arc::new(auth),
        )
    }

    async fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, DriveError> {
        let token = self.tokens.access_token().await?;
        let url = format_endpoint(&self.base_url, path);
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, DriveError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = DriveError::UnexpectedStatus { status, body };
        tracing::error!(error = %error, "Drive request failed");
        Err(error)
    }
}

#[async_trait]
impl SourceFolder for GoogleDriveFolder {
    async fn list_files(&self) -> Result<Vec<RemoteFile>, DriveError> {
        let query = format!("'{}' in parents and trashed = false", self.folder_id);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .request(Method::GET, "drive/v3/files")
                .await?
                .query(&params)
                .send()
                .await?;
            let page: FileListResponse = Self::ensure_success(response).await?.json().await?;

            files.extend(page.files.into_iter().filter_map(|entry| {
                match (entry.id, entry.name) {
                    (Some(id), Some(name)) => Some(RemoteFile {
                        id,
                        name,
                        mime_type: entry.mime_type,
                    }),
                    _ => None,
                }
            }));

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(folder = %self.folder_id, files = files.len(), "Listed folder");
        Ok(files)
    }

    async fn download(&self, file: &RemoteFile, destination: &Path) -> Result<u64, DriveError> {
        let response = self
            .request(Method::GET, &format!("drive/v3/files/{}", file.id))
            .await?
            .query(&[("alt", "media")])
            .send()
            .await?;
        let mut response = Self::ensure_success(response).await?;

        let mut output = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            output.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        output.flush().await?;

        tracing::debug!(file = %file.name, bytes = written, "Downloaded file");
        Ok(written)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<FileEntry>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEntry {
    id: Option<String>,
    name: Option<String>,
    mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::StaticToken;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    fn folder_for(server: &MockServer) -> GoogleDriveFolder {
        GoogleDriveFolder::new(
            &server.base_url(),
            "folder-1",
            Arc::new(StaticToken("token-1".into())),
        )
        .expect("drive client")
    }

    #[tokio::test]
    async fn list_files_follows_page_tokens() {
        let server = MockServer::start_async().await;
        // Registered first so the page-2 request matches it before the catch-all first page.
        let second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/drive/v3/files")
                    .query_param("pageToken", "page-2");
                then.status(200).json_body(json!({
                    "files": [ { "id": "b", "name": "Bravo.pdf", "mimeType": "application/pdf" } ]
                }));
            })
            .await;

        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/drive/v3/files")
                    .header("authorization", "Bearer token-1")
                    .query_param("q", "'folder-1' in parents and trashed = false")
                    .query_param("pageSize", "1000");
                then.status(200).json_body(json!({
                    "nextPageToken": "page-2",
                    "files": [
                        { "id": "a", "name": "Alpha.srt", "mimeType": "application/x-subrip" },
                        { "name": "no-id.txt" }
                    ]
                }));
            })
            .await;
        let files = folder_for(&server).list_files().await.expect("listing");

        first.assert_async().await;
        second.assert_async().await;
        let names: Vec<&str> = files.iter().map(|file| file.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha.srt", "Bravo.pdf"]);
        assert_eq!(files[1].mime_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn list_files_surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/drive/v3/files");
                then.status(403).body("forbidden");
            })
            .await;

        let error = folder_for(&server).list_files().await.unwrap_err();
        assert!(matches!(
            error,
            DriveError::UnexpectedStatus { status, ref body } if status.as_u16() == 403 && body == "forbidden"
        ));
    }

    #[tokio::test]
    async fn download_writes_media_to_destination() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/drive/v3/files/file-9")
                    .query_param("alt", "media");
                then.status(200).body("transcript body");
            })
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("Episode.txt");
        let file = RemoteFile {
            id: "file-9".into(),
            name: "Episode.txt".into(),
            mime_type: Some("text/plain".into()),
        };

        let written = folder_for(&server)
            .download(&file, &destination)
            .await
            .expect("download");

        mock.assert_async().await;
        assert_eq!(written, 15);
        assert_eq!(
            std::fs::read_to_string(&destination).expect("read back"),
            "transcript body"
        );
    }
}
