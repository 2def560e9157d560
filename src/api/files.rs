//! File and note operations scoped to an unlocked vault.
//!
//! Uploads stream the file body in fixed-size chunks and publish a
//! completion percentage for every chunk handed to the transport.

use std::io;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

use super::client::{error_from_response, handle_response, ApiClient};
use super::error::ApiError;
use super::types::{DeleteFileRequest, FileListResponse};
use crate::validate;

/// Receives upload completion percentages in the range 0..=100.
pub type ProgressSender = mpsc::UnboundedSender<f64>;

const CHUNK_SIZE: usize = 64 * 1024;

/// A single file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    name: String,
    size: u64,
    path: PathBuf,
}

impl UploadFile {
    /// Describe a file on disk; the name sent to the vault is its file name.
    pub async fn from_path(path: &Path) -> io::Result<Self> {
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        Ok(Self {
            name,
            size: meta.len(),
            path: path.to_path_buf(),
        })
    }

    /// A file entry with no backing file, for driving uploaders that never
    /// read the body.
    #[cfg(test)]
    pub(crate) fn unbacked(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
            path: PathBuf::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    async fn chunks(&self) -> io::Result<ReaderStream<tokio::fs::File>> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(ReaderStream::with_capacity(file, CHUNK_SIZE))
    }
}

fn percent(sent: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (sent as f64 / total as f64 * 100.0).min(100.0)
}

/// GET /files?vaultName=
pub async fn list_files(client: &ApiClient, vault_name: &str) -> Result<FileListResponse, ApiError> {
    validate::required(vault_name, "Vault name is required to list files.")?;

    let path = format!("/files?vaultName={}", urlencoding::encode(vault_name));
    let resp = client.get(&path).await?;
    handle_response(resp).await?.into_json()
}

/// Upload one file to POST /upload?vaultName= as multipart field `file`.
///
/// Percentages sent on `progress` never decrease, and 100 is always sent
/// before a successful return. The response body is ignored: only the
/// status code decides success.
pub async fn upload_file(
    client: &ApiClient,
    vault_name: &str,
    file: &UploadFile,
    progress: Option<ProgressSender>,
) -> Result<(), ApiError> {
    validate::required(vault_name, "Vault name is required for upload.")?;

    let total = file.size();
    let chunks = file
        .chunks()
        .await
        .map_err(|e| ApiError::validation(format!("Cannot read {}: {}", file.name(), e)))?;

    let tracker = progress.clone();
    let mut sent = 0u64;
    let tracked = chunks.map(move |chunk| {
        if let (Ok(bytes), Some(tx)) = (&chunk, &tracker) {
            sent += bytes.len() as u64;
            let _ = tx.send(percent(sent, total));
        }
        chunk
    });

    let part = Part::stream_with_length(Body::wrap_stream(tracked), total)
        .file_name(file.name().to_string())
        .mime_str("application/octet-stream")
        .map_err(|e| ApiError::validation(format!("Invalid upload part: {}", e)))?;
    let form = Form::new().part("file", part);

    let path = format!("/upload?vaultName={}", urlencoding::encode(vault_name));
    let resp = client.post_multipart(&path, form).await?;
    if !resp.status().is_success() {
        return Err(error_from_response(resp).await);
    }

    if let Some(tx) = progress {
        let _ = tx.send(100.0);
    }
    log::debug!("Uploaded {} ({} bytes)", file.name(), total);
    Ok(())
}

fn download_path(vault_name: &str, file_name: &str) -> Result<String, ApiError> {
    if vault_name.is_empty() || file_name.is_empty() {
        return Err(ApiError::validation(
            "Vault name and file name are required for download.",
        ));
    }
    Ok(format!(
        "/download?vaultName={}&fileName={}",
        urlencoding::encode(vault_name),
        urlencoding::encode(file_name)
    ))
}

/// URL that serves a file's raw content. Pure; no request is made.
pub fn download_url(client: &ApiClient, vault_name: &str, file_name: &str) -> Result<String, ApiError> {
    Ok(client.url(&download_path(vault_name, file_name)?))
}

/// Fetch a file's raw bytes from the download URL.
pub async fn download_file(
    client: &ApiClient,
    vault_name: &str,
    file_name: &str,
) -> Result<Vec<u8>, ApiError> {
    let path = download_path(vault_name, file_name)?;
    let resp = client.get(&path).await?;
    if !resp.status().is_success() {
        return Err(error_from_response(resp).await);
    }
    Ok(resp.bytes().await?.to_vec())
}

/// Fetch a note (or any text file) as UTF-8.
pub async fn read_note(client: &ApiClient, vault_name: &str, file_name: &str) -> Result<String, ApiError> {
    let bytes = download_file(client, vault_name, file_name).await?;
    String::from_utf8(bytes).map_err(|_| ApiError::Parse(format!("{} is not valid UTF-8 text", file_name)))
}

/// DELETE /delete. `None` on 204, otherwise the confirmation message.
pub async fn delete_file(
    client: &ApiClient,
    vault_name: &str,
    file_name: &str,
) -> Result<Option<String>, ApiError> {
    if vault_name.is_empty() || file_name.is_empty() {
        return Err(ApiError::validation(
            "Vault name and file name are required for deletion.",
        ));
    }

    let body = DeleteFileRequest {
        vault_name,
        file_name,
    };
    let resp = client.delete_json("/delete", &body).await?;
    let message = handle_response(resp).await?.into_message()?;
    log::info!("Deleted {} from {}", file_name, vault_name);
    Ok(message)
}

/// POST /notes as multipart. The backend stores the note as `<title>.txt`,
/// replacing an existing note with the same title.
pub async fn create_note(
    client: &ApiClient,
    vault_name: &str,
    title: &str,
    content: &str,
) -> Result<Option<String>, ApiError> {
    if vault_name.is_empty() || title.is_empty() {
        return Err(ApiError::validation(
            "Vault name, note title, and content are required to create a note.",
        ));
    }

    let form = Form::new()
        .text("vaultName", vault_name.to_string())
        .text("noteTitle", title.to_string())
        .text("noteContent", content.to_string());
    let resp = client.post_multipart("/notes", form).await?;
    handle_response(resp).await?.into_message()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;

    fn drain(rx: &mut mpsc::UnboundedReceiver<f64>) -> Vec<f64> {
        let mut values = Vec::new();
        while let Ok(v) = rx.try_recv() {
            values.push(v);
        }
        values
    }

    fn temp_upload(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    fn assert_progress_complete(values: &[f64]) {
        assert!(!values.is_empty());
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{:?}", values);
        assert_eq!(*values.last().unwrap(), 100.0);
    }

    #[test]
    fn test_download_url_encodes_components() {
        let client = ApiClient::new("https://host/api/drive");
        assert_eq!(
            download_url(&client, "myvault", "notes.txt").unwrap(),
            "https://host/api/drive/download?vaultName=myvault&fileName=notes.txt"
        );
        assert_eq!(
            download_url(&client, "my vault", "a&b=c.txt").unwrap(),
            "https://host/api/drive/download?vaultName=my%20vault&fileName=a%26b%3Dc.txt"
        );
    }

    #[test]
    fn test_download_url_requires_both_names() {
        let client = ApiClient::new("https://host/api/drive");
        assert!(matches!(
            download_url(&client, "", "notes.txt"),
            Err(ApiError::Validation(_))
        ));
        assert!(download_url(&client, "myvault", "").is_err());
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 100.0);
        assert_eq!(percent(50, 200), 25.0);
        assert_eq!(percent(300, 200), 100.0);
    }

    #[tokio::test]
    async fn test_list_files() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/files")
            .match_query(Matcher::UrlEncoded("vaultName".into(), "v1".into()))
            .with_status(200)
            .with_body(r#"{"files":[{"name":"a.txt","size":12,"uploaded":"2024-01-01T00:00:00Z"}]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url());
        let list = list_files(&client, "v1").await.unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].name, "a.txt");
        assert_eq!(list.files[0].size, 12);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_reports_monotonic_progress() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_query(Matcher::UrlEncoded("vaultName".into(), "v1".into()))
            .match_body(Matcher::Regex("name=\"file\"; filename=\"big.bin\"".into()))
            .with_status(200)
            .with_body("Uploaded")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = temp_upload(&dir, "big.bin", &vec![7u8; CHUNK_SIZE * 3 + 10]);
        let client = ApiClient::new(&server.url());
        let file = UploadFile::from_path(&path).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        upload_file(&client, "v1", &file, Some(tx)).await.unwrap();

        let values = drain(&mut rx);
        assert!(values.len() >= 4);
        assert_progress_complete(&values);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_empty_file_still_reaches_100() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload")
            .match_query(Matcher::Any)
            .with_status(204)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = temp_upload(&dir, "empty.txt", b"");
        let client = ApiClient::new(&server.url());
        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.size(), 0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        upload_file(&client, "v1", &file, Some(tx)).await.unwrap();
        assert_progress_complete(&drain(&mut rx));
    }

    #[tokio::test]
    async fn test_upload_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello vault").unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex("hello vault".into()))
            .with_status(201)
            .with_body(r#"{"message":"ok"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url());
        let file = UploadFile::from_path(tmp.path()).await.unwrap();
        assert_eq!(file.size(), 11);

        upload_file(&client, "v1", &file, None).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload")
            .match_query(Matcher::Any)
            .with_status(413)
            .with_body(r#"{"error":"Storage limit exceeded"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = temp_upload(&dir, "a.bin", &[1u8; 10]);
        let client = ApiClient::new(&server.url());
        let file = UploadFile::from_path(&path).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let err = upload_file(&client, "v1", &file, Some(tx)).await.unwrap_err();
        assert_eq!(err.to_string(), "Storage limit exceeded");
        assert!(drain(&mut rx).iter().all(|v| *v <= 100.0));
    }

    #[tokio::test]
    async fn test_delete_no_content_is_none() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/delete")
            .match_body(Matcher::Json(serde_json::json!({
                "vaultName": "v1",
                "fileName": "a.txt"
            })))
            .with_status(204)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url());
        assert_eq!(delete_file(&client, "v1", "a.txt").await.unwrap(), None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_with_confirmation_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/delete")
            .with_status(200)
            .with_body(r#"{"message":"File deleted"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url());
        assert_eq!(
            delete_file(&client, "v1", "a.txt").await.unwrap().as_deref(),
            Some("File deleted")
        );
    }

    #[tokio::test]
    async fn test_note_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/notes")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"noteTitle\"\r\n\r\nIdeas".into()),
                Matcher::Regex("name=\"noteContent\"\r\n\r\nbuy milk".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"message":"Note saved"}"#)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/download")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("vaultName".into(), "v1".into()),
                Matcher::UrlEncoded("fileName".into(), "Ideas.txt".into()),
            ]))
            .with_status(200)
            .with_header("Content-Disposition", "attachment; filename=\"Ideas.txt\"")
            .with_body("buy milk")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url());
        create_note(&client, "v1", "Ideas", "buy milk").await.unwrap();
        let text = read_note(&client, "v1", "Ideas.txt").await.unwrap();

        assert_eq!(text, "buy milk");
        create.assert_async().await;
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_note_requires_title() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = create_note(&client, "v1", "", "text").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_download_missing_file() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/download")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":"File not found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url());
        let err = download_file(&client, "v1", "gone.txt").await.unwrap_err();
        assert_eq!(err.to_string(), "File not found");
    }
}
