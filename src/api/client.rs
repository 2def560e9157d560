//! HTTP client wrapper and response normalization.
//!
//! Every operation goes through `handle_response`, which turns a raw
//! `reqwest::Response` into a `Payload` or an `ApiError` with the message
//! priority: JSON `error` field, then status text, then a generic string.

use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, GENERIC_FAILURE};
use super::types::MessageResponse;

/// Base URL baked in at build time, e.g. `https://drive.example.com/api/drive`.
pub const DEFAULT_BASE_URL: &str = match option_env!("VAULTDRIVE_API_URL") {
    Some(url) => url,
    None => "https://drive.plabuwu.workers.dev/api/drive",
};

/// HTTP client for the vault backend.
///
/// Stateless apart from the connection pool: credentials are passed to each
/// operation explicitly.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

/// Normalized body of a successful response.
#[derive(Debug, PartialEq)]
pub enum Payload {
    /// 204 No Content.
    Empty,
    /// Body sent with an attachment disposition.
    Binary(Vec<u8>),
    Json(serde_json::Value),
}

impl Payload {
    /// Deserialize a JSON payload into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Payload::Json(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::Parse(format!("Unexpected response shape: {}", e))),
            Payload::Empty => Err(ApiError::Parse("Empty response body".to_string())),
            Payload::Binary(_) => Err(ApiError::Parse(
                "Expected JSON but received a file attachment".to_string(),
            )),
        }
    }

    /// Confirmation message of a `{message}` body; `None` for empty bodies.
    pub fn into_message(self) -> Result<Option<String>, ApiError> {
        match self {
            Payload::Empty => Ok(None),
            other => Ok(other.into_json::<MessageResponse>()?.message),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl ApiClient {
    /// Create a new API client with the given base URL.
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get(&self, path: &str) -> Result<Response, ApiError> {
        log::debug!("GET {}", path);
        Ok(self.client.get(self.url(path)).send().await?)
    }

    pub(crate) async fn post_json<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ApiError> {
        log::debug!("POST {}", path);
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }

    pub(crate) async fn delete_json<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ApiError> {
        log::debug!("DELETE {}", path);
        Ok(self.client.delete(self.url(path)).json(body).send().await?)
    }

    pub(crate) async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<Response, ApiError> {
        log::debug!("POST {} (multipart)", path);
        Ok(self.client.post(self.url(path)).multipart(form).send().await?)
    }
}

/// Normalize a response into a payload or an error.
pub async fn handle_response(resp: Response) -> Result<Payload, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(error_from_response(resp).await);
    }
    if status == StatusCode::NO_CONTENT {
        return Ok(Payload::Empty);
    }
    if is_attachment(resp.headers()) {
        return Ok(Payload::Binary(resp.bytes().await?.to_vec()));
    }

    let body = resp.bytes().await?;
    serde_json::from_slice(&body)
        .map(Payload::Json)
        .map_err(|e| ApiError::Parse(format!("Failed to parse response: {}", e)))
}

/// Build the error for a non-2xx response.
pub async fn error_from_response(resp: Response) -> ApiError {
    let status = resp.status();
    let body = resp.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| GENERIC_FAILURE.to_string());
    log::debug!("Request failed ({}): {}", status, message);
    ApiError::Server { status, message }
}

fn is_attachment(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fetch(server: &mockito::ServerGuard, path: &str) -> Result<Payload, ApiError> {
        let client = ApiClient::new(&server.url());
        let resp = client.get(path).await?;
        handle_response(resp).await
    }

    #[tokio::test]
    async fn test_error_prefers_json_error_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/x")
            .with_status(400)
            .with_body(r#"{"error":"Vault is locked"}"#)
            .create_async()
            .await;

        let err = fetch(&server, "/x").await.unwrap_err();
        assert_eq!(err.to_string(), "Vault is locked");
        assert!(matches!(
            err,
            ApiError::Server {
                status: StatusCode::BAD_REQUEST,
                ..
            }
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_falls_back_to_status_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/x")
            .with_status(404)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = fetch(&server, "/x").await.unwrap_err();
        assert_eq!(err.to_string(), "Not Found");
    }

    #[tokio::test]
    async fn test_error_falls_back_to_generic_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/x")
            .with_status(599)
            .create_async()
            .await;

        let err = fetch(&server, "/x").await.unwrap_err();
        assert_eq!(err.to_string(), GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_no_content_is_empty_payload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/x")
            .with_status(204)
            .create_async()
            .await;

        assert_eq!(fetch(&server, "/x").await.unwrap(), Payload::Empty);
    }

    #[tokio::test]
    async fn test_attachment_is_binary_payload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/x")
            .with_status(200)
            .with_header("Content-Disposition", "attachment; filename=\"a.bin\"")
            .with_body(vec![0u8, 159, 146, 150])
            .create_async()
            .await;

        assert_eq!(
            fetch(&server, "/x").await.unwrap(),
            Payload::Binary(vec![0, 159, 146, 150])
        );
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/x")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        assert!(matches!(fetch(&server, "/x").await, Err(ApiError::Parse(_))));
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let result = client.get("/x").await;
        assert!(matches!(result, Err(ApiError::Network(_))));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = ApiClient::new("https://host/api/drive/");
        assert_eq!(client.base_url(), "https://host/api/drive");
        assert_eq!(client.url("/auth"), "https://host/api/drive/auth");
    }

    #[test]
    fn test_into_message() {
        assert_eq!(Payload::Empty.into_message().unwrap(), None);
        let json = Payload::Json(serde_json::json!({"message": "done"}));
        assert_eq!(json.into_message().unwrap(), Some("done".to_string()));
    }
}
