//! Request and response types for the vault backend API.
//!
//! All structs use camelCase serialization to match the API's JSON format.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authenticate request body sent to POST /auth.
#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub pin: &'a str,
}

/// Authenticate response from POST /auth.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    pub vault_name: Option<String>,
    /// Reason given when `success` is false.
    pub error: Option<String>,
}

/// Storage usage from GET /usage, both values in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub current_size: u64,
    pub limit: u64,
}

/// Change PIN request body sent to POST /change-pin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePinRequest<'a> {
    pub vault_name: &'a str,
    pub old_pin: &'a str,
    pub new_pin: &'a str,
}

/// Rename request body sent to POST /rename-vault.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameVaultRequest<'a> {
    pub current_vault_name: &'a str,
    pub new_vault_name: &'a str,
    pub pin: &'a str,
}

/// Delete request body sent to DELETE /delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileRequest<'a> {
    pub vault_name: &'a str,
    pub file_name: &'a str,
}

/// Generic confirmation body (`{message}`) returned by mutating endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct MessageResponse {
    pub message: Option<String>,
}

/// Upload time as reported by the backend.
///
/// The backend has sent both ISO strings and epoch milliseconds, the
/// latter as integers or floats.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Text(String),
    Epoch(serde_json::Number),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Text(s) => f.write_str(s),
            Timestamp::Epoch(n) => write!(f, "{}", n),
        }
    }
}

/// One entry of GET /files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    pub uploaded: Option<Timestamp>,
}

/// Response from GET /files.
#[derive(Debug, Default, Deserialize)]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}
