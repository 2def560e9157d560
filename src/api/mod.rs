//! API client module for the vault backend.
//!
//! Provides the HTTP client with response/error normalization, vault-level
//! operations (unlock, usage, PIN change, rename), file and note operations,
//! and request/response types matching the backend's JSON format.

pub mod client;
pub mod error;
pub mod files;
pub mod types;
pub mod vault;

pub use client::ApiClient;
pub use error::ApiError;
pub use files::{ProgressSender, UploadFile};
