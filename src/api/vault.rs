//! Vault-level operations: unlock, storage usage, PIN change and rename.
//!
//! These are the only calls that carry the PIN; everything else is
//! authorized by the vault name alone.

use super::client::{handle_response, ApiClient};
use super::error::ApiError;
use super::types::{AuthRequest, AuthResponse, ChangePinRequest, RenameVaultRequest, UsageResponse};
use crate::validate;

/// Message used when the backend gives no reason for a failed unlock.
pub const AUTH_FAILED: &str = "Authentication failed. Invalid PIN or server issue.";

/// Unlock a vault with its PIN and return the vault name.
///
/// POST /auth. Malformed PINs are rejected locally and never sent.
pub async fn authenticate(client: &ApiClient, pin: &str) -> Result<String, ApiError> {
    validate::pin(pin, "PIN")?;

    let resp = client.post_json("/auth", &AuthRequest { pin }).await?;
    let status = resp.status();
    let auth: AuthResponse = handle_response(resp).await?.into_json()?;

    if !auth.success {
        let message = auth
            .error
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| AUTH_FAILED.to_string());
        return Err(ApiError::Server { status, message });
    }
    match auth.vault_name {
        Some(name) if !name.is_empty() => {
            log::info!("Vault unlocked: {}", name);
            Ok(name)
        }
        _ => Err(ApiError::Parse(AUTH_FAILED.to_string())),
    }
}

/// GET /usage?vaultName=
pub async fn get_usage(client: &ApiClient, vault_name: &str) -> Result<UsageResponse, ApiError> {
    validate::required(vault_name, "Vault name is required to get usage.")?;

    let path = format!("/usage?vaultName={}", urlencoding::encode(vault_name));
    let resp = client.get(&path).await?;
    handle_response(resp).await?.into_json()
}

/// POST /change-pin. Returns the server's confirmation message.
pub async fn change_pin(
    client: &ApiClient,
    vault_name: &str,
    old_pin: &str,
    new_pin: &str,
) -> Result<Option<String>, ApiError> {
    if vault_name.is_empty() || old_pin.is_empty() || new_pin.is_empty() {
        return Err(ApiError::validation(
            "Vault name, old PIN, and new PIN are required.",
        ));
    }

    let body = ChangePinRequest {
        vault_name,
        old_pin,
        new_pin,
    };
    let resp = client.post_json("/change-pin", &body).await?;
    handle_response(resp).await?.into_message()
}

/// POST /rename-vault. The old vault name stops working once this succeeds,
/// so the caller must end its session.
pub async fn rename_vault(
    client: &ApiClient,
    current_vault_name: &str,
    new_vault_name: &str,
    pin: &str,
) -> Result<Option<String>, ApiError> {
    if current_vault_name.is_empty() || new_vault_name.is_empty() || pin.is_empty() {
        return Err(ApiError::validation(
            "Current vault name, new vault name, and PIN are required.",
        ));
    }

    let body = RenameVaultRequest {
        current_vault_name,
        new_vault_name,
        pin,
    };
    let resp = client.post_json("/rename-vault", &body).await?;
    let message = handle_response(resp).await?.into_message()?;
    log::info!("Vault renamed: {} -> {}", current_vault_name, new_vault_name);
    Ok(message)
}
