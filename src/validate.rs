//! Local input checks run before any request is sent.

use crate::api::error::ApiError;

pub const PIN_LENGTH: usize = 6;

const VAULT_NAME_MIN: usize = 3;
const VAULT_NAME_MAX: usize = 50;

/// A PIN is exactly six ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}

pub fn pin(pin: &str, label: &str) -> Result<(), ApiError> {
    if is_valid_pin(pin) {
        Ok(())
    } else {
        Err(ApiError::validation(format!("{} must be a 6-digit number.", label)))
    }
}

/// Vault names are 3-50 characters of `[A-Za-z0-9_-]`.
pub fn is_valid_vault_name(name: &str) -> bool {
    (VAULT_NAME_MIN..=VAULT_NAME_MAX).contains(&name.len())
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

pub fn required(value: &str, message: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        Err(ApiError::validation(message))
    } else {
        Ok(())
    }
}

/// Checks for the change-PIN form.
pub fn change_pin(vault_name: &str, old_pin: &str, new_pin: &str) -> Result<(), ApiError> {
    required(vault_name.trim(), "Vault name is required.")?;
    pin(old_pin, "Old PIN")?;
    pin(new_pin, "New PIN")?;
    if old_pin == new_pin {
        return Err(ApiError::validation("New PIN cannot be the same as the old PIN."));
    }
    Ok(())
}

/// Checks for the rename form. `new_name` is expected to be trimmed.
pub fn rename_vault(current: &str, new_name: &str, verify_pin: &str) -> Result<(), ApiError> {
    required(current, "Current vault name is missing.")?;
    required(new_name, "New vault name is required.")?;
    if !is_valid_vault_name(new_name) {
        return Err(ApiError::validation(
            "New vault name is invalid. Use 3-50 alphanumeric characters, underscores, or hyphens.",
        ));
    }
    if current == new_name {
        return Err(ApiError::validation(
            "New vault name must be different from the current name.",
        ));
    }
    pin(verify_pin, "PIN")
}
