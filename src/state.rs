//! Application state for the vaultdrive CLI.
//!
//! Holds the API client and the current vault session. The session is read
//! once when the state is created, replaced on unlock and dropped on logout;
//! nothing else writes it.

use crate::api::ApiClient;
use crate::session::{FileSlot, SessionError, SessionSlot, SessionStore, VaultSession};

/// Message shown when a command needs an unlocked vault.
pub const NOT_UNLOCKED: &str = "No active vault. Run `vaultdrive unlock` first.";

pub struct AppState<D: SessionSlot = FileSlot, S: SessionSlot = FileSlot> {
    /// HTTP client for the vault backend.
    pub api: ApiClient,
    sessions: SessionStore<D, S>,
    session: Option<VaultSession>,
}

impl<D: SessionSlot, S: SessionSlot> AppState<D, S> {
    /// Create the state and restore any stored session.
    pub fn new(api_base_url: &str, sessions: SessionStore<D, S>) -> Result<Self, SessionError> {
        let session = sessions.restore()?;
        if let Some(ref s) = session {
            log::debug!("Restored session for vault {}", s.vault_name);
        }
        Ok(Self {
            api: ApiClient::new(api_base_url),
            sessions,
            session,
        })
    }

    pub fn session(&self) -> Option<&VaultSession> {
        self.session.as_ref()
    }

    /// Vault name of the current session, or an error telling the user to unlock.
    pub fn require_vault(&self) -> Result<&str, String> {
        self.session
            .as_ref()
            .map(|s| s.vault_name.as_str())
            .ok_or_else(|| NOT_UNLOCKED.to_string())
    }

    pub fn start_session(&mut self, vault_name: &str, remember: bool) -> Result<(), SessionError> {
        self.session = Some(self.sessions.save(vault_name, remember)?);
        Ok(())
    }

    pub fn end_session(&mut self) -> Result<(), SessionError> {
        self.session = None;
        self.sessions.clear()
    }
}
