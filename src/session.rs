//! Vault session persistence.
//!
//! The unlocked vault's name is kept in one of two slots under the key
//! `currentVault`: a durable slot when the user asked to be remembered, or a
//! session-scoped slot otherwise. The session is read once at startup,
//! written on unlock and cleared on logout.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// File name used for the vault identifier in both slots.
pub const SESSION_KEY: &str = "currentVault";

const APP_DIR: &str = "vaultdrive";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage failed: {0}")]
    Io(#[from] io::Error),
}

/// A single key/value slot holding the vault name.
pub trait SessionSlot {
    fn load(&self) -> Result<Option<String>, SessionError>;
    fn store(&self, vault_name: &str) -> Result<(), SessionError>;
    /// Idempotent: clearing an empty slot succeeds.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Slot backed by a `currentVault` file in a directory.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_KEY),
        }
    }

    /// Durable slot under the user's config directory.
    pub fn durable() -> Self {
        let base = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(&base.join(APP_DIR))
    }

    /// Slot that does not outlive the login session (runtime dir, or the
    /// temp dir where there is none).
    pub fn session_scoped() -> Self {
        let base = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(&base.join(APP_DIR))
    }
}

impl SessionSlot for FileSlot {
    fn load(&self) -> Result<Option<String>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(s) => {
                let name = s.trim();
                Ok((!name.is_empty()).then(|| name.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, vault_name: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, vault_name)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The currently unlocked vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSession {
    pub vault_name: String,
    /// Whether the session lives in the durable slot.
    pub remembered: bool,
}

/// Reads and writes the session across the durable and scoped slots.
pub struct SessionStore<D: SessionSlot, S: SessionSlot> {
    durable: D,
    scoped: S,
}

impl SessionStore<FileSlot, FileSlot> {
    /// Store using the default per-user slot locations.
    pub fn open_default() -> Self {
        Self::new(FileSlot::durable(), FileSlot::session_scoped())
    }
}

impl<D: SessionSlot, S: SessionSlot> SessionStore<D, S> {
    pub fn new(durable: D, scoped: S) -> Self {
        Self { durable, scoped }
    }

    /// Restore the session, preferring the durable slot.
    ///
    /// Returns `None` if neither slot holds a vault: the user must unlock.
    pub fn restore(&self) -> Result<Option<VaultSession>, SessionError> {
        if let Some(vault_name) = self.durable.load()? {
            return Ok(Some(VaultSession {
                vault_name,
                remembered: true,
            }));
        }
        Ok(self.scoped.load()?.map(|vault_name| VaultSession {
            vault_name,
            remembered: false,
        }))
    }

    /// Persist a freshly unlocked vault in exactly one slot.
    pub fn save(&self, vault_name: &str, remember: bool) -> Result<VaultSession, SessionError> {
        if remember {
            self.durable.store(vault_name)?;
            self.scoped.clear()?;
        } else {
            self.scoped.store(vault_name)?;
            self.durable.clear()?;
        }
        log::info!("Session started for vault {} (remembered: {})", vault_name, remember);
        Ok(VaultSession {
            vault_name: vault_name.to_string(),
            remembered: remember,
        })
    }

    /// End the session: both slots are emptied.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.durable.clear()?;
        self.scoped.clear()?;
        log::info!("Session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> SessionStore<FileSlot, FileSlot> {
        SessionStore::new(
            FileSlot::new(&dir.path().join("durable")),
            FileSlot::new(&dir.path().join("scoped")),
        )
    }

    #[test]
    fn test_restore_without_session() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store(&dir).restore().unwrap(), None);
    }

    #[test]
    fn test_save_scoped_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = store(&dir);
        sessions.save("myvault", false).unwrap();

        let restored = sessions.restore().unwrap().unwrap();
        assert_eq!(restored.vault_name, "myvault");
        assert!(!restored.remembered);
        assert!(!dir.path().join("durable").join(SESSION_KEY).exists());
    }

    #[test]
    fn test_remember_moves_session_to_durable_slot() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = store(&dir);
        sessions.save("first", false).unwrap();
        sessions.save("second", true).unwrap();

        let restored = sessions.restore().unwrap().unwrap();
        assert_eq!(restored.vault_name, "second");
        assert!(restored.remembered);
        assert!(!dir.path().join("scoped").join(SESSION_KEY).exists());
    }

    #[test]
    fn test_durable_slot_wins_on_restore() {
        let dir = tempfile::tempdir().unwrap();
        let durable = FileSlot::new(&dir.path().join("durable"));
        let scoped = FileSlot::new(&dir.path().join("scoped"));
        durable.store("kept").unwrap();
        scoped.store("tab").unwrap();

        let restored = SessionStore::new(durable, scoped).restore().unwrap().unwrap();
        assert_eq!(restored.vault_name, "kept");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = store(&dir);
        sessions.save("myvault", true).unwrap();
        sessions.clear().unwrap();
        sessions.clear().unwrap();
        assert_eq!(sessions.restore().unwrap(), None);
    }

    #[test]
    fn test_blank_slot_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path());
        slot.store("  \n").unwrap();
        assert_eq!(slot.load().unwrap(), None);
    }
}
