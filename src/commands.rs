//! Command handlers for the vaultdrive CLI.
//!
//! Each handler maps one user flow onto API calls and prints the result.
//! Handlers return `Err(message)` with a human-readable reason; `main`
//! prints it and exits non-zero.

use std::io::Read;
use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Password};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use zeroize::Zeroizing;

use crate::api::{files, vault, ApiError, UploadFile};
use crate::notes::{self, NoteDraft};
use crate::session::SessionSlot;
use crate::state::AppState;
use crate::upload::{BatchEvent, BatchUploader};
use crate::validate;

const SIZE_UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Format a byte count in 1024-based units with up to two decimals.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// Prompt for a PIN without echoing it.
pub fn prompt_pin(prompt: &str) -> Result<Zeroizing<String>, String> {
    Password::new()
        .with_prompt(prompt)
        .interact()
        .map(Zeroizing::new)
        .map_err(|e| format!("Failed to read PIN: {}", e))
}

fn read_stdin() -> Result<String, String> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .map_err(|e| format!("Failed to read stdin: {}", e))?;
    Ok(content)
}

fn session_err(e: crate::session::SessionError) -> String {
    e.to_string()
}

/// Unlock a vault and store the session.
pub async fn unlock<D: SessionSlot, S: SessionSlot>(
    state: &mut AppState<D, S>,
    pin: &str,
    remember: bool,
) -> Result<(), String> {
    if !validate::is_valid_pin(pin) {
        return Err("PIN must be 6 digits.".to_string());
    }
    let vault_name = vault::authenticate(&state.api, pin)
        .await
        .map_err(|e| e.to_string())?;
    state
        .start_session(&vault_name, remember)
        .map_err(session_err)?;
    println!("Unlocked vault '{}'", vault_name);
    Ok(())
}

pub fn logout<D: SessionSlot, S: SessionSlot>(state: &mut AppState<D, S>) -> Result<(), String> {
    state.end_session().map_err(session_err)?;
    println!("Logged out");
    Ok(())
}

pub fn status<D: SessionSlot, S: SessionSlot>(state: &AppState<D, S>) -> Result<(), String> {
    match state.session() {
        Some(s) if s.remembered => println!("Unlocked: {} (remembered)", s.vault_name),
        Some(s) => println!("Unlocked: {}", s.vault_name),
        None => println!("Locked"),
    }
    Ok(())
}

pub async fn usage<D: SessionSlot, S: SessionSlot>(state: &AppState<D, S>) -> Result<(), String> {
    let vault_name = state.require_vault()?;
    let usage = vault::get_usage(&state.api, vault_name)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", usage_line(usage.current_size, usage.limit));
    Ok(())
}

fn usage_line(current: u64, limit: u64) -> String {
    if limit == 0 {
        return format!("{} used", format_bytes(current));
    }
    let pct = current as f64 / limit as f64 * 100.0;
    format!(
        "{} of {} used ({:.1}%)",
        format_bytes(current),
        format_bytes(limit),
        pct
    )
}

/// List vault files. An authorization failure ends the session.
pub async fn list<D: SessionSlot, S: SessionSlot>(state: &mut AppState<D, S>) -> Result<(), String> {
    let vault_name = state.require_vault()?.to_string();
    let listing = match files::list_files(&state.api, &vault_name).await {
        Ok(listing) => listing,
        Err(e) => return Err(end_session_if_unauthorized(state, e)),
    };

    if listing.files.is_empty() {
        println!("Vault is empty");
        return Ok(());
    }
    for file in &listing.files {
        let uploaded = file
            .uploaded
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_default();
        println!("{:<40} {:>12}  {}", file.name, format_bytes(file.size), uploaded);
    }
    Ok(())
}

fn end_session_if_unauthorized<D: SessionSlot, S: SessionSlot>(
    state: &mut AppState<D, S>,
    err: ApiError,
) -> String {
    if err.is_unauthorized() {
        log::warn!("Vault rejected, ending session: {}", err);
        if let Err(e) = state.end_session() {
            log::warn!("Failed to clear session: {}", e);
        }
        return format!("{} (session ended, unlock again)", err);
    }
    err.to_string()
}

/// Upload files one at a time, then refresh the usage display.
pub async fn upload<D: SessionSlot, S: SessionSlot>(
    state: &AppState<D, S>,
    paths: &[PathBuf],
) -> Result<(), String> {
    let vault_name = state.require_vault()?;

    let mut selected = Vec::with_capacity(paths.len());
    for path in paths {
        let file = UploadFile::from_path(path)
            .await
            .map_err(|e| format!("Cannot upload {}: {}", path.display(), e))?;
        selected.push(file);
    }
    let count = selected.len();

    let (refresh_tx, mut refresh_rx) = mpsc::channel(1);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut batch = BatchUploader::new(selected)
        .with_refresh(refresh_tx)
        .with_events(events_tx);

    let (outcome, ()) = tokio::join!(
        batch.run(&state.api, vault_name),
        render_progress(events_rx, count)
    );

    if refresh_rx.try_recv().is_ok() {
        match vault::get_usage(&state.api, vault_name).await {
            Ok(u) => println!("{}", usage_line(u.current_size, u.limit)),
            Err(e) => log::warn!("Failed to refresh usage: {}", e),
        }
    }

    if outcome.all_succeeded() {
        println!("Uploaded {} file(s)", outcome.succeeded);
        Ok(())
    } else {
        for task in batch.tasks() {
            if let Some(error) = task.error() {
                eprintln!("  {}: {}", task.file().name(), error);
            }
        }
        Err(format!(
            "{} of {} upload(s) failed",
            outcome.failed,
            outcome.succeeded + outcome.failed
        ))
    }
}

/// Draw one progress bar per file until every file reached a terminal state.
async fn render_progress(mut events: mpsc::UnboundedReceiver<BatchEvent>, count: usize) {
    let style = ProgressStyle::with_template("{msg:30} [{bar:30}] {pos:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let mut bar: Option<ProgressBar> = None;
    let mut finished = 0;

    while finished < count {
        let Some(event) = events.recv().await else {
            break;
        };
        match event {
            BatchEvent::Started { name, .. } => {
                let pb = ProgressBar::new(100).with_style(style.clone());
                pb.set_message(name);
                bar = Some(pb);
            }
            BatchEvent::Progress { percent, .. } => {
                if let Some(ref pb) = bar {
                    pb.set_position(percent as u64);
                }
            }
            BatchEvent::Succeeded { .. } => {
                if let Some(pb) = bar.take() {
                    pb.set_position(100);
                    pb.finish();
                }
                finished += 1;
            }
            BatchEvent::Failed { error, .. } => {
                if let Some(pb) = bar.take() {
                    pb.abandon_with_message(format!("failed: {}", error));
                }
                finished += 1;
            }
        }
    }
}

pub async fn download<D: SessionSlot, S: SessionSlot>(
    state: &AppState<D, S>,
    file_name: &str,
    output: Option<&Path>,
) -> Result<(), String> {
    let vault_name = state.require_vault()?;
    let bytes = files::download_file(&state.api, vault_name, file_name)
        .await
        .map_err(|e| e.to_string())?;

    let target = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(file_name));
    tokio::fs::write(&target, &bytes)
        .await
        .map_err(|e| format!("Failed to write {}: {}", target.display(), e))?;
    println!("Saved {} ({})", target.display(), format_bytes(bytes.len() as u64));
    Ok(())
}

pub fn url<D: SessionSlot, S: SessionSlot>(state: &AppState<D, S>, file_name: &str) -> Result<(), String> {
    let vault_name = state.require_vault()?;
    let url = files::download_url(&state.api, vault_name, file_name).map_err(|e| e.to_string())?;
    println!("{}", url);
    Ok(())
}

/// Print a note's text. Images can only be downloaded.
pub async fn preview<D: SessionSlot, S: SessionSlot>(
    state: &AppState<D, S>,
    file_name: &str,
) -> Result<(), String> {
    let vault_name = state.require_vault()?;
    if !notes::is_previewable(file_name) {
        return Err(format!("{} cannot be previewed", file_name));
    }
    if notes::is_image(file_name) {
        return Err(format!(
            "{} is an image; use `vaultdrive download` to view it",
            file_name
        ));
    }
    let text = files::read_note(&state.api, vault_name, file_name)
        .await
        .map_err(|e| format!("Could not load preview: {}", e))?;
    print!("{}", text);
    Ok(())
}

pub async fn remove<D: SessionSlot, S: SessionSlot>(
    state: &AppState<D, S>,
    file_name: &str,
    confirmed: bool,
) -> Result<(), String> {
    let vault_name = state.require_vault()?;
    if !confirmed {
        let ok = Confirm::new()
            .with_prompt(format!("Delete {}?", file_name))
            .default(false)
            .interact()
            .map_err(|e| format!("Failed to read confirmation: {}", e))?;
        if !ok {
            println!("Cancelled");
            return Ok(());
        }
    }
    let message = files::delete_file(&state.api, vault_name, file_name)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", message.unwrap_or_else(|| format!("Deleted {}", file_name)));
    Ok(())
}

/// Create a note. Content is read from stdin when not given.
pub async fn note_new<D: SessionSlot, S: SessionSlot>(
    state: &AppState<D, S>,
    title: &str,
    content: Option<String>,
) -> Result<(), String> {
    let vault_name = state.require_vault()?;
    let content = match content {
        Some(c) => c,
        None => read_stdin()?,
    };
    let draft = NoteDraft::new(title, content).map_err(|e| e.to_string())?;
    save_note(state, vault_name, &draft).await
}

/// Replace the content of an existing note, keeping its title.
pub async fn note_edit<D: SessionSlot, S: SessionSlot>(
    state: &AppState<D, S>,
    file_name: &str,
    content: Option<String>,
) -> Result<(), String> {
    let vault_name = state.require_vault()?;
    if !notes::is_note(file_name) {
        return Err(format!("{} is not a note", file_name));
    }
    // Make sure the note exists before replacing it.
    files::read_note(&state.api, vault_name, file_name)
        .await
        .map_err(|e| format!("Failed to load note for editing: {}", e))?;

    let content = match content {
        Some(c) => c,
        None => read_stdin()?,
    };
    let draft = NoteDraft::edit(file_name, content).map_err(|e| e.to_string())?;
    save_note(state, vault_name, &draft).await
}

async fn save_note<D: SessionSlot, S: SessionSlot>(
    state: &AppState<D, S>,
    vault_name: &str,
    draft: &NoteDraft,
) -> Result<(), String> {
    let verb = if draft.is_edit() { "update" } else { "save" };
    let message = draft
        .save(&state.api, vault_name)
        .await
        .map_err(|e| format!("Failed to {} note: {}", verb, e))?;
    println!(
        "{}",
        message.unwrap_or_else(|| format!("Saved note '{}' as {}", draft.title(), draft.file_name()))
    );
    Ok(())
}

pub async fn change_pin<D: SessionSlot, S: SessionSlot>(
    state: &AppState<D, S>,
    vault_name: &str,
    old_pin: &str,
    new_pin: &str,
) -> Result<(), String> {
    let vault_name = vault_name.trim();
    validate::change_pin(vault_name, old_pin, new_pin).map_err(|e| e.to_string())?;
    let message = vault::change_pin(&state.api, vault_name, old_pin, new_pin)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", message.unwrap_or_else(|| "PIN changed successfully!".to_string()));
    Ok(())
}

/// Rename the unlocked vault. The session ends because the old name is gone.
pub async fn rename<D: SessionSlot, S: SessionSlot>(
    state: &mut AppState<D, S>,
    new_name: &str,
    pin: &str,
) -> Result<(), String> {
    let current = state.require_vault()?.to_string();
    let new_name = new_name.trim();
    validate::rename_vault(&current, new_name, pin).map_err(|e| e.to_string())?;

    let message = vault::rename_vault(&state.api, &current, new_name, pin)
        .await
        .map_err(|e| e.to_string())?;
    state.end_session().map_err(session_err)?;
    println!(
        "{}",
        message.unwrap_or_else(|| format!("Vault '{}' renamed to '{}'.", current, new_name))
    );
    println!("Logged out; unlock again to continue.");
    Ok(())
}
