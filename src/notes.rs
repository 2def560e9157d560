//! Plaintext notes.
//!
//! A note is an ordinary vault file named `<title>.txt`. Drafts are either
//! new (title chosen by the user) or edits of an existing note, whose title
//! comes from the file name and cannot change.

use crate::api::files;
use crate::api::{ApiClient, ApiError};

pub const NOTE_EXTENSION: &str = ".txt";

const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"];

fn has_suffix_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Whether a vault file is a note.
pub fn is_note(file_name: &str) -> bool {
    has_suffix_ignore_case(file_name, NOTE_EXTENSION)
}

/// Whether a vault file can be previewed (notes and common images).
pub fn is_previewable(file_name: &str) -> bool {
    is_note(file_name) || is_image(file_name)
}

pub fn is_image(file_name: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| has_suffix_ignore_case(file_name, ext))
}

/// Note title for a file name, with any `.txt` suffix removed.
pub fn title_from_file_name(file_name: &str) -> &str {
    if is_note(file_name) {
        &file_name[..file_name.len() - NOTE_EXTENSION.len()]
    } else {
        file_name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteDraft {
    title: String,
    pub content: String,
    editing: bool,
}

impl NoteDraft {
    /// Draft a new note. Title and content must not be blank.
    pub fn new(title: &str, content: impl Into<String>) -> Result<Self, ApiError> {
        let title = title.trim();
        let content = content.into();
        if title.is_empty() {
            return Err(ApiError::validation("Note title cannot be empty."));
        }
        if content.trim().is_empty() {
            return Err(ApiError::validation(
                "Note content cannot be empty for a new note.",
            ));
        }
        Ok(Self {
            title: title.to_string(),
            content,
            editing: false,
        })
    }

    /// Draft an edit of an existing note file. Empty content is allowed.
    pub fn edit(file_name: &str, content: impl Into<String>) -> Result<Self, ApiError> {
        let title = title_from_file_name(file_name);
        if title.is_empty() {
            return Err(ApiError::validation("Note title cannot be empty."));
        }
        Ok(Self {
            title: title.to_string(),
            content: content.into(),
            editing: true,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_edit(&self) -> bool {
        self.editing
    }

    /// Name the backend stores the note under.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.title, NOTE_EXTENSION)
    }

    /// Submit the draft through POST /notes.
    pub async fn save(&self, client: &ApiClient, vault_name: &str) -> Result<Option<String>, ApiError> {
        files::create_note(client, vault_name, &self.title, &self.content).await
    }
}
