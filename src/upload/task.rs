//! Per-file upload state machine.
//!
//! `Pending -> Uploading -> (Succeeded | Failed)`. Progress only moves
//! forward while uploading; a failed task keeps the last reported value.

use crate::api::UploadFile;

/// All states an upload task can be in.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    /// Waiting for every earlier task in the batch to finish.
    Pending,
    Uploading,
    Succeeded,
    /// Upload rejected, with the human-readable reason.
    Failed { error: String },
}

impl UploadStatus {
    /// Short label for terminal output.
    pub fn label(&self) -> &str {
        match self {
            UploadStatus::Pending => "Pending",
            UploadStatus::Uploading => "Uploading...",
            UploadStatus::Succeeded => "Uploaded",
            UploadStatus::Failed { .. } => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Succeeded | UploadStatus::Failed { .. })
    }
}

/// One file in a batch together with its progress and status.
#[derive(Debug, Clone)]
pub struct UploadTask {
    file: UploadFile,
    progress: f64,
    status: UploadStatus,
}

impl UploadTask {
    pub fn new(file: UploadFile) -> Self {
        Self {
            file,
            progress: 0.0,
            status: UploadStatus::Pending,
        }
    }

    pub fn file(&self) -> &UploadFile {
        &self.file
    }

    /// Completion percentage, 0..=100.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            UploadStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Pending -> Uploading. Returns `false` if the task was not pending.
    pub(crate) fn start(&mut self) -> bool {
        if self.status != UploadStatus::Pending {
            log::warn!("Cannot start {}: already {}", self.file.name(), self.status.label());
            return false;
        }
        self.status = UploadStatus::Uploading;
        true
    }

    /// Record a progress report. Returns `true` if the stored value moved.
    ///
    /// Reports lower than the current value are ignored.
    pub(crate) fn record_progress(&mut self, percent: f64) -> bool {
        if self.status != UploadStatus::Uploading {
            return false;
        }
        let next = self.progress.max(percent).clamp(0.0, 100.0);
        if next > self.progress {
            self.progress = next;
            true
        } else {
            false
        }
    }

    /// Uploading -> Succeeded, progress forced to 100.
    pub(crate) fn succeed(&mut self) -> bool {
        if self.status != UploadStatus::Uploading {
            log::warn!("Cannot complete {}: {}", self.file.name(), self.status.label());
            return false;
        }
        self.progress = 100.0;
        self.status = UploadStatus::Succeeded;
        true
    }

    /// Uploading -> Failed, progress frozen.
    pub(crate) fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status != UploadStatus::Uploading {
            log::warn!("Cannot fail {}: {}", self.file.name(), self.status.label());
            return false;
        }
        self.status = UploadStatus::Failed {
            error: error.into(),
        };
        true
    }
}
