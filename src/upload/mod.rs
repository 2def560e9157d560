//! Batch upload controller.
//!
//! Uploads an ordered list of files strictly one at a time: file i+1 is not
//! started until file i has succeeded or failed. Serializing keeps a single
//! progress indicator meaningful and bounds peak bandwidth and memory.
//! Running uploads in parallel would be a change to these ordering
//! guarantees, not an optimization of them.
//!
//! A batch that fully succeeds sends exactly one refresh signal after its
//! last file completes. There is no automatic retry.

pub mod task;

pub use task::{UploadStatus, UploadTask};

use tokio::sync::mpsc;

use crate::api::{files, ApiClient, ApiError, ProgressSender, UploadFile};

/// Channel sender used to tell dependent views (file list, storage usage)
/// to refresh after a fully successful batch.
pub type RefreshTrigger = mpsc::Sender<()>;

/// Failure recorded for every task when there is no unlocked vault.
pub const NO_ACTIVE_VAULT: &str = "No active vault selected.";

/// Status changes published while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started { index: usize, name: String },
    Progress { index: usize, percent: f64 },
    Succeeded { index: usize },
    Failed { index: usize, error: String },
}

/// Trait abstracting the single-file upload for testability.
///
/// In production, `ApiClient` implements this via POST /upload.
/// In tests, a mock implementation controls success, failure and progress.
#[allow(async_fn_in_trait)]
pub trait Uploader {
    /// Upload one file, publishing percentages on `progress`.
    async fn upload(
        &self,
        vault_name: &str,
        file: &UploadFile,
        progress: ProgressSender,
    ) -> Result<(), ApiError>;
}

impl Uploader for ApiClient {
    async fn upload(
        &self,
        vault_name: &str,
        file: &UploadFile,
        progress: ProgressSender,
    ) -> Result<(), ApiError> {
        files::upload_file(self, vault_name, file, Some(progress)).await
    }
}

/// Aggregate result of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchOutcome {
    /// True only for a non-empty batch in which every file succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.succeeded > 0
    }
}

/// Drives a batch of upload tasks one at a time.
pub struct BatchUploader {
    tasks: Vec<UploadTask>,
    refresh: Option<RefreshTrigger>,
    events: Option<mpsc::UnboundedSender<BatchEvent>>,
}

impl BatchUploader {
    /// Create a batch; tasks keep the order of `files`.
    pub fn new(files: Vec<UploadFile>) -> Self {
        Self {
            tasks: files.into_iter().map(UploadTask::new).collect(),
            refresh: None,
            events: None,
        }
    }

    /// Send one `()` on `trigger` when the whole batch succeeds.
    pub fn with_refresh(mut self, trigger: RefreshTrigger) -> Self {
        self.refresh = Some(trigger);
        self
    }

    /// Publish every status change on `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn tasks(&self) -> &[UploadTask] {
        &self.tasks
    }

    /// Upload every pending task in order and return the batch outcome.
    ///
    /// An empty `vault_name` fails every task without sending a request.
    pub async fn run<U: Uploader>(&mut self, uploader: &U, vault_name: &str) -> BatchOutcome {
        log::info!("Uploading batch of {} file(s)", self.tasks.len());

        for index in 0..self.tasks.len() {
            let task = &self.tasks[index];
            if task.status().is_terminal() {
                log::debug!("Skipping {}: {}", task.file().name(), task.status().label());
                continue;
            }
            self.run_task(uploader, vault_name, index).await;
        }

        let outcome = self.outcome();
        log::info!(
            "Batch finished: {} succeeded, {} failed",
            outcome.succeeded,
            outcome.failed
        );

        if outcome.all_succeeded() {
            if let Some(ref trigger) = self.refresh {
                if trigger.send(()).await.is_err() {
                    log::debug!("Refresh receiver dropped");
                }
            }
        }
        outcome
    }

    /// Count terminal states.
    pub fn outcome(&self) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            succeeded: 0,
            failed: 0,
        };
        for task in &self.tasks {
            match task.status() {
                UploadStatus::Succeeded => outcome.succeeded += 1,
                UploadStatus::Failed { .. } => outcome.failed += 1,
                _ => {}
            }
        }
        outcome
    }

    async fn run_task<U: Uploader>(&mut self, uploader: &U, vault_name: &str, index: usize) {
        if !self.tasks[index].start() {
            return;
        }
        let file = self.tasks[index].file().clone();
        self.emit(BatchEvent::Started {
            index,
            name: file.name().to_string(),
        });

        if vault_name.is_empty() {
            self.finish(index, Err(ApiError::validation(NO_ACTIVE_VAULT)));
            return;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let upload = uploader.upload(vault_name, &file, tx);
        tokio::pin!(upload);

        // Drain progress while the request is in flight.
        let result = loop {
            tokio::select! {
                result = &mut upload => break result,
                Some(percent) = rx.recv() => self.apply_progress(index, percent),
            }
        };
        while let Ok(percent) = rx.try_recv() {
            self.apply_progress(index, percent);
        }

        self.finish(index, result);
    }

    fn apply_progress(&mut self, index: usize, percent: f64) {
        let task = &mut self.tasks[index];
        if task.record_progress(percent) {
            let percent = task.progress();
            self.emit(BatchEvent::Progress { index, percent });
        }
    }

    fn finish(&mut self, index: usize, result: Result<(), ApiError>) {
        let task = &mut self.tasks[index];
        match result {
            Ok(()) => {
                task.succeed();
                log::info!("Uploaded: {}", task.file().name());
                self.emit(BatchEvent::Succeeded { index });
            }
            Err(e) => {
                let error = e.to_string();
                log::warn!("Upload failed: {} - {}", task.file().name(), error);
                task.fail(error.clone());
                self.emit(BatchEvent::Failed { index, error });
            }
        }
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }
}
