//! Check-in Submitter
//!
//! Validates the check-in form, filters the selected images, sends the
//! check-in and refreshes the recent panel on success. The submit control
//! is disabled while the request is outstanding and always re-enabled
//! afterwards.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use super::recent::RecentPanel;
use super::PageContext;
use crate::api::{CheckinReceipt, ClientError, ImageUpload, NewCheckin, ProjectId};
use crate::notify::Level;

pub const IDLE_LABEL: &str = "Check In";
pub const BUSY_LABEL: &str = "Submitting...";

/// State of the submit button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitControl {
    pub disabled: bool,
    pub label: String,
}

impl SubmitControl {
    pub fn idle() -> Self {
        Self {
            disabled: false,
            label: IDLE_LABEL.to_string(),
        }
    }

    pub fn busy() -> Self {
        Self {
            disabled: true,
            label: BUSY_LABEL.to_string(),
        }
    }
}

/// Why a selected file was left out of the upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge { size: u64 },
    UnsupportedType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: SkipReason,
}

/// Errors that stop a check-in
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Please enter a note for your check-in")]
    EmptyNote,

    #[error("Please select a project")]
    NoProject,

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Split selected files into those to upload and those to skip.
/// Files exactly at `max_size` are uploaded.
pub fn partition_images(
    files: Vec<ImageUpload>,
    max_size: u64,
    allowed_extensions: &[String],
) -> (Vec<ImageUpload>, Vec<SkippedFile>) {
    let mut accepted = Vec::new();
    let mut skipped = Vec::new();

    for file in files {
        let allowed = file
            .extension()
            .is_some_and(|ext| allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)));

        if !allowed {
            skipped.push(SkippedFile {
                file_name: file.file_name,
                reason: SkipReason::UnsupportedType,
            });
        } else if file.size() > max_size {
            skipped.push(SkippedFile {
                reason: SkipReason::TooLarge { size: file.size() },
                file_name: file.file_name,
            });
        } else {
            accepted.push(file);
        }
    }

    (accepted, skipped)
}

/// Human-readable byte size, e.g. `5 MB`, `1.5 MB`, `300 KB`
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    let bytes = bytes as f64;
    let (value, unit) = if bytes >= MB {
        (bytes / MB, "MB")
    } else if bytes >= KB {
        (bytes / KB, "KB")
    } else {
        return format!("{} bytes", bytes);
    };

    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0} {}", rounded, unit)
    } else {
        format!("{:.1} {}", rounded, unit)
    }
}

/// Holds the control busy; back to idle on drop, including when the
/// submission is cancelled mid-request
struct BusyGuard(Arc<watch::Sender<SubmitControl>>);

impl BusyGuard {
    fn engage(control: &Arc<watch::Sender<SubmitControl>>) -> Self {
        control.send_replace(SubmitControl::busy());
        Self(Arc::clone(control))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.send_replace(SubmitControl::idle());
    }
}

/// The dashboard's check-in form
#[derive(Debug)]
pub struct CheckinSubmitter {
    project_id: Option<ProjectId>,
    note: String,
    files: Vec<ImageUpload>,
    skipped: Vec<SkippedFile>,
    control: Arc<watch::Sender<SubmitControl>>,
}

impl CheckinSubmitter {
    pub fn new(project_id: Option<ProjectId>) -> Self {
        let (control, _) = watch::channel(SubmitControl::idle());
        let control = Arc::new(control);
        Self {
            project_id,
            note: String::new(),
            files: Vec::new(),
            skipped: Vec::new(),
            control,
        }
    }

    pub fn set_project(&mut self, project_id: ProjectId) {
        self.project_id = Some(project_id);
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    /// Replace the file selection
    pub fn attach(&mut self, files: Vec<ImageUpload>) {
        self.files = files;
    }

    pub fn files(&self) -> &[ImageUpload] {
        &self.files
    }

    /// Files left out of the last submission
    pub fn last_skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn control(&self) -> SubmitControl {
        self.control.borrow().clone()
    }

    /// Follow the submit button's state
    pub fn watch_control(&self) -> watch::Receiver<SubmitControl> {
        self.control.subscribe()
    }

    pub async fn submit(
        &mut self,
        ctx: &PageContext,
        recent: &mut RecentPanel,
    ) -> Result<CheckinReceipt, SubmitError> {
        if self.note.trim().is_empty() {
            ctx.notifier
                .modal(Level::Warning, SubmitError::EmptyNote.to_string())
                .await;
            return Err(SubmitError::EmptyNote);
        }
        let Some(project_id) = self.project_id else {
            ctx.notifier
                .modal(Level::Warning, SubmitError::NoProject.to_string())
                .await;
            return Err(SubmitError::NoProject);
        };

        let (images, skipped) = partition_images(
            self.files.clone(),
            ctx.settings.max_image_size,
            &ctx.settings.allowed_extensions,
        );
        self.warn_skipped(ctx, &skipped).await;
        self.skipped = skipped;

        let checkin = NewCheckin {
            project_id,
            note: self.note.clone(),
            images,
        };

        let result = {
            let _busy = BusyGuard::engage(&self.control);
            ctx.api.submit_checkin(&checkin).await
        };

        match result {
            Ok(receipt) => {
                tracing::info!(project_id, images_added = receipt.images_added, "Check-in recorded");
                let message = match receipt.images_added {
                    0 => "Check-in successful!".to_string(),
                    1 => "Check-in successful! 1 image uploaded.".to_string(),
                    n => format!("Check-in successful! {} images uploaded.", n),
                };
                ctx.notifier.modal(Level::Success, message).await;

                self.note.clear();
                self.files.clear();
                recent.refresh(ctx.api.as_ref(), project_id).await;
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(project_id, error = %e, "Check-in failed");
                let message = if e.is_declared() {
                    format!("Error: {}", e.server_message().unwrap_or("Unknown error"))
                } else {
                    "There was an error processing your check-in".to_string()
                };
                ctx.notifier.modal(Level::Danger, message).await;
                Err(e.into())
            }
        }
    }

    async fn warn_skipped(&self, ctx: &PageContext, skipped: &[SkippedFile]) {
        let too_large: Vec<&str> = skipped
            .iter()
            .filter(|s| matches!(s.reason, SkipReason::TooLarge { .. }))
            .map(|s| s.file_name.as_str())
            .collect();
        let unsupported: Vec<&str> = skipped
            .iter()
            .filter(|s| s.reason == SkipReason::UnsupportedType)
            .map(|s| s.file_name.as_str())
            .collect();

        if !too_large.is_empty() {
            let message = format!(
                "Skipped files larger than {}: {}",
                format_size(ctx.settings.max_image_size),
                too_large.join(", ")
            );
            ctx.notifier.modal(Level::Warning, message).await;
        }
        if !unsupported.is_empty() {
            let message = format!("Skipped unsupported files: {}", unsupported.join(", "));
            ctx.notifier.modal(Level::Warning, message).await;
        }
    }
}
