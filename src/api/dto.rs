//! Data Transfer Objects
//!
//! Request and response types for the check-in server's JSON endpoints.
//! Every response carries `success` and an optional `message`; the
//! remaining fields depend on the endpoint.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server-side project identifier
pub type ProjectId = i64;

// ============================================
// Domain Types
// ============================================

/// A named category check-ins are grouped under
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Project {
    #[serde(default)]
    pub id: Option<ProjectId>,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Thumbnail reference attached to a check-in
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageRef {
    pub id: i64,
    pub thumbnail_url: String,
}

/// One entry of the recent check-ins panel
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecentCheckin {
    /// Already formatted in the user's time zone by the server
    pub check_time: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub has_images: bool,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// An image file selected for upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read an image from disk, keeping only its file name
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self { file_name, bytes })
    }

    /// Like [`ImageUpload::from_path`], but files over `max_size` bytes are
    /// checked by metadata and never read; those yield `None`
    pub async fn from_path_within(path: &Path, max_size: u64) -> std::io::Result<Option<Self>> {
        let size = tokio::fs::metadata(path).await?.len();
        if size > max_size {
            tracing::debug!(path = %path.display(), size, max_size, "Image over size limit, not read");
            return Ok(None);
        }
        Self::from_path(path).await.map(Some)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercased extension without the dot
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    pub fn content_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("heic") => "image/heic",
            Some("heif") => "image/heif",
            _ => "application/octet-stream",
        }
    }
}

/// A check-in ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct NewCheckin {
    pub project_id: ProjectId,
    pub note: String,
    pub images: Vec<ImageUpload>,
}

/// What the server reported for an accepted check-in
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckinReceipt {
    pub message: Option<String>,
    pub images_added: u32,
}

/// What the server reported for a deleted check-in
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteReceipt {
    pub message: Option<String>,
    pub dashboard_url: Option<String>,
}

// ============================================
// Request/Response DTOs
// ============================================

/// JSON body used when no images are attached
#[derive(Debug, Serialize)]
pub(crate) struct CheckinRequest<'a> {
    pub project_id: String,
    pub note: &'a str,
}

/// Fields shared by every response
pub(crate) trait Envelope {
    fn success(&self) -> bool;
    fn message(&self) -> Option<&str>;
}

macro_rules! envelope {
    ($ty:ty) => {
        impl Envelope for $ty {
            fn success(&self) -> bool {
                self.success
            }

            fn message(&self) -> Option<&str> {
                self.message.as_deref()
            }
        }
    };
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckinResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub images_added: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub project: Option<Project>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecentCheckinsResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub recent_checkins: Vec<RecentCheckin>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryViewResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "dashboardUrl")]
    pub dashboard_url: Option<String>,
}

envelope!(CheckinResponse);
envelope!(ProjectResponse);
envelope!(RecentCheckinsResponse);
envelope!(HistoryViewResponse);
envelope!(DeleteResponse);
