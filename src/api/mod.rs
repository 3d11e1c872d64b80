//! Check-in Server API
//!
//! Typed access to the JSON endpoints owned by the check-in server.
//!
//! # Endpoints
//!
//! - `POST /checkin/api/checkin` - Create a check-in (JSON, or multipart with `images[]`)
//! - `GET /checkin/api/project/{id}` - Project name, icon and color
//! - `GET /checkin/api/recent-checkins/{id}` - Latest check-ins of a project
//! - `GET <history url>` - Rendered history view as `{success, html}`
//! - `POST <delete form action>` - Delete one check-in
//!
//! Every request carries the `X-Requested-With` marker and the `timezone`
//! cookie; check-in and delete requests also carry the CSRF token.

pub mod client;
pub mod dto;
pub mod error;

pub use client::{CheckinClient, ClientConfig};
pub use dto::{
    CheckinReceipt, DeleteReceipt, ImageRef, ImageUpload, NewCheckin, Project, ProjectId,
    RecentCheckin,
};
pub use error::{ClientError, ClientResult};

use async_trait::async_trait;

/// Operations the page model needs from the server
///
/// [`CheckinClient`] talks HTTP; tests substitute an in-memory fake.
#[async_trait]
pub trait CheckinApi: Send + Sync {
    /// Create a check-in, uploading any attached images
    async fn submit_checkin(&self, checkin: &NewCheckin) -> ClientResult<CheckinReceipt>;

    /// Fetch a project's display metadata
    async fn project(&self, project_id: ProjectId) -> ClientResult<Project>;

    /// Fetch the recent check-ins panel data for a project
    async fn recent_checkins(&self, project_id: ProjectId) -> ClientResult<Vec<RecentCheckin>>;

    /// Fetch a rendered history view, returning its HTML
    async fn history_view(&self, url: &str) -> ClientResult<String>;

    /// Submit a delete form to its action URL
    async fn delete_checkin(
        &self,
        action: &str,
        fields: &[(String, String)],
    ) -> ClientResult<DeleteReceipt>;
}
