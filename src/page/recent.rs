//! Recent Check-ins Panel
//!
//! The dashboard card listing the latest check-ins of the active project,
//! followed by a link to the full history.

use crate::api::{CheckinApi, ProjectId, RecentCheckin};
use crate::fragment::escape_html;

/// History page used when no existing link can be reused
pub const DEFAULT_HISTORY_PATH: &str = "/checkin/history";

/// Classes marking thumbnails for the gallery viewer
pub const GALLERY_CLASSES: &[&str] = &["img-thumbnail", "gallery-image"];

#[derive(Debug, Clone, Default)]
pub struct RecentPanel {
    html: String,
    entries: Vec<RecentCheckin>,
    history_link: Option<String>,
    project_id: Option<ProjectId>,
}

impl RecentPanel {
    /// Panel whose server-rendered body already holds a history link
    pub fn with_history_link(link: impl Into<String>) -> Self {
        Self {
            history_link: Some(link.into()),
            ..Default::default()
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn entries(&self) -> &[RecentCheckin] {
        &self.entries
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Re-fetch and re-render for a project; failures only get logged
    pub async fn refresh(&mut self, api: &dyn CheckinApi, project_id: ProjectId) -> bool {
        tracing::debug!(project_id, "Updating recent check-ins");

        match api.recent_checkins(project_id).await {
            Ok(entries) => {
                tracing::debug!(project_id, count = entries.len(), "Recent check-ins loaded");
                self.render(project_id, entries);
                true
            }
            Err(e) => {
                tracing::error!(project_id, error = %e, "Error fetching recent check-ins");
                false
            }
        }
    }

    /// Link to the full history of a project. Query-style links keep their
    /// base path; anything else falls back to the default history page.
    pub fn history_url(&self, project_id: ProjectId) -> String {
        match self.history_link.as_deref() {
            Some(link) if link.contains('?') => {
                let base = link.split('?').next().unwrap_or(DEFAULT_HISTORY_PATH);
                format!("{}?project={}", base, project_id)
            }
            _ => format!("{}?project={}", DEFAULT_HISTORY_PATH, project_id),
        }
    }

    fn render(&mut self, project_id: ProjectId, entries: Vec<RecentCheckin>) {
        let history_url = self.history_url(project_id);
        let link = format!(
            "<div class=\"mt-3 text-center\"><a href=\"{}\" class=\"btn btn-sm btn-outline-primary\">View Full History</a></div>",
            escape_html(&history_url)
        );

        let mut html = String::new();
        if entries.is_empty() {
            html.push_str("<p class=\"text-center\">No recent check-ins yet.</p>");
        } else {
            html.push_str("<ul class=\"list-group\">");
            for entry in &entries {
                html.push_str(&render_entry(entry));
            }
            html.push_str("</ul>");
        }
        html.push_str(&link);

        self.html = html;
        self.entries = entries;
        self.history_link = Some(history_url);
        self.project_id = Some(project_id);
    }
}

fn render_entry(entry: &RecentCheckin) -> String {
    let mut item = format!(
        "<li class=\"list-group-item\"><strong>{}</strong><p class=\"mb-0 small text-muted preserve-newlines\">{}</p>",
        escape_html(&entry.check_time),
        escape_html(entry.note.as_deref().unwrap_or(""))
    );

    if entry.has_images && !entry.images.is_empty() {
        item.push_str("<div class=\"checkin-gallery mt-2\">");
        for image in &entry.images {
            item.push_str(&format!(
                "<img src=\"{}\" class=\"{}\" data-image-id=\"{}\" alt=\"Check-in image\">",
                escape_html(&image.thumbnail_url),
                GALLERY_CLASSES.join(" "),
                image.id
            ));
        }
        item.push_str("</div>");
    }

    item.push_str("</li>");
    item
}
