//! History View Toggler
//!
//! The history page shows check-ins as a table or as cards. Switching
//! views fetches server-rendered HTML for the container and records the
//! new URL in session history without a reload.

use super::delete::DeleteBindings;
use super::recent::GALLERY_CLASSES;
use super::{Location, PageContext};
use crate::fragment::Fragment;
use crate::notify::Level;

/// Placeholder shown while a view is loading
pub const LOADING_HTML: &str = concat!(
    "<div class=\"text-center py-5\">",
    "<div class=\"spinner-border\" role=\"status\"><span class=\"visually-hidden\">Loading...</span></div>",
    "<p class=\"mt-2\">Loading check-ins...</p>",
    "</div>"
);

const ACTIVE_CLASS: &str = "btn-primary";
const INACTIVE_CLASS: &str = "btn-outline-secondary";

/// One view toggle button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewToggle {
    pub view: String,
    pub url: String,
    pub active: bool,
}

impl ViewToggle {
    pub fn new(view: impl Into<String>, url: impl Into<String>, active: bool) -> Self {
        Self {
            view: view.into(),
            url: url.into(),
            active,
        }
    }

    pub fn class(&self) -> &'static str {
        if self.active {
            ACTIVE_CLASS
        } else {
            INACTIVE_CLASS
        }
    }
}

/// Container of the history page's check-in records
#[derive(Debug, Clone, Default)]
pub struct HistoryView {
    container: Fragment,
    toggles: Vec<ViewToggle>,
    bindings: DeleteBindings,
}

impl HistoryView {
    pub fn new(html: impl Into<String>, toggles: Vec<ViewToggle>) -> Self {
        let mut view = Self {
            container: Fragment::parse(html),
            toggles,
            bindings: DeleteBindings::default(),
        };
        view.attach();
        view
    }

    pub fn html(&self) -> &str {
        self.container.html()
    }

    pub fn toggles(&self) -> &[ViewToggle] {
        &self.toggles
    }

    pub fn active_view(&self) -> Option<&str> {
        self.toggles
            .iter()
            .find(|t| t.active)
            .map(|t| t.view.as_str())
    }

    /// Whether a delete form with this action is currently handled
    pub fn is_bound(&self, action: &str) -> bool {
        self.bindings.is_bound(action)
    }

    pub fn bound_forms(&self) -> usize {
        self.bindings.len()
    }

    pub(crate) fn container(&self) -> &Fragment {
        &self.container
    }

    pub(crate) fn container_mut(&mut self) -> &mut Fragment {
        &mut self.container
    }

    /// Swap in new container content and re-attach
    pub fn replace_content(&mut self, html: impl Into<String>) {
        self.container = Fragment::parse(html);
        self.attach();
    }

    /// Bind delete forms and mark images for the gallery. Safe to call
    /// repeatedly on the same content.
    pub fn attach(&mut self) {
        let bound = self.bindings.bind_all(&self.container);
        let marked = self.container.add_classes("img", GALLERY_CLASSES);
        tracing::debug!(bound, marked, "Attached history content");
    }

    /// Switch to another view. Returns whether the new content arrived;
    /// on failure the previous content and active toggle are restored.
    pub async fn toggle(
        &mut self,
        ctx: &PageContext,
        location: &mut Location,
        view: &str,
        url: &str,
    ) -> bool {
        let previous_html = self.container.html().to_string();
        let previous_toggles = self.toggles.clone();

        for toggle in &mut self.toggles {
            toggle.active = toggle.view == view;
        }
        self.replace_content(LOADING_HTML);

        match ctx.api.history_view(url).await {
            Ok(html) => {
                tracing::info!(view, url, "History view loaded");
                self.container = Fragment::parse(html);
                location.push_state(url);
                self.attach();
                true
            }
            Err(e) => {
                tracing::error!(view, url, error = %e, "Failed to load history view");
                self.toggles = previous_toggles;
                self.replace_content(previous_html);
                let message = e
                    .server_message()
                    .unwrap_or("Failed to load check-ins")
                    .to_string();
                ctx.notifier.toast(Level::Danger, message).await;
                false
            }
        }
    }
}
