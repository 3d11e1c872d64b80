//! Project Switching
//!
//! Two controls change the active project. On the dashboard the check-in
//! form's dropdown reloads the project header and the recent panel in
//! place. The navigation selector on other pages moves to the same page for
//! the chosen project instead.

use super::recent::RecentPanel;
use super::{Location, Navigation, PageContext};
use crate::api::{Project, ProjectId};
use crate::fragment::escape_html;
use crate::notify::Level;

/// Card header showing the active project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectHeader {
    name: String,
    icon_class: Option<String>,
    background: Option<String>,
}

impl ProjectHeader {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon_class(&self) -> Option<&str> {
        self.icon_class.as_deref()
    }

    /// Header background; `None` restores the stylesheet default
    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    pub fn title_html(&self) -> String {
        match &self.icon_class {
            Some(class) => format!("<i class=\"{}\"></i>{}", class, escape_html(&self.name)),
            None => escape_html(&self.name),
        }
    }

    fn show(&mut self, project: &Project) {
        self.name = project.name.clone();
        self.icon_class = project
            .icon
            .as_deref()
            .filter(|icon| !icon.is_empty())
            .map(|icon| format!("bi bi-{} me-2", icon));
        self.background = project.color.clone().filter(|c| !c.is_empty());
    }
}

/// Dashboard dropdown of the check-in form
#[derive(Debug, Clone, Default)]
pub struct ProjectSwitcher {
    header: ProjectHeader,
    selected: Option<ProjectId>,
}

impl ProjectSwitcher {
    pub fn header(&self) -> &ProjectHeader {
        &self.header
    }

    pub fn selected(&self) -> Option<ProjectId> {
        self.selected
    }

    pub fn set_selected(&mut self, project_id: ProjectId) {
        self.selected = Some(project_id);
    }

    /// Load the header and the recent panel for a newly selected project.
    /// The two requests are independent and run side by side.
    pub async fn select(
        &mut self,
        ctx: &PageContext,
        recent: &mut RecentPanel,
        project_id: ProjectId,
    ) {
        self.selected = Some(project_id);
        tokio::join!(
            self.load_details(ctx, project_id),
            recent.refresh(ctx.api.as_ref(), project_id)
        );
    }

    pub async fn load_details(&mut self, ctx: &PageContext, project_id: ProjectId) -> bool {
        match ctx.api.project(project_id).await {
            Ok(project) => {
                self.header.show(&project);
                true
            }
            Err(e) if e.is_declared() => {
                tracing::error!(project_id, error = %e, "Error loading project details");
                let message = format!(
                    "Error loading project details: {}",
                    e.server_message().unwrap_or("")
                );
                ctx.notifier.modal(Level::Danger, message.trim_end()).await;
                false
            }
            Err(e) => {
                tracing::error!(project_id, error = %e, "Error loading project details");
                ctx.notifier
                    .modal(
                        Level::Danger,
                        "Failed to connect to server when loading project details",
                    )
                    .await;
                false
            }
        }
    }
}

/// One `<option>` of the selector
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }
}

/// Page-level project selector that navigates on change
#[derive(Debug, Clone)]
pub struct ProjectSelector {
    options: Vec<SelectOption>,
    selected: usize,
    disabled: bool,
}

impl ProjectSelector {
    pub fn new(options: Vec<SelectOption>, selected: usize) -> Self {
        Self {
            options,
            selected,
            disabled: false,
        }
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<&SelectOption> {
        self.options.get(self.selected)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Select an option and navigate. Dashboard and history pages go
    /// straight to `<path>?project=<id>`; elsewhere the form is submitted.
    pub fn change(&mut self, index: usize, location: &mut Location) -> Option<Navigation> {
        if self.disabled {
            return None;
        }
        let option = self.options.get_mut(index)?;
        let value = option.value.clone();
        option.text = "Loading...".to_string();
        self.selected = index;
        self.disabled = true;

        let path = location.path().to_string();
        if path.contains("/checkin/dashboard") || path.contains("/checkin/history") {
            let url = format!("{}?project={}", path, urlencoding::encode(&value));
            location.assign(&url);
            Some(Navigation::Assign(url))
        } else {
            location.submit_form();
            Some(Navigation::SubmitForm)
        }
    }
}
