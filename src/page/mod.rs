//! Headless Page Model
//!
//! The dashboard and history pages as explicit component state. Every
//! component is constructed once and receives what it needs through a
//! shared [`PageContext`], instead of looking elements up at call time.
//!
//! ## Components
//!
//! - [`preview::FormPreview`]: icon/color previews of the project form
//! - [`submitter::CheckinSubmitter`]: validates and sends new check-ins
//! - [`recent::RecentPanel`]: the "recent check-ins" card
//! - [`project::ProjectSwitcher`] / [`project::ProjectSelector`]: project changes
//! - [`history::HistoryView`]: table/card history container
//! - [`delete::DeleteHandler`]: in-place deletion of history entries
//!
//! Events enter through [`Page::dispatch`], a single delegated entry point,
//! so nothing has to be re-attached when content is replaced.

pub mod delete;
pub mod history;
pub mod preview;
pub mod project;
pub mod recent;
pub mod submitter;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;
use std::time::Duration;

use crate::api::{CheckinApi, CheckinReceipt, ImageUpload, ProjectId};
use crate::config::Config;
use crate::notify::Notifier;

use delete::{Confirm, DeleteHandler, DeleteResult};
use history::{HistoryView, ViewToggle};
use preview::FormPreview;
use project::{ProjectHeader, ProjectSelector, ProjectSwitcher};
use recent::RecentPanel;
use submitter::{CheckinSubmitter, SubmitError};

/// Tunables shared by the components
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub max_image_size: u64,
    pub allowed_extensions: Vec<String>,
    /// Fade-out before a deleted entry is removed
    pub fade: Duration,
    /// Wait before reloading when a deleted entry cannot be located
    pub reload_delay: Duration,
    /// Empty-state link target when the server sends none
    pub dashboard_path: String,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PageSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_image_size: config.upload.max_image_size,
            allowed_extensions: config.upload.allowed_extensions.clone(),
            fade: Duration::from_millis(config.history.fade_ms),
            reload_delay: Duration::from_millis(config.history.reload_delay_ms),
            dashboard_path: config.history.dashboard_path.clone(),
        }
    }
}

/// Collaborators every handler receives
#[derive(Clone)]
pub struct PageContext {
    pub api: Arc<dyn CheckinApi>,
    pub notifier: Notifier,
    pub settings: PageSettings,
}

impl PageContext {
    pub fn new(api: Arc<dyn CheckinApi>, notifier: Notifier, settings: PageSettings) -> Self {
        Self {
            api,
            notifier,
            settings,
        }
    }
}

/// A change of the visible location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// History entry added without reloading
    Push(String),
    /// Full navigation to another page
    Assign(String),
    Reload,
    /// The enclosing form was submitted natively
    SubmitForm,
}

/// Browser-style location and session history
#[derive(Debug, Clone)]
pub struct Location {
    href: String,
    entries: Vec<String>,
    navigations: Vec<Navigation>,
}

impl Location {
    pub fn new(href: impl Into<String>) -> Self {
        let href = href.into();
        Self {
            entries: vec![href.clone()],
            href,
            navigations: Vec::new(),
        }
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    /// Path without the query string
    pub fn path(&self) -> &str {
        self.href.split('?').next().unwrap_or("")
    }

    /// Session history entries, oldest first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn navigations(&self) -> &[Navigation] {
        &self.navigations
    }

    pub fn last_navigation(&self) -> Option<&Navigation> {
        self.navigations.last()
    }

    /// Reloads requested so far
    pub fn reloads(&self) -> usize {
        self.navigations
            .iter()
            .filter(|n| **n == Navigation::Reload)
            .count()
    }

    pub fn push_state(&mut self, url: &str) {
        self.href = url.to_string();
        self.entries.push(url.to_string());
        self.navigations.push(Navigation::Push(url.to_string()));
    }

    pub fn assign(&mut self, url: &str) {
        self.href = url.to_string();
        self.entries.push(url.to_string());
        self.navigations.push(Navigation::Assign(url.to_string()));
    }

    pub fn reload(&mut self) {
        self.navigations.push(Navigation::Reload);
    }

    pub fn submit_form(&mut self) {
        self.navigations.push(Navigation::SubmitForm);
    }
}

/// Everything a user can do on the page
#[derive(Debug, Clone)]
pub enum UiEvent {
    IconInput(String),
    ColorInput(String),
    NoteInput(String),
    FilesSelected(Vec<ImageUpload>),
    /// Dashboard project dropdown changed
    ProjectSelected(ProjectId),
    /// Navigation selector changed to the option at this index
    SelectorChanged(usize),
    SubmitCheckin,
    ToggleView { view: String, url: String },
    DeleteSubmitted { action: String },
}

impl UiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::IconInput(_) => "icon_input",
            UiEvent::ColorInput(_) => "color_input",
            UiEvent::NoteInput(_) => "note_input",
            UiEvent::FilesSelected(_) => "files_selected",
            UiEvent::ProjectSelected(_) => "project_selected",
            UiEvent::SelectorChanged(_) => "selector_changed",
            UiEvent::SubmitCheckin => "submit_checkin",
            UiEvent::ToggleView { .. } => "toggle_view",
            UiEvent::DeleteSubmitted { .. } => "delete_submitted",
        }
    }
}

/// What handling an event led to
#[derive(Debug)]
pub enum EventOutcome {
    Updated,
    Submitted(Result<CheckinReceipt, SubmitError>),
    ViewToggled(bool),
    Deleted(DeleteResult),
    Navigated(Option<Navigation>),
}

/// The composed page
pub struct Page {
    ctx: PageContext,
    location: Location,
    preview: FormPreview,
    switcher: ProjectSwitcher,
    selector: Option<ProjectSelector>,
    submitter: CheckinSubmitter,
    recent: RecentPanel,
    history: HistoryView,
    deletes: DeleteHandler,
}

impl Page {
    pub fn new(ctx: PageContext, location: Location, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            ctx,
            location,
            preview: FormPreview::default(),
            switcher: ProjectSwitcher::default(),
            selector: None,
            submitter: CheckinSubmitter::new(None),
            recent: RecentPanel::default(),
            history: HistoryView::default(),
            deletes: DeleteHandler::new(confirm),
        }
    }

    /// Initial server-rendered history content; delete forms are bound now
    pub fn with_history(mut self, html: impl Into<String>, toggles: Vec<ViewToggle>) -> Self {
        self.history = HistoryView::new(html, toggles);
        self
    }

    pub fn with_selector(mut self, selector: ProjectSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Active project of the check-in form
    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.submitter.set_project(project_id);
        self.switcher.set_selected(project_id);
        self
    }

    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    pub fn notifier(&self) -> &Notifier {
        &self.ctx.notifier
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn preview(&self) -> &FormPreview {
        &self.preview
    }

    pub fn header(&self) -> &ProjectHeader {
        self.switcher.header()
    }

    pub fn selector(&self) -> Option<&ProjectSelector> {
        self.selector.as_ref()
    }

    pub fn submitter(&self) -> &CheckinSubmitter {
        &self.submitter
    }

    pub fn recent(&self) -> &RecentPanel {
        &self.recent
    }

    pub fn history(&self) -> &HistoryView {
        &self.history
    }

    /// Route one event to the component that owns it
    pub async fn dispatch(&mut self, event: UiEvent) -> EventOutcome {
        tracing::debug!(event = event.name(), "Dispatching UI event");

        match event {
            UiEvent::IconInput(value) => {
                self.preview.on_icon_input(&value);
                EventOutcome::Updated
            }
            UiEvent::ColorInput(value) => {
                self.preview.on_color_input(&value);
                EventOutcome::Updated
            }
            UiEvent::NoteInput(note) => {
                self.submitter.set_note(note);
                EventOutcome::Updated
            }
            UiEvent::FilesSelected(files) => {
                self.submitter.attach(files);
                EventOutcome::Updated
            }
            UiEvent::ProjectSelected(project_id) => {
                self.submitter.set_project(project_id);
                self.switcher
                    .select(&self.ctx, &mut self.recent, project_id)
                    .await;
                EventOutcome::Updated
            }
            UiEvent::SelectorChanged(index) => {
                let navigation = self
                    .selector
                    .as_mut()
                    .and_then(|selector| selector.change(index, &mut self.location));
                EventOutcome::Navigated(navigation)
            }
            UiEvent::SubmitCheckin => {
                let result = self.submitter.submit(&self.ctx, &mut self.recent).await;
                EventOutcome::Submitted(result)
            }
            UiEvent::ToggleView { view, url } => {
                let toggled = self
                    .history
                    .toggle(&self.ctx, &mut self.location, &view, &url)
                    .await;
                EventOutcome::ViewToggled(toggled)
            }
            UiEvent::DeleteSubmitted { action } => {
                let result = self
                    .deletes
                    .submit(&self.ctx, &mut self.history, &mut self.location, &action)
                    .await;
                EventOutcome::Deleted(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RecentCheckin;
    use crate::notify::Presentation;
    use fake::{always, context, Call, FakeApi};

    #[test]
    fn test_location_push_and_assign() {
        let mut location = Location::new("/checkin/history?project=1");
        assert_eq!(location.path(), "/checkin/history");

        location.push_state("/checkin/history?project=1&view=card");
        assert_eq!(location.href(), "/checkin/history?project=1&view=card");
        assert_eq!(location.entries().len(), 2);
        assert_eq!(location.reloads(), 0);

        location.reload();
        location.reload();
        assert_eq!(location.reloads(), 2);
        assert_eq!(location.last_navigation(), Some(&Navigation::Reload));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.upload.max_image_size = 42;
        config.history.fade_ms = 10;

        let settings = PageSettings::from(&config);
        assert_eq!(settings.max_image_size, 42);
        assert_eq!(settings.fade, Duration::from_millis(10));
        assert_eq!(settings.dashboard_path, "/checkin/dashboard");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_preview_events() {
        let api = Arc::new(FakeApi::default());
        let mut page = Page::new(context(api), Location::new("/projects/new"), always(true));

        page.dispatch(UiEvent::IconInput("book".into())).await;
        page.dispatch(UiEvent::ColorInput("#123456".into())).await;

        assert_eq!(page.preview().icon_class(), "bi bi-book");
        assert_eq!(page.preview().background(), "#123456");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_checkin_flow() {
        let api = Arc::new(FakeApi::default());
        api.push_recent(Ok(vec![RecentCheckin {
            check_time: "2024-05-01 07:00".into(),
            note: Some("Stretching".into()),
            has_images: false,
            images: vec![],
        }]));

        let mut page = Page::new(
            context(api.clone()),
            Location::new("/checkin/dashboard"),
            always(true),
        )
        .with_project(3);

        page.dispatch(UiEvent::NoteInput("Stretching".into())).await;
        let outcome = page.dispatch(UiEvent::SubmitCheckin).await;

        assert!(matches!(outcome, EventOutcome::Submitted(Ok(_))));
        assert_eq!(page.submitter().note(), "");
        assert!(page.recent().html().contains("Stretching"));
        assert_eq!(api.calls()[1], Call::Recent(3));
        assert_eq!(
            page.notifier().visible(Presentation::Modal).await[0].message,
            "Check-in successful!"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_project_change_updates_submitter() {
        let api = Arc::new(FakeApi::default());
        let mut page = Page::new(
            context(api.clone()),
            Location::new("/checkin/dashboard"),
            always(true),
        )
        .with_project(1);

        page.dispatch(UiEvent::ProjectSelected(5)).await;
        page.dispatch(UiEvent::NoteInput("Read".into())).await;
        page.dispatch(UiEvent::SubmitCheckin).await;

        let submitted = api
            .calls()
            .into_iter()
            .find_map(|call| match call {
                Call::Submit(checkin) => Some(checkin.project_id),
                _ => None,
            })
            .unwrap();
        assert_eq!(submitted, 5);
        assert_eq!(page.header().name(), "Project 5");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_selector_navigates() {
        let api = Arc::new(FakeApi::default());
        let options = vec![
            project::SelectOption::new("1", "Running"),
            project::SelectOption::new("2", "Reading"),
        ];
        let mut page = Page::new(
            context(api.clone()),
            Location::new("/checkin/dashboard?project=1"),
            always(true),
        )
        .with_selector(ProjectSelector::new(options, 0));

        let outcome = page.dispatch(UiEvent::SelectorChanged(1)).await;

        let expected = "/checkin/dashboard?project=2";
        assert!(matches!(
            outcome,
            EventOutcome::Navigated(Some(Navigation::Assign(ref url))) if url == expected
        ));
        assert_eq!(page.location().href(), expected);
        assert!(page.selector().unwrap().is_disabled());

        // Disabled until the new page loads
        let again = page.dispatch(UiEvent::SelectorChanged(0)).await;
        assert!(matches!(again, EventOutcome::Navigated(None)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_then_delete_uses_new_bindings() {
        let api = Arc::new(FakeApi::default());
        api.push_history(Ok(r#"<div class="d-md-none"><div class="card"><form class="delete-checkin-form" action="/checkin/delete/8"></form></div></div>"#.into()));

        let mut page = Page::new(
            context(api.clone()),
            Location::new("/checkin/history?project=2"),
            always(true),
        )
        .with_history(
            r#"<table><tbody><tr><td><form class="delete-checkin-form" action="/checkin/delete/7"></form></td></tr></tbody></table>"#,
            vec![],
        );

        page.dispatch(UiEvent::ToggleView {
            view: "card".into(),
            url: "/checkin/history?project=2&view=card".into(),
        })
        .await;

        // The old row's form is gone, so its binding is too
        let stale = page
            .dispatch(UiEvent::DeleteSubmitted {
                action: "/checkin/delete/7".into(),
            })
            .await;
        assert!(matches!(stale, EventOutcome::Deleted(DeleteResult::Unbound)));

        let fresh = page
            .dispatch(UiEvent::DeleteSubmitted {
                action: "/checkin/delete/8".into(),
            })
            .await;
        assert!(matches!(
            fresh,
            EventOutcome::Deleted(DeleteResult::Removed { emptied: true })
        ));
        assert!(page
            .history()
            .html()
            .contains("No check-in records found for this project."));
    }
}
