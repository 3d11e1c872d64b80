//! Delete Handler
//!
//! Deletes history entries in place. Forms are tracked by their action in
//! a registry that is rebuilt after every content change, so a form is
//! handled at most once no matter how often content gets re-attached.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::history::HistoryView;
use super::{Location, PageContext};
use crate::api::DeleteReceipt;
use crate::fragment::{escape_html, Fragment};
use crate::notify::Level;

pub const CONFIRM_MESSAGE: &str = "Are you sure you want to delete this check-in?";
pub const DELETE_FORM_CLASS: &str = "delete-checkin-form";
pub const EMPTY_MESSAGE: &str = "No check-in records found for this project.";

/// Asks the user to confirm a destructive action
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Actions of the delete forms currently handled
#[derive(Debug, Clone, Default)]
pub struct DeleteBindings {
    actions: BTreeSet<String>,
}

impl DeleteBindings {
    /// Rebuild from the forms present in `fragment`
    pub fn bind_all(&mut self, fragment: &Fragment) -> usize {
        self.actions = fragment
            .elements()
            .iter()
            .filter(|el| el.name() == "form" && el.has_class(DELETE_FORM_CLASS))
            .filter_map(|el| el.attr("action"))
            .map(str::to_string)
            .collect();
        self.actions.len()
    }

    pub fn is_bound(&self, action: &str) -> bool {
        self.actions.contains(action)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Result of a delete submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    /// User declined the confirmation
    Declined,
    /// No handled form has this action
    Unbound,
    /// Entry removed in place; `emptied` when the empty state replaced it
    Removed { emptied: bool },
    /// Deleted, but the entry could not be located; page reloads
    Reloading,
    Failed,
}

pub struct DeleteHandler {
    confirm: Arc<dyn Confirm>,
}

impl DeleteHandler {
    pub fn new(confirm: Arc<dyn Confirm>) -> Self {
        Self { confirm }
    }

    pub async fn submit(
        &self,
        ctx: &PageContext,
        history: &mut HistoryView,
        location: &mut Location,
        action: &str,
    ) -> DeleteResult {
        if !history.is_bound(action) {
            tracing::debug!(action, "Ignoring submission of unbound delete form");
            return DeleteResult::Unbound;
        }
        if !self.confirm.confirm(CONFIRM_MESSAGE) {
            return DeleteResult::Declined;
        }

        let form = find_form(history.container(), action);
        let fields = form
            .map(|idx| history.container().form_fields(idx))
            .unwrap_or_default();

        match ctx.api.delete_checkin(action, &fields).await {
            Ok(receipt) => {
                tracing::info!(action, "Check-in deleted");
                remove_entry(ctx, history, location, action, &receipt).await
            }
            Err(e) => {
                tracing::error!(action, error = %e, "Failed to delete check-in");
                let message = if e.is_declared() {
                    e.server_message().unwrap_or("An error occurred").to_string()
                } else {
                    "Failed to delete check-in".to_string()
                };
                ctx.notifier.toast(Level::Danger, message).await;
                DeleteResult::Failed
            }
        }
    }
}

fn find_form(fragment: &Fragment, action: &str) -> Option<usize> {
    fragment.find(|el| {
        el.name() == "form" && el.has_class(DELETE_FORM_CLASS) && el.attr("action") == Some(action)
    })
}

fn find_row(fragment: &Fragment, action: &str) -> Option<usize> {
    let form = find_form(fragment, action)?;
    fragment
        .closest(form, |el| el.name() == "tr")
        .or_else(|| fragment.closest(form, |el| el.has_class("card")))
}

async fn remove_entry(
    ctx: &PageContext,
    history: &mut HistoryView,
    location: &mut Location,
    action: &str,
    receipt: &DeleteReceipt,
) -> DeleteResult {
    let Some(row) = find_row(history.container(), action) else {
        ctx.notifier
            .toast(Level::Success, "Check-in deleted successfully. Refreshing...")
            .await;
        tokio::time::sleep(ctx.settings.reload_delay).await;
        location.reload();
        return DeleteResult::Reloading;
    };

    let fade = ctx.settings.fade;
    history.container_mut().set_attr(
        row,
        "style",
        &format!("transition: opacity {}ms; opacity: 0", fade.as_millis()),
    );
    tokio::time::sleep(fade).await;

    let container = history.container_mut();
    let parent_start = container
        .element(row)
        .and_then(|el| el.parent())
        .and_then(|p| container.element(p))
        .map(|p| p.start());
    container.remove(row);

    let empty_state = empty_state_html(receipt, &ctx.settings.dashboard_path);
    let emptied = match parent_start.and_then(|start| container.at(start)) {
        Some(parent) if container.child_element_count(parent) == 0 => {
            let target = container
                .closest(parent, |el| el.has_class("table-responsive"))
                .unwrap_or(parent);
            container.set_inner_html(target, &empty_state);
            true
        }
        Some(_) => false,
        None => {
            let none_left = container
                .find(|el| el.name() == "form" && el.has_class(DELETE_FORM_CLASS))
                .is_none();
            if none_left {
                history.replace_content(empty_state);
            }
            none_left
        }
    };

    history.attach();
    ctx.notifier
        .toast(Level::Success, "Check-in deleted successfully")
        .await;
    DeleteResult::Removed { emptied }
}

fn empty_state_html(receipt: &DeleteReceipt, dashboard_path: &str) -> String {
    let href = receipt
        .dashboard_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .unwrap_or(dashboard_path);
    format!(
        concat!(
            "<div class=\"text-center py-4\">",
            "<p class=\"text-muted\">{}</p>",
            "<a href=\"{}\" class=\"btn btn-primary mt-2\"><i class=\"bi bi-check-circle\"></i> Check In Now</a>",
            "</div>"
        ),
        EMPTY_MESSAGE,
        escape_html(href)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientError;
    use crate::notify::Presentation;
    use crate::page::fake::{always, context, Call, FakeApi};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ONE_ROW: &str = r#"<div class="table-responsive"><table><tbody><tr><td>Mon</td><td><form class="delete-checkin-form" action="/checkin/delete/1"><input type="hidden" name="csrf_token" value="tok"></form></td></tr></tbody></table></div>"#;
    const TWO_ROWS: &str = r#"<div class="table-responsive"><table><tbody><tr><td><form class="delete-checkin-form" action="/checkin/delete/1"></form></td></tr><tr><td><form class="delete-checkin-form" action="/checkin/delete/2"></form></td></tr></tbody></table></div>"#;

    async fn toasts(ctx: &PageContext) -> Vec<String> {
        ctx.notifier
            .visible(Presentation::Toast)
            .await
            .into_iter()
            .map(|n| n.message)
            .collect()
    }

    #[test]
    fn test_bindings_are_idempotent() {
        let fragment = Fragment::parse(TWO_ROWS);
        let mut bindings = DeleteBindings::default();

        assert_eq!(bindings.bind_all(&fragment), 2);
        assert_eq!(bindings.bind_all(&fragment), 2);
        assert!(bindings.is_bound("/checkin/delete/2"));
        assert!(!bindings.is_bound("/checkin/delete/3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_declined_sends_nothing() {
        let api = Arc::new(FakeApi::default());
        let ctx = context(api.clone());
        let mut history = HistoryView::new(ONE_ROW, vec![]);
        let mut location = Location::new("/checkin/history");

        let prompts = Arc::new(AtomicUsize::new(0));
        let seen = prompts.clone();
        let handler = DeleteHandler::new(Arc::new(move |message: &str| {
            assert_eq!(message, CONFIRM_MESSAGE);
            seen.fetch_add(1, Ordering::SeqCst);
            false
        }));

        let result = handler
            .submit(&ctx, &mut history, &mut location, "/checkin/delete/1")
            .await;

        assert_eq!(result, DeleteResult::Declined);
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
        assert!(api.calls().is_empty());
        assert_eq!(history.html(), ONE_ROW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleting_last_row_shows_empty_state() {
        let api = Arc::new(FakeApi::default());
        api.push_delete(Ok(DeleteReceipt {
            message: None,
            dashboard_url: Some("/checkin/dashboard?project=1".to_string()),
        }));
        let ctx = context(api.clone());
        let mut history = HistoryView::new(ONE_ROW, vec![]);
        let mut location = Location::new("/checkin/history");

        let result = DeleteHandler::new(always(true))
            .submit(&ctx, &mut history, &mut location, "/checkin/delete/1")
            .await;

        assert_eq!(result, DeleteResult::Removed { emptied: true });
        assert_eq!(
            api.calls(),
            vec![Call::Delete {
                action: "/checkin/delete/1".to_string(),
                fields: vec![("csrf_token".to_string(), "tok".to_string())],
            }]
        );
        let html = history.html();
        assert!(html.starts_with("<div class=\"table-responsive\"><div class=\"text-center py-4\">"));
        assert!(html.contains(EMPTY_MESSAGE));
        assert!(html.contains("href=\"/checkin/dashboard?project=1\""));
        assert!(!html.contains("<table>"));
        assert_eq!(history.bound_forms(), 0);
        assert_eq!(toasts(&ctx).await, vec!["Check-in deleted successfully"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleting_one_of_two_rows() {
        let api = Arc::new(FakeApi::default());
        let ctx = context(api.clone());
        let mut history = HistoryView::new(TWO_ROWS, vec![]);
        let mut location = Location::new("/checkin/history");

        let result = DeleteHandler::new(always(true))
            .submit(&ctx, &mut history, &mut location, "/checkin/delete/1")
            .await;

        assert_eq!(result, DeleteResult::Removed { emptied: false });
        assert!(!history.html().contains("/checkin/delete/1"));
        assert!(history.html().contains("/checkin/delete/2"));
        assert!(!history.is_bound("/checkin/delete/1"));
        assert!(history.is_bound("/checkin/delete/2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_faded_row_is_the_one_removed() {
        let api = Arc::new(FakeApi::default());
        let ctx = context(api.clone());
        let mut history = HistoryView::new(TWO_ROWS, vec![]);
        let mut location = Location::new("/checkin/history");

        let result = DeleteHandler::new(always(true))
            .submit(&ctx, &mut history, &mut location, "/checkin/delete/2")
            .await;

        assert_eq!(result, DeleteResult::Removed { emptied: false });
        assert!(history.html().contains("/checkin/delete/1"));
        assert!(!history.html().contains("/checkin/delete/2"));
        assert!(!history.html().contains("opacity"));
        assert_eq!(history.html().matches("<tr").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_state_falls_back_to_dashboard_path() {
        let api = Arc::new(FakeApi::default());
        let ctx = context(api.clone());
        let mut history = HistoryView::new(ONE_ROW, vec![]);
        let mut location = Location::new("/checkin/history");

        DeleteHandler::new(always(true))
            .submit(&ctx, &mut history, &mut location, "/checkin/delete/1")
            .await;

        assert!(history.html().contains("href=\"/checkin/dashboard\""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_without_row_reloads() {
        let api = Arc::new(FakeApi::default());
        let ctx = context(api.clone());
        let mut history = HistoryView::new(
            r#"<div><form class="delete-checkin-form" action="/checkin/delete/5"></form></div>"#,
            vec![],
        );
        let mut location = Location::new("/checkin/history");

        let result = DeleteHandler::new(always(true))
            .submit(&ctx, &mut history, &mut location, "/checkin/delete/5")
            .await;

        assert_eq!(result, DeleteResult::Reloading);
        assert_eq!(location.reloads(), 1);
        assert_eq!(
            toasts(&ctx).await,
            vec!["Check-in deleted successfully. Refreshing..."]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_notify() {
        let api = Arc::new(FakeApi::default());
        api.push_delete(Err(ClientError::declared(Some("Not allowed"))));
        api.push_delete(Err(ClientError::declared(None)));
        api.push_delete(Err(ClientError::Timeout));
        let ctx = context(api.clone());
        let mut history = HistoryView::new(ONE_ROW, vec![]);
        let mut location = Location::new("/checkin/history");
        let handler = DeleteHandler::new(always(true));

        for _ in 0..3 {
            let result = handler
                .submit(&ctx, &mut history, &mut location, "/checkin/delete/1")
                .await;
            assert_eq!(result, DeleteResult::Failed);
        }

        assert_eq!(history.html(), ONE_ROW);
        assert_eq!(
            toasts(&ctx).await,
            vec!["Not allowed", "An error occurred", "Failed to delete check-in"]
        );
    }
}
