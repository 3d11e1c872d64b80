//! Notification Layer
//!
//! One notifier with two presentations: a centered overlay (modal) and a
//! corner toast stack. Each presentation owns a surface that is created on
//! first use and then lives as long as the notifier. Notices append to their
//! surface and each one dismisses itself after its own delay, independent
//! of every other notice.
//!
//! Front ends subscribe to [`NoticeEvent`]s to render notices; HTML front
//! ends can use [`Notice::to_html`].

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::fragment::escape_html;

/// How a notice is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presentation {
    /// Full-screen centered overlay
    Modal,
    /// Bottom-right stacked toast
    Toast,
}

/// Severity, mapped onto bootstrap contextual classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Danger,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Danger => "danger",
        }
    }
}

/// A message shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: Uuid,
    pub presentation: Presentation,
    pub level: Level,
    pub message: String,
    pub shown_at: DateTime<Utc>,
    pub dismiss_after: Duration,
}

impl Notice {
    /// Markup for an HTML front end
    pub fn to_html(&self) -> String {
        let message = escape_html(&self.message);
        match self.presentation {
            Presentation::Modal => format!(
                "<div class=\"alert alert-{} alert-dismissible fade show\" id=\"notice-{}\">{}\
                 <button type=\"button\" class=\"btn-close\" aria-label=\"Close\"></button></div>",
                self.level.as_str(),
                self.id,
                message
            ),
            Presentation::Toast => format!(
                "<div id=\"toast-{}\" class=\"toast align-items-center text-white bg-{} border-0\" \
                 role=\"alert\" aria-live=\"assertive\" aria-atomic=\"true\">\
                 <div class=\"d-flex\"><div class=\"toast-body\">{}</div>\
                 <button type=\"button\" class=\"btn-close btn-close-white me-2 m-auto\" \
                 aria-label=\"Close\"></button></div></div>",
                self.id,
                self.level.as_str(),
                message
            ),
        }
    }
}

/// Lifecycle events for front ends
#[derive(Debug, Clone, PartialEq)]
pub enum NoticeEvent {
    Shown(Notice),
    Dismissed {
        id: Uuid,
        presentation: Presentation,
    },
}

/// Container notices of one presentation are appended to
#[derive(Debug, Clone)]
pub struct Surface {
    pub created_at: DateTime<Utc>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Default)]
struct Surfaces {
    overlay: Option<Surface>,
    toasts: Option<Surface>,
}

impl Surfaces {
    fn slot(&mut self, presentation: Presentation) -> &mut Option<Surface> {
        match presentation {
            Presentation::Modal => &mut self.overlay,
            Presentation::Toast => &mut self.toasts,
        }
    }

    fn get(&self, presentation: Presentation) -> Option<&Surface> {
        match presentation {
            Presentation::Modal => self.overlay.as_ref(),
            Presentation::Toast => self.toasts.as_ref(),
        }
    }
}

/// Configuration for the notifier
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub modal_dismiss: Duration,
    pub toast_dismiss: Duration,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            modal_dismiss: Duration::from_millis(3000),
            toast_dismiss: Duration::from_millis(3000),
            event_capacity: 64,
        }
    }
}

impl From<&NotificationConfig> for NotifierConfig {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            modal_dismiss: Duration::from_millis(config.modal_dismiss_ms),
            toast_dismiss: Duration::from_millis(config.toast_dismiss_ms),
            ..Default::default()
        }
    }
}

struct Inner {
    surfaces: RwLock<Surfaces>,
    events: broadcast::Sender<NoticeEvent>,
    config: NotifierConfig,
}

/// Shared handle to the notification layer
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                surfaces: RwLock::new(Surfaces::default()),
                events,
                config,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NoticeEvent> {
        self.inner.events.subscribe()
    }

    /// Show a notice and schedule its dismissal; must run inside a Tokio runtime
    pub async fn notify(
        &self,
        presentation: Presentation,
        level: Level,
        message: impl Into<String>,
    ) -> Uuid {
        let dismiss_after = match presentation {
            Presentation::Modal => self.inner.config.modal_dismiss,
            Presentation::Toast => self.inner.config.toast_dismiss,
        };
        let notice = Notice {
            id: Uuid::new_v4(),
            presentation,
            level,
            message: message.into(),
            shown_at: Utc::now(),
            dismiss_after,
        };
        let id = notice.id;

        match level {
            Level::Danger => tracing::warn!(?presentation, "{}", notice.message),
            _ => tracing::info!(?presentation, level = level.as_str(), "{}", notice.message),
        }

        {
            let mut surfaces = self.inner.surfaces.write().await;
            let surface = surfaces.slot(presentation).get_or_insert_with(|| {
                tracing::debug!(?presentation, "Creating notification surface");
                Surface {
                    created_at: Utc::now(),
                    notices: Vec::new(),
                }
            });
            surface.notices.push(notice.clone());
        }

        // No receivers is fine: nothing is rendering
        let _ = self.inner.events.send(NoticeEvent::Shown(notice));

        let notifier = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(dismiss_after).await;
            notifier.dismiss(id).await;
        });

        id
    }

    pub async fn modal(&self, level: Level, message: impl Into<String>) -> Uuid {
        self.notify(Presentation::Modal, level, message).await
    }

    pub async fn toast(&self, level: Level, message: impl Into<String>) -> Uuid {
        self.notify(Presentation::Toast, level, message).await
    }

    /// Remove one notice (close button or timer); false if already gone
    pub async fn dismiss(&self, id: Uuid) -> bool {
        let mut surfaces = self.inner.surfaces.write().await;
        for presentation in [Presentation::Modal, Presentation::Toast] {
            let Some(surface) = surfaces.slot(presentation).as_mut() else {
                continue;
            };
            if let Some(pos) = surface.notices.iter().position(|n| n.id == id) {
                surface.notices.remove(pos);
                let _ = self
                    .inner
                    .events
                    .send(NoticeEvent::Dismissed { id, presentation });
                return true;
            }
        }
        false
    }

    /// Dismiss everything on one surface; the surface itself stays
    pub async fn clear(&self, presentation: Presentation) -> usize {
        let mut surfaces = self.inner.surfaces.write().await;
        let Some(surface) = surfaces.slot(presentation).as_mut() else {
            return 0;
        };
        let removed: Vec<Notice> = surface.notices.drain(..).collect();
        for notice in &removed {
            let _ = self.inner.events.send(NoticeEvent::Dismissed {
                id: notice.id,
                presentation,
            });
        }
        removed.len()
    }

    /// Notices currently on a surface, oldest first
    pub async fn visible(&self, presentation: Presentation) -> Vec<Notice> {
        self.inner
            .surfaces
            .read()
            .await
            .get(presentation)
            .map(|s| s.notices.clone())
            .unwrap_or_default()
    }

    pub async fn has_surface(&self, presentation: Presentation) -> bool {
        self.inner.surfaces.read().await.get(presentation).is_some()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(NotifierConfig::default())
    }
}
