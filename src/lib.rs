//! # Checkin
//!
//! Client-side interaction layer for a daily check-in web application:
//! the dashboard's check-in form, project switching, the history page's
//! table/card views and in-place deletion of entries.
//!
//! ## Modules
//!
//! - [`api`]: typed reqwest client for the server's JSON endpoints
//! - [`page`]: headless page model with delegated event dispatch
//! - [`notify`]: modal and toast notices with timed dismissal
//! - [`fragment`]: DOM-style edits on server-rendered HTML
//! - [`timezone`]: host time zone reported through a cookie
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use checkin::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let client = CheckinClient::new(ClientConfig::from_config(&config))?;
//!
//!     let ctx = PageContext::new(
//!         Arc::new(client),
//!         Notifier::new(NotifierConfig::from(&config.notifications)),
//!         PageSettings::from(&config),
//!     );
//!     let confirm: Arc<dyn Confirm> = Arc::new(|_: &str| true);
//!     let mut page = Page::new(ctx, Location::new("/checkin/dashboard"), confirm)
//!         .with_project(1);
//!
//!     page.dispatch(UiEvent::NoteInput("Went for a run".into())).await;
//!     page.dispatch(UiEvent::SubmitCheckin).await;
//!
//!     println!("{}", page.recent().html());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod fragment;
pub mod notify;
pub mod page;
pub mod timezone;

// Re-export top-level types for convenience
pub use api::{
    CheckinApi, CheckinClient, CheckinReceipt, ClientConfig, ClientError, ClientResult,
    DeleteReceipt, ImageRef, ImageUpload, NewCheckin, Project, ProjectId, RecentCheckin,
};

pub use config::{Config, ConfigError, LoggingConfig, NotificationConfig};

pub use fragment::Fragment;

pub use notify::{Level, Notice, NoticeEvent, Notifier, NotifierConfig, Presentation};

pub use page::{
    delete::{Confirm, DeleteResult},
    history::{HistoryView, ViewToggle},
    project::{ProjectSelector, SelectOption},
    recent::RecentPanel,
    submitter::{SubmitControl, SubmitError},
    EventOutcome, Location, Navigation, Page, PageContext, PageSettings, UiEvent,
};
