//! Checkin CLI
//!
//! Command-line front end for the check-in interaction layer:
//! - Submit check-ins with images
//! - Show a project and its recent check-ins
//! - Load history views and delete entries
//! - Inspect time zone and configuration

use checkin::api::{CheckinApi, CheckinClient, ClientConfig, ImageUpload, ProjectId};
use checkin::page::preview::FormPreview;
use checkin::page::submitter::format_size;
use checkin::{
    Config, Confirm, DeleteResult, EventOutcome, Location, LoggingConfig, NoticeEvent, Notifier,
    NotifierConfig, Page, PageContext, PageSettings, RecentPanel, UiEvent, ViewToggle,
};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "checkin")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Daily check-in client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Check-in server URL (overrides config)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// CSRF token (default: read from the dashboard page)
    #[arg(long, global = true)]
    pub csrf_token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check in to a project
    Submit {
        /// Project ID
        #[arg(short, long)]
        project: ProjectId,
        /// Check-in note
        #[arg(short, long)]
        note: String,
        /// Image files to attach
        #[arg(short, long)]
        image: Vec<PathBuf>,
    },

    /// List recent check-ins of a project
    Recent {
        project: ProjectId,
    },

    /// Show project details and recent check-ins
    Project {
        project: ProjectId,
    },

    /// Load a history view
    History {
        /// History URL (e.g. "/checkin/history?project=1")
        url: String,
        /// View name (table, card)
        #[arg(long, default_value = "table")]
        view: String,
    },

    /// Delete a check-in through its history form
    Delete {
        /// Delete form action (e.g. "/checkin/delete/12")
        action: String,
        /// History view containing the form
        #[arg(long, default_value = "/checkin/history")]
        history_url: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Preview a project's icon and color
    Preview {
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },

    /// Show the time zone reported to the server
    Timezone,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Confirmation read from the terminal
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, message: &str) -> bool {
        eprint!("{} [y/N] ", message);
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.base_url {
        config.server.base_url = url.clone();
    }
    if let Some(token) = &cli.csrf_token {
        config.server.csrf_token = Some(token.clone());
    }

    init_logging(&config.logging);

    match cli.command {
        Commands::Config { output } => {
            let content = checkin::config::generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }

        Commands::Timezone => {
            let zone = config
                .timezone
                .name
                .clone()
                .unwrap_or_else(|| checkin::timezone::resolve(&config.timezone.default));
            println!("{}", zone);
            println!("Cookie: {}", checkin::timezone::cookie(&zone));
        }

        Commands::Preview { icon, color } => {
            let mut preview = FormPreview::default();
            preview.on_icon_input(icon.as_deref().unwrap_or(""));
            preview.on_color_input(color.as_deref().unwrap_or(""));
            println!("Icon:       {}", preview.icon_class());
            println!("Background: {}", preview.background());
        }

        Commands::Submit {
            project,
            note,
            image,
        } => {
            let client = connect(&config, true).await?;
            let dashboard = config.history.dashboard_path.clone();
            let (page, mut notices) = open_page(client, &config, &dashboard, None);
            let mut page = page.with_project(project);

            let max_size = config.upload.max_image_size;
            let mut files = Vec::with_capacity(image.len());
            let mut too_large = Vec::new();
            for path in &image {
                match ImageUpload::from_path_within(path, max_size).await? {
                    Some(file) => files.push(file),
                    None => too_large.push(path.display().to_string()),
                }
            }
            if !too_large.is_empty() {
                println!(
                    "[warning] Skipped files larger than {}: {}",
                    format_size(max_size),
                    too_large.join(", ")
                );
            }

            page.dispatch(UiEvent::NoteInput(note)).await;
            page.dispatch(UiEvent::FilesSelected(files)).await;
            let outcome = page.dispatch(UiEvent::SubmitCheckin).await;
            print_notices(&mut notices);

            match outcome {
                EventOutcome::Submitted(Ok(_)) => print_recent(page.recent()),
                _ => std::process::exit(1),
            }
        }

        Commands::Recent { project } => {
            let client = connect(&config, false).await?;
            let mut panel = RecentPanel::default();
            if !panel.refresh(&client, project).await {
                eprintln!("Failed to load recent check-ins");
                std::process::exit(1);
            }
            print_recent(&panel);
        }

        Commands::Project { project } => {
            let client = connect(&config, false).await?;
            let dashboard = config.history.dashboard_path.clone();
            let (mut page, mut notices) = open_page(client, &config, &dashboard, None);
            page.dispatch(UiEvent::ProjectSelected(project)).await;
            print_notices(&mut notices);

            let header = page.header();
            if header.name().is_empty() {
                std::process::exit(1);
            }
            println!("Project: {}", header.name());
            if let Some(icon) = header.icon_class() {
                println!("Icon:    {}", icon);
            }
            if let Some(color) = header.background() {
                println!("Color:   {}", color);
            }
            print_recent(page.recent());
        }

        Commands::History { url, view } => {
            let client = connect(&config, false).await?;
            let (page, mut notices) = open_page(client, &config, &url, None);
            let toggles = vec![ViewToggle::new(&view, &url, false)];
            let mut page = page.with_history(String::new(), toggles);

            let outcome = page
                .dispatch(UiEvent::ToggleView {
                    view,
                    url: url.clone(),
                })
                .await;
            print_notices(&mut notices);

            match outcome {
                EventOutcome::ViewToggled(true) => println!("{}", page.history().html()),
                _ => std::process::exit(1),
            }
        }

        Commands::Delete {
            action,
            history_url,
            yes,
        } => {
            let client = connect(&config, true).await?;
            let html = client.history_view(&history_url).await?;

            let confirm: Arc<dyn Confirm> = if yes {
                Arc::new(|_: &str| true)
            } else {
                Arc::new(StdinConfirm)
            };
            let (page, mut notices) = open_page(client, &config, &history_url, Some(confirm));
            let mut page = page.with_history(html, Vec::new());

            let outcome = page
                .dispatch(UiEvent::DeleteSubmitted {
                    action: action.clone(),
                })
                .await;
            print_notices(&mut notices);

            match outcome {
                EventOutcome::Deleted(DeleteResult::Removed { .. })
                | EventOutcome::Deleted(DeleteResult::Reloading) => {}
                EventOutcome::Deleted(DeleteResult::Declined) => println!("Cancelled"),
                EventOutcome::Deleted(DeleteResult::Unbound) => {
                    eprintln!("No delete form for {} in {}", action, history_url);
                    std::process::exit(1);
                }
                _ => std::process::exit(1),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("checkin={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Build the client, reading the CSRF token from the dashboard when needed
async fn connect(
    config: &Config,
    needs_csrf: bool,
) -> Result<CheckinClient, Box<dyn std::error::Error>> {
    let client = CheckinClient::new(ClientConfig::from_config(config))?;
    if !needs_csrf || client.config().csrf_token.is_some() {
        return Ok(client);
    }

    match client.fetch_csrf_token(&config.history.dashboard_path).await? {
        Some(token) => Ok(client.with_csrf_token(token)),
        None => {
            tracing::warn!("No CSRF token found on {}", config.history.dashboard_path);
            Ok(client)
        }
    }
}

fn open_page(
    client: CheckinClient,
    config: &Config,
    href: &str,
    confirm: Option<Arc<dyn Confirm>>,
) -> (Page, broadcast::Receiver<NoticeEvent>) {
    let notifier = Notifier::new(NotifierConfig::from(&config.notifications));
    let notices = notifier.subscribe();
    let ctx = PageContext::new(Arc::new(client), notifier, PageSettings::from(config));
    let confirm = confirm.unwrap_or_else(|| Arc::new(StdinConfirm));
    (Page::new(ctx, Location::new(href), confirm), notices)
}

fn print_notices(notices: &mut broadcast::Receiver<NoticeEvent>) {
    while let Ok(event) = notices.try_recv() {
        if let NoticeEvent::Shown(notice) = event {
            println!("[{}] {}", notice.level.as_str(), notice.message);
        }
    }
}

fn print_recent(panel: &RecentPanel) {
    if panel.entries().is_empty() {
        println!("No recent check-ins yet.");
        return;
    }
    for entry in panel.entries() {
        let images = if entry.images.is_empty() {
            String::new()
        } else {
            format!(" ({} images)", entry.images.len())
        };
        println!(
            "{}  {}{}",
            entry.check_time,
            entry.note.as_deref().unwrap_or(""),
            images
        );
    }
}
