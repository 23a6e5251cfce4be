use std::fs::File;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod commands;
mod config;
mod dashboard;
mod format;
mod forms;
mod nav;
mod session;
mod tui;

#[cfg(test)]
mod testing;

use api::Backend;
use config::{Config, Overrides, CORE_URL_ENV};
use nav::{Navigator, Route, Section};
use session::{Session, SessionStore};

#[derive(Parser)]
#[command(name = "fruit")]
#[command(about = "Fruit Management - contacts, Bible studies and room reservations from the terminal")]
#[command(version = env!("FRUIT_VERSION"))]
struct Cli {
    /// Core service URL (overrides config and FRUIT_API_URL)
    #[arg(long, global = true)]
    core_url: Option<String>,

    /// Bible studies service URL (overrides config)
    #[arg(long, global = true)]
    studies_url: Option<String>,

    /// Rooms service URL (overrides config)
    #[arg(long, global = true)]
    rooms_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Sign in to the core service
    Login {
        /// Username (prompted when omitted)
        username: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show current login status
    Whoami,
    /// List contacts
    Contacts,
    /// Show one contact with its status history
    Contact { id: i64 },
    /// Move a contact to another status
    SetStatus {
        id: i64,
        status_id: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List contact statuses
    Statuses,
    /// List Bible studies for a contact
    Studies {
        /// Contact id (defaults to the first contact)
        #[arg(long)]
        contact: Option<i64>,
    },
    /// List lessons (admin)
    Lessons,
    /// List rooms, optionally only those free in a time window
    Rooms {
        #[arg(long, requires_all = ["start", "end"])]
        available: bool,
        /// Window start, RFC 3339
        #[arg(long)]
        start: Option<String>,
        /// Window end, RFC 3339
        #[arg(long)]
        end: Option<String>,
        /// Minimum capacity
        #[arg(long)]
        capacity: Option<i64>,
    },
    /// List reservations for a day
    Reservations {
        /// Day to show, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only this room
        #[arg(long)]
        room: Option<i64>,
    },
    /// Reserve a room
    Book {
        #[arg(long)]
        room: i64,
        #[arg(long)]
        title: String,
        /// Day, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Start time, HH:MM
        #[arg(long)]
        start: String,
        /// End time, HH:MM
        #[arg(long)]
        end: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Cancel a reservation
    Cancel { id: i64 },
    /// List users (admin)
    Users,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

fn init_tracing(interactive: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "fruit=info".into());

    // The dashboard owns the terminal, so its logs go to a file.
    if interactive {
        let file = File::create(tui::log_path()?)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.command.is_none())?;

    let command = match cli.command {
        Some(Commands::Config { action }) => return handle_config_command(action),
        command => command,
    };

    let overrides = Overrides {
        core_url: cli.core_url,
        studies_url: cli.studies_url,
        rooms_url: cli.rooms_url,
    };
    let config = Config::load()?.with_overrides(std::env::var(CORE_URL_ENV).ok(), &overrides);
    tracing::debug!(core = %config.services.core_url, "Using services");

    let session = Arc::new(Session::new(
        SessionStore::default_location()?,
        Navigator::new(Route::Dashboard(Section::Overview)),
    ));
    let backend = Arc::new(Backend::new(&config.services, session)?);

    let Some(command) = command else {
        return tui::run(backend, &config).await;
    };

    let signs_in = matches!(
        command,
        Commands::Config { .. } | Commands::Login { .. } | Commands::Register { .. } | Commands::Logout | Commands::Whoami
    );
    if !signs_in {
        commands::require_login(&backend)?;
    }

    let page_size = config.ui.page_size;
    let output = match command {
        Commands::Config { .. } => return Ok(()),
        Commands::Login { username } => auth::login(&backend, username).await?,
        Commands::Register {
            username,
            email,
            full_name,
            phone,
        } => {
            let registration = auth::Registration {
                username,
                email,
                full_name,
                phone,
            };
            auth::register(&backend, registration).await?
        }
        Commands::Logout => auth::logout(&backend),
        Commands::Whoami => auth::whoami(&backend).await?,
        Commands::Contacts => commands::contacts(&backend, page_size).await?,
        Commands::Contact { id } => commands::contact(&backend, id).await?,
        Commands::SetStatus { id, status_id, notes } => commands::set_status(&backend, id, status_id, notes).await?,
        Commands::Statuses => commands::statuses(&backend).await?,
        Commands::Studies { contact } => commands::studies(&backend, page_size, contact).await?,
        Commands::Lessons => commands::lessons(&backend).await?,
        Commands::Users => commands::users(&backend).await?,
        Commands::Rooms {
            available,
            start,
            end,
            capacity,
        } => {
            let window = match (available, start, end) {
                (true, Some(start), Some(end)) => Some(commands::Availability { start, end, capacity }),
                _ => None,
            };
            commands::rooms(&backend, window).await?
        }
        Commands::Reservations { date, room } => commands::reservations(&backend, date, room).await?,
        Commands::Book {
            room,
            title,
            date,
            start,
            end,
            description,
        } => {
            let booking = commands::Booking {
                room_id: room,
                title,
                date,
                start,
                end,
                description,
            };
            commands::book(&backend, booking).await?
        }
        Commands::Cancel { id } => commands::cancel(&backend, id).await?,
    };
    println!("{}", output);
    Ok(())
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().unwrap_or_default();
            config.set(&key, value)?;
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            for key in Config::KEYS {
                println!("{}: {}", key, config.get(key)?);
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_version_carries_build_stamp() {
        let version = env!("FRUIT_VERSION");
        let (package, stamp) = version.split_once('+').unwrap();
        assert_eq!(package, env!("CARGO_PKG_VERSION"));
        let (_date, commits) = stamp.rsplit_once('.').unwrap();
        assert!(commits.parse::<u64>().is_ok());
        assert_eq!(Cli::command().get_version(), Some(version));
    }
}
