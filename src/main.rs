//! Nomad binary entry point

use clap::{Parser, Subcommand};
use nomad::connectivity::StaticConnectivity;
use nomad::data::Category;
use nomad::error::AppError;
use nomad::service::{ComposeOutcome, ComposeRequest, FeedSource, SyncStatus};
use nomad::{AppState, config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nomad")]
#[command(version, about = "Offline-first client for the Nomad observation network")]
#[command(
    after_help = concat!(
        "Environment:\n",
        "  NOMAD__API__BASE_URL        Backend base URL\n",
        "  NOMAD__LOGGING__FORMAT      pretty or json\n",
        "  RUST_LOG                    Log filter override"
    )
)]
struct Cli {
    /// Treat the network as available without probing
    #[arg(long, global = true, conflicts_with = "offline")]
    online: bool,
    /// Treat the network as unavailable
    #[arg(long, global = true)]
    offline: bool,
    /// Print this run's metrics in the Prometheus text format on exit
    #[arg(long, global = true)]
    metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload everything waiting in the outbox
    Sync,
    /// Show the feed of a category
    Feed {
        /// Category id (1-4) or name
        category: Category,
    },
    /// Compose a new observation
    Post {
        #[arg(long, short)]
        category: Option<Category>,
        #[arg(long, short = 'm', default_value = "")]
        caption: String,
        #[arg(long, short)]
        image: Option<PathBuf>,
    },
    /// Inspect or empty the outbox
    Outbox {
        #[command(subcommand)]
        command: OutboxCommand,
    },
    /// Drop cached feed items
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    Login {
        email: String,
        password: String,
    },
    Signup {
        name: String,
        email: String,
        password: String,
    },
    Logout,
    /// Show the signed-in user
    Whoami,
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    Friends {
        #[command(subcommand)]
        command: FriendsCommand,
    },
    Observation {
        #[command(subcommand)]
        command: ObservationCommand,
    },
}

#[derive(Subcommand)]
enum OutboxCommand {
    List,
    /// Drop a single pending upload
    Remove {
        id: String,
    },
    Clear,
}

#[derive(Subcommand)]
enum CacheCommand {
    Clear {
        /// Only this category; all categories when omitted
        category: Option<Category>,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    Show {
        /// Another user's id; defaults to the signed-in user
        user_id: Option<i64>,
    },
    Update {
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
    },
    Avatar {
        image: PathBuf,
    },
    Background {
        image: PathBuf,
    },
}

#[derive(Subcommand)]
enum FriendsCommand {
    Search { query: String },
    Add { user_id: i64 },
}

#[derive(Subcommand)]
enum ObservationCommand {
    Show {
        id: i64,
    },
    Update {
        id: i64,
        #[arg(long, short)]
        category: Category,
        #[arg(long, short = 'm')]
        caption: String,
    },
    Delete {
        id: i64,
    },
    Like {
        id: i64,
    },
}

fn init_tracing(logging: Option<&config::LoggingConfig>) {
    let format = std::env::var("NOMAD__LOGGING__FORMAT")
        .ok()
        .or_else(|| logging.map(|l| l.format.clone()))
        .unwrap_or_else(|| "pretty".to_string());
    let level = logging.map(|l| l.level.as_str()).unwrap_or("info");
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("nomad={level}").into());

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging and metrics
/// 3. Initialize AppState
/// 4. Run the requested command
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 1. Load configuration
    let loaded = config::AppConfig::load();

    // 2. Initialize tracing/logging
    init_tracing(loaded.as_ref().ok().map(|c| &c.logging));
    nomad::metrics::init_metrics();

    let mut config = loaded?;
    if cli.online {
        config.connectivity.mode = config::ConnectivityMode::Online;
    } else if cli.offline {
        config.connectivity.mode = config::ConnectivityMode::Offline;
    }
    tracing::debug!(base_url = %config.api.base_url, "Configuration loaded");

    // 3. Initialize application state
    let mut state = AppState::new(config).await?;
    if cli.online || cli.offline {
        state = state.with_connectivity(Arc::new(StaticConnectivity::new(cli.online)));
    }

    // 4. Run
    let result = run(&state, cli.command).await;
    state.shutdown().await;

    if let Err(error) = &result {
        nomad::metrics::record_error(error, "cli");
    }
    if cli.metrics {
        print!("{}", nomad::metrics::gather_text());
    }
    if let Err(error) = result {
        eprintln!("{error}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(state: &AppState, command: Command) -> Result<(), AppError> {
    match command {
        Command::Sync => {
            let report = state
                .on_foreground()
                .await
                .map_err(|e| AppError::Internal(e.into()))?;
            match report.status {
                SyncStatus::Offline => println!("Offline; outbox left as is."),
                SyncStatus::SignedOut => println!("Not signed in; outbox left as is."),
                SyncStatus::Aborted { reason } => {
                    return Err(AppError::Internal(anyhow::anyhow!(reason)));
                }
                SyncStatus::Completed => {
                    println!(
                        "Uploaded {}, failed {}, skipped {}",
                        report.uploaded.len(),
                        report.failed.len(),
                        report.skipped.len()
                    );
                    for failure in &report.failed {
                        println!("  {}: {}", failure.id, failure.reason);
                    }
                    for id in &report.skipped {
                        println!("  {id}: image missing");
                    }
                }
            }
        }
        Command::Feed { category } => {
            let feed = state.feed_loader().load(category).await?;
            match &feed.source {
                FeedSource::Remote => {}
                FeedSource::Offline => println!("Offline. Showing cached data."),
                FeedSource::Fallback { reason } => {
                    println!("Could not refresh ({reason}). Showing cached data.")
                }
            }
            if feed.items.is_empty() {
                println!("No observations in {category}.");
            }
            for item in &feed.items {
                println!(
                    "#{} {} | {} | {} | {}",
                    item.observation_id,
                    item.author_label,
                    item.caption,
                    item.timestamp,
                    item.image_url
                );
            }
        }
        Command::Post {
            category,
            caption,
            image,
        } => {
            let request = ComposeRequest {
                category,
                caption,
                image_path: image,
            };
            match state.post_composer().compose(request).await? {
                ComposeOutcome::Queued(entry) => {
                    println!("Offline. Saved to outbox as {}.", entry.id)
                }
                ComposeOutcome::Published { message } => println!("{message}"),
            }
        }
        Command::Outbox { command } => {
            let composer = state.post_composer();
            match command {
                OutboxCommand::List => {
                    let pending = composer.pending().await?;
                    if pending.is_empty() {
                        println!("Outbox is empty.");
                    }
                    for entry in pending {
                        println!(
                            "{} [{}] {} ({}) {}",
                            entry.id,
                            entry.category,
                            entry.caption,
                            entry.image_path,
                            entry.created_at
                        );
                    }
                }
                OutboxCommand::Remove { id } => {
                    let entry = composer.discard(&id).await?;
                    println!("Removed {} ({}).", entry.id, entry.caption);
                }
                OutboxCommand::Clear => {
                    let removed = composer.clear_outbox().await?;
                    println!("Removed {} pending uploads.", removed.len());
                }
            }
        }
        Command::Cache { command } => {
            let CacheCommand::Clear { category } = command;
            let loader = state.feed_loader();
            let removed = match category {
                Some(category) => loader.clear_cache(category).await?,
                None => loader.clear_all().await?,
            };
            println!("Removed {removed} cached items.");
        }
        Command::Login { email, password } => {
            let session = state.account_service().login(&email, &password).await?;
            println!("Signed in as {} (#{})", session.username, session.user_id);
        }
        Command::Signup {
            name,
            email,
            password,
        } => {
            let account = state
                .account_service()
                .signup(&name, &email, &password)
                .await?;
            println!(
                "Account {} created. Sign in with `nomad login`.",
                account.username
            );
        }
        Command::Logout => {
            state.account_service().logout().await?;
            println!("Signed out.");
        }
        Command::Whoami => match state.account_service().current_session().await? {
            Some(session) => println!(
                "{} <{}> (#{})",
                session.full_name.as_deref().unwrap_or(&session.username),
                session.email,
                session.user_id
            ),
            None => println!("Not signed in."),
        },
        Command::Profile { command } => {
            let accounts = state.account_service();
            match command {
                ProfileCommand::Show { user_id } => {
                    let profile = accounts.fetch_profile(user_id).await?;
                    println!("{} (@{})", profile.full_name, profile.username);
                    if let Some(bio) = &profile.bio {
                        println!("{bio}");
                    }
                    println!(
                        "{} posts, {} friends",
                        profile.posts_count, profile.friends_count
                    );
                    for post in &profile.posts {
                        println!("  #{} {}", post.observation_id, post.title);
                    }
                }
                ProfileCommand::Update { bio, full_name } => {
                    accounts
                        .update_profile_text(bio.as_deref(), full_name.as_deref())
                        .await?;
                    println!("Profile updated.");
                }
                ProfileCommand::Avatar { image } => {
                    let url = accounts.upload_profile_picture(&image).await?;
                    println!("{url}");
                }
                ProfileCommand::Background { image } => {
                    let url = accounts.upload_background_picture(&image).await?;
                    println!("{url}");
                }
            }
        }
        Command::Friends { command } => {
            let social = state.social_service();
            match command {
                FriendsCommand::Search { query } => {
                    for user in social.search_users(&query).await? {
                        let marker = if user.is_friend { " (friend)" } else { "" };
                        println!(
                            "#{} {} @{}{marker}",
                            user.user_id, user.full_name, user.username
                        );
                    }
                }
                FriendsCommand::Add { user_id } => {
                    social.add_friend(user_id).await?;
                    println!("Friend added.");
                }
            }
        }
        Command::Observation { command } => {
            let social = state.social_service();
            match command {
                ObservationCommand::Show { id } => {
                    let item = social.fetch_observation(id).await?;
                    let category = Category::from_id(item.category_id)
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| item.category_id.to_string());
                    println!("#{} [{category}] {}", item.observation_id, item.title);
                    if !item.description.is_empty() {
                        println!("{}", item.description);
                    }
                    println!("{}", item.image_url);
                }
                ObservationCommand::Update {
                    id,
                    category,
                    caption,
                } => {
                    social.update_observation(id, category, &caption).await?;
                    println!("Observation updated.");
                }
                ObservationCommand::Delete { id } => {
                    social.delete_observation(id).await?;
                    println!("Observation deleted.");
                }
                ObservationCommand::Like { id } => {
                    println!("{}", social.toggle_like(id).await?);
                }
            }
        }
    }

    Ok(())
}
