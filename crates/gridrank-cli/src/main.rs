mod ranking;

use clap::{Args, Parser, Subcommand};
use gridrank_core::{Credentials, Device};
use gridrank_engine::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gridrank-cli")]
#[command(about = "Local map-search rank grid checker")]
struct Cli {
    /// Provider credentials as base64 of `username:password`
    #[arg(long, global = true, env = "GRIDRANK_CREDENTIALS_B64", hide_env_values = true)]
    credentials_b64: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Business location shared by the check commands.
#[derive(Debug, Clone, Args)]
struct Location {
    /// Business name used as the search keyword
    #[arg(long)]
    business: String,
    /// Latitude of the grid centre
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude of the grid centre
    #[arg(long, allow_negative_numbers = true)]
    lng: f64,
}

/// Grid shape and search options.
#[derive(Debug, Clone, Args)]
struct GridOptions {
    /// Points per side of the square grid (1-10)
    #[arg(long, default_value = "3")]
    grid_size: u32,
    /// Distance from the centre to the grid edge, in kilometres
    #[arg(long, default_value = "5.0")]
    radius_km: f64,
    /// Search language code
    #[arg(long, default_value = "en")]
    language: String,
    /// Device to emulate: desktop, mobile or tablet
    #[arg(long, default_value = "desktop")]
    device: Device,
    /// Map zoom level (1-20)
    #[arg(long, default_value = "15")]
    zoom: u8,
}

/// Polling bounds for commands that wait on tasks.
#[derive(Debug, Clone, Args)]
struct PollOptions {
    /// Overall wait budget in seconds (60-3600)
    #[arg(long, default_value = "1800")]
    max_wait: u64,
    /// Seconds between polling rounds (30-600)
    #[arg(long, default_value = "120")]
    poll_interval: u64,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// 3x3 grid, 5 km radius, default polling
    Quick {
        #[command(flatten)]
        location: Location,
        /// Domain to rank at each grid point
        #[arg(long)]
        target_domain: Option<String>,
    },
    /// Full grid check with custom shape and polling
    Advanced {
        #[command(flatten)]
        location: Location,
        #[command(flatten)]
        grid: GridOptions,
        #[command(flatten)]
        poll: PollOptions,
        /// Domain to rank at each grid point
        #[arg(long)]
        target_domain: Option<String>,
    },
    /// Submit tasks and print their ids without waiting
    Create {
        #[command(flatten)]
        location: Location,
        #[command(flatten)]
        grid: GridOptions,
    },
    /// Poll previously created tasks
    Results {
        /// Task id (repeatable)
        #[arg(long = "task-id", required = true)]
        task_ids: Vec<String>,
        /// Coordinate string `lat,lng,zoom` paired by position with task ids
        #[arg(long = "coordinate", allow_hyphen_values = true)]
        coordinates: Vec<String>,
        /// Domain to rank; requires coordinates
        #[arg(long, requires = "coordinates")]
        target_domain: Option<String>,
        #[command(flatten)]
        poll: PollOptions,
    },
    /// One non-blocking status sweep over task ids
    Status {
        /// Task id (repeatable)
        #[arg(long = "task-id")]
        task_ids: Vec<String>,
    },
    /// Print grid coordinates without creating tasks
    Grid {
        /// Latitude of the grid centre
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude of the grid centre
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        #[arg(long, default_value = "3")]
        grid_size: u32,
        #[arg(long, default_value = "5.0")]
        radius_km: f64,
    },
    /// Service metadata and a provider connection check
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = gridrank_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let credentials = cli
        .credentials_b64
        .as_deref()
        .map(Credentials::from_base64)
        .transpose()?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current round");
            trigger.cancel();
        }
    });

    let ctx = ranking::Context {
        config: &config,
        credentials,
        cancel: &cancel,
    };

    match cli.command {
        Some(Commands::Quick {
            location,
            target_domain,
        }) => ranking::run_quick(&ctx, &location, target_domain.as_deref()).await?,
        Some(Commands::Advanced {
            location,
            grid,
            poll,
            target_domain,
        }) => {
            ranking::run_advanced(&ctx, &location, &grid, &poll, target_domain.as_deref()).await?;
        }
        Some(Commands::Create { location, grid }) => {
            ranking::run_create(&ctx, &location, &grid).await?;
        }
        Some(Commands::Results {
            task_ids,
            coordinates,
            target_domain,
            poll,
        }) => {
            ranking::run_results(&ctx, &task_ids, &coordinates, target_domain.as_deref(), &poll)
                .await?;
        }
        Some(Commands::Status { task_ids }) => ranking::run_status(&ctx, &task_ids).await?,
        Some(Commands::Grid {
            lat,
            lng,
            grid_size,
            radius_km,
        }) => ranking::run_grid(lat, lng, grid_size, radius_km)?,
        Some(Commands::Info) => ranking::run_info(&ctx).await?,
        None => println!("gridrank-cli ready; run with --help for commands"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
