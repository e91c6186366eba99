mod commands;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    CoordinatorConfig, HttpRideApi, LifecycleCoordinator, ResumeStore, SessionContext,
};
use shared::domain::{CancelReason, RideId, Role};
use storage::Storage;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ridectl", about = "Request, track and close rides from the terminal")]
struct Cli {
    /// Overrides the configured ride service URL.
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remember who is using this terminal.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, value_enum, default_value_t = RoleArg::Rider)]
        role: RoleArg,
        #[arg(long)]
        token: Option<String>,
    },
    /// Forget the saved session and any ride it was tracking.
    Logout,
    /// Request a ride and wait for a driver. Ctrl-C leaves the queue.
    Request {
        #[arg(long)]
        pickup: String,
        #[arg(long)]
        dropoff: String,
        /// Pickup time (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 1)]
        passengers: u8,
        #[arg(long)]
        ada: bool,
    },
    /// Show the active ride, resuming it from the last session if needed.
    Status,
    /// Show pickup, dropoff and time for a ride.
    Details {
        #[arg(long)]
        ride_id: Option<i64>,
    },
    /// Cancel the assigned ride.
    Cancel {
        #[arg(long, value_enum)]
        reason: ReasonArg,
        /// Free text for `--reason other`.
        #[arg(long)]
        other: Option<String>,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Show the ride assigned to this driver.
    DriverRide,
    /// Start the assigned trip.
    Start,
    /// Close the ride with the rider's completion code.
    Complete {
        #[arg(long)]
        code: String,
    },
    /// Address suggestions for a partial query.
    Suggest { query: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Rider,
    Driver,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Rider => Role::Rider,
            RoleArg::Driver => Role::Driver,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReasonArg {
    ChangeOfPlans,
    DriverDelay,
    FoundAlternateTransport,
    WrongPickup,
    RequestedByMistake,
    Other,
}

impl ReasonArg {
    fn into_reason(self, other: Option<String>) -> CancelReason {
        match self {
            Self::ChangeOfPlans => CancelReason::ChangeOfPlans,
            Self::DriverDelay => CancelReason::DriverDelay,
            Self::FoundAlternateTransport => CancelReason::FoundAlternateTransport,
            Self::WrongPickup => CancelReason::WrongPickup,
            Self::RequestedByMistake => CancelReason::RequestedByMistake,
            Self::Other => CancelReason::Other(other.unwrap_or_default()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = config::load_settings();
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    let database_url = config::prepare_database_url(&settings.database_url)?;
    let storage = Arc::new(
        Storage::new(&database_url)
            .await
            .with_context(|| format!("failed to open local state at '{database_url}'"))?,
    );

    if let Command::Login {
        username,
        role,
        token,
    } = &cli.command
    {
        let mut session = SessionContext {
            username: username.trim().to_string(),
            access_token: None,
            role: (*role).into(),
        };
        if let Some(token) = token {
            session = session.with_access_token(token.clone());
        }
        return commands::login(storage.as_ref(), &session).await;
    }
    if let Command::Logout = cli.command {
        return commands::logout(storage.as_ref()).await;
    }

    let session = storage
        .load_session()
        .await?
        .context("no saved session; run `ridectl login --username <name>` first")?;
    let api = HttpRideApi::with_timeout(settings.server_url()?, settings.http_timeout())?
        .with_access_token(session.access_token.clone());
    debug!(server = %api.base_url(), username = session.username.as_str(), "ridectl: connecting");
    let coordinator = LifecycleCoordinator::new(
        Arc::new(api),
        storage,
        session,
        CoordinatorConfig {
            poll_interval: settings.poll_interval(),
        },
    );

    match cli.command {
        Command::Login { .. } | Command::Logout => Ok(()),
        Command::Request {
            pickup,
            dropoff,
            at,
            passengers,
            ada,
        } => {
            let request = client_core::RideRequest {
                pickup_location: pickup,
                dropoff_location: dropoff,
                pickup_time: Some(at.unwrap_or_else(Utc::now)),
                num_passengers: passengers,
                ada_required: ada,
            };
            commands::request(&coordinator, request).await
        }
        Command::Status => commands::status(&coordinator).await,
        Command::Details { ride_id } => commands::details(&coordinator, ride_id.map(RideId)).await,
        Command::Cancel { reason, other, yes } => {
            commands::cancel(&coordinator, reason.into_reason(other), yes).await
        }
        Command::DriverRide => commands::driver_ride(&coordinator).await,
        Command::Start => commands::start(&coordinator).await,
        Command::Complete { code } => commands::complete(&coordinator, &code).await,
        Command::Suggest { query } => commands::suggest(&coordinator, &query).await,
    }
}
