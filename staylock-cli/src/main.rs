mod server;
mod handlers;

#[cfg(test)]
mod server_test;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use staylock_core::config::{ArbiterConfig, LEASE_ENV_VAR};
use staylock_core::types::{GuestDetails, LockToken, PropertyId};

#[derive(Parser)]
#[command(
    name = "staylock",
    about = "staylock: soft-lock arbitration for property bookings",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Storage backend: "memory" or "sqlite:<path>"
    #[arg(long, default_value = "memory", env = "STAYLOCK_STORAGE")]
    storage: String,

    /// Soft lock lease in minutes
    #[arg(
        long = "lease-minutes",
        env = LEASE_ENV_VAR,
        default_value = "10",
        value_parser = ArbiterConfig::parse
    )]
    lease: ArbiterConfig,
}

impl StoreArgs {
    fn client(&self) -> anyhow::Result<staylock_core::client::BookingClient> {
        server::create_client(&self.storage, self.lease)
    }
}

#[derive(Args)]
struct StayArgs {
    /// Property to book
    #[arg(long)]
    property: u64,

    /// Check-in date (YYYY-MM-DD)
    #[arg(long)]
    check_in: String,

    /// Check-out date (YYYY-MM-DD), exclusive
    #[arg(long)]
    check_out: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the booking HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3100")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Maximum number of in-flight requests
        #[arg(long, default_value = "256")]
        max_concurrency: usize,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Probe availability and soft-lock the dates
    Probe {
        #[command(flatten)]
        stay: StayArgs,

        /// Token from an earlier probe; a new one is generated when omitted
        #[arg(long)]
        lock_token: Option<String>,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Confirm a reservation for previously probed dates
    Confirm {
        #[command(flatten)]
        stay: StayArgs,

        #[arg(long)]
        lock_token: String,

        #[arg(long)]
        firstname: String,

        #[arg(long)]
        lastname: String,

        #[arg(long)]
        email: String,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Delete expired soft locks
    Evict {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            max_concurrency,
            store,
        } => {
            let client = store.client()?;
            server::run(&host, port, client, max_concurrency).await?;
        }
        Commands::Probe {
            stay,
            lock_token,
            store,
        } => {
            let client = store.client()?;
            let token = lock_token.map(LockToken::new).unwrap_or_else(LockToken::generate);
            let outcome = client.check_availability(
                PropertyId(stay.property),
                &stay.check_in,
                &stay.check_out,
                &token,
            )?;
            let message = outcome
                .conflict_kind()
                .map(|kind| handlers::conflict_message(kind, client.lease_minutes()));

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "lock_token": token,
                    "outcome": outcome,
                    "message": message,
                }))?
            );
        }
        Commands::Confirm {
            stay,
            lock_token,
            firstname,
            lastname,
            email,
            store,
        } => {
            let client = store.client()?;
            let outcome = client.confirm_reservation(
                PropertyId(stay.property),
                &stay.check_in,
                &stay.check_out,
                &LockToken::new(lock_token),
                GuestDetails::new(firstname, lastname, email),
            )?;
            let message = match outcome.reservation() {
                Some(_) => handlers::BOOKED_MESSAGE,
                None => handlers::BOOKED_IN_THE_MEANTIME_MESSAGE,
            };

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "outcome": outcome,
                    "message": message,
                }))?
            );
        }
        Commands::Evict { store } => {
            let client = store.client()?;
            let evicted = client.evict_expired()?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "evicted": evicted }))?);
        }
        Commands::Version => {
            println!("staylock {}", env!("CARGO_PKG_VERSION"));
            println!("Soft-lock arbitration kernel for property bookings");
        }
    }

    Ok(())
}
