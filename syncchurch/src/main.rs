use std::process::ExitCode;

use chrono::{Duration, Local};
use clap::{Parser, Subcommand};
use syncchurch::{
    DEFAULT_BASE_URL, Error, HttpAuthBackend, SqliteKeyValueStore, SqliteStorage, SyncChurch,
    SyncChurchBuilder, validation::password_strength,
};
use tracing_subscriber::EnvFilter;

/// Command line interface for the SyncChurch login guard
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "SYNCCHURCH_DB_URL", default_value = "sqlite://syncchurch.db?mode=rwc")]
    db_url: String,

    /// Base URL of the authentication backend
    #[arg(long, env = "SYNCCHURCH_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Failed attempts allowed before an email is locked out
    #[arg(long, env = "SYNCCHURCH_MAX_ATTEMPTS", default_value_t = 50)]
    max_attempts: u32,

    /// Length of a lockout in minutes
    #[arg(long, env = "SYNCCHURCH_LOCKOUT_MINUTES", default_value_t = 24 * 60)]
    lockout_minutes: i64,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "SYNCCHURCH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show failed attempts and lockout state for an email
    Status {
        #[arg(long)]
        email: String,
    },
    /// Lift the lockout on an email
    Unlock {
        #[arg(long)]
        email: String,
    },
    /// Log out and clear the stored session
    Logout,
    /// Show the logged in user
    Whoami,
    /// Rate a password the way the registration form does
    Strength {
        #[arg(long, env = "SYNCCHURCH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Run database migrations
    Migrate,
    /// Print version information
    Version,
}

type Guard = SyncChurch<SqliteKeyValueStore, HttpAuthBackend>;

fn lockout_duration(minutes: i64) -> Result<Duration, String> {
    Duration::try_minutes(minutes)
        .ok_or_else(|| format!("--lockout-minutes {minutes} is out of range"))
}

async fn open(cli: &Cli) -> Result<Guard, Box<dyn std::error::Error>> {
    let syncchurch = SyncChurchBuilder::new()
        .with_sqlite(&cli.db_url)
        .await?
        .apply_migrations(true)
        .with_api_url(&cli.api_url)
        .with_max_attempts(cli.max_attempts)
        .with_lockout_duration(lockout_duration(cli.lockout_minutes)?)
        .build()
        .await?;

    Ok(syncchurch)
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Commands::Migrate => {
            println!("Running migrations...");
            let storage = SqliteStorage::connect(&cli.db_url).await?;
            storage.migrate().await?;
        }
        Commands::Version => {
            println!("SyncChurch v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Strength { password } => {
            let strength = password_strength(password);
            println!("{:?} ({}/100)", strength.level, strength.score);
        }
        Commands::Login { email, password } => {
            let syncchurch = open(&cli).await?;
            match syncchurch.login(email, password).await {
                Ok(user) => println!("Logged in as {} ({})", user.full_name, user.role),
                Err(e @ Error::Auth(_)) => {
                    let remaining = syncchurch.remaining_attempts(email).await?;
                    return Err(format!("{e} ({remaining} attempts left)").into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Status { email } => {
            let syncchurch = open(&cli).await?;
            let status = syncchurch.lockout_status(email).await?;
            let remaining = syncchurch.remaining_attempts(email).await?;

            println!("Email:            {}", status.email);
            println!("Failed attempts:  {}", status.failed_attempts);
            println!("Attempts left:    {remaining}");
            match status.locked_until {
                Some(until) => println!(
                    "Locked until:     {}",
                    until.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                ),
                None => println!("Locked:           no"),
            }
        }
        Commands::Unlock { email } => {
            let syncchurch = open(&cli).await?;
            if syncchurch.unlock(email).await? {
                println!("Unlocked {email}");
            } else {
                println!("{email} was not locked");
            }
        }
        Commands::Logout => {
            let syncchurch = open(&cli).await?;
            syncchurch.logout().await?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let syncchurch = open(&cli).await?;
            match syncchurch.current_user().await? {
                Some(user) => println!("{} <{}> ({})", user.full_name, user.email, user.role),
                None => println!("Not logged in"),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
