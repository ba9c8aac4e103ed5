//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rental_core::config::Config;
use rental_core::types::{FuelType, SearchParams, Transmission};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "rental")]
#[command(version)]
#[command(about = "Search, book and manage rental cars from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the rental API (overrides config and RENTAL_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Print raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and store the issued tokens
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long, env = "RENTAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account and log in
    Signup {
        #[arg(long)]
        email: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Read from stdin when omitted
        #[arg(long, env = "RENTAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Revoke the session and forget stored tokens
    Logout,
    /// Show the logged-in user
    Whoami,

    /// Search available cars near a location
    Search(SearchArgs),

    /// Inspect and administer cars
    Cars {
        #[command(subcommand)]
        command: CarCommands,
    },
    /// Manage your bookings
    Bookings {
        #[command(subcommand)]
        command: BookingCommands,
    },

    /// Show backend health
    Health,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct SearchArgs {
    /// Latitude of the search center
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    /// Longitude of the search center
    #[arg(long, allow_hyphen_values = true)]
    lng: f64,
    /// Search radius in km
    #[arg(long)]
    radius: Option<f64>,
    /// Free-text filter (make, model, ...)
    #[arg(long)]
    query: Option<String>,
    /// electric, petrol, diesel or hybrid
    #[arg(long)]
    fuel: Option<FuelType>,
    /// automatic or manual
    #[arg(long)]
    transmission: Option<Transmission>,
    /// Minimum number of seats
    #[arg(long)]
    seats: Option<u8>,
    /// Pickup time (RFC 3339 or YYYY-MM-DDTHH:MM)
    #[arg(long)]
    pickup: Option<String>,
    /// Dropoff time (RFC 3339 or YYYY-MM-DDTHH:MM)
    #[arg(long)]
    dropoff: Option<String>,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(clap::Subcommand)]
enum CarCommands {
    /// Show a car
    Show {
        #[arg(value_name = "CAR_ID")]
        id: String,
    },
    /// Create a car from a JSON file (admin)
    Create {
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },
    /// Apply a partial JSON update to a car (admin)
    Update {
        #[arg(value_name = "CAR_ID")]
        id: String,
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },
    /// Delete a car (admin)
    Delete {
        #[arg(value_name = "CAR_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum BookingCommands {
    /// List your bookings
    List,
    /// Show a booking
    Show {
        #[arg(value_name = "BOOKING_ID")]
        id: String,
    },
    /// Book a car
    Create {
        #[arg(long = "car", value_name = "CAR_ID")]
        car_id: String,
        /// Pickup time (RFC 3339 or YYYY-MM-DDTHH:MM)
        #[arg(long)]
        pickup: String,
        /// Dropoff time (RFC 3339 or YYYY-MM-DDTHH:MM)
        #[arg(long)]
        dropoff: String,
    },
    /// Cancel a booking
    Cancel {
        #[arg(value_name = "BOOKING_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print the effective configuration
    Show,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("load config")?;
    config.override_api_url(cli.api_url.as_deref());
    init_tracing(&config);

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli, config).await })
}

/// Logs go to stderr; `RUST_LOG` wins over the configured level.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let Cli {
        command,
        api_url: _,
        json,
    } = cli;
    let output = commands::Output { json };
    // Built per command so `config` subcommands work with a broken api_url.
    let ctx = || commands::Context::new(&config, output);

    match command {
        Commands::Login { email, password } => {
            commands::auth::login(&ctx()?, &email, password).await
        }
        Commands::Signup {
            email,
            name,
            password,
        } => commands::auth::signup(&ctx()?, &email, name, password).await,
        Commands::Logout => commands::auth::logout(&ctx()?).await,
        Commands::Whoami => commands::auth::whoami(&ctx()?).await,

        Commands::Search(args) => commands::search::run(&ctx()?, args.into()).await,

        Commands::Cars { command } => match command {
            CarCommands::Show { id } => commands::cars::show(&ctx()?, &id).await,
            CarCommands::Create { file } => commands::cars::create(&ctx()?, &file).await,
            CarCommands::Update { id, file } => commands::cars::update(&ctx()?, &id, &file).await,
            CarCommands::Delete { id } => commands::cars::delete(&ctx()?, &id).await,
        },

        Commands::Bookings { command } => match command {
            BookingCommands::List => commands::bookings::list(&ctx()?).await,
            BookingCommands::Show { id } => commands::bookings::show(&ctx()?, &id).await,
            BookingCommands::Create {
                car_id,
                pickup,
                dropoff,
            } => commands::bookings::create(&ctx()?, &car_id, &pickup, &dropoff).await,
            BookingCommands::Cancel { id } => commands::bookings::cancel(&ctx()?, &id).await,
        },

        Commands::Health => commands::health::run(&ctx()?).await,

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Show => commands::config::show(&config),
        },
    }
}

impl From<SearchArgs> for SearchParams {
    fn from(args: SearchArgs) -> Self {
        Self {
            latitude: args.lat,
            longitude: args.lng,
            radius: args.radius,
            query: args.query,
            fuel_type: args.fuel,
            transmission: args.transmission,
            seats: args.seats,
            pickup_time: args.pickup,
            dropoff_time: args.dropoff,
            page: args.page,
            limit: args.limit,
        }
    }
}
