//! kvpipe CLI Client
//!
//! Command-line interface for issuing single commands.

use std::time::Duration;

use clap::{Parser, Subcommand};
use kvpipe::{commands, ClientOptions, Connection, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// kvpipe CLI
#[derive(Parser, Debug)]
#[command(name = "kvpipe-cli")]
#[command(about = "CLI for a kvpipe server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Seconds to wait for a reply
    #[arg(short, long, default_value = "5")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Increment an integer value
    Incr {
        /// The key to increment
        key: String,
    },

    /// Ping the server
    Ping,
}

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info,kvpipe=debug";

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<String> {
    let options = ClientOptions::builder()
        .default_timeout(Duration::from_secs(args.timeout))
        .build();
    let connection = Connection::connect(&args.server, options)?;

    let output = match args.command {
        Commands::Get { key } => connection
            .execute(commands::get(key))?
            .unwrap_or_else(|| "(nil)".to_string()),
        Commands::Set { key, value } => connection.execute(commands::set(key, value))?,
        Commands::Del { key } => connection.execute(commands::del(key))?.to_string(),
        Commands::Incr { key } => connection.execute(commands::incr(key))?.to_string(),
        Commands::Ping => connection.execute(commands::ping())?,
    };

    connection.close();
    Ok(output)
}
