//! kvpipe Server Binary
//!
//! Runs the in-memory test server so the CLI has something to talk to.

use clap::Parser;
use kvpipe::testkit::TestServer;
use tracing_subscriber::{fmt, EnvFilter};

/// kvpipe test server
#[derive(Parser, Debug)]
#[command(name = "kvpipe-server")]
#[command(about = "In-memory server speaking the kvpipe wire protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvpipe=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("kvpipe server v{}", kvpipe::VERSION);

    let server = match TestServer::bind(&args.listen) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {}", server.addr());
    server.wait();
    tracing::info!("Server stopped");
}
