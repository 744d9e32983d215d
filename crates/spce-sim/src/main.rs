use std::net::TcpListener;
use std::process::ExitCode;

use clap::Parser;
use spce_sim::{serve, SimulatedPump};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Simulated SPCe ion pump controller behind a TCP serial bridge.
#[derive(Parser, Debug)]
#[command(name = "spce-sim", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:4001")]
    bind: String,

    /// Bus address the simulated pump answers on.
    #[arg(long, default_value_t = 5)]
    bus_address: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let listener = match TcpListener::bind(&args.bind) {
        Ok(listener) => listener,
        Err(e) => {
            error!(bind = args.bind.as_str(), error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    let pump = SimulatedPump::new(args.bus_address);
    if let Err(e) = serve(listener, pump) {
        error!(error = %e, "simulator stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
