use std::net::TcpListener;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use spce_client::{SpceController, TcpTransport, Transport};
use spce_monitor::{
    spawn_poll_loop, AlertBroadcaster, MonitorConfig, MonitorError, MonitorResult, PollSettings,
    ReadingLog,
};
use spce_sim::SimulatedPump;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Monitor an SPCe ion pump controller: poll readings, log them to CSV,
/// and raise alerts when the emission current crosses the threshold.
#[derive(Parser, Debug)]
#[command(name = "spce-monitor", version, about)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Run against an in-process instrument simulator instead of the
    /// configured connection.
    #[arg(long)]
    simulate: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "monitor failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> MonitorResult<()> {
    let config = MonitorConfig::load(&args.config)?;

    let transport: Box<dyn Transport> = if args.simulate {
        simulated_transport(&config)?
    } else {
        config.controller.open_transport()?
    };
    let controller = Arc::new(SpceController::new(config.controller.bus_address, transport));

    if let Some(model) = controller.read_model()? {
        info!(model, "connected to controller");
    }

    let log = ReadingLog::open(&config.monitoring.log_file)?;
    let alerts = Arc::new(AlertBroadcaster::new());
    let events = alerts.subscribe();

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .map_err(|e| MonitorError::Signal(e.to_string()))?;
    }

    let settings = PollSettings {
        interval: Duration::from_secs(config.monitoring.poll_interval),
        current_threshold_ua: config.alerts.current_threshold,
    };
    let poll = spawn_poll_loop(
        controller,
        settings,
        log,
        Arc::clone(&alerts),
        Arc::clone(&shutdown),
    );

    // Console alert sink; further subscribers would attach the same way.
    while !shutdown.load(Ordering::Relaxed) {
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => println!("{event}"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("shutting down");
    if poll.join().is_err() {
        warn!("poll thread panicked");
    }
    Ok(())
}

/// Spin up the simulator on a loopback socket and connect to it.
fn simulated_transport(config: &MonitorConfig) -> MonitorResult<Box<dyn Transport>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let pump = SimulatedPump::new(config.controller.bus_address);
    thread::spawn(move || spce_sim::serve(listener, pump));
    info!(port, "started in-process simulator");

    let transport = TcpTransport::new("127.0.0.1", port, config.controller.timing());
    transport.connect()?;
    Ok(Box::new(transport))
}
