//! Background poll loop.
//!
//! One thread owns the whole cycle: read the three values, append them
//! to the CSV log, and fold the current into the alert state machine.
//! That thread is the only writer of alert state; events go out through
//! the broadcaster. A failed cycle is logged and the loop moves on to
//! the next interval without backoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Local;
use spce_client::SpceController;
use tracing::{info, warn};

use crate::alert::AlertMonitor;
use crate::broadcast::AlertBroadcaster;
use crate::error::{MonitorError, MonitorResult};
use crate::log::{Reading, ReadingLog};

/// Settings for the poll loop.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Time between poll cycles.
    pub interval: Duration,
    /// Emission current alert threshold in microamperes.
    pub current_threshold_ua: f64,
}

/// Spawn the poll loop on a background thread.
///
/// The loop runs until `shutdown` is set; the returned handle joins
/// once the in-flight cycle finishes.
pub fn spawn_poll_loop(
    controller: Arc<SpceController>,
    settings: PollSettings,
    log: ReadingLog,
    alerts: Arc<AlertBroadcaster>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut monitor = AlertMonitor::new();
        info!(
            interval_secs = settings.interval.as_secs(),
            threshold_ua = settings.current_threshold_ua,
            "poll loop started"
        );
        while !shutdown.load(Ordering::Relaxed) {
            if let Err(e) = poll_once(&controller, &settings, &log, &alerts, &mut monitor) {
                warn!(error = %e, "poll cycle failed");
            }
            sleep_interruptible(settings.interval, &shutdown);
        }
        info!("poll loop stopped");
    })
}

/// One poll cycle: read, log, evaluate.
fn poll_once(
    controller: &SpceController,
    settings: &PollSettings,
    log: &ReadingLog,
    alerts: &AlertBroadcaster,
    monitor: &mut AlertMonitor,
) -> MonitorResult<()> {
    let voltage_v = controller.read_voltage()?;
    let current_a = controller.read_current()?;
    let pressure_mbar = controller.read_pressure()?;

    let (Some(voltage_v), Some(current_a), Some(pressure_mbar)) =
        (voltage_v, current_a, pressure_mbar)
    else {
        return Err(MonitorError::IncompleteReading);
    };

    let reading = Reading {
        timestamp: Local::now(),
        voltage_v,
        // The instrument reports amperes; the log and thresholds use
        // microamperes.
        current_ua: current_a * 1e6,
        pressure_mbar,
    };
    log.append(&reading)?;
    info!(
        voltage_v = reading.voltage_v,
        current_ua = reading.current_ua,
        pressure_mbar = reading.pressure_mbar,
        "logged reading"
    );

    if let Some(event) = monitor.evaluate(reading.current_ua, settings.current_threshold_ua) {
        info!(level = monitor.level(), "alert level changed");
        alerts.publish(&event);
    }
    Ok(())
}

/// Sleep for `interval` in short slices so a shutdown request takes
/// effect promptly.
fn sleep_interruptible(interval: Duration, shutdown: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = interval;
    while !remaining.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let step = remaining.min(SLICE);
        thread::sleep(step);
        remaining -= step;
    }
}
