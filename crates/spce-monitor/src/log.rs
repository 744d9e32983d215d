//! CSV reading log.
//!
//! One row per poll cycle, append-only, with a fixed header so the file
//! loads directly into any CSV tool:
//!
//! ```text
//! timestamp,voltage_V,current_uA,pressure_mbar
//! 2026-08-29T14:05:00.123+02:00,7000.00,15.00,1.50e-6
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

const HEADER: &str = "timestamp,voltage_V,current_uA,pressure_mbar";

/// One polled snapshot of the controller.
#[derive(Debug, Clone)]
pub struct Reading {
    /// Local wall-clock time of the poll.
    pub timestamp: DateTime<Local>,
    /// High-voltage supply voltage in volts.
    pub voltage_v: f64,
    /// Emission current in microamperes.
    pub current_ua: f64,
    /// Pressure in millibar.
    pub pressure_mbar: f64,
}

/// Append-only CSV log of readings.
pub struct ReadingLog {
    path: PathBuf,
}

impl ReadingLog {
    /// Open the log at `path`, writing the header if the file is new or
    /// empty.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let needs_header = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if needs_header {
            let mut file = File::create(&path)?;
            writeln!(file, "{HEADER}")?;
        }
        Ok(ReadingLog { path })
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one reading.
    pub fn append(&self, reading: &Reading) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(
            file,
            "{},{:.2},{:.2},{:.2e}",
            reading.timestamp.to_rfc3339(),
            reading.voltage_v,
            reading.current_ua,
            reading.pressure_mbar
        )
    }

    /// Return the last `n` readings, oldest first. Malformed rows are
    /// skipped.
    pub fn tail(&self, n: usize) -> io::Result<Vec<Reading>> {
        let file = BufReader::new(File::open(&self.path)?);
        let mut readings = Vec::new();
        for line in file.lines() {
            let line = line?;
            if line == HEADER || line.trim().is_empty() {
                continue;
            }
            if let Some(reading) = parse_row(&line) {
                readings.push(reading);
            }
        }
        let skip = readings.len().saturating_sub(n);
        Ok(readings.split_off(skip))
    }
}

fn parse_row(line: &str) -> Option<Reading> {
    let mut fields = line.split(',');
    let timestamp = DateTime::parse_from_rfc3339(fields.next()?).ok()?.with_timezone(&Local);
    let voltage_v = fields.next()?.parse().ok()?;
    let current_ua = fields.next()?.parse().ok()?;
    let pressure_mbar = fields.next()?.parse().ok()?;
    Some(Reading { timestamp, voltage_v, current_ua, pressure_mbar })
}
