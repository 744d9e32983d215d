//! YAML configuration for the monitoring service.
//!
//! ```yaml
//! controller:
//!   bus_address: 5
//!   connection_type: tcp
//!   host: 10.0.0.40
//!   port: 4001
//! monitoring:
//!   poll_interval: 60
//!   log_file: pump_data.csv
//! alerts:
//!   current_threshold: 10.0
//! ```
//!
//! Serial connections take `connection_type: serial` with `serial_port`
//! and optional `baudrate`, `parity`, `bytesize`, and `stopbits`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use spce_client::{LinkTiming, SerialSettings, SerialTransport, TcpTransport, Transport};

use crate::error::{MonitorError, MonitorResult};

/// Top-level configuration file.
#[derive(Debug, Deserialize)]
pub struct MonitorConfig {
    pub controller: ControllerConfig,
    pub monitoring: MonitoringConfig,
    pub alerts: AlertConfig,
}

/// Connection settings for the controller.
#[derive(Debug, Deserialize)]
pub struct ControllerConfig {
    /// Bus address of the controller on the shared link.
    pub bus_address: u8,
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    /// Minimum spacing between commands in milliseconds.
    #[serde(default = "default_command_gap_ms")]
    pub command_gap_ms: u64,
    /// Response read timeout in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// Physical connection to the instrument.
#[derive(Debug, Deserialize)]
#[serde(tag = "connection_type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    Tcp {
        host: String,
        port: u16,
    },
    Serial {
        serial_port: String,
        #[serde(default = "default_baudrate")]
        baudrate: u32,
        #[serde(default = "default_parity")]
        parity: char,
        #[serde(default = "default_bytesize")]
        bytesize: u8,
        #[serde(default = "default_stopbits")]
        stopbits: u8,
    },
}

/// Poll loop settings.
#[derive(Debug, Deserialize)]
pub struct MonitoringConfig {
    /// Seconds between poll cycles.
    pub poll_interval: u64,
    /// CSV file the readings are appended to.
    pub log_file: PathBuf,
}

/// Alert thresholds.
#[derive(Debug, Deserialize)]
pub struct AlertConfig {
    /// Emission current threshold in microamperes.
    pub current_threshold: f64,
}

fn default_command_gap_ms() -> u64 {
    120
}

fn default_read_timeout_ms() -> u64 {
    2000
}

fn default_baudrate() -> u32 {
    115_200
}

fn default_parity() -> char {
    'N'
}

fn default_bytesize() -> u8 {
    8
}

fn default_stopbits() -> u8 {
    1
}

impl MonitorConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> MonitorResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(raw: &str) -> MonitorResult<Self> {
        let config: MonitorConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> MonitorResult<()> {
        if self.alerts.current_threshold <= 0.0 {
            return Err(MonitorError::Config(format!(
                "current_threshold must be positive, got {}",
                self.alerts.current_threshold
            )));
        }
        if self.monitoring.poll_interval == 0 {
            return Err(MonitorError::Config("poll_interval must be at least 1 second".into()));
        }
        if let ConnectionConfig::Serial { parity, bytesize, stopbits, .. } = &self.controller.connection {
            serial_parity(*parity)?;
            serial_data_bits(*bytesize)?;
            serial_stop_bits(*stopbits)?;
        }
        Ok(())
    }
}

impl ControllerConfig {
    /// Link timing derived from the configured milliseconds.
    pub fn timing(&self) -> LinkTiming {
        LinkTiming {
            command_gap: Duration::from_millis(self.command_gap_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    /// Build and connect the configured transport.
    pub fn open_transport(&self) -> MonitorResult<Box<dyn Transport>> {
        match &self.connection {
            ConnectionConfig::Tcp { host, port } => {
                let transport = TcpTransport::new(host.clone(), *port, self.timing());
                transport.connect()?;
                Ok(Box::new(transport))
            }
            ConnectionConfig::Serial { serial_port, baudrate, parity, bytesize, stopbits } => {
                let settings = SerialSettings {
                    baud_rate: *baudrate,
                    data_bits: serial_data_bits(*bytesize)?,
                    parity: serial_parity(*parity)?,
                    stop_bits: serial_stop_bits(*stopbits)?,
                };
                let transport = SerialTransport::new(serial_port.clone(), settings, self.timing());
                transport.connect()?;
                Ok(Box::new(transport))
            }
        }
    }
}

fn serial_parity(parity: char) -> MonitorResult<serialport::Parity> {
    match parity.to_ascii_uppercase() {
        'N' => Ok(serialport::Parity::None),
        'E' => Ok(serialport::Parity::Even),
        'O' => Ok(serialport::Parity::Odd),
        other => Err(MonitorError::Config(format!("unknown parity {other:?}, expected N, E, or O"))),
    }
}

fn serial_data_bits(bytesize: u8) -> MonitorResult<serialport::DataBits> {
    match bytesize {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        other => Err(MonitorError::Config(format!("unsupported bytesize {other}, expected 5-8"))),
    }
}

fn serial_stop_bits(stopbits: u8) -> MonitorResult<serialport::StopBits> {
    match stopbits {
        1 => Ok(serialport::StopBits::One),
        2 => Ok(serialport::StopBits::Two),
        other => Err(MonitorError::Config(format!("unsupported stopbits {other}, expected 1 or 2"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_config_round_trip() {
        let config = MonitorConfig::parse(
            r#"
controller:
  bus_address: 5
  connection_type: tcp
  host: 10.0.0.40
  port: 4001
monitoring:
  poll_interval: 60
  log_file: pump_data.csv
alerts:
  current_threshold: 10.0
"#,
        )
        .unwrap();

        assert_eq!(config.controller.bus_address, 5);
        assert!(matches!(
            config.controller.connection,
            ConnectionConfig::Tcp { ref host, port: 4001 } if host == "10.0.0.40"
        ));
        assert_eq!(config.controller.command_gap_ms, 120);
        assert_eq!(config.controller.timing().command_gap, Duration::from_millis(120));
        assert_eq!(config.monitoring.poll_interval, 60);
        assert_eq!(config.alerts.current_threshold, 10.0);
    }

    #[test]
    fn test_serial_config_applies_defaults() {
        let config = MonitorConfig::parse(
            r#"
controller:
  bus_address: 5
  connection_type: serial
  serial_port: /dev/ttyUSB0
monitoring:
  poll_interval: 30
  log_file: pump_data.csv
alerts:
  current_threshold: 5.0
"#,
        )
        .unwrap();

        match config.controller.connection {
            ConnectionConfig::Serial { ref serial_port, baudrate, parity, bytesize, stopbits } => {
                assert_eq!(serial_port, "/dev/ttyUSB0");
                assert_eq!(baudrate, 115_200);
                assert_eq!(parity, 'N');
                assert_eq!(bytesize, 8);
                assert_eq!(stopbits, 1);
            }
            ref other => panic!("expected serial connection, got {other:?}"),
        }
    }

    #[test]
    fn test_nonpositive_threshold_is_rejected() {
        let err = MonitorConfig::parse(
            r#"
controller:
  bus_address: 5
  connection_type: tcp
  host: localhost
  port: 4001
monitoring:
  poll_interval: 60
  log_file: pump_data.csv
alerts:
  current_threshold: 0.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[test]
    fn test_bad_parity_is_rejected() {
        let err = MonitorConfig::parse(
            r#"
controller:
  bus_address: 5
  connection_type: serial
  serial_port: /dev/ttyUSB0
  parity: X
monitoring:
  poll_interval: 60
  log_file: pump_data.csv
alerts:
  current_threshold: 10.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }
}
