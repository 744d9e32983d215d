//! Typed command surface over a transport.
//!
//! `SpceController` is the single entry point for talking to the
//! instrument: every operation validates its argument, encodes a
//! request frame, runs one atomic exchange, verifies the response frame
//! (bus address, checksum, `ER` status), and extracts the value kind
//! the command catalog declares for it.

use spce_protocol::{extract, Command, ResponseFrame, ResponseStatus, Value};

use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;

/// Client for one SPCe controller on the shared link.
pub struct SpceController {
    bus_address: u8,
    transport: Box<dyn Transport>,
}

impl SpceController {
    /// Create a controller client addressing `bus_address` over the
    /// given transport.
    pub fn new(bus_address: u8, transport: Box<dyn Transport>) -> Self {
        SpceController { bus_address, transport }
    }

    /// The configured bus address.
    pub fn bus_address(&self) -> u8 {
        self.bus_address
    }

    /// Execute one command end to end.
    ///
    /// Argument validation happens before any frame is built, so an
    /// invalid argument causes no I/O. Commands without a response
    /// resolve to [`Value::Absent`].
    pub fn execute(&self, command: &Command) -> ClientResult<Value> {
        let frame = command.encode(self.bus_address)?;
        let raw = self.transport.exchange(&frame, command.expects_response())?;
        let Some(raw) = raw else {
            return Ok(Value::Absent);
        };
        let response = ResponseFrame::parse(&raw, self.bus_address)?;
        match response.status {
            ResponseStatus::Error(code) => Err(ClientError::Instrument { code }),
            ResponseStatus::Ok => Ok(extract(&response.payload, command.response_kind())),
        }
    }

    // ========== Identity ==========

    /// Read the controller model string.
    pub fn read_model(&self) -> ClientResult<Option<String>> {
        self.text(&Command::ReadModel)
    }

    /// Read the firmware version.
    pub fn read_version(&self) -> ClientResult<Option<String>> {
        self.text(&Command::ReadVersion)
    }

    /// Reset the controller. No response is read.
    pub fn reset(&self) -> ClientResult<()> {
        self.execute(&Command::Reset).map(|_| ())
    }

    // ========== Readings ==========

    /// Read the emission current in amperes.
    pub fn read_current(&self) -> ClientResult<Option<f64>> {
        self.float(&Command::ReadCurrent)
    }

    /// Read the pressure in the configured units.
    pub fn read_pressure(&self) -> ClientResult<Option<f64>> {
        self.float(&Command::ReadPressure)
    }

    /// Read the high-voltage supply voltage in volts.
    pub fn read_voltage(&self) -> ClientResult<Option<f64>> {
        self.float(&Command::ReadVoltage)
    }

    /// Read the pump run status.
    pub fn pump_status(&self) -> ClientResult<Option<String>> {
        self.text(&Command::GetPumpStatus)
    }

    // ========== Pump configuration ==========

    /// Set the pressure display units (`T`, `M`, or `P`,
    /// case-insensitive).
    pub fn set_pressure_units(&self, units: char) -> ClientResult<Option<String>> {
        self.text(&Command::SetPressureUnits { units })
    }

    /// Get the configured pump size in liters per second.
    pub fn get_pump_size(&self) -> ClientResult<Option<i64>> {
        self.integer(&Command::GetPumpSize)
    }

    /// Set the pump size in liters per second (0-9999).
    pub fn set_pump_size(&self, size: i64) -> ClientResult<Option<String>> {
        self.text(&Command::SetPumpSize { size })
    }

    /// Get the pressure calibration factor.
    pub fn get_cal_factor(&self) -> ClientResult<Option<f64>> {
        self.float(&Command::GetCalFactor)
    }

    /// Set the pressure calibration factor (0.00-9.99).
    pub fn set_cal_factor(&self, factor: f64) -> ClientResult<Option<String>> {
        self.text(&Command::SetCalFactor { factor })
    }

    /// Enable or disable arc detection.
    pub fn set_arc_detect(&self, enable: bool) -> ClientResult<Option<String>> {
        self.text(&Command::SetArcDetect { enable })
    }

    /// Get the arc detection setting.
    pub fn get_arc_detect(&self) -> ClientResult<Option<String>> {
        self.text(&Command::GetArcDetect)
    }

    /// Enable or disable automatic restart after a power loss.
    pub fn set_auto_restart(&self, enable: bool) -> ClientResult<Option<String>> {
        self.text(&Command::SetAutoRestart { enable })
    }

    /// Get the auto-restart setting.
    pub fn get_auto_restart(&self) -> ClientResult<Option<String>> {
        self.text(&Command::GetAutoRestart)
    }

    // ========== Pump control ==========

    /// Start the pump.
    pub fn start_pump(&self) -> ClientResult<Option<String>> {
        self.text(&Command::StartPump)
    }

    /// Stop the pump.
    pub fn stop_pump(&self) -> ClientResult<Option<String>> {
        self.text(&Command::StopPump)
    }

    /// Lock or unlock the front-panel keypad.
    pub fn lock_keypad(&self, lock: bool) -> ClientResult<Option<String>> {
        let command = if lock { Command::LockKeypad } else { Command::UnlockKeypad };
        self.text(&command)
    }

    // ========== Analog / HV ==========

    /// Get the analog output mode.
    pub fn get_analog_mode(&self) -> ClientResult<Option<i64>> {
        self.integer(&Command::GetAnalogMode)
    }

    /// Set the analog output mode (0-6 or 8-10).
    pub fn set_analog_mode(&self, mode: i64) -> ClientResult<Option<String>> {
        self.text(&Command::SetAnalogMode { mode })
    }

    /// Query whether high voltage is on.
    pub fn high_voltage_on(&self) -> ClientResult<Option<String>> {
        self.text(&Command::HighVoltageOn)
    }

    /// Set the high-voltage auto-recovery mode (0-2).
    pub fn set_hv_auto_recovery(&self, mode: i64) -> ClientResult<Option<String>> {
        self.text(&Command::SetHvAutoRecovery { mode })
    }

    /// Get the high-voltage auto-recovery mode.
    pub fn get_hv_auto_recovery(&self) -> ClientResult<Option<i64>> {
        self.integer(&Command::GetHvAutoRecovery)
    }

    // ========== Communication ==========

    /// Set the communication mode (0-2).
    pub fn set_comm_mode(&self, mode: i64) -> ClientResult<Option<String>> {
        self.text(&Command::SetCommMode { mode })
    }

    /// Get the communication mode.
    pub fn get_comm_mode(&self) -> ClientResult<Option<i64>> {
        self.integer(&Command::GetCommMode)
    }

    /// Select the communication interface (0-5).
    pub fn set_comm_interface(&self, interface: i64) -> ClientResult<Option<String>> {
        self.text(&Command::SetCommInterface { interface })
    }

    fn float(&self, command: &Command) -> ClientResult<Option<f64>> {
        self.execute(command).map(|v| v.as_float())
    }

    fn integer(&self, command: &Command) -> ClientResult<Option<i64>> {
        self.execute(command).map(|v| v.as_integer())
    }

    fn text(&self, command: &Command) -> ClientResult<Option<String>> {
        self.execute(command).map(|v| v.as_text().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{LinkTiming, SimulatedTransport};
    use spce_protocol::encode_response;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_timing() -> LinkTiming {
        LinkTiming {
            command_gap: Duration::from_millis(1),
            read_timeout: Duration::from_millis(50),
        }
    }

    fn controller_with_payload(bus: u8, payload: &str) -> SpceController {
        let payload = payload.to_string();
        let transport = SimulatedTransport::with_responder(fast_timing(), move |_| {
            Some(encode_response(bus, &payload))
        });
        SpceController::new(bus, Box::new(transport))
    }

    #[test]
    fn test_read_voltage_extracts_float() {
        let controller = controller_with_payload(0x05, "7000.00");
        assert_eq!(controller.read_voltage().unwrap(), Some(7000.0));
    }

    #[test]
    fn test_pump_status_extracts_key_value() {
        let controller = controller_with_payload(0x05, "STATUS=RUNNING");
        assert_eq!(controller.pump_status().unwrap().as_deref(), Some("RUNNING"));
    }

    #[test]
    fn test_unparseable_reading_is_absent_not_zero() {
        let controller = controller_with_payload(0x05, "NO READING");
        assert_eq!(controller.read_current().unwrap(), None);
    }

    #[test]
    fn test_invalid_argument_causes_no_io() {
        let exchanges = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&exchanges);
        let transport = SimulatedTransport::with_responder(fast_timing(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(encode_response(0x05, ""))
        });
        let controller = SpceController::new(0x05, Box::new(transport));

        assert!(controller.set_pump_size(10000).is_err());
        assert!(controller.set_cal_factor(9.995).is_err());
        assert_eq!(exchanges.load(Ordering::SeqCst), 0);

        assert!(controller.set_pump_size(5000).is_ok());
        assert_eq!(exchanges.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_er_response_surfaces_instrument_error() {
        let transport = SimulatedTransport::with_responder(fast_timing(), |_| {
            Some(spce_protocol::encode_error_response(0x05, 0x03))
        });
        let controller = SpceController::new(0x05, Box::new(transport));
        let err = controller.read_current().unwrap_err();
        assert!(matches!(err, ClientError::Instrument { code: 0x03 }));
    }

    #[test]
    fn test_response_from_wrong_bus_is_rejected() {
        let controller = {
            let transport = SimulatedTransport::with_responder(fast_timing(), |_| {
                Some(encode_response(0x06, "1000"))
            });
            SpceController::new(0x05, Box::new(transport))
        };
        assert!(controller.get_pump_size().is_err());
    }

    #[test]
    fn test_reset_expects_no_response() {
        let transport = SimulatedTransport::with_responder(fast_timing(), |_| {
            panic!("reset must not wait for a response");
        });
        let controller = SpceController::new(0x05, Box::new(transport));
        controller.reset().unwrap();
    }
}
