//! Device model for a simulated SPCe controller.

use rand::Rng;
use spce_protocol::{
    encode_error_response, encode_response, extract_int, CommandCode, PressureUnits, RequestFrame,
};
use tracing::{debug, warn};

/// Error code for a malformed request frame.
const ERR_BAD_FRAME: u8 = 0x01;
/// Error code for a request addressed to a different bus address.
const ERR_BAD_ADDRESS: u8 = 0x02;
/// Error code for an unknown or unsupported command.
const ERR_BAD_COMMAND: u8 = 0x03;

/// A simulated SPCe ion pump controller.
///
/// Holds the controller state and answers raw request frames the way
/// the instrument does: a success response mirroring the requested
/// value, or an `ER` frame when the request is malformed, addressed to
/// another bus address, or names a command the device does not handle.
///
/// Readings jitter between calls by default so polling callers see a
/// live-looking signal; [`with_fixed_readings`](Self::with_fixed_readings)
/// pins them for deterministic tests.
pub struct SimulatedPump {
    bus_address: u8,
    model: String,
    version: String,
    pump_size: i64,
    units: PressureUnits,
    running: bool,
    voltage: f64,
    current: f64,
    pressure: f64,
    jitter: bool,
}

impl SimulatedPump {
    /// Create a pump with the default state of the reference device:
    /// running, 7 kV, 15 uA, 1.5e-6 mbar.
    pub fn new(bus_address: u8) -> Self {
        SimulatedPump {
            bus_address,
            model: "SPCe-1000".to_string(),
            version: "2.10".to_string(),
            pump_size: 1000,
            units: PressureUnits::Millibar,
            running: true,
            voltage: 7000.0,
            current: 15e-6,
            pressure: 1.5e-6,
            jitter: true,
        }
    }

    /// Pin the readings to fixed values and disable jitter.
    pub fn with_fixed_readings(mut self, voltage: f64, current: f64, pressure: f64) -> Self {
        self.voltage = voltage;
        self.current = current;
        self.pressure = pressure;
        self.jitter = false;
        self
    }

    /// The bus address this pump answers on.
    pub fn bus_address(&self) -> u8 {
        self.bus_address
    }

    /// Whether the pump is currently running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The configured pump size in liters per second.
    pub fn pump_size(&self) -> i64 {
        self.pump_size
    }

    /// The configured pressure display units.
    pub fn units(&self) -> PressureUnits {
        self.units
    }

    /// Answer one raw request frame.
    ///
    /// Returns `None` only for a reset, which the instrument does not
    /// answer; every other request gets a response frame.
    pub fn handle_request(&mut self, raw: &str) -> Option<String> {
        let request = match RequestFrame::parse(raw) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "rejecting malformed request");
                return Some(encode_error_response(self.bus_address, ERR_BAD_FRAME));
            }
        };

        if request.bus_address != self.bus_address {
            warn!(
                expected = self.bus_address,
                got = request.bus_address,
                "bus address mismatch"
            );
            return Some(encode_error_response(self.bus_address, ERR_BAD_ADDRESS));
        }

        let Some(code) = CommandCode::from_byte(request.code) else {
            warn!(code = request.code, "unknown command code");
            return Some(encode_error_response(self.bus_address, ERR_BAD_COMMAND));
        };

        debug!(?code, data = request.data.as_deref(), "handling command");
        self.refresh_readings();

        let payload = match code {
            CommandCode::ReadModel => format!("MODEL={}", self.model),
            CommandCode::ReadVersion => format!("VERSION={}", self.version),
            CommandCode::Reset => return None,
            CommandCode::ReadVoltage => format!("{:.2}", self.voltage),
            CommandCode::ReadCurrent => format!("{:.2e}", self.current),
            CommandCode::ReadPressure => format!("{:.2e}", self.pressure),
            CommandCode::GetPumpStatus => {
                let status = if self.running { "RUNNING" } else { "STOPPED" };
                format!("STATUS={status}")
            }
            CommandCode::GetPumpSize => format!("{:04}", self.pump_size),
            CommandCode::SetPumpSize => {
                match request.data.as_deref().and_then(extract_int) {
                    Some(size) if (0..=9999).contains(&size) => {
                        self.pump_size = size;
                        format!("{:04}", self.pump_size)
                    }
                    _ => return Some(encode_error_response(self.bus_address, ERR_BAD_COMMAND)),
                }
            }
            CommandCode::SetPressureUnits => {
                let units = request
                    .data
                    .as_deref()
                    .and_then(|d| d.trim().chars().next())
                    .and_then(PressureUnits::from_char);
                match units {
                    Some(units) => {
                        self.units = units;
                        units.as_char().to_string()
                    }
                    None => return Some(encode_error_response(self.bus_address, ERR_BAD_COMMAND)),
                }
            }
            CommandCode::StartPump => {
                self.running = true;
                "STATUS=RUNNING".to_string()
            }
            CommandCode::StopPump => {
                self.running = false;
                "STATUS=STOPPED".to_string()
            }
            _ => {
                warn!(?code, "unsupported command code");
                return Some(encode_error_response(self.bus_address, ERR_BAD_COMMAND));
            }
        };

        Some(encode_response(self.bus_address, &payload))
    }

    /// Wander the readings the way the reference device does: voltage
    /// pinned, current uniform in 10-20 uA, pressure tracking current.
    fn refresh_readings(&mut self) {
        if !self.jitter {
            return;
        }
        let mut rng = rand::thread_rng();
        self.current = rng.gen_range(10e-6..20e-6);
        self.pressure = self.current * 1e-1 * rng.gen_range(0.8..1.2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spce_protocol::{encode_request, Command, ResponseFrame, ResponseStatus};

    fn exchange(pump: &mut SimulatedPump, command: &Command) -> ResponseFrame {
        let raw = command.encode(pump.bus_address()).unwrap();
        let response = pump.handle_request(&raw).unwrap();
        ResponseFrame::parse(&response, pump.bus_address()).unwrap()
    }

    #[test]
    fn test_responses_checksum_verify() {
        let mut pump = SimulatedPump::new(0x05);
        for command in [
            Command::ReadModel,
            Command::ReadVersion,
            Command::ReadCurrent,
            Command::ReadPressure,
            Command::ReadVoltage,
            Command::GetPumpStatus,
            Command::GetPumpSize,
        ] {
            let frame = exchange(&mut pump, &command);
            assert_eq!(frame.status, ResponseStatus::Ok, "{command:?}");
        }
    }

    #[test]
    fn test_identity_payloads() {
        let mut pump = SimulatedPump::new(0x05);
        assert_eq!(exchange(&mut pump, &Command::ReadModel).payload, "MODEL=SPCe-1000");
        assert_eq!(exchange(&mut pump, &Command::ReadVersion).payload, "VERSION=2.10");
    }

    #[test]
    fn test_fixed_readings_are_stable() {
        let mut pump = SimulatedPump::new(0x05).with_fixed_readings(7000.0, 25e-6, 2.5e-6);
        assert_eq!(exchange(&mut pump, &Command::ReadVoltage).payload, "7000.00");
        assert_eq!(exchange(&mut pump, &Command::ReadCurrent).payload, "2.50e-5");
        assert_eq!(exchange(&mut pump, &Command::ReadPressure).payload, "2.50e-6");
    }

    #[test]
    fn test_jittered_current_stays_in_range() {
        let mut pump = SimulatedPump::new(0x05);
        for _ in 0..20 {
            let payload = exchange(&mut pump, &Command::ReadCurrent).payload;
            let current: f64 = payload.parse().unwrap();
            assert!((10e-6..=20e-6).contains(&current), "{payload}");
        }
    }

    #[test]
    fn test_start_stop_round_trip() {
        let mut pump = SimulatedPump::new(0x05);
        assert_eq!(exchange(&mut pump, &Command::StopPump).payload, "STATUS=STOPPED");
        assert!(!pump.is_running());
        assert_eq!(exchange(&mut pump, &Command::GetPumpStatus).payload, "STATUS=STOPPED");
        assert_eq!(exchange(&mut pump, &Command::StartPump).payload, "STATUS=RUNNING");
        assert!(pump.is_running());
    }

    #[test]
    fn test_set_pump_size_persists() {
        let mut pump = SimulatedPump::new(0x05);
        assert_eq!(exchange(&mut pump, &Command::SetPumpSize { size: 75 }).payload, "0075");
        assert_eq!(pump.pump_size(), 75);
        assert_eq!(exchange(&mut pump, &Command::GetPumpSize).payload, "0075");
    }

    #[test]
    fn test_set_pressure_units_persists() {
        let mut pump = SimulatedPump::new(0x05);
        assert_eq!(
            exchange(&mut pump, &Command::SetPressureUnits { units: 't' }).payload,
            "T"
        );
        assert_eq!(pump.units(), PressureUnits::Torr);
    }

    #[test]
    fn test_malformed_frame_gets_error_01() {
        let mut pump = SimulatedPump::new(0x05);
        let response = pump.handle_request("garbage\r").unwrap();
        let frame = ResponseFrame::parse(&response, 0x05).unwrap();
        assert_eq!(frame.status, ResponseStatus::Error(0x01));
    }

    #[test]
    fn test_wrong_bus_address_gets_error_02() {
        let mut pump = SimulatedPump::new(0x05);
        let raw = encode_request(0x06, 0x0A, None);
        let response = pump.handle_request(&raw).unwrap();
        let frame = ResponseFrame::parse(&response, 0x05).unwrap();
        assert_eq!(frame.status, ResponseStatus::Error(0x02));
    }

    #[test]
    fn test_unknown_command_gets_error_03() {
        let mut pump = SimulatedPump::new(0x05);
        let raw = encode_request(0x05, 0xAB, None);
        let response = pump.handle_request(&raw).unwrap();
        let frame = ResponseFrame::parse(&response, 0x05).unwrap();
        assert_eq!(frame.status, ResponseStatus::Error(0x03));
    }

    #[test]
    fn test_reset_is_not_answered() {
        let mut pump = SimulatedPump::new(0x05);
        let raw = Command::Reset.encode(0x05).unwrap();
        assert!(pump.handle_request(&raw).is_none());
    }
}
