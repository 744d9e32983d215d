//! Command catalog for the SPCe controller.
//!
//! Each supported instrument operation has one `Command` variant. A
//! variant knows its wire code, how to validate and format its argument,
//! whether the instrument answers it, and what kind of value to extract
//! from the answer. Validation always happens before a frame is built,
//! so an out-of-range argument never causes any I/O.

use crate::error::{ProtocolError, ProtocolResult};
use crate::extract::ValueKind;
use crate::frame;

/// Wire command codes understood by the SPCe controller.
///
/// Values are taken from the controller's command reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    ReadModel = 0x01,
    ReadVersion = 0x02,
    Reset = 0x07,
    ReadCurrent = 0x0A,
    ReadPressure = 0x0B,
    ReadVoltage = 0x0C,
    GetPumpStatus = 0x0D,
    SetPressureUnits = 0x0E,
    GetPumpSize = 0x11,
    SetPumpSize = 0x12,
    GetCalFactor = 0x1D,
    SetCalFactor = 0x1E,
    SetAutoRestart = 0x33,
    GetAutoRestart = 0x34,
    StartPump = 0x37,
    StopPump = 0x38,
    LockKeypad = 0x44,
    UnlockKeypad = 0x45,
    SetCommInterface = 0x4B,
    GetAnalogMode = 0x50,
    SetAnalogMode = 0x51,
    HighVoltageOn = 0x61,
    SetHvAutoRecovery = 0x68,
    GetHvAutoRecovery = 0x69,
    SetArcDetect = 0x91,
    GetArcDetect = 0x92,
    SetCommMode = 0xD3,
    GetCommMode = 0xD4,
}

impl CommandCode {
    /// Get the wire byte for this command code.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Look up a command code from its wire byte.
    pub fn from_byte(byte: u8) -> Option<CommandCode> {
        match byte {
            0x01 => Some(CommandCode::ReadModel),
            0x02 => Some(CommandCode::ReadVersion),
            0x07 => Some(CommandCode::Reset),
            0x0A => Some(CommandCode::ReadCurrent),
            0x0B => Some(CommandCode::ReadPressure),
            0x0C => Some(CommandCode::ReadVoltage),
            0x0D => Some(CommandCode::GetPumpStatus),
            0x0E => Some(CommandCode::SetPressureUnits),
            0x11 => Some(CommandCode::GetPumpSize),
            0x12 => Some(CommandCode::SetPumpSize),
            0x1D => Some(CommandCode::GetCalFactor),
            0x1E => Some(CommandCode::SetCalFactor),
            0x33 => Some(CommandCode::SetAutoRestart),
            0x34 => Some(CommandCode::GetAutoRestart),
            0x37 => Some(CommandCode::StartPump),
            0x38 => Some(CommandCode::StopPump),
            0x44 => Some(CommandCode::LockKeypad),
            0x45 => Some(CommandCode::UnlockKeypad),
            0x4B => Some(CommandCode::SetCommInterface),
            0x50 => Some(CommandCode::GetAnalogMode),
            0x51 => Some(CommandCode::SetAnalogMode),
            0x61 => Some(CommandCode::HighVoltageOn),
            0x68 => Some(CommandCode::SetHvAutoRecovery),
            0x69 => Some(CommandCode::GetHvAutoRecovery),
            0x91 => Some(CommandCode::SetArcDetect),
            0x92 => Some(CommandCode::GetArcDetect),
            0xD3 => Some(CommandCode::SetCommMode),
            0xD4 => Some(CommandCode::GetCommMode),
            _ => None,
        }
    }
}

/// Pressure display units supported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureUnits {
    /// `T`
    Torr,
    /// `M`
    Millibar,
    /// `P`
    Pascal,
}

impl PressureUnits {
    /// The unit letter sent on the wire.
    pub fn as_char(self) -> char {
        match self {
            PressureUnits::Torr => 'T',
            PressureUnits::Millibar => 'M',
            PressureUnits::Pascal => 'P',
        }
    }

    /// Parse a unit letter, case-insensitively.
    pub fn from_char(c: char) -> Option<PressureUnits> {
        match c.to_ascii_uppercase() {
            'T' => Some(PressureUnits::Torr),
            'M' => Some(PressureUnits::Millibar),
            'P' => Some(PressureUnits::Pascal),
            _ => None,
        }
    }
}

/// Commands that can be sent to the SPCe controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ========== Identity ==========
    /// Read the controller model string.
    ReadModel,

    /// Read the firmware version.
    ReadVersion,

    /// Reset the controller. The only command the instrument does not
    /// answer.
    Reset,

    // ========== Readings ==========
    /// Read the emission current in amperes.
    ReadCurrent,

    /// Read the pressure in the configured units.
    ReadPressure,

    /// Read the high-voltage supply voltage in volts.
    ReadVoltage,

    /// Read the pump run status.
    GetPumpStatus,

    // ========== Pump configuration ==========
    /// Set the pressure display units.
    SetPressureUnits {
        /// Unit letter: `T`, `M`, or `P`, case-insensitive.
        units: char,
    },

    /// Get the configured pump size in liters per second.
    GetPumpSize,

    /// Set the pump size in liters per second (0-9999).
    SetPumpSize {
        /// Pump size, formatted as four zero-padded digits.
        size: i64,
    },

    /// Get the pressure calibration factor.
    GetCalFactor,

    /// Set the pressure calibration factor (0.00-9.99).
    SetCalFactor {
        /// Calibration factor, formatted with two decimal places.
        factor: f64,
    },

    /// Enable or disable arc detection.
    SetArcDetect {
        /// `YES` when true, `NO` when false.
        enable: bool,
    },

    /// Get the arc detection setting.
    GetArcDetect,

    /// Enable or disable automatic pump restart after a power loss.
    SetAutoRestart {
        /// `YES` when true, `NO` when false.
        enable: bool,
    },

    /// Get the auto-restart setting.
    GetAutoRestart,

    // ========== Pump control ==========
    /// Start the pump.
    StartPump,

    /// Stop the pump.
    StopPump,

    /// Lock the front-panel keypad.
    LockKeypad,

    /// Unlock the front-panel keypad.
    UnlockKeypad,

    // ========== Analog / HV ==========
    /// Get the analog output mode.
    GetAnalogMode,

    /// Set the analog output mode (0-6 or 8-10; 7 is reserved).
    SetAnalogMode {
        /// Analog mode index.
        mode: i64,
    },

    /// Query whether high voltage is on.
    HighVoltageOn,

    /// Set the high-voltage auto-recovery mode (0-2).
    SetHvAutoRecovery {
        /// Auto-recovery mode.
        mode: i64,
    },

    /// Get the high-voltage auto-recovery mode.
    GetHvAutoRecovery,

    // ========== Communication ==========
    /// Set the communication mode (0-2).
    SetCommMode {
        /// Communication mode.
        mode: i64,
    },

    /// Get the communication mode.
    GetCommMode,

    /// Select the communication interface (0-5).
    SetCommInterface {
        /// Interface index.
        interface: i64,
    },
}

impl Command {
    /// Get the wire code for this command.
    pub fn code(&self) -> CommandCode {
        match self {
            Command::ReadModel => CommandCode::ReadModel,
            Command::ReadVersion => CommandCode::ReadVersion,
            Command::Reset => CommandCode::Reset,
            Command::ReadCurrent => CommandCode::ReadCurrent,
            Command::ReadPressure => CommandCode::ReadPressure,
            Command::ReadVoltage => CommandCode::ReadVoltage,
            Command::GetPumpStatus => CommandCode::GetPumpStatus,
            Command::SetPressureUnits { .. } => CommandCode::SetPressureUnits,
            Command::GetPumpSize => CommandCode::GetPumpSize,
            Command::SetPumpSize { .. } => CommandCode::SetPumpSize,
            Command::GetCalFactor => CommandCode::GetCalFactor,
            Command::SetCalFactor { .. } => CommandCode::SetCalFactor,
            Command::SetArcDetect { .. } => CommandCode::SetArcDetect,
            Command::GetArcDetect => CommandCode::GetArcDetect,
            Command::SetAutoRestart { .. } => CommandCode::SetAutoRestart,
            Command::GetAutoRestart => CommandCode::GetAutoRestart,
            Command::StartPump => CommandCode::StartPump,
            Command::StopPump => CommandCode::StopPump,
            Command::LockKeypad => CommandCode::LockKeypad,
            Command::UnlockKeypad => CommandCode::UnlockKeypad,
            Command::GetAnalogMode => CommandCode::GetAnalogMode,
            Command::SetAnalogMode { .. } => CommandCode::SetAnalogMode,
            Command::HighVoltageOn => CommandCode::HighVoltageOn,
            Command::SetHvAutoRecovery { .. } => CommandCode::SetHvAutoRecovery,
            Command::GetHvAutoRecovery => CommandCode::GetHvAutoRecovery,
            Command::SetCommMode { .. } => CommandCode::SetCommMode,
            Command::GetCommMode => CommandCode::GetCommMode,
            Command::SetCommInterface { .. } => CommandCode::SetCommInterface,
        }
    }

    /// Check the command's argument against its allowed domain.
    ///
    /// Fails fast with a `Validation` error naming the argument and the
    /// accepted range; commands without arguments always pass.
    pub fn validate(&self) -> ProtocolResult<()> {
        match self {
            Command::SetPumpSize { size } => {
                if !(0..=9999).contains(size) {
                    return Err(ProtocolError::Validation {
                        argument: "pump size",
                        value: size.to_string(),
                        allowed: "0-9999",
                    });
                }
            }
            Command::SetCalFactor { factor } => {
                if !(0.0..=9.99).contains(factor) {
                    return Err(ProtocolError::Validation {
                        argument: "calibration factor",
                        value: factor.to_string(),
                        allowed: "0.00-9.99",
                    });
                }
            }
            Command::SetAnalogMode { mode } => {
                // Mode 7 is reserved by the instrument.
                if !matches!(*mode, 0..=6 | 8..=10) {
                    return Err(ProtocolError::Validation {
                        argument: "analog mode",
                        value: mode.to_string(),
                        allowed: "0-6 or 8-10",
                    });
                }
            }
            Command::SetHvAutoRecovery { mode } => {
                if !(0..=2).contains(mode) {
                    return Err(ProtocolError::Validation {
                        argument: "HV auto-recovery mode",
                        value: mode.to_string(),
                        allowed: "0-2",
                    });
                }
            }
            Command::SetCommMode { mode } => {
                if !(0..=2).contains(mode) {
                    return Err(ProtocolError::Validation {
                        argument: "communication mode",
                        value: mode.to_string(),
                        allowed: "0-2",
                    });
                }
            }
            Command::SetCommInterface { interface } => {
                if !(0..=5).contains(interface) {
                    return Err(ProtocolError::Validation {
                        argument: "communication interface",
                        value: interface.to_string(),
                        allowed: "0-5",
                    });
                }
            }
            Command::SetPressureUnits { units } => {
                if PressureUnits::from_char(*units).is_none() {
                    return Err(ProtocolError::Validation {
                        argument: "pressure units",
                        value: units.to_string(),
                        allowed: "T, M, or P",
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Format the command's argument into the ASCII form the instrument
    /// expects, if the command carries one.
    pub fn data(&self) -> Option<String> {
        match self {
            Command::SetPumpSize { size } => Some(format!("{:04}", size)),
            Command::SetCalFactor { factor } => Some(format!("{:.2}", factor)),
            Command::SetAnalogMode { mode } => Some(mode.to_string()),
            Command::SetHvAutoRecovery { mode } => Some(mode.to_string()),
            Command::SetCommMode { mode } => Some(mode.to_string()),
            Command::SetCommInterface { interface } => Some(interface.to_string()),
            Command::SetPressureUnits { units } => Some(units.to_ascii_uppercase().to_string()),
            Command::SetArcDetect { enable } | Command::SetAutoRestart { enable } => {
                Some(if *enable { "YES" } else { "NO" }.to_string())
            }
            _ => None,
        }
    }

    /// Whether the instrument answers this command.
    pub fn expects_response(&self) -> bool {
        !matches!(self, Command::Reset)
    }

    /// The kind of value to extract from this command's response.
    pub fn response_kind(&self) -> ValueKind {
        match self {
            Command::ReadCurrent
            | Command::ReadPressure
            | Command::ReadVoltage
            | Command::GetCalFactor => ValueKind::Float,
            Command::GetPumpSize
            | Command::GetAnalogMode
            | Command::GetHvAutoRecovery
            | Command::GetCommMode => ValueKind::Integer,
            _ => ValueKind::Text,
        }
    }

    /// Validate the command and encode it as a request frame.
    pub fn encode(&self, bus_address: u8) -> ProtocolResult<String> {
        self.validate()?;
        Ok(frame::encode_request(
            bus_address,
            self.code().as_byte(),
            self.data().as_deref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_read_version() {
        assert_eq!(Command::ReadVersion.encode(0x01).unwrap(), "~ 01 02 23\r");
    }

    #[test]
    fn test_pump_size_formats_zero_padded() {
        assert_eq!(Command::SetPumpSize { size: 75 }.data().as_deref(), Some("0075"));
        assert_eq!(Command::SetPumpSize { size: 5000 }.data().as_deref(), Some("5000"));
    }

    #[test]
    fn test_pump_size_boundaries() {
        assert!(Command::SetPumpSize { size: 0 }.validate().is_ok());
        assert!(Command::SetPumpSize { size: 9999 }.validate().is_ok());
        assert!(Command::SetPumpSize { size: 10000 }.validate().is_err());
        assert!(Command::SetPumpSize { size: -1 }.validate().is_err());
    }

    #[test]
    fn test_cal_factor_boundaries() {
        assert!(Command::SetCalFactor { factor: 0.0 }.validate().is_ok());
        assert!(Command::SetCalFactor { factor: 9.99 }.validate().is_ok());
        assert!(Command::SetCalFactor { factor: 9.995 }.validate().is_err());
        assert!(Command::SetCalFactor { factor: -0.01 }.validate().is_err());
        assert_eq!(Command::SetCalFactor { factor: 9.99 }.data().as_deref(), Some("9.99"));
        assert_eq!(Command::SetCalFactor { factor: 1.5 }.data().as_deref(), Some("1.50"));
    }

    #[test]
    fn test_analog_mode_excludes_seven() {
        for mode in [0, 1, 2, 3, 4, 5, 6, 8, 9, 10] {
            assert!(Command::SetAnalogMode { mode }.validate().is_ok(), "mode {mode}");
        }
        assert!(Command::SetAnalogMode { mode: 7 }.validate().is_err());
        assert!(Command::SetAnalogMode { mode: 11 }.validate().is_err());
        assert!(Command::SetAnalogMode { mode: -1 }.validate().is_err());
    }

    #[test]
    fn test_mode_ranges() {
        assert!(Command::SetHvAutoRecovery { mode: 2 }.validate().is_ok());
        assert!(Command::SetHvAutoRecovery { mode: 3 }.validate().is_err());
        assert!(Command::SetCommMode { mode: 0 }.validate().is_ok());
        assert!(Command::SetCommMode { mode: 3 }.validate().is_err());
        assert!(Command::SetCommInterface { interface: 5 }.validate().is_ok());
        assert!(Command::SetCommInterface { interface: 6 }.validate().is_err());
    }

    #[test]
    fn test_pressure_units_case_insensitive() {
        let cmd = Command::SetPressureUnits { units: 'm' };
        assert!(cmd.validate().is_ok());
        assert_eq!(cmd.data().as_deref(), Some("M"));
        assert!(Command::SetPressureUnits { units: 'X' }.validate().is_err());
    }

    #[test]
    fn test_boolean_arguments_format_as_yes_no() {
        assert_eq!(Command::SetArcDetect { enable: true }.data().as_deref(), Some("YES"));
        assert_eq!(Command::SetAutoRestart { enable: false }.data().as_deref(), Some("NO"));
    }

    #[test]
    fn test_invalid_argument_never_encodes() {
        let err = Command::SetPumpSize { size: 10000 }.encode(0x01).unwrap_err();
        assert!(matches!(err, ProtocolError::Validation { argument: "pump size", .. }));
    }

    #[test]
    fn test_only_reset_skips_the_response() {
        assert!(!Command::Reset.expects_response());
        assert!(Command::StartPump.expects_response());
        assert!(Command::ReadCurrent.expects_response());
    }

    #[test]
    fn test_command_code_round_trip() {
        for code in [
            CommandCode::ReadModel,
            CommandCode::ReadCurrent,
            CommandCode::SetPumpSize,
            CommandCode::SetArcDetect,
            CommandCode::GetCommMode,
        ] {
            assert_eq!(CommandCode::from_byte(code.as_byte()), Some(code));
        }
        assert_eq!(CommandCode::from_byte(0xAB), None);
    }
}
