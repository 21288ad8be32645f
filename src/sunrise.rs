// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::time::Duration;

use log::{error, info, warn};

use crate::config::Config;
use crate::error::{Result, SunriseError};
use crate::registers::{
    RegisterBus, ERROR_STATUS, MEASUREMENT_MODE, METER_CONTROL, METER_CONTROL_ABC_DISABLED,
};
use crate::transport::{BusTransport, LinuxTransport, Transport};
use crate::wake::Waker;

/// Reading period used until a config read says otherwise
pub const DEFAULT_READ_PERIOD_MS: i32 = 4000;

/// Length of the measurement and configuration register blocks
const BLOCK_LEN: usize = 7;

///
///Measurement mode stored in the sensor EEPROM.
///A change only takes effect after the sensor restarts.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementMode {
    Continuous = 0,
    Single = 1,
}

impl TryFrom<u8> for MeasurementMode {
    type Error = SunriseError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(MeasurementMode::Continuous),
            1 => Ok(MeasurementMode::Single),
            other => Err(SunriseError::InvalidMode(other)),
        }
    }
}

impl From<MeasurementMode> for u8 {
    fn from(mode: MeasurementMode) -> u8 {
        mode as u8
    }
}

impl fmt::Display for MeasurementMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MeasurementMode::Continuous => fmt::Display::fmt("continuous", f),
            MeasurementMode::Single => fmt::Display::fmt("single", f),
        }
    }
}

/// One CO2 reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// CO2 concentration in ppm, filtered and pressure compensated by the sensor
    pub co2_ppm: i16,
    /// Sensor fault flags, 0 when healthy
    pub error_status: u8,
}

impl Measurement {
    pub fn has_errors(&self) -> bool {
        self.error_status != 0
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CO2: {} ppm, error status: 0x{:02X}",
            self.co2_ppm, self.error_status
        )
    }
}

/// State of automatic baseline calibration as presented to users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbcState {
    Disabled,
    Enabled { period_hours: i16 },
}

/// Measurement configuration read back from the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    pub mode: MeasurementMode,
    pub period_seconds: i16,
    pub sample_count: i16,
    pub abc_period_hours: i16,
    pub meter_control: u8,
}

impl SensorConfig {
    pub fn abc_disabled_bit(&self) -> bool {
        self.meter_control & METER_CONTROL_ABC_DISABLED != 0
    }

    /// ABC counts as disabled when its period is 0 or 0xFFFF, or when
    /// meter control disables it, whatever the period says.
    pub fn abc_state(&self) -> AbcState {
        if self.abc_period_hours == 0 || self.abc_period_hours == -1 || self.abc_disabled_bit() {
            AbcState::Disabled
        } else {
            AbcState::Enabled {
                period_hours: self.abc_period_hours,
            }
        }
    }
}

impl fmt::Display for SensorConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "mode: {}, period: {} s, samples: {}, ",
            self.mode, self.period_seconds, self.sample_count
        )?;
        match self.abc_state() {
            AbcState::Disabled => write!(f, "ABC period: disabled")?,
            AbcState::Enabled { period_hours } => write!(f, "ABC period: {} h", period_hours)?,
        }
        write!(f, ", meter control: 0x{:02X}", self.meter_control)
    }
}

/// Outcome of [`Sunrise::set_measurement_mode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    /// The sensor already runs in the requested mode
    Unchanged,
    /// The mode was written; the sensor must be restarted and this
    /// driver session no longer talks to it
    RestartRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    RestartPending,
    Failed,
}

/// Decode a big endian register pair, sign extending the high byte.
fn be_i16(hi: u8, lo: u8) -> i16 {
    i16::from_be_bytes([hi, lo])
}

/// Sunrise driver, wraps a bus transport
/// and implements the sensor operations.
///
/// Not reentrant: the host must serialize calls, the wake and register
/// access sequence is not atomic on the bus.
pub struct Sunrise<T> {
    registers: RegisterBus<T>,
    abc_autocorrect: bool,
    read_period_ms: i32,
    halt: Option<Halt>,
}

impl Sunrise<LinuxTransport> {
    /// Open the sensor on the i2c-dev device named in `config`.
    ///
    /// If fails, return the Io error from i2cdev
    ///
    pub fn open(config: Config) -> Result<Self> {
        let transport = LinuxTransport::open(&config.device_path, config.address)?;
        Ok(Sunrise::new(transport, config))
    }
}

impl<T: Transport> Sunrise<T> {
    pub fn new(transport: T, config: Config) -> Self {
        let bus = BusTransport::new(transport, config.read_mode);
        Sunrise {
            registers: RegisterBus::new(bus, Waker::new(config.wake_attempts), config.address),
            abc_autocorrect: config.abc_autocorrect,
            read_period_ms: DEFAULT_READ_PERIOD_MS,
            halt: None,
        }
    }

    /// Polling period in milliseconds, as last configured in the sensor.
    pub fn read_period_ms(&self) -> i32 {
        self.read_period_ms
    }

    /// Polling period; a non positive sensor period gives zero.
    pub fn read_period(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.read_period_ms).unwrap_or(0))
    }

    /// Whether this session is over until the sensor restarts.
    pub fn is_halted(&self) -> bool {
        self.halt.is_some()
    }

    pub fn transport(&self) -> &T {
        self.registers.transport().inner()
    }

    pub fn release(self) -> T {
        let Sunrise { registers, .. } = self;
        registers.into_transport().into_inner()
    }

    fn session(&self) -> Result<()> {
        match self.halt {
            None => Ok(()),
            Some(Halt::RestartPending) => Err(SunriseError::RestartRequired),
            Some(Halt::Failed) => Err(SunriseError::SessionHalted),
        }
    }

    /// Read CO2 concentration and error status.
    /// On error no reading is available this cycle.
    pub fn read_measurement(&mut self) -> Result<Measurement> {
        self.session()?;
        let mut block = [0u8; BLOCK_LEN];
        self.registers.read_registers(ERROR_STATUS, &mut block)?;

        // Bytes 1..=4 are reserved
        let measurement = Measurement {
            error_status: block[0],
            co2_ppm: be_i16(block[5], block[6]),
        };
        if measurement.has_errors() {
            warn!("sensor error status 0x{:02X}", measurement.error_status);
        }
        info!("{}", measurement);
        Ok(measurement)
    }

    /// Read the measurement configuration and meter control.
    ///
    /// Updates the cached read period. With ABC auto-correction on, ABC is
    /// re-enabled when meter control shows it disabled; the returned config
    /// holds the values as read.
    pub fn read_config(&mut self) -> Result<SensorConfig> {
        self.session()?;
        let mut block = [0u8; BLOCK_LEN];
        self.registers.read_registers(MEASUREMENT_MODE, &mut block)?;

        // The sensor may not fall asleep in between, wake it again anyway.
        let mut meter_control = [0u8; 1];
        self.registers
            .read_registers(METER_CONTROL, &mut meter_control)?;

        let config = SensorConfig {
            mode: MeasurementMode::try_from(block[0])?,
            period_seconds: be_i16(block[1], block[2]),
            sample_count: be_i16(block[3], block[4]),
            abc_period_hours: be_i16(block[5], block[6]),
            meter_control: meter_control[0],
        };
        self.read_period_ms = i32::from(config.period_seconds) * 1000;
        info!("{}", config);

        if self.abc_autocorrect && config.abc_disabled_bit() {
            if let Err(e) = self.set_abc(true) {
                warn!("failed to re-enable ABC: {}", e);
            }
        }
        Ok(config)
    }

    /// Enable or disable automatic baseline calibration.
    ///
    /// Disable ABC when the sensor will see CO2 below 400 ppm.
    pub fn set_abc(&mut self, enable: bool) -> Result<()> {
        self.session()?;
        let mut meter_control = [0u8; 1];
        self.registers
            .read_registers(METER_CONTROL, &mut meter_control)?;

        let mut value = meter_control[0];
        if enable {
            info!("Enabling ABC");
            value &= !METER_CONTROL_ABC_DISABLED;
        } else {
            info!("Disabling ABC");
            value |= METER_CONTROL_ABC_DISABLED;
        }
        self.registers.write_registers(METER_CONTROL, &[value])
    }

    /// Switch the sensor to `target` mode if it is not already in it.
    ///
    /// Any failure here, and a successful change, end the session: the
    /// sensor has to be restarted before it is used again.
    pub fn set_measurement_mode(&mut self, target: MeasurementMode) -> Result<ModeChange> {
        self.session()?;
        let mut mode = [0u8; 1];
        if let Err(e) = self.registers.read_registers(MEASUREMENT_MODE, &mut mode) {
            error!("failed to read measurement mode: {}", e);
            self.halt = Some(Halt::Failed);
            return Err(e);
        }
        if mode[0] == u8::from(target) {
            return Ok(ModeChange::Unchanged);
        }

        info!("Changing measurement mode to {}", target);
        if let Err(e) = self
            .registers
            .write_registers(MEASUREMENT_MODE, &[u8::from(target)])
        {
            error!("failed to change measurement mode: {}", e);
            self.halt = Some(Halt::Failed);
            return Err(e);
        }
        info!("Sensor restart is required to apply changes");
        self.halt = Some(Halt::RestartPending);
        Ok(ModeChange::RestartRequired)
    }
}
