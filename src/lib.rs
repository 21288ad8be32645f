// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Senseair Sunrise NDIR CO2 sensor over Linux I2C
//!
//! The sensor sleeps between measurements, every register access is
//! preceded by a wake handshake. EEPROM backed registers (measurement mode,
//! meter control) need 25 ms after each write before the bus is used again,
//! the driver waits for it.
//!
//! Some bus controllers break the combined register-select/read
//! transaction. The default build reads in two transactions, enable the
//! `combined-read` feature or set [`config::Config::read_mode`] to use a
//! single one.
//!
//! ## Basic Example
//!
//! Polling CO2 at the period configured in the sensor
//!
//!
//!```no_run
//!use std::thread;
//!
//!use sunrise_i2c::config::Config;
//!use sunrise_i2c::sunrise::{MeasurementMode, ModeChange, Sunrise};
//!
//!fn main() {
//!    let mut sensor = Sunrise::open(Config::default()).unwrap();
//!
//!    match sensor.set_measurement_mode(MeasurementMode::Continuous) {
//!        Ok(ModeChange::Unchanged) => {}
//!        Ok(ModeChange::RestartRequired) => {
//!            println!("Measurement mode changed, power cycle the sensor");
//!            return;
//!        }
//!        Err(e) => {
//!            println!("Sensor unusable until restart: {}", e);
//!            return;
//!        }
//!    }
//!
//!    if let Ok(config) = sensor.read_config() {
//!        println!("{}", config);
//!    }
//!
//!    loop {
//!        match sensor.read_measurement() {
//!            Ok(measurement) => println!("{}", measurement),
//!            Err(e) => println!("No reading this cycle: {}", e),
//!        }
//!        thread::sleep(sensor.read_period());
//!    }
//!}
//!```
//!

pub mod config;
pub mod error;
#[cfg(test)]
mod mock;
pub mod registers;
/// Sunrise driver and its register level operations
pub mod sunrise;
pub mod transport;
pub mod wake;

pub use config::Config;
pub use error::{Result, SunriseError};
pub use sunrise::{AbcState, Measurement, MeasurementMode, ModeChange, SensorConfig, Sunrise};
