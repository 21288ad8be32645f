// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;

use crate::registers::DEFAULT_ADDRESS;
use crate::transport::ReadMode;
use crate::wake::WAKE_ATTEMPTS;

/// Driver configuration.
///
/// Defaults follow the enabled cargo features: `combined-read` selects
/// [`ReadMode::Combined`], `abc-autocorrect` turns on ABC re-enabling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// i2c-dev character device the sensor hangs off
    pub device_path: PathBuf,
    pub address: u8,
    pub read_mode: ReadMode,
    pub wake_attempts: u8,
    /// Re-enable ABC whenever a config read finds it disabled
    pub abc_autocorrect: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_path: PathBuf::from("/dev/i2c-1"),
            address: DEFAULT_ADDRESS,
            read_mode: ReadMode::default(),
            wake_attempts: WAKE_ATTEMPTS,
            abc_autocorrect: cfg!(feature = "abc-autocorrect"),
        }
    }
}

impl Config {
    pub fn with_device_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.device_path = path.into();
        self
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    pub fn with_wake_attempts(mut self, attempts: u8) -> Self {
        self.wake_attempts = attempts;
        self
    }

    pub fn with_abc_autocorrect(mut self, enabled: bool) -> Self {
        self.abc_autocorrect = enabled;
        self
    }
}
