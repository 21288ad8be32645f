// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use thiserror::Error;

use crate::transport::BusStatus;

///
///Sunrise error enum. Bus level failures keep the
///controller status that caused them, wake failures
///keep the number of attempts spent.
///
#[derive(Debug, Error)]
pub enum SunriseError {
    /// The sensor did not answer the wake handshake
    #[error("failed to wake up sensor after {attempts} attempts")]
    WakeFailed { attempts: u8 },
    /// The bus controller reported it was stuck, the transport has been reinitialized
    #[error("bus controller stuck, transport reinitialized")]
    ControllerStuck,
    /// Fewer bytes than requested came back from a register read
    #[error("short read: got {actual} of {expected} bytes")]
    ShortRead { expected: usize, actual: usize },
    /// The register read transaction itself failed
    #[error("failed to read registers, bus status {0}")]
    ReadFailed(BusStatus),
    /// A register write was not acknowledged
    #[error("failed to write registers, bus status {0}")]
    WriteFailed(BusStatus),
    /// The measurement mode register holds a value outside {0, 1}
    #[error("invalid measurement mode 0x{0:02x}")]
    InvalidMode(u8),
    /// Measurement mode was changed, the sensor must be power cycled
    #[error("measurement mode changed, sensor restart is required")]
    RestartRequired,
    /// A previous measurement mode change left this session unusable
    #[error("session halted, sensor restart is required")]
    SessionHalted,
    /// Input/output error opening or rebinding the bus device
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, SunriseError>;

impl SunriseError {
    /// Whether the failure only costs the current polling cycle.
    ///
    /// Session level failures need a sensor restart before the driver
    /// can be used again.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            SunriseError::RestartRequired | SunriseError::SessionHalted
        )
    }
}
