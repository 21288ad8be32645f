// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Bus transport: raw two-wire primitives and the block read strategy.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use i2cdev::core::{I2CDevice, I2CMessage, I2CTransfer};
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError, LinuxI2CMessage};
use log::{debug, trace, warn};

use crate::error::Result;

/// Linux errno values the i2c-dev adapters report.
const EIO: i32 = 5;
const ENXIO: i32 = 6;
const EAGAIN: i32 = 11;
const EBUSY: i32 = 16;
const ENODEV: i32 = 19;
const EOVERFLOW: i32 = 75;
const EMSGSIZE: i32 = 90;
const ETIMEDOUT: i32 = 110;
const EREMOTEIO: i32 = 121;

///
///Status of a finished bus transaction, numbered like
///the two-wire controller status codes.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusStatus {
    /// 0: transaction acknowledged
    Success,
    /// 1: data too long for the controller buffer, some drivers report it spuriously
    DriverQuirk,
    /// 2: NACK received on transmit of address
    AddressNack,
    /// 3: NACK received on transmit of data
    DataNack,
    /// 4: controller stuck
    Stuck,
    /// 5: timeout
    Timeout,
    /// Anything else the controller reports
    Unknown(u8),
}

impl BusStatus {
    pub fn code(self) -> u8 {
        match self {
            BusStatus::Success => 0,
            BusStatus::DriverQuirk => 1,
            BusStatus::AddressNack => 2,
            BusStatus::DataNack => 3,
            BusStatus::Stuck => 4,
            BusStatus::Timeout => 5,
            BusStatus::Unknown(code) => code,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => BusStatus::Success,
            1 => BusStatus::DriverQuirk,
            2 => BusStatus::AddressNack,
            3 => BusStatus::DataNack,
            4 => BusStatus::Stuck,
            5 => BusStatus::Timeout,
            other => BusStatus::Unknown(other),
        }
    }

    pub fn is_success(self) -> bool {
        self == BusStatus::Success
    }
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BusStatus::Success => "success",
            BusStatus::DriverQuirk => "driver quirk",
            BusStatus::AddressNack => "address nack",
            BusStatus::DataNack => "data nack",
            BusStatus::Stuck => "controller stuck",
            BusStatus::Timeout => "timeout",
            BusStatus::Unknown(_) => "unknown",
        };
        write!(f, "{} ({})", self.code(), name)
    }
}

/// Raw primitives of a two-wire bus controller.
///
/// `release` asks the controller to issue a STOP at the end of the
/// transaction. With `release == false` the bus is kept for a following
/// repeated start.
pub trait Transport {
    /// Zero-payload write to `address`.
    fn probe(&mut self, address: u8) -> BusStatus;

    /// Single write transaction.
    fn write(&mut self, address: u8, bytes: &[u8], release: bool) -> BusStatus;

    /// Single read transaction, returns the number of bytes obtained.
    fn read(
        &mut self,
        address: u8,
        buf: &mut [u8],
        release: bool,
    ) -> core::result::Result<usize, BusStatus>;

    /// Select `register` and read `buf.len()` bytes in one combined transaction.
    fn write_read(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        release: bool,
    ) -> core::result::Result<usize, BusStatus>;

    /// Bring the controller back to a known state.
    fn reinit(&mut self) -> Result<()>;
}

/// How a "read N bytes starting at register R" request hits the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// One transaction carrying register select and read.
    Combined,
    /// Register select write without STOP, then a separate read.
    /// For controllers that mishandle the combined transaction.
    Split,
}

impl Default for ReadMode {
    fn default() -> Self {
        if cfg!(feature = "combined-read") {
            ReadMode::Combined
        } else {
            ReadMode::Split
        }
    }
}

type RequestFn<T> =
    fn(&mut T, u8, u8, &mut [u8], bool) -> core::result::Result<usize, BusStatus>;

fn request_combined<T: Transport>(
    bus: &mut T,
    address: u8,
    register: u8,
    buf: &mut [u8],
    release: bool,
) -> core::result::Result<usize, BusStatus> {
    bus.write_read(address, register, buf, release)
}

fn request_split<T: Transport>(
    bus: &mut T,
    address: u8,
    register: u8,
    buf: &mut [u8],
    release: bool,
) -> core::result::Result<usize, BusStatus> {
    let status = bus.write(address, &[register], false);
    if !status.is_success() {
        // The register pointer is stale, whatever follows is not our block.
        debug!("register select 0x{:02x} failed: {}", register, status);
        return Err(status);
    }
    bus.read(address, buf, release)
}

/// Transport with the block read strategy fixed at construction.
pub struct BusTransport<T> {
    bus: T,
    request: RequestFn<T>,
}

impl<T: Transport> BusTransport<T> {
    pub fn new(bus: T, mode: ReadMode) -> Self {
        let request: RequestFn<T> = match mode {
            ReadMode::Combined => request_combined::<T>,
            ReadMode::Split => request_split::<T>,
        };
        BusTransport { bus, request }
    }

    /// Read `buf.len()` bytes starting at `register`.
    ///
    /// Returns the number of bytes actually obtained, which may be less
    /// than requested.
    pub fn request_block(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        release: bool,
    ) -> core::result::Result<usize, BusStatus> {
        (self.request)(&mut self.bus, address, register, buf, release)
    }

    pub fn probe(&mut self, address: u8) -> BusStatus {
        self.bus.probe(address)
    }

    pub fn write(&mut self, address: u8, bytes: &[u8]) -> BusStatus {
        self.bus.write(address, bytes, true)
    }

    pub fn reinit(&mut self) -> Result<()> {
        self.bus.reinit()
    }

    pub fn inner(&self) -> &T {
        &self.bus
    }

    pub fn into_inner(self) -> T {
        self.bus
    }
}

/// Map an i2c-dev error onto the controller status codes.
fn status_from_error(err: LinuxI2CError) -> BusStatus {
    let err = io::Error::from(err);
    match err.raw_os_error() {
        Some(ENXIO) | Some(EREMOTEIO) | Some(ENODEV) => BusStatus::AddressNack,
        Some(EIO) => BusStatus::DataNack,
        Some(EBUSY) | Some(EAGAIN) => BusStatus::Stuck,
        Some(ETIMEDOUT) => BusStatus::Timeout,
        Some(EMSGSIZE) | Some(EOVERFLOW) => BusStatus::DriverQuirk,
        // Small errnos would alias the named status codes.
        Some(code) => match u8::try_from(code) {
            Ok(code) if code > BusStatus::Timeout.code() => BusStatus::Unknown(code),
            _ => {
                warn!("i2c-dev error: {}", err);
                BusStatus::Unknown(u8::MAX)
            }
        },
        None => {
            warn!("i2c-dev error without errno: {}", err);
            BusStatus::Unknown(u8::MAX)
        }
    }
}

/// `Transport` over a Linux i2c-dev character device.
///
/// i2c-dev terminates every transfer with a STOP, so `release == false`
/// is only logged.
pub struct LinuxTransport {
    path: PathBuf,
    address: u8,
    i2cdev: LinuxI2CDevice,
}

impl LinuxTransport {
    /// Open `path` (e.g. `/dev/i2c-1`) bound to `address`.
    pub fn open<P: AsRef<Path>>(path: P, address: u8) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let i2cdev = LinuxI2CDevice::new(&path, u16::from(address)).map_err(io::Error::from)?;
        debug!("opened {} for device 0x{:02x}", path.display(), address);
        Ok(LinuxTransport {
            path,
            address,
            i2cdev,
        })
    }

    fn select(&mut self, address: u8) -> core::result::Result<(), BusStatus> {
        if address != self.address {
            self.i2cdev
                .set_slave_address(u16::from(address))
                .map_err(status_from_error)?;
            self.address = address;
        }
        Ok(())
    }
}

fn note_release(release: bool) {
    if !release {
        trace!("i2c-dev always releases the bus after a transfer");
    }
}

impl Transport for LinuxTransport {
    fn probe(&mut self, address: u8) -> BusStatus {
        if let Err(status) = self.select(address) {
            return status;
        }
        match self.i2cdev.smbus_write_quick(false) {
            Ok(()) => BusStatus::Success,
            Err(e) => status_from_error(e),
        }
    }

    fn write(&mut self, address: u8, bytes: &[u8], release: bool) -> BusStatus {
        note_release(release);
        if let Err(status) = self.select(address) {
            return status;
        }
        match self.i2cdev.write(bytes) {
            Ok(()) => BusStatus::Success,
            Err(e) => status_from_error(e),
        }
    }

    fn read(
        &mut self,
        address: u8,
        buf: &mut [u8],
        release: bool,
    ) -> core::result::Result<usize, BusStatus> {
        note_release(release);
        self.select(address)?;
        self.i2cdev.read(buf).map_err(status_from_error)?;
        Ok(buf.len())
    }

    fn write_read(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        release: bool,
    ) -> core::result::Result<usize, BusStatus> {
        note_release(release);
        self.select(address)?;
        let len = buf.len();
        let select = [register];
        let mut msgs = [LinuxI2CMessage::write(&select), LinuxI2CMessage::read(buf)];
        let done = self.i2cdev.transfer(&mut msgs).map_err(status_from_error)?;
        // Both messages must go through for the data to be valid.
        Ok(if done == 2 { len } else { 0 })
    }

    fn reinit(&mut self) -> Result<()> {
        warn!(
            "reinitializing {} for device 0x{:02x}",
            self.path.display(),
            self.address
        );
        self.i2cdev =
            LinuxI2CDevice::new(&self.path, u16::from(self.address)).map_err(io::Error::from)?;
        Ok(())
    }
}
