// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Wake handshake.
//!
//! The Sunrise sleeps between measurements and ignores register access
//! until it has seen an addressed transaction. The handshake is an empty
//! write, retried a bounded number of times.

use log::{debug, error, warn};

use crate::error::{Result, SunriseError};
use crate::transport::{BusStatus, BusTransport, Transport};

/// Amount of wake attempts before giving up
pub const WAKE_ATTEMPTS: u8 = 5;

#[derive(Debug, Clone, Copy)]
pub struct Waker {
    attempts: u8,
}

impl Default for Waker {
    fn default() -> Self {
        Waker {
            attempts: WAKE_ATTEMPTS,
        }
    }
}

/// Statuses that end the handshake.
///
/// An address NACK is expected while the sensor is still waking up, and
/// some drivers report status 1 for an otherwise fine empty write.
fn answered(status: BusStatus) -> bool {
    matches!(
        status,
        BusStatus::Success | BusStatus::DriverQuirk | BusStatus::AddressNack
    )
}

impl Waker {
    pub fn new(attempts: u8) -> Self {
        Waker {
            attempts: attempts.max(1),
        }
    }

    /// Wake the sensor at `address`.
    ///
    /// If the last status seen is "controller stuck" the transport is
    /// reinitialized and `ControllerStuck` returned, the caller retries
    /// the whole operation later.
    pub fn wake<T: Transport>(&self, bus: &mut BusTransport<T>, address: u8) -> Result<()> {
        let mut remaining = self.attempts;
        let status = loop {
            let status = bus.probe(address);
            remaining -= 1;
            if answered(status) {
                debug!(
                    "sensor 0x{:02x} awake after {} attempt(s), status {}",
                    address,
                    self.attempts - remaining,
                    status
                );
                return Ok(());
            }
            if remaining == 0 {
                break status;
            }
            debug!("wake attempt on 0x{:02x} returned {}, retrying", address, status);
        };

        if status == BusStatus::Stuck {
            error!("bus controller stuck while waking 0x{:02x}", address);
            if let Err(e) = bus.reinit() {
                error!("failed to reinitialize bus: {}", e);
            }
            return Err(SunriseError::ControllerStuck);
        }

        warn!(
            "failed to wake up sensor 0x{:02x} after {} attempts, last status {}",
            address, self.attempts, status
        );
        Err(SunriseError::WakeFailed {
            attempts: self.attempts,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::{MockTransport, Op};
    use crate::transport::ReadMode;

    fn transport(probes: &[BusStatus]) -> BusTransport<MockTransport> {
        let mut mock = MockTransport::new();
        for status in probes {
            mock.queue_probe(*status);
        }
        BusTransport::new(mock, ReadMode::Split)
    }

    #[test]
    fn answered_statuses_wake_on_first_attempt() {
        for status in [
            BusStatus::Success,
            BusStatus::DriverQuirk,
            BusStatus::AddressNack,
        ] {
            let mut bus = transport(&[status]);
            Waker::default().wake(&mut bus, 0x68).unwrap();
            assert_eq!(bus.inner().probe_count(), 1);
        }
    }

    #[test]
    fn retries_until_answered() {
        let mut bus = transport(&[
            BusStatus::Timeout,
            BusStatus::DataNack,
            BusStatus::Success,
        ]);
        Waker::default().wake(&mut bus, 0x68).unwrap();
        assert_eq!(bus.inner().probe_count(), 3);
    }

    #[test]
    fn five_unrecognized_statuses_fail() {
        let mut bus = transport(&[BusStatus::Timeout; 5]);
        let err = Waker::default().wake(&mut bus, 0x68).unwrap_err();
        assert!(matches!(err, SunriseError::WakeFailed { attempts: 5 }));
        assert_eq!(bus.inner().probe_count(), 5);
        assert!(!bus.inner().ops().contains(&Op::Reinit));
    }

    #[test]
    fn answer_on_last_attempt_still_wakes() {
        let mut bus = transport(&[
            BusStatus::Timeout,
            BusStatus::Timeout,
            BusStatus::Timeout,
            BusStatus::Timeout,
            BusStatus::AddressNack,
        ]);
        assert!(Waker::default().wake(&mut bus, 0x68).is_ok());
    }

    #[test]
    fn stuck_controller_is_reinitialized() {
        let mut bus = transport(&[BusStatus::Stuck; 5]);
        let err = Waker::default().wake(&mut bus, 0x68).unwrap_err();
        assert!(matches!(err, SunriseError::ControllerStuck));
        assert_eq!(bus.inner().ops().last(), Some(&Op::Reinit));
    }

    #[test]
    fn stuck_then_answer_recovers_without_reinit() {
        let mut bus = transport(&[BusStatus::Stuck, BusStatus::Success]);
        Waker::default().wake(&mut bus, 0x68).unwrap();
        assert!(!bus.inner().ops().contains(&Op::Reinit));
    }

    #[test]
    fn attempts_never_drop_below_one() {
        let mut bus = transport(&[BusStatus::Timeout]);
        let err = Waker::new(0).wake(&mut bus, 0x68).unwrap_err();
        assert!(matches!(err, SunriseError::WakeFailed { attempts: 1 }));
        assert_eq!(bus.inner().probe_count(), 1);
    }
}
