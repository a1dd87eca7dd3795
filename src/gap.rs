//! Generic Access Profile ([Vol 3] Part C): advertising payloads, advertising
//! readiness, and GAP events reported by the stack.

pub use {adv::*, consts::*, response_data::*, uuid::*};

use crate::hci;
use crate::le::RawAddr;

mod adv;
mod consts;
mod response_data;
mod uuid;

/// GAP event reported by the stack.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// Primary advertising data was configured.
    AdvDataSet { status: hci::Status },
    /// Scan response data was configured.
    ScanRspDataSet { status: hci::Status },
    /// Advertising start completed.
    AdvStart { status: hci::Status },
    /// Advertising stop completed.
    AdvStop { status: hci::Status },
    /// Connection parameter update completed. Intervals are in 1.25ms ticks
    /// and the timeout in 10ms ticks.
    ConnParamsUpdate {
        status: hci::Status,
        peer: RawAddr,
        int_min: u16,
        int_max: u16,
        int: u16,
        latency: u16,
        timeout: u16,
    },
    /// Data length update completed.
    PktLength {
        status: hci::Status,
        rx_len: u16,
        tx_len: u16,
    },
}
