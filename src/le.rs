//! LE-specific types.

use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

use crate::hci::duration_1250us;

// 48-bit untyped device address stored in little-endian byte order.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct RawAddr([u8; 6]);

impl From<[u8; 6]> for RawAddr {
    #[inline]
    fn from(v: [u8; 6]) -> Self {
        Self(v)
    }
}

impl AsRef<[u8]> for RawAddr {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Debug for RawAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // [Vol 3] Part C, Section 3.2.1.3
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[5], self.0[4], self.0[3], self.0[2], self.0[1], self.0[0]
        )
    }
}

impl Display for RawAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Transmission power level in dBm.
#[derive(
    Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct TxPower(i8);

impl TxPower {
    /// Creates a power level of `v` dBm.
    #[inline]
    #[must_use]
    pub const fn new(v: i8) -> Self {
        Self(v)
    }
}

impl Default for TxPower {
    /// Returns the power level that most controllers use out of reset.
    #[inline]
    fn default() -> Self {
        Self(9)
    }
}

impl From<TxPower> for i8 {
    #[inline]
    fn from(p: TxPower) -> Self {
        p.0
    }
}

/// Connection parameters requested by the peripheral
/// ([Vol 3] Part A, Section 4.20).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnParams {
    /// Minimum connection interval in 1.25ms ticks.
    pub int_min: u16,
    /// Maximum connection interval in 1.25ms ticks.
    pub int_max: u16,
    /// Peripheral latency in connection events.
    pub latency: u16,
    /// Supervision timeout in 10ms ticks.
    pub timeout: u16,
}

impl ConnParams {
    /// Parameters requested after a central connects: 20-40ms interval, no
    /// latency, 4s supervision timeout.
    pub const DEFAULT_UPDATE: Self = Self {
        int_min: 0x10,
        int_max: 0x20,
        latency: 0,
        timeout: 400,
    };

    /// Returns the connection interval range.
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> (Duration, Duration) {
        (duration_1250us(self.int_min), duration_1250us(self.int_max))
    }

    /// Returns the supervision timeout.
    #[inline]
    #[must_use]
    pub const fn supervision_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout as u64 * 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_display() {
        let a = RawAddr::from([0x01, 0x02, 0x03, 0x04, 0x05, 0xA6]);
        assert_eq!(a.to_string(), "A6:05:04:03:02:01");
    }

    #[test]
    fn conn_params() {
        let p = ConnParams::DEFAULT_UPDATE;
        assert_eq!(
            p.interval(),
            (Duration::from_millis(20), Duration::from_millis(40))
        );
        assert_eq!(p.supervision_timeout(), Duration::from_secs(4));
    }
}
