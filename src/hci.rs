//! Controller-level types that appear at the stack boundary
//! ([Vol 4] Part E).

use std::ops::RangeInclusive;
use std::time::Duration;

pub use consts::*;

mod consts;

/// Legacy advertising parameters ([Vol 4] Part E, Section 7.8.5).
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct AdvParams {
    /// Minimum advertising interval in 0.625ms ticks.
    pub int_min: u16,
    /// Maximum advertising interval in 0.625ms ticks.
    pub int_max: u16,
    pub typ: AdvType,
    pub own_addr_type: AdvAddrType,
    pub chan_map: AdvChanMap,
    pub filter_policy: AdvFilterPolicy,
}

impl AdvParams {
    /// Returns the advertising interval range.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> RangeInclusive<Duration> {
        duration_625us(self.int_min)..=duration_625us(self.int_max)
    }

    /// Returns whether the parameters are accepted by the controller
    /// ([Vol 4] Part E, Section 7.8.5).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (0x0020..=0x4000).contains(&self.int_min)
            && (self.int_min..=0x4000).contains(&self.int_max)
            && !self.chan_map.is_empty()
    }
}

impl Default for AdvParams {
    /// Returns connectable undirected advertising on all channels every
    /// 20-40ms using the public address and no filtering.
    #[inline]
    fn default() -> Self {
        Self {
            int_min: 0x20,
            int_max: 0x40,
            typ: AdvType::ConnectableUndirected,
            own_addr_type: AdvAddrType::Public,
            chan_map: AdvChanMap::all(),
            filter_policy: AdvFilterPolicy::None,
        }
    }
}

/// Returns the number of 1.25ms ticks in `d` (rounding down) or `None` if the
/// value overflows `u16`.
#[inline]
#[must_use]
pub fn ticks_1250us(d: Duration) -> Option<u16> {
    ticks_us(d, 1250)
}

/// Returns the duration of `n` 0.625ms ticks.
#[inline]
#[must_use]
pub const fn duration_625us(n: u16) -> Duration {
    Duration::from_micros(n as u64 * 625)
}

/// Returns the duration of `n` 1.25ms ticks.
#[inline]
#[must_use]
pub const fn duration_1250us(n: u16) -> Duration {
    Duration::from_micros(n as u64 * 1250)
}

/// Converts duration `d` into the count of `tick` microseconds, rounding down.
/// Returns `None` if the count overflows `T`.
#[inline]
fn ticks_us<T>(d: Duration, tick: u16) -> Option<T>
where
    T: Default + Ord + TryFrom<u128>,
{
    if d.is_zero() {
        return Some(T::default());
    }
    T::try_from((d.as_micros() / u128::from(tick)).max(1)).ok()
}
