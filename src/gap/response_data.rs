//! Implementation of length-type-value response data format used in the
//! Advertising Data (AD) and Scan Response Data (SRD) blocks:
//!
//! * [Vol 3] Part C, Section 11
//! * [Core Specification Supplement] Part A, Section 1
//! * [Assigned Numbers] Section 2.3

use std::time::Duration;

use structbuf::{Pack, Packer, StructBuf};

use crate::gap::{AdvFlag, ResponseDataType, Uuid};
use crate::hci::ticks_1250us;
use crate::le::TxPower;

/// Response data builder.
#[derive(Clone, Debug)]
pub struct ResponseDataMut(StructBuf);

impl ResponseDataMut {
    /// Creates a new response data buffer.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(StructBuf::new(254)) // [Vol 6] Part B, Section 2.3.4
    }

    /// Returns the final response data buffer.
    #[allow(clippy::missing_const_for_fn)]
    #[inline]
    pub fn get(self) -> StructBuf {
        self.0
    }

    /// Appends a list of service class UUIDs that are all encoded in their
    /// full 128-bit form, including those derived from the base UUID
    /// (\[CSS\] Part A, Section 1.1).
    pub fn service_class128<T: Copy + Into<Uuid>>(
        &mut self,
        complete: bool,
        uuids: &[T],
    ) -> &mut Self {
        let typ = u8::from(ResponseDataType::IncompleteServiceClass128) + u8::from(complete);
        self.put(typ, |b| {
            uuids.iter().for_each(|&u| {
                b.put(u.into().to_bytes());
            });
        })
    }

    /// Appends either shortened or complete local device name
    /// (\[CSS\] Part A, Section 1.2).
    pub fn local_name<T: AsRef<str>>(&mut self, complete: bool, v: T) -> &mut Self {
        let typ = u8::from(ResponseDataType::ShortLocalName) + u8::from(complete);
        self.put(typ, |b| {
            b.put(v.as_ref().as_bytes());
        })
    }

    /// Appends advertising flags (\[CSS\] Part A, Section 1.3).
    pub fn flags(&mut self, v: AdvFlag) -> &mut Self {
        self.put(ResponseDataType::Flags, |b| {
            b.u8(v.bits());
        })
    }

    /// Appends TX power level (\[CSS\] Part A, Section 1.5).
    pub fn tx_power(&mut self, v: TxPower) -> &mut Self {
        self.put(ResponseDataType::TxPower, |b| {
            b.i8(i8::from(v));
        })
    }

    /// Appends peripheral connection interval range (\[CSS\] Part A, Section 1.9).
    /// A missing bound is encoded as "no specific value".
    pub fn peripheral_connection_interval(
        &mut self,
        min: Option<Duration>,
        max: Option<Duration>,
    ) -> &mut Self {
        let ticks = |v: Option<Duration>| v.and_then(ticks_1250us).unwrap_or(u16::MAX);
        self.put(ResponseDataType::PeripheralConnectionIntervalRange, |b| {
            b.u16(ticks(min)).u16(ticks(max));
        })
    }

    /// Appends a length-type-data field to the buffer, calling `f` to provide
    /// the data.
    fn put<T: Into<u8>>(&mut self, typ: T, f: impl Fn(&mut Packer)) -> &mut Self {
        let i = self.0.len();
        f(self.0.append().put([0, typ.into()]));
        let n = u8::try_from(self.0.len().wrapping_sub(i + 1)).expect("response data overflow");
        self.0[i] = n;
        self
    }
}

impl Default for ResponseDataMut {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
