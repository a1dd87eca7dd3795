//! Generic Attribute Profile ([Vol 3] Part G) server side: event model,
//! service registry and dispatch, and prepared write handling.

use std::fmt::{Debug, Display, Formatter};

pub use {consts::*, registry::*, service::*, write::*};

use crate::att::{Handle, Status};
use crate::gap::Uuid;
use crate::host::Stack;
use crate::le::RawAddr;

mod consts;
mod registry;
mod service;
mod write;

#[cfg(test)]
mod tests;

/// Attribute server errors.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{0} is already registered")]
    DuplicateApp(AppId),
}

/// Common attribute server result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application (service instance) identifier chosen by the local device. Each
/// registered service has a distinct identifier.
#[derive(
    Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct AppId(pub u16);

/// Attribute server interface assigned by the stack after successful
/// application registration.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Iface(u8);

impl Iface {
    /// Raw value that the stack uses for events not associated with any
    /// interface.
    pub const NONE_RAW: u8 = 0xFF;

    /// Converts a raw interface. Returns `None` for [`Self::NONE_RAW`].
    #[inline]
    #[must_use]
    pub const fn from_raw(v: u8) -> Option<Self> {
        if v == Self::NONE_RAW {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Returns the raw interface value.
    #[inline(always)]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Connection identifier assigned by the stack.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct ConnId(pub u16);

/// Request transaction identifier that must be echoed in the response.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct TransId(pub u32);

macro_rules! id_fmt {
    ($($t:ident $fmt:literal),+ $(,)?) => {$(
        impl Debug for $t {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($t), "(", $fmt, ")"), self.0)
            }
        }

        impl Display for $t {
            #[inline]
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                Debug::fmt(self, f)
            }
        }
    )+};
}
id_fmt! { AppId "{:#06X}", Iface "{}", ConnId "{}", TransId "{}" }

/// Attribute server event reported by the stack.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// Application registration completed.
    Register { status: Status, app: AppId },
    /// Service creation completed.
    CreateService {
        status: Status,
        svc: Handle,
        uuid: Uuid,
    },
    /// Characteristic declaration added.
    AddChar {
        status: Status,
        svc: Handle,
        attr: Handle,
        uuid: Uuid,
    },
    /// Characteristic descriptor added.
    AddDescr {
        status: Status,
        svc: Handle,
        attr: Handle,
        uuid: Uuid,
    },
    /// Service start completed.
    StartService { status: Status, svc: Handle },
    /// A central connected.
    Connect { conn: ConnId, peer: RawAddr },
    /// A central disconnected.
    Disconnect {
        conn: ConnId,
        peer: RawAddr,
        reason: u8,
    },
    /// ATT MTU was exchanged.
    Mtu { conn: ConnId, mtu: u16 },
    /// Client read request.
    Read(ReadEvt),
    /// Client write request, write command, or prepared write fragment.
    Write(WriteEvt),
    /// Client execute write request.
    ExecWrite(ExecWriteEvt),
}

impl Event {
    /// Returns the connection that the event refers to.
    #[must_use]
    pub fn conn(&self) -> Option<ConnId> {
        match self {
            Self::Connect { conn, .. }
            | Self::Disconnect { conn, .. }
            | Self::Mtu { conn, .. }
            | Self::Read(ReadEvt { conn, .. })
            | Self::Write(WriteEvt { conn, .. })
            | Self::ExecWrite(ExecWriteEvt { conn, .. }) => Some(*conn),
            _ => None,
        }
    }
}

/// Client read request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadEvt {
    pub conn: ConnId,
    pub trans: TransId,
    pub hdl: Handle,
    pub off: u16,
    /// Whether this is a long read (read blob) request.
    pub is_long: bool,
}

/// Client write request, write command, or prepared write fragment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WriteEvt {
    pub conn: ConnId,
    pub trans: TransId,
    pub hdl: Handle,
    pub off: u16,
    /// Whether the client expects a response (write request or prepared
    /// write) as opposed to a write command.
    pub need_rsp: bool,
    /// Whether this is a prepared write fragment.
    pub is_prep: bool,
    pub val: Vec<u8>,
}

/// Client execute write request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExecWriteEvt {
    pub conn: ConnId,
    pub trans: TransId,
    /// `true` to write all prepared values, `false` to cancel them.
    pub commit: bool,
}

/// Context given to a service for each event that it receives.
#[derive(Clone, Copy, Debug)]
pub struct Ctx<'a> {
    /// Stack for issuing requests.
    pub stack: &'a dyn Stack,
    /// Application identifier of the receiving service.
    pub app: AppId,
    /// Interface of the receiving service or `None` if it is not yet bound.
    pub iface: Option<Iface>,
}

/// Service instance that owns a part of the attribute table.
pub trait Service: Debug + Send + Sync {
    /// Handles one attribute server event. Events that are not associated
    /// with an interface are broadcast to every service, so implementations
    /// must check that the event is relevant to `cx.app`.
    fn handle(&self, cx: &Ctx<'_>, evt: &Event);
}
