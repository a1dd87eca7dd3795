//! Boundary with the external BLE protocol stack.
//!
//! The stack owns the radio, link layer, and attribute protocol transport. It
//! reports events to a [`Session`](crate::Session) and accepts the requests
//! defined by [`Stack`]. Requests return as soon as they are queued; their
//! results arrive later as events.

use std::fmt::Debug;

use crate::att::{AttrValue, Handle, Perms, Status};
use crate::gap::Uuid;
use crate::gatt::{AppId, CharProps, ConnId, Iface, TransId};
use crate::hci::AdvParams;
use crate::le::{ConnParams, RawAddr};

#[cfg(test)]
pub(crate) mod mock;

/// Stack request errors.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{op} rejected by the stack with code {code:#X}")]
    Rejected { op: &'static str, code: i32 },
    #[error("invalid {0} argument")]
    InvalidArg(&'static str),
    #[error("stack is not enabled")]
    NotEnabled,
}

/// Common host result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Requests issued to the external protocol stack.
pub trait Stack: Debug + Send + Sync {
    /// Sets the GAP device name.
    fn set_device_name(&self, name: &str) -> Result<()>;

    /// Registers an attribute server application. The stack replies with a
    /// [`gatt::Event::Register`](crate::gatt::Event::Register) event carrying
    /// the assigned interface.
    fn app_register(&self, app: AppId) -> Result<()>;

    /// Sets the MTU that will be offered during MTU exchange.
    fn set_local_mtu(&self, mtu: u16) -> Result<()>;

    /// Submits the primary advertising payload.
    fn config_adv_data(&self, data: &[u8]) -> Result<()>;

    /// Submits the scan response payload.
    fn config_scan_rsp_data(&self, data: &[u8]) -> Result<()>;

    /// Starts advertising.
    fn start_advertising(&self, p: &AdvParams) -> Result<()>;

    /// Creates a primary service with room for `num_handles` attributes.
    fn create_service(&self, iface: Iface, uuid: Uuid, num_handles: u16) -> Result<()>;

    /// Starts a created service.
    fn start_service(&self, svc: Handle) -> Result<()>;

    /// Adds a characteristic to a service.
    fn add_char(&self, svc: Handle, uuid: Uuid, perms: Perms, props: CharProps) -> Result<()>;

    /// Adds a descriptor to the last characteristic of a service.
    fn add_char_descr(&self, svc: Handle, uuid: Uuid, perms: Perms) -> Result<()>;

    /// Requests new connection parameters from the central.
    fn update_conn_params(&self, peer: RawAddr, p: ConnParams) -> Result<()>;

    /// Sends a response to a client request.
    fn send_response(
        &self,
        iface: Iface,
        conn: ConnId,
        trans: TransId,
        st: Status,
        val: Option<AttrValue<'_>>,
    ) -> Result<()>;
}
