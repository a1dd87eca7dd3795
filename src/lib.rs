//! Bluetooth LE peripheral attribute-server core.
//!
//! Sits between an external BLE protocol stack and the services that a
//! peripheral exposes. The crate owns the parts of a peripheral that carry
//! state:
//!
//! * [`gap::Advertiser`] gates advertising until every advertising payload has
//!   been configured.
//! * [`gatt::Registry`] binds stack-assigned interface identifiers to service
//!   instances and routes every inbound event to the right one.
//! * [`att::PrepareBuf`] accumulates prepared (queued) writes and commits or
//!   cancels them atomically.
//!
//! Everything else (radio, link layer, MTU negotiation, encryption) is reached
//! through the [`host::Stack`] trait. [`Session`] ties the pieces together.

pub use {config::Config, session::*};

pub mod att;
pub mod config;
pub mod gap;
pub mod gatt;
pub mod hci;
pub mod host;
pub mod le;
mod session;
mod util;
