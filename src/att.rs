//! Attribute Protocol ([Vol 3] Part F) types used by the attribute server.

pub use {consts::*, handle::*, perm::*, prep::*};

mod consts;
mod handle;
mod perm;
mod prep;

/// Outcome of an attribute operation as reported to the peer. `Ok(())` maps
/// to the protocol's success status.
pub type Status = std::result::Result<(), ErrorCode>;

/// Attribute value echoed back in a response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AttrValue<'a> {
    pub hdl: Handle,
    pub off: u16,
    pub val: &'a [u8],
}

impl<'a> AttrValue<'a> {
    /// Creates a value response for handle `hdl` at offset `off`.
    #[inline]
    #[must_use]
    pub const fn new(hdl: Handle, off: u16, val: &'a [u8]) -> Self {
        Self { hdl, off, val }
    }
}
