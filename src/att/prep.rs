use tracing::{debug, error};

use super::{ErrorCode, Handle, Status, PREPARE_BUF_MAX_SIZE};

/// Prepared write queue for one client transaction
/// ([Vol 3] Part F, Section 3.4.6).
///
/// Fragments are copied into a zero-initialized region of `cap` bytes that is
/// allocated when the first fragment is accepted. The queued value length is
/// the high-water mark of all accepted fragments, so fragments may arrive in
/// any order and overlapping fragments overwrite each other (last write wins).
/// The storage is released by [`PrepareBuf::execute`] or when the queue is
/// dropped.
#[derive(Debug)]
pub struct PrepareBuf {
    buf: Option<Vec<u8>>,
    len: usize,
    hdl: Option<Handle>,
    cap: usize,
}

impl PrepareBuf {
    /// Creates an empty queue with the default capacity.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::with_capacity(PREPARE_BUF_MAX_SIZE)
    }

    /// Creates an empty queue that accepts values of up to `cap` bytes.
    #[inline]
    #[must_use]
    pub const fn with_capacity(cap: usize) -> Self {
        Self {
            buf: None,
            len: 0,
            hdl: None,
            cap,
        }
    }

    /// Returns the maximum queued value length.
    #[inline(always)]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Returns the current queued value length.
    #[inline(always)]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns whether nothing has been queued.
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns whether queue storage is currently allocated.
    #[inline(always)]
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.buf.is_some()
    }

    /// Validates a fragment of `n` bytes at offset `off` against the queue
    /// capacity.
    pub const fn check(&self, off: usize, n: usize) -> Status {
        if off > self.cap {
            Err(ErrorCode::InvalidOffset)
        } else if n > self.cap - off {
            Err(ErrorCode::InvalidAttributeValueLength)
        } else {
            Ok(())
        }
    }

    /// Allocates queue storage if this is the first fragment of the
    /// transaction.
    pub fn reserve(&mut self) -> Status {
        if self.buf.is_some() {
            return Ok(());
        }
        let mut v = Vec::new();
        if v.try_reserve_exact(self.cap).is_err() {
            error!("Failed to allocate {} byte prepare queue", self.cap);
            return Err(ErrorCode::NoResources);
        }
        v.resize(self.cap, 0);
        self.buf = Some(v);
        self.len = 0;
        Ok(())
    }

    /// Copies an accepted fragment into the queue. The fragment must have
    /// passed [`check`](Self::check) and storage must have been reserved.
    pub fn put(&mut self, hdl: Handle, off: usize, val: &[u8]) -> Status {
        self.check(off, val.len())?;
        let Some(buf) = self.buf.as_mut() else {
            return Err(ErrorCode::UnlikelyError);
        };
        buf[off..off + val.len()].copy_from_slice(val);
        self.len = self.len.max(off + val.len());
        if self.hdl.is_none() {
            self.hdl = Some(hdl);
        } else if self.hdl != Some(hdl) {
            debug!("Prepared write for {hdl} queued with {:?}", self.hdl);
        }
        Ok(())
    }

    /// Validates, reserves, and copies a fragment in one step.
    #[inline]
    pub fn prepare(&mut self, hdl: Handle, off: usize, val: &[u8]) -> Status {
        self.check(off, val.len())?;
        self.reserve()?;
        self.put(hdl, off, val)
    }

    /// Completes the transaction. If `commit` is `true`, the queued value is
    /// returned, otherwise it is discarded. The storage is released and the
    /// length reset in both cases. Calling this without any queued fragments,
    /// or more than once, is a no-op that returns `None`.
    pub fn execute(&mut self, commit: bool) -> Option<Committed> {
        let len = std::mem::take(&mut self.len);
        let hdl = self.hdl.take();
        let mut buf = self.buf.take()?;
        if !commit {
            return None;
        }
        buf.truncate(len);
        buf.shrink_to_fit();
        Some(Committed {
            hdl: hdl?,
            val: buf,
        })
    }
}

impl Default for PrepareBuf {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Value produced by a committed prepared write.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Committed {
    /// Handle of the first queued fragment.
    pub hdl: Handle,
    /// Final attribute value.
    pub val: Vec<u8>,
}
