use tracing::{debug, error, warn};

use crate::att::{AttrValue, Committed, ErrorCode, PrepareBuf};

use super::*;

/// Sends responses for one client request.
#[derive(Clone, Copy, Debug)]
pub struct Responder<'a> {
    stack: &'a dyn Stack,
    iface: Iface,
    conn: ConnId,
    trans: TransId,
}

impl<'a> Responder<'a> {
    /// Creates a responder for request `trans` on connection `conn`.
    #[inline]
    #[must_use]
    pub const fn new(stack: &'a dyn Stack, iface: Iface, conn: ConnId, trans: TransId) -> Self {
        Self {
            stack,
            iface,
            conn,
            trans,
        }
    }

    /// Sends a response with status `st` and an optional value. Delivery is
    /// best effort: a failure is logged and otherwise ignored.
    pub fn send(&self, st: Status, val: Option<AttrValue<'_>>) {
        let r = (self.stack).send_response(self.iface, self.conn, self.trans, st, val);
        if let Err(e) = r {
            error!("Failed to respond to {} on {}: {e}", self.trans, self.conn);
        }
    }
}

/// Result of handling a client write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteOutcome<'a> {
    /// The value should be written to the attribute immediately.
    Apply(&'a [u8]),
    /// The fragment was added to the prepared write queue.
    Queued,
    /// The fragment was rejected and the peer was told why.
    Rejected(ErrorCode),
}

/// Handles a write request, write command, or prepared write fragment
/// ([Vol 3] Part F, Section 3.4.5 and 3.4.6).
///
/// A write command needs no response and is returned for immediate
/// application. A write request is acknowledged and returned for immediate
/// application. A prepared write fragment is validated against the queue
/// capacity and the peer receives the outcome together with an echo of the
/// handle, offset, and value. The fragment is copied into the queue only after
/// the response was sent and only if it was accepted.
pub fn write_event<'a>(
    rsp: &Responder<'_>,
    prep: &mut PrepareBuf,
    w: &'a WriteEvt,
) -> WriteOutcome<'a> {
    if !w.need_rsp {
        return WriteOutcome::Apply(&w.val);
    }
    if !w.is_prep {
        rsp.send(Ok(()), None);
        return WriteOutcome::Apply(&w.val);
    }
    let off = usize::from(w.off);
    let st = prep.check(off, w.val.len()).and_then(|_| prep.reserve());
    rsp.send(st, Some(AttrValue::new(w.hdl, w.off, &w.val)));
    if let Err(e) = st {
        warn!("Rejected prepared write of {} bytes at {off} for {}: {e}", w.val.len(), w.hdl);
        return WriteOutcome::Rejected(e);
    }
    match prep.put(w.hdl, off, &w.val) {
        Ok(()) => WriteOutcome::Queued,
        Err(e) => {
            error!("Failed to queue accepted prepared write for {}: {e}", w.hdl);
            WriteOutcome::Rejected(e)
        }
    }
}

/// Handles an execute write request ([Vol 3] Part F, Section 3.4.6.3). The
/// queue is committed or cancelled, its storage is released, and the request
/// is acknowledged. Returns the committed value, if any.
pub fn exec_write_event(
    rsp: &Responder<'_>,
    prep: &mut PrepareBuf,
    x: &ExecWriteEvt,
) -> Option<Committed> {
    let c = prep.execute(x.commit);
    match (x.commit, c.as_ref()) {
        (true, Some(c)) => debug!("Committed {} to {}: {:02x?}", c.val.len(), c.hdl, c.val),
        (true, None) => debug!("Execute write with an empty queue on {}", x.conn),
        (false, _) => debug!("Prepared write cancelled on {}", x.conn),
    }
    rsp.send(Ok(()), None);
    c
}

#[cfg(test)]
mod tests {
    use matches::assert_matches;

    use crate::att::Handle;
    use crate::host::mock::{Call, MockStack};

    use super::*;

    const IFACE: u8 = 3;
    const H: Handle = Handle::MIN;

    fn responder(s: &MockStack, trans: u32) -> Responder<'_> {
        let iface = Iface::from_raw(IFACE).unwrap();
        Responder::new(s, iface, ConnId(1), TransId(trans))
    }

    fn write(off: u16, val: &[u8], need_rsp: bool, is_prep: bool) -> WriteEvt {
        WriteEvt {
            conn: ConnId(1),
            trans: TransId(7),
            hdl: H,
            off,
            need_rsp,
            is_prep,
            val: val.to_vec(),
        }
    }

    fn exec(commit: bool) -> ExecWriteEvt {
        ExecWriteEvt {
            conn: ConnId(1),
            trans: TransId(8),
            commit,
        }
    }

    fn rsp_status(c: &Call) -> Status {
        match *c {
            Call::SendResponse { st, .. } => st,
            _ => panic!("not a response: {c:?}"),
        }
    }

    #[test]
    fn write_command() {
        let s = MockStack::new();
        let mut p = PrepareBuf::new();
        let w = write(0, &[1, 2], false, false);
        assert_eq!(write_event(&responder(&s, 7), &mut p, &w), WriteOutcome::Apply(&[1, 2]));
        assert!(s.calls().is_empty());
        assert!(!p.is_allocated());
    }

    #[test]
    fn write_request() {
        let s = MockStack::new();
        let mut p = PrepareBuf::new();
        let w = write(0, &[1, 2], true, false);
        assert_eq!(write_event(&responder(&s, 7), &mut p, &w), WriteOutcome::Apply(&[1, 2]));
        assert_eq!(
            s.calls(),
            [Call::SendResponse {
                iface: Iface::from_raw(IFACE).unwrap(),
                conn: ConnId(1),
                trans: TransId(7),
                st: Ok(()),
                val: None,
            }]
        );
        assert!(!p.is_allocated());
    }

    #[test]
    fn prepared_write_commit() {
        let s = MockStack::new();
        let mut p = PrepareBuf::new();
        let r = responder(&s, 7);
        let (a, b) = (write(0, &[0x01, 0x02], true, true), write(2, &[0x03, 0x04], true, true));
        assert_eq!(write_event(&r, &mut p, &a), WriteOutcome::Queued);
        assert_eq!(write_event(&r, &mut p, &b), WriteOutcome::Queued);
        let rsp = s.responses();
        assert_eq!(rsp.len(), 2);
        assert_matches!(
            &rsp[1],
            Call::SendResponse { st: Ok(()), val: Some((h, 2, v)), .. } if *h == H && v == &[3, 4]
        );

        s.clear();
        let c = exec_write_event(&responder(&s, 8), &mut p, &exec(true)).unwrap();
        assert_eq!(c.val, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(s.responses().len(), 1);
        assert_eq!(rsp_status(&s.responses()[0]), Ok(()));
        assert!(!p.is_allocated());
        assert!(p.is_empty());
    }

    #[test]
    fn prepared_write_cancel() {
        let s = MockStack::new();
        let mut p = PrepareBuf::new();
        let r = responder(&s, 7);
        write_event(&r, &mut p, &write(0, &[9; 4], true, true));
        assert_eq!(exec_write_event(&r, &mut p, &exec(false)), None);
        assert!(!p.is_allocated());
        assert_eq!(p.len(), 0);
        // Execute acknowledges even with nothing queued
        s.clear();
        assert_eq!(exec_write_event(&r, &mut p, &exec(true)), None);
        assert_eq!(s.responses().len(), 1);
    }

    #[test]
    fn prepared_write_bounds() {
        let s = MockStack::new();
        let mut p = PrepareBuf::new();
        let r = responder(&s, 7);
        let w = write(1020, &[0; 5], true, true);
        assert_eq!(
            write_event(&r, &mut p, &w),
            WriteOutcome::Rejected(ErrorCode::InvalidAttributeValueLength)
        );
        let w = write(1025, &[0], true, true);
        assert_eq!(
            write_event(&r, &mut p, &w),
            WriteOutcome::Rejected(ErrorCode::InvalidOffset)
        );
        // Rejected fragments are echoed and never stored
        let rsp = s.responses();
        assert_eq!(rsp.len(), 2);
        assert_matches!(
            &rsp[0],
            Call::SendResponse { val: Some((_, 1020, v)), .. } if v.len() == 5
        );
        assert!(!p.is_allocated());

        let w = write(1020, &[7; 4], true, true);
        assert_eq!(write_event(&r, &mut p, &w), WriteOutcome::Queued);
        assert_eq!(p.len(), 1024);
    }

    #[test]
    fn prepared_write_no_resources() {
        let s = MockStack::new();
        let mut p = PrepareBuf::with_capacity(usize::MAX);
        let w = write(0, &[1, 2], true, true);
        assert_eq!(
            write_event(&responder(&s, 7), &mut p, &w),
            WriteOutcome::Rejected(ErrorCode::NoResources)
        );
        let rsp = s.responses();
        assert_eq!(rsp.len(), 1);
        assert_matches!(
            &rsp[0],
            Call::SendResponse {
                st: Err(ErrorCode::NoResources),
                val: Some((h, 0, v)),
                ..
            } if *h == H && v == &[1, 2]
        );
        assert!(!p.is_allocated());
        assert_eq!(p.len(), 0);
    }

    #[test]
    fn response_failure_is_not_fatal() {
        let s = MockStack::new();
        s.fail_responses(true);
        let mut p = PrepareBuf::new();
        let r = responder(&s, 7);
        assert_eq!(write_event(&r, &mut p, &write(0, &[5], true, true)), WriteOutcome::Queued);
        let c = exec_write_event(&r, &mut p, &exec(true)).unwrap();
        assert_eq!(c.val, [5]);
        assert_eq!(s.responses().len(), 2);
    }
}
