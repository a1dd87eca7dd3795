use std::sync::Arc;

use matches::assert_matches;

use crate::att::Handle;
use crate::host::mock::{Call, MockStack};
use crate::le::RawAddr;

use super::*;

fn iface(v: u8) -> Option<Iface> {
    Iface::from_raw(v)
}

/// Registers services A and B and binds them to interfaces 3 and 4.
fn registry() -> (Registry, Arc<CharService>, Arc<CharService>) {
    let r = Registry::new();
    let a = Arc::new(CharService::new(AppId(0), ServiceDef::A));
    let b = Arc::new(CharService::new(AppId(1), ServiceDef::B));
    r.register(AppId(0), a.clone()).unwrap();
    r.register(AppId(1), b.clone()).unwrap();
    assert!(r.on_registration_result(AppId(0), iface(3), Ok(())));
    assert!(r.on_registration_result(AppId(1), iface(4), Ok(())));
    (r, a, b)
}

#[test]
fn registration_routes_to_owner() {
    let s = MockStack::new();
    let (r, ..) = registry();
    let evt = Event::Register {
        status: Ok(()),
        app: AppId(1),
    };
    assert_eq!(r.dispatch(&s, iface(4), &evt), 1);
    assert_eq!(
        s.calls(),
        [Call::CreateService(
            Iface::from_raw(4).unwrap(),
            ServiceDef::B.uuid.as_uuid(),
            ServiceDef::B.num_handles
        )]
    );
}

#[test]
fn broadcast_reaches_every_service_once() {
    let s = MockStack::new();
    let (r, a, b) = registry();
    let evt = Event::Connect {
        conn: ConnId(5),
        peer: RawAddr::from([6, 5, 4, 3, 2, 1]),
    };
    assert_eq!(r.dispatch(&s, None, &evt), 2);
    assert_eq!(a.conns(), 1);
    assert_eq!(b.conns(), 1);
    // Only service A asks for new connection parameters
    let n = (s.calls().iter())
        .filter(|c| matches!(c, Call::UpdateConnParams(..)))
        .count();
    assert_eq!(n, 1);
}

#[test]
fn unknown_iface_is_dropped() {
    let s = MockStack::new();
    let (r, a, b) = registry();
    let evt = Event::Connect {
        conn: ConnId(0),
        peer: RawAddr::default(),
    };
    assert_eq!(r.dispatch(&s, iface(7), &evt), 0);
    assert_eq!((a.conns(), b.conns()), (0, 0));
    assert!(s.calls().is_empty());
}

#[test]
fn requests_are_answered_on_own_iface() {
    let s = MockStack::new();
    let (r, _, b) = registry();
    let svc = Handle::new(0x28).unwrap();
    let chr = Handle::new(0x2A).unwrap();
    let uuid = ServiceDef::B.uuid.as_uuid();
    let four = iface(4);
    r.dispatch(&s, four, &Event::CreateService { status: Ok(()), svc, uuid });
    let uuid = ServiceDef::B.char_uuid.as_uuid();
    let evt = Event::AddChar {
        status: Ok(()),
        svc,
        attr: chr,
        uuid,
    };
    r.dispatch(&s, four, &evt);
    s.clear();

    let w = WriteEvt {
        conn: ConnId(0),
        trans: TransId(1),
        hdl: chr,
        off: 0,
        need_rsp: true,
        is_prep: true,
        val: vec![0xAB; 600],
    };
    assert_eq!(r.dispatch(&s, four, &Event::Write(w.clone())), 1);
    let w = WriteEvt {
        off: 600,
        val: vec![0xCD; 424],
        ..w
    };
    r.dispatch(&s, four, &Event::Write(w));
    let x = ExecWriteEvt {
        conn: ConnId(0),
        trans: TransId(2),
        commit: true,
    };
    r.dispatch(&s, four, &Event::ExecWrite(x));

    let rsp = s.responses();
    assert_eq!(rsp.len(), 3);
    for c in &rsp {
        assert_matches!(c, Call::SendResponse { iface, st: Ok(()), .. } if iface.raw() == 4);
    }
    let v = b.value();
    assert_eq!(v.len(), 1024);
    assert!(v[..600].iter().all(|&b| b == 0xAB));
    assert!(v[600..].iter().all(|&b| b == 0xCD));
}
