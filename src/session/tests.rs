use matches::assert_matches;

use crate::att::{ErrorCode, Handle};
use crate::gap::AdvConfig;
use crate::gatt::{ConnId, Event, ExecWriteEvt, TransId, WriteEvt};
use crate::hci;
use crate::host::mock::{Call, MockStack};
use crate::le::RawAddr;

use super::*;

fn session() -> Session<MockStack> {
    session_with(Config::default())
}

fn session_with(cfg: Config) -> Session<MockStack> {
    let s = Session::new(Arc::new(MockStack::new()), cfg);
    s.add_char_service(AppId(0), ServiceDef::A).unwrap();
    s.add_char_service(AppId(1), ServiceDef::B).unwrap();
    s
}

fn gatts(iface_raw: u8, evt: Event) -> StackEvent {
    StackEvent::Gatts { iface_raw, evt }
}

fn register(app: u16, iface: u8) -> StackEvent {
    gatts(
        iface,
        Event::Register {
            status: Ok(()),
            app: AppId(app),
        },
    )
}

fn gap_ok(f: fn(hci::Status) -> gap::Event) -> StackEvent {
    StackEvent::Gap(f(hci::Status::Success))
}

fn adv_data(status: hci::Status) -> gap::Event {
    gap::Event::AdvDataSet { status }
}

fn scan_rsp(status: hci::Status) -> gap::Event {
    gap::Event::ScanRspDataSet { status }
}

fn adv_start(status: hci::Status) -> gap::Event {
    gap::Event::AdvStart { status }
}

fn starts(s: &Session<MockStack>) -> usize {
    (s.stack().calls().iter())
        .filter(|c| matches!(c, Call::StartAdvertising(_)))
        .count()
}

#[test]
fn start() {
    let s = session();
    s.start();
    let calls = s.stack().calls();
    assert_eq!(calls[0], Call::SetDeviceName("ESP_GATTS_DEMO".to_owned()));
    assert_eq!(calls[1], Call::AppRegister(AppId(0)));
    assert_eq!(calls[2], Call::AppRegister(AppId(1)));
    assert_eq!(calls[3], Call::SetLocalMtu(500));
    assert_matches!(calls[4], Call::ConfigAdvData(_));
    assert_matches!(calls[5], Call::ConfigScanRspData(_));
    assert_eq!(calls.len(), 6);
    assert_eq!(
        s.advertiser_state(),
        AdvState::Configuring(AdvConfig::ADV_DATA | AdvConfig::SCAN_RSP)
    );
}

#[test]
fn registration() {
    let s = session();
    s.start();
    s.stack().clear();
    s.handle(register(1, 4));
    s.handle(register(0, 3));
    assert_eq!(s.registry().iface(AppId(0)), Iface::from_raw(3));
    assert_eq!(s.registry().iface(AppId(1)), Iface::from_raw(4));
    assert_eq!(
        s.stack().calls(),
        [
            Call::CreateService(Iface::from_raw(4).unwrap(), ServiceDef::B.uuid.as_uuid(), 4),
            Call::CreateService(Iface::from_raw(3).unwrap(), ServiceDef::A.uuid.as_uuid(), 4),
        ]
    );
}

#[test]
fn duplicate_registration_creates_service_once() {
    let s = session();
    s.handle(register(0, 3));
    s.handle(register(0, 3));
    let n = (s.stack().calls().iter())
        .filter(|c| matches!(c, Call::CreateService(..)))
        .count();
    assert_eq!(n, 1);
    assert_eq!(s.registry().iface(AppId(0)), Iface::from_raw(3));
}

#[test]
fn failed_registration_is_not_dispatched() {
    let s = session();
    s.handle(gatts(
        3,
        Event::Register {
            status: Err(ErrorCode::UnlikelyError),
            app: AppId(0),
        },
    ));
    assert_eq!(s.registry().iface(AppId(0)), None);
    assert!(s.stack().calls().is_empty());

    // The other service is unaffected
    s.handle(register(1, 4));
    assert_eq!(s.registry().iface(AppId(1)), Iface::from_raw(4));
    assert_eq!(s.stack().calls().len(), 1);
}

#[test]
fn advertising_starts_once() {
    for primary_first in [true, false] {
        let s = session();
        s.start();
        let (a, b) = if primary_first {
            (adv_data as fn(_) -> _, scan_rsp as fn(_) -> _)
        } else {
            (scan_rsp as fn(_) -> _, adv_data as fn(_) -> _)
        };
        s.handle(gap_ok(a));
        assert_eq!(starts(&s), 0);
        s.handle(gap_ok(b));
        assert_eq!(starts(&s), 1);
        assert_eq!(s.advertiser_state(), AdvState::StartRequested);

        // Duplicate completions do not restart advertising
        s.handle(gap_ok(a));
        s.handle(gap_ok(b));
        assert_eq!(starts(&s), 1);

        s.handle(gap_ok(adv_start));
        assert_eq!(s.advertiser_state(), AdvState::Advertising);
        assert_eq!(
            s.stack().calls().last(),
            Some(&Call::StartAdvertising(hci::AdvParams::default()))
        );
    }
}

#[test]
fn failed_config_still_starts() {
    let s = session();
    s.start();
    s.handle(StackEvent::Gap(adv_data(hci::Status::UnspecifiedError)));
    s.handle(gap_ok(scan_rsp));
    assert_eq!(starts(&s), 1);
    s.handle(StackEvent::Gap(adv_start(hci::Status::CommandDisallowed)));
    assert_eq!(s.advertiser_state(), AdvState::Idle);
}

#[test]
fn informational_gap_events() {
    let s = session();
    s.handle(StackEvent::Gap(gap::Event::ConnParamsUpdate {
        status: hci::Status::Success,
        peer: RawAddr::default(),
        int_min: 0x10,
        int_max: 0x20,
        int: 0x18,
        latency: 0,
        timeout: 400,
    }));
    s.handle(StackEvent::Gap(gap::Event::PktLength {
        status: hci::Status::Success,
        rx_len: 251,
        tx_len: 251,
    }));
    assert!(s.stack().calls().is_empty());
    assert_eq!(s.advertiser_state(), AdvState::Idle);
}

fn advertising() -> Session<MockStack> {
    let s = session();
    s.start();
    s.handle(register(0, 3));
    s.handle(register(1, 4));
    s.handle(gap_ok(adv_data));
    s.handle(gap_ok(scan_rsp));
    s.handle(gap_ok(adv_start));
    s.stack().clear();
    s
}

#[test]
fn readvertise_on_disconnect() {
    let s = advertising();
    let peer = RawAddr::from([1, 2, 3, 4, 5, 6]);
    s.handle(gatts(3, Event::Connect { conn: ConnId(0), peer }));
    s.handle(gatts(4, Event::Connect { conn: ConnId(0), peer }));
    let disc = Event::Disconnect {
        conn: ConnId(0),
        peer,
        reason: 0x13,
    };
    s.handle(gatts(3, disc.clone()));
    s.handle(gatts(4, disc));
    let n = (s.stack().calls().iter())
        .filter(|c| matches!(c, Call::ConfigAdvData(_)))
        .count();
    assert_eq!(n, 1);
    assert_eq!(s.advertiser_state(), AdvState::Configuring(AdvConfig::all()));
    s.handle(gap_ok(adv_data));
    s.handle(gap_ok(scan_rsp));
    assert_eq!(starts(&s), 1);
}

#[test]
fn no_readvertise_when_disabled() {
    let cfg = Config {
        readvertise_on_disconnect: false,
        ..Config::default()
    };
    let s = session_with(cfg);
    s.handle(gatts(
        Iface::NONE_RAW,
        Event::Disconnect {
            conn: ConnId(0),
            peer: RawAddr::default(),
            reason: 0x08,
        },
    ));
    assert!(s.stack().calls().is_empty());
    assert_eq!(s.advertiser_state(), AdvState::Idle);
}

#[test]
fn long_write_through_session() {
    let s = advertising();
    let chr = Handle::new(0x2A).unwrap();
    let svc = Handle::new(0x28).unwrap();
    s.handle(gatts(
        3,
        Event::CreateService {
            status: Ok(()),
            svc,
            uuid: ServiceDef::A.uuid.as_uuid(),
        },
    ));
    s.handle(gatts(
        3,
        Event::AddChar {
            status: Ok(()),
            svc,
            attr: chr,
            uuid: ServiceDef::A.char_uuid.as_uuid(),
        },
    ));
    s.stack().clear();
    let w = |off: u16, val: &[u8]| WriteEvt {
        conn: ConnId(0),
        trans: TransId(u32::from(off)),
        hdl: chr,
        off,
        need_rsp: true,
        is_prep: true,
        val: val.to_vec(),
    };
    s.handle(gatts(3, Event::Write(w(0, &[1, 2]))));
    s.handle(gatts(3, Event::Write(w(2, &[3, 4]))));
    // Over the limit and rejected without affecting the queue
    s.handle(gatts(3, Event::Write(w(1020, &[0; 5]))));
    let x = ExecWriteEvt {
        conn: ConnId(0),
        trans: TransId(9),
        commit: true,
    };
    s.handle(gatts(3, Event::ExecWrite(x)));
    let rsp = s.stack().responses();
    assert_eq!(rsp.len(), 4);
    assert_matches!(
        rsp[2],
        Call::SendResponse {
            st: Err(ErrorCode::InvalidAttributeValueLength),
            ..
        }
    );
    assert_matches!(rsp[3], Call::SendResponse { st: Ok(()), val: None, .. });
}

#[tokio::test]
async fn serve() {
    let s = Arc::new(session());
    s.start();
    let (tx, rx) = mpsc::channel(4);
    let task = tokio::spawn({
        let s = Arc::clone(&s);
        async move { s.serve(rx).await }
    });
    tx.send(register(0, 3)).await.unwrap();
    tx.send(gap_ok(adv_data)).await.unwrap();
    tx.send(gap_ok(scan_rsp)).await.unwrap();
    tx.send(gap_ok(adv_start)).await.unwrap();
    drop(tx);
    task.await.unwrap();
    assert_eq!(s.registry().iface(AppId(0)), Iface::from_raw(3));
    assert_eq!(s.advertiser_state(), AdvState::Advertising);
}
