#![allow(unused_crate_dependencies)]
#![allow(clippy::print_stdout)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::info;

use perble::att::{AttrValue, ErrorCode, Handle, Perms, Status};
use perble::gap::{self, Uuid};
use perble::gatt::{self, AppId, CharProps, ConnId, Iface, ServiceDef, TransId};
use perble::hci::{self, AdvParams};
use perble::host::{self, Stack};
use perble::le::{ConnParams, RawAddr};
use perble::{Config, Session, StackEvent};

#[derive(Clone, Debug, clap::Parser)]
struct Args {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device name override.
    #[arg(short, long)]
    name: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let mut cfg = match args.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(name) = args.name {
        cfg.device_name = name;
    }
    let (tx, rx) = mpsc::channel(64);
    let stack = Arc::new(SimStack::new(tx.clone()));
    let session = Session::new(stack, cfg);
    let a = session.add_char_service(AppId(0), ServiceDef::A)?;
    let b = session.add_char_service(AppId(1), ServiceDef::B)?;
    session.start();
    tokio::select! {
        _ = session.serve(rx) => {}
        r = central(tx, Arc::clone(&a)) => r?,
        _ = tokio::signal::ctrl_c() => return Ok(()),
    }
    println!("Service A value: {:02X?}", a.value());
    println!("Service B value: {:02X?}", b.value());
    Ok(())
}

/// Simulates a central that performs a long write to service A.
async fn central(tx: mpsc::Sender<StackEvent>, svc: Arc<gatt::CharService>) -> Result<()> {
    let chr = loop {
        if let (_, Some(chr), Some(_)) = svc.handles() {
            break chr;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    let iface_raw = SimStack::iface(AppId(0)).raw();
    let conn = ConnId(0);
    let peer = RawAddr::from([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    let send = |evt| tx.send(StackEvent::Gatts { iface_raw, evt });
    send(gatt::Event::Connect { conn, peer }).await?;
    send(gatt::Event::Mtu { conn, mtu: 185 }).await?;
    let val: Vec<u8> = (0..=255).cycle().take(600).collect();
    for (i, chunk) in val.chunks(180).enumerate() {
        let off = u16::try_from(i * 180)?;
        let w = gatt::WriteEvt {
            conn,
            trans: TransId(u32::from(off)),
            hdl: chr,
            off,
            need_rsp: true,
            is_prep: true,
            val: chunk.to_vec(),
        };
        send(gatt::Event::Write(w)).await?;
    }
    let x = gatt::ExecWriteEvt {
        conn,
        trans: TransId(1000),
        commit: true,
    };
    send(gatt::Event::ExecWrite(x)).await?;
    let r = gatt::ReadEvt {
        conn,
        trans: TransId(1001),
        hdl: chr,
        off: 590,
        is_long: true,
    };
    send(gatt::Event::Read(r)).await?;
    send(gatt::Event::Disconnect {
        conn,
        peer,
        reason: 0x13,
    })
    .await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}

/// Stack that completes every request immediately by queueing the
/// corresponding event.
#[derive(Debug)]
struct SimStack {
    tx: mpsc::Sender<StackEvent>,
    state: Mutex<SimState>,
}

#[derive(Debug)]
struct SimState {
    next_hdl: u16,
    svc_iface: BTreeMap<Handle, Iface>,
}

impl SimStack {
    fn new(tx: mpsc::Sender<StackEvent>) -> Self {
        Self {
            tx,
            state: Mutex::new(SimState {
                next_hdl: 0x28,
                svc_iface: BTreeMap::new(),
            }),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn iface(app: AppId) -> Iface {
        Iface::from_raw(3 + app.0 as u8).unwrap_or_else(|| unreachable!())
    }

    fn emit(&self, evt: StackEvent) -> host::Result<()> {
        (self.tx.try_send(evt)).map_err(|_| host::Error::NotEnabled)
    }

    fn gatts(&self, iface: Iface, evt: gatt::Event) -> host::Result<()> {
        self.emit(StackEvent::Gatts {
            iface_raw: iface.raw(),
            evt,
        })
    }

    fn alloc(&self, n: u16) -> host::Result<Handle> {
        let mut st = self.state.lock();
        let h = Handle::new(st.next_hdl).ok_or(host::Error::InvalidArg("handle"))?;
        st.next_hdl = (st.next_hdl.checked_add(n))
            .ok_or(host::Error::InvalidArg("num_handles"))?;
        Ok(h)
    }

    fn svc_iface(&self, svc: Handle) -> host::Result<Iface> {
        (self.state.lock().svc_iface.get(&svc).copied()).ok_or(host::Error::InvalidArg("svc"))
    }
}

impl Stack for SimStack {
    fn set_device_name(&self, name: &str) -> host::Result<()> {
        info!("Device name: {name}");
        Ok(())
    }

    fn app_register(&self, app: AppId) -> host::Result<()> {
        let evt = gatt::Event::Register {
            status: Ok(()),
            app,
        };
        self.gatts(Self::iface(app), evt)
    }

    fn set_local_mtu(&self, mtu: u16) -> host::Result<()> {
        info!("Local MTU: {mtu}");
        Ok(())
    }

    fn config_adv_data(&self, data: &[u8]) -> host::Result<()> {
        info!("Advertising data: {data:02X?}");
        let status = hci::Status::Success;
        self.emit(StackEvent::Gap(gap::Event::AdvDataSet { status }))
    }

    fn config_scan_rsp_data(&self, data: &[u8]) -> host::Result<()> {
        info!("Scan response: {data:02X?}");
        let status = hci::Status::Success;
        self.emit(StackEvent::Gap(gap::Event::ScanRspDataSet { status }))
    }

    fn start_advertising(&self, p: &AdvParams) -> host::Result<()> {
        info!("Advertising every {:?}", p.interval());
        let status = hci::Status::Success;
        self.emit(StackEvent::Gap(gap::Event::AdvStart { status }))
    }

    fn create_service(&self, iface: Iface, uuid: Uuid, num_handles: u16) -> host::Result<()> {
        let svc = self.alloc(num_handles)?;
        self.state.lock().svc_iface.insert(svc, iface);
        let evt = gatt::Event::CreateService {
            status: Ok(()),
            svc,
            uuid,
        };
        self.gatts(iface, evt)
    }

    fn start_service(&self, svc: Handle) -> host::Result<()> {
        let evt = gatt::Event::StartService {
            status: Ok(()),
            svc,
        };
        self.gatts(self.svc_iface(svc)?, evt)
    }

    fn add_char(&self, svc: Handle, uuid: Uuid, _: Perms, _: CharProps) -> host::Result<()> {
        // Declaration and value
        let attr = svc.next().and_then(Handle::next);
        let attr = attr.ok_or(host::Error::InvalidArg("svc"))?;
        let evt = gatt::Event::AddChar {
            status: Ok(()),
            svc,
            attr,
            uuid,
        };
        self.gatts(self.svc_iface(svc)?, evt)
    }

    fn add_char_descr(&self, svc: Handle, uuid: Uuid, _: Perms) -> host::Result<()> {
        let attr = (u16::from(svc).checked_add(3))
            .and_then(Handle::new)
            .ok_or(host::Error::InvalidArg("svc"))?;
        let evt = gatt::Event::AddDescr {
            status: Ok(()),
            svc,
            attr,
            uuid,
        };
        self.gatts(self.svc_iface(svc)?, evt)
    }

    fn update_conn_params(&self, peer: RawAddr, p: ConnParams) -> host::Result<()> {
        self.emit(StackEvent::Gap(gap::Event::ConnParamsUpdate {
            status: hci::Status::Success,
            peer,
            int_min: p.int_min,
            int_max: p.int_max,
            int: p.int_max,
            latency: p.latency,
            timeout: p.timeout,
        }))
    }

    fn send_response(
        &self,
        iface: Iface,
        conn: ConnId,
        trans: TransId,
        st: Status,
        val: Option<AttrValue<'_>>,
    ) -> host::Result<()> {
        let code = ErrorCode::raw(st);
        match val {
            Some(v) => info!(
                "{iface} {conn} {trans}: status {code:#04X}, {} bytes at {} of {}",
                v.val.len(),
                v.off,
                v.hdl
            ),
            None => info!("{iface} {conn} {trans}: status {code:#04X}"),
        }
        Ok(())
    }
}
