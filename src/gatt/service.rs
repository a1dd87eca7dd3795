use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::att::{AttrValue, ErrorCode, Handle, Perms, PrepareBuf, PREPARE_BUF_MAX_SIZE};
use crate::gap::{uuid16, Uuid16};
use crate::le::ConnParams;

use super::*;

/// Layout of a service with one characteristic and one descriptor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ServiceDef {
    /// Primary service UUID.
    pub uuid: Uuid16,
    /// Characteristic UUID.
    pub char_uuid: Uuid16,
    /// Descriptor UUID.
    pub descr_uuid: Uuid16,
    /// Number of attribute handles reserved for the service.
    pub num_handles: u16,
    /// Whether to request new connection parameters when a central connects.
    pub update_conn_params: bool,
}

impl ServiceDef {
    /// First demo service.
    pub const A: Self = Self {
        uuid: uuid16(0x00FF),
        char_uuid: uuid16(0xFF01),
        descr_uuid: uuid16(0x3333),
        num_handles: 4,
        update_conn_params: true,
    };

    /// Second demo service.
    pub const B: Self = Self {
        uuid: uuid16(0x00EE),
        char_uuid: uuid16(0xEE01),
        descr_uuid: uuid16(0x2222),
        num_handles: 4,
        update_conn_params: false,
    };
}

/// Initial characteristic value.
const INIT_VALUE: [u8; 3] = [0x11, 0x22, 0x33];

/// Mutable service state.
#[derive(Debug)]
struct State {
    svc: Option<Handle>,
    chr: Option<Handle>,
    descr: Option<Handle>,
    value: Vec<u8>,
    descr_value: Vec<u8>,
    conns: BTreeMap<ConnId, PrepareBuf>,
}

impl State {
    /// Returns the value of attribute `hdl`.
    fn get(&self, hdl: Handle) -> Option<&[u8]> {
        if self.chr == Some(hdl) {
            Some(&self.value)
        } else if self.descr == Some(hdl) {
            Some(&self.descr_value)
        } else {
            None
        }
    }

    /// Replaces the value of attribute `hdl`.
    fn set(&mut self, hdl: Handle, v: &[u8]) {
        if self.chr == Some(hdl) {
            debug!("Characteristic {hdl} = {v:02x?}");
            self.value = v.to_vec();
        } else if self.descr == Some(hdl) {
            match Cccd::from_le(v) {
                Some(c) if c.is_empty() => info!("Notifications and indications disabled"),
                Some(c) => info!("Client configuration: {c:?}"),
                None => debug!("Descriptor {hdl} = {v:02x?}"),
            }
            self.descr_value = v.to_vec();
        } else {
            warn!("Write to unknown attribute {hdl}");
        }
    }
}

/// Service with one readable and writable characteristic that also accepts
/// prepared writes. The attribute table is created when the stack confirms
/// application registration.
#[derive(Debug)]
pub struct CharService {
    app: AppId,
    def: ServiceDef,
    prep_cap: usize,
    state: Mutex<State>,
}

impl CharService {
    /// Creates a service for application `app`.
    #[must_use]
    pub fn new(app: AppId, def: ServiceDef) -> Self {
        Self {
            app,
            def,
            prep_cap: PREPARE_BUF_MAX_SIZE,
            state: Mutex::new(State {
                svc: None,
                chr: None,
                descr: None,
                value: INIT_VALUE.to_vec(),
                descr_value: vec![0x00, 0x00],
                conns: BTreeMap::new(),
            }),
        }
    }

    /// Sets the prepared write queue capacity used for new connections.
    #[inline]
    #[must_use]
    pub fn with_prepare_limit(mut self, cap: usize) -> Self {
        self.prep_cap = cap;
        self
    }

    /// Returns the application identifier.
    #[inline(always)]
    #[must_use]
    pub const fn app(&self) -> AppId {
        self.app
    }

    /// Returns the service layout.
    #[inline(always)]
    #[must_use]
    pub const fn def(&self) -> &ServiceDef {
        &self.def
    }

    /// Returns the current characteristic value.
    #[must_use]
    pub fn value(&self) -> Vec<u8> {
        self.state.lock().value.clone()
    }

    /// Returns the service, characteristic, and descriptor handles.
    #[must_use]
    pub fn handles(&self) -> (Option<Handle>, Option<Handle>, Option<Handle>) {
        let st = self.state.lock();
        (st.svc, st.chr, st.descr)
    }

    /// Returns the number of connections with prepared write state.
    #[must_use]
    pub fn conns(&self) -> usize {
        self.state.lock().conns.len()
    }

    fn register(&self, cx: &Ctx<'_>) {
        let Some(iface) = cx.iface else {
            error!("{} registered without an interface", self.app);
            return;
        };
        let d = &self.def;
        info!("Creating service {} on {iface}", d.uuid);
        if let Err(e) = (cx.stack).create_service(iface, d.uuid.as_uuid(), d.num_handles) {
            error!("Failed to create service {}: {e}", d.uuid);
        }
    }

    fn service_created(&self, cx: &Ctx<'_>, svc: Handle) {
        self.state.lock().svc = Some(svc);
        info!("Service {} created at {svc}", self.def.uuid);
        if let Err(e) = cx.stack.start_service(svc) {
            error!("Failed to start service {svc}: {e}");
        }
        let props = CharProps::READ | CharProps::WRITE | CharProps::NOTIFY;
        let uuid = self.def.char_uuid.as_uuid();
        if let Err(e) = cx.stack.add_char(svc, uuid, Perms::READ_WRITE, props) {
            error!("Failed to add characteristic {uuid}: {e}");
        }
    }

    fn char_added(&self, cx: &Ctx<'_>, svc: Handle, attr: Handle) {
        self.state.lock().chr = Some(attr);
        debug!("Characteristic {} added at {attr}", self.def.char_uuid);
        let uuid = self.def.descr_uuid.as_uuid();
        if let Err(e) = cx.stack.add_char_descr(svc, uuid, Perms::READ_WRITE) {
            error!("Failed to add descriptor {uuid}: {e}");
        }
    }

    fn read(&self, rsp: &Responder<'_>, r: &ReadEvt) {
        let st = self.state.lock();
        let Some(v) = st.get(r.hdl) else {
            rsp.send(Err(ErrorCode::InvalidHandle), None);
            return;
        };
        let off = usize::from(r.off);
        if off > v.len() {
            rsp.send(Err(ErrorCode::InvalidOffset), None);
            return;
        }
        rsp.send(Ok(()), Some(AttrValue::new(r.hdl, r.off, &v[off..])));
    }

    fn write(&self, rsp: &Responder<'_>, w: &WriteEvt) {
        let mut st = self.state.lock();
        if st.get(w.hdl).is_none() {
            if w.need_rsp {
                rsp.send(Err(ErrorCode::InvalidHandle), None);
            }
            return;
        }
        let cap = self.prep_cap;
        let prep = (st.conns.entry(w.conn)).or_insert_with(|| PrepareBuf::with_capacity(cap));
        match write_event(rsp, prep, w) {
            WriteOutcome::Apply(v) => st.set(w.hdl, v),
            WriteOutcome::Queued => {
                debug!("Queued {} bytes at {} for {}", w.val.len(), w.off, w.hdl);
            }
            WriteOutcome::Rejected(_) => {}
        }
    }

    fn exec_write(&self, rsp: &Responder<'_>, x: &ExecWriteEvt) {
        let mut st = self.state.lock();
        let c = match st.conns.get_mut(&x.conn) {
            Some(prep) => exec_write_event(rsp, prep, x),
            None => exec_write_event(rsp, &mut PrepareBuf::with_capacity(0), x),
        };
        if let Some(c) = c {
            st.set(c.hdl, &c.val);
        }
    }
}

impl Service for CharService {
    fn handle(&self, cx: &Ctx<'_>, evt: &Event) {
        match *evt {
            Event::Register { status, app } => {
                if app == self.app && status.is_ok() {
                    self.register(cx);
                }
            }
            Event::CreateService { status, svc, uuid } => {
                if uuid != self.def.uuid.as_uuid() {
                    return;
                }
                match status {
                    Ok(()) => self.service_created(cx, svc),
                    Err(e) => error!("Failed to create service {uuid}: {e}"),
                }
            }
            Event::AddChar {
                status,
                svc,
                attr,
                uuid,
            } => {
                if self.state.lock().svc != Some(svc) {
                    return;
                }
                match status {
                    Ok(()) => self.char_added(cx, svc, attr),
                    Err(e) => error!("Failed to add characteristic {uuid}: {e}"),
                }
            }
            Event::AddDescr {
                status,
                svc,
                attr,
                uuid,
            } => {
                let mut st = self.state.lock();
                if st.svc != Some(svc) {
                    return;
                }
                match status {
                    Ok(()) => {
                        debug!("Descriptor {uuid} added at {attr}");
                        st.descr = Some(attr);
                    }
                    Err(e) => error!("Failed to add descriptor {uuid}: {e}"),
                }
            }
            Event::StartService { status, svc } => {
                if self.state.lock().svc != Some(svc) {
                    return;
                }
                match status {
                    Ok(()) => info!("Service {} started", self.def.uuid),
                    Err(e) => error!("Failed to start service {}: {e}", self.def.uuid),
                }
            }
            Event::Connect { conn, peer } => {
                info!("{} connected to {peer} on {conn}", self.def.uuid);
                let cap = self.prep_cap;
                (self.state.lock().conns)
                    .entry(conn)
                    .or_insert_with(|| PrepareBuf::with_capacity(cap));
                if self.def.update_conn_params {
                    if let Err(e) = cx.stack.update_conn_params(peer, ConnParams::DEFAULT_UPDATE) {
                        error!("Failed to request connection parameter update: {e}");
                    }
                }
            }
            Event::Disconnect { conn, peer, reason } => {
                info!("{peer} disconnected from {} ({reason:#04X})", self.def.uuid);
                if let Some(prep) = self.state.lock().conns.remove(&conn) {
                    if prep.is_allocated() {
                        debug!("Cancelled {} byte prepared write on {conn}", prep.len());
                    }
                }
            }
            Event::Mtu { conn, mtu } => debug!("MTU on {conn} is {mtu}"),
            Event::Read(ref r) => {
                if let Some(rsp) = self.responder(cx, r.conn, r.trans) {
                    self.read(&rsp, r);
                }
            }
            Event::Write(ref w) => {
                if let Some(rsp) = self.responder(cx, w.conn, w.trans) {
                    self.write(&rsp, w);
                }
            }
            Event::ExecWrite(ref x) => {
                if let Some(rsp) = self.responder(cx, x.conn, x.trans) {
                    self.exec_write(&rsp, x);
                }
            }
        }
    }
}

impl CharService {
    fn responder<'a>(&self, cx: &Ctx<'a>, conn: ConnId, trans: TransId) -> Option<Responder<'a>> {
        let Some(iface) = cx.iface else {
            warn!("{} received a request without an interface", self.app);
            return None;
        };
        Some(Responder::new(cx.stack, iface, conn, trans))
    }
}
