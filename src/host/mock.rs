use parking_lot::Mutex;

use super::*;

/// Request recorded by [`MockStack`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Call {
    SetDeviceName(String),
    AppRegister(AppId),
    SetLocalMtu(u16),
    ConfigAdvData(Vec<u8>),
    ConfigScanRspData(Vec<u8>),
    StartAdvertising(AdvParams),
    CreateService(Iface, Uuid, u16),
    StartService(Handle),
    AddChar(Handle, Uuid, Perms, CharProps),
    AddCharDescr(Handle, Uuid, Perms),
    UpdateConnParams(RawAddr, ConnParams),
    SendResponse {
        iface: Iface,
        conn: ConnId,
        trans: TransId,
        st: Status,
        val: Option<(Handle, u16, Vec<u8>)>,
    },
}

/// Stack that records every request.
#[derive(Debug, Default)]
pub(crate) struct MockStack {
    calls: Mutex<Vec<Call>>,
    fail_responses: Mutex<bool>,
}

impl MockStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded requests.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Returns recorded responses.
    pub fn responses(&self) -> Vec<Call> {
        (self.calls().into_iter())
            .filter(|c| matches!(c, Call::SendResponse { .. }))
            .collect()
    }

    /// Discards recorded requests.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Makes `send_response` fail after recording the request.
    pub fn fail_responses(&self, fail: bool) {
        *self.fail_responses.lock() = fail;
    }

    fn record(&self, c: Call) -> Result<()> {
        self.calls.lock().push(c);
        Ok(())
    }
}

impl Stack for MockStack {
    fn set_device_name(&self, name: &str) -> Result<()> {
        self.record(Call::SetDeviceName(name.to_owned()))
    }

    fn app_register(&self, app: AppId) -> Result<()> {
        self.record(Call::AppRegister(app))
    }

    fn set_local_mtu(&self, mtu: u16) -> Result<()> {
        self.record(Call::SetLocalMtu(mtu))
    }

    fn config_adv_data(&self, data: &[u8]) -> Result<()> {
        self.record(Call::ConfigAdvData(data.to_vec()))
    }

    fn config_scan_rsp_data(&self, data: &[u8]) -> Result<()> {
        self.record(Call::ConfigScanRspData(data.to_vec()))
    }

    fn start_advertising(&self, p: &AdvParams) -> Result<()> {
        self.record(Call::StartAdvertising(*p))
    }

    fn create_service(&self, iface: Iface, uuid: Uuid, num_handles: u16) -> Result<()> {
        self.record(Call::CreateService(iface, uuid, num_handles))
    }

    fn start_service(&self, svc: Handle) -> Result<()> {
        self.record(Call::StartService(svc))
    }

    fn add_char(&self, svc: Handle, uuid: Uuid, perms: Perms, props: CharProps) -> Result<()> {
        self.record(Call::AddChar(svc, uuid, perms, props))
    }

    fn add_char_descr(&self, svc: Handle, uuid: Uuid, perms: Perms) -> Result<()> {
        self.record(Call::AddCharDescr(svc, uuid, perms))
    }

    fn update_conn_params(&self, peer: RawAddr, p: ConnParams) -> Result<()> {
        self.record(Call::UpdateConnParams(peer, p))
    }

    fn send_response(
        &self,
        iface: Iface,
        conn: ConnId,
        trans: TransId,
        st: Status,
        val: Option<AttrValue<'_>>,
    ) -> Result<()> {
        self.record(Call::SendResponse {
            iface,
            conn,
            trans,
            st,
            val: val.map(|v| (v.hdl, v.off, v.val.to_vec())),
        })?;
        if *self.fail_responses.lock() {
            return Err(Error::Rejected {
                op: "send_response",
                code: -1,
            });
        }
        Ok(())
    }
}
