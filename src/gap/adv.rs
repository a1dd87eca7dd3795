use std::time::Duration;

use structbuf::StructBuf;
use tracing::{debug, error, info, warn};

use crate::gap::{uuid16, AdvFlag, ResponseDataMut, Uuid16, LEGACY_ADV_DATA_MAX};
use crate::hci::{self, AdvParams};
use crate::host::Stack;
use crate::le::TxPower;

/// Service UUIDs advertised by default. The order matches the layout of the
/// advertised 128-bit UUID list.
pub const ADV_SERVICE_UUIDS: [Uuid16; 2] = [uuid16(0x00EE), uuid16(0x00FF)];

bitflags::bitflags! {
    /// Advertising payloads that have been submitted to the stack but not yet
    /// confirmed.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct AdvConfig: u8 {
        /// Primary advertising data.
        const ADV_DATA = 1 << 0;
        /// Scan response data.
        const SCAN_RSP = 1 << 1;
    }
}

/// Advertising readiness state.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AdvState {
    /// No configuration is in progress and advertising is not enabled.
    #[default]
    Idle,
    /// Waiting for the stack to confirm the pending payloads.
    Configuring(AdvConfig),
    /// All payloads are configured and advertising start was requested.
    StartRequested,
    /// The stack confirmed that advertising started.
    Advertising,
}

/// Primary advertising and scan response payloads.
#[derive(Clone, Debug)]
pub struct Payloads {
    pub adv_data: StructBuf,
    pub scan_rsp: StructBuf,
}

impl Payloads {
    /// Builds the payloads for a connectable peripheral. The primary payload
    /// carries flags, the device name, the preferred connection interval, and
    /// the service UUID list. The scan response carries flags, the device name,
    /// TX power, and the service UUID list.
    #[must_use]
    pub fn new(name: &str, tx_power: TxPower, uuids: &[Uuid16]) -> Self {
        let flags = AdvFlag::LE_GENERAL | AdvFlag::NO_BREDR;
        let mut adv = ResponseDataMut::new();
        adv.flags(flags)
            .local_name(true, name)
            .peripheral_connection_interval(
                Some(Duration::from_micros(7500)),
                Some(Duration::from_millis(20)),
            )
            .service_class128(true, uuids);
        let mut rsp = ResponseDataMut::new();
        rsp.flags(flags)
            .local_name(true, name)
            .tx_power(tx_power)
            .service_class128(true, uuids);
        Self {
            adv_data: adv.get(),
            scan_rsp: rsp.get(),
        }
    }
}

/// Advertising readiness tracker. Advertising is started exactly once per
/// configuration cycle, when the stack has confirmed every payload that was
/// submitted by [`begin_configuration`](Self::begin_configuration).
#[derive(Debug)]
pub struct Advertiser {
    payloads: Payloads,
    params: AdvParams,
    state: AdvState,
}

impl Advertiser {
    /// Creates an idle advertiser.
    #[must_use]
    pub fn new(payloads: Payloads, params: AdvParams) -> Self {
        for (what, n) in [
            ("Advertising data", payloads.adv_data.len()),
            ("Scan response", payloads.scan_rsp.len()),
        ] {
            if n > LEGACY_ADV_DATA_MAX {
                warn!("{what} is {n} bytes, which exceeds the legacy advertising limit");
            }
        }
        if !params.is_valid() {
            warn!("Advertising parameters may be rejected: {params:?}");
        }
        Self {
            payloads,
            params,
            state: AdvState::Idle,
        }
    }

    /// Returns the current state.
    #[inline(always)]
    #[must_use]
    pub const fn state(&self) -> AdvState {
        self.state
    }

    /// Returns the payloads that have not been confirmed by the stack.
    #[inline]
    #[must_use]
    pub const fn pending(&self) -> AdvConfig {
        match self.state {
            AdvState::Configuring(p) => p,
            _ => AdvConfig::empty(),
        }
    }

    /// Returns the advertising parameters.
    #[inline(always)]
    #[must_use]
    pub const fn params(&self) -> &AdvParams {
        &self.params
    }

    /// Submits both payloads to the stack and waits for their completion
    /// events. Calling this again re-arms both payloads.
    pub fn begin_configuration(&mut self, stack: &dyn Stack) {
        debug!("Configuring advertising data");
        self.state = AdvState::Configuring(AdvConfig::all());
        if let Err(e) = stack.config_adv_data(self.payloads.adv_data.as_ref()) {
            error!("Failed to configure advertising data: {e}");
        }
        if let Err(e) = stack.config_scan_rsp_data(self.payloads.scan_rsp.as_ref()) {
            error!("Failed to configure scan response data: {e}");
        }
    }

    /// Handles primary advertising data completion.
    #[inline]
    pub fn on_primary_config_complete(&mut self, stack: &dyn Stack, st: hci::Status) {
        self.config_complete(stack, AdvConfig::ADV_DATA, st);
    }

    /// Handles scan response data completion.
    #[inline]
    pub fn on_scan_response_config_complete(&mut self, stack: &dyn Stack, st: hci::Status) {
        self.config_complete(stack, AdvConfig::SCAN_RSP, st);
    }

    /// Handles advertising start result.
    pub fn on_advertising_start_result(&mut self, st: hci::Status) {
        if !st.is_ok() {
            error!("Advertising start failed: {st}");
            if self.state == AdvState::StartRequested {
                self.state = AdvState::Idle;
            }
            return;
        }
        info!("Advertising started");
        if self.state == AdvState::StartRequested {
            self.state = AdvState::Advertising;
        }
    }

    /// Handles advertising stop result.
    pub fn on_advertising_stop_result(&mut self, st: hci::Status) {
        if !st.is_ok() {
            error!("Advertising stop failed: {st}");
            return;
        }
        info!("Advertising stopped");
        if self.state == AdvState::Advertising {
            self.state = AdvState::Idle;
        }
    }

    /// Clears the `done` flag and starts advertising once nothing is pending.
    fn config_complete(&mut self, stack: &dyn Stack, done: AdvConfig, st: hci::Status) {
        let AdvState::Configuring(mut pending) = self.state else {
            debug!("Ignoring {done:?} completion in {:?} state", self.state);
            return;
        };
        if !pending.contains(done) {
            debug!("Ignoring duplicate {done:?} completion");
            return;
        }
        if !st.is_ok() {
            warn!("{done:?} configuration completed with {st}");
        }
        pending.remove(done);
        if !pending.is_empty() {
            self.state = AdvState::Configuring(pending);
            return;
        }
        debug!("Advertising payloads configured, starting advertising");
        self.state = AdvState::StartRequested;
        if let Err(e) = stack.start_advertising(&self.params) {
            error!("Failed to request advertising start: {e}");
        }
    }
}
