use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::gap::{self, AdvState, Advertiser, Payloads, ADV_SERVICE_UUIDS};
use crate::gatt::{self, AppId, CharService, Iface, Registry, Service, ServiceDef};
use crate::host::Stack;

#[cfg(test)]
mod tests;

/// Event reported by the stack.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum StackEvent {
    /// Attribute server event. `iface_raw` is [`Iface::NONE_RAW`] for events
    /// that are not associated with a specific interface.
    Gatts { iface_raw: u8, evt: gatt::Event },
    /// GAP event.
    Gap(gap::Event),
}

/// Peripheral session that owns the service registry and advertising state.
/// Events must be delivered serially, either by calling
/// [`handle`](Self::handle) or via [`serve`](Self::serve).
#[derive(Debug)]
pub struct Session<T> {
    stack: Arc<T>,
    cfg: Config,
    registry: Registry,
    adv: Mutex<Advertiser>,
}

impl<T: Stack> Session<T> {
    /// Creates a new session.
    #[must_use]
    pub fn new(stack: Arc<T>, cfg: Config) -> Self {
        let payloads = Payloads::new(&cfg.device_name, cfg.tx_power, &ADV_SERVICE_UUIDS);
        let adv = Mutex::new(Advertiser::new(payloads, cfg.adv));
        Self {
            stack,
            cfg,
            registry: Registry::new(),
            adv,
        }
    }

    /// Adds a service for application `app`. Services must be added before
    /// [`start`](Self::start).
    pub fn add_service(&self, app: AppId, svc: Arc<dyn Service>) -> gatt::Result<()> {
        self.registry.register(app, svc)
    }

    /// Adds a [`CharService`] with layout `def` for application `app`, using
    /// the configured prepared write queue capacity.
    pub fn add_char_service(
        &self,
        app: AppId,
        def: ServiceDef,
    ) -> gatt::Result<Arc<CharService>> {
        let svc = CharService::new(app, def).with_prepare_limit(self.cfg.prepare_buf_max);
        let svc = Arc::new(svc);
        self.add_service(app, svc.clone())?;
        Ok(svc)
    }

    /// Sets the device name, registers all applications in the order that
    /// they were added, sets the local MTU, and submits the advertising
    /// payloads. Request failures are logged.
    pub fn start(&self) {
        info!("Starting {} with {} service(s)", self.cfg.device_name, self.registry.len());
        if let Err(e) = self.stack.set_device_name(&self.cfg.device_name) {
            warn!("Failed to set device name: {e}");
        }
        for app in self.registry.apps() {
            if let Err(e) = self.stack.app_register(app) {
                warn!("Failed to register {app}: {e}");
            }
        }
        if let Err(e) = self.stack.set_local_mtu(self.cfg.local_mtu) {
            warn!("Failed to set local MTU to {}: {e}", self.cfg.local_mtu);
        }
        self.adv.lock().begin_configuration(self.stack.as_ref());
    }

    /// Handles one stack event.
    pub fn handle(&self, evt: StackEvent) {
        match evt {
            StackEvent::Gatts { iface_raw, evt } => self.gatts(Iface::from_raw(iface_raw), &evt),
            StackEvent::Gap(evt) => self.gap(evt),
        }
    }

    /// Handles events from `rx` until the channel is closed.
    pub async fn serve(&self, mut rx: mpsc::Receiver<StackEvent>) {
        while let Some(evt) = rx.recv().await {
            self.handle(evt);
        }
        debug!("Event channel closed");
    }

    /// Returns the service registry.
    #[inline(always)]
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the current advertising state.
    #[inline]
    #[must_use]
    pub fn advertiser_state(&self) -> AdvState {
        self.adv.lock().state()
    }

    /// Returns the session configuration.
    #[inline(always)]
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.cfg
    }

    /// Returns the stack.
    #[inline(always)]
    #[must_use]
    pub const fn stack(&self) -> &Arc<T> {
        &self.stack
    }

    fn gatts(&self, iface: Option<Iface>, evt: &gatt::Event) {
        let stack = self.stack.as_ref();
        if let gatt::Event::Register { status, app } = *evt {
            if self.registry.on_registration_result(app, iface, status) {
                self.registry.dispatch(stack, iface, evt);
            }
            return;
        }
        self.registry.dispatch(stack, iface, evt);
        if matches!(evt, gatt::Event::Disconnect { .. }) && self.cfg.readvertise_on_disconnect {
            let mut adv = self.adv.lock();
            // Every bound interface reports the same disconnect
            if !matches!(adv.state(), AdvState::Configuring(_) | AdvState::StartRequested) {
                info!("Restarting advertising");
                adv.begin_configuration(stack);
            }
        }
    }

    fn gap(&self, evt: gap::Event) {
        let stack = self.stack.as_ref();
        match evt {
            gap::Event::AdvDataSet { status } => {
                self.adv.lock().on_primary_config_complete(stack, status);
            }
            gap::Event::ScanRspDataSet { status } => {
                self.adv.lock().on_scan_response_config_complete(stack, status);
            }
            gap::Event::AdvStart { status } => self.adv.lock().on_advertising_start_result(status),
            gap::Event::AdvStop { status } => self.adv.lock().on_advertising_stop_result(status),
            gap::Event::ConnParamsUpdate {
                status,
                peer,
                int_min,
                int_max,
                int,
                latency,
                timeout,
            } => {
                if status.is_ok() {
                    info!(
                        "Connection parameters for {peer}: interval {int} ({int_min}-{int_max}), \
                         latency {latency}, timeout {timeout}"
                    );
                } else {
                    warn!("Connection parameter update for {peer} failed: {status}");
                }
            }
            gap::Event::PktLength {
                status,
                rx_len,
                tx_len,
            } => {
                if status.is_ok() {
                    info!("Packet length: rx {rx_len}, tx {tx_len}");
                } else {
                    warn!("Packet length update failed: {status}");
                }
            }
        }
    }
}
