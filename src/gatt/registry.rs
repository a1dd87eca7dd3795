use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::{debug, error, info, trace, warn};

use crate::att::Status;
use crate::host::Stack;

use super::*;

/// Service registration entry.
#[derive(Debug)]
struct Entry {
    app: AppId,
    iface: Option<Iface>,
    svc: Arc<dyn Service>,
}

/// Service registry that binds stack-assigned interfaces to service instances
/// and routes events to them.
///
/// An interface is bound at most once, when the stack reports successful
/// registration of the corresponding application. Events that carry an
/// interface are delivered to the one service bound to it. Events without an
/// interface are delivered to every service in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<Vec<Entry>>,
}

impl Registry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unbound service entry for application `app`.
    pub fn register(&self, app: AppId, svc: Arc<dyn Service>) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.app == app) {
            return Err(Error::DuplicateApp(app));
        }
        debug!("Registered {app}: {svc:?}");
        entries.push(Entry {
            app,
            iface: None,
            svc,
        });
        Ok(())
    }

    /// Returns the number of registered services.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns whether no services are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the application identifiers in registration order.
    #[must_use]
    pub fn apps(&self) -> Vec<AppId> {
        self.entries.read().iter().map(|e| e.app).collect()
    }

    /// Handles a registration result. On success, `app` is bound to `iface`
    /// and `true` is returned to indicate that the event should be dispatched.
    /// A failed registration leaves the entry unbound.
    pub fn on_registration_result(&self, app: AppId, iface: Option<Iface>, st: Status) -> bool {
        if let Err(e) = st {
            error!("Registration of {app} failed: {e}");
            return false;
        }
        let Some(iface) = iface else {
            error!("Registration of {app} succeeded without an interface");
            return false;
        };
        let mut entries = self.entries.write();
        if let Some(other) = entries.iter().find(|e| e.iface == Some(iface)) {
            if other.app != app {
                warn!("{iface} is already bound to {}", other.app);
                return false;
            }
        }
        let Some(e) = entries.iter_mut().find(|e| e.app == app) else {
            warn!("Registration result for unknown {app}");
            return false;
        };
        match e.iface {
            None => {
                info!("{app} bound to {iface}");
                e.iface = Some(iface);
                true
            }
            Some(cur) if cur == iface => {
                debug!("Duplicate registration result for {app}");
                false
            }
            Some(cur) => {
                warn!("Ignoring {iface} for {app}, already bound to {cur}");
                false
            }
        }
    }

    /// Returns the interface bound to `app`.
    #[must_use]
    pub fn iface(&self, app: AppId) -> Option<Iface> {
        (self.entries.read().iter())
            .find(|e| e.app == app)
            .and_then(|e| e.iface)
    }

    /// Returns the application bound to `iface`.
    #[must_use]
    pub fn app(&self, iface: Iface) -> Option<AppId> {
        (self.entries.read().iter())
            .find(|e| e.iface == Some(iface))
            .map(|e| e.app)
    }

    /// Delivers an event to the service bound to `iface`, or to every service
    /// if `iface` is `None`. Handlers run after the registry lock is released.
    /// Returns the number of services that received the event.
    pub fn dispatch(&self, stack: &dyn Stack, iface: Option<Iface>, evt: &Event) -> usize {
        let targets: SmallVec<[(AppId, Option<Iface>, Arc<dyn Service>); 4]> = {
            let entries = self.entries.read();
            (entries.iter())
                .filter(|e| iface.is_none() || e.iface == iface)
                .map(|e| (e.app, e.iface, Arc::clone(&e.svc)))
                .collect()
        };
        if targets.is_empty() {
            trace!("Dropped event for unbound {iface:?}: {evt:?}");
            return 0;
        }
        for (app, iface, svc) in &targets {
            let cx = Ctx {
                stack,
                app: *app,
                iface: *iface,
            };
            svc.handle(&cx, evt);
        }
        targets.len()
    }
}
