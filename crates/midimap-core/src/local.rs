//! In-process mapping network.
//!
//! Each endpoint registers as a named device; published updates are forwarded
//! along path-prefix routes into the inboxes of other devices' input signals.

use crate::error::{Error, Result};
use crate::network::{SignalEndpoint, SignalNetwork, SignalUpdate, UpdateBatch};
use crate::topology::{SignalDirection, SignalSpec};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Forward every update published under `from` to the same relative path
/// under `to`.
///
/// `from = "/Keyboard.1"`, `to = "/Synth.1"` maps a whole device;
/// `from = "/Keyboard.1/channel.1"`, `to = "/Synth.1/channel.10"` moves one
/// channel onto another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub from: String,
    pub to: String,
}

impl Route {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Destination path for `full_path`, if this route covers it.
    pub fn apply(&self, full_path: &str) -> Option<String> {
        let rest = full_path.strip_prefix(self.from.as_str())?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        Some(format!("{}{}", self.to, rest))
    }
}

struct DeviceEntry {
    direction: SignalDirection,
    inputs: HashSet<String>,
    inbox: Sender<SignalUpdate>,
}

#[derive(Default)]
struct NetworkInner {
    devices: HashMap<String, DeviceEntry>,
    ordinals: HashMap<String, u32>,
    routes: Vec<Route>,
    monitors: Vec<Sender<(String, SignalUpdate)>>,
}

impl NetworkInner {
    fn deliver(&self, full_path: &str, update: &SignalUpdate) -> Result<()> {
        let (device, path) = split_device(full_path)
            .ok_or_else(|| Error::UnknownSignal(full_path.to_string()))?;
        let entry = self
            .devices
            .get(device)
            .ok_or_else(|| Error::UnknownDevice(device.to_string()))?;
        if !entry.inputs.contains(path) {
            return Err(Error::UnknownSignal(full_path.to_string()));
        }
        let forwarded = SignalUpdate {
            path: path.to_string(),
            ..update.clone()
        };
        // The endpoint may be mid-teardown; nothing to deliver to then.
        let _ = entry.inbox.send(forwarded);
        Ok(())
    }
}

/// Split `/Device.1/channel.1/note/pitch` into `("Device.1", "/channel.1/note/pitch")`.
fn split_device(full_path: &str) -> Option<(&str, &str)> {
    let rest = full_path.strip_prefix('/')?;
    let slash = rest.find('/')?;
    Some((&rest[..slash], &rest[slash..]))
}

/// Shared in-process network. Clone is cheap (Arc internally).
#[derive(Clone, Default)]
pub struct LocalNetwork {
    inner: Arc<Mutex<NetworkInner>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routes(routes: impl IntoIterator<Item = Route>) -> Self {
        let network = Self::new();
        network.inner.lock().routes.extend(routes);
        network
    }

    pub fn add_route(&self, route: Route) {
        debug!("Route {} -> {}", route.from, route.to);
        self.inner.lock().routes.push(route);
    }

    pub fn routes(&self) -> Vec<Route> {
        self.inner.lock().routes.clone()
    }

    /// Names of registered devices, sorted.
    pub fn devices(&self) -> Vec<String> {
        let mut names: Vec<_> = self.inner.lock().devices.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn device_direction(&self, name: &str) -> Option<SignalDirection> {
        self.inner.lock().devices.get(name).map(|d| d.direction)
    }

    /// Deliver an update straight to a device's input signal, e.g.
    /// `/Synth.1/channel.1/note/velocity`.
    pub fn inject(&self, full_path: &str, update: SignalUpdate) -> Result<()> {
        self.inner.lock().deliver(full_path, &update)
    }

    /// Receive a copy of every published update with its full path.
    pub fn monitor(&self) -> Receiver<(String, SignalUpdate)> {
        let (tx, rx) = unbounded();
        self.inner.lock().monitors.push(tx);
        rx
    }

    fn publish(&self, device: &str, batch: &UpdateBatch) {
        let mut inner = self.inner.lock();
        for update in &batch.updates {
            let full_path = format!("/{}{}", device, update.path);
            inner
                .monitors
                .retain(|monitor| monitor.send((full_path.clone(), update.clone())).is_ok());

            for route in &inner.routes {
                let Some(destination) = route.apply(&full_path) else {
                    continue;
                };
                if let Err(e) = inner.deliver(&destination, update) {
                    debug!("Route {} -> {}: {}", full_path, destination, e);
                }
            }
        }
    }

    fn unregister(&self, name: &str) {
        if self.inner.lock().devices.remove(name).is_some() {
            debug!("Device {} left the network", name);
        }
    }
}

impl SignalNetwork for LocalNetwork {
    fn create_endpoint(
        &self,
        base_name: &str,
        direction: SignalDirection,
        signals: &[SignalSpec],
    ) -> Box<dyn SignalEndpoint> {
        let (inbox, receiver) = unbounded();
        let mut inner = self.inner.lock();

        let ordinal = inner.ordinals.entry(base_name.to_string()).or_insert(0);
        *ordinal += 1;
        let name = format!("{}.{}", base_name, ordinal);

        let inputs = signals
            .iter()
            .filter(|spec| spec.direction == SignalDirection::Input)
            .map(|spec| spec.path.clone())
            .collect();
        inner.devices.insert(
            name.clone(),
            DeviceEntry {
                direction,
                inputs,
                inbox,
            },
        );
        debug!("Device {} joined the network ({} signals)", name, signals.len());

        Box::new(LocalEndpoint {
            name,
            network: self.clone(),
            inbox: receiver,
        })
    }
}

impl std::fmt::Debug for LocalNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LocalNetwork")
            .field("num_devices", &inner.devices.len())
            .field("num_routes", &inner.routes.len())
            .finish()
    }
}

/// Endpoint handed to a bridge. Leaves the network when dropped.
pub struct LocalEndpoint {
    name: String,
    network: LocalNetwork,
    inbox: Receiver<SignalUpdate>,
}

impl SignalEndpoint for LocalEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, batch: &UpdateBatch) {
        self.network.publish(&self.name, batch);
    }

    fn poll(&mut self) -> Vec<SignalUpdate> {
        self.inbox.try_iter().collect()
    }
}

impl Drop for LocalEndpoint {
    fn drop(&mut self) {
        self.network.unregister(&self.name);
    }
}
