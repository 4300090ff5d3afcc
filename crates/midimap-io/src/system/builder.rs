//! Midimap builder.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::MidimapConfig;
use crate::error::Result;
use crate::io::MidiBackend;
use crate::registry::DeviceRegistry;
use midimap_core::{LocalNetwork, SignalNetwork};

use super::Midimap;

#[derive(Default)]
pub struct MidimapBuilder {
    config: MidimapConfig,
    backend: Option<Box<dyn MidiBackend>>,
    network: Option<Arc<dyn SignalNetwork>>,
    discover: bool,
}

impl MidimapBuilder {
    pub fn config(mut self, config: MidimapConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to the platform backend when `midi-io` is enabled.
    pub fn backend(mut self, backend: impl MidiBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Defaults to a [`LocalNetwork`] carrying the configured routes. A
    /// network passed here is used as is; configured routes are not applied
    /// to it.
    pub fn network(mut self, network: impl SignalNetwork + 'static) -> Self {
        self.network = Some(Arc::new(network));
        self
    }

    /// Run device discovery as part of `build`.
    pub fn discover(mut self) -> Self {
        self.discover = true;
        self
    }

    pub fn build(self) -> Result<Midimap> {
        self.config.validate()?;

        let backend = match self.backend {
            Some(backend) => backend,
            None => default_backend(&self.config)?,
        };
        let network = self
            .network
            .unwrap_or_else(|| Arc::new(LocalNetwork::with_routes(self.config.routes.clone())));

        let registry = DeviceRegistry::new(
            backend,
            network,
            self.config.queue_capacity,
            self.config.encoder_options(),
        );

        let mut midimap = Midimap {
            config: self.config,
            registry,
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        if self.discover {
            midimap.discover();
        }
        Ok(midimap)
    }
}

#[cfg(feature = "midi-io")]
fn default_backend(config: &MidimapConfig) -> Result<Box<dyn MidiBackend>> {
    Ok(Box::new(crate::io::MidirBackend::new(&config.client_name)))
}

#[cfg(not(feature = "midi-io"))]
fn default_backend(_config: &MidimapConfig) -> Result<Box<dyn MidiBackend>> {
    Err(crate::error::Error::InvalidConfig(
        "no MIDI backend: enable the `midi-io` feature or supply one".into(),
    ))
}
