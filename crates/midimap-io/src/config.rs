//! Bridge configuration, loadable from TOML.
//!
//! ```toml
//! client_name = "midimap"
//! queue_capacity = 1024
//! note_off_on_release = false
//!
//! [[routes]]
//! from = "/Keystation.1"
//! to = "/Synth.1"
//! ```
//!
//! Every key is optional.

use crate::error::{Error, Result};
use midimap_core::{EncoderOptions, Route};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidimapConfig {
    /// Client name registered with the platform MIDI API.
    pub client_name: String,
    /// Per-input queue between the MIDI callback and the poll loop.
    pub queue_capacity: usize,
    /// Send note-on velocity 0 when a network note instance is released.
    pub note_off_on_release: bool,
    /// Routes installed on the built-in network.
    pub routes: Vec<Route>,
}

impl Default for MidimapConfig {
    fn default() -> Self {
        Self {
            client_name: "midimap".to_string(),
            queue_capacity: 1024,
            note_off_on_release: false,
            routes: Vec::new(),
        }
    }
}

impl MidimapConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_name.trim().is_empty() {
            return Err(Error::InvalidConfig("client_name must not be empty".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be at least 1".into()));
        }
        for route in &self.routes {
            if !route.from.starts_with('/') || !route.to.starts_with('/') {
                return Err(Error::InvalidConfig(format!(
                    "route {} -> {}: paths must start with '/'",
                    route.from, route.to
                )));
            }
        }
        Ok(())
    }

    pub fn encoder_options(&self) -> EncoderOptions {
        EncoderOptions {
            note_off_on_release: self.note_off_on_release,
        }
    }
}
