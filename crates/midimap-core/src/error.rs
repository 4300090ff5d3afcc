//! Error types for the translation engine.
//!
//! Every variant describes a single dropped message or update. None of them is
//! fatal: callers log and continue.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("MIDI message must be 3 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Unsupported MIDI status byte {0:#04x}")]
    UnsupportedStatus(u8),

    #[error("MIDI data byte out of range: {0:#04x}")]
    InvalidDataByte(u8),

    #[error("No channel in signal name '{0}'")]
    NoChannel(String),

    #[error("Unknown signal '{0}'")]
    UnknownSignal(String),

    #[error("Signal '{path}' expects {expected} value(s), got {actual}")]
    Arity {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("Signal '{path}' has no free instance (capacity {capacity})")]
    InstancesExhausted { path: String, capacity: usize },

    #[error("Signal '{0}' is not instanced")]
    NotInstanced(String),

    #[error("Signal '{0}' is instanced and needs an instance id")]
    InstanceRequired(String),

    #[error("Unknown device '{0}'")]
    UnknownDevice(String),
}

pub type Result<T> = std::result::Result<T, Error>;
