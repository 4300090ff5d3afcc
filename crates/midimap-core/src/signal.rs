//! Per-bridge signal store.
//!
//! Holds the current value of every non-instanced signal and the live
//! instances of every instanced one, for all 16 channels of one direction.

use crate::error::{Error, Result};
use crate::network::{InstanceId, SignalValue};
use crate::topology::{channel_signals, SignalDirection, SignalKey, SignalSpec, INSTANCE_CAPACITY};
use smallvec::SmallVec;

/// Live instances of one instanced signal, bounded by its capacity.
#[derive(Debug, Clone)]
pub struct InstanceTable {
    capacity: usize,
    entries: SmallVec<[(InstanceId, i32); INSTANCE_CAPACITY]>,
}

impl InstanceTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: SmallVec::new(),
        }
    }

    pub fn get(&self, id: InstanceId) -> Option<i32> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == id)
            .map(|(_, value)| *value)
    }

    /// Update an existing instance or activate a new one.
    ///
    /// Returns `false` without changing anything when `id` is new and every
    /// slot is taken.
    pub fn set(&mut self, id: InstanceId, value: i32) -> bool {
        if let Some(slot) = self.entries.iter_mut().find(|(entry, _)| *entry == id) {
            slot.1 = value;
            return true;
        }
        if self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.push((id, value));
        true
    }

    /// Returns whether the instance was live.
    pub fn release(&mut self, id: InstanceId) -> bool {
        match self.entries.iter().position(|(entry, _)| *entry == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }
}

#[derive(Debug, Clone)]
enum SignalState {
    Instanced(InstanceTable),
    Single(Option<SignalValue>),
}

#[derive(Debug, Clone)]
struct Signal {
    spec: SignalSpec,
    state: SignalState,
}

/// All signals of one bridge, indexed channel-major.
#[derive(Debug, Clone)]
pub struct SignalSet {
    direction: SignalDirection,
    signals: Vec<Signal>,
}

impl SignalSet {
    pub fn new(direction: SignalDirection) -> Self {
        let signals = channel_signals(direction)
            .into_iter()
            .map(|spec| {
                let state = match spec.instances {
                    Some(capacity) => SignalState::Instanced(InstanceTable::new(capacity)),
                    None => SignalState::Single(None),
                };
                Signal { spec, state }
            })
            .collect();
        Self { direction, signals }
    }

    pub fn direction(&self) -> SignalDirection {
        self.direction
    }

    pub fn spec(&self, key: SignalKey) -> &SignalSpec {
        &self.signal(key).spec
    }

    pub fn specs(&self) -> Vec<SignalSpec> {
        self.signals.iter().map(|s| s.spec.clone()).collect()
    }

    /// Current value of an instance, `None` if it is not live.
    pub fn instance_value(&self, key: SignalKey, id: InstanceId) -> Option<i32> {
        match &self.signal(key).state {
            SignalState::Instanced(table) => table.get(id),
            SignalState::Single(_) => None,
        }
    }

    pub fn instances(&self, key: SignalKey) -> Option<&InstanceTable> {
        match &self.signal(key).state {
            SignalState::Instanced(table) => Some(table),
            SignalState::Single(_) => None,
        }
    }

    /// Write one instance, clamped to the signal's range. Returns the stored value.
    pub fn update_instance(&mut self, key: SignalKey, id: InstanceId, value: i32) -> Result<i32> {
        let signal = self.signal_mut(key);
        let value = value.clamp(signal.spec.min, signal.spec.max);
        match &mut signal.state {
            SignalState::Instanced(table) => {
                if table.set(id, value) {
                    Ok(value)
                } else {
                    Err(Error::InstancesExhausted {
                        path: signal.spec.path.clone(),
                        capacity: table.capacity(),
                    })
                }
            }
            SignalState::Single(_) => Err(Error::NotInstanced(signal.spec.path.clone())),
        }
    }

    /// Release one instance. Releasing an instance that is not live is a no-op
    /// and returns `false`.
    pub fn release_instance(&mut self, key: SignalKey, id: InstanceId) -> bool {
        match &mut self.signal_mut(key).state {
            SignalState::Instanced(table) => table.release(id),
            SignalState::Single(_) => false,
        }
    }

    pub fn value(&self, key: SignalKey) -> Option<&SignalValue> {
        match &self.signal(key).state {
            SignalState::Single(value) => value.as_ref(),
            SignalState::Instanced(_) => None,
        }
    }

    /// Write a non-instanced signal, clamped to its range. Returns the stored value.
    pub fn update(&mut self, key: SignalKey, values: &[i32]) -> Result<SignalValue> {
        let signal = self.signal_mut(key);
        if values.len() != signal.spec.arity {
            return Err(Error::Arity {
                path: signal.spec.path.clone(),
                expected: signal.spec.arity,
                actual: values.len(),
            });
        }
        let (min, max) = (signal.spec.min, signal.spec.max);
        let clamped: SignalValue = values.iter().map(|v| (*v).clamp(min, max)).collect();
        match &mut signal.state {
            SignalState::Single(value) => {
                *value = Some(clamped.clone());
                Ok(clamped)
            }
            SignalState::Instanced(_) => Err(Error::InstanceRequired(signal.spec.path.clone())),
        }
    }

    fn signal(&self, key: SignalKey) -> &Signal {
        &self.signals[key.index()]
    }

    fn signal_mut(&mut self, key: SignalKey) -> &mut Signal {
        &mut self.signals[key.index()]
    }
}
