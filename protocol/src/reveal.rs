//! Reveal state machine.
//!
//! One slot per (contract, owner) pair. A slot's plaintext is only ever
//! observable while the handle it was decrypted from is still the slot's
//! current handle; the instant the tracker reports a different handle the
//! resolution is discarded, because the old plaintext no longer corresponds
//! to the on-chain balance it was derived from.

use crate::handle::CiphertextHandle;
use alloy_primitives::{Address, U256};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub contract: Address,
    pub owner: Address,
}

impl SlotKey {
    pub fn new(contract: Address, owner: Address) -> Self {
        Self { contract, owner }
    }
}

/// Decrypted value as returned by the relayer: a numeric amount for the
/// integer FHE types, an opaque string for everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plaintext {
    Uint(U256),
    Str(String),
}

impl Plaintext {
    /// Relayer results arrive as strings; decimal digit strings are numeric
    /// amounts, anything else passes through opaquely.
    pub fn parse(value: &str) -> Self {
        if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
            match U256::from_str_radix(value, 10) {
                Ok(v) => return Plaintext::Uint(v),
                Err(_) => return Plaintext::Str(value.to_string()),
            }
        }
        Plaintext::Str(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    /// No balance was ever observed for this slot; nothing to reveal.
    NoHandle,
    /// A handle is known but its plaintext is not.
    Encrypted,
    /// A decrypt request covering this slot is in flight.
    Revealing,
    /// Plaintext is available and tied to the slot's current handle.
    Revealed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Resolution {
    handle: CiphertextHandle,
    plaintext: Plaintext,
}

#[derive(Debug, Clone, Default)]
struct RevealSlot {
    current: Option<CiphertextHandle>,
    revealing: bool,
    resolution: Option<Resolution>,
}

impl RevealSlot {
    fn state(&self) -> RevealState {
        match (&self.current, self.revealing, &self.resolution) {
            (None, _, _) => RevealState::NoHandle,
            (Some(_), true, _) => RevealState::Revealing,
            (Some(current), false, Some(resolution)) if resolution.handle == *current => {
                RevealState::Revealed
            }
            _ => RevealState::Encrypted,
        }
    }
}

/// Tracks reveal state and resolution records for every observed slot.
#[derive(Debug, Default)]
pub struct RevealLedger {
    slots: HashMap<SlotKey, RevealSlot>,
}

impl RevealLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a tracker observation. Returns true when the slot's handle
    /// actually changed, which also discards any resolution computed against
    /// the previous handle and cancels an in-flight reveal at the data layer.
    pub fn observe(&mut self, key: SlotKey, handle: CiphertextHandle) -> bool {
        let slot = self.slots.entry(key).or_default();
        let incoming = handle.is_initialized().then_some(handle);
        if slot.current == incoming {
            return false;
        }
        slot.current = incoming;
        slot.revealing = false;
        slot.resolution = None;
        true
    }

    pub fn state(&self, key: &SlotKey) -> RevealState {
        self.slots
            .get(key)
            .map(RevealSlot::state)
            .unwrap_or(RevealState::NoHandle)
    }

    pub fn current_handle(&self, key: &SlotKey) -> Option<CiphertextHandle> {
        self.slots.get(key).and_then(|slot| slot.current)
    }

    /// The plaintext for a slot, observable only while the resolution's
    /// handle equals the slot's current handle.
    pub fn plaintext(&self, key: &SlotKey) -> Option<&Plaintext> {
        let slot = self.slots.get(key)?;
        let current = slot.current.as_ref()?;
        match &slot.resolution {
            Some(resolution) if resolution.handle == *current => Some(&resolution.plaintext),
            _ => None,
        }
    }

    /// A slot is actionable for reveal only while it holds a handle that is
    /// neither being revealed nor already resolved.
    pub fn can_reveal(&self, key: &SlotKey) -> bool {
        self.state(key) == RevealState::Encrypted
    }

    /// Move every actionable slot among `keys` to `Revealing` and return the
    /// (slot, handle) pairs a decrypt request should cover. Slots without a
    /// handle, already busy, or already resolved for their current handle are
    /// skipped, so repeating a reveal never issues a redundant request.
    pub fn begin_reveal(&mut self, keys: &[SlotKey]) -> Vec<(SlotKey, CiphertextHandle)> {
        let mut started = Vec::new();
        for key in keys {
            if !self.can_reveal(key) {
                continue;
            }
            if let Some(slot) = self.slots.get_mut(key) {
                if let Some(handle) = slot.current {
                    slot.revealing = true;
                    started.push((*key, handle));
                }
            }
        }
        started
    }

    /// Apply a decrypt result set keyed by handle. Only slots whose *current*
    /// handle appears in the results resolve; a result for a handle that has
    /// been superseded in the meantime matches nothing and is dropped
    /// silently. Returns the number of slots resolved.
    pub fn apply_results(&mut self, results: &HashMap<CiphertextHandle, Plaintext>) -> usize {
        let mut resolved = 0;
        for slot in self.slots.values_mut() {
            let Some(current) = slot.current else {
                continue;
            };
            if !slot.revealing {
                continue;
            }
            if let Some(plaintext) = results.get(&current) {
                slot.resolution = Some(Resolution {
                    handle: current,
                    plaintext: plaintext.clone(),
                });
                slot.revealing = false;
                resolved += 1;
            }
        }
        resolved
    }

    /// Close out a finished decrypt request: any requested slot still marked
    /// busy (its handle was missing from the result set, or the whole request
    /// failed) falls back to `Encrypted`.
    pub fn settle_reveal(&mut self, keys: &[SlotKey]) {
        for key in keys {
            if let Some(slot) = self.slots.get_mut(key) {
                slot.revealing = false;
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &SlotKey> {
        self.slots.keys()
    }
}
