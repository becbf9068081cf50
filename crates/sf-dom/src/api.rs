//! The host's optional global API surface.
//!
//! Presence and shape vary per deployment, so callers always reach it through
//! `Option` and treat missing entries as soft no-ops.

use std::collections::BTreeMap;

/// One function slot on the host namespace. Neutering replaces the host's
/// behavior with a no-op while keeping the slot addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionSlot {
    pub neutered: bool,
    pub invocations: u64,
}

/// Untyped host namespace: named function slots plus boolean feature flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostApiSurface {
    functions: BTreeMap<String, FunctionSlot>,
    flags: BTreeMap<String, bool>,
}

impl HostApiSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, path: &str) -> Self {
        self.functions.insert(path.to_owned(), FunctionSlot::default());
        self
    }

    pub fn with_flag(mut self, name: &str, value: bool) -> Self {
        self.flags.insert(name.to_owned(), value);
        self
    }

    /// Replaces the function with a no-op. Returns whether the slot existed.
    pub fn neuter_function(&mut self, path: &str) -> bool {
        match self.functions.get_mut(path) {
            Some(slot) => {
                slot.neutered = true;
                true
            }
            None => false,
        }
    }

    pub fn is_neutered(&self, path: &str) -> bool {
        self.functions
            .get(path)
            .is_some_and(|slot| slot.neutered)
    }

    /// Calls a host function: `Some(true)` when the host behavior ran,
    /// `Some(false)` when the slot was neutered, `None` when absent.
    pub fn invoke(&mut self, path: &str) -> Option<bool> {
        let slot = self.functions.get_mut(path)?;
        slot.invocations = slot.invocations.saturating_add(1);
        Some(!slot.neutered)
    }

    /// Writes a flag, creating it when absent (hosts treat unknown flags as
    /// configuration, not errors).
    pub fn write_flag(&mut self, name: &str, value: bool) {
        self.flags.insert(name.to_owned(), value);
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }
}
