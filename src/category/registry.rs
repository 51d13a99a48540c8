//! Process-wide name lookup for categories.
//!
//! Handlers and registrations work with `&'static Category` directly; the
//! registry exists for places where only a name is at hand (for example a
//! category read from configuration or carried across an FFI boundary).

use super::{BUILTINS, Category};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Category name already registered: {name}")]
    Duplicate { name: &'static str },

    #[error("Unknown category: {name}")]
    Unknown { name: String },
}

impl RegistryError {
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::Unknown { name: name.into() }
    }
}

fn categories() -> &'static DashMap<&'static str, &'static Category> {
    static REGISTRY: OnceLock<DashMap<&'static str, &'static Category>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let map = DashMap::new();
        for category in BUILTINS {
            map.insert(category.name(), category);
        }
        map
    })
}

/// Register a category under its name.
///
/// Registering the same static twice is a no-op; registering a different
/// category under a taken name fails.
pub fn register(category: &'static Category) -> Result<(), RegistryError> {
    match categories().entry(category.name()) {
        Entry::Occupied(existing) if *existing.get() == category => Ok(()),
        Entry::Occupied(_) => Err(RegistryError::Duplicate {
            name: category.name(),
        }),
        Entry::Vacant(slot) => {
            tracing::trace!(category = category.name(), "category registered");
            slot.insert(category);
            Ok(())
        }
    }
}

pub fn lookup(name: &str) -> Option<&'static Category> {
    categories().get(name).map(|entry| *entry.value())
}

/// Snapshot of every registered category, sorted by name.
pub fn registered() -> Vec<&'static Category> {
    let mut all: Vec<_> = categories().iter().map(|entry| *entry.value()).collect();
    all.sort_by_key(|category| category.name());
    all
}
