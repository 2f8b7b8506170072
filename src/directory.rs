//! Upstream identity and property lookups, consumed read-only.
//!
//! The rent subsystem does not own users, properties, or units; it only
//! needs existence and ownership checks when a contract is created.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::types::{LandlordId, PropertyId, TenantId, UnitId};

/// read-only view over the user/property registry
pub trait PartyDirectory: Send + Sync {
    fn is_tenant(&self, id: TenantId) -> bool;
    fn is_landlord(&self, id: LandlordId) -> bool;
    /// landlord who owns the property, if it exists
    fn property_owner(&self, id: PropertyId) -> Option<LandlordId>;
    fn unit_in_property(&self, unit: UnitId, property: PropertyId) -> bool;
}

/// in-memory directory for tests and embedded use
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: Mutex<DirectoryState>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    tenants: HashSet<TenantId>,
    landlords: HashSet<LandlordId>,
    properties: HashMap<PropertyId, LandlordId>,
    units: HashMap<UnitId, PropertyId>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tenant(&self, id: TenantId) {
        if let Ok(mut state) = self.inner.lock() {
            state.tenants.insert(id);
        }
    }

    pub fn register_landlord(&self, id: LandlordId) {
        if let Ok(mut state) = self.inner.lock() {
            state.landlords.insert(id);
        }
    }

    pub fn register_property(&self, id: PropertyId, owner: LandlordId) {
        if let Ok(mut state) = self.inner.lock() {
            state.properties.insert(id, owner);
        }
    }

    pub fn register_unit(&self, id: UnitId, property: PropertyId) {
        if let Ok(mut state) = self.inner.lock() {
            state.units.insert(id, property);
        }
    }
}

impl PartyDirectory for InMemoryDirectory {
    fn is_tenant(&self, id: TenantId) -> bool {
        self.inner
            .lock()
            .map(|state| state.tenants.contains(&id))
            .unwrap_or(false)
    }

    fn is_landlord(&self, id: LandlordId) -> bool {
        self.inner
            .lock()
            .map(|state| state.landlords.contains(&id))
            .unwrap_or(false)
    }

    fn property_owner(&self, id: PropertyId) -> Option<LandlordId> {
        self.inner
            .lock()
            .ok()
            .and_then(|state| state.properties.get(&id).copied())
    }

    fn unit_in_property(&self, unit: UnitId, property: PropertyId) -> bool {
        self.inner
            .lock()
            .map(|state| state.units.get(&unit) == Some(&property))
            .unwrap_or(false)
    }
}
