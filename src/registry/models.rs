// SPDX-License-Identifier: GPL-3.0-only
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::context::OpContext;
use crate::registry::error::{RegistryError, RegistryResult};

/// Expected number of distinct suppliers delivering to one warehouse
const INITIAL_WAREHOUSE_SUPPLIERS: usize = 256;

/// Coordinate pair shared by suppliers and warehouses.
///
/// Always replaced as a whole, never field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub latitude: u32,
    pub longitude: u32,
}

impl Location {
    #[cfg(test)]
    pub fn new(latitude: u32, longitude: u32) -> Self {
        Self { latitude, longitude }
    }
}

/// One cargo unit's current position
#[derive(Debug)]
pub struct Supplier {
    location: RwLock<Location>,
}

impl Supplier {
    pub fn new(location: Location) -> Self {
        Self {
            location: RwLock::new(location),
        }
    }

    pub fn location(&self) -> Location {
        *self.location.read()
    }

    pub fn set_location(&self, location: Location) {
        *self.location.write() = location;
    }
}

/// A delivery destination.
///
/// `location` is pinned at creation. `units_received` is a lock-free
/// counter. `suppliers` is this warehouse's own record of the units that
/// delivered here, independent of the registry's top-level suppliers.
#[derive(Debug)]
pub struct Warehouse {
    id: i64,
    location: Location,
    units_received: AtomicU64,
    suppliers: RwLock<HashMap<i64, Arc<Supplier>>>,
}

impl Warehouse {
    pub fn new(id: i64, location: Location) -> Self {
        Self {
            id,
            location,
            units_received: AtomicU64::new(0),
            suppliers: RwLock::new(HashMap::with_capacity(INITIAL_WAREHOUSE_SUPPLIERS)),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn add_unit(&self) -> u64 {
        self.units_received.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn units_received(&self) -> u64 {
        self.units_received.load(Ordering::Acquire)
    }

    pub fn supplier_count(&self) -> usize {
        self.suppliers.read().len()
    }

    /// Insert `supplier_id` at `location` unless it is already known.
    ///
    /// Returns `true` when a new record was created. Holds the collection's
    /// write lock only for the entry insert.
    pub fn ensure_supplier(&self, supplier_id: i64, location: Location) -> bool {
        let mut suppliers = self.suppliers.write();
        if suppliers.contains_key(&supplier_id) {
            return false;
        }
        suppliers.insert(supplier_id, Arc::new(Supplier::new(location)));
        true
    }

    fn supplier(&self, supplier_id: i64) -> Option<Arc<Supplier>> {
        self.suppliers.read().get(&supplier_id).cloned()
    }

    #[cfg(test)]
    pub fn supplier_location(&self, supplier_id: i64) -> Option<Location> {
        self.supplier(supplier_id).map(|s| s.location())
    }

    pub fn set_supplier_location(&self, supplier_id: i64, location: Location) -> RegistryResult<()> {
        let supplier = self
            .supplier(supplier_id)
            .ok_or(RegistryError::SupplierNotFound {
                warehouse_id: self.id,
                supplier_id,
            })?;
        supplier.set_location(location);
        Ok(())
    }

    /// Project the nested suppliers into owned views.
    ///
    /// Checks `ctx` before every entry; a cancellation discards the partial list.
    pub fn supplier_views(&self, ctx: &OpContext) -> RegistryResult<Vec<SupplierView>> {
        let suppliers = self.suppliers.read();
        let mut views = Vec::with_capacity(suppliers.len());
        for (&supplier_id, supplier) in suppliers.iter() {
            ctx.check()?;
            views.push(SupplierView {
                supplier_id,
                location: supplier.location(),
            });
        }
        Ok(views)
    }

    pub fn summary(&self) -> WarehouseSummary {
        WarehouseSummary {
            warehouse_id: self.id,
            location: self.location,
            units_received: self.units_received(),
            supplier_count: self.supplier_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierView {
    pub supplier_id: i64,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseView {
    pub warehouse_id: i64,
    pub location: Location,
    pub suppliers: Vec<SupplierView>,
}

/// Counters reported by the final idle-shutdown summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseSummary {
    pub warehouse_id: i64,
    pub location: Location,
    pub units_received: u64,
    pub supplier_count: usize,
}
