// SPDX-License-Identifier: GPL-3.0-only
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::registry::context::OpContext;
use crate::registry::error::{RegistryError, RegistryResult};
use crate::registry::models::{Location, Supplier, Warehouse, WarehouseSummary, WarehouseView};
use crate::registry::traits::Registry;

const INITIAL_WAREHOUSES: usize = 50;
const INITIAL_SUPPLIERS: usize = 256;

/// Process-lifetime owner of all warehouse and supplier state.
///
/// Each map sits behind its own structural lock, held only for a lookup or an
/// insert. Entries are shared cells with their own locks; a structural guard
/// is always dropped before the entry's lock is taken.
pub struct InMemoryRegistry {
    warehouses: RwLock<HashMap<i64, Arc<Warehouse>>>,
    suppliers: RwLock<HashMap<i64, Arc<Supplier>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            warehouses: RwLock::new(HashMap::with_capacity(INITIAL_WAREHOUSES)),
            suppliers: RwLock::new(HashMap::with_capacity(INITIAL_SUPPLIERS)),
        }
    }

    fn warehouse(&self, id: i64) -> Option<Arc<Warehouse>> {
        self.warehouses.read().get(&id).cloned()
    }

    fn supplier(&self, id: i64) -> Option<Arc<Supplier>> {
        self.suppliers.read().get(&id).cloned()
    }

    /// Look up a warehouse, creating it at `location` if unseen.
    ///
    /// When two first deliveries race, the one that wins the write lock pins
    /// the location; the other gets the existing warehouse back.
    fn get_or_create_warehouse(&self, id: i64, location: Location) -> Arc<Warehouse> {
        if let Some(warehouse) = self.warehouse(id) {
            return warehouse;
        }

        let mut warehouses = self.warehouses.write();
        let warehouse = warehouses.entry(id).or_insert_with(|| {
            debug!(warehouse_id = id, ?location, "Created warehouse");
            Arc::new(Warehouse::new(id, location))
        });
        Arc::clone(warehouse)
    }

    /// Overwrite a top-level supplier's location, creating it if unseen
    fn update_or_create_supplier(&self, id: i64, location: Location) {
        if let Some(supplier) = self.supplier(id) {
            supplier.set_location(location);
            return;
        }

        let existing = {
            let mut suppliers = self.suppliers.write();
            match suppliers.get(&id) {
                Some(supplier) => Arc::clone(supplier),
                None => {
                    suppliers.insert(id, Arc::new(Supplier::new(location)));
                    debug!(supplier_id = id, ?location, "Created supplier");
                    return;
                }
            }
        };
        // Lost the insert race; apply the update to the winner's record.
        existing.set_location(location);
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for InMemoryRegistry {
    fn move_unit(&self, ctx: &OpContext, supplier_id: i64, location: Location) -> RegistryResult<()> {
        ctx.check()?;
        self.update_or_create_supplier(supplier_id, location);
        Ok(())
    }

    fn warehouse_received(
        &self,
        ctx: &OpContext,
        warehouse_id: i64,
        supplier_id: i64,
        location: Location,
    ) -> RegistryResult<()> {
        ctx.check()?;

        let warehouse = self.get_or_create_warehouse(warehouse_id, location);

        let units = warehouse.add_unit();
        if warehouse.ensure_supplier(supplier_id, location) {
            debug!(warehouse_id, supplier_id, "Supplier delivered to warehouse for the first time");
        }
        warehouse.set_supplier_location(supplier_id, location)?;

        debug!(warehouse_id, supplier_id, units, "Processed warehouse delivery");
        Ok(())
    }

    fn get_warehouse(&self, ctx: &OpContext, warehouse_id: i64) -> RegistryResult<WarehouseView> {
        ctx.check()?;

        let warehouse = self
            .warehouse(warehouse_id)
            .ok_or(RegistryError::WarehouseNotFound(warehouse_id))?;
        let suppliers = warehouse.supplier_views(ctx)?;

        Ok(WarehouseView {
            warehouse_id,
            location: warehouse.location(),
            suppliers,
        })
    }

    fn supplier_location(&self, ctx: &OpContext, supplier_id: i64) -> RegistryResult<Option<Location>> {
        ctx.check()?;
        Ok(self.supplier(supplier_id).map(|s| s.location()))
    }

    fn warehouse_summaries(&self) -> Vec<WarehouseSummary> {
        let mut warehouses: Vec<Arc<Warehouse>> = self.warehouses.read().values().cloned().collect();
        warehouses.sort_by_key(|w| w.id());
        warehouses.iter().map(|w| w.summary()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::models::SupplierView;
    use crate::test_helpers::{DEFAULT_LATITUDE, DEFAULT_LONGITUDE, default_location};
    use std::thread;

    fn ctx() -> OpContext {
        OpContext::background()
    }

    #[test]
    fn test_move_unit_creates_supplier() {
        let registry = InMemoryRegistry::new();
        registry.move_unit(&ctx(), 101, default_location()).unwrap();

        let location = registry.supplier_location(&ctx(), 101).unwrap().unwrap();
        assert_eq!(location.latitude, DEFAULT_LATITUDE);
        assert_eq!(location.longitude, DEFAULT_LONGITUDE);
    }

    #[test]
    fn test_move_unit_is_idempotent() {
        let registry = InMemoryRegistry::new();
        registry.move_unit(&ctx(), 101, Location::new(5, 6)).unwrap();
        registry.move_unit(&ctx(), 101, Location::new(5, 6)).unwrap();

        assert_eq!(registry.suppliers.read().len(), 1);
        assert_eq!(
            registry.supplier_location(&ctx(), 101).unwrap(),
            Some(Location::new(5, 6))
        );
    }

    #[test]
    fn test_move_unit_overwrites_location() {
        let registry = InMemoryRegistry::new();
        registry.move_unit(&ctx(), 101, Location::new(1, 2)).unwrap();
        registry.move_unit(&ctx(), 101, Location::new(3, 4)).unwrap();

        assert_eq!(
            registry.supplier_location(&ctx(), 101).unwrap(),
            Some(Location::new(3, 4))
        );
    }

    #[test]
    fn test_supplier_location_unknown() {
        let registry = InMemoryRegistry::new();
        assert_eq!(registry.supplier_location(&ctx(), 42).unwrap(), None);
    }

    #[test]
    fn test_concurrent_move_unit_last_write_wins() {
        let registry = InMemoryRegistry::new();
        let candidates: Vec<Location> = (0..16u32).map(|i| Location::new(i, i * 1000)).collect();

        thread::scope(|s| {
            for &location in &candidates {
                let registry = &registry;
                s.spawn(move || {
                    for _ in 0..100 {
                        registry.move_unit(&OpContext::background(), 7, location).unwrap();
                    }
                });
            }
        });

        assert_eq!(registry.suppliers.read().len(), 1);
        let final_location = registry.supplier_location(&ctx(), 7).unwrap().unwrap();
        assert!(candidates.contains(&final_location));
    }

    #[test]
    fn test_warehouse_received_scenario() {
        let registry = InMemoryRegistry::new();
        registry
            .warehouse_received(&ctx(), 5001, 1001, default_location())
            .unwrap();

        let view = registry.get_warehouse(&ctx(), 5001).unwrap();
        assert_eq!(view.warehouse_id, 5001);
        assert_eq!(view.location, default_location());
        assert_eq!(
            view.suppliers,
            vec![SupplierView {
                supplier_id: 1001,
                location: default_location()
            }]
        );
    }

    #[test]
    fn test_warehouse_location_pinned_to_first_delivery() {
        let registry = InMemoryRegistry::new();
        registry
            .warehouse_received(&ctx(), 1, 10, Location::new(100, 200))
            .unwrap();
        for i in 0..5 {
            registry
                .warehouse_received(&ctx(), 1, 10 + i, Location::new(i as u32, i as u32))
                .unwrap();
        }

        let view = registry.get_warehouse(&ctx(), 1).unwrap();
        assert_eq!(view.location, Location::new(100, 200));
    }

    #[test]
    fn test_nested_supplier_follows_latest_delivery() {
        let registry = InMemoryRegistry::new();
        registry.warehouse_received(&ctx(), 1, 10, Location::new(1, 1)).unwrap();
        registry.warehouse_received(&ctx(), 1, 10, Location::new(2, 2)).unwrap();

        let view = registry.get_warehouse(&ctx(), 1).unwrap();
        assert_eq!(view.suppliers.len(), 1);
        assert_eq!(view.suppliers[0].location, Location::new(2, 2));
    }

    #[test]
    fn test_concurrent_deliveries_counted_exactly() {
        let registry = InMemoryRegistry::new();
        const THREADS: i64 = 8;
        const PER_THREAD: i64 = 250;

        thread::scope(|s| {
            for t in 0..THREADS {
                let registry = &registry;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        registry
                            .warehouse_received(
                                &OpContext::background(),
                                5001,
                                t * PER_THREAD + i,
                                Location::new(t as u32, i as u32),
                            )
                            .unwrap();
                    }
                });
            }
        });

        let summaries = registry.warehouse_summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].location.longitude, 0);
        assert!((summaries[0].location.latitude as i64) < THREADS);
        assert_eq!(summaries[0].units_received, (THREADS * PER_THREAD) as u64);
        assert_eq!(summaries[0].supplier_count, (THREADS * PER_THREAD) as usize);
    }

    #[test]
    fn test_racing_first_deliveries_create_one_warehouse() {
        const THREADS: u32 = 16;
        let candidates: Vec<Location> = (0..THREADS).map(|i| Location::new(i + 1, (i + 1) * 7)).collect();

        for round in 0..50i64 {
            let registry = InMemoryRegistry::new();
            let barrier = std::sync::Barrier::new(THREADS as usize);

            thread::scope(|s| {
                for (i, &location) in candidates.iter().enumerate() {
                    let registry = &registry;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        registry
                            .warehouse_received(&OpContext::background(), round, i as i64, location)
                            .unwrap();
                    });
                }
            });

            let summaries = registry.warehouse_summaries();
            assert_eq!(summaries.len(), 1);
            assert_eq!(summaries[0].warehouse_id, round);
            assert_eq!(summaries[0].units_received, THREADS as u64);
            assert_eq!(summaries[0].supplier_count, THREADS as usize);

            let view = registry.get_warehouse(&ctx(), round).unwrap();
            assert!(candidates.contains(&view.location));
            for supplier in &view.suppliers {
                assert_eq!(supplier.location, candidates[supplier.supplier_id as usize]);
            }
        }
    }

    #[test]
    fn test_racing_first_moves_create_one_supplier() {
        let registry = InMemoryRegistry::new();
        let barrier = std::sync::Barrier::new(8);

        thread::scope(|s| {
            for i in 0..8u32 {
                let registry = &registry;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    registry
                        .move_unit(&OpContext::background(), 55, Location::new(i, i))
                        .unwrap();
                });
            }
        });

        assert_eq!(registry.suppliers.read().len(), 1);
        let location = registry.supplier_location(&ctx(), 55).unwrap().unwrap();
        assert_eq!(location.latitude, location.longitude);
        assert!(location.latitude < 8);
    }

    #[test]
    fn test_repeat_deliveries_count_every_event() {
        let registry = InMemoryRegistry::new();
        for _ in 0..3 {
            registry.warehouse_received(&ctx(), 1, 10, Location::new(1, 1)).unwrap();
        }

        let summary = &registry.warehouse_summaries()[0];
        assert_eq!(summary.units_received, 3);
        assert_eq!(summary.supplier_count, 1);
    }

    #[test]
    fn test_get_warehouse_not_found() {
        let registry = InMemoryRegistry::new();
        let err = registry.get_warehouse(&ctx(), 2001).unwrap_err();
        assert_eq!(err, RegistryError::WarehouseNotFound(2001));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_dual_supplier_records_are_independent() {
        let registry = InMemoryRegistry::new();
        registry.move_unit(&ctx(), 1001, Location::new(1, 1)).unwrap();
        registry.warehouse_received(&ctx(), 5001, 1001, Location::new(9, 9)).unwrap();
        registry.move_unit(&ctx(), 1001, Location::new(2, 2)).unwrap();

        assert_eq!(
            registry.supplier_location(&ctx(), 1001).unwrap(),
            Some(Location::new(2, 2))
        );
        let view = registry.get_warehouse(&ctx(), 5001).unwrap();
        assert_eq!(view.suppliers[0].location, Location::new(9, 9));
    }

    #[test]
    fn test_delivery_does_not_create_top_level_supplier() {
        let registry = InMemoryRegistry::new();
        registry.warehouse_received(&ctx(), 5001, 1001, default_location()).unwrap();
        assert_eq!(registry.supplier_location(&ctx(), 1001).unwrap(), None);
    }

    #[test]
    fn test_cancelled_context_rejects_without_mutation() {
        let registry = InMemoryRegistry::new();
        let cancelled = OpContext::background();
        cancelled.cancel();

        assert_eq!(
            registry.move_unit(&cancelled, 1, Location::new(1, 1)),
            Err(RegistryError::Canceled)
        );
        assert_eq!(
            registry.warehouse_received(&cancelled, 1, 1, Location::new(1, 1)),
            Err(RegistryError::Canceled)
        );
        assert_eq!(
            registry.supplier_location(&cancelled, 1),
            Err(RegistryError::Canceled)
        );

        assert!(registry.suppliers.read().is_empty());
        assert!(registry.warehouse_summaries().is_empty());
    }

    #[test]
    fn test_get_warehouse_cancelled() {
        let registry = InMemoryRegistry::new();
        registry.warehouse_received(&ctx(), 1, 1, Location::new(1, 1)).unwrap();

        let cancelled = OpContext::background();
        cancelled.cancel();
        assert_eq!(registry.get_warehouse(&cancelled, 1), Err(RegistryError::Canceled));
    }

    #[test]
    fn test_warehouse_summaries_sorted_by_id() {
        let registry = InMemoryRegistry::new();
        for id in [30, 10, 20] {
            registry.warehouse_received(&ctx(), id, 1, Location::new(1, 1)).unwrap();
        }
        registry.warehouse_received(&ctx(), 20, 2, Location::new(1, 1)).unwrap();

        let summaries = registry.warehouse_summaries();
        let ids: Vec<i64> = summaries.iter().map(|s| s.warehouse_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(summaries[1].units_received, 2);
        assert_eq!(summaries[1].supplier_count, 2);
    }
}
