// SPDX-License-Identifier: GPL-3.0-only
use crate::registry::context::OpContext;
use crate::registry::error::RegistryResult;
use crate::registry::models::{Location, WarehouseSummary, WarehouseView};

pub trait Registry: Send + Sync {
    /// Update the top-level position of a cargo unit, creating it if unseen
    fn move_unit(&self, ctx: &OpContext, supplier_id: i64, location: Location) -> RegistryResult<()>;

    /// Record a delivery of `supplier_id` at `warehouse_id`
    fn warehouse_received(
        &self,
        ctx: &OpContext,
        warehouse_id: i64,
        supplier_id: i64,
        location: Location,
    ) -> RegistryResult<()>;

    /// Snapshot a warehouse and the suppliers that delivered to it
    fn get_warehouse(&self, ctx: &OpContext, warehouse_id: i64) -> RegistryResult<WarehouseView>;

    /// Top-level position of a cargo unit
    fn supplier_location(&self, ctx: &OpContext, supplier_id: i64) -> RegistryResult<Option<Location>>;

    /// Per-warehouse counters in ascending id order
    fn warehouse_summaries(&self) -> Vec<WarehouseSummary>;
}
