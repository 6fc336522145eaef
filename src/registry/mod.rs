// SPDX-License-Identifier: GPL-3.0-only
pub mod context;
pub mod error;
pub mod memory;
pub mod models;
pub mod traits;

pub use context::OpContext;
pub use error::{RegistryError, RegistryResult};
pub use memory::InMemoryRegistry;
pub use models::{Location, SupplierView, WarehouseSummary, WarehouseView};
pub use traits::Registry;
