// SPDX-License-Identifier: GPL-3.0-only
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The caller's context was cancelled or its deadline passed
    #[error("operation canceled")]
    Canceled,

    #[error("warehouse does not exist: {0}")]
    WarehouseNotFound(i64),

    #[error("supplier does not exist: {supplier_id} (warehouse {warehouse_id})")]
    SupplierNotFound { warehouse_id: i64, supplier_id: i64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::WarehouseNotFound(_) | RegistryError::SupplierNotFound { .. }
        )
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
