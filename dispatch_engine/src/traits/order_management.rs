use thiserror::Error;

use crate::{
    db_types::{ConversionError, Order, OrderId},
    traits::OrderQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A stored record could not be read. {0}")]
    CorruptRecord(String),
    #[error("The request cannot be stored. {0}")]
    InvalidRecord(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

impl From<ConversionError> for StoreError {
    fn from(e: ConversionError) -> Self {
        StoreError::CorruptRecord(e.to_string())
    }
}

/// Read access to orders. Every returned [`Order`] carries its full history, oldest entry first.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order with the given id. If it does not exist, `None` is returned.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Fetches every order created for the external payment id, ordered by line number.
    async fn fetch_orders_for_payment(&self, payment_id: &str) -> Result<Vec<Order>, StoreError>;

    /// Fetches orders according to criteria specified in the `OrderQueryFilter`. Results are ordered by creation
    /// time.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;
}
