use crate::{
    db_types::{NewOrder, Order},
    traits::{AgentManagement, InsertOrderResult, OrderManagement, PartyManagement, StatusTransition, StoreError},
};

/// This trait defines the highest level of behaviour for backends supporting the dispatch engine.
///
/// This behaviour includes:
/// * Idempotent order creation for confirmed payments
/// * Status-guarded lifecycle transitions
#[allow(async_fn_in_trait)]
pub trait DispatchDatabase: Clone + OrderManagement + AgentManagement + PartyManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores all the orders created from one confirmed payment in a single atomic transaction.
    ///
    /// If any order already exists for `payment_id`, nothing is written and the existing orders are returned as
    /// [`InsertOrderResult::AlreadyExists`]. This also holds when two identical payment events race each other.
    async fn insert_orders_for_payment(
        &self,
        payment_id: &str,
        orders: Vec<NewOrder>,
    ) -> Result<InsertOrderResult, StoreError>;

    /// Atomically applies the transition if, and only if, all of its guards hold:
    /// * the order's current status is one of `transition.expected`,
    /// * the stored delivery code equals `transition.expected_code`, if given,
    /// * the assigned agent is absent or equals `transition.expected_agent`, if given.
    ///
    /// The status update and the new history entries are written together. Returns the updated order, or `None` if a
    /// guard failed (including when the order does not exist), in which case nothing was changed.
    async fn apply_transition(&self, transition: StatusTransition) -> Result<Option<Order>, StoreError>;
}
