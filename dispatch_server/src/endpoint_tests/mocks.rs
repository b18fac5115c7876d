use dispatch_engine::{
    db_types::{Order, OrderId},
    traits::OrderQueryFilter,
    OrderManagement,
    StoreError,
};
use mockall::mock;

mock! {
    pub OrderStore {}
    impl OrderManagement for OrderStore {
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;
        async fn fetch_orders_for_payment(&self, payment_id: &str) -> Result<Vec<Order>, StoreError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;
    }
}
