//! `SqliteDatabase` is a concrete implementation of a dispatch engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{agents, db_url, new_pool, orders, parties};
use crate::{
    db_types::{
        Coordinate,
        DeliveryAgentProfile,
        NewAgentProfile,
        NewOrder,
        NewPartyProfile,
        Order,
        OrderId,
        PartyProfile,
        PartyRole,
        PushToken,
    },
    traits::{
        AgentManagement,
        DispatchDatabase,
        InsertOrderResult,
        OrderManagement,
        OrderQueryFilter,
        PartyManagement,
        StatusTransition,
        StoreError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl DispatchDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Inserts every order for the payment in one transaction. The insert is attempted first and the unique
    /// `(payment_id, line_no)` index decides whether the payment has been seen before, so two concurrent deliveries of
    /// the same event cannot both succeed.
    async fn insert_orders_for_payment(
        &self,
        payment_id: &str,
        new_orders: Vec<NewOrder>,
    ) -> Result<InsertOrderResult, StoreError> {
        if new_orders.iter().any(|o| o.payment_id != payment_id) {
            return Err(StoreError::InvalidRecord(format!("All orders must belong to payment {payment_id}")));
        }
        let mut tx = self.pool.begin().await?;
        for order in &new_orders {
            match orders::insert_order(order, &mut tx).await {
                Ok(_) => {},
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    tx.rollback().await?;
                    info!("🗃️ Payment {payment_id} has already been processed. Returning the existing orders.");
                    let mut conn = self.pool.acquire().await?;
                    let existing = orders::fetch_orders_for_payment(payment_id, &mut conn).await?;
                    return Ok(InsertOrderResult::AlreadyExists(existing));
                },
                Err(e) => return Err(e.into()),
            }
        }
        let inserted = orders::fetch_orders_for_payment(payment_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {} order(s) created for payment {payment_id}", inserted.len());
        Ok(InsertOrderResult::Inserted(inserted))
    }

    async fn apply_transition(&self, transition: StatusTransition) -> Result<Option<Order>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::apply_transition(transition, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_order_id(order_id, &mut conn).await
    }

    async fn fetch_orders_for_payment(&self, payment_id: &str) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_payment(payment_id, &mut conn).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders(query, &mut conn).await
    }
}

impl AgentManagement for SqliteDatabase {
    async fn upsert_agent(&self, profile: NewAgentProfile) -> Result<DeliveryAgentProfile, StoreError> {
        let mut conn = self.pool.acquire().await?;
        agents::upsert_agent(profile, Utc::now(), &mut conn).await
    }

    async fn fetch_agent(&self, agent_id: &str) -> Result<Option<DeliveryAgentProfile>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        agents::fetch_agent(agent_id, &mut conn).await
    }

    async fn update_agent_location(
        &self,
        agent_id: &str,
        location: Coordinate,
        at: DateTime<Utc>,
    ) -> Result<Option<DeliveryAgentProfile>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        agents::update_location(agent_id, location, at, &mut conn).await
    }

    async fn fetch_located_agents(&self) -> Result<Vec<DeliveryAgentProfile>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        agents::fetch_located_agents(&mut conn).await
    }
}

impl PartyManagement for SqliteDatabase {
    async fn upsert_party(&self, profile: NewPartyProfile, at: DateTime<Utc>) -> Result<PartyProfile, StoreError> {
        let mut conn = self.pool.acquire().await?;
        parties::upsert_party(profile, at, &mut conn).await
    }

    async fn fetch_party(&self, role: PartyRole, party_id: &str) -> Result<Option<PartyProfile>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        parties::fetch_party(role, party_id, &mut conn).await
    }

    async fn save_push_token(
        &self,
        role: PartyRole,
        party_id: &str,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<PushToken, StoreError> {
        let mut conn = self.pool.acquire().await?;
        parties::save_push_token(role, party_id, token, at, &mut conn).await
    }

    async fn fetch_push_token(&self, role: PartyRole, party_id: &str) -> Result<Option<PushToken>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        parties::fetch_push_token(role, party_id, &mut conn).await
    }

    async fn clear_push_token(&self, role: PartyRole, party_id: &str, token: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let cleared = parties::clear_push_token(role, party_id, token, &mut conn).await?;
        if cleared {
            info!("📲️ Stale push token for {role} {party_id} removed");
        }
        Ok(cleared)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using `MDG_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Runs the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
