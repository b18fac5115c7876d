use chrono::{DateTime, Utc};

use crate::{
    db_types::{Coordinate, DeliveryAgentProfile, NewAgentProfile},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait AgentManagement {
    /// Creates the agent profile, or updates the contact and vehicle details of an existing one. The live location
    /// is left untouched; only [`Self::update_agent_location`] writes it.
    async fn upsert_agent(&self, profile: NewAgentProfile) -> Result<DeliveryAgentProfile, StoreError>;

    async fn fetch_agent(&self, agent_id: &str) -> Result<Option<DeliveryAgentProfile>, StoreError>;

    /// Records a live location report. Returns `None` if the agent does not exist.
    async fn update_agent_location(
        &self,
        agent_id: &str,
        location: Coordinate,
        at: DateTime<Utc>,
    ) -> Result<Option<DeliveryAgentProfile>, StoreError>;

    /// All agents that have reported a live location at least once.
    async fn fetch_located_agents(&self) -> Result<Vec<DeliveryAgentProfile>, StoreError>;
}
