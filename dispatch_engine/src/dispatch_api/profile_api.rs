use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    db_types::{Coordinate, DeliveryAgentProfile, NewAgentProfile, NewPartyProfile, PartyProfile, PartyRole, PushToken},
    dispatch_api::errors::DispatchError,
    geo::{validate_coordinate, GeoError},
    helpers::{Clock, SystemClock},
    traits::{AgentManagement, PartyManagement},
};

/// Profiles, live locations and push tokens for every party.
pub struct ProfileApi<B> {
    db: B,
    clock: Arc<dyn Clock>,
}

impl<B> Debug for ProfileApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProfileApi")
    }
}

impl<B> ProfileApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

fn require(value: &str, what: &str) -> Result<(), DispatchError> {
    if value.trim().is_empty() {
        Err(DispatchError::InvalidRequest(format!("The {what} is required")))
    } else {
        Ok(())
    }
}

impl<B> ProfileApi<B>
where B: AgentManagement + PartyManagement
{
    pub async fn register_agent(&self, profile: NewAgentProfile) -> Result<DeliveryAgentProfile, DispatchError> {
        require(&profile.agent_id, "agent id")?;
        require(&profile.name, "agent name")?;
        require(&profile.mobile, "agent mobile number")?;
        let agent = self.db.upsert_agent(profile).await?;
        info!("🛵️ Agent {} ({}) registered with a {}", agent.agent_id, agent.name, agent.vehicle_tier);
        Ok(agent)
    }

    pub async fn fetch_agent(&self, agent_id: &str) -> Result<DeliveryAgentProfile, DispatchError> {
        self.db
            .fetch_agent(agent_id)
            .await?
            .ok_or_else(|| DispatchError::AgentProfileMissing(format!("Agent {agent_id} has no profile.")))
    }

    /// Records the agent's live location. Only the agent reports its own location.
    pub async fn report_agent_location(
        &self,
        agent_id: &str,
        location: Coordinate,
    ) -> Result<DeliveryAgentProfile, DispatchError> {
        let location = validate_coordinate(Some(&location), "agent")?;
        let now = self.clock.now();
        let agent = self
            .db
            .update_agent_location(agent_id, location, now)
            .await?
            .ok_or_else(|| DispatchError::AgentProfileMissing(format!("Agent {agent_id} has no profile.")))?;
        trace!("🛵️ Agent {agent_id} is at {location}");
        Ok(agent)
    }

    /// Registers or updates a wholesaler or retailer.
    pub async fn register_party(&self, profile: NewPartyProfile) -> Result<PartyProfile, DispatchError> {
        if profile.role == PartyRole::DeliveryAgent {
            return Err(DispatchError::InvalidRequest("Delivery agents register through the agent profile".into()));
        }
        require(&profile.party_id, "party id")?;
        require(&profile.name, "name")?;
        require(&profile.mobile, "mobile number")?;
        if let Some(loc) = &profile.location {
            if !loc.is_valid() {
                return Err(GeoError::InvalidLocation(format!("The {} location {loc} is not valid.", profile.role)).into());
            }
        }
        let party = self.db.upsert_party(profile, self.clock.now()).await?;
        info!("🏪️ {} {} saved", party.role, party.party_id);
        Ok(party)
    }

    pub async fn fetch_party(&self, role: PartyRole, party_id: &str) -> Result<Option<PartyProfile>, DispatchError> {
        Ok(self.db.fetch_party(role, party_id).await?)
    }

    /// `saveToken`. Replaces any previous token for the party.
    pub async fn save_push_token(&self, role: PartyRole, party_id: &str, token: &str) -> Result<PushToken, DispatchError> {
        require(party_id, "party id")?;
        require(token, "push token")?;
        let saved = self.db.save_push_token(role, party_id.trim(), token.trim(), self.clock.now()).await?;
        debug!("📲️ Push token saved for {role} {party_id}");
        Ok(saved)
    }
}
