use chrono::{DateTime, Utc};

use crate::{
    db_types::{NewPartyProfile, PartyProfile, PartyRole, PushToken},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait PartyManagement {
    async fn upsert_party(&self, profile: NewPartyProfile, at: DateTime<Utc>) -> Result<PartyProfile, StoreError>;

    async fn fetch_party(&self, role: PartyRole, party_id: &str) -> Result<Option<PartyProfile>, StoreError>;

    /// Registers (or replaces) the push token for a party.
    async fn save_push_token(
        &self,
        role: PartyRole,
        party_id: &str,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<PushToken, StoreError>;

    async fn fetch_push_token(&self, role: PartyRole, party_id: &str) -> Result<Option<PushToken>, StoreError>;

    /// Removes the token, but only if it is still the registered one. Returns `true` if a token was removed.
    async fn clear_push_token(&self, role: PartyRole, party_id: &str, token: &str) -> Result<bool, StoreError>;
}
