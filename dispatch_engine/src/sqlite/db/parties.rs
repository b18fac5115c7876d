use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{FromRow, SqliteConnection};

use super::{from_millis, to_millis};
use crate::{
    db_types::{parse_or_log, Coordinate, NewPartyProfile, PartyProfile, PartyRole, PushToken},
    traits::StoreError,
};

#[derive(Debug, Clone, FromRow)]
struct PartyRow {
    role: String,
    party_id: String,
    name: String,
    mobile: String,
    lat: Option<f64>,
    lng: Option<f64>,
    updated_at: i64,
}

impl TryFrom<PartyRow> for PartyProfile {
    type Error = StoreError;

    fn try_from(row: PartyRow) -> Result<Self, Self::Error> {
        Ok(PartyProfile {
            role: parse_or_log(&row.role)?,
            party_id: row.party_id,
            name: row.name,
            mobile: row.mobile,
            location: Coordinate::from_parts(row.lat, row.lng),
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct PushTokenRow {
    role: String,
    party_id: String,
    token: String,
    updated_at: i64,
}

impl TryFrom<PushTokenRow> for PushToken {
    type Error = StoreError;

    fn try_from(row: PushTokenRow) -> Result<Self, Self::Error> {
        Ok(PushToken {
            role: parse_or_log(&row.role)?,
            party_id: row.party_id,
            token: row.token,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

pub async fn upsert_party(
    profile: NewPartyProfile,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<PartyProfile, StoreError> {
    let row: PartyRow = sqlx::query_as(
        r#"
        INSERT INTO parties (role, party_id, name, mobile, lat, lng, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        ON CONFLICT (role, party_id) DO UPDATE SET
            name = excluded.name,
            mobile = excluded.mobile,
            lat = excluded.lat,
            lng = excluded.lng,
            updated_at = excluded.updated_at
        RETURNING role, party_id, name, mobile, lat, lng, updated_at
        "#,
    )
    .bind(profile.role.as_str())
    .bind(&profile.party_id)
    .bind(&profile.name)
    .bind(&profile.mobile)
    .bind(profile.location.map(|c| c.lat))
    .bind(profile.location.map(|c| c.lng))
    .bind(to_millis(at))
    .fetch_one(conn)
    .await?;
    debug!("🏪️ {} {} saved", row.role, row.party_id);
    row.try_into()
}

pub async fn fetch_party(
    role: PartyRole,
    party_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PartyProfile>, StoreError> {
    let row: Option<PartyRow> = sqlx::query_as(
        "SELECT role, party_id, name, mobile, lat, lng, updated_at FROM parties WHERE role = $1 AND party_id = $2",
    )
    .bind(role.as_str())
    .bind(party_id)
    .fetch_optional(conn)
    .await?;
    row.map(PartyProfile::try_from).transpose()
}

pub async fn save_push_token(
    role: PartyRole,
    party_id: &str,
    token: &str,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<PushToken, StoreError> {
    let row: PushTokenRow = sqlx::query_as(
        r#"
        INSERT INTO push_tokens (role, party_id, token, updated_at) VALUES ($1, $2, $3, $4)
        ON CONFLICT (role, party_id) DO UPDATE SET token = excluded.token, updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(role.as_str())
    .bind(party_id)
    .bind(token)
    .bind(to_millis(at))
    .fetch_one(conn)
    .await?;
    row.try_into()
}

pub async fn fetch_push_token(
    role: PartyRole,
    party_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PushToken>, StoreError> {
    let row: Option<PushTokenRow> = sqlx::query_as("SELECT * FROM push_tokens WHERE role = $1 AND party_id = $2")
        .bind(role.as_str())
        .bind(party_id)
        .fetch_optional(conn)
        .await?;
    row.map(PushToken::try_from).transpose()
}

/// Deletes the token only if it is still the registered one, so a token refreshed in the meantime survives.
pub async fn clear_push_token(
    role: PartyRole,
    party_id: &str,
    token: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM push_tokens WHERE role = $1 AND party_id = $2 AND token = $3")
        .bind(role.as_str())
        .bind(party_id)
        .bind(token)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
