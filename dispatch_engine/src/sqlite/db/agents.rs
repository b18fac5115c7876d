use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{FromRow, SqliteConnection};

use super::{from_millis, from_millis_opt, to_millis};
use crate::{
    db_types::{parse_or_log, Coordinate, DeliveryAgentProfile, NewAgentProfile},
    traits::StoreError,
};

#[derive(Debug, Clone, FromRow)]
struct AgentRow {
    agent_id: String,
    name: String,
    mobile: String,
    alternate_mobile: Option<String>,
    vehicle_tier: String,
    vehicle_model: Option<String>,
    vehicle_number: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    location_updated_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<AgentRow> for DeliveryAgentProfile {
    type Error = StoreError;

    fn try_from(row: AgentRow) -> Result<Self, Self::Error> {
        Ok(DeliveryAgentProfile {
            agent_id: row.agent_id,
            name: row.name,
            mobile: row.mobile,
            alternate_mobile: row.alternate_mobile,
            vehicle_tier: parse_or_log(&row.vehicle_tier)?,
            vehicle_model: row.vehicle_model,
            vehicle_number: row.vehicle_number,
            location: Coordinate::from_parts(row.lat, row.lng),
            location_updated_at: from_millis_opt(row.location_updated_at)?,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

/// Inserts the agent, or updates the profile fields of an existing agent. The live location columns are never
/// written here.
pub async fn upsert_agent(
    profile: NewAgentProfile,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<DeliveryAgentProfile, StoreError> {
    let at = to_millis(at);
    let row: AgentRow = sqlx::query_as(
        r#"
        INSERT INTO delivery_agents
            (agent_id, name, mobile, alternate_mobile, vehicle_tier, vehicle_model, vehicle_number, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        ON CONFLICT (agent_id) DO UPDATE SET
            name = excluded.name,
            mobile = excluded.mobile,
            alternate_mobile = excluded.alternate_mobile,
            vehicle_tier = excluded.vehicle_tier,
            vehicle_model = excluded.vehicle_model,
            vehicle_number = excluded.vehicle_number,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(&profile.agent_id)
    .bind(&profile.name)
    .bind(&profile.mobile)
    .bind(profile.alternate_mobile.as_deref())
    .bind(profile.vehicle_tier.as_str())
    .bind(profile.vehicle_model.as_deref())
    .bind(profile.vehicle_number.as_deref())
    .bind(at)
    .fetch_one(conn)
    .await?;
    debug!("🛵️ Delivery agent {} saved", row.agent_id);
    row.try_into()
}

pub async fn fetch_agent(agent_id: &str, conn: &mut SqliteConnection) -> Result<Option<DeliveryAgentProfile>, StoreError> {
    let row: Option<AgentRow> = sqlx::query_as("SELECT * FROM delivery_agents WHERE agent_id = $1")
        .bind(agent_id)
        .fetch_optional(conn)
        .await?;
    row.map(DeliveryAgentProfile::try_from).transpose()
}

pub async fn update_location(
    agent_id: &str,
    location: Coordinate,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryAgentProfile>, StoreError> {
    let row: Option<AgentRow> = sqlx::query_as(
        "UPDATE delivery_agents SET lat = $1, lng = $2, location_updated_at = $3 WHERE agent_id = $4 RETURNING *",
    )
    .bind(location.lat)
    .bind(location.lng)
    .bind(to_millis(at))
    .bind(agent_id)
    .fetch_optional(conn)
    .await?;
    row.map(DeliveryAgentProfile::try_from).transpose()
}

pub async fn fetch_located_agents(conn: &mut SqliteConnection) -> Result<Vec<DeliveryAgentProfile>, StoreError> {
    let rows: Vec<AgentRow> = sqlx::query_as(
        "SELECT * FROM delivery_agents WHERE lat IS NOT NULL AND lng IS NOT NULL ORDER BY agent_id",
    )
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(DeliveryAgentProfile::try_from).collect()
}
