use std::collections::HashMap;

use log::{debug, trace};
use mdg_common::Rupees;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use super::{from_millis, from_millis_opt, to_millis};
use crate::{
    db_types::{
        parse_or_log,
        AgentSnapshot,
        CartGroupId,
        Coordinate,
        DeliveryCharges,
        HistoryEntry,
        LifecycleEvent,
        NewOrder,
        Order,
        OrderId,
        OrderStatusType,
        PartySnapshot,
        ProductSnapshot,
    },
    traits::{OrderQueryFilter, StatusTransition, StoreError},
};

const ORDER_COLUMNS: &str = "id, order_id, payment_id, line_no, cart_group, product_id, product_name, product_image, \
                             quantity, wholesaler_id, wholesaler_name, wholesaler_mobile, wholesaler_lat, \
                             wholesaler_lng, retailer_id, retailer_name, retailer_mobile, retailer_lat, retailer_lng, \
                             delivery_agent_id, delivery_agent_name, delivery_agent_mobile, vehicle_tier, price, \
                             delivery_total, retailer_delivery_pay, wholesaler_delivery_pay, retailer_percent, \
                             total_amount, status, delivery_code, delivery_code_time, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: i64,
    order_id: String,
    payment_id: String,
    line_no: i64,
    cart_group: Option<String>,
    product_id: String,
    product_name: String,
    product_image: Option<String>,
    quantity: i64,
    wholesaler_id: String,
    wholesaler_name: String,
    wholesaler_mobile: String,
    wholesaler_lat: Option<f64>,
    wholesaler_lng: Option<f64>,
    retailer_id: String,
    retailer_name: String,
    retailer_mobile: String,
    retailer_lat: Option<f64>,
    retailer_lng: Option<f64>,
    delivery_agent_id: Option<String>,
    delivery_agent_name: Option<String>,
    delivery_agent_mobile: Option<String>,
    vehicle_tier: String,
    price: i64,
    delivery_total: i64,
    retailer_delivery_pay: i64,
    wholesaler_delivery_pay: i64,
    retailer_percent: i64,
    total_amount: i64,
    status: String,
    delivery_code: Option<String>,
    delivery_code_time: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let delivery_agent = match (row.delivery_agent_id, row.delivery_agent_name, row.delivery_agent_mobile) {
            (Some(id), name, mobile) => {
                Some(AgentSnapshot { id, name: name.unwrap_or_default(), mobile: mobile.unwrap_or_default() })
            },
            _ => None,
        };
        let retailer_percent = u8::try_from(row.retailer_percent).map_err(|_| {
            StoreError::CorruptRecord(format!("Order {} has retailer percent {}", row.order_id, row.retailer_percent))
        })?;
        Ok(Order {
            id: row.id,
            order_id: OrderId(row.order_id),
            payment_id: row.payment_id,
            line_no: row.line_no,
            cart_group: row.cart_group.map(CartGroupId),
            product: ProductSnapshot {
                product_id: row.product_id,
                product_name: row.product_name,
                image: row.product_image,
                quantity: row.quantity,
            },
            wholesaler: PartySnapshot {
                id: row.wholesaler_id,
                name: row.wholesaler_name,
                mobile: row.wholesaler_mobile,
                location: Coordinate::from_parts(row.wholesaler_lat, row.wholesaler_lng),
            },
            retailer: PartySnapshot {
                id: row.retailer_id,
                name: row.retailer_name,
                mobile: row.retailer_mobile,
                location: Coordinate::from_parts(row.retailer_lat, row.retailer_lng),
            },
            delivery_agent,
            vehicle_tier: parse_or_log(&row.vehicle_tier)?,
            price: Rupees::from(row.price),
            charges: DeliveryCharges {
                total_delivery: Rupees::from(row.delivery_total),
                retailer_pays: Rupees::from(row.retailer_delivery_pay),
                wholesaler_pays: Rupees::from(row.wholesaler_delivery_pay),
                retailer_percent,
            },
            total_amount: Rupees::from(row.total_amount),
            status: parse_or_log(&row.status)?,
            history: vec![],
            delivery_code: row.delivery_code,
            delivery_code_time: from_millis_opt(row.delivery_code_time)?,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct HistoryRow {
    order_id: String,
    event: String,
    at: i64,
}

/// Inserts a single order and its opening `paid` history entry. This is not atomic. Embed the call in a transaction
/// and pass `&mut *tx` as the connection argument.
///
/// The raw `sqlx::Error` is returned so that callers can detect unique constraint violations.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let created_at = to_millis(order.created_at);
    let wholesaler_loc = order.wholesaler.location;
    let retailer_loc = order.retailer.location;
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO orders (
                order_id, payment_id, line_no, cart_group,
                product_id, product_name, product_image, quantity,
                wholesaler_id, wholesaler_name, wholesaler_mobile, wholesaler_lat, wholesaler_lng,
                retailer_id, retailer_name, retailer_mobile, retailer_lat, retailer_lng,
                vehicle_tier, price, delivery_total, retailer_delivery_pay, wholesaler_delivery_pay, retailer_percent,
                total_amount, status, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22,
                $23, $24, $25, $26, $27, $27
            )
            RETURNING id;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.payment_id)
    .bind(order.line_no)
    .bind(order.cart_group.as_ref().map(|g| g.as_str()))
    .bind(&order.product.product_id)
    .bind(&order.product.product_name)
    .bind(order.product.image.as_deref())
    .bind(order.product.quantity)
    .bind(&order.wholesaler.id)
    .bind(&order.wholesaler.name)
    .bind(&order.wholesaler.mobile)
    .bind(wholesaler_loc.map(|c| c.lat))
    .bind(wholesaler_loc.map(|c| c.lng))
    .bind(&order.retailer.id)
    .bind(&order.retailer.name)
    .bind(&order.retailer.mobile)
    .bind(retailer_loc.map(|c| c.lat))
    .bind(retailer_loc.map(|c| c.lng))
    .bind(order.vehicle_tier.as_str())
    .bind(order.price.value())
    .bind(order.charges.total_delivery.value())
    .bind(order.charges.retailer_pays.value())
    .bind(order.charges.wholesaler_pays.value())
    .bind(i64::from(order.charges.retailer_percent))
    .bind(order.total_amount().value())
    .bind(OrderStatusType::Paid.as_str())
    .bind(created_at)
    .fetch_one(&mut *conn)
    .await?;
    insert_history(&order.order_id, &[LifecycleEvent::Paid], created_at, conn).await?;
    debug!("📝️ Order [{}] inserted with id {id}", order.order_id);
    Ok(id)
}

async fn insert_history(
    order_id: &OrderId,
    events: &[LifecycleEvent],
    at: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    if events.is_empty() {
        return Ok(());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("INSERT INTO order_history (order_id, event, at) ");
    builder.push_values(events, |mut b, event| {
        b.push_bind(order_id.as_str()).push_bind(event.as_str()).push_bind(at);
    });
    builder.build().execute(conn).await?;
    Ok(())
}

/// Loads the history of every order in `orders` with a single query.
async fn attach_history(orders: &mut [Order], conn: &mut SqliteConnection) -> Result<(), StoreError> {
    if orders.is_empty() {
        return Ok(());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT order_id, event, at FROM order_history WHERE order_id IN (");
    let mut ids = builder.separated(", ");
    for order in orders.iter() {
        ids.push_bind(order.order_id.as_str());
    }
    builder.push(") ORDER BY id ASC");
    let rows: Vec<HistoryRow> = builder.build_query_as().fetch_all(conn).await?;
    let mut by_order: HashMap<String, Vec<HistoryEntry>> = HashMap::new();
    for row in rows {
        let entry = HistoryEntry { event: parse_or_log::<LifecycleEvent>(&row.event)?, at: from_millis(row.at)? };
        by_order.entry(row.order_id).or_default().push(entry);
    }
    for order in orders.iter_mut() {
        order.history = by_order.remove(order.order_id.as_str()).unwrap_or_default();
    }
    Ok(())
}

async fn hydrate(rows: Vec<OrderRow>, conn: &mut SqliteConnection) -> Result<Vec<Order>, StoreError> {
    let mut orders = rows.into_iter().map(Order::try_from).collect::<Result<Vec<_>, _>>()?;
    attach_history(&mut orders, conn).await?;
    Ok(orders)
}

/// Returns the order with the given `order_id`, including its history.
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"))
        .bind(order_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => Ok(hydrate(vec![row], conn).await?.pop()),
        None => Ok(None),
    }
}

pub async fn fetch_orders_for_payment(payment_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, StoreError> {
    let query = OrderQueryFilter::default().with_payment_id(payment_id);
    let mut orders = fetch_orders(query, conn).await?;
    orders.sort_by_key(|o| o.line_no);
    Ok(orders)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn fetch_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, StoreError> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.0);
    }
    if let Some(payment_id) = query.payment_id {
        where_clause.push("payment_id = ");
        where_clause.push_bind_unseparated(payment_id);
    }
    if let Some(group) = query.cart_group {
        where_clause.push("cart_group = ");
        where_clause.push_bind_unseparated(group.0);
    }
    if let Some(id) = query.wholesaler_id {
        where_clause.push("wholesaler_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(key) = query.retailer {
        where_clause.push("(retailer_id = ");
        where_clause.push_bind_unseparated(key.clone());
        where_clause.push_unseparated(" OR retailer_mobile = ");
        where_clause.push_bind_unseparated(key);
        where_clause.push_unseparated(")");
    }
    if let Some(id) = query.delivery_agent_id {
        where_clause.push("delivery_agent_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if !query.statuses.is_empty() {
        where_clause.push("status IN (");
        for (i, status) in query.statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.as_str());
        }
        where_clause.push_unseparated(")");
    }
    if query.unassigned {
        where_clause.push("delivery_agent_id IS NULL");
    }
    if let Some(cutoff) = query.code_issued_before {
        where_clause.push("delivery_code_time < ");
        where_clause.push_bind_unseparated(to_millis(cutoff));
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("📝️ Executing query: {}", builder.sql());
    let rows: Vec<OrderRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
    hydrate(rows, conn).await
}

/// Applies a status-guarded transition. The conditional `UPDATE` runs first, so the write lock is taken before any
/// read, and the history entries are only written if the update matched. Embed the call in a transaction.
///
/// Returns `None` if any guard failed.
pub async fn apply_transition(
    transition: StatusTransition,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    let is_code_state = transition.new_status == OrderStatusType::DeliveryCodeGenerated;
    if is_code_state && transition.delivery_code.is_none() {
        return Err(StoreError::InvalidRecord(format!(
            "Order {} cannot enter {} without a delivery code",
            transition.order_id, transition.new_status
        )));
    }
    if transition.expected.is_empty() {
        return Ok(None);
    }
    let events = transition.history_events();
    let at = to_millis(transition.at);
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
    builder.push_bind(transition.new_status.as_str());
    builder.push(", updated_at = MAX(updated_at, ").push_bind(at).push(")");
    match transition.delivery_code.filter(|_| is_code_state) {
        Some(code) => {
            builder.push(", delivery_code = ").push_bind(code);
            builder.push(", delivery_code_time = MAX(updated_at, ").push_bind(at).push(")");
        },
        None => {
            builder.push(", delivery_code = NULL, delivery_code_time = NULL");
        },
    }
    if let Some(agent) = transition.agent {
        builder.push(", delivery_agent_id = ").push_bind(agent.id);
        builder.push(", delivery_agent_name = ").push_bind(agent.name);
        builder.push(", delivery_agent_mobile = ").push_bind(agent.mobile);
    }
    builder.push(" WHERE order_id = ").push_bind(transition.order_id.as_str());
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in &transition.expected {
        statuses.push_bind(status.as_str());
    }
    builder.push(")");
    if let Some(code) = transition.expected_code {
        builder.push(" AND delivery_code = ").push_bind(code);
    }
    if let Some(agent_id) = transition.expected_agent {
        builder.push(" AND (delivery_agent_id IS NULL OR delivery_agent_id = ").push_bind(agent_id).push(")");
    }
    builder.push(" RETURNING updated_at");
    trace!("📝️ Executing query: {}", builder.sql());
    let updated_at: Option<i64> = builder.build_query_scalar().fetch_optional(&mut *conn).await?;
    let Some(updated_at) = updated_at else {
        trace!("📝️ Transition of {} to {} did not match", transition.order_id, transition.new_status);
        return Ok(None);
    };
    insert_history(&transition.order_id, &events, updated_at, conn).await?;
    debug!("📝️ Order {} is now {}", transition.order_id, transition.new_status);
    fetch_order_by_order_id(&transition.order_id, conn).await
}

