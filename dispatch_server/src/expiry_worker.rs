use std::time::Duration;

use dispatch_engine::{db_types::Order, OrderLifecycleApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the delivery code expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Verification already rejects stale codes on its own; the sweep makes sure orders whose retailer never enters the
/// code are returned to `picked_up` without waiting for another request.
pub fn start_expiry_worker(api: OrderLifecycleApi<SqliteDatabase>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Delivery code expiry worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running delivery code expiry job");
            match api.expire_stale_codes().await {
                Ok(orders) if orders.is_empty() => trace!("🕰️ No delivery codes expired"),
                Ok(orders) => {
                    info!("🕰️ {} delivery codes expired", orders.len());
                    debug!("🕰️ Orders returned to picked_up: {}", order_list(&orders));
                },
                Err(e) => {
                    error!("🕰️ Error running delivery code expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] order_id: {} agent: {}", o.id, o.order_id, o.agent_id().unwrap_or("none")))
        .collect::<Vec<String>>()
        .join(", ")
}
