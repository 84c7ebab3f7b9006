// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notification append/query: sequence numbers dense
// and strictly increasing per subscription.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use pressd_core::error::PressdError;
use pressd_core::model::Notification;
use pressd_ipp::AttributeMap;

use crate::store::db_err;

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let attrs_json: String = row.get("attributes")?;
    let attributes: AttributeMap = serde_json::from_str(&attrs_json).unwrap_or_default();
    Ok(Notification {
        id: row.get("seq")?,
        subscription_id: row.get("subscription_id")?,
        event: row.get("event")?,
        created_at: parse_rfc3339(&row.get::<_, String>("created_at")?),
        attributes,
    })
}

/// Append one notification for `subscription_id`, assigning the next
/// sequence number for that subscription. Must be called inside the same
/// transaction as the state change that produced the event.
pub fn append(
    conn: &Connection,
    subscription_id: i64,
    event: &str,
    attributes: &AttributeMap,
) -> Result<i64, PressdError> {
    let next_seq: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM notifications WHERE subscription_id = ?1",
            params![subscription_id],
            |r| r.get(0),
        )
        .map_err(db_err)?;

    let attrs_json = serde_json::to_string(attributes).map_err(PressdError::Serialization)?;
    conn.execute(
        "INSERT INTO notifications (seq, subscription_id, event, created_at, attributes) \
         VALUES (?1,?2,?3,?4,?5)",
        params![
            next_seq,
            subscription_id,
            event,
            Utc::now().to_rfc3339(),
            attrs_json,
        ],
    )
    .map_err(db_err)?;

    debug!(subscription_id, seq = next_seq, event, "notification appended");
    Ok(next_seq)
}

/// Notifications with `seq >= floor`, ordered by sequence number.
pub fn list_from(
    conn: &Connection,
    subscription_id: i64,
    floor: i64,
) -> Result<Vec<Notification>, PressdError> {
    let mut stmt = conn
        .prepare(
            "SELECT seq, subscription_id, event, created_at, attributes FROM notifications \
             WHERE subscription_id = ?1 AND seq >= ?2 ORDER BY seq",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![subscription_id, floor], row_to_notification)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::subscriptions;
    use pressd_core::model::{Subscription, SubscriptionDelivery};

    fn seed_subscription(conn: &Connection) -> i64 {
        subscriptions::insert(
            conn,
            &Subscription {
                id: 0,
                owner: "alice".into(),
                printer_id: Some("p1".into()),
                job_id: None,
                events: vec!["job-state-changed".into()],
                lease_seconds: 3600,
                recipient: SubscriptionDelivery::Pull,
                time_interval: 0,
                user_data: Vec::new(),
                created_at: Utc::now(),
            },
        )
        .unwrap()
    }

    #[test]
    fn sequence_numbers_are_dense_and_increasing() {
        let store = Store::open_in_memory().unwrap();
        let sub_id = store.with_tx(|tx| Ok(seed_subscription(tx))).unwrap();

        let (seq1, seq2) = store
            .with_tx(|tx| {
                let a = append(tx, sub_id, "job-created", &AttributeMap::new())?;
                let b = append(tx, sub_id, "job-state-changed", &AttributeMap::new())?;
                Ok((a, b))
            })
            .unwrap();
        assert_eq!(seq1, 1);
        assert_eq!(seq2, 2);
    }

    #[test]
    fn list_from_floor_excludes_earlier_notifications() {
        let store = Store::open_in_memory().unwrap();
        let sub_id = store.with_tx(|tx| Ok(seed_subscription(tx))).unwrap();
        store
            .with_tx(|tx| {
                append(tx, sub_id, "job-created", &AttributeMap::new())?;
                append(tx, sub_id, "job-state-changed", &AttributeMap::new())?;
                Ok(())
            })
            .unwrap();

        let all = store.with_tx_read(|tx| list_from(tx, sub_id, 1)).unwrap();
        assert_eq!(all.len(), 2);

        let only_second = store.with_tx_read(|tx| list_from(tx, sub_id, 2)).unwrap();
        assert_eq!(only_second.len(), 1);
        assert_eq!(only_second[0].id, 2);

        let none = store.with_tx_read(|tx| list_from(tx, sub_id, 3)).unwrap();
        assert!(none.is_empty());
    }
}
