// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subscription CRUD.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use pressd_core::error::PressdError;
use pressd_core::model::{Subscription, SubscriptionDelivery};

use crate::store::db_err;

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

const SELECT_COLUMNS: &str = "id, owner, printer_id, job_id, events, lease_seconds, \
    recipient_kind, recipient_uri, time_interval, user_data, created_at";

fn row_to_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subscription> {
    let events_json: String = row.get("events")?;
    let events: Vec<String> = serde_json::from_str(&events_json).unwrap_or_default();
    let recipient_kind: String = row.get("recipient_kind")?;
    let recipient_uri: Option<String> = row.get("recipient_uri")?;
    let recipient = if recipient_kind == "uri" {
        SubscriptionDelivery::RecipientUri(recipient_uri.unwrap_or_default())
    } else {
        SubscriptionDelivery::Pull
    };

    Ok(Subscription {
        id: row.get("id")?,
        owner: row.get("owner")?,
        printer_id: row.get("printer_id")?,
        job_id: row.get("job_id")?,
        events,
        lease_seconds: row.get("lease_seconds")?,
        recipient,
        time_interval: row.get("time_interval")?,
        user_data: row.get("user_data").unwrap_or_default(),
        created_at: parse_rfc3339(&row.get::<_, String>("created_at")?),
    })
}

pub fn insert(conn: &Connection, sub: &Subscription) -> Result<i64, PressdError> {
    let events_json = serde_json::to_string(&sub.events).map_err(PressdError::Serialization)?;
    let (recipient_kind, recipient_uri) = match &sub.recipient {
        SubscriptionDelivery::RecipientUri(uri) => ("uri", Some(uri.clone())),
        SubscriptionDelivery::Pull => ("pull", None),
    };

    conn.execute(
        "INSERT INTO subscriptions (owner, printer_id, job_id, events, lease_seconds, \
         recipient_kind, recipient_uri, time_interval, user_data, created_at) \
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        params![
            sub.owner,
            sub.printer_id,
            sub.job_id,
            events_json,
            sub.lease_seconds,
            recipient_kind,
            recipient_uri,
            sub.time_interval,
            sub.user_data,
            sub.created_at.to_rfc3339(),
        ],
    )
    .map_err(db_err)?;
    let id = conn.last_insert_rowid();
    info!(subscription_id = id, owner = %sub.owner, "subscription created");
    Ok(id)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Subscription>, PressdError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM subscriptions WHERE id = ?1"),
        params![id],
        row_to_subscription,
    )
    .optional()
    .map_err(db_err)
}

pub fn list_for_printer(conn: &Connection, printer_id: &str) -> Result<Vec<Subscription>, PressdError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM subscriptions WHERE printer_id = ?1 ORDER BY id"
        ))
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![printer_id], row_to_subscription)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

pub fn list_for_job(conn: &Connection, job_id: i64) -> Result<Vec<Subscription>, PressdError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM subscriptions WHERE job_id = ?1 ORDER BY id"
        ))
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![job_id], row_to_subscription)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

pub fn list_all(conn: &Connection) -> Result<Vec<Subscription>, PressdError> {
    let mut stmt = conn
        .prepare(&format!("SELECT {SELECT_COLUMNS} FROM subscriptions ORDER BY id"))
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], row_to_subscription)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

/// Renew a printer subscription's lease, resetting `created_at` so the
/// lease-expiry check (`Subscription::is_expired`) starts counting again.
/// Job subscriptions do not apply — callers must reject those with
/// `not-possible` before calling.
pub fn renew(conn: &Connection, id: i64, lease_seconds: i64) -> Result<(), PressdError> {
    let rows = conn
        .execute(
            "UPDATE subscriptions SET lease_seconds = ?1, created_at = ?2 WHERE id = ?3 AND job_id IS NULL",
            params![lease_seconds, Utc::now().to_rfc3339(), id],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!(
            "subscription {id} not found or is job-scoped"
        )));
    }
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<(), PressdError> {
    let rows = conn
        .execute("DELETE FROM subscriptions WHERE id = ?1", params![id])
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("subscription {id} not found")));
    }
    info!(subscription_id = id, "subscription cancelled");
    Ok(())
}

/// Remove subscriptions whose lease has expired (printer subs only),
/// lazily pruned on call rather than on a timer.
pub fn prune_expired(conn: &Connection) -> Result<usize, PressdError> {
    let subs = list_all(conn)?;
    let now = Utc::now();
    let mut pruned = 0;
    for sub in subs {
        if sub.is_expired(now) {
            delete(conn, sub.id)?;
            pruned += 1;
        }
    }
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn sample(printer_id: Option<&str>, job_id: Option<i64>) -> Subscription {
        Subscription {
            id: 0,
            owner: "alice".into(),
            printer_id: printer_id.map(String::from),
            job_id,
            events: vec!["job-state-changed".into()],
            lease_seconds: 3600,
            recipient: SubscriptionDelivery::Pull,
            time_interval: 0,
            user_data: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn job_subscriptions_never_expire_via_lease() {
        let mut sub = sample(None, Some(1));
        sub.created_at = Utc::now() - chrono::Duration::hours(10);
        sub.lease_seconds = 1;
        assert!(!sub.is_expired(Utc::now()));
    }

    #[test]
    fn printer_subscriptions_expire_after_lease() {
        let mut sub = sample(Some("p1"), None);
        sub.created_at = Utc::now() - chrono::Duration::hours(10);
        sub.lease_seconds = 60;
        assert!(sub.is_expired(Utc::now()));
    }

    #[test]
    fn renew_resets_lease_clock() {
        let store = Store::open_in_memory().unwrap();
        let id = store.with_tx(|tx| insert(tx, &sample(Some("p1"), None))).unwrap();
        store.with_tx(|tx| renew(tx, id, 7200)).unwrap();
        let sub = store.with_tx_read(|tx| get(tx, id)).unwrap().unwrap();
        assert_eq!(sub.lease_seconds, 7200);
        assert!(!sub.is_expired(Utc::now()));
    }

    #[test]
    fn renew_rejects_job_scoped_subscription() {
        let store = Store::open_in_memory().unwrap();
        let id = store.with_tx(|tx| insert(tx, &sample(None, Some(1)))).unwrap();
        let result = store.with_tx(|tx| renew(tx, id, 7200));
        assert!(result.is_err());
    }
}
