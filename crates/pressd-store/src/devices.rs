// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device discovery cache: entries older than TTL are
// pruned; lookups fall through to live discovery on miss.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use pressd_core::error::PressdError;
use pressd_core::model::DeviceCacheEntry;

use crate::store::db_err;

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeviceCacheEntry> {
    Ok(DeviceCacheEntry {
        uri: row.get("uri")?,
        info: row.get("info")?,
        make: row.get("make")?,
        class: row.get("class")?,
        device_id: row.get("device_id")?,
        location: row.get("location")?,
        updated_at: parse_rfc3339(&row.get::<_, String>("updated_at")?),
    })
}

pub fn upsert(conn: &Connection, entry: &DeviceCacheEntry) -> Result<(), PressdError> {
    conn.execute(
        "INSERT INTO device_cache (uri, info, make, class, device_id, location, updated_at) \
         VALUES (?1,?2,?3,?4,?5,?6,?7) \
         ON CONFLICT(uri) DO UPDATE SET info=excluded.info, make=excluded.make, \
         class=excluded.class, device_id=excluded.device_id, location=excluded.location, \
         updated_at=excluded.updated_at",
        params![
            entry.uri,
            entry.info,
            entry.make,
            entry.class,
            entry.device_id,
            entry.location,
            entry.updated_at.to_rfc3339(),
        ],
    )
    .map_err(db_err)?;
    Ok(())
}

/// Entries fresher than `ttl`, relative to `now`.
pub fn list_fresh(
    conn: &Connection,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
) -> Result<Vec<DeviceCacheEntry>, PressdError> {
    let mut stmt = conn
        .prepare("SELECT uri, info, make, class, device_id, location, updated_at FROM device_cache")
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], row_to_entry)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows
        .into_iter()
        .filter(|e| now.signed_duration_since(e.updated_at) < ttl)
        .collect())
}

pub fn prune_stale(
    conn: &Connection,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
) -> Result<usize, PressdError> {
    let cutoff = now - ttl;
    let removed = conn
        .execute(
            "DELETE FROM device_cache WHERE updated_at < ?1",
            params![cutoff.to_rfc3339()],
        )
        .map_err(db_err)?;
    Ok(removed)
}
