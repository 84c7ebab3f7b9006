// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer CRUD, using the row-mapping/serialize-as-JSON-column pattern
// shared across every table in this store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use pressd_core::error::PressdError;
use pressd_core::model::{Printer, PrinterState};
use pressd_ipp::AttributeMap;

use crate::store::db_err;

fn state_from_i64(n: i64) -> PrinterState {
    match n {
        3 => PrinterState::Idle,
        4 => PrinterState::Processing,
        _ => PrinterState::Stopped,
    }
}

fn row_to_printer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Printer> {
    let default_options_json: String = row.get("default_options")?;
    let default_options: AttributeMap =
        serde_json::from_str(&default_options_json).unwrap_or_default();
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Printer {
        id: row.get("id")?,
        name: row.get("name")?,
        device_uri: row.get("device_uri")?,
        ppd_name: row.get("ppd_name")?,
        location: row.get("location")?,
        info: row.get("info")?,
        geo_location: row.get("geo_location")?,
        organization: row.get("organization")?,
        organizational_unit: row.get("organizational_unit")?,
        state: state_from_i64(row.get("state")?),
        accepting: row.get::<_, i64>("accepting")? != 0,
        shared: row.get::<_, i64>("shared")? != 0,
        is_default: row.get::<_, i64>("is_default")? != 0,
        job_sheets_default: (row.get("job_sheets_start")?, row.get("job_sheets_end")?),
        default_options,
        hold_new_jobs_reason: row.get("hold_new_jobs_reason")?,
        created_at: parse_rfc3339(&created_at),
        updated_at: parse_rfc3339(&updated_at),
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

const SELECT_COLUMNS: &str = "id, name, device_uri, ppd_name, location, info, geo_location, \
    organization, organizational_unit, state, accepting, shared, is_default, \
    job_sheets_start, job_sheets_end, default_options, hold_new_jobs_reason, \
    created_at, updated_at";

pub fn insert(conn: &Connection, printer: &Printer) -> Result<(), PressdError> {
    let default_options_json =
        serde_json::to_string(&printer.default_options).map_err(PressdError::Serialization)?;
    conn.execute(
        &format!(
            "INSERT INTO printers ({SELECT_COLUMNS}) VALUES \
             (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)"
        ),
        params![
            printer.id,
            printer.name,
            printer.device_uri,
            printer.ppd_name,
            printer.location,
            printer.info,
            printer.geo_location,
            printer.organization,
            printer.organizational_unit,
            printer.state.ipp_value(),
            printer.accepting as i64,
            printer.shared as i64,
            printer.is_default as i64,
            printer.job_sheets_default.0,
            printer.job_sheets_default.1,
            default_options_json,
            printer.hold_new_jobs_reason,
            printer.created_at.to_rfc3339(),
            printer.updated_at.to_rfc3339(),
        ],
    )
    .map_err(db_err)?;
    info!(printer_id = %printer.id, name = %printer.name, "printer created");
    Ok(())
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Printer>, PressdError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM printers WHERE id = ?1"),
        params![id],
        row_to_printer,
    )
    .optional()
    .map_err(db_err)
}

pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Printer>, PressdError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM printers WHERE name = ?1"),
        params![name],
        row_to_printer,
    )
    .optional()
    .map_err(db_err)
}

pub fn list(conn: &Connection) -> Result<Vec<Printer>, PressdError> {
    let mut stmt = conn
        .prepare(&format!("SELECT {SELECT_COLUMNS} FROM printers ORDER BY name"))
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], row_to_printer)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

pub fn get_default(conn: &Connection) -> Result<Option<Printer>, PressdError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM printers WHERE is_default = 1 LIMIT 1"),
        [],
        row_to_printer,
    )
    .optional()
    .map_err(db_err)
}

/// Flip `is_default` for `id`, clearing any previously default printer, per
/// the destination-default-uniqueness invariant. Classes share the
/// same uniqueness constraint; callers must also clear `classes.is_default`
/// in the same transaction (see `classes::clear_default`).
pub fn set_default(conn: &Connection, id: &str) -> Result<(), PressdError> {
    conn.execute("UPDATE printers SET is_default = 0", [])
        .map_err(db_err)?;
    let rows = conn
        .execute(
            "UPDATE printers SET is_default = 1 WHERE id = ?1",
            params![id],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("printer {id} not found")));
    }
    Ok(())
}

pub fn clear_default(conn: &Connection) -> Result<(), PressdError> {
    conn.execute("UPDATE printers SET is_default = 0", [])
        .map_err(db_err)?;
    Ok(())
}

pub fn update_state(
    conn: &Connection,
    id: &str,
    state: PrinterState,
    accepting: bool,
) -> Result<(), PressdError> {
    let rows = conn
        .execute(
            "UPDATE printers SET state = ?1, accepting = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                state.ipp_value(),
                accepting as i64,
                Utc::now().to_rfc3339(),
                id
            ],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("printer {id} not found")));
    }
    Ok(())
}

pub fn update_hold_new_jobs(
    conn: &Connection,
    id: &str,
    reason: Option<&str>,
) -> Result<(), PressdError> {
    conn.execute(
        "UPDATE printers SET hold_new_jobs_reason = ?1, updated_at = ?2 WHERE id = ?3",
        params![reason, Utc::now().to_rfc3339(), id],
    )
    .map_err(db_err)?;
    Ok(())
}

pub fn update_attributes(conn: &Connection, printer: &Printer) -> Result<(), PressdError> {
    let default_options_json =
        serde_json::to_string(&printer.default_options).map_err(PressdError::Serialization)?;
    let rows = conn
        .execute(
            "UPDATE printers SET device_uri=?1, ppd_name=?2, location=?3, info=?4, \
             geo_location=?5, organization=?6, organizational_unit=?7, job_sheets_start=?8, \
             job_sheets_end=?9, default_options=?10, shared=?11, updated_at=?12 WHERE id = ?13",
            params![
                printer.device_uri,
                printer.ppd_name,
                printer.location,
                printer.info,
                printer.geo_location,
                printer.organization,
                printer.organizational_unit,
                printer.job_sheets_default.0,
                printer.job_sheets_default.1,
                default_options_json,
                printer.shared as i64,
                Utc::now().to_rfc3339(),
                printer.id,
            ],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("printer {} not found", printer.id)));
    }
    Ok(())
}

/// Delete a printer. Cascades to jobs, documents, subscriptions (foreign
/// keys declare `ON DELETE CASCADE`) deletion invariant.
/// Callers must have `PRAGMA foreign_keys = ON` active on the connection;
/// `Store::init` does not set it globally since cascade-on-delete is the
/// desired CUPS-compatible behavior everywhere this store is used, so it is
/// enabled once per connection open.
pub fn delete(conn: &Connection, id: &str) -> Result<(), PressdError> {
    conn.execute("PRAGMA foreign_keys = ON", []).map_err(db_err)?;
    let rows = conn
        .execute("DELETE FROM printers WHERE id = ?1", params![id])
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("printer {id} not found")));
    }
    info!(printer_id = %id, "printer deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn sample(id: &str, name: &str) -> Printer {
        let now = Utc::now();
        Printer {
            id: id.to_string(),
            name: name.to_string(),
            device_uri: "socket://127.0.0.1".into(),
            ppd_name: None,
            location: "Office".into(),
            info: "Test printer".into(),
            geo_location: None,
            organization: None,
            organizational_unit: None,
            state: PrinterState::Idle,
            accepting: true,
            shared: true,
            is_default: false,
            job_sheets_default: ("none".into(), "none".into()),
            default_options: AttributeMap::new(),
            hold_new_jobs_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_and_get_by_name() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx(|tx| insert(tx, &sample("p1", "Office")))
            .unwrap();
        let found = store
            .with_tx_read(|tx| get_by_name(tx, "Office"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "p1");
    }

    #[test]
    fn set_default_clears_previous() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx(|tx| {
                insert(tx, &sample("p1", "Office"))?;
                insert(tx, &sample("p2", "Lab"))?;
                set_default(tx, "p1")?;
                set_default(tx, "p2")?;
                Ok(())
            })
            .unwrap();

        let default = store.with_tx_read(|tx| get_default(tx)).unwrap().unwrap();
        assert_eq!(default.id, "p2");

        let all = store.with_tx_read(|tx| list(tx)).unwrap();
        assert_eq!(all.iter().filter(|p| p.is_default).count(), 1);
    }

    #[test]
    fn delete_cascades_is_idempotent_error_when_missing() {
        let store = Store::open_in_memory().unwrap();
        let result = store.with_tx(|tx| delete(tx, "missing"));
        assert!(result.is_err());
    }
}
