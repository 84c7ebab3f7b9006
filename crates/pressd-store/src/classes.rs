// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Class CRUD and member-list management.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use pressd_core::error::PressdError;
use pressd_core::model::{Class, PrinterState};
use pressd_ipp::AttributeMap;

use crate::store::db_err;

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn state_from_i64(n: i64) -> PrinterState {
    match n {
        3 => PrinterState::Idle,
        4 => PrinterState::Processing,
        _ => PrinterState::Stopped,
    }
}

fn members_of(conn: &Connection, class_id: &str) -> Result<Vec<String>, PressdError> {
    let mut stmt = conn
        .prepare("SELECT printer_id FROM class_members WHERE class_id = ?1 ORDER BY ordinal")
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![class_id], |r| r.get::<_, String>(0))
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

fn row_to_class(conn: &Connection, row: &rusqlite::Row<'_>) -> rusqlite::Result<(Class, String)> {
    let id: String = row.get("id")?;
    let default_options_json: String = row.get("default_options")?;
    let default_options: AttributeMap =
        serde_json::from_str(&default_options_json).unwrap_or_default();
    let members = members_of(conn, &id).unwrap_or_default();

    Ok((
        Class {
            id: id.clone(),
            name: row.get("name")?,
            info: row.get("info")?,
            location: row.get("location")?,
            state: state_from_i64(row.get("state")?),
            accepting: row.get::<_, i64>("accepting")? != 0,
            is_default: row.get::<_, i64>("is_default")? != 0,
            members,
            job_sheets_default: (row.get("job_sheets_start")?, row.get("job_sheets_end")?),
            default_options,
            created_at: parse_rfc3339(&row.get::<_, String>("created_at")?),
            updated_at: parse_rfc3339(&row.get::<_, String>("updated_at")?),
        },
        id,
    ))
}

const SELECT_COLUMNS: &str = "id, name, info, location, state, accepting, is_default, \
    job_sheets_start, job_sheets_end, default_options, created_at, updated_at";

pub fn insert(conn: &Connection, class: &Class) -> Result<(), PressdError> {
    let default_options_json =
        serde_json::to_string(&class.default_options).map_err(PressdError::Serialization)?;
    conn.execute(
        &format!(
            "INSERT INTO classes ({SELECT_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)"
        ),
        params![
            class.id,
            class.name,
            class.info,
            class.location,
            class.state.ipp_value(),
            class.accepting as i64,
            class.is_default as i64,
            class.job_sheets_default.0,
            class.job_sheets_default.1,
            default_options_json,
            class.created_at.to_rfc3339(),
            class.updated_at.to_rfc3339(),
        ],
    )
    .map_err(db_err)?;

    set_members(conn, &class.id, &class.members)?;
    info!(class_id = %class.id, name = %class.name, "class created");
    Ok(())
}

pub fn set_members(conn: &Connection, class_id: &str, members: &[String]) -> Result<(), PressdError> {
    conn.execute(
        "DELETE FROM class_members WHERE class_id = ?1",
        params![class_id],
    )
    .map_err(db_err)?;
    for (ordinal, printer_id) in members.iter().enumerate() {
        conn.execute(
            "INSERT INTO class_members (class_id, printer_id, ordinal) VALUES (?1,?2,?3)",
            params![class_id, printer_id, ordinal as i64],
        )
        .map_err(db_err)?;
    }
    Ok(())
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Class>, PressdError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM classes WHERE id = ?1"),
        params![id],
        |row| row_to_class(conn, row),
    )
    .optional()
    .map_err(db_err)
    .map(|opt| opt.map(|(c, _)| c))
}

pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Class>, PressdError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM classes WHERE name = ?1"),
        params![name],
        |row| row_to_class(conn, row),
    )
    .optional()
    .map_err(db_err)
    .map(|opt| opt.map(|(c, _)| c))
}

pub fn list(conn: &Connection) -> Result<Vec<Class>, PressdError> {
    let mut stmt = conn
        .prepare(&format!("SELECT {SELECT_COLUMNS} FROM classes ORDER BY name"))
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], |row| row_to_class(conn, row))
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows.into_iter().map(|(c, _)| c).collect())
}

pub fn get_default(conn: &Connection) -> Result<Option<Class>, PressdError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM classes WHERE is_default = 1 LIMIT 1"),
        [],
        |row| row_to_class(conn, row),
    )
    .optional()
    .map_err(db_err)
    .map(|opt| opt.map(|(c, _)| c))
}

pub fn set_default(conn: &Connection, id: &str) -> Result<(), PressdError> {
    conn.execute("UPDATE classes SET is_default = 0", [])
        .map_err(db_err)?;
    let rows = conn
        .execute(
            "UPDATE classes SET is_default = 1 WHERE id = ?1",
            params![id],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("class {id} not found")));
    }
    Ok(())
}

pub fn clear_default(conn: &Connection) -> Result<(), PressdError> {
    conn.execute("UPDATE classes SET is_default = 0", [])
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
            "UPDATE classes SET state = ?1, accepting = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                state.ipp_value(),
                accepting as i64,
                Utc::now().to_rfc3339(),
                id
            ],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("class {id} not found")));
    }
    Ok(())
}

pub fn delete(conn: &Connection, id: &str) -> Result<(), PressdError> {
    let rows = conn
        .execute("DELETE FROM classes WHERE id = ?1", params![id])
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("class {id} not found")));
    }
    info!(class_id = %id, "class deleted");
    Ok(())
}

/// Whether `name` is already taken by either a printer or a class, per
/// the "name unique across printers+classes" invariant.
pub fn name_taken(conn: &Connection, name: &str) -> Result<bool, PressdError> {
    let printer_hit: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM printers WHERE name = ?1",
            params![name],
            |r| r.get(0),
        )
        .map_err(db_err)?;
    let class_hit: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM classes WHERE name = ?1",
            params![name],
            |r| r.get(0),
        )
        .map_err(db_err)?;
    Ok(printer_hit > 0 || class_hit > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printers;
    use crate::store::Store;

    fn sample_printer(id: &str, name: &str) -> pressd_core::model::Printer {
        let now = Utc::now();
        pressd_core::model::Printer {
            id: id.into(),
            name: name.into(),
            device_uri: "socket://127.0.0.1".into(),
            ppd_name: None,
            location: String::new(),
            info: String::new(),
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

    fn sample_class(id: &str, name: &str, members: Vec<String>) -> Class {
        let now = Utc::now();
        Class {
            id: id.into(),
            name: name.into(),
            info: String::new(),
            location: String::new(),
            state: PrinterState::Idle,
            accepting: true,
            is_default: false,
            members,
            job_sheets_default: ("none".into(), "none".into()),
            default_options: AttributeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn members_are_ordered_and_persisted() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx(|tx| {
                printers::insert(tx, &sample_printer("p1", "Office"))?;
                printers::insert(tx, &sample_printer("p2", "Lab"))?;
                insert(tx, &sample_class("c1", "Team", vec!["p1".into(), "p2".into()]))
            })
            .unwrap();

        let class = store.with_tx_read(|tx| get(tx, "c1")).unwrap().unwrap();
        assert_eq!(class.members, vec!["p1".to_string(), "p2".to_string()]);
    }

    #[test]
    fn name_taken_checks_both_tables() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx(|tx| printers::insert(tx, &sample_printer("p1", "Office")))
            .unwrap();
        let taken = store.with_tx_read(|tx| name_taken(tx, "Office")).unwrap();
        assert!(taken);
        let free = store.with_tx_read(|tx| name_taken(tx, "Nope")).unwrap();
        assert!(!free);
    }
}
