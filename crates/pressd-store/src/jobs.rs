// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job CRUD and state-machine persistence: printer-scoped, integer-id
// jobs carrying a state-reason keyword alongside the numeric state.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use pressd_core::error::PressdError;
use pressd_core::model::{Job, JobState};
use pressd_ipp::AttributeMap;

use crate::store::db_err;

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn state_from_i64(n: i64) -> JobState {
    match n {
        3 => JobState::Pending,
        4 => JobState::Held,
        5 => JobState::Processing,
        6 => JobState::Stopped,
        7 => JobState::Canceled,
        8 => JobState::Aborted,
        _ => JobState::Completed,
    }
}

const SELECT_COLUMNS: &str = "id, printer_id, name, user_name, submitted_at, completed_at, \
    state, state_reason, options, impressions, priority, open_for_documents";

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let options_json: String = row.get("options")?;
    let options: AttributeMap = serde_json::from_str(&options_json).unwrap_or_default();
    let completed_at: Option<String> = row.get("completed_at")?;

    Ok(Job {
        id: row.get("id")?,
        printer_id: row.get("printer_id")?,
        name: row.get("name")?,
        user_name: row.get("user_name")?,
        submitted_at: parse_rfc3339(&row.get::<_, String>("submitted_at")?),
        completed_at: completed_at.map(|s| parse_rfc3339(&s)),
        state: state_from_i64(row.get("state")?),
        state_reason: row.get("state_reason")?,
        options,
        impressions: row.get("impressions")?,
        priority: row.get("priority")?,
        open_for_documents: row.get::<_, i64>("open_for_documents")? != 0,
    })
}

/// Insert a new job, returning its assigned monotonic id.
pub fn insert(conn: &Connection, job: &Job) -> Result<i64, PressdError> {
    let options_json = serde_json::to_string(&job.options).map_err(PressdError::Serialization)?;
    conn.execute(
        "INSERT INTO jobs (printer_id, name, user_name, submitted_at, completed_at, state, \
         state_reason, options, impressions, priority, open_for_documents) \
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            job.printer_id,
            job.name,
            job.user_name,
            job.submitted_at.to_rfc3339(),
            job.completed_at.map(|d| d.to_rfc3339()),
            job.state.ipp_value(),
            job.state_reason,
            options_json,
            job.impressions,
            job.priority,
            job.open_for_documents as i64,
        ],
    )
    .map_err(db_err)?;
    let id = conn.last_insert_rowid();
    info!(job_id = id, printer_id = %job.printer_id, "job created");
    Ok(id)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Job>, PressdError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM jobs WHERE id = ?1"),
        params![id],
        row_to_job,
    )
    .optional()
    .map_err(db_err)
}

pub fn list_for_printer(conn: &Connection, printer_id: &str) -> Result<Vec<Job>, PressdError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM jobs WHERE printer_id = ?1 ORDER BY id"
        ))
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![printer_id], row_to_job)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

pub fn list_all(conn: &Connection) -> Result<Vec<Job>, PressdError> {
    let mut stmt = conn
        .prepare(&format!("SELECT {SELECT_COLUMNS} FROM jobs ORDER BY id"))
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], row_to_job)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

pub fn list_by_user(conn: &Connection, user_name: &str) -> Result<Vec<Job>, PressdError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM jobs WHERE user_name = ?1 ORDER BY id"
        ))
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![user_name], row_to_job)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

/// Transition a job's state and reason. The caller is responsible for
/// enforcing the terminality invariant before calling this —
/// see `pressd_dispatch::ops::transition_job`.
pub fn set_state(
    conn: &Connection,
    id: i64,
    state: JobState,
    reason: &str,
) -> Result<(), PressdError> {
    let completed_at = if matches!(
        state,
        JobState::Completed | JobState::Canceled | JobState::Aborted
    ) {
        Some(Utc::now().to_rfc3339())
    } else {
        None
    };
    let rows = conn
        .execute(
            "UPDATE jobs SET state = ?1, state_reason = ?2, completed_at = COALESCE(?3, completed_at) WHERE id = ?4",
            params![state.ipp_value(), reason, completed_at, id],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("job {id} not found")));
    }
    debug!(job_id = id, ?state, reason, "job state updated");
    Ok(())
}

pub fn set_options(conn: &Connection, id: i64, options: &AttributeMap) -> Result<(), PressdError> {
    let options_json = serde_json::to_string(options).map_err(PressdError::Serialization)?;
    let rows = conn
        .execute(
            "UPDATE jobs SET options = ?1 WHERE id = ?2",
            params![options_json, id],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("job {id} not found")));
    }
    Ok(())
}

pub fn set_open_for_documents(conn: &Connection, id: i64, open: bool) -> Result<(), PressdError> {
    let rows = conn
        .execute(
            "UPDATE jobs SET open_for_documents = ?1 WHERE id = ?2",
            params![open as i64, id],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("job {id} not found")));
    }
    Ok(())
}

pub fn set_priority(conn: &Connection, id: i64, priority: i32) -> Result<(), PressdError> {
    let rows = conn
        .execute(
            "UPDATE jobs SET priority = ?1 WHERE id = ?2",
            params![priority, id],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("job {id} not found")));
    }
    Ok(())
}

/// Move a job to a different destination printer (CUPS-Move-Job).
pub fn move_to_printer(conn: &Connection, id: i64, printer_id: &str) -> Result<(), PressdError> {
    let rows = conn
        .execute(
            "UPDATE jobs SET printer_id = ?1 WHERE id = ?2",
            params![printer_id, id],
        )
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("job {id} not found")));
    }
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<(), PressdError> {
    let rows = conn
        .execute("DELETE FROM jobs WHERE id = ?1", params![id])
        .map_err(db_err)?;
    if rows == 0 {
        return Err(PressdError::Store(format!("job {id} not found")));
    }
    info!(job_id = id, "job deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printers;
    use crate::store::Store;
    use pressd_core::model::PrinterState;

    fn seed_printer(conn: &Connection) {
        let now = Utc::now();
        printers::insert(
            conn,
            &pressd_core::model::Printer {
                id: "p1".into(),
                name: "Office".into(),
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
            },
        )
        .unwrap();
    }

    fn sample_job() -> Job {
        let now = Utc::now();
        Job {
            id: 0,
            printer_id: "p1".into(),
            name: "test".into(),
            user_name: "alice".into(),
            submitted_at: now,
            completed_at: None,
            state: JobState::Pending,
            state_reason: "none".into(),
            options: AttributeMap::new(),
            impressions: 0,
            priority: 50,
            open_for_documents: false,
        }
    }

    #[test]
    fn insert_assigns_monotonic_ids() {
        let store = Store::open_in_memory().unwrap();
        let (id1, id2) = store
            .with_tx(|tx| {
                seed_printer(tx);
                let a = insert(tx, &sample_job())?;
                let b = insert(tx, &sample_job())?;
                Ok((a, b))
            })
            .unwrap();
        assert!(id2 > id1);
    }

    #[test]
    fn set_state_records_completion_time_on_terminal() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .with_tx(|tx| {
                seed_printer(tx);
                insert(tx, &sample_job())
            })
            .unwrap();
        store
            .with_tx(|tx| set_state(tx, id, JobState::Canceled, "job-canceled-by-user"))
            .unwrap();

        let job = store.with_tx_read(|tx| get(tx, id)).unwrap().unwrap();
        assert_eq!(job.state, JobState::Canceled);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn delete_cascades_when_printer_removed() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .with_tx(|tx| {
                seed_printer(tx);
                insert(tx, &sample_job())
            })
            .unwrap();
        store.with_tx(|tx| printers::delete(tx, "p1")).unwrap();
        let job = store.with_tx_read(|tx| get(tx, id)).unwrap();
        assert!(job.is_none());
    }
}
