// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stored-document CRUD. Synthetic (banner) documents are
// never persisted here — `pressd_dispatch::banner` computes them at read
// time and merges them with these rows into a single ordinal space.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;
use uuid::Uuid;

use pressd_core::error::PressdError;
use pressd_core::model::StoredDocument;

use crate::store::db_err;

const SELECT_COLUMNS: &str = "id, job_id, ordinal, file_name, mime_type, spool_path, size_bytes";

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredDocument> {
    Ok(StoredDocument {
        id: row.get("id")?,
        job_id: row.get("job_id")?,
        ordinal: row.get("ordinal")?,
        file_name: row.get("file_name")?,
        mime_type: row.get("mime_type")?,
        spool_path: row.get("spool_path")?,
        size_bytes: row.get::<_, i64>("size_bytes")? as u64,
    })
}

/// Append a document to a job, assigning the next ordinal. Ordinals among
/// stored documents are 1-based and contiguous, preserving the
/// `(job, ordinal)` uniqueness invariant (synthetic banner ordinals are
/// computed around this range, not interleaved into storage).
pub fn append(
    conn: &Connection,
    job_id: i64,
    file_name: &str,
    mime_type: &str,
    spool_path: &str,
    size_bytes: u64,
) -> Result<StoredDocument, PressdError> {
    let next_ordinal: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(ordinal), 0) + 1 FROM documents WHERE job_id = ?1",
            params![job_id],
            |r| r.get(0),
        )
        .map_err(db_err)?;

    let doc = StoredDocument {
        id: Uuid::new_v4().to_string(),
        job_id,
        ordinal: next_ordinal,
        file_name: file_name.to_string(),
        mime_type: mime_type.to_string(),
        spool_path: spool_path.to_string(),
        size_bytes,
    };

    conn.execute(
        &format!("INSERT INTO documents ({SELECT_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7)"),
        params![
            doc.id,
            doc.job_id,
            doc.ordinal,
            doc.file_name,
            doc.mime_type,
            doc.spool_path,
            doc.size_bytes as i64,
        ],
    )
    .map_err(db_err)?;

    info!(job_id, ordinal = doc.ordinal, "document appended");
    Ok(doc)
}

pub fn list_for_job(conn: &Connection, job_id: i64) -> Result<Vec<StoredDocument>, PressdError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE job_id = ?1 ORDER BY ordinal"
        ))
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![job_id], row_to_document)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

pub fn get(conn: &Connection, job_id: i64, ordinal: i32) -> Result<Option<StoredDocument>, PressdError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM documents WHERE job_id = ?1 AND ordinal = ?2"),
        params![job_id, ordinal],
        row_to_document,
    )
    .optional()
    .map_err(db_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs;
    use crate::printers;
    use crate::store::Store;
    use chrono::Utc;
    use pressd_core::model::{Job, JobState, Printer, PrinterState};
    use pressd_ipp::AttributeMap;

    fn seed(conn: &Connection) -> i64 {
        let now = Utc::now();
        printers::insert(
            conn,
            &Printer {
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
        jobs::insert(
            conn,
            &Job {
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
            },
        )
        .unwrap()
    }

    #[test]
    fn ordinals_are_contiguous_from_one() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx(|tx| {
                let job_id = seed(tx);
                let d1 = append(tx, job_id, "a.pdf", "application/pdf", "/spool/a", 100)?;
                let d2 = append(tx, job_id, "b.pdf", "application/pdf", "/spool/b", 200)?;
                assert_eq!(d1.ordinal, 1);
                assert_eq!(d2.ordinal, 2);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn repeated_reads_return_identical_ordinals() {
        let store = Store::open_in_memory().unwrap();
        let job_id = store.with_tx(|tx| Ok(seed(tx))).unwrap();
        store
            .with_tx(|tx| append(tx, job_id, "a.pdf", "application/pdf", "/spool/a", 1).map(|_| ()))
            .unwrap();

        let first = store.with_tx_read(|tx| list_for_job(tx, job_id)).unwrap();
        let second = store.with_tx_read(|tx| list_for_job(tx, job_id)).unwrap();
        assert_eq!(
            first.iter().map(|d| d.ordinal).collect::<Vec<_>>(),
            second.iter().map(|d| d.ordinal).collect::<Vec<_>>()
        );
    }
}
