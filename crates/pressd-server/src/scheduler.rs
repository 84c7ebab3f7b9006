// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background job-processing loop: advances `pending` jobs on accepting
// printers through `processing` to `completed` (or back with a state
// reason on backend failure), handing spooled document bytes to the
// matched device backend. Runs as a recurring poll rather than a
// per-connection task, since a standalone daemon has no persistent
// client connection to drive job processing.

use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use pressd_backend::backend_for_uri;
use pressd_core::config::ServerConfig;
use pressd_core::error::Result;
use pressd_core::model::{Job, JobState, Printer};
use pressd_dispatch::{events_for_job_transition, matches_subscription, transition_job};
use pressd_ipp::AttributeMap;
use pressd_store::{documents, jobs, notifications, printers, subscriptions as sub_store, Store};

/// How often the scheduler wakes to look for pending jobs.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Run the scheduler loop until the process exits. Intended to be spawned
/// once at startup alongside the HTTP listener (`main.rs`).
pub async fn run(store: &Store, config: &ServerConfig) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        if let Err(e) = process_once(store, config).await {
            error!(error = %e, "scheduler pass failed");
        }
    }
}

#[instrument(skip(store, config))]
async fn process_once(store: &Store, config: &ServerConfig) -> Result<()> {
    let candidates = store.with_tx_read(|tx| {
        let mut pending = Vec::new();
        for job in jobs::list_all(tx)? {
            if job.state != JobState::Pending || job.open_for_documents {
                continue;
            }
            if let Some(printer) = printers::get(tx, &job.printer_id)? {
                if printer.accepting && matches!(printer.state, pressd_core::model::PrinterState::Idle) {
                    pending.push((job, printer));
                }
            }
        }
        Ok(pending)
    })?;

    for (job, printer) in candidates {
        process_job(store, config, job, printer).await;
    }
    Ok(())
}

async fn process_job(store: &Store, config: &ServerConfig, job: Job, printer: Printer) {
    let job_id = job.id;
    if let Err(e) = store.with_tx(|tx| transition_job(tx, &job, JobState::Processing, "job-processing")) {
        warn!(job_id, error = %e, "could not start processing job");
        return;
    }
    emit(store, &printer.id, job_id, &events_for_job_transition(JobState::Processing));

    let docs = match store.with_tx_read(|tx| documents::list_for_job(tx, job_id)) {
        Ok(docs) => docs,
        Err(e) => {
            fail_job(store, &printer, job_id, &format!("could not list documents: {e}"));
            return;
        }
    };

    let backend = match backend_for_uri(&printer.device_uri) {
        Ok(backend) => backend,
        Err(e) => {
            fail_job(store, &printer, job_id, &format!("no backend for device: {e}"));
            return;
        }
    };

    let deadline = Duration::from_secs(config.backend_query_timeout_secs.max(5));
    for doc in &docs {
        let bytes = match std::fs::read(&doc.spool_path) {
            Ok(b) => b,
            Err(e) => {
                fail_job(store, &printer, job_id, &format!("spool read failed: {e}"));
                return;
            }
        };
        if let Err(e) = backend.send(&bytes, deadline).await {
            fail_job(store, &printer, job_id, &format!("backend send failed: {e}"));
            return;
        }
    }

    debug!(job_id, printer = %printer.name, documents = docs.len(), "job sent to device");

    if let Err(e) = store.with_tx(|tx| {
        let job = jobs::get(tx, job_id)?.ok_or_else(|| {
            pressd_core::error::PressdError::Store(format!("job {job_id} vanished mid-processing"))
        })?;
        transition_job(tx, &job, JobState::Completed, "job-completed-successfully")
    }) {
        warn!(job_id, error = %e, "could not mark job completed");
        return;
    }
    emit(store, &printer.id, job_id, &events_for_job_transition(JobState::Completed));
    info!(job_id, printer = %printer.name, "job completed");
}

fn fail_job(store: &Store, printer: &Printer, job_id: i64, reason: &str) {
    warn!(job_id, printer = %printer.name, reason, "job processing failed");
    let result = store.with_tx(|tx| {
        let job = jobs::get(tx, job_id)?.ok_or_else(|| {
            pressd_core::error::PressdError::Store(format!("job {job_id} vanished mid-processing"))
        })?;
        transition_job(tx, &job, JobState::Aborted, reason)
    });
    if let Err(e) = result {
        error!(job_id, error = %e, "could not mark job aborted after failure");
    }
    emit(store, &printer.id, job_id, &events_for_job_transition(JobState::Aborted));
}

/// Notify subscribers of job-scoped events. Mirrors
/// `pressd-dispatch::ops::emit_events`, reimplemented here with the
/// public store/subscription API since that helper is private to the
/// dispatch crate and the scheduler transitions job state outside of any
/// single `dispatch()` call.
fn emit(store: &Store, printer_id: &str, job_id: i64, events: &[&'static str]) {
    let result = store.with_tx(|tx| {
        let mut subs = sub_store::list_for_job(tx, job_id)?;
        subs.extend(sub_store::list_for_printer(tx, printer_id)?);
        subs.extend(
            sub_store::list_all(tx)?
                .into_iter()
                .filter(|s| s.printer_id.is_none() && s.job_id.is_none()),
        );
        for &event in events {
            for sub in &subs {
                if matches_subscription(sub, event) {
                    notifications::append(tx, sub.id, event, &AttributeMap::new())?;
                }
            }
        }
        Ok(())
    });
    if let Err(e) = result {
        warn!(job_id, events = ?events, error = %e, "failed to emit subscription event");
    }
}
