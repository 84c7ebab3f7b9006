// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subscription & notification engine: event matching against
// a subscription's `notify-events`, and the `notify-get-interval` the
// dispatcher tells a pull client to wait before polling again.

use pressd_core::model::{Job, JobState, Printer, PrinterState, Subscription};

/// Every event a destination or job can emit.
pub const ALL_EVENTS: &[&str] = &[
    "job-created",
    "job-state-changed",
    "job-completed",
    "job-stopped",
    "printer-state-changed",
    "printer-restarted",
    "printer-shutdown",
];

/// Whether `subscription` is interested in `event`, given `notify-events`
/// defaults to the catch-all "every event the scope can emit" when the
/// creator left it empty.
pub fn matches_subscription(subscription: &Subscription, event: &str) -> bool {
    if subscription.events.is_empty() {
        return true;
    }
    subscription
        .events
        .iter()
        .any(|e| e == event || e == "all")
}

/// The events a job-state transition emits:
/// every transition emits `job-state-changed`; reaching `Completed` also
/// emits `job-completed`; reaching `Stopped` also emits `job-stopped`.
pub fn events_for_job_transition(new_state: JobState) -> Vec<&'static str> {
    let mut events = vec!["job-state-changed"];
    match new_state {
        JobState::Completed => events.push("job-completed"),
        JobState::Stopped => events.push("job-stopped"),
        _ => {}
    }
    events
}

/// The events a printer-state transition emits. Stopping is
/// folded into the generic `printer-state-changed`; `printer-restarted`/
/// `printer-shutdown` are emitted by the server lifecycle, not a state
/// transition, so they are not produced here.
pub fn events_for_printer_transition() -> Vec<&'static str> {
    vec!["printer-state-changed"]
}

/// `notify-get-interval` for a pull-mode subscription's Get-Notifications
/// response, on a floor-based schedule: a job already in a
/// terminal-or-later state needs no more polling (0); an active job's
/// events arrive quickly (10s); a stopped printer changes state rarely
/// (30s); anything else falls back to the 60s default poll.
pub fn compute_get_interval(job: Option<&Job>, printer: Option<&Printer>) -> i64 {
    if let Some(job) = job {
        if job.state.ipp_value() >= 6 {
            return 0;
        }
        if job.state == JobState::Processing {
            return 10;
        }
    }
    if let Some(printer) = printer {
        if printer.state == PrinterState::Stopped {
            return 30;
        }
    }
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pressd_core::model::SubscriptionDelivery;
    use pressd_ipp::AttributeMap;

    fn sub(events: Vec<&str>) -> Subscription {
        Subscription {
            id: 1,
            owner: "alice".into(),
            printer_id: Some("p1".into()),
            job_id: None,
            events: events.into_iter().map(String::from).collect(),
            lease_seconds: 3600,
            recipient: SubscriptionDelivery::Pull,
            time_interval: 0,
            user_data: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn sample_job(state: JobState) -> Job {
        Job {
            id: 1,
            printer_id: "p1".into(),
            name: "doc".into(),
            user_name: "alice".into(),
            submitted_at: Utc::now(),
            completed_at: None,
            state,
            state_reason: "none".into(),
            options: AttributeMap::new(),
            impressions: 0,
            priority: 50,
            open_for_documents: false,
        }
    }

    #[test]
    fn empty_events_list_defaults_to_catch_all() {
        assert!(matches_subscription(&sub(vec![]), "job-completed"));
    }

    #[test]
    fn non_matching_named_event_is_filtered() {
        assert!(!matches_subscription(&sub(vec!["printer-state-changed"]), "job-completed"));
    }

    #[test]
    fn completed_job_emits_both_events() {
        let events = events_for_job_transition(JobState::Completed);
        assert!(events.contains(&"job-state-changed"));
        assert!(events.contains(&"job-completed"));
    }

    #[test]
    fn get_interval_is_zero_once_job_reaches_terminal_state() {
        assert_eq!(compute_get_interval(Some(&sample_job(JobState::Canceled)), None), 0);
    }

    #[test]
    fn get_interval_is_short_for_processing_job() {
        assert_eq!(compute_get_interval(Some(&sample_job(JobState::Processing)), None), 10);
    }

    #[test]
    fn get_interval_falls_back_to_default_poll() {
        assert_eq!(compute_get_interval(None, None), 60);
    }
}
