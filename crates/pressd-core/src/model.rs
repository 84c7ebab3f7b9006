// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Domain entities for the print-spooling data model: the full
// Printer/Class/Job/Document/Subscription/Notification/Setting/
// DeviceCacheEntry set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pressd_ipp::AttributeMap;

/// Printer lifecycle state: IPP `printer-state` enum values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterState {
    Idle = 3,
    Processing = 4,
    Stopped = 5,
}

impl PrinterState {
    pub fn ipp_value(self) -> i32 {
        self as i32
    }
}

/// Job lifecycle state: IPP `job-state` enum values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending = 3,
    Held = 4,
    Processing = 5,
    Stopped = 6,
    Canceled = 7,
    Aborted = 8,
    Completed = 9,
}

impl JobState {
    pub fn ipp_value(self) -> i32 {
        self as i32
    }

    /// Terminal states job-state-terminality invariant:
    /// once a job reaches one of these, no handler may change its state or
    /// append documents.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Canceled | JobState::Aborted | JobState::Completed
        )
    }
}

/// A printer destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Printer {
    pub id: String,
    pub name: String,
    pub device_uri: String,
    pub ppd_name: Option<String>,
    pub location: String,
    pub info: String,
    pub geo_location: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub state: PrinterState,
    pub accepting: bool,
    pub shared: bool,
    pub is_default: bool,
    pub job_sheets_default: (String, String),
    pub default_options: AttributeMap,
    /// Set by Hold-New-Jobs / Release-Held-New-Jobs; `None` when new jobs
    /// are accepted normally.
    pub hold_new_jobs_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named bundle of member printers presented as a single destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub info: String,
    pub location: String,
    pub state: PrinterState,
    pub accepting: bool,
    pub is_default: bool,
    /// Member printer ids, in the stable order used to pick the first
    /// accepting member.
    pub members: Vec<String>,
    pub job_sheets_default: (String, String),
    pub default_options: AttributeMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Either a `Printer` or a `Class`, the handler-level unit of targeting.
#[derive(Debug, Clone)]
pub enum Destination {
    Printer(Printer),
    Class(Class),
}

impl Destination {
    pub fn id(&self) -> &str {
        match self {
            Destination::Printer(p) => &p.id,
            Destination::Class(c) => &c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Destination::Printer(p) => &p.name,
            Destination::Class(c) => &c.name,
        }
    }

    pub fn accepting(&self) -> bool {
        match self {
            Destination::Printer(p) => p.accepting,
            Destination::Class(c) => c.accepting,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Destination::Class(_))
    }

    pub fn default_options(&self) -> &AttributeMap {
        match self {
            Destination::Printer(p) => &p.default_options,
            Destination::Class(c) => &c.default_options,
        }
    }

    pub fn job_sheets_default(&self) -> &(String, String) {
        match self {
            Destination::Printer(p) => &p.job_sheets_default,
            Destination::Class(c) => &c.job_sheets_default,
        }
    }
}

/// A print job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Monotonic, per-process job id.
    pub id: i64,
    pub printer_id: String,
    pub name: String,
    pub user_name: String,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub state: JobState,
    pub state_reason: String,
    pub options: AttributeMap,
    pub impressions: i32,
    pub priority: i32,
    /// Set when the job is still accumulating documents (between Create-Job
    /// and Close-Job); Print-Job jobs are never open.
    pub open_for_documents: bool,
}

impl Job {
    /// `job-uri` for this job URI form.
    pub fn uri(&self, base: &str) -> String {
        format!("{base}/jobs/{}", self.id)
    }
}

/// A stored or synthetic (banner) document attached to a job: the
/// `Document ∈ {Stored, Synthetic}` split that lets listing merge both
/// kinds into a single ordinal space without persisting synthetic rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Document {
    Stored(StoredDocument),
    Synthetic(SyntheticDocument),
}

impl Document {
    pub fn ordinal(&self) -> i32 {
        match self {
            Document::Stored(d) => d.ordinal,
            Document::Synthetic(d) => d.ordinal,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Document::Stored(d) => &d.mime_type,
            Document::Synthetic(_) => "application/vnd.cups-banner",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Document::Stored(d) => &d.file_name,
            Document::Synthetic(d) => &d.name,
        }
    }
}

/// A document backed by real spooled bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub job_id: i64,
    pub ordinal: i32,
    pub file_name: String,
    pub mime_type: String,
    pub spool_path: String,
    pub size_bytes: u64,
}

/// A banner pseudo-document, rendered at read time rather than persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticDocument {
    pub job_id: i64,
    pub ordinal: i32,
    pub name: String,
    /// `start` or `end`, selecting which banner template to render.
    pub which: BannerSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BannerSlot {
    Start,
    End,
}

/// A persistent interest in events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub owner: String,
    pub printer_id: Option<String>,
    pub job_id: Option<i64>,
    pub events: Vec<String>,
    pub lease_seconds: i64,
    pub recipient: SubscriptionDelivery,
    pub time_interval: i64,
    pub user_data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Job subscriptions don't renew a lease; printer (and server-wide)
    /// subscriptions expire `lease_seconds` after creation unless renewed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.job_id.is_some() {
            return false;
        }
        if self.lease_seconds <= 0 {
            return false;
        }
        now.signed_duration_since(self.created_at).num_seconds() >= self.lease_seconds
    }
}

/// How a subscription's notifications are delivered: either pushed to a
/// `notify-recipient-uri` (scheme must be `ippget`) or pulled via
/// `ippget`/`Get-Notifications`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SubscriptionDelivery {
    RecipientUri(String),
    Pull,
}

/// An appended notification event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Sequence number, monotonic and dense per subscription.
    pub id: i64,
    pub subscription_id: i64,
    pub event: String,
    pub created_at: DateTime<Utc>,
    /// A small snapshot of the attributes relevant to the event (job state,
    /// printer state, etc.) so `Get-Notifications` doesn't need to re-query
    /// the entity, which may have moved on since.
    pub attributes: AttributeMap,
}

/// A process-wide configuration key/value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// A cached device-discovery result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCacheEntry {
    pub uri: String,
    pub info: String,
    pub make: String,
    pub class: String,
    pub device_id: String,
    pub location: String,
    pub updated_at: DateTime<Utc>,
}
