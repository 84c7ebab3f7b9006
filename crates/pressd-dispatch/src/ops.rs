// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operation dispatcher & job/printer state machine: the full
// CUPS-compatible operation whitelist, each operation backed by the
// relational store.
//
// This module owns the operation-id <-> name table and the
// `IppErrorKind -> IPP status code` mapping; nothing above it (the HTTP
// listener) or below it (the store, the validator) reasons about either.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{info, instrument, warn};

use pressd_core::error::{IppError, IppErrorKind, PressdError, Result};
use pressd_core::model::{
    Class, Destination, Document, Job, JobState, Printer, PrinterState, Subscription,
    SubscriptionDelivery,
};
use pressd_capabilities::Capabilities;
use pressd_capabilities::Ppd;
use pressd_ipp::{Attribute, AttributeGroup, AttributeValue, GroupTag, Message};
use pressd_ipp::{expand_requested_attributes, AttributeGroupName, AttributeMap};
use pressd_store::{classes, documents, jobs, notifications, printers, settings, subscriptions as sub_store};

use crate::banner;
use crate::policy::{AuthLimit, Authenticator, Identity, PolicyAdapter, RequestContext};
use crate::resolve::{resolve_class_member, resolve_destination};
use crate::subscriptions::{compute_get_interval, events_for_job_transition, events_for_printer_transition, matches_subscription};
use crate::validate::{validate_document_format, validate_job_ticket};

// ---------------------------------------------------------------------------
// Operation table
// ---------------------------------------------------------------------------

/// `(operation-id, name)` for every whitelisted operation.
/// RFC 8011/PWG 5100 assign the low codes; the `0x40xx` range is CUPS's own
/// extension block. A handful of required names
/// (`Cancel-Jobs`/`Cancel-My-Jobs`/`Validate-Document`/`Pause-All-Printers`/
/// `Resume-All-Printers`/`Restart-System`) have no registered IANA code, so
/// they're given local extension ids in the unused `0x4028+`
/// tail of that block.
const OPERATIONS: &[(u16, &str)] = &[
    (0x0002, "Print-Job"),
    (0x0004, "Validate-Job"),
    (0x0005, "Create-Job"),
    (0x0006, "Send-Document"),
    (0x0008, "Cancel-Job"),
    (0x0009, "Get-Job-Attributes"),
    (0x000A, "Get-Jobs"),
    (0x000B, "Get-Printer-Attributes"),
    (0x000C, "Hold-Job"),
    (0x000D, "Release-Job"),
    (0x000E, "Restart-Job"),
    (0x0010, "Pause-Printer"),
    (0x0011, "Resume-Printer"),
    (0x0012, "Purge-Jobs"),
    (0x0013, "Set-Printer-Attributes"),
    (0x0014, "Set-Job-Attributes"),
    (0x0015, "Get-Printer-Supported-Values"),
    (0x0016, "Create-Printer-Subscriptions"),
    (0x0017, "Create-Job-Subscriptions"),
    (0x0018, "Get-Subscription-Attributes"),
    (0x0019, "Get-Subscriptions"),
    (0x001A, "Renew-Subscription"),
    (0x001B, "Cancel-Subscription"),
    (0x001C, "Get-Notifications"),
    (0x0022, "Disable-Printer"),
    (0x0023, "Enable-Printer"),
    (0x0024, "Pause-Printer-After-Current-Job"),
    (0x0025, "Hold-New-Jobs"),
    (0x0026, "Release-Held-New-Jobs"),
    (0x0029, "Restart-Printer"),
    (0x0033, "Close-Job"),
    (0x4001, "CUPS-Get-Default"),
    (0x4002, "CUPS-Get-Printers"),
    (0x4003, "CUPS-Add-Modify-Printer"),
    (0x4004, "CUPS-Delete-Printer"),
    (0x4005, "CUPS-Get-Classes"),
    (0x4006, "CUPS-Add-Modify-Class"),
    (0x4007, "CUPS-Delete-Class"),
    (0x4008, "CUPS-Accept-Jobs"),
    (0x4009, "CUPS-Reject-Jobs"),
    (0x400A, "CUPS-Set-Default"),
    (0x400B, "CUPS-Get-Devices"),
    (0x400C, "CUPS-Get-Ppds"),
    (0x400D, "CUPS-Move-Job"),
    (0x400E, "CUPS-Authenticate-Job"),
    (0x400F, "CUPS-Get-Ppd"),
    (0x4027, "CUPS-Get-Document"),
    (0x4028, "Cancel-Jobs"),
    (0x4029, "Cancel-My-Jobs"),
    (0x402A, "Validate-Document"),
    (0x402B, "Get-Documents"),
    (0x402C, "Get-Document-Attributes"),
    (0x402D, "Pause-All-Printers"),
    (0x402E, "Resume-All-Printers"),
    (0x402F, "Restart-System"),
];

/// The operation name for `code`, or `None` if it isn't in the whitelist.
pub fn op_name(code: u16) -> Option<&'static str> {
    OPERATIONS.iter().find(|(c, _)| *c == code).map(|(_, n)| *n)
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

const STATUS_OK: u16 = 0x0000;
const STATUS_BAD_REQUEST: u16 = 0x0400;
const STATUS_NOT_AUTHENTICATED: u16 = 0x0401;
const STATUS_NOT_AUTHORIZED: u16 = STATUS_NOT_AUTHENTICATED;
const STATUS_NOT_POSSIBLE: u16 = 0x0403;
const STATUS_NOT_FOUND: u16 = 0x0406;
const STATUS_DOCUMENT_FORMAT_NOT_SUPPORTED: u16 = 0x040A;
const STATUS_ATTRIBUTES_NOT_SUPPORTED: u16 = 0x040B;
const STATUS_NOT_ACCEPTING_JOBS: u16 = 0x0411;
const STATUS_OPERATION_NOT_SUPPORTED: u16 = 0x0501;
const STATUS_SERVER_ERROR_INTERNAL: u16 = 0x0500;

/// Map an `IppErrorKind` to its wire status code. This is the
/// single place the taxonomy is translated to a number; handlers never
/// reason about status codes directly.
pub fn map_status(kind: &IppErrorKind) -> u16 {
    match kind {
        IppErrorKind::BadRequest => STATUS_BAD_REQUEST,
        IppErrorKind::Unsupported | IppErrorKind::PpdConstraint => STATUS_ATTRIBUTES_NOT_SUPPORTED,
        IppErrorKind::DocumentFormatNotSupported => STATUS_DOCUMENT_FORMAT_NOT_SUPPORTED,
        IppErrorKind::NotFound => STATUS_NOT_FOUND,
        IppErrorKind::NotAcceptingJobs => STATUS_NOT_ACCEPTING_JOBS,
        IppErrorKind::NotAuthorized => STATUS_NOT_AUTHORIZED,
        IppErrorKind::NotPossible => STATUS_NOT_POSSIBLE,
        IppErrorKind::Internal => STATUS_SERVER_ERROR_INTERNAL,
    }
}

// ---------------------------------------------------------------------------
// External collaborators
// ---------------------------------------------------------------------------

/// Supplies the derived capability model (and, when available, the raw PPD
/// for constraint checking) for a printer. The PPD parser and PWG media
/// table loader live outside this crate; this seam is how the
/// dispatcher reaches them without depending on a file format.
pub trait CapabilityProvider: Send + Sync {
    fn capabilities_for(&self, printer: &Printer) -> Result<(Capabilities, Option<Ppd>)>;
}

/// Persists a document's bytes and reports back where they landed and how
/// large they were. The spool itself (disk layout, retention) is an
/// external collaborator; the dispatcher only needs the two
/// facts it returns to populate a `Document` row.
pub trait SpoolWriter: Send + Sync {
    fn save(&self, job_id: i64, ordinal: i32, file_name: &str, data: &[u8]) -> Result<(String, u64)>;
}

/// Reads back a document's bytes from the path `SpoolWriter::save` reported.
/// Sibling seam to `SpoolWriter`: CUPS-Get-Document is the only operation
/// that needs spooled bytes back out, so the two directions of the spool
/// are split into separate traits rather than one read/write collaborator.
pub trait SpoolReader: Send + Sync {
    fn read(&self, spool_path: &str) -> Result<Vec<u8>>;
}

/// Resolves the normalized device list `CUPS-Get-Devices` returns. The mDNS
/// daemon and the TTL cache it reads through both live outside this crate
///; the dispatcher only needs the merged list back.
pub trait DeviceDirectory: Send + Sync {
    fn list_devices(&self) -> Result<Vec<pressd_core::model::DeviceCacheEntry>>;
}

/// No-op `DeviceDirectory` for deployments/tests that never call
/// `CUPS-Get-Devices`.
pub struct NoDevices;
impl DeviceDirectory for NoDevices {
    fn list_devices(&self) -> Result<Vec<pressd_core::model::DeviceCacheEntry>> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Dispatch context & outcome
// ---------------------------------------------------------------------------

/// Everything a single dispatch call needs beyond the decoded request
/// itself: the store transaction, the request's routing/auth context, and
/// the external collaborators above.
pub struct DispatchContext<'a> {
    pub conn: &'a Connection,
    pub request_path: String,
    pub peer: Option<std::net::IpAddr>,
    pub remote_user_header: Option<String>,
    pub authenticated_user: Option<String>,
    pub authenticator: &'a dyn Authenticator,
    pub capabilities: &'a dyn CapabilityProvider,
    pub spool: &'a dyn SpoolWriter,
    pub spool_reader: &'a dyn SpoolReader,
    pub devices: &'a dyn DeviceDirectory,
    /// Scheme+host prefix used to build `job-uri`/`printer-uri` values,
    /// e.g. `ipp://printserver.example.com`.
    pub base_uri: String,
    pub now: DateTime<Utc>,
}

/// The result of one `dispatch` call: a fully-formed IPP response message
/// plus any trailing payload bytes (CUPS-Get-Document, CUPS-Get-Ppd).
pub struct DispatchOutcome {
    pub response: Message,
    pub trailing_data: Vec<u8>,
}

struct HandlerOutput {
    groups: Vec<AttributeGroup>,
    trailing_data: Vec<u8>,
}

impl HandlerOutput {
    fn empty() -> Self {
        HandlerOutput {
            groups: Vec::new(),
            trailing_data: Vec::new(),
        }
    }

    fn with_group(group: AttributeGroup) -> Self {
        HandlerOutput {
            groups: vec![group],
            trailing_data: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Job / printer state machine
// ---------------------------------------------------------------------------

/// Transition a job's state, enforcing the terminality invariant: once a job reaches `{canceled, aborted, completed}`, no handler may
/// move it again. Callers that need Cancel's idempotent-on-terminal
/// behavior must check `job.state.is_terminal()` themselves before calling
/// this, since that's a per-operation policy, not a state-machine rule.
#[instrument(skip(conn))]
pub fn transition_job(conn: &Connection, job: &Job, new_state: JobState, reason: &str) -> Result<()> {
    if job.state.is_terminal() {
        return Err(IppError::not_possible(format!(
            "job {} is already in a terminal state and cannot be transitioned",
            job.id
        ))
        .into());
    }
    jobs::set_state(conn, job.id, new_state, reason)?;
    Ok(())
}

/// Transition a printer's `{state, accepting}` pair.
#[instrument(skip(conn))]
pub fn transition_printer(conn: &Connection, printer: &Printer, new_state: PrinterState, accepting: bool) -> Result<()> {
    printers::update_state(conn, &printer.id, new_state, accepting)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Decode, authorize, and dispatch one IPP request, returning a response
/// message that is always well-formed even on failure. Never panics or returns `Err` — every failure mode becomes a
/// status code in the returned message.
#[instrument(skip(ctx, request))]
pub fn dispatch(ctx: &DispatchContext, request: &Message) -> DispatchOutcome {
    let operation = match op_name(request.code) {
        Some(name) => name,
        None => {
            warn!(code = format!("0x{:04X}", request.code), "unsupported IPP operation");
            return error_outcome(request.request_id, IppErrorKind::Internal, "operation not supported", None)
                .with_status(STATUS_OPERATION_NOT_SUPPORTED);
        }
    };

    let req_ctx = RequestContext {
        path: ctx.request_path.clone(),
        operation: operation.to_string(),
        peer: ctx.peer,
        remote_user_header: ctx.remote_user_header.clone(),
        authenticated_user: ctx.authenticated_user.clone(),
    };

    let policy = PolicyAdapter::new(ctx.conn);
    let identity = match policy.authorize(&req_ctx, ctx.authenticator) {
        Ok(identity) => identity,
        Err(e) => return error_outcome_from(request.request_id, &e),
    };

    let result = route(ctx, &policy, &identity, operation, request);
    match result {
        Ok(output) => DispatchOutcome {
            response: build_response(request.request_id, STATUS_OK, "successful-ok", output.groups),
            trailing_data: output.trailing_data,
        },
        Err(e) => error_outcome_from(request.request_id, &e),
    }
}

fn error_outcome_from(request_id: u32, err: &PressdError) -> DispatchOutcome {
    let kind = err.as_ipp_kind();
    let (message, reason) = match err {
        PressdError::Request(e) => (e.message.clone(), e.state_reason.clone()),
        other => (other.to_string(), None),
    };
    error_outcome(request_id, kind, &message, reason)
}

fn error_outcome(request_id: u32, kind: IppErrorKind, message: &str, reason: Option<String>) -> DispatchOutcome {
    let status = map_status(&kind);
    let mut op_group = operation_attributes_envelope();
    op_group.push(Attribute::new("status-message", AttributeValue::TextWithoutLanguage(message.to_string())));
    if let Some(reason) = reason {
        op_group.push(Attribute::new("detail", AttributeValue::TextWithoutLanguage(reason)));
    }
    DispatchOutcome {
        response: Message {
            version_major: 2,
            version_minor: 0,
            code: status,
            request_id,
            groups: vec![op_group],
            data: Vec::new(),
        },
        trailing_data: Vec::new(),
    }
}

impl DispatchOutcome {
    fn with_status(mut self, status: u16) -> Self {
        self.response.code = status;
        self
    }
}

fn operation_attributes_envelope() -> AttributeGroup {
    let mut group = AttributeGroup::new(GroupTag::OperationAttributes);
    group.push(Attribute::new("attributes-charset", AttributeValue::Charset("utf-8".to_string())));
    group.push(Attribute::new(
        "attributes-natural-language",
        AttributeValue::NaturalLanguage("en".to_string()),
    ));
    group
}

fn build_response(request_id: u32, status: u16, status_message: &str, groups: Vec<AttributeGroup>) -> Message {
    let mut op_group = operation_attributes_envelope();
    op_group.push(Attribute::new(
        "status-message",
        AttributeValue::TextWithoutLanguage(status_message.to_string()),
    ));
    let mut all_groups = vec![op_group];
    all_groups.extend(groups);
    Message {
        version_major: 2,
        version_minor: 0,
        code: status,
        request_id,
        groups: all_groups,
        data: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

fn route(
    ctx: &DispatchContext,
    policy: &PolicyAdapter,
    identity: &Identity,
    operation: &str,
    request: &Message,
) -> Result<HandlerOutput> {
    match operation {
        "Print-Job" => handle_print_job(ctx, request, identity),
        "Create-Job" => handle_create_job(ctx, request, identity),
        "Validate-Job" => handle_validate_job(ctx, request, identity),
        "Validate-Document" => handle_validate_job(ctx, request, identity),
        "Send-Document" => handle_send_document(ctx, request, identity),
        "Cancel-Job" => handle_cancel_job(ctx, request, policy, identity),
        "Cancel-Jobs" => handle_cancel_jobs(ctx, request, policy, identity),
        "Cancel-My-Jobs" => handle_cancel_my_jobs(ctx, request, identity),
        "Purge-Jobs" => handle_purge_jobs(ctx, request),
        "Get-Jobs" => handle_get_jobs(ctx, request),
        "Get-Job-Attributes" => handle_get_job_attributes(ctx, request),
        "Set-Job-Attributes" => handle_set_job_attributes(ctx, request, policy, identity),
        "Hold-Job" => handle_hold_job(ctx, request, policy, identity),
        "Release-Job" => handle_release_job(ctx, request, policy, identity),
        "Restart-Job" => handle_restart_job(ctx, request, policy, identity),
        "Close-Job" => handle_close_job(ctx, request),
        "CUPS-Move-Job" => handle_move_job(ctx, request),
        "Get-Documents" => handle_get_documents(ctx, request),
        "Get-Document-Attributes" => handle_get_document_attributes(ctx, request),
        "CUPS-Get-Document" => handle_cups_get_document(ctx, request),
        "Get-Printer-Attributes" => handle_get_printer_attributes(ctx, request),
        "Get-Printer-Supported-Values" => handle_get_printer_supported_values(ctx, request),
        "Set-Printer-Attributes" => handle_set_printer_attributes(ctx, request),
        "Pause-Printer" | "Pause-Printer-After-Current-Job" => handle_pause_printer(ctx, request),
        "Resume-Printer" => handle_resume_printer(ctx, request),
        "Enable-Printer" => handle_enable_printer(ctx, request),
        "Disable-Printer" => handle_disable_printer(ctx, request),
        "Hold-New-Jobs" => handle_hold_new_jobs(ctx, request),
        "Release-Held-New-Jobs" => handle_release_held_new_jobs(ctx, request),
        "Restart-Printer" => handle_restart_printer(ctx, request),
        "CUPS-Accept-Jobs" => handle_accept_jobs(ctx, request),
        "CUPS-Reject-Jobs" => handle_reject_jobs(ctx, request),
        "CUPS-Get-Default" => handle_cups_get_default(ctx, request),
        "CUPS-Set-Default" => handle_cups_set_default(ctx, request),
        "CUPS-Get-Printers" => handle_get_printers(ctx, request),
        "CUPS-Add-Modify-Printer" => handle_add_modify_printer(ctx, request),
        "CUPS-Delete-Printer" => handle_delete_printer(ctx, request),
        "CUPS-Get-Classes" => handle_get_classes(ctx, request),
        "CUPS-Add-Modify-Class" => handle_add_modify_class(ctx, request),
        "CUPS-Delete-Class" => handle_delete_class(ctx, request),
        "CUPS-Get-Devices" => handle_get_devices(ctx),
        "CUPS-Get-Ppds" => handle_get_ppds(ctx, request),
        "CUPS-Get-Ppd" => handle_get_ppd(ctx, request),
        "Pause-All-Printers" => handle_pause_all_printers(ctx),
        "Resume-All-Printers" => handle_resume_all_printers(ctx),
        "Restart-System" => handle_restart_system(ctx),
        "Create-Printer-Subscriptions" => handle_create_printer_subscriptions(ctx, request, identity),
        "Create-Job-Subscriptions" => handle_create_job_subscriptions(ctx, request, identity),
        "Get-Subscription-Attributes" => handle_get_subscription_attributes(ctx, request),
        "Get-Subscriptions" => handle_get_subscriptions(ctx, request),
        "Renew-Subscription" => handle_renew_subscription(ctx, request, policy, identity),
        "Cancel-Subscription" => handle_cancel_subscription(ctx, request, policy, identity),
        "Get-Notifications" => handle_get_notifications(ctx, request, policy, identity),
        "CUPS-Authenticate-Job" => handle_authenticate_job(ctx, request, policy, identity),
        other => Err(IppError::bad_request(format!("{other} is not implemented")).into()),
    }
}

// ---------------------------------------------------------------------------
// Shared request helpers
// ---------------------------------------------------------------------------

/// Operation-attributes names that describe the request itself rather than
/// a job-template option; everything else present in that group is treated
/// as a candidate job-ticket attribute.
const NON_TICKET_OPERATION_ATTRIBUTES: &[&str] = &[
    "attributes-charset",
    "attributes-natural-language",
    "printer-uri",
    "job-uri",
    "job-id",
    "job-ids",
    "job-name",
    "requesting-user-name",
    "document-format",
    "document-name",
    "last-document",
    "requested-attributes",
    "my-jobs",
    "which-jobs",
    "limit",
    "first-job-id",
    "printer-state-reasons",
    "purge-jobs",
    "subscription-ids",
    "notify-subscription-ids",
    "notify-sequence-numbers",
    "notify-wait",
];

fn op_attrs(request: &Message) -> AttributeGroup {
    request
        .operation_attributes()
        .cloned()
        .unwrap_or_else(|| AttributeGroup::new(GroupTag::OperationAttributes))
}

fn ticket_options(group: &AttributeGroup) -> AttributeMap {
    let mut map = AttributeMap::new();
    for attr in &group.attributes {
        if NON_TICKET_OPERATION_ATTRIBUTES.contains(&attr.name.as_str()) {
            continue;
        }
        map.set_values(attr.name.clone(), attr.values.clone());
    }
    map
}

fn requested_attribute_names(group: &AttributeGroup, default_group: AttributeGroupName) -> Vec<String> {
    match group.get("requested-attributes") {
        Some(attr) => expand_requested_attributes(attr.strings(), default_group),
        None => expand_requested_attributes(std::iter::empty(), default_group),
    }
}

fn require_job_id(group: &AttributeGroup) -> Result<i64> {
    group
        .get_integer("job-id")
        .map(|id| id as i64)
        .ok_or_else(|| IppError::bad_request("job-id is required").into())
}

fn load_job(conn: &Connection, job_id: i64) -> Result<Job> {
    jobs::get(conn, job_id)?.ok_or_else(|| IppError::not_found(format!("job {job_id}")).into())
}

fn merge_options(printer_defaults: &AttributeMap, destination_defaults: &AttributeMap, request_options: &AttributeMap) -> AttributeMap {
    let mut merged = printer_defaults.clone();
    for (name, values) in destination_defaults.iter() {
        merged.set_values(name, values.to_vec());
    }
    for (name, values) in request_options.iter() {
        merged.set_values(name, values.to_vec());
    }
    merged
}

fn job_snapshot(job: &Job) -> AttributeMap {
    let mut snapshot = AttributeMap::new();
    snapshot.set("job-id", AttributeValue::Integer(job.id as i32));
    snapshot.set("job-state", AttributeValue::Enum(job.state.ipp_value()));
    snapshot.set("job-state-reasons", AttributeValue::Keyword(job.state_reason.clone()));
    snapshot
}

fn printer_snapshot(printer: &Printer) -> AttributeMap {
    let mut snapshot = AttributeMap::new();
    snapshot.set("printer-state", AttributeValue::Enum(printer.state.ipp_value()));
    snapshot.set("printer-is-accepting-jobs", AttributeValue::Boolean(printer.accepting));
    snapshot
}

/// Append one notification per subscription matching any of `events`, for
/// the job/printer/server-wide scopes implicated by this state change
///. Must run inside the same transaction as the mutation
/// that produced the event.
fn emit_events(conn: &Connection, printer_id: Option<&str>, job_id: Option<i64>, events: &[&str], snapshot: &AttributeMap) -> Result<()> {
    let mut subs: Vec<Subscription> = Vec::new();
    if let Some(jid) = job_id {
        subs.extend(sub_store::list_for_job(conn, jid)?);
    }
    if let Some(pid) = printer_id {
        subs.extend(sub_store::list_for_printer(conn, pid)?);
    }
    subs.extend(
        sub_store::list_all(conn)?
            .into_iter()
            .filter(|s| s.printer_id.is_none() && s.job_id.is_none()),
    );
    for sub in subs {
        for event in events {
            if matches_subscription(&sub, event) {
                notifications::append(conn, sub.id, event, snapshot)?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Job creation pipeline (Print-Job / Create-Job / Validate-Job) — 
// ---------------------------------------------------------------------------

struct ResolvedTarget {
    destination: Destination,
    printer: Printer,
    caps: Capabilities,
    ppd: Option<Ppd>,
}

fn resolve_target(ctx: &DispatchContext, group: &AttributeGroup, identity: &Identity) -> Result<ResolvedTarget> {
    let printer_uri = group.get_string("printer-uri");
    let destination = resolve_destination(ctx.conn, &ctx.request_path, printer_uri)?;
    if !destination.accepting() {
        return Err(IppError::not_accepting_jobs(format!("'{}' is not accepting jobs", destination.name())).into());
    }

    let printer = match &destination {
        Destination::Printer(p) => p.clone(),
        Destination::Class(c) => resolve_class_member(ctx.conn, c)?,
    };

    let policy = PolicyAdapter::new(ctx.conn);
    if !policy.user_permitted_on_printer(&identity.user_name, &printer.id)? {
        return Err(IppError::not_authorized(format!(
            "{} is not permitted to submit jobs to '{}'",
            identity.user_name,
            destination.name()
        ))
        .into());
    }

    let (caps, ppd) = ctx.capabilities.capabilities_for(&printer)?;
    Ok(ResolvedTarget {
        destination,
        printer,
        caps,
        ppd,
    })
}

/// `job-hold-until != no-hold` holds the job on creation.
fn initial_job_state(options: &AttributeMap) -> (JobState, &'static str) {
    match options.get_str("job-hold-until") {
        Some(v) if v != "no-hold" => (JobState::Held, "job-hold-until-specified"),
        _ => (JobState::Pending, "none"),
    }
}

fn resolve_job_sheets(options: &AttributeMap, destination: &Destination) -> (String, String) {
    if let Some(values) = options.get_values("job-sheets") {
        let start = values.first().and_then(AttributeValue::as_str).unwrap_or("none").to_string();
        let end = values.get(1).and_then(AttributeValue::as_str).unwrap_or(&start).to_string();
        return (start, end);
    }
    destination.job_sheets_default().clone()
}

struct PreparedJob {
    job: Job,
    target: ResolvedTarget,
}

/// Steps 1-5 of the job creation pipeline, shared by
/// Print-Job/Create-Job/Validate-Job: resolve destination, check the
/// per-printer ACL, validate document format (only when `document_format`
/// is `Some`), validate the merged ticket, and build (but do not persist)
/// the `Job` row.
fn prepare_job(
    ctx: &DispatchContext,
    group: &AttributeGroup,
    identity: &Identity,
    document_format: Option<&str>,
) -> Result<PreparedJob> {
    let target = resolve_target(ctx, group, identity)?;

    if let Some(format) = document_format {
        validate_document_format(format, &target.caps)?;
    }

    let request_options = ticket_options(group);
    let destination_defaults = target.destination.default_options().clone();
    let merged_options = merge_options(&target.printer.default_options, &destination_defaults, &request_options);

    validate_job_ticket(&target.caps, target.ppd.as_ref(), &merged_options)?;

    let (state, reason) = initial_job_state(&merged_options);
    let job_name = group.get_string("job-name").unwrap_or("Untitled Document").to_string();

    let job = Job {
        id: 0,
        printer_id: target.printer.id.clone(),
        name: job_name,
        user_name: identity.user_name.clone(),
        submitted_at: ctx.now,
        completed_at: None,
        state,
        state_reason: reason.to_string(),
        options: merged_options,
        impressions: 0,
        priority: 50,
        open_for_documents: false,
    };

    Ok(PreparedJob { job, target })
}

fn job_attributes_group(job: &Job, base_uri: &str, requested: &[String]) -> AttributeGroup {
    let mut group = AttributeGroup::new(GroupTag::JobAttributes);
    group.push(Attribute::new("job-id", AttributeValue::Integer(job.id as i32)));
    group.push(Attribute::new("job-uri", AttributeValue::Uri(job.uri(base_uri))));
    group.push(Attribute::new("job-state", AttributeValue::Enum(job.state.ipp_value())));
    group.push(Attribute::new("job-state-reasons", AttributeValue::Keyword(job.state_reason.clone())));
    if requested.iter().any(|n| n == "job-name") {
        group.push(Attribute::new("job-name", AttributeValue::NameWithoutLanguage(job.name.clone())));
    }
    if requested.iter().any(|n| n == "job-originating-user-name") {
        group.push(Attribute::new(
            "job-originating-user-name",
            AttributeValue::NameWithoutLanguage(job.user_name.clone()),
        ));
    }
    if requested.iter().any(|n| n == "job-printer-uri") {
        group.push(Attribute::new(
            "job-printer-uri",
            AttributeValue::Uri(format!("{base_uri}/printers/{}", job.printer_id)),
        ));
    }
    if requested.iter().any(|n| n == "job-impressions-completed") {
        group.push(Attribute::new("job-impressions-completed", AttributeValue::Integer(job.impressions)));
    }
    if requested.iter().any(|n| n == "job-priority") {
        group.push(Attribute::new("job-priority", AttributeValue::Integer(job.priority)));
    }
    if requested.iter().any(|n| n == "time-at-creation") {
        group.push(Attribute::new("time-at-creation", AttributeValue::Integer(job.submitted_at.timestamp() as i32)));
    }
    group
}

fn handle_print_job(ctx: &DispatchContext, request: &Message, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let document_format = group.get_string("document-format").unwrap_or("application/octet-stream").to_string();
    let document_name = group.get_string("document-name").or_else(|| group.get_string("job-name")).unwrap_or("document").to_string();

    let prepared = prepare_job(ctx, &group, identity, Some(&document_format))?;
    let job_sheets = resolve_job_sheets(&prepared.job.options, &prepared.target.destination);
    let ordinal = banner::first_stored_ordinal(&job_sheets);

    let job_id = jobs::insert(ctx.conn, &prepared.job)?;
    let (spool_path, size_bytes) = ctx.spool.save(job_id, ordinal, &document_name, &request.data)?;
    documents::append(ctx.conn, job_id, &document_name, &document_format, &spool_path, size_bytes)?;

    let mut job = prepared.job;
    job.id = job_id;

    let mut events = vec!["job-created"];
    if job.state == JobState::Held {
        events.extend(events_for_job_transition(JobState::Held));
    }
    emit_events(ctx.conn, Some(&job.printer_id), Some(job_id), &events, &job_snapshot(&job))?;

    info!(job_id, printer = %job.printer_id, "Print-Job accepted");
    let requested = requested_attribute_names(&group, AttributeGroupName::JobDescription);
    Ok(HandlerOutput::with_group(job_attributes_group(&job, &ctx.base_uri, &requested)))
}

fn handle_create_job(ctx: &DispatchContext, request: &Message, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let prepared = prepare_job(ctx, &group, identity, None)?;

    let mut job = prepared.job;
    job.open_for_documents = true;
    let job_id = jobs::insert(ctx.conn, &job)?;
    job.id = job_id;

    let mut events = vec!["job-created"];
    if job.state == JobState::Held {
        events.extend(events_for_job_transition(JobState::Held));
    }
    emit_events(ctx.conn, Some(&job.printer_id), Some(job_id), &events, &job_snapshot(&job))?;

    let requested = requested_attribute_names(&group, AttributeGroupName::JobDescription);
    Ok(HandlerOutput::with_group(job_attributes_group(&job, &ctx.base_uri, &requested)))
}

fn handle_validate_job(ctx: &DispatchContext, request: &Message, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let document_format = group.get_string("document-format");
    // Validate-Job/Validate-Document check the ticket without creating
    // anything.
    prepare_job(ctx, &group, identity, document_format)?;
    Ok(HandlerOutput::empty())
}

fn handle_send_document(ctx: &DispatchContext, request: &Message, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    if job.state.is_terminal() {
        return Err(IppError::not_possible(format!("job {job_id} has already reached a terminal state")).into());
    }

    let policy = PolicyAdapter::new(ctx.conn);
    if !policy.can_manage_job(identity, &job)? {
        return Err(IppError::not_authorized(format!("{} may not add documents to job {job_id}", identity.user_name)).into());
    }

    let document_format = group.get_string("document-format").unwrap_or("application/octet-stream").to_string();
    let document_name = group.get_string("document-name").unwrap_or("document").to_string();
    let (caps, _ppd) = ctx.capabilities.capabilities_for(&printer_for_job(ctx.conn, &job)?)?;
    validate_document_format(&document_format, &caps)?;

    let stored = documents::list_for_job(ctx.conn, job_id)?;
    let job_sheets = resolve_job_sheets(&job.options, &destination_for_job(ctx.conn, &job)?);
    let ordinal = banner::first_stored_ordinal(&job_sheets) + stored.len() as i32;

    let (spool_path, size_bytes) = ctx.spool.save(job_id, ordinal, &document_name, &request.data)?;
    documents::append(ctx.conn, job_id, &document_name, &document_format, &spool_path, size_bytes)?;

    let last_document = group.get_boolean("last-document").unwrap_or(true);
    if last_document && job.open_for_documents {
        jobs::set_open_for_documents(ctx.conn, job_id, false)?;
    }

    let requested = requested_attribute_names(&group, AttributeGroupName::JobDescription);
    Ok(HandlerOutput::with_group(job_attributes_group(&job, &ctx.base_uri, &requested)))
}

fn printer_for_job(conn: &Connection, job: &Job) -> Result<Printer> {
    printers::get(conn, &job.printer_id)?.ok_or_else(|| IppError::not_found(format!("printer {}", job.printer_id)).into())
}

fn destination_for_job(conn: &Connection, job: &Job) -> Result<Destination> {
    printer_for_job(conn, job).map(Destination::Printer)
}

// ---------------------------------------------------------------------------
// Close-Job / Hold / Release / Restart / Cancel / Move
// ---------------------------------------------------------------------------

fn handle_close_job(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    if job.state.is_terminal() {
        // Close-Job never overrides a terminal state.
        return Ok(HandlerOutput::empty());
    }
    jobs::set_open_for_documents(ctx.conn, job_id, false)?;
    Ok(HandlerOutput::empty())
}

fn handle_hold_job(ctx: &DispatchContext, request: &Message, policy: &PolicyAdapter, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    if !policy.can_manage_job(identity, &job)? {
        return Err(IppError::not_authorized(format!("{} may not hold job {job_id}", identity.user_name)).into());
    }
    transition_job(ctx.conn, &job, JobState::Held, "job-hold-until-specified")?;
    let mut held = job.clone();
    held.state = JobState::Held;
    emit_events(ctx.conn, Some(&job.printer_id), Some(job_id), &events_for_job_transition(JobState::Held), &job_snapshot(&held))?;
    Ok(HandlerOutput::empty())
}

fn handle_release_job(ctx: &DispatchContext, request: &Message, policy: &PolicyAdapter, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    if !policy.can_manage_job(identity, &job)? {
        return Err(IppError::not_authorized(format!("{} may not release job {job_id}", identity.user_name)).into());
    }
    transition_job(ctx.conn, &job, JobState::Pending, "none")?;
    let mut released = job.clone();
    released.state = JobState::Pending;
    emit_events(ctx.conn, Some(&job.printer_id), Some(job_id), &events_for_job_transition(JobState::Pending), &job_snapshot(&released))?;
    Ok(HandlerOutput::empty())
}

fn handle_restart_job(ctx: &DispatchContext, request: &Message, policy: &PolicyAdapter, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    if !policy.can_manage_job(identity, &job)? {
        return Err(IppError::not_authorized(format!("{} may not restart job {job_id}", identity.user_name)).into());
    }
    if !matches!(job.state, JobState::Stopped | JobState::Held) {
        return Err(IppError::not_possible(format!("job {job_id} is not in a restartable state")).into());
    }
    jobs::set_state(ctx.conn, job_id, JobState::Pending, "none")?;
    let mut restarted = job.clone();
    restarted.state = JobState::Pending;
    emit_events(ctx.conn, Some(&job.printer_id), Some(job_id), &events_for_job_transition(JobState::Pending), &job_snapshot(&restarted))?;
    Ok(HandlerOutput::empty())
}

fn cancel_one_job(conn: &Connection, job: &Job) -> Result<()> {
    if job.state.is_terminal() {
        // Cancel is idempotent once terminal.
        return Ok(());
    }
    transition_job(conn, job, JobState::Canceled, "job-canceled-by-user")?;
    let mut canceled = job.clone();
    canceled.state = JobState::Canceled;
    emit_events(conn, Some(&job.printer_id), Some(job.id), &events_for_job_transition(JobState::Canceled), &job_snapshot(&canceled))?;
    Ok(())
}

fn handle_cancel_job(ctx: &DispatchContext, request: &Message, policy: &PolicyAdapter, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    if !policy.can_manage_job(identity, &job)? {
        return Err(IppError::not_authorized(format!("{} may not cancel job {job_id}", identity.user_name)).into());
    }
    cancel_one_job(ctx.conn, &job)?;
    Ok(HandlerOutput::empty())
}

/// `Cancel-Jobs printer-uri=.../ requesting-user-name=alice` cancels every
/// non-terminal job owned by `alice` on the destination, or on every
/// destination when the request carries no `printer-uri`. `my-jobs=true` delegates to the same user-scoped
/// filter `Cancel-My-Jobs` uses.
fn handle_cancel_jobs(ctx: &DispatchContext, request: &Message, policy: &PolicyAdapter, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    if group.get_boolean("my-jobs").unwrap_or(false) {
        return handle_cancel_my_jobs(ctx, request, identity);
    }

    let requesting_user = group.get_string("requesting-user-name");
    let printer_uri = group.get_string("printer-uri");

    let candidate_jobs = match resolve_destination(ctx.conn, &ctx.request_path, printer_uri) {
        Ok(Destination::Printer(p)) => jobs::list_for_printer(ctx.conn, &p.id)?,
        Ok(Destination::Class(c)) => {
            let mut all = Vec::new();
            for member_name in &c.members {
                if let Some(member) = printers::get_by_name(ctx.conn, member_name)? {
                    all.extend(jobs::list_for_printer(ctx.conn, &member.id)?);
                }
            }
            all
        }
        Err(_) => jobs::list_all(ctx.conn)?,
    };

    for job in candidate_jobs {
        if let Some(user) = requesting_user {
            if job.user_name != user {
                continue;
            }
        }
        if !policy.can_manage_job(identity, &job)? {
            continue;
        }
        cancel_one_job(ctx.conn, &job)?;
    }
    Ok(HandlerOutput::empty())
}

/// Cancels every non-terminal job owned by the effective user; with
/// `purge-jobs=true` also removes their already-completed jobs.
fn handle_cancel_my_jobs(ctx: &DispatchContext, request: &Message, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let purge = group.get_boolean("purge-jobs").unwrap_or(false);
    let user_jobs = jobs::list_by_user(ctx.conn, &identity.user_name)?;
    for job in user_jobs {
        if job.state.is_terminal() {
            if purge {
                documents::list_for_job(ctx.conn, job.id)?;
                jobs::delete(ctx.conn, job.id)?;
            }
            continue;
        }
        cancel_one_job(ctx.conn, &job)?;
    }
    Ok(HandlerOutput::empty())
}

/// Removes every job on the system; `_preserve_job_files` governs whether
/// the caller (which owns the spool) is told to keep document bytes around
/// — the dispatcher itself only ever deletes store rows.
fn handle_purge_jobs(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri");
    let target_jobs = match resolve_destination(ctx.conn, &ctx.request_path, printer_uri) {
        Ok(Destination::Printer(p)) => jobs::list_for_printer(ctx.conn, &p.id)?,
        Ok(Destination::Class(_)) | Err(_) => jobs::list_all(ctx.conn)?,
    };
    for job in target_jobs {
        jobs::delete(ctx.conn, job.id)?;
    }
    Ok(HandlerOutput::empty())
}

/// `CUPS-Move-Job`: retargets a non-terminal job to a different (accepting)
/// printer.
fn handle_move_job(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    if job.state.is_terminal() {
        return Err(IppError::not_possible(format!("job {job_id} is terminal and cannot be moved")).into());
    }
    let job_printer_uri = group.get_string("job-printer-uri").ok_or_else(|| IppError::bad_request("job-printer-uri is required"))?;
    let destination = resolve_destination(ctx.conn, "", Some(job_printer_uri))?;
    if !destination.accepting() {
        return Err(IppError::not_accepting_jobs(format!("'{}' is not accepting jobs", destination.name())).into());
    }
    let target_printer = match &destination {
        Destination::Printer(p) => p.clone(),
        Destination::Class(c) => resolve_class_member(ctx.conn, c)?,
    };
    jobs::move_to_printer(ctx.conn, job_id, &target_printer.id)?;
    Ok(HandlerOutput::empty())
}

fn handle_set_job_attributes(ctx: &DispatchContext, request: &Message, policy: &PolicyAdapter, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    if !policy.can_manage_job(identity, &job)? {
        return Err(IppError::not_authorized(format!("{} may not modify job {job_id}", identity.user_name)).into());
    }
    let printer = printer_for_job(ctx.conn, &job)?;
    let (caps, ppd) = ctx.capabilities.capabilities_for(&printer)?;
    let updates = ticket_options(&group);
    let merged = merge_options(&job.options, &AttributeMap::new(), &updates);
    validate_job_ticket(&caps, ppd.as_ref(), &merged)?;
    jobs::set_options(ctx.conn, job_id, &merged)?;
    if let Some(priority) = merged.get_integer("job-priority") {
        jobs::set_priority(ctx.conn, job_id, priority)?;
    }
    Ok(HandlerOutput::empty())
}

// ---------------------------------------------------------------------------
// Get-Jobs / Get-Job-Attributes / documents
// ---------------------------------------------------------------------------

fn handle_get_jobs(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri");
    let which = group.get_string("which-jobs").unwrap_or("not-completed");
    let my_jobs_user = group.get_string("requesting-user-name").filter(|_| group.get_boolean("my-jobs").unwrap_or(false));
    let limit = group.get_integer("limit").unwrap_or(i32::MAX).max(0) as usize;

    let mut candidates = match resolve_destination(ctx.conn, &ctx.request_path, printer_uri) {
        Ok(Destination::Printer(p)) => jobs::list_for_printer(ctx.conn, &p.id)?,
        Ok(Destination::Class(c)) => {
            let mut all = Vec::new();
            for member_name in &c.members {
                if let Some(member) = printers::get_by_name(ctx.conn, member_name)? {
                    all.extend(jobs::list_for_printer(ctx.conn, &member.id)?);
                }
            }
            all
        }
        Err(_) => jobs::list_all(ctx.conn)?,
    };

    candidates.retain(|j| match which {
        "completed" => j.state.is_terminal(),
        _ => !j.state.is_terminal(),
    });
    if let Some(user) = my_jobs_user {
        candidates.retain(|j| j.user_name == user);
    }
    candidates.truncate(limit);

    let requested = requested_attribute_names(&group, AttributeGroupName::JobDescription);
    let groups = candidates
        .into_iter()
        .map(|job| job_attributes_group(&job, &ctx.base_uri, &requested))
        .collect();
    Ok(HandlerOutput { groups, trailing_data: Vec::new() })
}

fn handle_get_job_attributes(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    let requested = requested_attribute_names(&group, AttributeGroupName::JobDescription);
    Ok(HandlerOutput::with_group(job_attributes_group(&job, &ctx.base_uri, &requested)))
}

fn documents_for_job(conn: &Connection, job: &Job) -> Result<Vec<Document>> {
    let stored = documents::list_for_job(conn, job.id)?;
    let job_sheets = resolve_job_sheets(&job.options, &destination_for_job(conn, job)?);
    let mut docs: Vec<Document> = banner::banner_documents(&job_sheets, job, stored.len() as i32);
    docs.extend(stored.into_iter().map(Document::Stored));
    docs.sort_by_key(Document::ordinal);
    Ok(docs)
}

fn handle_get_documents(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    let docs = documents_for_job(ctx.conn, &job)?;
    let groups = docs
        .into_iter()
        .map(|doc| {
            let mut g = AttributeGroup::new(GroupTag::Other(0x06));
            g.push(Attribute::new("document-number", AttributeValue::Integer(doc.ordinal())));
            g.push(Attribute::new("document-format", AttributeValue::MimeMediaType(doc.mime_type().to_string())));
            g.push(Attribute::new("document-name", AttributeValue::NameWithoutLanguage(doc.name().to_string())));
            g
        })
        .collect();
    Ok(HandlerOutput { groups, trailing_data: Vec::new() })
}

fn handle_get_document_attributes(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let ordinal = group.get_integer("document-number").ok_or_else(|| IppError::bad_request("document-number is required"))?;
    let job = load_job(ctx.conn, job_id)?;
    let docs = documents_for_job(ctx.conn, &job)?;
    let doc = docs
        .into_iter()
        .find(|d| d.ordinal() == ordinal)
        .ok_or_else(|| IppError::not_found(format!("document {ordinal} of job {job_id}")))?;
    let mut g = AttributeGroup::new(GroupTag::Other(0x06));
    g.push(Attribute::new("document-number", AttributeValue::Integer(doc.ordinal())));
    g.push(Attribute::new("document-format", AttributeValue::MimeMediaType(doc.mime_type().to_string())));
    g.push(Attribute::new("document-name", AttributeValue::NameWithoutLanguage(doc.name().to_string())));
    Ok(HandlerOutput::with_group(g))
}

/// `CUPS-Get-Document`: an admin-only operation that returns
/// the document's bytes as trailing payload. Banner documents are rendered
/// at read time rather than fetched from the spool.
fn handle_cups_get_document(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let ordinal = group.get_integer("document-number").unwrap_or(1);
    let job = load_job(ctx.conn, job_id)?;
    let docs = documents_for_job(ctx.conn, &job)?;
    let doc = docs
        .into_iter()
        .find(|d| d.ordinal() == ordinal)
        .ok_or_else(|| IppError::not_found(format!("document {ordinal} of job {job_id}")))?;

    let trailing_data = match doc {
        Document::Synthetic(ref synthetic) => {
            let printer = printer_for_job(ctx.conn, &job)?;
            let text = banner::render_banner_text(None, &printer.name, &job);
            let _ = synthetic;
            text.into_bytes()
        }
        Document::Stored(stored) => ctx.spool_reader.read(&stored.spool_path)?,
    };
    Ok(HandlerOutput { groups: Vec::new(), trailing_data })
}

// ---------------------------------------------------------------------------
// Printer attributes / lifecycle
// ---------------------------------------------------------------------------

fn printer_attributes_group(printer: &Printer, caps: &Capabilities, base_uri: &str, requested: &[String]) -> AttributeGroup {
    let mut group = AttributeGroup::new(GroupTag::PrinterAttributes);
    group.push(Attribute::new(
        "printer-uri-supported",
        AttributeValue::Uri(format!("{base_uri}/printers/{}", printer.name)),
    ));
    group.push(Attribute::new("printer-name", AttributeValue::NameWithoutLanguage(printer.name.clone())));
    group.push(Attribute::new("printer-state", AttributeValue::Enum(printer.state.ipp_value())));
    group.push(Attribute::new(
        "printer-state-reasons",
        AttributeValue::Keyword(printer.hold_new_jobs_reason.clone().unwrap_or_else(|| "none".to_string())),
    ));
    group.push(Attribute::new("printer-is-accepting-jobs", AttributeValue::Boolean(printer.accepting)));
    group.push(Attribute::new("printer-is-shared", AttributeValue::Boolean(printer.shared)));

    if requested.iter().any(|n| n == "printer-info") {
        group.push(Attribute::new("printer-info", AttributeValue::TextWithoutLanguage(printer.info.clone())));
    }
    if requested.iter().any(|n| n == "printer-location") {
        group.push(Attribute::new("printer-location", AttributeValue::TextWithoutLanguage(printer.location.clone())));
    }
    if requested.iter().any(|n| n == "media-supported") {
        group.push(Attribute::with_values(
            "media-supported",
            caps.media_supported.iter().map(|m| AttributeValue::Keyword(m.clone())).collect(),
        ));
    }
    if requested.iter().any(|n| n == "media-default") {
        group.push(Attribute::new("media-default", AttributeValue::Keyword(caps.media_default.clone())));
    }
    if requested.iter().any(|n| n == "sides-supported") {
        group.push(Attribute::with_values(
            "sides-supported",
            caps.sides.iter().map(|s| AttributeValue::Keyword(s.clone())).collect(),
        ));
    }
    if requested.iter().any(|n| n == "sides-default") {
        group.push(Attribute::new("sides-default", AttributeValue::Keyword(caps.sides_default.clone())));
    }
    if requested.iter().any(|n| n == "print-color-mode-supported") {
        group.push(Attribute::with_values(
            "print-color-mode-supported",
            caps.color_modes.iter().map(|c| AttributeValue::Keyword(c.clone())).collect(),
        ));
    }
    if requested.iter().any(|n| n == "document-format-supported") {
        group.push(Attribute::with_values(
            "document-format-supported",
            caps.document_formats.iter().map(|f| AttributeValue::MimeMediaType(f.clone())).collect(),
        ));
    }
    if requested.iter().any(|n| n == "urf-supported") {
        let urf = pressd_capabilities::build_urf_strings(caps);
        group.push(Attribute::with_values(
            "urf-supported",
            urf.into_iter().map(AttributeValue::Keyword).collect(),
        ));
    }
    group
}

fn handle_get_printer_attributes(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri");
    let destination = resolve_destination(ctx.conn, &ctx.request_path, printer_uri)?;
    let requested = requested_attribute_names(&group, AttributeGroupName::PrinterDescription);

    let printer = match &destination {
        Destination::Printer(p) => p.clone(),
        Destination::Class(c) => resolve_class_member(ctx.conn, c).unwrap_or_else(|_| dummy_printer(c)),
    };
    let (caps, _ppd) = ctx.capabilities.capabilities_for(&printer)?;
    Ok(HandlerOutput::with_group(printer_attributes_group(&printer, &caps, &ctx.base_uri, &requested)))
}

fn dummy_printer(class: &Class) -> Printer {
    Printer {
        id: class.id.clone(),
        name: class.name.clone(),
        device_uri: String::new(),
        ppd_name: None,
        location: class.location.clone(),
        info: class.info.clone(),
        geo_location: None,
        organization: None,
        organizational_unit: None,
        state: class.state,
        accepting: class.accepting,
        shared: true,
        is_default: class.is_default,
        job_sheets_default: class.job_sheets_default.clone(),
        default_options: class.default_options.clone(),
        hold_new_jobs_reason: None,
        created_at: class.created_at,
        updated_at: class.updated_at,
    }
}

/// Per the open question recorded in DESIGN.md: reproduces the stub
/// `xxx-supported` shape (a single `unknown` placeholder value) rather than
/// computing real per-attribute supported-value sets, since the intent
/// behind the original stub was never established.
fn handle_get_printer_supported_values(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri");
    let destination = resolve_destination(ctx.conn, &ctx.request_path, printer_uri)?;
    let mut out = AttributeGroup::new(GroupTag::PrinterAttributes);
    out.push(Attribute::new("printer-name", AttributeValue::NameWithoutLanguage(destination.name().to_string())));
    out.push(Attribute::new("supported-value-attributes", AttributeValue::Unsupported));
    Ok(HandlerOutput::with_group(out))
}

fn handle_set_printer_attributes(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri");
    let destination = resolve_destination(ctx.conn, &ctx.request_path, printer_uri)?;
    let Destination::Printer(mut printer) = destination else {
        return Err(IppError::bad_request("Set-Printer-Attributes targets a printer, not a class").into());
    };
    if let Some(info) = group.get_string("printer-info") {
        printer.info = info.to_string();
    }
    if let Some(location) = group.get_string("printer-location") {
        printer.location = location.to_string();
    }
    for attr in &group.attributes {
        if NON_TICKET_OPERATION_ATTRIBUTES.contains(&attr.name.as_str()) || attr.name == "printer-info" || attr.name == "printer-location" {
            continue;
        }
        printer.default_options.set_values(attr.name.clone(), attr.values.clone());
    }
    printers::update_attributes(ctx.conn, &printer)?;
    Ok(HandlerOutput::empty())
}

fn handle_pause_printer(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    set_printer_lifecycle(ctx, request, PrinterState::Stopped, false)
}

fn handle_resume_printer(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    set_printer_lifecycle(ctx, request, PrinterState::Idle, true)
}

fn handle_enable_printer(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let (_printer, group) = printer_from_request(ctx, request)?;
    let printer_uri = group.get_string("printer-uri");
    let Destination::Printer(printer) = resolve_destination(ctx.conn, &ctx.request_path, printer_uri)? else {
        return Err(IppError::bad_request("printer-uri must name a printer").into());
    };
    printers::update_state(ctx.conn, &printer.id, printer.state, true)?;
    Ok(HandlerOutput::empty())
}

fn handle_disable_printer(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let (_printer, group) = printer_from_request(ctx, request)?;
    let printer_uri = group.get_string("printer-uri");
    let Destination::Printer(printer) = resolve_destination(ctx.conn, &ctx.request_path, printer_uri)? else {
        return Err(IppError::bad_request("printer-uri must name a printer").into());
    };
    printers::update_state(ctx.conn, &printer.id, printer.state, false)?;
    Ok(HandlerOutput::empty())
}

fn printer_from_request<'a>(ctx: &DispatchContext, request: &'a Message) -> Result<(Printer, AttributeGroup)> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri");
    let destination = resolve_destination(ctx.conn, &ctx.request_path, printer_uri)?;
    let Destination::Printer(printer) = destination else {
        return Err(IppError::bad_request("operation targets a printer, not a class").into());
    };
    Ok((printer, group))
}

fn set_printer_lifecycle(ctx: &DispatchContext, request: &Message, state: PrinterState, accepting: bool) -> Result<HandlerOutput> {
    let (printer, _group) = printer_from_request(ctx, request)?;
    transition_printer(ctx.conn, &printer, state, accepting)?;
    let mut updated = printer.clone();
    updated.state = state;
    updated.accepting = accepting;
    emit_events(ctx.conn, Some(&printer.id), None, &events_for_printer_transition(), &printer_snapshot(&updated))?;
    Ok(HandlerOutput::empty())
}

fn handle_hold_new_jobs(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let (printer, group) = printer_from_request(ctx, request)?;
    let reason = group.get_string("printer-state-reasons").unwrap_or("hold-new-jobs");
    printers::update_hold_new_jobs(ctx.conn, &printer.id, Some(reason))?;
    Ok(HandlerOutput::empty())
}

fn handle_release_held_new_jobs(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let (printer, _group) = printer_from_request(ctx, request)?;
    printers::update_hold_new_jobs(ctx.conn, &printer.id, None)?;
    Ok(HandlerOutput::empty())
}

fn handle_restart_printer(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let (printer, _group) = printer_from_request(ctx, request)?;
    transition_printer(ctx.conn, &printer, PrinterState::Idle, true)?;
    emit_events(ctx.conn, Some(&printer.id), None, &["printer-restarted"], &printer_snapshot(&printer))?;
    Ok(HandlerOutput::empty())
}

fn handle_accept_jobs(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let (printer, _group) = printer_from_request(ctx, request)?;
    printers::update_state(ctx.conn, &printer.id, printer.state, true)?;
    Ok(HandlerOutput::empty())
}

fn handle_reject_jobs(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let (printer, _group) = printer_from_request(ctx, request)?;
    printers::update_state(ctx.conn, &printer.id, printer.state, false)?;
    Ok(HandlerOutput::empty())
}

fn handle_cups_get_default(ctx: &DispatchContext, _request: &Message) -> Result<HandlerOutput> {
    if let Some(printer) = printers::get_default(ctx.conn)? {
        let (caps, _ppd) = ctx.capabilities.capabilities_for(&printer)?;
        let requested = expand_requested_attributes(std::iter::empty(), AttributeGroupName::PrinterDescription);
        return Ok(HandlerOutput::with_group(printer_attributes_group(&printer, &caps, &ctx.base_uri, &requested)));
    }
    Err(IppError::not_found("no default printer is configured").into())
}

fn handle_cups_set_default(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let (printer, _group) = printer_from_request(ctx, request)?;
    printers::set_default(ctx.conn, &printer.id)?;
    Ok(HandlerOutput::empty())
}

// ---------------------------------------------------------------------------
// CUPS printer/class administration
// ---------------------------------------------------------------------------

fn handle_add_modify_printer(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri").ok_or_else(|| IppError::bad_request("printer-uri is required"))?;
    let name = printer_uri.rsplit('/').next().unwrap_or(printer_uri).to_string();

    let existing = printers::get_by_name(ctx.conn, &name)?;
    let now = ctx.now;
    let mut printer = existing.unwrap_or_else(|| Printer {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.clone(),
        device_uri: String::new(),
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
        job_sheets_default: ("none".to_string(), "none".to_string()),
        default_options: AttributeMap::new(),
        hold_new_jobs_reason: None,
        created_at: now,
        updated_at: now,
    });

    if let Some(v) = group.get_string("device-uri") {
        printer.device_uri = v.to_string();
    }
    if let Some(v) = group.get_string("ppd-name") {
        printer.ppd_name = Some(v.to_string());
    }
    if let Some(v) = group.get_string("printer-info") {
        printer.info = v.to_string();
    }
    if let Some(v) = group.get_string("printer-location") {
        printer.location = v.to_string();
    }
    if let Some(v) = group.get_boolean("printer-is-shared") {
        printer.shared = v;
    }

    let is_new = printers::get(ctx.conn, &printer.id)?.is_none();
    if is_new {
        printers::insert(ctx.conn, &printer)?;
    } else {
        printers::update_attributes(ctx.conn, &printer)?;
    }
    Ok(HandlerOutput::empty())
}

fn handle_delete_printer(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let (printer, _group) = printer_from_request(ctx, request)?;
    printers::delete(ctx.conn, &printer.id)?;
    Ok(HandlerOutput::empty())
}

fn handle_add_modify_class(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri").ok_or_else(|| IppError::bad_request("printer-uri is required"))?;
    let name = printer_uri.rsplit('/').next().unwrap_or(printer_uri).to_string();
    if classes::name_taken(ctx.conn, &name)? && classes::get_by_name(ctx.conn, &name)?.is_none() {
        return Err(IppError::bad_request(format!("name '{name}' is already taken by a printer")).into());
    }

    let members: Vec<String> = group
        .get("member-uris")
        .map(|a| a.values.iter().filter_map(AttributeValue::as_str).map(|s| s.rsplit('/').next().unwrap_or(s).to_string()).collect())
        .unwrap_or_default();

    let now = ctx.now;
    let mut class = classes::get_by_name(ctx.conn, &name)?.unwrap_or_else(|| Class {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.clone(),
        info: String::new(),
        location: String::new(),
        state: PrinterState::Idle,
        accepting: true,
        is_default: false,
        members: Vec::new(),
        job_sheets_default: ("none".to_string(), "none".to_string()),
        default_options: AttributeMap::new(),
        created_at: now,
        updated_at: now,
    });
    if !members.is_empty() {
        class.members = members;
    }
    if let Some(v) = group.get_string("printer-info") {
        class.info = v.to_string();
    }
    if let Some(v) = group.get_string("printer-location") {
        class.location = v.to_string();
    }

    let is_new = classes::get(ctx.conn, &class.id)?.is_none();
    if is_new {
        classes::insert(ctx.conn, &class)?;
    } else {
        classes::set_members(ctx.conn, &class.id, &class.members)?;
    }
    Ok(HandlerOutput::empty())
}

fn handle_delete_class(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri").ok_or_else(|| IppError::bad_request("printer-uri is required"))?;
    let name = printer_uri.rsplit('/').next().unwrap_or(printer_uri);
    let class = classes::get_by_name(ctx.conn, name)?.ok_or_else(|| IppError::not_found(format!("class '{name}'")))?;
    classes::delete(ctx.conn, &class.id)?;
    Ok(HandlerOutput::empty())
}

/// `CUPS-Get-Printers`: one `printer-description` group per stored printer,
/// generalizing `handle_get_printer_attributes` from a single resolved
/// destination to the full listing CUPS's own client tools expect.
fn handle_get_printers(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let requested = requested_attribute_names(&group, AttributeGroupName::PrinterDescription);
    let mut groups = Vec::new();
    for printer in printers::list(ctx.conn)? {
        let (caps, _ppd) = ctx.capabilities.capabilities_for(&printer)?;
        groups.push(printer_attributes_group(&printer, &caps, &ctx.base_uri, &requested));
    }
    Ok(HandlerOutput { groups, trailing_data: Vec::new() })
}

/// `CUPS-Get-Classes`: one group per class, represented through the same
/// `dummy_printer` projection `Get-Printer-Attributes` uses when a class is
/// the resolved destination, so listing a class looks the same to clients
/// whichever operation they used to reach it.
fn handle_get_classes(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let requested = requested_attribute_names(&group, AttributeGroupName::PrinterDescription);
    let mut groups = Vec::new();
    for class in classes::list(ctx.conn)? {
        let printer = dummy_printer(&class);
        let (caps, _ppd) = ctx.capabilities.capabilities_for(&printer)?;
        groups.push(printer_attributes_group(&printer, &caps, &ctx.base_uri, &requested));
    }
    Ok(HandlerOutput { groups, trailing_data: Vec::new() })
}

/// `CUPS-Get-Devices`: delegates entirely to the
/// `DeviceDirectory` seam, which merges environment, mDNS, and TTL-cached
/// results outside this crate.
fn handle_get_devices(ctx: &DispatchContext) -> Result<HandlerOutput> {
    let groups = ctx
        .devices
        .list_devices()?
        .into_iter()
        .map(|device| {
            let mut g = AttributeGroup::new(GroupTag::Other(0x04));
            g.push(Attribute::new("device-uri", AttributeValue::Uri(device.uri)));
            g.push(Attribute::new("device-info", AttributeValue::TextWithoutLanguage(device.info)));
            g.push(Attribute::new("device-make-and-model", AttributeValue::TextWithoutLanguage(device.make)));
            g.push(Attribute::new("device-class", AttributeValue::Keyword(device.class)));
            g.push(Attribute::new("device-id", AttributeValue::TextWithoutLanguage(device.device_id)));
            g.push(Attribute::new("device-location", AttributeValue::TextWithoutLanguage(device.location)));
            g
        })
        .collect();
    Ok(HandlerOutput { groups, trailing_data: Vec::new() })
}

/// `CUPS-Get-Ppds`: this deployment has no classic-driver PPD catalog —
/// only PPD text generated per-printer from its IPP capabilities — so it
/// reports the single "driverless" IPP Everywhere model every modern
/// CUPS install also ships, per the decision recorded in DESIGN.md.
fn handle_get_ppds(_ctx: &DispatchContext, _request: &Message) -> Result<HandlerOutput> {
    let mut g = AttributeGroup::new(GroupTag::Other(0x05));
    g.push(Attribute::new("ppd-name", AttributeValue::NameWithoutLanguage("everywhere".to_string())));
    g.push(Attribute::new(
        "ppd-make-and-model",
        AttributeValue::TextWithoutLanguage("IPP Everywhere".to_string()),
    ));
    g.push(Attribute::new("ppd-device-id", AttributeValue::TextWithoutLanguage(String::new())));
    g.push(Attribute::new("ppd-natural-language", AttributeValue::NaturalLanguage("en".to_string())));
    Ok(HandlerOutput::with_group(g))
}

/// `CUPS-Get-Ppd`: renders the IPP-Everywhere PPD for the named printer from
/// its derived `Capabilities` and returns it as trailing
/// payload, the way `CUPS-Get-Document` returns document bytes.
fn handle_get_ppd(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri");
    let destination = resolve_destination(ctx.conn, &ctx.request_path, printer_uri)?;
    let printer = match &destination {
        Destination::Printer(p) => p.clone(),
        Destination::Class(c) => dummy_printer(c),
    };
    let (caps, _ppd) = ctx.capabilities.capabilities_for(&printer)?;
    let ppd_text = pressd_capabilities::generate_ipp_everywhere_ppd(&printer.name, &caps);
    Ok(HandlerOutput { groups: Vec::new(), trailing_data: ppd_text.into_bytes() })
}

/// `Pause-All-Printers`/`Resume-All-Printers`/`Restart-System`: server-wide
/// variants of the single-printer lifecycle operations,
/// applying the same transition to every stored printer inside one
/// transaction so the set of printers observed mid-sweep never shows a
/// torn state.
fn pause_or_resume_all(ctx: &DispatchContext, state: PrinterState, accepting: bool, reasons: &[&'static str]) -> Result<HandlerOutput> {
    for printer in printers::list(ctx.conn)? {
        transition_printer(ctx.conn, &printer, state, accepting)?;
        let mut updated = printer.clone();
        updated.state = state;
        updated.accepting = accepting;
        emit_events(ctx.conn, Some(&printer.id), None, reasons, &printer_snapshot(&updated))?;
    }
    Ok(HandlerOutput::empty())
}

fn handle_pause_all_printers(ctx: &DispatchContext) -> Result<HandlerOutput> {
    pause_or_resume_all(ctx, PrinterState::Stopped, false, &events_for_printer_transition())
}

fn handle_resume_all_printers(ctx: &DispatchContext) -> Result<HandlerOutput> {
    pause_or_resume_all(ctx, PrinterState::Idle, true, &events_for_printer_transition())
}

/// `Restart-System`: every printer is reset to idle/accepting and a
/// `printer-restarted` event fires for each, mirroring `Restart-Printer`
/// applied server-wide.
fn handle_restart_system(ctx: &DispatchContext) -> Result<HandlerOutput> {
    pause_or_resume_all(ctx, PrinterState::Idle, true, &["printer-restarted"])
}

fn handle_authenticate_job(_ctx: &DispatchContext, request: &Message, policy: &PolicyAdapter, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(_ctx.conn, job_id)?;
    if !policy.can_manage_job(identity, &job)? {
        return Err(IppError::not_authorized(format!("{} may not authenticate job {job_id}", identity.user_name)).into());
    }
    Ok(HandlerOutput::empty())
}

// ---------------------------------------------------------------------------
// Subscriptions & notifications
// ---------------------------------------------------------------------------

fn parse_events(group: &AttributeGroup) -> Vec<String> {
    group
        .get("notify-events")
        .map(|a| a.strings().into_iter().map(String::from).collect())
        .unwrap_or_default()
}

fn parse_recipient(group: &AttributeGroup) -> Result<SubscriptionDelivery> {
    if let Some(uri) = group.get_string("notify-recipient-uri") {
        if !uri.starts_with("ippget:") {
            return Err(IppError::bad_request("notify-recipient-uri must use the ippget scheme").into());
        }
        return Ok(SubscriptionDelivery::RecipientUri(uri.to_string()));
    }
    match group.get_string("notify-pull-method") {
        Some("ippget") | None => Ok(SubscriptionDelivery::Pull),
        Some(other) => Err(IppError::unsupported(format!("notify-pull-method '{other}' is not supported")).into()),
    }
}

fn handle_create_printer_subscriptions(ctx: &DispatchContext, request: &Message, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri");
    let destination = resolve_destination(ctx.conn, &ctx.request_path, printer_uri)?;
    let recipient = parse_recipient(&group)?;
    let lease_seconds = group.get_integer("notify-lease-duration").unwrap_or(3600) as i64;

    let sub = Subscription {
        id: 0,
        owner: identity.user_name.clone(),
        printer_id: Some(destination.id().to_string()),
        job_id: None,
        events: parse_events(&group),
        lease_seconds,
        recipient,
        time_interval: group.get_integer("notify-time-interval").unwrap_or(0) as i64,
        user_data: Vec::new(),
        created_at: ctx.now,
    };
    let id = sub_store::insert(ctx.conn, &sub)?;
    Ok(HandlerOutput::with_group(subscription_group(id, &sub)))
}

fn handle_create_job_subscriptions(ctx: &DispatchContext, request: &Message, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let job_id = require_job_id(&group)?;
    let job = load_job(ctx.conn, job_id)?;
    let recipient = parse_recipient(&group)?;

    let sub = Subscription {
        id: 0,
        owner: identity.user_name.clone(),
        printer_id: None,
        job_id: Some(job.id),
        events: parse_events(&group),
        lease_seconds: 0,
        recipient,
        time_interval: group.get_integer("notify-time-interval").unwrap_or(0) as i64,
        user_data: Vec::new(),
        created_at: ctx.now,
    };
    let id = sub_store::insert(ctx.conn, &sub)?;
    Ok(HandlerOutput::with_group(subscription_group(id, &sub)))
}

fn subscription_group(id: i64, sub: &Subscription) -> AttributeGroup {
    let mut group = AttributeGroup::new(GroupTag::SubscriptionAttributes);
    group.push(Attribute::new("notify-subscription-id", AttributeValue::Integer(id as i32)));
    group.push(Attribute::new("notify-lease-duration", AttributeValue::Integer(sub.lease_seconds as i32)));
    group
}

fn load_subscription(conn: &Connection, id: i64) -> Result<Subscription> {
    sub_store::get(conn, id)?.ok_or_else(|| IppError::not_found(format!("subscription {id}")).into())
}

fn require_subscription_id(group: &AttributeGroup) -> Result<i64> {
    group
        .get_integer("notify-subscription-id")
        .map(|id| id as i64)
        .ok_or_else(|| IppError::bad_request("notify-subscription-id is required").into())
}

fn handle_get_subscription_attributes(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let id = require_subscription_id(&group)?;
    let sub = load_subscription(ctx.conn, id)?;
    Ok(HandlerOutput::with_group(subscription_group(id, &sub)))
}

fn handle_get_subscriptions(ctx: &DispatchContext, request: &Message) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let printer_uri = group.get_string("printer-uri");
    let subs = match printer_uri {
        Some(_) => match resolve_destination(ctx.conn, &ctx.request_path, printer_uri)? {
            Destination::Printer(p) => sub_store::list_for_printer(ctx.conn, &p.id)?,
            Destination::Class(_) => Vec::new(),
        },
        None => sub_store::list_all(ctx.conn)?,
    };
    let groups = subs.into_iter().map(|s| subscription_group(s.id, &s)).collect();
    Ok(HandlerOutput { groups, trailing_data: Vec::new() })
}

fn handle_renew_subscription(ctx: &DispatchContext, request: &Message, policy: &PolicyAdapter, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let id = require_subscription_id(&group)?;
    let sub = load_subscription(ctx.conn, id)?;
    if !policy.can_manage_subscription(identity, &sub) {
        return Err(IppError::not_authorized(format!("{} may not renew subscription {id}", identity.user_name)).into());
    }
    if sub.job_id.is_some() {
        return Err(IppError::not_possible("job subscriptions do not support lease renewal").into());
    }
    let lease_seconds = group.get_integer("notify-lease-duration").unwrap_or(3600) as i64;
    sub_store::renew(ctx.conn, id, lease_seconds)?;
    Ok(HandlerOutput::empty())
}

fn handle_cancel_subscription(ctx: &DispatchContext, request: &Message, policy: &PolicyAdapter, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let id = require_subscription_id(&group)?;
    let sub = load_subscription(ctx.conn, id)?;
    if !policy.can_manage_subscription(identity, &sub) {
        return Err(IppError::not_authorized(format!("{} may not cancel subscription {id}", identity.user_name)).into());
    }
    sub_store::delete(ctx.conn, id)?;
    Ok(HandlerOutput::empty())
}

fn handle_get_notifications(ctx: &DispatchContext, request: &Message, policy: &PolicyAdapter, identity: &Identity) -> Result<HandlerOutput> {
    let group = op_attrs(request);
    let ids: Vec<i64> = group
        .get("notify-subscription-ids")
        .map(|a| a.values.iter().filter_map(AttributeValue::as_integer).map(i64::from).collect())
        .unwrap_or_default();
    let floors: Vec<i64> = group
        .get("notify-sequence-numbers")
        .map(|a| a.values.iter().filter_map(AttributeValue::as_integer).map(i64::from).collect())
        .unwrap_or_default();

    sub_store::prune_expired(ctx.conn)?;

    let mut out = AttributeGroup::new(GroupTag::OperationAttributes);
    let mut job_for_interval: Option<Job> = None;
    let mut printer_for_interval: Option<Printer> = None;
    let mut notification_groups = Vec::new();

    for (idx, sub_id) in ids.iter().enumerate() {
        let sub = load_subscription(ctx.conn, *sub_id)?;
        if !policy.can_manage_subscription(identity, &sub) {
            return Err(IppError::not_authorized(format!("{} may not read subscription {sub_id}", identity.user_name)).into());
        }
        let floor = floors.get(idx).copied().unwrap_or(0);
        let notes = notifications::list_from(ctx.conn, *sub_id, floor)?;
        for note in notes {
            let mut g = AttributeGroup::new(GroupTag::EventNotificationAttributes);
            g.push(Attribute::new("notify-subscription-id", AttributeValue::Integer(*sub_id as i32)));
            g.push(Attribute::new("notify-sequence-number", AttributeValue::Integer(note.id as i32)));
            g.push(Attribute::new("notify-subscribed-event", AttributeValue::Keyword(note.event)));
            notification_groups.push(g);
        }
        if let Some(job_id) = sub.job_id {
            job_for_interval = jobs::get(ctx.conn, job_id)?;
        }
        if let Some(printer_id) = &sub.printer_id {
            printer_for_interval = printers::get(ctx.conn, printer_id)?;
        }
    }

    let interval = compute_get_interval(job_for_interval.as_ref(), printer_for_interval.as_ref());
    out.push(Attribute::new("notify-get-interval", AttributeValue::Integer(interval as i32)));

    let mut groups = vec![out];
    groups.extend(notification_groups);
    Ok(HandlerOutput { groups, trailing_data: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressd_core::model::{Printer, PrinterState};
    use pressd_ipp::{AttributeValue, Message};
    use pressd_store::Store;

    struct AllowAnyone;
    impl Authenticator for AllowAnyone {
        fn authenticate(&self, ctx: &RequestContext) -> Option<Identity> {
            ctx.authenticated_user.clone().map(|user_name| Identity { user_name, is_admin: false })
        }
    }

    /// Mirrors `pressd-server::auth::NetworkAuthenticator`: always defers to
    /// `RequestContext::authenticated_user`, so admin status is resolved
    /// from the `_admin_users` setting rather than hardcoded, the way
    /// production identity resolution actually works.
    struct DeferToSettings;
    impl Authenticator for DeferToSettings {
        fn authenticate(&self, _ctx: &RequestContext) -> Option<Identity> {
            None
        }
    }

    struct DefaultCapabilities;
    impl CapabilityProvider for DefaultCapabilities {
        fn capabilities_for(&self, _printer: &Printer) -> Result<(Capabilities, Option<Ppd>)> {
            Ok((Capabilities::default(), None))
        }
    }

    struct MemorySpool {
        data: std::cell::RefCell<std::collections::HashMap<String, Vec<u8>>>,
    }
    impl MemorySpool {
        fn new() -> Self {
            MemorySpool { data: std::cell::RefCell::new(std::collections::HashMap::new()) }
        }
    }
    impl SpoolWriter for MemorySpool {
        fn save(&self, job_id: i64, ordinal: i32, file_name: &str, data: &[u8]) -> Result<(String, u64)> {
            let path = format!("/spool/{job_id}/{ordinal}-{file_name}");
            self.data.borrow_mut().insert(path.clone(), data.to_vec());
            Ok((path, data.len() as u64))
        }
    }
    impl SpoolReader for MemorySpool {
        fn read(&self, spool_path: &str) -> Result<Vec<u8>> {
            self.data
                .borrow()
                .get(spool_path)
                .cloned()
                .ok_or_else(|| IppError::not_found(format!("no spooled bytes at {spool_path}")).into())
        }
    }

    fn epoch() -> DateTime<Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    fn seed_printer(conn: &Connection, id: &str, name: &str) {
        printers::insert(
            conn,
            &Printer {
                id: id.to_string(),
                name: name.to_string(),
                device_uri: "socket://printer.local:9100".into(),
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
                created_at: epoch(),
                updated_at: epoch(),
            },
        )
        .unwrap();
    }

    fn ctx<'a>(conn: &'a Connection, authenticator: &'a dyn Authenticator, caps: &'a DefaultCapabilities, spool: &'a MemorySpool) -> DispatchContext<'a> {
        static DEVICES: NoDevices = NoDevices;
        DispatchContext {
            conn,
            request_path: "/ipp/print".to_string(),
            peer: Some("127.0.0.1".parse().unwrap()),
            remote_user_header: None,
            authenticated_user: Some("alice".to_string()),
            authenticator,
            capabilities: caps,
            spool,
            spool_reader: spool,
            devices: &DEVICES,
            base_uri: "ipp://printserver.example.com".to_string(),
            now: epoch(),
        }
    }

    fn print_job_message(printer_uri: &str, job_name: &str) -> Message {
        let mut message = Message::new(0x0002, 1);
        let group = message.group_mut(GroupTag::OperationAttributes);
        group.push(Attribute::new("printer-uri", AttributeValue::Uri(printer_uri.to_string())));
        group.push(Attribute::new("job-name", AttributeValue::NameWithoutLanguage(job_name.to_string())));
        group.push(Attribute::new("requesting-user-name", AttributeValue::NameWithoutLanguage("alice".to_string())));
        message.data = b"%PDF-1.4 test".to_vec();
        message
    }

    #[test]
    fn print_job_happy_path_creates_pending_job() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                let c = ctx(tx, &authenticator, &caps, &spool);
                let request = print_job_message("ipp://h/printers/Office", "test");
                let outcome = dispatch(&c, &request);
                assert_eq!(outcome.response.code, STATUS_OK);
                let job_group = outcome.response.group(GroupTag::JobAttributes).unwrap();
                assert_eq!(job_group.get_integer("job-state"), Some(JobState::Pending.ipp_value()));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn print_job_with_hold_until_creates_held_job() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                let c = ctx(tx, &authenticator, &caps, &spool);
                let mut request = print_job_message("ipp://h/printers/Office", "test");
                request
                    .group_mut(GroupTag::OperationAttributes)
                    .push(Attribute::new("job-hold-until", AttributeValue::Keyword("indefinite".to_string())));
                let outcome = dispatch(&c, &request);
                let job_group = outcome.response.group(GroupTag::JobAttributes).unwrap();
                assert_eq!(job_group.get_integer("job-state"), Some(JobState::Held.ipp_value()));
                assert_eq!(job_group.get_string("job-state-reasons"), Some("job-hold-until-specified"));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn cups_get_document_returns_the_spooled_bytes_for_a_stored_document() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                let c = ctx(tx, &authenticator, &caps, &spool);
                let print = dispatch(&c, &print_job_message("ipp://h/printers/Office", "test"));
                let job_id = print
                    .response
                    .group(GroupTag::JobAttributes)
                    .unwrap()
                    .get_integer("job-id")
                    .unwrap();

                let mut request = Message::new(0x4027, 2);
                let group = request.group_mut(GroupTag::OperationAttributes);
                group.push(Attribute::new("job-id", AttributeValue::Integer(job_id)));
                group.push(Attribute::new("document-number", AttributeValue::Integer(1)));
                let outcome = dispatch(&c, &request);
                assert_eq!(outcome.response.code, STATUS_OK);
                assert_eq!(outcome.trailing_data, b"%PDF-1.4 test".to_vec());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn validate_job_with_too_many_copies_is_rejected_without_creating_a_job() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                let c = ctx(tx, &authenticator, &caps, &spool);
                let mut request = Message::new(0x0004, 2);
                let group = request.group_mut(GroupTag::OperationAttributes);
                group.push(Attribute::new("printer-uri", AttributeValue::Uri("ipp://h/printers/Office".to_string())));
                group.push(Attribute::new("copies", AttributeValue::Integer(1000)));
                let outcome = dispatch(&c, &request);
                assert_eq!(outcome.response.code, STATUS_ATTRIBUTES_NOT_SUPPORTED);
                assert!(jobs::list_all(tx).unwrap().is_empty());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn cancel_jobs_across_all_printers_is_owner_scoped() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                seed_printer(tx, "p2", "Lab");
                let c = ctx(tx, &authenticator, &caps, &spool);
                dispatch(&c, &print_job_message("ipp://h/printers/Office", "alice-doc"));

                let mut bob_request = print_job_message("ipp://h/printers/Lab", "bob-doc");
                bob_request
                    .group_mut(GroupTag::OperationAttributes)
                    .push(Attribute::new("requesting-user-name", AttributeValue::NameWithoutLanguage("bob".to_string())));
                dispatch(&c, &bob_request);

                let mut cancel_request = Message::new(0x4028, 10);
                cancel_request
                    .group_mut(GroupTag::OperationAttributes)
                    .push(Attribute::new("requesting-user-name", AttributeValue::NameWithoutLanguage("alice".to_string())));
                let outcome = dispatch(&c, &cancel_request);
                assert_eq!(outcome.response.code, STATUS_OK);

                let jobs_after = jobs::list_all(tx).unwrap();
                let alice_job = jobs_after.iter().find(|j| j.user_name == "alice").unwrap();
                let bob_job = jobs_after.iter().find(|j| j.user_name == "bob").unwrap();
                assert_eq!(alice_job.state, JobState::Canceled);
                assert_eq!(bob_job.state, JobState::Pending);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn move_job_rejects_terminal_job() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = DeferToSettings;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                seed_printer(tx, "p2", "Lab");
                let c = ctx(tx, &authenticator, &caps, &spool);
                let print_outcome = dispatch(&c, &print_job_message("ipp://h/printers/Office", "test"));
                let job_id = print_outcome.response.group(GroupTag::JobAttributes).unwrap().get_integer("job-id").unwrap();

                jobs::set_state(tx, job_id as i64, JobState::Completed, "job-completed-successfully").unwrap();
                pressd_store::settings::set(tx, "_admin_users", "alice").unwrap();

                let mut move_request = Message::new(0x400D, 20);
                let group = move_request.group_mut(GroupTag::OperationAttributes);
                group.push(Attribute::new("job-id", AttributeValue::Integer(job_id)));
                group.push(Attribute::new("job-printer-uri", AttributeValue::Uri("ipp://h/printers/Lab".to_string())));
                let outcome = dispatch(&c, &move_request);
                assert_eq!(outcome.response.code, STATUS_NOT_POSSIBLE);

                let job = jobs::get(tx, job_id as i64).unwrap().unwrap();
                assert_eq!(job.printer_id, "p1");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn subscription_then_get_notifications_reports_state_change() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                let c = ctx(tx, &authenticator, &caps, &spool);

                let mut sub_request = Message::new(0x0016, 1);
                let group = sub_request.group_mut(GroupTag::OperationAttributes);
                group.push(Attribute::new("printer-uri", AttributeValue::Uri("ipp://h/printers/Office".to_string())));
                group.push(Attribute::new("notify-events", AttributeValue::Keyword("job-state-changed".to_string())));
                let sub_outcome = dispatch(&c, &sub_request);
                let sub_id = sub_outcome
                    .response
                    .group(GroupTag::SubscriptionAttributes)
                    .unwrap()
                    .get_integer("notify-subscription-id")
                    .unwrap();

                let print_outcome = dispatch(&c, &print_job_message("ipp://h/printers/Office", "test"));
                let job_id = print_outcome.response.group(GroupTag::JobAttributes).unwrap().get_integer("job-id").unwrap();
                jobs::set_state(tx, job_id as i64, JobState::Processing, "none").unwrap();
                sub_store::list_for_printer(tx, "p1").unwrap();
                // Simulate the processing transition emitting its event directly,
                // mirroring what handle_* would do inside a real transaction.
                let job = jobs::get(tx, job_id as i64).unwrap().unwrap();
                emit_events(tx, Some("p1"), Some(job_id as i64), &["job-state-changed"], &job_snapshot(&job)).unwrap();

                let mut get_notify = Message::new(0x001C, 2);
                let group = get_notify.group_mut(GroupTag::OperationAttributes);
                group.push(Attribute::new("notify-subscription-ids", AttributeValue::Integer(sub_id)));
                let notify_outcome = dispatch(&c, &get_notify);
                let event_groups: Vec<_> = notify_outcome
                    .response
                    .groups
                    .iter()
                    .filter(|g| g.tag == GroupTag::EventNotificationAttributes)
                    .collect();
                assert!(!event_groups.is_empty());

                let mut get_notify_again = Message::new(0x001C, 3);
                let group = get_notify_again.group_mut(GroupTag::OperationAttributes);
                group.push(Attribute::new("notify-subscription-ids", AttributeValue::Integer(sub_id)));
                group.push(Attribute::new("notify-sequence-numbers", AttributeValue::Integer(event_groups.len() as i32 + 1)));
                let second_outcome = dispatch(&c, &get_notify_again);
                let second_events: Vec<_> = second_outcome
                    .response
                    .groups
                    .iter()
                    .filter(|g| g.tag == GroupTag::EventNotificationAttributes)
                    .collect();
                assert!(second_events.is_empty());
                Ok(())
            })
            .unwrap();
    }

    fn seed_class(conn: &Connection, id: &str, name: &str, members: Vec<String>) {
        classes::insert(
            conn,
            &Class {
                id: id.to_string(),
                name: name.to_string(),
                info: String::new(),
                location: String::new(),
                state: PrinterState::Idle,
                accepting: true,
                is_default: false,
                members,
                job_sheets_default: ("none".into(), "none".into()),
                default_options: AttributeMap::new(),
                created_at: epoch(),
                updated_at: epoch(),
            },
        )
        .unwrap();
    }

    #[test]
    fn get_printers_lists_every_stored_printer() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                seed_printer(tx, "p2", "Lab");
                let c = ctx(tx, &authenticator, &caps, &spool);
                let request = Message::new(0x4002, 1);
                let outcome = dispatch(&c, &request);
                assert_eq!(outcome.response.code, STATUS_OK);
                let names: Vec<_> = outcome
                    .response
                    .groups
                    .iter()
                    .filter(|g| g.tag == GroupTag::PrinterAttributes)
                    .map(|g| g.get_string("printer-name").unwrap().to_string())
                    .collect();
                assert_eq!(names.len(), 2);
                assert!(names.contains(&"Office".to_string()));
                assert!(names.contains(&"Lab".to_string()));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn get_classes_lists_member_printers_under_a_class_name() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                seed_class(tx, "c1", "Everyone", vec!["p1".to_string()]);
                let c = ctx(tx, &authenticator, &caps, &spool);
                let request = Message::new(0x4005, 1);
                let outcome = dispatch(&c, &request);
                assert_eq!(outcome.response.code, STATUS_OK);
                let group = outcome.response.groups.iter().find(|g| g.tag == GroupTag::PrinterAttributes).unwrap();
                assert_eq!(group.get_string("printer-name"), Some("Everyone"));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn get_devices_delegates_to_the_device_directory_seam() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                let c = ctx(tx, &authenticator, &caps, &spool);
                let request = Message::new(0x400B, 1);
                let outcome = dispatch(&c, &request);
                assert_eq!(outcome.response.code, STATUS_OK);
                assert!(outcome.response.groups.is_empty());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn get_ppds_reports_the_single_everywhere_entry() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                let c = ctx(tx, &authenticator, &caps, &spool);
                let request = Message::new(0x400C, 1);
                let outcome = dispatch(&c, &request);
                assert_eq!(outcome.response.code, STATUS_OK);
                let group = outcome.response.groups.first().unwrap();
                assert_eq!(group.get_string("ppd-name"), Some("everywhere"));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn get_ppd_renders_ppd_text_for_the_named_printer() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = AllowAnyone;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                let c = ctx(tx, &authenticator, &caps, &spool);
                let mut request = Message::new(0x400F, 1);
                request
                    .group_mut(GroupTag::OperationAttributes)
                    .push(Attribute::new("printer-uri", AttributeValue::Uri("ipp://h/printers/Office".to_string())));
                let outcome = dispatch(&c, &request);
                assert_eq!(outcome.response.code, STATUS_OK);
                assert!(outcome.trailing_data.windows(3).any(|w| w == b"PPD"));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn pause_all_printers_requires_admin_and_stops_every_printer() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = DeferToSettings;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                seed_printer(tx, "p2", "Lab");
                let c = ctx(tx, &authenticator, &caps, &spool);
                let denied = dispatch(&c, &Message::new(0x402D, 1));
                assert_eq!(denied.response.code, STATUS_NOT_AUTHORIZED);

                pressd_store::settings::set(tx, "_admin_users", "alice").unwrap();
                let outcome = dispatch(&c, &Message::new(0x402D, 2));
                assert_eq!(outcome.response.code, STATUS_OK);
                for printer in printers::list(tx).unwrap() {
                    assert_eq!(printer.state, PrinterState::Stopped);
                    assert!(!printer.accepting);
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn resume_all_printers_restores_idle_and_accepting() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = DeferToSettings;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                pressd_store::settings::set(tx, "_admin_users", "alice").unwrap();
                let c = ctx(tx, &authenticator, &caps, &spool);
                dispatch(&c, &Message::new(0x402D, 1));
                let outcome = dispatch(&c, &Message::new(0x402E, 2));
                assert_eq!(outcome.response.code, STATUS_OK);
                let printer = printers::get(tx, "p1").unwrap().unwrap();
                assert_eq!(printer.state, PrinterState::Idle);
                assert!(printer.accepting);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn restart_system_requires_admin_and_resets_every_printer() {
        let store = Store::open_in_memory().unwrap();
        let authenticator = DeferToSettings;
        let caps = DefaultCapabilities;
        let spool = MemorySpool::new();
        store
            .with_tx(|tx| {
                seed_printer(tx, "p1", "Office");
                let c = ctx(tx, &authenticator, &caps, &spool);
                let denied = dispatch(&c, &Message::new(0x402F, 1));
                assert_eq!(denied.response.code, STATUS_NOT_AUTHORIZED);

                pressd_store::settings::set(tx, "_admin_users", "alice").unwrap();
                let outcome = dispatch(&c, &Message::new(0x402F, 2));
                assert_eq!(outcome.response.code, STATUS_OK);
                let printer = printers::get(tx, "p1").unwrap().unwrap();
                assert_eq!(printer.state, PrinterState::Idle);
                assert!(printer.accepting);
                Ok(())
            })
            .unwrap();
    }
}
