// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Destination resolution: map a request's URL path and `printer-uri`
// attribute onto a `Printer` or `Class` via a lookup against the
// store's printer/class tables.

use tracing::instrument;

use pressd_core::error::{IppError, PressdError, Result};
use pressd_core::model::Destination;
use pressd_store::{classes, printers};

/// Extracted from the request path or `printer-uri` attribute.
enum TargetName {
    Printer(String),
    Class(String),
}

/// Pull a `/printers/<name>` or `/classes/<name>` suffix out of a URI or
/// path. Case-sensitive.
fn parse_target(uri_or_path: &str) -> Option<TargetName> {
    let path = match uri_or_path.find("://") {
        Some(idx) => {
            let rest = &uri_or_path[idx + 3..];
            rest.find('/').map(|slash| &rest[slash..]).unwrap_or("")
        }
        None => uri_or_path,
    };
    if let Some(name) = path.strip_prefix("/printers/") {
        return Some(TargetName::Printer(name.trim_end_matches('/').to_string()));
    }
    if let Some(name) = path.strip_prefix("/classes/") {
        return Some(TargetName::Class(name.trim_end_matches('/').to_string()));
    }
    None
}

/// Resolve a request to its destination printer or class.
///
/// Checks the request path first, then `printer-uri`, then falls back to
/// the system default (a printer or a class, whichever is marked default).
#[instrument(skip(conn))]
pub fn resolve_destination(
    conn: &rusqlite::Connection,
    request_path: &str,
    printer_uri: Option<&str>,
) -> Result<Destination> {
    let target = parse_target(request_path).or_else(|| printer_uri.and_then(parse_target));

    match target {
        Some(TargetName::Printer(name)) => printers::get_by_name(conn, &name)?
            .map(Destination::Printer)
            .ok_or_else(|| PressdError::Request(IppError::not_found(format!("printer '{name}'")))),
        Some(TargetName::Class(name)) => classes::get_by_name(conn, &name)?
            .map(Destination::Class)
            .ok_or_else(|| PressdError::Request(IppError::not_found(format!("class '{name}'")))),
        None => resolve_default(conn),
    }
}

fn resolve_default(conn: &rusqlite::Connection) -> Result<Destination> {
    if let Some(printer) = printers::get_default(conn)? {
        return Ok(Destination::Printer(printer));
    }
    if let Some(class) = classes::get_default(conn)? {
        return Ok(Destination::Class(class));
    }
    Err(PressdError::Request(IppError::not_found(
        "no destination specified and no system default is configured",
    )))
}

/// For a job about to be dispatched against a class, pick the first
/// `accepting` member in stable order. Fails with `not-accepting-jobs` if
/// none of the class's members currently accept jobs.
#[instrument(skip(conn))]
pub fn resolve_class_member(
    conn: &rusqlite::Connection,
    class: &pressd_core::model::Class,
) -> Result<pressd_core::model::Printer> {
    for member_name in &class.members {
        if let Some(printer) = printers::get_by_name(conn, member_name)? {
            if printer.accepting {
                return Ok(printer);
            }
        }
    }
    Err(PressdError::Request(IppError::not_accepting_jobs(format!(
        "no accepting member in class '{}'",
        class.name
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pressd_core::model::{Class, Printer, PrinterState};
    use pressd_ipp::AttributeMap;

    fn epoch() -> DateTime<Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    fn test_printer(id: &str, name: &str, accepting: bool) -> Printer {
        Printer {
            id: id.to_string(),
            name: name.to_string(),
            is_default: false,
            device_uri: "socket://printer.local:9100".to_string(),
            ppd_name: None,
            state: PrinterState::Idle,
            accepting,
            shared: true,
            location: String::new(),
            info: String::new(),
            geo_location: None,
            organization: None,
            organizational_unit: None,
            job_sheets_default: ("none".to_string(), "none".to_string()),
            default_options: AttributeMap::new(),
            hold_new_jobs_reason: None,
            created_at: epoch(),
            updated_at: epoch(),
        }
    }

    fn open_store() -> pressd_store::Store {
        pressd_store::Store::open_in_memory().unwrap()
    }

    #[test]
    fn parse_target_extracts_printer_name() {
        match parse_target("/printers/office-1").unwrap() {
            TargetName::Printer(name) => assert_eq!(name, "office-1"),
            _ => panic!("expected printer target"),
        }
    }

    #[test]
    fn parse_target_extracts_class_name_from_full_uri() {
        match parse_target("ipp://host/classes/Team").unwrap() {
            TargetName::Class(name) => assert_eq!(name, "Team"),
            _ => panic!("expected class target"),
        }
    }

    #[test]
    fn parse_target_is_case_sensitive() {
        assert!(parse_target("/Printers/office-1").is_none());
    }

    #[test]
    fn resolve_destination_falls_back_to_default_printer() {
        let store = open_store();
        store
            .with_tx(|tx| {
                printers::insert(tx, &test_printer("p1", "office-1", true))?;
                printers::set_default(tx, "p1")
            })
            .unwrap();
        store
            .with_tx_read(|tx| {
                let dest = resolve_destination(tx, "/ipp/print", None)?;
                assert_eq!(dest.name(), "office-1");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn resolve_destination_not_found_for_unknown_printer() {
        let store = open_store();
        let err = store
            .with_tx_read(|tx| resolve_destination(tx, "/printers/missing", None))
            .unwrap_err();
        assert_eq!(err.as_ipp_kind(), pressd_core::error::IppErrorKind::NotFound);
    }

    #[test]
    fn resolve_class_member_skips_non_accepting_members() {
        let store = open_store();
        store
            .with_tx(|tx| {
                printers::insert(tx, &test_printer("p1", "office-1", false))?;
                printers::insert(tx, &test_printer("p2", "office-2", true))?;
                Ok(())
            })
            .unwrap();
        let class = Class {
            id: "c1".to_string(),
            name: "Team".to_string(),
            info: String::new(),
            location: String::new(),
            is_default: false,
            state: PrinterState::Idle,
            accepting: true,
            members: vec!["office-1".to_string(), "office-2".to_string()],
            job_sheets_default: ("none".to_string(), "none".to_string()),
            default_options: pressd_ipp::AttributeMap::new(),
            created_at: epoch(),
            updated_at: epoch(),
        };
        store
            .with_tx_read(|tx| {
                let printer = resolve_class_member(tx, &class)?;
                assert_eq!(printer.name, "office-2");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn resolve_class_member_fails_when_none_accepting() {
        let store = open_store();
        store
            .with_tx(|tx| printers::insert(tx, &test_printer("p1", "office-1", false)))
            .unwrap();
        let class = Class {
            id: "c1".to_string(),
            name: "Team".to_string(),
            info: String::new(),
            location: String::new(),
            is_default: false,
            state: PrinterState::Idle,
            accepting: true,
            members: vec!["office-1".to_string()],
            job_sheets_default: ("none".to_string(), "none".to_string()),
            default_options: pressd_ipp::AttributeMap::new(),
            created_at: epoch(),
            updated_at: epoch(),
        };
        let err = store
            .with_tx_read(|tx| resolve_class_member(tx, &class))
            .unwrap_err();
        assert_eq!(err.as_ipp_kind(), pressd_core::error::IppErrorKind::NotAcceptingJobs);
    }
}
