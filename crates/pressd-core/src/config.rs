// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Server-wide runtime configuration: the listener/spool/store/
// environment configuration a standalone print-spooling daemon needs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Server-wide configuration, loaded once at startup and passed through
/// handler closures rather than held in a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_address: String,
    /// Directory spooled document bytes are written under.
    pub spool_dir: PathBuf,
    /// Path to the SQLite database file (or `:memory:` for tests).
    pub database_path: String,
    /// Directory holding banner templates.
    pub banner_template_dir: PathBuf,

    /// `CUPS_DEVICE_URIS`: pipe-delimited environment device list.
    pub device_uris: Option<String>,
    /// `CUPS_IPP_SCAN`: comma-separated direct IPP host list.
    pub ipp_scan: Option<String>,
    /// `CUPS_ENABLE_MDNS`.
    pub enable_mdns: bool,
    /// `CUPS_IPP_INSECURE`.
    pub ipp_insecure: bool,
    /// `CUPS_LANG`.
    pub lang: String,
    /// `CUPS_GEO_LOCATION`.
    pub geo_location: Option<String>,
    /// `CUPS_ORGANIZATION`.
    pub organization: Option<String>,
    /// `CUPS_ORGANIZATIONAL_UNIT`.
    pub organizational_unit: Option<String>,

    /// Deadline budget (seconds) applied to mDNS/backend queries unless the
    /// request's own remaining budget is shorter.
    pub discovery_timeout_secs: u64,
    pub backend_query_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:631".to_string(),
            spool_dir: PathBuf::from("/var/spool/pressd"),
            database_path: "/var/lib/pressd/pressd.db".to_string(),
            banner_template_dir: PathBuf::from("/usr/share/pressd/banners"),
            device_uris: None,
            ipp_scan: None,
            enable_mdns: true,
            ipp_insecure: false,
            lang: "en".to_string(),
            geo_location: None,
            organization: None,
            organizational_unit: None,
            discovery_timeout_secs: 3,
            backend_query_timeout_secs: 2,
        }
    }
}

impl ServerConfig {
    /// Overlay the `CUPS_*` environment variables onto the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("CUPS_DEVICE_URIS") {
            self.device_uris = Some(v);
        }
        if let Ok(v) = std::env::var("CUPS_IPP_SCAN") {
            self.ipp_scan = Some(v);
        }
        if let Ok(v) = std::env::var("CUPS_ENABLE_MDNS") {
            self.enable_mdns = parse_bool_env(&v, self.enable_mdns);
        }
        if let Ok(v) = std::env::var("CUPS_IPP_INSECURE") {
            self.ipp_insecure = parse_bool_env(&v, self.ipp_insecure);
        }
        if let Ok(v) = std::env::var("CUPS_LANG") {
            self.lang = v;
        }
        if let Ok(v) = std::env::var("CUPS_GEO_LOCATION") {
            self.geo_location = Some(v);
        }
        if let Ok(v) = std::env::var("CUPS_ORGANIZATION") {
            self.organization = Some(v);
        }
        if let Ok(v) = std::env::var("CUPS_ORGANIZATIONAL_UNIT") {
            self.organizational_unit = Some(v);
        }
    }
}

fn parse_bool_env(v: &str, default: bool) -> bool {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Well-known setting keys persisted by administrative operations
///, as constants so callers don't hand-spell them.
pub mod setting_keys {
    pub const SHARE_PRINTERS: &str = "_share_printers";
    pub const REMOTE_ADMIN: &str = "_remote_admin";
    pub const REMOTE_ANY: &str = "_remote_any";
    pub const USER_CANCEL_ANY: &str = "_user_cancel_any";
    pub const BROWSE_WEB_IF: &str = "_browse_web_if";
    pub const DEBUG_LOGGING: &str = "_debug_logging";
    pub const MAX_CLIENTS: &str = "_max_clients";
    pub const MAX_JOBS: &str = "_max_jobs";
    pub const MAX_LOG_SIZE: &str = "_max_log_size";
    pub const PRESERVE_JOB_HISTORY: &str = "_preserve_job_history";
    pub const PRESERVE_JOB_FILES: &str = "_preserve_job_files";

    pub fn printer_allowed_users(printer_id: &str) -> String {
        format!("printer.{printer_id}.allowed_users")
    }

    pub fn printer_denied_users(printer_id: &str) -> String {
        format!("printer.{printer_id}.denied_users")
    }
}
