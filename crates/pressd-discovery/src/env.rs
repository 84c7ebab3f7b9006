// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Environment-provided device lists: `CUPS_DEVICE_URIS`
// (pipe-delimited `uri|info|make|device-id|location` records) and
// `CUPS_IPP_SCAN` (whitespace-separated bare IPP hosts).

use pressd_core::model::DeviceCacheEntry;

/// Parse `CUPS_DEVICE_URIS`: one device per `;`-separated record, each
/// record's fields pipe-delimited as `uri|info|make|device-id|location`.
/// Trailing fields may be omitted.
pub fn parse_device_uris(value: &str, now: chrono::DateTime<chrono::Utc>) -> Vec<DeviceCacheEntry> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|record| parse_device_uri_record(record, now))
        .collect()
}

fn parse_device_uri_record(
    record: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<DeviceCacheEntry> {
    let mut fields = record.split('|').map(str::trim);
    let uri = fields.next()?.to_string();
    if uri.is_empty() {
        return None;
    }
    Some(DeviceCacheEntry {
        uri,
        info: fields.next().unwrap_or("").to_string(),
        make: fields.next().unwrap_or("").to_string(),
        device_id: fields.next().unwrap_or("").to_string(),
        location: fields.next().unwrap_or("").to_string(),
        class: "direct".to_string(),
        updated_at: now,
    })
}

/// Parse `CUPS_IPP_SCAN`: whitespace-separated bare hosts or host:port
/// pairs, each turned into an `ipp://` device entry.
pub fn parse_ipp_scan(value: &str, now: chrono::DateTime<chrono::Utc>) -> Vec<DeviceCacheEntry> {
    value
        .split_whitespace()
        .map(|host| DeviceCacheEntry {
            uri: format!("ipp://{host}/ipp/print"),
            info: format!("Scanned host {host}"),
            make: String::new(),
            device_id: String::new(),
            location: String::new(),
            class: "network".to_string(),
            updated_at: now,
        })
        .collect()
}
