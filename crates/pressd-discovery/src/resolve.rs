// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `dnssd://` URI resolution: a `dnssd://` destination names
// an mDNS service instance by its TXT-record service type rather than a
// concrete network address; this module turns one into the `ipp[s]://`,
// `socket://`, or `lpd://` form a backend can actually dial.

use pressd_core::error::{PressdError, Result};
use pressd_core::model::DeviceCacheEntry;

/// Resolve a `dnssd://<name>._<service>._tcp.local/?<query>` URI against the
/// cached/browsed device list The match is by full mDNS
/// name; callers needing a fresh resolution should browse first.
pub fn resolve_dnssd_uri(uri: &str, known: &[DeviceCacheEntry]) -> Result<String> {
    let rest = uri
        .strip_prefix("dnssd://")
        .ok_or_else(|| PressdError::Discovery(format!("not a dnssd:// uri: {uri}")))?;

    let name = rest.split('?').next().unwrap_or(rest);
    let name = urldecode(name);

    known
        .iter()
        .find(|d| d.info == name || d.uri.contains(&name))
        .map(|d| d.uri.clone())
        .ok_or_else(|| PressdError::Discovery(format!("no device resolves dnssd name {name}")))
}

/// Concrete scheme a service type maps onto, for callers building a
/// `device-uri` directly from a service type rather than a full dnssd URI.
pub fn scheme_for_service_type(service_type: &str) -> &'static str {
    match service_type {
        "_ipp._tcp" | "_ipp._tcp.local." => "ipp",
        "_ipps._tcp" | "_ipps._tcp.local." | "_ipp-tls._tcp" | "_ipp-tls._tcp.local." => "ipps",
        "_printer._tcp" | "_printer._tcp.local." => "lpd",
        "_pdl-datastream._tcp" | "_pdl-datastream._tcp.local." => "socket",
        _ => "socket",
    }
}

fn urldecode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn device(uri: &str, info: &str) -> DeviceCacheEntry {
        DeviceCacheEntry {
            uri: uri.into(),
            info: info.into(),
            make: String::new(),
            class: "network".into(),
            device_id: String::new(),
            location: String::new(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn resolves_by_matching_info_name() {
        let known = vec![device("ipp://192.168.1.5:631/ipp/print", "Office Printer")];
        let resolved = resolve_dnssd_uri("dnssd://Office%20Printer._ipp._tcp.local./", &known).unwrap();
        assert_eq!(resolved, "ipp://192.168.1.5:631/ipp/print");
    }

    #[test]
    fn rejects_unresolvable_name() {
        let known = vec![device("ipp://192.168.1.5:631/ipp/print", "Office Printer")];
        assert!(resolve_dnssd_uri("dnssd://Missing._ipp._tcp.local./", &known).is_err());
    }

    #[test]
    fn scheme_lookup_covers_all_service_types() {
        assert_eq!(scheme_for_service_type("_ipps._tcp.local."), "ipps");
        assert_eq!(scheme_for_service_type("_printer._tcp.local."), "lpd");
        assert_eq!(scheme_for_service_type("_pdl-datastream._tcp.local."), "socket");
    }
}
