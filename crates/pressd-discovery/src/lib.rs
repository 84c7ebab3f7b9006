// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Device discovery bridge: environment device lists, mDNS-SD
//! browsing, `dnssd://` resolution, and TTL-cached merging of all three.

mod bridge;
mod env;
mod mdns;
mod resolve;

pub use bridge::DiscoveryBridge;
pub use env::{parse_device_uris, parse_ipp_scan};
pub use mdns::MdnsBrowser;
pub use resolve::{resolve_dnssd_uri, scheme_for_service_type};
