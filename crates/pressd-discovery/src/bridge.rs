// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device discovery bridge: assembles a device list from the
// environment, mDNS, and the TTL cache, deduplicating on URI and falling
// through to a live refresh on cache miss.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{info, instrument};

use pressd_core::config::ServerConfig;
use pressd_core::error::Result;
use pressd_core::model::DeviceCacheEntry;
use pressd_store::Store;

use crate::env::{parse_device_uris, parse_ipp_scan};
use crate::mdns::MdnsBrowser;

/// Default cache freshness window "cache under a TTL".
const DEFAULT_CACHE_TTL_MINUTES: i64 = 5;

pub struct DiscoveryBridge<'a> {
    store: &'a Store,
    config: &'a ServerConfig,
}

impl<'a> DiscoveryBridge<'a> {
    pub fn new(store: &'a Store, config: &'a ServerConfig) -> Self {
        DiscoveryBridge { store, config }
    }

    /// Return the cached device list if it's fresh; otherwise perform a
    /// live discovery pass, persist the results, and return those instead.
    #[instrument(skip(self))]
    pub fn list_devices(&self) -> Result<Vec<DeviceCacheEntry>> {
        let now = Utc::now();
        let ttl = ChronoDuration::minutes(DEFAULT_CACHE_TTL_MINUTES);
        let cached = self
            .store
            .with_tx_read(|tx| pressd_store::devices::list_fresh(tx, now, ttl))?;
        if !cached.is_empty() {
            return Ok(cached);
        }
        self.refresh()
    }

    /// Run a live discovery pass across every configured source, dedupe on
    /// URI, persist to the cache, and return the merged list.
    #[instrument(skip(self))]
    pub fn refresh(&self) -> Result<Vec<DeviceCacheEntry>> {
        let now = Utc::now();
        let mut merged: Vec<DeviceCacheEntry> = Vec::new();

        if let Some(uris) = &self.config.device_uris {
            merged.extend(parse_device_uris(uris, now));
        }
        if let Some(scan) = &self.config.ipp_scan {
            merged.extend(parse_ipp_scan(scan, now));
        }
        if self.config.enable_mdns {
            merged.extend(self.browse_mdns(now));
        }

        dedupe_by_uri(&mut merged);
        info!(count = merged.len(), "discovery refresh complete");

        self.store.with_tx(|tx| {
            for entry in &merged {
                pressd_store::devices::upsert(tx, entry)?;
            }
            pressd_store::devices::prune_stale(
                tx,
                now,
                ChronoDuration::minutes(DEFAULT_CACHE_TTL_MINUTES * 6),
            )?;
            Ok(())
        })?;

        Ok(merged)
    }

    fn browse_mdns(&self, _now: chrono::DateTime<Utc>) -> Vec<DeviceCacheEntry> {
        let timeout = Duration::from_secs(self.config.discovery_timeout_secs);
        match MdnsBrowser::new() {
            Ok(mut browser) => match browser.discover(timeout) {
                Ok(devices) => {
                    let _ = browser.stop();
                    devices
                }
                Err(e) => {
                    tracing::warn!(error = %e, "mDNS browse failed");
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "mDNS daemon unavailable");
                Vec::new()
            }
        }
    }
}

fn dedupe_by_uri(devices: &mut Vec<DeviceCacheEntry>) {
    let mut seen = std::collections::HashSet::new();
    devices.retain(|d| seen.insert(d.uri.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrence_per_uri() {
        let now = Utc::now();
        let mut devices = vec![
            DeviceCacheEntry {
                uri: "socket://a:9100".into(),
                info: "First".into(),
                make: String::new(),
                class: "direct".into(),
                device_id: String::new(),
                location: String::new(),
                updated_at: now,
            },
            DeviceCacheEntry {
                uri: "socket://a:9100".into(),
                info: "Duplicate".into(),
                make: String::new(),
                class: "direct".into(),
                device_id: String::new(),
                location: String::new(),
                updated_at: now,
            },
        ];
        dedupe_by_uri(&mut devices);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].info, "First");
    }

    #[test]
    fn list_devices_refreshes_from_env_when_cache_empty() {
        let store = Store::open_in_memory().unwrap();
        let mut config = ServerConfig::default();
        config.enable_mdns = false;
        config.device_uris = Some("socket://192.168.1.9:9100|Desk Printer".to_string());

        let bridge = DiscoveryBridge::new(&store, &config);
        let devices = bridge.list_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].info, "Desk Printer");
    }
}
