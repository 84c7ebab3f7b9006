// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Concrete `DeviceDirectory`, bridging `pressd-dispatch`'s store-free
// `CUPS-Get-Devices` handler to `pressd-discovery::DiscoveryBridge`, which
// needs the `Store` and `ServerConfig` the dispatcher never sees directly.

use pressd_core::config::ServerConfig;
use pressd_core::error::Result;
use pressd_core::model::DeviceCacheEntry;
use pressd_discovery::DiscoveryBridge;
use pressd_dispatch::DeviceDirectory;
use pressd_store::Store;

pub struct BridgedDeviceDirectory<'a> {
    store: &'a Store,
    config: &'a ServerConfig,
}

impl<'a> BridgedDeviceDirectory<'a> {
    pub fn new(store: &'a Store, config: &'a ServerConfig) -> Self {
        BridgedDeviceDirectory { store, config }
    }
}

impl<'a> DeviceDirectory for BridgedDeviceDirectory<'a> {
    fn list_devices(&self) -> Result<Vec<DeviceCacheEntry>> {
        DiscoveryBridge::new(self.store, self.config).list_devices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_devices_from_the_env_source_with_mdns_disabled() {
        let store = Store::open_in_memory().unwrap();
        let mut config = ServerConfig::default();
        config.enable_mdns = false;
        config.device_uris = Some("socket://192.168.1.9:9100|Desk Printer".to_string());

        let directory = BridgedDeviceDirectory::new(&store, &config);
        let devices = directory.list_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].info, "Desk Printer");
    }
}
