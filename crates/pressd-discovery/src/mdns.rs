// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mDNS-SD browsing for printer services across the full set of
// service types: `_ipp`, `_ipps`, `_ipp-tls`, `_printer`,
// `_pdl-datastream`.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tracing::{debug, info, warn};

use pressd_core::error::{PressdError, Result};
use pressd_core::model::DeviceCacheEntry;

const SERVICE_TYPES: &[(&str, &str)] = &[
    ("_ipp._tcp.local.", "ipp"),
    ("_ipps._tcp.local.", "ipps"),
    ("_ipp-tls._tcp.local.", "ipps"),
    ("_printer._tcp.local.", "lpd"),
    ("_pdl-datastream._tcp.local.", "socket"),
];

/// mDNS-SD browser for `SERVICE_TYPES`. Discovered services are
/// accumulated in a shared map keyed by mDNS full-name, deduplicating
/// as results arrive, and produce `DeviceCacheEntry` values rather than
/// a UI-facing printer record.
pub struct MdnsBrowser {
    daemon: ServiceDaemon,
    devices: Arc<Mutex<HashMap<String, DeviceCacheEntry>>>,
    browsing: bool,
}

impl MdnsBrowser {
    pub fn new() -> Result<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| PressdError::Discovery(format!("failed to start mDNS daemon: {e}")))?;
        Ok(MdnsBrowser {
            daemon,
            devices: Arc::new(Mutex::new(HashMap::new())),
            browsing: false,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        if self.browsing {
            debug!("mDNS device browsing already running");
            return Ok(());
        }
        for &(service_type, scheme) in SERVICE_TYPES {
            let receiver = self
                .daemon
                .browse(service_type)
                .map_err(|e| PressdError::Discovery(format!("browse {service_type}: {e}")))?;
            Self::spawn_listener(service_type, scheme, receiver, Arc::clone(&self.devices));
        }
        self.browsing = true;
        info!("mDNS device discovery started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.browsing {
            return Ok(());
        }
        for &(service_type, _) in SERVICE_TYPES {
            self.daemon
                .stop_browse(service_type)
                .map_err(|e| PressdError::Discovery(format!("stop browse {service_type}: {e}")))?;
        }
        self.browsing = false;
        Ok(())
    }

    pub fn shutdown(self) -> Result<()> {
        let _status_rx = self
            .daemon
            .shutdown()
            .map_err(|e| PressdError::Discovery(format!("daemon shutdown: {e}")))?;
        Ok(())
    }

    pub fn devices(&self) -> Vec<DeviceCacheEntry> {
        self.devices
            .lock()
            .expect("device map lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Start browsing, wait up to `timeout` for an initial snapshot, and
    /// return whatever was found. Browsing continues in the background
    /// after this call returns "deadline-bounded"
    /// query guidance.
    pub fn discover(&mut self, timeout: Duration) -> Result<Vec<DeviceCacheEntry>> {
        self.start()?;
        std::thread::sleep(timeout);
        Ok(self.devices())
    }

    fn spawn_listener(
        service_type: &'static str,
        scheme: &'static str,
        receiver: mdns_sd::Receiver<ServiceEvent>,
        devices: Arc<Mutex<HashMap<String, DeviceCacheEntry>>>,
    ) {
        std::thread::Builder::new()
            .name(format!("mdns-{service_type}"))
            .spawn(move || {
                while let Ok(event) = receiver.recv() {
                    match event {
                        ServiceEvent::ServiceResolved(info) => {
                            let fullname = info.get_fullname().to_owned();
                            match service_info_to_device(&info, scheme) {
                                Ok(device) => {
                                    info!(uri = %device.uri, "device resolved via mDNS");
                                    devices
                                        .lock()
                                        .expect("device map lock poisoned")
                                        .insert(fullname, device);
                                }
                                Err(e) => {
                                    warn!(fullname = %fullname, error = %e, "failed to convert resolved service");
                                }
                            }
                        }
                        ServiceEvent::ServiceRemoved(_, fullname) => {
                            devices
                                .lock()
                                .expect("device map lock poisoned")
                                .remove(&fullname);
                        }
                        ServiceEvent::SearchStopped(_) => break,
                        _ => {}
                    }
                }
            })
            .expect("failed to spawn mDNS listener thread");
    }
}

fn service_info_to_device(info: &ServiceInfo, scheme: &str) -> Result<DeviceCacheEntry> {
    let name = info.get_fullname().to_owned();
    let port = info.get_port();
    let ip: IpAddr = info
        .get_addresses()
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| info.get_addresses().iter().next())
        .copied()
        .ok_or_else(|| PressdError::Discovery(format!("no address for service {name}")))?;

    let resource_path = info.get_property_val_str("rp").unwrap_or("ipp/print");
    let uri = match scheme {
        "ipp" | "ipps" => format!("{scheme}://{ip}:{port}/{resource_path}"),
        "lpd" => format!("lpd://{ip}:{port}/queue"),
        _ => format!("socket://{ip}:{port}"),
    };

    Ok(DeviceCacheEntry {
        uri,
        info: info
            .get_property_val_str("printer-make-and-model")
            .unwrap_or(&name)
            .to_string(),
        make: info
            .get_property_val_str("ty")
            .unwrap_or_default()
            .to_string(),
        class: "network".to_string(),
        device_id: info
            .get_property_val_str("product")
            .unwrap_or_default()
            .to_string(),
        location: info
            .get_property_val_str("printer-location")
            .unwrap_or_default()
            .to_string(),
        updated_at: Utc::now(),
    })
}
