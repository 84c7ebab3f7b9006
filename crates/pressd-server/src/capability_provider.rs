// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Concrete `CapabilityProvider`. Loads a printer's PPD text from the configured PPD
// directory when `ppd_name` is set, falling back to an empty `Ppd` (the
// driverless IPP Everywhere case) otherwise, and derives `Capabilities`
// from it the way `pressd-capabilities::Capabilities::derive` expects.

use std::path::PathBuf;

use tracing::{debug, warn};

use pressd_capabilities::{Capabilities, Ppd};
use pressd_core::error::Result;
use pressd_core::model::Printer;
use pressd_dispatch::CapabilityProvider;

pub struct FilesystemCapabilityProvider {
    ppd_dir: PathBuf,
}

impl FilesystemCapabilityProvider {
    pub fn new(ppd_dir: PathBuf) -> Self {
        FilesystemCapabilityProvider { ppd_dir }
    }

    fn load_ppd(&self, ppd_name: &str) -> Option<Ppd> {
        let path = self.ppd_dir.join(format!("{ppd_name}.ppd"));
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(Ppd::from_ppd_text(&text)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "PPD file unreadable, falling back to driverless capabilities");
                None
            }
        }
    }
}

impl CapabilityProvider for FilesystemCapabilityProvider {
    fn capabilities_for(&self, printer: &Printer) -> Result<(Capabilities, Option<Ppd>)> {
        let ppd = printer.ppd_name.as_deref().and_then(|name| self.load_ppd(name));
        debug!(printer = %printer.name, has_ppd = ppd.is_some(), "deriving capabilities");
        let capabilities = Capabilities::derive(ppd.as_ref().unwrap_or(&Ppd::new()), &printer.default_options);
        Ok((capabilities, ppd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pressd_core::model::PrinterState;
    use pressd_ipp::AttributeMap;

    fn sample_printer(ppd_name: Option<&str>) -> Printer {
        let now = Utc::now();
        Printer {
            id: "p1".into(),
            name: "Office".into(),
            device_uri: "socket://127.0.0.1:9100".into(),
            ppd_name: ppd_name.map(str::to_string),
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
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn falls_back_to_driverless_capabilities_without_a_ppd() {
        let provider = FilesystemCapabilityProvider::new(PathBuf::from("/nonexistent"));
        let (caps, ppd) = provider.capabilities_for(&sample_printer(None)).unwrap();
        assert!(ppd.is_none());
        assert!(!caps.media_supported.is_empty());
    }

    #[test]
    fn reads_ppd_text_from_disk_when_named() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("everywhere.ppd"),
            "*OpenUI *PageSize/Media Size: PickOne\n*PageSize Letter/US Letter: \"\"\n*CloseUI: *PageSize\n*DefaultPageSize: Letter\n",
        )
        .unwrap();
        let provider = FilesystemCapabilityProvider::new(dir.path().to_path_buf());
        let (_, ppd) = provider.capabilities_for(&sample_printer(Some("everywhere"))).unwrap();
        assert!(ppd.is_some());
        assert!(ppd.unwrap().option("PageSize").is_some());
    }
}
