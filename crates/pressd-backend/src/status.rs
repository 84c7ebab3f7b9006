// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status and supply-level types returned by a device backend's
// `queryStatus`/`querySupplies` calls.

/// A device's reported state, independent of the printer-resource state
/// the dispatcher maintains in the store — this is what the physical or
/// network device itself reports when asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub online: bool,
    /// IPP `printer-state` value the device's own report maps onto, when
    /// the transport carries one (raw-socket backends can't report this
    /// and leave it `None`).
    pub printer_state: Option<i32>,
    pub state_reasons: Vec<String>,
}

impl DeviceStatus {
    pub fn online() -> Self {
        DeviceStatus {
            online: true,
            printer_state: None,
            state_reasons: Vec::new(),
        }
    }

    pub fn offline(reason: impl Into<String>) -> Self {
        DeviceStatus {
            online: false,
            printer_state: None,
            state_reasons: vec![reason.into()],
        }
    }
}

/// One consumable's reported level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyLevel {
    pub name: String,
    /// 0-100, or `None` when the device doesn't report a percentage.
    pub level_percent: Option<i32>,
    pub low: bool,
}
