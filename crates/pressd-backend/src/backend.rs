// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The device backend trait: receives dispatched jobs and exposes
// `query_status`/`query_supplies`/`send` against a network device.
// Every call takes an explicit deadline rather than reading a global
// timeout, so discovery and backend calls can derive a child deadline
// bounded by the request's remaining budget.

use std::time::Duration;

use async_trait::async_trait;

use pressd_core::error::Result;

use crate::status::{DeviceStatus, SupplyLevel};

/// A physical or network print device reachable at a `device-uri`.
/// Implementations own the transport (raw socket, IPP client, LPD client)
/// and must honor `deadline` on every call, returning promptly rather than
/// blocking past it.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Human-readable transport name, for logging.
    fn transport_name(&self) -> &'static str;

    /// Query whether the device is reachable and its reported state.
    async fn query_status(&self, deadline: Duration) -> Result<DeviceStatus>;

    /// Query consumable levels. Backends that can't report supplies return
    /// an empty vec rather than erroring.
    async fn query_supplies(&self, deadline: Duration) -> Result<Vec<SupplyLevel>>;

    /// Hand raw document bytes to the device.
    async fn send(&self, document: &[u8], deadline: Duration) -> Result<()>;
}
