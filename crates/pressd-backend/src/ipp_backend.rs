// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP device backend: a `DeviceBackend` the dispatcher uses to forward
// an accepted job onward to a downstream `ipp://`/`ipps://` device (the
// case where this server fronts another IPP-capable printer rather
// than driving hardware directly).

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use ipp::prelude::*;
use tracing::{debug, instrument, warn};

use pressd_core::error::{PressdError, Result};

use crate::backend::DeviceBackend;
use crate::status::{DeviceStatus, SupplyLevel};

pub struct IppBackend {
    uri: Uri,
}

impl IppBackend {
    pub fn new(uri: &str) -> Result<Self> {
        let parsed: Uri = uri
            .parse()
            .map_err(|e| PressdError::Backend(format!("invalid device uri '{uri}': {e}")))?;
        Ok(IppBackend { uri: parsed })
    }
}

#[async_trait]
impl DeviceBackend for IppBackend {
    fn transport_name(&self) -> &'static str {
        "ipp"
    }

    #[instrument(skip(self), fields(uri = %self.uri))]
    async fn query_status(&self, deadline: Duration) -> Result<DeviceStatus> {
        let operation = IppOperationBuilder::get_printer_attributes(self.uri.clone()).build();
        let client = AsyncIppClient::new(self.uri.clone());

        let response = match tokio::time::timeout(deadline, client.send(operation)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "downstream Get-Printer-Attributes failed");
                return Ok(DeviceStatus::offline(e.to_string()));
            }
            Err(_) => return Ok(DeviceStatus::offline("query timed out")),
        };

        if !response.header().status_code().is_success() {
            return Ok(DeviceStatus::offline(format!(
                "downstream returned {:?}",
                response.header().status_code()
            )));
        }

        let printer_state = response
            .attributes()
            .groups_of(DelimiterTag::PrinterAttributes)
            .find_map(|group| group.attributes().get("printer-state"))
            .and_then(|attr| match attr.value() {
                IppValue::Integer(n) => Some(*n),
                IppValue::Enum(n) => Some(*n),
                _ => None,
            });

        Ok(DeviceStatus {
            online: true,
            printer_state,
            state_reasons: Vec::new(),
        })
    }

    async fn query_supplies(&self, _deadline: Duration) -> Result<Vec<SupplyLevel>> {
        // Supply levels are a `printer-supply` collection attribute some
        // downstream printers expose; parsing the full collection member
        // set is left to a dedicated SNMP/IPP-supplies backend.
        Ok(Vec::new())
    }

    #[instrument(skip(self, document), fields(uri = %self.uri, bytes = document.len()))]
    async fn send(&self, document: &[u8], deadline: Duration) -> Result<()> {
        let payload = IppPayload::new(Cursor::new(document.to_vec()));
        let operation = IppOperationBuilder::print_job(self.uri.clone(), payload).build();
        let client = AsyncIppClient::new(self.uri.clone());

        let response = tokio::time::timeout(deadline, client.send(operation))
            .await
            .map_err(|_| PressdError::Backend("downstream Print-Job timed out".to_string()))?
            .map_err(|e| PressdError::Backend(format!("downstream Print-Job failed: {e}")))?;

        if !response.header().status_code().is_success() {
            return Err(PressdError::Backend(format!(
                "downstream Print-Job returned {:?}",
                response.header().status_code()
            )));
        }
        debug!("downstream accepted job");
        Ok(())
    }
}
