// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw-socket ("JetDirect", port 9100) device backend: the connection
// itself IS the status probe, and `send` streams the document bytes
// with no acknowledgement framing, which is the socket protocol's own
// limitation, not something this backend can work around.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, instrument, warn};

use pressd_core::error::{PressdError, Result};

use crate::backend::DeviceBackend;
use crate::status::{DeviceStatus, SupplyLevel};

/// A `socket://host:port` device backend.
pub struct SocketBackend {
    host: String,
    port: u16,
}

impl SocketBackend {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        SocketBackend {
            host: host.into(),
            port,
        }
    }

    /// Parse a `socket://host:port` device URI.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("socket://")
            .ok_or_else(|| PressdError::Backend(format!("not a socket:// uri: {uri}")))?;
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| PressdError::Backend(format!("missing port in {uri}")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| PressdError::Backend(format!("invalid port in {uri}")))?;
        Ok(SocketBackend::new(host, port))
    }

    async fn connect(&self, deadline: Duration) -> Result<TcpStream> {
        let addr = format!("{}:{}", self.host, self.port);
        tokio::time::timeout(deadline, TcpStream::connect(&addr))
            .await
            .map_err(|_| PressdError::Backend(format!("connect to {addr} timed out")))?
            .map_err(|e| PressdError::Backend(format!("connect to {addr} failed: {e}")))
    }
}

#[async_trait]
impl DeviceBackend for SocketBackend {
    fn transport_name(&self) -> &'static str {
        "socket"
    }

    #[instrument(skip(self), fields(host = %self.host, port = self.port))]
    async fn query_status(&self, deadline: Duration) -> Result<DeviceStatus> {
        match self.connect(deadline).await {
            Ok(_stream) => {
                debug!("socket backend reachable");
                Ok(DeviceStatus::online())
            }
            Err(e) => {
                warn!(error = %e, "socket backend unreachable");
                Ok(DeviceStatus::offline(e.to_string()))
            }
        }
    }

    async fn query_supplies(&self, _deadline: Duration) -> Result<Vec<SupplyLevel>> {
        // Raw sockets carry no supply-level protocol; SNMP would be a
        // separate backend.
        Ok(Vec::new())
    }

    #[instrument(skip(self, document), fields(host = %self.host, port = self.port, bytes = document.len()))]
    async fn send(&self, document: &[u8], deadline: Duration) -> Result<()> {
        let mut stream = self.connect(deadline).await?;
        tokio::time::timeout(deadline, stream.write_all(document))
            .await
            .map_err(|_| PressdError::Backend("send timed out".to_string()))?
            .map_err(|e| PressdError::Backend(format!("send failed: {e}")))?;
        tokio::time::timeout(deadline, stream.shutdown())
            .await
            .map_err(|_| PressdError::Backend("shutdown timed out".to_string()))?
            .map_err(|e| PressdError::Backend(format!("shutdown failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_uri_parses_host_and_port() {
        let backend = SocketBackend::from_uri("socket://printer.local:9100").unwrap();
        assert_eq!(backend.host, "printer.local");
        assert_eq!(backend.port, 9100);
    }

    #[test]
    fn from_uri_rejects_non_socket_scheme() {
        assert!(SocketBackend::from_uri("ipp://printer.local:631/ipp/print").is_err());
    }

    #[tokio::test]
    async fn query_status_reports_offline_on_unreachable_host() {
        let backend = SocketBackend::new("198.51.100.1", 1);
        let status = backend
            .query_status(Duration::from_millis(200))
            .await
            .unwrap();
        assert!(!status.online);
    }
}
