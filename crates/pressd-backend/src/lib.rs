// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Device backend abstraction: `queryStatus`/
//! `querySupplies`/`send`, deadline-bounded, over concrete transports.

mod backend;
mod ipp_backend;
mod socket;
mod status;

pub use backend::DeviceBackend;
pub use ipp_backend::IppBackend;
pub use socket::SocketBackend;
pub use status::{DeviceStatus, SupplyLevel};

/// Construct the right backend for a `device-uri` scheme.
pub fn backend_for_uri(uri: &str) -> pressd_core::error::Result<Box<dyn DeviceBackend>> {
    if uri.starts_with("ipp://") || uri.starts_with("ipps://") {
        Ok(Box::new(IppBackend::new(uri)?))
    } else if uri.starts_with("socket://") {
        Ok(Box::new(SocketBackend::from_uri(uri)?))
    } else {
        Err(pressd_core::error::PressdError::Backend(format!(
            "no backend transport for device uri: {uri}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_for_uri_picks_socket_transport() {
        let backend = backend_for_uri("socket://printer.local:9100").unwrap();
        assert_eq!(backend.transport_name(), "socket");
    }

    #[test]
    fn backend_for_uri_picks_ipp_transport() {
        let backend = backend_for_uri("ipp://printer.local:631/ipp/print").unwrap();
        assert_eq!(backend.transport_name(), "ipp");
    }

    #[test]
    fn backend_for_uri_rejects_unknown_scheme() {
        assert!(backend_for_uri("usb://001/002").is_err());
    }
}
