// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error taxonomy for pressd: a dispatcher-facing `IppErrorKind`
// that maps onto IPP status codes in exactly one place
// (`pressd_dispatch::ops::map_status`), plus the lower-level `PressdError`
// that every crate's fallible operations fold into via `#[from]`.

use thiserror::Error;

/// Error taxonomy from , independent of the wire status code it
/// eventually maps to. The dispatcher is the only place that performs that
/// mapping (see `pressd-dispatch::ops::map_status`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IppErrorKind {
    BadRequest,
    Unsupported,
    DocumentFormatNotSupported,
    NotFound,
    NotAcceptingJobs,
    NotAuthorized,
    NotPossible,
    PpdConstraint,
    Internal,
}

/// A tagged error value carrying both the taxonomy kind and a free-form
/// context message "prefer a tagged error value (kind +
/// context)" guidance.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct IppError {
    pub kind: IppErrorKind,
    pub message: String,
    /// `state-reasons` keyword to attach to the response, if any (used for
    /// `errPPDConstraint` and similar cases that carry a reason keyword).
    pub state_reason: Option<String>,
}

impl IppError {
    pub fn new(kind: IppErrorKind, message: impl Into<String>) -> Self {
        IppError {
            kind,
            message: message.into(),
            state_reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.state_reason = Some(reason.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(IppErrorKind::BadRequest, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(IppErrorKind::Unsupported, message)
    }

    pub fn document_format_not_supported(message: impl Into<String>) -> Self {
        Self::new(IppErrorKind::DocumentFormatNotSupported, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(IppErrorKind::NotFound, message)
    }

    pub fn not_accepting_jobs(message: impl Into<String>) -> Self {
        Self::new(IppErrorKind::NotAcceptingJobs, message)
    }

    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::new(IppErrorKind::NotAuthorized, message)
    }

    pub fn not_possible(message: impl Into<String>) -> Self {
        Self::new(IppErrorKind::NotPossible, message)
    }

    pub fn ppd_constraint(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(IppErrorKind::PpdConstraint, message).with_reason(reason)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(IppErrorKind::Internal, message)
    }
}

/// Top-level error type for all pressd operations, mirroring the layering
/// of `PresswerkError` (a flat enum folding in lower-level crate errors via
/// `#[from]`) but scoped to the print-spooling domain.
#[derive(Debug, Error)]
pub enum PressdError {
    #[error("request rejected: {0}")]
    Request(#[from] IppError),

    #[error("store error: {0}")]
    Store(String),

    #[error("codec error: {0}")]
    Codec(#[from] pressd_ipp::CodecError),

    #[error("spool I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PressdError {
    /// Best-effort projection onto the IPP error taxonomy, for call sites
    /// that only have a `PressdError` in hand (e.g. a store failure
    /// surfacing from inside a handler) and need it mapped to a status.
    pub fn as_ipp_kind(&self) -> IppErrorKind {
        match self {
            PressdError::Request(e) => e.kind.clone(),
            _ => IppErrorKind::Internal,
        }
    }
}

/// Alias used throughout the pressd workspace.
pub type Result<T> = std::result::Result<T, PressdError>;
