// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Shared domain types, error taxonomy, and runtime configuration for
//! pressd's server-side data model: printers, classes, jobs, documents,
//! subscriptions, notifications, settings, and the device cache.

pub mod config;
pub mod error;
pub mod model;

pub use error::{IppError, IppErrorKind, PressdError, Result};
