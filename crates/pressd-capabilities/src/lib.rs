// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Capability engine: PPD parsing and the closed PPD<->PWG
//! mapping, the built-in media/MIME tables, derived `Capabilities`, URF tag
//! assembly, and IPP-Everywhere PPD generation.

mod capabilities;
mod media;
mod mime;
mod ppd;
mod ppd_gen;
mod urf;

pub use capabilities::{finishings_table, Capabilities, Finishing};
pub use media::{MediaSize, MediaTable, CUSTOM_MAX_KEYWORD, CUSTOM_MIN_KEYWORD};
pub use mime::MimeDatabase;
pub use ppd::{
    ipp_attribute_for_ppd_keyword, ppd_keyword_for_ipp_attribute, Ppd, PpdOption, UiConstraint,
    PPD_TO_PWG_ATTRIBUTE,
};
pub use ppd_gen::generate_ipp_everywhere_ppd;
pub use urf::build_urf_strings;
