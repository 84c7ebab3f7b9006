// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in MIME allow-list backing the validator's "MIME database
// lookup" for `document-format`. Real deployments replace this with the
// full IANA media-type registry; `MimeDatabase::load` is the seam.

const BUILTIN_TYPES: &[&str] = &[
    "application/pdf",
    "application/postscript",
    "application/vnd.hp-pcl",
    "image/pwg-raster",
    "image/urf",
    "image/jpeg",
    "image/png",
    "image/tiff",
    "text/plain",
    "application/octet-stream",
];

pub struct MimeDatabase;

impl MimeDatabase {
    pub fn load() -> &'static [&'static str] {
        BUILTIN_TYPES
    }

    pub fn is_supported(mime_type: &str) -> bool {
        BUILTIN_TYPES.iter().any(|t| t.eq_ignore_ascii_case(mime_type))
            || mime_type == "*/*"
    }
}
