// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// URF (Apple/PWG raster capability tag) string assembly.

use crate::capabilities::Capabilities;

/// Build the `urf-supported` attribute value list for a printer's derived
/// capabilities: `V1.4`, `CP<n>`, `W8`/color-gray tags, `PQ...`, `RS...`,
/// `DM1` (duplex), `FN...` (finishings).
pub fn build_urf_strings(caps: &Capabilities) -> Vec<String> {
    let mut tags = vec!["V1.4".to_string()];

    tags.push(format!("CP{}", caps.copies_max.max(1)));

    let mut color_tags = Vec::new();
    if caps.color_modes.iter().any(|m| m == "srgb_8") {
        color_tags.push("SRGB24");
    }
    if caps.color_modes.iter().any(|m| m == "sgray_8") {
        color_tags.push("W8");
    }
    if caps.color_modes.iter().any(|m| m == "black_1") {
        color_tags.push("W8-16");
    }
    tags.extend(color_tags.into_iter().map(String::from));

    if !caps.print_quality.is_empty() {
        let pq: Vec<String> = caps.print_quality.iter().map(|q| q.to_string()).collect();
        tags.push(format!("PQ{}", pq.join("-")));
    }

    if !caps.resolutions.is_empty() {
        let rs: Vec<String> = caps
            .resolutions
            .iter()
            .map(|(x, y)| format!("{x}x{y}"))
            .collect();
        tags.push(format!("RS{}", rs.join("-")));
    }

    if caps.sides.iter().any(|s| s.starts_with("two-sided")) {
        tags.push("DM1".to_string());
    }

    if !caps.finishings.is_empty() {
        let fn_tags: Vec<String> = caps.finishings.iter().map(|(n, _)| n.to_string()).collect();
        tags.push(format!("FN{}", fn_tags.join("-")));
    }

    tags
}
