// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability derivation: the full structure fed by both the attribute
// emitter and the validator, so the two can never diverge.

use std::collections::HashSet;

use pressd_ipp::{AttributeMap, AttributeValue};

use crate::media::{MediaTable, CUSTOM_MAX_KEYWORD, CUSTOM_MIN_KEYWORD};
use crate::ppd::{ipp_attribute_for_ppd_keyword, Ppd};

/// A finishing: its IPP enum value and its template-name equivalent.
pub type Finishing = (i32, &'static str);

const FINISHINGS_TABLE: &[Finishing] = &[
    (3, "none"),
    (4, "staple"),
    (5, "punch"),
    (7, "cover"),
    (10, "bind"),
    (20, "trim"),
    (27, "staple-top-left"),
    (28, "staple-bottom-left"),
    (29, "staple-top-right"),
    (30, "staple-bottom-right"),
];

/// Per the open question: finishings enum mappings from PPD option
/// names to numeric codes are heuristic in the original — keep this table
/// verbatim rather than trying to "fix" it.
pub fn finishings_table() -> &'static [Finishing] {
    FINISHINGS_TABLE
}

/// Derived printer capabilities: the single structure both the attribute
/// emitter (`*-supported`/`*-default`) and the job-ticket validator
/// (`pressd-dispatch::validate`) read.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub media_supported: Vec<String>,
    pub media_default: String,
    pub media_ready: Vec<String>,
    pub custom_size_supported: bool,

    pub media_sources: Vec<String>,
    pub media_source_default: Option<String>,
    pub media_types: Vec<String>,
    pub media_type_default: Option<String>,
    pub output_bins: Vec<String>,
    pub output_bin_default: Option<String>,

    pub sides: Vec<String>,
    pub sides_default: String,
    pub color_modes: Vec<String>,
    pub color_mode_default: String,
    pub resolutions: Vec<(i32, i32)>,
    pub resolution_default: (i32, i32),
    pub raster_types: Vec<String>,

    pub finishings: Vec<Finishing>,
    pub finishings_default: i32,

    pub print_quality: Vec<i32>,
    pub print_quality_default: i32,
    pub number_up: Vec<i32>,
    pub number_up_default: i32,
    pub orientations: Vec<i32>,
    pub orientation_default: i32,
    pub page_delivery: Vec<String>,
    pub print_scaling: Vec<String>,

    pub document_formats: Vec<String>,
    pub copies_max: i32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            media_supported: vec!["iso_a4_210x297mm".into(), "na_letter_8.5x11in".into()],
            media_default: "iso_a4_210x297mm".into(),
            media_ready: vec!["iso_a4_210x297mm".into()],
            custom_size_supported: false,
            media_sources: vec!["auto".into()],
            media_source_default: Some("auto".into()),
            media_types: vec!["stationery".into()],
            media_type_default: Some("stationery".into()),
            output_bins: vec!["face-down".into()],
            output_bin_default: Some("face-down".into()),
            sides: vec!["one-sided".into()],
            sides_default: "one-sided".into(),
            color_modes: vec!["srgb_8".into(), "sgray_8".into()],
            color_mode_default: "srgb_8".into(),
            resolutions: vec![(300, 300)],
            resolution_default: (300, 300),
            raster_types: vec!["srgb_8".into(), "sgray_8".into(), "black_1".into()],
            finishings: vec![(3, "none")],
            finishings_default: 3,
            print_quality: vec![3, 4, 5],
            print_quality_default: 4,
            number_up: vec![1],
            number_up_default: 1,
            orientations: vec![3, 4, 5, 6],
            orientation_default: 3,
            page_delivery: vec!["same-order".into()],
            print_scaling: vec!["auto".into()],
            document_formats: crate::mime::MimeDatabase::load().iter().map(|s| s.to_string()).collect(),
            copies_max: 999,
        }
    }
}

impl Capabilities {
    /// Derive capabilities from a PPD and a printer's stored default
    /// overrides PPD option choices are mapped through
    /// the closed PPD<->PWG table; options the PPD doesn't declare fall
    /// back to the built-in defaults so a printer with a minimal or absent
    /// PPD still has a usable capability set.
    pub fn derive(ppd: &Ppd, default_options: &AttributeMap) -> Capabilities {
        let mut caps = Capabilities::default();

        if let Some(opt) = ppd.option("PageSize") {
            if !opt.choices.is_empty() {
                caps.media_supported = opt
                    .choices
                    .iter()
                    .map(|c| ppd_choice_to_pwg_media(c))
                    .collect();
            }
            if let Some(default) = &opt.default {
                caps.media_default = ppd_choice_to_pwg_media(default);
            }
        }
        if caps.custom_size_supported {
            caps.media_supported.push(CUSTOM_MIN_KEYWORD.to_string());
            caps.media_supported.push(CUSTOM_MAX_KEYWORD.to_string());
        }

        apply_ppd_choices(ppd, "InputSlot", &mut caps.media_sources, &mut caps.media_source_default);
        apply_ppd_choices(ppd, "MediaType", &mut caps.media_types, &mut caps.media_type_default);
        apply_ppd_choices(ppd, "OutputBin", &mut caps.output_bins, &mut caps.output_bin_default);

        if let Some(opt) = ppd.option("Duplex") {
            if !opt.choices.is_empty() {
                caps.sides = opt.choices.iter().map(|c| ppd_choice_to_sides(c)).collect();
                caps.sides.sort();
                caps.sides.dedup();
            }
            if let Some(default) = &opt.default {
                caps.sides_default = ppd_choice_to_sides(default);
            }
        }

        if let Some(opt) = ppd.option("ColorModel").or_else(|| ppd.option("ColorMode")) {
            if !opt.choices.is_empty() {
                caps.color_modes = opt.choices.iter().map(|c| ppd_choice_to_color_mode(c)).collect();
                caps.color_modes.sort();
                caps.color_modes.dedup();
            }
            if let Some(default) = &opt.default {
                caps.color_mode_default = ppd_choice_to_color_mode(default);
            }
        }

        // Apply the printer's own default overrides last, so stored
        // `default-options` win over both the PPD and the built-in
        // fallback.
        if let Some(v) = default_options.get_str("media-default") {
            caps.media_default = v.to_string();
        }
        if let Some(v) = default_options.get_str("sides-default") {
            caps.sides_default = v.to_string();
        }
        if let Some(v) = default_options.get_str("print-color-mode-default") {
            caps.color_mode_default = v.to_string();
        }
        if let Some(v) = default_options.get_integer("copies-default") {
            caps.copies_max = caps.copies_max.max(v);
        }

        caps
    }

    pub fn supports_media(&self, keyword: &str) -> bool {
        self.media_supported.iter().any(|m| m == keyword) || MediaTable::lookup(keyword).is_some()
    }

    pub fn supports_sides(&self, keyword: &str) -> bool {
        self.sides.iter().any(|s| s == keyword)
    }

    pub fn supports_color_mode(&self, keyword: &str) -> bool {
        self.color_modes.iter().any(|c| c == keyword)
    }

    pub fn supports_media_source(&self, keyword: &str) -> bool {
        self.media_sources.iter().any(|s| s == keyword)
    }

    pub fn supports_media_type(&self, keyword: &str) -> bool {
        self.media_types.iter().any(|s| s == keyword)
    }

    pub fn supports_output_bin(&self, keyword: &str) -> bool {
        self.output_bins.iter().any(|s| s == keyword)
    }

    pub fn supports_finishing(&self, value: i32) -> bool {
        self.finishings.iter().any(|(n, _)| *n == value)
    }

    pub fn supports_print_quality(&self, value: i32) -> bool {
        self.print_quality.iter().any(|q| *q == value)
    }

    pub fn supports_resolution(&self, cross_feed: i32, feed: i32) -> bool {
        self.resolutions.iter().any(|(x, y)| *x == cross_feed && *y == feed)
    }

    pub fn supports_orientation(&self, value: i32) -> bool {
        self.orientations.iter().any(|o| *o == value)
    }

    pub fn supports_number_up(&self, value: i32) -> bool {
        self.number_up.iter().any(|n| *n == value)
    }

    pub fn supports_document_format(&self, mime_type: &str) -> bool {
        self.document_formats.iter().any(|f| f.eq_ignore_ascii_case(mime_type)) || mime_type == "*/*"
    }

    pub fn supports_page_delivery(&self, keyword: &str) -> bool {
        self.page_delivery.iter().any(|p| p == keyword)
    }

    pub fn supports_print_scaling(&self, keyword: &str) -> bool {
        self.print_scaling.iter().any(|p| p == keyword)
    }

    /// Distinct `document-format-supported` set, as a `HashSet` for callers
    /// doing set intersection (e.g. the destination-merge path for a
    /// class's defaults).
    pub fn document_format_set(&self) -> HashSet<&str> {
        self.document_formats.iter().map(String::as_str).collect()
    }
}

fn apply_ppd_choices(
    ppd: &Ppd,
    ppd_keyword: &str,
    out_supported: &mut Vec<String>,
    out_default: &mut Option<String>,
) {
    let Some(ipp_name) = ipp_attribute_for_ppd_keyword(ppd_keyword) else {
        return;
    };
    let _ = ipp_name;
    if let Some(opt) = ppd.option(ppd_keyword) {
        if !opt.choices.is_empty() {
            *out_supported = opt.choices.iter().map(|c| pwg_keyword_case(c)).collect();
        }
        if let Some(default) = &opt.default {
            *out_default = Some(pwg_keyword_case(default));
        }
    }
}

/// Map a PPD `PageSize` choice to its PWG media keyword when a known
/// mapping exists, else fall back to the lower-kebab form of the raw PPD
/// choice rule 5 ("match either the raw PPD choice or the
/// mapped PWG keyword").
fn ppd_choice_to_pwg_media(choice: &str) -> String {
    match choice {
        "Letter" => "na_letter_8.5x11in".to_string(),
        "Legal" => "na_legal_8.5x14in".to_string(),
        "Ledger" | "Tabloid" => "na_ledger_11x17in".to_string(),
        "A4" => "iso_a4_210x297mm".to_string(),
        "A3" => "iso_a3_297x420mm".to_string(),
        "A5" => "iso_a5_148x210mm".to_string(),
        other => pwg_keyword_case(other),
    }
}

fn ppd_choice_to_sides(choice: &str) -> String {
    match choice {
        "None" | "False" => "one-sided".to_string(),
        "DuplexNoTumble" => "two-sided-long-edge".to_string(),
        "DuplexTumble" => "two-sided-short-edge".to_string(),
        other => pwg_keyword_case(other),
    }
}

fn ppd_choice_to_color_mode(choice: &str) -> String {
    match choice {
        "Gray" | "Grayscale" | "FastGray" => "sgray_8".to_string(),
        "RGB" | "CMYK" | "Color" => "srgb_8".to_string(),
        "Mono" | "Monochrome" => "black_1".to_string(),
        other => pwg_keyword_case(other),
    }
}

fn pwg_keyword_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            out.push('-');
        }
        out.extend(ch.to_lowercase());
    }
    out
}
