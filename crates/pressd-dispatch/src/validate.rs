// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job-ticket validator. The teacher never validates a
// Print-Job's attributes beyond parsing them off the wire — this module is
// built directly on the `pressd-capabilities` seam.

use pressd_capabilities::{ppd_keyword_for_ipp_attribute, Capabilities, MimeDatabase, Ppd};
use pressd_core::error::{IppError, Result};
use pressd_ipp::AttributeMap;
use tracing::instrument;

/// RFC 8011 §4.2.1's `copies` upper bound as enforced here; a printer's PPD
/// can tighten it further via `copies-default` but never loosen it.
pub const MAX_COPIES: i32 = 999;
pub const MIN_JOB_PRIORITY: i32 = 1;
pub const MAX_JOB_PRIORITY: i32 = 100;

const HOLD_KEYWORDS: &[&str] = &[
    "no-hold",
    "indefinite",
    "day-time",
    "evening",
    "night",
    "weekend",
    "second-shift",
    "third-shift",
];

/// Attribute names the validator cross-checks against both `Capabilities`
/// and, when present, the destination's PPD `UIConstraints`. Each maps to its PPD keyword through the closed table so a
/// constraint written against PPD option names still catches IPP job
/// tickets.
const CONSTRAINABLE_ATTRIBUTES: &[&str] = &[
    "media",
    "media-source",
    "media-type",
    "output-bin",
    "sides",
    "print-color-mode",
];

/// Validate that a document's declared MIME type is both in the built-in
/// allow-list and in the destination's supported set.
#[instrument(skip(caps))]
pub fn validate_document_format(mime_type: &str, caps: &Capabilities) -> Result<()> {
    if !MimeDatabase::is_supported(mime_type) {
        return Err(IppError::document_format_not_supported(format!(
            "document-format '{mime_type}' is not a recognized MIME type"
        ))
        .into());
    }
    if !caps.supports_document_format(mime_type) {
        return Err(IppError::document_format_not_supported(format!(
            "document-format '{mime_type}' is not supported by this destination"
        ))
        .into());
    }
    Ok(())
}

/// Validate a job ticket's options against the destination's derived
/// capabilities and (when available) its PPD constraints. Called once per
/// Print-Job/Create-Job/Set-Job-Attributes request.
#[instrument(skip(caps, ppd, options))]
pub fn validate_job_ticket(caps: &Capabilities, ppd: Option<&Ppd>, options: &AttributeMap) -> Result<()> {
    validate_mutually_exclusive(options, "media", "media-col")?;
    validate_mutually_exclusive(options, "finishings", "finishings-col")?;
    validate_copies(options)?;
    validate_priority(options)?;
    validate_job_hold_until(options)?;
    validate_page_ranges(options)?;
    validate_keyword_option(options, "media", |v| caps.supports_media(v))?;
    validate_keyword_option(options, "sides", |v| caps.supports_sides(v))?;
    validate_keyword_option(options, "print-color-mode", |v| caps.supports_color_mode(v))?;
    validate_keyword_option(options, "media-source", |v| caps.supports_media_source(v))?;
    validate_keyword_option(options, "media-type", |v| caps.supports_media_type(v))?;
    validate_keyword_option(options, "output-bin", |v| caps.supports_output_bin(v))?;
    validate_keyword_option(options, "page-delivery", |v| caps.supports_page_delivery(v))?;
    validate_keyword_option(options, "print-scaling", |v| caps.supports_print_scaling(v))?;
    validate_integer_option(options, "print-quality", |v| caps.supports_print_quality(v))?;
    validate_integer_option(options, "orientation-requested", |v| caps.supports_orientation(v))?;
    validate_integer_option(options, "number-up", |v| caps.supports_number_up(v))?;
    validate_finishings(options, caps)?;
    validate_resolution(options, caps)?;
    if let Some(ppd) = ppd {
        validate_ppd_constraints(ppd, options)?;
    }
    Ok(())
}

/// Reject a ticket that sets both members of a name/`-col` pair: the
/// plain keyword and its collection form express the same choice and a
/// client must pick one.
fn validate_mutually_exclusive(options: &AttributeMap, plain: &str, collection: &str) -> Result<()> {
    if options.get(plain).is_some() && options.get(collection).is_some() {
        return Err(IppError::bad_request(format!(
            "'{plain}' and '{collection}' are mutually exclusive"
        ))
        .into());
    }
    Ok(())
}

fn validate_copies(options: &AttributeMap) -> Result<()> {
    let Some(copies) = options.get_integer("copies") else {
        return Ok(());
    };
    if copies < 1 || copies > MAX_COPIES {
        return Err(IppError::ppd_constraint(
            format!("copies {copies} is outside the supported range 1-{MAX_COPIES}"),
            "job-copies-out-of-range",
        )
        .into());
    }
    Ok(())
}

fn validate_priority(options: &AttributeMap) -> Result<()> {
    let Some(priority) = options.get_integer("job-priority") else {
        return Ok(());
    };
    if priority < MIN_JOB_PRIORITY || priority > MAX_JOB_PRIORITY {
        return Err(IppError::bad_request(format!(
            "job-priority {priority} is outside the range {MIN_JOB_PRIORITY}-{MAX_JOB_PRIORITY}"
        ))
        .into());
    }
    Ok(())
}

/// `job-hold-until` is either one of the RFC 8011 §4.2.2 named keywords or a
/// `HH:MM` (optionally `HH:MM:SS`) time-of-day string.
fn validate_job_hold_until(options: &AttributeMap) -> Result<()> {
    let Some(value) = options.get_str("job-hold-until") else {
        return Ok(());
    };
    if HOLD_KEYWORDS.contains(&value) || is_time_of_day(value) {
        return Ok(());
    }
    Err(IppError::unsupported(format!("job-hold-until '{value}' is not a recognized keyword or time-of-day")).into())
}

fn is_time_of_day(value: &str) -> bool {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return false;
    }
    parts.iter().all(|p| p.len() == 2 && p.parse::<u8>().is_ok())
}

/// `page-ranges` is a comma-separated list of `lo[-hi]` pairs, each with
/// `lo <= hi`.
fn validate_page_ranges(options: &AttributeMap) -> Result<()> {
    let Some(value) = options.get_str("page-ranges") else {
        return Ok(());
    };
    for segment in value.split(',') {
        let segment = segment.trim();
        let (lo, hi) = match segment.split_once('-') {
            Some((lo, hi)) => (lo, hi),
            None => (segment, segment),
        };
        let lo: i32 = lo
            .parse()
            .map_err(|_| IppError::bad_request(format!("page-ranges segment '{segment}' is not numeric")))?;
        let hi: i32 = hi
            .parse()
            .map_err(|_| IppError::bad_request(format!("page-ranges segment '{segment}' is not numeric")))?;
        if lo < 1 || hi < lo {
            return Err(IppError::bad_request(format!(
                "page-ranges segment '{segment}' is not a valid ascending range"
            ))
            .into());
        }
    }
    Ok(())
}

fn validate_keyword_option(
    options: &AttributeMap,
    name: &str,
    supported: impl Fn(&str) -> bool,
) -> Result<()> {
    let Some(value) = options.get_str(name) else {
        return Ok(());
    };
    if supported(value) {
        return Ok(());
    }
    Err(IppError::unsupported(format!("{name} '{value}' is not supported by this destination")).into())
}

fn validate_integer_option(
    options: &AttributeMap,
    name: &str,
    supported: impl Fn(i32) -> bool,
) -> Result<()> {
    let Some(value) = options.get_integer(name) else {
        return Ok(());
    };
    if supported(value) {
        return Ok(());
    }
    Err(IppError::unsupported(format!("{name} '{value}' is not supported by this destination")).into())
}

fn validate_finishings(options: &AttributeMap, caps: &Capabilities) -> Result<()> {
    let Some(values) = options.get_values("finishings") else {
        return Ok(());
    };
    for value in values {
        if let Some(n) = value.as_integer() {
            if !caps.supports_finishing(n) {
                return Err(IppError::unsupported(format!("finishings value {n} is not supported by this destination")).into());
            }
        }
    }
    Ok(())
}

fn validate_resolution(options: &AttributeMap, caps: &Capabilities) -> Result<()> {
    let Some(value) = options.get("printer-resolution") else {
        return Ok(());
    };
    let Some((cross_feed, feed, _units)) = value.as_resolution() else {
        return Ok(());
    };
    if !caps.supports_resolution(cross_feed, feed) {
        return Err(IppError::unsupported(format!(
            "printer-resolution {cross_feed}x{feed} is not supported by this destination"
        ))
        .into());
    }
    Ok(())
}

/// Check every pair of constrainable options present in the ticket against
/// the PPD's `UIConstraints`. Quadratic in the number
/// of constrainable attributes present, which is always small (six names).
fn validate_ppd_constraints(ppd: &Ppd, options: &AttributeMap) -> Result<()> {
    let present: Vec<(&str, &str, &str)> = CONSTRAINABLE_ATTRIBUTES
        .iter()
        .filter_map(|&ipp_name| {
            let ppd_keyword = ppd_keyword_for_ipp_attribute(ipp_name)?;
            let choice = options.get_str(ipp_name)?;
            Some((ipp_name, ppd_keyword, choice))
        })
        .collect();

    for i in 0..present.len() {
        for j in (i + 1)..present.len() {
            let (_, option_a, choice_a) = present[i];
            let (_, option_b, choice_b) = present[j];
            if ppd.violates_constraint(option_a, choice_a, option_b, choice_b) {
                return Err(IppError::ppd_constraint(
                    format!("'{option_a}={choice_a}' conflicts with '{option_b}={choice_b}'"),
                    "job-constraints-violated",
                )
                .into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressd_capabilities::Ppd;
    use pressd_ipp::AttributeValue;

    fn caps() -> Capabilities {
        Capabilities::default()
    }

    #[test]
    fn copies_outside_range_is_rejected() {
        let mut options = AttributeMap::new();
        options.set("copies", AttributeValue::Integer(1000));
        let err = validate_job_ticket(&caps(), None, &options).unwrap_err();
        assert_eq!(err.as_ipp_kind(), pressd_core::error::IppErrorKind::PpdConstraint);
    }

    #[test]
    fn unsupported_sides_is_rejected() {
        let mut options = AttributeMap::new();
        options.set("sides", AttributeValue::Keyword("two-sided-short-edge".into()));
        let err = validate_job_ticket(&caps(), None, &options).unwrap_err();
        assert_eq!(err.as_ipp_kind(), pressd_core::error::IppErrorKind::Unsupported);
    }

    #[test]
    fn job_hold_until_accepts_named_keyword_and_time_of_day() {
        let mut options = AttributeMap::new();
        options.set("job-hold-until", AttributeValue::Keyword("evening".into()));
        validate_job_ticket(&caps(), None, &options).unwrap();

        let mut options = AttributeMap::new();
        options.set("job-hold-until", AttributeValue::Keyword("18:30".into()));
        validate_job_ticket(&caps(), None, &options).unwrap();
    }

    #[test]
    fn page_ranges_rejects_descending_range() {
        let mut options = AttributeMap::new();
        options.set("page-ranges", AttributeValue::Keyword("10-5".into()));
        assert!(validate_job_ticket(&caps(), None, &options).is_err());
    }

    #[test]
    fn ppd_constraint_violation_is_caught() {
        let ppd = Ppd::from_ppd_text(
            r#"
*OpenUI *Duplex/Duplex: PickOne
*Duplex DuplexNoTumble/Long Edge: "statement"
*CloseUI: *Duplex
*OpenUI *MediaType/Media Type: PickOne
*MediaType Transparency/Transparency: "statement"
*CloseUI: *MediaType
*UIConstraints: *Duplex DuplexNoTumble *MediaType Transparency
"#,
        );
        let mut options = AttributeMap::new();
        options.set("sides", AttributeValue::Keyword("DuplexNoTumble".into()));
        options.set("media-type", AttributeValue::Keyword("Transparency".into()));
        let err = validate_job_ticket(&caps(), Some(&ppd), &options).unwrap_err();
        assert_eq!(err.as_ipp_kind(), pressd_core::error::IppErrorKind::PpdConstraint);
    }

    #[test]
    fn media_and_media_col_are_mutually_exclusive() {
        let mut options = AttributeMap::new();
        options.set("media", AttributeValue::Keyword("na_letter_8.5x11in".into()));
        options.set("media-col", AttributeValue::Keyword("placeholder".into()));
        let err = validate_job_ticket(&caps(), None, &options).unwrap_err();
        assert_eq!(err.as_ipp_kind(), pressd_core::error::IppErrorKind::BadRequest);
    }

    #[test]
    fn finishings_and_finishings_col_are_mutually_exclusive() {
        let mut options = AttributeMap::new();
        options.set("finishings", AttributeValue::Integer(3));
        options.set("finishings-col", AttributeValue::Keyword("placeholder".into()));
        let err = validate_job_ticket(&caps(), None, &options).unwrap_err();
        assert_eq!(err.as_ipp_kind(), pressd_core::error::IppErrorKind::BadRequest);
    }

    #[test]
    fn document_format_rejects_unknown_mime_type() {
        let err = validate_document_format("application/x-mystery", &caps()).unwrap_err();
        assert_eq!(err.as_ipp_kind(), pressd_core::error::IppErrorKind::DocumentFormatNotSupported);
    }
}
