// SPDX-License-Identifier: PMPL-1.0-or-later
//
// `requested-attributes` filtering: expands the pseudo-group names IPP
// clients send (`all`, `printer-description`, `job-template`, ...) into the
// concrete attribute names a response should include. There is no teacher
// analogue for this — `ipp_server.rs` always returns a fixed attribute set —
// so the group membership tables below are built from RFC 8011 §5's
// attribute group definitions.

/// One of the named attribute groups a client may ask for instead of (or
/// alongside) a literal attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeGroupName {
    All,
    PrinterDescription,
    PrinterDefaults,
    PrinterConfiguration,
    PrinterStatus,
    JobDescription,
    JobTemplate,
    JobStatus,
    SubscriptionDescription,
    SubscriptionTemplate,
    DocumentDescription,
    DocumentStatus,
    DocumentTemplate,
}

impl AttributeGroupName {
    pub fn parse(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "all" => AttributeGroupName::All,
            "printer-description" => AttributeGroupName::PrinterDescription,
            "printer-defaults" => AttributeGroupName::PrinterDefaults,
            "printer-configuration" => AttributeGroupName::PrinterConfiguration,
            "printer-status" => AttributeGroupName::PrinterStatus,
            "job-description" => AttributeGroupName::JobDescription,
            "job-template" => AttributeGroupName::JobTemplate,
            "job-status" => AttributeGroupName::JobStatus,
            "subscription-description" => AttributeGroupName::SubscriptionDescription,
            "subscription-template" => AttributeGroupName::SubscriptionTemplate,
            "document-description" => AttributeGroupName::DocumentDescription,
            "document-status" => AttributeGroupName::DocumentStatus,
            "document-template" => AttributeGroupName::DocumentTemplate,
            _ => return None,
        })
    }

    /// The concrete attribute names this pseudo-group stands for.
    pub fn members(self) -> &'static [&'static str] {
        match self {
            AttributeGroupName::All => &[],
            AttributeGroupName::PrinterDescription => &[
                "printer-uri-supported",
                "uri-security-supported",
                "uri-authentication-supported",
                "printer-name",
                "printer-location",
                "printer-info",
                "printer-more-info",
                "printer-make-and-model",
                "printer-organization",
                "printer-organizational-unit",
                "printer-geo-location",
                "printer-uuid",
                "charset-configured",
                "charset-supported",
                "natural-language-configured",
                "generated-natural-language-supported",
                "document-format-default",
                "document-format-supported",
                "operations-supported",
                "multiple-document-jobs-supported",
                "pdl-override-supported",
                "printer-is-accepting-jobs",
                "queued-job-count",
                "ipp-versions-supported",
            ],
            AttributeGroupName::PrinterDefaults => &[
                "media-default",
                "media-source-default",
                "media-type-default",
                "output-bin-default",
                "sides-default",
                "number-up-default",
                "orientation-requested-default",
                "print-quality-default",
                "print-color-mode-default",
                "printer-resolution-default",
                "copies-default",
                "finishings-default",
            ],
            AttributeGroupName::PrinterConfiguration => &[
                "media-supported",
                "media-source-supported",
                "media-type-supported",
                "output-bin-supported",
                "sides-supported",
                "number-up-supported",
                "orientation-requested-supported",
                "print-quality-supported",
                "print-color-mode-supported",
                "printer-resolution-supported",
                "copies-supported",
                "finishings-supported",
                "urf-supported",
            ],
            AttributeGroupName::PrinterStatus => &[
                "printer-state",
                "printer-state-reasons",
                "printer-state-message",
                "printer-is-accepting-jobs",
                "printer-up-time",
                "printer-current-time",
                "queued-job-count",
            ],
            AttributeGroupName::JobDescription => &[
                "job-id",
                "job-uri",
                "job-printer-uri",
                "job-name",
                "job-originating-user-name",
                "job-k-octets",
                "time-at-creation",
                "time-at-processing",
                "time-at-completed",
                "job-printer-up-time",
                "number-of-documents",
                "number-of-intervening-jobs",
            ],
            AttributeGroupName::JobTemplate => &[
                "media",
                "media-col",
                "sides",
                "number-up",
                "orientation-requested",
                "print-quality",
                "print-color-mode",
                "printer-resolution",
                "copies",
                "finishings",
                "job-priority",
                "job-hold-until",
                "job-sheets",
                "multiple-document-handling",
                "page-ranges",
            ],
            AttributeGroupName::JobStatus => &[
                "job-state",
                "job-state-reasons",
                "job-state-message",
                "job-printer-state-message",
                "job-impressions-completed",
            ],
            AttributeGroupName::SubscriptionDescription => &[
                "notify-subscription-id",
                "notify-printer-uri",
                "notify-job-id",
                "notify-subscriber-user-name",
                "notify-sequence-number",
            ],
            AttributeGroupName::SubscriptionTemplate => &[
                "notify-events",
                "notify-pull-method",
                "notify-recipient-uri",
                "notify-time-interval",
                "notify-lease-duration",
                "notify-charset",
                "notify-natural-language",
            ],
            AttributeGroupName::DocumentDescription => &[
                "document-number",
                "document-name",
                "document-format",
                "document-state",
                "document-state-reasons",
                "k-octets",
            ],
            AttributeGroupName::DocumentStatus => &[
                "document-state",
                "document-state-reasons",
                "impressions-completed",
            ],
            AttributeGroupName::DocumentTemplate => &[
                "document-format",
                "document-name",
                "compression",
            ],
        }
    }
}

/// Expand the `requested-attributes` values a client sent into a concrete,
/// de-duplicated list of attribute names to include in the response. An
/// empty `requested` list (the client omitted the attribute entirely) means
/// "the printer's default set", represented by the caller passing
/// `default_group` as the sole requested keyword.
pub fn expand_requested_attributes<'a>(
    requested: impl IntoIterator<Item = &'a str>,
    default_group: AttributeGroupName,
) -> Vec<String> {
    let mut keywords: Vec<&str> = requested.into_iter().collect();
    if keywords.is_empty() {
        keywords.push("__default__");
    }

    let mut names: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for keyword in keywords {
        if keyword == "__default__" {
            for name in default_group.members() {
                if seen.insert(*name) {
                    names.push((*name).to_string());
                }
            }
            continue;
        }
        match AttributeGroupName::parse(keyword) {
            Some(AttributeGroupName::All) => {
                for group in ALL_GROUPS {
                    for name in group.members() {
                        if seen.insert(*name) {
                            names.push((*name).to_string());
                        }
                    }
                }
            }
            Some(group) => {
                for name in group.members() {
                    if seen.insert(*name) {
                        names.push((*name).to_string());
                    }
                }
            }
            None => {
                if seen.insert(keyword) {
                    names.push(keyword.to_string());
                }
            }
        }
    }

    names
}

const ALL_GROUPS: &[AttributeGroupName] = &[
    AttributeGroupName::PrinterDescription,
    AttributeGroupName::PrinterDefaults,
    AttributeGroupName::PrinterConfiguration,
    AttributeGroupName::PrinterStatus,
    AttributeGroupName::JobDescription,
    AttributeGroupName::JobTemplate,
    AttributeGroupName::JobStatus,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_group_keywords() {
        assert_eq!(
            AttributeGroupName::parse("job-template"),
            Some(AttributeGroupName::JobTemplate)
        );
        assert_eq!(AttributeGroupName::parse("printer-name"), None);
    }

    #[test]
    fn expands_all_into_every_group_without_duplicates() {
        let names = expand_requested_attributes(["all"], AttributeGroupName::PrinterDescription);
        assert!(names.contains(&"printer-state".to_string()));
        assert!(names.contains(&"job-id".to_string()));
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn literal_attribute_names_pass_through_unchanged() {
        let names = expand_requested_attributes(
            ["printer-name", "printer-location"],
            AttributeGroupName::PrinterDescription,
        );
        assert_eq!(names, vec!["printer-name", "printer-location"]);
    }

    #[test]
    fn empty_request_falls_back_to_default_group() {
        let names = expand_requested_attributes(
            std::iter::empty(),
            AttributeGroupName::JobStatus,
        );
        assert_eq!(names, AttributeGroupName::JobStatus.members().to_vec());
    }
}
