// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal in-memory PPD shape: option name -> choice
// list, `UIConstraints` as `(option, choice, option, choice)` tuples, and
// the closed PPD<->PWG mapping table. A real PPD file parser is a named
// external collaborator; this module defines the shape that collaborator
// must produce and a `from_ppd_text` stub covering the PPD syntax subset
// test fixtures use.

use std::collections::HashMap;

/// One `*OpenUI`-declared option: its PPD keyword, the list of legal PPD
/// choices, and the default choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpdOption {
    pub keyword: String,
    pub choices: Vec<String>,
    pub default: Option<String>,
}

/// A `*UIConstraints` rule: two `(option, choice)` pairs that may not both
/// be active at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiConstraint {
    pub option_a: String,
    pub choice_a: String,
    pub option_b: String,
    pub choice_b: String,
}

/// The in-memory shape a PPD parser must produce.
#[derive(Debug, Clone, Default)]
pub struct Ppd {
    pub options: HashMap<String, PpdOption>,
    pub constraints: Vec<UiConstraint>,
}

impl Ppd {
    pub fn new() -> Self {
        Ppd::default()
    }

    pub fn option(&self, keyword: &str) -> Option<&PpdOption> {
        self.options.get(keyword)
    }

    pub fn add_option(&mut self, option: PpdOption) {
        self.options.insert(option.keyword.clone(), option);
    }

    pub fn add_constraint(&mut self, constraint: UiConstraint) {
        self.constraints.push(constraint);
    }

    /// Whether `(option, choice)` together with `(other_option,
    /// other_choice)` violates a declared `UIConstraints` rule.
    pub fn violates_constraint(
        &self,
        option_a: &str,
        choice_a: &str,
        option_b: &str,
        choice_b: &str,
    ) -> bool {
        self.constraints.iter().any(|c| {
            (c.option_a == option_a && c.choice_a == choice_a
                && c.option_b == option_b && c.choice_b == choice_b)
                || (c.option_a == option_b && c.choice_a == choice_b
                    && c.option_b == option_a && c.choice_b == choice_a)
        })
    }

    /// Parse a PPD syntax subset: `*OpenUI`/`*CloseUI` option blocks,
    /// `*UIConstraints`, and `*Default*` lines. Not a general PPD parser —
    /// the full Adobe PPD grammar is the named external collaborator;
    /// this covers what the test fixtures exercise.
    pub fn from_ppd_text(text: &str) -> Ppd {
        let mut ppd = Ppd::new();
        let mut current: Option<(String, Vec<String>)> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("*%") {
                continue;
            }

            if let Some(rest) = line.strip_prefix("*OpenUI ") {
                // `*OpenUI *PageSize/Media Size: PickOne`
                let keyword = rest
                    .split(['/', ':'])
                    .next()
                    .unwrap_or("")
                    .trim_start_matches('*')
                    .trim()
                    .to_string();
                current = Some((keyword, Vec::new()));
                continue;
            }

            if line.starts_with("*CloseUI") {
                if let Some((keyword, choices)) = current.take() {
                    ppd.add_option(PpdOption {
                        default: None,
                        keyword,
                        choices,
                    });
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("*Default") {
                // `*DefaultPageSize: Letter`
                if let Some((keyword, value)) = rest.split_once(':') {
                    let keyword = keyword.trim().to_string();
                    let value = value.trim().trim_matches('"').to_string();
                    if let Some(opt) = ppd.options.get_mut(&keyword) {
                        opt.default = Some(value);
                    } else {
                        ppd.add_option(PpdOption {
                            keyword,
                            choices: Vec::new(),
                            default: Some(value),
                        });
                    }
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("*UIConstraints:") {
                // `*UIConstraints: *Duplex DuplexNoTumble *MediaType Transparency`
                let tokens: Vec<&str> = rest.split_whitespace().collect();
                if tokens.len() >= 4 {
                    ppd.add_constraint(UiConstraint {
                        option_a: tokens[0].trim_start_matches('*').to_string(),
                        choice_a: tokens[1].to_string(),
                        option_b: tokens[2].trim_start_matches('*').to_string(),
                        choice_b: tokens[3].to_string(),
                    });
                }
                continue;
            }

            // Option choice lines inside an open `*OpenUI` block:
            // `*PageSize Letter/US Letter: "..."`
            if let Some((keyword, choices)) = current.as_mut() {
                if let Some(rest) = line.strip_prefix(&format!("*{keyword} ")) {
                    let choice = rest.split(['/', ':']).next().unwrap_or("").trim().to_string();
                    if !choice.is_empty() {
                        choices.push(choice);
                    }
                }
            }
        }

        ppd
    }
}

/// The closed PPD-keyword <-> IPP/PWG job-attribute name mapping table
/// from 
pub const PPD_TO_PWG_ATTRIBUTE: &[(&str, &str)] = &[
    ("PageSize", "media"),
    ("InputSlot", "media-source"),
    ("MediaType", "media-type"),
    ("OutputBin", "output-bin"),
    ("Duplex", "sides"),
    ("Resolution", "printer-resolution"),
    ("ColorModel", "print-color-mode"),
    ("ColorMode", "print-color-mode"),
];

pub fn ipp_attribute_for_ppd_keyword(ppd_keyword: &str) -> Option<&'static str> {
    PPD_TO_PWG_ATTRIBUTE
        .iter()
        .find(|(ppd, _)| *ppd == ppd_keyword)
        .map(|(_, ipp)| *ipp)
}

pub fn ppd_keyword_for_ipp_attribute(ipp_attribute: &str) -> Option<&'static str> {
    PPD_TO_PWG_ATTRIBUTE
        .iter()
        .find(|(_, ipp)| *ipp == ipp_attribute)
        .map(|(ppd, _)| *ppd)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PPD: &str = r#"
*OpenUI *PageSize/Media Size: PickOne
*PageSize Letter/US Letter: "statement"
*PageSize A4/ISO A4: "statement"
*CloseUI: *PageSize
*DefaultPageSize: Letter
*OpenUI *Duplex/Duplex: PickOne
*Duplex None/Off: "statement"
*Duplex DuplexNoTumble/Long Edge: "statement"
*CloseUI: *Duplex
*UIConstraints: *Duplex DuplexNoTumble *MediaType Transparency
"#;

    #[test]
    fn parses_options_and_defaults() {
        let ppd = Ppd::from_ppd_text(SAMPLE_PPD);
        let page_size = ppd.option("PageSize").expect("PageSize option");
        assert_eq!(page_size.choices, vec!["Letter".to_string(), "A4".to_string()]);
        assert_eq!(page_size.default.as_deref(), Some("Letter"));
    }

    #[test]
    fn parses_constraints() {
        let ppd = Ppd::from_ppd_text(SAMPLE_PPD);
        assert_eq!(ppd.constraints.len(), 1);
        assert!(ppd.violates_constraint("Duplex", "DuplexNoTumble", "MediaType", "Transparency"));
        assert!(ppd.violates_constraint("MediaType", "Transparency", "Duplex", "DuplexNoTumble"));
        assert!(!ppd.violates_constraint("Duplex", "None", "MediaType", "Transparency"));
    }

    #[test]
    fn mapping_table_is_closed_and_bidirectional() {
        assert_eq!(ipp_attribute_for_ppd_keyword("PageSize"), Some("media"));
        assert_eq!(ppd_keyword_for_ipp_attribute("sides"), Some("Duplex"));
        assert_eq!(ipp_attribute_for_ppd_keyword("Unknown"), None);
    }
}
