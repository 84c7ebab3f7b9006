// SPDX-License-Identifier: PMPL-1.0-or-later
//
// IPP attribute values, typed by value tag (RFC 8010 §3.5.2, §3.9).

use serde::{Deserialize, Serialize};

use crate::tags::ValueTag;

/// A single IPP attribute value. `1setOf` multi-valued attributes are
/// represented at the `Attribute` level as `Vec<AttributeValue>`, not here.
///
/// Derives `Serialize`/`Deserialize` so `pressd-store` can persist a job's
/// ticket (`AttributeMap`) as a JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Integer(i32),
    Boolean(bool),
    Enum(i32),
    OctetString(Vec<u8>),
    /// RFC 3510 `dateTime` octets, kept as the raw 11-byte encoding rather
    /// than parsed into a calendar type — callers that need a `chrono`
    /// value convert at the edge (`pressd-core` does this for job
    /// timestamps).
    DateTime(Vec<u8>),
    Resolution {
        cross_feed: i32,
        feed: i32,
        units: i8,
    },
    Range {
        low: i32,
        high: i32,
    },
    /// `begCollection`/`memberAttrName`/`endCollection` triples flattened
    /// into an ordered list of member name/value pairs.
    Collection(Vec<(String, AttributeValue)>),
    TextWithLanguage {
        language: String,
        text: String,
    },
    NameWithLanguage {
        language: String,
        name: String,
    },
    TextWithoutLanguage(String),
    NameWithoutLanguage(String),
    Keyword(String),
    Uri(String),
    UriScheme(String),
    Charset(String),
    NaturalLanguage(String),
    MimeMediaType(String),
    NoValue,
    Unsupported,
    Unknown,
}

impl AttributeValue {
    pub fn tag(&self) -> ValueTag {
        match self {
            AttributeValue::Integer(_) => ValueTag::Integer,
            AttributeValue::Boolean(_) => ValueTag::Boolean,
            AttributeValue::Enum(_) => ValueTag::Enum,
            AttributeValue::OctetString(_) => ValueTag::OctetString,
            AttributeValue::DateTime(_) => ValueTag::DateTime,
            AttributeValue::Resolution { .. } => ValueTag::Resolution,
            AttributeValue::Range { .. } => ValueTag::RangeOfInteger,
            AttributeValue::Collection(_) => ValueTag::BegCollection,
            AttributeValue::TextWithLanguage { .. } => ValueTag::TextWithLanguage,
            AttributeValue::NameWithLanguage { .. } => ValueTag::NameWithLanguage,
            AttributeValue::TextWithoutLanguage(_) => ValueTag::TextWithoutLanguage,
            AttributeValue::NameWithoutLanguage(_) => ValueTag::NameWithoutLanguage,
            AttributeValue::Keyword(_) => ValueTag::Keyword,
            AttributeValue::Uri(_) => ValueTag::Uri,
            AttributeValue::UriScheme(_) => ValueTag::UriScheme,
            AttributeValue::Charset(_) => ValueTag::Charset,
            AttributeValue::NaturalLanguage(_) => ValueTag::NaturalLanguage,
            AttributeValue::MimeMediaType(_) => ValueTag::MimeMediaType,
            AttributeValue::NoValue => ValueTag::NoValue,
            AttributeValue::Unsupported => ValueTag::Unsupported,
            AttributeValue::Unknown => ValueTag::Unknown,
        }
    }

    /// Best-effort string view, for attributes the caller treats generically
    /// (keyword/uri/text/name all read the same to most callers).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::TextWithoutLanguage(s)
            | AttributeValue::NameWithoutLanguage(s)
            | AttributeValue::Keyword(s)
            | AttributeValue::Uri(s)
            | AttributeValue::UriScheme(s)
            | AttributeValue::Charset(s)
            | AttributeValue::NaturalLanguage(s)
            | AttributeValue::MimeMediaType(s) => Some(s),
            AttributeValue::TextWithLanguage { text, .. } => Some(text),
            AttributeValue::NameWithLanguage { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            AttributeValue::Integer(n) | AttributeValue::Enum(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<(i32, i32)> {
        match self {
            AttributeValue::Range { low, high } => Some((*low, *high)),
            _ => None,
        }
    }

    pub fn as_resolution(&self) -> Option<(i32, i32, i8)> {
        match self {
            AttributeValue::Resolution {
                cross_feed,
                feed,
                units,
            } => Some((*cross_feed, *feed, *units)),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[(String, AttributeValue)]> {
        match self {
            AttributeValue::Collection(members) => Some(members),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Keyword(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Keyword(s)
    }
}

impl From<i32> for AttributeValue {
    fn from(n: i32) -> Self {
        AttributeValue::Integer(n)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_accessors_cover_all_text_like_variants() {
        assert_eq!(
            AttributeValue::Keyword("two-sided-long-edge".into()).as_str(),
            Some("two-sided-long-edge")
        );
        assert_eq!(
            AttributeValue::Uri("ipp://localhost/printers/lp".into()).as_str(),
            Some("ipp://localhost/printers/lp")
        );
        assert_eq!(AttributeValue::Integer(3).as_str(), None);
    }

    #[test]
    fn range_and_resolution_accessors_round_trip() {
        let r = AttributeValue::Range { low: 1, high: 9999 };
        assert_eq!(r.as_range(), Some((1, 9999)));

        let res = AttributeValue::Resolution {
            cross_feed: 600,
            feed: 600,
            units: 3,
        };
        assert_eq!(res.as_resolution(), Some((600, 600, 3)));
    }

    #[test]
    fn tag_matches_variant() {
        assert_eq!(AttributeValue::Boolean(true).tag(), ValueTag::Boolean);
        assert_eq!(
            AttributeValue::Collection(vec![]).tag(),
            ValueTag::BegCollection
        );
    }
}
