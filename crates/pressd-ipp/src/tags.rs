// SPDX-License-Identifier: PMPL-1.0-or-later
//
// IPP delimiter and value tags (RFC 8010 §3.5).

use serde::{Deserialize, Serialize};

/// Delimiter tag marking the start of an attribute group, or end-of-message.
///
/// Delimiter tags occupy the range `0x00..=0x0F`; everything above that is a
/// value tag belonging to whatever group is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupTag {
    OperationAttributes,
    JobAttributes,
    EndOfAttributes,
    PrinterAttributes,
    UnsupportedAttributes,
    SubscriptionAttributes,
    EventNotificationAttributes,
    /// A delimiter byte this codec doesn't assign meaning to, preserved
    /// verbatim so decode/encode round-trips even for IPP extensions.
    Other(u8),
}

impl GroupTag {
    pub const fn byte(self) -> u8 {
        match self {
            GroupTag::OperationAttributes => 0x01,
            GroupTag::JobAttributes => 0x02,
            GroupTag::EndOfAttributes => 0x03,
            GroupTag::PrinterAttributes => 0x04,
            GroupTag::UnsupportedAttributes => 0x05,
            GroupTag::SubscriptionAttributes => 0x06,
            GroupTag::EventNotificationAttributes => 0x07,
            GroupTag::Other(b) => b,
        }
    }

    pub const fn from_byte(b: u8) -> Self {
        match b {
            0x01 => GroupTag::OperationAttributes,
            0x02 => GroupTag::JobAttributes,
            0x03 => GroupTag::EndOfAttributes,
            0x04 => GroupTag::PrinterAttributes,
            0x05 => GroupTag::UnsupportedAttributes,
            0x06 => GroupTag::SubscriptionAttributes,
            0x07 => GroupTag::EventNotificationAttributes,
            other => GroupTag::Other(other),
        }
    }

    /// Whether `b` is a delimiter byte (as opposed to a value-tag byte).
    pub const fn is_delimiter(b: u8) -> bool {
        b <= 0x0F
    }
}

/// Value tag describing the wire type of a single attribute value
/// (RFC 8010 §3.5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Unsupported,
    Unknown,
    NoValue,
    Integer,
    Boolean,
    Enum,
    OctetString,
    DateTime,
    Resolution,
    RangeOfInteger,
    BegCollection,
    TextWithLanguage,
    NameWithLanguage,
    EndCollection,
    TextWithoutLanguage,
    NameWithoutLanguage,
    Keyword,
    Uri,
    UriScheme,
    Charset,
    NaturalLanguage,
    MimeMediaType,
    MemberAttrName,
    Other(u8),
}

impl ValueTag {
    pub const fn byte(self) -> u8 {
        match self {
            ValueTag::Unsupported => 0x10,
            ValueTag::Unknown => 0x12,
            ValueTag::NoValue => 0x13,
            ValueTag::Integer => 0x21,
            ValueTag::Boolean => 0x22,
            ValueTag::Enum => 0x23,
            ValueTag::OctetString => 0x30,
            ValueTag::DateTime => 0x31,
            ValueTag::Resolution => 0x32,
            ValueTag::RangeOfInteger => 0x33,
            ValueTag::BegCollection => 0x34,
            ValueTag::TextWithLanguage => 0x35,
            ValueTag::NameWithLanguage => 0x36,
            ValueTag::EndCollection => 0x37,
            ValueTag::TextWithoutLanguage => 0x41,
            ValueTag::NameWithoutLanguage => 0x42,
            ValueTag::Keyword => 0x44,
            ValueTag::Uri => 0x45,
            ValueTag::UriScheme => 0x46,
            ValueTag::Charset => 0x47,
            ValueTag::NaturalLanguage => 0x48,
            ValueTag::MimeMediaType => 0x49,
            ValueTag::MemberAttrName => 0x4a,
            ValueTag::Other(b) => b,
        }
    }

    pub const fn from_byte(b: u8) -> Self {
        match b {
            0x10 => ValueTag::Unsupported,
            0x12 => ValueTag::Unknown,
            0x13 => ValueTag::NoValue,
            0x21 => ValueTag::Integer,
            0x22 => ValueTag::Boolean,
            0x23 => ValueTag::Enum,
            0x30 => ValueTag::OctetString,
            0x31 => ValueTag::DateTime,
            0x32 => ValueTag::Resolution,
            0x33 => ValueTag::RangeOfInteger,
            0x34 => ValueTag::BegCollection,
            0x35 => ValueTag::TextWithLanguage,
            0x36 => ValueTag::NameWithLanguage,
            0x37 => ValueTag::EndCollection,
            0x41 => ValueTag::TextWithoutLanguage,
            0x42 => ValueTag::NameWithoutLanguage,
            0x44 => ValueTag::Keyword,
            0x45 => ValueTag::Uri,
            0x46 => ValueTag::UriScheme,
            0x47 => ValueTag::Charset,
            0x48 => ValueTag::NaturalLanguage,
            0x49 => ValueTag::MimeMediaType,
            0x4a => ValueTag::MemberAttrName,
            other => ValueTag::Other(other),
        }
    }
}
