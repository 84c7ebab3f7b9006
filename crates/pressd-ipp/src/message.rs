// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Full IPP message codec: a single round-trip `Message::decode` /
// `Message::encode` pair covering every value tag (resolution,
// rangeOfInteger, collection, dateTime) rather than just
// integer/boolean/text/name/keyword/uri.

use thiserror::Error;
use tracing::warn;

use crate::attribute::{Attribute, AttributeGroup};
use crate::tags::{GroupTag, ValueTag};
use crate::value::AttributeValue;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("IPP message too short: {0} bytes (minimum 8)")]
    TooShort(usize),
    #[error("truncated {0} field at offset {1}")]
    Truncated(&'static str, usize),
    #[error("attribute value of tag {0:#04x} has unexpected length {1}")]
    BadValueLength(u8, usize),
    #[error("attribute outside any group at offset {0}")]
    AttributeOutsideGroup(usize),
}

/// A fully parsed (or to-be-encoded) IPP message: the common envelope shared
/// by requests and responses (RFC 8010 §3.1/§3.2).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub version_major: u8,
    pub version_minor: u8,
    /// `operation-id` on a request, `status-code` on a response — both are a
    /// plain `u16` on the wire, so one field serves both directions.
    pub code: u16,
    pub request_id: u32,
    pub groups: Vec<AttributeGroup>,
    /// Trailing document bytes after `end-of-attributes-tag`.
    pub data: Vec<u8>,
}

impl Message {
    pub fn new(code: u16, request_id: u32) -> Self {
        Message {
            version_major: 2,
            version_minor: 0,
            code,
            request_id,
            groups: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn group(&self, tag: GroupTag) -> Option<&AttributeGroup> {
        self.groups.iter().find(|g| g.tag == tag)
    }

    pub fn group_mut(&mut self, tag: GroupTag) -> &mut AttributeGroup {
        if let Some(idx) = self.groups.iter().position(|g| g.tag == tag) {
            return &mut self.groups[idx];
        }
        self.groups.push(AttributeGroup::new(tag));
        self.groups.last_mut().expect("just pushed")
    }

    pub fn operation_attributes(&self) -> Option<&AttributeGroup> {
        self.group(GroupTag::OperationAttributes)
    }

    pub fn job_attributes(&self) -> Option<&AttributeGroup> {
        self.group(GroupTag::JobAttributes)
    }

    /// Decode a complete IPP message body (RFC 8010 §3.1).
    ///
    /// ```text
    /// version-number:        2 bytes (major, minor)
    /// operation-id|status:   2 bytes (big-endian u16)
    /// request-id:            4 bytes (big-endian u32)
    /// attribute-groups:      variable
    ///   delimiter-tag:       1 byte
    ///   attributes:          variable
    ///     value-tag:         1 byte
    ///     name-length:       2 bytes (big-endian u16, 0 for additional
    ///                        values of a 1setOf)
    ///     name:              name-length bytes
    ///     value-length:      2 bytes (big-endian u16)
    ///     value:             value-length bytes
    /// end-of-attributes-tag: 1 byte (0x03)
    /// data:                  remainder
    /// ```
    pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
        if bytes.len() < 8 {
            return Err(CodecError::TooShort(bytes.len()));
        }

        let version_major = bytes[0];
        let version_minor = bytes[1];
        let code = u16::from_be_bytes([bytes[2], bytes[3]]);
        let request_id = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        let mut pos = 8;
        let mut groups: Vec<AttributeGroup> = Vec::new();
        let mut current: Option<AttributeGroup> = None;
        // Stack of (member-name, members-so-far) for nested collections.
        let mut collection_stack: Vec<(String, Vec<(String, AttributeValue)>)> = Vec::new();
        let mut pending_member_name: Option<String> = None;
        // Name of the attribute most recently started, so that a following
        // zero-length-name value is recognised as another element of the
        // same 1setOf rather than a stray value.
        let mut last_attr_name: Option<String> = None;

        while pos < bytes.len() {
            let tag = bytes[pos];

            if GroupTag::is_delimiter(tag) {
                if let Some(group) = current.take() {
                    groups.push(group);
                }
                last_attr_name = None;

                if tag == GroupTag::EndOfAttributes.byte() {
                    pos += 1;
                    break;
                }

                current = Some(AttributeGroup::new(GroupTag::from_byte(tag)));
                pos += 1;
                continue;
            }

            let value_tag = ValueTag::from_byte(tag);
            pos += 1;

            if pos + 2 > bytes.len() {
                return Err(CodecError::Truncated("name-length", pos));
            }
            let name_length = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
            pos += 2;

            if pos + name_length > bytes.len() {
                return Err(CodecError::Truncated("name", pos));
            }
            let raw_name = String::from_utf8_lossy(&bytes[pos..pos + name_length]).to_string();
            pos += name_length;

            if pos + 2 > bytes.len() {
                return Err(CodecError::Truncated("value-length", pos));
            }
            let value_length = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
            pos += 2;

            if pos + value_length > bytes.len() {
                return Err(CodecError::Truncated("value", pos));
            }
            let raw_value = &bytes[pos..pos + value_length];
            pos += value_length;

            let name = if name_length == 0 {
                last_attr_name.clone().unwrap_or_default()
            } else {
                raw_name.clone()
            };

            match value_tag {
                ValueTag::BegCollection => {
                    collection_stack.push((name.clone(), Vec::new()));
                    last_attr_name = Some(name);
                    continue;
                }
                ValueTag::EndCollection => {
                    let (member_name, members) = collection_stack
                        .pop()
                        .unwrap_or_else(|| (String::new(), Vec::new()));
                    let value = AttributeValue::Collection(members);
                    push_value(
                        &mut current,
                        &mut collection_stack,
                        &mut pending_member_name,
                        pos,
                        member_name,
                        value,
                    )?;
                    continue;
                }
                ValueTag::MemberAttrName => {
                    pending_member_name = Some(String::from_utf8_lossy(raw_value).to_string());
                    continue;
                }
                _ => {}
            }

            let value = decode_value(value_tag, raw_value, pos)?;
            let effective_name = if name_length == 0 && !collection_stack.is_empty() {
                pending_member_name.take().unwrap_or_default()
            } else {
                name.clone()
            };
            last_attr_name = Some(name);

            push_value(
                &mut current,
                &mut collection_stack,
                &mut pending_member_name,
                pos,
                effective_name,
                value,
            )?;
        }

        if let Some(group) = current.take() {
            groups.push(group);
        }

        let data = if pos < bytes.len() {
            bytes[pos..].to_vec()
        } else {
            Vec::new()
        };

        Ok(Message {
            version_major,
            version_minor,
            code,
            request_id,
            groups,
            data,
        })
    }

    /// Encode this message back to wire bytes (RFC 8010 §3.1).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256 + self.data.len());
        buf.push(self.version_major);
        buf.push(self.version_minor);
        buf.extend_from_slice(&self.code.to_be_bytes());
        buf.extend_from_slice(&self.request_id.to_be_bytes());

        for group in &self.groups {
            buf.push(group.tag.byte());
            for attr in &group.attributes {
                encode_attribute(&mut buf, attr);
            }
        }

        buf.push(GroupTag::EndOfAttributes.byte());
        buf.extend_from_slice(&self.data);
        buf
    }
}

/// Append a decoded value to the currently open group, or to the innermost
/// open collection if one is on the stack.
fn push_value(
    current: &mut Option<AttributeGroup>,
    collection_stack: &mut [(String, Vec<(String, AttributeValue)>)],
    _pending_member_name: &mut Option<String>,
    pos: usize,
    name: String,
    value: AttributeValue,
) -> Result<(), CodecError> {
    if let Some((_, members)) = collection_stack.last_mut() {
        members.push((name, value));
        return Ok(());
    }

    match current {
        Some(group) => {
            if let Some(last) = group.attributes.last_mut() {
                if last.name == name {
                    last.values.push(value);
                    return Ok(());
                }
            }
            group.push(Attribute::new(name, value));
            Ok(())
        }
        None => {
            warn!(offset = pos, "IPP attribute outside of any group, discarded");
            Err(CodecError::AttributeOutsideGroup(pos))
        }
    }
}

fn decode_value(tag: ValueTag, raw: &[u8], pos: usize) -> Result<AttributeValue, CodecError> {
    Ok(match tag {
        ValueTag::Integer => AttributeValue::Integer(read_i32(raw, tag, pos)?),
        ValueTag::Enum => AttributeValue::Enum(read_i32(raw, tag, pos)?),
        ValueTag::Boolean => {
            if raw.len() != 1 {
                return Err(CodecError::BadValueLength(tag.byte(), raw.len()));
            }
            AttributeValue::Boolean(raw[0] != 0)
        }
        ValueTag::OctetString => AttributeValue::OctetString(raw.to_vec()),
        ValueTag::DateTime => AttributeValue::DateTime(raw.to_vec()),
        ValueTag::Resolution => {
            if raw.len() != 9 {
                return Err(CodecError::BadValueLength(tag.byte(), raw.len()));
            }
            AttributeValue::Resolution {
                cross_feed: i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]),
                feed: i32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
                units: raw[8] as i8,
            }
        }
        ValueTag::RangeOfInteger => {
            if raw.len() != 8 {
                return Err(CodecError::BadValueLength(tag.byte(), raw.len()));
            }
            AttributeValue::Range {
                low: i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]),
                high: i32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
            }
        }
        ValueTag::TextWithLanguage | ValueTag::NameWithLanguage => {
            // 2-byte language length, language bytes, 2-byte text length, text bytes.
            if raw.len() < 2 {
                return Err(CodecError::BadValueLength(tag.byte(), raw.len()));
            }
            let lang_len = u16::from_be_bytes([raw[0], raw[1]]) as usize;
            let mut off = 2 + lang_len;
            if off + 2 > raw.len() {
                return Err(CodecError::BadValueLength(tag.byte(), raw.len()));
            }
            let language = String::from_utf8_lossy(&raw[2..off]).to_string();
            let text_len = u16::from_be_bytes([raw[off], raw[off + 1]]) as usize;
            off += 2;
            if off + text_len > raw.len() {
                return Err(CodecError::BadValueLength(tag.byte(), raw.len()));
            }
            let text = String::from_utf8_lossy(&raw[off..off + text_len]).to_string();
            if tag == ValueTag::TextWithLanguage {
                AttributeValue::TextWithLanguage { language, text }
            } else {
                AttributeValue::NameWithLanguage {
                    language,
                    name: text,
                }
            }
        }
        ValueTag::TextWithoutLanguage => {
            AttributeValue::TextWithoutLanguage(String::from_utf8_lossy(raw).to_string())
        }
        ValueTag::NameWithoutLanguage => {
            AttributeValue::NameWithoutLanguage(String::from_utf8_lossy(raw).to_string())
        }
        ValueTag::Keyword => AttributeValue::Keyword(String::from_utf8_lossy(raw).to_string()),
        ValueTag::Uri => AttributeValue::Uri(String::from_utf8_lossy(raw).to_string()),
        ValueTag::UriScheme => {
            AttributeValue::UriScheme(String::from_utf8_lossy(raw).to_string())
        }
        ValueTag::Charset => AttributeValue::Charset(String::from_utf8_lossy(raw).to_string()),
        ValueTag::NaturalLanguage => {
            AttributeValue::NaturalLanguage(String::from_utf8_lossy(raw).to_string())
        }
        ValueTag::MimeMediaType => {
            AttributeValue::MimeMediaType(String::from_utf8_lossy(raw).to_string())
        }
        ValueTag::NoValue => AttributeValue::NoValue,
        ValueTag::Unsupported => AttributeValue::Unsupported,
        ValueTag::Unknown | ValueTag::Other(_) => AttributeValue::Unknown,
        ValueTag::BegCollection | ValueTag::EndCollection | ValueTag::MemberAttrName => {
            unreachable!("handled by the caller before decode_value")
        }
    })
}

fn read_i32(raw: &[u8], tag: ValueTag, pos: usize) -> Result<i32, CodecError> {
    if raw.len() != 4 {
        return Err(CodecError::BadValueLength(tag.byte(), pos.min(raw.len())));
    }
    Ok(i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn encode_attribute(buf: &mut Vec<u8>, attr: &Attribute) {
    for (i, value) in attr.values.iter().enumerate() {
        let name: &str = if i == 0 { &attr.name } else { "" };
        encode_value(buf, name, value);
    }
}

fn encode_value(buf: &mut Vec<u8>, name: &str, value: &AttributeValue) {
    match value {
        AttributeValue::Collection(members) => {
            buf.push(ValueTag::BegCollection.byte());
            write_name_value(buf, name, &[]);
            for (member_name, member_value) in members {
                buf.push(ValueTag::MemberAttrName.byte());
                write_name_value(buf, "", member_name.as_bytes());
                encode_value(buf, "", member_value);
            }
            buf.push(ValueTag::EndCollection.byte());
            write_name_value(buf, "", &[]);
        }
        other => {
            buf.push(other.tag().byte());
            let bytes = encode_value_bytes(other);
            write_name_value(buf, name, &bytes);
        }
    }
}

fn write_name_value(buf: &mut Vec<u8>, name: &str, value: &[u8]) {
    buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
    buf.extend_from_slice(value);
}

fn encode_value_bytes(value: &AttributeValue) -> Vec<u8> {
    match value {
        AttributeValue::Integer(n) | AttributeValue::Enum(n) => n.to_be_bytes().to_vec(),
        AttributeValue::Boolean(b) => vec![if *b { 1 } else { 0 }],
        AttributeValue::OctetString(bytes) | AttributeValue::DateTime(bytes) => bytes.clone(),
        AttributeValue::Resolution {
            cross_feed,
            feed,
            units,
        } => {
            let mut v = Vec::with_capacity(9);
            v.extend_from_slice(&cross_feed.to_be_bytes());
            v.extend_from_slice(&feed.to_be_bytes());
            v.push(*units as u8);
            v
        }
        AttributeValue::Range { low, high } => {
            let mut v = Vec::with_capacity(8);
            v.extend_from_slice(&low.to_be_bytes());
            v.extend_from_slice(&high.to_be_bytes());
            v
        }
        AttributeValue::TextWithLanguage { language, text } => {
            encode_with_language(language, text)
        }
        AttributeValue::NameWithLanguage { language, name } => {
            encode_with_language(language, name)
        }
        AttributeValue::TextWithoutLanguage(s)
        | AttributeValue::NameWithoutLanguage(s)
        | AttributeValue::Keyword(s)
        | AttributeValue::Uri(s)
        | AttributeValue::UriScheme(s)
        | AttributeValue::Charset(s)
        | AttributeValue::NaturalLanguage(s)
        | AttributeValue::MimeMediaType(s) => s.as_bytes().to_vec(),
        AttributeValue::NoValue | AttributeValue::Unsupported | AttributeValue::Unknown => {
            Vec::new()
        }
        AttributeValue::Collection(_) => {
            unreachable!("collections are encoded by encode_value directly")
        }
    }
}

fn encode_with_language(language: &str, text: &str) -> Vec<u8> {
    let mut v = Vec::with_capacity(4 + language.len() + text.len());
    v.extend_from_slice(&(language.len() as u16).to_be_bytes());
    v.extend_from_slice(language.as_bytes());
    v.extend_from_slice(&(text.len() as u16).to_be_bytes());
    v.extend_from_slice(text.as_bytes());
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> Message {
        let mut msg = Message::new(0x0002, 42); // Print-Job
        let op = msg.group_mut(GroupTag::OperationAttributes);
        op.push(Attribute::new(
            "attributes-charset",
            AttributeValue::Charset("utf-8".into()),
        ));
        op.push(Attribute::new(
            "attributes-natural-language",
            AttributeValue::NaturalLanguage("en".into()),
        ));
        op.push(Attribute::new(
            "printer-uri",
            AttributeValue::Uri("ipp://localhost/printers/lp".into()),
        ));
        op.push(Attribute::with_values(
            "finishings",
            vec![AttributeValue::Enum(3), AttributeValue::Enum(4)],
        ));
        msg.data = b"%PDF-1.4 fake body".to_vec();
        msg
    }

    #[test]
    fn round_trip_preserves_scalars_and_multivalues() {
        let original = sample_request();
        let bytes = original.encode();
        let decoded = Message::decode(&bytes).expect("decode");

        assert_eq!(decoded.code, 0x0002);
        assert_eq!(decoded.request_id, 42);
        let op = decoded.operation_attributes().expect("operation group");
        assert_eq!(op.get_string("printer-uri"), Some("ipp://localhost/printers/lp"));
        let finishings = op.get("finishings").expect("finishings");
        assert_eq!(finishings.values.len(), 2);
        assert_eq!(decoded.data, original.data);
    }

    #[test]
    fn round_trip_preserves_collection_values() {
        let mut msg = Message::new(0x0002, 7);
        let op = msg.group_mut(GroupTag::OperationAttributes);
        op.push(Attribute::new(
            "media-col",
            AttributeValue::Collection(vec![
                ("media-size-name".into(), AttributeValue::Keyword("iso_a4_210x297mm".into())),
                ("media-type".into(), AttributeValue::Keyword("stationery".into())),
            ]),
        ));

        let bytes = msg.encode();
        let decoded = Message::decode(&bytes).expect("decode");
        let media_col = decoded
            .operation_attributes()
            .unwrap()
            .get("media-col")
            .unwrap();
        let members = media_col.first().unwrap().as_collection().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].0, "media-size-name");
    }

    #[test]
    fn decode_rejects_truncated_message() {
        assert_eq!(Message::decode(&[0x01, 0x01, 0x00]), Err(CodecError::TooShort(3)));
    }

    #[test]
    fn decode_rejects_attribute_outside_group() {
        // version + op-id + request-id, then a bare integer attribute with no
        // preceding delimiter tag.
        let mut bytes = vec![0x02, 0x00, 0x00, 0x0b, 0x00, 0x00, 0x00, 0x01];
        bytes.push(ValueTag::Integer.byte());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&4u16.to_be_bytes());
        bytes.extend_from_slice(&1i32.to_be_bytes());

        assert!(matches!(
            Message::decode(&bytes),
            Err(CodecError::AttributeOutsideGroup(_))
        ));
    }
}
