// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Attribute and attribute-group containers, with full `1setOf`
// multi-value support across every IPP value tag.

use serde::{Deserialize, Serialize};

use crate::tags::GroupTag;
use crate::value::AttributeValue;

/// A named IPP attribute carrying one or more values (`1setOf`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: AttributeValue) -> Self {
        Attribute {
            name: name.into(),
            values: vec![value],
        }
    }

    pub fn with_values(name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Attribute {
            name: name.into(),
            values,
        }
    }

    pub fn first(&self) -> Option<&AttributeValue> {
        self.values.first()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.first().and_then(AttributeValue::as_str)
    }

    pub fn as_integer(&self) -> Option<i32> {
        self.first().and_then(AttributeValue::as_integer)
    }

    pub fn as_boolean(&self) -> Option<bool> {
        self.first().and_then(AttributeValue::as_boolean)
    }

    pub fn strings(&self) -> Vec<&str> {
        self.values.iter().filter_map(AttributeValue::as_str).collect()
    }
}

/// A delimiter-bounded group of attributes (operation, job, printer, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeGroup {
    pub tag: GroupTag,
    pub attributes: Vec<Attribute>,
}

impl AttributeGroup {
    pub fn new(tag: GroupTag) -> Self {
        AttributeGroup {
            tag,
            attributes: Vec::new(),
        }
    }

    pub fn push(&mut self, attr: Attribute) {
        self.attributes.push(attr);
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Attribute::as_str)
    }

    pub fn get_integer(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(Attribute::as_integer)
    }

    pub fn get_boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Attribute::as_boolean)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }
}
