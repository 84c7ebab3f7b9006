// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Ordered key -> value option map: job tickets and printer defaults are
// stored as an ordered key->value mapping with typed accessors rather
// than a loosely-typed JSON blob, so the validator and the response
// emitter read the same representation.

use serde::{Deserialize, Serialize};

use crate::value::AttributeValue;

/// An ordered, small multimap from attribute name to its value(s) —
/// `Job.options`, `Printer.defaults`, and similar ticket-shaped data use
/// this instead of a raw `AttributeGroup` so they can be constructed,
/// serialized, and compared without carrying a delimiter tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeMap {
    entries: Vec<(String, Vec<AttributeValue>)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        AttributeMap::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.set_values(name, vec![value]);
    }

    pub fn set_values(&mut self, name: impl Into<String>, values: Vec<AttributeValue>) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = values;
        } else {
            self.entries.push((name, values));
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.first())
    }

    pub fn get_values(&self, name: &str) -> Option<&[AttributeValue]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    pub fn get_integer(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(AttributeValue::as_integer)
    }

    pub fn get_boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttributeValue::as_boolean)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        self.entries.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AttributeValue])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_existing_key_in_place() {
        let mut map = AttributeMap::new();
        map.set("copies", AttributeValue::Integer(1));
        map.set("copies", AttributeValue::Integer(3));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_integer("copies"), Some(3));
    }

    #[test]
    fn preserves_insertion_order() {
        let mut map = AttributeMap::new();
        map.set("sides", AttributeValue::Keyword("two-sided-long-edge".into()));
        map.set("copies", AttributeValue::Integer(2));
        let names: Vec<&str> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["sides", "copies"]);
    }

    #[test]
    fn remove_reports_whether_key_was_present() {
        let mut map = AttributeMap::new();
        map.set("copies", AttributeValue::Integer(1));
        assert!(map.remove("copies"));
        assert!(!map.remove("copies"));
    }
}
