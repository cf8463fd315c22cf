use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::response::AnswerValue;

/// Transient mapping from linkId to the values computed for it during one
/// evaluation cycle. Preserves insertion (definition traversal) order and
/// serializes as a JSON object for the worker protocol.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnswerPad {
    entries: Vec<(String, Vec<AnswerValue>)>,
}

impl AnswerPad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, link_id: impl Into<String>, values: Vec<AnswerValue>) {
        let link_id = link_id.into();
        if let Some(entry) = self.entries.iter_mut().find(|(id, _)| *id == link_id) {
            entry.1 = values;
        } else {
            self.entries.push((link_id, values));
        }
    }

    pub fn get(&self, link_id: &str) -> Option<&[AnswerValue]> {
        self.entries
            .iter()
            .find(|(id, _)| id == link_id)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AnswerValue])> {
        self.entries
            .iter()
            .map(|(id, values)| (id.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AnswerPad {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (link_id, values) in &self.entries {
            map.serialize_entry(link_id, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnswerPad {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PadVisitor;

        impl<'de> Visitor<'de> for PadVisitor {
            type Value = AnswerPad;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of linkId to answer values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pad = AnswerPad::new();
                while let Some((link_id, values)) =
                    access.next_entry::<String, Vec<AnswerValue>>()?
                {
                    pad.insert(link_id, values);
                }
                Ok(pad)
            }
        }

        deserializer.deserialize_map(PadVisitor)
    }
}
