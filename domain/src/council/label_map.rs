//! Insertion-ordered label → model mapping attached to stage-2 results.

use crate::core::model::ModelId;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Mapping from anonymized peer labels ("Response A") to model identifiers.
///
/// Iteration order is the order in which the server listed the labels;
/// label resolution replaces labels in exactly this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    entries: Vec<(String, ModelId)>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a label. Re-inserting an existing label replaces its model
    /// but keeps its original position.
    pub fn insert(&mut self, label: impl Into<String>, model: ModelId) {
        let label = label.into();
        if let Some(entry) = self.entries.iter_mut().find(|(l, _)| *l == label) {
            entry.1 = model;
        } else {
            self.entries.push((label, model));
        }
    }

    pub fn get(&self, label: &str) -> Option<&ModelId> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, model)| model)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelId)> {
        self.entries.iter().map(|(l, m)| (l.as_str(), m))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: Into<String>> FromIterator<(L, ModelId)> for LabelMap {
    fn from_iter<T: IntoIterator<Item = (L, ModelId)>>(iter: T) -> Self {
        let mut map = LabelMap::new();
        for (label, model) in iter {
            map.insert(label, model);
        }
        map
    }
}

impl Serialize for LabelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, model) in &self.entries {
            map.serialize_entry(label, model)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LabelMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LabelMapVisitor;

        impl<'de> Visitor<'de> for LabelMapVisitor {
            type Value = LabelMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of peer labels to model identifiers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LabelMap, A::Error> {
                let mut map = LabelMap::new();
                while let Some((label, model)) = access.next_entry::<String, ModelId>()? {
                    map.insert(label, model);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(LabelMapVisitor)
    }
}
