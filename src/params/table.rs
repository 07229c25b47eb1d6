use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::AppError;

/// Dense-id keyed parameter table
///
/// A missing key is a configuration error, never a default. Tables that are
/// sparse by nature are read with [`Table::find`] instead.
#[derive(Debug, Clone)]
pub struct Table<K, V> {
    name: &'static str,
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash + Debug, V: Copy> Table<K, V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Result<V> {
        self.entries.get(key).copied().ok_or_else(|| {
            AppError::MissingParameter {
                table: self.name,
                key: format!("{key:?}"),
            }
            .into()
        })
    }

    pub fn find(&self, key: &K) -> Option<V> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = V> + '_ {
        self.entries.values().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, V)> + '_ {
        self.entries.iter().map(|(key, value)| (key, *value))
    }
}

/// Upper or lower bound that may be unbounded
///
/// In the input files a bound is either a number or the string `"inf"`.
/// Rules skip the row entirely for an unbounded value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound(Option<f64>);

impl Bound {
    pub const INFINITE: Bound = Bound(None);

    pub fn finite(value: f64) -> Self {
        if value.is_finite() {
            Bound(Some(value))
        } else {
            Bound(None)
        }
    }

    /// The bound value, `None` when unbounded
    pub fn value(self) -> Option<f64> {
        self.0
    }

    pub fn is_infinite(self) -> bool {
        self.0.is_none()
    }
}

impl<'de> Deserialize<'de> for Bound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(Bound::finite(value)),
            Raw::Text(text) => match text.trim().to_lowercase().as_str() {
                "inf" | "+inf" | "infinity" => Ok(Bound::INFINITE),
                other => other.parse::<f64>().map(Bound::finite).map_err(|_| {
                    serde::de::Error::custom(format!("expected a number or \"inf\", found {text:?}"))
                }),
            },
        }
    }
}

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str("inf"),
        }
    }
}
