//! Typed access into untyped nested maps.
//!
//! Each step yields a [`Lookup`] that says whether the key was absent, explicitly null, or
//! present, so callers decide per level how strict to be instead of downcasting blindly.

use crate::model::{RawMap, RawValue};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Absent,
    Null,
    Present(&'a RawValue),
}

impl<'a> Lookup<'a> {
    pub fn field(map: &'a RawMap, key: &str) -> Self {
        match map.get(key) {
            None => Lookup::Absent,
            Some(RawValue::Null) => Lookup::Null,
            Some(value) => Lookup::Present(value),
        }
    }

    /// Steps one level deeper. Anything that is not a map yields `Absent`.
    pub fn get(self, key: &str) -> Lookup<'a> {
        match self.as_map() {
            Some(map) => Lookup::field(map, key),
            None => Lookup::Absent,
        }
    }

    pub fn value(self) -> Option<&'a RawValue> {
        match self {
            Lookup::Present(value) => Some(value),
            Lookup::Absent | Lookup::Null => None,
        }
    }

    pub fn as_map(self) -> Option<&'a RawMap> {
        self.value().and_then(RawValue::as_map)
    }

    /// What was found, for diagnostics: `missing`, `null`, or the value's kind.
    pub fn found(&self) -> &'static str {
        match self {
            Lookup::Absent => "missing",
            Lookup::Null => "null",
            Lookup::Present(value) => value.kind(),
        }
    }
}
