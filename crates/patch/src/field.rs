//! Tri-state patch field
//!
//! `Field<T>` separates "not touched" from "cleared" from "set". The three
//! states map one-to-one onto merge patch semantics: omitted key, `null`,
//! and value.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, Serializer};

/// One attribute of a patch struct
///
/// Patch structs mark every `Field` with
/// `#[serde(default, skip_serializing_if = "Field::is_unset")]` (the
/// [`merge_patch!`](crate::merge_patch) macro does this). Serializing an
/// `Unset` field without that attribute fails instead of leaking a `null`
/// that would clear the attribute on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field<T> {
    /// Leave the attribute unchanged; the key is omitted
    Unset,
    /// Clear the attribute; the key is sent as `null`
    Null,
    /// Replace the attribute with this value
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Field<T> {
    /// `true` if the caller never touched this field
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// `true` if the field was explicitly cleared
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `true` if the field will appear in the patch (value or null)
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.is_unset()
    }

    /// Borrow the value, if one was set
    #[must_use]
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unset | Self::Null => None,
        }
    }

    /// Take the value, if one was set
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unset | Self::Null => None,
        }
    }

    /// Borrow as `Field<&T>`
    #[must_use]
    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Self::Unset => Field::Unset,
            Self::Null => Field::Null,
            Self::Value(v) => Field::Value(v),
        }
    }

    /// Map the value, keeping the state
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Self::Unset => Field::Unset,
            Self::Null => Field::Null,
            Self::Value(v) => Field::Value(f(v)),
        }
    }

    /// Set a value
    pub fn set(&mut self, value: impl Into<T>) {
        *self = Self::Value(value.into());
    }

    /// Mark the field for clearing
    pub fn clear(&mut self) {
        *self = Self::Null;
    }

    /// Forget any change to this field
    pub fn unset(&mut self) {
        *self = Self::Unset;
    }

    /// `Some` becomes a value, `None` becomes a clear
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }

    /// `Some` becomes a value, `None` stays unset
    ///
    /// Use this when an absent input should not touch the attribute.
    pub fn from_option_or_unset(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Self::Value)
    }

    /// Apply this change to a local optional value
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Self::Unset => {}
            Self::Null => *target = None,
            Self::Value(v) => *target = Some(v),
        }
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_some(v),
            Self::Null => serializer.serialize_none(),
            Self::Unset => Err(S::Error::custom(
                "unset patch field reached the serializer; mark it \
                 `skip_serializing_if = \"Field::is_unset\"`",
            )),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A missing key never reaches here; `#[serde(default)]` yields `Unset`.
        Ok(Self::from_option(Option::<T>::deserialize(deserializer)?))
    }
}
