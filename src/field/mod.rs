//! Tri-state wrapper for partial updates and filter queries.
//!
//! `Option<T>` collapses "key absent" and "key is null" into one state. A PATCH
//! body needs both: an absent key leaves the column alone, an explicit `null`
//! clears it. `OptionalField` keeps the three cases apart and is decoded the
//! same way from JSON bodies and from URL queries (see [`query`]).

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod query;

/// A field that may be absent, explicitly null, or carry a value.
///
/// Declare struct fields with `#[serde(default)]` so a missing key decodes as
/// [`OptionalField::Absent`]. An explicit `null` always decodes as
/// [`OptionalField::Null`], whatever `T` is; rejecting a null on a
/// non-nullable column is the job of validation, not of the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionalField<T> {
    /// The key was not present in the input.
    Absent,
    /// The key was present with an explicit `null`.
    Null,
    /// The key was present with a value.
    Value(T),
}

impl<T> Default for OptionalField<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> OptionalField<T> {
    /// True when the key was present in the input, null or not.
    pub fn is_defined(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The wrapped value, if the key carried one.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent | Self::Null => None,
        }
    }

    /// Merge step for non-nullable columns: a present value wins, otherwise
    /// `fallback` (the stored value) is kept.
    ///
    /// `Null` keeps the fallback as well. Patches reach the merge only after
    /// validation has rejected nulls on non-nullable fields.
    pub fn value_or(self, fallback: T) -> T {
        match self {
            Self::Value(value) => value,
            Self::Absent | Self::Null => fallback,
        }
    }

    /// Merge step for nullable columns: `Null` clears, a value sets, an absent
    /// key keeps `fallback`.
    pub fn nullable_or(self, fallback: Option<T>) -> Option<T> {
        match self {
            Self::Absent => fallback,
            Self::Null => None,
            Self::Value(value) => Some(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OptionalField<U> {
        match self {
            Self::Absent => OptionalField::Absent,
            Self::Null => OptionalField::Null,
            Self::Value(value) => OptionalField::Value(f(value)),
        }
    }
}

impl<'de, T> Deserialize<'de> for OptionalField<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only reached when the key is present; absence is handled by
        // `#[serde(default)]` on the containing struct field.
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Self::Value(value),
            None => Self::Null,
        })
    }
}

impl<T> Serialize for OptionalField<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Value(value) => serializer.serialize_some(value),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default)]
        subject: OptionalField<String>,
        #[serde(default)]
        description: OptionalField<String>,
        #[serde(default)]
        priority: OptionalField<i32>,
    }

    #[test]
    fn test_absent_key_is_not_defined() {
        let patch: Patch = serde_json::from_value(json!({"description": "x"})).unwrap();
        assert!(!patch.subject.is_defined());
        assert!(patch.description.is_defined());
        assert_eq!(patch.description.value().map(String::as_str), Some("x"));
    }

    #[test]
    fn test_explicit_null_is_defined_null() {
        let patch: Patch = serde_json::from_value(json!({"description": null})).unwrap();
        assert!(patch.description.is_defined());
        assert!(patch.description.is_null());
        assert_eq!(patch.description.value(), None);
    }

    #[test]
    fn test_null_on_non_nullable_type_still_decodes() {
        // Decoding must not fail here; validation reports it per field.
        let patch: Patch = serde_json::from_value(json!({"priority": null})).unwrap();
        assert_eq!(patch.priority, OptionalField::Null);
    }

    #[test]
    fn test_wrong_type_fails_decode() {
        let result = serde_json::from_value::<Patch>(json!({"priority": "high"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_object_leaves_everything_absent() {
        let patch: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.subject, OptionalField::Absent);
        assert_eq!(patch.description, OptionalField::Absent);
        assert_eq!(patch.priority, OptionalField::Absent);
    }

    #[test]
    fn test_value_or() {
        assert_eq!(OptionalField::Value(3).value_or(7), 3);
        assert_eq!(OptionalField::Absent.value_or(7), 7);
        assert_eq!(OptionalField::<i32>::Null.value_or(7), 7);
    }

    #[test]
    fn test_nullable_or() {
        let stored = Some("old".to_string());
        assert_eq!(OptionalField::Absent.nullable_or(stored.clone()), stored);
        assert_eq!(OptionalField::<String>::Null.nullable_or(stored.clone()), None);
        assert_eq!(
            OptionalField::Value("new".to_string()).nullable_or(stored),
            Some("new".to_string())
        );
    }

    #[test]
    fn test_zero_value_is_still_defined() {
        let patch: Patch = serde_json::from_value(json!({"priority": 0, "subject": ""})).unwrap();
        assert_eq!(patch.priority, OptionalField::Value(0));
        assert_eq!(patch.subject, OptionalField::Value(String::new()));
    }

    #[test]
    fn test_serialize_absent_and_null_as_null() {
        let value = json!({
            "a": OptionalField::<i32>::Absent,
            "b": OptionalField::<i32>::Null,
            "c": OptionalField::Value(5),
        });
        assert_eq!(value, json!({"a": null, "b": null, "c": 5}));
    }

    #[test]
    fn test_map_preserves_state() {
        assert_eq!(OptionalField::Value(2).map(|v| v * 10), OptionalField::Value(20));
        assert_eq!(OptionalField::<i32>::Null.map(|v| v * 10), OptionalField::Null);
        assert_eq!(OptionalField::<i32>::Absent.map(|v| v * 10), OptionalField::Absent);
    }
}
