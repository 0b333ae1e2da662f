//! URL query decode path.
//!
//! `axum::extract::Query` goes through `serde_urlencoded`, which has no way to
//! express an explicit null: `?due_date=null` either fails to parse or decodes
//! the literal text. This module feeds the query pairs through a small serde
//! deserializer instead, so filter structs reuse the exact `Deserialize` impls
//! of the JSON path:
//!
//! - the literal value `null` reaches `deserialize_option` as `None`, which
//!   [`OptionalField`](super::OptionalField) turns into `Null`;
//! - numbers and booleans are parsed from their text form;
//! - everything else (strings, UUIDs, dates) is handed over as a string;
//! - unknown keys are ignored by the derived struct visitor.

use std::borrow::Cow;
use std::fmt::Display;

use serde::de::{
    self, value::StringDeserializer, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess,
    Visitor,
};
use serde::forward_to_deserialize_any;
use thiserror::Error;
use url::form_urlencoded;

/// Failure to decode a URL query into a typed struct.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct QueryError {
    /// The query key whose value could not be decoded, when known.
    pub key: Option<String>,
    message: String,
}

impl QueryError {
    fn at(mut self, key: &str) -> Self {
        if self.key.is_none() {
            self.key = Some(key.to_string());
        }
        self
    }
}

impl de::Error for QueryError {
    fn custom<T: Display>(msg: T) -> Self {
        Self {
            key: None,
            message: msg.to_string(),
        }
    }
}

/// Decode a raw query string (without the leading `?`) into `T`.
pub fn from_query_str<T>(query: &str) -> Result<T, QueryError>
where
    T: DeserializeOwned,
{
    T::deserialize(QueryDeserializer {
        pairs: form_urlencoded::parse(query.as_bytes()),
    })
}

struct QueryDeserializer<'a> {
    pairs: form_urlencoded::Parse<'a>,
}

impl<'de, 'a> de::Deserializer<'de> for QueryDeserializer<'a> {
    type Error = QueryError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_map(QueryMap {
            pairs: self.pairs,
            pending: None,
        })
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

struct QueryMap<'a> {
    pairs: form_urlencoded::Parse<'a>,
    pending: Option<(Cow<'a, str>, Cow<'a, str>)>,
}

impl<'de, 'a> MapAccess<'de> for QueryMap<'a> {
    type Error = QueryError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        let Some((key, value)) = self.pairs.next() else {
            return Ok(None);
        };
        let decoded = seed.deserialize(QueryText(key.clone()))?;
        self.pending = Some((key, value));
        Ok(Some(decoded))
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| <QueryError as de::Error>::custom("query value requested before its key"))?;
        seed.deserialize(QueryText(value)).map_err(|e| e.at(&key))
    }
}

/// A single decoded key or value.
struct QueryText<'a>(Cow<'a, str>);

macro_rules! parse_text {
    ($($method:ident => $visit:ident,)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
            where
                V: Visitor<'de>,
            {
                let parsed = self.0.parse().map_err(|_| {
                    <QueryError as de::Error>::custom(format_args!("cannot parse '{}'", self.0))
                })?;
                visitor.$visit(parsed)
            }
        )*
    };
}

impl<'de, 'a> de::Deserializer<'de> for QueryText<'a> {
    type Error = QueryError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Cow::Borrowed(text) => visitor.visit_str(text),
            Cow::Owned(text) => visitor.visit_string(text),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        if self.0 == "null" {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let variant: StringDeserializer<QueryError> = self.0.into_owned().into_deserializer();
        visitor.visit_enum(variant)
    }

    parse_text! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
    }

    forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::OptionalField;
    use chrono::NaiveDate;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Filter {
        #[serde(default)]
        priority: OptionalField<i32>,
        #[serde(default)]
        completed: OptionalField<bool>,
        #[serde(default)]
        due_date: OptionalField<NaiveDate>,
        #[serde(default)]
        owner: OptionalField<uuid::Uuid>,
        #[serde(default)]
        offset: i64,
        #[serde(default)]
        limit: i64,
    }

    #[test]
    fn test_empty_query_is_all_absent() {
        let filter: Filter = from_query_str("").unwrap();
        assert_eq!(filter.priority, OptionalField::Absent);
        assert_eq!(filter.completed, OptionalField::Absent);
        assert_eq!(filter.due_date, OptionalField::Absent);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.limit, 0);
    }

    #[test]
    fn test_typed_values_are_parsed() {
        let id = uuid::Uuid::new_v4();
        let query = format!("priority=3&completed=true&due_date=2024-05-01&owner={id}&limit=20");
        let filter: Filter = from_query_str(&query).unwrap();
        assert_eq!(filter.priority, OptionalField::Value(3));
        assert_eq!(filter.completed, OptionalField::Value(true));
        assert_eq!(
            filter.due_date,
            OptionalField::Value(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        );
        assert_eq!(filter.owner, OptionalField::Value(id));
        assert_eq!(filter.limit, 20);
    }

    #[test]
    fn test_literal_null_decodes_as_null() {
        let filter: Filter = from_query_str("due_date=null&priority=null").unwrap();
        assert_eq!(filter.due_date, OptionalField::Null);
        assert_eq!(filter.priority, OptionalField::Null);
    }

    #[test]
    fn test_same_semantics_as_json() {
        let from_query: Filter = from_query_str("due_date=null&priority=2").unwrap();
        let from_json: Filter =
            serde_json::from_str(r#"{"due_date": null, "priority": 2}"#).unwrap();
        assert_eq!(from_query.due_date, from_json.due_date);
        assert_eq!(from_query.priority, from_json.priority);
        assert_eq!(from_query.completed, from_json.completed);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let filter: Filter = from_query_str("sort=asc&priority=1").unwrap();
        assert_eq!(filter.priority, OptionalField::Value(1));
    }

    #[test]
    fn test_percent_encoding_is_decoded() {
        #[derive(Deserialize)]
        struct Search {
            #[serde(default)]
            q: OptionalField<String>,
        }
        let search: Search = from_query_str("q=buy%20milk+now").unwrap();
        assert_eq!(search.q, OptionalField::Value("buy milk now".to_string()));
    }

    #[test]
    fn test_invalid_value_reports_key() {
        let err = from_query_str::<Filter>("priority=high").unwrap_err();
        assert_eq!(err.key.as_deref(), Some("priority"));

        let err = from_query_str::<Filter>("limit=ten").unwrap_err();
        assert_eq!(err.key.as_deref(), Some("limit"));

        let err = from_query_str::<Filter>("due_date=yesterday").unwrap_err();
        assert_eq!(err.key.as_deref(), Some("due_date"));
    }
}
