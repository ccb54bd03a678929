//! Module: query::sanitize
//! Responsibility: coerce untrusted operands to the storage type of the
//! resolved field, per operator.
//! Does not own: deciding what an invalid operand means (strictness is the
//! builder's call).

use crate::{
    backend::{GeoQuery, NativeValue},
    query::{Operator, path::FieldDescriptor},
    schema::{FieldType, IdKind},
};
use serde_json::Value;
use thiserror::Error as ThisError;
use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};
use ulid::Ulid;

///
/// Sanitized
///
/// Operand shaped for the constraint the builder will emit.
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Sanitized {
    /// Typed operand for a token-mapped operator.
    Value(NativeValue),
    /// Alternate encodings of one identifier, matched disjunctively.
    Identifiers(Vec<NativeValue>),
    /// Whitespace tokens of a substring search.
    Tokens(Vec<String>),
    /// Whole-value fragment of a negated substring search.
    Fragment(String),
    Exists(bool),
    Geo(GeoQuery),
}

///
/// SanitizeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("operand for '{operator}' cannot be coerced to {field_type}")]
pub(crate) struct SanitizeError {
    operator: &'static str,
    field_type: &'static str,
}

impl SanitizeError {
    const fn new(operator: Operator, field: &FieldDescriptor) -> Self {
        Self {
            operator: operator.as_str(),
            field_type: field.kind.as_str(),
        }
    }
}

pub(crate) fn sanitize(
    field: &FieldDescriptor,
    operator: Operator,
    raw: &Value,
) -> Result<Sanitized, SanitizeError> {
    let invalid = || SanitizeError::new(operator, field);

    match operator {
        Operator::Exists => parse_bool(raw).map(Sanitized::Exists).ok_or_else(invalid),

        Operator::Like | Operator::Contains => {
            let text = scalar_text(raw).ok_or_else(invalid)?;
            Ok(Sanitized::Tokens(
                text.split_whitespace().map(str::to_string).collect(),
            ))
        }

        Operator::NotLike => scalar_text(raw)
            .map(|text| Sanitized::Fragment(text.trim().to_string()))
            .ok_or_else(invalid),

        Operator::Near => parse_near(raw).map(Sanitized::Geo).ok_or_else(invalid),
        Operator::Within => geometry(raw)
            .map(|g| Sanitized::Geo(GeoQuery::Within(g)))
            .ok_or_else(invalid),
        Operator::Intersects => geometry(raw)
            .map(|g| Sanitized::Geo(GeoQuery::Intersects(g)))
            .ok_or_else(invalid),

        Operator::In | Operator::NotIn | Operator::All => {
            let mut values = Vec::new();
            for item in split_list(raw) {
                if field.is_identifier() {
                    for candidate in identifier_candidates(field, &item).ok_or_else(invalid)? {
                        push_unique(&mut values, candidate);
                    }
                } else {
                    push_unique(&mut values, coerce(field, &item).ok_or_else(invalid)?);
                }
            }
            Ok(Sanitized::Value(NativeValue::List(values)))
        }

        Operator::Equals | Operator::NotEquals if field.is_identifier() && !raw.is_null() => {
            identifier_candidates(field, raw)
                .map(Sanitized::Identifiers)
                .ok_or_else(invalid)
        }

        Operator::Equals | Operator::NotEquals if is_null_literal(field, raw) => {
            Ok(Sanitized::Value(NativeValue::Null))
        }

        Operator::Equals
        | Operator::NotEquals
        | Operator::GreaterThan
        | Operator::GreaterThanEqual
        | Operator::LessThan
        | Operator::LessThanEqual => {
            let value = if field.is_identifier() {
                identifier_candidates(field, raw)
                    .and_then(|c| c.into_iter().last())
                    .ok_or_else(invalid)?
            } else {
                coerce(field, raw).ok_or_else(invalid)?
            };
            Ok(Sanitized::Value(value))
        }
    }
}

// `null` (or the string "null") compares against null, except on text
// fields where "null" is an ordinary word.
fn is_null_literal(field: &FieldDescriptor, raw: &Value) -> bool {
    raw.is_null() || (field.kind != FieldType::Text && raw.as_str() == Some("null"))
}

fn push_unique(values: &mut Vec<NativeValue>, value: NativeValue) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn scalar_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_number(raw: &Value) -> Option<NativeValue> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .map(NativeValue::Int)
            .or_else(|| n.as_f64().map(NativeValue::Float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().map(NativeValue::Int).ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(NativeValue::Float)
            })
        }
        _ => None,
    }
}

fn parse_date(raw: &Value) -> Option<NativeValue> {
    let parsed = match raw {
        Value::String(s) => {
            let s = s.trim();
            OffsetDateTime::parse(s, &Rfc3339).ok().or_else(|| {
                Date::parse(s, format_description!("[year]-[month]-[day]"))
                    .ok()
                    .map(|d| d.midnight().assume_utc())
            })?
        }
        Value::Number(n) => {
            let millis = i128::from(n.as_i64()?);
            OffsetDateTime::from_unix_timestamp_nanos(millis * 1_000_000).ok()?
        }
        _ => return None,
    };

    Some(NativeValue::Date(parsed))
}

fn coerce(field: &FieldDescriptor, raw: &Value) -> Option<NativeValue> {
    if raw.is_null() {
        return Some(NativeValue::Null);
    }

    match field.kind {
        FieldType::Number => parse_number(raw),
        FieldType::Date => parse_date(raw),
        FieldType::Checkbox => parse_bool(raw).map(NativeValue::Bool),
        FieldType::Text | FieldType::Select => scalar_text(raw).map(NativeValue::Text),
        FieldType::Id | FieldType::Relationship | FieldType::Upload => {
            identifier_candidates(field, raw).and_then(|c| c.into_iter().last())
        }
        FieldType::Point
        | FieldType::Json
        | FieldType::RichText
        | FieldType::Group
        | FieldType::Array
        | FieldType::Blocks
        | FieldType::Tabs
        | FieldType::Row
        | FieldType::Collapsible => Some(NativeValue::from_json(raw)),
    }
}

/// Every encoding an identifier operand may be stored as: the raw string,
/// the object-id form when the string is one, and the integer form when a
/// target uses numeric ids. The last candidate is the most specific.
fn identifier_candidates(field: &FieldDescriptor, raw: &Value) -> Option<Vec<NativeValue>> {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }

    let mut candidates = vec![NativeValue::Text(text.clone())];
    if field.id_kinds.contains(&IdKind::ObjectId)
        && let Ok(ulid) = Ulid::from_string(&text)
    {
        push_unique(&mut candidates, NativeValue::ObjectId(ulid));
    }
    if field.id_kinds.contains(&IdKind::Number)
        && let Some(number) = parse_number(&Value::String(text))
    {
        push_unique(&mut candidates, number);
    }

    Some(candidates)
}

fn split_list(raw: &Value) -> Vec<Value> {
    match raw {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

// `near` accepts "lng, lat, max?, min?" or the same as an array.
#[expect(clippy::cast_precision_loss)]
fn parse_near(raw: &Value) -> Option<GeoQuery> {
    let parts: Vec<Option<f64>> = split_list(raw)
        .iter()
        .map(|v| match parse_number(v)? {
            NativeValue::Int(i) => Some(i as f64),
            NativeValue::Float(f) => Some(f),
            _ => None,
        })
        .collect();

    let lng = (*parts.first()?)?;
    let lat = (*parts.get(1)?)?;
    let max_distance = parts.get(2).copied().flatten();
    let min_distance = parts.get(3).copied().flatten();

    Some(GeoQuery::Near {
        point: [lng, lat],
        max_distance,
        min_distance,
    })
}

fn geometry(raw: &Value) -> Option<Value> {
    raw.as_object()
        .filter(|map| map.contains_key("type"))
        .map(|_| raw.clone())
}

///
/// TESTS
///
