use serde_json::{Map, Number, Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use ulid::Ulid;

///
/// NativeValue
///
/// Operand after coercion to the storage type of the field it is compared
/// against. Backends decide how each variant is encoded.
///

#[derive(Clone, Debug, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(OffsetDateTime),
    ObjectId(Ulid),
    List(Vec<Self>),
    /// Opaque structured operand (JSON sub-documents, GeoJSON).
    Json(Value),
}

impl NativeValue {
    /// Extended-JSON encoding used by document-store filters.
    #[must_use]
    pub fn to_document(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(v) => Value::Bool(*v),
            Self::Int(v) => Value::from(*v),
            Self::Float(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Self::Text(v) => Value::String(v.clone()),
            Self::Date(v) => json!({ "$date": format_date(*v) }),
            Self::ObjectId(v) => json!({ "$oid": v.to_string() }),
            Self::List(items) => Value::Array(items.iter().map(Self::to_document).collect()),
            Self::Json(v) => v.clone(),
        }
    }

    /// Plain JSON form, without extended-JSON wrappers.
    #[must_use]
    pub fn to_plain(&self) -> Value {
        match self {
            Self::Date(v) => Value::String(format_date(*v)),
            Self::ObjectId(v) => Value::String(v.to_string()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_plain).collect()),
            other => other.to_document(),
        }
    }

    /// Map a raw JSON primitive onto the closest native variant.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Bool(*v),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            Value::String(v) => Self::Text(v.clone()),
            Value::Array(_) | Value::Object(_) => Self::Json(value.clone()),
        }
    }
}

fn format_date(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

///
/// GeoQuery
///
/// Structured geospatial operand. Coordinates are `[longitude, latitude]`,
/// distances are meters.
///

#[derive(Clone, Debug, PartialEq)]
pub enum GeoQuery {
    Near {
        point: [f64; 2],
        max_distance: Option<f64>,
        min_distance: Option<f64>,
    },
    /// GeoJSON geometry the field must lie within.
    Within(Value),
    /// GeoJSON geometry the field must intersect.
    Intersects(Value),
}

impl GeoQuery {
    /// GeoJSON point for the `near` origin.
    #[must_use]
    pub fn point_geometry(point: [f64; 2]) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::from("Point"));
        map.insert(
            "coordinates".to_string(),
            Value::Array(point.iter().map(|c| Value::from(*c)).collect()),
        );

        Value::Object(map)
    }
}
