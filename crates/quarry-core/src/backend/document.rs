use crate::{
    backend::{Backend, GeoQuery, NativeValue},
    query::{Operator, OperatorMap, PathPart, StoragePath},
    schema::IdKind,
};
use serde_json::{Map, Value, json};

const OPERATORS: OperatorMap = OperatorMap::new(&[
    (Operator::Equals, "$eq"),
    (Operator::NotEquals, "$ne"),
    (Operator::In, "$in"),
    (Operator::NotIn, "$nin"),
    (Operator::All, "$all"),
    (Operator::Exists, "$exists"),
    (Operator::GreaterThan, "$gt"),
    (Operator::GreaterThanEqual, "$gte"),
    (Operator::LessThan, "$lt"),
    (Operator::LessThanEqual, "$lte"),
]);

///
/// DocumentBackend
///
/// Emits document-store filters as extended JSON: operator-keyed objects,
/// `$and` / `$or` arrays, `{"$oid": ..}` identifiers.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentBackend;

impl DocumentBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn key(path: &StoragePath) -> String {
        let mut key = String::new();
        for part in path.parts() {
            if !key.is_empty() {
                key.push('.');
            }
            match part {
                PathPart::Field(s) | PathPart::Array(s) | PathPart::Locale(s) | PathPart::Json(s) => {
                    key.push_str(s);
                }
                PathPart::Id => key.push_str("_id"),
            }
        }

        key
    }

    fn on_path(path: &StoragePath, condition: Value) -> Value {
        let mut map = Map::new();
        map.insert(Self::key(path), condition);

        Value::Object(map)
    }

    fn regex(token: &str) -> Value {
        json!({ "$regex": regex::escape(token), "$options": "i" })
    }
}

impl Backend for DocumentBackend {
    type Filter = Value;

    fn name(&self) -> &'static str {
        "document"
    }

    fn operators(&self) -> &OperatorMap {
        &OPERATORS
    }

    fn default_id_kind(&self) -> IdKind {
        IdKind::ObjectId
    }

    fn compare(&self, path: &StoragePath, token: &'static str, value: NativeValue) -> Value {
        let mut condition = Map::new();
        condition.insert(token.to_string(), value.to_document());

        Self::on_path(path, Value::Object(condition))
    }

    fn exists(&self, path: &StoragePath, present: bool) -> Value {
        if present {
            Self::on_path(path, json!({ "$exists": true, "$ne": null }))
        } else {
            json!({ "$or": [
                Self::on_path(path, json!({ "$exists": false })),
                Self::on_path(path, json!({ "$eq": null })),
            ] })
        }
    }

    fn contains_all(&self, path: &StoragePath, tokens: &[String]) -> Value {
        let mut parts: Vec<Value> = tokens
            .iter()
            .map(|token| Self::on_path(path, Self::regex(token)))
            .collect();

        match parts.len() {
            0 => self.empty(),
            1 => parts.remove(0),
            _ => json!({ "$and": parts }),
        }
    }

    fn not_contains(&self, path: &StoragePath, fragment: &str) -> Value {
        Self::on_path(path, json!({ "$not": Self::regex(fragment) }))
    }

    fn geo(&self, path: &StoragePath, query: &GeoQuery) -> Option<Value> {
        let condition = match query {
            GeoQuery::Near {
                point,
                max_distance,
                min_distance,
            } => {
                let mut near = Map::new();
                near.insert("$geometry".to_string(), GeoQuery::point_geometry(*point));
                if let Some(max) = max_distance {
                    near.insert("$maxDistance".to_string(), Value::from(*max));
                }
                if let Some(min) = min_distance {
                    near.insert("$minDistance".to_string(), Value::from(*min));
                }
                json!({ "$near": near })
            }
            GeoQuery::Within(geometry) => json!({ "$geoWithin": { "$geometry": geometry } }),
            GeoQuery::Intersects(geometry) => {
                json!({ "$geoIntersects": { "$geometry": geometry } })
            }
        };

        Some(Self::on_path(path, condition))
    }

    fn and(&self, filters: Vec<Value>) -> Value {
        let mut filters: Vec<Value> = filters.into_iter().filter(|f| !self.is_empty(f)).collect();
        if filters.len() <= 1 {
            return filters.pop().unwrap_or_else(|| self.empty());
        }

        let mut merged = Map::new();
        for filter in filters {
            merge_conjunct(&mut merged, filter);
        }

        Value::Object(merged)
    }

    fn or(&self, filters: Vec<Value>) -> Value {
        let mut filters: Vec<Value> = filters.into_iter().filter(|f| !self.is_empty(f)).collect();
        if filters.len() <= 1 {
            return filters.pop().unwrap_or_else(|| self.empty());
        }

        json!({ "$or": filters })
    }

    fn empty(&self) -> Value {
        Value::Object(Map::new())
    }

    fn never(&self) -> Value {
        json!({ "_id": { "$exists": false } })
    }

    fn is_empty(&self, filter: &Value) -> bool {
        filter.as_object().is_some_and(Map::is_empty)
    }

    fn cache_key(&self, filter: &Value) -> String {
        filter.to_string()
    }
}

fn is_operator_object(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| !map.is_empty() && map.keys().all(|k| k.starts_with('$')))
}

// Fold one conjunct into an accumulated filter object.
//
// `$and` arrays concatenate. Operator objects on the same path merge when
// their operators are disjoint. Anything else that would overwrite an
// existing key (including a second `$or`) is appended to `$and` instead.
fn merge_conjunct(acc: &mut Map<String, Value>, filter: Value) {
    let Value::Object(map) = filter else {
        push_and(acc, filter);
        return;
    };

    for (key, value) in map {
        if key == "$and" {
            if let Value::Array(items) = value {
                for item in items {
                    push_and(acc, item);
                }
            } else {
                push_and(acc, single(key, value));
            }
            continue;
        }

        match acc.get_mut(&key) {
            None => {
                acc.insert(key, value);
            }
            Some(existing) if is_operator_object(existing) && is_operator_object(&value) => {
                let (Some(target), Value::Object(incoming)) = (existing.as_object_mut(), &value)
                else {
                    continue;
                };
                if incoming.keys().any(|k| target.contains_key(k)) {
                    push_and(acc, single(key, value));
                } else {
                    target.extend(incoming.clone());
                }
            }
            Some(existing) if *existing == value => {}
            Some(_) => push_and(acc, single(key, value)),
        }
    }
}

fn push_and(acc: &mut Map<String, Value>, item: Value) {
    let entry = acc
        .entry("$and".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(items) = entry {
        items.push(item);
    }
}

fn single(key: String, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key, value);

    Value::Object(map)
}

///
/// TESTS
///
