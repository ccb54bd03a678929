use crate::{
    backend::DocumentBackend,
    error::StorageError,
    store::{DocumentId, FindOptions, Storage},
};
use async_trait::async_trait;
use regex::RegexBuilder;
use serde_json::Value;
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering},
    },
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

///
/// MemoryStore
///
/// In-process document store that evaluates document-store filters over
/// JSON documents. Documents keep insertion order; `_id` holds the
/// identifier (`{"$oid": ..}`, integer or string).
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Value>>>,
    find_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection with its documents.
    #[must_use]
    pub fn with_collection(
        self,
        collection: impl Into<String>,
        documents: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.into())
            .or_default()
            .extend(documents);
        self
    }

    pub fn insert(&self, collection: &str, document: Value) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Number of `find` calls served, including failed ones.
    #[must_use]
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(AtomicOrdering::SeqCst)
    }

    /// Make every subsequent `find` fail as unavailable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Every document of `collection` matching `filter`, without a window.
    pub fn matching(&self, collection: &str, filter: &Value) -> Result<Vec<Value>, StorageError> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let documents = collections
            .get(collection)
            .ok_or_else(|| StorageError::UnknownCollection(collection.to_string()))?;

        let mut out = Vec::new();
        for document in documents {
            if matches(document, filter)? {
                out.push(document.clone());
            }
        }

        Ok(out)
    }
}

#[async_trait]
impl Storage<DocumentBackend> for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Value,
        options: FindOptions,
    ) -> Result<Vec<DocumentId>, StorageError> {
        self.find_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(StorageError::Unavailable {
                collection: collection.to_string(),
            });
        }

        let ids = self
            .matching(collection, filter)?
            .iter()
            .filter_map(|document| document.get("_id").and_then(DocumentId::from_value))
            .take(options.limit)
            .collect();

        Ok(ids)
    }
}

///
/// Filter evaluation
///

fn unsupported(what: &str) -> StorageError {
    StorageError::Backend(format!("unsupported filter construct '{what}'"))
}

fn matches(document: &Value, filter: &Value) -> Result<bool, StorageError> {
    let Value::Object(clauses) = filter else {
        return Err(unsupported("non-object filter"));
    };

    for (key, condition) in clauses {
        let holds = match key.as_str() {
            "$and" => {
                let mut all = true;
                for sub in branches(condition)? {
                    if !matches(document, sub)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for sub in branches(condition)? {
                    if matches(document, sub)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => return Err(unsupported(op)),
            path => field_matches(&lookup(document, path), condition)?,
        };
        if !holds {
            return Ok(false);
        }
    }

    Ok(true)
}

fn branches(condition: &Value) -> Result<&Vec<Value>, StorageError> {
    condition
        .as_array()
        .ok_or_else(|| unsupported("non-array logical operand"))
}

// Values reached by a dotted path; arrays fan out over their elements.
fn lookup<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![document];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => match segment.parse::<usize>() {
                    Ok(index) => next.extend(items.get(index)),
                    Err(_) => next.extend(items.iter().filter_map(|item| item.get(segment))),
                },
                _ => {}
            }
        }
        current = next;
    }

    current
}

// Terminal arrays match through their elements as well as as a whole.
fn expand<'a>(values: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.push(*value);
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
    }

    out
}

fn is_operator_object(value: &Value) -> bool {
    value.as_object().is_some_and(|map| {
        !map.is_empty()
            && map.keys().all(|k| k.starts_with('$'))
            && !map.contains_key("$oid")
            && !map.contains_key("$date")
    })
}

fn field_matches(values: &[&Value], condition: &Value) -> Result<bool, StorageError> {
    let Some(operators) = condition.as_object().filter(|_| is_operator_object(condition)) else {
        return Ok(eq_any(values, condition));
    };

    for (op, operand) in operators {
        let holds = match op.as_str() {
            "$eq" => eq_any(values, operand),
            "$ne" => !eq_any(values, operand),
            "$in" => list(operand)?.iter().any(|item| eq_any(values, item)),
            "$nin" => !list(operand)?.iter().any(|item| eq_any(values, item)),
            "$all" => list(operand)?.iter().all(|item| eq_any(values, item)),
            "$gt" => ordered(values, operand, Ordering::is_gt),
            "$gte" => ordered(values, operand, Ordering::is_ge),
            "$lt" => ordered(values, operand, Ordering::is_lt),
            "$lte" => ordered(values, operand, Ordering::is_le),
            "$exists" => operand.as_bool().unwrap_or(true) != values.is_empty(),
            "$regex" => {
                let options = operators
                    .get("$options")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                regex_any(values, operand, options)?
            }
            "$options" => true,
            "$not" => !field_matches(values, operand)?,
            other => return Err(unsupported(other)),
        };
        if !holds {
            return Ok(false);
        }
    }

    Ok(true)
}

fn list(operand: &Value) -> Result<&Vec<Value>, StorageError> {
    operand
        .as_array()
        .ok_or_else(|| unsupported("non-array list operand"))
}

fn eq_any(values: &[&Value], target: &Value) -> bool {
    if target.is_null() {
        return values.is_empty() || expand(values).iter().any(|v| v.is_null());
    }

    expand(values).iter().any(|v| values_equal(v, target))
}

fn ordered(values: &[&Value], operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    expand(values)
        .iter()
        .any(|v| compare(v, operand).is_some_and(accept))
}

fn regex_any(values: &[&Value], pattern: &Value, options: &str) -> Result<bool, StorageError> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| unsupported("non-string $regex"))?;
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .build()
        .map_err(|err| StorageError::Backend(err.to_string()))?;

    Ok(expand(values)
        .iter()
        .filter_map(|v| v.as_str())
        .any(|s| regex.is_match(s)))
}

fn date(value: &Value) -> Option<OffsetDateTime> {
    let text = value.get("$date")?.as_str()?;
    OffsetDateTime::parse(text, &Rfc3339).ok()
}

fn values_equal(left: &Value, right: &Value) -> bool {
    compare(left, right).map_or_else(|| left == right, Ordering::is_eq)
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Object(_), Value::Object(_)) => Some(date(left)?.cmp(&date(right)?)),
        _ => None,
    }
}

///
/// TESTS
///
