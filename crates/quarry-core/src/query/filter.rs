use crate::query::Operator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

///
/// Where
///
/// Client-authored filter tree. Keys are either `and` / `or` (an ordered
/// list of nested filters) or a dotted field path mapping operator names to
/// operands. Sibling keys combine conjunctively.
///
/// The tree is kept as raw JSON: it arrives from untrusted clients and is
/// only interpreted against a schema during translation.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Where(Map<String, Value>);

impl Where {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a JSON object; anything else is not a filter.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Single `{ path: { operator: value } }` constraint.
    pub fn field(path: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::new().with(path, operator, value)
    }

    pub fn and(children: impl IntoIterator<Item = Self>) -> Self {
        Self::combinator("and", children)
    }

    pub fn or(children: impl IntoIterator<Item = Self>) -> Self {
        Self::combinator("or", children)
    }

    fn combinator(key: &str, children: impl IntoIterator<Item = Self>) -> Self {
        let list = children.into_iter().map(Self::into_value).collect();
        let mut map = Map::new();
        map.insert(key.to_string(), Value::Array(list));

        Self(map)
    }

    /// Add one operator to a path, keeping operators already present.
    #[must_use]
    pub fn with(
        mut self,
        path: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        let entry = self
            .0
            .entry(path.into())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(operators) = entry {
            operators.insert(operator.as_str().to_string(), value.into());
        }

        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Where {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
