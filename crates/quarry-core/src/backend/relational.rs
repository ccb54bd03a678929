use crate::{
    backend::{Backend, GeoQuery, NativeValue},
    query::{Operator, OperatorMap, PathPart, StoragePath},
    schema::IdKind,
    store::DocumentId,
};
use std::fmt::Write as _;

const OPERATORS: OperatorMap = OperatorMap::new(&[
    (Operator::Equals, "="),
    (Operator::NotEquals, "<>"),
    (Operator::In, "IN"),
    (Operator::NotIn, "NOT IN"),
    (Operator::All, "@>"),
    (Operator::GreaterThan, ">"),
    (Operator::GreaterThanEqual, ">="),
    (Operator::LessThan, "<"),
    (Operator::LessThanEqual, "<="),
]);

///
/// Column
///
/// Fully qualified column reference. Group members flatten into one
/// underscore-joined column, array rows live in a `<table>_<array>` child
/// table, and localized values live in a `<table>_locales` table keyed by
/// a `_locale` column. Child rows point at their parent through
/// `_parent_id`; `parents` lists the enclosing tables, root first.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Column {
    pub table: String,
    pub parents: Vec<String>,
    pub name: String,
    pub json_path: Vec<String>,
    pub locale: Option<String>,
}

impl Column {
    #[must_use]
    pub fn from_path(path: &StoragePath) -> Self {
        let mut table = path.table().to_string();
        let mut parents = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        let mut json_path = Vec::new();
        let mut locale = None;

        for part in path.parts() {
            match part {
                PathPart::Field(name) => names.push(name),
                PathPart::Array(name) => {
                    names.push(name);
                    let child = format!("{table}_{}", names.join("_"));
                    parents.push(std::mem::replace(&mut table, child));
                    names.clear();
                }
                PathPart::Locale(code) => locale = Some(code.clone()),
                PathPart::Json(segment) => json_path.push(segment.clone()),
                PathPart::Id => names.push("id"),
            }
        }
        if locale.is_some() {
            let child = format!("{table}_locales");
            parents.push(std::mem::replace(&mut table, child));
        }

        Self {
            table,
            parents,
            name: names.join("_"),
            json_path,
            locale,
        }
    }

    fn render(&self) -> String {
        let mut out = format!("{}.{}", quote(&self.table), quote(&self.name));
        let last = self.json_path.len().saturating_sub(1);
        for (i, segment) in self.json_path.iter().enumerate() {
            let arrow = if i == last { "->>" } else { "->" };
            let _ = write!(out, "{arrow}'{}'", segment.replace('\'', "''"));
        }

        out
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

///
/// SqlPredicate
///
/// Composed relational constraint. Rendered to parameterized SQL with
/// `to_sql`; operands never appear inline.
///

#[derive(Clone, Debug, PartialEq)]
pub enum SqlPredicate {
    Compare {
        column: Column,
        op: &'static str,
        value: NativeValue,
    },
    InList {
        column: Column,
        values: Vec<NativeValue>,
        negated: bool,
    },
    IsNull {
        column: Column,
        negated: bool,
    },
    ILike {
        column: Column,
        pattern: String,
        negated: bool,
    },
    Geo {
        column: Column,
        query: GeoQuery,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
    False,
}

impl SqlPredicate {
    /// Render as a SQL boolean expression plus positional parameters.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<NativeValue>) {
        let mut params = Vec::new();
        let sql = self.render(&mut params);

        (sql, params)
    }

    fn render(&self, params: &mut Vec<NativeValue>) -> String {
        match self {
            Self::Compare { column, op, value } => {
                let placeholder = bind(params, value.clone());
                scoped(column, format!("{} {op} {placeholder}", column.render()), params)
            }
            Self::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "TRUE" } else { "FALSE" }.to_string();
                }
                let placeholders: Vec<String> =
                    values.iter().map(|v| bind(params, v.clone())).collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                let sql = format!("{} {keyword} ({})", column.render(), placeholders.join(", "));
                scoped(column, sql, params)
            }
            Self::IsNull { column, negated } => {
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                scoped(column, format!("{} {keyword}", column.render()), params)
            }
            Self::ILike {
                column,
                pattern,
                negated,
            } => {
                let placeholder = bind(params, NativeValue::Text(pattern.clone()));
                let keyword = if *negated { "NOT ILIKE" } else { "ILIKE" };
                let sql = format!("{} {keyword} {placeholder}", column.render());
                scoped(column, sql, params)
            }
            Self::Geo { column, query } => {
                let sql = render_geo(column, query, params);
                scoped(column, sql, params)
            }
            Self::And(children) => join(children, " AND ", "TRUE", params),
            Self::Or(children) => join(children, " OR ", "FALSE", params),
            Self::False => "FALSE".to_string(),
        }
    }
}

fn bind(params: &mut Vec<NativeValue>, value: NativeValue) -> String {
    params.push(value);
    format!("${}", params.len())
}

// Child-table columns are reached through correlated EXISTS sub-selects,
// innermost table last, so the predicate runs against the root table alone.
fn scoped(column: &Column, mut sql: String, params: &mut Vec<NativeValue>) -> String {
    if let Some(code) = &column.locale {
        let placeholder = bind(params, NativeValue::Text(code.clone()));
        let _ = write!(
            sql,
            " AND {}.{} = {placeholder}",
            quote(&column.table),
            quote("_locale")
        );
    }

    let mut child = column.table.as_str();
    for parent in column.parents.iter().rev() {
        let table = quote(child);
        sql = format!(
            "EXISTS (SELECT 1 FROM {table} WHERE {table}.{} = {}.{} AND {sql})",
            quote("_parent_id"),
            quote(parent),
            quote("id"),
        );
        child = parent;
    }

    sql
}

fn join(
    children: &[SqlPredicate],
    separator: &str,
    identity: &str,
    params: &mut Vec<NativeValue>,
) -> String {
    match children {
        [] => identity.to_string(),
        [only] => only.render(params),
        _ => {
            let parts: Vec<String> = children.iter().map(|c| c.render(params)).collect();
            format!("({})", parts.join(separator))
        }
    }
}

fn render_geo(column: &Column, query: &GeoQuery, params: &mut Vec<NativeValue>) -> String {
    let col = column.render();
    match query {
        GeoQuery::Near {
            point,
            max_distance,
            min_distance,
        } => {
            let lng = bind(params, NativeValue::Float(point[0]));
            let lat = bind(params, NativeValue::Float(point[1]));
            let origin = format!("ST_SetSRID(ST_MakePoint({lng}, {lat}), 4326)::geography");
            let mut parts = Vec::new();
            if let Some(max) = max_distance {
                let max = bind(params, NativeValue::Float(*max));
                parts.push(format!("ST_DWithin({col}::geography, {origin}, {max})"));
            }
            if let Some(min) = min_distance {
                let min = bind(params, NativeValue::Float(*min));
                parts.push(format!("NOT ST_DWithin({col}::geography, {origin}, {min})"));
            }
            if parts.is_empty() {
                format!("{col} IS NOT NULL")
            } else {
                parts.join(" AND ")
            }
        }
        GeoQuery::Within(geometry) => {
            let shape = bind(params, NativeValue::Json(geometry.clone()));
            format!("ST_Within({col}, ST_GeomFromGeoJSON({shape}))")
        }
        GeoQuery::Intersects(geometry) => {
            let shape = bind(params, NativeValue::Json(geometry.clone()));
            format!("ST_Intersects({col}, ST_GeomFromGeoJSON({shape}))")
        }
    }
}

// Escape LIKE wildcards so tokens match literally.
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');

    escaped
}

///
/// RelationalBackend
///

#[derive(Clone, Copy, Debug, Default)]
pub struct RelationalBackend;

impl RelationalBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn ilike(path: &StoragePath, fragment: &str, negated: bool) -> SqlPredicate {
        SqlPredicate::ILike {
            column: Column::from_path(path),
            pattern: like_pattern(fragment),
            negated,
        }
    }
}

impl Backend for RelationalBackend {
    type Filter = SqlPredicate;

    fn name(&self) -> &'static str {
        "relational"
    }

    fn operators(&self) -> &OperatorMap {
        &OPERATORS
    }

    fn default_id_kind(&self) -> IdKind {
        IdKind::Number
    }

    fn compare(&self, path: &StoragePath, token: &'static str, value: NativeValue) -> SqlPredicate {
        let column = Column::from_path(path);
        match (token, value) {
            ("IN" | "NOT IN", NativeValue::List(values)) => SqlPredicate::InList {
                column,
                values,
                negated: token == "NOT IN",
            },
            // `= NULL` is never true in SQL
            ("=" | "<>", NativeValue::Null) => SqlPredicate::IsNull {
                column,
                negated: token == "<>",
            },
            (op, value) => SqlPredicate::Compare { column, op, value },
        }
    }

    fn exists(&self, path: &StoragePath, present: bool) -> SqlPredicate {
        SqlPredicate::IsNull {
            column: Column::from_path(path),
            negated: present,
        }
    }

    fn contains_all(&self, path: &StoragePath, tokens: &[String]) -> SqlPredicate {
        self.and(
            tokens
                .iter()
                .map(|token| Self::ilike(path, token, false))
                .collect(),
        )
    }

    fn not_contains(&self, path: &StoragePath, fragment: &str) -> SqlPredicate {
        Self::ilike(path, fragment, true)
    }

    fn geo(&self, path: &StoragePath, query: &GeoQuery) -> Option<SqlPredicate> {
        Some(SqlPredicate::Geo {
            column: Column::from_path(path),
            query: query.clone(),
        })
    }

    fn and(&self, filters: Vec<SqlPredicate>) -> SqlPredicate {
        let mut flat = Vec::new();
        for filter in filters {
            match filter {
                SqlPredicate::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }

        SqlPredicate::And(flat)
    }

    fn or(&self, filters: Vec<SqlPredicate>) -> SqlPredicate {
        let mut flat = Vec::new();
        for filter in filters {
            match filter {
                SqlPredicate::Or(children) => flat.extend(children),
                other if self.is_empty(&other) => {}
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => self.empty(),
            1 => flat.remove(0),
            _ => SqlPredicate::Or(flat),
        }
    }

    fn empty(&self) -> SqlPredicate {
        SqlPredicate::And(Vec::new())
    }

    fn never(&self) -> SqlPredicate {
        SqlPredicate::False
    }

    fn is_empty(&self, filter: &SqlPredicate) -> bool {
        matches!(filter, SqlPredicate::And(children) if children.is_empty())
    }

    fn cache_key(&self, filter: &SqlPredicate) -> String {
        let (sql, params) = filter.to_sql();
        format!("{sql}|{params:?}")
    }

    fn id_candidates(&self, kinds: &[IdKind], candidates: Vec<NativeValue>) -> Vec<NativeValue> {
        candidates
            .into_iter()
            .filter(|value| kinds.iter().any(|kind| is_native_id(*kind, value)))
            .collect()
    }

    // Relational keys are typed columns; only the native form can match.
    fn id_values(&self, id: &DocumentId) -> Vec<NativeValue> {
        match id {
            DocumentId::Number(n) => vec![NativeValue::Int(*n)],
            DocumentId::Text(text) => vec![NativeValue::Text(text.clone())],
            DocumentId::Object(ulid) => vec![NativeValue::Text(ulid.to_string())],
        }
    }
}

// Object ids are stored as text in relational keys.
const fn is_native_id(kind: IdKind, value: &NativeValue) -> bool {
    matches!(
        (kind, value),
        (IdKind::Number, NativeValue::Int(_))
            | (IdKind::Text | IdKind::ObjectId, NativeValue::Text(_))
    )
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn field_path(table: &str, parts: Vec<PathPart>) -> StoragePath {
        parts
            .into_iter()
            .fold(StoragePath::new(table), StoragePath::with)
    }

    fn field(name: &str) -> PathPart {
        PathPart::Field(name.to_string())
    }

    #[test]
    fn groups_flatten_and_arrays_open_child_tables() {
        let grouped = field_path("posts", vec![field("meta"), field("seo"), field("score")]);
        let arrayed = field_path(
            "posts",
            vec![PathPart::Array("items".to_string()), field("label")],
        );

        let grouped = Column::from_path(&grouped);
        assert_eq!(grouped.table, "posts");
        assert_eq!(grouped.name, "meta_seo_score");

        let arrayed = Column::from_path(&arrayed);
        assert_eq!(arrayed.table, "posts_items");
        assert_eq!(arrayed.parents, vec!["posts"]);
        assert_eq!(arrayed.name, "label");
    }

    #[test]
    fn child_table_columns_correlate_to_their_parent() {
        let backend = RelationalBackend;
        let path = field_path(
            "posts",
            vec![PathPart::Array("items".to_string()), field("label")],
        );
        let (sql, params) = backend
            .compare(&path, "=", NativeValue::Text("a".into()))
            .to_sql();

        assert_eq!(
            sql,
            r#"EXISTS (SELECT 1 FROM "posts_items" WHERE "posts_items"."_parent_id" = "posts"."id" AND "posts_items"."label" = $1)"#
        );
        assert_eq!(params, vec![NativeValue::Text("a".into())]);

        let nested = field_path(
            "posts",
            vec![
                PathPart::Array("items".to_string()),
                field("label"),
                PathPart::Locale("de".into()),
            ],
        );
        let (sql, _) = backend.exists(&nested, true).to_sql();
        assert_eq!(
            sql,
            concat!(
                r#"EXISTS (SELECT 1 FROM "posts_items" WHERE "posts_items"."_parent_id" = "posts"."id" AND "#,
                r#"EXISTS (SELECT 1 FROM "posts_items_locales" WHERE "posts_items_locales"."_parent_id" = "posts_items"."id" AND "#,
                r#""posts_items_locales"."label" IS NOT NULL AND "posts_items_locales"."_locale" = $1))"#,
            )
        );
    }

    #[test]
    fn null_equality_renders_is_null() {
        let backend = RelationalBackend;
        let path = field_path("posts", vec![field("views")]);

        let (sql, params) = backend.compare(&path, "=", NativeValue::Null).to_sql();
        assert_eq!(sql, r#""posts"."views" IS NULL"#);
        assert!(params.is_empty());

        let (sql, _) = backend.compare(&path, "<>", NativeValue::Null).to_sql();
        assert_eq!(sql, r#""posts"."views" IS NOT NULL"#);
    }

    #[test]
    fn identifier_candidates_narrow_to_the_key_type() {
        let backend = RelationalBackend;
        let candidates = vec![NativeValue::Text("5".into()), NativeValue::Int(5)];

        assert_eq!(
            backend.id_candidates(&[IdKind::Number], candidates.clone()),
            vec![NativeValue::Int(5)]
        );
        assert_eq!(
            backend.id_candidates(&[IdKind::Text], candidates.clone()),
            vec![NativeValue::Text("5".into())]
        );
        assert_eq!(
            backend.id_candidates(&[IdKind::Number, IdKind::Text], candidates.clone()),
            candidates
        );
    }

    #[test]
    fn localized_columns_bind_the_locale() {
        let backend = RelationalBackend;
        let path = field_path("posts", vec![field("body"), PathPart::Locale("en".into())]);
        let (sql, params) = backend
            .compare(&path, "=", NativeValue::Text("hi".into()))
            .to_sql();

        assert_eq!(
            sql,
            r#"EXISTS (SELECT 1 FROM "posts_locales" WHERE "posts_locales"."_parent_id" = "posts"."id" AND "posts_locales"."body" = $1 AND "posts_locales"."_locale" = $2)"#
        );
        assert_eq!(
            params,
            vec![NativeValue::Text("hi".into()), NativeValue::Text("en".into())]
        );
    }

    #[test]
    fn json_passthrough_uses_arrow_operators() {
        let path = field_path(
            "posts",
            vec![
                field("data"),
                PathPart::Json("a".into()),
                PathPart::Json("b".into()),
            ],
        );

        assert_eq!(Column::from_path(&path).render(), r#""posts"."data"->'a'->>'b'"#);
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let backend = RelationalBackend;
        let path = field_path("posts", vec![field("author")]);

        let (sql, params) = backend
            .compare(&path, "IN", NativeValue::List(vec![]))
            .to_sql();
        assert_eq!(sql, "FALSE");
        assert!(params.is_empty());

        let (sql, _) = backend
            .compare(&path, "NOT IN", NativeValue::List(vec![]))
            .to_sql();
        assert_eq!(sql, "TRUE");
    }

    #[test]
    fn like_tokens_escape_wildcards() {
        let backend = RelationalBackend;
        let path = field_path("posts", vec![field("title")]);
        let (sql, params) = backend
            .contains_all(&path, &["50%".into(), "a_b".into()])
            .to_sql();

        assert_eq!(
            sql,
            r#"("posts"."title" ILIKE $1 AND "posts"."title" ILIKE $2)"#
        );
        assert_eq!(
            params,
            vec![
                NativeValue::Text(r"%50\%%".into()),
                NativeValue::Text(r"%a\_b%".into()),
            ]
        );
    }

    #[test]
    fn or_flattens_and_elides_empty_members() {
        let backend = RelationalBackend;
        let path = field_path("posts", vec![field("views")]);
        let a = backend.compare(&path, ">", NativeValue::Int(1));
        let b = backend.compare(&path, "<", NativeValue::Int(0));

        let nested = backend.or(vec![backend.or(vec![a.clone(), b.clone()]), backend.empty()]);
        assert_eq!(nested, SqlPredicate::Or(vec![a.clone(), b]));
        assert_eq!(backend.or(vec![a.clone()]), a);
        assert!(backend.is_empty(&backend.and(vec![])));
    }
}
