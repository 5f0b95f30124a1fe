//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and association updates from a model descriptor.

use crate::config::{EagerLoad, ModelDescriptor};
use crate::store::Attributes;
use serde_json::Value;

const MAIN_ALIAS: &str = "main";

/// Quote identifier for PostgreSQL (safe: only from the registry).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(s) => format!("{}.{}", quoted(s), quoted(table)),
        None => quoted(table),
    }
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Cast target for a column, or None when the type is unknown or not castable by name.
fn cast_type(model: &ModelDescriptor, column: &str) -> Option<String> {
    let t = model.column(column)?.pg_type.as_str();
    match t {
        "" | "user-defined" | "array" => None,
        other => Some(other.to_string()),
    }
}

fn placeholder(model: &ModelDescriptor, column: &str, n: usize) -> String {
    cast_type(model, column)
        .map(|t| format!("${}::{}", n, t))
        .unwrap_or_else(|| format!("${}", n))
}

/// SELECT list: columns as-is except numeric and enum columns, which come back as text.
fn select_column_list(model: &ModelDescriptor, alias: Option<&str>) -> String {
    if model.columns.is_empty() {
        return alias.map(|a| format!("{}.*", a)).unwrap_or_else(|| "*".into());
    }
    model
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            let qualified = alias.map(|a| format!("{}.{}", a, q)).unwrap_or_else(|| q.clone());
            match c.pg_type.as_str() {
                "numeric" | "user-defined" => format!("{}::text AS {}", qualified, q),
                _ if alias.is_some() => format!("{} AS {}", qualified, q),
                _ => qualified,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(model: &ModelDescriptor, q: &mut QueryBuf, filters: &[(String, Value)], alias: Option<&str>) -> String {
    let mut parts = Vec::new();
    for (col, val) in filters {
        if !model.has_column(col) {
            continue;
        }
        let n = q.push_param(val.clone());
        let lhs = alias
            .map(|a| format!("{}.{}", a, quoted(col)))
            .unwrap_or_else(|| quoted(col));
        parts.push(format!("{} = {}", lhs, placeholder(model, col, n)));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT with eager loads in a single query: main table aliased as "main", each has-many as a
/// scalar subquery aggregating the child ids into a JSON array.
pub fn select_with_includes(model: &ModelDescriptor, filters: &[(String, Value)], includes: &[EagerLoad]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(model.schema.as_deref(), &model.table);
    let pk = quoted(&model.primary_key);

    let mut select_parts = vec![select_column_list(model, Some(MAIN_ALIAS))];
    for inc in includes {
        let child_table = qualified_table(inc.schema.as_deref(), &inc.table);
        let projected = inc.attributes.first().map(|a| quoted(a)).unwrap_or_else(|| quoted("id"));
        select_parts.push(format!(
            "(SELECT COALESCE(json_agg(sub.{p} ORDER BY sub.{p}), '[]'::json) FROM (SELECT {p} FROM {t} WHERE {fk} = {m}.{pk}) sub) AS {name}",
            p = projected,
            t = child_table,
            fk = quoted(&inc.foreign_key),
            m = MAIN_ALIAS,
            pk = pk,
            name = quoted(&inc.name),
        ));
    }

    let where_sql = where_clause(model, &mut q, filters, Some(MAIN_ALIAS));
    q.sql = format!(
        "SELECT {} FROM {} {}{} ORDER BY {}.{}",
        select_parts.join(", "),
        table,
        MAIN_ALIAS,
        where_sql,
        MAIN_ALIAS,
        pk
    );
    q
}

/// INSERT: only attributes that are model columns; omitted columns fall back to DB defaults.
pub fn insert(model: &ModelDescriptor, attributes: &Attributes) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(model.schema.as_deref(), &model.table);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (name, val) in attributes {
        if !model.has_column(name) {
            continue;
        }
        let n = q.push_param(val.clone());
        cols.push(quoted(name));
        placeholders.push(placeholder(model, name, n));
    }
    let returning = select_column_list(model, None);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only attributes that are model columns, never the primary key.
/// With nothing to set this degrades to a SELECT of the row.
pub fn update(model: &ModelDescriptor, id: &Value, attributes: &Attributes) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(model.schema.as_deref(), &model.table);
    let pk = &model.primary_key;
    let mut sets = Vec::new();
    for (k, v) in attributes {
        if k == pk || !model.has_column(k) {
            continue;
        }
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(k), placeholder(model, k, n)));
    }
    let returning = select_column_list(model, None);
    let id_param = q.push_param(id.clone());
    let id_ph = placeholder(model, pk, id_param);
    q.sql = if sets.is_empty() {
        format!("SELECT {} FROM {} WHERE {} = {}", returning, table, quoted(pk), id_ph)
    } else {
        format!(
            "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
            table,
            sets.join(", "),
            quoted(pk),
            id_ph,
            returning
        )
    };
    q
}

/// DELETE by id.
pub fn delete(model: &ModelDescriptor, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(model.schema.as_deref(), &model.table);
    let n = q.push_param(id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        table,
        quoted(&model.primary_key),
        placeholder(model, &model.primary_key, n)
    );
    q
}

/// Detach children of `parent_id` that are not in `keep`.
pub fn detach_children(target: &ModelDescriptor, foreign_key: &str, parent_id: &Value, keep: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(target.schema.as_deref(), &target.table);
    let n = q.push_param(parent_id.clone());
    let mut sql = format!(
        "UPDATE {} SET {} = NULL WHERE {} = {}",
        table,
        quoted(foreign_key),
        quoted(foreign_key),
        placeholder(target, foreign_key, n)
    );
    if !keep.is_empty() {
        let pk = &target.primary_key;
        let list: Vec<String> = keep
            .iter()
            .map(|v| {
                let n = q.push_param(v.clone());
                placeholder(target, pk, n)
            })
            .collect();
        sql.push_str(&format!(" AND {} NOT IN ({})", quoted(pk), list.join(", ")));
    }
    q.sql = sql;
    q
}

/// Point every child in `ids` at `parent_id`. Caller skips this when `ids` is empty.
pub fn attach_children(target: &ModelDescriptor, foreign_key: &str, parent_id: &Value, ids: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(target.schema.as_deref(), &target.table);
    let n = q.push_param(parent_id.clone());
    let fk_ph = placeholder(target, foreign_key, n);
    let pk = &target.primary_key;
    let list: Vec<String> = ids
        .iter()
        .map(|v| {
            let n = q.push_param(v.clone());
            placeholder(target, pk, n)
        })
        .collect();
    q.sql = format!(
        "UPDATE {} SET {} = {} WHERE {} IN ({})",
        table,
        quoted(foreign_key),
        fk_ph,
        quoted(pk),
        list.join(", ")
    );
    q
}
