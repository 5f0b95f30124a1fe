//! PostgreSQL store: executes the SQL builder's statements through a sqlx pool.

use crate::config::{AssociationDescriptor, AssociationKind, EagerLoad, ModelDescriptor};
use crate::error::StoreError;
use crate::sql::{attach_children, delete, detach_children, insert, select_with_includes, update, PgBindValue, QueryBuf};
use crate::store::{id_to_string, Attributes, FindOptions, Instance, Store};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{ConnectOptions, PgPool, Postgres};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<PgRow>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        Ok(bind_all(sqlx::query(&q.sql), &q.params).fetch_all(&self.pool).await?)
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<PgRow>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        Ok(bind_all(sqlx::query(&q.sql), &q.params).fetch_optional(&self.pool).await?)
    }
}

fn bind_all<'q>(mut query: Query<'q, Postgres, PgArguments>, params: &[Value]) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = query.bind(PgBindValue::from(p));
    }
    query
}

#[async_trait]
impl Store for PgStore {
    async fn find(&self, model: &ModelDescriptor, options: &FindOptions) -> Result<Option<Instance>, StoreError> {
        let q = select_with_includes(model, &options.filters, &options.include);
        let row = self.fetch_optional(&q).await?;
        Ok(row.map(|r| row_to_instance(&r, &options.include)))
    }

    async fn find_all(&self, model: &ModelDescriptor, options: &FindOptions) -> Result<Vec<Instance>, StoreError> {
        let q = select_with_includes(model, &options.filters, &options.include);
        let rows = self.fetch_all(&q).await?;
        Ok(rows.iter().map(|r| row_to_instance(r, &options.include)).collect())
    }

    async fn create(&self, model: &ModelDescriptor, attributes: &Attributes) -> Result<Instance, StoreError> {
        let q = insert(model, attributes);
        let row = self.fetch_optional(&q).await?.ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        Ok(Instance::new(row_to_json(&row)))
    }

    async fn update_attributes(
        &self,
        model: &ModelDescriptor,
        id: &Value,
        attributes: &Attributes,
    ) -> Result<Instance, StoreError> {
        let q = update(model, id, attributes);
        let row = self.fetch_optional(&q).await?.ok_or_else(|| StoreError::Missing {
            table: model.table.clone(),
            id: id_to_string(id),
        })?;
        Ok(Instance::new(row_to_json(&row)))
    }

    async fn set_association(
        &self,
        model: &ModelDescriptor,
        id: &Value,
        association: &AssociationDescriptor,
        target: &ModelDescriptor,
        ids: &[Value],
    ) -> Result<(), StoreError> {
        let AssociationKind::HasMany { foreign_key, .. } = &association.kind else {
            return Err(StoreError::Rejected(format!(
                "{}.{} is not a has-many association",
                model.name, association.name
            )));
        };
        let mut tx = self.pool.begin().await?;
        let detach = detach_children(target, foreign_key, id, ids);
        tracing::debug!(sql = %detach.sql, params = ?detach.params, "query (tx)");
        bind_all(sqlx::query(&detach.sql), &detach.params).execute(&mut *tx).await?;
        if !ids.is_empty() {
            let attach = attach_children(target, foreign_key, id, ids);
            tracing::debug!(sql = %attach.sql, params = ?attach.params, "query (tx)");
            bind_all(sqlx::query(&attach.sql), &attach.params).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn destroy(&self, model: &ModelDescriptor, id: &Value) -> Result<(), StoreError> {
        let q = delete(model, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let result = bind_all(sqlx::query(&q.sql), &q.params).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                table: model.table.clone(),
                id: id_to_string(id),
            });
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Create the database named in `database_url` if it does not exist (connects to `postgres` to do so).
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = split_db_name(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name.replace('"', "\"\"")))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn split_db_name(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Rejected("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

fn row_to_instance(row: &PgRow, include: &[EagerLoad]) -> Instance {
    let mut attributes = row_to_json(row);
    let mut instance = Instance::default();
    for eager in include {
        let ids = match attributes.remove(&eager.name) {
            Some(Value::Array(ids)) => ids,
            _ => Vec::new(),
        };
        instance.associated.insert(eager.name.clone(), ids);
    }
    instance.attributes = attributes;
    instance
}

fn row_to_json(row: &PgRow) -> Attributes {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Attributes::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
