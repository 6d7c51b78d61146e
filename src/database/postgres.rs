use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use super::document::{self, DeleteResult, Document, DocumentId, InsertOneResult, UpdateResult};
use super::manager::{connection_url, redact_url};
use super::{Collection, DocumentStore, StoreError};
use crate::config::DatabaseConfig;
use crate::filter::filter::validate_table_name;
use crate::filter::{Filter, SqlParam};

/// PostgreSQL-backed store. Each collection is a table of JSONB documents keyed by UUID.
pub struct PgStore {
    pool: PgPool,
    log_queries: bool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = connection_url(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&url)
            .await?;

        info!("Connected to document store at {}", redact_url(&url));
        Ok(Self::from_pool(pool, config.enable_query_logging))
    }

    pub fn from_pool(pool: PgPool, log_queries: bool) -> Self {
        Self { pool, log_queries }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, StoreError> {
        validate_table_name(name)?;
        Ok(Arc::new(PgCollection {
            pool: self.pool.clone(),
            table: name.to_string(),
            ready: OnceCell::new(),
            log_queries: self.log_queries,
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed document store pool");
    }
}

pub struct PgCollection {
    pool: PgPool,
    table: String,
    ready: OnceCell<()>,
    log_queries: bool,
}

impl PgCollection {
    /// Create the backing table the first time the collection is touched.
    ///
    /// The OnceCell only serializes callers inside this process. A transaction-scoped
    /// advisory lock keyed on the table name serializes concurrent processes, since
    /// `CREATE TABLE IF NOT EXISTS` can still collide on the `pg_type` entry.
    async fn ensure_table(&self) -> Result<(), StoreError> {
        self.ready
            .get_or_try_init(|| async {
                let sql = format!(
                    "CREATE TABLE IF NOT EXISTS \"{}\" (\
                        id UUID PRIMARY KEY, \
                        doc JSONB NOT NULL, \
                        created_at TIMESTAMPTZ NOT NULL DEFAULT now()\
                    )",
                    self.table
                );

                let mut tx = self.pool.begin().await?;
                sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
                    .bind(self.table.as_str())
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(&sql).execute(&mut *tx).await?;
                tx.commit().await?;

                debug!("Ensured table for collection {}", self.table);
                Ok::<_, StoreError>(())
            })
            .await?;
        Ok(())
    }

    fn log_sql(&self, sql: &str) {
        if self.log_queries {
            debug!(collection = %self.table, "SQL: {}", sql);
        }
    }

    fn decode_row(&self, row: PgRow) -> Result<Document, StoreError> {
        let id: Uuid = row.try_get("id")?;
        let doc: Value = row.try_get("doc")?;
        match doc {
            Value::Object(body) => Ok(document::with_id(DocumentId::from(id), body)),
            other => Err(StoreError::InvalidDocument {
                collection: self.table.clone(),
                reason: format!("expected object, found {}", json_kind(&other)),
            }),
        }
    }
}

#[async_trait]
impl Collection for PgCollection {
    fn name(&self) -> &str {
        &self.table
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.ensure_table().await?;

        let where_sql = filter.to_where_sql("doc", 0);
        let sql = format!(
            "SELECT id, doc FROM \"{}\" WHERE {} ORDER BY created_at, id",
            self.table, where_sql.query
        );
        self.log_sql(&sql);

        let mut q = sqlx::query(&sql);
        for p in where_sql.params.iter() {
            q = bind_param(q, p);
        }

        let rows: Vec<PgRow> = q.fetch(&self.pool).try_collect().await?;
        rows.into_iter().map(|row| self.decode_row(row)).collect()
    }

    async fn insert_one(&self, mut doc: Document) -> Result<InsertOneResult, StoreError> {
        self.ensure_table().await?;
        document::strip_id(&mut doc);

        let id = DocumentId::generate();
        let sql = format!("INSERT INTO \"{}\" (id, doc) VALUES ($1, $2)", self.table);
        self.log_sql(&sql);

        sqlx::query(&sql)
            .bind(*id.as_uuid())
            .bind(Value::Object(doc))
            .execute(&self.pool)
            .await?;

        Ok(InsertOneResult::new(id))
    }

    async fn update_one(&self, id: DocumentId, mut set: Document) -> Result<UpdateResult, StoreError> {
        self.ensure_table().await?;
        document::strip_id(&mut set);

        // Top-level JSONB concatenation gives merge-set semantics; the row is
        // only rewritten when the merge actually changes it.
        let sql = format!(
            "WITH target AS (\
                SELECT id, doc FROM \"{table}\" WHERE id = $1 FOR UPDATE\
            ), updated AS (\
                UPDATE \"{table}\" AS d SET doc = target.doc || $2::jsonb \
                FROM target \
                WHERE d.id = target.id AND target.doc IS DISTINCT FROM target.doc || $2::jsonb \
                RETURNING d.id\
            ) \
            SELECT (SELECT COUNT(*) FROM target) AS matched, \
                   (SELECT COUNT(*) FROM updated) AS modified",
            table = self.table
        );
        self.log_sql(&sql);

        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .bind(Value::Object(set))
            .fetch_one(&self.pool)
            .await?;

        let matched: i64 = row.try_get("matched")?;
        let modified: i64 = row.try_get("modified")?;
        Ok(UpdateResult::new(matched.max(0) as u64, modified.max(0) as u64))
    }

    async fn delete_one(&self, id: DocumentId) -> Result<DeleteResult, StoreError> {
        self.ensure_table().await?;

        let sql = format!("DELETE FROM \"{}\" WHERE id = $1", self.table);
        self.log_sql(&sql);

        let result = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(DeleteResult::new(result.rows_affected()))
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    p: &'q SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match p {
        SqlParam::Text(s) => q.bind(s.as_str()),
        SqlParam::Json(v) => q.bind(v),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
