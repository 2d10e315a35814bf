//! PostgreSQL adapter implementing the storage traits
//!
//! Documents live in a single `documents` table keyed by
//! `(collection, id)` with the record body in a JSONB column. A
//! [`Selection`] is compiled into a parameterised `WHERE` clause.

use crate::adapters::database::traits::{
    CompletionMarker, Condition, DocumentStore, MarkerStore, Selection,
};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{date_to_sql, PostgreSQLDocument, PostgreSQLMarker};
use crate::domain::{Document, DocumentStoreError, ExportDate, RecordId, Result, ID_FIELD};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

type SqlParam = Box<dyn ToSql + Sync + Send>;

/// PostgreSQL implementation of [`DocumentStore`] and [`MarkerStore`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    async fn select(
        &self,
        collection: &str,
        where_clause: &str,
        params: &[SqlParam],
        suffix: &str,
    ) -> Result<Vec<Document>> {
        let sql = format!(
            "SELECT id, doc FROM documents WHERE collection = $1{where_clause} ORDER BY id{suffix}"
        );
        let refs = param_refs(params);

        tracing::trace!(sql = %sql, "Querying documents");

        let rows = self.client.query(&sql, &refs).await?;
        rows.iter()
            .map(|row| PostgreSQLDocument::from_row(collection, row)?.to_domain())
            .collect()
    }
}

fn param_refs(params: &[SqlParam]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|p| p.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

/// Compile a selection into ` AND ...` clauses, pushing bound values onto `params`
///
/// `params` must already hold every earlier placeholder; new placeholders
/// are numbered after them.
fn compile_selection(selection: &Selection, params: &mut Vec<SqlParam>) -> String {
    let mut sql = String::new();

    for condition in selection.conditions() {
        let mut bind = |value: SqlParam| {
            params.push(value);
            format!("${}", params.len())
        };

        let clause = match condition {
            Condition::Equals { field, value } if field == ID_FIELD => match value.as_i64() {
                Some(id) => format!("id = {}", bind(Box::new(id))),
                None => "FALSE".to_string(),
            },
            Condition::Equals { field, value } => {
                let key = bind(Box::new(field.clone()));
                let value = bind(Box::new(value.clone()));
                format!("doc -> {key}::text = {value}::jsonb")
            }
            Condition::In { field, values } => {
                let key = bind(Box::new(field.clone()));
                let values = bind(Box::new(values.clone()));
                format!("doc -> {key}::text = ANY({values}::jsonb[])")
            }
            Condition::NotIn { field, values } => {
                let key = bind(Box::new(field.clone()));
                let values = bind(Box::new(values.clone()));
                format!("NOT COALESCE(doc -> {key}::text = ANY({values}::jsonb[]), FALSE)")
            }
            Condition::Exists(field) if field == ID_FIELD => "TRUE".to_string(),
            Condition::Exists(field) => {
                let key = bind(Box::new(field.clone()));
                format!("COALESCE(jsonb_typeof(doc -> {key}::text) <> 'null', FALSE)")
            }
            Condition::IdIn(ids) => {
                let ids: Vec<i64> = ids.iter().map(RecordId::value).collect();
                format!("id = ANY({}::bigint[])", bind(Box::new(ids)))
            }
        };

        sql.push_str(" AND ");
        sql.push_str(&clause);
    }

    sql
}

#[async_trait]
impl DocumentStore for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn find_block(
        &self,
        collection: &str,
        selection: &Selection,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let mut params: Vec<SqlParam> = vec![Box::new(collection.to_string())];
        let mut where_clause = compile_selection(selection, &mut params);

        if let Some(after) = after {
            params.push(Box::new(after.value()));
            where_clause.push_str(&format!(" AND id > ${}", params.len()));
        }

        params.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
        let suffix = format!(" LIMIT ${}", params.len());

        self.select(collection, &where_clause, &params, &suffix)
            .await
    }

    async fn find_by_ids(
        &self,
        collection: &str,
        ids: &[RecordId],
        selection: &Selection,
    ) -> Result<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let selection = selection.clone().id_in(ids.iter().copied());
        let mut params: Vec<SqlParam> = vec![Box::new(collection.to_string())];
        let where_clause = compile_selection(&selection, &mut params);

        self.select(collection, &where_clause, &params, "").await
    }

    async fn find_one(&self, collection: &str, id: RecordId) -> Result<Option<Document>> {
        let rows = self
            .client
            .query(
                "SELECT id, doc FROM documents WHERE collection = $1 AND id = $2",
                &[&collection, &id.value()],
            )
            .await?;

        rows.first()
            .map(|row| PostgreSQLDocument::from_row(collection, row)?.to_domain())
            .transpose()
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DocumentStoreError::InsertFailed(e.to_string()))?;

        let statement = tx
            .prepare(
                r#"
                INSERT INTO documents (collection, id, doc, updated_at)
                VALUES ($1, $2, $3, now())
                ON CONFLICT (collection, id) DO UPDATE SET
                    doc = EXCLUDED.doc,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .await
            .map_err(|e| DocumentStoreError::InsertFailed(e.to_string()))?;

        let count = documents.len();
        for document in documents {
            let row = PostgreSQLDocument::from_domain(collection, document);
            tx.execute(&statement, &[&row.collection, &row.id, &row.doc])
                .await
                .map_err(|e| {
                    DocumentStoreError::InsertFailed(format!("{collection}/{}: {e}", row.id))
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| DocumentStoreError::InsertFailed(e.to_string()))?;

        tracing::debug!(collection, count, "Inserted documents into PostgreSQL");
        Ok(count)
    }

    async fn delete_by_id(&self, collection: &str, id: RecordId) -> Result<bool> {
        let deleted = self
            .client
            .execute(
                "DELETE FROM documents WHERE collection = $1 AND id = $2",
                &[&collection, &id.value()],
            )
            .await
            .map_err(|e| DocumentStoreError::DeleteFailed(format!("{collection}/{id}: {e}")))?;

        Ok(deleted > 0)
    }
}

#[async_trait]
impl MarkerStore for PostgreSQLAdapter {
    async fn touch(&self, task_id: &str, date: ExportDate, dry_run: bool) -> Result<()> {
        if dry_run {
            tracing::info!(
                task_id,
                date = %date,
                "DRY RUN: Would write completion marker to PostgreSQL"
            );
            return Ok(());
        }

        let marker = PostgreSQLMarker::from_domain(&CompletionMarker::new(task_id, date))?;

        self.client
            .execute(
                r#"
                INSERT INTO completion_markers (task_id, date, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (task_id, date) DO NOTHING
                "#,
                &[&marker.task_id, &marker.date, &marker.created_at],
            )
            .await?;

        tracing::debug!(task_id, date = %date, "Completion marker written");
        Ok(())
    }

    async fn exists(&self, task_id: &str, date: ExportDate) -> Result<bool> {
        let rows = self
            .client
            .query(
                "SELECT 1 FROM completion_markers WHERE task_id = $1 AND date = $2",
                &[&task_id, &date_to_sql(date)?],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn marker_dates(&self, task_id: &str) -> Result<BTreeSet<ExportDate>> {
        let rows = self
            .client
            .query(
                "SELECT task_id, date, created_at FROM completion_markers WHERE task_id = $1",
                &[&task_id],
            )
            .await?;

        rows.iter()
            .map(|row| -> Result<ExportDate> {
                Ok(PostgreSQLMarker::from_row(row)?.to_domain()?.date)
            })
            .collect()
    }

    async fn all_markers(&self) -> Result<Vec<CompletionMarker>> {
        let rows = self
            .client
            .query(
                "SELECT task_id, date, created_at FROM completion_markers ORDER BY date, task_id",
                &[],
            )
            .await?;

        rows.iter()
            .map(|row| PostgreSQLMarker::from_row(row)?.to_domain())
            .collect()
    }
}
