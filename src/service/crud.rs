//! List, get, save and delete against any database behind an `AnyPool`.

use super::form::{FormData, ListParams, Page, SaveOutcome};
use crate::config::Model;
use crate::error::AppError;
use crate::fields::{Field, FileStore, Record, Value};
use crate::sql::{
    bind_all, count, delete, delete_link, delete_links, insert, insert_link, scan_i64, scan_row,
    select_by_id, select_page, select_related_ids, update, Dialect, JoinTable, QueryBuf,
};
use sqlx::any::{AnyQueryResult, AnyRow};
use sqlx::{Any, AnyPool, Executor};
use std::collections::{BTreeMap, BTreeSet};

pub struct CrudService;

impl CrudService {
    /// One page of list columns plus the total number of matching rows.
    pub async fn list(
        pool: &AnyPool,
        d: Dialect,
        model: &Model,
        params: &ListParams,
    ) -> Result<Page, AppError> {
        let sort = model.resolve_sort(params.sort.as_deref(), params.sort_desc);
        let page = params.page.max(1);
        let search = params.search.as_deref().map(str::trim);
        let rows_q = select_page(d, model, search, &sort, page);
        let count_q = count(d, model, search);

        let (rows, count_row) = tokio::try_join!(
            Self::fetch_all(pool, &rows_q),
            Self::fetch_one(pool, &count_q)
        )?;
        let total = scan_i64(&count_row, 0)?;

        let fields: Vec<&Field> = model.list_fields().collect();
        let rows = rows
            .iter()
            .map(|row| {
                let cells = scan_row(fields.len(), row)?;
                Ok(cells
                    .into_iter()
                    .zip(&fields)
                    .map(|(v, f)| match f.kind.relation() {
                        Some(rel) if rel.list_column.is_some() => v,
                        _ => f.from_stored(v),
                    })
                    .collect::<Vec<Value>>())
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Page { rows, total, page })
    }

    /// Every field of row `id`; many-to-many fields as id sets.
    pub async fn get(pool: &AnyPool, d: Dialect, model: &Model, id: i64) -> Result<Record, AppError> {
        let q = select_by_id(d, model, id);
        let row = Self::fetch_optional(pool, &q)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", model.name, id)))?;

        let scalars: Vec<&Field> = model.scalar_fields().collect();
        let values = scan_row(scalars.len(), &row)?;
        let mut record: Record = scalars
            .into_iter()
            .zip(values)
            .map(|(f, v)| (f.attrs.name.clone(), f.from_stored(v)))
            .collect();

        for field in model.many_to_many_fields() {
            let ids = Self::related_ids(pool, d, model, field, id).await?;
            record.insert(field.attrs.name.clone(), Value::Ids(ids));
        }
        Ok(record)
    }

    /// Validate a submission and write what changed. `id` 0 creates a row.
    pub async fn save(
        pool: &AnyPool,
        d: Dialect,
        model: &Model,
        files: &dyn FileStore,
        id: i64,
        form: &FormData,
    ) -> Result<SaveOutcome, AppError> {
        let existing = if id != 0 {
            Some(Self::get(pool, d, model, id).await?)
        } else {
            None
        };

        let mut data = Record::new();
        let mut errors = BTreeMap::new();
        for field in model.form_fields() {
            let name = &field.attrs.name;
            let raw = if field.kind.is_file() {
                // replaced below once the rest of the form is valid
                if form.files.get(name).is_some_and(|f| !f.filename.is_empty()) {
                    continue;
                }
                match existing.as_ref().and_then(|e| e.get(name)) {
                    Some(v) if !v.is_null() => v.to_string(),
                    _ => form.values.get(name).cloned().unwrap_or_default(),
                }
            } else {
                form.values.get(name).cloned().unwrap_or_default()
            };
            match field.clean(&raw) {
                Ok(v) => {
                    data.insert(name.clone(), v);
                }
                Err(e) => {
                    errors.insert(name.clone(), e.to_string());
                    data.insert(name.clone(), Value::Text(raw));
                }
            }
        }
        if !errors.is_empty() {
            return Ok(SaveOutcome::Invalid { data, errors });
        }

        for field in model.form_fields().filter(|f| f.kind.is_file()) {
            let Some(upload) = form.files.get(&field.attrs.name).filter(|f| !f.filename.is_empty()) else {
                continue;
            };
            let upload_to = match &field.kind {
                crate::fields::FieldKind::File { upload_to } => upload_to.as_deref(),
                _ => None,
            };
            let stored = files.store(upload_to, upload).await?;
            data.insert(field.attrs.name.clone(), Value::Text(stored));
        }

        let mut scalars: Vec<(&Field, Value)> = Vec::new();
        let mut links: Vec<(&Field, BTreeSet<i64>, BTreeSet<i64>)> = Vec::new();
        for field in model.form_fields() {
            let Some(v) = data.get(&field.attrs.name) else { continue };
            let old = existing
                .as_ref()
                .and_then(|e| e.get(&field.attrs.name))
                .map(|o| Self::comparable(field, o));
            if field.kind.is_many_to_many() {
                let new_ids = v.as_ids().cloned().unwrap_or_default();
                let old_ids = old.as_ref().and_then(Value::as_ids).cloned().unwrap_or_default();
                if new_ids != old_ids {
                    links.push((field, old_ids, new_ids));
                }
            } else if old.as_ref() != Some(v) {
                scalars.push((field, v.clone()));
            }
        }

        if scalars.is_empty() && links.is_empty() {
            return Ok(SaveOutcome::unchanged(model));
        }

        let id = if id == 0 {
            Self::insert_row(pool, d, model, &scalars).await?
        } else {
            if !scalars.is_empty() {
                Self::execute(pool, &update(d, model, id, &scalars)).await?;
            }
            id
        };

        // each field commits on its own; a failure here leaves the scalar write in place
        for (field, old_ids, new_ids) in links {
            Self::reconcile(pool, d, model, field, id, &old_ids, &new_ids).await?;
        }

        tracing::info!(model = %model.slug, id, "saved");
        Ok(SaveOutcome::Saved { id, data })
    }

    /// Stored value as an unchanged resubmission would clean it: NULL on a blank, non-null
    /// field comes back as the kind's empty value.
    fn comparable(field: &Field, stored: &Value) -> Value {
        if stored.is_null() && field.attrs.blank && !field.attrs.null {
            field.kind.empty_value()
        } else {
            stored.clone()
        }
    }

    /// Delete row `id` and its join-table rows in one transaction.
    pub async fn delete(pool: &AnyPool, d: Dialect, model: &Model, id: i64) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;
        if Self::fetch_optional(&mut *tx, &select_by_id(d, model, id)).await?.is_none() {
            return Err(AppError::NotFound(format!("{} {}", model.name, id)));
        }
        for field in model.many_to_many_fields() {
            if let Some(rel) = field.kind.relation() {
                let join = JoinTable::for_field(model, field, rel);
                Self::execute(&mut *tx, &delete_links(d, &join, id)).await?;
            }
        }
        Self::execute(&mut *tx, &delete(d, model, id)).await?;
        tx.commit().await?;
        tracing::info!(model = %model.slug, id, "deleted");
        Ok(())
    }

    async fn related_ids(
        pool: &AnyPool,
        d: Dialect,
        model: &Model,
        field: &Field,
        id: i64,
    ) -> Result<BTreeSet<i64>, AppError> {
        let Some(rel) = field.kind.relation() else {
            return Ok(BTreeSet::new());
        };
        let join = JoinTable::for_field(model, field, rel);
        let rows = Self::fetch_all(pool, &select_related_ids(d, &join, id)).await?;
        rows.iter().map(|r| scan_i64(r, 0)).collect()
    }

    /// Insert a row and read its identifier back through `RETURNING` (SQLite 3.35+ and PostgreSQL).
    async fn insert_row(pool: &AnyPool, d: Dialect, model: &Model, scalars: &[(&Field, Value)]) -> Result<i64, AppError> {
        let row = Self::fetch_one(pool, &insert(d, model, scalars)).await?;
        scan_i64(&row, 0)
    }

    /// Insert missing links and delete removed ones; links present in both sets are untouched.
    async fn reconcile(
        pool: &AnyPool,
        d: Dialect,
        model: &Model,
        field: &Field,
        id: i64,
        old_ids: &BTreeSet<i64>,
        new_ids: &BTreeSet<i64>,
    ) -> Result<(), AppError> {
        let Some(rel) = field.kind.relation() else {
            return Ok(());
        };
        let join = JoinTable::for_field(model, field, rel);
        let mut tx = pool.begin().await?;
        for &related in new_ids.difference(old_ids) {
            Self::execute(&mut *tx, &insert_link(d, &join, id, related)).await?;
        }
        for &related in old_ids.difference(new_ids) {
            Self::execute(&mut *tx, &delete_link(d, &join, id, related)).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn execute<'c, E>(exec: E, q: &QueryBuf) -> Result<AnyQueryResult, AppError>
    where
        E: Executor<'c, Database = Any>,
    {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        Ok(bind_all(&q.sql, &q.params).execute(exec).await?)
    }

    async fn fetch_all<'c, E>(exec: E, q: &QueryBuf) -> Result<Vec<AnyRow>, AppError>
    where
        E: Executor<'c, Database = Any>,
    {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        Ok(bind_all(&q.sql, &q.params).fetch_all(exec).await?)
    }

    async fn fetch_one<'c, E>(exec: E, q: &QueryBuf) -> Result<AnyRow, AppError>
    where
        E: Executor<'c, Database = Any>,
    {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        Ok(bind_all(&q.sql, &q.params).fetch_one(exec).await?)
    }

    async fn fetch_optional<'c, E>(exec: E, q: &QueryBuf) -> Result<Option<AnyRow>, AppError>
    where
        E: Executor<'c, Database = Any>,
    {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        Ok(bind_all(&q.sql, &q.params).fetch_optional(exec).await?)
    }
}
