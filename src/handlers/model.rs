//! Model handlers: index, list, get, save, delete and rendered form.

use crate::config::Model;
use crate::error::AppError;
use crate::fields::{Record, UploadedFile};
use crate::response::{error_body, success_created, success_one, success_page, PageMeta};
use crate::service::{CrudService, FormData, ListParams, SaveOutcome};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
pub struct ModelEntry {
    pub name: String,
    pub slug: String,
}

#[derive(Serialize)]
pub struct GroupEntry {
    pub name: String,
    pub slug: String,
    pub models: Vec<ModelEntry>,
}

#[derive(Serialize)]
pub struct IndexBody {
    pub title: String,
    pub groups: Vec<GroupEntry>,
}

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    match id_str.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::BadRequest(format!("invalid id '{}'", id_str))),
    }
}

/// Multipart body to form data. Repeated text parts (multi-selects) are joined with commas.
async fn read_form(mut multipart: Multipart) -> Result<FormData, AppError> {
    let mut form = FormData::new();
    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("multipart: {}", e)))?
    {
        let Some(name) = part.name().map(str::to_string) else {
            continue;
        };
        if let Some(filename) = part.file_name().map(str::to_string) {
            let bytes = part
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("multipart: {}", e)))?;
            form.files.insert(
                name,
                UploadedFile {
                    filename,
                    bytes: bytes.to_vec(),
                },
            );
            continue;
        }
        let text = part
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("multipart: {}", e)))?;
        form.values
            .entry(name)
            .and_modify(|v| {
                v.push(',');
                v.push_str(&text);
            })
            .or_insert(text);
    }
    Ok(form)
}

pub async fn index(State(state): State<AppState>) -> Json<IndexBody> {
    let groups = state
        .models
        .groups()
        .iter()
        .map(|g| GroupEntry {
            name: g.name.clone(),
            slug: g.slug.clone(),
            models: g
                .models
                .iter()
                .filter_map(|slug| state.models.get(slug))
                .map(|m| ModelEntry {
                    name: m.name.clone(),
                    slug: m.slug.clone(),
                })
                .collect(),
        })
        .collect();
    Json(IndexBody {
        title: state.title.clone(),
        groups,
    })
}

pub async fn list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let model = state.model(&slug)?;
    let page = CrudService::list(&state.pool, state.dialect, model, &params).await?;
    let columns: Vec<String> = model.list_fields().map(|f| f.attrs.name.clone()).collect();
    let rows: Vec<BTreeMap<String, String>> = page
        .display_rows(model)
        .into_iter()
        .map(|cells| columns.iter().cloned().zip(cells).collect())
        .collect();
    let meta = PageMeta {
        count: page.total,
        page: page.page,
        num_pages: page.num_pages(),
    };
    Ok(success_page(rows, meta))
}

pub async fn read(
    State(state): State<AppState>,
    Path((slug, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let model = state.model(&slug)?;
    let id = parse_id(&id_str)?;
    let record = CrudService::get(&state.pool, state.dialect, model, id).await?;
    Ok(success_one(record))
}

pub async fn create(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let model = state.model(&slug)?;
    let form = read_form(multipart).await?;
    save(&state, model, 0, &form).await
}

pub async fn update(
    State(state): State<AppState>,
    Path((slug, id_str)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let model = state.model(&slug)?;
    let id = parse_id(&id_str)?;
    let form = read_form(multipart).await?;
    save(&state, model, id, &form).await
}

async fn save(state: &AppState, model: &Model, id: i64, form: &FormData) -> Result<Response, AppError> {
    let outcome = CrudService::save(&state.pool, state.dialect, model, state.files.as_ref(), id, form).await?;
    Ok(match outcome {
        SaveOutcome::Saved { id: saved, .. } if id == 0 => success_created(outcome_body(saved)).into_response(),
        SaveOutcome::Saved { id: saved, .. } => success_one(outcome_body(saved)).into_response(),
        SaveOutcome::Invalid { errors, .. } => {
            let details = serde_json::to_value(&errors).ok();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(error_body(
                    "validation_error",
                    format!("{} has invalid fields", model.name),
                    details,
                )),
            )
                .into_response()
        }
        unchanged @ SaveOutcome::Unchanged { .. } => success_one(unchanged).into_response(),
    })
}

fn outcome_body(id: i64) -> serde_json::Value {
    serde_json::json!({ "status": "saved", "id": id })
}

pub async fn delete(
    State(state): State<AppState>,
    Path((slug, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let model = state.model(&slug)?;
    let id = parse_id(&id_str)?;
    CrudService::delete(&state.pool, state.dialect, model, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Form HTML for row `id`; id 0 renders an empty form with field defaults.
pub async fn form(
    State(state): State<AppState>,
    Path((slug, id_str)): Path<(String, String)>,
) -> Result<Html<String>, AppError> {
    let model = state.model(&slug)?;
    let (record, use_defaults) = if id_str == "0" {
        (Record::new(), true)
    } else {
        let id = parse_id(&id_str)?;
        (CrudService::get(&state.pool, state.dialect, model, id).await?, false)
    };
    let html = model.render_form(state.renderer.as_ref(), &record, use_defaults, &BTreeMap::new())?;
    Ok(Html(html))
}
