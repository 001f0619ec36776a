use super::error::ApiError;
use super::SharedStore;
use crate::models::{EntryForm, Record};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;

const INDEX_HTML: &str = include_str!("index.html");
const EXPORT_FILE_NAME: &str = "health_metrics.csv";

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub metric: Option<String>,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn list_records(State(store): State<SharedStore>) -> Result<Json<Vec<Record>>, ApiError> {
    Ok(Json(store.recent_first()?))
}

pub async fn add_record(
    State(store): State<SharedStore>,
    Json(form): Json<EntryForm>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let (date, metric, value) = form.parse()?;
    let record = store.append(date, &metric, value)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn clear_records(State(store): State<SharedStore>) -> Result<StatusCode, ApiError> {
    store.clear()?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_metrics(State(store): State<SharedStore>) -> Result<Json<BTreeSet<String>>, ApiError> {
    Ok(Json(store.distinct_metrics()?))
}

pub async fn series(
    State(store): State<SharedStore>,
    Query(query): Query<SeriesQuery>,
) -> Result<Response, ApiError> {
    let response = match query.metric {
        Some(metric) => Json(store.series_for(&metric)?).into_response(),
        None => Json(store.all_series()?).into_response(),
    };
    Ok(response)
}

pub async fn export_csv(State(store): State<SharedStore>) -> Result<Response, ApiError> {
    let body = store.export_csv()?;
    let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub async fn import_csv(State(store): State<SharedStore>, body: String) -> Result<Json<serde_json::Value>, ApiError> {
    let count = store.import_csv(body.as_bytes())?;
    Ok(Json(json!({ "records": count })))
}

pub async fn reload(State(store): State<SharedStore>) -> Result<Json<serde_json::Value>, ApiError> {
    let count = store.reload()?;
    Ok(Json(json!({ "records": count })))
}
