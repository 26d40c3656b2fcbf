//! Catalog route handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use novel_cart_core::NovelId;

use crate::db::NovelRepository;
use crate::error::{AppError, Result};
use crate::models::Novel;
use crate::state::AppState;

/// Query parameters for the novel list.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Only novels published in this year.
    pub year: Option<String>,
}

/// Novel list response.
#[derive(Debug, Serialize)]
pub struct NovelList {
    pub count: usize,
    pub results: Vec<Novel>,
}

/// List novels ordered by rank, optionally filtered by `?year=`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<NovelList>> {
    let Query(params) = params?;
    let year = params.year.as_deref().filter(|y| !y.is_empty());

    let results = NovelRepository::new(state.pool()).list(year).await?;

    Ok(Json(NovelList {
        count: results.len(),
        results,
    }))
}

/// Show one novel. A non-numeric ID is simply not found.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Novel>> {
    let not_found = || AppError::NotFound("novel does not exist".to_string());
    let Path(id) = id.map_err(|_| not_found())?;

    NovelRepository::new(state.pool())
        .get_by_id(NovelId::new(id))
        .await?
        .map(Json)
        .ok_or_else(not_found)
}
