use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::Error;
use crate::middleware::AdminUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cinema", get(get_all_listings).post(add_listing))
        .route("/cinema/{id}", get(get_listing).delete(delete_listing))
}

/* ---------- LISTINGS ---------- */

// POST /api/cinema
#[derive(Debug, Deserialize, Validate)]
struct AddListingRequest {
    #[serde(rename = "movieId")]
    #[validate(range(min = 1, message = "movieId must be a positive number"))]
    movie_id: i64,
}

async fn add_listing(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<AddListingRequest>,
) -> Result<impl IntoResponse, Error> {
    req.validate()
        .map_err(|e| Error::InvalidInput(e.to_string()))?;

    // Snapshot display metadata from the catalog; its failure blocks listing
    // creation but never affects booking.
    let metadata = state
        .catalog
        .movie_details(req.movie_id)
        .await?
        .ok_or_else(|| {
            Error::Catalog(format!(
                "The catalog does not know movieId \"{}\".",
                req.movie_id
            ))
        })?;

    let listing = state
        .engine
        .create_listing(req.movie_id, serde_json::to_value(metadata)?)
        .await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

// GET /api/cinema
async fn get_all_listings(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, Error> {
    let listings = state.engine.list_listings().await?;
    Ok((StatusCode::OK, Json(listings)))
}

// GET /api/cinema/{id}
async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let listing = state.engine.get_listing(listing_id).await?;
    Ok((StatusCode::OK, Json(listing)))
}

// DELETE /api/cinema/{id}
async fn delete_listing(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let deleted = state.engine.delete_listing(listing_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!(
                "Movie with movieId \"{}\" is successfully deleted from DB.",
                listing_id
            ),
            "movieToDeleteInfo": deleted,
        })),
    ))
}
