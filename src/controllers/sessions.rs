use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::Error;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::Session;
use crate::services::booking::SessionUpdate;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/cinema/{id}/sessions",
            get(get_sessions_by_date).post(add_session),
        )
        .route(
            "/cinema/{id}/sessions/{session_id}",
            get(get_session).put(edit_session).delete(delete_session),
        )
        .route("/cinema/{id}/sessions/{session_id}/book", post(book_seat))
        .route(
            "/cinema/{id}/sessions/{session_id}/seats",
            get(get_available_seats),
        )
}

/* ---------- SESSIONS ---------- */

// POST /api/cinema/{id}/sessions
#[derive(Debug, Deserialize, Validate)]
struct AddSessionRequest {
    #[serde(rename = "dateTime")]
    date_time: DateTime<Utc>,
    #[validate(range(min = 0.0, message = "price must be non-negative"))]
    price: f64,
    seats: Vec<i32>,
}

async fn add_session(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(listing_id): Path<i64>,
    Json(req): Json<AddSessionRequest>,
) -> Result<impl IntoResponse, Error> {
    req.validate()
        .map_err(|e| Error::InvalidInput(e.to_string()))?;

    let listing = state
        .engine
        .add_session(listing_id, req.date_time, req.price, &req.seats)
        .await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

// PUT /api/cinema/{id}/sessions/{session_id}
#[derive(Debug, Deserialize, Validate)]
struct EditSessionRequest {
    #[serde(rename = "dateTime")]
    date_time: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0, message = "price must be non-negative"))]
    price: Option<f64>,
    seats: Option<Vec<i32>>,
}

async fn edit_session(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path((listing_id, session_id)): Path<(i64, String)>,
    Json(req): Json<EditSessionRequest>,
) -> Result<impl IntoResponse, Error> {
    req.validate()
        .map_err(|e| Error::InvalidInput(e.to_string()))?;

    let session = state
        .engine
        .edit_session(
            listing_id,
            &session_id,
            SessionUpdate {
                date_time: req.date_time,
                price: req.price,
                seats: req.seats,
            },
        )
        .await?;
    Ok((StatusCode::OK, Json(session)))
}

// DELETE /api/cinema/{id}/sessions/{session_id}
async fn delete_session(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path((listing_id, session_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, Error> {
    state.engine.delete_session(listing_id, &session_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Session with id \"{session_id}\" successfully deleted.")
        })),
    ))
}

// GET /api/cinema/{id}/sessions/{session_id}
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path((listing_id, session_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, Error> {
    let session = state.engine.session_by_id(listing_id, &session_id).await?;
    Ok((StatusCode::OK, Json(session)))
}

// GET /api/cinema/{id}/sessions?date=YYYY-MM-DD
#[derive(Debug, Deserialize)]
struct SessionsQuery {
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct SessionOnDate {
    #[serde(rename = "catalogId")]
    catalog_id: i64,
    session: Session,
}

async fn get_sessions_by_date(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<i64>,
    Query(params): Query<SessionsQuery>,
) -> Result<impl IntoResponse, Error> {
    let date = params
        .date
        .ok_or_else(|| Error::InvalidInput("Missing 'date' query parameter.".to_string()))?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
        Error::InvalidInput(
            "Invalid 'date' query parameter. Please use YYYY-MM-DD format.".to_string(),
        )
    })?;

    let sessions = state.engine.sessions_on_date(listing_id, date).await?;
    let payload: Vec<SessionOnDate> = sessions
        .into_iter()
        .map(|session| SessionOnDate {
            catalog_id: listing_id,
            session,
        })
        .collect();
    Ok((StatusCode::OK, Json(payload)))
}

/* ---------- SEATS ---------- */

// POST /api/cinema/{id}/sessions/{session_id}/book
#[derive(Debug, Deserialize)]
struct BookSeatRequest {
    #[serde(rename = "seatNumber")]
    seat_number: Option<i32>,
}

async fn book_seat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((listing_id, session_id)): Path<(i64, String)>,
    Json(req): Json<BookSeatRequest>,
) -> Result<impl IntoResponse, Error> {
    let seat_number = req
        .seat_number
        .ok_or_else(|| Error::InvalidInput("Missing required field: seatNumber.".to_string()))?;

    let ticket = state
        .engine
        .book_seat(listing_id, &session_id, seat_number, &user.user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Seat \"{seat_number}\" has been successfully booked."),
            "ticket": ticket,
        })),
    ))
}

// GET /api/cinema/{id}/sessions/{session_id}/seats
async fn get_available_seats(
    State(state): State<Arc<AppState>>,
    Path((listing_id, session_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, Error> {
    let seats = state
        .engine
        .available_seats(listing_id, &session_id)
        .await?;
    Ok((StatusCode::OK, Json(seats)))
}
