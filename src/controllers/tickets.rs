use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::Error;
use crate::middleware::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets/me", get(get_user_tickets))
        .route(
            "/tickets/{ticket_id}",
            get(get_ticket).delete(delete_ticket),
        )
}

/* ---------- TICKETS ---------- */

// GET /api/tickets/me
async fn get_user_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, Error> {
    let tickets = state.engine.user_tickets(&user.user_id).await?;
    Ok((StatusCode::OK, Json(tickets)))
}

// GET /api/tickets/{ticket_id}
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(ticket_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let ticket = state.engine.get_ticket(&ticket_id, &user.user_id).await?;
    Ok((StatusCode::OK, Json(ticket)))
}

// DELETE /api/tickets/{ticket_id}
async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(ticket_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let deleted = state.engine.delete_ticket(&ticket_id, &user.user_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": format!("Ticket with ID \"{ticket_id}\" successfully deleted."),
            "deletedTicket": deleted,
        })),
    ))
}
