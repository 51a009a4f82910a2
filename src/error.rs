use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Domain error taxonomy. Every failure path carries a discriminated reason
/// so callers can tell a lost race from a permanent failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Movie with movieId \"{0}\" not found.")]
    ListingNotFound(i64),

    #[error("Session with id \"{0}\" not found.")]
    SessionNotFound(String),

    #[error("Seat \"{0}\" does not exist in this session.")]
    SeatNotFound(i32),

    #[error("Ticket with ID \"{0}\" not found.")]
    TicketNotFound(String),

    #[error("The movie with movieId \"{0}\" already exists in the database.")]
    ListingExists(i64),

    #[error("Seat \"{0}\" is already booked.")]
    SeatAlreadyBooked(i32),

    #[error("A ticket for this seat already exists.")]
    TicketExists,

    // Optimistic-concurrency collision on the listing aggregate. Retried by
    // the engine; surfaced only when retries exhaust.
    #[error("Concurrent modification of movie \"{0}\", please retry.")]
    VersionConflict(i64),

    #[error("You are not authorized to access this ticket.")]
    Forbidden,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Error getting data from the movie catalog. {0}")]
    Catalog(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        // PostgreSQL unique violation on the ticket seat-tuple index means a
        // ticket already proves ownership of that seat.
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return Error::TicketExists;
            }
        }
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Storage(format!("document (de)serialization failed: {err}"))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::ListingNotFound(_)
            | Error::SessionNotFound(_)
            | Error::SeatNotFound(_)
            | Error::TicketNotFound(_) => StatusCode::NOT_FOUND,

            Error::ListingExists(_)
            | Error::SeatAlreadyBooked(_)
            | Error::TicketExists
            | Error::VersionConflict(_) => StatusCode::CONFLICT,

            Error::Forbidden => StatusCode::FORBIDDEN,

            Error::InvalidInput(_) | Error::Catalog(_) => StatusCode::BAD_REQUEST,

            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            Error::Storage(detail) => {
                tracing::error!("storage failure: {}", detail);
                "Error happened on server.".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_map_to_404() {
        for err in [
            Error::ListingNotFound(42),
            Error::SessionNotFound("s1".into()),
            Error::SeatNotFound(7),
            Error::TicketNotFound("t1".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn conflicts_map_to_409() {
        assert_eq!(
            Error::SeatAlreadyBooked(2).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::VersionConflict(1).into_response().status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn storage_is_sanitized_to_500() {
        let resp = Error::Storage("connection refused".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
