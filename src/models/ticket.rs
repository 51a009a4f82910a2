use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Durable proof that a user holds a specific seat in a specific session.
/// References the seat by value; deleting a session does not cascade here.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    #[serde(rename = "user")]
    pub user_id: String,
    #[serde(rename = "movieId")]
    pub listing_id: i64,
    #[serde(rename = "session")]
    pub session_id: String,
    #[serde(rename = "seatNumber")]
    pub seat_number: i32,
    #[serde(rename = "bookingDate")]
    pub booking_date: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        id: String,
        user_id: String,
        listing_id: i64,
        session_id: String,
        seat_number: i32,
    ) -> Self {
        Ticket {
            id,
            user_id,
            listing_id,
            session_id,
            seat_number,
            booking_date: Utc::now(),
        }
    }
}
