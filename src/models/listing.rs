use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One bookable unit within a session. `booked_at` records when the claim
/// committed so the ghost-lock sweep can apply its grace period; it is
/// cleared again when the seat is released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    #[serde(rename = "seatNumber")]
    pub seat_number: i32,
    #[serde(rename = "isBooked", default)]
    pub is_booked: bool,
    #[serde(rename = "bookedAt", default, skip_serializing_if = "Option::is_none")]
    pub booked_at: Option<DateTime<Utc>>,
}

impl Seat {
    pub fn unbooked(seat_number: i32) -> Self {
        Seat {
            seat_number,
            is_booked: false,
            booked_at: None,
        }
    }
}

/// One scheduled showtime with a price and a seat map. Seats are kept sorted
/// ascending by seat number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(rename = "dateTime")]
    pub date_time: DateTime<Utc>,
    pub price: f64,
    pub seats: Vec<Seat>,
}

impl Session {
    pub fn new(id: String, date_time: DateTime<Utc>, price: f64, seat_numbers: &[i32]) -> Self {
        let mut seats: Vec<Seat> = seat_numbers.iter().map(|n| Seat::unbooked(*n)).collect();
        seats.sort_by_key(|s| s.seat_number);
        seats.dedup_by_key(|s| s.seat_number);
        Session {
            id,
            date_time,
            price,
            seats,
        }
    }

    pub fn seat(&self, seat_number: i32) -> Option<&Seat> {
        self.seats.iter().find(|s| s.seat_number == seat_number)
    }

    pub fn seat_mut(&mut self, seat_number: i32) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.seat_number == seat_number)
    }

    pub fn available_seats(&self) -> Vec<Seat> {
        self.seats.iter().filter(|s| !s.is_booked).cloned().collect()
    }

    /// Applies an admin-supplied replacement seat list without losing state
    /// for seats that are currently booked:
    ///
    /// 1. every booked seat is retained, whether or not the target lists it;
    /// 2. unbooked seats absent from the target are removed;
    /// 3. target numbers not already retained are added as fresh unbooked seats;
    /// 4. the result is sorted ascending by seat number.
    pub fn reconcile_seats(&mut self, target: &[i32]) {
        self.seats
            .retain(|seat| seat.is_booked || target.contains(&seat.seat_number));

        for &seat_number in target {
            if !self.seats.iter().any(|s| s.seat_number == seat_number) {
                self.seats.push(Seat::unbooked(seat_number));
            }
        }

        self.seats.sort_by_key(|s| s.seat_number);
    }

    pub fn is_on_date(&self, date: NaiveDate) -> bool {
        self.date_time.date_naive() == date
    }
}

/// Aggregate root: one movie's cinema-showing record. The listing is the unit
/// of storage atomicity; sessions and seats are embedded and never persisted
/// independently. `version` is the optimistic-concurrency token, bumped by the
/// repository on every successful mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "movieId")]
    pub listing_id: i64,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(skip)]
    pub version: i64,
}

impl Listing {
    pub fn new(listing_id: i64, metadata: serde_json::Value) -> Self {
        Listing {
            listing_id,
            metadata,
            sessions: Vec::new(),
            version: 0,
        }
    }

    pub fn session(&self, session_id: &str) -> Result<&Session> {
        self.sessions
            .iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    pub fn session_mut(&mut self, session_id: &str) -> Result<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    pub fn remove_session(&mut self, session_id: &str) -> Result<Session> {
        let idx = self
            .sessions
            .iter()
            .position(|s| s.id == session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        Ok(self.sessions.remove(idx))
    }
}
