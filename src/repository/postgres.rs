use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::{Listing, Session, Ticket};
use crate::repository::{ListingMutator, ListingRepository};

/// Production repository. Each listing aggregate lives in a single row
/// (`sessions` as one JSONB document, `version` as the CAS token); tickets
/// have their own table with a unique index on the seat tuple.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_listing(
        listing_id: i64,
        metadata: serde_json::Value,
        sessions: serde_json::Value,
        version: i64,
    ) -> Result<Listing> {
        let sessions: Vec<Session> = serde_json::from_value(sessions)?;
        Ok(Listing {
            listing_id,
            metadata,
            sessions,
            version,
        })
    }
}

type ListingRow = (serde_json::Value, serde_json::Value, i64);

#[async_trait]
impl ListingRepository for PostgresRepository {
    async fn insert_listing(&self, listing: &Listing) -> Result<()> {
        let sessions = serde_json::to_value(&listing.sessions)?;
        let inserted = sqlx::query(
            "INSERT INTO listings (listing_id, metadata, sessions, version)
             VALUES ($1, $2, $3, 0)
             ON CONFLICT (listing_id) DO NOTHING",
        )
        .bind(listing.listing_id)
        .bind(&listing.metadata)
        .bind(sessions)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(Error::ListingExists(listing.listing_id));
        }
        Ok(())
    }

    async fn find_listing(&self, listing_id: i64) -> Result<Option<Listing>> {
        let row: Option<ListingRow> = sqlx::query_as(
            "SELECT metadata, sessions, version FROM listings WHERE listing_id = $1",
        )
        .bind(listing_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(metadata, sessions, version)| {
            Self::row_to_listing(listing_id, metadata, sessions, version)
        })
        .transpose()
    }

    async fn list_listings(&self) -> Result<Vec<Listing>> {
        let rows: Vec<(i64, serde_json::Value, serde_json::Value, i64)> = sqlx::query_as(
            "SELECT listing_id, metadata, sessions, version FROM listings ORDER BY listing_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, metadata, sessions, version)| {
                Self::row_to_listing(id, metadata, sessions, version)
            })
            .collect()
    }

    async fn delete_listing(&self, listing_id: i64) -> Result<Option<Listing>> {
        let row: Option<ListingRow> = sqlx::query_as(
            "DELETE FROM listings WHERE listing_id = $1
             RETURNING metadata, sessions, version",
        )
        .bind(listing_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(metadata, sessions, version)| {
            Self::row_to_listing(listing_id, metadata, sessions, version)
        })
        .transpose()
    }

    async fn listing_ids(&self) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT listing_id FROM listings")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn update_listing(
        &self,
        listing_id: i64,
        mutate: ListingMutator<'_>,
    ) -> Result<Listing> {
        let mut listing = self
            .find_listing(listing_id)
            .await?
            .ok_or(Error::ListingNotFound(listing_id))?;

        let read_version = listing.version;
        mutate(&mut listing)?;

        let sessions = serde_json::to_value(&listing.sessions)?;
        let updated = sqlx::query(
            "UPDATE listings
             SET sessions = $2, version = version + 1
             WHERE listing_id = $1 AND version = $3",
        )
        .bind(listing_id)
        .bind(sessions)
        .bind(read_version)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            // Lost the race, or the listing vanished underneath us.
            return if self.find_listing(listing_id).await?.is_some() {
                Err(Error::VersionConflict(listing_id))
            } else {
                Err(Error::ListingNotFound(listing_id))
            };
        }

        listing.version = read_version + 1;
        Ok(listing)
    }

    /* ---------- tickets ---------- */

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        sqlx::query(
            "INSERT INTO tickets (id, user_id, listing_id, session_id, seat_number, booking_date)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&ticket.id)
        .bind(&ticket.user_id)
        .bind(ticket.listing_id)
        .bind(&ticket.session_id)
        .bind(ticket.seat_number)
        .bind(ticket.booking_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "SELECT id, user_id, listing_id, session_id, seat_number, booking_date
             FROM tickets WHERE id = $1",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn find_ticket_for_seat(
        &self,
        listing_id: i64,
        session_id: &str,
        seat_number: i32,
    ) -> Result<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "SELECT id, user_id, listing_id, session_id, seat_number, booking_date
             FROM tickets
             WHERE listing_id = $1 AND session_id = $2 AND seat_number = $3",
        )
        .bind(listing_id)
        .bind(session_id)
        .bind(seat_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn find_tickets_by_user(&self, user_id: &str) -> Result<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT id, user_id, listing_id, session_id, seat_number, booking_date
             FROM tickets WHERE user_id = $1
             ORDER BY booking_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    async fn delete_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "DELETE FROM tickets WHERE id = $1
             RETURNING id, user_id, listing_id, session_id, seat_number, booking_date",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }
}
