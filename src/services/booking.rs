use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::config::BookingConfig;
use crate::error::{Error, Result};
use crate::ids::IdGenerator;
use crate::models::{Listing, Seat, Session, Ticket};
use crate::repository::{ListingMutator, ListingRepository};

/// Partial update for a session; absent fields keep their current value.
/// A supplied seat list goes through seat-layout reconciliation rather than
/// wholesale replacement, so booked seats survive admin edits.
#[derive(Debug, Default, Clone)]
pub struct SessionUpdate {
    pub date_time: Option<DateTime<Utc>>,
    pub price: Option<f64>,
    pub seats: Option<Vec<i32>>,
}

/// Executes the seat-claim protocol and the session lifecycle operations
/// against one listing at a time. All coordination goes through the
/// repository's versioned update; conflicts are retried here with backoff.
#[derive(Clone)]
pub struct ReservationEngine {
    repo: Arc<dyn ListingRepository>,
    ids: Arc<dyn IdGenerator>,
    config: BookingConfig,
}

impl ReservationEngine {
    pub fn new(
        repo: Arc<dyn ListingRepository>,
        ids: Arc<dyn IdGenerator>,
        config: BookingConfig,
    ) -> Self {
        Self { repo, ids, config }
    }

    /// Applies a listing mutation, retrying version conflicts a bounded
    /// number of times with linear backoff. Every other error is terminal.
    async fn update_with_retries(
        &self,
        listing_id: i64,
        mutate: ListingMutator<'_>,
    ) -> Result<Listing> {
        let mut attempt: u32 = 0;
        loop {
            match self.repo.update_listing(listing_id, mutate).await {
                Err(Error::VersionConflict(_)) if attempt < self.config.claim_retries => {
                    attempt += 1;
                    debug!(
                        listing_id,
                        attempt, "version conflict on listing update, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(
                        self.config.retry_backoff_ms * u64::from(attempt),
                    ))
                    .await;
                }
                other => return other,
            }
        }
    }

    /* ---------- LISTINGS ---------- */

    pub async fn create_listing(
        &self,
        listing_id: i64,
        metadata: serde_json::Value,
    ) -> Result<Listing> {
        let listing = Listing::new(listing_id, metadata);
        self.repo.insert_listing(&listing).await?;
        info!(listing_id, "listing created");
        Ok(listing)
    }

    pub async fn get_listing(&self, listing_id: i64) -> Result<Listing> {
        self.repo
            .find_listing(listing_id)
            .await?
            .ok_or(Error::ListingNotFound(listing_id))
    }

    pub async fn list_listings(&self) -> Result<Vec<Listing>> {
        self.repo.list_listings().await
    }

    pub async fn delete_listing(&self, listing_id: i64) -> Result<Listing> {
        self.repo
            .delete_listing(listing_id)
            .await?
            .ok_or(Error::ListingNotFound(listing_id))
    }

    /* ---------- SESSIONS ---------- */

    /// Adds a session with every seat starting unbooked. Returns the updated
    /// listing, matching the creation endpoint's response shape.
    pub async fn add_session(
        &self,
        listing_id: i64,
        date_time: DateTime<Utc>,
        price: f64,
        seat_numbers: &[i32],
    ) -> Result<Listing> {
        if price < 0.0 || !price.is_finite() {
            return Err(Error::InvalidInput(
                "price must be a non-negative number".into(),
            ));
        }

        let session_id = self.ids.next_id();
        let add = |listing: &mut Listing| -> Result<()> {
            listing.sessions.push(Session::new(
                session_id.clone(),
                date_time,
                price,
                seat_numbers,
            ));
            Ok(())
        };
        let listing = self.update_with_retries(listing_id, &add).await?;
        info!(listing_id, session_id = %session_id, "session added");
        Ok(listing)
    }

    /// Edits a session. `date_time` and `price` are replaced wholesale when
    /// supplied; a supplied seat list is reconciled against the current seats
    /// so booked seats are never dropped.
    pub async fn edit_session(
        &self,
        listing_id: i64,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<Session> {
        if let Some(price) = update.price {
            if price < 0.0 || !price.is_finite() {
                return Err(Error::InvalidInput(
                    "price must be a non-negative number".into(),
                ));
            }
        }

        let edit = |listing: &mut Listing| -> Result<()> {
            let session = listing.session_mut(session_id)?;
            if let Some(date_time) = update.date_time {
                session.date_time = date_time;
            }
            if let Some(price) = update.price {
                session.price = price;
            }
            if let Some(target) = &update.seats {
                session.reconcile_seats(target);
            }
            Ok(())
        };
        let listing = self.update_with_retries(listing_id, &edit).await?;
        Ok(listing.session(session_id)?.clone())
    }

    /// Deletes a session. Deleting one with booked seats is permitted and
    /// does not touch the ticket ledger; outstanding tickets keep their
    /// denormalized seat reference as proof of purchase.
    pub async fn delete_session(&self, listing_id: i64, session_id: &str) -> Result<()> {
        let remove = |listing: &mut Listing| -> Result<()> {
            listing.remove_session(session_id)?;
            Ok(())
        };
        self.update_with_retries(listing_id, &remove).await?;
        info!(listing_id, session_id, "session deleted");
        Ok(())
    }

    pub async fn session_by_id(&self, listing_id: i64, session_id: &str) -> Result<Session> {
        let listing = self.get_listing(listing_id).await?;
        Ok(listing.session(session_id)?.clone())
    }

    /// Sessions of a listing falling on the given calendar date.
    pub async fn sessions_on_date(
        &self,
        listing_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Session>> {
        let listing = self.get_listing(listing_id).await?;
        Ok(listing
            .sessions
            .iter()
            .filter(|s| s.is_on_date(date))
            .cloned()
            .collect())
    }

    /// Pure read: the session's unbooked seats.
    pub async fn available_seats(&self, listing_id: i64, session_id: &str) -> Result<Vec<Seat>> {
        let listing = self.get_listing(listing_id).await?;
        Ok(listing.session(session_id)?.available_seats())
    }

    /* ---------- SEAT CLAIM ---------- */

    /// The two-phase claim protocol: atomically flip the seat to booked under
    /// the listing's version guard, then append the ticket. A failure in the
    /// second phase triggers compensation so no ghost lock outlives the call.
    pub async fn book_seat(
        &self,
        listing_id: i64,
        session_id: &str,
        seat_number: i32,
        user_id: &str,
    ) -> Result<Ticket> {
        let claim = |listing: &mut Listing| -> Result<()> {
            let session = listing.session_mut(session_id)?;
            let seat = session
                .seat_mut(seat_number)
                .ok_or(Error::SeatNotFound(seat_number))?;
            if seat.is_booked {
                return Err(Error::SeatAlreadyBooked(seat_number));
            }
            seat.is_booked = true;
            seat.booked_at = Some(Utc::now());
            Ok(())
        };

        match self.update_with_retries(listing_id, &claim).await {
            Ok(_) => {}
            Err(Error::SeatAlreadyBooked(n)) => {
                // A prior attempt by this same user may already hold the seat
                // (client timed out and retried). Return the existing ticket
                // instead of minting a second one.
                if let Some(ticket) = self
                    .repo
                    .find_ticket_for_seat(listing_id, session_id, seat_number)
                    .await?
                {
                    if ticket.user_id == user_id {
                        debug!(listing_id, session_id, seat_number, "idempotent re-claim");
                        return Ok(ticket);
                    }
                }
                return Err(Error::SeatAlreadyBooked(n));
            }
            Err(e) => return Err(e),
        }

        self.issue_ticket(listing_id, session_id, seat_number, user_id)
            .await
    }

    /// Second phase of the claim: persist the ticket, retrying transient
    /// storage failures. If the ticket cannot be written, the seat claim is
    /// compensated (reverted) so the failure leaves no booked seat without a
    /// ticket.
    async fn issue_ticket(
        &self,
        listing_id: i64,
        session_id: &str,
        seat_number: i32,
        user_id: &str,
    ) -> Result<Ticket> {
        let mut last_err = Error::Storage("ticket creation failed".into());

        for attempt in 0..=self.config.ticket_insert_retries {
            let ticket = Ticket::new(
                self.ids.next_id(),
                user_id.to_string(),
                listing_id,
                session_id.to_string(),
                seat_number,
            );
            match self.repo.insert_ticket(&ticket).await {
                Ok(()) => {
                    info!(
                        listing_id,
                        session_id,
                        seat_number,
                        ticket_id = %ticket.id,
                        "seat booked"
                    );
                    return Ok(ticket);
                }
                Err(Error::TicketExists) => {
                    // A ticket already proves ownership of this seat: a prior
                    // attempt's insert landed before the process died.
                    if let Some(existing) = self
                        .repo
                        .find_ticket_for_seat(listing_id, session_id, seat_number)
                        .await?
                    {
                        if existing.user_id == user_id {
                            return Ok(existing);
                        }
                        return Err(Error::SeatAlreadyBooked(seat_number));
                    }
                    last_err = Error::TicketExists;
                }
                Err(Error::Storage(detail)) => {
                    warn!(
                        listing_id,
                        session_id,
                        seat_number,
                        attempt,
                        "ticket insert failed: {}",
                        detail
                    );
                    last_err = Error::Storage(detail);
                    tokio::time::sleep(Duration::from_millis(
                        self.config.retry_backoff_ms * u64::from(attempt + 1),
                    ))
                    .await;
                }
                Err(e) => return Err(e),
            }
        }

        // Compensation: revert the seat so the claim fails cleanly. If the
        // revert itself fails the ghost-lock sweep picks it up later.
        if let Err(e) = self.release_seat(listing_id, session_id, seat_number).await {
            error!(
                listing_id,
                session_id,
                seat_number,
                "compensation failed, seat left for sweep: {}",
                e
            );
        }
        Err(last_err)
    }

    /// Reverts a seat to unbooked. Idempotent: an already-unbooked seat, or a
    /// session/listing that no longer exists, counts as released.
    async fn release_seat(
        &self,
        listing_id: i64,
        session_id: &str,
        seat_number: i32,
    ) -> Result<()> {
        let release = |listing: &mut Listing| -> Result<()> {
            let Ok(session) = listing.session_mut(session_id) else {
                return Ok(());
            };
            if let Some(seat) = session.seat_mut(seat_number) {
                seat.is_booked = false;
                seat.booked_at = None;
            }
            Ok(())
        };
        match self.update_with_retries(listing_id, &release).await {
            Ok(_) | Err(Error::ListingNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /* ---------- TICKETS ---------- */

    pub async fn user_tickets(&self, user_id: &str) -> Result<Vec<Ticket>> {
        self.repo.find_tickets_by_user(user_id).await
    }

    pub async fn get_ticket(&self, ticket_id: &str, user_id: &str) -> Result<Ticket> {
        let ticket = self
            .repo
            .find_ticket(ticket_id)
            .await?
            .ok_or_else(|| Error::TicketNotFound(ticket_id.to_string()))?;
        if ticket.user_id != user_id {
            return Err(Error::Forbidden);
        }
        Ok(ticket)
    }

    /// Deletes a ticket (owner only) and releases the seat it referenced.
    /// A seat whose session or listing has since been deleted is treated as
    /// already released.
    pub async fn delete_ticket(&self, ticket_id: &str, user_id: &str) -> Result<Ticket> {
        let ticket = self
            .repo
            .find_ticket(ticket_id)
            .await?
            .ok_or_else(|| Error::TicketNotFound(ticket_id.to_string()))?;
        if ticket.user_id != user_id {
            return Err(Error::Forbidden);
        }

        let deleted = self
            .repo
            .delete_ticket(ticket_id)
            .await?
            .ok_or_else(|| Error::TicketNotFound(ticket_id.to_string()))?;

        if let Err(e) = self
            .release_seat(deleted.listing_id, &deleted.session_id, deleted.seat_number)
            .await
        {
            // The ticket is gone; the seat is now a ghost lock until the
            // sweep reverts it.
            error!(
                ticket_id,
                listing_id = deleted.listing_id,
                "seat release after ticket deletion failed: {}",
                e
            );
        }
        info!(ticket_id, user_id, "ticket deleted");
        Ok(deleted)
    }

    /* ---------- GHOST-LOCK SWEEP ---------- */

    /// Reverts booked seats that have no matching ticket and whose claim is
    /// older than the grace period. Recovery path for a crash between the
    /// seat write and the ticket write. Returns the number of reverted seats.
    pub async fn sweep_ghost_locks(&self) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.config.ghost_grace_seconds);
        let mut reverted: u64 = 0;

        for listing_id in self.repo.listing_ids().await? {
            let Some(listing) = self.repo.find_listing(listing_id).await? else {
                continue;
            };

            for session in &listing.sessions {
                for seat in &session.seats {
                    if !seat.is_booked {
                        continue;
                    }
                    // Seats claimed before booked_at existed count as aged.
                    let aged = seat.booked_at.map_or(true, |t| t < cutoff);
                    if !aged {
                        continue;
                    }
                    let has_ticket = self
                        .repo
                        .find_ticket_for_seat(listing_id, &session.id, seat.seat_number)
                        .await?
                        .is_some();
                    if has_ticket {
                        continue;
                    }

                    warn!(
                        listing_id,
                        session_id = %session.id,
                        seat_number = seat.seat_number,
                        "reverting ghost lock"
                    );
                    self.release_seat(listing_id, &session.id, seat.seat_number)
                        .await?;
                    reverted += 1;
                }
            }
        }

        if reverted > 0 {
            info!(reverted, "ghost-lock sweep reverted seats");
        }
        Ok(reverted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::testing::SequentialIdGenerator;
    use crate::repository::MemoryRepository;
    use chrono::TimeZone;

    fn test_config() -> BookingConfig {
        BookingConfig {
            claim_retries: 3,
            retry_backoff_ms: 1,
            ticket_insert_retries: 2,
            ghost_grace_seconds: 60,
            sweep_interval_seconds: 300,
        }
    }

    fn engine_with(config: BookingConfig) -> (ReservationEngine, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let engine = ReservationEngine::new(
            repo.clone(),
            Arc::new(SequentialIdGenerator::default()),
            config,
        );
        (engine, repo)
    }

    fn showtime() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 18, 30, 0).unwrap()
    }

    /// Creates listing 603 with one session over seats [1,2,3]; returns the
    /// session id.
    async fn seed(engine: &ReservationEngine) -> String {
        engine
            .create_listing(603, serde_json::json!({"title": "The Matrix"}))
            .await
            .unwrap();
        let listing = engine
            .add_session(603, showtime(), 12.5, &[1, 2, 3])
            .await
            .unwrap();
        listing.sessions[0].id.clone()
    }

    #[tokio::test]
    async fn booking_flow_scenario() {
        let (engine, _repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        // User A books seat 2.
        let ticket = engine.book_seat(603, &sid, 2, "user-a").await.unwrap();
        assert_eq!(ticket.seat_number, 2);
        assert_eq!(ticket.listing_id, 603);
        assert_eq!(ticket.session_id, sid);

        // User B races for the same seat.
        let err = engine.book_seat(603, &sid, 2, "user-b").await.unwrap_err();
        assert!(matches!(err, Error::SeatAlreadyBooked(2)));

        // Available seats are [1, 3].
        let free: Vec<i32> = engine
            .available_seats(603, &sid)
            .await
            .unwrap()
            .iter()
            .map(|s| s.seat_number)
            .collect();
        assert_eq!(free, vec![1, 3]);
    }

    #[tokio::test]
    async fn concurrent_claims_have_exactly_one_winner() {
        let (engine, repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        let engine = Arc::new(engine);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = engine.clone();
                let sid = sid.clone();
                tokio::spawn(async move {
                    engine.book_seat(603, &sid, 2, &format!("user-{i}")).await
                })
            })
            .collect();

        let mut winners = 0;
        let mut conflicts = 0;
        for result in futures::future::join_all(handles).await {
            match result.unwrap() {
                Ok(_) => winners += 1,
                Err(Error::SeatAlreadyBooked(2)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(conflicts, 7);

        // Final state: seat booked, exactly one ticket referencing it.
        let seat_ticket = repo.find_ticket_for_seat(603, &sid, 2).await.unwrap();
        assert!(seat_ticket.is_some());
        let listing = repo.find_listing(603).await.unwrap().unwrap();
        assert!(listing.session(&sid).unwrap().seat(2).unwrap().is_booked);
    }

    #[tokio::test]
    async fn claim_retry_by_same_user_is_idempotent() {
        let (engine, repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        let first = engine.book_seat(603, &sid, 2, "user-a").await.unwrap();
        let second = engine.book_seat(603, &sid, 2, "user-a").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(repo.find_tickets_by_user("user-a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn not_found_errors_are_terminal() {
        let (engine, _repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        assert!(matches!(
            engine.book_seat(999, &sid, 1, "u").await.unwrap_err(),
            Error::ListingNotFound(999)
        ));
        assert!(matches!(
            engine.book_seat(603, "missing", 1, "u").await.unwrap_err(),
            Error::SessionNotFound(_)
        ));
        assert!(matches!(
            engine.book_seat(603, &sid, 42, "u").await.unwrap_err(),
            Error::SeatNotFound(42)
        ));
    }

    #[tokio::test]
    async fn ghost_lock_is_compensated_when_ticket_insert_keeps_failing() {
        let (engine, repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        // More failures than the insert retries allow.
        repo.fail_next_ticket_inserts(10);
        let err = engine.book_seat(603, &sid, 2, "user-a").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        // Seat reverted, no ticket: the claim failed cleanly.
        let listing = repo.find_listing(603).await.unwrap().unwrap();
        let seat = listing.session(&sid).unwrap().seat(2).unwrap();
        assert!(!seat.is_booked);
        assert!(seat.booked_at.is_none());
        assert!(repo
            .find_ticket_for_seat(603, &sid, 2)
            .await
            .unwrap()
            .is_none());

        // And the seat is claimable again.
        assert!(engine.book_seat(603, &sid, 2, "user-b").await.is_ok());
    }

    #[tokio::test]
    async fn transient_ticket_insert_failure_is_retried() {
        let (engine, repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        repo.fail_next_ticket_inserts(1);
        let ticket = engine.book_seat(603, &sid, 2, "user-a").await.unwrap();
        assert_eq!(ticket.seat_number, 2);
        let listing = repo.find_listing(603).await.unwrap().unwrap();
        assert!(listing.session(&sid).unwrap().seat(2).unwrap().is_booked);
    }

    #[tokio::test]
    async fn version_conflicts_are_retried_then_surfaced() {
        let (engine, repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        // Fewer conflicts than the retry limit: the claim goes through.
        repo.conflict_next_updates(2);
        assert!(engine.book_seat(603, &sid, 1, "user-a").await.is_ok());

        // Retries exhausted: surfaced as a conflict for the caller to re-poll.
        repo.conflict_next_updates(10);
        let err = engine.book_seat(603, &sid, 2, "user-b").await.unwrap_err();
        assert!(matches!(err, Error::VersionConflict(603)));
    }

    #[tokio::test]
    async fn edit_session_preserves_bookings() {
        let (engine, _repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        engine.book_seat(603, &sid, 2, "user-a").await.unwrap();

        // Shrink the layout to [5,6]; booked seat 2 must survive.
        let session = engine
            .edit_session(
                603,
                &sid,
                SessionUpdate {
                    seats: Some(vec![5, 6]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let numbers: Vec<i32> = session.seats.iter().map(|s| s.seat_number).collect();
        assert_eq!(numbers, vec![2, 5, 6]);
        assert!(session.seat(2).unwrap().is_booked);
    }

    #[tokio::test]
    async fn edit_session_replaces_time_and_price_wholesale() {
        let (engine, _repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        let new_time = Utc.with_ymd_and_hms(2025, 7, 4, 21, 0, 0).unwrap();
        let session = engine
            .edit_session(
                603,
                &sid,
                SessionUpdate {
                    date_time: Some(new_time),
                    price: Some(15.0),
                    seats: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(session.date_time, new_time);
        assert_eq!(session.price, 15.0);
        // Seat layout untouched.
        assert_eq!(session.seats.len(), 3);
    }

    #[tokio::test]
    async fn delete_ticket_requires_owner_and_releases_seat() {
        let (engine, repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        let ticket = engine.book_seat(603, &sid, 2, "user-a").await.unwrap();

        assert!(matches!(
            engine.delete_ticket(&ticket.id, "user-b").await.unwrap_err(),
            Error::Forbidden
        ));

        let deleted = engine.delete_ticket(&ticket.id, "user-a").await.unwrap();
        assert_eq!(deleted.id, ticket.id);

        // Seat released, ticket gone; the seat is bookable again.
        let listing = repo.find_listing(603).await.unwrap().unwrap();
        assert!(!listing.session(&sid).unwrap().seat(2).unwrap().is_booked);
        assert!(engine.book_seat(603, &sid, 2, "user-b").await.is_ok());
    }

    #[tokio::test]
    async fn delete_session_keeps_tickets() {
        let (engine, repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        let ticket = engine.book_seat(603, &sid, 2, "user-a").await.unwrap();
        engine.delete_session(603, &sid).await.unwrap();

        assert!(matches!(
            engine.session_by_id(603, &sid).await.unwrap_err(),
            Error::SessionNotFound(_)
        ));
        // The ticket survives as the user's proof of purchase.
        assert!(repo.find_ticket(&ticket.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sessions_on_date_filters_by_calendar_day() {
        let (engine, _repo) = engine_with(test_config());
        engine
            .create_listing(603, serde_json::json!({}))
            .await
            .unwrap();
        engine
            .add_session(603, showtime(), 10.0, &[1])
            .await
            .unwrap();
        engine
            .add_session(
                603,
                Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
                10.0,
                &[1],
            )
            .await
            .unwrap();

        let june_first = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let sessions = engine.sessions_on_date(603, june_first).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].date_time, showtime());
    }

    #[tokio::test]
    async fn sweep_reverts_aged_ghost_locks_only() {
        let (engine, repo) = engine_with(test_config());
        let sid = seed(&engine).await;

        // A legitimate booking: seat 1 with a ticket.
        engine.book_seat(603, &sid, 1, "user-a").await.unwrap();

        // An aged ghost: seat 2 booked long ago, no ticket behind it.
        let sid_for_mutator = sid.clone();
        repo.update_listing(603, &move |listing: &mut Listing| {
            let seat = listing
                .session_mut(&sid_for_mutator)?
                .seat_mut(2)
                .ok_or(Error::SeatNotFound(2))?;
            seat.is_booked = true;
            seat.booked_at = Some(Utc::now() - chrono::Duration::seconds(3600));
            Ok(())
        })
        .await
        .unwrap();

        // A fresh claim mid-flight: seat 3 booked just now, no ticket yet.
        let sid_for_mutator = sid.clone();
        repo.update_listing(603, &move |listing: &mut Listing| {
            let seat = listing
                .session_mut(&sid_for_mutator)?
                .seat_mut(3)
                .ok_or(Error::SeatNotFound(3))?;
            seat.is_booked = true;
            seat.booked_at = Some(Utc::now());
            Ok(())
        })
        .await
        .unwrap();

        let reverted = engine.sweep_ghost_locks().await.unwrap();
        assert_eq!(reverted, 1);

        let listing = repo.find_listing(603).await.unwrap().unwrap();
        let session = listing.session(&sid).unwrap();
        assert!(session.seat(1).unwrap().is_booked, "ticketed seat kept");
        assert!(!session.seat(2).unwrap().is_booked, "aged ghost reverted");
        assert!(session.seat(3).unwrap().is_booked, "fresh claim spared");
    }

    #[tokio::test]
    async fn listing_lifecycle() {
        let (engine, _repo) = engine_with(test_config());
        engine
            .create_listing(603, serde_json::json!({"title": "The Matrix"}))
            .await
            .unwrap();

        assert!(matches!(
            engine.create_listing(603, serde_json::json!({})).await,
            Err(Error::ListingExists(603))
        ));

        assert_eq!(engine.list_listings().await.unwrap().len(), 1);
        assert_eq!(engine.get_listing(603).await.unwrap().listing_id, 603);

        engine.delete_listing(603).await.unwrap();
        assert!(matches!(
            engine.get_listing(603).await,
            Err(Error::ListingNotFound(603))
        ));
    }
}
