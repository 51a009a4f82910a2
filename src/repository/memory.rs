use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{Listing, Ticket};
use crate::repository::{ListingMutator, ListingRepository};

#[derive(Default)]
struct Inner {
    listings: HashMap<i64, Listing>,
    tickets: Vec<Ticket>,
}

/// In-memory repository with the same CAS contract as the Postgres one.
/// Backs the engine tests and is handy for running the service without a
/// database. The fault counters let tests force storage failures on specific
/// operations.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
    fail_ticket_inserts: AtomicU32,
    conflict_updates: AtomicU32,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces the next `n` `insert_ticket` calls to fail with `Storage`.
    pub fn fail_next_ticket_inserts(&self, n: u32) {
        self.fail_ticket_inserts.store(n, Ordering::SeqCst);
    }

    /// Forces the next `n` `update_listing` calls to fail with
    /// `VersionConflict`, as if a concurrent writer kept winning.
    pub fn conflict_next_updates(&self, n: u32) {
        self.conflict_updates.store(n, Ordering::SeqCst);
    }

    fn take_fault(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ListingRepository for MemoryRepository {
    async fn insert_listing(&self, listing: &Listing) -> Result<()> {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        if inner.listings.contains_key(&listing.listing_id) {
            return Err(Error::ListingExists(listing.listing_id));
        }
        inner.listings.insert(listing.listing_id, listing.clone());
        Ok(())
    }

    async fn find_listing(&self, listing_id: i64) -> Result<Option<Listing>> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        Ok(inner.listings.get(&listing_id).cloned())
    }

    async fn list_listings(&self) -> Result<Vec<Listing>> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        let mut listings: Vec<Listing> = inner.listings.values().cloned().collect();
        listings.sort_by_key(|l| l.listing_id);
        Ok(listings)
    }

    async fn delete_listing(&self, listing_id: i64) -> Result<Option<Listing>> {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        Ok(inner.listings.remove(&listing_id))
    }

    async fn listing_ids(&self) -> Result<Vec<i64>> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        Ok(inner.listings.keys().copied().collect())
    }

    async fn update_listing(
        &self,
        listing_id: i64,
        mutate: ListingMutator<'_>,
    ) -> Result<Listing> {
        if Self::take_fault(&self.conflict_updates) {
            return Err(Error::VersionConflict(listing_id));
        }

        let mut inner = self.inner.lock().expect("repository lock poisoned");
        let listing = inner
            .listings
            .get_mut(&listing_id)
            .ok_or(Error::ListingNotFound(listing_id))?;

        // The lock already serializes writers, so the CAS cannot lose here;
        // mutate a copy anyway so a failing mutator leaves no partial write.
        let mut updated = listing.clone();
        mutate(&mut updated)?;
        updated.version = listing.version + 1;
        *listing = updated.clone();
        Ok(updated)
    }

    /* ---------- tickets ---------- */

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        if Self::take_fault(&self.fail_ticket_inserts) {
            return Err(Error::Storage("injected ticket insert failure".into()));
        }

        let mut inner = self.inner.lock().expect("repository lock poisoned");
        let duplicate = inner.tickets.iter().any(|t| {
            t.listing_id == ticket.listing_id
                && t.session_id == ticket.session_id
                && t.seat_number == ticket.seat_number
        });
        if duplicate {
            return Err(Error::TicketExists);
        }
        inner.tickets.push(ticket.clone());
        Ok(())
    }

    async fn find_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        Ok(inner.tickets.iter().find(|t| t.id == ticket_id).cloned())
    }

    async fn find_ticket_for_seat(
        &self,
        listing_id: i64,
        session_id: &str,
        seat_number: i32,
    ) -> Result<Option<Ticket>> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        Ok(inner
            .tickets
            .iter()
            .find(|t| {
                t.listing_id == listing_id
                    && t.session_id == session_id
                    && t.seat_number == seat_number
            })
            .cloned())
    }

    async fn find_tickets_by_user(&self, user_id: &str) -> Result<Vec<Ticket>> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
        Ok(tickets)
    }

    async fn delete_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        let idx = inner.tickets.iter().position(|t| t.id == ticket_id);
        Ok(idx.map(|i| inner.tickets.remove(i)))
    }
}
