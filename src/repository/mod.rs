pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Listing, Ticket};

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Mutation applied to a listing under the repository's atomic update. The
/// mutator may be invoked more than once when the engine retries a version
/// conflict, so it must not carry one-shot side effects.
pub type ListingMutator<'a> = &'a (dyn Fn(&mut Listing) -> Result<()> + Send + Sync);

/// Storage contract for the reservation engine: atomic read-modify-write on a
/// listing aggregate plus insert/lookup/delete on the ticket ledger. All
/// coordination happens through these primitives; the engine holds no locks
/// across I/O.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /* ---------- listings ---------- */

    /// Inserts a fresh listing. `ListingExists` when the id is taken.
    async fn insert_listing(&self, listing: &Listing) -> Result<()>;

    async fn find_listing(&self, listing_id: i64) -> Result<Option<Listing>>;

    async fn list_listings(&self) -> Result<Vec<Listing>>;

    /// Removes a listing, returning it if it existed. Tickets referencing it
    /// are left alone (they reference by value).
    async fn delete_listing(&self, listing_id: i64) -> Result<Option<Listing>>;

    /// All known listing ids, for the ghost-lock sweep.
    async fn listing_ids(&self) -> Result<Vec<i64>>;

    /// Single compare-and-swap attempt: reads the listing, applies `mutate`,
    /// writes back only if the stored version is unchanged. Fails with
    /// `VersionConflict` when a concurrent mutation won the race; the caller
    /// owns the retry loop. Returns the listing as written.
    async fn update_listing(
        &self,
        listing_id: i64,
        mutate: ListingMutator<'_>,
    ) -> Result<Listing>;

    /* ---------- tickets ---------- */

    /// Appends a ticket to the ledger. `TicketExists` when a live ticket
    /// already references the same (listing, session, seat) tuple.
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()>;

    async fn find_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>>;

    async fn find_ticket_for_seat(
        &self,
        listing_id: i64,
        session_id: &str,
        seat_number: i32,
    ) -> Result<Option<Ticket>>;

    async fn find_tickets_by_user(&self, user_id: &str) -> Result<Vec<Ticket>>;

    /// Removes a ticket, returning it if it existed. Ownership is checked by
    /// the engine, not here.
    async fn delete_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>>;
}
