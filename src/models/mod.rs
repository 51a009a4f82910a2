pub mod listing;
pub mod ticket;

pub use listing::{Listing, Seat, Session};
pub use ticket::Ticket;
