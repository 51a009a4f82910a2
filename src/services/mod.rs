pub mod booking;
pub mod sweep;
