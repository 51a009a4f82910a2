pub mod listings;
pub mod sessions;
pub mod tickets;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(listings::routes())
        .merge(sessions::routes())
        .merge(tickets::routes())
}
