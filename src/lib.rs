pub mod catalog;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;

use catalog::CatalogClient;
use services::booking::ReservationEngine;

// Shared state for the whole application. Storage is reached only through
// the engine's repository; controllers never touch the pool directly.
#[derive(Clone)]
pub struct AppState {
    pub engine: ReservationEngine,
    pub catalog: CatalogClient,
    pub config: config::Config,
}
