use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{
    catalog::CatalogClient,
    config::Config,
    controllers,
    database::Database,
    ids::UuidGenerator,
    repository::PostgresRepository,
    services::{booking::ReservationEngine, sweep},
    AppState,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cinema Booking API");

    // Connect to the database
    let db = Database::connect(&config.database)
        .await
        .expect("Failed to connect to database");
    info!("Database connected");

    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    let repo = Arc::new(PostgresRepository::new(db.pool.clone()));
    let engine = ReservationEngine::new(repo, Arc::new(UuidGenerator), config.booking.clone());
    let catalog = CatalogClient::from_config(&config.catalog);

    let app_state = Arc::new(AppState {
        engine: engine.clone(),
        catalog,
        config: config.clone(),
    });

    // Background task: revert booked seats that never got their ticket.
    let sweep_interval = config.booking.sweep_interval_seconds;
    task::spawn(async move {
        sweep::run(engine, sweep_interval).await;
    });

    // --- Start the web server ---

    let app = Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.app.host, config.app.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
