use serde::Deserialize;
use std::env;

// Top-level configuration container, filled from the environment at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub catalog: CatalogConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Verification settings for bearer tokens minted by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

// External movie catalog service.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

// Knobs for the seat-claim protocol and the ghost-lock sweep.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Bounded retries for optimistic-concurrency conflicts on a claim.
    pub claim_retries: u32,
    /// Base backoff between retries; scaled linearly by attempt.
    pub retry_backoff_ms: u64,
    /// Bounded retries for the ticket write before compensation kicks in.
    pub ticket_insert_retries: u32,
    /// How long a booked seat may sit without a ticket before the sweep
    /// reverts it.
    pub ghost_grace_seconds: i64,
    pub sweep_interval_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_booking=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            },
            catalog: CatalogConfig {
                base_url: env::var("CATALOG_BASE_URL")
                    .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string()),
                api_key: env::var("CATALOG_API_KEY").expect("CATALOG_API_KEY must be set"),
                timeout_seconds: env::var("CATALOG_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("CATALOG_TIMEOUT_SECONDS must be a valid number"),
            },
            booking: BookingConfig {
                claim_retries: env::var("CLAIM_RETRIES")
                    .unwrap_or_else(|_| "4".to_string())
                    .parse()
                    .expect("CLAIM_RETRIES must be a valid number"),
                retry_backoff_ms: env::var("CLAIM_RETRY_BACKOFF_MS")
                    .unwrap_or_else(|_| "25".to_string())
                    .parse()
                    .expect("CLAIM_RETRY_BACKOFF_MS must be a valid number"),
                ticket_insert_retries: env::var("TICKET_INSERT_RETRIES")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("TICKET_INSERT_RETRIES must be a valid number"),
                ghost_grace_seconds: env::var("GHOST_GRACE_SECONDS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()
                    .expect("GHOST_GRACE_SECONDS must be a valid number"),
                sweep_interval_seconds: env::var("SWEEP_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .expect("SWEEP_INTERVAL_SECONDS must be a valid number"),
            },
        }
    }
}
