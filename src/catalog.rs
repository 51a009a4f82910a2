use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

use crate::config::CatalogConfig;
use crate::error::{Error, Result};

/// Display metadata snapshotted from the external movie catalog when a
/// listing is created. Unknown fields from the upstream payload are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Client for the external movie catalog. Its failures block listing
/// creation but never affect booking.
#[derive(Clone)]
pub struct CatalogClient {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl CatalogClient {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Fetches details for one movie. `Ok(None)` when the catalog does not
    /// know the id; `Err(Catalog)` on transport or upstream failures.
    pub async fn movie_details(&self, movie_id: i64) -> Result<Option<MovieMetadata>> {
        let url = format!("{}/movie/{}", self.base_url, movie_id);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("language", "en-US")])
            .send()
            .await
            .map_err(|e| {
                error!("catalog request failed for movie {}: {}", movie_id, e);
                Error::Catalog(e.to_string())
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            error!(
                "catalog returned {} for movie {}",
                response.status(),
                movie_id
            );
            return Err(Error::Catalog(format!(
                "catalog responded with status {}",
                response.status()
            )));
        }

        let metadata = response
            .json::<MovieMetadata>()
            .await
            .map_err(|e| Error::Catalog(e.to_string()))?;
        Ok(Some(metadata))
    }
}
