//! Step library catalog over HTTP.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::info;

use aggregator_core::{AggregatorError, AggregatorResult, Catalog, CatalogSource};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::http::expect_status;

pub struct SteplibClient {
    http: reqwest::Client,
    spec_url: String,
}

impl SteplibClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        if config.steplib_spec_url.trim().is_empty() {
            return Err(ServiceError::MissingSetting("STEPLIB_SPEC_URL"));
        }
        Ok(Self {
            http: config.http_client()?,
            spec_url: config.steplib_spec_url.clone(),
        })
    }

    /// Download the raw `spec.json`.
    pub async fn spec_json(&self) -> ServiceResult<Vec<u8>> {
        info!(url = %self.spec_url, "fetching step library");
        let response = self.http.get(&self.spec_url).send().await?;
        let response = expect_status(&self.spec_url, response, StatusCode::OK).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl CatalogSource for SteplibClient {
    async fn fetch_catalog(&self) -> AggregatorResult<Catalog> {
        let bytes = self
            .spec_json()
            .await
            .map_err(|e| AggregatorError::Catalog(e.to_string()))?;
        Catalog::from_json(&bytes)
    }
}
