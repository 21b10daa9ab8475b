//! Bitrise REST client: configuration, build trigger and build status.

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use aggregator_core::{AggregatorResult, BuildService, BuildStatus, TriggerResponse};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::http::{expect_status, read_json};

#[derive(Debug, Serialize)]
struct HookInfo<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    build_trigger_token: &'a str,
}

#[derive(Debug, Serialize)]
struct BuildParams<'a> {
    workflow_id: &'a str,
}

/// Body of `POST /app/{app}/build/start.json`.
#[derive(Debug, Serialize)]
struct TriggerRequest<'a> {
    hook_info: HookInfo<'a>,
    build_params: BuildParams<'a>,
}

#[derive(Debug, Deserialize)]
struct BuildEnvelope {
    data: BuildStatus,
}

pub struct BitriseClient {
    http: reqwest::Client,
    api_url: String,
    app_url: String,
    token: String,
}

impl BitriseClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        if config.bitrise_token.trim().is_empty() {
            return Err(ServiceError::MissingSetting("BITRISE_API_TOKEN"));
        }
        Ok(Self {
            http: config.http_client()?,
            api_url: config.bitrise_api_url.clone(),
            app_url: config.bitrise_app_url.clone(),
            token: config.bitrise_token.clone(),
        })
    }

    fn authorization(&self) -> String {
        format!("token {}", self.token)
    }

    /// `GET {api}/apps/{app}/bitrise.yml`, 200 expected, raw bytes.
    pub async fn bitrise_yml(&self, app_slug: &str) -> ServiceResult<Vec<u8>> {
        let url = format!("{}/apps/{}/bitrise.yml", self.api_url, app_slug);
        debug!(url = %url, "get bitrise.yml");

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, self.authorization())
            .send()
            .await?;
        let response = expect_status(&url, response, StatusCode::OK).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `POST {app}/app/{app}/build/start.json`.
    ///
    /// Any HTTP status is returned as-is; a body that is not JSON is kept as
    /// a JSON string.
    pub async fn start_build(
        &self,
        app_slug: &str,
        workflow: &str,
        trigger_token: &str,
    ) -> ServiceResult<TriggerResponse> {
        let url = format!("{}/app/{}/build/start.json", self.app_url, app_slug);
        let request = TriggerRequest {
            hook_info: HookInfo {
                kind: "bitrise",
                build_trigger_token: trigger_token,
            },
            build_params: BuildParams {
                workflow_id: workflow,
            },
        };
        debug!(url = %url, workflow, "start build");

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.authorization())
            .json(&request)
            .send()
            .await?;
        let http_status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
        Ok(TriggerResponse { http_status, body })
    }

    /// `GET {api}/apps/{app}/builds/{build}`, 200 expected.
    pub async fn build_status(&self, app_slug: &str, build_slug: &str) -> ServiceResult<BuildStatus> {
        let url = format!("{}/apps/{}/builds/{}", self.api_url, app_slug, build_slug);
        debug!(url = %url, "get build info");

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, self.authorization())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let response = expect_status(&url, response, StatusCode::OK).await?;
        let envelope: BuildEnvelope = read_json(&url, response).await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl BuildService for BitriseClient {
    async fn fetch_config(&self, app_slug: &str) -> AggregatorResult<Vec<u8>> {
        Ok(self.bitrise_yml(app_slug).await?)
    }

    async fn trigger(
        &self,
        app_slug: &str,
        workflow: &str,
        trigger_token: &str,
    ) -> AggregatorResult<TriggerResponse> {
        Ok(self.start_build(app_slug, workflow, trigger_token).await?)
    }

    async fn fetch_status(&self, app_slug: &str, build_slug: &str) -> AggregatorResult<BuildStatus> {
        Ok(self.build_status(app_slug, build_slug).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trigger_request_shape() {
        let request = TriggerRequest {
            hook_info: HookInfo {
                kind: "bitrise",
                build_trigger_token: "tok",
            },
            build_params: BuildParams { workflow_id: "ci" },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "hook_info": {"type": "bitrise", "build_trigger_token": "tok"},
                "build_params": {"workflow_id": "ci"}
            })
        );
    }

    #[test]
    fn test_build_envelope_ignores_extra_fields() {
        let envelope: BuildEnvelope = serde_json::from_value(json!({
            "data": {"status": 2, "status_text": "error", "slug": "b", "triggered_workflow": "ci"}
        }))
        .unwrap();
        assert_eq!(envelope.data, BuildStatus::new(2, "error"));
    }
}
