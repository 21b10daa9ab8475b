//! GitHub REST client for repository webhooks.

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use tracing::debug;

use aggregator_core::{AggregatorResult, RepoRef, Webhook, WebhookProvider};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::http::{expect_status, read_json};

/// Hooks requested per page; repositories rarely carry more.
const HOOKS_PER_PAGE: u32 = 100;

pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GithubClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        if config.github_token.trim().is_empty() {
            return Err(ServiceError::MissingSetting("GITHUB_ACCESS_TOKEN"));
        }
        Ok(Self {
            http: config.http_client()?,
            base_url: config.github_api_url.clone(),
            token: config.github_token.clone(),
        })
    }

    /// `GET /repos/{owner}/{name}/hooks`, 200 expected.
    pub async fn list_repo_hooks(&self, repo: &RepoRef) -> ServiceResult<Vec<Webhook>> {
        let url = format!(
            "{}/repos/{}/{}/hooks?per_page={}",
            self.base_url, repo.owner, repo.name, HOOKS_PER_PAGE
        );
        debug!(url = %url, "listing webhooks");

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, format!("token {}", self.token))
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        let response = expect_status(&url, response, StatusCode::OK).await?;
        read_json(&url, response).await
    }
}

#[async_trait]
impl WebhookProvider for GithubClient {
    async fn list_hooks(&self, repo: &RepoRef) -> AggregatorResult<Vec<Webhook>> {
        Ok(self.list_repo_hooks(repo).await?)
    }
}
