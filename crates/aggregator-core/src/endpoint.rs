//! Endpoint resolution: repository webhooks → one build target and token.
//!
//! A repository is eligible only when every webhook callback points at the
//! same build target. Callback URLs look like
//! `https://hooks.example.io/h/github/<app-slug>/<trigger-token>`.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Endpoint, RepoRef, Webhook};
use crate::error::{AggregatorError, AggregatorResult};
use crate::remote::WebhookProvider;

/// Markers used to pick identifiers out of URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Text preceding `owner/name` in repository URLs.
    pub host_marker: String,
    /// Text preceding `app-slug/token` in webhook callback URLs.
    pub hook_marker: String,
    /// Event a hook must subscribe to when several hooks exist.
    pub pull_request_event: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            host_marker: "github.com/".to_string(),
            hook_marker: "github/".to_string(),
            pull_request_event: "pull_request".to_string(),
        }
    }
}

/// Extract `{owner, name}` from a repository URL.
pub fn parse_repo(url: &str, host_marker: &str) -> AggregatorResult<RepoRef> {
    let invalid = || AggregatorError::InvalidRepositoryUrl(url.to_string());
    let (_, path) = url.split_once(host_marker).ok_or_else(invalid)?;
    let mut segments = path.split('/');
    match (segments.next(), segments.next()) {
        (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
            Ok(RepoRef::new(owner, name.strip_suffix(".git").unwrap_or(name)))
        }
        _ => Err(invalid()),
    }
}

/// The `n`th path segment after `marker`, if present and non-empty.
fn segment_after<'a>(url: &'a str, marker: &str, n: usize) -> Option<&'a str> {
    let (_, rest) = url.split_once(marker)?;
    rest.split('/').nth(n).filter(|s| !s.is_empty())
}

/// Build target identifier: first segment after the hook marker.
pub fn parse_app_slug(webhook_url: &str, hook_marker: &str) -> AggregatorResult<String> {
    segment_after(webhook_url, hook_marker, 0)
        .map(str::to_string)
        .ok_or_else(|| {
            AggregatorError::MalformedConfig(format!(
                "no build target after '{hook_marker}' in webhook url {webhook_url}"
            ))
        })
}

/// Trigger credential: second segment after the hook marker.
pub fn parse_trigger_token(webhook_url: &str, hook_marker: &str) -> AggregatorResult<String> {
    segment_after(webhook_url, hook_marker, 1)
        .map(str::to_string)
        .ok_or_else(|| {
            AggregatorError::MalformedConfig(format!(
                "no trigger token after '{hook_marker}' in webhook url {webhook_url}"
            ))
        })
}

/// Resolves the build endpoint of a repository from its webhooks.
pub struct EndpointResolver {
    provider: Arc<dyn WebhookProvider>,
    settings: ResolverSettings,
}

impl EndpointResolver {
    pub fn new(provider: Arc<dyn WebhookProvider>) -> Self {
        Self::with_settings(provider, ResolverSettings::default())
    }

    pub fn with_settings(provider: Arc<dyn WebhookProvider>, settings: ResolverSettings) -> Self {
        Self { provider, settings }
    }

    /// Resolve the endpoint for the repository at `source_url`.
    pub async fn resolve(&self, source_url: &str) -> AggregatorResult<Endpoint> {
        let repo = parse_repo(source_url, &self.settings.host_marker)?;

        let hooks = self
            .provider
            .list_hooks(&repo)
            .await
            .map_err(|e| match e {
                AggregatorError::Transport { detail, .. } => AggregatorError::Transport {
                    target: repo.to_string(),
                    detail,
                },
                other => AggregatorError::transport(repo.to_string(), other),
            })?;
        debug!(repo = %repo, hooks = hooks.len(), "fetched webhooks");

        self.endpoint_from_hooks(&repo, &hooks)
    }

    /// Pure part of [`EndpointResolver::resolve`], given the fetched hooks.
    pub fn endpoint_from_hooks(&self, repo: &RepoRef, hooks: &[Webhook]) -> AggregatorResult<Endpoint> {
        let marker = &self.settings.hook_marker;

        let mut targets: Vec<String> = Vec::new();
        for hook in hooks {
            let url = hook.callback_url().ok_or_else(|| {
                AggregatorError::MalformedConfig(format!(
                    "webhook of {repo} has no string url in config: {:?}",
                    hook.config
                ))
            })?;
            let slug = parse_app_slug(url, marker)?;
            if !targets.contains(&slug) {
                targets.push(slug);
            }
        }
        if targets.len() > 1 {
            return Err(AggregatorError::AmbiguousEndpoint {
                repo: repo.to_string(),
                targets,
            });
        }

        let hook = self.select_pull_request_hook(repo, hooks)?;
        // Presence of the url was checked above.
        let url = hook.callback_url().unwrap_or_default();
        Ok(Endpoint {
            app_slug: parse_app_slug(url, marker)?,
            trigger_token: parse_trigger_token(url, marker)?,
        })
    }

    fn select_pull_request_hook<'h>(
        &self,
        repo: &RepoRef,
        hooks: &'h [Webhook],
    ) -> AggregatorResult<&'h Webhook> {
        match hooks {
            [] => Err(AggregatorError::NoEndpoint {
                repo: repo.to_string(),
            }),
            [only] => Ok(only),
            many => many
                .iter()
                .find(|h| h.subscribes_to(&self.settings.pull_request_event))
                .ok_or_else(|| AggregatorError::NoPullRequestHook {
                    repo: repo.to_string(),
                    hooks: many.len(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryWebhookProvider;

    const HOOK_URL: &str = "https://hooks.example.io/h/github/82ac2cda76a2755f/0WJcNWSv-0rO-RRAd_6ZGw";
    const REPO_URL: &str = "https://github.com/bitrise-steplib/steps-git-clone.git";

    fn resolver(provider: MemoryWebhookProvider) -> EndpointResolver {
        EndpointResolver::new(Arc::new(provider))
    }

    #[test]
    fn test_parse_callback_segments() {
        assert_eq!(parse_app_slug(HOOK_URL, "github/").unwrap(), "82ac2cda76a2755f");
        assert_eq!(
            parse_trigger_token(HOOK_URL, "github/").unwrap(),
            "0WJcNWSv-0rO-RRAd_6ZGw"
        );
    }

    #[test]
    fn test_parse_callback_without_marker_is_malformed() {
        let err = parse_app_slug("https://chat.example.io/services/T000/B000", "github/").unwrap_err();
        assert!(matches!(err, AggregatorError::MalformedConfig(_)));

        let err = parse_trigger_token("https://hooks.example.io/h/github/only-slug", "github/")
            .unwrap_err();
        assert!(matches!(err, AggregatorError::MalformedConfig(_)));
    }

    #[test]
    fn test_parse_repo_strips_git_suffix() {
        let repo = parse_repo(REPO_URL, "github.com/").unwrap();
        assert_eq!(repo, RepoRef::new("bitrise-steplib", "steps-git-clone"));

        let repo = parse_repo("https://github.com/bitrise-io/steps-script", "github.com/").unwrap();
        assert_eq!(repo.name, "steps-script");
    }

    #[test]
    fn test_parse_repo_rejects_foreign_or_short_urls() {
        assert!(matches!(
            parse_repo("https://gitlab.com/org/repo.git", "github.com/"),
            Err(AggregatorError::InvalidRepositoryUrl(_))
        ));
        assert!(matches!(
            parse_repo("https://github.com/org", "github.com/"),
            Err(AggregatorError::InvalidRepositoryUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_single_hook_resolves() {
        let provider = MemoryWebhookProvider::new()
            .with_hooks("bitrise-steplib/steps-git-clone", vec![Webhook::new(&["push"], HOOK_URL)]);
        let endpoint = resolver(provider).resolve(REPO_URL).await.unwrap();
        assert_eq!(endpoint.app_slug, "82ac2cda76a2755f");
        assert_eq!(endpoint.trigger_token, "0WJcNWSv-0rO-RRAd_6ZGw");
    }

    #[tokio::test]
    async fn test_resolution_is_deterministic() {
        let provider = MemoryWebhookProvider::new().with_hooks(
            "bitrise-steplib/steps-git-clone",
            vec![
                Webhook::new(&["push"], "https://hooks.example.io/h/github/app1/push-token"),
                Webhook::new(&["pull_request"], "https://hooks.example.io/h/github/app1/pr-token"),
            ],
        );
        let resolver = resolver(provider);
        let first = resolver.resolve(REPO_URL).await.unwrap();
        let second = resolver.resolve(REPO_URL).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.trigger_token, "pr-token");
    }

    #[tokio::test]
    async fn test_distinct_targets_are_ambiguous() {
        let provider = MemoryWebhookProvider::new().with_hooks(
            "bitrise-steplib/steps-git-clone",
            vec![
                Webhook::new(&["pull_request"], "https://hooks.example.io/h/github/A/t1"),
                Webhook::new(&["pull_request"], "https://hooks.example.io/h/github/B/t2"),
            ],
        );
        let err = resolver(provider).resolve(REPO_URL).await.unwrap_err();
        match err {
            AggregatorError::AmbiguousEndpoint { targets, .. } => {
                assert_eq!(targets, vec!["A".to_string(), "B".to_string()]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_hooks_is_no_endpoint() {
        let provider = MemoryWebhookProvider::new().with_hooks("bitrise-steplib/steps-git-clone", vec![]);
        let err = resolver(provider).resolve(REPO_URL).await.unwrap_err();
        assert!(matches!(err, AggregatorError::NoEndpoint { .. }));
    }

    #[tokio::test]
    async fn test_several_hooks_without_pull_request_event() {
        let provider = MemoryWebhookProvider::new().with_hooks(
            "bitrise-steplib/steps-git-clone",
            vec![
                Webhook::new(&["push"], "https://hooks.example.io/h/github/app1/t1"),
                Webhook::new(&["release"], "https://hooks.example.io/h/github/app1/t2"),
            ],
        );
        let err = resolver(provider).resolve(REPO_URL).await.unwrap_err();
        assert!(matches!(err, AggregatorError::NoPullRequestHook { hooks: 2, .. }));
    }

    #[tokio::test]
    async fn test_hook_without_string_url_is_malformed() {
        let mut hook = Webhook::new(&["pull_request"], HOOK_URL);
        hook.config.insert("url".to_string(), serde_json::Value::Null);
        let provider = MemoryWebhookProvider::new()
            .with_hooks("bitrise-steplib/steps-git-clone", vec![hook]);
        let err = resolver(provider).resolve(REPO_URL).await.unwrap_err();
        assert!(matches!(err, AggregatorError::MalformedConfig(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_names_repository() {
        let provider = MemoryWebhookProvider::new();
        let err = resolver(provider).resolve(REPO_URL).await.unwrap_err();
        match err {
            AggregatorError::Transport { target, .. } => {
                assert_eq!(target, "bitrise-steplib/steps-git-clone");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
