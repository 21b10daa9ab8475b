//! Service configuration
//!
//! Endpoints, credentials and tool locations for the real collaborators.
//! Everything is passed explicitly into each client's constructor.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_BITRISE_API_URL: &str = "https://api.bitrise.io/v0.1";
pub const DEFAULT_BITRISE_APP_URL: &str = "https://app.bitrise.io";

/// Configuration shared by the service clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the GitHub REST API
    pub github_api_url: String,
    /// Personal access token for listing repository hooks
    pub github_token: String,
    /// Base URL of the Bitrise REST API
    pub bitrise_api_url: String,
    /// Base URL hosting the build trigger endpoint
    pub bitrise_app_url: String,
    /// Bitrise API token
    pub bitrise_token: String,
    /// Location of the step library `spec.json`
    pub steplib_spec_url: String,
    pub bitrise_program: PathBuf,
    pub envman_program: PathBuf,
    /// Upper bound for one CLI invocation
    pub command_timeout: Duration,
    /// Upper bound for one HTTP request
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_token: String::new(),
            bitrise_api_url: DEFAULT_BITRISE_API_URL.to_string(),
            bitrise_app_url: DEFAULT_BITRISE_APP_URL.to_string(),
            bitrise_token: String::new(),
            steplib_spec_url: String::new(),
            bitrise_program: PathBuf::from("bitrise"),
            envman_program: PathBuf::from("envman"),
            command_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServiceConfig {
    /// Create config with both API tokens and default endpoints
    pub fn new(github_token: &str, bitrise_token: &str) -> Self {
        ServiceConfig {
            github_token: github_token.to_string(),
            bitrise_token: bitrise_token.to_string(),
            ..Self::default()
        }
    }

    pub fn with_github_api_url(mut self, url: &str) -> Self {
        self.github_api_url = normalize_base_url(url);
        self
    }

    pub fn with_bitrise_api_url(mut self, url: &str) -> Self {
        self.bitrise_api_url = normalize_base_url(url);
        self
    }

    pub fn with_bitrise_app_url(mut self, url: &str) -> Self {
        self.bitrise_app_url = normalize_base_url(url);
        self
    }

    pub fn with_steplib_spec_url(mut self, url: &str) -> Self {
        self.steplib_spec_url = url.trim().to_string();
        self
    }

    pub fn with_bitrise_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.bitrise_program = program.into();
        self
    }

    pub fn with_envman_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.envman_program = program.into();
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Fail on empty credentials or endpoints.
    pub fn validate(&self) -> ServiceResult<()> {
        let required = [
            ("GITHUB_ACCESS_TOKEN", &self.github_token),
            ("BITRISE_API_TOKEN", &self.bitrise_token),
            ("STEPLIB_SPEC_URL", &self.steplib_spec_url),
            ("GITHUB_API_URL", &self.github_api_url),
            ("BITRISE_API_URL", &self.bitrise_api_url),
            ("BITRISE_APP_URL", &self.bitrise_app_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ServiceError::MissingSetting(name));
            }
        }
        Ok(())
    }

    /// Shared HTTP client honouring the request timeout.
    pub fn http_client(&self) -> ServiceResult<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .user_agent(concat!("build-aggregator/", env!("CARGO_PKG_VERSION")))
            .timeout(self.request_timeout)
            .build()?)
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
