use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Members resolved per batched lookup call.
pub const DEFAULT_MEMBER_BATCH_SIZE: usize = 50;

/// Upper bound on metadata requests in flight at once.
pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Host of the course-content progress API.
pub const DEFAULT_SOURCE_BASE_URL: &str = "http://localhost:8084";

// ── Environment ───────────────────────────────────────────────────────────────

/// Back-office deployment the pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Qa,
    #[default]
    Staging,
    Production,
    Local,
}

impl Environment {
    /// Parse an environment name case-insensitively.
    ///
    /// Unknown names fall back to [`Environment::Staging`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "dev" => Environment::Dev,
            "qa" => Environment::Qa,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            "local" => Environment::Local,
            other => {
                tracing::warn!("unknown environment \"{}\", using staging", other);
                Environment::Staging
            }
        }
    }

    /// Back-office API root for this environment.
    pub fn api_base_url(&self) -> &'static str {
        match self {
            Environment::Dev => "https://api.dev.skillflo.io/api/backoffice",
            Environment::Qa => "https://api.qa.skillflo.io/api/backoffice",
            Environment::Staging => "https://api.staging.skillflo.io/api/backoffice",
            Environment::Production => "https://api.skillflo.io/api/backoffice",
            Environment::Local => "http://localhost:3000/api/backoffice",
        }
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Pipeline configuration. Every field has a default, so a partial JSON
/// document is enough to override a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: Environment,
    /// Overrides the environment's back-office root when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    pub source_base_url: String,
    pub member_batch_size: usize,
    pub max_concurrent_lookups: usize,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            api_base_url: None,
            source_base_url: DEFAULT_SOURCE_BASE_URL.to_string(),
            member_batch_size: DEFAULT_MEMBER_BATCH_SIZE,
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_level: "INFO".to_string(),
        }
    }
}

impl Settings {
    /// Defaults for `environment`.
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    /// Parse settings from a JSON document and validate them.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.member_batch_size == 0 {
            return Err(ReportError::Config(
                "member_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_lookups == 0 {
            return Err(ReportError::Config(
                "max_concurrent_lookups must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ReportError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.source_base_url.trim().is_empty() {
            return Err(ReportError::Config("source_base_url is empty".to_string()));
        }
        Ok(())
    }

    /// Effective back-office root, without a trailing slash.
    pub fn resolved_api_base_url(&self) -> String {
        self.api_base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.api_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Effective progress-API host, without a trailing slash.
    pub fn resolved_source_base_url(&self) -> String {
        self.source_base_url.trim_end_matches('/').to_string()
    }
}
