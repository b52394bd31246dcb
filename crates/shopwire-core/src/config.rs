//! Orchestration configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::retry::RetryPolicy;

/// Oldest API version the library is tested against.
pub const DEFAULT_API_VERSION: ApiVersion = ApiVersion::Release {
    year: 2024,
    month: 1,
};

/// Largest page size the REST API accepts.
pub const MAX_PAGE_LIMIT: u32 = 250;

/// Status codes retried by the REST walker.
pub const DEFAULT_RETRY_ON_STATUS: [u16; 6] = [429, 500, 502, 503, 504, 520];

/// Admin API version slug, e.g. `2024-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ApiVersion {
    /// Dated release.
    Release {
        /// Year.
        year: u16,
        /// Month (1-12).
        month: u8,
    },
    /// The `unstable` channel.
    Unstable,
}

impl Default for ApiVersion {
    fn default() -> Self {
        DEFAULT_API_VERSION
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release { year, month } => write!(f, "{year:04}-{month:02}"),
            Self::Unstable => f.write_str("unstable"),
        }
    }
}

impl FromStr for ApiVersion {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unstable") {
            return Ok(Self::Unstable);
        }
        let invalid = || ApiError::config(format!("invalid API version: {s:?}"));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: u16 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self::Release { year, month })
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApiVersion> for String {
    fn from(version: ApiVersion) -> Self {
        version.to_string()
    }
}

/// Configuration shared by both walkers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Admin API version used to build the versioned root.
    #[serde(default)]
    pub api_version: ApiVersion,

    /// REST page size; clamped to [`MAX_PAGE_LIMIT`].
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Retry policy for transient statuses and malformed envelopes.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Status codes that trigger a REST retry.
    #[serde(default = "default_retry_on_status")]
    pub retry_on_status: Vec<u16>,

    /// Per-request timeout applied by transports.
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,
}

const fn default_page_limit() -> u32 {
    MAX_PAGE_LIMIT
}

fn default_retry_on_status() -> Vec<u16> {
    DEFAULT_RETRY_ON_STATUS.to_vec()
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_version: ApiVersion::default(),
            page_limit: default_page_limit(),
            retry: RetryPolicy::default(),
            retry_on_status: default_retry_on_status(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Parse a configuration from TOML; omitted fields take their defaults.
    pub fn from_toml_str(input: &str) -> ApiResult<Self> {
        toml::from_str(input).map_err(|err| ApiError::config(err.to_string()))
    }

    /// Set the API version.
    #[must_use]
    pub const fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Set the REST page size.
    #[must_use]
    pub const fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the retried status codes.
    #[must_use]
    pub fn with_retry_on_status(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry_on_status = statuses.into_iter().collect();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Page size actually sent, never above [`MAX_PAGE_LIMIT`].
    #[must_use]
    pub fn effective_page_limit(&self) -> u32 {
        self.page_limit.clamp(1, MAX_PAGE_LIMIT)
    }

    /// Whether `status` is retried by the REST walker.
    #[must_use]
    pub fn is_transient_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    /// Whether the configured version predates [`DEFAULT_API_VERSION`].
    #[must_use]
    pub fn is_outdated_version(&self) -> bool {
        self.api_version < DEFAULT_API_VERSION
    }

    /// Versioned admin root, e.g. `/admin/api/2024-01/`.
    #[must_use]
    pub fn admin_root(&self) -> String {
        format!("/admin/api/{}/", self.api_version)
    }

    /// GraphQL endpoint path.
    #[must_use]
    pub fn graphql_path(&self) -> String {
        format!("{}graphql.json", self.admin_root())
    }
}

pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
