//! Session context: target shop and credential.

use std::fmt;

use crate::error::{ApiError, ApiResult};

/// Credential used to authorize calls.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Admin API access token.
    AccessToken(String),
    /// Private-app user/password pair.
    Basic {
        /// API user (key).
        user: String,
        /// API password.
        password: String,
    },
}

impl Credential {
    fn is_complete(&self) -> bool {
        match self {
            Self::AccessToken(token) => !token.is_empty(),
            Self::Basic { user, password } => !user.is_empty() && !password.is_empty(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken(_) => f.debug_tuple("AccessToken").field(&"[REDACTED]").finish(),
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Target shop plus credential. Read-only for the duration of a call.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    host: String,
    credential: Credential,
    shared_secret: Option<String>,
}

impl Session {
    /// Session authorized by an access token.
    #[must_use]
    pub fn new(host: impl AsRef<str>, access_token: impl AsRef<str>) -> Self {
        Self {
            host: normalize_host(host.as_ref()),
            credential: Credential::AccessToken(access_token.as_ref().trim().to_string()),
            shared_secret: None,
        }
    }

    /// Session authorized by a user/password pair.
    #[must_use]
    pub fn with_basic_auth(
        host: impl AsRef<str>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: normalize_host(host.as_ref()),
            credential: Credential::Basic {
                user: user.into(),
                password: password.into(),
            },
            shared_secret: None,
        }
    }

    /// Attach the app's shared secret.
    #[must_use]
    pub fn with_shared_secret(mut self, secret: impl Into<String>) -> Self {
        self.shared_secret = Some(secret.into());
        self
    }

    /// Normalized host, e.g. `example.myshopify.com`.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Credential.
    #[must_use]
    pub const fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Shared secret, if set.
    #[must_use]
    pub fn shared_secret(&self) -> Option<&str> {
        self.shared_secret.as_deref()
    }

    /// Check that the session can authorize a call.
    pub fn validate(&self) -> ApiResult<()> {
        if self.host.is_empty() {
            return Err(ApiError::precondition("Api Endpoint url is missing."));
        }
        if !self.credential.is_complete() {
            return Err(ApiError::precondition(
                "Api User/Password OR Access Token is missing.",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("credential", &self.credential)
            .field(
                "shared_secret",
                &self.shared_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(&host);
    host.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn host_is_normalized() {
        let session = Session::new("  HTTPS://Example.MyShopify.com/ ", " shpat_123 ");
        assert_eq!(session.host(), "example.myshopify.com");
        assert_eq!(
            session.credential(),
            &Credential::AccessToken("shpat_123".into())
        );
    }

    #[test]
    fn missing_host_is_a_precondition_failure() {
        let err = Session::new("", "token").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.to_string(), "Api Endpoint url is missing.");
    }

    #[test]
    fn missing_credential_is_a_precondition_failure() {
        let err = Session::new("shop.myshopify.com", "  ").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let err = Session::with_basic_auth("shop.myshopify.com", "user", "")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("User/Password"));

        assert!(
            Session::with_basic_auth("shop.myshopify.com", "user", "pass")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let session =
            Session::new("shop.myshopify.com", "shpat_secret").with_shared_secret("shh");
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("shpat_secret"));
        assert!(!rendered.contains("shh"));
        assert!(rendered.contains("shop.myshopify.com"));
    }
}
