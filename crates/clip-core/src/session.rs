//! Authentication values threaded explicitly through every remote call.

use std::fmt;

use crate::error::{ReportError, Result};

/// Back-office login identity and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identity: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    /// Both identity and secret must be non-blank.
    pub fn validate(&self) -> Result<()> {
        if self.identity.trim().is_empty() || self.secret.is_empty() {
            return Err(ReportError::InvalidInput(
                "identity and secret are required".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Tokens obtained from a successful authentication exchange.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Sent as `Authorization: Bearer <token>`.
    pub bearer_token: String,
    /// Sent as `x-bpo-member-token`.
    pub member_token: String,
}

impl Session {
    pub fn new(bearer_token: impl Into<String>, member_token: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            member_token: member_token.into(),
        }
    }

    /// `true` when both tokens are present.
    pub fn is_authenticated(&self) -> bool {
        !self.bearer_token.is_empty() && !self.member_token.is_empty()
    }

    /// Fail with [`ReportError::AuthRequired`] unless both tokens are present.
    pub fn require(&self) -> Result<&Self> {
        if self.is_authenticated() {
            Ok(self)
        } else {
            Err(ReportError::AuthRequired)
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
