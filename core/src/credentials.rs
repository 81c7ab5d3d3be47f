//! Bearer credentials supplied by the embedding application.

use std::fmt;

/// Supplies the bearer token attached to each request.
///
/// Called synchronously every time a request is built, so a provider may
/// return a refreshed token between calls.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> String;
}

impl<F> CredentialProvider for F
where
    F: Fn() -> String + Send + Sync,
{
    fn bearer_token(&self) -> String {
        self()
    }
}

/// A fixed token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> String {
        self.0.clone()
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}
