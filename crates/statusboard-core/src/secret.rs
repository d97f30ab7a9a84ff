//! Shared-secret lookup and token comparison.
//!
//! The secret is injected through [`SecretProvider`] instead of being read
//! from ambient process state, so the recorder can be built with a fixed
//! secret in tests and with the configured one at startup.

use std::{fmt, future::Future, pin::Pin};

use serde::Deserialize;

use crate::error::Result;

/// A shared-secret value that never shows up in logs.
///
/// Only text deserializes into a token. Values are compared byte for byte,
/// so `007` and `7` are different secrets.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretToken(String);

impl SecretToken {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretToken(***)")
    }
}

/// Source of the optional shared secret.
pub trait SecretProvider: Send + Sync + fmt::Debug + 'static {
    /// Returns the configured secret, or `None` when token checking is off.
    fn secret_token(&self) -> Pin<Box<dyn Future<Output = Result<Option<SecretToken>>> + Send + '_>>;
}

/// Secret fixed at process startup.
#[derive(Debug, Clone, Default)]
pub struct StaticSecret {
    token: Option<SecretToken>,
}

impl StaticSecret {
    /// Creates a provider for the given secret. An empty secret counts as
    /// unset and disables token checking.
    pub fn new(token: Option<SecretToken>) -> Self {
        Self { token: token.filter(|t| !t.expose().is_empty()) }
    }

    /// Provider with token checking disabled.
    pub fn disabled() -> Self {
        Self { token: None }
    }

    /// Whether a secret is configured.
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }
}

impl SecretProvider for StaticSecret {
    fn secret_token(&self) -> Pin<Box<dyn Future<Output = Result<Option<SecretToken>>> + Send + '_>> {
        let token = self.token.clone();
        Box::pin(async move { Ok(token) })
    }
}

/// Checks a supplied token against the secret. With no secret every token,
/// including none at all, is accepted.
pub fn token_matches(secret: Option<&SecretToken>, supplied: Option<&str>) -> bool {
    match secret {
        None => true,
        Some(secret) => supplied.is_some_and(|s| timing_safe_eq(s, secret.expose())),
    }
}

fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (a_byte, b_byte) in a.bytes().zip(b.bytes()) {
        result |= a_byte ^ b_byte;
    }

    result == 0
}
