use chrono::{DateTime, Utc};

use crate::error::{CredentialsError, Result};
use crate::provider::{EnvironmentVariableCredentialsProvider, SystemPropertyCredentialsProvider};

/// AWS credentials: an access key pair, optionally with a session token.
///
/// The `Debug` implementation redacts `secret_access_key` and `session_token`
/// to prevent accidental leakage in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Long-lived credentials made of an access key pair.
    pub fn basic(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expiration: None,
        }
    }

    /// Temporary credentials carrying a session token.
    pub fn session(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            session_token: Some(session_token.into()),
            ..Self::basic(access_key_id, secret_access_key)
        }
    }

    /// Sets the time after which these credentials are no longer valid.
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Returns `true` for session credentials.
    pub fn is_session(&self) -> bool {
        self.session_token.is_some()
    }

    /// Checks if the credentials have expired.
    ///
    /// Credentials without an expiration never expire.
    pub fn is_expired(&self) -> bool {
        self.expiration.is_some_and(|exp| Utc::now() >= exp)
    }

    /// Returns the remaining time until expiration.
    ///
    /// Returns `None` for credentials without an expiration or already expired ones.
    pub fn time_to_expiry(&self) -> Option<std::time::Duration> {
        let diff = self.expiration? - Utc::now();
        diff.to_std().ok().filter(|d| !d.is_zero())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"****")
            .field("session_token", &self.session_token.as_ref().map(|_| "****"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Resolves [`Credentials`] from a specific source.
pub trait CredentialsProvider: Send + Sync {
    /// Attempt to resolve credentials from this provider.
    fn resolve(&self) -> Result<Credentials>;

    /// Releases resources held by this provider.
    ///
    /// Providers holding nothing keep the default no-op.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Provides credentials from explicitly specified values.
pub struct StaticProvider {
    credentials: Credentials,
}

impl StaticProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Shorthand for a provider of [`Credentials::basic`].
    pub fn basic(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self::new(Credentials::basic(access_key_id, secret_access_key))
    }
}

impl CredentialsProvider for StaticProvider {
    fn resolve(&self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}

/// Tries multiple credentials providers in order and returns the first success.
pub struct ChainProvider {
    providers: Vec<Box<dyn CredentialsProvider>>,
}

impl ChainProvider {
    /// Creates a chain with the given providers.
    pub fn new(providers: Vec<Box<dyn CredentialsProvider>>) -> Self {
        Self { providers }
    }

    /// Creates the default system settings chain: Properties → Env.
    pub fn default_chain() -> Self {
        Self {
            providers: vec![
                Box::new(SystemPropertyCredentialsProvider::from_properties()),
                Box::new(EnvironmentVariableCredentialsProvider::from_env()),
            ],
        }
    }
}

impl CredentialsProvider for ChainProvider {
    fn resolve(&self) -> Result<Credentials> {
        let mut last_err = CredentialsError::Provider("no credentials providers configured".into());
        for provider in &self.providers {
            match provider.resolve() {
                Ok(creds) => return Ok(creds),
                Err(e) => {
                    tracing::debug!(error = %e, "credentials provider in chain failed");
                    last_err = e;
                }
            }
        }
        Err(CredentialsError::Provider(format!(
            "all credentials providers failed, last error: {}",
            last_err
        )))
    }

    fn close(&self) -> Result<()> {
        for provider in &self.providers {
            if let Err(e) = provider.close() {
                tracing::debug!(error = %e, "ignoring failure to close chained provider");
            }
        }
        Ok(())
    }
}
