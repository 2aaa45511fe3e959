//! Credentials resolved from system settings.
//!
//! [`SettingsCredentialsProvider`] reads the access key, secret key, session
//! token and web identity settings from a [`SettingsSource`] the first time
//! credentials are requested, then picks one strategy, in this order:
//!
//! 1. web identity: when both a token file and a role ARN are set, the token is
//!    exchanged through the registered [`WebIdentityTokenProviderFactory`];
//! 2. session credentials, when a session token is set;
//! 3. basic credentials.
//!
//! Access key and secret key are required in every case.
//!
//! The chosen strategy is kept until [`CredentialsProvider::close`] is called.
//! Concurrent first calls are safe: resolution runs once, under a lock.
//!
//! [`WebIdentityTokenProviderFactory`]: crate::web_identity::WebIdentityTokenProviderFactory

use std::sync::{Arc, Mutex, PoisonError};

use crate::credential::{Credentials, CredentialsProvider, StaticProvider};
use crate::error::{CredentialsError, Result};
use crate::setting::{EnvironmentSource, PropertySource, SettingsSource, SystemSetting};
use crate::web_identity::{FactoryRegistry, WEB_IDENTITY_FACTORY, resolve_web_identity_token};

/// Credentials from environment variables (`AWS_ACCESS_KEY_ID`, ...).
pub type EnvironmentVariableCredentialsProvider = SettingsCredentialsProvider<EnvironmentSource>;

/// Credentials from process properties (`aws.accessKeyId`, ...).
pub type SystemPropertyCredentialsProvider = SettingsCredentialsProvider<PropertySource>;

/// Settings read from a [`SettingsSource`], trimmed.
///
/// Values that are empty after trimming are `None`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub role_arn: Option<String>,
    pub role_session_name: Option<String>,
    pub web_identity_token_file: Option<String>,
}

impl ResolvedSettings {
    /// Reads every setting from `source`.
    pub fn load(source: &dyn SettingsSource) -> Self {
        let load = |setting| {
            source
                .load_setting(setting)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            access_key_id: load(SystemSetting::AccessKeyId),
            secret_access_key: load(SystemSetting::SecretAccessKey),
            session_token: load(SystemSetting::SessionToken),
            role_arn: load(SystemSetting::RoleArn),
            role_session_name: load(SystemSetting::RoleSessionName),
            web_identity_token_file: load(SystemSetting::WebIdentityTokenFile),
        }
    }
}

impl std::fmt::Debug for ResolvedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "****");
        f.debug_struct("ResolvedSettings")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redacted(&self.secret_access_key))
            .field("session_token", &redacted(&self.session_token))
            .field("role_arn", &self.role_arn)
            .field("role_session_name", &self.role_session_name)
            .field("web_identity_token_file", &self.web_identity_token_file)
            .finish()
    }
}

enum State {
    Unresolved,
    Resolved(Arc<dyn CredentialsProvider>),
}

/// Resolves credentials from system settings, once, and delegates to the result.
pub struct SettingsCredentialsProvider<S> {
    source: S,
    factories: FactoryRegistry,
    state: Mutex<State>,
}

impl SettingsCredentialsProvider<EnvironmentSource> {
    /// Creates a provider reading the process environment.
    pub fn from_env() -> Self {
        Self::new(EnvironmentSource::real())
    }
}

impl SettingsCredentialsProvider<PropertySource> {
    /// Creates a provider reading the global process properties.
    pub fn from_properties() -> Self {
        Self::new(PropertySource::new())
    }
}

impl<S: SettingsSource> SettingsCredentialsProvider<S> {
    /// Creates a provider reading from `source`.
    ///
    /// Web identity factories are looked up in [`FactoryRegistry::global`].
    pub fn new(source: S) -> Self {
        Self {
            source,
            factories: FactoryRegistry::global().clone(),
            state: Mutex::new(State::Unresolved),
        }
    }

    /// Looks up web identity factories in `registry` instead of the global one.
    pub fn with_factory_registry(mut self, registry: FactoryRegistry) -> Self {
        self.factories = registry;
        self
    }

    /// Returns `true` once a strategy has been chosen.
    pub fn is_resolved(&self) -> bool {
        matches!(*self.lock_state(), State::Resolved(_))
    }

    fn delegate(&self) -> Result<Arc<dyn CredentialsProvider>> {
        let mut state = self.lock_state();
        if let State::Resolved(provider) = &*state {
            return Ok(provider.clone());
        }

        let provider: Arc<dyn CredentialsProvider> = Arc::from(self.resolve_provider()?);
        *state = State::Resolved(provider.clone());
        Ok(provider)
    }

    fn resolve_provider(&self) -> Result<Box<dyn CredentialsProvider>> {
        let settings = ResolvedSettings::load(&self.source);

        let Some(access_key_id) = settings.access_key_id else {
            return Err(CredentialsError::MissingCredential {
                setting: SystemSetting::AccessKeyId,
            });
        };
        let Some(secret_access_key) = settings.secret_access_key else {
            return Err(CredentialsError::MissingCredential {
                setting: SystemSetting::SecretAccessKey,
            });
        };

        if let (Some(token_file), Some(role_arn)) =
            (&settings.web_identity_token_file, &settings.role_arn)
        {
            tracing::debug!(
                role_arn = %role_arn,
                token_file = %token_file,
                "resolving credentials from web identity token"
            );
            let token = resolve_web_identity_token(token_file)?;
            let factory = self.factories.lookup(WEB_IDENTITY_FACTORY)?;
            return factory.create(role_arn, settings.role_session_name.as_deref(), &token);
        }

        let credentials = match settings.session_token {
            Some(session_token) => {
                tracing::debug!("resolved session credentials from system settings");
                Credentials::session(access_key_id, secret_access_key, session_token)
            }
            None => {
                tracing::debug!("resolved basic credentials from system settings");
                Credentials::basic(access_key_id, secret_access_key)
            }
        };
        Ok(Box::new(StaticProvider::new(credentials)))
    }
}

impl<S> SettingsCredentialsProvider<S> {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), State::Unresolved);
        if let State::Resolved(provider) = previous
            && let Err(e) = provider.close()
        {
            tracing::debug!(error = %e, "ignoring failure to close delegate credentials provider");
        }
    }
}

impl<S: SettingsSource> CredentialsProvider for SettingsCredentialsProvider<S> {
    fn resolve(&self) -> Result<Credentials> {
        self.delegate()?.resolve()
    }

    /// Closes the chosen strategy, if any. Never fails.
    ///
    /// The next [`resolve`](CredentialsProvider::resolve) reads the settings again.
    fn close(&self) -> Result<()> {
        self.release();
        Ok(())
    }
}

impl<S> Drop for SettingsCredentialsProvider<S> {
    fn drop(&mut self) {
        self.release();
    }
}
