//! Web identity token support.
//!
//! Exchanging a web identity token (a JWT issued by an external identity
//! provider) for temporary credentials needs a security token service client.
//! That client lives in a separate component which is not a dependency of this
//! crate. Instead it registers a [`WebIdentityTokenProviderFactory`]
//! constructor in a [`FactoryRegistry`] under [`WEB_IDENTITY_FACTORY`] when it
//! is linked in:
//!
//! ```
//! use std::sync::Arc;
//! use rs_aws_settings_creds::web_identity::{
//!     register_web_identity_factory, WebIdentityTokenProviderFactory,
//! };
//! use rs_aws_settings_creds::{CredentialsProvider, Result, StaticProvider};
//!
//! struct StsFactory;
//!
//! impl WebIdentityTokenProviderFactory for StsFactory {
//!     fn create(
//!         &self,
//!         _role_arn: &str,
//!         _role_session_name: Option<&str>,
//!         _web_identity_token: &str,
//!     ) -> Result<Box<dyn CredentialsProvider>> {
//!         // A real implementation calls AssumeRoleWithWebIdentity.
//!         Ok(Box::new(StaticProvider::basic("id", "secret")))
//!     }
//! }
//!
//! register_web_identity_factory(|| Ok(Arc::new(StsFactory)));
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::credential::CredentialsProvider;
use crate::error::{BoxError, CredentialsError, Result};

/// Capability key under which the web identity factory is registered.
pub const WEB_IDENTITY_FACTORY: &str = "web-identity-factory";

/// Turns a role and a web identity token into a credentials provider.
pub trait WebIdentityTokenProviderFactory: Send + Sync {
    /// Creates a provider assuming `role_arn` with `web_identity_token`.
    ///
    /// `role_session_name` may be absent; implementations pick a default.
    fn create(
        &self,
        role_arn: &str,
        role_session_name: Option<&str>,
        web_identity_token: &str,
    ) -> Result<Box<dyn CredentialsProvider>>;
}

/// Builds a factory on lookup.
pub type FactoryConstructor = Arc<
    dyn Fn() -> std::result::Result<Arc<dyn WebIdentityTokenProviderFactory>, BoxError>
        + Send
        + Sync,
>;

/// Maps capability keys to factory constructors.
///
/// Cloning yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct FactoryRegistry(Arc<RwLock<HashMap<String, FactoryConstructor>>>);

impl FactoryRegistry {
    /// Creates an empty registry, independent of [`FactoryRegistry::global`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static FactoryRegistry {
        static GLOBAL: OnceLock<FactoryRegistry> = OnceLock::new();
        GLOBAL.get_or_init(FactoryRegistry::new)
    }

    /// Registers `constructor` under `capability`, replacing any previous one.
    pub fn register<F>(&self, capability: impl Into<String>, constructor: F)
    where
        F: Fn() -> std::result::Result<Arc<dyn WebIdentityTokenProviderFactory>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        let capability = capability.into();
        tracing::debug!(capability = %capability, "registering credentials provider factory");
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(capability, Arc::new(constructor));
    }

    /// Removes the registration for `capability`. Returns whether one existed.
    pub fn unregister(&self, capability: &str) -> bool {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(capability)
            .is_some()
    }

    pub fn is_registered(&self, capability: &str) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(capability)
    }

    /// Constructs the factory registered under `capability`.
    pub fn lookup(&self, capability: &str) -> Result<Arc<dyn WebIdentityTokenProviderFactory>> {
        // Clone the constructor out so it runs without the lock held.
        let constructor = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(capability)
            .cloned();

        let Some(constructor) = constructor else {
            tracing::debug!(capability, "no credentials provider factory registered");
            return Err(CredentialsError::MissingDependency(capability.to_string()));
        };

        constructor().map_err(CredentialsError::Construction)
    }
}

/// Registers the web identity factory constructor in the global registry.
pub fn register_web_identity_factory<F>(constructor: F)
where
    F: Fn() -> std::result::Result<Arc<dyn WebIdentityTokenProviderFactory>, BoxError>
        + Send
        + Sync
        + 'static,
{
    FactoryRegistry::global().register(WEB_IDENTITY_FACTORY, constructor);
}

/// Looks up the web identity factory in the global registry.
pub fn web_identity_factory() -> Result<Arc<dyn WebIdentityTokenProviderFactory>> {
    FactoryRegistry::global().lookup(WEB_IDENTITY_FACTORY)
}

/// Reads a web identity token from the file at `path`.
///
/// The path must be absolute. The content is returned verbatim.
pub fn resolve_web_identity_token(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    if !path.is_absolute() {
        return Err(CredentialsError::InvalidPath(path.to_path_buf()));
    }

    let io_err = |source: std::io::Error| CredentialsError::Io {
        path: path.to_path_buf(),
        source,
    };

    tracing::debug!(path = %path.display(), "reading web identity token file");
    let mut file = File::open(path).map_err(io_err)?;
    let mut token = String::new();
    file.read_to_string(&mut token).map_err(io_err)?;
    // Closing on drop never reports errors.
    drop(file);

    Ok(token)
}
