//! AWS credentials from system settings.
//!
//! This crate resolves AWS credentials from environment variables or
//! process-local properties:
//!
//! - [`EnvironmentVariableCredentialsProvider`] — `AWS_ACCESS_KEY_ID`,
//!   `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`, ...
//! - [`SystemPropertyCredentialsProvider`] — `aws.accessKeyId`,
//!   `aws.secretAccessKey`, `aws.sessionToken`, ...
//! - [`ChainProvider::default_chain`] — properties first, then environment
//!
//! When a role ARN and a web identity token file are configured, the token is
//! exchanged for credentials by a factory registered through
//! [`web_identity::register_web_identity_factory`].
//!
//! # Quick Start
//!
//! ```no_run
//! use rs_aws_settings_creds::{CredentialsProvider, EnvironmentVariableCredentialsProvider};
//!
//! # fn example() -> rs_aws_settings_creds::Result<()> {
//! let provider = EnvironmentVariableCredentialsProvider::from_env();
//! let creds = provider.resolve()?;
//!
//! println!("Access key: {}", creds.access_key_id());
//! provider.close()?;
//! # Ok(())
//! # }
//! ```

pub mod credential;
pub mod error;
pub mod provider;
pub mod setting;
pub mod web_identity;

pub use credential::{ChainProvider, Credentials, CredentialsProvider, StaticProvider};
pub use error::{BoxError, CredentialsError, Result};
pub use provider::{
    EnvironmentVariableCredentialsProvider, ResolvedSettings, SettingsCredentialsProvider,
    SystemPropertyCredentialsProvider,
};
pub use setting::{EnvironmentSource, Properties, PropertySource, SettingsSource, SystemSetting};
pub use web_identity::{FactoryRegistry, WebIdentityTokenProviderFactory};

// Compile-time assertions: key types must be Send + Sync for use across threads.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<EnvironmentVariableCredentialsProvider>;
    let _ = assert_send_sync::<SystemPropertyCredentialsProvider>;
    let _ = assert_send_sync::<ChainProvider>;
    let _ = assert_send_sync::<CredentialsError>;
    let _ = assert_send_sync::<Credentials>;
    let _ = assert_send_sync::<FactoryRegistry>;
};
