use std::path::PathBuf;

use thiserror::Error;

use crate::setting::SystemSetting;

/// Boxed error returned by externally registered constructors and delegates.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving credentials.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// The web identity token file path was relative.
    #[error("web identity token file path must be an absolute file path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// The web identity token file could not be opened, read or decoded.
    #[error("cannot read web identity token file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No token-exchange factory is registered for the capability.
    #[error(
        "web identity tokens require the companion token-exchange module to be present \
         (nothing registered for '{0}')"
    )]
    MissingDependency(String),

    /// The token-exchange factory is registered but could not be constructed.
    #[error("failed to construct a web identity token credentials provider: {0}")]
    Construction(#[source] BoxError),

    /// A mandatory setting was absent or blank.
    #[error(
        "unable to load credentials from system settings. {} must be specified either via \
         environment variable ({}) or system property ({})",
        .setting.description(),
        .setting.environment_variable(),
        .setting.property()
    )]
    MissingCredential { setting: SystemSetting },

    /// A delegate provider failed.
    #[error("credentials provider error: {0}")]
    Provider(String),
}

impl CredentialsError {
    /// Returns `true` if the error is potentially recoverable by retrying.
    ///
    /// Nothing resolved here is transient: a missing setting, a bad path or an
    /// absent companion module stays that way until the caller changes the
    /// configuration.
    pub fn is_retryable(&self) -> bool {
        match self {
            CredentialsError::InvalidPath(_)
            | CredentialsError::Io { .. }
            | CredentialsError::MissingDependency(_)
            | CredentialsError::Construction(_)
            | CredentialsError::MissingCredential { .. }
            | CredentialsError::Provider(_) => false,
        }
    }

    /// Returns the missing setting if this is a [`CredentialsError::MissingCredential`].
    pub fn missing_setting(&self) -> Option<SystemSetting> {
        match self {
            CredentialsError::MissingCredential { setting } => Some(*setting),
            _ => None,
        }
    }
}

/// A specialized Result type for credential resolution.
pub type Result<T> = std::result::Result<T, CredentialsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_path_display() {
        let err = CredentialsError::InvalidPath(PathBuf::from("token.jwt"));
        assert_eq!(
            err.to_string(),
            "web identity token file path must be an absolute file path: token.jwt"
        );
    }

    #[test]
    fn missing_access_key_names_both_sources() {
        let err = CredentialsError::MissingCredential {
            setting: SystemSetting::AccessKeyId,
        };
        let msg = err.to_string();
        assert!(msg.contains("Access key"));
        assert!(msg.contains("AWS_ACCESS_KEY_ID"));
        assert!(msg.contains("aws.accessKeyId"));
        assert_eq!(err.missing_setting(), Some(SystemSetting::AccessKeyId));
    }

    #[test]
    fn missing_secret_key_names_both_sources() {
        let err = CredentialsError::MissingCredential {
            setting: SystemSetting::SecretAccessKey,
        };
        let msg = err.to_string();
        assert!(msg.contains("Secret key"));
        assert!(msg.contains("AWS_SECRET_ACCESS_KEY"));
        assert!(msg.contains("aws.secretAccessKey"));
    }

    #[test]
    fn missing_dependency_display() {
        let err = CredentialsError::MissingDependency("web-identity-factory".into());
        let msg = err.to_string();
        assert!(msg.contains("companion token-exchange module"));
        assert!(msg.contains("web-identity-factory"));
    }

    #[test]
    fn construction_keeps_cause() {
        let err = CredentialsError::Construction("no default constructor".into());
        assert!(err.to_string().contains("no default constructor"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn nothing_is_retryable() {
        let io = CredentialsError::Io {
            path: PathBuf::from("/t"),
            source: std::io::ErrorKind::NotFound.into(),
        };
        assert!(!io.is_retryable());
        assert!(!CredentialsError::Provider("boom".into()).is_retryable());
        assert_eq!(io.missing_setting(), None);
    }
}
