//! System settings that carry credentials, and the sources they are read from.

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// A logical credential setting, readable from the environment or from
/// process-local properties under different names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemSetting {
    AccessKeyId,
    SecretAccessKey,
    SessionToken,
    RoleArn,
    RoleSessionName,
    WebIdentityTokenFile,
}

impl SystemSetting {
    /// Every setting, in resolution order.
    pub const ALL: [SystemSetting; 6] = [
        SystemSetting::AccessKeyId,
        SystemSetting::SecretAccessKey,
        SystemSetting::SessionToken,
        SystemSetting::RoleArn,
        SystemSetting::RoleSessionName,
        SystemSetting::WebIdentityTokenFile,
    ];

    /// Name of the environment variable holding this setting.
    pub fn environment_variable(self) -> &'static str {
        match self {
            SystemSetting::AccessKeyId => "AWS_ACCESS_KEY_ID",
            SystemSetting::SecretAccessKey => "AWS_SECRET_ACCESS_KEY",
            SystemSetting::SessionToken => "AWS_SESSION_TOKEN",
            SystemSetting::RoleArn => "AWS_ROLE_ARN",
            SystemSetting::RoleSessionName => "AWS_ROLE_SESSION_NAME",
            SystemSetting::WebIdentityTokenFile => "AWS_WEB_IDENTITY_TOKEN_FILE",
        }
    }

    /// Name of the process property holding this setting.
    pub fn property(self) -> &'static str {
        match self {
            SystemSetting::AccessKeyId => "aws.accessKeyId",
            SystemSetting::SecretAccessKey => "aws.secretAccessKey",
            SystemSetting::SessionToken => "aws.sessionToken",
            SystemSetting::RoleArn => "aws.roleArn",
            SystemSetting::RoleSessionName => "aws.roleSessionName",
            SystemSetting::WebIdentityTokenFile => "aws.webIdentityTokenFile",
        }
    }

    /// Human readable name used in error messages.
    pub fn description(self) -> &'static str {
        match self {
            SystemSetting::AccessKeyId => "Access key",
            SystemSetting::SecretAccessKey => "Secret key",
            SystemSetting::SessionToken => "Session token",
            SystemSetting::RoleArn => "Role ARN",
            SystemSetting::RoleSessionName => "Role session name",
            SystemSetting::WebIdentityTokenFile => "Web identity token file",
        }
    }
}

/// Loads the raw value of a [`SystemSetting`] from some configuration source.
pub trait SettingsSource: Send + Sync {
    /// Returns the value of `setting` if it is set.
    fn load_setting(&self, setting: SystemSetting) -> Option<String>;
}

impl<F> SettingsSource for F
where
    F: Fn(SystemSetting) -> Option<String> + Send + Sync,
{
    fn load_setting(&self, setting: SystemSetting) -> Option<String> {
        self(setting)
    }
}

/// Reads settings from environment variables.
///
/// Either the real process environment or an in-memory map, so that tests
/// don't have to mutate process-global state.
#[derive(Clone)]
pub struct EnvironmentSource(Arc<EnvInner>);

enum EnvInner {
    Real,
    Fake(HashMap<String, String>),
}

impl Default for EnvironmentSource {
    fn default() -> Self {
        Self::real()
    }
}

impl EnvironmentSource {
    /// Reads from the process environment.
    pub fn real() -> Self {
        Self(Arc::new(EnvInner::Real))
    }

    /// Reads from a fixed set of variables.
    pub fn from_slice(vars: &[(&str, &str)]) -> Self {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self(Arc::new(EnvInner::Fake(map)))
    }

    /// Returns the value of an environment variable.
    ///
    /// Variables that are not valid unicode are treated as unset.
    pub fn get(&self, name: &str) -> Option<String> {
        match self.0.as_ref() {
            EnvInner::Real => match env::var(name) {
                Ok(value) => Some(value),
                Err(env::VarError::NotPresent) => None,
                Err(env::VarError::NotUnicode(_)) => {
                    tracing::debug!(variable = name, "ignoring non-unicode environment variable");
                    None
                }
            },
            EnvInner::Fake(map) => map.get(name).cloned(),
        }
    }
}

impl SettingsSource for EnvironmentSource {
    fn load_setting(&self, setting: SystemSetting) -> Option<String> {
        let name = setting.environment_variable();
        tracing::trace!(variable = name, "loading setting from environment");
        self.get(name)
    }
}

/// A process-local, thread-safe string property store.
///
/// Cloning yields a handle to the same store.
#[derive(Clone, Default)]
pub struct Properties(Arc<RwLock<HashMap<String, String>>>);

impl Properties {
    /// Creates an empty store, independent of [`Properties::global`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given properties.
    pub fn from_slice(props: &[(&str, &str)]) -> Self {
        let store = Self::new();
        for (key, value) in props {
            store.set(*key, *value);
        }
        store
    }

    /// The process-wide property store.
    pub fn global() -> &'static Properties {
        static GLOBAL: OnceLock<Properties> = OnceLock::new();
        GLOBAL.get_or_init(Properties::new)
    }

    /// Sets a property, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into())
    }

    /// Returns the value of a property.
    pub fn get(&self, key: &str) -> Option<String> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Removes a property, returning its value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }
}

/// Reads settings from a [`Properties`] store.
#[derive(Clone)]
pub struct PropertySource {
    properties: Properties,
}

impl Default for PropertySource {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySource {
    /// Reads from the process-wide [`Properties::global`] store.
    pub fn new() -> Self {
        Self {
            properties: Properties::global().clone(),
        }
    }

    /// Reads from a specific store instead of the global one.
    pub fn with_properties(properties: Properties) -> Self {
        Self { properties }
    }
}

impl SettingsSource for PropertySource {
    fn load_setting(&self, setting: SystemSetting) -> Option<String> {
        let key = setting.property();
        tracing::trace!(property = key, "loading setting from properties");
        self.properties.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_setting_has_distinct_names() {
        let envs: std::collections::HashSet<_> = SystemSetting::ALL
            .iter()
            .map(|s| s.environment_variable())
            .collect();
        let props: std::collections::HashSet<_> =
            SystemSetting::ALL.iter().map(|s| s.property()).collect();
        assert_eq!(envs.len(), SystemSetting::ALL.len());
        assert_eq!(props.len(), SystemSetting::ALL.len());
    }

    #[test]
    fn web_identity_names() {
        let s = SystemSetting::WebIdentityTokenFile;
        assert_eq!(s.environment_variable(), "AWS_WEB_IDENTITY_TOKEN_FILE");
        assert_eq!(s.property(), "aws.webIdentityTokenFile");
    }

    #[test]
    fn fake_environment_lookup() {
        let env = EnvironmentSource::from_slice(&[("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE")]);
        assert_eq!(
            env.load_setting(SystemSetting::AccessKeyId).as_deref(),
            Some("AKIDEXAMPLE")
        );
        assert_eq!(env.load_setting(SystemSetting::SecretAccessKey), None);
    }

    #[test]
    fn environment_source_ignores_property_names() {
        let env = EnvironmentSource::from_slice(&[("aws.accessKeyId", "AKIDEXAMPLE")]);
        assert_eq!(env.load_setting(SystemSetting::AccessKeyId), None);
    }

    #[test]
    fn properties_set_get_remove() {
        let props = Properties::new();
        assert_eq!(props.set("aws.roleArn", "arn:aws:iam::123:role/x"), None);
        assert_eq!(
            props.set("aws.roleArn", "arn:aws:iam::123:role/y").as_deref(),
            Some("arn:aws:iam::123:role/x")
        );
        assert_eq!(props.get("aws.roleArn").as_deref(), Some("arn:aws:iam::123:role/y"));
        assert_eq!(props.remove("aws.roleArn").as_deref(), Some("arn:aws:iam::123:role/y"));
        assert_eq!(props.get("aws.roleArn"), None);
    }

    #[test]
    fn property_source_reads_injected_store() {
        let props = Properties::from_slice(&[("aws.sessionToken", "tok")]);
        let source = PropertySource::with_properties(props.clone());
        assert_eq!(
            source.load_setting(SystemSetting::SessionToken).as_deref(),
            Some("tok")
        );
        props.remove("aws.sessionToken");
        assert_eq!(source.load_setting(SystemSetting::SessionToken), None);
    }

    #[test]
    fn closures_are_settings_sources() {
        let source = |setting: SystemSetting| {
            (setting == SystemSetting::RoleSessionName).then(|| "session".to_string())
        };
        assert_eq!(
            source.load_setting(SystemSetting::RoleSessionName).as_deref(),
            Some("session")
        );
        assert_eq!(source.load_setting(SystemSetting::RoleArn), None);
    }
}
