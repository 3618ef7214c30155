//! Process environment access for the application directory resolver.
//!
//! The resolver never reads `std::env` directly; it goes through the
//! [`Environment`] trait so every platform branch can be exercised on any host.
//! [`SystemEnvironment`] is the real adapter; [`MockEnvironment`] is always
//! compiled so downstream crates can use it in their own tests.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// Read-only view of the environment the resolver depends on.
pub trait Environment {
    /// Value of an environment variable, or `None` when it is unset.
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// The current user's home directory, if it can be determined.
    fn home_dir(&self) -> Option<PathBuf>;

    /// Value of `key` as a path, treating an empty value as unset.
    fn non_empty_path(&self, key: &str) -> Option<PathBuf> {
        self.var_os(key)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}

/// A fixed environment for tests.
///
/// # Example
///
/// ```
/// use tomlconf::appdir::{Environment, MockEnvironment};
///
/// let env = MockEnvironment::with_home("/home/ada").var("XDG_CONFIG_HOME", "/cfg");
/// assert_eq!(env.home_dir().unwrap().to_str(), Some("/home/ada"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, OsString>,
    home: Option<PathBuf>,
}

impl MockEnvironment {
    /// An environment with no variables and no home directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment with no variables and the given home directory.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            home: Some(home.into()),
        }
    }

    /// Sets a variable.
    pub fn var(mut self, key: &str, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }
}

impl Environment for MockEnvironment {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_returns_configured_values() {
        let env = MockEnvironment::with_home("/home/ada").var("APPDATA", r"C:\Roaming");
        assert_eq!(env.var_os("APPDATA"), Some(OsString::from(r"C:\Roaming")));
        assert_eq!(env.var_os("LOCALAPPDATA"), None);
        assert_eq!(env.home_dir(), Some(PathBuf::from("/home/ada")));
    }

    #[test]
    fn test_empty_value_is_treated_as_unset() {
        let env = MockEnvironment::new().var("XDG_CONFIG_HOME", "");
        assert_eq!(env.var_os("XDG_CONFIG_HOME"), Some(OsString::new()));
        assert_eq!(env.non_empty_path("XDG_CONFIG_HOME"), None);
    }

    #[test]
    fn test_system_environment_matches_std() {
        let env = SystemEnvironment;
        assert_eq!(env.var_os("PATH"), std::env::var_os("PATH"));
        assert_eq!(env.home_dir(), dirs::home_dir());
    }
}
