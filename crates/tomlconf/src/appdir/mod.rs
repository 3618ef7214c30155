//! Per-user application directory resolution.
//!
//! Maps an application name to the conventional per-user location on each OS:
//!
//! | Platform | Options              | Result                                             |
//! |----------|----------------------|----------------------------------------------------|
//! | Windows  | `roaming = true`     | `%APPDATA%\Foo Bar`                                |
//! | Windows  | `roaming = false`    | `%LOCALAPPDATA%\Foo Bar`                           |
//! | macOS    |                      | `~/Library/Application Support/Foo Bar`            |
//! | POSIX    |                      | `$XDG_CONFIG_HOME/foo-bar` (default `~/.config`)   |
//! | any      | `force_posix = true` | `~/.foo-bar`                                       |
//!
//! On Windows an unset or empty app-data variable falls back to the home
//! directory. Resolution is pure: nothing is created on disk.
//!
//! # What is XDG? (for beginners)
//!
//! The XDG Base Directory specification is the freedesktop.org convention
//! that Linux and the BSDs use to keep per-user files out of the top of the
//! home directory. Configuration goes under `$XDG_CONFIG_HOME`, which users
//! rarely set; when it is unset or empty the default is `~/.config`. Each
//! application gets one lowercase subdirectory there, which is why
//! `"Foo Bar"` becomes `foo-bar` on POSIX while Windows and macOS keep the
//! display name as is.
//!
//! Older tools put a single dotfile directory straight in the home directory
//! (`~/.foo-bar`). `force_posix` selects that layout on every platform, for
//! applications that want one path to document everywhere.
//!
//! # Roaming vs local (Windows)
//!
//! `%APPDATA%` is copied between machines when a user logs in to a domain
//! with a roaming profile; `%LOCALAPPDATA%` stays on one machine. Small
//! settings belong in the roaming directory, caches in the local one.

mod env;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfError, ConfResult};

pub use env::{Environment, MockEnvironment, SystemEnvironment};

/// Operating-system family used to pick the directory convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    MacOs,
    /// Linux, the BSDs and every other non-Windows, non-macOS target.
    Posix,
}

impl Platform {
    /// The platform this process is running on.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Classifies a value of [`std::env::consts::OS`].
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "macos" => Platform::MacOs,
            _ => Platform::Posix,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Posix => "posix",
        })
    }
}

/// Options for [`get_app_dir`].
///
/// | Field         | Default | Meaning                                              |
/// |---------------|---------|------------------------------------------------------|
/// | `roaming`     | `true`  | Windows only: `%APPDATA%` instead of `%LOCALAPPDATA%` |
/// | `force_posix` | `false` | Use `~/.app-name` regardless of platform or XDG      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDirOptions {
    #[serde(default = "default_roaming")]
    pub roaming: bool,
    #[serde(default)]
    pub force_posix: bool,
}

fn default_roaming() -> bool {
    true
}

impl Default for AppDirOptions {
    fn default() -> Self {
        Self {
            roaming: default_roaming(),
            force_posix: false,
        }
    }
}

impl AppDirOptions {
    pub fn roaming(mut self, roaming: bool) -> Self {
        self.roaming = roaming;
        self
    }

    pub fn force_posix(mut self, force_posix: bool) -> Self {
        self.force_posix = force_posix;
        self
    }
}

/// Returns the per-user directory for `app_name` on the current platform.
///
/// # Errors
///
/// Returns [`ConfError::HomeDirUnavailable`] if the home directory is needed
/// and cannot be determined.
///
/// # Example
///
/// ```no_run
/// use tomlconf::{get_app_dir, AppDirOptions};
///
/// let dir = get_app_dir("Foo Bar", AppDirOptions::default().force_posix(true))?;
/// assert!(dir.ends_with(".foo-bar"));
/// # Ok::<(), tomlconf::ConfError>(())
/// ```
pub fn get_app_dir(app_name: &str, options: AppDirOptions) -> ConfResult<PathBuf> {
    resolve_app_dir(app_name, options, Platform::current(), &SystemEnvironment)
}

/// Resolves the directory for an explicit platform and environment.
///
/// # Errors
///
/// Returns [`ConfError::HomeDirUnavailable`] if the home directory is needed
/// and `env` cannot provide it.
pub fn resolve_app_dir(
    app_name: &str,
    options: AppDirOptions,
    platform: Platform,
    env: &dyn Environment,
) -> ConfResult<PathBuf> {
    let dir = if options.force_posix {
        home(env)?.join(format!(".{}", posixify(app_name)))
    } else {
        match platform {
            Platform::Windows => {
                let key = if options.roaming {
                    "APPDATA"
                } else {
                    "LOCALAPPDATA"
                };
                let root = match env.non_empty_path(key) {
                    Some(root) => root,
                    None => {
                        warn!(key, "app-data variable unset, falling back to home directory");
                        home(env)?
                    }
                };
                root.join(app_name)
            }
            Platform::MacOs => home(env)?
                .join("Library")
                .join("Application Support")
                .join(app_name),
            Platform::Posix => {
                let root = match env.non_empty_path("XDG_CONFIG_HOME") {
                    Some(root) => root,
                    None => home(env)?.join(".config"),
                };
                root.join(posixify(app_name))
            }
        }
    };

    debug!(
        app_name,
        %platform,
        roaming = options.roaming,
        force_posix = options.force_posix,
        dir = %dir.display(),
        "resolved application directory"
    );
    Ok(dir)
}

/// POSIX form of an application name: whitespace runs become single hyphens
/// and the result is lower-cased (`"Foo  Bar"` → `"foo-bar"`).
pub fn posixify(app_name: &str) -> String {
    app_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

fn home(env: &dyn Environment) -> ConfResult<PathBuf> {
    env.home_dir().ok_or(ConfError::HomeDirUnavailable)
}
