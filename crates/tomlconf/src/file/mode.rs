//! Access modes accepted by [`TextFile`](super::TextFile).

use std::fmt;
use std::fs::OpenOptions as FsOpenOptions;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfError;

/// How a [`TextFile`](super::TextFile) accesses its path.
///
/// | Mode   | String | Reads at open | Writes at close | Creates | Truncates |
/// |--------|--------|---------------|-----------------|---------|-----------|
/// | Read   | `r`    | yes           | no              | no      | no        |
/// | Write  | `w`    | no            | yes             | yes     | yes       |
/// | Update | `r+`   | yes           | yes             | yes     | no        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "w")]
    Write,
    #[serde(rename = "r+")]
    Update,
}

impl Mode {
    /// The mode string this variant was parsed from.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Read => "r",
            Mode::Write => "w",
            Mode::Update => "r+",
        }
    }

    /// Whether the file content is decoded at open.
    pub fn is_readable(self) -> bool {
        matches!(self, Mode::Read | Mode::Update)
    }

    /// Whether the text is written back at close.
    pub fn is_writable(self) -> bool {
        matches!(self, Mode::Write | Mode::Update)
    }

    /// Translates the mode into the options for the OS-level open call.
    pub(crate) fn fs_options(self) -> FsOpenOptions {
        let mut options = FsOpenOptions::new();
        match self {
            Mode::Read => {
                options.read(true);
            }
            Mode::Write => {
                options.write(true).create(true).truncate(true);
            }
            Mode::Update => {
                options.read(true).write(true).create(true).truncate(false);
            }
        }
        options
    }
}

impl FromStr for Mode {
    type Err = ConfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(Mode::Read),
            "w" => Ok(Mode::Write),
            "r+" => Ok(Mode::Update),
            other => Err(ConfError::InvalidMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
