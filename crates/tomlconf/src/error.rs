//! Error type shared by the file wrapper and the application directory resolver.
//!
//! Argument errors (`InvalidMode`, `UnknownEncoding`, `UnsupportedEncoding`,
//! `UnknownErrorPolicy`) are always raised before the filesystem is touched.
//! Operating-system errors are carried unchanged as the [`std::error::Error::source`]
//! of [`ConfError::Io`]; they are never retried or translated into another kind.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for all `tomlconf` operations.
#[derive(Debug, Error)]
pub enum ConfError {
    /// The mode string is not one of `"r"`, `"w"` or `"r+"`.
    #[error("invalid mode {mode:?}: expected one of \"r\", \"w\", \"r+\"")]
    InvalidMode { mode: String },

    /// The encoding label is not known.
    #[error("unknown encoding: {label}")]
    UnknownEncoding { label: String },

    /// The encoding can be decoded but not produced, so it cannot back a
    /// writable file (UTF-16 variants and `replacement`).
    #[error("encoding {encoding} cannot be used for writing")]
    UnsupportedEncoding { encoding: &'static str },

    /// The error-policy name is not known.
    #[error("unknown error policy: {name}")]
    UnknownErrorPolicy { name: String },

    /// The file content is not valid under the encoding and the policy is strict.
    #[error("{encoding} codec can't decode {path} at byte offset {offset}")]
    Decode {
        encoding: &'static str,
        offset: usize,
        path: PathBuf,
    },

    /// The text contains a character the encoding cannot represent and the
    /// policy is strict.
    #[error("{encoding} codec can't encode character {character:?} for {path}")]
    Encode {
        encoding: &'static str,
        character: char,
        path: PathBuf,
    },

    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The user's home directory could not be determined.
    #[error("could not determine the home directory")]
    HomeDirUnavailable,
}

impl ConfError {
    /// Kind of the underlying I/O error, if this is an [`ConfError::Io`].
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            ConfError::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// Whether this error was raised by argument validation, before any I/O.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            ConfError::InvalidMode { .. }
                | ConfError::UnknownEncoding { .. }
                | ConfError::UnsupportedEncoding { .. }
                | ConfError::UnknownErrorPolicy { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type ConfResult<T> = Result<T, ConfError>;
