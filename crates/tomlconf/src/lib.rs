//! # tomlconf
//!
//! Small helpers for applications that keep their configuration in plain
//! files:
//!
//! - **`file`** – [`TextFile`], a scoped wrapper that exposes a whole file as
//!   one string. The mode (`"r"`, `"w"`, `"r+"`) decides whether the file is
//!   read when opened and written back when closed; the encoding and error
//!   policy decide how bytes become text and back.
//!
//! - **`appdir`** – [`get_app_dir`], which maps an application name to the
//!   conventional per-user directory on Windows, macOS and other POSIX
//!   systems.
//!
//! The two facilities are independent. Neither parses configuration formats,
//! watches files or creates directories.
//!
//! # Why whole-file access? (for beginners)
//!
//! Config files are small and are usually rewritten as a unit: read the text,
//! change a line, save. [`TextFile`] holds the open handle for exactly that
//! span and writes the new text back in one go when it is closed, so a
//! caller never sees a half-updated file of its own making. Because closing
//! writes, [`TextFile::close`] returns a `Result`; dropping the value without
//! closing still writes, but can only log a failure.
//!
//! ```no_run
//! use tomlconf::{get_app_dir, AppDirOptions, TextFile};
//!
//! # fn main() -> Result<(), tomlconf::ConfError> {
//! let dir = get_app_dir("Foo Bar", AppDirOptions::default())?;
//! let file = TextFile::open(dir.join("config.toml"), "r")?;
//! println!("{}", file.text());
//! # Ok(())
//! # }
//! ```

pub mod appdir;
pub mod error;
pub mod file;

// Re-export the most-used items at the crate root so callers can write
// `tomlconf::TextFile` instead of `tomlconf::file::TextFile`.
pub use appdir::{get_app_dir, resolve_app_dir, AppDirOptions, Platform};
pub use error::{ConfError, ConfResult};
pub use file::{with_file, CodecError, ErrorPolicy, Mode, OpenOptions, TextCodec, TextFile};
