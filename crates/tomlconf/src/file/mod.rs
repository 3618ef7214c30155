//! Whole-file text access with an explicit mode and encoding.
//!
//! A [`TextFile`] owns one OS file handle for its lifetime. Readable modes
//! decode the entire file when it is opened; writable modes encode the
//! in-memory text and replace the entire file when it is closed. Nothing is
//! streamed and nothing touches the disk between open and close.
//!
//! ```no_run
//! use tomlconf::{ErrorPolicy, TextFile};
//!
//! # fn main() -> Result<(), tomlconf::ConfError> {
//! let mut file = TextFile::open("settings.toml", "r+")?;
//! let updated = file.text().replace("debug = false", "debug = true");
//! file.set_text(updated);
//! file.close()?;
//!
//! let legacy = TextFile::options()
//!     .encoding("iso-8859-5")
//!     .errors(ErrorPolicy::Replace)
//!     .open("legacy.ini", "r")?;
//! println!("{}", legacy.text());
//! # Ok(())
//! # }
//! ```
//!
//! # Release guarantees
//!
//! The handle is released on every path:
//!
//! - [`TextFile::close`] writes (writable modes) and reports any error.
//! - Dropping an unclosed file writes on a best-effort basis and logs a
//!   failure through `tracing`. During a panic the write is skipped.
//! - [`with_file`] writes when the closure returns `Ok` and discards the
//!   pending text when it returns `Err` or panics.

mod codec;
mod mode;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, trace};

use crate::error::{ConfError, ConfResult};

pub use codec::{CodecError, ErrorPolicy, TextCodec};
pub use mode::Mode;

/// Options for opening a [`TextFile`].
///
/// | Option     | Default  |
/// |------------|----------|
/// | `encoding` | UTF-8    |
/// | `errors`   | `strict` |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptions {
    encoding: Option<String>,
    errors: ErrorPolicy,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the encoding label, e.g. `"utf-8"` or `"iso-8859-5"`.
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    /// Sets the policy for undecodable bytes and unencodable characters.
    pub fn errors(mut self, policy: ErrorPolicy) -> Self {
        self.errors = policy;
        self
    }

    /// Opens `path` with a mode string (`"r"`, `"w"` or `"r+"`).
    ///
    /// # Errors
    ///
    /// - [`ConfError::InvalidMode`] for any other mode string.
    /// - [`ConfError::UnknownEncoding`] / [`ConfError::UnsupportedEncoding`]
    ///   for a bad encoding.
    /// - [`ConfError::Io`] if the file cannot be opened or read.
    /// - [`ConfError::Decode`] if the content is invalid under a strict policy.
    ///
    /// Argument errors are reported before the filesystem is touched.
    pub fn open(&self, path: impl AsRef<Path>, mode: &str) -> ConfResult<TextFile> {
        let mode: Mode = mode.parse()?;
        self.open_with_mode(path, mode)
    }

    /// Opens `path` with an already-parsed [`Mode`].
    ///
    /// # Errors
    ///
    /// Same as [`OpenOptions::open`], minus the mode check.
    pub fn open_with_mode(&self, path: impl AsRef<Path>, mode: Mode) -> ConfResult<TextFile> {
        let path = path.as_ref();
        let codec = TextCodec::new(self.encoding.as_deref(), self.errors)?;
        if mode.is_writable() && !codec.can_encode() {
            return Err(ConfError::UnsupportedEncoding {
                encoding: codec.encoding_name(),
            });
        }

        let mut handle = mode
            .fs_options()
            .open(path)
            .map_err(|source| ConfError::io(path, source))?;

        let text = if mode.is_readable() {
            let mut bytes = Vec::new();
            handle
                .read_to_end(&mut bytes)
                .map_err(|source| ConfError::io(path, source))?;
            trace!(path = %path.display(), bytes = bytes.len(), "read file content");
            codec
                .decode(&bytes)
                .map_err(|failure| codec_error(failure, &codec, path))?
        } else {
            String::new()
        };

        debug!(
            path = %path.display(),
            %mode,
            encoding = codec.encoding_name(),
            errors = %codec.policy(),
            "opened text file"
        );

        Ok(TextFile {
            path: path.to_path_buf(),
            mode,
            codec,
            handle: Some(handle),
            text,
        })
    }

    /// Opens `path`, runs `f` on the file, then closes it.
    ///
    /// The text is written back only when `f` returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns the error from opening, from `f`, or from closing.
    pub fn with_file<T, E, F>(&self, path: impl AsRef<Path>, mode: &str, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut TextFile) -> Result<T, E>,
        E: From<ConfError>,
    {
        let mut file = self.open(path, mode)?;
        match f(&mut file) {
            Ok(value) => {
                file.close()?;
                Ok(value)
            }
            Err(err) => {
                file.discard();
                Err(err)
            }
        }
    }
}

/// Opens `path` with default options, runs `f`, then closes the file.
///
/// See [`OpenOptions::with_file`].
///
/// # Errors
///
/// Returns the error from opening, from `f`, or from closing.
pub fn with_file<T, E, F>(path: impl AsRef<Path>, mode: &str, f: F) -> Result<T, E>
where
    F: FnOnce(&mut TextFile) -> Result<T, E>,
    E: From<ConfError>,
{
    OpenOptions::new().with_file(path, mode, f)
}

/// A file opened for whole-file text access.
#[derive(Debug)]
pub struct TextFile {
    path: PathBuf,
    mode: Mode,
    codec: TextCodec,
    /// `None` once the file has been closed.
    handle: Option<File>,
    text: String,
}

impl TextFile {
    /// Opens `path` with default options (UTF-8, strict).
    ///
    /// # Errors
    ///
    /// See [`OpenOptions::open`].
    pub fn open(path: impl AsRef<Path>, mode: &str) -> ConfResult<Self> {
        OpenOptions::new().open(path, mode)
    }

    pub fn options() -> OpenOptions {
        OpenOptions::new()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Canonical name of the encoding in use, e.g. `"UTF-8"`.
    ///
    /// This is the registered name of the codec the label resolved to, so it
    /// may be spelled differently from the label given to
    /// [`OpenOptions::encoding`]: `"utf8"` reports `"UTF-8"`, `"latin_1"`
    /// reports `"ISO-8859-1"` and `"cp1251"` reports `"windows-1251"`.
    pub fn encoding(&self) -> &'static str {
        self.codec.encoding_name()
    }

    pub fn errors(&self) -> ErrorPolicy {
        self.codec.policy()
    }

    /// The whole file content as decoded at open, plus any in-memory edits.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the in-memory text. Nothing is written until close.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    /// Closes the file, writing the text first if the mode is writable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::Encode`] if the text cannot be encoded under a
    /// strict policy (the file is left as it was after open), or
    /// [`ConfError::Io`] if writing fails.
    pub fn close(mut self) -> ConfResult<()> {
        self.finish()
    }

    /// Closes the file like [`TextFile::close`] and returns the final text.
    ///
    /// # Errors
    ///
    /// Same as [`TextFile::close`].
    pub fn into_text(mut self) -> ConfResult<String> {
        self.finish()?;
        Ok(std::mem::take(&mut self.text))
    }

    /// Closes the file without writing, dropping any in-memory edits.
    pub fn discard(mut self) {
        if self.handle.take().is_some() {
            debug!(path = %self.path.display(), mode = %self.mode, "discarded text file");
        }
    }

    fn finish(&mut self) -> ConfResult<()> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        if !self.mode.is_writable() {
            debug!(path = %self.path.display(), mode = %self.mode, "closed text file");
            return Ok(());
        }

        let bytes = self
            .codec
            .encode(&self.text)
            .map_err(|failure| codec_error(failure, &self.codec, &self.path))?;

        let path = &self.path;
        replace_contents(&mut handle, &bytes).map_err(|source| ConfError::io(path, source))?;

        debug!(
            path = %path.display(),
            mode = %self.mode,
            bytes = bytes.len(),
            "wrote and closed text file"
        );
        Ok(())
    }
}

impl Drop for TextFile {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        if std::thread::panicking() {
            self.handle = None;
            debug!(path = %self.path.display(), "released text file during panic without writing");
            return;
        }
        if let Err(err) = self.finish() {
            error!(path = %self.path.display(), error = %err, "failed to write text file on drop");
        }
    }
}

/// Overwrites the whole file through an open handle.
fn replace_contents(handle: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    handle.seek(SeekFrom::Start(0))?;
    handle.write_all(bytes)?;
    handle.set_len(bytes.len() as u64)?;
    handle.flush()
}

fn codec_error(failure: CodecError, codec: &TextCodec, path: &Path) -> ConfError {
    match failure {
        CodecError::Malformed { offset } => ConfError::Decode {
            encoding: codec.encoding_name(),
            offset,
            path: path.to_path_buf(),
        },
        CodecError::Unmappable { character } => ConfError::Encode {
            encoding: codec.encoding_name(),
            character,
            path: path.to_path_buf(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYRILLIC: &str = "test data: данные испытани";

    /// A scratch directory holding `testdir/testfile.txt` with "test data".
    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let sub = dir.path().join("testdir");
        std::fs::create_dir(&sub).expect("create testdir");
        let path = sub.join("testfile.txt");
        std::fs::write(&path, "test data").expect("seed file");
        (dir, path)
    }

    fn read_back(path: &Path) -> String {
        TextFile::open(path, "r").unwrap().into_text().unwrap()
    }

    // ── Modes ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_read_only_discards_mutation() {
        // Arrange
        let (_dir, path) = fixture();

        // Act
        let mut file = TextFile::open(&path, "r").unwrap();
        assert_eq!(file.mode(), Mode::Read);
        assert_eq!(file.text(), "test data");
        file.set_text("new data");
        file.close().unwrap();

        // Assert
        assert_eq!(read_back(&path), "test data");
    }

    #[test]
    fn test_write_only_starts_empty_and_persists() {
        let (_dir, path) = fixture();

        let mut file = TextFile::open(&path, "w").unwrap();
        assert_eq!(file.text(), "");
        file.set_text("new data");
        file.close().unwrap();

        assert_eq!(read_back(&path), "new data");
    }

    #[test]
    fn test_write_only_creates_missing_file() {
        let (dir, _) = fixture();
        let path = dir.path().join("fresh.toml");

        let mut file = TextFile::open(&path, "w").unwrap();
        file.text_mut().push_str("key = 1\n");
        file.close().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "key = 1\n");
    }

    #[test]
    fn test_read_write_replaces_content() {
        let (_dir, path) = fixture();

        let mut file = TextFile::open(&path, "r+").unwrap();
        assert_eq!(file.text(), "test data");
        file.set_text("new data");
        file.close().unwrap();

        assert_eq!(read_back(&path), "new data");
    }

    #[test]
    fn test_read_write_shorter_text_truncates() {
        let (_dir, path) = fixture();

        let mut file = TextFile::open(&path, "r+").unwrap();
        file.set_text("x");
        file.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"x");
    }

    #[test]
    fn test_read_write_creates_missing_file() {
        let (dir, _) = fixture();
        let path = dir.path().join("new.toml");

        let file = TextFile::open(&path, "r+").unwrap();
        assert_eq!(file.text(), "");
        file.close().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_invalid_mode_touches_nothing() {
        let (dir, _) = fixture();
        let path = dir.path().join("never-created.txt");

        let err = TextFile::open(&path, "w+").unwrap_err();

        assert!(matches!(err, ConfError::InvalidMode { ref mode } if mode == "w+"));
        assert!(!path.exists(), "invalid mode must not create the file");
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let (dir, _) = fixture();
        let err = TextFile::open(dir.path().join("absent.txt"), "r").unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    // ── Encodings ─────────────────────────────────────────────────────────────

    #[test]
    fn test_encoding_round_trip_and_mismatch() {
        let (_dir, path) = fixture();
        let iso = TextFile::options().encoding("iso-8859-5");

        let mut file = iso.open(&path, "w").unwrap();
        assert_eq!(file.encoding(), "ISO-8859-5");
        file.set_text(CYRILLIC);
        file.close().unwrap();

        let err = TextFile::open(&path, "r").unwrap_err();
        assert!(matches!(err, ConfError::Decode { offset: 11, .. }), "got {err:?}");

        let replaced = TextFile::options()
            .encoding("utf-8")
            .errors(ErrorPolicy::Replace)
            .open(&path, "r")
            .unwrap();
        assert_eq!(replaced.text(), "test data: ������ ��������");
        assert_eq!(replaced.errors(), ErrorPolicy::Replace);

        let original = iso.open(&path, "r").unwrap();
        assert_eq!(original.text(), CYRILLIC);
    }

    #[test]
    fn test_encoding_reports_canonical_name_not_label() {
        let (_dir, path) = fixture();
        for (label, name) in [
            ("utf8", "UTF-8"),
            ("latin_1", "ISO-8859-1"),
            ("us-ascii", "US-ASCII"),
            ("cp1251", "windows-1251"),
        ] {
            let file = TextFile::options().encoding(label).open(&path, "r").unwrap();
            assert_eq!(file.encoding(), name, "label {label:?}");
        }
    }

    #[test]
    fn test_unknown_encoding_is_rejected_before_io() {
        let (dir, _) = fixture();
        let path = dir.path().join("never-created.txt");

        let err = TextFile::options()
            .encoding("no-such-codec")
            .open(&path, "w")
            .unwrap_err();

        assert!(matches!(err, ConfError::UnknownEncoding { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_utf16_is_readable_but_not_writable() {
        let (_dir, path) = fixture();
        std::fs::write(&path, [b'o', 0, b'k', 0]).unwrap();
        let utf16 = TextFile::options().encoding("utf-16le");

        assert_eq!(utf16.open(&path, "r").unwrap().text(), "ok");
        assert!(matches!(
            utf16.open(&path, "r+"),
            Err(ConfError::UnsupportedEncoding { encoding: "UTF-16LE" })
        ));
    }

    #[test]
    fn test_strict_encode_failure_keeps_previous_content() {
        let (_dir, path) = fixture();

        let mut file = TextFile::options()
            .encoding("iso-8859-5")
            .open(&path, "r+")
            .unwrap();
        file.set_text("costs 5€");
        let err = file.close().unwrap_err();

        assert!(matches!(err, ConfError::Encode { character: '€', .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "test data");
    }

    #[test]
    fn test_ascii_file_is_strictly_seven_bit() {
        // Arrange
        let (_dir, path) = fixture();
        std::fs::write(&path, b"caf\xe9").unwrap();
        let ascii = TextFile::options().encoding("ascii");

        // Act
        let read_err = ascii.open(&path, "r").unwrap_err();
        std::fs::write(&path, "test data").unwrap();
        let mut file = ascii.open(&path, "r+").unwrap();
        file.set_text("5\u{20ac}");
        let write_err = file.close().unwrap_err();

        // Assert
        assert!(matches!(
            read_err,
            ConfError::Decode { encoding: "US-ASCII", offset: 3, .. }
        ));
        assert!(matches!(write_err, ConfError::Encode { character: '\u{20ac}', .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"test data");
    }

    #[test]
    fn test_latin1_file_round_trips_c1_controls() {
        let (_dir, path) = fixture();
        let latin1 = TextFile::options().encoding("latin-1");

        let mut file = latin1.open(&path, "w").unwrap();
        assert_eq!(file.encoding(), "ISO-8859-1");
        file.set_text("\u{80}\u{e9}");
        file.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"\x80\xe9");
        assert_eq!(latin1.open(&path, "r").unwrap().text(), "\u{80}\u{e9}");
    }

    #[test]
    fn test_utf16_file_with_big_endian_bom() {
        let (_dir, path) = fixture();
        std::fs::write(&path, b"\xfe\xff\x00o\x00k").unwrap();

        let file = TextFile::options().encoding("utf-16").open(&path, "r").unwrap();

        assert_eq!(file.text(), "ok");
        assert_eq!(file.encoding(), "UTF-16");
    }

    // ── Release paths ─────────────────────────────────────────────────────────

    #[test]
    fn test_drop_persists_writable_text() {
        let (_dir, path) = fixture();
        {
            let mut file = TextFile::open(&path, "r+").unwrap();
            file.set_text("dropped data");
        }
        assert_eq!(read_back(&path), "dropped data");
    }

    #[test]
    fn test_discard_keeps_disk_content() {
        let (_dir, path) = fixture();
        let mut file = TextFile::open(&path, "r+").unwrap();
        file.set_text("never written");
        file.discard();
        assert_eq!(read_back(&path), "test data");
    }

    #[test]
    fn test_into_text_writes_and_returns() {
        let (_dir, path) = fixture();
        let mut file = TextFile::open(&path, "r+").unwrap();
        file.text_mut().push_str(" and more");
        assert_eq!(file.into_text().unwrap(), "test data and more");
        assert_eq!(read_back(&path), "test data and more");
    }

    #[test]
    fn test_with_file_commits_on_ok_and_discards_on_err() {
        let (_dir, path) = fixture();

        let len = with_file(&path, "r+", |file| -> ConfResult<usize> {
            file.set_text("committed");
            Ok(file.text().len())
        })
        .unwrap();
        assert_eq!(len, 9);
        assert_eq!(read_back(&path), "committed");

        let result = with_file(&path, "r+", |file| -> ConfResult<()> {
            file.set_text("rolled back");
            Err(ConfError::HomeDirUnavailable)
        });
        assert!(result.is_err());
        assert_eq!(read_back(&path), "committed");
    }

    #[test]
    fn test_with_file_skips_write_when_closure_panics() {
        let (_dir, path) = fixture();
        let panicking_path = path.clone();

        let outcome = std::panic::catch_unwind(move || {
            let _ = with_file(&panicking_path, "r+", |file| -> ConfResult<()> {
                file.set_text("half-done");
                panic!("boom");
            });
        });

        assert!(outcome.is_err());
        assert_eq!(read_back(&path), "test data");
    }
}
