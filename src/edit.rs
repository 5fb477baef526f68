use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// A byte-span replacement on a file, guarded by the text expected in the
/// span at the time the replacement was computed.
///
/// The patcher turns every declaration replacement into one of these, so the
/// write step never trusts offsets that might have gone stale.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until apply() is called"]
pub struct Edit {
    /// Path to the file to edit
    pub file: PathBuf,
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (used for large declarations)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("{file} changed since it was parsed: unexpected text at bytes {byte_start}..{byte_end}")]
    BeforeTextMismatch {
        file: PathBuf,
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in file of length {file_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        file_len: usize,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 validation error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Result of applying an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for success/already-applied"]
pub enum EditResult {
    /// Edit was written to disk
    Applied { file: PathBuf, bytes_changed: usize },
    /// The span already held new_text; the file was not touched
    AlreadyApplied { file: PathBuf },
}

impl Edit {
    /// Create a new edit with automatic verification generation.
    pub fn new(
        file: impl Into<PathBuf>,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl Into<String>,
    ) -> Self {
        let expected = expected_before.into();
        Self {
            file: file.into(),
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(&expected),
        }
    }

    /// Check the span against `content` and return the text currently in it.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end
            || self.byte_end > content.len()
            || !content.is_char_boundary(self.byte_start)
            || !content.is_char_boundary(self.byte_end)
        {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                file_len: content.len(),
            });
        }

        let current = &content[self.byte_start..self.byte_end];

        if current != self.new_text && !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                file: self.file.clone(),
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Render `content` with this edit applied, without touching the disk.
    pub fn preview(&self, content: &str) -> Result<String, EditError> {
        self.validate(content)?;

        let mut out = String::with_capacity(
            content.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        out.push_str(&content[..self.byte_start]);
        out.push_str(&self.new_text);
        out.push_str(&content[self.byte_end..]);
        Ok(out)
    }

    /// Apply this edit to the file system atomically.
    ///
    /// Uses tempfile + fsync + rename, so a failure at any point leaves the
    /// original file intact.
    pub fn apply(&self) -> Result<EditResult, EditError> {
        let bytes = fs::read(&self.file)?;
        let content = std::str::from_utf8(&bytes)?;

        if self.validate(content)? == self.new_text {
            return Ok(EditResult::AlreadyApplied {
                file: self.file.clone(),
            });
        }

        let new_content = self.preview(content)?;
        atomic_write(&self.file, new_content.as_bytes())?;

        // Bump mtime so watchers and bytecode caches notice the change
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(&self.file, now)?;

        Ok(EditResult::Applied {
            file: self.file.clone(),
            bytes_changed: self.new_text.len(),
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes. Permissions of an
/// existing target are carried over to the new file.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
