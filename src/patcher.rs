//! Declaration replacement.
//!
//! [`apply`] parses the target file, locates the named function (module level
//! or one level into a class body), splices in the replacement declaration,
//! re-validates the result and writes it back atomically. Every failure is
//! raised before the write, so the file is either fully patched or untouched.

use crate::edit::{Edit, EditError, EditResult};
use crate::replacement::{Replacement, ReplacementSource};
use crate::tree::{MatchLocation, SyntaxTree};
use crate::ts::{validate_syntax, TreeSitterError};
use crate::ErrorKind;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid syntax in {file}: {source}")]
    InvalidSource {
        file: PathBuf,
        #[source]
        source: TreeSitterError,
    },

    #[error("invalid replacement for `{name}`: {source}")]
    InvalidReplacement {
        name: String,
        #[source]
        source: TreeSitterError,
    },

    #[error("function `{name}` not found in {file}")]
    NotFound { name: String, file: PathBuf },

    #[error("replacing `{name}` would leave {file} with invalid syntax: {source}")]
    InvalidResult {
        name: String,
        file: PathBuf,
        #[source]
        source: TreeSitterError,
    },

    #[error(transparent)]
    Edit(#[from] EditError),
}

impl PatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatchError::InvalidSource { .. }
            | PatchError::InvalidReplacement { .. }
            | PatchError::InvalidResult { .. } => ErrorKind::Parse,
            PatchError::NotFound { .. } => ErrorKind::NotFound,
            PatchError::Io { .. } | PatchError::Edit(_) => ErrorKind::Io,
        }
    }
}

/// Outcome of a successful [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchOutcome should be checked for applied/already-applied"]
pub enum PatchOutcome {
    /// The file was rewritten.
    Applied {
        file: PathBuf,
        location: MatchLocation,
    },
    /// The declaration already matched the replacement; nothing was written.
    AlreadyApplied {
        file: PathBuf,
        location: MatchLocation,
    },
}

impl PatchOutcome {
    pub fn location(&self) -> &MatchLocation {
        match self {
            PatchOutcome::Applied { location, .. } | PatchOutcome::AlreadyApplied { location, .. } => {
                location
            }
        }
    }
}

/// Everything [`apply`] would do, computed without writing.
#[derive(Debug, Clone)]
pub struct PatchPlan {
    pub file: PathBuf,
    pub name: String,
    pub location: MatchLocation,
    /// 1-based line of the declaration being replaced.
    pub line: usize,
    pub original: String,
    pub patched: String,
    pub edit: Edit,
}

impl PatchPlan {
    /// True when applying would not change the file.
    pub fn is_noop(&self) -> bool {
        self.original == self.patched
    }
}

/// Compute the replacement of `name` in `file` without touching the disk.
///
/// `replacement` is resolved through [`ReplacementSource::resolve`]: a path to
/// an existing file is read, anything else is used as source text.
pub fn plan(
    file: impl AsRef<Path>,
    name: &str,
    replacement: &str,
) -> Result<PatchPlan, PatchError> {
    plan_from(file, name, &ReplacementSource::resolve(replacement))
}

/// [`plan`] with the replacement source already resolved.
pub fn plan_from(
    file: impl AsRef<Path>,
    name: &str,
    replacement: &ReplacementSource,
) -> Result<PatchPlan, PatchError> {
    let file = file.as_ref();

    let source = fs::read_to_string(file).map_err(|source| PatchError::Io {
        path: file.to_path_buf(),
        source,
    })?;

    let tree = SyntaxTree::parse(source).map_err(|source| PatchError::InvalidSource {
        file: file.to_path_buf(),
        source,
    })?;

    let replacement_text = replacement.read().map_err(|source| PatchError::Io {
        path: match replacement {
            ReplacementSource::File(path) => path.clone(),
            ReplacementSource::Literal(_) => file.to_path_buf(),
        },
        source,
    })?;

    let new_decl =
        Replacement::parse(&replacement_text).map_err(|source| PatchError::InvalidReplacement {
            name: name.to_string(),
            source,
        })?;

    let not_found = || PatchError::NotFound {
        name: name.to_string(),
        file: file.to_path_buf(),
    };
    let location = tree.locate(name).ok_or_else(not_found)?;
    let line = tree.declaration(&location).ok_or_else(not_found)?.line;
    let splice = tree.splice(&location, &new_decl).ok_or_else(not_found)?;

    let patched = tree.render(&splice);
    validate_syntax(&patched).map_err(|source| PatchError::InvalidResult {
        name: name.to_string(),
        file: file.to_path_buf(),
        source,
    })?;

    let edit = Edit::new(
        file,
        splice.span.start,
        splice.span.end,
        splice.after,
        splice.before,
    );

    Ok(PatchPlan {
        file: file.to_path_buf(),
        name: name.to_string(),
        location,
        line,
        original: tree.source().to_string(),
        patched,
        edit,
    })
}

/// Replace the function `name` in `file` with the declaration in
/// `replacement` and write the file back.
///
/// Fails with [`PatchError::NotFound`] if no function of that name exists at
/// module level or directly inside a class body.
pub fn apply(
    file: impl AsRef<Path>,
    name: &str,
    replacement: &str,
) -> Result<PatchOutcome, PatchError> {
    apply_from(file, name, &ReplacementSource::resolve(replacement))
}

/// [`apply`] with the replacement source already resolved.
pub fn apply_from(
    file: impl AsRef<Path>,
    name: &str,
    replacement: &ReplacementSource,
) -> Result<PatchOutcome, PatchError> {
    let plan = plan_from(file, name, replacement)?;

    match plan.edit.apply()? {
        EditResult::Applied { file, .. } => Ok(PatchOutcome::Applied {
            file,
            location: plan.location,
        }),
        EditResult::AlreadyApplied { file } => Ok(PatchOutcome::AlreadyApplied {
            file,
            location: plan.location,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(content: &str) -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("robot.py");
        fs::write(&path, content).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn replaces_class_member() {
        let (_dir, path) = write_fixture("class Robot:\n    def move(self):\n        pass\n");

        let outcome = apply(&path, "move", "def move(self):\n    return True").unwrap();

        assert!(matches!(outcome, PatchOutcome::Applied { .. }));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "class Robot:\n    def move(self):\n        return True\n"
        );
    }

    #[test]
    fn replaces_module_function() {
        let (_dir, path) = write_fixture("def start():\n    pass\n");

        apply(&path, "start", "def start():\n    return 1").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "def start():\n    return 1\n");
    }

    #[test]
    fn reapplying_is_a_noop() {
        let (_dir, path) = write_fixture("def start():\n    pass\n");

        apply(&path, "start", "def start():\n    return 1").unwrap();
        let first = fs::read_to_string(&path).unwrap();
        let outcome = apply(&path, "start", "def start():\n    return 1").unwrap();

        assert!(matches!(outcome, PatchOutcome::AlreadyApplied { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn not_found_leaves_file_untouched() {
        let original = "def start():\n    pass\n\nclass Robot:\n    def move(self):\n        pass\n";
        let (_dir, path) = write_fixture(original);

        let err = apply(&path, "stop_now", "def stop_now():\n    return 0").unwrap_err();

        assert!(matches!(err, PatchError::NotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("stop_now"));
        assert!(err.to_string().contains("robot.py"));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn invalid_source_is_a_parse_error() {
        let original = "def start(:\n    pass\n";
        let (_dir, path) = write_fixture(original);

        let err = apply(&path, "start", "def start():\n    return 1").unwrap_err();

        assert!(matches!(err, PatchError::InvalidSource { .. }));
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn invalid_replacement_is_a_parse_error() {
        let original = "def start():\n    pass\n";
        let (_dir, path) = write_fixture(original);

        let err = apply(&path, "start", "def start(\n    return 1").unwrap_err();

        assert!(matches!(err, PatchError::InvalidReplacement { .. }));
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn replacement_read_from_file() {
        let (dir, path) = write_fixture("class Robot:\n    def move(self):\n        pass\n");
        let code_path = dir.path().join("move.py");
        fs::write(&code_path, "def move(self, speed):\n    return speed\n").unwrap();

        apply(&path, "move", code_path.to_str().unwrap()).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "class Robot:\n    def move(self, speed):\n        return speed\n"
        );
    }

    #[test]
    fn plan_does_not_write() {
        let original = "def start():\n    pass\n";
        let (_dir, path) = write_fixture(original);

        let plan = plan(&path, "start", "def start():\n    return 1").unwrap();

        assert!(!plan.is_noop());
        assert_eq!(plan.line, 1);
        assert_eq!(plan.location, MatchLocation::Module { index: 0 });
        assert_eq!(plan.patched, "def start():\n    return 1\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn missing_file_is_io_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = apply(
            temp_dir.path().join("absent.py"),
            "start",
            "def start():\n    return 1",
        )
        .unwrap_err();

        assert!(matches!(err, PatchError::Io { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
