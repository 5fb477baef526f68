//! Post-condition check for patched files.
//!
//! Unlike the patcher's two-level scan, the verifier walks every node of the
//! tree: a function counts wherever it is nested (methods of inner classes,
//! closures defined inside functions, definitions under `if` blocks).

use crate::sg::lang::python;
use crate::ts::{validate_syntax, TreeSitterError};
use crate::ErrorKind;
use ast_grep_core::AstGrep;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
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

    #[error("function `{name}` not found in {file}")]
    NotFound { name: String, file: PathBuf },
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::Io { .. } => ErrorKind::Io,
            VerifyError::InvalidSource { .. } => ErrorKind::Parse,
            VerifyError::NotFound { .. } => ErrorKind::NotFound,
        }
    }
}

/// A function definition found by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub name: String,
    /// 1-based line of the `def` keyword (or `async`).
    pub line: usize,
    pub byte_start: usize,
}

/// Confirm that `file` defines a function called `name` at any depth.
pub fn check(file: impl AsRef<Path>, name: &str) -> Result<Verified, VerifyError> {
    let file = file.as_ref();
    let source = fs::read_to_string(file).map_err(|source| VerifyError::Io {
        path: file.to_path_buf(),
        source,
    })?;

    validate_syntax(&source).map_err(|source| VerifyError::InvalidSource {
        file: file.to_path_buf(),
        source,
    })?;

    check_source(&source, name).ok_or_else(|| VerifyError::NotFound {
        name: name.to_string(),
        file: file.to_path_buf(),
    })
}

/// Walk `source` depth-first and return the first function named `name`.
///
/// The source is assumed to be valid; ERROR subtrees are walked like any
/// other node.
pub fn check_source(source: &str, name: &str) -> Option<Verified> {
    let sg = AstGrep::new(source, python());
    let root = sg.root();

    for node in root.dfs() {
        if node.kind() != "function_definition" {
            continue;
        }

        let Some(name_node) = node.field("name") else {
            continue;
        };
        if &source[name_node.range()] != name {
            continue;
        }

        let byte_start = node.range().start;
        return Some(Verified {
            name: name.to_string(),
            line: source[..byte_start].matches('\n').count() + 1,
            byte_start,
        });
    }

    None
}
