//! Decl Patcher: named-declaration replacement for Python sources
//!
//! Locates a function by name in a Python file (at module level, or one
//! level inside a class body), replaces it with caller-supplied source, and
//! writes the file back. A companion verifier re-parses the result and
//! confirms the function is present.
//!
//! # Architecture
//!
//! Files are parsed with tree-sitter into a typed [`SyntaxTree`] holding
//! module items, classes and functions as byte spans. A replacement compiles
//! down to a single [`Edit`]: a verified byte-span replacement. Everything
//! outside the replaced declaration is emitted byte-for-byte.
//!
//! # Safety
//!
//! - Source, replacement and patched output are all syntax-checked
//! - Nothing is written unless every check passes
//! - Atomic file writes (tempfile + fsync + rename)
//! - Idempotent: re-applying the same replacement writes nothing
//!
//! # Example
//!
//! ```no_run
//! use decl_patcher::{apply, check};
//!
//! apply("robot.py", "move", "def move(self):\n    return True\n")?;
//! check("robot.py", "move")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod edit;
pub mod patcher;
pub mod pool;
pub mod replacement;
pub mod safety;
pub mod sg;
pub mod tree;
pub mod ts;
pub mod verifier;

use serde::Serialize;

/// Coarse classification of failures, shared by every error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Source, replacement or patched output is not valid Python.
    Parse,
    /// No declaration with the requested name.
    NotFound,
    /// Reading or writing a file failed, or a path was rejected.
    Io,
}

impl ErrorKind {
    /// Process exit status for this kind of failure.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::NotFound => 1,
            ErrorKind::Parse => 2,
            ErrorKind::Io => 3,
        }
    }
}

// Re-exports
pub use config::{
    apply_manifest, check_manifest, load_from_path, load_from_str, ConfigError, PatchManifest,
    PatchResult, RunError,
};
pub use edit::{Edit, EditError, EditResult, EditVerification};
pub use patcher::{apply, apply_from, plan, plan_from, PatchError, PatchOutcome, PatchPlan};
pub use replacement::{DeclKind, Replacement, ReplacementSource};
pub use safety::{SafetyError, WorkspaceGuard};
pub use tree::{ClassDecl, FunctionDecl, Item, MatchLocation, Span, SyntaxTree};
pub use ts::{PythonParser, TreeSitterError};
pub use verifier::{check, check_source, Verified, VerifyError};
