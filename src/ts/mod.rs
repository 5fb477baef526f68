//! Tree-sitter integration for Python sources.
//!
//! Provides the CST parser shared by the patcher and the verifier, plus
//! syntax validation based on tree-sitter ERROR and MISSING nodes.

pub mod errors;
pub mod parser;
pub mod validator;

pub use errors::TreeSitterError;
pub use parser::{ErrorNode, ParsedSource, PythonParser};
pub use validator::validate_syntax;
