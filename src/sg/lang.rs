//! Python language support via ast-grep-language.
//!
//! The built-in `SupportLang::Python` wraps the same tree-sitter grammar the
//! `ts` parser uses, so both views of a file agree on node kinds.

pub use ast_grep_language::SupportLang;

/// Get the Python language for ast-grep operations.
pub fn python() -> SupportLang {
    SupportLang::Python
}
