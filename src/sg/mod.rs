//! ast-grep integration: full-tree walks over Python sources.

pub mod lang;

pub use lang::{python, SupportLang};
