//! Library-level integration tests: patch-then-verify workflows against
//! files on disk.

mod patch_verify;
mod properties;
