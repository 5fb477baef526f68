//! Thread-local parser pooling.
//!
//! Every patch and verify operation parses at least twice (target file and
//! replacement, or patched output). Keeping one Python parser per thread
//! avoids re-initializing the grammar each time.

use crate::ts::{PythonParser, TreeSitterError};
use std::cell::RefCell;

thread_local! {
    static PYTHON_PARSER: RefCell<Option<PythonParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// On first call per thread, creates new parser. Subsequent calls reuse
/// the same parser instance.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use decl_patcher::pool::with_parser;
///
/// let has_errors = with_parser(|parser| {
///     parser.parse_with_source("def main():\n    pass\n").map(|p| p.has_errors())
/// })??;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut PythonParser) -> R,
{
    PYTHON_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        let parser = match slot.take() {
            Some(parser) => parser,
            None => PythonParser::new()?,
        };
        let parser = slot.insert(parser);
        Ok(f(parser))
    })
}
