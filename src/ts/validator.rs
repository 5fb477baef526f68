use crate::pool::with_parser;
use crate::ts::errors::TreeSitterError;

/// Validate that Python source code has no syntax errors.
///
/// Returns Ok(()) if the code parses without ERROR or MISSING nodes.
pub fn validate_syntax(source: &str) -> Result<(), TreeSitterError> {
    with_parser(|parser| parser.parse_with_source(source)?.ensure_valid())?
}
