use crate::ts::errors::TreeSitterError;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Parser, Tree};

/// Tree-sitter parser wrapper for Python source code.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Create a new parser bound to the Python grammar.
    pub fn new() -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        // Get the tree-sitter Language from ast-grep-language
        let ts_lang = SupportLang::Python.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| TreeSitterError::LanguageSet)?;

        Ok(Self { parser })
    }

    /// Parse source code into a tree-sitter Tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, TreeSitterError> {
        self.parser
            .parse(source, None)
            .ok_or(TreeSitterError::ParseFailed)
    }

    /// Parse source code and return the tree along with the source.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, TreeSitterError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

/// A parsed source file with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    /// Get the root node of the tree.
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Check if the tree contains any ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Get all ERROR and MISSING nodes in the tree, in document order.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &mut errors);
        errors
    }

    /// Fail with a syntax error describing the first broken node, if any.
    pub fn ensure_valid(&self) -> Result<(), TreeSitterError> {
        let errors = self.error_nodes();
        match errors.as_slice() {
            [] => Ok(()),
            [only] => Err(TreeSitterError::SyntaxError {
                line: only.start_point.row + 1,
                column: only.start_point.column + 1,
                byte_start: only.byte_start,
                byte_end: only.byte_end,
            }),
            [first, ..] => Err(TreeSitterError::MultipleSyntaxErrors {
                count: errors.len(),
                line: first.start_point.row + 1,
            }),
        }
    }

    /// Extract text for a node's byte range.
    pub fn node_text(&self, node: tree_sitter::Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }
}

/// Information about an ERROR node in the parse tree.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
    pub end_point: tree_sitter::Point,
}

fn collect_error_nodes(node: tree_sitter::Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        errors.push(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            start_point: node.start_position(),
            end_point: node.end_position(),
        });
        // Everything below an ERROR node is already accounted for.
        return;
    }

    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}
