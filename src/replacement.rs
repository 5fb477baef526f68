//! Replacement declarations.
//!
//! The replacement argument is either literal Python source or the path of a
//! file holding it. [`ReplacementSource::resolve`] makes that choice
//! explicit: an argument naming an existing regular file is read, anything
//! else is taken as code.

use crate::pool::with_parser;
use crate::ts::TreeSitterError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// Where the replacement text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementSource {
    Literal(String),
    File(PathBuf),
}

impl ReplacementSource {
    /// Probe `arg` as a path first, then fall back to literal source.
    pub fn resolve(arg: &str) -> Self {
        let path = Path::new(arg);
        if !arg.is_empty() && path.is_file() {
            ReplacementSource::File(path.to_path_buf())
        } else {
            ReplacementSource::Literal(arg.to_string())
        }
    }

    /// Load the effective replacement text.
    pub fn read(&self) -> io::Result<String> {
        match self {
            ReplacementSource::Literal(code) => Ok(code.clone()),
            ReplacementSource::File(path) => fs::read_to_string(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Function,
    Class,
}

/// The first declaration of a replacement text, dedented to column zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    name: String,
    kind: DeclKind,
    text: String,
    /// Per line of `text`: true if the line starts inside a string literal
    /// and must not be re-indented.
    verbatim: Vec<bool>,
}

impl Replacement {
    /// Parse replacement source and keep its first top-level unit.
    ///
    /// Fails if the text has syntax errors, holds no statements, or starts
    /// with something other than a (possibly decorated) `def` or `class`.
    pub fn parse(source: &str) -> Result<Self, TreeSitterError> {
        let dedented = dedent(source)?;

        with_parser(|parser| -> Result<Self, TreeSitterError> {
            let parsed = parser.parse_with_source(&dedented)?;
            parsed.ensure_valid()?;

            let root = parsed.root_node();
            let mut cursor = root.walk();
            let first = root
                .named_children(&mut cursor)
                .find(|node| node.kind() != "comment")
                .ok_or(TreeSitterError::EmptyReplacement)?;

            let definition = match first.kind() {
                "decorated_definition" => first
                    .child_by_field_name("definition")
                    .ok_or(TreeSitterError::ParseFailed)?,
                _ => first,
            };
            let kind = match definition.kind() {
                "function_definition" => DeclKind::Function,
                "class_definition" => DeclKind::Class,
                other => {
                    return Err(TreeSitterError::NotADeclaration {
                        kind: other.to_string(),
                    })
                }
            };
            let name = definition
                .child_by_field_name("name")
                .map(|n| parsed.node_text(n).to_string())
                .ok_or(TreeSitterError::ParseFailed)?;

            let text = parsed.node_text(first).to_string();
            let mut strings = Vec::new();
            collect_strings(first, first.start_byte(), &mut strings);
            let verbatim = line_starts(&text)
                .map(|offset| inside_string(&strings, offset))
                .collect();

            Ok(Self {
                name,
                kind,
                text,
                verbatim,
            })
        })?
    }

    /// Name of the replacement declaration.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DeclKind {
        self.kind
    }

    /// The declaration text at column zero.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Re-indent for insertion at a position whose line starts with
    /// `indent`. The first line is returned bare since the insertion point
    /// already sits after the indentation.
    pub fn indented(&self, indent: &str) -> String {
        let mut out = String::with_capacity(self.text.len() + indent.len() * self.verbatim.len());
        for (i, line) in self.text.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
                if !self.verbatim[i] && !line.trim().is_empty() {
                    out.push_str(indent);
                }
            }
            out.push_str(line);
        }
        out
    }
}

/// Strip the first non-blank line's indentation from every line that
/// carries it, except lines starting inside a string literal.
fn dedent(source: &str) -> Result<String, TreeSitterError> {
    let base = source
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start_matches([' ', '\t']).len()])
        .unwrap_or("");

    if base.is_empty() {
        return Ok(source.to_string());
    }

    // String interiors are located on a fully stripped copy; stripping never
    // moves a line in or out of a literal.
    let stripped = strip_indent(source, base, &[]);
    let in_string = with_parser(|parser| -> Result<Vec<bool>, TreeSitterError> {
        let parsed = parser.parse_with_source(&stripped)?;
        parsed.ensure_valid()?;

        let mut strings = Vec::new();
        collect_strings(parsed.root_node(), 0, &mut strings);
        Ok(line_starts(&stripped)
            .map(|offset| inside_string(&strings, offset))
            .collect())
    })??;

    Ok(strip_indent(source, base, &in_string))
}

/// Remove `base` from the start of each line not flagged in `keep`.
fn strip_indent(source: &str, base: &str, keep: &[bool]) -> String {
    source
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            if keep.get(i).copied().unwrap_or(false) {
                line
            } else {
                line.strip_prefix(base).unwrap_or(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn inside_string(strings: &[(usize, usize)], offset: usize) -> bool {
    strings.iter().any(|(s, e)| *s < offset && offset < *e)
}

/// Byte offsets at which each line of `text` starts.
fn line_starts(text: &str) -> impl Iterator<Item = usize> + '_ {
    std::iter::once(0).chain(text.match_indices('\n').map(|(i, _)| i + 1))
}

/// String literal ranges under `node`, relative to `origin`.
fn collect_strings(node: Node<'_>, origin: usize, out: &mut Vec<(usize, usize)>) {
    if node.kind() == "string" {
        out.push((node.start_byte() - origin, node.end_byte() - origin));
        return;
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_strings(child, origin, out);
    }
}
