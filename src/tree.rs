//! Typed syntax tree over a Python module.
//!
//! The tree keeps only what declaration lookup needs: module-level items,
//! classes with their member items, and function definitions. Everything
//! else is an opaque [`Item::Other`] span. The source text is owned by the
//! tree, so serialization is a splice over the original bytes and anything
//! outside the replaced span (comments, blank lines, formatting) survives
//! unchanged.

use crate::pool::with_parser;
use crate::replacement::Replacement;
use crate::ts::TreeSitterError;
use std::fmt;
use std::ops::Range;
use tree_sitter::Node;

/// Half-open byte range into the tree's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    fn of(node: Node<'_>) -> Self {
        Span {
            start: node.start_byte(),
            end: node.end_byte(),
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// A `def` (or `async def`), possibly decorated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    /// Covers decorators when present.
    pub span: Span,
    /// 1-based line of the first token in `span`.
    pub line: usize,
    pub is_async: bool,
    pub decorated: bool,
}

/// A `class` definition and the items of its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: String,
    pub span: Span,
    pub line: usize,
    pub members: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Function(FunctionDecl),
    Class(ClassDecl),
    /// Any other statement, kept only as a span.
    Other(Span),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Function(func) => func.span,
            Item::Class(class) => class.span,
            Item::Other(span) => *span,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Item::Function(func) => Some(&func.name),
            Item::Class(class) => Some(&class.name),
            Item::Other(_) => None,
        }
    }
}

/// Where a declaration lookup succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchLocation {
    /// Module-level item at `index`.
    Module { index: usize },
    /// Member `member_index` of the class at module position `class_index`.
    ClassMember {
        class: String,
        class_index: usize,
        member_index: usize,
    },
}

impl fmt::Display for MatchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchLocation::Module { index } => write!(f, "module level, position {}", index),
            MatchLocation::ClassMember {
                class,
                member_index,
                ..
            } => write!(f, "class {}, member {}", class, member_index),
        }
    }
}

/// The byte span to overwrite and the text that goes there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub span: Span,
    pub before: String,
    pub after: String,
}

impl Splice {
    /// True when the span already holds the replacement text.
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// A parsed, syntactically valid Python module.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    items: Vec<Item>,
}

impl SyntaxTree {
    /// Parse `source`, rejecting it if tree-sitter reports any ERROR or
    /// MISSING node.
    pub fn parse(source: impl Into<String>) -> Result<Self, TreeSitterError> {
        let source = source.into();
        let items = with_parser(|parser| -> Result<Vec<Item>, TreeSitterError> {
            let parsed = parser.parse_with_source(&source)?;
            parsed.ensure_valid()?;
            Ok(collect_items(parsed.root_node(), &source))
        })??;

        Ok(Self { source, items })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Module-level items in source order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Find the function declaration named `name`.
    ///
    /// Module items are scanned in order. A class is searched one level deep
    /// and its first matching member function wins, ending the scan. The
    /// first module-level function with the name is used only when no class
    /// contains a match, wherever it sits relative to the classes.
    /// Classes sharing the name are never matches themselves.
    pub fn locate(&self, name: &str) -> Option<MatchLocation> {
        let mut module_match = None;

        for (index, item) in self.items.iter().enumerate() {
            match item {
                Item::Class(class) => {
                    let member = class
                        .members
                        .iter()
                        .position(|m| matches!(m, Item::Function(f) if f.name == name));
                    if let Some(member_index) = member {
                        return Some(MatchLocation::ClassMember {
                            class: class.name.clone(),
                            class_index: index,
                            member_index,
                        });
                    }
                }
                Item::Function(func) if func.name == name && module_match.is_none() => {
                    module_match = Some(MatchLocation::Module { index });
                }
                _ => {}
            }
        }

        module_match
    }

    /// The function declaration at a location returned by [`Self::locate`].
    pub fn declaration(&self, location: &MatchLocation) -> Option<&FunctionDecl> {
        let item = match location {
            MatchLocation::Module { index } => self.items.get(*index)?,
            MatchLocation::ClassMember {
                class_index,
                member_index,
                ..
            } => match self.items.get(*class_index)? {
                Item::Class(class) => class.members.get(*member_index)?,
                _ => return None,
            },
        };

        match item {
            Item::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Compute the splice that puts `replacement` at `location`, indented to
    /// the column of the declaration it replaces.
    pub fn splice(&self, location: &MatchLocation, replacement: &Replacement) -> Option<Splice> {
        let span = self.declaration(location)?.span;
        let indent = line_indent(&self.source, span.start);

        Some(Splice {
            span,
            before: self.source[span.range()].to_string(),
            after: replacement.indented(indent),
        })
    }

    /// Serialize the module with `splice` applied.
    pub fn render(&self, splice: &Splice) -> String {
        let Span { start, end } = splice.span;
        let mut out =
            String::with_capacity(self.source.len() - (end - start) + splice.after.len());
        out.push_str(&self.source[..start]);
        out.push_str(&splice.after);
        out.push_str(&self.source[end..]);
        out
    }
}

/// Leading whitespace of the line containing byte `offset`.
fn line_indent(source: &str, offset: usize) -> &str {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &source[line_start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width.min(offset - line_start)]
}

fn collect_items(parent: Node<'_>, source: &str) -> Vec<Item> {
    let mut cursor = parent.walk();
    parent
        .named_children(&mut cursor)
        .filter(|node| node.kind() != "comment")
        .map(|node| classify(node, source))
        .collect()
}

fn classify(node: Node<'_>, source: &str) -> Item {
    let (definition, decorated) = match node.kind() {
        "decorated_definition" => match node.child_by_field_name("definition") {
            Some(inner) => (inner, true),
            None => return Item::Other(Span::of(node)),
        },
        _ => (node, false),
    };

    let Some(name) = definition
        .child_by_field_name("name")
        .map(|n| source[n.byte_range()].to_string())
    else {
        return Item::Other(Span::of(node));
    };

    let span = Span::of(node);
    let line = node.start_position().row + 1;

    match definition.kind() {
        "function_definition" => Item::Function(FunctionDecl {
            name,
            span,
            line,
            is_async: definition.child(0).is_some_and(|c| c.kind() == "async"),
            decorated,
        }),
        "class_definition" => Item::Class(ClassDecl {
            name,
            span,
            line,
            members: definition
                .child_by_field_name("body")
                .map(|body| collect_items(body, source))
                .unwrap_or_default(),
        }),
        _ => Item::Other(span),
    }
}
