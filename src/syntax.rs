//! Parse/render capability over tree-sitter, plus the traversal the generator
//! and the structural applicator share.

use std::ops::Range;

use tree_sitter::{Node, Parser, Tree};

use crate::Language;
use crate::error::ParseError;

/// A cleanly parsed source file. Holds the text the tree points into.
pub struct SyntaxTree {
    language: Language,
    source: String,
    tree: Tree,
}

/// Replace `range` (byte offsets into the parsed source) with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

impl Edit {
    pub fn replace(node: Node<'_>, text: impl Into<String>) -> Self {
        Self {
            range: node.start_byte()..node.end_byte(),
            text: text.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self {
            range,
            text: String::new(),
        }
    }
}

impl SyntaxTree {
    /// Fails on any ERROR or MISSING node; tree-sitter's recovery is not
    /// accepted as a successful parse.
    pub fn parse(language: Language, source: impl Into<String>) -> Result<Self, ParseError> {
        let source = source.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language.tree_sitter())
            .map_err(|e| ParseError::Grammar {
                language: language.name(),
                message: e.to_string(),
            })?;
        let tree = parser.parse(&source, None).ok_or(ParseError::NoTree)?;

        if let Some(bad) = first_error(tree.root_node()) {
            let pos = bad.start_position();
            return Err(ParseError::Syntax {
                line: pos.row + 1,
                column: pos.column + 1,
            });
        }

        Ok(Self {
            language,
            source,
            tree,
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        node_text(node, &self.source)
    }

    /// Splice `edits` into the source. Bytes outside the edits are copied verbatim.
    pub fn render(&self, edits: &[Edit]) -> String {
        let mut sorted: Vec<&Edit> = edits.iter().collect();
        sorted.sort_by_key(|e| e.range.start);

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for edit in sorted {
            debug_assert!(edit.range.start >= cursor, "overlapping edits");
            out.push_str(&self.source[cursor..edit.range.start]);
            out.push_str(&edit.text);
            cursor = edit.range.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

/// Check that `text` parses cleanly as `language`.
pub fn verify(language: Language, text: &str) -> Result<(), ParseError> {
    SyntaxTree::parse(language, text).map(|_| ())
}

pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// 1-based (line, column) of a node's first byte.
pub fn position(node: Node<'_>) -> (usize, usize) {
    let pos = node.start_position();
    (pos.row + 1, pos.column + 1)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    // has_error() but no offending descendant: report the node itself.
    Some(node)
}

/// Traversal state threaded through the walk by parameter.
#[derive(Debug, Default, Clone)]
pub struct WalkContext<'t> {
    /// Names of the functions enclosing the current node, outermost first.
    /// Includes the current node when it declares a function.
    pub functions: Vec<&'t str>,
}

impl WalkContext<'_> {
    pub fn current_function(&self) -> Option<&str> {
        self.functions.last().copied()
    }

    pub fn within(&self, name: &str) -> bool {
        self.functions.iter().any(|f| *f == name)
    }
}

/// Whether the walk descends into a node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Descend,
    Skip,
}

pub trait Visitor<'t> {
    fn visit(&mut self, node: Node<'t>, ctx: &WalkContext<'t>) -> Walk;
}

/// Pre-order walk over every node of `tree`.
pub fn walk<'t, V: Visitor<'t>>(tree: &'t SyntaxTree, visitor: &mut V) {
    let grammar = tree.language.grammar();
    let mut ctx = WalkContext::default();
    walk_node(tree.root(), tree.source(), grammar, &mut ctx, visitor);
}

fn walk_node<'t, V: Visitor<'t>>(
    node: Node<'t>,
    source: &'t str,
    grammar: &crate::grammar::Grammar,
    ctx: &mut WalkContext<'t>,
    visitor: &mut V,
) {
    let declared = grammar.function_name(node, source);
    if let Some(name) = declared {
        ctx.functions.push(name);
    }

    if visitor.visit(node, ctx) == Walk::Descend {
        let count = node.child_count();
        for i in 0..count {
            if let Some(child) = node.child(i) {
                walk_node(child, source, grammar, ctx, visitor);
            }
        }
    }

    if declared.is_some() {
        ctx.functions.pop();
    }
}
