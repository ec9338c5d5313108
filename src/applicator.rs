//! Turns one `Mutation` plus the current file text into mutated text.
//!
//! Token-level mutations are positional substitutions restricted to the
//! anchor line; return statements are disabled with a comment marker; if
//! statements are rewritten through a fresh parse.

use tree_sitter::Node;

use crate::error::{ApplyError, ParseError};
use crate::grammar::Grammar;
use crate::mutants::{Mutation, MutationKind, Strategy};
use crate::syntax::{self, Edit, SyntaxTree, Visitor, Walk, WalkContext};
use crate::{Language, detect_language};

pub fn apply(mutation: &Mutation, source: &str) -> Result<String, ApplyError> {
    match mutation.kind.strategy() {
        Strategy::Substitute => substitute(
            source,
            mutation.line,
            mutation.column,
            &mutation.original,
            mutation.replacement(),
        ),
        Strategy::Disable => disable(source, mutation, language_of(mutation)?.grammar()),
        Strategy::Structural => transform(source, mutation, language_of(mutation)?),
    }
}

/// Undo a substitution or a disable on `mutated`. Structural rewrites have no
/// textual inverse and return `None`; the runner's snapshot covers them.
pub fn revert(mutation: &Mutation, mutated: &str) -> Option<Result<String, ApplyError>> {
    match mutation.kind.strategy() {
        Strategy::Substitute => Some(substitute(
            mutated,
            mutation.line,
            mutation.column,
            mutation.replacement(),
            &mutation.original,
        )),
        Strategy::Disable => Some(
            language_of(mutation).and_then(|language| enable(mutated, mutation, language.grammar())),
        ),
        Strategy::Structural => None,
    }
}

/// Check that mutated text still parses as the mutation's language.
pub fn verify(mutation: &Mutation, text: &str) -> Result<(), ParseError> {
    match detect_language(mutation.path()) {
        Some(language) => syntax::verify(language, text),
        None => Ok(()),
    }
}

fn language_of(mutation: &Mutation) -> Result<Language, ApplyError> {
    detect_language(mutation.path()).ok_or_else(|| ApplyError::UnsupportedLanguage(mutation.file.clone()))
}

/// Replace `original` on line `line` with `replacement`, preferring the
/// occurrence that starts at `column`. Never looks at another line.
pub fn substitute(
    source: &str,
    line: usize,
    column: usize,
    original: &str,
    replacement: &str,
) -> Result<String, ApplyError> {
    let mut lines: Vec<String> = source.split('\n').map(String::from).collect();
    let index = line_index(line, lines.len())?;
    let text = &mut lines[index];

    let at = locate(text, column, original).ok_or_else(|| ApplyError::AnchorNotFound {
        original: original.to_string(),
        line,
    })?;
    text.replace_range(at..at + original.len(), replacement);

    Ok(lines.join("\n"))
}

fn line_index(line: usize, lines: usize) -> Result<usize, ApplyError> {
    if line == 0 || line > lines {
        return Err(ApplyError::LineOutOfRange { line, lines });
    }
    Ok(line - 1)
}

/// Byte offset of `needle` on `text`: exact column hit first, then the first
/// occurrence. An empty needle only matches at the column itself.
fn locate(text: &str, column: usize, needle: &str) -> Option<usize> {
    let hint = column.checked_sub(1).filter(|c| text.is_char_boundary(*c));
    if let Some(at) = hint {
        if text[at..].starts_with(needle) {
            return Some(at);
        }
    }
    if needle.is_empty() {
        return None;
    }
    text.find(needle)
}

fn disable(source: &str, mutation: &Mutation, grammar: &Grammar) -> Result<String, ApplyError> {
    let mut lines: Vec<String> = source.split('\n').map(String::from).collect();
    let index = line_index(mutation.line, lines.len())?;
    let text = &mut lines[index];

    let anchor = mutation.original.trim();
    if anchor.is_empty() || !text.contains(anchor) {
        return Err(ApplyError::AnchorNotFound {
            original: mutation.original.clone(),
            line: mutation.line,
        });
    }

    let indent = text.len() - text.trim_start().len();
    text.insert_str(indent, &grammar.disable_marker());
    Ok(lines.join("\n"))
}

fn enable(source: &str, mutation: &Mutation, grammar: &Grammar) -> Result<String, ApplyError> {
    let marker = grammar.disable_marker();
    let mut lines: Vec<String> = source.split('\n').map(String::from).collect();
    let index = line_index(mutation.line, lines.len())?;
    let text = &mut lines[index];

    let indent = text.len() - text.trim_start().len();
    if !text[indent..].starts_with(&marker) {
        return Err(ApplyError::AnchorNotFound {
            original: marker,
            line: mutation.line,
        });
    }
    text.replace_range(indent..indent + marker.len(), "");
    Ok(lines.join("\n"))
}

fn transform(source: &str, mutation: &Mutation, language: Language) -> Result<String, ApplyError> {
    let tree = SyntaxTree::parse(language, source)?;
    let grammar = language.grammar();
    let line = mutation.line;

    let conditional =
        find_conditional(&tree, grammar, line, mutation.column).ok_or(ApplyError::NoConditional { line })?;

    let edit = if mutation.kind == MutationKind::ElseRemoval {
        let consequence = conditional
            .child_by_field_name("consequence")
            .ok_or(ApplyError::NoElseBranch { line })?;
        let mut cursor = conditional.walk();
        // Python chains elif clauses as repeated alternatives; drop them all.
        let last = conditional
            .children_by_field_name("alternative", &mut cursor)
            .last()
            .ok_or(ApplyError::NoElseBranch { line })?;
        Edit::delete(consequence.end_byte()..last.end_byte())
    } else {
        let condition = conditional
            .child_by_field_name("condition")
            .ok_or(ApplyError::NoConditional { line })?;
        if grammar.unnegatable_conditions.contains(&condition.kind()) {
            return Err(ApplyError::NotNegatable { line });
        }
        let text = tree.text(condition);
        if text != mutation.original {
            return Err(ApplyError::AnchorNotFound {
                original: mutation.original.clone(),
                line,
            });
        }
        Edit::replace(condition, grammar.negate(text))
    };

    Ok(tree.render(&[edit]))
}

struct Conditionals<'t> {
    grammar: &'static Grammar,
    line: usize,
    found: Vec<Node<'t>>,
}

impl<'t> Visitor<'t> for Conditionals<'t> {
    fn visit(&mut self, node: Node<'t>, _ctx: &WalkContext<'t>) -> Walk {
        let (line, _) = syntax::position(node);
        if line > self.line {
            return Walk::Skip;
        }
        if line == self.line && self.grammar.if_kinds.contains(&node.kind()) {
            self.found.push(node);
        }
        Walk::Descend
    }
}

fn find_conditional<'t>(
    tree: &'t SyntaxTree,
    grammar: &'static Grammar,
    line: usize,
    column: usize,
) -> Option<Node<'t>> {
    let mut visitor = Conditionals {
        grammar,
        line,
        found: Vec::new(),
    };
    syntax::walk(tree, &mut visitor);

    let exact = visitor
        .found
        .iter()
        .copied()
        .find(|node| syntax::position(*node) == (line, column));
    exact.or_else(|| visitor.found.first().copied())
}
