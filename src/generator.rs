use std::path::Path;
use std::str::FromStr;

use tree_sitter::Node;

use crate::error::{GenerateError, ParseError};
use crate::grammar::Grammar;
use crate::mutants::Mutation;
use crate::operators::{self, MutationOp};
use crate::syntax::{self, SyntaxTree, Visitor, Walk, WalkContext, node_text};
use crate::{Language, detect_language};

/// Inclusive 1-based line range, written `start-end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }
}

impl FromStr for LineRange {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GenerateError::InvalidLineRange(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start: usize = start.trim().parse().map_err(|_| invalid())?;
        let end: usize = end.trim().parse().map_err(|_| invalid())?;
        if start == 0 || end < start {
            return Err(invalid());
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Only mutate inside this function (and anything nested in it).
    pub function: Option<String>,
    /// Only mutate nodes starting on these lines. Other nodes are still walked.
    pub lines: Option<LineRange>,
}

/// Read `path`, detect its language and produce its mutation catalog.
pub fn generate_file(path: &Path, options: &GenerateOptions) -> Result<Vec<Mutation>, GenerateError> {
    let language =
        detect_language(path).ok_or_else(|| GenerateError::UnsupportedLanguage(path.to_path_buf()))?;
    let source = std::fs::read_to_string(path).map_err(|source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    discover_mutations(&path.to_string_lossy(), language, &source, options)
}

/// Walk `source` and emit mutations in traversal order with ids `M0, M1, ...`.
///
/// `file` is recorded verbatim on every mutation. Unparsable input is fatal.
pub fn discover_mutations(
    file: &str,
    language: Language,
    source: &str,
    options: &GenerateOptions,
) -> Result<Vec<Mutation>, GenerateError> {
    let tree = SyntaxTree::parse(language, source).map_err(|source| GenerateError::Parse {
        path: file.into(),
        source,
    })?;

    if let Some(name) = options.function.as_deref() {
        let available = function_names(&tree);
        if !available.iter().any(|n| n == name) {
            return Err(GenerateError::FunctionNotFound {
                name: name.to_string(),
                available,
            });
        }
    }

    let mut collector = Collector {
        grammar: language.grammar(),
        file,
        source: tree.source(),
        options,
        mutations: Vec::new(),
    };
    syntax::walk(&tree, &mut collector);

    tracing::debug!(
        file,
        count = collector.mutations.len(),
        "generated mutations"
    );
    Ok(collector.mutations)
}

/// Names of every function declared in `source`, in source order.
pub fn list_functions(language: Language, source: &str) -> Result<Vec<String>, ParseError> {
    let tree = SyntaxTree::parse(language, source)?;
    Ok(function_names(&tree))
}

fn function_names(tree: &SyntaxTree) -> Vec<String> {
    struct Names<'t> {
        grammar: &'static Grammar,
        source: &'t str,
        names: Vec<String>,
    }

    impl<'t> Visitor<'t> for Names<'t> {
        fn visit(&mut self, node: Node<'t>, _ctx: &WalkContext<'t>) -> Walk {
            if let Some(name) = self.grammar.function_name(node, self.source) {
                self.names.push(name.to_string());
            }
            Walk::Descend
        }
    }

    let mut names = Names {
        grammar: tree.language().grammar(),
        source: tree.source(),
        names: Vec::new(),
    };
    syntax::walk(tree, &mut names);
    names.names
}

struct Collector<'t> {
    grammar: &'static Grammar,
    file: &'t str,
    source: &'t str,
    options: &'t GenerateOptions,
    mutations: Vec<Mutation>,
}

impl<'t> Visitor<'t> for Collector<'t> {
    fn visit(&mut self, node: Node<'t>, ctx: &WalkContext<'t>) -> Walk {
        if let Some(target) = self.options.function.as_deref() {
            if !ctx.within(target) {
                // Other functions are pruned; everything else is walked to reach the target.
                return if self.grammar.function_name(node, self.source).is_some() {
                    Walk::Skip
                } else {
                    Walk::Descend
                };
            }
        }

        if let Some(range) = self.options.lines {
            let (line, _) = syntax::position(node);
            if !range.contains(line) {
                return Walk::Descend;
            }
        }

        self.mutate(node);
        Walk::Descend
    }
}

impl<'t> Collector<'t> {
    fn mutate(&mut self, node: Node<'t>) {
        let kind = node.kind();
        let g = self.grammar;

        if g.binary_kinds.contains(&kind) {
            self.collect_binary_mutations(node);
        } else if g.unary_kinds.contains(&kind) {
            self.collect_unary_mutations(node);
        } else if g.integer_kinds.contains(&kind) {
            self.collect_integer_mutations(node);
        } else if g.string_kinds.contains(&kind) {
            self.collect_string_mutations(node);
        } else if g.return_kinds.contains(&kind) {
            self.collect_return_mutations(node);
        } else if g.if_kinds.contains(&kind) {
            self.collect_if_mutations(node);
        } else if g.assignment_kinds.contains(&kind) {
            self.collect_token_mutations(node, operators::assignment_mutations);
        } else if g.inc_dec_kinds.contains(&kind) {
            self.collect_token_mutations(node, operators::inc_dec_mutations);
        }
    }

    fn push(&mut self, anchor: Node<'t>, original: &str, op: MutationOp) {
        let (line, column) = syntax::position(anchor);
        self.mutations.push(Mutation {
            id: format!("M{}", self.mutations.len()),
            file: self.file.to_string(),
            line,
            column,
            kind: op.kind,
            original: original.to_string(),
            mutated: op.replacement,
            description: op.description,
            priority: op.priority,
        });
    }

    fn text(&self, node: Node<'t>) -> &'t str {
        node_text(node, self.source)
    }

    /// Anonymous children are the operator tokens.
    fn operator_tokens(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut tokens = Vec::new();
        let count = node.child_count();
        for i in 0..count {
            if let Some(child) = node.child(i) {
                if !child.is_named() {
                    tokens.push(child);
                }
            }
        }
        tokens
    }

    fn has_string_operand(&self, node: Node<'t>) -> bool {
        ["left", "right"].iter().any(|field| {
            node.child_by_field_name(*field)
                .is_some_and(|operand| self.grammar.string_kinds.contains(&operand.kind()))
        })
    }

    fn collect_binary_mutations(&mut self, node: Node<'t>) {
        for token in self.operator_tokens(node) {
            let op = self.text(token);
            let ops = if operators::is_arithmetic(op) {
                // Skip string concatenation
                if op == "+" && self.has_string_operand(node) {
                    continue;
                }
                operators::arithmetic_mutations(op)
            } else if operators::is_relational(op) {
                operators::relational_mutations(op)
            } else {
                operators::logical_mutations(op, self.grammar)
            };
            for mutation in ops {
                self.push(token, op, mutation);
            }
        }
    }

    fn collect_unary_mutations(&mut self, node: Node<'t>) {
        let Some(token) = node.child(0) else {
            return;
        };
        if token.is_named() {
            return;
        }
        let op = self.text(token);
        if op == self.grammar.not_op {
            self.push(token, op, operators::negation_removal());
        } else if op == "-" {
            self.push(token, op, operators::unary_minus_mutation(self.grammar));
        }
    }

    fn collect_integer_mutations(&mut self, node: Node<'t>) {
        let value = self.text(node);
        if !operators::is_integer_text(value) {
            return;
        }
        for op in operators::integer_mutations(value) {
            self.push(node, value, op);
        }
    }

    fn collect_string_mutations(&mut self, node: Node<'t>) {
        let value = self.text(node);
        // A line anchor cannot hold a literal spanning several lines.
        if value.contains('\n') || self.grammar.is_docstring(node) {
            return;
        }
        for op in operators::string_mutations(value) {
            self.push(node, value, op);
        }
    }

    fn collect_return_mutations(&mut self, node: Node<'t>) {
        let mut values = Vec::new();
        let count = node.named_child_count();
        for i in 0..count {
            let Some(child) = node.named_child(i) else {
                continue;
            };
            if child.kind() == "expression_list" {
                let inner = child.named_child_count();
                values.extend((0..inner).filter_map(|j| child.named_child(j)));
            } else {
                values.push(child);
            }
        }

        for (index, value) in values.into_iter().enumerate() {
            let text = self.text(value);
            for op in operators::return_value_mutations(index, text, self.grammar) {
                self.push(value, text, op);
            }
        }

        // Always offered, in addition to any value mutations.
        let first_line = self.text(node).lines().next().unwrap_or_default().trim_end();
        self.push(node, first_line, operators::statement_removal());
    }

    fn collect_if_mutations(&mut self, node: Node<'t>) {
        if let Some(condition) = node.child_by_field_name("condition") {
            if !self
                .grammar
                .unnegatable_conditions
                .contains(&condition.kind())
            {
                let text = self.text(condition);
                self.push(node, text, operators::condition_negation(text, self.grammar));
            }
        }
        if node.child_by_field_name("alternative").is_some() {
            self.push(node, "else", operators::else_removal());
        }
    }

    fn collect_token_mutations(&mut self, node: Node<'t>, table: fn(&str) -> Vec<MutationOp>) {
        for token in self.operator_tokens(node) {
            let op = self.text(token);
            for mutation in table(op) {
                self.push(token, op, mutation);
            }
        }
    }
}
