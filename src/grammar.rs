//! Per-language node kinds and spellings the generator and applicator rely on.
//!
//! Everything language-specific lives in these tables so the walker and the
//! operator table stay grammar-agnostic.

use tree_sitter::Node;

use crate::Language;
use crate::syntax::node_text;

/// How a condition is wrapped in a logical negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negation {
    /// `c` becomes `!(c)`.
    Bang,
    /// `c` becomes `not (c)`.
    NotKeyword,
    /// The condition already carries its parentheses: `(c)` becomes `(!(c))`.
    BangInParens,
}

#[derive(Debug)]
pub struct Grammar {
    pub language: Language,
    pub function_kinds: &'static [&'static str],
    /// Value kinds that turn a `variable_declarator` into a named function.
    pub function_values: &'static [&'static str],
    pub binary_kinds: &'static [&'static str],
    pub unary_kinds: &'static [&'static str],
    pub integer_kinds: &'static [&'static str],
    pub string_kinds: &'static [&'static str],
    pub return_kinds: &'static [&'static str],
    pub if_kinds: &'static [&'static str],
    pub assignment_kinds: &'static [&'static str],
    pub inc_dec_kinds: &'static [&'static str],
    /// Condition kinds that have no negated form (`if let`).
    pub unnegatable_conditions: &'static [&'static str],
    pub and_op: &'static str,
    pub or_op: &'static str,
    pub not_op: &'static str,
    pub true_literal: &'static str,
    pub false_literal: &'static str,
    pub nil_literals: &'static [&'static str],
    pub non_nil: &'static str,
    pub line_comment: &'static str,
    pub unary_plus: bool,
    pub negation: Negation,
}

impl Grammar {
    /// Name of the function `node` declares, if it declares one.
    pub fn function_name<'t>(&self, node: Node<'t>, source: &'t str) -> Option<&'t str> {
        if self.function_kinds.contains(&node.kind()) {
            return node
                .child_by_field_name("name")
                .map(|name| node_text(name, source));
        }
        if node.kind() == "variable_declarator" {
            let value = node.child_by_field_name("value")?;
            if self.function_values.contains(&value.kind()) {
                return node
                    .child_by_field_name("name")
                    .map(|name| node_text(name, source));
            }
        }
        None
    }

    pub fn negate(&self, condition: &str) -> String {
        match self.negation {
            Negation::Bang => format!("!({condition})"),
            Negation::NotKeyword => format!("not ({condition})"),
            Negation::BangInParens => format!("(!{condition})"),
        }
    }

    /// Marker inserted in front of a disabled statement.
    pub fn disable_marker(&self) -> String {
        format!("{} MUTANT: ", self.line_comment)
    }

    pub fn is_nil(&self, text: &str) -> bool {
        self.nil_literals.contains(&text)
    }

    /// A Python string standing alone as the first statement of a module,
    /// class or function body. Mutating it never changes behavior.
    pub fn is_docstring(&self, node: Node<'_>) -> bool {
        if self.language != Language::Python {
            return false;
        }
        let Some(statement) = node.parent() else {
            return false;
        };
        if statement.kind() != "expression_statement" || statement.named_child_count() != 1 {
            return false;
        }
        let Some(body) = statement.parent() else {
            return false;
        };
        if !matches!(body.kind(), "block" | "module") {
            return false;
        }
        let mut cursor = body.walk();
        let first = body
            .named_children(&mut cursor)
            .find(|child| child.kind() != "comment");
        first.is_some_and(|first| first.id() == statement.id())
    }
}

static GO: Grammar = Grammar {
    language: Language::Go,
    function_kinds: &["function_declaration", "method_declaration"],
    function_values: &[],
    binary_kinds: &["binary_expression"],
    unary_kinds: &["unary_expression"],
    integer_kinds: &["int_literal"],
    string_kinds: &["interpreted_string_literal", "raw_string_literal"],
    return_kinds: &["return_statement"],
    if_kinds: &["if_statement"],
    assignment_kinds: &["assignment_statement"],
    inc_dec_kinds: &["inc_statement", "dec_statement"],
    unnegatable_conditions: &[],
    and_op: "&&",
    or_op: "||",
    not_op: "!",
    true_literal: "true",
    false_literal: "false",
    nil_literals: &["nil"],
    non_nil: "errors.New(\"mutant\")",
    line_comment: "//",
    unary_plus: true,
    negation: Negation::Bang,
};

static RUST: Grammar = Grammar {
    language: Language::Rust,
    function_kinds: &["function_item"],
    function_values: &[],
    binary_kinds: &["binary_expression"],
    unary_kinds: &["unary_expression"],
    integer_kinds: &["integer_literal"],
    string_kinds: &["string_literal", "raw_string_literal"],
    return_kinds: &["return_expression"],
    if_kinds: &["if_expression"],
    assignment_kinds: &["compound_assignment_expr"],
    inc_dec_kinds: &[],
    unnegatable_conditions: &["let_condition", "let_chain"],
    and_op: "&&",
    or_op: "||",
    not_op: "!",
    true_literal: "true",
    false_literal: "false",
    nil_literals: &["None"],
    non_nil: "Some(Default::default())",
    line_comment: "//",
    unary_plus: false,
    negation: Negation::Bang,
};

static PYTHON: Grammar = Grammar {
    language: Language::Python,
    function_kinds: &["function_definition"],
    function_values: &[],
    binary_kinds: &["binary_operator", "comparison_operator", "boolean_operator"],
    unary_kinds: &["not_operator", "unary_operator"],
    integer_kinds: &["integer"],
    string_kinds: &["string"],
    return_kinds: &["return_statement"],
    if_kinds: &["if_statement"],
    assignment_kinds: &["augmented_assignment"],
    inc_dec_kinds: &[],
    unnegatable_conditions: &[],
    and_op: "and",
    or_op: "or",
    not_op: "not",
    true_literal: "True",
    false_literal: "False",
    nil_literals: &["None"],
    non_nil: "object()",
    line_comment: "#",
    unary_plus: true,
    negation: Negation::NotKeyword,
};

macro_rules! javascript_like {
    ($name:ident, $language:expr) => {
        static $name: Grammar = Grammar {
            language: $language,
            function_kinds: &[
                "function_declaration",
                "generator_function_declaration",
                "method_definition",
            ],
            function_values: &[
                "arrow_function",
                "function_expression",
                "function",
                "generator_function",
            ],
            binary_kinds: &["binary_expression"],
            unary_kinds: &["unary_expression"],
            integer_kinds: &["number"],
            string_kinds: &["string"],
            return_kinds: &["return_statement"],
            if_kinds: &["if_statement"],
            assignment_kinds: &["augmented_assignment_expression"],
            inc_dec_kinds: &["update_expression"],
            unnegatable_conditions: &[],
            and_op: "&&",
            or_op: "||",
            not_op: "!",
            true_literal: "true",
            false_literal: "false",
            nil_literals: &["null", "undefined"],
            non_nil: "{}",
            line_comment: "//",
            unary_plus: true,
            negation: Negation::BangInParens,
        };
    };
}

javascript_like!(JAVASCRIPT, Language::JavaScript);
javascript_like!(TYPESCRIPT, Language::TypeScript);
javascript_like!(TSX, Language::Tsx);

pub fn for_language(language: Language) -> &'static Grammar {
    match language {
        Language::Go => &GO,
        Language::Rust => &RUST,
        Language::Python => &PYTHON,
        Language::JavaScript => &JAVASCRIPT,
        Language::TypeScript => &TYPESCRIPT,
        Language::Tsx => &TSX,
    }
}
