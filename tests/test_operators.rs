use mutscore::Language;
use mutscore::mutants::{MutationKind, Priority, REMOVED};
use mutscore::operators::*;

fn replacements(ops: &[MutationOp]) -> Vec<&str> {
    ops.iter().map(|op| op.replacement.as_str()).collect()
}

#[test]
fn arithmetic_swaps_to_every_other_operator() {
    let ops = arithmetic_mutations("+");
    assert_eq!(replacements(&ops), vec!["-", "*", "/", "%"]);
    assert!(ops.iter().all(|op| op.kind == MutationKind::ArithmeticOperator));
    assert!(arithmetic_mutations("**").is_empty());
}

#[test]
fn relational_boundaries() {
    assert_eq!(replacements(&relational_mutations("<")), vec!["<=", ">", ">=", "==", "!="]);
    assert_eq!(replacements(&relational_mutations(">=")), vec![">", "<=", "<", "==", "!="]);
    assert_eq!(replacements(&relational_mutations("==")), vec!["!=", "<", ">"]);
    assert_eq!(replacements(&relational_mutations("===")), vec!["!=="]);
    assert!(relational_mutations("<=>").is_empty());
}

#[test]
fn relational_never_includes_original() {
    for op in ["<", ">", "<=", ">=", "==", "!=", "===", "!=="] {
        assert!(!replacements(&relational_mutations(op)).contains(&op), "{op}");
    }
}

#[test]
fn logical_uses_language_spelling() {
    let python = Language::Python.grammar();
    assert_eq!(replacements(&logical_mutations("and", python)), vec!["or"]);
    let go = Language::Go.grammar();
    assert_eq!(replacements(&logical_mutations("||", go)), vec!["&&"]);
    assert!(logical_mutations("and", go).is_empty());
}

#[test]
fn unary_minus_depends_on_unary_plus() {
    assert_eq!(unary_minus_mutation(Language::Go.grammar()).replacement, "+");
    assert_eq!(unary_minus_mutation(Language::Rust.grammar()).replacement, REMOVED);
    assert_eq!(negation_removal().replacement, REMOVED);
}

#[test]
fn integer_constants() {
    assert_eq!(replacements(&integer_mutations("0")), vec!["1"]);
    assert_eq!(replacements(&integer_mutations("1")), vec!["0"]);
    assert_eq!(replacements(&integer_mutations("42")), vec!["(42 + 1)"]);
    assert_eq!(integer_mutations("42")[0].priority, Priority::Medium);
}

#[test]
fn integer_text_detection() {
    for text in ["0", "42", "1_000", "0xff", "0o17", "0b101", "10u8", "7usize", "10n"] {
        assert!(is_integer_text(text), "{text}");
    }
    for text in ["1.5", "1e3", "abc", "0x", "3.0f32"] {
        assert!(!is_integer_text(text), "{text}");
    }
}

#[test]
fn empty_strings_are_not_mutated() {
    for text in ["\"\"", "''", "``", "r#\"\"#", "b\"\"", "f''"] {
        assert!(is_empty_string(text), "{text}");
        assert!(string_mutations(text).is_empty(), "{text}");
    }
    assert_eq!(replacements(&string_mutations("\"hi\"")), vec!["\"\""]);
    assert_eq!(replacements(&string_mutations("b\"hi\"")), vec!["b\"\""]);
}

#[test]
fn return_values_per_language() {
    let go = Language::Go.grammar();
    assert_eq!(replacements(&return_value_mutations(0, "true", go)), vec!["false"]);
    assert_eq!(replacements(&return_value_mutations(1, "nil", go)), vec!["errors.New(\"mutant\")"]);
    assert!(return_value_mutations(0, "x", go).is_empty());

    let python = Language::Python.grammar();
    assert_eq!(replacements(&return_value_mutations(0, "False", python)), vec!["True"]);
    assert_eq!(replacements(&return_value_mutations(0, "None", python)), vec!["object()"]);

    let desc = &return_value_mutations(1, "nil", go)[0].description;
    assert!(desc.contains("return value 1"));
}

#[test]
fn assignment_and_inc_dec() {
    assert_eq!(replacements(&assignment_mutations("+=")), vec!["-="]);
    assert_eq!(replacements(&assignment_mutations("-=")), vec!["+="]);
    assert!(assignment_mutations("*=").is_empty());
    assert_eq!(replacements(&inc_dec_mutations("++")), vec!["--"]);
    assert_eq!(replacements(&inc_dec_mutations("--")), vec!["++"]);
}

#[test]
fn structural_operators() {
    let op = condition_negation("x < 10", Language::Go.grammar());
    assert_eq!(op.kind, MutationKind::ConditionNegation);
    assert_eq!(op.replacement, "!(x < 10)");
    assert_eq!(else_removal().kind, MutationKind::ElseRemoval);
    assert_eq!(statement_removal().kind, MutationKind::StatementRemoval);
}
