use std::collections::HashSet;

use mutscore::Language;
use mutscore::error::GenerateError;
use mutscore::generator::{self, GenerateOptions, LineRange};
use mutscore::mutants::{Mutation, MutationKind, REMOVED};

const GO_SOURCE: &str = "package main

func inRange(x int) bool {
\tif x < 10 {
\t\treturn true
\t}
\treturn false
}
";

const GO_TWO_FUNCS: &str = "package main

func a(x int) int {
\treturn x + 1
}

func b(x int) int {
\treturn x * 2
}
";

fn discover(language: Language, file: &str, source: &str) -> Vec<Mutation> {
    generator::discover_mutations(file, language, source, &GenerateOptions::default()).unwrap()
}

fn of_kind(mutations: &[Mutation], kind: MutationKind) -> Vec<&Mutation> {
    mutations.iter().filter(|m| m.kind == kind).collect()
}

// --- catalog shape ---

#[test]
fn ids_are_dense_and_in_order() {
    let mutations = discover(Language::Go, "main.go", GO_SOURCE);
    assert!(!mutations.is_empty());
    for (i, mutation) in mutations.iter().enumerate() {
        assert_eq!(mutation.id, format!("M{i}"));
    }
}

#[test]
fn generation_is_deterministic() {
    let first = discover(Language::Go, "main.go", GO_SOURCE);
    let second = discover(Language::Go, "main.go", GO_SOURCE);
    assert_eq!(first, second);
}

#[test]
fn file_is_recorded_verbatim() {
    let mutations = discover(Language::Go, "pkg/main.go", GO_SOURCE);
    assert!(mutations.iter().all(|m| m.file == "pkg/main.go"));
}

#[test]
fn lines_and_columns_are_one_based() {
    let mutations = discover(Language::Go, "main.go", GO_SOURCE);
    let relational = of_kind(&mutations, MutationKind::RelationalOperator);
    assert!(!relational.is_empty());
    for m in relational {
        assert_eq!(m.line, 4);
        // tab, "if", space, "x", space: `<` is the 7th byte
        assert_eq!(m.column, 7);
        assert_eq!(m.original, "<");
    }
}

#[test]
fn relational_alternatives_exclude_original() {
    let mutations = discover(Language::Go, "main.go", GO_SOURCE);
    let mutated: Vec<&str> = of_kind(&mutations, MutationKind::RelationalOperator)
        .iter()
        .map(|m| m.mutated.as_str())
        .collect();
    assert_eq!(mutated, vec!["<=", ">", ">=", "==", "!="]);
}

#[test]
fn no_duplicate_alternatives_per_anchor() {
    let mutations = discover(Language::Go, "main.go", GO_SOURCE);
    let mut seen = HashSet::new();
    for m in &mutations {
        assert!(
            seen.insert((m.line, m.column, m.kind, m.mutated.clone())),
            "duplicate mutation: {m:?}"
        );
    }
}

#[test]
fn every_return_gets_statement_removal() {
    let mutations = discover(Language::Go, "main.go", GO_SOURCE);
    let removals = of_kind(&mutations, MutationKind::StatementRemoval);
    assert_eq!(removals.len(), 2);
    assert_eq!(removals[0].original, "return true");
    assert_eq!(removals[0].line, 5);
    assert_eq!(removals[1].original, "return false");
    assert!(removals.iter().all(|m| m.mutated == REMOVED));
}

#[test]
fn boolean_returns_are_flipped() {
    let mutations = discover(Language::Go, "main.go", GO_SOURCE);
    let values = of_kind(&mutations, MutationKind::ReturnValue);
    let pairs: Vec<(&str, &str)> = values
        .iter()
        .map(|m| (m.original.as_str(), m.mutated.as_str()))
        .collect();
    assert_eq!(pairs, vec![("true", "false"), ("false", "true")]);
}

#[test]
fn condition_negation_records_condition_text() {
    let mutations = discover(Language::Go, "main.go", GO_SOURCE);
    let negations = of_kind(&mutations, MutationKind::ConditionNegation);
    assert_eq!(negations.len(), 1);
    let m = negations[0];
    assert_eq!(m.original, "x < 10");
    assert_eq!(m.mutated, "!(x < 10)");
    assert_eq!((m.line, m.column), (4, 2));
}

#[test]
fn else_removal_only_when_else_exists() {
    let without = discover(Language::Go, "main.go", GO_SOURCE);
    assert!(of_kind(&without, MutationKind::ElseRemoval).is_empty());

    let source = "package main

func sign(x int) int {
\tif x < 0 {
\t\treturn -1
\t} else {
\t\treturn 1
\t}
}
";
    let with = discover(Language::Go, "main.go", source);
    let removals = of_kind(&with, MutationKind::ElseRemoval);
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].line, 4);
}

#[test]
fn integer_constants() {
    let source = "package main

func f() int {
\tx := 0
\ty := 1
\treturn x + y + 42
}
";
    let mutations = discover(Language::Go, "main.go", source);
    let constants: Vec<(&str, &str)> = of_kind(&mutations, MutationKind::Constant)
        .iter()
        .map(|m| (m.original.as_str(), m.mutated.as_str()))
        .collect();
    assert!(constants.contains(&("0", "1")));
    assert!(constants.contains(&("1", "0")));
    assert!(constants.contains(&("42", "(42 + 1)")));
}

#[test]
fn go_inc_dec_and_assignment() {
    let source = "package main

func f(n int) int {
\ttotal := 0
\tfor i := 0; i < n; i++ {
\t\ttotal += i
\t}
\treturn total
}
";
    let mutations = discover(Language::Go, "main.go", source);
    let inc = of_kind(&mutations, MutationKind::IncDec);
    assert_eq!(inc.len(), 1);
    assert_eq!((inc[0].original.as_str(), inc[0].mutated.as_str()), ("++", "--"));

    let assign = of_kind(&mutations, MutationKind::AssignmentOperator);
    assert_eq!(assign.len(), 1);
    assert_eq!((assign[0].original.as_str(), assign[0].mutated.as_str()), ("+=", "-="));
}

#[test]
fn go_nil_return_becomes_error_value() {
    let source = "package main

func check() error {
\treturn nil
}
";
    let mutations = discover(Language::Go, "main.go", source);
    let values = of_kind(&mutations, MutationKind::ReturnValue);
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].original, "nil");
    assert_eq!(values[0].mutated, "errors.New(\"mutant\")");
}

// --- scoping ---

#[test]
fn function_filter_limits_to_target() {
    let options = GenerateOptions {
        function: Some("b".into()),
        lines: None,
    };
    let mutations = generator::discover_mutations("main.go", Language::Go, GO_TWO_FUNCS, &options).unwrap();
    assert!(!mutations.is_empty());
    assert!(mutations.iter().all(|m| m.line >= 7), "{mutations:?}");
    assert!(of_kind(&mutations, MutationKind::ArithmeticOperator)
        .iter()
        .all(|m| m.original == "*"));
    assert_eq!(mutations[0].id, "M0");
}

#[test]
fn function_filter_missing_lists_available() {
    let options = GenerateOptions {
        function: Some("nope".into()),
        lines: None,
    };
    let err = generator::discover_mutations("main.go", Language::Go, GO_TWO_FUNCS, &options).unwrap_err();
    match err {
        GenerateError::FunctionNotFound { name, available } => {
            assert_eq!(name, "nope");
            assert_eq!(available, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn line_range_limits_mutations() {
    let options = GenerateOptions {
        function: None,
        lines: Some(LineRange { start: 4, end: 4 }),
    };
    let mutations = generator::discover_mutations("main.go", Language::Go, GO_SOURCE, &options).unwrap();
    assert!(!mutations.is_empty());
    assert!(mutations.iter().all(|m| m.line == 4));
}

#[test]
fn line_range_parsing() {
    assert_eq!("100-200".parse::<LineRange>().unwrap(), LineRange { start: 100, end: 200 });
    assert!("200-100".parse::<LineRange>().is_err());
    assert!("0-10".parse::<LineRange>().is_err());
    assert!("abc".parse::<LineRange>().is_err());
    assert!(matches!(
        "10".parse::<LineRange>(),
        Err(GenerateError::InvalidLineRange(_))
    ));
}

#[test]
fn unparsable_source_is_rejected() {
    let err = generator::discover_mutations(
        "main.go",
        Language::Go,
        "package main\nfunc f( {\n",
        &GenerateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GenerateError::Parse { .. }));
}

#[test]
fn generate_file_rejects_unknown_extension() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello").unwrap();
    assert!(matches!(
        generator::generate_file(&path, &GenerateOptions::default()),
        Err(GenerateError::UnsupportedLanguage(_))
    ));
}

#[test]
fn generate_file_reads_from_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("main.go");
    std::fs::write(&path, GO_SOURCE).unwrap();
    let mutations = generator::generate_file(&path, &GenerateOptions::default()).unwrap();
    assert_eq!(mutations, discover(Language::Go, &path.to_string_lossy(), GO_SOURCE));
}

#[test]
fn list_functions_in_source_order() {
    assert_eq!(
        generator::list_functions(Language::Go, GO_TWO_FUNCS).unwrap(),
        vec!["a", "b"]
    );
    assert_eq!(
        generator::list_functions(
            Language::TypeScript,
            "const add = (a: number, b: number): number => a + b;\nfunction sub(a: number, b: number) { return a - b; }\n"
        )
        .unwrap(),
        vec!["add", "sub"]
    );
}

// --- other languages ---

#[test]
fn python_operators_and_negation() {
    let source = "def is_adult(age):
    if age >= 18 and age < 130:
        return True
    return False
";
    let mutations = discover(Language::Python, "app.py", source);

    let logical = of_kind(&mutations, MutationKind::LogicalOperator);
    assert_eq!(logical.len(), 1);
    assert_eq!((logical[0].original.as_str(), logical[0].mutated.as_str()), ("and", "or"));

    let negation = of_kind(&mutations, MutationKind::ConditionNegation);
    assert_eq!(negation.len(), 1);
    assert_eq!(negation[0].mutated, "not (age >= 18 and age < 130)");

    let values: Vec<&str> = of_kind(&mutations, MutationKind::ReturnValue)
        .iter()
        .map(|m| m.mutated.as_str())
        .collect();
    assert_eq!(values, vec!["False", "True"]);
}

#[test]
fn python_multiline_strings_are_skipped() {
    let source = "def greet(name):
    \"\"\"Say hello.

    Longer description.
    \"\"\"
    return \"hello \" + name
";
    let mutations = discover(Language::Python, "app.py", source);
    assert!(mutations.iter().all(|m| !m.original.contains('\n')));
    assert!(of_kind(&mutations, MutationKind::ArithmeticOperator).is_empty());
}

#[test]
fn rust_if_let_is_not_negated() {
    let source = "fn f(x: Option<i32>) -> i32 {
    if let Some(y) = x {
        return y;
    }
    -1
}
";
    let mutations = discover(Language::Rust, "lib.rs", source);
    assert!(of_kind(&mutations, MutationKind::ConditionNegation).is_empty());

    let unary = of_kind(&mutations, MutationKind::UnaryOperator);
    assert_eq!(unary.len(), 1);
    assert_eq!(unary[0].original, "-");
    assert_eq!(unary[0].mutated, REMOVED);
    assert_eq!(of_kind(&mutations, MutationKind::StatementRemoval).len(), 1);
}

#[test]
fn javascript_mutations() {
    let source = "function f(a) {
  if (a === 1) {
    return null;
  } else {
    a++;
  }
  return a + \"x\";
}
";
    let mutations = discover(Language::JavaScript, "app.js", source);

    let relational = of_kind(&mutations, MutationKind::RelationalOperator);
    assert_eq!(relational.len(), 1);
    assert_eq!(relational[0].mutated, "!==");

    let negation = of_kind(&mutations, MutationKind::ConditionNegation);
    assert_eq!(negation.len(), 1);
    assert_eq!(negation[0].original, "(a === 1)");
    assert_eq!(negation[0].mutated, "(!(a === 1))");

    assert_eq!(of_kind(&mutations, MutationKind::ElseRemoval).len(), 1);
    assert_eq!(of_kind(&mutations, MutationKind::IncDec).len(), 1);
    // `a + "x"` is concatenation
    assert!(of_kind(&mutations, MutationKind::ArithmeticOperator).is_empty());

    let values = of_kind(&mutations, MutationKind::ReturnValue);
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].original, "null");
}

#[test]
fn python_docstrings_are_not_mutated() {
    let source = "\"\"\"Module docs.\"\"\"

class Greeter:
    \"\"\"Class docs.\"\"\"

    def greet(self, name):
        # leading comment
        \"\"\"Say hello.\"\"\"
        label = \"hello\"
        return label
";
    let mutations = discover(Language::Python, "app.py", source);
    let originals: Vec<&str> = mutations.iter().map(|m| m.original.as_str()).collect();
    assert!(originals.iter().all(|o| !o.contains("docs") && !o.contains("Say hello")), "{originals:?}");
    assert!(originals.contains(&"\"hello\""), "{originals:?}");
}
