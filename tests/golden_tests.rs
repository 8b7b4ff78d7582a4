//! Golden Tests for Grammar Generation
//!
//! Compiles the definition fixtures end to end and checks the emitted
//! grammar and documentation.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use schema_gbnf::{
    compile, generate, generate_documentation, load_definitions, save, CompileOptions, DocOptions,
    GrammarCompiler, GrammarConfig, GrammarError, SchemaSet,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn load(name: &str) -> SchemaSet {
    load_definitions(&[fixture(name)]).unwrap()
}

fn rule_lines<'t>(text: &'t str, name: &str) -> Vec<&'t str> {
    let prefix = format!("{} ::= ", name);
    text.lines().filter(|l| l.starts_with(&prefix)).collect()
}

// =============================================================================
// Golden grammar
// =============================================================================

#[test]
fn test_employee_grammar_matches_golden() {
    let grammar = compile(&load("employee.json")).unwrap();
    let expected = fs::read_to_string(fixture("employee.gbnf")).unwrap();
    assert_eq!(grammar.text(), expected.trim_end());
}

#[test]
fn test_grammar_is_deterministic() {
    let set = load("orders.json");
    let first = compile(&set).unwrap().text();
    let second = compile(&set).unwrap().text();
    assert_eq!(first, second);

    let reloaded = compile(&load("orders.json")).unwrap().text();
    assert_eq!(first, reloaded);
}

#[test]
fn test_every_line_is_a_rule_and_root_exists() {
    let rule_line = Regex::new(r"^[A-Za-z0-9-]+ ::= \S").unwrap();
    for name in ["employee.json", "orders.json", "tree.json", "functions.toml"] {
        let text = compile(&load(name)).unwrap().text();
        assert!(text.lines().all(|l| rule_line.is_match(l)), "{}", name);
        assert_eq!(rule_lines(&text, "root").len(), 1, "{}", name);
        assert!(text.ends_with("integer ::= [0-9]+"), "{}", name);
    }
}

// =============================================================================
// Shared and recursive schemas
// =============================================================================

#[test]
fn test_shared_schema_expanded_once() {
    let text = compile(&load("orders.json")).unwrap().text();

    assert_eq!(rule_lines(&text, "root"), vec!["root ::= order"]);
    assert_eq!(rule_lines(&text, "address").len(), 1);
    assert_eq!(rule_lines(&text, "order-line").len(), 1);
    assert_eq!(
        rule_lines(&text, "order-shipping-optional"),
        vec!["order-shipping-optional ::= ( address )?"]
    );
    assert_eq!(
        rule_lines(&text, "order-lines"),
        vec![r#"order-lines ::= "[" ws order-line ("," ws order-line)* ws "]""#]
    );
    assert!(text.contains(r#""\"orderId\"" ":" ws integer ws"#));
    assert!(text.contains(r#"( ws "," ws "\"ship_to\"" ":" ws address )?"#));
    assert!(text.contains(concat!(
        r#"custom-dict-key-type-string-value-type-string ::= "#,
        r#""{" ws ( string ":" ws string ("," ws string ":" ws string)* )? "}" ws"#,
    )));
}

#[test]
fn test_roots_restrict_alternation() {
    let grammar = compile(&load("orders.json")).unwrap();
    assert_eq!(grammar.rules[0].to_string(), "root ::= order");
}

#[test]
fn test_recursive_schema_terminates() {
    let text = compile(&load("tree.json")).unwrap().text();
    assert_eq!(rule_lines(&text, "tree-node").len(), 1);
    assert!(text.contains(r#"tree-node-children ::= "[" ws tree-node ("," ws tree-node)* ws "]""#));
    assert!(text.contains("tree-node-parent-optional ::= ( tree-node )?"));
}

#[test]
fn test_recursion_limit_is_reported() {
    let set = load("orders.json");
    let options = CompileOptions {
        max_depth: 1,
        ..CompileOptions::default()
    };
    let err = GrammarCompiler::new(options).compile(&set).unwrap_err();
    assert!(matches!(err, GrammarError::RecursionLimit { limit: 1, .. }));
}

// =============================================================================
// Arrays versus primitive lists
// =============================================================================

#[test]
fn test_field_array_needs_one_element_but_primitive_list_allows_none() {
    let text = compile(&load("employee.json")).unwrap().text();
    let string_list = rule_lines(&text, "string-list")[0];
    assert!(string_list.contains(r#"( string ("," ws string)* )?"#));

    let tree = compile(&load("tree.json")).unwrap().text();
    let children = rule_lines(&tree, "tree-node-children")[0];
    assert!(!children.contains(")?"));
    assert!(children.contains(r#""[" ws tree-node ("," ws tree-node)*"#));
}

// =============================================================================
// Tagged dispatch
// =============================================================================

#[test]
fn test_tagged_dispatch_from_toml() {
    let set = load("functions.toml");
    let options = CompileOptions::default().tagged("function", "params");
    let text = GrammarCompiler::new(options).compile(&set).unwrap().text();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "root ::= function");
    assert_eq!(
        lines[1],
        r#"function ::= "{" ws "\"function\"" ":" ws grammar-models ws "}""#
    );
    assert_eq!(
        lines[2],
        "grammar-models ::= send-message-grammar-model | calculate-grammar-model"
    );
    assert_eq!(
        lines[3],
        r#"send-message-grammar-model ::= "\"send-message\"" "," "\"params\"" ":" send-message"#
    );
    assert!(text.contains("calculate-number-one-union ::= integer | float"));
    assert!(text.contains(
        r#"calculate-operation ::= "\"add\"" | "\"subtract\"" | "\"multiply\"" | "\"divide\"""#
    ));
}

// =============================================================================
// Documentation and sinks
// =============================================================================

#[test]
fn test_employee_documentation() {
    let doc = generate_documentation(&load("employee.json"), &DocOptions::default()).unwrap();
    assert!(doc.starts_with(concat!(
        "Output Model: employee\n",
        "  Description:\n",
        "        An employee of the company.\n",
    )));
    assert!(doc.contains(concat!(
        "    department (Department):\n",
        "      Description: Department the employee works in.\n",
        "      Example: 'Sales'\n",
    )));
    assert!(doc.contains("    skills (SkillSet):\n      Description: No description available.\n"));
    assert!(doc.contains("  Expected Example Output for employee:\n"));
}

#[test]
fn test_generate_and_save_round_trip_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = GrammarConfig::default();
    config.output.grammar_path = dir.path().join("grammar.gbnf");
    config.output.documentation_path = dir.path().join("grammar.md");

    let artifacts = generate(&load("employee.json"), &config).unwrap();
    let report = save(
        &artifacts,
        &config.output.grammar_path,
        &config.output.documentation_path,
    );
    assert!(report.is_complete());

    let written = fs::read_to_string(&config.output.grammar_path).unwrap();
    let expected = fs::read_to_string(fixture("employee.gbnf")).unwrap();
    assert_eq!(written, expected.trim_end());
}

#[test]
fn test_directory_input_merges_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::copy(fixture("tree.json"), dir.path().join("a_tree.json")).unwrap();
    fs::copy(fixture("functions.toml"), dir.path().join("b_functions.toml")).unwrap();

    let set = load_definitions(&[dir.path().to_path_buf()]).unwrap();
    let names: Vec<&str> = set.roots().unwrap().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["SendMessage", "Calculate"]);
    assert!(set.schema("TreeNode").is_ok());
}
