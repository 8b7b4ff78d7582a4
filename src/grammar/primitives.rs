//! Primitive Grammar Library
//!
//! Fixed foundational rules appended to every grammar, plus zero-or-more
//! list rules for the primitives the traversal actually referenced.

use std::collections::BTreeSet;

use crate::schema::Primitive;

use super::Rule;

/// `"[" ws ( e ("," ws e)* )? "]"`, which permits the empty list.
///
/// Field-scoped array rules (see `emit`) require at least one element
/// and do not use this form.
pub fn list_rule(name: impl Into<String>, element: &str) -> Rule {
    Rule::new(
        name,
        format!(r#""[" ws ( {e} ("," ws {e})* )? "]""#, e = element),
    )
}

fn base_rules() -> Vec<Rule> {
    vec![
        Rule::new("boolean", r#""true" | "false""#),
        Rule::new("string", r#""\"" ( ([^"\\] | escaped-char)* ) "\"""#),
        Rule::new("escaped-char", r#""\\" ["\\/bfnrt"] | unicode-escape"#),
        Rule::new(
            "unicode-escape",
            r#""u" [0-9a-fA-F] [0-9a-fA-F] [0-9a-fA-F] [0-9a-fA-F]"#,
        ),
        Rule::new("ws", r#"" " | "\t" | "\n" | " " ws | "\t" ws | "\n" ws"#),
        Rule::new("float", r#"integer-part "." fractional-part"#),
        Rule::new("fractional-part", "[0-9]+"),
        Rule::new("integer-part", "[0-9]+"),
        Rule::new("integer", "[0-9]+"),
    ]
}

/// Every name the library may define, whether or not it ends up referenced
pub fn library_names() -> Vec<String> {
    [Primitive::String, Primitive::Boolean, Primitive::Integer, Primitive::Float]
        .iter()
        .map(|p| format!("{}-list", p.rule_name()))
        .chain(base_rules().into_iter().map(|r| r.name))
        .collect()
}

/// The trailing library block: referenced list rules first, then the base rules
pub fn library(referenced_lists: &BTreeSet<Primitive>) -> Vec<Rule> {
    let mut rules: Vec<Rule> = referenced_lists
        .iter()
        .map(|p| list_rule(format!("{}-list", p.rule_name()), p.rule_name()))
        .collect();
    rules.extend(base_rules());
    rules
}
