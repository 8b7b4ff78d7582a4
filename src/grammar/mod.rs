//! Grammar Generation
//!
//! Compiles a [`SchemaSet`] into a GBNF grammar.
//!
//! Architecture:
//! - names: canonical rule names and literal quoting (type classification)
//! - numeric: bounded digit-count sub-grammars
//! - pattern: regex subsets on string fields
//! - emit: per-field rule emission and per-schema object rules
//! - primitives: the fixed trailing library block
//! - this module: the rule memo and root composition
//!
//! All state lives in one [`RuleSet`] created per [`GrammarCompiler::compile`]
//! call, so independent compilations never share rules.

pub mod emit;
pub mod names;
pub mod numeric;
pub mod pattern;
pub mod primitives;

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GrammarError, Result};
use crate::schema::{Primitive, SchemaSet};

use emit::Emitter;
use names::{json_literal, rule_token};

// =============================================================================
// Rule
// =============================================================================

/// A named production, rendered as `name ::= body`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub body: String,
}

impl Rule {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ::= {}", self.name, self.body)
    }
}

// =============================================================================
// Rule Set
// =============================================================================

/// Who a rule name belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOwner {
    /// Root composition rules
    Root,
    /// Object rule of a declared schema
    Schema(String),
    /// Object rule of an opaque class
    Class(String),
    /// Rules derived purely from a type or field (enums, lists, unions, ...)
    Derived,
    /// Primitive library rules, emitted separately after everything else
    Library,
}

#[derive(Debug, Clone)]
struct Entry {
    owner: RuleOwner,
    body: Option<String>,
}

/// Outcome of reserving a rule name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// First visit: the caller must define the body
    Fresh,
    /// Already expanded (or in progress): reference the name only
    Seen,
}

/// Insertion-ordered memo from rule name to its one body.
///
/// Names are reserved when an expansion starts (so recursive references
/// terminate and the object rule keeps its position) and defined once.
#[derive(Debug, Default)]
pub struct RuleSet {
    entries: IndexMap<String, Entry>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name` for `owner`; a name held by someone else is a conflict
    pub fn reserve(&mut self, name: &str, owner: RuleOwner) -> Result<Reservation> {
        match self.entries.get(name) {
            Some(entry) if entry.owner == owner => Ok(Reservation::Seen),
            Some(_) => Err(GrammarError::RuleConflict {
                name: name.to_string(),
            }),
            None => {
                debug!(rule = name, "Reserved rule");
                self.entries.insert(name.to_string(), Entry { owner, body: None });
                Ok(Reservation::Fresh)
            }
        }
    }

    /// Define a body. Repeating an identical definition is a no-op.
    pub fn define(&mut self, name: &str, owner: RuleOwner, body: String) -> Result<()> {
        let conflict = || GrammarError::RuleConflict {
            name: name.to_string(),
        };
        match self.entries.get_mut(name) {
            Some(entry) if entry.owner != owner => Err(conflict()),
            Some(entry) => match &entry.body {
                Some(existing) if *existing != body => Err(conflict()),
                Some(_) => Ok(()),
                None => {
                    entry.body = Some(body);
                    Ok(())
                }
            },
            None => {
                debug!(rule = name, "Emitted rule");
                self.entries.insert(name.to_string(), Entry { owner, body: Some(body) });
                Ok(())
            }
        }
    }

    pub fn define_rule(&mut self, rule: Rule, owner: RuleOwner) -> Result<()> {
        self.define(&rule.name, owner, rule.body)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn body(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(|e| e.body.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rules in insertion order; a reserved but undefined name is a conflict.
    /// Library reservations are skipped.
    pub fn into_rules(self) -> Result<Vec<Rule>> {
        self.entries
            .into_iter()
            .filter(|(_, entry)| entry.owner != RuleOwner::Library)
            .map(|(name, entry)| match entry.body {
                Some(body) => Ok(Rule { name, body }),
                None => {
                    warn!(rule = %name, "Reserved rule was never defined");
                    Err(GrammarError::RuleConflict { name })
                }
            })
            .collect()
    }
}

// =============================================================================
// Options
// =============================================================================

/// How an optional (non-required) field is expressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalFieldStyle {
    /// The whole `"key": value` pair may be absent
    #[default]
    OmitKey,
    /// The key is always present; only its value slot is optional
    NullableValue,
}

/// Discriminated-union envelope: `{"<tag>": {"<Schema>", "<content>": {...}}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedDispatch {
    pub tag_key: String,
    pub content_key: String,
}

impl TaggedDispatch {
    pub fn new(tag_key: impl Into<String>, content_key: impl Into<String>) -> Self {
        Self {
            tag_key: tag_key.into(),
            content_key: content_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Root composition: plain alternation when `None`
    pub dispatch: Option<TaggedDispatch>,
    pub optional_fields: OptionalFieldStyle,
    /// Maximum nesting of schema/class expansions
    pub max_depth: usize,
}

pub const DEFAULT_MAX_DEPTH: usize = 64;

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dispatch: None,
            optional_fields: OptionalFieldStyle::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CompileOptions {
    pub fn tagged(mut self, tag_key: impl Into<String>, content_key: impl Into<String>) -> Self {
        self.dispatch = Some(TaggedDispatch::new(tag_key, content_key));
        self
    }
}

// =============================================================================
// Compiled Grammar
// =============================================================================

/// Output of one compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledGrammar {
    /// Root, schema and derived rules in emission order
    pub rules: Vec<Rule>,
    /// Trailing primitive library block
    pub library: Vec<Rule>,
    /// Primitive list rules the traversal referenced
    pub referenced_lists: BTreeSet<Primitive>,
}

impl CompiledGrammar {
    /// Look up a rule (schema rules first, then the library)
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .chain(self.library.iter())
            .find(|r| r.name == name)
    }

    /// Full grammar text, blank lines stripped, library last
    pub fn text(&self) -> String {
        let lines: Vec<String> = self
            .rules
            .iter()
            .chain(self.library.iter())
            .map(Rule::to_string)
            .collect();
        remove_empty_lines(&lines.join("\n"))
    }
}

impl fmt::Display for CompiledGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

pub fn remove_empty_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Compiler
// =============================================================================

/// Drives one compilation per call; holds only options
#[derive(Debug, Clone, Default)]
pub struct GrammarCompiler {
    options: CompileOptions,
}

impl GrammarCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile every root of `set` into a grammar
    pub fn compile(&self, set: &SchemaSet) -> Result<CompiledGrammar> {
        let roots = set.roots()?;
        if roots.is_empty() {
            return Err(GrammarError::NoRoots);
        }
        let root_names = roots
            .iter()
            .map(|s| rule_token(&s.name))
            .collect::<Result<Vec<_>>>()?;

        let mut emitter = Emitter::new(set, &self.options);
        for name in primitives::library_names() {
            emitter.rules_mut().reserve(&name, RuleOwner::Library)?;
        }
        match &self.options.dispatch {
            None => {
                emitter.rules_mut().define(
                    "root",
                    RuleOwner::Root,
                    root_names.join(" | "),
                )?;
            }
            Some(dispatch) => {
                for rule in dispatch_rules(dispatch, &root_names)? {
                    emitter.rules_mut().define_rule(rule, RuleOwner::Root)?;
                }
            }
        }

        for schema in &roots {
            emitter.expand_schema(&schema.name)?;
        }

        let (rules, referenced_lists) = emitter.finish()?;
        let library = primitives::library(&referenced_lists);
        info!(
            roots = roots.len(),
            rules = rules.len(),
            tagged = self.options.dispatch.is_some(),
            "Compiled grammar"
        );
        Ok(CompiledGrammar {
            rules,
            library,
            referenced_lists,
        })
    }
}

/// Root rules of the tagged-dispatch envelope.
///
/// The literal commas in `*-grammar-model` are not surrounded by `ws`;
/// downstream parsers depend on this exact shape. The model literal is the
/// canonical rule name (`"\"send-message\""`), not the declared name.
fn dispatch_rules(dispatch: &TaggedDispatch, root_names: &[String]) -> Result<Vec<Rule>> {
    let tag_rule = rule_token(&dispatch.tag_key)?;
    let models: Vec<String> = root_names
        .iter()
        .map(|name| format!("{}-grammar-model", name))
        .collect();

    let mut rules = vec![
        Rule::new("root", tag_rule.clone()),
        Rule::new(
            tag_rule,
            format!(
                r#""{{" ws {} ":" ws grammar-models ws "}}""#,
                json_literal(&dispatch.tag_key)
            ),
        ),
        Rule::new("grammar-models", models.join(" | ")),
    ];
    for (name, model) in root_names.iter().zip(&models) {
        rules.push(Rule::new(
            model.clone(),
            format!(
                r#"{} "," {} ":" {}"#,
                json_literal(name),
                json_literal(&dispatch.content_key),
                name
            ),
        ));
    }
    debug!(tag = %dispatch.tag_key, models = models.len(), "Built dispatch envelope");
    Ok(rules)
}

/// Compile with default options
pub fn compile(set: &SchemaSet) -> Result<CompiledGrammar> {
    GrammarCompiler::default().compile(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Schema, TypeDescriptor};

    fn foo() -> SchemaSet {
        let foo = Schema::new("Foo").field(Field::new("x", TypeDescriptor::integer()));
        SchemaSet::from_schemas([foo]).unwrap()
    }

    #[test]
    fn test_rule_set_defines_once() {
        let mut rules = RuleSet::new();
        rules.define("a", RuleOwner::Derived, "b".into()).unwrap();
        rules.define("a", RuleOwner::Derived, "b".into()).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(matches!(
            rules.define("a", RuleOwner::Derived, "c".into()),
            Err(GrammarError::RuleConflict { .. })
        ));
    }

    #[test]
    fn test_rule_set_reservation() {
        let mut rules = RuleSet::new();
        let owner = RuleOwner::Schema("Foo".into());
        assert_eq!(rules.reserve("foo", owner.clone()).unwrap(), Reservation::Fresh);
        assert_eq!(rules.reserve("foo", owner.clone()).unwrap(), Reservation::Seen);
        assert!(rules.reserve("foo", RuleOwner::Class("Foo".into())).is_err());
        rules.define("foo", owner, "body".into()).unwrap();
        assert_eq!(rules.body("foo"), Some("body"));
    }

    #[test]
    fn test_undefined_reservation_is_rejected() {
        let mut rules = RuleSet::new();
        rules.reserve("dangling", RuleOwner::Derived).unwrap();
        assert!(matches!(rules.into_rules(), Err(GrammarError::RuleConflict { .. })));
    }

    #[test]
    fn test_plain_root_alternation() {
        let set =
            SchemaSet::from_schemas([Schema::new("CatModel"), Schema::new("DogModel")]).unwrap();
        let grammar = compile(&set).unwrap();
        assert_eq!(grammar.rules[0].to_string(), "root ::= cat-model | dog-model");
        assert_eq!(grammar.rule("cat-model").unwrap().body, r#""{" ws "}""#);
    }

    #[test]
    fn test_tagged_dispatch_envelope() {
        let compiler = GrammarCompiler::new(CompileOptions::default().tagged("kind", "data"));
        let grammar = compiler.compile(&foo()).unwrap();
        let text = grammar.text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "root ::= kind");
        assert_eq!(lines[1], r#"kind ::= "{" ws "\"kind\"" ":" ws grammar-models ws "}""#);
        assert_eq!(lines[2], "grammar-models ::= foo-grammar-model");
        assert_eq!(lines[3], r#"foo-grammar-model ::= "\"foo\"" "," "\"data\"" ":" foo"#);
        assert_eq!(lines[4], r#"foo ::= "{" ws "\"x\"" ":" ws integer ws "}""#);
    }

    #[test]
    fn test_schema_named_root_conflicts() {
        let set = SchemaSet::from_schemas([Schema::new("Root")]).unwrap();
        assert!(matches!(compile(&set), Err(GrammarError::RuleConflict { .. })));
    }

    #[test]
    fn test_library_names_cannot_be_redefined() {
        let set = SchemaSet::from_schemas([
            Schema::new("Float").field(Field::new("x", TypeDescriptor::integer()))
        ])
        .unwrap();
        match compile(&set).unwrap_err() {
            GrammarError::RuleConflict { name } => assert_eq!(name, "float"),
            other => panic!("Expected RuleConflict, got {:?}", other),
        }

        let lists = SchemaSet::from_schemas([Schema::new("StringList")]).unwrap();
        assert!(matches!(compile(&lists), Err(GrammarError::RuleConflict { .. })));

        let tagged = GrammarCompiler::new(CompileOptions::default().tagged("string", "data"));
        match tagged.compile(&foo()).unwrap_err() {
            GrammarError::RuleConflict { name } => assert_eq!(name, "string"),
            other => panic!("Expected RuleConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_library_reservations_are_not_emitted_twice() {
        let text = compile(&foo()).unwrap().text();
        assert_eq!(text.lines().filter(|l| l.starts_with("integer ::=")).count(), 1);
        assert_eq!(text.lines().next(), Some("root ::= foo"));
    }

    #[test]
    fn test_empty_root_set_is_rejected() {
        assert!(matches!(compile(&SchemaSet::new()), Err(GrammarError::NoRoots)));
    }

    #[test]
    fn test_names_are_sanitized_or_rejected() {
        let spaced = SchemaSet::from_schemas([Schema::new("My Person")]).unwrap();
        assert_eq!(compile(&spaced).unwrap().rules[0].to_string(), "root ::= my-person");

        let blank = SchemaSet::from_schemas([Schema::new("  ")]).unwrap();
        assert!(matches!(compile(&blank), Err(GrammarError::InvalidName { .. })));

        let tagged = GrammarCompiler::new(CompileOptions::default().tagged("", "data"));
        assert!(matches!(tagged.compile(&foo()), Err(GrammarError::InvalidName { .. })));
    }

    #[test]
    fn test_text_has_no_blank_lines_and_ends_with_library() {
        let text = compile(&foo()).unwrap().text();
        assert!(text.lines().all(|l| !l.trim().is_empty()));
        assert!(text.ends_with("integer ::= [0-9]+"));
    }

    #[test]
    fn test_remove_empty_lines() {
        assert_eq!(remove_empty_lines("a\n\n  \nb\n"), "a\nb");
    }
}
