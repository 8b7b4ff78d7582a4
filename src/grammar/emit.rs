//! Rule Emission
//!
//! Walks schemas field by field and emits the rules each field needs.
//!
//! Two naming paths exist:
//! - field-scoped: enums, arrays and unions declared on a schema field get
//!   `{schema}-{field}` names, so each field owns its rule;
//! - type-canonical: opaque-class members and map keys/values are named by
//!   [`classify`], so identical types share one rule grammar-wide.
//!
//! Declared schemas and opaque classes are both guarded by the [`RuleSet`]
//! reservation: a second visit only references the rule name.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{GrammarError, Result};
use crate::schema::{EnumType, Field, NumericConstraints, Primitive, SchemaSet, TypeDescriptor};

use super::names::{classify, json_literal, qualified, rule_token};
use super::numeric;
use super::pattern;
use super::primitives::list_rule;
use super::{CompileOptions, OptionalFieldStyle, Reservation, Rule, RuleOwner, RuleSet};

const SEPARATOR: &str = r#"ws "," ws"#;

/// One `"key": value` entry of an object rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub fragment: String,
    pub required: bool,
}

impl Slot {
    pub fn new(key: &str, token: &str, required: bool) -> Self {
        Self {
            fragment: format!(r#"{} ":" ws {}"#, json_literal(key), token),
            required,
        }
    }
}

/// Object rule body over ordered slots.
///
/// All-required: `"{" ws f1 ws "," ws f2 ws "}"`. Optional slots may be
/// absent entirely; separators attach to the first required slot, or, when
/// every slot is optional, to whichever slot comes first.
pub fn object_body(slots: &[Slot]) -> String {
    if slots.is_empty() {
        return r#""{" ws "}""#.to_string();
    }
    let trailing = |rest: &[Slot], parts: &mut Vec<String>| {
        for slot in rest {
            if slot.required {
                parts.push(format!("{} {}", SEPARATOR, slot.fragment));
            } else {
                parts.push(format!("( {} {} )?", SEPARATOR, slot.fragment));
            }
        }
    };

    let inner = match slots.iter().position(|s| s.required) {
        Some(anchor) => {
            let mut parts: Vec<String> = slots[..anchor]
                .iter()
                .map(|s| format!("( {} {} )?", s.fragment, SEPARATOR))
                .collect();
            parts.push(slots[anchor].fragment.clone());
            trailing(&slots[anchor + 1..], &mut parts);
            parts.join(" ")
        }
        None => {
            let alternatives: Vec<String> = (0..slots.len())
                .map(|first| {
                    let mut parts = vec![slots[first].fragment.clone()];
                    trailing(&slots[first + 1..], &mut parts);
                    parts.join(" ")
                })
                .collect();
            format!("( {} )?", alternatives.join(" | "))
        }
    };
    format!(r#""{{" ws {} ws "}}""#, inner)
}

fn enum_body(enum_type: &EnumType) -> Result<String> {
    if enum_type.values.is_empty() {
        return Err(GrammarError::EmptyEnum {
            name: enum_type.name.clone(),
        });
    }
    Ok(enum_type
        .values
        .iter()
        .map(|v| json_literal(v))
        .collect::<Vec<_>>()
        .join(" | "))
}

/// Rule emitter for one compilation
pub struct Emitter<'a> {
    set: &'a SchemaSet,
    options: &'a CompileOptions,
    rules: RuleSet,
    lists: BTreeSet<Primitive>,
    depth: usize,
}

impl<'a> Emitter<'a> {
    pub fn new(set: &'a SchemaSet, options: &'a CompileOptions) -> Self {
        Self {
            set,
            options,
            rules: RuleSet::new(),
            lists: BTreeSet::new(),
            depth: 0,
        }
    }

    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    /// Emitted rules in order, and the primitive lists referenced
    pub fn finish(self) -> Result<(Vec<Rule>, BTreeSet<Primitive>)> {
        Ok((self.rules.into_rules()?, self.lists))
    }

    fn derive(&mut self, name: &str, body: String) -> Result<()> {
        self.rules.define(name, RuleOwner::Derived, body)
    }

    fn enter(&mut self, limit_error: impl FnOnce(usize) -> GrammarError) -> Result<()> {
        if self.depth >= self.options.max_depth {
            return Err(limit_error(self.options.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    // =========================================================================
    // Schemas and classes
    // =========================================================================

    /// Expand a declared schema into its object rule (at most once)
    pub fn expand_schema(&mut self, name: &str) -> Result<String> {
        let set = self.set;
        let schema = set.schema(name)?;
        let rule = rule_token(&schema.name)?;
        let owner = RuleOwner::Schema(schema.name.clone());
        if self.rules.reserve(&rule, owner.clone())? == Reservation::Seen {
            return Ok(rule);
        }
        self.enter(|limit| GrammarError::RecursionLimit {
            schema: schema.name.clone(),
            limit,
        })?;
        debug!(schema = %schema.name, fields = schema.fields.len(), "Expanding schema");

        let mut slots = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            slots.push(self.emit_field(&rule, field)?);
        }
        self.depth -= 1;

        self.rules.define(&rule, owner, object_body(&slots))?;
        Ok(rule)
    }

    /// Expand an opaque class from its member list (at most once)
    pub fn expand_class(&mut self, name: &str) -> Result<String> {
        let set = self.set;
        let class = set.class(name)?;
        rule_token(&class.name)?;
        let rule = classify(&TypeDescriptor::Opaque(class.name.clone()));
        let owner = RuleOwner::Class(class.name.clone());
        if self.rules.reserve(&rule, owner.clone())? == Reservation::Seen {
            return Ok(rule);
        }
        self.enter(|limit| GrammarError::CyclicOpaqueClass {
            class: class.name.clone(),
            limit,
        })?;
        debug!(class = %class.name, members = class.members.len(), "Expanding opaque class");

        let mut slots = Vec::with_capacity(class.members.len());
        for member in &class.members {
            let token = self.emit_canonical(&member.ty)?;
            slots.push(Slot::new(&member.name, &token, true));
        }
        self.depth -= 1;

        self.rules.define(&rule, owner, object_body(&slots))?;
        Ok(rule)
    }

    // =========================================================================
    // Field-scoped path
    // =========================================================================

    /// Emit a field's rules and return its object slot
    pub fn emit_field(&mut self, model: &str, field: &Field) -> Result<Slot> {
        if !field.constraints.is_empty() {
            if !field.ty.admits_numeric_bounds() {
                return Err(GrammarError::InvalidConstraint {
                    field: field.name.clone(),
                    reason: format!("numeric bounds on non-numeric type {}", field.ty),
                });
            }
            numeric::validate(&field.name, &field.constraints)?;
        }

        let field_rule = rule_token(&field.name)?;
        let token = match &field.pattern {
            Some(pattern) => self.emit_pattern(model, &field_rule, field, pattern)?,
            None => self.emit_type(model, &field_rule, &field.ty, &field.constraints)?,
        };
        let slot = match self.options.optional_fields {
            OptionalFieldStyle::OmitKey => Slot::new(&field.name, &token, field.required),
            OptionalFieldStyle::NullableValue if field.required => {
                Slot::new(&field.name, &token, true)
            }
            OptionalFieldStyle::NullableValue => {
                Slot::new(&field.name, &format!("({})?", token), true)
            }
        };
        Ok(slot)
    }

    fn emit_pattern(
        &mut self,
        model: &str,
        field_rule: &str,
        field: &Field,
        pattern: &str,
    ) -> Result<String> {
        if field.ty != TypeDescriptor::string() {
            return Err(GrammarError::InvalidConstraint {
                field: field.name.clone(),
                reason: format!("pattern on non-string type {}", field.ty),
            });
        }
        let name = format!("{}-pattern", qualified(model, field_rule));
        self.derive(&name, pattern::pattern_body(&field.name, pattern)?)?;
        debug!(rule = %name, pattern, "Emitted pattern rule");
        Ok(name)
    }

    /// Rule reference for a type declared on `model`'s field `field`
    pub fn emit_type(
        &mut self,
        model: &str,
        field: &str,
        ty: &TypeDescriptor,
        constraints: &NumericConstraints,
    ) -> Result<String> {
        match ty {
            TypeDescriptor::Primitive(Primitive::Integer) => {
                let rule = numeric::integer_rule(constraints.max_digit, constraints.min_digit);
                self.define_all(rule.rules)?;
                Ok(rule.name)
            }
            TypeDescriptor::Primitive(Primitive::Float) => {
                let rule = numeric::float_rule(constraints);
                self.define_all(rule.rules)?;
                Ok(rule.name)
            }
            TypeDescriptor::Primitive(p) => Ok(p.rule_name().to_string()),
            TypeDescriptor::Enum(enum_type) => {
                let name = qualified(model, field);
                self.derive(&name, enum_body(enum_type)?)?;
                Ok(name)
            }
            TypeDescriptor::Record(name) => self.expand_schema(name),
            TypeDescriptor::Array(element) => {
                let element_field = format!("{}-element", field);
                let element_rule = self.emit_type(model, &element_field, element, constraints)?;
                let name = qualified(model, field);
                self.derive(
                    &name,
                    format!(r#""[" ws {e} ("," ws {e})* ws "]""#, e = element_rule),
                )?;
                Ok(name)
            }
            TypeDescriptor::Union { variants, .. } => {
                if let [single] = variants.as_slice() {
                    let inner = self.emit_type(model, field, single, constraints)?;
                    let name = format!("{}-optional", qualified(model, field));
                    self.derive(&name, format!("( {} )?", inner))?;
                    return Ok(name);
                }
                let mut arms = Vec::with_capacity(variants.len());
                for (i, variant) in variants.iter().enumerate() {
                    let variant_field = format!("{}-variant{}", field, i + 1);
                    arms.push(self.emit_type(model, &variant_field, variant, constraints)?);
                }
                let name = format!("{}-union", qualified(model, field));
                self.derive(&name, arms.join(" | "))?;
                Ok(name)
            }
            TypeDescriptor::Map { .. } => self.emit_canonical(ty),
            TypeDescriptor::Opaque(name) => self.expand_class(name),
        }
    }

    fn define_all(&mut self, rules: Vec<Rule>) -> Result<()> {
        for rule in rules {
            self.rules.define_rule(rule, RuleOwner::Derived)?;
        }
        Ok(())
    }

    // =========================================================================
    // Type-canonical path
    // =========================================================================

    /// Rule reference named purely by the type's classification
    pub fn emit_canonical(&mut self, ty: &TypeDescriptor) -> Result<String> {
        match ty {
            TypeDescriptor::Primitive(p) => Ok(p.rule_name().to_string()),
            TypeDescriptor::Enum(enum_type) => {
                let name = rule_token(&enum_type.name)?;
                self.derive(&name, enum_body(enum_type)?)?;
                Ok(name)
            }
            TypeDescriptor::Record(name) => self.expand_schema(name),
            TypeDescriptor::Array(element) => {
                if let TypeDescriptor::Primitive(p) = element.as_ref() {
                    self.lists.insert(*p);
                    return Ok(classify(ty));
                }
                let element_rule = self.emit_canonical(element)?;
                let rule = list_rule(classify(ty), &element_rule);
                let name = rule.name.clone();
                self.rules.define_rule(rule, RuleOwner::Derived)?;
                Ok(name)
            }
            TypeDescriptor::Union { variants, .. } => {
                let mut arms = Vec::with_capacity(variants.len());
                for variant in variants {
                    arms.push(self.emit_canonical(variant)?);
                }
                let body = match arms.as_slice() {
                    [single] => format!("( {} )?", single),
                    _ => arms.join(" | "),
                };
                let name = classify(ty);
                self.derive(&name, body)?;
                Ok(name)
            }
            TypeDescriptor::Map { key, value } => {
                let k = self.emit_canonical(key)?;
                let v = self.emit_canonical(value)?;
                let name = classify(ty);
                self.derive(
                    &name,
                    format!(
                        r#""{{" ws ( {k} ":" ws {v} ("," ws {k} ":" ws {v})* )? "}}" ws"#,
                        k = k,
                        v = v
                    ),
                )?;
                Ok(name)
            }
            TypeDescriptor::Opaque(name) => self.expand_class(name),
        }
    }
}
