//! Type expressions
//!
//! Textual field types such as `list<SkillSet>`, `optional<int>` or
//! `map<string, union<integer, float>>`. Square brackets are accepted in
//! place of angle brackets (`List[str]`).
//!
//! Parsing is two-step: [`parse`] builds a [`TypeExpr`] syntax tree, and
//! [`resolve`] turns it into a [`TypeDescriptor`] against the declared
//! names. Anything that does not resolve is an `UnsupportedType` error.

use std::fmt;

use crate::error::{GrammarError, Result};

use super::{Primitive, TypeDescriptor};

/// Unresolved type expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named(String),
    Generic { name: String, args: Vec<TypeExpr> },
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Generic { name, args } => {
                write!(f, "{}<", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
        }
    }
}

// =============================================================================
// Parser
// =============================================================================

/// Parse a type expression
pub fn parse(input: &str) -> Result<TypeExpr> {
    let mut parser = Parser { input, pos: 0 };
    let expr = parser.expr()?;
    parser.skip_ws();
    if parser.pos < input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, message: &str) -> GrammarError {
        GrammarError::Parse {
            input: self.input.to_string(),
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn ident(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            let ok = if self.pos == start {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '_'
            };
            if !ok {
                break;
            }
            self.pos += c.len_utf8();
        }
        if self.pos == start {
            return Err(self.error("expected a type name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn expr(&mut self) -> Result<TypeExpr> {
        let name = self.ident()?;
        self.skip_ws();
        let close = match self.peek() {
            Some('<') => '>',
            Some('[') => ']',
            _ => return Ok(TypeExpr::Named(name)),
        };
        self.pos += 1;

        let mut args = vec![self.expr()?];
        loop {
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    args.push(self.expr()?);
                }
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(TypeExpr::Generic { name, args });
                }
                Some(_) => return Err(self.error("expected `,` or a closing bracket")),
                None => return Err(self.error("unterminated type arguments")),
            }
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

fn builtin(name: &str) -> Option<Primitive> {
    match name {
        "string" | "str" | "String" => Some(Primitive::String),
        "boolean" | "bool" | "Boolean" => Some(Primitive::Boolean),
        "integer" | "int" | "Integer" => Some(Primitive::Integer),
        "float" | "Float" | "number" => Some(Primitive::Float),
        _ => None,
    }
}

fn is_null(expr: &TypeExpr) -> bool {
    matches!(expr, TypeExpr::Named(name) if matches!(name.as_str(), "null" | "None" | "none"))
}

fn unsupported(expr: &TypeExpr) -> GrammarError {
    GrammarError::UnsupportedType {
        descriptor: expr.to_string(),
    }
}

/// Resolve an expression; `lookup` maps declared names to descriptors
pub fn resolve(
    expr: &TypeExpr,
    lookup: &dyn Fn(&str) -> Option<TypeDescriptor>,
) -> Result<TypeDescriptor> {
    match expr {
        TypeExpr::Named(name) => {
            if let Some(primitive) = builtin(name) {
                return Ok(TypeDescriptor::Primitive(primitive));
            }
            lookup(name).ok_or_else(|| unsupported(expr))
        }
        TypeExpr::Generic { name, args } => match (name.as_str(), args.as_slice()) {
            ("list" | "List" | "array", [element]) => {
                Ok(TypeDescriptor::list(resolve(element, lookup)?))
            }
            ("optional" | "Optional", [inner]) => {
                Ok(TypeDescriptor::optional(resolve(inner, lookup)?))
            }
            ("map" | "dict" | "Dict", [key, value]) => Ok(TypeDescriptor::map(
                resolve(key, lookup)?,
                resolve(value, lookup)?,
            )),
            ("union" | "Union", arms) => {
                let nullable = arms.iter().any(is_null);
                let variants = arms
                    .iter()
                    .filter(|arm| !is_null(arm))
                    .map(|arm| resolve(arm, lookup))
                    .collect::<Result<Vec<_>>>()?;
                if variants.is_empty() {
                    return Err(unsupported(expr));
                }
                Ok(TypeDescriptor::Union { variants, nullable })
            }
            _ => Err(unsupported(expr)),
        },
    }
}

/// Parse and resolve in one step
pub fn parse_type(
    input: &str,
    lookup: &dyn Fn(&str) -> Option<TypeDescriptor>,
) -> Result<TypeDescriptor> {
    resolve(&parse(input)?, lookup)
}

// =============================================================================
// Rendering
// =============================================================================

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(p) => write!(f, "{}", p.rule_name()),
            TypeDescriptor::Enum(e) => write!(f, "{}", e.name),
            TypeDescriptor::Record(name) | TypeDescriptor::Opaque(name) => write!(f, "{}", name),
            TypeDescriptor::Array(element) => write!(f, "list<{}>", element),
            TypeDescriptor::Union { variants, nullable } => {
                if *nullable && variants.len() == 1 {
                    return write!(f, "optional<{}>", variants[0]);
                }
                write!(f, "union<")?;
                for (i, variant) in variants.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", variant)?;
                }
                if *nullable {
                    write!(f, ", null")?;
                }
                write!(f, ">")
            }
            TypeDescriptor::Map { key, value } => write!(f, "map<{}, {}>", key, value),
        }
    }
}
