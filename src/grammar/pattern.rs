//! String Pattern Rules
//!
//! Translates a small regular-expression subset into a GBNF sequence for the
//! contents of a JSON string. Supported: literals, `.`, `\d`, `\w`, `\s`,
//! escaped punctuation, character classes, groups, alternation and the
//! `* + ? {n} {n,} {n,m}` quantifiers. A leading `^` and trailing `$` are
//! dropped since the rule always spans the whole string.
//!
//! Quotes, backslashes and control characters cannot appear unescaped in a
//! JSON string, so patterns that would match them are rejected.

use crate::error::{GrammarError, Result};

use super::numeric::MAX_DIGITS;

/// Any character allowed raw inside a JSON string
const ANY_CHAR: &str = r#"[^"\\]"#;

/// Rule body matching a quoted JSON string whose contents match `pattern`
pub fn pattern_body(field: &str, pattern: &str) -> Result<String> {
    regex::Regex::new(pattern).map_err(|e| GrammarError::InvalidConstraint {
        field: field.to_string(),
        reason: format!("invalid pattern: {}", e),
    })?;

    let source = pattern.strip_prefix('^').unwrap_or(pattern);
    let source = match source.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => source,
    };

    let mut translator = Translator {
        field,
        chars: source.chars().collect(),
        pos: 0,
    };
    let mut branches = translator.alternation()?;
    if translator.pos < translator.chars.len() {
        return Err(translator.unsupported("unbalanced `)`"));
    }
    let inner = if branches.len() == 1 {
        branches.remove(0)
    } else {
        format!("( {} )", branches.join(" | "))
    };
    Ok(format!(r#""\"" {} "\"""#, inner))
}

fn repeat(atom: &str, min: u32, max: Option<u32>) -> String {
    let mut parts = vec![atom.to_string(); min as usize];
    match max {
        None => parts.push(format!("{}*", atom)),
        Some(max) => {
            let optional = format!("{}?", atom);
            parts.extend(std::iter::repeat(optional).take(max.saturating_sub(min) as usize));
        }
    }
    if parts.is_empty() {
        return r#""""#.to_string();
    }
    parts.join(" ")
}

struct Translator<'a> {
    field: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Translator<'_> {
    fn unsupported(&self, what: impl std::fmt::Display) -> GrammarError {
        GrammarError::InvalidConstraint {
            field: self.field.to_string(),
            reason: format!("unsupported pattern syntax: {}", what),
        }
    }

    fn raw_char(&self, c: char) -> GrammarError {
        self.unsupported(format!("{:?} cannot appear raw in a JSON string", c))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Branches up to the end of input or a closing `)`
    fn alternation(&mut self) -> Result<Vec<String>> {
        let mut branches = vec![self.sequence()?];
        while self.peek() == Some('|') {
            self.pos += 1;
            branches.push(self.sequence()?);
        }
        Ok(branches)
    }

    fn sequence(&mut self) -> Result<String> {
        let mut items = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let atom = self.atom()?;
            items.push(self.quantified(atom)?);
        }
        if items.is_empty() {
            return Ok(r#""""#.to_string());
        }
        Ok(items.join(" "))
    }

    fn atom(&mut self) -> Result<String> {
        let Some(c) = self.next() else {
            return Err(self.unsupported("unexpected end of pattern"));
        };
        match c {
            '.' => Ok(ANY_CHAR.to_string()),
            '(' => {
                if self.peek() == Some('?') {
                    self.pos += 1;
                    if self.next() != Some(':') {
                        return Err(self.unsupported("group flags"));
                    }
                }
                let branches = self.alternation()?;
                if self.next() != Some(')') {
                    return Err(self.unsupported("unclosed group"));
                }
                Ok(format!("( {} )", branches.join(" | ")))
            }
            '[' => self.class(),
            '\\' => self.escape(),
            '^' | '$' => Err(self.unsupported("anchor inside the pattern")),
            '*' | '+' | '?' | '{' => {
                Err(self.unsupported(format!("quantifier `{}` without an atom", c)))
            }
            c => self.literal(c),
        }
    }

    fn literal(&self, c: char) -> Result<String> {
        if c == '"' || c == '\\' || c.is_control() {
            return Err(self.raw_char(c));
        }
        Ok(format!("\"{}\"", c))
    }

    fn escape(&mut self) -> Result<String> {
        match self.next() {
            Some('d') => Ok("[0-9]".to_string()),
            Some('w') => Ok("[a-zA-Z0-9_]".to_string()),
            Some('s') => Ok(r#"" ""#.to_string()),
            Some(c) if c.is_ascii_punctuation() => self.literal(c),
            Some(c) => Err(self.unsupported(format!("escape `\\{}`", c))),
            None => Err(self.unsupported("trailing backslash")),
        }
    }

    fn class(&mut self) -> Result<String> {
        let mut body = String::from("[");
        let negated = self.peek() == Some('^');
        if negated {
            self.pos += 1;
            body.push('^');
        }
        let mut first = true;
        loop {
            let Some(c) = self.next() else {
                return Err(self.unsupported("unclosed character class"));
            };
            match c {
                ']' if first => body.push_str(r"\]"),
                ']' => break,
                '[' => return Err(self.unsupported("nested character class")),
                '\\' => match self.next() {
                    Some('d') => body.push_str("0-9"),
                    Some('w') => body.push_str("a-zA-Z0-9_"),
                    Some('s') => body.push(' '),
                    Some(e @ ('[' | ']')) => {
                        body.push('\\');
                        body.push(e);
                    }
                    Some(e @ ('.' | '*' | '+' | '?' | '(' | ')' | '{' | '}' | '|' | '$')) => {
                        body.push(e)
                    }
                    Some(e) => {
                        return Err(self.unsupported(format!("escape `\\{}` in a class", e)));
                    }
                    None => return Err(self.unsupported("trailing backslash")),
                },
                c if c == '"' || c.is_control() => return Err(self.raw_char(c)),
                c => body.push(c),
            }
            first = false;
        }
        if negated {
            body.push_str(r#""\\"#);
        }
        body.push(']');
        Ok(body)
    }

    fn quantified(&mut self, atom: String) -> Result<String> {
        let quantified = match self.peek() {
            Some(q @ ('*' | '+' | '?')) => {
                self.pos += 1;
                format!("{}{}", atom, q)
            }
            Some('{') => {
                self.pos += 1;
                let (min, max) = self.repetition()?;
                repeat(&atom, min, max)
            }
            _ => return Ok(atom),
        };
        // Lazy and greedy forms accept the same strings
        if self.peek() == Some('?') {
            self.pos += 1;
        }
        Ok(quantified)
    }

    fn repetition(&mut self) -> Result<(u32, Option<u32>)> {
        let mut counts = String::new();
        loop {
            match self.next() {
                Some('}') => break,
                Some(c) => counts.push(c),
                None => return Err(self.unsupported("unclosed repetition")),
            }
        }
        let bound = |s: &str| {
            s.trim()
                .parse::<u32>()
                .map_err(|_| self.unsupported(format!("repetition `{{{}}}`", counts)))
        };
        let (min, max) = match counts.split_once(',') {
            None => {
                let n = bound(&counts)?;
                (n, Some(n))
            }
            Some((min, max)) if max.trim().is_empty() => (bound(min)?, None),
            Some((min, max)) => (bound(min)?, Some(bound(max)?)),
        };
        if min.max(max.unwrap_or(0)) > MAX_DIGITS {
            return Err(self.unsupported(format!("repetition above {}", MAX_DIGITS)));
        }
        Ok((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(pattern: &str) -> String {
        pattern_body("code", pattern).unwrap()
    }

    #[test]
    fn test_digits_and_classes_with_counts() {
        assert_eq!(
            body(r"^\d{3}-[A-Z]{2}$"),
            r#""\"" [0-9] [0-9] [0-9] "-" [A-Z] [A-Z] "\"""#
        );
    }

    #[test]
    fn test_groups_alternation_and_quantifiers() {
        assert_eq!(body("(ab|c)+x?"), r#""\"" ( "a" "b" | "c" )+ "x"? "\"""#);
        assert_eq!(body("yes|no"), r#""\"" ( "y" "e" "s" | "n" "o" ) "\"""#);
        assert_eq!(body(r"(?:\w)*?"), r#""\"" ( [a-zA-Z0-9_] )* "\"""#);
    }

    #[test]
    fn test_wildcards_stay_inside_the_string() {
        assert_eq!(body(".{1,3}"), r#""\"" [^"\\] [^"\\]? [^"\\]? "\"""#);
        assert_eq!(body("[^a]{2,}"), r#""\"" [^a"\\] [^a"\\] [^a"\\]* "\"""#);
        assert_eq!(body(r"a\.b"), r#""\"" "a" "." "b" "\"""#);
    }

    #[test]
    fn test_empty_pattern_matches_empty_string() {
        assert_eq!(body(""), r#""\"" "" "\"""#);
    }

    #[test]
    fn test_unsupported_patterns_rejected() {
        for pattern in ["(", r#"a"b"#, r"\bword", r"a\\b", "(?i)abc", "a{1,99}", r"[\n]"] {
            assert!(
                matches!(
                    pattern_body("code", pattern),
                    Err(GrammarError::InvalidConstraint { .. })
                ),
                "{}",
                pattern
            );
        }
    }
}
