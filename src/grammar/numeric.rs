//! Numeric Constraint Rules
//!
//! Bounded digit-count sub-grammars for integers and floats. These bound the
//! *length* of a numeral, not its value: `min_digit = 3, max_digit = 5`
//! accepts any numeral of three to five digits.
//!
//! Rule names encode their bounds (`integer-part-max5-min3`), so equal
//! bounds share a rule and different bounds never collide.

use crate::error::{GrammarError, Result};
use crate::schema::NumericConstraints;

use super::Rule;

/// A numeric rule reference plus the rules it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericRule {
    pub name: String,
    pub rules: Vec<Rule>,
}

/// `min` mandatory digits (default 1) then `max - min` optional ones
fn digit_body(min: Option<u32>, max: Option<u32>) -> String {
    let min = min.unwrap_or(1);
    let optional = max.map(|max| max.saturating_sub(min)).unwrap_or(0);
    let mut tokens = vec!["[0-9]"; min as usize];
    tokens.extend(std::iter::repeat("[0-9]?").take(optional as usize));
    tokens.join(" ")
}

fn bounded_name(base: &str, max: Option<u32>, min: Option<u32>) -> String {
    let mut name = base.to_string();
    if let Some(max) = max {
        name.push_str(&format!("-max{}", max));
    }
    if let Some(min) = min {
        name.push_str(&format!("-min{}", min));
    }
    name
}

/// Largest digit or precision bound a constraint may name
pub const MAX_DIGITS: u32 = 64;

fn check_pair(field: &str, what: &str, min: Option<u32>, max: Option<u32>) -> Result<()> {
    let invalid = |reason: String| GrammarError::InvalidConstraint {
        field: field.to_string(),
        reason,
    };
    if min == Some(0) {
        return Err(invalid(format!("minimum {} must be at least 1", what)));
    }
    if max == Some(0) {
        return Err(invalid(format!("maximum {} must be at least 1", what)));
    }
    for bound in [min, max].into_iter().flatten() {
        if bound > MAX_DIGITS {
            return Err(invalid(format!(
                "{} bound {} exceeds the limit of {}",
                what, bound, MAX_DIGITS
            )));
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if max < min {
            return Err(invalid(format!("maximum {} {} is below minimum {}", what, max, min)));
        }
    }
    Ok(())
}

/// Reject bounds that cannot produce a non-empty numeral
pub fn validate(field: &str, constraints: &NumericConstraints) -> Result<()> {
    check_pair(field, "digits", constraints.min_digit, constraints.max_digit)?;
    check_pair(field, "precision", constraints.min_precision, constraints.max_precision)
}

/// Integer with digit-count bounds; unbounded falls back to `integer`
pub fn integer_rule(max_digit: Option<u32>, min_digit: Option<u32>) -> NumericRule {
    if max_digit.is_none() && min_digit.is_none() {
        return NumericRule {
            name: "integer".to_string(),
            rules: Vec::new(),
        };
    }
    let name = bounded_name("integer-part", max_digit, min_digit);
    NumericRule {
        rules: vec![Rule::new(&name, digit_body(min_digit, max_digit))],
        name,
    }
}

fn slot(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "X".to_string())
}

/// Float as integer part, `"."`, fractional part; unbounded falls back to `float`
pub fn float_rule(constraints: &NumericConstraints) -> NumericRule {
    if constraints.is_empty() {
        return NumericRule {
            name: "float".to_string(),
            rules: Vec::new(),
        };
    }
    let mut rules = Vec::new();

    let integer = integer_rule(constraints.max_digit, constraints.min_digit);
    let integer_part = if integer.rules.is_empty() {
        "integer-part".to_string()
    } else {
        rules.extend(integer.rules);
        integer.name
    };

    let fractional_part = if constraints.has_precision() {
        let (min, max) = (constraints.min_precision, constraints.max_precision);
        let name = bounded_name("fractional-part", max, min);
        rules.push(Rule::new(&name, digit_body(min, max)));
        name
    } else {
        "fractional-part".to_string()
    };

    let name = format!(
        "float-{}-{}-{}-{}",
        slot(constraints.max_digit),
        slot(constraints.min_digit),
        slot(constraints.max_precision),
        slot(constraints.min_precision)
    );
    rules.push(Rule::new(&name, format!("{} \".\" {}", integer_part, fractional_part)));
    NumericRule { name, rules }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    /// A digit-rule body only uses `[0-9]` and `[0-9]?`, which read the same as regex
    fn accepts(body: &str, numeral: &str) -> bool {
        let pattern = format!("^{}$", body.replace(' ', ""));
        Regex::new(&pattern).unwrap().is_match(numeral)
    }

    #[test]
    fn test_integer_digit_bounds() {
        let rule = integer_rule(Some(5), Some(3));
        assert_eq!(rule.name, "integer-part-max5-min3");
        let body = &rule.rules[0].body;
        assert_eq!(body, "[0-9] [0-9] [0-9] [0-9]? [0-9]?");

        assert!(!accepts(body, "12"));
        assert!(accepts(body, "123"));
        assert!(accepts(body, "1234"));
        assert!(accepts(body, "12345"));
        assert!(!accepts(body, "123456"));
    }

    #[test]
    fn test_integer_defaults() {
        assert_eq!(integer_rule(None, None).name, "integer");
        assert!(integer_rule(None, None).rules.is_empty());

        let max_only = integer_rule(Some(3), None);
        assert_eq!(max_only.name, "integer-part-max3");
        assert_eq!(max_only.rules[0].body, "[0-9] [0-9]? [0-9]?");

        let min_only = integer_rule(None, Some(2));
        assert_eq!(min_only.name, "integer-part-min2");
        assert_eq!(min_only.rules[0].body, "[0-9] [0-9]");
    }

    #[test]
    fn test_float_precision_bounds() {
        let constraints = NumericConstraints {
            max_precision: Some(2),
            min_precision: Some(1),
            ..Default::default()
        };
        let rule = float_rule(&constraints);
        assert_eq!(rule.name, "float-X-X-2-1");

        let fractional = rule.rules.iter().find(|r| r.name == "fractional-part-max2-min1").unwrap();
        assert!(!accepts(&fractional.body, ""));
        assert!(accepts(&fractional.body, "5"));
        assert!(accepts(&fractional.body, "50"));
        assert!(!accepts(&fractional.body, "505"));

        let float = rule.rules.last().unwrap();
        assert_eq!(float.body, r#"integer-part "." fractional-part-max2-min1"#);
    }

    #[test]
    fn test_float_with_both_bounds() {
        let constraints = NumericConstraints {
            max_digit: Some(5),
            min_digit: Some(3),
            max_precision: Some(2),
            min_precision: Some(1),
        };
        let rule = float_rule(&constraints);
        assert_eq!(rule.name, "float-5-3-2-1");
        let names: Vec<_> = rule.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["integer-part-max5-min3", "fractional-part-max2-min1", "float-5-3-2-1"]
        );
    }

    #[test]
    fn test_precision_max_only_defaults_min_to_one() {
        let constraints = NumericConstraints {
            max_precision: Some(3),
            ..Default::default()
        };
        let rule = float_rule(&constraints);
        let fractional = rule.rules.iter().find(|r| r.name == "fractional-part-max3").unwrap();
        assert_eq!(fractional.body, "[0-9] [0-9]? [0-9]?");
    }

    #[test]
    fn test_validate_rejects_inverted_and_zero_bounds() {
        let inverted = NumericConstraints {
            max_digit: Some(2),
            min_digit: Some(4),
            ..Default::default()
        };
        assert!(matches!(validate("n", &inverted), Err(GrammarError::InvalidConstraint { .. })));

        let zero = NumericConstraints {
            min_precision: Some(0),
            ..Default::default()
        };
        assert!(validate("n", &zero).is_err());
        assert!(validate("n", &NumericConstraints::default()).is_ok());
    }

    #[test]
    fn test_validate_caps_bound_size() {
        let huge = NumericConstraints {
            max_digit: Some(4_000_000_000),
            ..Default::default()
        };
        assert!(matches!(validate("n", &huge), Err(GrammarError::InvalidConstraint { .. })));

        let huge_min = NumericConstraints {
            min_precision: Some(MAX_DIGITS + 1),
            ..Default::default()
        };
        assert!(validate("n", &huge_min).is_err());

        let at_limit = NumericConstraints {
            min_digit: Some(MAX_DIGITS),
            max_digit: Some(MAX_DIGITS),
            ..Default::default()
        };
        assert!(validate("n", &at_limit).is_ok());
    }
}
