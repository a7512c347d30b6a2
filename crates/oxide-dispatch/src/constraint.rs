//! Parameter constraints.
//!
//! A constraint must accept the *whole* captured value. Regex constraints
//! are anchored when compiled, so `\d+` rejects `12ab`.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::error::{Result, RouterError};
use crate::request::PathParams;

/// A validator for one route parameter.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// An anchored regular expression.
    Regex(Regex),
    /// One or more ASCII digits.
    Number,
    /// One or more ASCII letters.
    Alpha,
    /// One or more ASCII letters or digits.
    AlphaNumeric,
    /// Exactly one of the listed strings.
    In(Vec<String>),
    /// A hyphenated UUID (any version, either case).
    Uuid,
    /// A 26 character ULID.
    Ulid,
}

impl Constraint {
    /// Compiles an anchored regex constraint.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidConstraint`] if `source` does not compile.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_dispatch::Constraint;
    ///
    /// let c = Constraint::regex("id", "[0-9]+").unwrap();
    /// assert!(c.is_satisfied_by("42"));
    /// assert!(!c.is_satisfied_by("42abc"));
    /// ```
    pub fn regex(param: &str, source: &str) -> Result<Self> {
        Regex::new(&format!("^(?:{source})$"))
            .map(Self::Regex)
            .map_err(|e| RouterError::InvalidConstraint {
                param: param.to_string(),
                message: e.to_string(),
            })
    }

    /// Builds an enum-of-strings constraint.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::In(values.into_iter().map(Into::into).collect())
    }

    /// Returns `true` if `value` satisfies the constraint in full.
    pub fn is_satisfied_by(&self, value: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(value),
            Self::Number => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
            Self::Alpha => !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphabetic()),
            Self::AlphaNumeric => {
                !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric())
            }
            Self::In(values) => values.iter().any(|v| v == value),
            Self::Uuid => is_uuid(value),
            Self::Ulid => is_ulid(value),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex(re) => write!(f, "regex {}", re.as_str()),
            Self::Number => write!(f, "number"),
            Self::Alpha => write!(f, "alpha"),
            Self::AlphaNumeric => write!(f, "alphanumeric"),
            Self::In(values) => write!(f, "one of [{}]", values.join(", ")),
            Self::Uuid => write!(f, "uuid"),
            Self::Ulid => write!(f, "ulid"),
        }
    }
}

fn is_uuid(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

fn is_ulid(value: &str) -> bool {
    // Crockford base32 without I, L, O, U; the first char caps the value at 2^128.
    let bytes = value.as_bytes();
    bytes.len() == 26
        && matches!(bytes[0], b'0'..=b'7')
        && bytes[1..].iter().all(|b| {
            let b = b.to_ascii_uppercase();
            b.is_ascii_digit()
                || (b.is_ascii_uppercase() && !matches!(b, b'I' | b'L' | b'O' | b'U'))
        })
}

/// Constraints keyed by parameter name.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: HashMap<String, Constraint>,
}

impl ConstraintSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the constraint for `param`, replacing any earlier one.
    pub fn insert(&mut self, param: impl Into<String>, constraint: Constraint) {
        self.constraints.insert(param.into(), constraint);
    }

    /// Gets the constraint for `param`.
    pub fn get(&self, param: &str) -> Option<&Constraint> {
        self.constraints.get(param)
    }

    /// Returns `true` if no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Iterates over `(param, constraint)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fills in `defaults` for parameters this set does not constrain.
    pub fn extend_defaults(&mut self, defaults: &Self) {
        for (param, constraint) in &defaults.constraints {
            self.constraints
                .entry(param.clone())
                .or_insert_with(|| constraint.clone());
        }
    }

    /// Checks every supplied parameter against its constraint.
    ///
    /// Returns the name of the first parameter that fails.
    pub fn check<'p>(&self, params: &'p PathParams) -> std::result::Result<(), &'p str> {
        for (name, value) in params.iter() {
            let Some(raw) = value.as_str() else { continue };
            if let Some(constraint) = self.constraints.get(name) {
                if !constraint.is_satisfied_by(raw) {
                    return Err(name);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_is_anchored() {
        let c = Constraint::regex("id", r"\d+").unwrap();
        assert!(c.is_satisfied_by("123"));
        assert!(!c.is_satisfied_by("abc123"));
        assert!(!c.is_satisfied_by("123abc"));

        let alternation = Constraint::regex("kind", "a|b").unwrap();
        assert!(alternation.is_satisfied_by("a"));
        assert!(!alternation.is_satisfied_by("ab"));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            Constraint::regex("id", "(unclosed"),
            Err(RouterError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn test_builtin_constraints() {
        assert!(Constraint::Number.is_satisfied_by("42"));
        assert!(!Constraint::Number.is_satisfied_by(""));
        assert!(!Constraint::Number.is_satisfied_by("-1"));
        assert!(Constraint::Alpha.is_satisfied_by("john"));
        assert!(!Constraint::Alpha.is_satisfied_by("john1"));
        assert!(Constraint::AlphaNumeric.is_satisfied_by("john1"));
        assert!(!Constraint::AlphaNumeric.is_satisfied_by("john_1"));
    }

    #[test]
    fn test_one_of() {
        let c = Constraint::one_of(["movie", "song"]);
        assert!(c.is_satisfied_by("song"));
        assert!(!c.is_satisfied_by("songs"));
    }

    #[test]
    fn test_uuid_and_ulid() {
        assert!(Constraint::Uuid.is_satisfied_by("550e8400-e29b-41d4-a716-446655440000"));
        assert!(Constraint::Uuid.is_satisfied_by("550E8400-E29B-41D4-A716-446655440000"));
        assert!(!Constraint::Uuid.is_satisfied_by("550e8400e29b41d4a716446655440000"));
        assert!(Constraint::Ulid.is_satisfied_by("01ARZ3NDEKTSV4RRFFQ69G5FAV"));
        assert!(!Constraint::Ulid.is_satisfied_by("81ARZ3NDEKTSV4RRFFQ69G5FAV"));
        assert!(!Constraint::Ulid.is_satisfied_by("01ARZ3NDEKTSV4RRFFQ69G5FAU"));
    }

    #[test]
    fn test_local_wins_over_default() {
        let mut defaults = ConstraintSet::new();
        defaults.insert("id", Constraint::Number);
        defaults.insert("slug", Constraint::Alpha);

        let mut local = ConstraintSet::new();
        local.insert("id", Constraint::Uuid);
        local.extend_defaults(&defaults);

        assert!(matches!(local.get("id"), Some(Constraint::Uuid)));
        assert!(matches!(local.get("slug"), Some(Constraint::Alpha)));
    }

    #[test]
    fn test_check_skips_absent_values() {
        let mut set = ConstraintSet::new();
        set.insert("page", Constraint::Number);

        let mut params = PathParams::new();
        params.insert_absent("page");
        assert!(set.check(&params).is_ok());

        params.insert("page", "two");
        assert_eq!(set.check(&params), Err("page"));
    }
}
