//! Predicates: the split conditions of tree nodes.
//!
//! A [`Predicate`] tests one field of a resolved [`InputRecord`]; a
//! [`Predicates`] set matches when all of its members do. Both render to a
//! human readable rule with [`Predicates::rule`].

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::data::{Field, FieldSet, FieldValue, InputRecord, TermAnalysis, TokenMode};

// =============================================================================
// Operator
// =============================================================================

/// Comparison operator of a predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

impl Operator {
    /// Parse a source operator. A trailing `*` marks the predicate as also
    /// matching missing values, returned as the second element.
    pub fn parse(text: &str) -> Option<(Self, bool)> {
        let (base, missing) = match text.strip_suffix('*') {
            Some(base) => (base, true),
            None => (text, false),
        };
        let op = match base {
            "=" | "==" => Operator::Eq,
            "!=" | "/=" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "in" => Operator::In,
            _ => return None,
        };
        Some((op, missing))
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::In => "in",
        }
    }

    /// Evaluate `left <op> right`. `In` never holds for scalars.
    #[inline]
    pub fn compare<T: PartialOrd + ?Sized>(self, left: &T, right: &T) -> bool {
        match self {
            Operator::Eq => left == right,
            Operator::Ne => left != right,
            Operator::Lt => left < right,
            Operator::Le => left <= right,
            Operator::Gt => left > right,
            Operator::Ge => left >= right,
            Operator::In => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// =============================================================================
// Value
// =============================================================================

/// Right-hand side of a predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum PredicateValue {
    /// The missing sentinel (`null` in the source format).
    Null,
    Number(f64),
    Text(String),
    /// Members of an `in` predicate.
    Set(Vec<PredicateValue>),
}

impl PredicateValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, PredicateValue::Null)
    }

    /// Equality of a scalar against an input value.
    fn equals(&self, input: &FieldValue) -> bool {
        match (self, input) {
            (PredicateValue::Number(a), FieldValue::Number(b)) => a == b,
            (PredicateValue::Text(a), FieldValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for PredicateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateValue::Null => f.write_str("missing"),
            PredicateValue::Number(n) => write!(f, "{n}"),
            PredicateValue::Text(s) => f.write_str(s),
            PredicateValue::Set(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

// =============================================================================
// Predicate
// =============================================================================

/// A single field condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub operator: Operator,
    pub field: String,
    pub value: PredicateValue,
    /// Term counted in a text field; the value is then the count threshold.
    pub term: Option<String>,
    /// Also matches when the field is missing.
    pub missing: bool,
}

/// A node predicate: the always-true root sentinel or a field condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    True,
    Condition(Condition),
}

impl Predicate {
    /// Evaluate against a resolved input record.
    pub fn apply(&self, input: &InputRecord, fields: &FieldSet) -> bool {
        match self {
            Predicate::True => true,
            Predicate::Condition(condition) => condition.apply(input, fields),
        }
    }

    /// Field tested by this predicate, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Predicate::True => None,
            Predicate::Condition(c) => Some(&c.field),
        }
    }

    /// Human readable rendering. The root sentinel renders as `None`.
    pub fn rule(&self, fields: &FieldSet) -> Option<String> {
        match self {
            Predicate::True => None,
            Predicate::Condition(condition) => Some(condition.rule(fields)),
        }
    }
}

impl Condition {
    pub fn apply(&self, input: &InputRecord, fields: &FieldSet) -> bool {
        if self.operator == Operator::Ne && self.value.is_null() {
            return true;
        }
        let Some(value) = input.get(&self.field) else {
            return self.missing || (self.operator == Operator::Eq && self.value.is_null());
        };
        if self.value.is_null() {
            return false;
        }
        if self.operator == Operator::In {
            return match &self.value {
                PredicateValue::Set(members) => members.iter().any(|m| m.equals(value)),
                scalar => scalar.equals(value),
            };
        }
        if let Some(term) = &self.term {
            let count = match (value, fields.get(&self.field)) {
                (FieldValue::Text(text), Some(field)) => {
                    term_count(text, &field.forms_of(term), &field.term_analysis)
                }
                (FieldValue::Text(text), None) => {
                    term_count(text, &[term.as_str()], &TermAnalysis::default())
                }
                (FieldValue::Terms(terms), _) => terms.iter().filter(|t| *t == term).count(),
                (FieldValue::Number(_), _) => return false,
            };
            return match &self.value {
                PredicateValue::Number(threshold) => {
                    self.operator.compare(&(count as f64), threshold)
                }
                _ => false,
            };
        }
        match (value, &self.value) {
            (FieldValue::Number(a), PredicateValue::Number(b)) => self.operator.compare(a, b),
            (FieldValue::Text(a), PredicateValue::Text(b)) => {
                self.operator.compare(a.as_str(), b.as_str())
            }
            _ => false,
        }
    }

    /// Whether the term is compared as a whole string rather than a token.
    fn is_full_term(&self, field: Option<&Field>) -> bool {
        let (Some(term), Some(field)) = (&self.term, field) else {
            return false;
        };
        match field.term_analysis.token_mode {
            Some(TokenMode::FullTermsOnly) => true,
            Some(TokenMode::All) => FULL_TERM_PATTERN.is_match(term),
            _ => false,
        }
    }

    pub fn rule(&self, fields: &FieldSet) -> String {
        let name = fields.name_of(&self.field);
        let or_missing = if self.missing { " or missing" } else { "" };

        if let Some(term) = &self.term {
            let full_term = self.is_full_term(fields.get(&self.field));
            let count = match self.value {
                PredicateValue::Number(n) => n,
                _ => 0.0,
            };
            let negated = (self.operator == Operator::Lt && count <= 1.0)
                || (self.operator == Operator::Le && count == 0.0);
            let literal = match (negated, full_term) {
                (true, true) => "is not equal to",
                (true, false) => "does not contain",
                (false, true) => "is equal to",
                (false, false) => "contains",
            };
            let mut rule = format!("{name} {literal} {term}");
            if !negated && !full_term && !(self.operator == Operator::Gt && count == 0.0) {
                let times = if count == 1.0 { "time" } else { "times" };
                let suffix = match self.operator {
                    Operator::Le => Some(format!("no more than {count} {times}")),
                    Operator::Ge => Some(format!("{count} {times} at least")),
                    Operator::Gt => Some(format!("more than {count} {times}")),
                    Operator::Lt => Some(format!("less than {count} {times}")),
                    _ => None,
                };
                if let Some(suffix) = suffix {
                    rule.push(' ');
                    rule.push_str(&suffix);
                }
            }
            rule.push_str(or_missing);
            return rule;
        }

        if self.value.is_null() {
            let relation = if self.operator == Operator::Eq {
                "is missing"
            } else {
                "is not missing"
            };
            return format!("{name} {relation}{or_missing}");
        }
        format!("{name} {} {}{or_missing}", self.operator, self.value)
    }
}

// =============================================================================
// Predicate set
// =============================================================================

/// Conjunction of predicates guarding a tree node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicates(pub Vec<Predicate>);

impl Predicates {
    /// The root set, matching unconditionally.
    pub fn always() -> Self {
        Predicates(vec![Predicate::True])
    }

    /// Logical AND over the set. An empty set matches.
    #[inline]
    pub fn apply(&self, input: &InputRecord, fields: &FieldSet) -> bool {
        self.0.iter().all(|p| p.apply(input, fields))
    }

    /// Rules of the non-sentinel predicates joined with `" and "`.
    pub fn rule(&self, fields: &FieldSet) -> String {
        self.0
            .iter()
            .filter_map(|p| p.rule(fields))
            .collect::<Vec<_>>()
            .join(" and ")
    }

    /// First field tested by the set.
    pub fn field(&self) -> Option<&str> {
        self.0.iter().find_map(Predicate::field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.0.iter()
    }
}

impl From<Vec<Predicate>> for Predicates {
    fn from(predicates: Vec<Predicate>) -> Self {
        Predicates(predicates)
    }
}

// =============================================================================
// Term matching
// =============================================================================

/// A term that spans more than one token.
static FULL_TERM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.+\b.+$").expect("static pattern"));

/// Occurrences of a term (given with its synonym forms) in `text`.
pub fn term_count(text: &str, forms: &[&str], analysis: &TermAnalysis) -> usize {
    let case_sensitive = analysis.case_sensitive();
    let Some(first) = forms.first() else {
        return 0;
    };
    match analysis.token_mode.unwrap_or(TokenMode::TokensOnly) {
        TokenMode::FullTermsOnly => full_term_count(text, first, case_sensitive),
        TokenMode::All if forms.len() == 1 && FULL_TERM_PATTERN.is_match(first) => {
            full_term_count(text, first, case_sensitive)
        }
        _ => token_term_count(text, forms, case_sensitive),
    }
}

/// 1 when `text` equals the term, else 0.
pub fn full_term_count(text: &str, term: &str, case_sensitive: bool) -> usize {
    let equal = if case_sensitive {
        text == term
    } else {
        text.to_lowercase() == term.to_lowercase()
    };
    usize::from(equal)
}

/// Compiled token patterns, keyed by pattern source.
static TERM_PATTERNS: Lazy<RwLock<HashMap<String, Regex>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Word-boundary pattern matching any of `forms`, compiled once per source.
fn token_pattern(forms: &[&str], case_sensitive: bool) -> Result<Regex, regex::Error> {
    let alternatives = forms
        .iter()
        .map(|f| regex::escape(f))
        .collect::<Vec<_>>()
        .join("|");
    let flags = if case_sensitive { "" } else { "(?i)" };
    let source = format!(r"{flags}(?:\b|_)(?:{alternatives})(?:\b|_)");

    if let Some(re) = TERM_PATTERNS
        .read()
        .ok()
        .and_then(|cache| cache.get(&source).cloned())
    {
        return Ok(re);
    }
    let re = Regex::new(&source)?;
    if let Ok(mut cache) = TERM_PATTERNS.write() {
        cache.insert(source, re.clone());
    }
    Ok(re)
}

/// Word-boundary occurrences of any of the forms in `text`.
pub fn token_term_count(text: &str, forms: &[&str], case_sensitive: bool) -> usize {
    match token_pattern(forms, case_sensitive) {
        Ok(re) => re.find_iter(text).count(),
        Err(err) => {
            tracing::warn!(%err, "cannot build term pattern");
            0
        }
    }
}
