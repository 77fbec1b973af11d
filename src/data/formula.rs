//! Formula parsing and explicit model specifications.
//!
//! A [`Formula`] is the parsed, untyped right-hand side of an R-style model
//! formula. A [`ModelSpec`] is the typed term list a design matrix is built
//! from; term nesting between models is plain set containment.

use crate::error::{AllometryError, Result};
use serde::{Deserialize, Serialize};

/// A parsed formula term, before variable types are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormulaTerm {
    /// Main effect of a variable.
    Main(String),
    /// Interaction between two variables.
    Interaction(String, String),
}

/// A parsed formula.
///
/// Supports:
/// - `~ cs` - intercept + cs
/// - `~ sex + pop` - intercept + sex + pop
/// - `~ cs * sex` - intercept + cs + sex + cs:sex
/// - `~ 0 + sex` - no intercept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    /// Whether to include an intercept.
    pub intercept: bool,
    /// Terms in the formula (excluding intercept).
    pub terms: Vec<FormulaTerm>,
}

impl Formula {
    /// Parse a formula string.
    ///
    /// # Examples
    /// ```
    /// use procd_allometry::data::Formula;
    /// let f = Formula::parse("~ cs * sex").unwrap();
    /// assert!(f.intercept);
    /// assert_eq!(f.terms.len(), 3);
    /// ```
    pub fn parse(formula: &str) -> Result<Self> {
        let formula = formula.trim();
        let rhs = formula
            .strip_prefix('~')
            .ok_or_else(|| AllometryError::FormulaParse("Formula must start with '~'".to_string()))?
            .trim();
        if rhs.is_empty() {
            return Err(AllometryError::FormulaParse(
                "Formula right-hand side is empty".to_string(),
            ));
        }

        let mut intercept = true;
        let mut terms = Vec::new();

        for part in rhs.split('+').map(str::trim) {
            match part {
                "" => {
                    return Err(AllometryError::FormulaParse(format!(
                        "Empty term in '{}'",
                        formula
                    )))
                }
                "1" => {}
                "0" | "-1" => intercept = false,
                _ if part.contains('*') => {
                    let (a, b) = split_pair(part, '*')?;
                    push_unique(&mut terms, FormulaTerm::Main(a.clone()));
                    push_unique(&mut terms, FormulaTerm::Main(b.clone()));
                    push_unique(&mut terms, FormulaTerm::Interaction(a, b));
                }
                _ if part.contains(':') => {
                    let (a, b) = split_pair(part, ':')?;
                    push_unique(&mut terms, FormulaTerm::Interaction(a, b));
                }
                _ => push_unique(&mut terms, FormulaTerm::Main(part.to_string())),
            }
        }

        if terms.is_empty() && !intercept {
            return Err(AllometryError::FormulaParse(
                "Formula must have at least one term".to_string(),
            ));
        }

        Ok(Self { intercept, terms })
    }

    /// All variable names used in the formula, in first-use order.
    pub fn variables(&self) -> Vec<&str> {
        let mut vars: Vec<&str> = Vec::new();
        for term in &self.terms {
            let names: Vec<&str> = match term {
                FormulaTerm::Main(v) => vec![v.as_str()],
                FormulaTerm::Interaction(a, b) => vec![a.as_str(), b.as_str()],
            };
            for name in names {
                if !vars.contains(&name) {
                    vars.push(name);
                }
            }
        }
        vars
    }
}

fn push_unique(terms: &mut Vec<FormulaTerm>, term: FormulaTerm) {
    if !terms.contains(&term) {
        terms.push(term);
    }
}

fn split_pair(term: &str, sep: char) -> Result<(String, String)> {
    let parts: Vec<&str> = term.split(sep).map(str::trim).collect();
    match parts.as_slice() {
        [a, b] if !a.is_empty() && !b.is_empty() => Ok((a.to_string(), b.to_string())),
        _ => Err(AllometryError::FormulaParse(format!(
            "Invalid interaction term: {}",
            term
        ))),
    }
}

/// A typed model term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// A continuous covariate (one design column).
    Covariate(String),
    /// A categorical factor (one dummy column per non-reference level).
    Factor(String),
    /// Interaction of two variables.
    Interaction(String, String),
}

impl Term {
    /// Variable names involved in this term.
    pub fn variables(&self) -> Vec<&str> {
        match self {
            Term::Covariate(v) | Term::Factor(v) => vec![v.as_str()],
            Term::Interaction(a, b) => vec![a.as_str(), b.as_str()],
        }
    }

    /// Check whether the term involves a variable.
    pub fn involves(&self, name: &str) -> bool {
        self.variables().contains(&name)
    }

    /// Check whether this term is a higher-order relative of `other`,
    /// i.e. its variables strictly contain `other`'s.
    pub fn contains_term(&self, other: &Term) -> bool {
        let mine = self.variables();
        let theirs = other.variables();
        mine.len() > theirs.len() && theirs.iter().all(|v| mine.contains(v))
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Covariate(v) | Term::Factor(v) => write!(f, "{}", v),
            Term::Interaction(a, b) => write!(f, "{}:{}", a, b),
        }
    }
}

/// An explicit model specification: optional intercept plus ordered terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Whether the model has an intercept.
    pub intercept: bool,
    /// Ordered terms (excluding intercept).
    pub terms: Vec<Term>,
}

impl ModelSpec {
    /// An intercept-plus-terms model.
    pub fn new(terms: Vec<Term>) -> Self {
        Self {
            intercept: true,
            terms,
        }
    }

    /// The intercept-only model.
    pub fn intercept_only() -> Self {
        Self::new(Vec::new())
    }

    /// Append a term if absent.
    pub fn with_term(mut self, term: Term) -> Self {
        if !self.terms.contains(&term) {
            self.terms.push(term);
        }
        self
    }

    /// Check if the model includes a term.
    pub fn contains(&self, term: &Term) -> bool {
        self.terms.contains(term)
    }

    /// The model with the given term removed.
    pub fn without(&self, term: &Term) -> Self {
        Self {
            intercept: self.intercept,
            terms: self.terms.iter().filter(|t| *t != term).cloned().collect(),
        }
    }

    /// The model made of the first `k` terms.
    pub fn prefix(&self, k: usize) -> Self {
        Self {
            intercept: self.intercept,
            terms: self.terms[..k.min(self.terms.len())].to_vec(),
        }
    }

    /// The model keeping only terms that do not involve `variable`.
    pub fn without_variable(&self, variable: &str) -> Self {
        Self {
            intercept: self.intercept,
            terms: self
                .terms
                .iter()
                .filter(|t| !t.involves(variable))
                .cloned()
                .collect(),
        }
    }

    /// Check whether this model is strictly nested in `full`.
    pub fn is_nested_in(&self, full: &ModelSpec) -> bool {
        let intercept_ok = !self.intercept || full.intercept;
        let terms_ok = self.terms.iter().all(|t| full.terms.contains(t));
        let strictly_smaller = full.terms.len() > self.terms.len()
            || (full.intercept && !self.intercept);
        intercept_ok && terms_ok && strictly_smaller
    }

    /// Terms in `full` that this model lacks.
    pub fn difference<'a>(&self, full: &'a ModelSpec) -> Vec<&'a Term> {
        full.terms.iter().filter(|t| !self.terms.contains(t)).collect()
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "~ ")?;
        if self.terms.is_empty() {
            return write!(f, "{}", if self.intercept { "1" } else { "0" });
        }
        if !self.intercept {
            write!(f, "0 + ")?;
        }
        let term_strs: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", term_strs.join(" + "))
    }
}
