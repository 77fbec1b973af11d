//! Term-wise model contrasts for sum-of-squares decompositions.
//!
//! Each tested term is evaluated as the difference between a reduced and a
//! full model; which models are paired depends on the [`SsType`].

use crate::data::{Covariates, DesignMatrix, ModelSpec, Term};
use crate::error::Result;
use crate::model::lm::{Projector, SsType};
use nalgebra::DMatrix;

/// Reduced/full model pair isolating one term.
#[derive(Debug, Clone, PartialEq)]
pub struct TermContrast {
    /// The tested term.
    pub term: Term,
    /// Model without the term.
    pub reduced: ModelSpec,
    /// Model with the term.
    pub full: ModelSpec,
}

/// Build the reduced/full model pair for every term of `spec`.
pub fn term_contrasts(spec: &ModelSpec, ss_type: SsType) -> Vec<TermContrast> {
    spec.terms
        .iter()
        .enumerate()
        .map(|(i, term)| {
            let (reduced, full) = match ss_type {
                SsType::Sequential => (spec.prefix(i), spec.prefix(i + 1)),
                SsType::TypeII => {
                    let reduced = ModelSpec {
                        intercept: spec.intercept,
                        terms: spec
                            .terms
                            .iter()
                            .filter(|t| *t != term && !t.contains_term(term))
                            .cloned()
                            .collect(),
                    };
                    let full = reduced.clone().with_term(term.clone());
                    (reduced, full)
                }
                SsType::TypeIII => (spec.without(term), spec.clone()),
            };
            TermContrast {
                term: term.clone(),
                reduced,
                full,
            }
        })
        .collect()
}

/// Projectors for a reduced/full model pair.
#[derive(Debug, Clone)]
pub struct ContrastFit {
    /// Projector of the reduced model.
    pub reduced: Projector,
    /// Projector of the full model.
    pub full: Projector,
    /// Degrees of freedom of the contrast (rank difference).
    pub df: usize,
}

impl ContrastFit {
    /// Build projectors for `reduced` and `full` over the given covariates.
    pub fn new(covariates: &Covariates, reduced: &ModelSpec, full: &ModelSpec) -> Result<Self> {
        let reduced = Projector::new(DesignMatrix::from_spec(covariates, reduced)?.matrix())?;
        let full = Projector::new(DesignMatrix::from_spec(covariates, full)?.matrix())?;
        let df = full.rank().saturating_sub(reduced.rank());
        Ok(Self { reduced, full, df })
    }

    /// Sum of squares explained by the full model beyond the reduced one.
    pub fn ss(&self, y: &DMatrix<f64>) -> f64 {
        (self.full.fitted(y) - self.reduced.fitted(y)).norm_squared()
    }
}
