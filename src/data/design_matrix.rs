//! Design matrix construction from covariates and a model specification.

use crate::data::{Column, Covariates, ModelSpec, Term};
use crate::error::{AllometryError, Result};
use nalgebra::DMatrix;
use std::collections::HashMap;
use std::ops::Range;

/// A design matrix for linear modeling.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    /// The design matrix (specimens × coefficients).
    matrix: DMatrix<f64>,
    /// Names of the coefficients (columns).
    coefficient_names: Vec<String>,
    /// Column range spanned by each term, in model order.
    term_columns: Vec<(Term, Range<usize>)>,
    /// Reference levels for categorical variables.
    reference_levels: HashMap<String, String>,
}

impl DesignMatrix {
    /// Build a design matrix from covariates and a model specification.
    ///
    /// Categorical variables use treatment coding with the alphabetically
    /// first level as reference (all levels are kept for a factor main
    /// effect in a model without intercept).
    pub fn from_spec(covariates: &Covariates, spec: &ModelSpec) -> Result<Self> {
        let n_specimens = covariates.n_specimens();

        let mut reference_levels = HashMap::new();
        for term in &spec.terms {
            for var in term.variables() {
                if let Column::Categorical(_) = covariates.column(var)? {
                    let levels = covariates.levels(var)?;
                    if let Some(first) = levels.first() {
                        reference_levels.insert(var.to_string(), first.clone());
                    }
                }
            }
        }

        let mut coefficient_names = Vec::new();
        let mut columns: Vec<Vec<f64>> = Vec::new();
        let mut term_columns = Vec::with_capacity(spec.terms.len());

        if spec.intercept {
            coefficient_names.push("(Intercept)".to_string());
            columns.push(vec![1.0; n_specimens]);
        }

        for term in &spec.terms {
            let start = columns.len();
            let built = match term {
                Term::Covariate(name) => {
                    vec![(name.clone(), covariates.continuous(name)?.to_vec())]
                }
                Term::Factor(name) => {
                    Self::variable_columns(covariates, name, &reference_levels, spec.intercept)?
                }
                Term::Interaction(a, b) => {
                    let cols_a = Self::variable_columns(covariates, a, &reference_levels, true)?;
                    let cols_b = Self::variable_columns(covariates, b, &reference_levels, true)?;
                    let mut cols = Vec::with_capacity(cols_a.len() * cols_b.len());
                    for (name_a, col_a) in &cols_a {
                        for (name_b, col_b) in &cols_b {
                            let col = col_a.iter().zip(col_b).map(|(x, y)| x * y).collect();
                            cols.push((format!("{}:{}", name_a, name_b), col));
                        }
                    }
                    cols
                }
            };
            for (name, col) in built {
                coefficient_names.push(name);
                columns.push(col);
            }
            term_columns.push((term.clone(), start..columns.len()));
        }

        let matrix = DMatrix::from_fn(n_specimens, columns.len(), |i, j| columns[j][i]);

        Ok(Self {
            matrix,
            coefficient_names,
            term_columns,
            reference_levels,
        })
    }

    /// Columns contributed by a single variable.
    fn variable_columns(
        covariates: &Covariates,
        name: &str,
        reference_levels: &HashMap<String, String>,
        drop_reference: bool,
    ) -> Result<Vec<(String, Vec<f64>)>> {
        match covariates.column(name)? {
            Column::Continuous(values) => Ok(vec![(name.to_string(), values.clone())]),
            Column::Categorical(labels) => {
                let reference = reference_levels.get(name);
                Ok(covariates
                    .levels(name)?
                    .into_iter()
                    .filter(|level| !(drop_reference && Some(level) == reference))
                    .map(|level| {
                        let col = labels
                            .iter()
                            .map(|l| if *l == level { 1.0 } else { 0.0 })
                            .collect();
                        (format!("{}{}", name, level), col)
                    })
                    .collect())
            }
        }
    }

    /// Get the design matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Get coefficient names.
    pub fn coefficient_names(&self) -> &[String] {
        &self.coefficient_names
    }

    /// Number of specimens (rows).
    pub fn n_specimens(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of coefficients (columns).
    pub fn n_coefficients(&self) -> usize {
        self.matrix.ncols()
    }

    /// Column range of a term.
    pub fn term_range(&self, term: &Term) -> Option<Range<usize>> {
        self.term_columns
            .iter()
            .find(|(t, _)| t == term)
            .map(|(_, r)| r.clone())
    }

    /// Get the reference level for a categorical variable.
    pub fn reference_level(&self, variable: &str) -> Option<&str> {
        self.reference_levels.get(variable).map(|s| s.as_str())
    }

    /// Check if the matrix has an intercept.
    pub fn has_intercept(&self) -> bool {
        self.coefficient_names.first().map(String::as_str) == Some("(Intercept)")
    }

    /// Validate that the design has `expected` rows.
    pub fn check_rows(&self, expected: usize) -> Result<()> {
        if self.n_specimens() != expected {
            return Err(AllometryError::DimensionMismatch {
                expected,
                actual: self.n_specimens(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covariates() -> Covariates {
        Covariates::new(4)
            .with_continuous("cs", vec![25.0, 30.0, 35.0, 28.0])
            .unwrap()
            .with_categorical("group", ["control", "treatment", "control", "treatment"])
            .unwrap()
    }

    fn cs() -> Term {
        Term::Covariate("cs".to_string())
    }

    fn group() -> Term {
        Term::Factor("group".to_string())
    }

    #[test]
    fn test_intercept_only() {
        let dm = DesignMatrix::from_spec(&covariates(), &ModelSpec::intercept_only()).unwrap();
        assert_eq!(dm.n_specimens(), 4);
        assert_eq!(dm.coefficient_names(), &["(Intercept)"]);
        assert!(dm.matrix().iter().all(|&v| v == 1.0));
        assert!(dm.has_intercept());
    }

    #[test]
    fn test_continuous_covariate() {
        let dm = DesignMatrix::from_spec(&covariates(), &ModelSpec::new(vec![cs()])).unwrap();
        assert_eq!(dm.coefficient_names(), &["(Intercept)", "cs"]);
        let col: Vec<f64> = dm.matrix().column(1).iter().copied().collect();
        assert_eq!(col, vec![25.0, 30.0, 35.0, 28.0]);
        assert_eq!(dm.term_range(&cs()), Some(1..2));
    }

    #[test]
    fn test_factor_dummy_coding() {
        let dm = DesignMatrix::from_spec(&covariates(), &ModelSpec::new(vec![group()])).unwrap();
        assert_eq!(dm.coefficient_names(), &["(Intercept)", "grouptreatment"]);
        assert_eq!(dm.reference_level("group"), Some("control"));
        let col: Vec<f64> = dm.matrix().column(1).iter().copied().collect();
        assert_eq!(col, vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_no_intercept_keeps_all_levels() {
        let spec = ModelSpec {
            intercept: false,
            terms: vec![group()],
        };
        let dm = DesignMatrix::from_spec(&covariates(), &spec).unwrap();
        assert!(!dm.has_intercept());
        assert_eq!(dm.coefficient_names(), &["groupcontrol", "grouptreatment"]);
    }

    #[test]
    fn test_interaction_columns() {
        let spec = ModelSpec::new(vec![
            cs(),
            group(),
            Term::Interaction("cs".to_string(), "group".to_string()),
        ]);
        let dm = DesignMatrix::from_spec(&covariates(), &spec).unwrap();
        assert_eq!(
            dm.coefficient_names(),
            &["(Intercept)", "cs", "grouptreatment", "cs:grouptreatment"]
        );
        let col: Vec<f64> = dm.matrix().column(3).iter().copied().collect();
        assert_eq!(col, vec![0.0, 30.0, 0.0, 28.0]);
        assert_eq!(
            dm.term_range(&Term::Interaction("cs".to_string(), "group".to_string())),
            Some(3..4)
        );
    }

    #[test]
    fn test_covariate_must_be_continuous() {
        let spec = ModelSpec::new(vec![Term::Covariate("group".to_string())]);
        assert!(DesignMatrix::from_spec(&covariates(), &spec).is_err());
    }
}
