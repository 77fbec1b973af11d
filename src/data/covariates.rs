//! Per-specimen covariates (size proxies and grouping factors).

use crate::error::{AllometryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A covariate column, in specimen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    /// Categorical column with string levels.
    Categorical(Vec<String>),
    /// Continuous numeric column.
    Continuous(Vec<f64>),
}

impl Column {
    /// Number of specimens in the column.
    pub fn len(&self) -> usize {
        match self {
            Column::Categorical(v) => v.len(),
            Column::Continuous(v) => v.len(),
        }
    }

    /// Check if the column is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type of the column.
    pub fn variable_type(&self) -> VariableType {
        match self {
            Column::Categorical(_) => VariableType::Categorical,
            Column::Continuous(_) => VariableType::Continuous,
        }
    }
}

/// Type of a covariate column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
}

/// Named covariate columns sharing one specimen order.
///
/// Row order must match the rows of the shape data the covariates are
/// analysed against.
#[derive(Debug, Clone, Default)]
pub struct Covariates {
    n_specimens: usize,
    column_names: Vec<String>,
    columns: HashMap<String, Column>,
}

impl Covariates {
    /// Create an empty covariate table for `n_specimens` specimens.
    pub fn new(n_specimens: usize) -> Self {
        Self {
            n_specimens,
            column_names: Vec::new(),
            columns: HashMap::new(),
        }
    }

    /// Add (or replace) a continuous column.
    pub fn with_continuous(self, name: &str, values: Vec<f64>) -> Result<Self> {
        self.with_column(name, Column::Continuous(values))
    }

    /// Add (or replace) a categorical column.
    pub fn with_categorical<S: Into<String>>(
        self,
        name: &str,
        values: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        self.with_column(name, Column::Categorical(values))
    }

    /// Add (or replace) a column.
    pub fn with_column(mut self, name: &str, column: Column) -> Result<Self> {
        if column.len() != self.n_specimens {
            return Err(AllometryError::DimensionMismatch {
                expected: self.n_specimens,
                actual: column.len(),
            });
        }
        if !self.columns.contains_key(name) {
            self.column_names.push(name.to_string());
        }
        self.columns.insert(name.to_string(), column);
        Ok(self)
    }

    /// Number of specimens.
    pub fn n_specimens(&self) -> usize {
        self.n_specimens
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Check if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Type of a column, if present.
    pub fn column_type(&self, name: &str) -> Option<VariableType> {
        self.columns.get(name).map(Column::variable_type)
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| AllometryError::MissingColumn(name.to_string()))
    }

    /// Get a continuous column's values.
    pub fn continuous(&self, name: &str) -> Result<&[f64]> {
        match self.column(name)? {
            Column::Continuous(v) => Ok(v),
            Column::Categorical(_) => Err(AllometryError::SingleCovariateRequired(format!(
                "'{}' is categorical",
                name
            ))),
        }
    }

    /// Get a categorical column's labels.
    pub fn categorical(&self, name: &str) -> Result<&[String]> {
        match self.column(name)? {
            Column::Categorical(v) => Ok(v),
            Column::Continuous(_) => Err(AllometryError::NonFactorGrouping(name.to_string())),
        }
    }

    /// Sorted unique levels of a categorical column.
    pub fn levels(&self, name: &str) -> Result<Vec<String>> {
        let labels = self.categorical(name)?;
        let levels: BTreeSet<&String> = labels.iter().collect();
        Ok(levels.into_iter().cloned().collect())
    }

    /// Combine several categorical columns into one composite factor.
    ///
    /// Each specimen's label is its per-column labels joined with `"."`.
    /// A single name returns that column's labels unchanged.
    pub fn composite_factor(&self, names: &[&str]) -> Result<Vec<String>> {
        if names.is_empty() {
            return Err(AllometryError::InvalidParameter(
                "At least one grouping column is required".to_string(),
            ));
        }
        let columns: Vec<&[String]> = names
            .iter()
            .map(|name| self.categorical(name))
            .collect::<Result<_>>()?;

        Ok((0..self.n_specimens)
            .map(|i| {
                columns
                    .iter()
                    .map(|c| c[i].as_str())
                    .collect::<Vec<_>>()
                    .join(".")
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Covariates {
        Covariates::new(4)
            .with_continuous("cs", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap()
            .with_categorical("sex", ["M", "F", "M", "F"])
            .unwrap()
            .with_categorical("pop", ["a", "a", "b", "b"])
            .unwrap()
    }

    #[test]
    fn test_column_types() {
        let cov = sample();
        assert_eq!(cov.column_type("cs"), Some(VariableType::Continuous));
        assert_eq!(cov.column_type("sex"), Some(VariableType::Categorical));
        assert_eq!(cov.column_type("nope"), None);
        assert_eq!(cov.column_names(), &["cs", "sex", "pop"]);
    }

    #[test]
    fn test_levels_sorted() {
        let cov = sample();
        assert_eq!(cov.levels("sex").unwrap(), vec!["F", "M"]);
    }

    #[test]
    fn test_length_mismatch() {
        let result = Covariates::new(3).with_continuous("cs", vec![1.0, 2.0]);
        assert!(matches!(
            result,
            Err(AllometryError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_composite_factor() {
        let cov = sample();
        let combined = cov.composite_factor(&["sex", "pop"]).unwrap();
        assert_eq!(combined, vec!["M.a", "F.a", "M.b", "F.b"]);
    }

    #[test]
    fn test_composite_factor_rejects_continuous() {
        let cov = sample();
        let result = cov.composite_factor(&["sex", "cs"]);
        assert!(matches!(result, Err(AllometryError::NonFactorGrouping(ref c)) if c == "cs"));
    }
}
