//! Multivariate linear model fitting via OLS.
//!
//! All shape variables share one design matrix, so a single thin QR
//! decomposition of the design serves every column of the response.

use crate::data::DesignMatrix;
use crate::error::{AllometryError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Relative tolerance on |R_jj| below which a design column is treated as
/// linearly dependent on earlier columns.
const RANK_TOLERANCE: f64 = 1e-7;

/// Orthogonal projector onto the column space of a design matrix.
///
/// Holds the thin Q factor of the design's QR decomposition; fitted values
/// are `Q Q' Y`.
#[derive(Debug, Clone)]
pub struct Projector {
    q: DMatrix<f64>,
    r: DMatrix<f64>,
}

impl Projector {
    /// Build the projector for a design matrix.
    ///
    /// Fails with `RankDeficientDesign` when the columns are linearly
    /// dependent.
    pub fn new(x: &DMatrix<f64>) -> Result<Self> {
        let (n, p) = x.shape();
        if p == 0 {
            return Ok(Self {
                q: DMatrix::zeros(n, 0),
                r: DMatrix::zeros(0, 0),
            });
        }
        if n < p {
            return Err(AllometryError::RankDeficientDesign {
                rank: n,
                columns: p,
            });
        }

        let qr = x.clone().qr();
        let r = qr.r();
        let max_diag = (0..p).map(|j| r[(j, j)].abs()).fold(0.0, f64::max);
        let rank = (0..p)
            .filter(|&j| r[(j, j)].abs() > RANK_TOLERANCE * max_diag.max(f64::MIN_POSITIVE))
            .count();
        if rank < p {
            return Err(AllometryError::RankDeficientDesign { rank, columns: p });
        }

        Ok(Self { q: qr.q(), r })
    }

    /// Rank of the design (its column count, once validated).
    pub fn rank(&self) -> usize {
        self.q.ncols()
    }

    /// Fitted values `Q Q' Y`.
    pub fn fitted(&self, y: &DMatrix<f64>) -> DMatrix<f64> {
        if self.q.ncols() == 0 {
            return DMatrix::zeros(y.nrows(), y.ncols());
        }
        &self.q * (self.q.transpose() * y)
    }

    /// Residuals `Y - Q Q' Y`.
    pub fn residuals(&self, y: &DMatrix<f64>) -> DMatrix<f64> {
        y - self.fitted(y)
    }

    /// Residual sum of squares (trace of E'E).
    pub fn rss(&self, y: &DMatrix<f64>) -> f64 {
        self.residuals(y).norm_squared()
    }

    /// Coefficients solving `R B = Q' Y`.
    pub fn coefficients(&self, y: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if self.q.ncols() == 0 {
            return Ok(DMatrix::zeros(0, y.ncols()));
        }
        let qty = self.q.transpose() * y;
        self.r.solve_upper_triangular(&qty).ok_or_else(|| {
            AllometryError::RankDeficientDesign {
                rank: 0,
                columns: self.r.ncols(),
            }
        })
    }
}

/// Sum-of-squares decomposition used to test model terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SsType {
    /// Sequential (type I): each term after the terms before it.
    #[default]
    Sequential,
    /// Partial (type II): each term after all terms that do not contain it.
    TypeII,
    /// Partial (type III): each term after all other terms.
    TypeIII,
}

impl SsType {
    /// Short label ("I", "II", "III").
    pub fn label(&self) -> &'static str {
        match self {
            SsType::Sequential => "I",
            SsType::TypeII => "II",
            SsType::TypeIII => "III",
        }
    }
}

/// A fitted multivariate linear model.
#[derive(Debug, Clone)]
pub struct LmFit {
    /// Coefficients (coefficients × variables).
    pub coefficients: DMatrix<f64>,
    /// Fitted values (specimens × variables).
    pub fitted: DMatrix<f64>,
    /// Residuals (specimens × variables).
    pub residuals: DMatrix<f64>,
    /// Coefficient names from the design matrix.
    pub coefficient_names: Vec<String>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Residual degrees of freedom.
    pub df_residual: usize,
}

impl LmFit {
    /// Number of specimens.
    pub fn n_specimens(&self) -> usize {
        self.fitted.nrows()
    }

    /// Number of coefficients (including intercept if present).
    pub fn n_coefficients(&self) -> usize {
        self.coefficient_names.len()
    }
}

/// Fit a multivariate linear model of `y` on a design matrix.
///
/// # Arguments
/// * `design` - Design matrix built from a model specification
/// * `y` - Response (specimens × shape variables)
pub fn model_lm(design: &DesignMatrix, y: &DMatrix<f64>) -> Result<LmFit> {
    design.check_rows(y.nrows())?;

    let n_specimens = y.nrows();
    let n_coef = design.n_coefficients();
    let df_residual = n_specimens.saturating_sub(n_coef);
    if df_residual == 0 {
        return Err(AllometryError::InvalidModel(format!(
            "Model is saturated ({} specimens, {} coefficients)",
            n_specimens, n_coef
        )));
    }

    let projector = Projector::new(design.matrix())?;
    let coefficients = projector.coefficients(y)?;
    let fitted = projector.fitted(y);
    let residuals = y - &fitted;
    let rss = residuals.norm_squared();

    Ok(LmFit {
        coefficients,
        fitted,
        residuals,
        coefficient_names: design.coefficient_names().to_vec(),
        rss,
        df_residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Covariates, ModelSpec, Term};
    use approx::assert_relative_eq;

    fn covariates() -> Covariates {
        Covariates::new(6)
            .with_continuous("cs", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap()
            .with_categorical("group", ["a", "b", "a", "b", "a", "b"])
            .unwrap()
    }

    fn response() -> DMatrix<f64> {
        // y1 = 1 + 2 cs exactly; y2 = group offset plus noise-free slope
        DMatrix::from_fn(6, 2, |i, j| {
            let cs = (i + 1) as f64;
            if j == 0 {
                1.0 + 2.0 * cs
            } else {
                0.5 * cs + if i % 2 == 1 { 3.0 } else { 0.0 }
            }
        })
    }

    #[test]
    fn test_exact_fit_coefficients() {
        let spec = ModelSpec::new(vec![
            Term::Covariate("cs".to_string()),
            Term::Factor("group".to_string()),
        ]);
        let design = DesignMatrix::from_spec(&covariates(), &spec).unwrap();
        let fit = model_lm(&design, &response()).unwrap();

        assert_eq!(fit.coefficient_names, vec!["(Intercept)", "cs", "groupb"]);
        assert_relative_eq!(fit.coefficients[(0, 0)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients[(1, 0)], 2.0, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients[(1, 1)], 0.5, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients[(2, 1)], 3.0, epsilon = 1e-10);
        assert!(fit.rss < 1e-18);
        assert_eq!(fit.df_residual, 3);
    }

    #[test]
    fn test_fitted_plus_residuals() {
        let design = DesignMatrix::from_spec(
            &covariates(),
            &ModelSpec::new(vec![Term::Factor("group".to_string())]),
        )
        .unwrap();
        let y = response();
        let fit = model_lm(&design, &y).unwrap();
        assert_relative_eq!(&fit.fitted + &fit.residuals, y, epsilon = 1e-12);
        // residuals orthogonal to the design
        let cross = design.matrix().transpose() * &fit.residuals;
        assert!(cross.amax() < 1e-10);
    }

    #[test]
    fn test_rank_deficient_design() {
        let cov = covariates()
            .with_continuous("cs2", vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0])
            .unwrap();
        let spec = ModelSpec::new(vec![
            Term::Covariate("cs".to_string()),
            Term::Covariate("cs2".to_string()),
        ]);
        let design = DesignMatrix::from_spec(&cov, &spec).unwrap();
        let result = model_lm(&design, &response());
        assert!(matches!(
            result,
            Err(AllometryError::RankDeficientDesign { rank: 2, columns: 3 })
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let design = DesignMatrix::from_spec(&covariates(), &ModelSpec::intercept_only()).unwrap();
        let y = DMatrix::zeros(4, 2);
        assert!(matches!(
            model_lm(&design, &y),
            Err(AllometryError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_projector() {
        let projector = Projector::new(&DMatrix::zeros(3, 0)).unwrap();
        let y = DMatrix::from_element(3, 2, 1.5);
        assert_eq!(projector.rank(), 0);
        assert_eq!(projector.rss(&y), y.norm_squared());
    }
}
