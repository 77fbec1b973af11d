//! Procrustes ANOVA for Shape Allometry
//!
//! This library regresses multivariate shape on size with permutation
//! tests, decides between pooled and group-specific allometric slopes, and
//! derives the low-dimensional scores used to plot allometric trends.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Shape data, covariates, model specifications, design matrices
//! - **model**: Multivariate linear fits and sum-of-squares contrasts
//! - **test**: Permutation tests (RRPP and raw) and the homogeneity-of-slopes test
//! - **allometry**: The analysis orchestrator and plotting projections
//! - **report**: Text and JSON rendering of results
//!
//! # Example
//!
//! ```
//! use procd_allometry::prelude::*;
//! use nalgebra::DMatrix;
//!
//! // shape drifts with log size, plus a small specimen-specific wobble
//! let slopes = [0.08, -0.05, 0.03, -0.06];
//! let y = DMatrix::from_fn(20, 4, |i, j| {
//!     slopes[j] * (1.0 + i as f64).ln() + 0.01 * ((i * 7 + j * 3) as f64).sin()
//! });
//! let shape = ShapeData::from_matrix(y).unwrap();
//! let covariates = Covariates::new(20)
//!     .with_continuous("cs", (1..=20).map(|i| i as f64).collect())
//!     .unwrap();
//!
//! let result = AllometryAnalysis::new("~ cs")
//!     .config(AnalysisConfig {
//!         iterations: 99,
//!         seed: Seed::Fixed(1),
//!         ..Default::default()
//!     })
//!     .run(&shape, &covariates)
//!     .unwrap();
//!
//! println!("{}", TextReport::default().render(&result).unwrap());
//! ```

pub mod allometry;
pub mod data;
pub mod error;
pub mod model;
pub mod report;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::allometry::{
        principal_components, project, AllometryAnalysis, AllometryProjection, AllometryResult,
        AnalysisConfig, PrincipalComponents,
    };
    pub use crate::data::{
        AnovaRow, AnovaTable, Column, Covariates, DesignMatrix, Formula, FormulaTerm, ModelSpec,
        Shape, ShapeData, Term, VariableType,
    };
    pub use crate::error::{AllometryError, Result};
    pub use crate::model::{model_lm, term_contrasts, LmFit, Projector, SsType, TermContrast};
    pub use crate::report::{JsonReport, Render, TextReport};
    pub use crate::test::{
        anova_permutation, test_nested, test_slopes, EffectType, HosRow, HosTable,
        NestedTestResult, PermutationConfig, PermutationResult, ProcAnova, Seed, SlopeDecision,
        SlopeTest,
    };
}
