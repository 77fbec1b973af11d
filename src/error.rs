//! Error types for the procd-allometry library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum AllometryError {
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid iteration count {0}: must be non-negative")]
    InvalidIterationCount(i64),

    #[error("Grouping variable '{0}' is not a factor")]
    NonFactorGrouping(String),

    #[error("Size must resolve to a single numeric covariate: {0}")]
    SingleCovariateRequired(String),

    #[error("Size values must be positive (specimen {index} has {value})")]
    NonPositiveSize { index: usize, value: f64 },

    #[error("Degenerate allometric direction: {0}")]
    DegenerateAllometricDirection(String),

    #[error("Design matrix is rank deficient ({rank} of {columns} columns estimable)")]
    RankDeficientDesign { rank: usize, columns: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Missing column '{0}' in covariates")]
    MissingColumn(String),

    #[error("Formula parse error: {0}")]
    FormulaParse(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, AllometryError>;
