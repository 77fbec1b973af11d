//! The record produced by an allometry analysis.

use crate::data::{AnovaTable, ModelSpec, Shape};
use crate::error::{AllometryError, Result};
use crate::test::{HosTable, PermutationResult, SlopeDecision};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Complete output of [`AllometryAnalysis::run`](super::AllometryAnalysis::run).
///
/// A plain record: renderers and plotting code read its fields directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllometryResult {
    /// Homogeneity-of-slopes table, present when groups were given.
    pub hos_test: Option<HosTable>,
    /// Permutation ANOVA of the final model.
    pub aov_table: AnovaTable,
    /// The accepted model.
    pub formula: ModelSpec,
    /// Number of permutations (iterations + 1).
    pub permutations: usize,
    /// Permutation distributions, one per term of the final model.
    pub permutation: Vec<PermutationResult>,
    /// Common allometric component scores.
    pub cac: DVector<f64>,
    /// Unit allometric direction.
    pub cac_direction: DVector<f64>,
    /// Residual shape component scores.
    pub rsc: DMatrix<f64>,
    /// Loadings of the residual shape components.
    pub rsc_rotation: DMatrix<f64>,
    /// Regression scores.
    pub reg_proj: DVector<f64>,
    /// Predicted-line scores.
    pub pred_val: DVector<f64>,
    /// Fitted values of the final model.
    pub fitted: DMatrix<f64>,
    /// Mean shape.
    pub ahat: Shape,
    /// Fitted shape at the smallest specimen.
    pub ahat_at_min: Shape,
    /// Fitted shape at the largest specimen.
    pub ahat_at_max: Shape,
    /// Size per specimen, as modelled.
    pub size: Vec<f64>,
    /// Group label per specimen.
    pub groups: Option<Vec<String>>,
    /// Landmark dimensions (p, k) for configuration input.
    pub landmark_dims: Option<(usize, usize)>,
    /// Whether size was log-transformed.
    pub log_size: bool,
}

impl AllometryResult {
    /// The slope decision, when a homogeneity-of-slopes test was run.
    pub fn decision(&self) -> Option<SlopeDecision> {
        self.hos_test.as_ref().map(|t| t.decision)
    }

    /// Permutation distributions of a term, looked up by label.
    pub fn term_permutation(&self, label: &str) -> Option<&PermutationResult> {
        self.permutation.iter().find(|p| p.term == label)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(AllometryError::from)
    }

    /// Load from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(AllometryError::from)
    }
}
