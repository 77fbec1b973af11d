//! Allometry analysis: validation, slope decision, ANOVA and projections.
//!
//! # Flow
//!
//! 1. Validate every input before any permutation is drawn
//! 2. With groups, decide between pooled and group-specific slopes
//! 3. Permutation ANOVA of the adopted model
//! 4. Fit the adopted model and derive the plotting projections

use crate::allometry::projection::{check_size_spread, project};
use crate::allometry::result::AllometryResult;
use crate::data::{
    Covariates, DesignMatrix, Formula, FormulaTerm, ModelSpec, ShapeData, Term, VariableType,
};
use crate::error::{AllometryError, Result};
use crate::model::{model_lm, Projector, SsType};
use crate::test::{anova_permutation, test_slopes, EffectType, PermutationConfig, Seed};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Analysis settings, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Take the natural log of size before modelling.
    pub log_size: bool,
    /// Number of random permutations.
    pub iterations: i64,
    /// Seed for the permutation sequence.
    pub seed: Seed,
    /// Significance threshold of the homogeneity-of-slopes test.
    pub alpha: f64,
    /// Randomize residuals of reduced models instead of raw rows.
    pub rrpp: bool,
    /// Statistic used for effect sizes.
    pub effect_type: EffectType,
    /// Sum-of-squares decomposition of the ANOVA table.
    pub ss_type: SsType,
    /// Evaluate permutations in parallel.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            log_size: true,
            iterations: 999,
            seed: Seed::Default,
            alpha: 0.05,
            rrpp: true,
            effect_type: EffectType::F,
            ss_type: SsType::Sequential,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(AllometryError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(AllometryError::from)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.iterations < 0 {
            return Err(AllometryError::InvalidIterationCount(self.iterations));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(AllometryError::InvalidParameter(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        Ok(())
    }

    /// Permutation settings derived from this configuration.
    pub fn permutation_config(&self) -> Result<PermutationConfig> {
        let config = PermutationConfig {
            seed: self.seed,
            effect_type: self.effect_type,
            rrpp: self.rrpp,
            parallel: self.parallel,
            ..Default::default()
        };
        config.with_iterations(self.iterations)
    }
}

/// Size variable named by the size formula.
struct SizeVariable {
    column: String,
    explicit_log: bool,
}

/// Resolve the size formula to exactly one main-effect variable.
///
/// `~ log(cs)` names column `cs` with an explicit log transform.
fn size_variable(formula: &str) -> Result<SizeVariable> {
    let parsed = Formula::parse(formula)?;
    let name = match parsed.terms.as_slice() {
        [FormulaTerm::Main(name)] => name.trim(),
        _ => {
            return Err(AllometryError::SingleCovariateRequired(format!(
                "'{}' must name exactly one size variable",
                formula
            )))
        }
    };
    match name.strip_prefix("log(").and_then(|s| s.strip_suffix(')')) {
        Some(inner) if !inner.trim().is_empty() => Ok(SizeVariable {
            column: inner.trim().to_string(),
            explicit_log: true,
        }),
        _ => Ok(SizeVariable {
            column: name.to_string(),
            explicit_log: false,
        }),
    }
}

/// Builder for an allometry analysis.
///
/// # Example
///
/// ```no_run
/// use procd_allometry::prelude::*;
/// # fn demo(shape: &ShapeData, covariates: &Covariates) -> Result<()> {
/// let result = AllometryAnalysis::new("~ cs")
///     .groups("~ sex")
///     .config(AnalysisConfig::default())
///     .run(shape, covariates)?;
/// println!("{}", result.formula);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AllometryAnalysis {
    size_formula: String,
    group_formula: Option<String>,
    config: AnalysisConfig,
}

impl AllometryAnalysis {
    /// Create an analysis of shape on the size named by `size_formula`.
    pub fn new(size_formula: &str) -> Self {
        Self {
            size_formula: size_formula.to_string(),
            group_formula: None,
            config: AnalysisConfig::default(),
        }
    }

    /// Add grouping factors (e.g. `"~ sex"` or `"~ sex + pop"`).
    pub fn groups(mut self, group_formula: &str) -> Self {
        self.group_formula = Some(group_formula.to_string());
        self
    }

    /// Set the analysis configuration.
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the analysis.
    pub fn run(&self, shape: &ShapeData, covariates: &Covariates) -> Result<AllometryResult> {
        self.config.validate()?;
        let perm_config = self.config.permutation_config()?;

        let n = shape.n_specimens();
        if covariates.n_specimens() != n {
            return Err(AllometryError::DimensionMismatch {
                expected: n,
                actual: covariates.n_specimens(),
            });
        }

        let size_var = size_variable(&self.size_formula)?;
        let raw_size = match covariates.column_type(&size_var.column) {
            Some(VariableType::Continuous) => covariates.continuous(&size_var.column)?,
            Some(VariableType::Categorical) => {
                return Err(AllometryError::SingleCovariateRequired(format!(
                    "'{}' is categorical",
                    size_var.column
                )))
            }
            None => return Err(AllometryError::MissingColumn(size_var.column.clone())),
        };
        if let Some((index, &value)) = raw_size.iter().enumerate().find(|(_, &v)| !(v > 0.0)) {
            return Err(AllometryError::NonPositiveSize { index, value });
        }

        let log_size = self.config.log_size || size_var.explicit_log;
        let (size_label, size) = if log_size {
            (
                format!("log({})", size_var.column),
                raw_size.iter().map(|s| s.ln()).collect::<Vec<f64>>(),
            )
        } else {
            (size_var.column.clone(), raw_size.to_vec())
        };
        check_size_spread(&size)?;

        let groups = match &self.group_formula {
            Some(formula) => Some(self.resolve_groups(formula, covariates)?),
            None => None,
        };

        let mut work = Covariates::new(n).with_continuous(&size_label, size.clone())?;
        if let Some((label, values)) = &groups {
            work = work.with_categorical(label, values.iter().cloned())?;
        }

        info!(
            specimens = n,
            variables = shape.n_variables(),
            size = %size_label,
            groups = groups.as_ref().map(|g| g.0.as_str()).unwrap_or("none"),
            iterations = perm_config.iterations,
            "running allometry analysis"
        );

        let y = shape.matrix();
        let (hos_test, model) = match &groups {
            Some((label, _)) => {
                let slopes = test_slopes(
                    &size_label,
                    label,
                    &work,
                    y,
                    self.config.alpha,
                    &perm_config,
                )?;
                (Some(slopes.table), slopes.final_model)
            }
            None => (None, ModelSpec::new(vec![Term::Covariate(size_label.clone())])),
        };

        let anova = anova_permutation(&model, &work, y, self.config.ss_type, &perm_config)?;

        let design = DesignMatrix::from_spec(&work, &model)?;
        let fit = model_lm(&design, y)?;
        let slope_row = design
            .term_range(&Term::Covariate(size_label.clone()))
            .map(|range| range.start)
            .ok_or_else(|| {
                AllometryError::InvalidModel(format!("'{}' has no size term", model))
            })?;
        let size_slope = fit.coefficients.row(slope_row).transpose();

        let centering = model.without_variable(&size_label);
        debug!(model = %model, centering = %centering, "fitted final model");
        let centering = DesignMatrix::from_spec(&work, &centering)?;
        let y_cent = Projector::new(centering.matrix())?.residuals(y);

        let projection = project(shape, &y_cent, &size, &fit.fitted, &size_slope)?;

        info!(
            model = %model,
            size_p_value = anova.terms.first().map(|t| t.p_value).unwrap_or(f64::NAN),
            "allometry analysis complete"
        );

        Ok(AllometryResult {
            hos_test,
            aov_table: anova.table,
            formula: model,
            permutations: perm_config.permutations(),
            permutation: anova.terms,
            cac: projection.cac,
            cac_direction: projection.cac_direction,
            rsc: projection.rsc,
            rsc_rotation: projection.rsc_rotation,
            reg_proj: projection.reg_proj,
            pred_val: projection.pred_val,
            fitted: fit.fitted,
            ahat: projection.ahat,
            ahat_at_min: projection.ahat_at_min,
            ahat_at_max: projection.ahat_at_max,
            size,
            groups: groups.map(|(_, values)| values),
            landmark_dims: shape.landmark_dims(),
            log_size,
        })
    }

    /// Resolve the grouping formula into a composite factor and its label.
    fn resolve_groups(
        &self,
        formula: &str,
        covariates: &Covariates,
    ) -> Result<(String, Vec<String>)> {
        let parsed = Formula::parse(formula)?;
        let names = parsed.variables();
        if names.is_empty() {
            return Err(AllometryError::InvalidParameter(format!(
                "'{}' names no grouping variable",
                formula
            )));
        }
        for name in &names {
            match covariates.column_type(name) {
                Some(VariableType::Categorical) => {}
                Some(VariableType::Continuous) => {
                    return Err(AllometryError::NonFactorGrouping(name.to_string()))
                }
                None => return Err(AllometryError::MissingColumn(name.to_string())),
            }
        }

        let values = covariates.composite_factor(&names)?;
        let mut levels: Vec<&String> = values.iter().collect();
        levels.sort();
        levels.dedup();
        if levels.len() < 2 {
            return Err(AllometryError::InvalidParameter(format!(
                "grouping '{}' has a single level",
                formula
            )));
        }
        Ok((names.join("."), values))
    }
}
