//! Permutation hypothesis tests for shape models.


pub use permutation::{
    anova_permutation, effect_size, p_value, permutation, test_nested, EffectType,
    NestedTestResult, PermutationConfig, PermutationResult, ProcAnova, Seed,
};
pub use slopes::{test_slopes, HosRow, HosTable, SlopeDecision, SlopeTest};
