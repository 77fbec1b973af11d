//! Linear models and sum-of-squares contrasts for shape data.

pub mod anova;
pub mod lm;

pub use anova::{term_contrasts, ContrastFit, TermContrast};
pub use lm::{model_lm, LmFit, Projector, SsType};
