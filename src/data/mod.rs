//! Data structures for allometry analysis.

mod covariates;
mod design_matrix;
mod formula;
mod result;
mod shape;

pub use covariates::{Column, Covariates, VariableType};
pub use design_matrix::DesignMatrix;
pub use formula::{Formula, FormulaTerm, ModelSpec, Term};
pub use result::{AnovaRow, AnovaTable};
pub use shape::{Shape, ShapeData};
