//! Allometry analysis of shape on size.
//!
//! - [`AllometryAnalysis`]: builder and orchestrator
//! - [`project`]: CAC/RSC, regression scores and predicted lines
//! - [`AllometryResult`]: the output record

mod analysis;
mod projection;
mod result;

pub use analysis::{AllometryAnalysis, AnalysisConfig};
pub use projection::{principal_components, project, AllometryProjection, PrincipalComponents};
pub use result::AllometryResult;
