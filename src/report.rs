//! Renderers for allometry results.

use crate::allometry::AllometryResult;
use crate::error::Result;
use std::fmt::Write;

/// Something that can turn an [`AllometryResult`] into text.
pub trait Render {
    /// Render the result.
    fn render(&self, result: &AllometryResult) -> Result<String>;
}

/// Plain-text summary: slope test, ANOVA table and accepted model.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport {
    /// Append projection summaries (score ranges).
    pub projections: bool,
}

impl TextReport {
    /// Text report including projection summaries.
    pub fn detailed() -> Self {
        Self { projections: true }
    }
}

impl Render for TextReport {
    fn render(&self, result: &AllometryResult) -> Result<String> {
        let mut out = String::new();
        self.write(&mut out, result)?;
        Ok(out)
    }
}

impl TextReport {
    fn write(&self, out: &mut String, result: &AllometryResult) -> std::fmt::Result {
        writeln!(out, "Allometry analysis")?;
        writeln!(
            out,
            "Specimens: {}; size {}",
            result.size.len(),
            if result.log_size { "log-transformed" } else { "untransformed" }
        )?;
        if let Some((p, k)) = result.landmark_dims {
            writeln!(out, "Landmarks: {} x {}", p, k)?;
        }
        writeln!(out)?;

        if let Some(hos) = &result.hos_test {
            write!(out, "{}", hos)?;
            writeln!(out)?;
        }

        writeln!(out, "Procrustes ANOVA")?;
        write!(out, "{}", result.aov_table)?;
        writeln!(out)?;
        writeln!(out, "Final model: {}", result.formula)?;

        if self.projections {
            writeln!(out)?;
            for (name, values) in [
                ("CAC", result.cac.as_slice()),
                ("RegScore", result.reg_proj.as_slice()),
                ("PredLine", result.pred_val.as_slice()),
            ] {
                let (lo, hi) = range(values);
                writeln!(out, "{:<10} [{:.5}, {:.5}]", name, lo, hi)?;
            }
            writeln!(out, "RSC components: {}", result.rsc.ncols())?;
        }
        Ok(())
    }
}

fn range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// JSON rendering of the full result record.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReport;

impl Render for JsonReport {
    fn render(&self, result: &AllometryResult) -> Result<String> {
        result.to_json()
    }
}
