//! ANOVA table types for permutation-based model tests.

use serde::{Deserialize, Serialize};

/// One row of a Procrustes ANOVA table.
///
/// Residual and total rows carry no test statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnovaRow {
    /// Term label ("Residuals" and "Total" for the closing rows).
    pub term: String,
    /// Degrees of freedom.
    pub df: usize,
    /// Sum of squares.
    pub ss: f64,
    /// Mean square.
    pub ms: f64,
    /// Share of total sum of squares.
    pub rsq: f64,
    /// F statistic.
    pub f: Option<f64>,
    /// Effect size (standardized against the permutation distribution).
    pub z: Option<f64>,
    /// Permutation p-value.
    pub p_value: Option<f64>,
}

impl AnovaRow {
    /// Create a tested term row.
    pub fn term(
        term: String,
        df: usize,
        ss: f64,
        total_ss: f64,
        f: f64,
        z: f64,
        p_value: f64,
    ) -> Self {
        Self {
            term,
            df,
            ss,
            ms: mean_square(ss, df),
            rsq: share(ss, total_ss),
            f: Some(f),
            z: Some(z),
            p_value: Some(p_value),
        }
    }

    /// Create an untested row (residuals or total).
    pub fn untested(term: &str, df: usize, ss: f64, total_ss: f64) -> Self {
        Self {
            term: term.to_string(),
            df,
            ss,
            ms: mean_square(ss, df),
            rsq: share(ss, total_ss),
            f: None,
            z: None,
            p_value: None,
        }
    }

    /// Check if the term is significant at the given threshold.
    pub fn is_significant_at(&self, alpha: f64) -> bool {
        self.p_value.map(|p| p <= alpha).unwrap_or(false)
    }
}

fn mean_square(ss: f64, df: usize) -> f64 {
    if df > 0 {
        ss / df as f64
    } else {
        f64::NAN
    }
}

fn share(ss: f64, total_ss: f64) -> f64 {
    if total_ss > 0.0 {
        ss / total_ss
    } else {
        0.0
    }
}

/// A Procrustes ANOVA table: one row per term, then residuals and total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnovaTable {
    /// Table rows.
    pub rows: Vec<AnovaRow>,
    /// Number of permutations (including the observed one).
    pub permutations: usize,
    /// Description of the sum-of-squares type.
    pub ss_type: String,
    /// Description of the effect statistic.
    pub effect_type: String,
}

impl AnovaTable {
    /// Rows for tested terms (excludes residual and total rows).
    pub fn term_rows(&self) -> impl Iterator<Item = &AnovaRow> {
        self.rows.iter().filter(|r| r.p_value.is_some())
    }

    /// Get a row by term label.
    pub fn row(&self, term: &str) -> Option<&AnovaRow> {
        self.rows.iter().find(|r| r.term == term)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl std::fmt::Display for AnovaTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Type {} sums of squares", self.ss_type)?;
        writeln!(
            f,
            "Permutations: {}; effect sizes (Z) from {} distributions",
            self.permutations, self.effect_type
        )?;
        writeln!(
            f,
            "{:<20} {:>4} {:>12} {:>12} {:>8} {:>10} {:>8} {:>8}",
            "", "Df", "SS", "MS", "Rsq", "F", "Z", "Pr(>F)"
        )?;
        for row in &self.rows {
            let opt = |v: Option<f64>, prec: usize| {
                v.map(|x| format!("{:.*}", prec, x)).unwrap_or_default()
            };
            writeln!(
                f,
                "{:<20} {:>4} {:>12.6} {:>12.6} {:>8.5} {:>10} {:>8} {:>8}",
                row.term,
                row.df,
                row.ss,
                row.ms,
                row.rsq,
                opt(row.f, 4),
                opt(row.z, 4),
                opt(row.p_value, 3)
            )?;
        }
        Ok(())
    }
}
