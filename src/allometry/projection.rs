//! Low-dimensional allometry projections for plotting.
//!
//! - CAC (common allometric component): the size-centred shapes projected
//!   on their normalized covariance direction with size; RSC are principal
//!   component scores of what is left after removing that direction.
//! - RegScore: shapes projected on the normalized size-slope coefficients.
//! - PredLine: first principal component of the fitted shapes.

use crate::data::{Shape, ShapeData};
use crate::error::{AllometryError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Singular values below this fraction of the largest are dropped.
const PC_TOLERANCE: f64 = 1e-10;

/// Principal component decomposition of a centred matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalComponents {
    /// Scores (rows × components).
    pub scores: DMatrix<f64>,
    /// Loadings (variables × components), unit columns.
    pub rotation: DMatrix<f64>,
    /// Standard deviation of each component.
    pub sdev: Vec<f64>,
}

/// Principal components of `m` after centring its columns.
///
/// Components are ordered by decreasing variance; each loading vector is
/// signed so that its largest-magnitude entry is positive.
pub fn principal_components(m: &DMatrix<f64>) -> PrincipalComponents {
    let (n, v) = m.shape();
    let means = m.row_mean();
    let centered = DMatrix::from_fn(n, v, |i, j| m[(i, j)] - means[j]);

    let svd = centered.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return PrincipalComponents {
            scores: DMatrix::zeros(n, 0),
            rotation: DMatrix::zeros(v, 0),
            sdev: Vec::new(),
        };
    };
    let s = svd.singular_values;
    let s_max = s.iter().copied().fold(0.0, f64::max);
    let kept = s.iter().filter(|&&x| x > PC_TOLERANCE * s_max && x > 0.0).count();

    let mut scores = DMatrix::zeros(n, kept);
    let mut rotation = DMatrix::zeros(v, kept);
    for c in 0..kept {
        let loading = v_t.row(c).transpose();
        let pivot = loading.iamax();
        let sign = if loading[pivot] < 0.0 { -1.0 } else { 1.0 };
        rotation.set_column(c, &(loading * sign));
        scores.set_column(c, &(u.column(c) * (s[c] * sign)));
    }
    let denom = (n.max(2) - 1) as f64;
    let sdev = (0..kept).map(|c| s[c] / denom.sqrt()).collect();

    PrincipalComponents {
        scores,
        rotation,
        sdev,
    }
}

/// Derived projections of a fitted allometry model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllometryProjection {
    /// Unit allometric direction `a`.
    pub cac_direction: DVector<f64>,
    /// Common allometric component scores.
    pub cac: DVector<f64>,
    /// Residual shape component scores.
    pub rsc: DMatrix<f64>,
    /// Loadings of the residual shape components.
    pub rsc_rotation: DMatrix<f64>,
    /// Regression scores.
    pub reg_proj: DVector<f64>,
    /// Predicted-line scores (PC1 of fitted values).
    pub pred_val: DVector<f64>,
    /// Mean shape.
    pub ahat: Shape,
    /// Fitted shape of the smallest specimen.
    pub ahat_at_min: Shape,
    /// Fitted shape of the largest specimen.
    pub ahat_at_max: Shape,
    /// Index of the smallest specimen.
    pub min_index: usize,
    /// Index of the largest specimen.
    pub max_index: usize,
}

/// Compute the allometry projections.
///
/// # Arguments
/// * `shape` - Original shape data (provides Y and the output representation)
/// * `y_cent` - Shapes with all non-size structure removed
/// * `size` - Size covariate as modelled (log scale if configured)
/// * `fitted` - Fitted values of the final model
/// * `size_slope` - Size coefficient row of the final model
pub fn project(
    shape: &ShapeData,
    y_cent: &DMatrix<f64>,
    size: &[f64],
    fitted: &DMatrix<f64>,
    size_slope: &DVector<f64>,
) -> Result<AllometryProjection> {
    let n = shape.n_specimens();
    for rows in [y_cent.nrows(), fitted.nrows(), size.len()] {
        if rows != n {
            return Err(AllometryError::DimensionMismatch {
                expected: n,
                actual: rows,
            });
        }
    }
    check_size_spread(size)?;

    let sz = DVector::from_column_slice(size);
    let a = y_cent.transpose() * &sz / sz.norm_squared();
    let a_norm = a.norm();
    if !(a_norm > f64::EPSILON) {
        return Err(AllometryError::DegenerateAllometricDirection(
            "shape does not covary with size".to_string(),
        ));
    }
    let a = a / a_norm;

    let cac = y_cent * &a;
    let residual = y_cent - &cac * a.transpose();
    let rsc = principal_components(&residual);

    let b_norm = size_slope.norm();
    if !(b_norm > 0.0) {
        return Err(AllometryError::DegenerateAllometricDirection(
            "size slope coefficients are all zero".to_string(),
        ));
    }
    let reg_proj = shape.matrix() * size_slope / b_norm;

    let pred = principal_components(fitted);
    let mut pred_val = if pred.scores.ncols() > 0 {
        pred.scores.column(0).into_owned()
    } else {
        DVector::zeros(n)
    };
    // orient the predicted line so it increases with size
    let mean_size = sz.mean();
    let cov: f64 = pred_val
        .iter()
        .zip(sz.iter())
        .map(|(p, s)| p * (s - mean_size))
        .sum();
    if cov < 0.0 {
        pred_val = -pred_val;
    }

    let min_index = sz.imin();
    let max_index = sz.imax();

    Ok(AllometryProjection {
        cac_direction: a,
        cac,
        rsc: rsc.scores,
        rsc_rotation: rsc.rotation,
        reg_proj,
        pred_val,
        ahat: shape.mean_shape(),
        ahat_at_min: shape.to_shape(fitted.row(min_index).transpose()),
        ahat_at_max: shape.to_shape(fitted.row(max_index).transpose()),
        min_index,
        max_index,
    })
}

/// Reject size vectors with no variance.
pub fn check_size_spread(size: &[f64]) -> Result<()> {
    let n = size.len() as f64;
    let mean = size.iter().sum::<f64>() / n;
    let spread = size.iter().map(|s| (s - mean).abs()).fold(0.0, f64::max);
    if !(spread > f64::EPSILON * mean.abs().max(1.0)) {
        return Err(AllometryError::DegenerateAllometricDirection(
            "size has zero variance".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn centered(m: &DMatrix<f64>) -> DMatrix<f64> {
        let means = m.row_mean();
        DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)] - means[j])
    }

    fn sample() -> (ShapeData, Vec<f64>) {
        let size: Vec<f64> = (0..8).map(|i| 1.0 + i as f64 * 0.25).collect();
        let noise = [0.01, -0.02, 0.0, 0.02, -0.01, 0.015, -0.005, 0.0];
        let y = DMatrix::from_fn(8, 3, |i, j| {
            let s = size[i];
            match j {
                0 => 0.3 * s + noise[i],
                1 => -0.2 * s + noise[(i + 3) % 8],
                _ => 0.05 * s + noise[(i + 5) % 8],
            }
        });
        (ShapeData::from_matrix(y).unwrap(), size)
    }

    #[test]
    fn test_principal_components_reconstruct() {
        let (shape, _) = sample();
        let pcs = principal_components(shape.matrix());
        let rebuilt = &pcs.scores * pcs.rotation.transpose();
        assert_relative_eq!(rebuilt, centered(shape.matrix()), epsilon = 1e-10);
        assert!(pcs.sdev.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_projection_properties() {
        let (shape, size) = sample();
        let y_cent = centered(shape.matrix());
        let slope = DVector::from_vec(vec![0.3, -0.2, 0.05]);
        let fitted = DMatrix::from_fn(8, 3, |i, j| size[i] * slope[j]);
        let proj = project(&shape, &y_cent, &size, &fitted, &slope).unwrap();

        assert_relative_eq!(proj.cac_direction.norm(), 1.0, epsilon = 1e-12);

        // Y_cent = CAC a' + RSC V'
        let rebuilt = &proj.cac * proj.cac_direction.transpose()
            + &proj.rsc * proj.rsc_rotation.transpose();
        assert_relative_eq!(rebuilt, y_cent, epsilon = 1e-10);

        // residual components are orthogonal to the allometric direction
        let cross = proj.rsc_rotation.transpose() * &proj.cac_direction;
        assert!(cross.amax() < 1e-10);

        assert_eq!(proj.min_index, 0);
        assert_eq!(proj.max_index, 7);
        assert_eq!(
            proj.ahat_at_max,
            Shape::Vector(fitted.row(7).transpose())
        );
        assert!(proj.pred_val[7] > proj.pred_val[0]);
    }

    #[test]
    fn test_reg_proj_is_normalized_projection() {
        let (shape, size) = sample();
        let y_cent = centered(shape.matrix());
        let slope = DVector::from_vec(vec![3.0, 4.0, 0.0]);
        let fitted = DMatrix::from_fn(8, 3, |i, j| size[i] * slope[j]);
        let proj = project(&shape, &y_cent, &size, &fitted, &slope).unwrap();
        let expected = (shape.matrix()[(2, 0)] * 3.0 + shape.matrix()[(2, 1)] * 4.0) / 5.0;
        assert_relative_eq!(proj.reg_proj[2], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_size_is_degenerate() {
        let (shape, _) = sample();
        let y_cent = centered(shape.matrix());
        let size = vec![2.0; 8];
        let slope = DVector::from_vec(vec![1.0, 0.0, 0.0]);
        let result = project(&shape, &y_cent, &size, shape.matrix(), &slope);
        assert!(matches!(
            result,
            Err(AllometryError::DegenerateAllometricDirection(_))
        ));
    }

    #[test]
    fn test_landmark_outputs_keep_configuration() {
        let configs: Vec<DMatrix<f64>> = (0..6)
            .map(|i| {
                let s = 1.0 + i as f64 * 0.2;
                DMatrix::from_row_slice(2, 2, &[s, 0.1 * (i % 2) as f64, -s, 0.5])
            })
            .collect();
        let shape = ShapeData::from_landmarks(&configs).unwrap();
        let size: Vec<f64> = (0..6).map(|i| 1.0 + i as f64 * 0.2).collect();
        let y_cent = centered(shape.matrix());
        let slope = DVector::from_vec(vec![1.0, 0.0, -1.0, 0.0]);
        let proj = project(&shape, &y_cent, &size, shape.matrix(), &slope).unwrap();
        assert!(matches!(proj.ahat, Shape::Configuration(ref m) if m.shape() == (2, 2)));
        assert!(matches!(proj.ahat_at_min, Shape::Configuration(_)));
    }
}
