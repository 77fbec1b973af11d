//! Shape data: Procrustes shape variables for each specimen.

use crate::error::{AllometryError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Shape variables for n specimens (specimens × variables).
///
/// Built either from a plain matrix or from landmark configurations
/// (p landmarks × k dimensions per specimen). Landmark configurations are
/// flattened landmark-major: `x1, y1, (z1,) x2, y2, ...`.
#[derive(Debug, Clone)]
pub struct ShapeData {
    data: DMatrix<f64>,
    landmarks: Option<(usize, usize)>,
}

/// A single shape, in the same representation as the input data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Shape variables as a flat vector.
    Vector(DVector<f64>),
    /// Landmark configuration (p × k).
    Configuration(DMatrix<f64>),
}

impl Shape {
    /// Shape values flattened in variable order.
    pub fn to_vector(&self) -> DVector<f64> {
        match self {
            Shape::Vector(v) => v.clone(),
            Shape::Configuration(m) => {
                let (p, k) = m.shape();
                DVector::from_fn(p * k, |i, _| m[(i / k, i % k)])
            }
        }
    }
}

impl ShapeData {
    /// Create from a specimens × variables matrix.
    pub fn from_matrix(data: DMatrix<f64>) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(AllometryError::EmptyData(
                "Shape matrix has no specimens or no variables".to_string(),
            ));
        }
        Ok(Self {
            data,
            landmarks: None,
        })
    }

    /// Create from landmark configurations, one p × k matrix per specimen.
    pub fn from_landmarks(configs: &[DMatrix<f64>]) -> Result<Self> {
        let first = configs.first().ok_or_else(|| {
            AllometryError::EmptyData("No landmark configurations".to_string())
        })?;
        let (p, k) = first.shape();
        if p == 0 || k == 0 {
            return Err(AllometryError::EmptyData(
                "Landmark configurations are empty".to_string(),
            ));
        }

        for config in configs {
            if config.shape() != (p, k) {
                return Err(AllometryError::DimensionMismatch {
                    expected: p * k,
                    actual: config.nrows() * config.ncols(),
                });
            }
        }

        let data = DMatrix::from_fn(configs.len(), p * k, |i, j| configs[i][(j / k, j % k)]);
        Ok(Self {
            data,
            landmarks: Some((p, k)),
        })
    }

    /// The specimens × variables matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Number of specimens (rows).
    pub fn n_specimens(&self) -> usize {
        self.data.nrows()
    }

    /// Number of shape variables (columns).
    pub fn n_variables(&self) -> usize {
        self.data.ncols()
    }

    /// Landmark dimensions (p, k) when built from configurations.
    pub fn landmark_dims(&self) -> Option<(usize, usize)> {
        self.landmarks
    }

    /// Wrap a flat shape vector in this data's representation.
    pub fn to_shape(&self, values: DVector<f64>) -> Shape {
        match self.landmarks {
            Some((p, k)) => Shape::Configuration(DMatrix::from_fn(p, k, |i, j| values[i * k + j])),
            None => Shape::Vector(values),
        }
    }

    /// Shape of a single specimen.
    pub fn specimen(&self, index: usize) -> Shape {
        self.to_shape(self.data.row(index).transpose())
    }

    /// Mean shape over all specimens.
    pub fn mean_shape(&self) -> Shape {
        self.to_shape(self.data.row_mean().transpose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_landmarks_flattening() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = DMatrix::from_row_slice(2, 2, &[5.0, 6.0, 7.0, 8.0]);
        let shape = ShapeData::from_landmarks(&[a.clone(), b]).unwrap();

        assert_eq!(shape.n_specimens(), 2);
        assert_eq!(shape.n_variables(), 4);
        assert_eq!(shape.landmark_dims(), Some((2, 2)));
        let row: Vec<f64> = shape.matrix().row(0).iter().copied().collect();
        assert_eq!(row, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(shape.specimen(0), Shape::Configuration(a));
    }

    #[test]
    fn test_mean_shape_matrix() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 3.0, 4.0, 5.0]);
        let shape = ShapeData::from_matrix(m).unwrap();
        let mean = shape.mean_shape();
        assert_eq!(mean, Shape::Vector(DVector::from_vec(vec![2.0, 3.0, 4.0])));
    }

    #[test]
    fn test_configuration_round_trip() {
        let config = DMatrix::from_row_slice(3, 2, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        let shape = ShapeData::from_landmarks(&[config.clone(), config.clone()]).unwrap();
        let flat = shape.specimen(1).to_vector();
        assert_eq!(shape.to_shape(flat), Shape::Configuration(config));
    }

    #[test]
    fn test_mismatched_configurations() {
        let a = DMatrix::zeros(3, 2);
        let b = DMatrix::zeros(2, 2);
        assert!(ShapeData::from_landmarks(&[a, b]).is_err());
        assert!(ShapeData::from_landmarks(&[]).is_err());
    }
}
