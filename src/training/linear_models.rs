//! Logistic regression
//!
//! L2-regularized logistic regression fit by full-batch gradient descent.
//! Training stops early once the gradient norm drops below the tolerance.

use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Logistic regression for binary classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Whether to fit an intercept term
    pub fit_intercept: bool,
    /// L2 regularization strength
    pub alpha: f64,
    /// Maximum gradient-descent iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Gradient-descent step size
    pub learning_rate: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
        }
    }

    /// Set regularization strength
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the gradient-descent step size
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(CardioError::DimensionMismatch {
                expected: n_samples,
                actual: y.len(),
            });
        }
        if n_samples == 0 {
            return Err(CardioError::DataError("empty training set".to_string()));
        }

        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = sigmoid(&linear);
            let errors = &predictions - y;

            let mut dw = x.t().dot(&errors) / n_samples as f64;
            if self.alpha > 0.0 {
                dw = dw + self.alpha * &weights;
            }
            let db = if self.fit_intercept {
                errors.mean().unwrap_or(0.0)
            } else {
                0.0
            };

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * &dw;
            bias -= self.learning_rate * db;
        }

        self.coefficients = Some(weights);
        self.intercept = Some(if self.fit_intercept { bias } else { 0.0 });
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Positive-class probability for each row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(CardioError::ModelNotFitted)?;
        let intercept = self.intercept.ok_or(CardioError::ModelNotFitted)?;

        if x.ncols() != coefficients.len() {
            return Err(CardioError::DimensionMismatch {
                expected: coefficients.len(),
                actual: x.ncols(),
            });
        }

        let linear = x.dot(coefficients) + intercept;
        Ok(sigmoid(&linear))
    }
}

fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
    z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linearly_separable() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (40, 2),
            (0..80)
                .map(|i| if i % 2 == 0 { (i / 2) as f64 * 0.1 } else { 1.0 })
                .collect(),
        )
        .unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] > 2.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_separable_fit() {
        let (x, y) = linearly_separable();
        let mut model = LogisticRegression::new().with_max_iter(2000);
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        let acc = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(acc >= 0.9, "accuracy = {}", acc);
    }

    #[test]
    fn test_proba_monotone_in_feature() {
        let (x, y) = linearly_separable();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let probs = model
            .predict_proba(&array![[0.0, 1.0], [2.0, 1.0], [4.0, 1.0]])
            .unwrap();
        assert!(probs[0] < probs[1]);
        assert!(probs[1] < probs[2]);
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let model = LogisticRegression::new();
        let x = array![[1.0, 2.0]];
        assert!(matches!(
            model.predict(&x),
            Err(CardioError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_regularization_shrinks_coefficients() {
        let (x, y) = linearly_separable();

        let mut free = LogisticRegression::new().with_alpha(0.0);
        free.fit(&x, &y).unwrap();
        let mut ridge = LogisticRegression::new().with_alpha(10.0);
        ridge.fit(&x, &y).unwrap();

        let norm_free = free.coefficients.as_ref().unwrap().mapv(|v| v * v).sum();
        let norm_ridge = ridge.coefficients.as_ref().unwrap().mapv(|v| v * v).sum();
        assert!(norm_ridge < norm_free);
    }

    #[test]
    fn test_mismatched_lengths() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0];
        let mut model = LogisticRegression::new();
        assert!(matches!(
            model.fit(&x, &y),
            Err(CardioError::DimensionMismatch { .. })
        ));
    }
}
