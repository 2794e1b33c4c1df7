//! k-nearest-neighbors classification
//!
//! Brute-force neighbor search with a bounded max-heap per query row, so a
//! prediction over n training rows costs O(n log k) instead of a full sort.

use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Distance metric for neighbor search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
}

impl DistanceMetric {
    fn compute(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => {
                a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
            }
        }
    }
}

/// Neighbor weighting scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors count equally
    #[default]
    Uniform,
    /// Closer neighbors count more (inverse distance)
    Distance,
}

/// Configuration for nearest-neighbor classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnConfig {
    pub n_neighbors: usize,
    pub metric: DistanceMetric,
    pub weights: WeightScheme,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// Distance/label pair ordered by distance, for the bounded max-heap.
#[derive(Debug, Clone, Copy)]
struct Neighbor {
    distance: f64,
    label: f64,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// k-nearest-neighbors binary classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    config: KnnConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KnnClassifier {
    pub fn new(config: KnnConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Convenience constructor fixing only the neighbor count.
    pub fn with_k(n_neighbors: usize) -> Self {
        Self::new(KnnConfig {
            n_neighbors,
            ..Default::default()
        })
    }

    /// Lazy learner: fitting just stores the training data.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(CardioError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        if x.nrows() == 0 {
            return Err(CardioError::DataError("empty training set".to_string()));
        }
        if self.config.n_neighbors == 0 {
            return Err(CardioError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Positive-class vote share for each query row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_train = self.x_train.as_ref().ok_or(CardioError::ModelNotFitted)?;
        let y_train = self.y_train.as_ref().ok_or(CardioError::ModelNotFitted)?;

        if x.ncols() != x_train.ncols() {
            return Err(CardioError::DimensionMismatch {
                expected: x_train.ncols(),
                actual: x.ncols(),
            });
        }

        let k = self.config.n_neighbors.min(x_train.nrows());

        let probs: Vec<f64> = x
            .rows()
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|query| {
                let neighbors = self.nearest(query, x_train, y_train, k);
                self.positive_share(&neighbors)
            })
            .collect();

        Ok(Array1::from_vec(probs))
    }

    fn nearest(
        &self,
        query: ArrayView1<f64>,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        k: usize,
    ) -> Vec<Neighbor> {
        let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k + 1);
        for (i, row) in x_train.rows().into_iter().enumerate() {
            let distance = self.config.metric.compute(query, row);
            heap.push(Neighbor {
                distance,
                label: y_train[i],
            });
            if heap.len() > k {
                heap.pop();
            }
        }
        heap.into_vec()
    }

    /// Weighted positive fraction among the neighbors. Ties break toward the
    /// negative class.
    fn positive_share(&self, neighbors: &[Neighbor]) -> f64 {
        let mut pos = 0.0;
        let mut total = 0.0;
        for n in neighbors {
            let w = match self.config.weights {
                WeightScheme::Uniform => 1.0,
                WeightScheme::Distance => 1.0 / (n.distance + 1e-10),
            };
            total += w;
            if n.label > 0.5 {
                pos += w;
            }
        }
        if total > 0.0 {
            pos / total
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn clustered_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.1],
            [0.2, 0.0],
            [0.1, 0.2],
            [0.0, 0.3],
            [5.0, 5.1],
            [5.2, 5.0],
            [5.1, 5.2],
            [5.0, 5.3],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_separated_clusters() {
        let (x, y) = clustered_data();
        let mut model = KnnClassifier::with_k(3);
        model.fit(&x, &y).unwrap();

        let queries = array![[0.1, 0.1], [5.1, 5.1]];
        let preds = model.predict(&queries).unwrap();
        assert_eq!(preds, array![0.0, 1.0]);
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let model = KnnClassifier::with_k(3);
        let x = array![[1.0, 2.0]];
        assert!(matches!(
            model.predict(&x),
            Err(CardioError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_k_larger_than_train_is_capped() {
        let x = array![[0.0, 0.0], [1.0, 1.0], [1.1, 1.0]];
        let y = array![0.0, 1.0, 1.0];
        let mut model = KnnClassifier::with_k(50);
        model.fit(&x, &y).unwrap();

        // Capped k = 3, majority positive
        let preds = model.predict(&array![[1.0, 1.05]]).unwrap();
        assert_eq!(preds[0], 1.0);
    }

    #[test]
    fn test_distance_weighting_prefers_closest() {
        let x = array![[0.0, 0.0], [10.0, 10.0], [10.2, 10.0]];
        let y = array![1.0, 0.0, 0.0];
        let mut model = KnnClassifier::new(KnnConfig {
            n_neighbors: 3,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Distance,
        });
        model.fit(&x, &y).unwrap();

        // Uniform voting says 0; the single positive neighbor sits on top of
        // the query, so inverse-distance weighting flips the vote.
        let preds = model.predict(&array![[0.0, 0.01]]).unwrap();
        assert_eq!(preds[0], 1.0);
    }

    #[test]
    fn test_manhattan_metric() {
        let (x, y) = clustered_data();
        let mut model = KnnClassifier::new(KnnConfig {
            n_neighbors: 3,
            metric: DistanceMetric::Manhattan,
            weights: WeightScheme::Uniform,
        });
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&array![[5.0, 5.0]]).unwrap();
        assert_eq!(preds[0], 1.0);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let (x, y) = clustered_data();
        let mut model = KnnClassifier::with_k(3);
        model.fit(&x, &y).unwrap();
        let bad = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            model.predict(&bad),
            Err(CardioError::DimensionMismatch { .. })
        ));
    }
}
