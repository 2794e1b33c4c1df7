//! Candidate model catalog
//!
//! The closed set of model families the trainer considers, each paired with
//! its hyperparameter grid. Catalog order is fixed and meaningful: the
//! selector breaks score ties in favor of the earliest-declared family, so
//! reordering this list changes which model wins a tied run.

use crate::error::{CardioError, Result};
use super::adaboost::AdaboostClassifier;
use super::catboost::{CatboostClassifier, CatboostConfig};
use super::decision_tree::{Criterion, DecisionTree};
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::knn::KnnClassifier;
use super::linear_models::LogisticRegression;
use super::random_forest::{ClassWeight, RandomForestClassifier};
use super::xgboost::{XgboostClassifier, XgboostConfig};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn text(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }

    fn ints(values: &[i64]) -> Vec<ParamValue> {
        values.iter().map(|&v| ParamValue::Int(v)).collect()
    }

    fn floats(values: &[f64]) -> Vec<ParamValue> {
        values.iter().map(|&v| ParamValue::Float(v)).collect()
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// An ordered set of hyperparameter assignments for one candidate fit.
///
/// Order follows grid declaration, which keeps log lines and persisted
/// artifacts stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pairs: Vec<(String, ParamValue)>,
}

impl HyperParams {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_pairs(pairs: Vec<(String, ParamValue)>) -> Self {
        Self { pairs }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Integer parameter lookup with a fallback for absent or mistyped values.
    pub fn usize_or(&self, name: &str, default: usize) -> usize {
        match self.get(name) {
            Some(ParamValue::Int(v)) if *v >= 0 => *v as usize,
            _ => default,
        }
    }

    pub fn f64_or(&self, name: &str, default: f64) -> f64 {
        match self.get(name) {
            Some(ParamValue::Float(v)) => *v,
            Some(ParamValue::Int(v)) => *v as f64,
            _ => default,
        }
    }

    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.get(name) {
            Some(ParamValue::Text(v)) => v.as_str(),
            _ => default,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ParamValue)> {
        self.pairs.iter()
    }

    /// Stringified pairs for run tracking and artifact metadata.
    pub fn to_string_pairs(&self) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect()
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pairs.is_empty() {
            return write!(f, "defaults");
        }
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// A hyperparameter grid: named axes, each with its candidate values.
#[derive(Debug, Clone, Default)]
pub struct HyperGrid {
    axes: Vec<(String, Vec<ParamValue>)>,
}

impl HyperGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_axis(mut self, name: &str, values: Vec<ParamValue>) -> Self {
        self.axes.push((name.to_string(), values));
        self
    }

    /// A grid with no axes: the family is trained once with its defaults.
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Number of parameter combinations the grid expands to.
    pub fn len(&self) -> usize {
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// Expand into the full cartesian product, first-declared axis varying
    /// slowest. An empty grid expands to the single all-defaults assignment.
    pub fn expand(&self) -> Vec<HyperParams> {
        let mut combos: Vec<Vec<(String, ParamValue)>> = vec![Vec::new()];
        for (name, values) in &self.axes {
            let mut next = Vec::with_capacity(combos.len() * values.len());
            for combo in &combos {
                for value in values {
                    let mut extended = combo.clone();
                    extended.push((name.clone(), value.clone()));
                    next.push(extended);
                }
            }
            combos = next;
        }
        combos.into_iter().map(HyperParams::from_pairs).collect()
    }
}

/// The model families the trainer evaluates, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    RandomForest,
    DecisionTree,
    GradientBoosting,
    Xgboost,
    Catboost,
    KNeighbors,
    AdaBoost,
    LogisticRegression,
}

impl ModelKind {
    /// Every family, in catalog order.
    pub const ALL: [ModelKind; 8] = [
        ModelKind::RandomForest,
        ModelKind::DecisionTree,
        ModelKind::GradientBoosting,
        ModelKind::Xgboost,
        ModelKind::Catboost,
        ModelKind::KNeighbors,
        ModelKind::AdaBoost,
        ModelKind::LogisticRegression,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::DecisionTree => "decision_tree",
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::Xgboost => "xgboost",
            ModelKind::Catboost => "catboost",
            ModelKind::KNeighbors => "k_neighbors",
            ModelKind::AdaBoost => "adaboost",
            ModelKind::LogisticRegression => "logistic_regression",
        }
    }

    /// The hyperparameter grid searched for this family.
    pub fn grid(&self) -> HyperGrid {
        match self {
            ModelKind::RandomForest => HyperGrid::new()
                .with_axis("n_estimators", ParamValue::ints(&[10, 40, 45, 50]))
                .with_axis("class_weight", vec![ParamValue::text("balanced")]),
            ModelKind::DecisionTree => HyperGrid::new().with_axis(
                "criterion",
                vec![ParamValue::text("gini"), ParamValue::text("entropy")],
            ),
            ModelKind::GradientBoosting => HyperGrid::new()
                .with_axis("n_estimators", ParamValue::ints(&[10, 50, 100, 300])),
            ModelKind::Xgboost => HyperGrid::new()
                .with_axis("learning_rate", ParamValue::floats(&[0.01, 0.1, 0.2])),
            ModelKind::Catboost => HyperGrid::new()
                .with_axis("learning_rate", ParamValue::floats(&[0.01, 0.1, 0.2])),
            ModelKind::KNeighbors => {
                HyperGrid::new().with_axis("n_neighbors", ParamValue::ints(&[3, 5, 7, 9]))
            }
            ModelKind::AdaBoost => HyperGrid::new()
                .with_axis("n_estimators", ParamValue::ints(&[10, 50, 100, 250])),
            ModelKind::LogisticRegression => HyperGrid::new(),
        }
    }

    /// Train one candidate of this family with the given parameters.
    pub fn fit(
        &self,
        params: &HyperParams,
        x: &Array2<f64>,
        y: &Array1<f64>,
        random_state: u64,
    ) -> Result<FittedModel> {
        match self {
            ModelKind::RandomForest => {
                let class_weight = ClassWeight::parse(params.str_or("class_weight", "uniform"))?;
                let mut model = RandomForestClassifier::new(params.usize_or("n_estimators", 100))
                    .with_class_weight(class_weight)
                    .with_random_state(random_state);
                model.fit(x, y)?;
                Ok(FittedModel::RandomForest(model))
            }
            ModelKind::DecisionTree => {
                let criterion = Criterion::parse(params.str_or("criterion", "gini"))?;
                let mut model = DecisionTree::new_classifier().with_criterion(criterion);
                model.fit(x, y)?;
                Ok(FittedModel::DecisionTree(model))
            }
            ModelKind::GradientBoosting => {
                let config = GradientBoostingConfig {
                    n_estimators: params.usize_or("n_estimators", 100),
                    random_state: Some(random_state),
                    ..Default::default()
                };
                let mut model = GradientBoostingClassifier::new(config);
                model.fit(x, y)?;
                Ok(FittedModel::GradientBoosting(model))
            }
            ModelKind::Xgboost => {
                let config = XgboostConfig {
                    learning_rate: params.f64_or("learning_rate", 0.3),
                    random_state: Some(random_state),
                    ..Default::default()
                };
                let mut model = XgboostClassifier::new(config);
                model.fit(x, y)?;
                Ok(FittedModel::Xgboost(model))
            }
            ModelKind::Catboost => {
                let config = CatboostConfig {
                    learning_rate: params.f64_or("learning_rate", 0.1),
                    random_state: Some(random_state),
                    ..Default::default()
                };
                let mut model = CatboostClassifier::new(config);
                model.fit(x, y)?;
                Ok(FittedModel::Catboost(model))
            }
            ModelKind::KNeighbors => {
                let mut model = KnnClassifier::with_k(params.usize_or("n_neighbors", 5));
                model.fit(x, y)?;
                Ok(FittedModel::KNeighbors(model))
            }
            ModelKind::AdaBoost => {
                let mut model = AdaboostClassifier::new(params.usize_or("n_estimators", 50));
                model.fit(x, y)?;
                Ok(FittedModel::AdaBoost(model))
            }
            ModelKind::LogisticRegression => {
                let mut model = LogisticRegression::new();
                model.fit(x, y)?;
                Ok(FittedModel::LogisticRegression(model))
            }
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = CardioError;

    fn from_str(s: &str) -> Result<Self> {
        ModelKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| CardioError::InvalidParameter {
                name: "model".to_string(),
                value: s.to_string(),
                reason: "unknown model family".to_string(),
            })
    }
}

/// A trained candidate, dispatching prediction to the concrete family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedModel {
    RandomForest(RandomForestClassifier),
    DecisionTree(DecisionTree),
    GradientBoosting(GradientBoostingClassifier),
    Xgboost(XgboostClassifier),
    Catboost(CatboostClassifier),
    KNeighbors(KnnClassifier),
    AdaBoost(AdaboostClassifier),
    LogisticRegression(LogisticRegression),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::RandomForest(_) => ModelKind::RandomForest,
            FittedModel::DecisionTree(_) => ModelKind::DecisionTree,
            FittedModel::GradientBoosting(_) => ModelKind::GradientBoosting,
            FittedModel::Xgboost(_) => ModelKind::Xgboost,
            FittedModel::Catboost(_) => ModelKind::Catboost,
            FittedModel::KNeighbors(_) => ModelKind::KNeighbors,
            FittedModel::AdaBoost(_) => ModelKind::AdaBoost,
            FittedModel::LogisticRegression(_) => ModelKind::LogisticRegression,
        }
    }

    /// Predict hard labels (0.0 or 1.0) for each row.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedModel::RandomForest(model) => model.predict(x),
            FittedModel::DecisionTree(model) => model.predict(x),
            FittedModel::GradientBoosting(model) => model.predict(x),
            FittedModel::Xgboost(model) => model.predict(x),
            FittedModel::Catboost(model) => model.predict(x),
            FittedModel::KNeighbors(model) => model.predict(x),
            FittedModel::AdaBoost(model) => model.predict(x),
            FittedModel::LogisticRegression(model) => model.predict(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((30, 2), (0..60).map(|i| i as f64).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] > 28.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_catalog_order_is_fixed() {
        assert_eq!(ModelKind::ALL.len(), 8);
        assert_eq!(ModelKind::ALL[0], ModelKind::RandomForest);
        assert_eq!(ModelKind::ALL[7], ModelKind::LogisticRegression);
    }

    #[test]
    fn test_grid_expansion_order() {
        let combos = ModelKind::RandomForest.grid().expand();
        assert_eq!(combos.len(), 4);
        // First axis varies slowest; every combo carries the single
        // class_weight value.
        assert_eq!(combos[0].usize_or("n_estimators", 0), 10);
        assert_eq!(combos[3].usize_or("n_estimators", 0), 50);
        for combo in &combos {
            assert_eq!(combo.str_or("class_weight", ""), "balanced");
        }
    }

    #[test]
    fn test_empty_grid_expands_to_defaults() {
        let grid = ModelKind::LogisticRegression.grid();
        assert!(grid.is_empty());
        let combos = grid.expand();
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
    }

    #[test]
    fn test_grid_sizes() {
        let sizes: Vec<usize> = ModelKind::ALL
            .iter()
            .map(|kind| kind.grid().expand().len())
            .collect();
        assert_eq!(sizes, vec![4, 2, 4, 3, 3, 4, 4, 1]);
    }

    #[test]
    fn test_params_display() {
        let combos = ModelKind::RandomForest.grid().expand();
        assert_eq!(combos[1].to_string(), "n_estimators=40, class_weight=balanced");
        assert_eq!(HyperParams::new().to_string(), "defaults");
    }

    #[test]
    fn test_fit_dispatch_every_family() {
        let (x, y) = toy_data();
        for kind in ModelKind::ALL {
            let params = kind.grid().expand().into_iter().next().unwrap();
            let model = kind
                .fit(&params, &x, &y, 42)
                .unwrap_or_else(|e| panic!("{} failed: {}", kind, e));
            assert_eq!(model.kind(), kind);

            let preds = model.predict(&x).unwrap();
            assert_eq!(preds.len(), x.nrows());
            assert!(preds.iter().all(|&p| p == 0.0 || p == 1.0));
        }
    }

    #[test]
    fn test_kind_round_trips_through_name() {
        for kind in ModelKind::ALL {
            let parsed: ModelKind = kind.name().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("mystery_model".parse::<ModelKind>().is_err());
    }
}
