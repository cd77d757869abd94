//! Pre-trained regression models.
//!
//! Models are exported from the training environment as JSON. Tree ensembles use
//! the flat array layout of a fitted decision tree: node `i` is a leaf when
//! `children_left[i] == -1`, otherwise a sample goes to `children_left[i]` when
//! `x[feature[i]] <= threshold[i]` and to `children_right[i]` otherwise.

use log::info;
use serde::Deserialize;
use std::path::Path;

use crate::error::ModelError;

/// Anything that maps one ordered feature vector to a price estimate.
pub trait Regressor: Send + Sync {
    /// Input width the model was fitted with.
    fn n_features(&self) -> usize;

    /// Column names recorded at training time, when the artifact carries them.
    fn feature_names(&self) -> Option<&[String]>;

    fn predict(&self, inputs: &[f64]) -> Result<f64, ModelError>;

    fn describe(&self) -> String;

    /// Structural checks that `predict` relies on.
    fn validate(&self) -> Result<(), ModelError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegressionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

/// Mean of independently grown trees.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

/// `init + learning_rate * sum(tree outputs)`.
#[derive(Debug, Clone, Deserialize)]
pub struct GradientBoosting {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub n_features: usize,
    pub init: f64,
    pub learning_rate: f64,
    pub trees: Vec<RegressionTree>,
}

impl RegressionTree {
    fn validate(&self, index: usize, n_features: usize) -> Result<(), ModelError> {
        let malformed = |reason: String| ModelError::MalformedTree {
            tree: index,
            reason,
        };

        let n = self.value.len();
        if n == 0 {
            return Err(malformed("tree has no nodes".to_string()));
        }
        if [
            self.children_left.len(),
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(malformed("node arrays differ in length".to_string()));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left < 0 {
                continue;
            }
            // children always come after their parent, so traversal terminates
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(malformed(format!("node {node} has invalid child {child}")));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature >= n_features as i64 {
                return Err(malformed(format!(
                    "node {node} splits on feature {feature} of {n_features}"
                )));
            }
        }
        Ok(())
    }

    fn predict(&self, index: usize, inputs: &[f64]) -> Result<f64, ModelError> {
        let broken = |node: usize| ModelError::MalformedTree {
            tree: index,
            reason: format!("traversal left the tree at node {node}"),
        };
        let mut node = 0usize;
        // each step moves to a higher index, so at most `value.len()` steps
        for _ in 0..self.value.len() {
            let left = *self.children_left.get(node).ok_or_else(|| broken(node))?;
            if left < 0 {
                return self.value.get(node).copied().ok_or_else(|| broken(node));
            }
            let feature = *self.feature.get(node).ok_or_else(|| broken(node))?;
            let threshold = *self.threshold.get(node).ok_or_else(|| broken(node))?;
            let right = *self.children_right.get(node).ok_or_else(|| broken(node))?;
            // fitted trees see inputs at single precision
            let x = usize::try_from(feature)
                .ok()
                .and_then(|f| inputs.get(f))
                .copied()
                .ok_or_else(|| broken(node))? as f32 as f64;
            let next = if x <= threshold { left } else { right };
            node = match usize::try_from(next) {
                Ok(next) if next > node => next,
                _ => return Err(broken(node)),
            };
        }
        Err(broken(node))
    }
}

fn sum_trees(trees: &[RegressionTree], inputs: &[f64]) -> Result<f64, ModelError> {
    trees
        .iter()
        .enumerate()
        .map(|(i, tree)| tree.predict(i, inputs))
        .sum()
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ModelArtifact =
            serde_json::from_str(&text).map_err(|source| ModelError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        artifact.validate()?;
        info!("Loaded {} from {:?}", artifact.describe(), path);
        Ok(artifact)
    }
}

impl Regressor for ModelArtifact {
    fn n_features(&self) -> usize {
        match self {
            ModelArtifact::Linear(model) => model.coefficients.len(),
            ModelArtifact::RandomForest(model) => model.n_features,
            ModelArtifact::GradientBoosting(model) => model.n_features,
        }
    }

    fn feature_names(&self) -> Option<&[String]> {
        match self {
            ModelArtifact::Linear(model) => model.feature_names.as_deref(),
            ModelArtifact::RandomForest(model) => model.feature_names.as_deref(),
            ModelArtifact::GradientBoosting(model) => model.feature_names.as_deref(),
        }
    }

    fn predict(&self, inputs: &[f64]) -> Result<f64, ModelError> {
        if inputs.len() != self.n_features() {
            return Err(ModelError::WidthMismatch {
                expected: self.n_features(),
                actual: inputs.len(),
            });
        }

        let prediction = match self {
            ModelArtifact::Linear(model) => {
                model.intercept
                    + model
                        .coefficients
                        .iter()
                        .zip(inputs)
                        .map(|(w, x)| w * x)
                        .sum::<f64>()
            }
            ModelArtifact::RandomForest(model) => {
                sum_trees(&model.trees, inputs)? / model.trees.len() as f64
            }
            ModelArtifact::GradientBoosting(model) => {
                model.init + model.learning_rate * sum_trees(&model.trees, inputs)?
            }
        };

        if prediction.is_finite() {
            Ok(prediction)
        } else {
            Err(ModelError::NonFinite)
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        let n_features = self.n_features();
        if let Some(names) = self.feature_names() {
            if names.len() != n_features {
                return Err(ModelError::WidthMismatch {
                    expected: n_features,
                    actual: names.len(),
                });
            }
        }
        match self {
            ModelArtifact::Linear(_) => Ok(()),
            ModelArtifact::RandomForest(RandomForest { trees, .. })
            | ModelArtifact::GradientBoosting(GradientBoosting { trees, .. }) => {
                if trees.is_empty() {
                    return Err(ModelError::MalformedTree {
                        tree: 0,
                        reason: "ensemble has no trees".to_string(),
                    });
                }
                trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, tree)| tree.validate(i, n_features))
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            ModelArtifact::Linear(model) => {
                format!("linear model ({} coefficients)", model.coefficients.len())
            }
            ModelArtifact::RandomForest(model) => {
                format!("random forest ({} trees)", model.trees.len())
            }
            ModelArtifact::GradientBoosting(model) => {
                format!("gradient boosting ({} trees)", model.trees.len())
            }
        }
    }
}

/// Loads a model file, picking the backend by extension.
pub fn load_regressor(path: &Path, n_inputs: usize) -> Result<Box<dyn Regressor>, ModelError> {
    if path.extension().is_some_and(|ext| ext == "onnx") {
        return load_onnx(path, n_inputs);
    }
    Ok(Box::new(ModelArtifact::load(path)?))
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path, n_inputs: usize) -> Result<Box<dyn Regressor>, ModelError> {
    Ok(Box::new(onnx::OnnxModel::load(path, n_inputs)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path, _n_inputs: usize) -> Result<Box<dyn Regressor>, ModelError> {
    Err(ModelError::OnnxDisabled(path.to_path_buf()))
}

#[cfg(feature = "onnx")]
mod onnx {
    use log::info;
    use onnxruntime::environment::Environment;
    use onnxruntime::ndarray::Array2;
    use onnxruntime::session::Session;
    use onnxruntime::tensor::OrtOwnedTensor;
    use onnxruntime::{GraphOptimizationLevel, LoggingLevel};
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};

    use super::Regressor;
    use crate::error::ModelError;

    /// A `[1, n]` float32 ONNX regressor with one session for the process.
    pub struct OnnxModel {
        session: Mutex<Session<'static>>,
        model_path: PathBuf,
        n_features: usize,
    }

    impl OnnxModel {
        pub fn load(path: &Path, n_features: usize) -> Result<Self, ModelError> {
            // sessions borrow the environment, which lives as long as the process
            let environment: &'static Environment = Box::leak(Box::new(
                Environment::builder()
                    .with_name("stock_price_inference")
                    .with_log_level(LoggingLevel::Warning)
                    .build()?,
            ));
            let session = environment
                .new_session_builder()?
                .with_optimization_level(GraphOptimizationLevel::Basic)?
                .with_number_threads(1)?
                .with_model_from_file(path)?;
            info!("Loaded ONNX model from {:?}", path);
            Ok(Self {
                session: Mutex::new(session),
                model_path: path.to_path_buf(),
                n_features,
            })
        }
    }

    impl Regressor for OnnxModel {
        fn n_features(&self) -> usize {
            self.n_features
        }

        fn feature_names(&self) -> Option<&[String]> {
            None
        }

        fn predict(&self, inputs: &[f64]) -> Result<f64, ModelError> {
            let input: Vec<f32> = inputs.iter().map(|&v| v as f32).collect();
            let array = Array2::from_shape_vec((1, input.len()), input).map_err(|_| {
                ModelError::WidthMismatch {
                    expected: self.n_features,
                    actual: inputs.len(),
                }
            })?;
            let mut session = self.session.lock();
            let outputs: Vec<OrtOwnedTensor<f32, _>> = session.run(vec![array])?;
            let value = outputs
                .first()
                .and_then(|tensor| tensor.iter().next().copied())
                .ok_or(ModelError::EmptyOutput)?;
            let value = value as f64;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(ModelError::NonFinite)
            }
        }

        fn describe(&self) -> String {
            format!("ONNX model {:?}", self.model_path)
        }
    }
}
