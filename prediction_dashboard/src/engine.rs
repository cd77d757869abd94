use feature_processing::misc::{FeatureName, FeatureRow};
use log::{debug, info};
use std::collections::HashSet;
use std::path::Path;

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::model::{Regressor, load_regressor};

/// The ordered feature list a model was trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<FeatureName>,
}

impl FeatureSchema {
    pub fn new(names: Vec<FeatureName>) -> Result<Self, ModelError> {
        if names.is_empty() {
            return Err(ModelError::EmptySchema);
        }
        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|name| !seen.insert(**name)) {
            return Err(ModelError::DuplicateFeature(dup.to_string()));
        }
        Ok(Self { names })
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ModelError> {
        let names = names
            .iter()
            .map(|name| name.as_ref().parse::<FeatureName>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(names)
    }

    /// Reads a JSON array of column names.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let names: Vec<String> = serde_json::from_str(&text).map_err(|source| ModelError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let schema = Self::from_names(&names)?;
        info!("Loaded {} feature names from {:?}", schema.len(), path);
        Ok(schema)
    }

    pub fn names(&self) -> &[FeatureName] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Read-only prediction handle: the model plus the feature order it expects.
/// Built once at startup and shared by every invocation.
pub struct InferenceEngine {
    schema: FeatureSchema,
    model: Box<dyn Regressor>,
}

impl InferenceEngine {
    pub fn new(schema: FeatureSchema, model: Box<dyn Regressor>) -> Result<Self, ModelError> {
        model.validate()?;
        if model.n_features() != schema.len() {
            return Err(ModelError::WidthMismatch {
                expected: model.n_features(),
                actual: schema.len(),
            });
        }
        if let Some(trained) = model.feature_names() {
            let listed: Vec<&str> = schema.names().iter().map(|n| n.as_str()).collect();
            if trained.iter().map(String::as_str).ne(listed.iter().copied()) {
                return Err(ModelError::FeatureMismatch {
                    expected: trained.to_vec(),
                    actual: listed.into_iter().map(str::to_string).collect(),
                });
            }
        }
        Ok(Self { schema, model })
    }

    pub fn load(config: &ModelConfig) -> Result<Self, ModelError> {
        let schema = FeatureSchema::load(&config.features_path)?;
        let model = load_regressor(&config.artifact_path, schema.len())?;
        let engine = Self::new(schema, model)?;
        info!(
            "Inference engine ready: {} over {} features",
            engine.model.describe(),
            engine.schema.len()
        );
        Ok(engine)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn describe(&self) -> String {
        self.model.describe()
    }

    /// Next-day price estimate for one feature row.
    pub fn predict(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        let inputs = row.select(self.schema.names());
        let prediction = self.model.predict(&inputs)?;
        debug!("Prediction for {}: {:.4}", row.date, prediction);
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinearModel, ModelArtifact, RandomForest, RegressionTree};

    fn linear(names: Option<&[&str]>, coefficients: Vec<f64>) -> Box<dyn Regressor> {
        Box::new(ModelArtifact::Linear(LinearModel {
            feature_names: names.map(|n| n.iter().map(|s| s.to_string()).collect()),
            coefficients,
            intercept: 0.0,
        }))
    }

    #[test]
    fn schema_rejects_unknown_and_duplicate_names() {
        assert!(matches!(
            FeatureSchema::from_names(&["Close", "Momentum"]),
            Err(ModelError::UnknownFeature(_))
        ));
        assert!(matches!(
            FeatureSchema::from_names(&["Close", "Close"]),
            Err(ModelError::DuplicateFeature(_))
        ));
        assert!(matches!(
            FeatureSchema::from_names::<&str>(&[]),
            Err(ModelError::EmptySchema)
        ));
    }

    #[test]
    fn engine_rejects_reordered_features() {
        let schema = FeatureSchema::from_names(&["Close", "RSI"]).unwrap();
        let model = linear(Some(&["RSI", "Close"]), vec![1.0, 1.0]);
        assert!(matches!(
            InferenceEngine::new(schema, model),
            Err(ModelError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn engine_rejects_width_mismatch() {
        let schema = FeatureSchema::from_names(&["Close", "RSI", "MA_5"]).unwrap();
        let model = linear(None, vec![1.0, 1.0]);
        assert!(matches!(
            InferenceEngine::new(schema, model),
            Err(ModelError::WidthMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn engine_validates_models_built_in_code() {
        let schema = FeatureSchema::from_names(&["Close"]).unwrap();
        let dangling = RegressionTree {
            children_left: vec![1, -1],
            children_right: vec![7, -1],
            feature: vec![0, -2],
            threshold: vec![1.0, -2.0],
            value: vec![0.0, 1.0],
        };
        let model = Box::new(ModelArtifact::RandomForest(RandomForest {
            feature_names: None,
            n_features: 1,
            trees: vec![dangling],
        }));
        assert!(matches!(
            InferenceEngine::new(schema, model),
            Err(ModelError::MalformedTree { tree: 0, .. })
        ));
    }

    #[test]
    fn schema_loads_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        std::fs::write(&path, r#"["Open", "Close_Lag_5", "BB_Lower"]"#).unwrap();
        let schema = FeatureSchema::load(&path).unwrap();
        assert_eq!(
            schema.names(),
            [FeatureName::Open, FeatureName::CloseLag5, FeatureName::BbLower]
        );
    }
}
