//! Pipeline orchestration
//!
//! This module provides the public API for heart-risk. It runs one request
//! from raw form values to a `Prediction`:
//! 1. RawInput::validate - optional boundary range check
//! 2. FeatureAssembler - schema-aligned feature vector
//! 3. Scaler - fitted transform
//! 4. Classifier - label and probability from the same scaled row

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::artifacts::{check_compatible, Artifacts};
use crate::config::Config;
use crate::error::AssessError;
use crate::features::{CategoryPolicy, FeatureAssembler, FeatureVector};
use crate::model::Classifier;
use crate::scaler::Scaler;
use crate::schema::{FeatureSchema, RawInput};
use crate::types::Prediction;

/// Score one assembled vector.
///
/// The vector is checked against the scaler's width (and column names, when
/// the scaler recorded them), transformed once, and both `predict` and
/// `predict_proba` are evaluated on that same scaled row.
pub fn predict(
    vector: &FeatureVector<'_>,
    scaler: &dyn Scaler,
    model: &dyn Classifier,
) -> Result<Prediction, AssessError> {
    if vector.len() != scaler.n_features() {
        return Err(AssessError::dimension(
            "feature vector",
            scaler.n_features(),
            vector.len(),
        ));
    }
    if let Some(names) = scaler.feature_names() {
        if names != vector.names() {
            return Err(AssessError::dimension(
                "feature vector columns",
                names.join(","),
                vector.names().join(","),
            ));
        }
    }

    let scaled = scaler.transform(vector.values())?;
    if scaled.len() != model.n_features() {
        return Err(AssessError::dimension(
            "scaled vector",
            model.n_features(),
            scaled.len(),
        ));
    }

    let label = model.predict(&scaled)?;
    let probability = model.predict_proba(&scaled)?;

    Ok(Prediction { label, probability })
}

/// Loaded, immutable scoring state shared by all requests
pub struct RiskEngine {
    schema: FeatureSchema,
    scaler: Box<dyn Scaler>,
    model: Box<dyn Classifier>,
    assembler: FeatureAssembler,
    validate_ranges: bool,
}

impl RiskEngine {
    /// Build an engine from a checked artifact set
    pub fn new(artifacts: Artifacts, policy: CategoryPolicy) -> Self {
        Self {
            schema: artifacts.schema,
            scaler: Box::new(artifacts.scaler),
            model: Box::new(artifacts.model),
            assembler: FeatureAssembler::new(policy),
            validate_ranges: true,
        }
    }

    /// Build an engine from arbitrary scaler and classifier implementations
    pub fn from_parts(
        schema: FeatureSchema,
        scaler: Box<dyn Scaler>,
        model: Box<dyn Classifier>,
        policy: CategoryPolicy,
    ) -> Result<Self, AssessError> {
        check_compatible(&schema, scaler.as_ref(), model.as_ref())?;
        Ok(Self {
            schema,
            scaler,
            model,
            assembler: FeatureAssembler::new(policy),
            validate_ranges: true,
        })
    }

    /// Load artifacts named by `config` and build an engine
    pub fn load(config: &Config) -> Result<Self, AssessError> {
        let artifacts = Artifacts::load(&config.artifacts)?;
        Ok(Self::new(artifacts, config.unknown_category)
            .with_range_validation(config.validate_ranges))
    }

    /// Enable or disable the boundary range check
    pub fn with_range_validation(mut self, enabled: bool) -> Self {
        self.validate_ranges = enabled;
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Assemble the feature vector for a request without scoring it
    pub fn features<'a>(&'a self, raw: &RawInput) -> Result<FeatureVector<'a>, AssessError> {
        if self.validate_ranges {
            raw.validate()?;
        }
        self.assembler.assemble(raw, &self.schema)
    }

    /// Assess one request
    pub fn assess(&self, raw: &RawInput) -> Result<Prediction, AssessError> {
        let vector = self.features(raw)?;
        self.score(&vector)
    }

    /// Score an already assembled vector
    pub fn score(&self, vector: &FeatureVector<'_>) -> Result<Prediction, AssessError> {
        let prediction = predict(vector, self.scaler.as_ref(), self.model.as_ref())?;
        debug!(
            label = prediction.label,
            probability = prediction.probability,
            "scored request"
        );
        Ok(prediction)
    }
}

/// Startup gate around the engine.
///
/// Either fully initialized or refusing every request; there is no
/// partially loaded state.
#[derive(Clone)]
pub enum RiskService {
    Ready(Arc<RiskEngine>),
    Unavailable { artifact: String, reason: String },
}

impl RiskService {
    /// Load artifacts once and report the outcome
    pub fn start(config: &Config) -> Self {
        match RiskEngine::load(config) {
            Ok(engine) => {
                info!("risk service ready");
                RiskService::Ready(Arc::new(engine))
            }
            Err(e) => {
                error!(error = %e, "risk service failed to start");
                Self::unavailable(&e)
            }
        }
    }

    /// Wrap an already built engine
    pub fn ready(engine: RiskEngine) -> Self {
        RiskService::Ready(Arc::new(engine))
    }

    fn unavailable(e: &AssessError) -> Self {
        let artifact = match e {
            AssessError::StartupArtifactMissing { artifact, .. }
            | AssessError::InvalidArtifact { artifact, .. } => artifact.clone(),
            _ => "artifact set".to_string(),
        };
        RiskService::Unavailable {
            artifact,
            reason: e.to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RiskService::Ready(_))
    }

    /// Shared engine handle, or the startup error
    pub fn engine(&self) -> Result<&Arc<RiskEngine>, AssessError> {
        match self {
            RiskService::Ready(engine) => Ok(engine),
            RiskService::Unavailable { artifact, reason } => {
                Err(AssessError::StartupArtifactMissing {
                    artifact: artifact.clone(),
                    reason: reason.clone(),
                })
            }
        }
    }

    /// Assess one request, refusing it if startup failed
    pub fn assess(&self, raw: &RawInput) -> Result<Prediction, AssessError> {
        self.engine()?.assess(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::tests::bundled_paths;
    use crate::artifacts::ArtifactPaths;
    use crate::features::tests::{baseline_input, full_schema};
    use crate::model::{DecisionTree, LogisticRegression, RandomForest};
    use crate::scaler::StandardScaler;
    use crate::types::{Categorical, ChestPainType, RestingEcg, StSlope, Thalassemia};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::thread;

    fn bundled_engine() -> RiskEngine {
        RiskEngine::new(
            Artifacts::load(&bundled_paths()).unwrap(),
            CategoryPolicy::Baseline,
        )
    }

    fn high_risk_input() -> RawInput {
        RawInput {
            age: Some(60),
            sex: Some(1),
            resting_blood_pressure: Some(140),
            cholesterol: Some(280),
            fasting_blood_sugar_high: Some(0),
            max_heart_rate: Some(120),
            exercise_angina: Some(1),
            st_depression: Some(2.5),
            major_vessels: Some(2),
            chest_pain_type: Some(ChestPainType::Asymptomatic),
            resting_ecg: Some(RestingEcg::StTWaveAbnormality),
            st_slope: Some(StSlope::Flat),
            thalassemia: Some(Thalassemia::ReversibleDefect),
        }
    }

    /// Identity scaler over `n` columns
    struct Identity(usize);

    impl Scaler for Identity {
        fn n_features(&self) -> usize {
            self.0
        }

        fn transform(&self, x: &[f64]) -> Result<Vec<f64>, AssessError> {
            Ok(x.to_vec())
        }
    }

    /// Scaler that silently drops the last column
    struct Truncating(usize);

    impl Scaler for Truncating {
        fn n_features(&self) -> usize {
            self.0
        }

        fn transform(&self, x: &[f64]) -> Result<Vec<f64>, AssessError> {
            Ok(x[..x.len() - 1].to_vec())
        }
    }

    #[test]
    fn test_bundled_low_risk() {
        let engine = bundled_engine();
        let prediction = engine.assess(&baseline_input()).unwrap();

        assert!(!prediction.label);
        assert!((prediction.probability - 0.425).abs() < 1e-9);
    }

    #[test]
    fn test_bundled_high_risk() {
        let engine = bundled_engine();
        let prediction = engine.assess(&high_risk_input()).unwrap();

        assert!(prediction.label);
        assert!((prediction.probability - 2.45 / 3.0).abs() < 1e-9);
        assert_eq!(prediction.percent(), "81.67");
    }

    #[test]
    fn test_predict_is_deterministic() {
        let engine = bundled_engine();
        let vector = engine.features(&high_risk_input()).unwrap();

        let a = engine.score(&vector).unwrap();
        let b = engine.score(&vector).unwrap();
        assert_eq!(a.label, b.label);
        assert_eq!(a.probability.to_bits(), b.probability.to_bits());
    }

    #[test]
    fn test_probability_bounds_and_label_consistency() {
        let engine = bundled_engine();
        for &cp in ChestPainType::levels() {
            for &thal in Thalassemia::levels() {
                for vessels in 0..=3 {
                    for angina in 0..=1 {
                        let raw = RawInput {
                            chest_pain_type: Some(cp),
                            thalassemia: Some(thal),
                            major_vessels: Some(vessels),
                            exercise_angina: Some(angina),
                            ..baseline_input()
                        };
                        let p = engine.assess(&raw).unwrap();
                        assert!((0.0..=1.0).contains(&p.probability));
                        assert_eq!(p.label, p.probability > 0.5);
                    }
                }
            }
        }
    }

    #[test]
    fn test_label_and_probability_share_scaled_row() {
        let schema = full_schema();
        let n = schema.len();
        // z = age - 50: exactly 0.5 at age 50, just above at age 51
        let mut coef = vec![0.0; n];
        coef[0] = 1.0;
        let engine = RiskEngine::from_parts(
            schema,
            Box::new(Identity(n)),
            Box::new(LogisticRegression {
                coef,
                intercept: -50.0,
            }),
            CategoryPolicy::Baseline,
        )
        .unwrap();

        let at = engine.assess(&baseline_input()).unwrap();
        assert_eq!(at.probability, 0.5);
        assert!(!at.label);

        let above = engine
            .assess(&RawInput {
                age: Some(51),
                ..baseline_input()
            })
            .unwrap();
        assert!(above.probability > 0.5);
        assert!(above.label);
    }

    #[test]
    fn test_malformed_injected_forest_is_rejected_not_panicking() {
        let schema = full_schema();
        let n = schema.len();
        let forest = RandomForest {
            n_features: n,
            trees: vec![DecisionTree {
                children_left: vec![1, -1, -1],
                children_right: vec![2, -1, -1],
                feature: vec![99, -2, -2],
                threshold: vec![0.0, -2.0, -2.0],
                value: vec![[1.0, 1.0], [1.0, 0.0], [0.0, 1.0]],
            }],
        };
        let engine = RiskEngine::from_parts(
            schema,
            Box::new(Identity(n)),
            Box::new(forest),
            CategoryPolicy::Baseline,
        )
        .unwrap();

        match engine.assess(&baseline_input()) {
            Err(e @ AssessError::InvalidModelOutput(_)) => assert!(!e.is_client_error()),
            other => panic!("expected InvalidModelOutput, got {:?}", other),
        }
        // the engine keeps serving
        assert!(engine.assess(&high_risk_input()).is_err());
    }

    #[test]
    fn test_vector_width_mismatch() {
        let schema = full_schema();
        let vector = engine_vector(&schema);
        let scaler = Identity(schema.len() + 1);
        let model = LogisticRegression {
            coef: vec![0.0; schema.len() + 1],
            intercept: 0.0,
        };

        match predict(&vector, &scaler, &model) {
            Err(AssessError::DimensionMismatch { context, .. }) => {
                assert_eq!(context, "feature vector")
            }
            other => panic!("expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_scaled_width_mismatch_is_not_padded() {
        let schema = full_schema();
        let vector = engine_vector(&schema);
        let model = LogisticRegression {
            coef: vec![0.0; schema.len()],
            intercept: 0.0,
        };

        match predict(&vector, &Truncating(schema.len()), &model) {
            Err(AssessError::DimensionMismatch { context, .. }) => {
                assert_eq!(context, "scaled vector")
            }
            other => panic!("expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_column_order_mismatch() {
        let schema = full_schema();
        let vector = engine_vector(&schema);
        let mut names: Vec<String> = schema.columns().to_vec();
        names.swap(0, 1);
        let scaler = StandardScaler {
            mean: vec![0.0; schema.len()],
            scale: vec![1.0; schema.len()],
            with_mean: true,
            with_std: true,
            feature_names_in: Some(names),
        };
        let model = LogisticRegression {
            coef: vec![0.0; schema.len()],
            intercept: 0.0,
        };

        assert!(matches!(
            predict(&vector, &scaler, &model),
            Err(AssessError::DimensionMismatch { .. })
        ));
    }

    fn engine_vector(schema: &FeatureSchema) -> FeatureVector<'_> {
        FeatureAssembler::default()
            .assemble(&baseline_input(), schema)
            .unwrap()
    }

    #[test]
    fn test_range_validation_toggle() {
        let raw = RawInput {
            age: Some(120),
            ..baseline_input()
        };

        let engine = bundled_engine();
        assert!(matches!(
            engine.assess(&raw),
            Err(AssessError::InvalidInput { .. })
        ));

        let engine = bundled_engine().with_range_validation(false);
        let p = engine.assess(&raw).unwrap();
        assert!((0.0..=1.0).contains(&p.probability));
    }

    #[test]
    fn test_missing_field_is_isolated() {
        let service = RiskService::ready(bundled_engine());
        let bad = RawInput {
            age: None,
            ..baseline_input()
        };

        assert!(matches!(
            service.assess(&bad),
            Err(AssessError::MissingField(_))
        ));
        // later requests are unaffected
        assert!(service.assess(&baseline_input()).is_ok());
    }

    #[test]
    fn test_service_refuses_when_artifacts_missing() {
        let config = Config {
            artifacts: ArtifactPaths {
                scaler: PathBuf::from("/nonexistent/heart_scaler.json"),
                ..bundled_paths()
            },
            ..Config::default()
        };

        let service = RiskService::start(&config);
        assert!(!service.is_ready());

        for raw in [baseline_input(), high_risk_input(), RawInput::default()] {
            match service.assess(&raw) {
                Err(AssessError::StartupArtifactMissing { artifact, .. }) => {
                    assert_eq!(artifact, "scaler")
                }
                other => panic!("expected StartupArtifactMissing, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_service_starts_from_config() {
        let config = Config {
            artifacts: bundled_paths(),
            ..Config::default()
        };
        let service = RiskService::start(&config);
        assert!(service.is_ready());
        assert_eq!(service.engine().unwrap().schema().len(), 23);
    }

    #[test]
    fn test_shared_engine_across_threads() {
        let service = RiskService::ready(bundled_engine());
        let expected = service.assess(&high_risk_input()).unwrap();

        thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let service = service.clone();
                    s.spawn(move || {
                        let raw = if i % 2 == 0 {
                            high_risk_input()
                        } else {
                            baseline_input()
                        };
                        (i, service.assess(&raw).unwrap())
                    })
                })
                .collect();

            for handle in handles {
                let (i, p) = handle.join().unwrap();
                if i % 2 == 0 {
                    assert_eq!(p, expected);
                } else {
                    assert!(!p.label);
                }
            }
        });
    }
}
