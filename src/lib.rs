//! heart-risk - Feature assembly and inference for a pre-trained heart disease classifier
//!
//! A request flows through a deterministic pipeline: form values → range
//! check → schema-aligned feature vector → fitted scaler → classifier →
//! audience-specific message.
//!
//! ## Modules
//!
//! - **Assessment core**: `schema`, `features`, `scaler`, `model`, `pipeline`
//! - **Startup**: `artifacts`, `config`
//! - **Presentation**: `messages`, `encoder`

pub mod artifacts;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod messages;
pub mod model;
pub mod pipeline;
pub mod scaler;
pub mod schema;
pub mod types;

pub use artifacts::{ArtifactPaths, Artifacts};
pub use config::Config;
pub use error::{AssessError, Fault};
pub use features::{assemble, CategoryPolicy, FeatureAssembler, FeatureVector};
pub use messages::{render, AudienceMode};
pub use pipeline::{predict, RiskEngine, RiskService};
pub use schema::{FeatureSchema, InputAdapter, RawInput, INPUT_SCHEMA_VERSION};
pub use types::Prediction;

/// Crate version embedded in all reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "heart-risk";
