//! Core types for heart-risk
//!
//! Closed enumerations for the categorical clinical attributes and the
//! prediction produced by the inference adapter.

use serde::{Deserialize, Serialize};

/// A categorical attribute that is one-hot encoded as `<prefix>_<code>`
pub trait Categorical: Copy + Sized + 'static {
    /// Column family prefix used at training time
    const PREFIX: &'static str;
    /// RawInput field name carrying this attribute
    const FIELD: &'static str;

    /// Integer level as submitted by the form
    fn code(self) -> u8;

    /// Every level, in code order
    fn levels() -> &'static [Self];

    /// One-hot column name for this level
    fn column(self) -> String {
        format!("{}_{}", Self::PREFIX, self.code())
    }
}

/// Out-of-domain categorical code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} must be one of {allowed}, got {value}")]
pub struct LevelError {
    pub field: &'static str,
    pub allowed: &'static str,
    pub value: i64,
}

/// Chest pain type (`cp`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ChestPainType {
    TypicalAngina,
    AtypicalAngina,
    NonAnginalPain,
    Asymptomatic,
}

impl Categorical for ChestPainType {
    const PREFIX: &'static str = "cp";
    const FIELD: &'static str = "chest_pain_type";

    fn code(self) -> u8 {
        match self {
            ChestPainType::TypicalAngina => 0,
            ChestPainType::AtypicalAngina => 1,
            ChestPainType::NonAnginalPain => 2,
            ChestPainType::Asymptomatic => 3,
        }
    }

    fn levels() -> &'static [Self] {
        &[
            ChestPainType::TypicalAngina,
            ChestPainType::AtypicalAngina,
            ChestPainType::NonAnginalPain,
            ChestPainType::Asymptomatic,
        ]
    }
}

impl TryFrom<i64> for ChestPainType {
    type Error = LevelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChestPainType::TypicalAngina),
            1 => Ok(ChestPainType::AtypicalAngina),
            2 => Ok(ChestPainType::NonAnginalPain),
            3 => Ok(ChestPainType::Asymptomatic),
            _ => Err(LevelError {
                field: Self::FIELD,
                allowed: "0, 1, 2, 3",
                value,
            }),
        }
    }
}

impl From<ChestPainType> for i64 {
    fn from(v: ChestPainType) -> Self {
        v.code() as i64
    }
}

/// Resting electrocardiographic result (`restecg`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RestingEcg {
    Normal,
    StTWaveAbnormality,
    LeftVentricularHypertrophy,
}

impl Categorical for RestingEcg {
    const PREFIX: &'static str = "restecg";
    const FIELD: &'static str = "resting_ecg";

    fn code(self) -> u8 {
        match self {
            RestingEcg::Normal => 0,
            RestingEcg::StTWaveAbnormality => 1,
            RestingEcg::LeftVentricularHypertrophy => 2,
        }
    }

    fn levels() -> &'static [Self] {
        &[
            RestingEcg::Normal,
            RestingEcg::StTWaveAbnormality,
            RestingEcg::LeftVentricularHypertrophy,
        ]
    }
}

impl TryFrom<i64> for RestingEcg {
    type Error = LevelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RestingEcg::Normal),
            1 => Ok(RestingEcg::StTWaveAbnormality),
            2 => Ok(RestingEcg::LeftVentricularHypertrophy),
            _ => Err(LevelError {
                field: Self::FIELD,
                allowed: "0, 1, 2",
                value,
            }),
        }
    }
}

impl From<RestingEcg> for i64 {
    fn from(v: RestingEcg) -> Self {
        v.code() as i64
    }
}

/// Slope of the peak exercise ST segment (`slope`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum StSlope {
    Upsloping,
    Flat,
    Downsloping,
}

impl Categorical for StSlope {
    const PREFIX: &'static str = "slope";
    const FIELD: &'static str = "st_slope";

    fn code(self) -> u8 {
        match self {
            StSlope::Upsloping => 0,
            StSlope::Flat => 1,
            StSlope::Downsloping => 2,
        }
    }

    fn levels() -> &'static [Self] {
        &[StSlope::Upsloping, StSlope::Flat, StSlope::Downsloping]
    }
}

impl TryFrom<i64> for StSlope {
    type Error = LevelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StSlope::Upsloping),
            1 => Ok(StSlope::Flat),
            2 => Ok(StSlope::Downsloping),
            _ => Err(LevelError {
                field: Self::FIELD,
                allowed: "0, 1, 2",
                value,
            }),
        }
    }
}

impl From<StSlope> for i64 {
    fn from(v: StSlope) -> Self {
        v.code() as i64
    }
}

/// Thalassemia (`thal`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Thalassemia {
    Normal,
    FixedDefect,
    ReversibleDefect,
}

impl Categorical for Thalassemia {
    const PREFIX: &'static str = "thal";
    const FIELD: &'static str = "thalassemia";

    fn code(self) -> u8 {
        match self {
            Thalassemia::Normal => 0,
            Thalassemia::FixedDefect => 1,
            Thalassemia::ReversibleDefect => 2,
        }
    }

    fn levels() -> &'static [Self] {
        &[
            Thalassemia::Normal,
            Thalassemia::FixedDefect,
            Thalassemia::ReversibleDefect,
        ]
    }
}

impl TryFrom<i64> for Thalassemia {
    type Error = LevelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Thalassemia::Normal),
            1 => Ok(Thalassemia::FixedDefect),
            2 => Ok(Thalassemia::ReversibleDefect),
            _ => Err(LevelError {
                field: Self::FIELD,
                allowed: "0, 1, 2",
                value,
            }),
        }
    }
}

impl From<Thalassemia> for i64 {
    fn from(v: Thalassemia) -> Self {
        v.code() as i64
    }
}

/// Classifier output for a single assessment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// True when the classifier reports disease risk
    pub label: bool,
    /// P(label = true), in [0, 1]
    pub probability: f64,
}

impl Prediction {
    /// Probability as a percentage string with two decimals, e.g. "42.50"
    pub fn percent(&self) -> String {
        format!("{:.2}", self.probability * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_one_hot_columns() {
        assert_eq!(ChestPainType::NonAnginalPain.column(), "cp_2");
        assert_eq!(RestingEcg::Normal.column(), "restecg_0");
        assert_eq!(StSlope::Downsloping.column(), "slope_2");
        assert_eq!(Thalassemia::FixedDefect.column(), "thal_1");
    }

    #[test]
    fn test_levels_round_trip_codes() {
        for (i, level) in ChestPainType::levels().iter().enumerate() {
            assert_eq!(level.code() as usize, i);
            assert_eq!(ChestPainType::try_from(i as i64).unwrap(), *level);
        }
        assert_eq!(Thalassemia::levels().len(), 3);
    }

    #[test]
    fn test_out_of_domain_level() {
        let err = Thalassemia::try_from(3).unwrap_err();
        assert_eq!(err.to_string(), "thalassemia must be one of 0, 1, 2, got 3");

        let parsed: Result<StSlope, _> = serde_json::from_str("7");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_prediction_percent() {
        let p = Prediction {
            label: false,
            probability: 0.425,
        };
        assert_eq!(p.percent(), "42.50");

        let p = Prediction {
            label: true,
            probability: 0.816_666_666,
        };
        assert_eq!(p.percent(), "81.67");
    }
}
