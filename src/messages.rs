//! Display copy
//!
//! Lookup tables keyed by audience mode. Nothing here feeds back into the
//! numeric computation: a `Prediction` goes in, text comes out.

use serde::{Deserialize, Serialize};

use crate::error::{AssessError, Fault};
use crate::types::{Categorical, ChestPainType, Prediction, RestingEcg, StSlope, Thalassemia};

/// Audience the copy is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceMode {
    /// Plain single-audience page
    #[default]
    Standard,
    Professional,
    Patient,
    Family,
}

impl AudienceMode {
    pub const ALL: [AudienceMode; 4] = [
        AudienceMode::Standard,
        AudienceMode::Professional,
        AudienceMode::Patient,
        AudienceMode::Family,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudienceMode::Standard => "standard",
            AudienceMode::Professional => "professional",
            AudienceMode::Patient => "patient",
            AudienceMode::Family => "family",
        }
    }

    /// Page heading
    pub fn title(&self) -> &'static str {
        match self {
            AudienceMode::Standard => "Heart Disease Predictor",
            AudienceMode::Professional => "Heart Disease Risk Assessment (Clinical)",
            AudienceMode::Patient => "Check Your Heart Disease Risk",
            AudienceMode::Family => "Check a Family Member's Heart Disease Risk",
        }
    }

    /// Introductory line under the heading
    pub fn intro(&self) -> &'static str {
        match self {
            AudienceMode::Standard => {
                "Provide patient details to estimate the risk of heart disease."
            }
            AudienceMode::Professional => {
                "Enter the patient's clinical findings to obtain a model-based risk estimate."
            }
            AudienceMode::Patient => {
                "Answer a few questions about your health to see an estimate of your risk."
            }
            AudienceMode::Family => {
                "Enter your family member's details to see an estimate of their risk."
            }
        }
    }
}

/// Render the result message for a prediction.
///
/// Always includes the probability as a percentage with two decimals.
pub fn render(prediction: &Prediction, mode: AudienceMode) -> String {
    let pct = prediction.percent();
    match (prediction.label, mode) {
        (true, AudienceMode::Standard) => {
            format!("⚠️ High risk of heart disease detected. (Probability: {}%)", pct)
        }
        (false, AudienceMode::Standard) => {
            format!("✅ No heart disease detected. (Probability: {}%)", pct)
        }
        (true, AudienceMode::Professional) => format!(
            "Positive classification for heart disease. Model probability: {}%. \
             Consider further diagnostic evaluation.",
            pct
        ),
        (false, AudienceMode::Professional) => format!(
            "Negative classification for heart disease. Model probability: {}%.",
            pct
        ),
        (true, AudienceMode::Patient) => format!(
            "Your answers suggest a higher risk of heart disease (estimated {}%). \
             Please talk to your doctor.",
            pct
        ),
        (false, AudienceMode::Patient) => format!(
            "Your answers suggest a lower risk of heart disease (estimated {}%). \
             Keep up your healthy habits.",
            pct
        ),
        (true, AudienceMode::Family) => format!(
            "The details suggest your family member may have a higher risk of heart disease \
             (estimated {}%). Encourage them to see a doctor.",
            pct
        ),
        (false, AudienceMode::Family) => format!(
            "The details suggest your family member has a lower risk of heart disease \
             (estimated {}%).",
            pct
        ),
    }
}

/// Rejection copy: client faults ask for a re-check, server faults do not
pub fn rejection(error: &AssessError) -> String {
    match error.fault() {
        Fault::Client => format!("Please re-check your inputs: {}", error),
        Fault::Server => {
            "The service is temporarily unavailable. Please try again later.".to_string()
        }
    }
}

/// Fields shown on the assessment form, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Age,
    Sex,
    ChestPainType,
    RestingBloodPressure,
    Cholesterol,
    FastingBloodSugarHigh,
    RestingEcg,
    MaxHeartRate,
    ExerciseAngina,
    StDepression,
    StSlope,
    MajorVessels,
    Thalassemia,
}

impl FormField {
    pub const ALL: [FormField; 13] = [
        FormField::Age,
        FormField::Sex,
        FormField::ChestPainType,
        FormField::RestingBloodPressure,
        FormField::Cholesterol,
        FormField::FastingBloodSugarHigh,
        FormField::RestingEcg,
        FormField::MaxHeartRate,
        FormField::ExerciseAngina,
        FormField::StDepression,
        FormField::StSlope,
        FormField::MajorVessels,
        FormField::Thalassemia,
    ];

    /// RawInput field name
    pub fn key(&self) -> &'static str {
        match self {
            FormField::Age => "age",
            FormField::Sex => "sex",
            FormField::ChestPainType => ChestPainType::FIELD,
            FormField::RestingBloodPressure => "resting_blood_pressure",
            FormField::Cholesterol => "cholesterol",
            FormField::FastingBloodSugarHigh => "fasting_blood_sugar_high",
            FormField::RestingEcg => RestingEcg::FIELD,
            FormField::MaxHeartRate => "max_heart_rate",
            FormField::ExerciseAngina => "exercise_angina",
            FormField::StDepression => "st_depression",
            FormField::StSlope => StSlope::FIELD,
            FormField::MajorVessels => "major_vessels",
            FormField::Thalassemia => Thalassemia::FIELD,
        }
    }

    pub fn label(&self, mode: AudienceMode) -> &'static str {
        use AudienceMode::*;
        match (self, mode) {
            (FormField::Age, Standard | Professional) => "Age (years)",
            (FormField::Age, Patient) => "Your age",
            (FormField::Age, Family) => "Their age",

            (FormField::Sex, _) => "Sex",

            (FormField::ChestPainType, Standard | Professional) => "Chest Pain Type",
            (FormField::ChestPainType, Patient | Family) => "What kind of chest pain occurs?",

            (FormField::RestingBloodPressure, Standard | Professional) => {
                "Resting Blood Pressure (mm Hg)"
            }
            (FormField::RestingBloodPressure, Patient | Family) => {
                "Blood pressure at rest (top number)"
            }

            (FormField::Cholesterol, Standard | Professional) => "Serum Cholesterol (mg/dl)",
            (FormField::Cholesterol, Patient | Family) => "Cholesterol level (mg/dl)",

            (FormField::FastingBloodSugarHigh, Standard | Professional) => {
                "Fasting Blood Sugar > 120 mg/dl"
            }
            (FormField::FastingBloodSugarHigh, Patient | Family) => {
                "Is fasting blood sugar above 120 mg/dl?"
            }

            (FormField::RestingEcg, Standard | Professional) => "Resting ECG Results",
            (FormField::RestingEcg, Patient | Family) => "Resting heart tracing (ECG) result",

            (FormField::MaxHeartRate, Standard | Professional) => "Maximum Heart Rate Achieved",
            (FormField::MaxHeartRate, Patient | Family) => "Highest heart rate during exercise",

            (FormField::ExerciseAngina, Standard | Professional) => "Exercise Induced Angina",
            (FormField::ExerciseAngina, Patient | Family) => "Chest pain during exercise?",

            (FormField::StDepression, Standard) => "ST Depression (Oldpeak)",
            (FormField::StDepression, Professional) => {
                "ST Depression Induced by Exercise Relative to Rest (Oldpeak)"
            }
            (FormField::StDepression, Patient | Family) => "ST depression from the stress test",

            (FormField::StSlope, Standard | Professional) => "Slope of Peak Exercise ST Segment",
            (FormField::StSlope, Patient | Family) => "ST segment slope from the stress test",

            (FormField::MajorVessels, Standard | Professional) => {
                "Number of Major Vessels (0-3) Colored by Fluoroscopy"
            }
            (FormField::MajorVessels, Patient | Family) => {
                "Number of major vessels seen on the scan (0-3)"
            }

            (FormField::Thalassemia, _) => "Thalassemia",
        }
    }

    /// Option labels for choice fields, `(code, label)` in code order
    pub fn options(&self, mode: AudienceMode) -> Option<Vec<(u8, &'static str)>> {
        match self {
            FormField::Sex => Some(vec![(0, "Female"), (1, "Male")]),
            FormField::FastingBloodSugarHigh | FormField::ExerciseAngina => {
                Some(vec![(0, "No"), (1, "Yes")])
            }
            FormField::ChestPainType => Some(option_table::<ChestPainType>(mode)),
            FormField::RestingEcg => Some(option_table::<RestingEcg>(mode)),
            FormField::StSlope => Some(option_table::<StSlope>(mode)),
            FormField::Thalassemia => Some(option_table::<Thalassemia>(mode)),
            _ => None,
        }
    }
}

/// Display label of a categorical level for an audience
pub trait LevelLabel: Categorical {
    fn label(self, mode: AudienceMode) -> &'static str;
}

fn option_table<C: LevelLabel>(mode: AudienceMode) -> Vec<(u8, &'static str)> {
    C::levels()
        .iter()
        .map(|&level| (level.code(), level.label(mode)))
        .collect()
}

fn lay(mode: AudienceMode) -> bool {
    matches!(mode, AudienceMode::Patient | AudienceMode::Family)
}

impl LevelLabel for ChestPainType {
    fn label(self, mode: AudienceMode) -> &'static str {
        match (self, lay(mode)) {
            (ChestPainType::TypicalAngina, false) => "Typical Angina",
            (ChestPainType::TypicalAngina, true) => "Chest pain brought on by exertion",
            (ChestPainType::AtypicalAngina, false) => "Atypical Angina",
            (ChestPainType::AtypicalAngina, true) => {
                "Chest pain that is not clearly exertion-related"
            }
            (ChestPainType::NonAnginalPain, false) => "Non-anginal Pain",
            (ChestPainType::NonAnginalPain, true) => "Chest pain not related to the heart",
            (ChestPainType::Asymptomatic, false) => "Asymptomatic",
            (ChestPainType::Asymptomatic, true) => "No chest pain",
        }
    }
}

impl LevelLabel for RestingEcg {
    fn label(self, mode: AudienceMode) -> &'static str {
        match (self, lay(mode)) {
            (RestingEcg::Normal, _) => "Normal",
            (RestingEcg::StTWaveAbnormality, false) => "ST-T Wave Abnormality",
            (RestingEcg::StTWaveAbnormality, true) => "Some irregularity noted",
            (RestingEcg::LeftVentricularHypertrophy, false) => "Left Ventricular Hypertrophy",
            (RestingEcg::LeftVentricularHypertrophy, true) => "Thickened heart muscle noted",
        }
    }
}

impl LevelLabel for StSlope {
    fn label(self, mode: AudienceMode) -> &'static str {
        match (self, lay(mode)) {
            (StSlope::Upsloping, false) => "Upsloping",
            (StSlope::Upsloping, true) => "Rising",
            (StSlope::Flat, _) => "Flat",
            (StSlope::Downsloping, false) => "Downsloping",
            (StSlope::Downsloping, true) => "Falling",
        }
    }
}

impl LevelLabel for Thalassemia {
    fn label(self, mode: AudienceMode) -> &'static str {
        match (self, lay(mode)) {
            (Thalassemia::Normal, _) => "Normal",
            (Thalassemia::FixedDefect, false) => "Fixed Defect",
            (Thalassemia::FixedDefect, true) => "Permanent blood flow defect",
            (Thalassemia::ReversibleDefect, false) => "Reversible Defect",
            (Thalassemia::ReversibleDefect, true) => "Blood flow defect under stress",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_copy() {
        let low = Prediction {
            label: false,
            probability: 0.425,
        };
        assert_eq!(
            render(&low, AudienceMode::Standard),
            "✅ No heart disease detected. (Probability: 42.50%)"
        );

        let high = Prediction {
            label: true,
            probability: 0.8166666666666668,
        };
        assert_eq!(
            render(&high, AudienceMode::Standard),
            "⚠️ High risk of heart disease detected. (Probability: 81.67%)"
        );
    }

    #[test]
    fn test_every_mode_shows_percentage() {
        for mode in AudienceMode::ALL {
            for label in [true, false] {
                let p = Prediction {
                    label,
                    probability: 0.0712,
                };
                let text = render(&p, mode);
                assert!(text.contains("7.12%"), "{:?}/{}: {}", mode, label, text);
            }
        }
    }

    #[test]
    fn test_modes_differ_by_label() {
        let p = Prediction {
            label: true,
            probability: 0.9,
        };
        let q = Prediction { label: false, ..p };
        for mode in AudienceMode::ALL {
            assert_ne!(render(&p, mode), render(&q, mode));
        }
    }

    #[test]
    fn test_rejection_copy() {
        let client = AssessError::MissingField("age".to_string());
        assert_eq!(
            rejection(&client),
            "Please re-check your inputs: Missing required field: age"
        );

        let server = AssessError::StartupArtifactMissing {
            artifact: "model".to_string(),
            reason: "not found".to_string(),
        };
        assert!(rejection(&server).starts_with("The service is temporarily unavailable"));
    }

    #[test]
    fn test_option_tables() {
        let options = FormField::ChestPainType
            .options(AudienceMode::Standard)
            .unwrap();
        assert_eq!(
            options,
            vec![
                (0, "Typical Angina"),
                (1, "Atypical Angina"),
                (2, "Non-anginal Pain"),
                (3, "Asymptomatic"),
            ]
        );

        let options = FormField::Thalassemia.options(AudienceMode::Patient).unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[2].1, "Blood flow defect under stress");

        assert!(FormField::Age.options(AudienceMode::Family).is_none());
    }

    #[test]
    fn test_form_covers_every_input() {
        let keys: Vec<&str> = FormField::ALL.iter().map(|f| f.key()).collect();
        assert_eq!(keys.len(), 13);
        assert!(keys.contains(&"st_depression"));
        assert!(keys.contains(&"thalassemia"));
        assert_eq!(
            FormField::MaxHeartRate.label(AudienceMode::Professional),
            "Maximum Heart Rate Achieved"
        );
    }
}
