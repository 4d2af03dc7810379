//! Raw patient measurements as received from the front end

use serde::{Deserialize, Serialize};

/// One patient's eight clinical measurements, unvalidated.
///
/// Field names follow the Pima diabetes dataset columns; snake_case
/// spellings are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    /// Number of pregnancies
    #[serde(rename = "Pregnancies", alias = "pregnancies")]
    pub pregnancies: f64,

    /// Plasma glucose concentration (mg/dL)
    #[serde(rename = "Glucose", alias = "glucose")]
    pub glucose: f64,

    /// Diastolic blood pressure (mm Hg)
    #[serde(rename = "BloodPressure", alias = "blood_pressure")]
    pub blood_pressure: f64,

    /// Triceps skin fold thickness (mm)
    #[serde(rename = "SkinThickness", alias = "skin_thickness")]
    pub skin_thickness: f64,

    /// 2-hour serum insulin (mu U/ml)
    #[serde(rename = "Insulin", alias = "insulin")]
    pub insulin: f64,

    /// Body mass index
    #[serde(rename = "BMI", alias = "bmi")]
    pub bmi: f64,

    /// Diabetes pedigree function
    #[serde(rename = "DiabetesPedigreeFunction", alias = "diabetes_pedigree_function")]
    pub diabetes_pedigree_function: f64,

    /// Age in years
    #[serde(rename = "Age", alias = "age")]
    pub age: f64,
}

impl PatientInput {
    /// Create an input from the eight measurements in canonical order
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pregnancies: f64,
        glucose: f64,
        blood_pressure: f64,
        skin_thickness: f64,
        insulin: f64,
        bmi: f64,
        diabetes_pedigree_function: f64,
        age: f64,
    ) -> Self {
        Self {
            pregnancies,
            glucose,
            blood_pressure,
            skin_thickness,
            insulin,
            bmi,
            diabetes_pedigree_function,
            age,
        }
    }
}
