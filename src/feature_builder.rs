//! Feature vector assembly for diabetes model inference.
//!
//! Builds the eight-feature vector in the exact column order used when the
//! classifier was trained, after validating the raw measurements.

use crate::error::{PredictorError, Result};
use crate::types::patient::PatientInput;

/// Number of features the classifier consumes
pub const FEATURE_COUNT: usize = 8;

/// Feature names in trained column order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Pregnancies",
    "Glucose",
    "BloodPressure",
    "SkinThickness",
    "Insulin",
    "BMI",
    "DiabetesPedigreeFunction",
    "Age",
];

/// snake_case spellings accepted at the mapping boundary, same order
const FEATURE_ALIASES: [&str; FEATURE_COUNT] = [
    "pregnancies",
    "glucose",
    "blood_pressure",
    "skin_thickness",
    "insulin",
    "bmi",
    "diabetes_pedigree_function",
    "age",
];

/// Validated model input for one patient.
///
/// Fields are declared in trained column order and `to_array` emits them in
/// that order; nothing here is derived from a dynamic mapping. The fields are
/// private: [`FeatureVectorBuilder`] is the only way to obtain a vector, so
/// every value is finite and non-negative.
///
/// ```compile_fail
/// use diabetes_inference::FeatureVector;
///
/// let v = FeatureVector { pregnancies: 0, glucose: -500.0, blood_pressure: -1.0,
///     skin_thickness: 0.0, insulin: 0.0, bmi: 0.0, diabetes_pedigree_function: 0.0, age: 0 };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pregnancies: u32,
    glucose: f64,
    blood_pressure: f64,
    skin_thickness: f64,
    insulin: f64,
    bmi: f64,
    diabetes_pedigree_function: f64,
    age: u32,
}

impl FeatureVector {
    pub fn pregnancies(&self) -> u32 {
        self.pregnancies
    }

    pub fn glucose(&self) -> f64 {
        self.glucose
    }

    pub fn blood_pressure(&self) -> f64 {
        self.blood_pressure
    }

    pub fn skin_thickness(&self) -> f64 {
        self.skin_thickness
    }

    pub fn insulin(&self) -> f64 {
        self.insulin
    }

    pub fn bmi(&self) -> f64 {
        self.bmi
    }

    pub fn diabetes_pedigree_function(&self) -> f64 {
        self.diabetes_pedigree_function
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    /// Features as model input, in trained column order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.pregnancies as f64,
            self.glucose,
            self.blood_pressure,
            self.skin_thickness,
            self.insulin,
            self.bmi,
            self.diabetes_pedigree_function,
            self.age as f64,
        ]
    }

    /// Features as `f32`, for runtimes that take single precision tensors
    pub fn to_f32_array(&self) -> [f32; FEATURE_COUNT] {
        self.to_array().map(|v| v as f32)
    }

    fn is_all_zero(&self) -> bool {
        self.to_array().iter().all(|&v| v == 0.0)
    }
}

/// Validates raw measurements and assembles [`FeatureVector`]s.
#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    /// Reject vectors whose eight values are all zero
    reject_all_zero: bool,
}

impl FeatureVectorBuilder {
    /// Builder for interactive use, with the all-zero guard enabled.
    pub fn new() -> Self {
        Self {
            reject_all_zero: true,
        }
    }

    /// Builder for batch/offline use where all-zero rows are passed through.
    pub fn without_zero_guard() -> Self {
        Self {
            reject_all_zero: false,
        }
    }

    pub fn with_zero_guard(reject_all_zero: bool) -> Self {
        Self { reject_all_zero }
    }

    pub fn rejects_all_zero(&self) -> bool {
        self.reject_all_zero
    }

    /// Validate a raw input and assemble the feature vector.
    pub fn build(&self, input: &PatientInput) -> Result<FeatureVector> {
        let vector = FeatureVector {
            pregnancies: count_field(FEATURE_NAMES[0], input.pregnancies)?,
            glucose: measurement_field(FEATURE_NAMES[1], input.glucose)?,
            blood_pressure: measurement_field(FEATURE_NAMES[2], input.blood_pressure)?,
            skin_thickness: measurement_field(FEATURE_NAMES[3], input.skin_thickness)?,
            insulin: measurement_field(FEATURE_NAMES[4], input.insulin)?,
            bmi: measurement_field(FEATURE_NAMES[5], input.bmi)?,
            diabetes_pedigree_function: measurement_field(
                FEATURE_NAMES[6],
                input.diabetes_pedigree_function,
            )?,
            age: count_field(FEATURE_NAMES[7], input.age)?,
        };

        if self.reject_all_zero && vector.is_all_zero() {
            return Err(PredictorError::EmptyInput);
        }

        Ok(vector)
    }

    /// Build from a name/value mapping.
    ///
    /// Every feature must be named exactly once, using either the canonical
    /// column name or its snake_case spelling. The mapping's iteration order
    /// has no effect on the result.
    pub fn build_from_fields<'a, I>(&self, fields: I) -> Result<FeatureVector>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut slots: [Option<f64>; FEATURE_COUNT] = [None; FEATURE_COUNT];

        for (name, value) in fields {
            let index = feature_index(name)
                .ok_or_else(|| PredictorError::invalid(name, "unknown feature"))?;
            if slots[index].replace(value).is_some() {
                return Err(PredictorError::invalid(
                    FEATURE_NAMES[index],
                    "supplied more than once",
                ));
            }
        }

        let mut values = [0.0; FEATURE_COUNT];
        for (index, slot) in slots.iter().enumerate() {
            values[index] =
                slot.ok_or_else(|| PredictorError::invalid(FEATURE_NAMES[index], "missing"))?;
        }

        let [pregnancies, glucose, blood_pressure, skin_thickness, insulin, bmi, dpf, age] =
            values;
        self.build(&PatientInput::new(
            pregnancies,
            glucose,
            blood_pressure,
            skin_thickness,
            insulin,
            bmi,
            dpf,
            age,
        ))
    }

    /// Number of features produced
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Feature names in trained column order
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureVectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES
        .iter()
        .position(|&n| n == name)
        .or_else(|| FEATURE_ALIASES.iter().position(|&n| n == name))
}

fn measurement_field(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(PredictorError::invalid(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(PredictorError::invalid(field, "must not be negative"));
    }
    // normalise -0.0 so the all-zero check and equality behave
    Ok(value + 0.0)
}

fn count_field(field: &str, value: f64) -> Result<u32> {
    let value = measurement_field(field, value)?;
    if value.fract() != 0.0 {
        return Err(PredictorError::invalid(field, "must be a whole number"));
    }
    if value > u32::MAX as f64 {
        return Err(PredictorError::invalid(field, "out of range"));
    }
    Ok(value as u32)
}
