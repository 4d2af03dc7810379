//! Diabetes Inference - Main Entry Point
//!
//! Reads patient records as JSON lines from a file (first argument) or stdin,
//! predicts each one, and writes one JSON result line per record to stdout.
//! A fatal model error stops processing.

use anyhow::{Context, Result};
use diabetes_inference::{
    config::AppConfig, logging, DiabetesPredictor, Label, PatientInput, PredictionResult,
    PredictorError,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{error, info, warn};

/// One output line
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Response {
    Prediction {
        label: Label,
        probability: Option<f64>,
        confidence: Option<f64>,
    },
    Error {
        error: String,
        kind: &'static str,
    },
}

impl From<PredictionResult> for Response {
    fn from(result: PredictionResult) -> Self {
        Response::Prediction {
            label: result.label,
            probability: result.probability,
            confidence: result.confidence(),
        }
    }
}

impl From<&PredictorError> for Response {
    fn from(e: &PredictorError) -> Self {
        Response::Error {
            error: e.to_string(),
            kind: e.kind(),
        }
    }
}

fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.logging, "diabetes_inference")?;

    info!("Starting Diabetes Inference");
    info!(
        model_path = %config.model.path.display(),
        format = ?config.model.format,
        "Configuration loaded"
    );

    let predictor = Arc::new(DiabetesPredictor::new(&config));

    if config.model.eager_load {
        if let Err(e) = predictor.warm_up() {
            error!(error = %e, "Cannot serve predictions");
            return Err(e.into());
        }
    }

    let reader: Box<dyn BufRead> = match std::env::args().nth(1) {
        Some(path) => Box::new(BufReader::new(
            File::open(&path).with_context(|| format!("Failed to open {}", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let outcome = serve(&predictor, reader);

    predictor.metrics().print_summary();
    outcome
}

fn serve(predictor: &DiabetesPredictor, reader: Box<dyn BufRead>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;

        let response = match serde_json::from_str::<PatientInput>(&line) {
            Ok(input) => match predictor.predict(&input) {
                Ok(result) => Response::from(result),
                Err(e) if e.is_fatal() => {
                    error!(line = line_no, error = %e, "Cannot serve predictions");
                    write_line(&mut out, &Response::from(&e))?;
                    return Err(e.into());
                }
                Err(e) => {
                    if let PredictorError::InferenceEngine(_) = e {
                        warn!(line = line_no, error = %e, "Prediction failed");
                    }
                    Response::from(&e)
                }
            },
            Err(e) => {
                // the serde message can quote the offending value, keep it out of the log
                warn!(line = line_no, category = ?e.classify(), "Failed to parse patient record");
                Response::Error {
                    error: format!("malformed record: {}", e),
                    kind: "malformed_record",
                }
            }
        };

        write_line(&mut out, &response)?;
    }

    Ok(())
}

fn write_line(out: &mut impl Write, response: &Response) -> Result<()> {
    serde_json::to_writer(&mut *out, response)?;
    writeln!(out)?;
    Ok(())
}
