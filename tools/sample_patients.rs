//! Synthetic patient record generator
//!
//! Writes JSON-line patient records to stdout for feeding the inference
//! binary. Usage: `sample-patients [count] [high_risk_rate] [empty_rate]`.

use diabetes_inference::{config::LoggingConfig, logging, PatientInput};
use rand::rngs::ThreadRng;
use rand::Rng;
use std::io::{self, Write};
use tracing::info;

/// Generates plausible measurements for two risk profiles
struct PatientGenerator {
    rng: ThreadRng,
}

impl PatientGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Record resembling a low-risk patient
    fn generate_typical(&mut self) -> PatientInput {
        PatientInput::new(
            self.rng.gen_range(0..4) as f64,
            round_tenth(self.rng.gen_range(70.0..125.0)),
            round_tenth(self.rng.gen_range(60.0..85.0)),
            round_tenth(self.rng.gen_range(10.0..30.0)),
            round_tenth(self.rng.gen_range(15.0..120.0)),
            round_tenth(self.rng.gen_range(19.0..28.0)),
            round_tenth(self.rng.gen_range(0.08..0.6)),
            self.rng.gen_range(21..40) as f64,
        )
    }

    /// Record resembling a high-risk patient
    fn generate_high_risk(&mut self) -> PatientInput {
        PatientInput::new(
            self.rng.gen_range(3..12) as f64,
            round_tenth(self.rng.gen_range(140.0..199.0)),
            round_tenth(self.rng.gen_range(75.0..110.0)),
            round_tenth(self.rng.gen_range(25.0..50.0)),
            round_tenth(self.rng.gen_range(120.0..600.0)),
            round_tenth(self.rng.gen_range(30.0..50.0)),
            round_tenth(self.rng.gen_range(0.5..2.4)),
            self.rng.gen_range(40..80) as f64,
        )
    }
}

/// Keep one decimal, like values typed into a form
fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Parse a probability argument, clamped to [0, 1]
fn rate_arg(arg: Option<&String>, default: f64) -> f64 {
    arg.and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(default)
        .clamp(0.0, 1.0)
}

fn main() -> anyhow::Result<()> {
    logging::init(&LoggingConfig::default(), "sample_patients")?;

    let args: Vec<String> = std::env::args().collect();
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);
    let high_risk_rate = rate_arg(args.get(2), 0.35);
    let empty_rate = rate_arg(args.get(3), 0.0);

    info!(
        count = count,
        high_risk_rate = high_risk_rate,
        empty_rate = empty_rate,
        "Generating patient records"
    );

    let mut generator = PatientGenerator::new();
    let mut rng = rand::thread_rng();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut typical_count = 0;
    let mut high_risk_count = 0;
    let mut empty_count = 0;

    for _ in 0..count {
        let patient = if rng.gen_bool(empty_rate) {
            empty_count += 1;
            PatientInput::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
        } else if rng.gen_bool(high_risk_rate) {
            high_risk_count += 1;
            generator.generate_high_risk()
        } else {
            typical_count += 1;
            generator.generate_typical()
        };

        serde_json::to_writer(&mut out, &patient)?;
        writeln!(out)?;
    }

    info!(
        "Completed! Wrote {} records ({} typical, {} high risk, {} empty)",
        count, typical_count, high_risk_count, empty_count
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_arg_parses_and_clamps() {
        assert_eq!(rate_arg(Some(&"0.2".to_string()), 0.35), 0.2);
        assert_eq!(rate_arg(Some(&"1.5".to_string()), 0.35), 1.0);
        assert_eq!(rate_arg(Some(&"-3".to_string()), 0.35), 0.0);
        assert_eq!(rate_arg(Some(&"lots".to_string()), 0.35), 0.35);
        assert_eq!(rate_arg(None, 0.0), 0.0);
    }

    #[test]
    fn test_generated_records_pass_validation() {
        let builder = diabetes_inference::FeatureVectorBuilder::new();
        let mut generator = PatientGenerator::new();

        for _ in 0..50 {
            assert!(builder.build(&generator.generate_typical()).is_ok());
            assert!(builder.build(&generator.generate_high_risk()).is_ok());
        }
    }
}
