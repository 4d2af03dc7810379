//! Inference statistics for operators.
//!
//! Only counts, latencies and the probability histogram are kept; no patient
//! measurements are recorded.

use crate::error::PredictorError;
use crate::types::prediction::PredictionResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the predictor
pub struct InferenceMetrics {
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Predictions labelled positive
    pub positives: AtomicU64,
    /// Inputs rejected by the all-zero guard
    pub empty_inputs: AtomicU64,
    /// Inputs rejected by field validation
    pub invalid_inputs: AtomicU64,
    /// Model calls that failed or broke the output contract
    pub inference_failures: AtomicU64,
    /// Prediction latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Positive-class probability histogram
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl InferenceMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            positives: AtomicU64::new(0),
            empty_inputs: AtomicU64::new(0),
            invalid_inputs: AtomicU64::new(0),
            inference_failures: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, result: &PredictionResult) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if result.label.is_positive() {
            self.positives.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Some(p) = result.probability {
            let bucket = (p * 10.0).min(9.0) as usize;
            if let Ok(mut buckets) = self.probability_buckets.write() {
                buckets[bucket] += 1;
            }
        }
    }

    /// Record a failed request by error kind
    pub fn record_error(&self, error: &PredictorError) {
        let counter = match error {
            PredictorError::EmptyInput => &self.empty_inputs,
            PredictorError::InvalidInput { .. } => &self.invalid_inputs,
            PredictorError::InferenceEngine(_) => &self.inference_failures,
            // artifact failures are fatal and reported once by the loader
            PredictorError::ModelNotFound { .. } | PredictorError::ModelCorrupt { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get latency statistics
    pub fn get_latency_stats(&self) -> LatencyStats {
        let times = match self.latencies.read() {
            Ok(times) => times,
            Err(_) => return LatencyStats::default(),
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Predictions per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or([0; 10])
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let positives = self.positives.load(Ordering::Relaxed);
        let positive_rate = if predictions > 0 {
            (positives as f64 / predictions as f64) * 100.0
        } else {
            0.0
        };

        let latency = self.get_latency_stats();
        let distribution = self.get_probability_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             DIABETES INFERENCE - METRICS SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions: {:>8}  │  Throughput: {:>8.1} pred/s          ║",
            predictions,
            self.get_throughput()
        );
        info!(
            "║ Positive:    {:>8}  │  Positive Rate: {:>6.1}%              ║",
            positives, positive_rate
        );
        info!(
            "║ Rejected: empty={:>6} invalid={:>6}  Failures: {:>6}      ║",
            self.empty_inputs.load(Ordering::Relaxed),
            self.invalid_inputs.load(Ordering::Relaxed),
            self.inference_failures.load(Ordering::Relaxed)
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Latency (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}      ║",
            latency.mean_us, latency.p50_us, latency.p95_us, latency.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Positive Probability Distribution:                           ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for InferenceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}
