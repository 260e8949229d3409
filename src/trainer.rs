use chrono::Local;
use std::time::{Duration, Instant};

use crate::corpus::WeightedPair;
use crate::error::Model1Error;
use crate::model::AlignmentModel;

#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Upper bound on EM iterations.
    pub iterations: usize,
    /// Stop once the log-likelihood moves by no more than this; 0 disables.
    pub tolerance: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            iterations: 5,
            tolerance: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    pub iteration: usize,
    /// Log-likelihood of the training pairs under the parameters the
    /// iteration started from.
    pub log_likelihood: f64,
    pub elapsed: Duration,
}

/// One EM iteration over `pairs`. Returns the summed E-step log-likelihood.
pub fn em_iteration(
    model: &mut AlignmentModel,
    pairs: &[WeightedPair<'_>],
) -> Result<f64, Model1Error> {
    if pairs.is_empty() {
        return Err(Model1Error::NoTrainingPairs);
    }
    model.clear_expected_counts();
    let mut log_likelihood = 0.0;
    for pair in pairs {
        log_likelihood += model.accumulate(pair.source, pair.target, pair.weight)?;
    }
    model.reestimate();
    Ok(log_likelihood)
}

/// Sum of `score_pair` over `pairs`; the model is left untouched.
pub fn corpus_log_likelihood(
    model: &AlignmentModel,
    pairs: &[WeightedPair<'_>],
) -> Result<f64, Model1Error> {
    pairs
        .iter()
        .map(|pair| model.score_pair(pair.source, pair.target))
        .sum()
}

/// Runs EM on an initialized model.
pub fn train(
    model: &mut AlignmentModel,
    pairs: &[WeightedPair<'_>],
    config: &TrainConfig,
) -> Result<Vec<IterationReport>, Model1Error> {
    log::info!(
        "training on {} sentence pairs, {} iterations, {:?} marginals",
        pairs.len(),
        config.iterations,
        model.marginal_count()
    );
    let mut reports: Vec<IterationReport> = Vec::with_capacity(config.iterations);
    for b in 0..config.iterations {
        let begin = Instant::now();
        let log_likelihood = em_iteration(model, pairs)?;
        let report = IterationReport {
            iteration: b + 1,
            log_likelihood,
            elapsed: begin.elapsed(),
        };

        let time_str = Local::now().format("%x - %I:%M.%S%p");
        log::info!(
            "{time_str}, iter: {it:03}, log-likelihood: {ll:.6}, per pair: {avg:.6}, took {took:?}",
            it = report.iteration,
            ll = report.log_likelihood,
            avg = report.log_likelihood / pairs.len() as f64,
            took = report.elapsed
        );

        let converged = match reports.last() {
            Some(prev) if config.tolerance > 0.0 => {
                (report.log_likelihood - prev.log_likelihood).abs() <= config.tolerance
            }
            _ => false,
        };
        reports.push(report);
        if converged {
            log::info!("converged after {} iterations", b + 1);
            break;
        }
    }
    Ok(reports)
}
