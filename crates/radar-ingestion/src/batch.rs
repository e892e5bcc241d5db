//! Parallel processing of independent volumes.

use rayon::prelude::*;
use tracing::info;

use crate::discovery::VolumeInput;
use crate::error::{IngestionError, Result};
use crate::processor::{VolumeOutcome, VolumeProcessor};

/// Counts and outcomes of a batch run, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<VolumeOutcome>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<VolumeOutcome>) -> Self {
        let mut report = Self::default();
        for outcome in &outcomes {
            match outcome {
                VolumeOutcome::Done(_) => report.done += 1,
                VolumeOutcome::Skipped { .. } => report.skipped += 1,
                VolumeOutcome::Failed { .. } => report.failed += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }
}

/// Runs one [`VolumeProcessor`] over many inputs, one volume per worker.
pub struct BatchRunner {
    processor: VolumeProcessor,
    threads: Option<usize>,
}

impl BatchRunner {
    /// Thread count is taken from the processing configuration.
    pub fn new(processor: VolumeProcessor) -> Self {
        let threads = processor.config().processing.threads;
        Self { processor, threads }
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    /// Process every input. A failing volume never stops the others.
    pub fn run(&self, inputs: &[VolumeInput]) -> Result<BatchReport> {
        let process = || -> Vec<VolumeOutcome> {
            inputs
                .par_iter()
                .map(|input| self.processor.process(input))
                .collect()
        };

        let outcomes = match self.threads {
            Some(n) => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| {
                    IngestionError::InvalidConfig(format!("failed to build thread pool: {}", e))
                })?
                .install(process),
            None => process(),
        };

        let report = BatchReport::from_outcomes(outcomes);
        info!(
            volumes = inputs.len(),
            done = report.done,
            skipped = report.skipped,
            failed = report.failed,
            "Batch complete"
        );
        Ok(report)
    }
}
