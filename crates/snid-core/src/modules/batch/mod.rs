//! Fan-out of independent single-spectrum runs. Outputs correspond
//! positionally to the input jobs; one failed run warns and yields `None`
//! without aborting its siblings.

use crate::domain::{DispatchMode, RunConfig};
use crate::modules::command::{render_command, snid_arguments};
use crate::modules::query::SnidReader;
use crate::modules::runner::{run_snid, RunnerOptions};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::warn;

/// One prepared, not-yet-invoked run.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub input: PathBuf,
    pub config: RunConfig,
    pub options: RunnerOptions,
}

impl BatchJob {
    pub fn new(input: impl Into<PathBuf>, config: RunConfig, options: RunnerOptions) -> Self {
        Self {
            input: input.into(),
            config,
            options,
        }
    }

    /// Evaluate the job. Both non-fatal tool failures and fatal run errors
    /// collapse to `None` here so one job cannot abort a batch.
    pub fn evaluate(&self) -> Option<PathBuf> {
        match run_snid(&self.input, &self.config, &self.options) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    input = %self.input.display(),
                    "batch run failed: {error}"
                );
                None
            }
        }
    }

    /// Command-line rendering of the prepared invocation.
    pub fn rendered_command(&self) -> String {
        let program = self.options.program.display().to_string();
        let arguments = snid_arguments(&self.config, &self.input);
        render_command(&program, &arguments)
    }
}

/// Batch result, one variant per dispatch mode.
#[derive(Debug)]
pub enum BatchOutput {
    /// The jobs themselves, uninvoked.
    Deferred(Vec<BatchJob>),
    /// Persisted store path per job, `None` for failed runs.
    Computed(Vec<Option<PathBuf>>),
    /// Loaded reader per job, `None` for failed runs or unreadable stores.
    Gathered(Vec<Option<SnidReader>>),
}

pub fn run_batch(jobs: Vec<BatchJob>, mode: DispatchMode) -> BatchOutput {
    match mode {
        DispatchMode::Deferred => BatchOutput::Deferred(jobs),
        DispatchMode::Compute => {
            BatchOutput::Computed(jobs.par_iter().map(BatchJob::evaluate).collect())
        }
        DispatchMode::Gather => BatchOutput::Gathered(
            jobs.par_iter()
                .map(|job| {
                    let path = job.evaluate()?;
                    match SnidReader::from_file(&path) {
                        Ok(reader) => Some(reader),
                        Err(error) => {
                            warn!(store = %path.display(), "gather failed to load store: {error}");
                            None
                        }
                    }
                })
                .collect(),
        ),
    }
}
