//! Orchestration of the SNID spectral classifier: invocation assembly,
//! subprocess execution, flat-file output parsing, composite result
//! persistence, and query/plot convenience over persisted runs. All
//! correlation, classification, and redshift/age estimation happens in the
//! external binary; this crate is the adapter around it.

pub mod domain;
pub mod modules;

pub use domain::{DispatchMode, RunConfig, RunId, SnidError, SnidErrorCategory, SnidResult};
pub use modules::batch::{run_batch, BatchJob, BatchOutput};
pub use modules::plot::{plot_bestmatches, plot_models, PlotOptions};
pub use modules::query::{MatchFilter, RangeFilter, SnidReader, SortMetric, TypeFilter};
pub use modules::report::{
    MatchRow, MatchTable, ModelTable, ResultBundle, SpectrumRow, SpectrumTable,
};
pub use modules::runner::{run_and_read, run_snid, RunHandle, RunnerOptions};
