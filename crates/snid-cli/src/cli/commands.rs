use super::helpers::{format_match_table, render_json};
use super::CliError;
use snid_core::{
    plot_bestmatches, plot_models, run_batch, run_snid, BatchJob, BatchOutput, DispatchMode,
    MatchFilter, PlotOptions, RangeFilter, RunConfig, RunId, RunnerOptions, SnidReader,
    SortMetric, TypeFilter,
};
use std::path::PathBuf;
use std::str::FromStr;

/// Options forwarded to the classifier; unset flags keep the tool defaults.
#[derive(clap::Args)]
pub(super) struct SnidOptionFlags {
    /// Phase window center in days from peak
    #[arg(long)]
    phase: Option<f64>,

    /// Half-width of the phase window around --phase
    #[arg(long, default_value_t = 5.0)]
    delta_phase: f64,

    /// Force this redshift
    #[arg(long)]
    redshift: Option<f64>,

    /// Half-width of the redshift window around --redshift
    #[arg(long)]
    delta_redshift: Option<f64>,

    /// Lower wavelength bound [Angstrom]
    #[arg(long)]
    wmin: Option<f64>,

    /// Upper wavelength bound [Angstrom]
    #[arg(long)]
    wmax: Option<f64>,

    /// Median-filter length
    #[arg(long)]
    medlen: Option<u32>,

    /// Half-width median parameter
    #[arg(long)]
    fwmed: Option<u32>,

    /// Minimum rlap cutoff
    #[arg(long)]
    rlapmin: Option<u32>,

    /// Number of flux tables the tool writes
    #[arg(long)]
    fluxout: Option<u32>,

    /// Clip sky lines
    #[arg(long)]
    skyclip: bool,

    /// Include the telluric A band
    #[arg(long)]
    aband: bool,

    /// Parameter file forwarded to the tool
    #[arg(long)]
    param: Option<PathBuf>,
}

impl SnidOptionFlags {
    fn into_config(self) -> RunConfig {
        let mut config = RunConfig::default();

        if let Some(wmin) = self.wmin {
            config.wavelength_range.0 = wmin;
        }
        if let Some(wmax) = self.wmax {
            config.wavelength_range.1 = wmax;
        }
        if let Some(medlen) = self.medlen {
            config.median_filter = Some(medlen);
        }
        config.median_fwhm = self.fwmed;
        if let Some(rlapmin) = self.rlapmin {
            config.rlap_min = rlapmin;
        }
        if let Some(fluxout) = self.fluxout {
            config.flux_table_count = fluxout;
        }
        config.sky_clip = self.skyclip;
        config.a_band = self.aband;
        config.parameter_file = self.param;

        if let Some(phase) = self.phase {
            config = config.with_phase_window(phase, self.delta_phase);
        }
        if let Some(redshift) = self.redshift {
            config = config.with_forced_redshift(redshift, self.delta_redshift);
        }

        config
    }
}

#[derive(clap::Args)]
pub(super) struct RunnerFlags {
    /// Classifier executable
    #[arg(long, default_value = "snid")]
    snid_program: PathBuf,

    /// Root directory for the scoped run directories
    #[arg(long)]
    workdir_root: Option<PathBuf>,

    /// Directory for the default store path
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Keep the run directory and the tool's flat files
    #[arg(long)]
    keep_workdir: bool,
}

impl RunnerFlags {
    fn into_options(self) -> RunnerOptions {
        RunnerOptions {
            program: self.snid_program,
            workdir_root: self.workdir_root,
            output_dir: self.output_dir,
            keep_workdir: self.keep_workdir,
            ..RunnerOptions::default()
        }
    }
}

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Spectrum file to classify
    spectrum: PathBuf,

    /// Explicit store file (coerced to the container extension)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Caller-supplied run id
    #[arg(long)]
    run_id: Option<String>,

    #[command(flatten)]
    options: SnidOptionFlags,

    #[command(flatten)]
    runner: RunnerFlags,
}

pub(super) fn run_run_command(args: RunArgs) -> Result<i32, CliError> {
    let config = args.options.into_config();
    let mut options = args.runner.into_options();
    options.output_file = args.output;
    options.run_id = args.run_id.map(RunId::new);

    match run_snid(&args.spectrum, &config, &options).map_err(CliError::Compute)? {
        Some(stored) => {
            println!("snid run was successful: data stored at {}", stored.display());
            Ok(0)
        }
        None => {
            println!("snid run failed; nothing stored");
            Ok(1)
        }
    }
}

#[derive(clap::Args)]
pub(super) struct BatchArgs {
    /// Spectrum files to classify
    #[arg(required = true)]
    spectra: Vec<PathBuf>,

    /// Dispatch mode: deferred, compute, or gather
    #[arg(long, default_value = "compute")]
    dispatch: String,

    #[command(flatten)]
    options: SnidOptionFlags,

    #[command(flatten)]
    runner: RunnerFlags,
}

pub(super) fn run_batch_command(args: BatchArgs) -> Result<i32, CliError> {
    let mode = DispatchMode::from_str(&args.dispatch).map_err(CliError::Compute)?;
    let config = args.options.into_config();
    let options = args.runner.into_options();
    tracing::debug!(mode = %mode, jobs = args.spectra.len(), "dispatching batch");

    let jobs: Vec<BatchJob> = args
        .spectra
        .iter()
        .map(|spectrum| BatchJob::new(spectrum, config.clone(), options.clone()))
        .collect();

    match run_batch(jobs, mode) {
        BatchOutput::Deferred(jobs) => {
            for job in &jobs {
                println!("{}", job.rendered_command());
            }
            Ok(0)
        }
        BatchOutput::Computed(stored) => {
            let mut failures = 0;
            for (spectrum, outcome) in args.spectra.iter().zip(&stored) {
                match outcome {
                    Some(path) => println!("{}: {}", spectrum.display(), path.display()),
                    None => {
                        failures += 1;
                        println!("{}: failed", spectrum.display());
                    }
                }
            }
            println!("{} of {} runs stored", stored.len() - failures, stored.len());
            Ok(if failures == 0 { 0 } else { 1 })
        }
        BatchOutput::Gathered(readers) => {
            let mut failures = 0;
            for (spectrum, reader) in args.spectra.iter().zip(&readers) {
                match reader {
                    Some(reader) => {
                        let best = reader.get_bestmatches(SortMetric::Rlap);
                        let summary = best
                            .rows
                            .first()
                            .and_then(|row| reader.get_model_label(row.ordinal, true))
                            .unwrap_or_else(|| "no surviving matches".to_string());
                        println!("{}: {}", spectrum.display(), summary);
                    }
                    None => {
                        failures += 1;
                        println!("{}: failed", spectrum.display());
                    }
                }
            }
            Ok(if failures == 0 { 0 } else { 1 })
        }
    }
}

#[derive(clap::Args)]
pub(super) struct ResultsArgs {
    /// Persisted store file
    store: PathBuf,

    /// Type filter: exact names (comma separated) or a single-* pattern
    #[arg(long)]
    types: Option<String>,

    #[arg(long)]
    min_rlap: Option<f64>,
    #[arg(long)]
    max_rlap: Option<f64>,
    #[arg(long)]
    min_z: Option<f64>,
    #[arg(long)]
    max_z: Option<f64>,
    #[arg(long)]
    min_age: Option<f64>,
    #[arg(long)]
    max_age: Option<f64>,
    #[arg(long)]
    min_lap: Option<f64>,
    #[arg(long)]
    max_lap: Option<f64>,

    /// Emit the table as JSON
    #[arg(long)]
    json: bool,
}

pub(super) fn run_results_command(args: ResultsArgs) -> Result<i32, CliError> {
    let reader = SnidReader::from_file(&args.store).map_err(CliError::Compute)?;
    let filter = MatchFilter {
        types: args
            .types
            .as_deref()
            .map(TypeFilter::parse)
            .unwrap_or_default(),
        rlap: RangeFilter {
            min: args.min_rlap,
            max: args.max_rlap,
        },
        z: RangeFilter {
            min: args.min_z,
            max: args.max_z,
        },
        age: RangeFilter {
            min: args.min_age,
            max: args.max_age,
        },
        lap: RangeFilter {
            min: args.min_lap,
            max: args.max_lap,
        },
    };

    let table = reader.get_results(&filter);
    if args.json {
        println!("{}", render_json(&table)?);
    } else {
        println!("{}", format_match_table(&table));
    }
    Ok(0)
}

#[derive(clap::Args)]
pub(super) struct BestArgs {
    /// Persisted store file
    store: PathBuf,

    /// Metric the per-type winners are picked by
    #[arg(long, default_value = "rlap")]
    sort_by: String,

    /// Keep only the top N winners
    #[arg(long)]
    nbest: Option<usize>,

    /// Emit the table as JSON
    #[arg(long)]
    json: bool,
}

pub(super) fn run_best_command(args: BestArgs) -> Result<i32, CliError> {
    let metric = SortMetric::from_str(&args.sort_by).map_err(CliError::Compute)?;
    let reader = SnidReader::from_file(&args.store).map_err(CliError::Compute)?;

    let mut best = reader.get_bestmatches(metric);
    if let Some(limit) = args.nbest {
        best.rows.truncate(limit);
    }

    if args.json {
        println!("{}", render_json(&best)?);
    } else {
        println!("{}", format_match_table(&best));
    }
    Ok(0)
}

#[derive(clap::Args)]
pub(super) struct PlotArgs {
    /// Persisted store file
    store: PathBuf,

    /// Output SVG path; defaults to the store path with an svg extension
    #[arg(long)]
    output: Option<PathBuf>,

    /// Model ordinals to overlay; defaults to the best matches
    #[arg(long, value_delimiter = ',')]
    models: Vec<u32>,

    /// Limit the default best-match overlay to the top N types
    #[arg(long)]
    nbest: Option<usize>,

    /// Vertical offset between model curves
    #[arg(long, default_value_t = 1.0)]
    offset: f64,

    /// Plot the stored flux columns without the wavelength correction
    #[arg(long)]
    raw_flux: bool,
}

pub(super) fn run_plot_command(args: PlotArgs) -> Result<i32, CliError> {
    let reader = SnidReader::from_file(&args.store).map_err(CliError::Compute)?;
    let output = args
        .output
        .unwrap_or_else(|| args.store.with_extension("svg"));
    let options = PlotOptions {
        offset_coef: args.offset,
        fluxcorr: !args.raw_flux,
        ..PlotOptions::default()
    };

    if args.models.is_empty() {
        plot_bestmatches(&reader, args.nbest, &output, &options).map_err(CliError::Compute)?;
    } else {
        plot_models(&reader, &args.models, &output, &options).map_err(CliError::Compute)?;
    }

    println!("plot written to {}", output.display());
    Ok(0)
}
