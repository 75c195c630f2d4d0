//! Subprocess orchestration for one classifier run: scoped working
//! directory, short-named input link, outcome classification, output
//! collection, and persistence.
//!
//! The runner never touches the process-wide working directory. The child
//! executes with its own cwd set to the run directory and receives the
//! short link name as a relative path, which keeps the path the tool sees
//! under its length limit.

use crate::domain::{RunConfig, RunId, SnidError, SnidResult};
use crate::modules::command::{render_command, snid_arguments, SNID_PROGRAM};
use crate::modules::query::SnidReader;
use crate::modules::report::{
    comp_ordinal_from_name, parse_flux_table, parse_match_report, ModelTable, ResultBundle,
};
use crate::modules::store;
use globset::Glob;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Diagnostic substrings in the tool's stdout that mark a failed
/// correlation even when the exit code is zero.
pub const ALL_ZERO_MARKER: &str = "orrelation function is all zero!";
pub const HALF_PEAK_MARKER: &str = "PEAKFIT: fit quits before half peak points!";

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Classifier executable; defaults to `snid` on the search path.
    pub program: PathBuf,
    /// Root under which the scoped run directory is created. Defaults to
    /// the system temp dir.
    pub workdir_root: Option<PathBuf>,
    /// Caller-supplied run id; synthesized when absent.
    pub run_id: Option<RunId>,
    /// Explicit store path, coerced to the container extension.
    pub output_file: Option<PathBuf>,
    /// Directory for the default store path; defaults to the input's.
    pub output_dir: Option<PathBuf>,
    /// Leave the run directory and the tool's flat files in place.
    pub keep_workdir: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from(SNID_PROGRAM),
            workdir_root: None,
            run_id: None,
            output_file: None,
            output_dir: None,
            keep_workdir: false,
        }
    }
}

/// One invocation's scoped working directory and short-named input link.
#[derive(Debug)]
pub struct RunHandle {
    id: RunId,
    run_dir: PathBuf,
    link_name: String,
    keep_workdir: bool,
}

impl RunHandle {
    pub fn create(input: &Path, options: &RunnerOptions) -> SnidResult<Self> {
        let id = options.run_id.clone().unwrap_or_else(RunId::generate);
        let target = fs::canonicalize(input).map_err(|source| {
            SnidError::io_system(
                "IO.RUN_INPUT",
                format!("cannot resolve spectrum file '{}': {source}", input.display()),
            )
        })?;

        let root = options
            .workdir_root
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let run_dir = root.join(format!("tmpsnid_{id}"));
        fs::create_dir_all(&run_dir).map_err(|source| {
            SnidError::io_system(
                "IO.RUN_DIR",
                format!("failed to create run directory '{}': {source}", run_dir.display()),
            )
        })?;
        let link_name = format!("snid_{id}_spectofit.ascii");
        link_input(&target, &run_dir.join(&link_name))?;

        Ok(Self {
            id,
            run_dir,
            link_name,
            keep_workdir: options.keep_workdir,
        })
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Relative name the child process sees for the input spectrum.
    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    /// Base name the tool derives its output files from.
    pub fn spectrum_base(&self) -> String {
        format!("snid_{}_spectofit", self.id)
    }

    /// Best-effort teardown; a no-op when the caller keeps the directory.
    pub fn cleanup(self) {
        if self.keep_workdir {
            return;
        }
        if let Err(source) = fs::remove_dir_all(&self.run_dir) {
            warn!(
                run_dir = %self.run_dir.display(),
                "failed to remove run directory: {source}"
            );
        }
    }
}

/// Run the classifier on one spectrum. `Ok(Some(path))` points at the
/// persisted store file; `Ok(None)` records a non-fatal tool failure
/// (non-zero exit or a recognized stdout marker). A run that reports
/// success but leaves no ranked-match report is fatal.
pub fn run_snid(input: &Path, config: &RunConfig, options: &RunnerOptions) -> SnidResult<Option<PathBuf>> {
    let handle = RunHandle::create(input, options)?;
    let arguments = snid_arguments(config, Path::new(handle.link_name()));
    let program = options.program.display().to_string();
    debug!(command = %render_command(&program, &arguments), "invoking classifier");

    let output = match Command::new(&options.program)
        .args(&arguments)
        .current_dir(handle.run_dir())
        .output()
    {
        Ok(output) => output,
        Err(source) => {
            handle.cleanup();
            return Err(SnidError::io_system(
                "IO.TOOL_SPAWN",
                format!("failed to launch '{}': {source}", options.program.display()),
            ));
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        warn!(
            status = %output.status,
            input = %input.display(),
            "classifier exit status is not 0, suggesting an error"
        );
        handle.cleanup();
        return Ok(None);
    }
    for marker in [ALL_ZERO_MARKER, HALF_PEAK_MARKER] {
        if stdout.contains(marker) {
            warn!(input = %input.display(), "classifier failed: {marker}");
            handle.cleanup();
            return Ok(None);
        }
    }

    let bundle = match collect_outputs(&handle, &stdout) {
        Ok(bundle) => bundle,
        Err(error) => {
            handle.cleanup();
            return Err(error);
        }
    };

    let store_path = resolve_store_path(input, options);
    if let Err(error) = store::write_bundle(&store_path, &bundle) {
        handle.cleanup();
        return Err(error);
    }

    info!(store = %store_path.display(), "snid run was successful");
    handle.cleanup();
    Ok(Some(store_path))
}

/// Convenience: run, then load the persisted store back into a reader.
pub fn run_and_read(input: &Path, config: &RunConfig, options: &RunnerOptions) -> SnidResult<Option<SnidReader>> {
    match run_snid(input, config, options)? {
        Some(path) => SnidReader::from_file(&path).map(Some),
        None => Ok(None),
    }
}

fn collect_outputs(handle: &RunHandle, stdout: &str) -> SnidResult<ResultBundle> {
    let base = handle.spectrum_base();
    let run_dir = handle.run_dir();

    let report_path = run_dir.join(format!("{base}_snid.output"));
    let report_source = match fs::read_to_string(&report_path) {
        Ok(source) => source,
        Err(_) => {
            // The only success/failure signal beyond the exit code is the
            // captured stdout, so dump it before raising.
            eprintln!("{:-^40}", " SNID RETURN ");
            eprintln!("{stdout}");
            eprintln!("{:-^40}", "");
            return Err(SnidError::tool_execution(
                "RUN.REPORT_MISSING",
                format!("cannot find the classifier report '{}'", report_path.display()),
            ));
        }
    };
    let results = parse_match_report(&report_source, None)?;

    let data_path = run_dir.join(format!("{base}_snidflux.dat"));
    let data_source = fs::read_to_string(&data_path).map_err(|source| {
        SnidError::io_system(
            "IO.FLUX_READ",
            format!("cannot read the flux table '{}': {source}", data_path.display()),
        )
    })?;
    let data = parse_flux_table(&data_source)?;

    let models = collect_model_tables(run_dir, &base)?;

    Ok(ResultBundle {
        data,
        models,
        results,
    })
}

fn collect_model_tables(run_dir: &Path, base: &str) -> SnidResult<ModelTable> {
    let matcher = Glob::new(&format!("{base}_comp*_snidflux.dat"))
        .map_err(|source| {
            SnidError::output_format(
                "RUN.MODEL_GLOB",
                format!("model file pattern does not compile: {source}"),
            )
        })?
        .compile_matcher();

    let entries = fs::read_dir(run_dir).map_err(|source| {
        SnidError::io_system(
            "IO.RUN_DIR",
            format!("cannot list run directory '{}': {source}", run_dir.display()),
        )
    })?;

    let mut models = ModelTable::new();
    for entry in entries {
        let entry = entry.map_err(|source| {
            SnidError::io_system(
                "IO.RUN_DIR",
                format!("cannot list run directory '{}': {source}", run_dir.display()),
            )
        })?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !matcher.is_match(name) {
            continue;
        }
        let Some(ordinal) = comp_ordinal_from_name(name) else {
            warn!(file = name, "model flux file has no parsable ordinal, skipping");
            continue;
        };

        let source = fs::read_to_string(entry.path()).map_err(|source| {
            SnidError::io_system(
                "IO.FLUX_READ",
                format!("cannot read the model flux table '{name}': {source}"),
            )
        })?;
        models.insert(ordinal, parse_flux_table(&source)?);
    }

    Ok(models)
}

fn resolve_store_path(input: &Path, options: &RunnerOptions) -> PathBuf {
    match &options.output_file {
        Some(explicit) => store::coerce_store_extension(explicit),
        None => store::default_store_path(input, options.output_dir.as_deref()),
    }
}

#[cfg(unix)]
fn link_input(target: &Path, link: &Path) -> SnidResult<()> {
    std::os::unix::fs::symlink(target, link).map_err(|source| {
        SnidError::io_system(
            "IO.RUN_LINK",
            format!("failed to link '{}' as '{}': {source}", target.display(), link.display()),
        )
    })
}

#[cfg(not(unix))]
fn link_input(target: &Path, link: &Path) -> SnidResult<()> {
    fs::copy(target, link).map(|_| ()).map_err(|source| {
        SnidError::io_system(
            "IO.RUN_LINK",
            format!("failed to copy '{}' as '{}': {source}", target.display(), link.display()),
        )
    })
}
