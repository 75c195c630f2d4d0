//! Pure assembly of the classifier invocation from a [`RunConfig`].

use crate::domain::RunConfig;
use std::path::Path;

/// Program name the runner invokes unless overridden.
pub const SNID_PROGRAM: &str = "snid";

/// Build the argument vector for one invocation. Wavelength and phase
/// bounds, `medlen`, `fwmed`, `fluxout`, and `rlapmin` render as integers,
/// boolean toggles as `0`/`1`, redshift bounds pass through as floats, and
/// the input path is always the final token.
pub fn snid_arguments(config: &RunConfig, input: &Path) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(parameter_file) = &config.parameter_file {
        args.push(format!("param={}", parameter_file.display()));
    }

    args.push(format!("wmin={}", config.wavelength_range.0 as i64));
    args.push(format!("wmax={}", config.wavelength_range.1 as i64));

    if let Some(forced) = config.forced_redshift {
        args.push(format!("forcez={forced}"));
    }
    args.push(format!("zmin={}", config.redshift_range.0));
    args.push(format!("zmax={}", config.redshift_range.1));

    args.push(format!("agemin={}", config.phase_range.0 as i64));
    args.push(format!("agemax={}", config.phase_range.1 as i64));

    args.push(format!("skyclip={}", config.sky_clip as u8));
    if let Some(medlen) = config.median_filter {
        args.push(format!("medlen={medlen}"));
    }
    if let Some(fwmed) = config.median_fwhm {
        args.push(format!("fwmed={fwmed}"));
    }

    args.push(format!("fluxout={}", config.flux_table_count));
    args.push(format!("aband={}", config.a_band as u8));
    args.push(format!("rlapmin={}", config.rlap_min));
    args.push(format!("inter={}", config.interactive as u8));
    args.push(format!("plot={}", config.plot as u8));

    args.push(input.display().to_string());
    args
}

/// Single-string rendering for diagnostics and the `deferred` batch mode.
pub fn render_command(program: &str, arguments: &[String]) -> String {
    let mut rendered = String::from(program);
    for argument in arguments {
        rendered.push(' ');
        rendered.push_str(argument);
    }
    rendered
}
