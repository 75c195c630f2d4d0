//! Composite result container: one keyed-section document per run holding
//! the input spectrum, the model spectra, and the ranked-match table. The
//! section names and the legacy per-candidate `comp<N>` layout follow the
//! historical store files; the codec is a JSON document.

use crate::domain::{SnidError, SnidResult};
use crate::modules::report::{MatchTable, ModelTable, ResultBundle, SpectrumTable};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const STORE_EXTENSION: &str = "h5";
pub const STORE_SUFFIX: &str = "_snid";

pub const DATA_SECTION: &str = "data";
pub const MODELS_SECTION: &str = "models";
pub const RESULTS_SECTION: &str = "results";

const LEGACY_COMP_PREFIX: &str = "comp";

/// Sections found in a store file. Each is independently optional: a
/// missing section reads as `None` after a warning.
#[derive(Debug, Clone, Default)]
pub struct StoredSections {
    pub data: Option<SpectrumTable>,
    pub models: Option<ModelTable>,
    pub results: Option<MatchTable>,
}

/// Default store path: the input's base name (up to the first dot) plus
/// `_snid.h5`, next to the input unless a directory override is given.
pub fn default_store_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let base = input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("spectrum");
    let stem = base.split('.').next().unwrap_or(base);
    let directory = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    directory.join(format!("{stem}{STORE_SUFFIX}.{STORE_EXTENSION}"))
}

/// Append the container extension to caller-supplied names that lack it.
pub fn coerce_store_extension(path: &Path) -> PathBuf {
    let has_extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension == STORE_EXTENSION);
    if has_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(STORE_EXTENSION);
        PathBuf::from(name)
    }
}

pub fn write_bundle(path: &Path, bundle: &ResultBundle) -> SnidResult<()> {
    bundle.validate()?;

    let mut document = BTreeMap::new();
    document.insert(DATA_SECTION.to_string(), to_section(&bundle.data)?);
    document.insert(MODELS_SECTION.to_string(), to_section(&bundle.models)?);
    document.insert(RESULTS_SECTION.to_string(), to_section(&bundle.results)?);

    let rendered = serde_json::to_string(&document).map_err(|source| {
        SnidError::io_system("IO.STORE_WRITE", format!("failed to encode store: {source}"))
    })?;
    fs::write(path, rendered).map_err(|source| {
        SnidError::io_system(
            "IO.STORE_WRITE",
            format!("failed to write store '{}': {source}", path.display()),
        )
    })
}

/// Load whichever sections are present. Missing `data` or `results` warn
/// and read as `None`; a missing `models` section falls back to the legacy
/// per-candidate `comp<N>` sections when any exist.
pub fn read_sections(path: &Path) -> SnidResult<StoredSections> {
    let source = fs::read_to_string(path).map_err(|source| {
        SnidError::io_system(
            "IO.STORE_READ",
            format!("failed to read store '{}': {source}", path.display()),
        )
    })?;
    let document: BTreeMap<String, Value> = serde_json::from_str(&source).map_err(|source| {
        SnidError::output_format(
            "RUN.STORE_PARSE",
            format!("store '{}' is not a keyed-section document: {source}", path.display()),
        )
    })?;

    let mut sections = StoredSections::default();

    match document.get(DATA_SECTION) {
        Some(value) => sections.data = Some(from_section(DATA_SECTION, value)?),
        None => warn!(store = %path.display(), "no 'data' section stored in the input file"),
    }

    match document.get(RESULTS_SECTION) {
        Some(value) => sections.results = Some(from_section(RESULTS_SECTION, value)?),
        None => warn!(store = %path.display(), "no 'results' section stored in the input file"),
    }

    if let Some(value) = document.get(MODELS_SECTION) {
        sections.models = Some(from_section(MODELS_SECTION, value)?);
    } else {
        let legacy_names: Vec<String> = document
            .keys()
            .filter(|name| legacy_comp_ordinal(name).is_some())
            .cloned()
            .collect();
        if legacy_names.is_empty() {
            warn!(store = %path.display(), "not a single 'comp' section stored in the input file");
        } else {
            warn!(
                store = %path.display(),
                "deprecated store layout: individual 'comp' sections will not be supported at the next upgrade, rebuild the file"
            );
            sections.models = Some(reconstruct_models(&legacy_names, |name| {
                let value = document.get(name).ok_or_else(|| {
                    SnidError::output_format(
                        "RUN.STORE_SECTION",
                        format!("legacy section '{name}' disappeared during read"),
                    )
                })?;
                from_section(name, value)
            })?);
        }
    }

    Ok(sections)
}

/// Rebuild the models table from legacy per-candidate section names. Pure
/// over the supplied loader; the deprecation warning is the caller's job.
pub fn reconstruct_models<F>(section_names: &[String], mut loader: F) -> SnidResult<ModelTable>
where
    F: FnMut(&str) -> SnidResult<SpectrumTable>,
{
    let mut models = ModelTable::new();
    for name in section_names {
        let Some(ordinal) = legacy_comp_ordinal(name) else {
            continue;
        };
        models.insert(ordinal, loader(name)?);
    }
    Ok(models)
}

fn legacy_comp_ordinal(section_name: &str) -> Option<u32> {
    section_name
        .strip_prefix(LEGACY_COMP_PREFIX)
        .and_then(|suffix| suffix.parse().ok())
}

fn to_section<T: serde::Serialize>(table: &T) -> SnidResult<Value> {
    serde_json::to_value(table).map_err(|source| {
        SnidError::io_system("IO.STORE_WRITE", format!("failed to encode section: {source}"))
    })
}

fn from_section<T: serde::de::DeserializeOwned>(name: &str, value: &Value) -> SnidResult<T> {
    serde_json::from_value(value.clone()).map_err(|source| {
        SnidError::output_format(
            "RUN.STORE_SECTION",
            format!("section '{name}' does not decode: {source}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{
        coerce_store_extension, default_store_path, legacy_comp_ordinal, reconstruct_models,
    };
    use crate::modules::report::SpectrumTable;
    use std::path::Path;

    #[test]
    fn default_path_uses_the_base_name_up_to_the_first_dot() {
        let path = default_store_path(Path::new("/data/spectrum.night1.ascii"), None);
        assert_eq!(path, Path::new("/data/spectrum_snid.h5"));
    }

    #[test]
    fn default_path_honors_a_directory_override() {
        let path = default_store_path(Path::new("/data/spectrum.ascii"), Some(Path::new("/out")));
        assert_eq!(path, Path::new("/out/spectrum_snid.h5"));
    }

    #[test]
    fn extension_coercion_appends_only_when_missing() {
        assert_eq!(
            coerce_store_extension(Path::new("result")),
            Path::new("result.h5")
        );
        assert_eq!(
            coerce_store_extension(Path::new("result.out")),
            Path::new("result.out.h5")
        );
        assert_eq!(
            coerce_store_extension(Path::new("result.h5")),
            Path::new("result.h5")
        );
    }

    #[test]
    fn legacy_section_names_parse_to_ordinals() {
        assert_eq!(legacy_comp_ordinal("comp1"), Some(1));
        assert_eq!(legacy_comp_ordinal("comp12"), Some(12));
        assert_eq!(legacy_comp_ordinal("compact"), None);
        assert_eq!(legacy_comp_ordinal("results"), None);
    }

    #[test]
    fn reconstruction_keys_models_by_their_section_ordinal() {
        let names = vec!["comp2".to_string(), "comp1".to_string()];
        let models = reconstruct_models(&names, |name| {
            let flux = if name == "comp1" { 1.0 } else { 2.0 };
            Ok(SpectrumTable::from_pairs([(4_000.0, flux)]))
        })
        .expect("loader never fails here");

        assert_eq!(models.len(), 2);
        assert_eq!(models[&1].rows[0].flux, 1.0);
        assert_eq!(models[&2].rows[0].flux, 2.0);
    }
}
