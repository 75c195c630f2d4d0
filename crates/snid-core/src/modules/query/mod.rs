//! Read-back and filtering over a persisted run: typed section access,
//! range queries, best-match grouping, and the flux-corrected views.

use crate::domain::{SnidError, SnidResult};
use crate::modules::report::{MatchRow, MatchTable, ModelTable, ResultBundle, SpectrumTable};
use crate::modules::store::{self, StoredSections};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Stored spectra are flux multiplied by wavelength; the corrected view
/// divides that out, normalizes by the mean, and applies this fixed scale
/// factor. The factor has no stated derivation; it is preserved verbatim
/// for output compatibility.
pub const FLUX_SCALE: f64 = 1.05;

/// Group label the tool uses for sub-cutoff matches; never a best match.
const CUTOFF_GROUP: &str = "cutoff";

const WILDCARD: char = '*';

/// Type-name filter for [`SnidReader::get_results`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TypeFilter {
    /// Keep every type (`*` / `all`).
    #[default]
    All,
    /// Keep exact names from the list.
    Exact(Vec<String>),
    /// Keep types containing the fragment (single-`*` pattern, marker
    /// stripped).
    Fragment(String),
}

impl TypeFilter {
    pub fn parse(pattern: &str) -> Self {
        let trimmed = pattern.trim();
        if trimmed.is_empty() || trimmed == "*" || trimmed == "all" {
            return Self::All;
        }
        if trimmed.contains(WILDCARD) {
            return Self::Fragment(trimmed.replace(WILDCARD, ""));
        }
        Self::Exact(
            trimmed
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }

    fn matches(&self, type_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Exact(names) => names.iter().any(|name| name == type_name),
            Self::Fragment(fragment) => type_name.contains(fragment.as_str()),
        }
    }
}

/// Optional closed/half-open bound pair; absent bounds always pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeFilter {
    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchFilter {
    pub types: TypeFilter,
    pub rlap: RangeFilter,
    pub z: RangeFilter,
    pub age: RangeFilter,
    pub lap: RangeFilter,
}

impl MatchFilter {
    fn keeps(&self, row: &MatchRow) -> bool {
        self.types.matches(&row.sn_type)
            && self.rlap.contains(row.rlap)
            && self.z.contains(row.z)
            && self.age.contains(row.age)
            && self.lap.contains(row.lap)
    }
}

/// Metric used to rank matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMetric {
    #[default]
    Rlap,
    Lap,
    Z,
    Age,
}

impl SortMetric {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rlap => "rlap",
            Self::Lap => "lap",
            Self::Z => "z",
            Self::Age => "age",
        }
    }

    fn value(self, row: &MatchRow) -> f64 {
        match self {
            Self::Rlap => row.rlap,
            Self::Lap => row.lap,
            Self::Z => row.z,
            Self::Age => row.age,
        }
    }
}

impl FromStr for SortMetric {
    type Err = SnidError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "rlap" => Ok(Self::Rlap),
            "lap" => Ok(Self::Lap),
            "z" => Ok(Self::Z),
            "age" => Ok(Self::Age),
            other => Err(SnidError::usage(
                "INPUT.SORT_METRIC",
                format!("sort metric can only be 'rlap', 'lap', 'z', or 'age': '{other}' given"),
            )),
        }
    }
}

/// Value view over one persisted run. Sections that were missing from the
/// store read as `None`; the queries treat an absent match table as empty.
#[derive(Debug, Clone, Default)]
pub struct SnidReader {
    data: Option<SpectrumTable>,
    models: Option<ModelTable>,
    results: Option<MatchTable>,
    filename: Option<PathBuf>,
}

impl SnidReader {
    pub fn from_file(path: &Path) -> SnidResult<Self> {
        let StoredSections {
            data,
            models,
            results,
        } = store::read_sections(path)?;
        Ok(Self {
            data,
            models,
            results,
            filename: Some(path.to_path_buf()),
        })
    }

    pub fn from_bundle(bundle: ResultBundle) -> Self {
        Self {
            data: Some(bundle.data),
            models: Some(bundle.models),
            results: Some(bundle.results),
            filename: None,
        }
    }

    pub fn data(&self) -> Option<&SpectrumTable> {
        self.data.as_ref()
    }

    pub fn models(&self) -> Option<&ModelTable> {
        self.models.as_ref()
    }

    pub fn results(&self) -> Option<&MatchTable> {
        self.results.as_ref()
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn nmodels(&self) -> usize {
        self.models.as_ref().map_or(0, ModelTable::len)
    }

    /// Subset of the match table passing the filter, in stored order.
    pub fn get_results(&self, filter: &MatchFilter) -> MatchTable {
        let rows = self
            .results
            .iter()
            .flat_map(|table| table.rows.iter())
            .filter(|row| filter.keeps(row))
            .cloned()
            .collect();
        MatchTable { rows }
    }

    /// Best match per type: rank by the metric descending, keep the first
    /// row of each type, re-rank the winners by rlap descending, and drop
    /// the `cutoff` group.
    pub fn get_bestmatches(&self, sort_by: SortMetric) -> MatchTable {
        let mut ranked: Vec<MatchRow> = self
            .results
            .iter()
            .flat_map(|table| table.rows.iter())
            .cloned()
            .collect();
        ranked.sort_by(|a, b| descending(sort_by.value(a), sort_by.value(b)));

        let mut winners: Vec<MatchRow> = Vec::new();
        for row in ranked {
            if winners.iter().any(|winner| winner.sn_type == row.sn_type) {
                continue;
            }
            winners.push(row);
        }
        winners.sort_by(|a, b| descending(a.rlap, b.rlap));
        winners.retain(|row| row.sn_type != CUTOFF_GROUP);

        MatchTable { rows: winners }
    }

    /// `"<type> (<sn>) @ z=<z> | phase=<age>"`, optionally with the rlap.
    pub fn get_model_label(&self, ordinal: u32, incl_rlap: bool) -> Option<String> {
        let row = self.results.as_ref()?.row_for_ordinal(ordinal)?;
        let mut label = format!(
            "{} ({}) @ z={:.3} | phase={}",
            row.sn_type, row.sn, row.z, row.age
        );
        if incl_rlap {
            label.push_str(&format!(" | rlap={:.1}", row.rlap));
        }
        Some(label)
    }

    pub fn get_model_rlap(&self, ordinal: u32) -> Option<f64> {
        self.results
            .as_ref()?
            .row_for_ordinal(ordinal)
            .map(|row| row.rlap)
    }

    /// The stored input spectrum, optionally flux-corrected.
    pub fn get_inputdata(&self, fluxcorr: bool) -> Option<SpectrumTable> {
        let data = self.data.as_ref()?;
        Some(if fluxcorr { corrected_flux(data) } else { data.clone() })
    }

    /// One stored model spectrum, optionally flux-corrected.
    pub fn get_modeldata(&self, ordinal: u32, fluxcorr: bool) -> Option<SpectrumTable> {
        let model = self.models.as_ref()?.get(&ordinal)?;
        Some(if fluxcorr {
            corrected_flux(model)
        } else {
            model.clone()
        })
    }
}

/// Undo the tool's flux-times-wavelength output convention: divide by
/// wavelength, normalize by the mean, scale by [`FLUX_SCALE`].
pub fn corrected_flux(table: &SpectrumTable) -> SpectrumTable {
    let deconvolved: Vec<f64> = table
        .rows
        .iter()
        .map(|row| row.flux / row.wavelength)
        .collect();
    let mean = if deconvolved.is_empty() {
        1.0
    } else {
        deconvolved.iter().sum::<f64>() / deconvolved.len() as f64
    };

    let mut corrected = table.clone();
    for (row, flux) in corrected.rows.iter_mut().zip(deconvolved) {
        row.flux = flux / mean * FLUX_SCALE;
    }
    corrected
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
