use crate::domain::{SnidError, SnidResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumRow {
    pub wavelength: f64,
    pub flux: f64,
}

/// Ordered `(wavelength, flux)` rows. Used for the observed spectrum and
/// for each candidate model spectrum alike.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectrumTable {
    pub rows: Vec<SpectrumRow>,
}

impl SpectrumTable {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            rows: pairs
                .into_iter()
                .map(|(wavelength, flux)| SpectrumRow { wavelength, flux })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One candidate template match from the ranked report. `age_flag == true`
/// marks a row the tool excluded; rows flagged with the literal `cut` never
/// reach this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    pub ordinal: u32,
    pub sn: String,
    #[serde(rename = "type")]
    pub sn_type: String,
    #[serde(default)]
    pub grade: String,
    pub lap: f64,
    pub rlap: f64,
    pub z: f64,
    pub z_err: f64,
    pub age: f64,
    pub age_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchTable {
    pub rows: Vec<MatchRow>,
}

impl MatchTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_for_ordinal(&self, ordinal: u32) -> Option<&MatchRow> {
        self.rows.iter().find(|row| row.ordinal == ordinal)
    }
}

/// Model spectra keyed by their 1-based match ordinal.
pub type ModelTable = BTreeMap<u32, SpectrumTable>;

/// Everything one successful run produces. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultBundle {
    pub data: SpectrumTable,
    pub models: ModelTable,
    pub results: MatchTable,
}

impl ResultBundle {
    pub fn nmodels(&self) -> usize {
        self.models.len()
    }

    pub fn model_for(&self, ordinal: u32) -> Option<&SpectrumTable> {
        self.models.get(&ordinal)
    }

    /// Every match ordinal below the stored model count must have a model
    /// spectrum; larger ordinals are valid matches without one.
    pub fn validate(&self) -> SnidResult<()> {
        let nmodels = self.nmodels() as u32;
        for row in &self.results.rows {
            if row.ordinal < nmodels && !self.models.contains_key(&row.ordinal) {
                return Err(SnidError::output_format(
                    "RUN.MODEL_COVERAGE",
                    format!(
                        "match no. {} has no stored model spectrum ({} models stored)",
                        row.ordinal, nmodels
                    ),
                ));
            }
        }
        Ok(())
    }
}
