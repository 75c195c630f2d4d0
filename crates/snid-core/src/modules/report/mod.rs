//! Typed views over the classifier's flat-file outputs: the two-column
//! flux tables and the ranked-match listing in the combined report.

pub mod model;
pub mod parser;

pub use model::{MatchRow, MatchTable, ModelTable, ResultBundle, SpectrumRow, SpectrumTable};
pub use parser::{comp_ordinal_from_name, parse_flux_table, parse_match_report, REPORT_BANNER};
