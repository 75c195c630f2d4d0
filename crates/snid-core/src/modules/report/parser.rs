use super::model::{MatchRow, MatchTable, SpectrumRow, SpectrumTable};
use crate::domain::{SnidError, SnidResult};

/// Banner preceding the ranked template listing in the combined report.
pub const REPORT_BANNER: &str = "### rlap-ordered template listings ###";

/// Literal the tool writes in the cut-flag column of excluded rows.
const CUT_MARKER: &str = "cut";

const COMMENT_MARKER: char = '#';

/// Parse a two-column `wavelength flux` text table, skipping blank lines
/// and `#` comments. Any retained line that does not split into exactly two
/// numeric tokens is a format error.
pub fn parse_flux_table(source: &str) -> SnidResult<SpectrumTable> {
    let mut rows = Vec::new();

    for (line_index, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() != 2 {
            return Err(flux_format_error(
                line_index,
                format!("expected 2 columns, found {}", tokens.len()),
            ));
        }

        let wavelength = parse_float(tokens[0])
            .ok_or_else(|| flux_format_error(line_index, format!("bad wavelength '{}'", tokens[0])))?;
        let flux = parse_float(tokens[1])
            .ok_or_else(|| flux_format_error(line_index, format!("bad flux '{}'", tokens[1])))?;

        rows.push(SpectrumRow { wavelength, flux });
    }

    Ok(SpectrumTable { rows })
}

/// Parse the ranked-match listing out of the combined report: everything
/// after the banner, first non-blank line (minus its leading marker) as
/// column headers, subsequent lines as rows keyed by the first column.
/// Rows whose cut-flag column equals the `cut` literal are dropped; the
/// surviving rows are optionally truncated to the first `nfirst`.
pub fn parse_match_report(source: &str, nfirst: Option<usize>) -> SnidResult<MatchTable> {
    let lines: Vec<&str> = source.lines().collect();
    let banner_index = lines
        .iter()
        .position(|line| line.contains(REPORT_BANNER))
        .ok_or_else(|| {
            SnidError::output_format(
                "RUN.REPORT_BANNER",
                format!("report does not contain the banner '{REPORT_BANNER}'"),
            )
        })?;

    let mut remaining = lines[banner_index + 1..]
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty());

    let header_line = remaining.next().ok_or_else(|| {
        SnidError::output_format("RUN.REPORT_HEADER", "no header line after the banner")
    })?;
    let columns = ReportColumns::from_header(header_line.trim_start_matches(COMMENT_MARKER))?;

    let mut rows = Vec::new();
    for line in remaining {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != columns.width {
            return Err(SnidError::output_format(
                "RUN.REPORT_ROW",
                format!(
                    "row '{line}' has {} columns, header declares {}",
                    tokens.len(),
                    columns.width
                ),
            ));
        }

        if tokens[columns.age_flag] == CUT_MARKER {
            continue;
        }

        rows.push(columns.coerce_row(&tokens)?);
    }

    if let Some(limit) = nfirst {
        rows.truncate(limit);
    }

    Ok(MatchTable { rows })
}

/// Candidate ordinal embedded in a per-model flux file name,
/// `<base>_comp<N>_snidflux.dat`.
pub fn comp_ordinal_from_name(file_name: &str) -> Option<u32> {
    let after = file_name.split("comp").nth(1)?;
    let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

struct ReportColumns {
    width: usize,
    ordinal: usize,
    sn: usize,
    sn_type: usize,
    grade: Option<usize>,
    lap: usize,
    rlap: usize,
    z: usize,
    z_err: usize,
    age: usize,
    age_flag: usize,
}

impl ReportColumns {
    fn from_header(header: &str) -> SnidResult<Self> {
        let names: Vec<&str> = header.split_whitespace().collect();
        let index_of = |name: &str| names.iter().position(|column| *column == name);
        let required = |name: &'static str| {
            index_of(name).ok_or_else(|| {
                SnidError::output_format(
                    "RUN.REPORT_HEADER",
                    format!("report header is missing the '{name}' column"),
                )
            })
        };

        Ok(Self {
            width: names.len(),
            ordinal: required("no.")?,
            sn: required("sn")?,
            sn_type: required("type")?,
            grade: index_of("grade"),
            lap: required("lap")?,
            rlap: required("rlap")?,
            z: required("z")?,
            z_err: required("zerr")?,
            age: required("age")?,
            age_flag: required("age_flag")?,
        })
    }

    fn coerce_row(&self, tokens: &[&str]) -> SnidResult<MatchRow> {
        let float_at = |index: usize, name: &str| {
            parse_float(tokens[index]).ok_or_else(|| {
                SnidError::output_format(
                    "RUN.REPORT_ROW",
                    format!("column '{name}' is not numeric: '{}'", tokens[index]),
                )
            })
        };

        let ordinal = tokens[self.ordinal].parse::<u32>().map_err(|_| {
            SnidError::output_format(
                "RUN.REPORT_ROW",
                format!("match no. is not an integer: '{}'", tokens[self.ordinal]),
            )
        })?;

        let age_flag = match tokens[self.age_flag] {
            "0" => false,
            "1" => true,
            other => {
                return Err(SnidError::output_format(
                    "RUN.REPORT_ROW",
                    format!("age_flag is not 0/1: '{other}'"),
                ));
            }
        };

        Ok(MatchRow {
            ordinal,
            sn: tokens[self.sn].to_string(),
            sn_type: tokens[self.sn_type].to_string(),
            grade: self
                .grade
                .map(|index| tokens[index].to_string())
                .unwrap_or_default(),
            lap: float_at(self.lap, "lap")?,
            rlap: float_at(self.rlap, "rlap")?,
            z: float_at(self.z, "z")?,
            z_err: float_at(self.z_err, "zerr")?,
            age: float_at(self.age, "age")?,
            age_flag,
        })
    }
}

fn parse_float(token: &str) -> Option<f64> {
    token.parse::<f64>().ok()
}

fn flux_format_error(line_index: usize, detail: String) -> SnidError {
    SnidError::output_format(
        "RUN.FLUX_FORMAT",
        format!("flux table line {}: {detail}", line_index + 1),
    )
}
