use super::CliError;
use anyhow::Context;
use snid_core::MatchTable;

/// Fixed-width text rendering of a match table for terminal output.
pub(super) fn format_match_table(table: &MatchTable) -> String {
    if table.is_empty() {
        return "no matches".to_string();
    }

    let mut rendered = format!(
        "{:<5} {:<12} {:<8} {:<7} {:>6} {:>7} {:>8} {:>8} {:>7} {:>8}",
        "no.", "sn", "type", "grade", "lap", "rlap", "z", "zerr", "age", "age_flag"
    );
    for row in &table.rows {
        rendered.push('\n');
        rendered.push_str(&format!(
            "{:<5} {:<12} {:<8} {:<7} {:>6.2} {:>7.1} {:>8.4} {:>8.4} {:>7.1} {:>8}",
            row.ordinal,
            row.sn,
            row.sn_type,
            row.grade,
            row.lap,
            row.rlap,
            row.z,
            row.z_err,
            row.age,
            if row.age_flag { 1 } else { 0 },
        ));
    }
    rendered
}

pub(super) fn render_json(table: &MatchTable) -> Result<String, CliError> {
    serde_json::to_string_pretty(table)
        .context("failed to encode the match table as JSON")
        .map_err(CliError::Internal)
}

#[cfg(test)]
mod tests {
    use super::format_match_table;
    use snid_core::{MatchRow, MatchTable};

    #[test]
    fn empty_tables_render_a_placeholder_line() {
        assert_eq!(format_match_table(&MatchTable::default()), "no matches");
    }

    #[test]
    fn rows_render_with_the_header_first() {
        let table = MatchTable {
            rows: vec![MatchRow {
                ordinal: 1,
                sn: "SN2002er".to_string(),
                sn_type: "Ia".to_string(),
                grade: "good".to_string(),
                lap: 0.9,
                rlap: 15.2,
                z: 0.05,
                z_err: 0.001,
                age: 3.0,
                age_flag: false,
            }],
        };

        let rendered = format_match_table(&table);
        let mut lines = rendered.lines();
        assert!(lines.next().is_some_and(|header| header.starts_with("no.")));
        let row = lines.next().expect("one data row");
        assert!(row.contains("SN2002er"));
        assert!(row.contains("15.2"));
    }
}
