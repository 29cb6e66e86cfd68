//! Formatted terminal output for the `show` command.
//!
//! Formatting lives in one place so the pipeline stays free of presentation.

use crate::app::pipeline::{AlignedResult, IndexOrigin, Inputs};
use crate::domain::AlignedRecord;

/// Format the run summary: sources, spans, and what the range kept.
pub fn format_run_summary(inputs: &Inputs, result: &AlignedResult) -> String {
    let mut out = String::new();
    let manifest = &inputs.acquisition.handle.manifest;

    out.push_str("=== dxy - US Dollar Index vs 10-Year Treasury Yield ===\n");
    let origin = match &inputs.acquisition.origin {
        IndexOrigin::Fresh { .. } => "fresh",
        IndexOrigin::Snapshot { .. } => "snapshot",
    };
    out.push_str(&format!(
        "Index: {} ({}) via {} [{origin}, fetched {}]\n",
        manifest.symbol,
        inputs.acquisition.handle.csv_path.display(),
        manifest.source,
        manifest.fetched_at.format("%Y-%m-%d %H:%M UTC"),
    ));
    out.push_str(&format!(
        "  rows read={} used={} null={} dropped={}\n",
        inputs.index.rows_read,
        inputs.index.rows_used,
        inputs.index.null_values,
        inputs.index.row_errors.len(),
    ));
    out.push_str(&format!(
        "Yield: column `{}` rows read={} used={} null={} dropped={}\n",
        inputs.yields.value_column,
        inputs.yields.rows_read,
        inputs.yields.rows_used,
        inputs.yields.null_values,
        inputs.yields.row_errors.len(),
    ));
    out.push_str(&format!("Range: {}\n", result.range));
    out.push_str(&format!(
        "Aligned: n={} (index in range={}, yield in range={}, dropped={})\n",
        result.records.len(),
        result.index_in_range,
        result.yield_in_range,
        result.dropped(),
    ));

    if let Some((lo, hi)) = result.chart.left.value_bounds() {
        out.push_str(&format!("DXY:   [{lo:.2}, {hi:.2}]\n"));
    }
    if let Some((lo, hi)) = result.chart.right.value_bounds() {
        out.push_str(&format!("Yield: [{lo:.2}, {hi:.2}]%\n"));
    }
    out.push('\n');

    out
}

/// Format the preview rows as a fixed-width table.
pub fn format_preview(rows: &[AlignedRecord]) -> String {
    let mut out = String::new();
    out.push_str("Preview of merged data:\n");

    if rows.is_empty() {
        out.push_str("(no rows in range)\n");
        return out;
    }

    out.push_str(&format!("{:<12} {:>10} {:>8} {}\n", "date", "dxy", "yield", "yield_date"));
    out.push_str(&format!("{:-<12} {:-<10} {:-<8} {:-<12}\n", "", "", "", ""));
    for r in rows {
        out.push_str(&format!(
            "{:<12} {:>10.3} {:>8.3} {}\n",
            r.date.to_string(),
            r.left,
            r.right,
            r.right_date.to_string(),
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn preview_lists_rows_in_order() {
        let d1 = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let d3 = NaiveDate::from_ymd_opt(2023, 1, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let rows = vec![
            AlignedRecord { date: d1, left: 102.0, right: 4.0, right_date: d1 },
            AlignedRecord { date: d3, left: 103.0, right: 4.1, right_date: d2 },
        ];

        let text = format_preview(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("date"));
        assert!(lines.iter().all(|l| !l.ends_with(' ')));
        assert_eq!(lines[3], "2023-01-01      102.000    4.000 2023-01-01");
        assert!(lines[4].starts_with("2023-01-03"));
        assert!(lines[4].ends_with("2023-01-02"));
    }

    #[test]
    fn empty_preview_says_so() {
        assert!(format_preview(&[]).contains("no rows in range"));
    }
}
