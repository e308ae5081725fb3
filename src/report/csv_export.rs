use csv::{Terminator, WriterBuilder};

use super::{COLUMNS, ReportError, ReportRow};

/// Renders the report as CSV bytes: a header line followed by one record per year.
pub fn render_csv(rows: &[ReportRow]) -> Result<Vec<u8>, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::Empty);
    }

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(64 * (rows.len() + 1)));

    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn assert_golden_snapshot(path: &str, actual: &str) {
        let update = matches!(
            std::env::var("UPDATE_GOLDEN").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        );
        let snapshot_path = Path::new(path);

        if update {
            if let Some(parent) = snapshot_path.parent() {
                fs::create_dir_all(parent).expect("failed to create snapshot directory");
            }
            fs::write(snapshot_path, actual).expect("failed to write golden snapshot");
            return;
        }

        let expected = fs::read_to_string(snapshot_path).unwrap_or_else(|_| {
            panic!("missing golden snapshot at {path}; run with UPDATE_GOLDEN=1 to generate")
        });
        assert_eq!(
            actual, expected,
            "snapshot mismatch for {path}; run with UPDATE_GOLDEN=1 to refresh if expected"
        );
    }

    fn row(year: &str, contributions: &str, profits: &str, balance: &str, intret: &str) -> ReportRow {
        ReportRow {
            year: year.to_string(),
            contributions: contributions.to_string(),
            profits: profits.to_string(),
            balance: balance.to_string(),
            intret: intret.to_string(),
        }
    }

    #[test]
    fn golden_snapshot_two_year_report_csv() {
        let rows = vec![
            row("1", "$10,000.00", "$407.42", "$10,407.42", "4.07%"),
            row("2", "$10,000.00", "$824.44", "$10,824.44", "8.24%"),
        ];
        let bytes = render_csv(&rows).expect("csv should render");
        let csv = String::from_utf8(bytes).expect("csv is utf-8");

        assert_golden_snapshot("tests/golden/compound_report.csv", &csv);
    }

    #[test]
    fn header_matches_report_columns() {
        let rows = vec![row("1", "$1.00", "$0.00", "$1.00", "0.00%")];
        let csv = String::from_utf8(render_csv(&rows).expect("csv should render"))
            .expect("csv is utf-8");
        let header = csv.lines().next().expect("header line");
        assert_eq!(header, "YEAR,CONTRIBUTIONS,PROFITS,BALANCE,RETURN (%)");
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn empty_report_is_rejected() {
        assert!(matches!(render_csv(&[]), Err(ReportError::Empty)));
    }
}
