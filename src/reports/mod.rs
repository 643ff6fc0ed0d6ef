//! Report Materializer: the fixed template catalog plus upstream-row reshaping.

pub mod materializer;
pub mod templates;

pub use materializer::{materialize, MaterializedRow};
pub use templates::{DataSource, ReportTemplate, TEMPLATES};

use std::io;

/// Serializes a set of already-projected rows to CSV with a header row, UTF-8, matching
/// the column order baked into each row (every row in a template's output shares columns).
pub fn rows_to_csv(rows: &[MaterializedRow]) -> io::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if let Some(first) = rows.first() {
        let header: Vec<&str> = first.iter().map(|(k, _)| k.as_str()).collect();
        writer.write_record(&header)?;
    }

    for row in rows {
        let values: Vec<&str> = row.iter().map(|(_, v)| v.as_str()).collect();
        writer.write_record(&values)?;
    }

    writer
        .into_inner()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_output_has_header_and_rows() {
        let rows = vec![
            vec![("Campaign Name".to_string(), "A".to_string()), ("Amount Spent".to_string(), "10.00".to_string())],
            vec![("Campaign Name".to_string(), "B".to_string()), ("Amount Spent".to_string(), "20.00".to_string())],
        ];
        let csv_bytes = rows_to_csv(&rows).unwrap();
        let text = String::from_utf8(csv_bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "Campaign Name,Amount Spent");
        assert_eq!(lines.next().unwrap(), "A,10.00");
        assert_eq!(lines.next().unwrap(), "B,20.00");
    }

    #[test]
    fn empty_rows_produce_empty_csv() {
        let csv_bytes = rows_to_csv(&[]).unwrap();
        assert!(csv_bytes.is_empty());
    }
}
