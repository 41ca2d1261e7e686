//! CSV export of time-series rows.
//!
//! Columns come from the first row's keys in their original order. Every
//! field is quoted; cells absent from a row, or null, are written empty.

use serde_json::Value;
use snafu::ResultExt;
use std::io::Write;
use std::path::Path;

use crate::api::types::SeriesRow;
use crate::error::{CsvSnafu, ExportError, IoSnafu};
use crate::logging::{log, obj, v_num, v_str, Domain, Level};

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn write_rows<W: Write>(rows: &[SeriesRow], out: W) -> Result<W, ExportError> {
    let first = rows.first().ok_or(ExportError::Empty)?;
    let header: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(out);
    writer.write_record(&header).context(CsvSnafu)?;
    for row in rows {
        writer
            .write_record(header.iter().map(|k| cell(row.get(*k))))
            .context(CsvSnafu)?;
    }
    writer.into_inner().map_err(|e| e.into_error()).context(IoSnafu)
}

pub fn to_csv_string(rows: &[SeriesRow]) -> Result<String, ExportError> {
    let bytes = write_rows(rows, Vec::new())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_csv(rows: &[SeriesRow], path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).context(IoSnafu)?;
    let mut file = write_rows(rows, file)?;
    file.flush().context(IoSnafu)?;
    log(
        Level::Info,
        Domain::Export,
        "csv_written",
        obj(&[
            ("path", v_str(&path.display().to_string())),
            ("rows", v_num(rows.len() as f64)),
        ]),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> SeriesRow {
        match v {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    #[test]
    fn quotes_every_field_and_doubles_quotes() {
        let rows = vec![
            row(json!({"settlement_date": "2024-01-01", "note": "say \"hi\"", "net_volume": 1.5})),
            row(json!({"settlement_date": "2024-01-02", "note": null, "net_volume": -2})),
        ];
        let csv = to_csv_string(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], r#""settlement_date","note","net_volume""#);
        assert_eq!(lines[1], r#""2024-01-01","say ""hi""","1.5""#);
        assert_eq!(lines[2], r#""2024-01-02","","-2""#);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn missing_cells_are_empty_and_extra_keys_dropped() {
        let rows = vec![
            row(json!({"a": 1, "b": 2})),
            row(json!({"b": 3, "c": 4})),
        ];
        let csv = to_csv_string(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, [r#""a","b""#, r#""1","2""#, r#""","3""#]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(to_csv_string(&[]), Err(ExportError::Empty)));
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.csv");
        write_csv(&[row(json!({"x": true}))], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), [r#""x""#, r#""true""#]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("series.csv");
        let err = write_csv(&[row(json!({"x": 1}))], &path).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
