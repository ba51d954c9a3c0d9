//! CSV ingest for ramp-operations exports
//!
//! Turns export files into `RawRow`s for the pipeline. Handles:
//! - quoted fields with embedded commas, line breaks and `""` escapes
//! - header names with stray whitespace and a UTF-8 byte-order mark
//! - date columns exported under alternative names (renamed to `Date`)
//! - several monthly exports concatenated in order
//!
//! Cells are kept as text; typed interpretation happens in `FlightRow`
//! and `WeatherObservation`.

use crate::types::{columns, RawRow};
use crate::weather::{self, WeatherObservation};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Header names accepted for the schedule date column, in priority order.
pub const DATE_ALIASES: [&str; 6] = ["Date", "date", "DATE", "일자", "날짜", "OpDate"];

/// File-name marker of ramp exports when scanning a directory.
const RAMP_FILE_MARKER: &str = "RAMP";

const UTF8_BOM: char = '\u{feff}';

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV input has no header line")]
    MissingHeader,

    #[error(
        "No date column found (expected one of: {}); headers present: [{}]",
        DATE_ALIASES.join(", "),
        .0.join(", ")
    )]
    MissingDateColumn(Vec<String>),

    #[error("Required column '{column}' not found; headers present: [{}]", .headers.join(", "))]
    MissingColumn {
        column: &'static str,
        headers: Vec<String>,
    },

    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<IngestError>,
    },

    #[error("No rows loaded from {0} input file(s)")]
    NoRows(usize),
}

impl IngestError {
    fn in_file(path: &Path, source: IngestError) -> Self {
        IngestError::File {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }
}

// ============================================================================
// Header handling
// ============================================================================

/// Trimmed header names with any byte-order mark removed.
fn clean_headers(record: &csv::StringRecord) -> Vec<String> {
    record
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches(UTF8_BOM) } else { h };
            h.trim().to_string()
        })
        .collect()
}

/// Rename the first date-alias header to `Date`.
fn normalize_date_header(headers: &mut [String]) -> Result<(), IngestError> {
    let position = headers
        .iter()
        .position(|h| DATE_ALIASES.contains(&h.as_str()))
        .ok_or_else(|| IngestError::MissingDateColumn(headers.to_vec()))?;
    if headers[position] != columns::DATE {
        debug!(from = %headers[position], "Renaming date column to Date");
        headers[position] = columns::DATE.to_string();
    }
    Ok(())
}

fn require_column(headers: &[String], column: &'static str) -> Result<(), IngestError> {
    if headers.iter().any(|h| h == column) {
        Ok(())
    } else {
        Err(IngestError::MissingColumn {
            column,
            headers: headers.to_vec(),
        })
    }
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|cell| cell.trim().is_empty())
}

/// Read a headed CSV. `check_headers` may rename or reject header names
/// before any row is built.
fn read_csv<R, F>(reader: R, check_headers: F) -> Result<Vec<RawRow>, IngestError>
where
    R: Read,
    F: FnOnce(&mut [String]) -> Result<(), IngestError>,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = reader.records();

    let header_record = loop {
        match records.next() {
            Some(record) => {
                let record = record?;
                if !is_blank(&record) {
                    break record;
                }
            }
            None => return Err(IngestError::MissingHeader),
        }
    };

    let mut headers = clean_headers(&header_record);
    check_headers(&mut headers)?;

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        if record.len() > headers.len() {
            debug!(
                line = record.position().map_or(0, csv::Position::line),
                cells = record.len(),
                headers = headers.len(),
                "Extra cells ignored"
            );
        }
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .filter(|(h, _)| !h.is_empty())
                .map(|(h, cell)| (h.clone(), cell.to_string()))
                .collect::<RawRow>(),
        );
    }
    Ok(rows)
}

// ============================================================================
// Public entry points
// ============================================================================

/// Parse a ramp export. The header must contain a schedule date column
/// under one of [`DATE_ALIASES`].
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, IngestError> {
    read_csv(reader, normalize_date_header)
}

/// Parse any headed CSV table (stand tables, lookups) without the date
/// column requirement.
pub fn parse_table<R: Read>(reader: R) -> Result<Vec<RawRow>, IngestError> {
    read_csv(reader, |_| Ok(()))
}

/// Parse an hourly weather observation export. The header must contain the
/// observation time column; rows whose time does not parse are dropped.
pub fn parse_weather<R: Read>(reader: R) -> Result<Vec<WeatherObservation>, IngestError> {
    let rows = read_csv(reader, |headers| require_column(headers, weather::columns::OBSERVED_AT))?;
    Ok(weather::observations_from_rows(&rows))
}

/// Load one ramp export from disk.
pub fn load_file(path: &Path) -> Result<Vec<RawRow>, IngestError> {
    let file = File::open(path).map_err(|e| IngestError::in_file(path, e.into()))?;
    let rows = parse_rows(file).map_err(|e| IngestError::in_file(path, e))?;
    debug!(path = %path.display(), rows = rows.len(), "Ramp export loaded");
    Ok(rows)
}

/// Load a headed table from disk without the date column requirement.
pub fn load_table(path: &Path) -> Result<Vec<RawRow>, IngestError> {
    let file = File::open(path).map_err(|e| IngestError::in_file(path, e.into()))?;
    parse_table(file).map_err(|e| IngestError::in_file(path, e))
}

/// Load a weather or snow observation export from disk.
pub fn load_weather(path: &Path) -> Result<Vec<WeatherObservation>, IngestError> {
    let file = File::open(path).map_err(|e| IngestError::in_file(path, e.into()))?;
    let observations = parse_weather(file).map_err(|e| IngestError::in_file(path, e))?;
    debug!(path = %path.display(), observations = observations.len(), "Weather export loaded");
    Ok(observations)
}

/// Load and concatenate several exports in argument order. Files that fail
/// to load are skipped with a warning; an empty overall result is an error.
pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<RawRow>, IngestError> {
    let mut rows = Vec::new();
    let mut loaded = 0usize;

    for path in paths {
        let path = path.as_ref();
        match load_file(path) {
            Ok(file_rows) => {
                loaded += 1;
                rows.extend(file_rows);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable ramp export"),
        }
    }

    if rows.is_empty() {
        return Err(IngestError::NoRows(paths.len()));
    }
    info!(files = loaded, skipped = paths.len() - loaded, rows = rows.len(), "Ramp exports loaded");
    Ok(rows)
}

/// Ramp exports (`*RAMP*.csv`) in a directory, sorted by file name.
pub fn find_ramp_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::in_file(dir, e.into()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_ramp_export(p))
        .collect();
    files.sort();
    Ok(files)
}

fn is_ramp_export(path: &Path) -> bool {
    let has_csv_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let has_marker = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains(RAMP_FILE_MARKER));
    has_csv_ext && has_marker
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_quoted_fields() {
        let data = "FLT,Date,DES,Note\nKE1,250110,\"Seoul, ICN\",\"say \"\"hi\"\"\"\nKE2,250110,,\n";
        let rows = parse_rows(Cursor::new(data)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text(columns::DESTINATION).as_deref(), Some("Seoul, ICN"));
        assert_eq!(rows[0].text("Note").as_deref(), Some(r#"say "hi""#));
        assert!(rows[1].text(columns::DESTINATION).is_none());
    }

    #[test]
    fn test_quoted_line_break_stays_in_one_row() {
        let data = "FLT,Date,STD,DES\nKE1,250110,10:00,\"Tokyo\nHaneda\"\nKE2,250110,11:00,NRT\n";
        let rows = parse_rows(Cursor::new(data)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text(columns::FLIGHT).as_deref(), Some("KE1"));
        assert_eq!(rows[0].text(columns::DESTINATION).as_deref(), Some("Tokyo\nHaneda"));
        assert_eq!(rows[1].text(columns::FLIGHT).as_deref(), Some("KE2"));
        assert_eq!(rows[1].text(columns::STD).as_deref(), Some("11:00"));
    }

    #[test]
    fn test_headers_trimmed_and_bom_removed() {
        let data = "\u{feff} FLT , Date ,STD\nKE1,250110,09:00\n";
        let rows = parse_rows(Cursor::new(data)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("FLT").as_deref(), Some("KE1"));
        assert_eq!(rows[0].text("Date").as_deref(), Some("250110"));
    }

    #[test]
    fn test_date_alias_renamed() {
        let data = "FLT,일자,STD\nOZ2,250301,10:00\n";
        let rows = parse_rows(Cursor::new(data)).unwrap();
        assert_eq!(rows[0].text(columns::DATE).as_deref(), Some("250301"));
        assert!(!rows[0].contains("일자"));
    }

    #[test]
    fn test_missing_date_column() {
        let err = parse_rows(Cursor::new("FLT,STD\nKE1,09:00\n")).unwrap_err();
        match err {
            IngestError::MissingDateColumn(headers) => assert_eq!(headers, vec!["FLT", "STD"]),
            other => panic!("unexpected error: {other}"),
        }
        // Tables without a date are fine through parse_table
        assert_eq!(parse_table(Cursor::new("Stand_ID,Zone\n101,A\n")).unwrap().len(), 1);
    }

    #[test]
    fn test_short_rows_and_blank_lines() {
        let data = "FLT,Date,STD,RAM\n\nKE1,250110\n\nKE2,250110,10:00,10:05\n";
        let rows = parse_rows(Cursor::new(data)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].text(columns::STD).is_none());
        assert_eq!(rows[1].text(columns::RAM).as_deref(), Some("10:05"));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_rows(Cursor::new("")), Err(IngestError::MissingHeader)));
        assert!(matches!(parse_rows(Cursor::new("\n \n")), Err(IngestError::MissingHeader)));
    }

    #[test]
    fn test_weather_requires_observation_time() {
        let data = "일시,풍속(KT),시정(m)\n2025-01-10 08:00,12,800\nbad,3,9000\n";
        let observations = parse_weather(Cursor::new(data)).unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].wind_speed_kt, Some(12.0));

        match parse_weather(Cursor::new("time,wind\n08:00,3\n")).unwrap_err() {
            IngestError::MissingColumn { column, headers } => {
                assert_eq!(column, weather::columns::OBSERVED_AT);
                assert_eq!(headers, vec!["time", "wind"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ramp_file_name_filter() {
        assert!(is_ramp_export(Path::new("data/2025_01_RAMP.csv")));
        assert!(is_ramp_export(Path::new("RAMP_feb.CSV")));
        assert!(!is_ramp_export(Path::new("stands.csv")));
        assert!(!is_ramp_export(Path::new("RAMP.xlsx")));
    }
}
