//! CSV loader with encoding and delimiter auto-detection.
//!
//! Turns a sales or master export into a `DataFrame`. Column types come from
//! polars schema inference over the whole file; text is kept exactly as
//! exported (trimming is the normalizer's job). No sales-specific logic here.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;

use crate::error::{LoadError, LoadResult};

/// A loaded frame with the detected source format.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub frame: DataFrame,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding. Unknown encodings
/// fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    // Spreadsheet exports often start with a byte order mark.
    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Detect the delimiter by counting occurrences in the header line.
///
/// Blank lines ahead of the header are skipped.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Load a CSV file with auto-detection of encoding and delimiter.
pub fn load_csv_file(path: impl AsRef<Path>) -> LoadResult<LoadedTable> {
    let bytes = std::fs::read(path.as_ref())?;
    load_bytes_auto(&bytes)
}

/// Load CSV bytes with auto-detection of encoding and delimiter.
pub fn load_bytes_auto(bytes: &[u8]) -> LoadResult<LoadedTable> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let frame = load_str(&content, delimiter)?;

    Ok(LoadedTable {
        frame,
        encoding,
        delimiter,
    })
}

/// Load CSV text with an explicit delimiter.
///
/// The file is read twice: once as plain text to find columns holding codes
/// with significant leading zeros, then with full schema inference. Those
/// code columns keep their text form; everything else takes the inferred
/// type. Rows with no value at all are dropped.
pub fn load_str(content: &str, delimiter: char) -> LoadResult<DataFrame> {
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }
    let names = read_headers(content, delimiter)?;

    let raw = read_frame(content, delimiter, Some(0))?;
    let mut frame = read_frame(content, delimiter, None)?;
    for column in raw.get_columns() {
        let text = column.str()?;
        if text.into_iter().flatten().any(|v| has_leading_zero(v.trim())) {
            frame.with_column(column.clone())?;
        }
    }

    frame.set_column_names(names)?;
    Ok(drop_blank_rows(frame)?)
}

/// `infer_rows` of `Some(0)` reads every column as text; `None` infers from
/// the whole file.
fn read_frame(content: &str, delimiter: char, infer_rows: Option<usize>) -> PolarsResult<DataFrame> {
    let options = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(infer_rows)
        .map_parse_options(|parse| {
            parse
                .with_separator(delimiter as u8)
                .with_try_parse_dates(infer_rows != Some(0))
                .with_truncate_ragged_lines(true)
        });
    let mut cursor = Cursor::new(content.as_bytes());
    options.into_reader_with_file_handle(&mut cursor).finish()
}

fn read_headers(content: &str, delimiter: char) -> LoadResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(csv_error)?;
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::NoHeaders);
    }
    Ok(unique_headers(headers.iter()))
}

fn drop_blank_rows(frame: DataFrame) -> PolarsResult<DataFrame> {
    let mut keep = BooleanChunked::full("keep".into(), false, frame.height());
    for column in frame.get_columns() {
        keep = &keep | &column.is_not_null();
    }
    frame.filter(&keep)
}

fn csv_error(e: csv::Error) -> LoadError {
    let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
    LoadError::Parse {
        line,
        message: e.to_string(),
    }
}

/// Trim header names, name blank headers by position and suffix repeats
/// with `.1`, `.2`, ...
fn unique_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .enumerate()
        .map(|(i, h)| {
            let base = match h.trim() {
                "" => format!("Unnamed: {}", i),
                name => name.to_string(),
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// A value with a significant leading zero, like a product code `0090019`.
fn has_leading_zero(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.len() > 1
        && digits.starts_with('0')
        && !digits.starts_with("0.")
        && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::columns;

    fn text(frame: &DataFrame, name: &str, row: usize) -> Option<String> {
        frame.column(name).unwrap().str().unwrap().get(row).map(str::to_string)
    }

    fn names(frame: &DataFrame) -> Vec<String> {
        frame.get_column_names().iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_simple_csv() {
        let frame = load_str("name;age\nAlice;30\nBob;25", ';').unwrap();

        assert_eq!(frame.height(), 2);
        assert_eq!(names(&frame), vec!["name", "age"]);
        assert_eq!(text(&frame, "name", 0).as_deref(), Some("Alice"));
        assert_eq!(frame.column("age").unwrap().i64().unwrap().get(1), Some(25));
    }

    #[test]
    fn test_quoted_values_keep_padding() {
        let csv = "name,value\n\"Alice\",\"  Hello, World \"";
        let frame = load_str(csv, ',').unwrap();
        assert_eq!(text(&frame, "value", 0).as_deref(), Some("  Hello, World "));
    }

    #[test]
    fn test_empty_rows_dropped() {
        let frame = load_str("a,b,c\n1,2,3\n,,\n4,5,\n", ',').unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.column("c").unwrap().get(1).unwrap(), AnyValue::Null);
    }

    #[test]
    fn test_leading_zero_codes_stay_text() {
        let frame = load_str("Product Code,Qty\n0090019,5\n1200,7.5", ',').unwrap();
        assert_eq!(frame.column("Product Code").unwrap().dtype(), &DataType::String);
        assert_eq!(text(&frame, "Product Code", 0).as_deref(), Some("0090019"));
        assert_eq!(text(&frame, "Product Code", 1).as_deref(), Some("1200"));
        assert_eq!(frame.column("Qty").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_mixed_measure_column_is_text() {
        let frame = load_str("Qty\n10\nN/A\n2.5", ',').unwrap();
        assert_eq!(frame.column("Qty").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_iso_dates_inferred() {
        let frame = load_str("Billing Date,Note\n2024-07-15,a\n2024-08-01,b\n", ',').unwrap();
        assert_eq!(frame.column("Billing Date").unwrap().dtype(), &DataType::Date);
        assert_eq!(frame.column("Note").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let frame = load_str("A,A,\n1,2,3", ',').unwrap();
        assert_eq!(names(&frame), vec!["A", "A.1", "Unnamed: 2"]);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(load_str("", ','), Err(LoadError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_auto_load_strips_bom() {
        let bytes = "\u{feff}Product Code,Customer Name\nP1,Retail Co\n".as_bytes();
        let loaded = load_bytes_auto(bytes).unwrap();
        assert_eq!(loaded.delimiter, ',');
        assert!(columns::exists(&loaded.frame, "Product Code"));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.csv");
        std::fs::write(&path, "Product Code;PLI APP\nP1;Spices\n").unwrap();
        let loaded = load_csv_file(&path).unwrap();
        assert_eq!(loaded.delimiter, ';');
        assert_eq!(loaded.frame.height(), 1);
    }
}
