//! Report export: CSV files and a ZIP bundle.
//!
//! Both outputs carry the same two files:
//!
//! - `Detailed_Sales.csv` - the enriched table
//! - `Pivot_Summary.csv` - the pivot table
//!
//! Nulls are written as empty fields, dates as ISO `YYYY-MM-DD` and floats
//! with at least one decimal (`12.0`).

use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use ::zip::write::FileOptions;
use ::zip::{CompressionMethod, ZipWriter};

use crate::error::ExportResult;
use crate::transform::Report;

pub const DETAILED_FILE: &str = "Detailed_Sales.csv";
pub const PIVOT_FILE: &str = "Pivot_Summary.csv";

/// Render a frame as CSV text with a header row.
pub fn to_csv_string(df: &DataFrame) -> ExportResult<String> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df.clone())?;
    Ok(String::from_utf8(buf)?)
}

/// Write both report files into `dir`, creating it if needed.
///
/// Returns the paths written, detailed file first.
pub fn write_report_dir(report: &Report, dir: impl AsRef<Path>) -> ExportResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(2);
    for (name, table) in report_files(report) {
        let path = dir.join(name);
        fs::write(&path, to_csv_string(table)?)?;
        written.push(path);
    }
    Ok(written)
}

/// Write both report files into a deflated ZIP archive.
pub fn write_report_zip<W: Write + Seek>(report: &Report, writer: W) -> ExportResult<W> {
    let mut zip = ZipWriter::new(writer);
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, table) in report_files(report) {
        zip.start_file(name, options)?;
        zip.write_all(to_csv_string(table)?.as_bytes())?;
    }
    Ok(zip.finish()?)
}

/// The ZIP bundle as bytes, for hosts that serve it as a download.
pub fn report_zip_bytes(report: &Report) -> ExportResult<Vec<u8>> {
    let cursor = write_report_zip(report, Cursor::new(Vec::new()))?;
    Ok(cursor.into_inner())
}

fn report_files(report: &Report) -> [(&'static str, &DataFrame); 2] {
    [(DETAILED_FILE, &report.enriched), (PIVOT_FILE, &report.pivot)]
}
