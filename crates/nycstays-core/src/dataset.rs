use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::Result;

/// Read a listings table from a CSV file with a header row.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Write a table as UTF-8 CSV with a header row and no index column. Date
/// columns render as ISO `YYYY-MM-DD`; nulls render as empty fields.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Column names from a CSV header without loading the table.
pub fn read_headers(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?;
    Ok(headers.iter().map(|name| name.to_string()).collect())
}
