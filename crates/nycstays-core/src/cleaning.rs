use polars::prelude::*;
use serde::Serialize;

use crate::error::{PipelineError, Result};

// Fixed NYC bounding box; rows geocoded outside it are dropped.
pub const MIN_LONGITUDE: f64 = -74.25;
pub const MAX_LONGITUDE: f64 = -73.50;
pub const MIN_LATITUDE: f64 = 40.5;
pub const MAX_LATITUDE: f64 = 41.2;

pub const PRICE: &str = "price";
pub const LONGITUDE: &str = "longitude";
pub const LATITUDE: &str = "latitude";
pub const LAST_REVIEW: &str = "last_review";

pub const REQUIRED_COLUMNS: [&str; 4] = [PRICE, LONGITUDE, LATITUDE, LAST_REVIEW];

#[derive(Debug, Clone, Copy)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleaningSummary {
    pub rows_in: usize,
    pub rows_priced: usize,
    pub rows_out: usize,
    pub null_review_dates: usize,
}

#[derive(Debug)]
pub struct CleaningOutput {
    pub dataframe: DataFrame,
    pub summary: CleaningSummary,
}

/// Apply the cleaning rules to a raw listings table: drop price outliers,
/// drop rows geocoded outside the NYC bounding box, then convert
/// `last_review` from text to a date column. Unparseable or empty review
/// dates become null rather than failing the run.
///
/// All other columns pass through untouched, in their original order.
pub fn clean_listings(df: &DataFrame, bounds: &PriceBounds) -> Result<CleaningOutput> {
    ensure_required_columns(df)?;

    let rows_in = df.height();

    let priced = df
        .clone()
        .lazy()
        .filter(
            col(PRICE)
                .gt_eq(lit(bounds.min))
                .and(col(PRICE).lt_eq(lit(bounds.max))),
        )
        .collect()?;
    let rows_priced = priced.height();

    let bounded = priced
        .lazy()
        .filter(
            col(LONGITUDE)
                .gt_eq(lit(MIN_LONGITUDE))
                .and(col(LONGITUDE).lt_eq(lit(MAX_LONGITUDE)))
                .and(col(LATITUDE).gt_eq(lit(MIN_LATITUDE)))
                .and(col(LATITUDE).lt_eq(lit(MAX_LATITUDE))),
        )
        .collect()?;

    let converted = convert_last_review(bounded)?;

    let rows_out = converted.height();
    let null_review_dates = converted.column(LAST_REVIEW)?.null_count();

    Ok(CleaningOutput {
        dataframe: converted,
        summary: CleaningSummary {
            rows_in,
            rows_priced,
            rows_out,
            null_review_dates,
        },
    })
}

fn ensure_required_columns(df: &DataFrame) -> Result<()> {
    for name in REQUIRED_COLUMNS {
        if df.column(name).is_err() {
            return Err(PipelineError::MissingColumn(name.to_string()));
        }
    }
    Ok(())
}

fn convert_last_review(df: DataFrame) -> Result<DataFrame> {
    // Already a date column, e.g. when re-cleaning a previously cleaned table.
    if matches!(df.column(LAST_REVIEW)?.dtype(), DataType::Date) {
        return Ok(df);
    }

    let converted = df
        .lazy()
        .with_column(
            col(LAST_REVIEW)
                .cast(DataType::String)
                .str()
                .strptime(
                    DataType::Date,
                    StrptimeOptions {
                        format: None,
                        strict: false,
                        exact: true,
                        cache: true,
                    },
                    lit("raise"),
                )
                .alias(LAST_REVIEW),
        )
        .collect()?;

    Ok(converted)
}
