//! Conversions between polars frames and synthesis rows.

use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use polars::prelude::*;
#[cfg(feature = "parquet")]
use polars::prelude::ParquetReader;

use nwsynth_core::{SpatialResolution, SynthesisRow, SynthesisTable};

use crate::export::OutputFormat;
use crate::registry::{RawRow, RawTable};

pub const VARIABLE_COLUMN: &str = "variable";
pub const STAGE_COLUMN: &str = "stage";
pub const START_COLUMN: &str = "start_date";
pub const END_COLUMN: &str = "end_date";
pub const SCENARIO_COLUMN: &str = "scenario";
pub const BLOCK_COLUMN: &str = "block";
pub const BLOCK_HOURS_COLUMN: &str = "block_hours";
pub const VALUE_COLUMN: &str = "value";
pub const LOWER_COLUMN: &str = "lower_bound";
pub const UPPER_COLUMN: &str = "upper_bound";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read a deck or exported table; the extension picks the [`OutputFormat`].
pub fn read_frame(path: &Path) -> Result<DataFrame> {
    let format = OutputFormat::of_path(path)
        .ok_or_else(|| anyhow!("not a .csv or .parquet table"))?;
    let file = File::open(path).context("opening table")?;
    let frame = match format {
        OutputFormat::Csv => CsvReader::new(file).has_header(true).finish(),
        #[cfg(feature = "parquet")]
        OutputFormat::Parquet => ParquetReader::new(file).finish(),
        #[cfg(not(feature = "parquet"))]
        OutputFormat::Parquet => anyhow::bail!("built without parquet support"),
    };
    frame.with_context(|| format!("decoding {format} table"))
}

fn utf8_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::Utf8)
        .with_context(|| format!("casting column '{name}' to text"))?;
    Ok(series
        .utf8()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .collect())
}

/// Integer column; nulls are rejected.
pub fn column_i32(df: &DataFrame, name: &str) -> Result<Vec<i32>> {
    let series = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::Int32)
        .with_context(|| format!("casting column '{name}' to Int32"))?;
    series
        .i32()?
        .into_iter()
        .map(|v| v.ok_or_else(|| anyhow!("null value in column '{name}'")))
        .collect()
}

/// Float column; nulls are rejected.
pub fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::Float64)
        .with_context(|| format!("casting column '{name}' to Float64"))?;
    series
        .f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| anyhow!("null value in column '{name}'")))
        .collect()
}

pub fn column_str(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    utf8_values(df, name)?
        .into_iter()
        .map(|v| v.ok_or_else(|| anyhow!("null value in column '{name}'")))
        .collect()
}

/// Boolean column written as `true`/`false` or `1`/`0`.
pub fn column_bool(df: &DataFrame, name: &str) -> Result<Vec<bool>> {
    utf8_values(df, name)?
        .into_iter()
        .map(|v| match v.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") | None => Ok(false),
            Some(other) => Err(anyhow!("invalid boolean '{other}' in column '{name}'")),
        })
        .collect()
}

/// Date column (`YYYY-MM-DD` text or a Date column); nulls become `None`.
pub fn column_opt_date(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    utf8_values(df, name)?
        .into_iter()
        .map(|v| {
            v.map(|s| {
                NaiveDate::parse_from_str(&s, DATE_FORMAT)
                    .with_context(|| format!("invalid date '{s}' in column '{name}'"))
            })
            .transpose()
        })
        .collect()
}

pub fn column_date(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    column_opt_date(df, name)?
        .into_iter()
        .map(|v| v.ok_or_else(|| anyhow!("null value in column '{name}'")))
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| *c == name)
}

/// Raw output rows from a frame with `date`, `scenario`, `block`, `value`
/// and an optional `code` column.
pub fn raw_table_from_frame(df: &DataFrame) -> Result<RawTable> {
    let dates = column_date(df, "date")?;
    let scenarios = column_i32(df, SCENARIO_COLUMN)?;
    let blocks = column_i32(df, BLOCK_COLUMN)?;
    let values = column_f64(df, VALUE_COLUMN)?;
    let codes = if has_column(df, "code") {
        Some(column_i32(df, "code")?)
    } else {
        None
    };
    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        if scenarios[i] < 1 || blocks[i] < 0 {
            return Err(anyhow!(
                "row {i}: scenario must be >= 1 and block >= 0 (got {}, {})",
                scenarios[i],
                blocks[i]
            ));
        }
        let mut row = RawRow::new(dates[i], scenarios[i] as u32, blocks[i] as u32, values[i]);
        if let Some(codes) = &codes {
            row = row.with_code(codes[i]);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn epoch_days(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() as i32
}

fn date_series(name: &str, dates: impl Iterator<Item = NaiveDate>) -> Result<Series> {
    let days: Vec<i32> = dates.map(epoch_days).collect();
    Series::new(name, days)
        .cast(&DataType::Date)
        .with_context(|| format!("casting '{name}' to Date"))
}

fn build_frame<'a>(
    resolution: SpatialResolution,
    labels: Option<Vec<&str>>,
    rows: Vec<&'a SynthesisRow>,
) -> Result<DataFrame> {
    let mut columns = Vec::new();
    if let Some(labels) = labels {
        columns.push(Series::new(VARIABLE_COLUMN, labels));
    }
    for (index, (code_column, name_column)) in resolution.entity_columns().iter().enumerate() {
        let mut codes = Vec::with_capacity(rows.len());
        let mut names = Vec::with_capacity(rows.len());
        for row in &rows {
            let labels = row.entity.labels();
            let (code, name) = labels
                .get(index)
                .copied()
                .ok_or_else(|| anyhow!("entity {} lacks column '{code_column}'", row.entity))?;
            codes.push(code);
            names.push(name.to_string());
        }
        columns.push(Series::new(code_column, codes));
        columns.push(Series::new(name_column, names));
    }
    columns.push(Series::new(
        STAGE_COLUMN,
        rows.iter().map(|r| i64::from(r.stage)).collect::<Vec<_>>(),
    ));
    columns.push(date_series(START_COLUMN, rows.iter().map(|r| r.start))?);
    columns.push(date_series(END_COLUMN, rows.iter().map(|r| r.end))?);
    columns.push(Series::new(
        SCENARIO_COLUMN,
        rows.iter().map(|r| r.scenario.to_string()).collect::<Vec<_>>(),
    ));
    columns.push(Series::new(
        BLOCK_COLUMN,
        rows.iter().map(|r| i64::from(r.block)).collect::<Vec<_>>(),
    ));
    columns.push(Series::new(
        BLOCK_HOURS_COLUMN,
        rows.iter().map(|r| r.block_hours).collect::<Vec<_>>(),
    ));
    columns.push(Series::new(
        VALUE_COLUMN,
        rows.iter().map(|r| r.value).collect::<Vec<_>>(),
    ));
    columns.push(Series::new(
        LOWER_COLUMN,
        rows.iter().map(|r| r.lower).collect::<Vec<_>>(),
    ));
    columns.push(Series::new(
        UPPER_COLUMN,
        rows.iter().map(|r| r.upper).collect::<Vec<_>>(),
    ));
    DataFrame::new(columns).context("assembling synthesis frame")
}

/// Frame of one synthesis table, in row order.
pub fn table_frame(table: &SynthesisTable) -> Result<DataFrame> {
    build_frame(table.resolution, None, table.rows.iter().collect())
}

/// Frame of rows from several syntheses, each tagged with its variable.
pub fn labeled_frame(
    resolution: SpatialResolution,
    rows: &[(&str, &SynthesisRow)],
) -> Result<DataFrame> {
    let labels = rows.iter().map(|(label, _)| *label).collect();
    build_frame(resolution, Some(labels), rows.iter().map(|(_, r)| *r).collect())
}
