use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{
    Array, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray, TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{
    CellValue, ClusterRow, ClusterTable, ForecastRecord, ForecastTable, Observation,
    ObservationTable,
};
use crate::config::ObservationColumns;
use crate::error::{DashboardError, DashboardResult};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the rainfall observations.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one observation per line
/// * `.json`    – `[{ "date": "2021-01-01", "ADM2_PCODE": "BT001", "rfh": 3.2 }, ...]`
/// * `.parquet` – flat columns; the date may be a string, Date32 or Timestamp
///
/// A missing file is [`DashboardError::DataUnavailable`]; anything that
/// fails to parse is [`DashboardError::DataCorrupt`].
pub fn load_observations(path: &Path, columns: &ObservationColumns) -> DashboardResult<ObservationTable> {
    ensure_exists(path)?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, columns),
        "json" => load_json(path, columns),
        "csv" | "txt" => load_csv(path, columns),
        other => Err(anyhow!("Unsupported file extension: .{other}")),
    };
    let raw = parsed.map_err(|e| DashboardError::corrupt(path, &e))?;

    let total = raw.len();
    let rows: Vec<Observation> = raw.into_iter().flatten().collect();
    if rows.len() < total {
        log::warn!(
            "{}: dropped {} of {total} rows with missing, negative or non-finite rainfall",
            path.display(),
            total - rows.len()
        );
    }

    let table = ObservationTable::from_rows(rows);
    if table.is_empty() {
        log::warn!("{} has no usable observations", path.display());
    }
    log::info!(
        "Loaded {} observations for {} regions from {}",
        table.len(),
        table.region_codes.len(),
        path.display()
    );
    Ok(table)
}

/// Load the forecast artifact (`ds`, `yhat`, optional `yhat_lower`,
/// `yhat_upper`, `y`).
pub fn load_forecast(path: &Path) -> DashboardResult<ForecastTable> {
    ensure_exists(path)?;
    let table = parse_forecast(path).map_err(|e| DashboardError::corrupt(path, &e))?;

    let inverted = table
        .rows
        .iter()
        .filter(|r| match (r.lower_bound_mm, r.upper_bound_mm) {
            (Some(lo), Some(hi)) => lo > r.predicted_mm || r.predicted_mm > hi,
            _ => false,
        })
        .count();
    if table.is_empty() {
        log::warn!("{} has a header but no forecast rows", path.display());
    }
    if inverted > 0 {
        log::warn!(
            "{}: {inverted} forecast rows have the prediction outside its bounds",
            path.display()
        );
    }

    log::info!("Loaded {} forecast rows from {}", table.len(), path.display());
    Ok(table)
}

/// Load the cluster summary. Only the label column is required; every
/// other column is kept with a guessed cell type.
pub fn load_cluster_summary(path: &Path) -> DashboardResult<ClusterTable> {
    ensure_exists(path)?;
    let table = parse_cluster_summary(path).map_err(|e| DashboardError::corrupt(path, &e))?;
    if table.is_empty() {
        log::warn!("{} has no clusters", path.display());
    }
    log::info!(
        "Loaded {} clusters with columns {:?} from {}",
        table.len(),
        table.columns,
        path.display()
    );
    Ok(table)
}

fn ensure_exists(path: &Path) -> DashboardResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        log::debug!("{} does not exist", path.display());
        Err(DashboardError::DataUnavailable {
            path: path.to_path_buf(),
        })
    }
}

// ---------------------------------------------------------------------------
// Field parsing shared by all formats
// ---------------------------------------------------------------------------

/// Parse a calendar date. Accepts plain dates, `date time` stamps and
/// RFC 3339; only the date part is kept.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    bail!("'{s}' is not a date")
}

fn parse_optional_f64(s: &str) -> Result<Option<f64>> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    s.parse::<f64>()
        .map(Some)
        .with_context(|| format!("'{s}' is not a number"))
}

/// Year columns written as floats (`2021.0`) count when the value is whole;
/// anything else falls back to the date's year.
fn whole_year(y: f64) -> Option<i32> {
    (y.is_finite() && y.fract() == 0.0 && y.abs() <= f64::from(i32::MAX)).then_some(y as i32)
}

/// Rows without a usable rainfall value are dropped (`None`).
fn observation(region: String, date: NaiveDate, rainfall: Option<f64>, year: Option<i32>) -> Option<Observation> {
    let rainfall = rainfall.filter(|v| v.is_finite() && *v >= 0.0)?;
    Some(Observation::new(region, date, rainfall, year))
}

// ---------------------------------------------------------------------------
// CSV loaders
// ---------------------------------------------------------------------------

fn column_index(headers: &[String], name: &str, file_kind: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("{file_kind} missing '{name}' column"))
}

fn read_headers<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Vec<String>> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        bail!("CSV has no header row");
    }
    Ok(headers)
}

fn load_csv(path: &Path, columns: &ObservationColumns) -> Result<Vec<Option<Observation>>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = read_headers(&mut reader)?;

    let date_idx = column_index(&headers, &columns.date, "CSV")?;
    let region_idx = column_index(&headers, &columns.region, "CSV")?;
    let rain_idx = column_index(&headers, &columns.rainfall, "CSV")?;
    let year_idx = headers.iter().position(|h| *h == columns.year);

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let date = parse_date(record.get(date_idx).unwrap_or(""))
            .with_context(|| format!("CSV row {row_no}, '{}'", columns.date))?;
        let region = record.get(region_idx).unwrap_or("").trim().to_string();
        let rainfall = parse_optional_f64(record.get(rain_idx).unwrap_or(""))
            .with_context(|| format!("CSV row {row_no}, '{}'", columns.rainfall))?;
        let year = match year_idx.and_then(|i| record.get(i)) {
            Some(s) => parse_optional_f64(s)
                .with_context(|| format!("CSV row {row_no}, '{}': '{s}' is not a year", columns.year))?
                .and_then(whole_year),
            None => None,
        };

        rows.push(observation(region, date, rainfall, year));
    }
    Ok(rows)
}

fn parse_forecast(path: &Path) -> Result<ForecastTable> {
    let mut reader = csv::Reader::from_path(path).context("opening forecast CSV")?;
    let headers = read_headers(&mut reader)?;

    let ds_idx = column_index(&headers, "ds", "forecast")?;
    let yhat_idx = column_index(&headers, "yhat", "forecast")?;
    let lower_idx = headers.iter().position(|h| h == "yhat_lower");
    let upper_idx = headers.iter().position(|h| h == "yhat_upper");
    let actual_idx = headers.iter().position(|h| h == "y");

    let optional = |record: &csv::StringRecord, idx: Option<usize>, row_no: usize| -> Result<Option<f64>> {
        match idx.and_then(|i| record.get(i)) {
            Some(s) => parse_optional_f64(s).with_context(|| format!("forecast row {row_no}")),
            None => Ok(None),
        }
    };

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("forecast row {row_no}"))?;
        let date = parse_date(record.get(ds_idx).unwrap_or(""))
            .with_context(|| format!("forecast row {row_no}, 'ds'"))?;
        let predicted_mm = parse_optional_f64(record.get(yhat_idx).unwrap_or(""))
            .with_context(|| format!("forecast row {row_no}, 'yhat'"))?
            .with_context(|| format!("forecast row {row_no}: empty 'yhat'"))?;

        rows.push(ForecastRecord {
            date,
            predicted_mm,
            lower_bound_mm: optional(&record, lower_idx, row_no)?,
            upper_bound_mm: optional(&record, upper_idx, row_no)?,
            actual_mm: optional(&record, actual_idx, row_no)?,
        });
    }

    Ok(ForecastTable {
        rows,
        has_bounds: lower_idx.is_some() && upper_idx.is_some(),
    })
}

fn parse_cluster_summary(path: &Path) -> Result<ClusterTable> {
    let mut reader = csv::Reader::from_path(path).context("opening cluster CSV")?;
    let headers = read_headers(&mut reader)?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("cluster row {row_no}"))?;
        let mut cells = record.iter();
        let label = cells.next().unwrap_or("").trim().to_string();
        let values = cells.map(CellValue::guess).collect();
        rows.push(ClusterRow { label, values });
    }

    Ok(ClusterTable {
        label_header: headers[0].clone(),
        columns: headers[1..].to_vec(),
        rows,
    })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "date": "2021-01-01", "ADM2_PCODE": "BT001", "rfh": 3.2, "year": 2021 },
///   ...
/// ]
/// ```
fn load_json(path: &Path, columns: &ObservationColumns) -> Result<Vec<Option<Observation>>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let date = obj
            .get(&columns.date)
            .and_then(JsonValue::as_str)
            .with_context(|| format!("Row {i}: missing or invalid '{}'", columns.date))
            .and_then(parse_date)?;
        let region = match obj.get(&columns.region) {
            Some(JsonValue::String(s)) => s.trim().to_string(),
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => bail!("Row {i}: missing or invalid '{}'", columns.region),
        };
        let rainfall = match obj.get(&columns.rainfall) {
            Some(JsonValue::Null) | None => None,
            Some(v) => Some(
                v.as_f64()
                    .with_context(|| format!("Row {i}, '{}': not a number", columns.rainfall))?,
            ),
        };
        let year = obj
            .get(&columns.year)
            .and_then(JsonValue::as_f64)
            .and_then(whole_year);

        rows.push(observation(region, date, rainfall, year));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by Pandas (`df.to_parquet()`) or Polars
/// (`df.write_parquet()`).
fn load_parquet(path: &Path, columns: &ObservationColumns) -> Result<Vec<Option<Observation>>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let index = |name: &str| {
            schema
                .index_of(name)
                .map_err(|_| anyhow!("Parquet file missing '{name}' column"))
        };
        let date_col = batch.column(index(&columns.date)?);
        let region_col = batch.column(index(&columns.region)?);
        let rain_col = batch.column(index(&columns.rainfall)?);
        let year_col = schema.index_of(&columns.year).ok().map(|i| batch.column(i));

        for row in 0..batch.num_rows() {
            let date = extract_date(date_col, row)
                .with_context(|| format!("Row {row}: failed to read '{}'", columns.date))?;
            let region = extract_string(region_col, row)
                .with_context(|| format!("Row {row}: failed to read '{}'", columns.region))?;
            let rainfall = extract_f64(rain_col, row)
                .with_context(|| format!("Row {row}: failed to read '{}'", columns.rainfall))?;
            let year = match year_col {
                Some(col) => extract_f64(col, row)?.and_then(whole_year),
                None => None,
            };
            rows.push(observation(region, date, rainfall, year));
        }
    }

    Ok(rows)
}

// -- Parquet / Arrow helpers --

fn downcast<'a, T: 'static>(col: &'a Arc<dyn Array>) -> Result<&'a T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected array for {:?}", col.data_type()))
}

fn extract_date(col: &Arc<dyn Array>, row: usize) -> Result<NaiveDate> {
    if col.is_null(row) {
        bail!("null date");
    }
    let date = match col.data_type() {
        DataType::Utf8 => return parse_date(downcast::<StringArray>(col)?.value(row)),
        DataType::LargeUtf8 => return parse_date(downcast::<LargeStringArray>(col)?.value(row)),
        DataType::Date32 => {
            let days = downcast::<Date32Array>(col)?.value(row);
            DateTime::from_timestamp(i64::from(days) * 86_400, 0)
        }
        DataType::Timestamp(TimeUnit::Second, _) => {
            DateTime::from_timestamp(downcast::<TimestampSecondArray>(col)?.value(row), 0)
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            DateTime::from_timestamp_millis(downcast::<TimestampMillisecondArray>(col)?.value(row))
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            DateTime::from_timestamp_micros(downcast::<TimestampMicrosecondArray>(col)?.value(row))
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => Some(DateTime::from_timestamp_nanos(
            downcast::<TimestampNanosecondArray>(col)?.value(row),
        )),
        other => bail!("Expected a date, string or timestamp column, got {other:?}"),
    };
    date.map(|dt| dt.date_naive()).context("date out of range")
}

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null region code");
    }
    Ok(match col.data_type() {
        DataType::Utf8 => downcast::<StringArray>(col)?.value(row).trim().to_string(),
        DataType::LargeUtf8 => downcast::<LargeStringArray>(col)?.value(row).trim().to_string(),
        DataType::Int32 => downcast::<Int32Array>(col)?.value(row).to_string(),
        DataType::Int64 => downcast::<Int64Array>(col)?.value(row).to_string(),
        other => bail!("Expected a string column, got {other:?}"),
    })
}

fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<Option<f64>> {
    if col.is_null(row) {
        return Ok(None);
    }
    Ok(Some(match col.data_type() {
        DataType::Float64 => downcast::<Float64Array>(col)?.value(row),
        DataType::Float32 => f64::from(downcast::<Float32Array>(col)?.value(row)),
        DataType::Int64 => downcast::<Int64Array>(col)?.value(row) as f64,
        DataType::Int32 => f64::from(downcast::<Int32Array>(col)?.value(row)),
        other => bail!("Expected a numeric column, got {other:?}"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn csv_observations_derive_calendar_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "rain.csv",
            "date,ADM2_PCODE,rfh,year\n\
             2022-03-11,BT002,4.5,2022\n\
             2021-01-01 00:00:00,BT001,1.25,2021\n\
             2021-02-01,BT001,,2021\n\
             2021-02-11,BT001,-3.0,2021\n",
        );

        let table = load_observations(&path, &ObservationColumns::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].region_code, "BT001");
        assert_eq!(table.rows[0].month_name, "January");
        assert_eq!(table.rows[1].month_name, "March");
        assert_eq!(table.year_bounds, Some((2021, 2022)));
    }

    #[test]
    fn float_year_cells_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "rain.csv",
            "date,ADM2_PCODE,rfh,year\n\
             2021-01-01,BT001,1.0,2021.0\n\
             2022-05-01,BT001,2.0,\n\
             2023-05-01,BT002,3.0,2023.5\n",
        );

        let table = load_observations(&path, &ObservationColumns::default()).unwrap();
        let years: Vec<i32> = table.rows.iter().map(|o| o.year).collect();
        assert_eq!(years, vec![2021, 2022, 2023]);
        assert_eq!(whole_year(2021.0), Some(2021));
        assert_eq!(whole_year(f64::NAN), None);
    }

    #[test]
    fn json_observations_without_year_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "rain.json",
            r#"[{"date": "2023-06-01", "ADM2_PCODE": "BT003", "rfh": 12.0},
                {"date": "2023-07-01", "ADM2_PCODE": "BT003", "rfh": null}]"#,
        );

        let table = load_observations(&path, &ObservationColumns::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].year, 2023);
        assert_eq!(table.rows[0].month_name, "June");
    }

    #[test]
    fn missing_observation_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_observations(&dir.path().join("nope.csv"), &ObservationColumns::default())
            .unwrap_err();
        assert!(matches!(err, DashboardError::DataUnavailable { .. }));
    }

    #[test]
    fn unparsable_observation_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "rain.csv", "day,region,rain\n2021-01-01,BT001,1.0\n");
        let err = load_observations(&path, &ObservationColumns::default()).unwrap_err();
        match err {
            DashboardError::DataCorrupt { reason, .. } => assert!(reason.contains("'date'")),
            other => panic!("expected DataCorrupt, got {other:?}"),
        }

        let path = write(&dir, "rain.csv", "date,ADM2_PCODE,rfh\nyesterday,BT001,1.0\n");
        let err = load_observations(&path, &ObservationColumns::default()).unwrap_err();
        assert!(matches!(err, DashboardError::DataCorrupt { .. }));
    }

    #[test]
    fn forecast_failure_split() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_forecast(&dir.path().join("forecast.csv")).unwrap_err();
        assert!(matches!(missing, DashboardError::DataUnavailable { .. }));

        let path = write(&dir, "forecast.csv", "ds,trend\n2025-01-01,3.0\n");
        let corrupt = load_forecast(&path).unwrap_err();
        assert!(matches!(corrupt, DashboardError::DataCorrupt { .. }));
    }

    #[test]
    fn forecast_optional_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "forecast.csv",
            "ds,yhat,yhat_lower,yhat_upper,y\n\
             2025-01-01,3.0,1.0,5.0,2.5\n\
             2025-01-02,4.0,2.0,6.0,\n",
        );
        let table = load_forecast(&path).unwrap();
        assert!(table.has_bounds);
        assert_eq!(table.rows[0].actual_mm, Some(2.5));
        assert_eq!(table.rows[1].actual_mm, None);
        assert_eq!(table.rows[1].upper_bound_mm, Some(6.0));

        let path = write(&dir, "plain.csv", "ds,yhat\n2025-01-01,3.0\n");
        let table = load_forecast(&path).unwrap();
        assert!(!table.has_bounds);
        assert_eq!(table.rows[0].lower_bound_mm, None);
    }

    #[test]
    fn cluster_summary_keeps_arbitrary_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "cluster_summary.csv",
            "cluster,rfh_mean,pattern\n0,150.5,Monsoon\n1,45.25,Arid\n",
        );
        let table = load_cluster_summary(&path).unwrap();
        assert_eq!(table.label_header, "cluster");
        assert_eq!(table.columns, vec!["rfh_mean", "pattern"]);
        assert_eq!(table.rows[1].label, "1");
        assert_eq!(table.rows[1].values[0], CellValue::Float(45.25));

        let empty = write(&dir, "empty.csv", "");
        assert!(matches!(
            load_cluster_summary(&empty).unwrap_err(),
            DashboardError::DataCorrupt { .. }
        ));
    }

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(parse_date("2024-02-29").unwrap(), expected);
        assert_eq!(parse_date("2024/02/29").unwrap(), expected);
        assert_eq!(parse_date("2024-02-29 00:00:00").unwrap(), expected);
        assert_eq!(parse_date("2024-02-29T06:00:00+06:00").unwrap(), expected);
        assert!(parse_date("29 Feb").is_err());
    }
}
