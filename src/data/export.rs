//! Columnar export of the primary buffer and the matching static-overlay
//! import.
//!
//! The export has one row per distinct time of either channel. Each value
//! column is resolved independently against its own channel with
//! [`nearest_by_time`]; cells without a match inside the tolerance stay empty.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::config::IngestConfig;
use crate::data::buffer::BufferSnapshot;
use crate::data::resample::nearest_by_time;
use crate::data::sample::{Channel, SeriesPoint};
use crate::data::time_format::{format_mmss_mmm, parse_mmss_mmm};
use crate::error::{IngestError, Result};

/// Column names of the export / static import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    pub timestamp: String,
    pub inlet_temp: String,
    pub inlet_hum: String,
    pub outlet_temp: String,
    pub outlet_hum: String,
}

impl ExportLayout {
    pub fn new(inlet_label: &str, outlet_label: &str) -> Self {
        Self {
            timestamp: "Timestamp (MM:SS.mmm)".to_string(),
            inlet_temp: format!("{inlet_label} Temp (°C)"),
            inlet_hum: format!("{inlet_label} Hum (%)"),
            outlet_temp: format!("{outlet_label} Temp (°C)"),
            outlet_hum: format!("{outlet_label} Hum (%)"),
        }
    }

    pub fn from_config(cfg: &IngestConfig) -> Self {
        Self::new(&cfg.inlet_label, &cfg.outlet_label)
    }

    pub fn headers(&self) -> [&str; 5] {
        [
            &self.timestamp,
            &self.inlet_temp,
            &self.inlet_hum,
            &self.outlet_temp,
            &self.outlet_hum,
        ]
    }

    fn value_columns(&self) -> [&str; 4] {
        [
            &self.inlet_temp,
            &self.inlet_hum,
            &self.outlet_temp,
            &self.outlet_hum,
        ]
    }
}

impl Default for ExportLayout {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

/// One row of the merged export table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportRow {
    pub t: f64,
    pub inlet_temp: Option<f64>,
    pub inlet_hum: Option<f64>,
    pub outlet_temp: Option<f64>,
    pub outlet_hum: Option<f64>,
}

/// Merge both channels of `snapshot` into rows keyed by the sorted union of
/// their times.
pub fn build_export_rows(snapshot: &BufferSnapshot, tolerance: f64) -> Vec<ExportRow> {
    let inlet = &snapshot.inlet;
    let outlet = &snapshot.outlet;

    let mut times: Vec<f64> = inlet.t.iter().chain(&outlet.t).copied().collect();
    times.sort_by(f64::total_cmp);
    times.dedup();

    times
        .into_iter()
        .map(|t| ExportRow {
            t,
            inlet_temp: nearest_by_time(&inlet.t, &inlet.temperature, t, tolerance),
            inlet_hum: nearest_by_time(&inlet.t, &inlet.humidity, t, tolerance),
            outlet_temp: nearest_by_time(&outlet.t, &outlet.temperature, t, tolerance),
            outlet_hum: nearest_by_time(&outlet.t, &outlet.humidity, t, tolerance),
        })
        .collect()
}

fn fmt_cell(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.3}")).unwrap_or_default()
}

/// Write the header and `rows` as CSV.
pub fn write_export_csv<W: Write>(writer: W, layout: &ExportLayout, rows: &[ExportRow]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(layout.headers())?;
    for row in rows {
        w.write_record([
            format_mmss_mmm(row.t),
            fmt_cell(row.inlet_temp),
            fmt_cell(row.inlet_hum),
            fmt_cell(row.outlet_temp),
            fmt_cell(row.outlet_hum),
        ])?;
    }
    w.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write `rows` to a CSV file. Fails with [`IngestError::EmptyExport`] when
/// there is nothing to write.
pub fn save_export_csv(path: &Path, layout: &ExportLayout, rows: &[ExportRow]) -> Result<()> {
    if rows.is_empty() {
        return Err(IngestError::EmptyExport);
    }
    let file = File::create(path).map_err(|e| IngestError::io(path, e))?;
    write_export_csv(file, layout, rows)
}

fn parse_cell(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("none") {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Read a file in the export layout into a buffer snapshot.
///
/// The value columns are required. Rows whose timestamp is missing or
/// unreadable get `row_index * static_dt`. A channel receives a point only
/// when both its temperature and humidity cells hold a number.
pub fn read_static_csv<R: Read>(reader: R, layout: &ExportLayout, static_dt: f64) -> Result<BufferSnapshot> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::MissingHeader);
    }
    let find = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = layout
        .value_columns()
        .iter()
        .filter(|c| find(*c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }
    let ts_col = find(layout.timestamp.as_str());
    let [it, ih, ot, oh] = layout.value_columns().map(|c| find(c).unwrap_or(usize::MAX));

    let mut snapshot = BufferSnapshot::default();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let t = ts_col
            .and_then(|c| record.get(c))
            .and_then(parse_mmss_mmm)
            .unwrap_or(idx as f64 * static_dt);
        let pairs = [
            (Channel::Inlet, record.get(it), record.get(ih)),
            (Channel::Outlet, record.get(ot), record.get(oh)),
        ];
        for (channel, temp, hum) in pairs {
            if let (Some(temperature), Some(humidity)) = (parse_cell(temp), parse_cell(hum)) {
                snapshot.channel_mut(channel).push(SeriesPoint {
                    t,
                    temperature,
                    humidity,
                });
            }
        }
    }
    Ok(snapshot)
}

pub fn load_static_csv(path: &Path, layout: &ExportLayout, static_dt: f64) -> Result<BufferSnapshot> {
    let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
    read_static_csv(file, layout, static_dt)
}

/// Write `rows` as a Parquet file with a seconds column and four nullable
/// value columns named after the layout.
#[cfg(feature = "parquet")]
pub fn save_export_parquet(path: &Path, layout: &ExportLayout, rows: &[ExportRow]) -> Result<()> {
    use std::sync::Arc;

    use arrow_array::{Float64Array, RecordBatch};
    use arrow_schema::{DataType, Field, Schema};
    use parquet::arrow::arrow_writer::ArrowWriter;
    use parquet::file::properties::WriterProperties;

    if rows.is_empty() {
        return Err(IngestError::EmptyExport);
    }
    let column = |f: fn(&ExportRow) -> Option<f64>| -> Float64Array { rows.iter().map(f).collect() };
    let schema = Arc::new(Schema::new(vec![
        Field::new("timestamp_seconds", DataType::Float64, false),
        Field::new(layout.inlet_temp.as_str(), DataType::Float64, true),
        Field::new(layout.inlet_hum.as_str(), DataType::Float64, true),
        Field::new(layout.outlet_temp.as_str(), DataType::Float64, true),
        Field::new(layout.outlet_hum.as_str(), DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(rows.iter().map(|r| r.t).collect::<Vec<_>>())) as _,
            Arc::new(column(|r| r.inlet_temp)) as _,
            Arc::new(column(|r| r.inlet_hum)) as _,
            Arc::new(column(|r| r.outlet_temp)) as _,
            Arc::new(column(|r| r.outlet_hum)) as _,
        ],
    )?;
    let file = File::create(path).map_err(|e| IngestError::io(path, e))?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(inlet: &[(f64, f64, f64)], outlet: &[(f64, f64, f64)]) -> BufferSnapshot {
        let mut s = BufferSnapshot::default();
        for &(t, temperature, humidity) in inlet {
            s.inlet.push(SeriesPoint { t, temperature, humidity });
        }
        for &(t, temperature, humidity) in outlet {
            s.outlet.push(SeriesPoint { t, temperature, humidity });
        }
        s
    }

    #[test]
    fn rows_follow_union_of_times() {
        let s = snap(&[(0.0, 20.0, 40.0), (1.0, 21.0, 41.0)], &[(0.1, 30.0, 50.0), (5.0, 31.0, 51.0)]);
        let rows = build_export_rows(&s, 0.3);
        let ts: Vec<f64> = rows.iter().map(|r| r.t).collect();
        assert_eq!(ts, vec![0.0, 0.1, 1.0, 5.0]);
        assert_eq!(rows[0].inlet_temp, Some(20.0));
        assert_eq!(rows[0].outlet_temp, Some(30.0));
        assert_eq!(rows[2].outlet_hum, None);
        assert_eq!(rows[3].inlet_temp, None);
        assert_eq!(rows[3].outlet_hum, Some(51.0));
    }

    #[test]
    fn shared_times_are_not_duplicated() {
        let s = snap(&[(1.0, 20.0, 40.0)], &[(1.0, 30.0, 50.0)]);
        assert_eq!(build_export_rows(&s, 0.3).len(), 1);
    }

    #[test]
    fn csv_has_header_and_blank_cells() {
        let layout = ExportLayout::new("In", "Out");
        let rows = [ExportRow {
            t: 61.5,
            inlet_temp: Some(20.0),
            inlet_hum: Some(40.25),
            outlet_temp: None,
            outlet_hum: None,
        }];
        let mut buf = Vec::new();
        write_export_csv(&mut buf, &layout, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Timestamp (MM:SS.mmm),In Temp (°C),In Hum (%),Out Temp (°C),Out Hum (%)"
        );
        assert_eq!(lines[1], "01:01.500,20.000,40.250,,");
    }

    #[test]
    fn import_requires_value_columns() {
        let layout = ExportLayout::new("In", "Out");
        let text = "Timestamp (MM:SS.mmm),In Temp (°C),In Hum (%)\n00:00.000,1,2\n";
        match read_static_csv(text.as_bytes(), &layout, 0.25) {
            Err(IngestError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["Out Temp (°C)".to_string(), "Out Hum (%)".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn import_of_empty_file_fails() {
        let layout = ExportLayout::new("In", "Out");
        assert!(matches!(
            read_static_csv("".as_bytes(), &layout, 0.25),
            Err(IngestError::MissingHeader)
        ));
    }

    #[test]
    fn bad_timestamp_gets_synthetic_time() {
        let layout = ExportLayout::new("In", "Out");
        let text = "Timestamp (MM:SS.mmm),In Temp (°C),In Hum (%),Out Temp (°C),Out Hum (%)\n\
                    00:00.000,20,40,30,50\n\
                    garbage,21,41,,\n\
                    00:09.000,22,42,31,nan\n";
        let s = read_static_csv(text.as_bytes(), &layout, 0.25).unwrap();
        assert_eq!(s.inlet.t, vec![0.0, 0.25, 9.0]);
        assert_eq!(s.inlet.temperature, vec![20.0, 21.0, 22.0]);
        // Outlet needs both values present.
        assert_eq!(s.outlet.t, vec![0.0]);
    }

    #[test]
    fn missing_timestamp_column_uses_row_index() {
        let layout = ExportLayout::new("In", "Out");
        let text = "In Temp (°C),In Hum (%),Out Temp (°C),Out Hum (%)\n1,2,3,4\n5,6,7,8\n";
        let s = read_static_csv(text.as_bytes(), &layout, 0.5).unwrap();
        assert_eq!(s.outlet.t, vec![0.0, 0.5]);
    }
}
