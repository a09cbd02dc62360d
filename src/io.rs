//! Delimited-text input and feature / curve export.
//!
//! Reader: one column of a headered delimited file, as raw cell strings.
//! Numeric validation is left to [`crate::condition`]; here a row only counts
//! as malformed when it cannot be read or is too short to hold the column.
//!
//! Writers: one CSV row per epoch, and a JSON document of retained PSD curves
//! for plotting.
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::warn;
use serde::Serialize;

use crate::config::ChannelSelector;
use crate::pipeline::{FeatureRecord, PipelineOutput, RecordStatus};

/// Malformed rows reported individually before the log goes quiet.
const MAX_ROW_WARNINGS: usize = 5;

/// One column of a delimited file.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnData {
    /// Header of the selected column.
    pub name: String,
    /// Position of the selected column.
    pub index: usize,
    /// Raw cell text, one per well-formed row, in file order.
    pub cells: Vec<String>,
    /// Data rows (header excluded) seen in the file.
    pub rows: usize,
    /// Rows skipped because they were unreadable or too short.
    pub malformed_rows: usize,
}

/// Byte form of a command-line delimiter.  Only single-byte (ASCII)
/// characters can delimit fields.
pub fn delimiter_byte(c: char) -> Result<u8> {
    match u8::try_from(c) {
        Ok(b) if b.is_ascii() && b != b'"' && b != b'\n' => Ok(b),
        _ => bail!("delimiter {c:?} must be a single ASCII character other than quote or newline"),
    }
}

/// Read the column picked by `selector` from `path`.
pub fn read_column(path: &Path, selector: &ChannelSelector, delimiter: u8) -> Result<ColumnData> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_column_from(f, selector, delimiter)
        .with_context(|| format!("reading column {selector} of {}", path.display()))
}

/// Read the column picked by `selector` from any reader.
pub fn read_column_from<R: Read>(
    reader: R,
    selector: &ChannelSelector,
    delimiter: u8,
) -> Result<ColumnData> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("reading header row")?
        .iter()
        .map(str::to_string)
        .collect();
    let (index, name) = resolve_column(&headers, selector)?;

    let mut cells = Vec::new();
    let mut rows = 0;
    let mut malformed_rows = 0;
    for (row_no, result) in rdr.records().enumerate() {
        rows += 1;
        let cell = match result {
            Ok(record) => record.get(index).map(str::to_string),
            Err(e) => {
                if malformed_rows < MAX_ROW_WARNINGS {
                    warn!("row {}: {e}", row_no + 1);
                }
                None
            }
        };
        match cell {
            Some(c) => cells.push(c),
            None => malformed_rows += 1,
        }
    }
    if malformed_rows > 0 {
        warn!("skipped {malformed_rows} of {rows} malformed rows in column '{name}'");
    }

    Ok(ColumnData { name, index, cells, rows, malformed_rows })
}

/// Find the column for `selector`.
///
/// Name matching: lowercase + strip spaces, so `"fp 1"` finds `"Fp1"`.
fn resolve_column(headers: &[String], selector: &ChannelSelector) -> Result<(usize, String)> {
    match selector {
        ChannelSelector::Index(i) => match headers.get(*i) {
            Some(h) => Ok((*i, h.trim().to_string())),
            None => bail!("column index {i} out of range ({} columns)", headers.len()),
        },
        ChannelSelector::Name(n) => {
            let norm = |s: &str| s.replace(' ', "").to_lowercase();
            match headers.iter().position(|h| norm(h) == norm(n)) {
                Some(i) => Ok((i, headers[i].trim().to_string())),
                None => bail!("no column named '{n}' (have: {})", headers.join(", ")),
            }
        }
    }
}

// ── Export ───────────────────────────────────────────────────────────────────

/// Flat CSV row.  Absent values serialise as empty cells.
#[derive(Serialize)]
struct ExportRow<'a> {
    epoch_index: usize,
    channel: &'a str,
    start_s: f64,
    n_samples: usize,
    status: RecordStatus,
    mf_hz: Option<f64>,
    sef95_hz: Option<f64>,
    delta: Option<f64>,
    theta: Option<f64>,
    alpha: Option<f64>,
    beta: Option<f64>,
    total_power: Option<f64>,
}

impl<'a> From<&'a FeatureRecord> for ExportRow<'a> {
    fn from(r: &'a FeatureRecord) -> Self {
        Self {
            epoch_index: r.epoch_index,
            channel: &r.channel,
            start_s: r.start_s,
            n_samples: r.n_samples,
            status: r.status,
            mf_hz: r.mf_hz,
            sef95_hz: r.sef95_hz,
            delta: r.bands.map(|b| b.delta),
            theta: r.bands.map(|b| b.theta),
            alpha: r.bands.map(|b| b.alpha),
            beta: r.bands.map(|b| b.beta),
            total_power: r.bands.map(|b| b.total),
        }
    }
}

/// Write one CSV row per record, header first.
pub fn write_records_csv<W: Write>(writer: W, records: &[FeatureRecord]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    for r in records {
        w.serialize(ExportRow::from(r))?;
    }
    if records.is_empty() {
        w.write_record([
            "epoch_index", "channel", "start_s", "n_samples", "status", "mf_hz", "sef95_hz",
            "delta", "theta", "alpha", "beta", "total_power",
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_records_csv_path(path: &Path, records: &[FeatureRecord]) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_records_csv(BufWriter::new(f), records)
}

#[derive(Serialize)]
struct CurveEntry<'a> {
    epoch_index: usize,
    status: RecordStatus,
    mf_hz: Option<f64>,
    sef95_hz: Option<f64>,
    frequencies: &'a [f64],
    power: &'a [f64],
}

#[derive(Serialize)]
struct CurveDoc<'a> {
    channel: &'a str,
    epochs: Vec<CurveEntry<'a>>,
}

/// Write retained PSD curves as JSON.  Epochs without a curve are skipped.
///
/// Fails if the run was made in lean mode (no curves retained).
pub fn write_curves_json<W: Write>(writer: W, output: &PipelineOutput) -> Result<()> {
    if output.curves.len() != output.records.len() {
        bail!("PSD curves were not retained; run with retain_psd = true");
    }
    let epochs = output
        .records
        .iter()
        .zip(output.curves.iter())
        .filter_map(|(r, c)| {
            c.as_ref().map(|c| CurveEntry {
                epoch_index: r.epoch_index,
                status: r.status,
                mf_hz: r.mf_hz,
                sef95_hz: r.sef95_hz,
                frequencies: &c.frequencies,
                power: &c.power,
            })
        })
        .collect();
    serde_json::to_writer(writer, &CurveDoc { channel: &output.channel, epochs })?;
    Ok(())
}

pub fn write_curves_json_path(path: &Path, output: &PipelineOutput) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    write_curves_json(&mut w, output)?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "time,Fp1,O2\n0,1.5,2\n1,oops,3\n2\n3,2.5,4\n";

    #[test]
    fn reads_column_by_index_and_name() {
        let by_idx = read_column_from(CSV.as_bytes(), &ChannelSelector::Index(1), b',').unwrap();
        assert_eq!(by_idx.name, "Fp1");
        assert_eq!(by_idx.cells, vec!["1.5", "oops", "2.5"]);
        assert_eq!(by_idx.rows, 4);
        assert_eq!(by_idx.malformed_rows, 1);

        let by_name = read_column_from(CSV.as_bytes(), &ChannelSelector::Name("fp 1".into()), b',').unwrap();
        assert_eq!(by_name, by_idx);
    }

    #[test]
    fn unknown_column_is_an_error() {
        assert!(read_column_from(CSV.as_bytes(), &ChannelSelector::Index(7), b',').is_err());
        assert!(read_column_from(CSV.as_bytes(), &ChannelSelector::Name("Cz".into()), b',').is_err());
    }

    #[test]
    fn other_delimiters() {
        let tsv = "a\tb\n1\t2\n3\t4\n";
        let col = read_column_from(tsv.as_bytes(), &ChannelSelector::Index(1), b'\t').unwrap();
        assert_eq!(col.cells, vec!["2", "4"]);
    }

    #[test]
    fn delimiter_from_flag() {
        assert_eq!(delimiter_byte(',').unwrap(), b',');
        assert_eq!(delimiter_byte(';').unwrap(), b';');
        assert_eq!(delimiter_byte('\t').unwrap(), b'\t');
        assert!(delimiter_byte('§').is_err());
        assert!(delimiter_byte('"').is_err());
        assert!(delimiter_byte('\n').is_err());

        let semi = "t;Cz\n0;1.5\n1;2.5\n";
        let col = read_column_from(semi.as_bytes(), &ChannelSelector::Name("cz".into()), delimiter_byte(';').unwrap())
            .unwrap();
        assert_eq!(col.cells, vec!["1.5", "2.5"]);
    }

    #[test]
    fn export_leaves_absent_values_empty() {
        let records = vec![FeatureRecord {
            epoch_index: 3,
            channel: "Fp1".into(),
            start_s: 6.0,
            n_samples: 10,
            status: RecordStatus::Insufficient,
            mf_hz: None,
            sef95_hz: None,
            bands: None,
        }];
        let mut buf = Vec::new();
        write_records_csv(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "epoch_index,channel,start_s,n_samples,status,mf_hz,sef95_hz,delta,theta,alpha,beta,total_power"
        );
        assert_eq!(lines.next().unwrap(), "3,Fp1,6.0,10,insufficient,,,,,,,");
    }

    #[test]
    fn empty_export_still_has_header() {
        let mut buf = Vec::new();
        write_records_csv(&mut buf, &[]).unwrap();
        assert!(String::from_utf8(buf).unwrap().starts_with("epoch_index,channel,"));
    }
}
