// CSV ingestion for scheme sheets.
//
// Exports often carry title rows above the real header, so the header is
// located within the first few records before rows are typed.
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::types::{CellValue, Dataset, Datasets, Row};
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;
use std::thread;
use tracing::{info, warn};

/// Only the first few records are scanned for the real header; published
/// sheets often carry a title block above it.
const HEADER_SCAN_ROWS: usize = 10;

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_records: usize,
    pub header_row: usize,
    pub data_rows: usize,
    pub columns: Vec<String>,
}

/// Index of the header record: the first one mentioning "block" together with
/// "target", "gp" or "sno". Falls back to the first record.
pub fn detect_header(records: &[StringRecord]) -> usize {
    records
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|rec| {
            let text = rec.iter().collect::<Vec<_>>().join(" ").to_lowercase();
            text.contains("block") && (text.contains("target") || text.contains("gp") || text.contains("sno"))
        })
        .unwrap_or(0)
}

fn to_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(trimmed.to_string()),
    }
}

pub fn read_dataset<R: Read>(reader: R) -> Result<(Dataset, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records: Vec<StringRecord> = Vec::new();
    for result in rdr.records() {
        let rec = result?;
        if rec.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        records.push(rec);
    }
    let total_records = records.len();
    if records.is_empty() {
        let report = LoadReport { total_records, header_row: 0, data_rows: 0, columns: Vec::new() };
        return Ok((Dataset::default(), report));
    }

    let header_row = detect_header(&records);
    // Columns with an empty header are dropped, positions are kept.
    let headers: Vec<(usize, String)> = records[header_row]
        .iter()
        .enumerate()
        .map(|(i, h)| (i, h.trim().to_string()))
        .filter(|(_, h)| !h.is_empty())
        .collect();

    let rows: Vec<Row> = records[header_row + 1..]
        .iter()
        .map(|rec| {
            let mut row = Row::new();
            for (i, label) in &headers {
                row.push(label, to_cell(rec.get(*i).unwrap_or("")));
            }
            row
        })
        .collect();

    let report = LoadReport {
        total_records,
        header_row,
        data_rows: rows.len(),
        columns: headers.into_iter().map(|(_, h)| h).collect(),
    };
    Ok((Dataset::new(rows), report))
}

pub fn load_dataset(path: &Path) -> Result<(Dataset, LoadReport)> {
    let file = std::fs::File::open(path)?;
    read_dataset(file)
}

/// Load every configured scheme on its own thread. A scheme without a path,
/// or whose load fails, gets an empty dataset; the others are unaffected.
pub fn load_datasets(config: &DashboardConfig) -> Datasets {
    thread::scope(|s| {
        let handles: Vec<_> = config
            .schemes
            .iter()
            .map(|scheme| {
                let path = config.sheet_path(scheme);
                let handle = s.spawn(move || match path {
                    Some(p) => match load_dataset(&p) {
                        Ok((dataset, report)) => {
                            info!(
                                scheme = %scheme,
                                rows = report.data_rows,
                                header_row = report.header_row,
                                "sheet loaded"
                            );
                            dataset
                        }
                        Err(e) => {
                            warn!(scheme = %scheme, path = %p.display(), error = %e, "sheet load failed");
                            Dataset::default()
                        }
                    },
                    None => Dataset::default(),
                });
                (scheme.clone(), handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(scheme, handle)| {
                let dataset = handle.join().unwrap_or_else(|_| {
                    warn!(scheme = %scheme, "sheet loader panicked");
                    Dataset::default()
                });
                (scheme, dataset)
            })
            .collect()
    })
}
