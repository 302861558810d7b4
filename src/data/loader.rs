use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use thiserror::Error;

use super::model::{CellValue, Dataset, Row};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can go wrong between a source location and a [`Dataset`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("fetching {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("decoding {name}: {reason}")]
    Decode { name: String, reason: String },
}

// ---------------------------------------------------------------------------
// Source – where the sheet comes from
// ---------------------------------------------------------------------------

/// A local file or a remote URL holding a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    /// `http://` and `https://` locations are URLs, everything else a path.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Source::Url(s.to_string())
        } else {
            Source::Path(PathBuf::from(s))
        }
    }

    /// Name used as the format hint when decoding.
    pub fn name(&self) -> String {
        match self {
            Source::Path(p) => p.display().to_string(),
            Source::Url(u) => u.clone(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Fetch the raw bytes of a source.
pub fn fetch(source: &Source) -> Result<Vec<u8>, LoadError> {
    match source {
        Source::Path(path) => std::fs::read(path).map_err(|source| LoadError::Read {
            path: path.clone(),
            source,
        }),
        Source::Url(url) => fetch_url(url).map_err(|source| LoadError::Fetch {
            url: url.clone(),
            source,
        }),
    }
}

fn fetch_url(url: &str) -> reqwest::Result<Vec<u8>> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    Ok(response.bytes()?.to_vec())
}

/// Fetch and decode a source in one go.
pub fn load(source: &Source) -> Result<Dataset, LoadError> {
    let bytes = fetch(source)?;
    let dataset = decode(&bytes, &source.name())?;
    log::info!(
        "Loaded {} rows with columns {:?} from {source}",
        dataset.len(),
        dataset.columns
    );
    Ok(dataset)
}

/// Run [`load`] on a worker thread.
///
/// The receiver yields exactly one result; `notify` runs right after it is
/// sent so the caller can wake up and collect it.
pub fn spawn_load<F>(source: Source, notify: F) -> Receiver<Result<Dataset, LoadError>>
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver may already be gone if another load replaced this one.
        let _ = tx.send(load(&source));
        notify();
    });
    rx
}

/// Decode spreadsheet bytes into a dataset. Dispatch by the extension of
/// `name` (a path or URL).
///
/// Supported formats:
/// * `.csv` / `.tsv` – delimited text with a header row
/// * anything else   – workbooks readable by calamine (xlsx, xlsm, xlsb, xls, ods);
///   text that is not a workbook falls back to CSV when the extension is unknown
pub fn decode(bytes: &[u8], name: &str) -> Result<Dataset, LoadError> {
    let ext = extension_of(name);
    let result = match ext.as_str() {
        "csv" => decode_delimited(bytes, b','),
        "tsv" | "tab" => decode_delimited(bytes, b'\t'),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => decode_workbook(bytes),
        _ => decode_workbook(bytes).or_else(|err| {
            if std::str::from_utf8(bytes).is_ok() {
                log::warn!("{name} is not a workbook ({err:#}), reading it as CSV");
                decode_delimited(bytes, b',')
            } else {
                Err(err)
            }
        }),
    };

    result.map_err(|e| LoadError::Decode {
        name: name.to_string(),
        reason: format!("{e:#}"),
    })
}

/// Lower-case extension of a path or URL, ignoring any query or fragment.
fn extension_of(name: &str) -> String {
    let end = name.find(['?', '#']).unwrap_or(name.len());
    Path::new(&name[..end])
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Turn raw header cells into unique column names.
///
/// Blank headers become `__EMPTY`; repeated names get `_1`, `_2`, ... appended.
fn header_names<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .map(|name| {
            let base = if name.is_empty() {
                "__EMPTY".to_string()
            } else {
                name
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let unique = if *count == 0 {
                base
            } else {
                format!("{base}_{count}")
            };
            *count += 1;
            unique
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Workbook decoder
// ---------------------------------------------------------------------------

/// Read the first worksheet. The first row is the header; blank rows are dropped.
fn decode_workbook(bytes: &[u8]) -> Result<Dataset> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).context("opening workbook")?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.context("reading first worksheet")?,
        None => return Ok(Dataset::default()),
    };

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Dataset::default());
    };
    let columns = header_names(header.iter().map(|cell| cell.to_string()));

    let rows = rows
        .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|cells| Row::new(cells.iter().map(workbook_cell).collect()))
        .collect();

    Ok(Dataset::new(columns, rows))
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // Dates stay as their serial number, like the sheet stores them.
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Delimited text decoder
// ---------------------------------------------------------------------------

/// CSV/TSV with a header row. Empty fields are nulls, other fields are typed
/// by [`CellValue::infer`]. Records longer than the header add `__EMPTY`
/// columns instead of losing their trailing fields.
fn decode_delimited(bytes: &[u8], delimiter: u8) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let mut raw_header: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {}", row_no + 1))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(Row::new(record.iter().map(CellValue::infer).collect()));
    }

    let width = rows.iter().map(|r: &Row| r.cells.len()).max().unwrap_or(0);
    if width > raw_header.len() {
        log::debug!(
            "widening {} header columns to {width} for ragged rows",
            raw_header.len()
        );
        raw_header.resize(width, String::new());
    }

    Ok(Dataset::new(header_names(raw_header), rows))
}
