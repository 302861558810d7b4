use std::fmt;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use rust_xlsxwriter::{Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::{CellValue, Dataset};
use super::pdf;

/// Name used when the user leaves the filename blank.
pub const DEFAULT_FILENAME: &str = "download";

const JPEG_QUALITY: u8 = 90;

// ---------------------------------------------------------------------------
// Formats and requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
    Pdf,
    Jpg,
    Jpeg,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Xlsx,
        ExportFormat::Csv,
        ExportFormat::Pdf,
        ExportFormat::Jpg,
        ExportFormat::Jpeg,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Jpeg => "jpeg",
        }
    }

    /// PDF and image exports are built from a raster snapshot of the table.
    pub fn needs_snapshot(self) -> bool {
        matches!(self, ExportFormat::Pdf | ExportFormat::Jpg | ExportFormat::Jpeg)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// What the export surface asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub filename: String,
    pub format: ExportFormat,
}

impl ExportRequest {
    /// A blank filename falls back to [`DEFAULT_FILENAME`].
    pub fn new(filename: &str, format: ExportFormat) -> Self {
        let filename = filename.trim();
        let filename = if filename.is_empty() {
            DEFAULT_FILENAME
        } else {
            filename
        };
        ExportRequest {
            filename: filename.to_string(),
            format,
        }
    }

    /// `<filename>.<ext>`, with path separators replaced so the file always
    /// lands in the output directory.
    pub fn file_name(&self) -> String {
        let stem: String = self
            .filename
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        format!("{stem}.{}", self.format.extension())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("writing xlsx: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("writing csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("encoding image: {0}")]
    Image(#[from] image::ImageError),
    #[error("{0} export needs a snapshot of the table")]
    MissingSnapshot(ExportFormat),
    #[error("writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `dataset` in `format`. Snapshot formats need the rendered table.
pub fn encode(
    dataset: &Dataset,
    format: ExportFormat,
    snapshot: Option<&RgbaImage>,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Xlsx => encode_xlsx(dataset),
        ExportFormat::Csv => encode_csv(dataset),
        ExportFormat::Jpg | ExportFormat::Jpeg => {
            let image = snapshot.ok_or(ExportError::MissingSnapshot(format))?;
            encode_jpeg(image)
        }
        ExportFormat::Pdf => {
            let image = snapshot.ok_or(ExportError::MissingSnapshot(format))?;
            let jpeg = encode_jpeg(image)?;
            Ok(pdf::jpeg_page(&jpeg, image.width(), image.height()))
        }
    }
}

/// Single worksheet `Sheet1`: header row, then one row per record. Nulls stay blank.
fn encode_xlsx(dataset: &Dataset) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1")?;

    for (col, name) in dataset.columns.iter().enumerate() {
        sheet.write_string(0, col as u16, name)?;
    }

    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let row_no = row_idx as u32 + 1;
        for (col, cell) in row.cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                CellValue::Text(s) => {
                    sheet.write_string(row_no, col, s)?;
                }
                CellValue::Number(n) => {
                    sheet.write_number(row_no, col, *n)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(row_no, col, *b)?;
                }
                CellValue::Null => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Header row, then one record per row. Nulls become empty fields.
fn encode_csv(dataset: &Dataset) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&dataset.columns)?;

    for row in &dataset.rows {
        writer.write_record(row.cells.iter().map(|cell| match cell {
            CellValue::Null => String::new(),
            other => other.to_string(),
        }))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))
}

fn encode_jpeg(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Saving
// ---------------------------------------------------------------------------

/// Encode `dataset` and write it to `dir/<filename>.<ext>`. Returns the path written.
pub fn save(
    dataset: &Dataset,
    request: &ExportRequest,
    snapshot: Option<&RgbaImage>,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let bytes = encode(dataset, request.format, snapshot)?;
    let path = dir.join(request.file_name());
    std::fs::write(&path, &bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    log::info!(
        "Exported {} rows as {} to {} ({} bytes)",
        dataset.len(),
        request.format,
        path.display(),
        bytes.len()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader;
    use crate::data::model::Row;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["id".into(), "name".into(), "score".into(), "ok".into()],
            vec![
                Row::new(vec![
                    CellValue::Number(1.0),
                    CellValue::Text("ann, jr.".into()),
                    CellValue::Null,
                    CellValue::Bool(true),
                ]),
                Row::new(vec![
                    CellValue::Number(2.0),
                    CellValue::Null,
                    CellValue::Number(7.25),
                    CellValue::Bool(false),
                ]),
                Row::new(vec![
                    CellValue::Number(3.0),
                    CellValue::Text("cid \"the kid\"".into()),
                    CellValue::Number(-1.5),
                    CellValue::Null,
                ]),
            ],
        )
    }

    #[test]
    fn blank_filename_uses_default() {
        let req = ExportRequest::new("   ", ExportFormat::Csv);
        assert_eq!(req.file_name(), "download.csv");

        let req = ExportRequest::new(" report ", ExportFormat::Jpeg);
        assert_eq!(req.file_name(), "report.jpeg");

        let req = ExportRequest::new("../etc/x", ExportFormat::Xlsx);
        assert_eq!(req.file_name(), ".._etc_x.xlsx");
    }

    #[test]
    fn csv_round_trip_preserves_rows_and_values() {
        let ds = sample();
        let bytes = encode(&ds, ExportFormat::Csv, None).unwrap();
        let back = loader::decode(&bytes, "out.csv").unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn csv_round_trip_keeps_value_like_text() {
        let ds = Dataset::new(
            vec!["zip".into(), "flag".into(), "qty".into(), "n".into()],
            vec![Row::new(vec![
                CellValue::Text("00123".into()),
                CellValue::Text("TRUE".into()),
                CellValue::Text("1e3".into()),
                CellValue::Number(1000.0),
            ])],
        );
        let bytes = encode(&ds, ExportFormat::Csv, None).unwrap();
        let back = loader::decode(&bytes, "out.csv").unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn xlsx_round_trip_preserves_rows_and_values() {
        let ds = sample();
        let bytes = encode(&ds, ExportFormat::Xlsx, None).unwrap();
        let back = loader::decode(&bytes, "out.xlsx").unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn snapshot_formats_require_an_image() {
        for format in [ExportFormat::Pdf, ExportFormat::Jpg, ExportFormat::Jpeg] {
            assert!(format.needs_snapshot());
            let err = encode(&sample(), format, None).unwrap_err();
            assert!(matches!(err, ExportError::MissingSnapshot(f) if f == format));
        }
        assert!(!ExportFormat::Csv.needs_snapshot());
    }

    #[test]
    fn jpeg_and_pdf_from_snapshot() {
        let image = RgbaImage::from_pixel(8, 4, image::Rgba([200, 10, 10, 255]));

        let jpeg = encode(&sample(), ExportFormat::Jpg, Some(&image)).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let pdf = encode(&sample(), ExportFormat::Pdf, Some(&image)).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn save_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExportRequest::new("", ExportFormat::Csv);
        let path = save(&sample(), &req, None, dir.path()).unwrap();

        assert_eq!(path, dir.path().join("download.csv"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("id,name,score,ok\n"));
        assert!(text.contains("2,,7.25,false\n"));
    }

    #[test]
    fn save_reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExportRequest::new("x", ExportFormat::Csv);
        let err = save(&sample(), &req, None, &dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }), "{err}");
    }
}
