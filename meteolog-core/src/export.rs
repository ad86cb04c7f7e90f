//! Spreadsheet export of stored samples.

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::{
    io,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::model::StoredSample;

/// Column headers, in output order.
pub const HEADERS: [&str; 9] = [
    "Temperature (C)",
    "Wind speed (m/s)",
    "Wind direction",
    "Pressure (mmHg)",
    "Precipitation (mm)",
    "Precipitation type",
    "Updated at (UTC)",
    "Latitude",
    "Longitude",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { rows: usize, path: PathBuf },
    /// The destination is held open by another process.
    Locked { path: PathBuf },
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to build spreadsheet")]
    Xlsx(#[from] XlsxError),

    #[error("failed to write spreadsheet to {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait SpreadsheetExporter: Send + Sync {
    /// Write `records` to `destination`, replacing whatever was there.
    fn export(&self, records: &[StoredSample], destination: &Path)
    -> Result<ExportOutcome, ExportError>;
}

/// Writes `.xlsx` workbooks with one header row and one row per sample.
#[derive(Debug, Clone, Default)]
pub struct XlsxExporter;

impl XlsxExporter {
    pub fn new() -> Self {
        Self
    }

    fn fill(sheet: &mut Worksheet, records: &[StoredSample]) -> Result<(), XlsxError> {
        let bold = Format::new().set_bold();
        for (col, header) in (0u16..).zip(HEADERS) {
            sheet.write_string_with_format(0, col, header, &bold)?;
            sheet.set_column_width(col, 20)?;
        }

        for (row, record) in (1u32..).zip(records) {
            let sample = &record.sample;

            if let Some(t) = sample.temperature {
                sheet.write_number(row, 0, t)?;
            }
            if let Some(speed) = sample.wind_speed {
                sheet.write_number(row, 1, speed)?;
            }
            sheet.write_string(row, 2, sample.wind_direction.as_str())?;
            sheet.write_number(row, 3, f64::from(sample.pressure))?;
            if let Some(amount) = sample.precipitation_amount {
                sheet.write_number(row, 4, amount)?;
            }
            sheet.write_string(row, 5, sample.precipitation_kind.label())?;
            sheet.write_string(row, 6, record.created_at.format(TIMESTAMP_FORMAT).to_string())?;
            sheet.write_number(row, 7, sample.location.latitude)?;
            sheet.write_number(row, 8, sample.location.longitude)?;
        }

        Ok(())
    }
}

impl SpreadsheetExporter for XlsxExporter {
    fn export(
        &self,
        records: &[StoredSample],
        destination: &Path,
    ) -> Result<ExportOutcome, ExportError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Weather")?;
        Self::fill(sheet, records)?;

        match workbook.save(destination) {
            Ok(()) => {
                info!(rows = records.len(), path = %destination.display(), "exported samples");
                Ok(ExportOutcome::Written {
                    rows: records.len(),
                    path: destination.to_path_buf(),
                })
            }
            Err(XlsxError::IoError(err)) if is_locked(&err) => {
                warn!(path = %destination.display(), error = %err, "export destination is locked");
                Ok(ExportOutcome::Locked {
                    path: destination.to_path_buf(),
                })
            }
            Err(XlsxError::IoError(source)) => Err(ExportError::Io {
                path: destination.to_path_buf(),
                source,
            }),
            Err(err) => Err(err.into()),
        }
    }
}

/// Whether an I/O failure means another program holds the file open.
pub fn is_locked(err: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION and ERROR_LOCK_VIOLATION
    const WINDOWS_LOCK_CODES: [i32; 2] = [32, 33];

    err.kind() == io::ErrorKind::PermissionDenied
        || (cfg!(windows) && err.raw_os_error().is_some_and(|c| WINDOWS_LOCK_CODES.contains(&c)))
}
