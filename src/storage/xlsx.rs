// src/storage/xlsx.rs

//! In-memory spreadsheet rendering of a query report.

use rust_xlsxwriter::{Format, Workbook};

use crate::error::{AppError, Result};
use crate::models::QueryReport;

const COLUMN_WIDTHS: [f64; 3] = [12.0, 12.0, 18.0];

/// Render `report` as a single-sheet workbook: a header row, then one row
/// per period (label, period, value).
pub fn render_workbook(
    report: &QueryReport,
    headers: &[String],
    sheet_name: &str,
) -> Result<Vec<u8>> {
    if headers.len() != COLUMN_WIDTHS.len() {
        return Err(AppError::validation(format!(
            "spreadsheet needs {} headers, got {}",
            COLUMN_WIDTHS.len(),
            headers.len()
        )));
    }

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    for (col, (header, width)) in headers.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, header, &bold)?;
        sheet.set_column_width(col, width)?;
    }

    for (i, cells) in body_rows(report).iter().enumerate() {
        let r = i as u32 + 1;
        for (col, text) in cells.iter().enumerate() {
            sheet.write_string(r, col as u16, text)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Cell text below the header row, in sheet order.
fn body_rows(report: &QueryReport) -> Vec<[String; 3]> {
    report
        .rows
        .iter()
        .map(|row| {
            [
                row.label.as_str().to_string(),
                row.period.to_string(),
                row.value.to_string(),
            ]
        })
        .collect()
}
