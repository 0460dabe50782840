//! FILENAME: report-export/src/xlsx_writer.rs

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook};

use crate::grid::{CellAlign, CellStyle, ExportGrid};
use crate::ExportError;

/// Worksheet row of the title; the header sits two rows below it.
const TITLE_ROW: u32 = 0;
const HEADER_ROW: u32 = 2;
const FIRST_BODY_ROW: u32 = 3;

/// Renders the grid as an `.xlsx` workbook.
///
/// `created` is stamped into the document properties, so the same grid and
/// date always produce the same bytes.
pub fn write_xlsx(grid: &ExportGrid, created: NaiveDate) -> Result<Vec<u8>, ExportError> {
    let mut xlsx = Workbook::new();

    let created = ExcelDateTime::from_ymd(
        u16::try_from(created.year()).map_err(|_| ExportError::InvalidDate(created.to_string()))?,
        created.month() as u8,
        created.day() as u8,
    )?;
    let properties = DocProperties::new()
        .set_title(&grid.title)
        .set_creation_datetime(&created);
    xlsx.set_properties(&properties);

    let worksheet = xlsx.add_worksheet();
    worksheet.set_name(&grid.sheet_name)?;

    for (col, width) in grid.column_widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    // Title merged across the full width
    let last_col = grid.column_count().saturating_sub(1) as u16;
    let title_format = Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    if last_col > 0 {
        worksheet.merge_range(TITLE_ROW, 0, TITLE_ROW, last_col, &grid.title, &title_format)?;
    } else {
        worksheet.write_string_with_format(TITLE_ROW, 0, &grid.title, &title_format)?;
    }

    for (col, cell) in grid.header.iter().enumerate() {
        worksheet.write_string_with_format(HEADER_ROW, col as u16, &cell.text, &to_format(&cell.style))?;
    }

    let merge_index = grid.merge_index();
    for (body_row, row) in grid.rows.iter().enumerate() {
        let sheet_row = FIRST_BODY_ROW + body_row as u32;
        for (col, cell) in row.cells.iter().enumerate() {
            // Merged dimension cells are written by their region below
            let merged = merge_index
                .get(body_row)
                .and_then(|cols| cols.get(col))
                .copied()
                .flatten()
                .is_some();
            if merged {
                continue;
            }
            worksheet.write_string_with_format(sheet_row, col as u16, &cell.text, &to_format(&cell.style))?;
        }
    }

    for region in &grid.merges {
        let Some(row) = grid.rows.get(region.first_row) else {
            continue;
        };
        let Some(cell) = row.cells.get(region.col) else {
            continue;
        };
        let format = to_format(&cell.style).set_align(FormatAlign::Top);
        worksheet.merge_range(
            FIRST_BODY_ROW + region.first_row as u32,
            region.col as u16,
            FIRST_BODY_ROW + region.last_row as u32,
            region.col as u16,
            &region.text,
            &format,
        )?;
    }

    worksheet.set_freeze_panes(FIRST_BODY_ROW, (grid.dimension_columns + 1) as u16)?;

    let bytes = xlsx.save_to_buffer()?;
    Ok(bytes)
}

fn to_format(style: &CellStyle) -> Format {
    let mut format = Format::new().set_border(FormatBorder::Thin);

    if style.bold {
        format = format.set_bold();
    }
    if let Some(background) = style.background {
        format = format.set_background_color(rust_xlsxwriter::Color::RGB(background.to_rgb()));
    }
    if style.font.to_rgb() != 0 {
        format = format.set_font_color(rust_xlsxwriter::Color::RGB(style.font.to_rgb()));
    }
    if style.border_top {
        format = format.set_border_top(FormatBorder::Medium);
    }

    format = format.set_align(match style.align {
        CellAlign::Left => FormatAlign::Left,
        CellAlign::Center => FormatAlign::Center,
    });

    format
}
