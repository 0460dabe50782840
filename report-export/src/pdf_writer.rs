//! FILENAME: report-export/src/pdf_writer.rs
//! PURPOSE: Paginated table document (PDF 1.4) for an export grid.
//! CONTEXT: Landscape A4 with the standard Helvetica faces, so no fonts are
//! embedded and the output depends only on the grid and the generation
//! date. Columns are sized to their widest text and never truncated: bucket
//! columns that do not fit beside the dimension and label columns continue
//! on further pages, which repeat the header row and the leading columns.
//! Merged dimension cells are drawn once per page segment of their region,
//! using the regions computed with the grid.

use std::ops::Range;

use chrono::NaiveDate;
use qc_model::Color;

use crate::grid::{CellAlign, CellStyle, ExportGrid, GridCell};
use crate::ExportError;

// ============================================================================
// PAGE GEOMETRY (points)
// ============================================================================

const PAGE_WIDTH: f64 = 842.0;
const PAGE_HEIGHT: f64 = 595.0;
const MARGIN: f64 = 28.0;
const PRINTABLE_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;
const TITLE_SIZE: f64 = 14.0;
const FONT_SIZE: f64 = 8.0;
const MIN_FONT_SIZE: f64 = 4.0;
const FOOTER_SIZE: f64 = 8.0;
const ROW_HEIGHT: f64 = 16.0;
const CELL_PADDING: f64 = 3.0;
const MIN_COLUMN_WIDTH: f64 = 24.0;

/// Share of the printable width the repeated leading columns may take.
const LEADING_SHARE: f64 = 0.6;

/// Top edge of the header row.
const HEADER_TOP: f64 = PAGE_HEIGHT - MARGIN - TITLE_SIZE - 10.0;
/// Lowest y a body row may reach; the footer lives below it.
const BODY_BOTTOM: f64 = MARGIN + FOOTER_SIZE + 6.0;

const GRID_LINE: Color = Color::new(0x99, 0x99, 0x99);

/// Body rows that fit below the header on one page.
pub fn rows_per_page() -> usize {
    let available = HEADER_TOP - ROW_HEIGHT - BODY_BOTTOM;
    ((available / ROW_HEIGHT).floor() as usize).max(1)
}

/// Splits `row_count` body rows into consecutive page segments.
pub fn page_ranges(row_count: usize, per_page: usize) -> Vec<Range<usize>> {
    let per_page = per_page.max(1);
    (0..row_count)
        .step_by(per_page)
        .map(|start| start..(start + per_page).min(row_count))
        .collect()
}

/// Splits the columns after the first `leading` into consecutive runs whose
/// widths add up to at most `available`. A column wider than `available`
/// gets a run of its own. There is always at least one run.
pub fn column_runs(widths: &[f64], leading: usize, available: f64) -> Vec<Range<usize>> {
    let leading = leading.min(widths.len());
    let mut runs = Vec::new();
    let mut start = leading;
    let mut used = 0.0;
    for (col, width) in widths.iter().enumerate().skip(leading) {
        if col > start && used + width > available {
            runs.push(start..col);
            start = col;
            used = 0.0;
        }
        used += width;
    }
    if start < widths.len() || runs.is_empty() {
        runs.push(start..widths.len());
    }
    runs
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Renders the grid as a PDF document. Pages run across the columns first,
/// then down the rows.
pub fn write_pdf(grid: &ExportGrid, created: NaiveDate) -> Result<Vec<u8>, ExportError> {
    if grid.rows.is_empty() {
        return Err(ExportError::NoData);
    }

    let layout = TableLayout::new(grid);
    let slices: Vec<ColumnSlice> = layout.runs.iter().map(|run| layout.slice(run.clone())).collect();
    let merge_index = grid.merge_index();
    let row_pages = page_ranges(grid.rows.len(), rows_per_page());
    let page_count = row_pages.len() * slices.len();

    let contents: Vec<Vec<u8>> = row_pages
        .iter()
        .flat_map(|range| slices.iter().map(move |slice| (range.clone(), slice)))
        .enumerate()
        .map(|(page_no, (range, slice))| {
            let mut page = PageContent::default();
            page.draw_title(&grid.title);
            page.draw_header(slice, &grid.header);
            page.draw_body(grid, slice, &merge_index, range);
            page.draw_footer(page_no + 1, page_count);
            page.into_bytes()
        })
        .collect();

    let bytes = assemble(&contents, &grid.title, created);
    log::debug!(
        target: "EXPORT",
        "pdf: {} pages ({} column runs), {} bytes",
        page_count,
        slices.len(),
        bytes.len()
    );
    Ok(bytes)
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Page width of every grid column and the runs of columns per page.
struct TableLayout {
    widths: Vec<f64>,
    /// Dimension columns plus the label column, repeated on every page.
    leading: usize,
    runs: Vec<Range<usize>>,
}

impl TableLayout {
    fn new(grid: &ExportGrid) -> Self {
        let leading = (grid.label_column() + 1).min(grid.column_count());
        let mut widths = natural_widths(grid);

        // Oversized leading columns are narrowed; their text shrinks to fit
        let leading_total: f64 = widths[..leading].iter().sum();
        let leading_budget = PRINTABLE_WIDTH * LEADING_SHARE;
        if leading_total > leading_budget {
            let scale = leading_budget / leading_total;
            widths[..leading].iter_mut().for_each(|w| *w *= scale);
        }

        let available = PRINTABLE_WIDTH - widths[..leading].iter().sum::<f64>();
        widths[leading..].iter_mut().for_each(|w| *w = w.min(available));

        let runs = column_runs(&widths, leading, available);
        TableLayout { widths, leading, runs }
    }

    fn slice(&self, run: Range<usize>) -> ColumnSlice {
        let columns: Vec<usize> = (0..self.leading).chain(run).collect();
        let width: Vec<f64> = columns.iter().map(|&col| self.widths[col]).collect();
        let mut x = Vec::with_capacity(columns.len());
        let mut cursor = MARGIN;
        for w in &width {
            x.push(cursor);
            cursor += w;
        }
        ColumnSlice { columns, x, width }
    }
}

/// Widest text of each column, header included, plus padding.
fn natural_widths(grid: &ExportGrid) -> Vec<f64> {
    let mut widths = vec![MIN_COLUMN_WIDTH; grid.column_count()];
    for cells in std::iter::once(&grid.header).chain(grid.rows.iter().map(|row| &row.cells)) {
        for (col, cell) in cells.iter().enumerate() {
            if let Some(width) = widths.get_mut(col) {
                let needed = text_width(&cell.text, FONT_SIZE, cell.style.bold) + 2.0 * CELL_PADDING;
                *width = width.max(needed);
            }
        }
    }
    widths
}

/// The grid columns shown on one page and where they sit.
struct ColumnSlice {
    columns: Vec<usize>,
    x: Vec<f64>,
    width: Vec<f64>,
}

/// Content stream of one page.
#[derive(Default)]
struct PageContent {
    ops: String,
}

impl PageContent {
    fn into_bytes(self) -> Vec<u8> {
        self.ops.into_bytes()
    }

    fn draw_title(&mut self, title: &str) {
        let size = fit_size(title, PRINTABLE_WIDTH, TITLE_SIZE, true);
        let width = text_width(title, size, true);
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
        self.text(title, x, PAGE_HEIGHT - MARGIN - TITLE_SIZE, size, true, Color::black());
    }

    fn draw_footer(&mut self, page: usize, of: usize) {
        let label = format!("Page {} of {}", page, of);
        let width = text_width(&label, FOOTER_SIZE, false);
        self.text(&label, (PAGE_WIDTH - width) / 2.0, MARGIN, FOOTER_SIZE, false, Color::black());
    }

    fn draw_header(&mut self, slice: &ColumnSlice, header: &[GridCell]) {
        let bottom = HEADER_TOP - ROW_HEIGHT;
        for (pos, &col) in slice.columns.iter().enumerate() {
            if let Some(cell) = header.get(col) {
                self.cell(cell, slice.x[pos], bottom, slice.width[pos], ROW_HEIGHT);
            }
        }
    }

    fn draw_body(
        &mut self,
        grid: &ExportGrid,
        slice: &ColumnSlice,
        merge_index: &[Vec<Option<usize>>],
        range: Range<usize>,
    ) {
        let first_top = HEADER_TOP - ROW_HEIGHT;

        for row_idx in range.clone() {
            let top = first_top - (row_idx - range.start) as f64 * ROW_HEIGHT;
            let row = &grid.rows[row_idx];

            for (pos, &col) in slice.columns.iter().enumerate() {
                let Some(cell) = row.cells.get(col) else {
                    continue;
                };
                let (x, w) = (slice.x[pos], slice.width[pos]);
                let region = merge_index
                    .get(row_idx)
                    .and_then(|cols| cols.get(col))
                    .copied()
                    .flatten()
                    .and_then(|idx| grid.merges.get(idx));

                match region {
                    Some(region) => {
                        // One drawn cell per page segment of the region
                        let segment_start = region.first_row.max(range.start);
                        if row_idx != segment_start {
                            continue;
                        }
                        let segment_end = region.last_row.min(range.end - 1);
                        let rows = (segment_end - segment_start + 1) as f64;
                        let merged = GridCell {
                            text: region.text.clone(),
                            style: cell.style,
                        };
                        self.cell(&merged, x, top - rows * ROW_HEIGHT, w, rows * ROW_HEIGHT);
                    }
                    None => self.cell(cell, x, top - ROW_HEIGHT, w, ROW_HEIGHT),
                }
            }
        }
    }

    /// Fill, outline, optional top rule, then text aligned to the top row.
    fn cell(&mut self, cell: &GridCell, x: f64, y: f64, w: f64, h: f64) {
        let style: &CellStyle = &cell.style;

        if let Some(fill) = style.background {
            let (r, g, b) = fill.to_unit_rgb();
            self.ops
                .push_str(&format!("{:.3} {:.3} {:.3} rg {:.2} {:.2} {:.2} {:.2} re f\n", r, g, b, x, y, w, h));
        }

        let (r, g, b) = GRID_LINE.to_unit_rgb();
        self.ops.push_str(&format!(
            "{:.3} {:.3} {:.3} RG 0.5 w {:.2} {:.2} {:.2} {:.2} re S\n",
            r, g, b, x, y, w, h
        ));

        if style.border_top {
            self.ops.push_str(&format!(
                "0 0 0 RG 1.5 w {:.2} {:.2} m {:.2} {:.2} l S\n",
                x,
                y + h,
                x + w,
                y + h
            ));
        }

        if cell.text.is_empty() {
            return;
        }

        let available = (w - 2.0 * CELL_PADDING).max(0.0);
        let size = fit_size(&cell.text, available, FONT_SIZE, style.bold);
        let text_x = match style.align {
            CellAlign::Left => x + CELL_PADDING,
            CellAlign::Center => x + (w - text_width(&cell.text, size, style.bold)) / 2.0,
        };
        let baseline = y + h - ROW_HEIGHT + (ROW_HEIGHT - size) / 2.0 + 1.5;
        self.text(&cell.text, text_x, baseline, size, style.bold, style.font);
    }

    fn text(&mut self, text: &str, x: f64, y: f64, size: f64, bold: bool, color: Color) {
        let (r, g, b) = color.to_unit_rgb();
        let font = if bold { "F2" } else { "F1" };
        self.ops.push_str(&format!(
            "BT /{} {:.2} Tf {:.3} {:.3} {:.3} rg {:.2} {:.2} Td ({}) Tj ET\n",
            font,
            size,
            r,
            g,
            b,
            x,
            y,
            escape_text(text)
        ));
    }
}

// ============================================================================
// TEXT
// ============================================================================

// Advance widths of Helvetica and Helvetica-Bold for ' '..='~', in
// thousandths of the font size (Adobe standard font metrics).
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Advance used for characters outside printable ASCII.
const WIDE_GLYPH: u16 = 667;

fn glyph_width(ch: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    match ch {
        ' '..='~' => table[ch as usize - 0x20],
        _ => WIDE_GLYPH,
    }
}

fn text_width(text: &str, size: f64, bold: bool) -> f64 {
    let units: u32 = text.chars().map(|ch| u32::from(glyph_width(ch, bold))).sum();
    f64::from(units) * size / 1000.0
}

/// Largest size up to `size` at which `text` fits `max_width`, rounded down
/// to the precision written into the content stream.
fn fit_size(text: &str, max_width: f64, size: f64, bold: bool) -> f64 {
    let natural = text_width(text, size, bold);
    if natural <= max_width || natural <= 0.0 {
        return size;
    }
    let scaled = (size * max_width / natural * 100.0).floor() / 100.0;
    scaled.max(MIN_FONT_SIZE)
}

/// Escapes a string for a PDF literal. Characters outside Latin-1 have no
/// WinAnsi code and become `?`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            '\u{A0}'..='\u{FF}' => out.push_str(&format!("\\{:03o}", ch as u32)),
            _ => out.push('?'),
        }
    }
    out
}

// ============================================================================
// FILE STRUCTURE
// ============================================================================

/// Writes objects and the cross-reference table.
/// Object ids: 1 catalog, 2 page tree, 3-4 fonts, 5 info, then a page and
/// its content stream per page.
fn assemble(contents: &[Vec<u8>], title: &str, created: NaiveDate) -> Vec<u8> {
    const FIRST_PAGE_ID: usize = 6;
    let object_count = FIRST_PAGE_ID - 1 + contents.len() * 2;

    let mut out: Vec<u8> = Vec::new();
    let mut offsets = vec![0usize; object_count + 1];
    out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let mut object = |out: &mut Vec<u8>, id: usize, body: &[u8]| {
        offsets[id] = out.len();
        out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    };

    object(&mut out, 1, b"<< /Type /Catalog /Pages 2 0 R >>");

    let kids: Vec<String> = (0..contents.len())
        .map(|i| format!("{} 0 R", FIRST_PAGE_ID + i * 2))
        .collect();
    object(
        &mut out,
        2,
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), contents.len()).as_bytes(),
    );

    object(
        &mut out,
        3,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    object(
        &mut out,
        4,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );
    object(
        &mut out,
        5,
        format!(
            "<< /Title ({}) /Producer (report-export) /CreationDate (D:{}000000Z) >>",
            escape_text(title),
            created.format("%Y%m%d")
        )
        .as_bytes(),
    );

    for (i, content) in contents.iter().enumerate() {
        let page_id = FIRST_PAGE_ID + i * 2;
        let content_id = page_id + 1;
        object(
            &mut out,
            page_id,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH, PAGE_HEIGHT, content_id
            )
            .as_bytes(),
        );

        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(content);
        stream.extend_from_slice(b"\nendstream");
        object(&mut out, content_id, &stream);
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", object_count + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets[1..] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info 5 0 R >>\nstartxref\n{}\n%%EOF\n",
            object_count + 1,
            xref_offset
        )
        .as_bytes(),
    );
    out
}
