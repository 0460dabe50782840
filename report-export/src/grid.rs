//! FILENAME: report-export/src/grid.rs
//! PURPOSE: The logical export grid shared by every output format.
//! CONTEXT: Values, cell styles and merge regions are resolved once from a
//! `TrendView`. The workbook and document writers only lay this grid out, so
//! both formats carry the same rows, columns and text by construction.

use qc_model::{format_rate, Color};
use serde::Serialize;
use trend_engine::{DisplayRow, RateClassifier, RateContext, RowKind, TrendView};

use crate::ExportError;

// ============================================================================
// PALETTE
// ============================================================================

pub mod palette {
    use qc_model::Color;

    pub const HEADER_FILL: Color = Color::from_rgb(0xADD8E6);
    pub const TOTAL_FILL: Color = Color::from_rgb(0xD3D3D3);
    pub const GROUP_FILL: Color = Color::from_rgb(0xF3F4F6);
    pub const ZERO_FILL: Color = Color::from_rgb(0xE5E7EB);
    pub const TEXT: Color = Color::black();
}

pub const DIMENSION_COLUMN_WIDTH: f64 = 15.0;
pub const LABEL_COLUMN_WIDTH: f64 = 30.0;
pub const BUCKET_COLUMN_WIDTH: f64 = 25.0;

pub const LABEL_HEADER: &str = "Defect / Group";

// ============================================================================
// CELLS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellAlign {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellStyle {
    /// `None` leaves the cell unfilled.
    pub background: Option<Color>,
    pub font: Color,
    pub bold: bool,
    /// Medium rule above the cell (grand total row).
    pub border_top: bool,
    pub align: CellAlign,
}

impl CellStyle {
    const fn plain(align: CellAlign) -> Self {
        CellStyle {
            background: None,
            font: palette::TEXT,
            bold: false,
            border_top: false,
            align,
        }
    }

    const fn filled(background: Color, bold: bool, align: CellAlign) -> Self {
        CellStyle {
            background: Some(background),
            font: palette::TEXT,
            bold,
            border_top: false,
            align,
        }
    }

    pub const fn header() -> Self {
        CellStyle::filled(palette::HEADER_FILL, true, CellAlign::Center)
    }

    pub const fn grand_total(align: CellAlign) -> Self {
        CellStyle {
            border_top: true,
            ..CellStyle::filled(palette::TOTAL_FILL, true, align)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub text: String,
    pub style: CellStyle,
}

impl GridCell {
    fn new(text: impl Into<String>, style: CellStyle) -> Self {
        GridCell {
            text: text.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub kind: RowKind,
    pub cells: Vec<GridCell>,
}

/// A vertical merge over one dimension column, in body row coordinates
/// (row 0 is the first row after the header). Always spans two rows or more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeRegion {
    pub col: usize,
    pub first_row: usize,
    pub last_row: usize,
    pub text: String,
}

impl MergeRegion {
    pub fn len(&self) -> usize {
        self.last_row - self.first_row + 1
    }
}

// ============================================================================
// GRID
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportGrid {
    pub title: String,
    pub sheet_name: String,
    pub file_stem: String,
    pub header: Vec<GridCell>,
    pub rows: Vec<GridRow>,
    pub merges: Vec<MergeRegion>,
    pub dimension_columns: usize,
    /// Column widths in spreadsheet character units.
    pub column_widths: Vec<f64>,
}

impl ExportGrid {
    /// Lays out a view. Refuses an empty view.
    pub fn from_view(view: &TrendView, classifier: &RateClassifier) -> Result<Self, ExportError> {
        if view.is_empty() {
            return Err(ExportError::NoData);
        }

        let dims = view.dimensions.len();

        let mut header: Vec<GridCell> = view
            .dimensions
            .iter()
            .map(|d| GridCell::new(d.display_name(), CellStyle::header()))
            .collect();
        header.push(GridCell::new(LABEL_HEADER, CellStyle::header()));
        header.extend(
            view.time_labels
                .iter()
                .map(|label| GridCell::new(label.clone(), CellStyle::header())),
        );

        let rows = view
            .rows
            .iter()
            .map(|row| grid_row(row, dims, classifier))
            .collect();

        // Spans come precomputed from projection; single-row groups need no merge
        let merges = view
            .spans
            .iter()
            .filter(|span| span.len > 1)
            .flat_map(|span| {
                let values = view.rows[span.first_row].group_values();
                (0..dims).map(move |col| MergeRegion {
                    col,
                    first_row: span.first_row,
                    last_row: span.last_row(),
                    text: values.get(col).cloned().unwrap_or_default(),
                })
            })
            .collect();

        let mut column_widths = vec![DIMENSION_COLUMN_WIDTH; dims];
        column_widths.push(LABEL_COLUMN_WIDTH);
        column_widths.extend(std::iter::repeat(BUCKET_COLUMN_WIDTH).take(view.time_keys.len()));

        Ok(ExportGrid {
            title: view.title(),
            sheet_name: view.sheet_name(),
            file_stem: view.file_stem(),
            header,
            rows,
            merges,
            dimension_columns: dims,
            column_widths,
        })
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Index of the label ("Defect / Group") column.
    pub fn label_column(&self) -> usize {
        self.dimension_columns
    }

    /// For every body row and dimension column, the index of the merge
    /// region covering it. Built in one pass over the regions.
    pub fn merge_index(&self) -> Vec<Vec<Option<usize>>> {
        let mut index = vec![vec![None; self.dimension_columns]; self.rows.len()];
        for (idx, region) in self.merges.iter().enumerate() {
            for row in region.first_row..=region.last_row.min(self.rows.len().saturating_sub(1)) {
                index[row][region.col] = Some(idx);
            }
        }
        index
    }

    /// Header and body text, row by row. Styling aside, this is the content
    /// every exporter must reproduce.
    pub fn values(&self) -> Vec<Vec<String>> {
        std::iter::once(&self.header)
            .chain(self.rows.iter().map(|row| &row.cells))
            .map(|cells| cells.iter().map(|c| c.text.clone()).collect())
            .collect()
    }
}

fn grid_row(row: &DisplayRow, dims: usize, classifier: &RateClassifier) -> GridRow {
    let kind = row.kind();
    let mut cells = Vec::with_capacity(dims + 1 + row.bucket_count());

    let (dim_style, label_style) = match kind {
        RowKind::Group => (
            CellStyle::filled(palette::GROUP_FILL, true, CellAlign::Left),
            CellStyle::filled(palette::GROUP_FILL, true, CellAlign::Left),
        ),
        RowKind::Defect => (
            CellStyle::filled(palette::GROUP_FILL, true, CellAlign::Left),
            CellStyle::plain(CellAlign::Left),
        ),
        RowKind::GrandTotal => (
            CellStyle::grand_total(CellAlign::Left),
            CellStyle::grand_total(CellAlign::Left),
        ),
    };

    let values = row.group_values();
    for col in 0..dims {
        let text = values.get(col).map(String::as_str).unwrap_or("");
        cells.push(GridCell::new(text, dim_style));
    }
    cells.push(GridCell::new(row.label(), label_style));

    for rate in row.rates() {
        cells.push(GridCell::new(format_rate(rate), rate_style(rate, kind, classifier)));
    }

    GridRow { kind, cells }
}

/// Style of a rate cell: fixed palette on the grand total, severity band
/// otherwise, with zero shown as an empty grey cell.
fn rate_style(rate: f64, kind: RowKind, classifier: &RateClassifier) -> CellStyle {
    let bold = kind == RowKind::Group;
    match kind {
        RowKind::GrandTotal => CellStyle::grand_total(CellAlign::Center),
        _ if !(rate.is_finite() && rate > 0.0) => CellStyle::filled(palette::ZERO_FILL, bold, CellAlign::Center),
        _ => {
            let band = classifier.classify(rate, RateContext::PerDefect).colors();
            CellStyle {
                background: Some(band.background),
                font: band.font,
                bold,
                border_top: false,
                align: CellAlign::Center,
            }
        }
    }
}
