//! Splitting print areas into pages at page breaks.

use exstruct_core::PrintArea;
use exstruct_excel_com::{AreaRect, PageBreakLayout};

/// Inclusive `(first, last)` spans of `[min, max]` cut before every break in
/// `(min, max]`.
fn spans(min: u32, max: u32, breaks: &[u32]) -> Vec<(u32, u32)> {
    let mut cuts: Vec<u32> = breaks
        .iter()
        .copied()
        .filter(|&b| b > min && b <= max)
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut edges = Vec::with_capacity(cuts.len() + 2);
    edges.push(min);
    edges.extend(cuts);
    edges.push(max.saturating_add(1));
    edges.windows(2).map(|w| (w[0], w[1] - 1)).collect()
}

/// Pages of one 1-based area, row-major.
pub fn split_area(area: &AreaRect, row_breaks: &[u32], col_breaks: &[u32]) -> Vec<PrintArea> {
    let rows = spans(
        area.first_row.min(area.last_row),
        area.first_row.max(area.last_row),
        row_breaks,
    );
    let cols = spans(
        area.first_col.min(area.last_col),
        area.first_col.max(area.last_col),
        col_breaks,
    );

    let mut pages = Vec::with_capacity(rows.len() * cols.len());
    for &(r1, r2) in &rows {
        for &(c1, c2) in &cols {
            pages.push(PrintArea::from_one_based(r1, c1, r2, c2));
        }
    }
    pages
}

/// Pages of every area in a sheet's layout.
pub fn auto_print_areas(layout: &PageBreakLayout) -> Vec<PrintArea> {
    layout
        .areas
        .iter()
        .flat_map(|area| split_area(area, &layout.row_breaks, &layout.col_breaks))
        .collect()
}
