//! Backend-neutral sparse sheet grid

use std::collections::BTreeMap;

use ahash::AHashSet;

use crate::cell::{CellRow, CellValue};
use crate::range::Bounds;
use crate::sheet::SheetMetrics;

/// A sheet's cells as seen by one backend, keyed by zero-based `(row, col)`.
///
/// Both backends produce this; cell rows, the colors map and table
/// candidates are all derived from it.
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    /// Non-empty cell values.
    pub cells: BTreeMap<(u32, u32), CellValue>,
    /// Hyperlink targets.
    pub links: BTreeMap<(u32, u32), String>,
    /// Solid background fill colors as uppercase `RRGGBB`.
    pub fills: BTreeMap<(u32, u32), String>,
    /// Cells that exist in the sheet (value or formatting) but may be empty.
    pub styled: AHashSet<(u32, u32)>,
    /// Cells with at least one border edge.
    pub borders: AHashSet<(u32, u32)>,
    /// Declared table ranges (table parts or list objects), A1 strings.
    pub declared_tables: Vec<String>,
    pub metrics: SheetMetrics,
}

impl SheetGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value; blank text is not stored.
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        self.styled.insert((row, col));
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    pub fn value(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    pub fn is_nonempty(&self, row: u32, col: u32) -> bool {
        self.cells.contains_key(&(row, col))
    }

    pub fn has_border(&self, row: u32, col: u32) -> bool {
        self.borders.contains(&(row, col))
    }

    /// Bounds of all non-empty cells, if any.
    pub fn used_bounds(&self) -> Option<Bounds> {
        self.cells
            .keys()
            .map(|&(r, c)| Bounds::cell(r, c))
            .reduce(|acc, b| acc.union(&b))
    }

    /// Number of non-empty cells inside `bounds`.
    pub fn nonempty_in(&self, bounds: &Bounds) -> usize {
        self.cells
            .range((bounds.r1, bounds.c1)..=(bounds.r2, bounds.c2))
            .filter(|((_, c), _)| *c >= bounds.c1 && *c <= bounds.c2)
            .count()
    }

    /// Zero-based rows holding at least one non-empty cell inside `bounds`.
    pub fn nonempty_rows_in(&self, bounds: &Bounds) -> AHashSet<u32> {
        self.cells
            .range((bounds.r1, bounds.c1)..=(bounds.r2, bounds.c2))
            .filter(|((_, c), _)| *c >= bounds.c1 && *c <= bounds.c2)
            .map(|((r, _), _)| *r)
            .collect()
    }

    /// Columns holding at least one non-empty cell inside `bounds`.
    pub fn nonempty_cols_in(&self, bounds: &Bounds) -> AHashSet<u32> {
        self.cells
            .range((bounds.r1, bounds.c1)..=(bounds.r2, bounds.c2))
            .filter(|((_, c), _)| *c >= bounds.c1 && *c <= bounds.c2)
            .map(|((_, c), _)| *c)
            .collect()
    }

    /// Group the non-empty cells into 1-based [`CellRow`]s.
    pub fn to_rows(&self, include_links: bool) -> Vec<CellRow> {
        let mut rows: BTreeMap<u32, CellRow> = BTreeMap::new();
        for (&(r, c), value) in &self.cells {
            rows.entry(r)
                .or_insert_with(|| CellRow::new(r + 1))
                .c
                .insert(c, value.clone());
        }
        if include_links {
            for (&(r, c), target) in &self.links {
                // A link on an empty cell still anchors a row.
                rows.entry(r)
                    .or_insert_with(|| CellRow::new(r + 1))
                    .links
                    .get_or_insert_with(BTreeMap::new)
                    .insert(c, target.clone());
            }
            rows.retain(|_, row| !row.c.is_empty() || row.links.is_some());
        }
        rows.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid() -> SheetGrid {
        let mut g = SheetGrid::new();
        g.set_value(0, 0, "Name".into());
        g.set_value(0, 1, "Qty".into());
        g.set_value(1, 0, "apple".into());
        g.set_value(1, 1, CellValue::Int(3));
        g.set_value(1, 5, "".into());
        g.set_value(4, 2, "note".into());
        g.links.insert((1, 0), "https://example.com/apple".into());
        g
    }

    #[test]
    fn test_blank_values_are_not_stored() {
        let g = grid();
        assert!(!g.is_nonempty(1, 5));
        assert!(g.styled.contains(&(1, 5)));
    }

    #[test]
    fn test_to_rows_without_links() {
        let rows = grid().to_rows(false);
        assert_eq!(rows.iter().map(|r| r.r).collect::<Vec<_>>(), vec![1, 2, 5]);
        assert_eq!(rows[1].c.get(&1), Some(&CellValue::Int(3)));
        assert!(rows.iter().all(|r| r.links.is_none()));
    }

    #[test]
    fn test_to_rows_with_links() {
        let rows = grid().to_rows(true);
        let links = rows[1].links.as_ref().unwrap();
        assert_eq!(links.get(&0).map(String::as_str), Some("https://example.com/apple"));
        assert!(rows[0].links.is_none());
    }

    #[test]
    fn test_nonempty_counts_respect_columns() {
        let g = grid();
        let b = Bounds::new(0, 1, 4, 2);
        assert_eq!(g.nonempty_in(&b), 3);
        assert_eq!(g.nonempty_rows_in(&b).len(), 3);
        assert_eq!(g.nonempty_cols_in(&b).len(), 2);
        assert_eq!(g.used_bounds(), Some(Bounds::new(0, 0, 4, 2)));
    }
}
