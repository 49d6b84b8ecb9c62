//! Table candidate detection.
//!
//! Regions come from two places: tables the workbook declares (table parts
//! or list objects), which are accepted without scoring, and clusters of
//! bordered cells, which are scored on how densely and evenly they are
//! filled. The detector takes its thresholds as a parameter; the
//! process-wide configuration below is only read at the outer boundary.

use std::collections::VecDeque;
use std::sync::RwLock;

use ahash::AHashSet;
use exstruct_core::{parse_range, Bounds, SheetGrid};
use lazy_static::lazy_static;

/// Bordered clusters smaller than this are ignored.
const MIN_BORDER_CLUSTER: usize = 4;

/// Thresholds a scored region must meet to become a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDetectionConfig {
    pub table_score_threshold: f64,
    pub density_min: f64,
    pub coverage_min: f64,
    pub min_nonempty_cells: usize,
}

impl Default for TableDetectionConfig {
    fn default() -> Self {
        Self {
            table_score_threshold: 0.35,
            density_min: 0.05,
            coverage_min: 0.2,
            min_nonempty_cells: 3,
        }
    }
}

/// A partial update of [`TableDetectionConfig`]; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableParams {
    pub table_score_threshold: Option<f64>,
    pub density_min: Option<f64>,
    pub coverage_min: Option<f64>,
    pub min_nonempty_cells: Option<usize>,
}

impl TableDetectionConfig {
    pub fn apply(&mut self, params: &TableParams) {
        if let Some(v) = params.table_score_threshold {
            self.table_score_threshold = v;
        }
        if let Some(v) = params.density_min {
            self.density_min = v;
        }
        if let Some(v) = params.coverage_min {
            self.coverage_min = v;
        }
        if let Some(v) = params.min_nonempty_cells {
            self.min_nonempty_cells = v;
        }
    }
}

lazy_static! {
    static ref TABLE_DETECTION: RwLock<TableDetectionConfig> =
        RwLock::new(TableDetectionConfig::default());
}

/// Update the process-wide detector thresholds.
pub fn set_table_detection_params(params: TableParams) {
    let mut config = TABLE_DETECTION
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    config.apply(&params);
    log::debug!("table detection config set to {:?}", *config);
}

/// Snapshot of the process-wide detector thresholds.
pub fn table_detection_config() -> TableDetectionConfig {
    TABLE_DETECTION
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Restore the default thresholds.
pub fn reset_table_detection_params() {
    *TABLE_DETECTION
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = TableDetectionConfig::default();
}

/// Evidence collected for one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionScore {
    pub nonempty_count: usize,
    pub density: f64,
    pub coverage: f64,
    pub header_ratio: f64,
    pub score: f64,
}

impl RegionScore {
    pub fn is_accepted(&self, config: &TableDetectionConfig) -> bool {
        self.nonempty_count >= config.min_nonempty_cells
            && self.density >= config.density_min
            && self.coverage >= config.coverage_min
            && self.score >= config.table_score_threshold
    }
}

/// Score a region of `grid`.
pub fn score_region(grid: &SheetGrid, bounds: &Bounds) -> RegionScore {
    let nonempty_count = grid.nonempty_in(bounds);
    let density = nonempty_count as f64 / bounds.area() as f64;

    let row_coverage = grid.nonempty_rows_in(bounds).len() as f64 / bounds.row_count() as f64;
    let col_coverage = grid.nonempty_cols_in(bounds).len() as f64 / bounds.col_count() as f64;
    let coverage = row_coverage.min(col_coverage);

    let header = Bounds::new(bounds.r1, bounds.c1, bounds.r1, bounds.c2);
    let header_ratio = grid.nonempty_in(&header) as f64 / bounds.col_count() as f64;

    RegionScore {
        nonempty_count,
        density,
        coverage,
        header_ratio,
        score: 0.5 * density + 0.3 * coverage + 0.2 * header_ratio,
    }
}

/// Table candidates of a sheet as `A1:B2` strings, declared tables first.
pub fn detect_tables(grid: &SheetGrid, config: &TableDetectionConfig) -> Vec<String> {
    let mut declared = Vec::new();
    for reference in &grid.declared_tables {
        match parse_range(reference) {
            Some(bounds) => declared.push(bounds),
            None => log::debug!("ignoring unparseable table reference {reference:?}"),
        }
    }

    let mut found: Vec<Bounds> = declared.clone();
    for region in border_regions(grid) {
        if declared.iter().any(|d| d.overlaps(&region)) {
            continue;
        }
        let score = score_region(grid, &region);
        if score.is_accepted(config) {
            found.push(region);
        } else {
            log::debug!("rejected table candidate {region}: {score:?}");
        }
    }

    let mut seen = AHashSet::new();
    found
        .into_iter()
        .filter(|b| seen.insert(*b))
        .map(|b| b.to_a1())
        .collect()
}

/// Bordered-cell clusters, merged where they overlap and shrunk to content.
pub fn border_regions(grid: &SheetGrid) -> Vec<Bounds> {
    let boxes = merge_overlapping(border_clusters(&grid.borders));
    boxes
        .iter()
        .filter_map(|b| shrink_to_content(grid, b))
        .collect()
}

/// Bounding boxes of 4-connected groups of bordered cells.
fn border_clusters(borders: &AHashSet<(u32, u32)>) -> Vec<Bounds> {
    let mut cells: Vec<(u32, u32)> = borders.iter().copied().collect();
    cells.sort_unstable();

    let mut visited: AHashSet<(u32, u32)> = AHashSet::with_capacity(cells.len());
    let mut clusters = Vec::new();

    for start in cells {
        if !visited.insert(start) {
            continue;
        }
        let mut queue = VecDeque::from([start]);
        let mut size = 0usize;
        let mut bounds = Bounds::cell(start.0, start.1);

        while let Some((r, c)) = queue.pop_front() {
            size += 1;
            bounds = bounds.union(&Bounds::cell(r, c));
            let neighbours = [
                r.checked_sub(1).map(|r| (r, c)),
                r.checked_add(1).map(|r| (r, c)),
                c.checked_sub(1).map(|c| (r, c)),
                c.checked_add(1).map(|c| (r, c)),
            ];
            for next in neighbours.into_iter().flatten() {
                if borders.contains(&next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        if size >= MIN_BORDER_CLUSTER {
            clusters.push(bounds);
        }
    }
    clusters
}

fn merge_overlapping(mut boxes: Vec<Bounds>) -> Vec<Bounds> {
    loop {
        let mut merged: Vec<Bounds> = Vec::with_capacity(boxes.len());
        let mut changed = false;
        for b in boxes {
            match merged.iter_mut().find(|m| m.overlaps(&b)) {
                Some(m) => {
                    *m = m.union(&b);
                    changed = true;
                }
                None => merged.push(b),
            }
        }
        if !changed {
            merged.sort_unstable();
            return merged;
        }
        boxes = merged;
    }
}

/// Trim outer rows and columns without content. `None` when the box is empty.
fn shrink_to_content(grid: &SheetGrid, bounds: &Bounds) -> Option<Bounds> {
    let rows = grid.nonempty_rows_in(bounds);
    let cols = grid.nonempty_cols_in(bounds);
    let r1 = *rows.iter().min()?;
    let r2 = *rows.iter().max()?;
    let c1 = *cols.iter().min()?;
    let c2 = *cols.iter().max()?;
    Some(Bounds::new(r1, c1, r2, c2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exstruct_core::CellValue;
    use pretty_assertions::assert_eq;

    /// A bordered block at `bounds` with `values` written row by row.
    fn bordered(grid: &mut SheetGrid, bounds: Bounds, values: &[&[&str]]) {
        for r in bounds.r1..=bounds.r2 {
            for c in bounds.c1..=bounds.c2 {
                grid.borders.insert((r, c));
            }
        }
        for (dr, row) in values.iter().enumerate() {
            for (dc, v) in row.iter().enumerate() {
                grid.set_value(bounds.r1 + dr as u32, bounds.c1 + dc as u32, CellValue::from(*v));
            }
        }
    }

    #[test]
    fn test_dense_bordered_block_is_accepted() {
        let mut grid = SheetGrid::new();
        bordered(
            &mut grid,
            Bounds::new(1, 1, 3, 2),
            &[&["Name", "Qty"], &["apple", "3"], &["pear", "5"]],
        );
        let found = detect_tables(&grid, &TableDetectionConfig::default());
        assert_eq!(found, vec!["B2:C4".to_string()]);
    }

    #[test]
    fn test_two_nonempty_cells_below_minimum() {
        let mut grid = SheetGrid::new();
        bordered(&mut grid, Bounds::new(0, 0, 1, 1), &[&["a", "b"]]);

        let score = score_region(&grid, &Bounds::new(0, 0, 1, 1));
        assert_eq!(score.nonempty_count, 2);
        assert!(!score.is_accepted(&TableDetectionConfig::default()));
        assert!(detect_tables(&grid, &TableDetectionConfig::default()).is_empty());
    }

    #[test]
    fn test_score_components() {
        let mut grid = SheetGrid::new();
        grid.set_value(0, 0, "h1".into());
        grid.set_value(0, 1, "h2".into());
        grid.set_value(2, 0, "x".into());
        let score = score_region(&grid, &Bounds::new(0, 0, 3, 1));
        assert_eq!(score.nonempty_count, 3);
        assert_eq!(score.density, 3.0 / 8.0);
        // 2 of 4 rows, 2 of 2 columns
        assert_eq!(score.coverage, 0.5);
        assert_eq!(score.header_ratio, 1.0);
        assert!((score.score - (0.5 * 0.375 + 0.3 * 0.5 + 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_small_clusters_are_ignored() {
        let mut borders = AHashSet::new();
        borders.extend([(0, 0), (0, 1), (1, 0)]);
        borders.extend([(5, 5), (5, 6), (6, 5), (6, 6)]);
        assert_eq!(border_clusters(&borders), vec![Bounds::new(5, 5, 6, 6)]);
    }

    #[test]
    fn test_diagonal_cells_are_separate_clusters() {
        let mut borders = AHashSet::new();
        borders.extend([(0, 0), (1, 1), (2, 2), (3, 3)]);
        assert!(border_clusters(&borders).is_empty());
    }

    #[test]
    fn test_overlapping_boxes_merge() {
        let merged = merge_overlapping(vec![
            Bounds::new(0, 0, 2, 2),
            Bounds::new(10, 10, 11, 11),
            Bounds::new(2, 2, 4, 4),
        ]);
        assert_eq!(merged, vec![Bounds::new(0, 0, 4, 4), Bounds::new(10, 10, 11, 11)]);
    }

    #[test]
    fn test_box_shrinks_to_content() {
        let mut grid = SheetGrid::new();
        bordered(&mut grid, Bounds::new(0, 0, 5, 5), &[]);
        grid.set_value(2, 1, "a".into());
        grid.set_value(3, 3, "b".into());
        grid.set_value(3, 1, "c".into());
        assert_eq!(border_regions(&grid), vec![Bounds::new(2, 1, 3, 3)]);
    }

    #[test]
    fn test_declared_tables_taken_as_is() {
        let mut grid = SheetGrid::new();
        grid.declared_tables.push("$A$1:$C$10".into());
        grid.declared_tables.push("not a range".into());
        // An overlapping bordered block does not produce a second candidate.
        bordered(
            &mut grid,
            Bounds::new(0, 0, 2, 2),
            &[&["a", "b", "c"], &["d", "e", "f"]],
        );
        let found = detect_tables(&grid, &TableDetectionConfig::default());
        assert_eq!(found, vec!["A1:C10".to_string()]);
    }

    #[test]
    fn test_stricter_threshold_rejects() {
        let mut grid = SheetGrid::new();
        bordered(
            &mut grid,
            Bounds::new(0, 0, 3, 3),
            &[&["a", "b", "c", "d"], &["e"], &[], &["", "", "", "z"]],
        );
        let strict = TableDetectionConfig {
            table_score_threshold: 0.9,
            ..TableDetectionConfig::default()
        };
        assert_eq!(detect_tables(&grid, &TableDetectionConfig::default()).len(), 1);
        assert!(detect_tables(&grid, &strict).is_empty());
    }

    #[test]
    fn test_global_params_partial_update_and_reset() {
        set_table_detection_params(TableParams {
            density_min: Some(0.5),
            ..TableParams::default()
        });
        let config = table_detection_config();
        assert_eq!(config.density_min, 0.5);
        assert_eq!(config.table_score_threshold, 0.35);

        reset_table_detection_params();
        assert_eq!(table_detection_config(), TableDetectionConfig::default());
    }
}
