//! Background colors to cell occupancy.

use ahash::AHashSet;
use exstruct_core::{ColorsMap, SheetGrid};

use crate::options::ColorsOptions;

/// Color reported for cells without a fill.
pub const DEFAULT_BACKGROUND: &str = "FFFFFF";

/// Normalize a color key to uppercase `RRGGBB`: `#` and an `AA` alpha
/// prefix are stripped.
pub fn normalize_color_key(key: &str) -> String {
    let key = key.trim().trim_start_matches('#');
    let key = match key.len() {
        8 => key.get(2..).unwrap_or(key),
        _ => key,
    };
    key.to_ascii_uppercase()
}

/// Build the colors map of a sheet. Cells are `(row, col)` with 1-based
/// rows and 0-based columns, sorted.
pub fn colors_map(grid: &SheetGrid, options: &ColorsOptions) -> ColorsMap {
    let ignored: AHashSet<String> = options
        .ignore_colors
        .iter()
        .map(|c| normalize_color_key(c))
        .collect();

    let mut map = ColorsMap::new();
    for (&(r, c), color) in &grid.fills {
        let key = normalize_color_key(color);
        if !ignored.contains(&key) {
            map.entry(key).or_default().push((r + 1, c));
        }
    }

    if options.include_default_background && !ignored.contains(DEFAULT_BACKGROUND) {
        let unfilled = grid
            .styled
            .iter()
            .filter(|cell| !grid.fills.contains_key(*cell))
            .map(|&(r, c)| (r + 1, c));
        map.entry(DEFAULT_BACKGROUND.to_string())
            .or_default()
            .extend(unfilled);
    }

    map.retain(|_, cells| !cells.is_empty());
    for cells in map.values_mut() {
        cells.sort_unstable();
        cells.dedup();
    }
    map
}
