//! Print-area views: one sheet seen through one print area.
//!
//! A view borrows everything it keeps unchanged from the [`SheetData`] it
//! was built from. Rows cut down to the area's columns and anything
//! re-based by [`PrintAreaView::normalize`] are owned copies.

use std::borrow::Cow;

use exstruct_core::{parse_range, Bounds, CellRow, Chart, Graphic, PrintArea, SheetData, WorkbookData};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    /// Re-base rows, columns and positions to the area's top-left corner.
    pub normalize: bool,
    /// Also build views for page-break areas in [`print_area_views`].
    pub include_auto_page_breaks: bool,
}

/// The part of a sheet inside one print area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintAreaView<'a> {
    pub sheet_name: &'a str,
    pub area: PrintArea,
    pub shapes: Vec<Cow<'a, Graphic>>,
    pub charts: Vec<Cow<'a, Chart>>,
    pub rows: Vec<Cow<'a, CellRow>>,
    pub table_candidates: Vec<Cow<'a, str>>,
    /// Top-left corner of the area in shape coordinates.
    #[serde(skip)]
    origin: (i32, i32),
}

fn intersects(bbox: (i64, i64, i64, i64), rect: (f64, f64, f64, f64)) -> bool {
    let (l, t, r, b) = bbox;
    let (al, at, ar, ab) = rect;
    (l as f64) <= ar && (r as f64) >= al && (t as f64) <= ab && (b as f64) >= at
}

impl<'a> PrintAreaView<'a> {
    /// Filter `data` to `area`.
    ///
    /// Graphics and charts are kept when their box touches the area
    /// (edges count). Rows are kept inside the area's rows with cells
    /// outside its columns removed; rows left empty are dropped. Table
    /// candidates are kept only when they lie entirely inside.
    pub fn build(
        sheet_name: &'a str,
        data: &'a SheetData,
        area: &PrintArea,
        options: ViewOptions,
    ) -> PrintAreaView<'a> {
        let rect = data.metrics.area_rect(area);

        let shapes = data
            .shapes
            .iter()
            .filter(|g| intersects(g.bounding_box(), rect))
            .map(Cow::Borrowed)
            .collect();
        let charts = data
            .charts
            .iter()
            .filter(|c| intersects(c.bounding_box(), rect))
            .map(Cow::Borrowed)
            .collect();

        let rows = data
            .rows
            .iter()
            .filter(|row| area.contains_row(row.r))
            .filter_map(|row| {
                if row.within_columns(area.c1, area.c2) {
                    Some(Cow::Borrowed(row))
                } else {
                    let kept = row.restricted(area.c1, area.c2);
                    (!kept.c.is_empty() || kept.links.is_some()).then_some(Cow::Owned(kept))
                }
            })
            .filter(|row| !row.c.is_empty() || row.links.is_some())
            .collect();

        let table_candidates = data
            .table_candidates
            .iter()
            .filter(|candidate| {
                parse_range(candidate).is_some_and(|bounds| area.contains_bounds(&bounds))
            })
            .map(|candidate| Cow::Borrowed(candidate.as_str()))
            .collect();

        let view = PrintAreaView {
            sheet_name,
            area: *area,
            shapes,
            charts,
            rows,
            table_candidates,
            origin: (rect.0 as i32, rect.1 as i32),
        };
        if options.normalize {
            view.normalize()
        } else {
            view
        }
    }

    /// Re-base to the area: rows start at 1, columns at 0, positions at
    /// the area's top-left point. Nothing is filtered again.
    pub fn normalize(self) -> PrintAreaView<'a> {
        let area = self.area;
        let (dx, dy) = self.origin;
        let row_offset = area.r1.saturating_sub(1);

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut moved = CellRow::new(row.r - area.r1 + 1);
                moved.c = row.c.iter().map(|(c, v)| (c - area.c1, v.clone())).collect();
                moved.links = row
                    .links
                    .as_ref()
                    .map(|links| links.iter().map(|(c, t)| (c - area.c1, t.clone())).collect());
                Cow::Owned(moved)
            })
            .collect();

        let table_candidates = self
            .table_candidates
            .iter()
            .map(|candidate| match parse_range(candidate) {
                Some(b) => Cow::Owned(
                    Bounds::new(
                        b.r1 - row_offset,
                        b.c1 - area.c1,
                        b.r2 - row_offset,
                        b.c2 - area.c1,
                    )
                    .to_a1(),
                ),
                None => candidate.clone(),
            })
            .collect();

        PrintAreaView {
            sheet_name: self.sheet_name,
            area,
            shapes: self
                .shapes
                .iter()
                .map(|g| Cow::Owned(g.rebased(dx, dy)))
                .collect(),
            charts: self
                .charts
                .iter()
                .map(|c| Cow::Owned(c.rebased(dx, dy)))
                .collect(),
            rows,
            table_candidates,
            origin: (0, 0),
        }
    }
}

/// Views of every print area in the workbook, sheet by sheet.
pub fn print_area_views(workbook: &WorkbookData, options: ViewOptions) -> Vec<PrintAreaView<'_>> {
    let mut views = Vec::new();
    for (name, data) in workbook.sheets.iter() {
        for area in &data.print_areas {
            views.push(PrintAreaView::build(name, data, area, options));
        }
        if options.include_auto_page_breaks {
            for area in &data.auto_print_areas {
                views.push(PrintAreaView::build(name, data, area, options));
            }
        }
    }
    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use exstruct_core::{Arrow, CellValue, Shape, ShapeBase, SmartArt, SmartArtNode};
    use pretty_assertions::assert_eq;

    fn shape(text: &str, l: i32, t: i32, w: i32, h: i32) -> Graphic {
        Graphic::Shape(Shape {
            base: ShapeBase {
                text: text.into(),
                l,
                t,
                w: Some(w),
                h: Some(h),
                ..Default::default()
            },
        })
    }

    fn row(r: u32, cells: &[(u32, &str)]) -> CellRow {
        let mut row = CellRow::new(r);
        for &(c, v) in cells {
            row.c.insert(c, CellValue::from(v));
        }
        row
    }

    /// Default metrics: rows 15pt, columns 48pt.
    fn sheet() -> SheetData {
        SheetData {
            rows: vec![
                row(1, &[(0, "Item"), (1, "Qty"), (4, "note")]),
                row(2, &[(0, "apple"), (1, "3")]),
                row(3, &[(0, "pear"), (1, "5")]),
                row(4, &[(5, "far")]),
            ],
            shapes: vec![
                shape("inside", 10, 5, 20, 10),
                // left edge exactly on the area's right edge (2 columns = 96pt)
                shape("touching", 96, 0, 30, 10),
                shape("outside", 200, 100, 10, 10),
                Graphic::Arrow(Arrow {
                    base: ShapeBase {
                        l: 50,
                        t: 20,
                        ..Default::default()
                    },
                    end_arrow_style: Some(2),
                    ..Default::default()
                }),
            ],
            charts: vec![Chart {
                name: "Chart 1".into(),
                l: 300,
                t: 300,
                w: Some(100),
                h: Some(100),
                ..Chart::default()
            }],
            table_candidates: vec!["A1:B3".into(), "A1:C3".into(), "B2:B3".into()],
            ..SheetData::default()
        }
    }

    #[test]
    fn test_first_two_rows_exclude_row_three() {
        let data = sheet();
        let area = PrintArea { r1: 1, c1: 0, r2: 2, c2: 1 };
        let view = PrintAreaView::build("Sheet1", &data, &area, ViewOptions::default());

        assert_eq!(view.rows.iter().map(|r| r.r).collect::<Vec<_>>(), vec![1, 2]);
        // Row 1 had a cell in column 4, so it was cut down.
        assert!(matches!(view.rows[0], Cow::Owned(_)));
        assert_eq!(view.rows[0].c.len(), 2);
        assert!(matches!(view.rows[1], Cow::Borrowed(_)));
        assert!(view.table_candidates.is_empty());
    }

    #[test]
    fn test_graphics_touching_the_edge_are_kept() {
        let data = sheet();
        let area = PrintArea { r1: 1, c1: 0, r2: 3, c2: 1 };
        let view = PrintAreaView::build("Sheet1", &data, &area, ViewOptions::default());

        let texts: Vec<&str> = view.shapes.iter().map(|g| g.base().text.as_str()).collect();
        assert_eq!(texts, vec!["inside", "touching", ""]);
        assert!(view.charts.is_empty());
        assert_eq!(view.table_candidates, vec![Cow::Borrowed("A1:B3"), Cow::Borrowed("B2:B3")]);
    }

    #[test]
    fn test_view_is_a_subset() {
        let data = sheet();
        let area = PrintArea { r1: 2, c1: 1, r2: 4, c2: 5 };
        let view = PrintAreaView::build("Sheet1", &data, &area, ViewOptions::default());
        for kept in &view.rows {
            let original = data.rows.iter().find(|r| r.r == kept.r).unwrap();
            for (c, v) in &kept.c {
                assert_eq!(original.c.get(c), Some(v));
            }
        }
        for g in &view.shapes {
            assert!(data.shapes.contains(g));
        }
    }

    #[test]
    fn test_normalize_rebases_everything() {
        let data = sheet();
        let area = PrintArea { r1: 2, c1: 1, r2: 3, c2: 1 };
        let view = PrintAreaView::build(
            "Sheet1",
            &data,
            &area,
            ViewOptions {
                normalize: true,
                ..ViewOptions::default()
            },
        );

        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0].r, 1);
        assert_eq!(view.rows[0].c.get(&0), Some(&CellValue::from("3")));
        assert_eq!(view.table_candidates, vec![Cow::<str>::Owned("A1:A2".into())]);

        // Area origin is (48, 15); the arrow at (50, 20) becomes (2, 5).
        let arrow = view.shapes.iter().find(|g| g.kind() == "Arrow").unwrap();
        assert_eq!((arrow.base().l, arrow.base().t), (2, 5));
    }

    #[test]
    fn test_print_area_views_for_workbook() {
        let mut data = sheet();
        data.print_areas = vec![PrintArea { r1: 1, c1: 0, r2: 2, c2: 1 }];
        data.auto_print_areas = vec![
            PrintArea { r1: 1, c1: 0, r2: 1, c2: 1 },
            PrintArea { r1: 2, c1: 0, r2: 2, c2: 1 },
        ];
        let mut workbook = WorkbookData::default();
        workbook.sheets.insert("Sheet1", data);
        workbook.sheets.insert("Empty", SheetData::default());

        assert_eq!(print_area_views(&workbook, ViewOptions::default()).len(), 1);
        let all = print_area_views(
            &workbook,
            ViewOptions {
                include_auto_page_breaks: true,
                ..ViewOptions::default()
            },
        );
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].rows.iter().map(|r| r.r).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_smartart_kept_whole_and_rebased() {
        let diagram = |l: i32, t: i32| {
            Graphic::SmartArt(SmartArt {
                base: ShapeBase {
                    l,
                    t,
                    w: Some(120),
                    h: Some(60),
                    ..Default::default()
                },
                layout: "Hierarchy".into(),
                nodes: vec![SmartArtNode {
                    level: 1,
                    text: "Board".into(),
                    kids: vec![SmartArtNode {
                        level: 2,
                        text: "CEO".into(),
                        kids: Vec::new(),
                    }],
                }],
            })
        };
        let data = SheetData {
            shapes: vec![diagram(60, 20), diagram(600, 600)],
            ..SheetData::default()
        };
        let area = PrintArea { r1: 2, c1: 1, r2: 3, c2: 2 };

        let view = PrintAreaView::build("Sheet1", &data, &area, ViewOptions::default());
        assert_eq!(view.shapes.len(), 1);
        assert_eq!(&*view.shapes[0], &data.shapes[0]);

        let view = view.normalize();
        match &*view.shapes[0] {
            Graphic::SmartArt(art) => {
                // Area origin is (48, 15).
                assert_eq!((art.base.l, art.base.t), (12, 5));
                assert_eq!(art.layout, "Hierarchy");
                assert_eq!(art.nodes[0].kids[0].text, "CEO");
            }
            other => panic!("expected SmartArt, got {other:?}"),
        }
    }

    #[test]
    fn test_view_serializes_without_origin() {
        let data = sheet();
        let area = PrintArea { r1: 1, c1: 0, r2: 1, c2: 0 };
        let view = PrintAreaView::build("Sheet1", &data, &area, ViewOptions::default());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["sheet_name"], "Sheet1");
        assert_eq!(json["rows"][0]["c"]["0"], "Item");
        assert!(json.get("origin").is_none());
    }
}
