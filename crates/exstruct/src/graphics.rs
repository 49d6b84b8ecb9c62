//! Classification of raw drawing objects into [`Graphic`] variants.
//!
//! Every kept object becomes exactly one variant:
//!
//! | raw attributes | variant |
//! |---|---|
//! | SmartArt flag | [`SmartArt`] |
//! | arrowhead style or connector flag | [`Arrow`] |
//! | anything else | [`Shape`] |

use exstruct_core::{Arrow, Direction, Graphic, Shape, ShapeBase, SmartArt};
use exstruct_excel_com::RawShape;

use crate::options::ExtractionMode;
use crate::smartart::build_tree;

// MsoShapeType
const MSO_AUTOSHAPE: i32 = 1;
const MSO_CHART: i32 = 3;
const MSO_COMMENT: i32 = 4;
const MSO_FORM_CONTROL: i32 = 8;
const MSO_LINE: i32 = 9;
const MSO_LINKED_PICTURE: i32 = 11;
const MSO_PICTURE: i32 = 13;

// MsoAutoShapeType
const MSO_SHAPE_MIXED: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Shape,
    Arrow,
    SmartArt,
}

fn kind_of(raw: &RawShape) -> Kind {
    if raw.has_smartart {
        Kind::SmartArt
    } else if raw.begin_arrow_style.is_some() || raw.end_arrow_style.is_some() || raw.is_connector
    {
        Kind::Arrow
    } else {
        Kind::Shape
    }
}

fn is_line_like(raw: &RawShape) -> bool {
    raw.mso_type == MSO_LINE || kind_of(raw) == Kind::Arrow
}

/// Whether `raw` is a graphic of interest in `mode`.
///
/// Charts, comments, pictures and form controls are never kept, nor are
/// empty autoshapes of mixed type. SmartArt is always kept outside `light`. `standard` also drops plain shapes
/// without text; `light` keeps nothing.
pub fn keep_for_mode(raw: &RawShape, mode: ExtractionMode) -> bool {
    if mode == ExtractionMode::Light {
        return false;
    }
    if matches!(
        raw.mso_type,
        MSO_CHART | MSO_COMMENT | MSO_FORM_CONTROL | MSO_PICTURE | MSO_LINKED_PICTURE
    ) {
        return false;
    }
    let blank = raw.text.trim().is_empty();
    // Non-autoshapes (SmartArt frames, freeforms) also report Mixed.
    if blank
        && raw.mso_type == MSO_AUTOSHAPE
        && !raw.has_smartart
        && raw.autoshape_type == Some(MSO_SHAPE_MIXED)
        && !is_line_like(raw)
    {
        return false;
    }
    if mode == ExtractionMode::Standard && blank && kind_of(raw) == Kind::Shape {
        return false;
    }
    true
}

/// Classify one raw object.
pub fn classify(raw: &RawShape) -> Graphic {
    let base = base_of(raw);
    match kind_of(raw) {
        Kind::SmartArt => {
            if raw.begin_arrow_style.is_some() || raw.end_arrow_style.is_some() {
                log::debug!(
                    "SmartArt {:?} also reports arrow styles; classified as SmartArt",
                    raw.name
                );
            }
            Graphic::SmartArt(SmartArt {
                base,
                layout: raw.smartart_layout.clone().unwrap_or_default(),
                nodes: build_tree(raw.smartart_nodes.iter().map(|n| (n.level, n.text.as_str()))),
            })
        }
        Kind::Arrow => Graphic::Arrow(Arrow {
            base,
            begin_arrow_style: raw.begin_arrow_style,
            end_arrow_style: raw.end_arrow_style,
            begin_id: raw.begin_connected_id,
            end_id: raw.end_connected_id,
        }),
        Kind::Shape => Graphic::Shape(Shape { base }),
    }
}

/// Filter for `mode`, then classify, keeping the object order.
pub fn graphics_for_mode(raws: &[RawShape], mode: ExtractionMode) -> Vec<Graphic> {
    raws.iter()
        .filter(|raw| keep_for_mode(raw, mode))
        .map(classify)
        .collect()
}

fn base_of(raw: &RawShape) -> ShapeBase {
    let direction = if is_line_like(raw) {
        line_direction(raw)
    } else {
        None
    };
    ShapeBase {
        id: raw.id,
        text: raw.text.trim().to_string(),
        l: raw.left as i32,
        t: raw.top as i32,
        w: Some(raw.width as i32),
        h: Some(raw.height as i32),
        shape_type: shape_type_label(raw),
        rotation: (raw.rotation != 0.0).then_some(raw.rotation),
        direction,
    }
}

/// Compass direction from a line's start to its end.
///
/// A line runs from the top-left to the bottom-right corner of its frame;
/// horizontal and vertical flips mirror that, and rotation turns it.
/// Degenerate frames have no direction.
pub fn line_direction(raw: &RawShape) -> Option<Direction> {
    let mut dx = raw.width;
    let mut dy = raw.height;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    if raw.flip_h {
        dx = -dx;
    }
    if raw.flip_v {
        dy = -dy;
    }
    let angle = dy.atan2(dx).to_degrees() + raw.rotation;
    Some(Direction::from_angle(angle))
}

/// `AutoShape-<name>` for autoshapes, the shape-type name otherwise.
pub fn shape_type_label(raw: &RawShape) -> Option<String> {
    if raw.mso_type == MSO_AUTOSHAPE {
        let name = raw
            .autoshape_name
            .clone()
            .or_else(|| raw.autoshape_type.and_then(autoshape_name).map(str::to_string));
        return Some(match name {
            Some(name) => format!("AutoShape-{name}"),
            None => "AutoShape".to_string(),
        });
    }
    mso_type_name(raw.mso_type).map(str::to_string)
}

fn mso_type_name(code: i32) -> Option<&'static str> {
    Some(match code {
        2 => "Callout",
        5 => "Freeform",
        6 => "Group",
        7 => "EmbeddedOLEObject",
        9 => "Line",
        10 => "LinkedOLEObject",
        12 => "OLEControlObject",
        14 => "Placeholder",
        15 => "TextEffect",
        17 => "TextBox",
        20 => "Canvas",
        21 => "Diagram",
        24 => "SmartArt",
        28 => "Graphic",
        _ => return None,
    })
}

fn autoshape_name(code: i32) -> Option<&'static str> {
    Some(match code {
        -2 => "Mixed",
        1 => "Rectangle",
        2 => "Parallelogram",
        3 => "Trapezoid",
        4 => "Diamond",
        5 => "RoundedRectangle",
        6 => "Octagon",
        7 => "IsoscelesTriangle",
        8 => "RightTriangle",
        9 => "Oval",
        10 => "Hexagon",
        11 => "Cross",
        12 => "RegularPentagon",
        13 => "Can",
        14 => "Cube",
        33 => "RightArrow",
        34 => "LeftArrow",
        35 => "UpArrow",
        36 => "DownArrow",
        37 => "LeftRightArrow",
        38 => "UpDownArrow",
        51 => "Pentagon",
        52 => "Chevron",
        61 => "FlowchartProcess",
        62 => "FlowchartAlternateProcess",
        63 => "FlowchartDecision",
        64 => "FlowchartData",
        65 => "FlowchartPredefinedProcess",
        67 => "FlowchartDocument",
        69 => "FlowchartTerminator",
        73 => "FlowchartConnector",
        105 => "RectangularCallout",
        106 => "RoundedRectangularCallout",
        107 => "OvalCallout",
        108 => "CloudCallout",
        _ => return None,
    })
}
