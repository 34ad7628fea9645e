use std::f64::consts::{FRAC_PI_2, TAU};

use vdraw_core::geometry::{Bounds2D, Point2};
use vdraw_engine::controller::{DrawController, Exporter};
use vdraw_engine::style::{Color, ImageSource, LineStyle, Palette, TextAlign, TextOptions};
use vdraw_engine::transform::CoordinateSpace;
use vdraw_io::dxf::DxfController;

type Pair = (i32, String);

/// Reads `code\nvalue\n` pairs back out of a DXF document.
fn read_pairs(source: &str) -> Vec<Pair> {
    let mut lines = source.lines();
    let mut pairs = Vec::new();
    while let Some(code_line) = lines.next() {
        let value = lines.next().expect("value line after group code");
        let code = code_line
            .trim()
            .parse::<i32>()
            .unwrap_or_else(|_| panic!("group code {code_line:?} is not an integer"));
        pairs.push((code, value.trim_end_matches('\r').to_string()));
    }
    pairs
}

/// Splits the ENTITIES section into one pair list per entity.
fn entities(pairs: &[Pair]) -> Vec<Vec<Pair>> {
    let start = pairs
        .windows(2)
        .position(|w| w[0] == (0, "SECTION".into()) && w[1] == (2, "ENTITIES".into()))
        .expect("entities section")
        + 2;
    let mut result: Vec<Vec<Pair>> = Vec::new();
    for pair in &pairs[start..] {
        if pair.0 == 0 {
            if pair.1 == "ENDSEC" {
                break;
            }
            result.push(Vec::new());
        }
        if let Some(current) = result.last_mut() {
            current.push(pair.clone());
        }
    }
    result
}

fn value<'a>(entity: &'a [Pair], code: i32) -> &'a str {
    entity
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, v)| v.as_str())
        .unwrap_or_else(|| panic!("group code {code} missing in {entity:?}"))
}

fn values(entity: &[Pair], code: i32) -> Vec<&str> {
    entity
        .iter()
        .filter(|(c, _)| *c == code)
        .map(|(_, v)| v.as_str())
        .collect()
}

fn controller() -> DxfController {
    let space = CoordinateSpace::new(
        Bounds2D::from_extents(0.0, 0.0, 100.0, 50.0),
        Bounds2D::from_extents(0.0, 0.0, 200.0, 100.0),
    )
    .expect("valid frames");
    DxfController::new(space, Palette::default())
}

async fn export_pairs(dxf: DxfController) -> Vec<Pair> {
    let artifact = dxf.export().await.expect("dxf export");
    assert_eq!(artifact.format, "dxf");
    read_pairs(artifact.payload.as_text().expect("text payload"))
}

#[tokio::test]
async fn document_has_every_section_in_order() {
    let pairs = export_pairs(controller()).await;
    let sections: Vec<&str> = pairs
        .windows(2)
        .filter(|w| w[0] == (0, "SECTION".to_string()))
        .map(|w| w[1].1.as_str())
        .collect();
    assert_eq!(
        sections,
        vec!["HEADER", "TABLES", "BLOCKS", "ENTITIES", "OBJECTS"]
    );
    assert_eq!(pairs.last(), Some(&(0, "EOF".to_string())));
    assert!(pairs.contains(&(2, "DASHED".to_string())));
    assert!(entities(&pairs).is_empty());
}

#[tokio::test]
async fn line_coordinates_keep_y_up() {
    let mut dxf = controller();
    dxf.draw_line(Point2::new(0.0, 0.0), Point2::new(100.0, 50.0));
    let pairs = export_pairs(dxf).await;
    let entities = entities(&pairs);
    assert_eq!(entities.len(), 1);
    let line = &entities[0];
    assert_eq!(value(line, 0), "LINE");
    assert_eq!(value(line, 8), "0");
    assert_eq!(value(line, 10), "0.000000");
    assert_eq!(value(line, 20), "0.000000");
    assert_eq!(value(line, 11), "200.000000");
    assert_eq!(value(line, 21), "100.000000");
    assert_eq!(value(line, 62), "7");
    assert_eq!(value(line, 420), "0");
}

#[tokio::test]
async fn arcs_are_counter_clockwise_in_degrees() {
    let mut dxf = controller();
    let center = Point2::new(50.0, 25.0);
    dxf.draw_arc(center, 10.0, 0.0, FRAC_PI_2, true);
    dxf.draw_arc(center, 10.0, 0.0, FRAC_PI_2, false);
    dxf.draw_arc(center, 10.0, 0.0, TAU, true);
    let pairs = export_pairs(dxf).await;
    let entities = entities(&pairs);
    assert_eq!(entities.len(), 3);

    let ccw = &entities[0];
    assert_eq!(value(ccw, 0), "ARC");
    assert_eq!(value(ccw, 10), "100.000000");
    assert_eq!(value(ccw, 20), "50.000000");
    assert_eq!(value(ccw, 40), "20.000000");
    assert_eq!(value(ccw, 50), "0.000000");
    assert_eq!(value(ccw, 51), "90.000000");

    let cw = &entities[1];
    assert_eq!(value(cw, 50), "90.000000");
    assert_eq!(value(cw, 51), "0.000000");

    assert_eq!(value(&entities[2], 0), "CIRCLE");
    assert_eq!(value(&entities[2], 40), "20.000000");
}

#[tokio::test]
async fn styles_map_to_colors_and_line_types() {
    let mut dxf = controller();
    dxf.set_line_style(&LineStyle {
        is_selected: true,
        dash: vec![2.0, 1.0],
        ..LineStyle::default()
    });
    dxf.draw_line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
    dxf.set_line_style(&LineStyle::solid(Color::rgb(0, 200, 0), 1.0));
    dxf.draw_line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
    let pairs = export_pairs(dxf).await;

    let entities = entities(&pairs);
    assert_eq!(value(&entities[0], 6), "DASHED");
    assert_eq!(value(&entities[0], 62), "1");
    assert_eq!(value(&entities[0], 420), "16738816");
    assert!(values(&entities[1], 6).is_empty());
    assert_eq!(value(&entities[1], 62), "3");

    let dashes: Vec<&str> = pairs
        .iter()
        .filter(|(code, _)| *code == 49)
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(dashes, vec!["4.000000", "-2.000000"]);
}

#[tokio::test]
async fn filled_polygon_becomes_solid_hatch() {
    let mut dxf = controller();
    dxf.set_fill_style(Color::rgb(0, 0, 255));
    dxf.fill_polygon(&[
        Point2::new(0.0, 0.0),
        Point2::new(10.0, 0.0),
        Point2::new(10.0, 10.0),
        Point2::new(0.0, 10.0),
    ]);
    dxf.fill_polygon(&[Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]);
    let pairs = export_pairs(dxf).await;
    let entities = entities(&pairs);
    assert_eq!(entities.len(), 1);

    let hatch = &entities[0];
    assert_eq!(value(hatch, 0), "HATCH");
    assert_eq!(value(hatch, 2), "SOLID");
    assert_eq!(value(hatch, 62), "5");
    assert_eq!(value(hatch, 93), "4");
    let xs = values(hatch, 10);
    // elevation point first, then the boundary vertices
    assert_eq!(xs, vec!["0.000000", "0.000000", "20.000000", "20.000000", "0.000000"]);
    let ys = values(hatch, 20);
    assert_eq!(ys, vec!["0.000000", "0.000000", "0.000000", "20.000000", "20.000000"]);
}

#[tokio::test]
async fn text_and_image_frames() {
    let mut dxf = controller();
    dxf.draw_text(
        "Hello",
        Point2::new(10.0, 5.0),
        &TextOptions {
            height: 3.0,
            rotation: FRAC_PI_2,
            align: TextAlign::End,
        },
    );
    dxf.draw_image(
        &ImageSource::new("photo.png", 10, 10),
        5.0,
        5.0,
        10.0,
        5.0,
        0.0,
    );
    let pairs = export_pairs(dxf).await;
    let entities = entities(&pairs);
    assert_eq!(entities.len(), 2);

    let text = &entities[0];
    assert_eq!(value(text, 0), "TEXT");
    assert_eq!(value(text, 1), "Hello");
    assert_eq!(value(text, 10), "20.000000");
    assert_eq!(value(text, 20), "10.000000");
    assert_eq!(value(text, 40), "6.000000");
    assert_eq!(value(text, 50), "90.000000");
    assert_eq!(value(text, 72), "2");

    let frame = &entities[1];
    assert_eq!(value(frame, 0), "LWPOLYLINE");
    assert_eq!(value(frame, 90), "4");
    assert_eq!(value(frame, 70), "1");
    assert_eq!(
        values(frame, 10),
        vec!["10.000000", "30.000000", "30.000000", "10.000000"]
    );
    assert_eq!(
        values(frame, 20),
        vec!["10.000000", "10.000000", "20.000000", "20.000000"]
    );
}

#[tokio::test]
async fn records_carry_unique_handles_and_subclass_markers() {
    let mut dxf = controller();
    dxf.draw_line(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
    dxf.draw_arc(Point2::new(50.0, 25.0), 10.0, 0.0, FRAC_PI_2, true);
    dxf.draw_text("label", Point2::new(1.0, 1.0), &TextOptions::default());
    dxf.fill_polygon(&[
        Point2::new(0.0, 0.0),
        Point2::new(10.0, 0.0),
        Point2::new(5.0, 5.0),
    ]);
    let pairs = export_pairs(dxf).await;

    let ver = pairs
        .iter()
        .position(|pair| *pair == (9, "$ACADVER".to_string()))
        .expect("version header");
    assert_eq!(pairs[ver + 1], (1, "AC1018".to_string()));

    let block_records: Vec<&str> = pairs
        .windows(6)
        .filter(|w| w[0] == (0, "BLOCK_RECORD".to_string()))
        .filter_map(|w| w.iter().find(|(code, _)| *code == 2).map(|(_, v)| v.as_str()))
        .collect();
    assert_eq!(block_records, vec!["*Model_Space", "*Paper_Space"]);
    assert!(pairs.contains(&(2, "ACAD".to_string())));
    assert!(pairs.contains(&(2, "Standard".to_string())));

    let tables = pairs
        .iter()
        .position(|pair| *pair == (2, "TABLES".to_string()))
        .expect("tables section");
    let mut handles: Vec<&str> = pairs[tables..]
        .iter()
        .filter(|(code, _)| *code == 5)
        .map(|(_, v)| v.as_str())
        .collect();
    let total = handles.len();
    handles.sort_unstable();
    handles.dedup();
    assert_eq!(handles.len(), total, "duplicate handle");
    assert!(handles.iter().all(|h| u32::from_str_radix(h, 16).is_ok()));

    let seed = pairs
        .iter()
        .position(|pair| *pair == (9, "$HANDSEED".to_string()))
        .expect("handle seed");
    let seed = u32::from_str_radix(&pairs[seed + 1].1, 16).unwrap();
    assert!(handles.iter().all(|h| u32::from_str_radix(h, 16).unwrap() < seed));

    let entities = entities(&pairs);
    let subclasses: Vec<Vec<&str>> = entities.iter().map(|e| values(e, 100)).collect();
    assert_eq!(
        subclasses,
        vec![
            vec!["AcDbEntity", "AcDbLine"],
            vec!["AcDbEntity", "AcDbCircle", "AcDbArc"],
            vec!["AcDbEntity", "AcDbText", "AcDbText"],
            vec!["AcDbEntity", "AcDbHatch"],
        ]
    );
    for entity in &entities {
        assert_eq!(value(entity, 330), "1F");
    }
}
