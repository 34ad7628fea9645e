use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::{Arc, Mutex};

use vdraw_core::geometry::{Bounds2D, Point2};
use vdraw_engine::controller::{DrawController, Exporter, Payload};
use vdraw_engine::drawing::{Arc as ArcEntity, Drawable, Drawing, Entity, EntityStyle};
use vdraw_engine::errors::{EngineError, ExportError};
use vdraw_engine::export::ExportOptions;
use vdraw_engine::style::{Color, ImageSource, LineStyle, Palette, TextAlign, TextOptions};
use vdraw_engine::transform::CoordinateSpace;
use vdraw_io::canvas::{CanvasCommand, CanvasController, DisplayList};
use vdraw_io::dxf::DxfController;
use vdraw_io::pdf::{DocumentEncoder, EncoderError, PdfController, SvgToPdfEncoder};
use vdraw_io::svg::SvgController;
use vdraw_io::{ExportFormat, export_drawing, write_artifact};

/// World 100x50 mapped onto a 200x100 target.
fn space() -> CoordinateSpace {
    CoordinateSpace::new(
        Bounds2D::from_extents(0.0, 0.0, 100.0, 50.0),
        Bounds2D::from_extents(0.0, 0.0, 200.0, 100.0),
    )
    .expect("valid frames")
}

fn svg_text(controller: &SvgController) -> String {
    controller.to_document()
}

fn draw_sample(controller: &mut dyn DrawController) {
    controller.set_line_style(&LineStyle::solid(Color::rgb(255, 0, 0), 0.5));
    controller.draw_line(Point2::new(0.0, 0.0), Point2::new(100.0, 50.0));
    controller.set_fill_style(Color::rgb(0, 0, 255));
    controller.fill_polygon(&[
        Point2::new(10.0, 10.0),
        Point2::new(20.0, 10.0),
        Point2::new(15.0, 20.0),
    ]);
    controller.draw_arc(Point2::new(50.0, 25.0), 10.0, 0.0, TAU, true);
}

#[test]
fn svg_line_is_mapped_into_target_space() {
    let mut svg = SvgController::new(space(), Palette::default());
    svg.draw_line(Point2::new(0.0, 0.0), Point2::new(100.0, 50.0));
    let text = svg_text(&svg);
    assert!(text.contains("width=\"200\" height=\"100\" viewBox=\"0 0 200 100\""));
    assert!(text.contains("<line x1=\"0\" y1=\"100\" x2=\"200\" y2=\"0\""));
    assert!(text.trim_end().ends_with("</svg>"));
}

#[test]
fn svg_arcs_encode_direction_and_size() {
    let center = Point2::new(50.0, 25.0);
    let mut svg = SvgController::new(space(), Palette::default());
    svg.draw_arc(center, 10.0, 0.0, FRAC_PI_2, true);
    svg.draw_arc(center, 10.0, 0.0, FRAC_PI_2, false);
    svg.draw_arc(center, 10.0, 0.0, TAU, true);
    svg.draw_arc(center, 10.0, 1.0, 1.0, true);
    assert_eq!(svg.element_count(), 3);

    let text = svg_text(&svg);
    assert!(text.contains("d=\"M 120 50 A 20 20 0 0 0 100 30\""), "{text}");
    assert!(text.contains("d=\"M 120 50 A 20 20 0 1 1 100 30\""), "{text}");
    assert!(text.contains("<circle cx=\"100\" cy=\"50\" r=\"20\""), "{text}");
}

#[test]
fn svg_style_applies_only_to_later_primitives() {
    let palette = Palette::default();
    let mut svg = SvgController::new(space(), palette);
    svg.draw_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
    svg.set_line_style(&LineStyle::solid(Color::rgb(255, 0, 0), 2.0));
    svg.draw_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
    svg.set_line_style(&LineStyle {
        is_selected: true,
        dash: vec![1.0, 0.5],
        ..LineStyle::default()
    });
    svg.draw_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));

    let text = svg_text(&svg);
    let lines: Vec<&str> = text.lines().filter(|line| line.contains("<line")).collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("stroke=\"#000000\" stroke-width=\"2\""));
    assert!(lines[1].contains("stroke=\"#ff0000\" stroke-width=\"4\""));
    assert!(lines[2].contains(&format!("stroke=\"{}\"", palette.selected.to_hex())));
    assert!(lines[2].contains("stroke-dasharray=\"2 1\""));
}

#[test]
fn svg_text_polygon_and_image() {
    let mut svg = SvgController::new(space(), Palette::default());
    svg.draw_text(
        "a<b",
        Point2::new(10.0, 10.0),
        &TextOptions {
            height: 5.0,
            rotation: FRAC_PI_2,
            align: TextAlign::Middle,
        },
    );
    svg.set_fill_style(Color::rgba(0, 0, 255, 128));
    svg.fill_polygon(&[Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]);
    svg.fill_polygon(&[
        Point2::new(0.0, 0.0),
        Point2::new(10.0, 0.0),
        Point2::new(10.0, 10.0),
    ]);
    svg.draw_image(
        &ImageSource::new("logo.png", 32, 32),
        10.0,
        10.0,
        20.0,
        10.0,
        0.0,
    );
    svg.clear();

    let text = svg_text(&svg);
    assert!(text.contains(
        "<text x=\"20\" y=\"80\" font-size=\"10\" font-family=\"sans-serif\" text-anchor=\"middle\""
    ));
    assert!(text.contains("transform=\"rotate(-90 20 80)\">a&lt;b</text>"));
    assert!(text.contains("<polygon points=\"0,100 20,100 20,80\" fill=\"#0000ff\" stroke=\"none\" fill-opacity=\"0.502\"/>"));
    assert!(text.contains("<image href=\"logo.png\" x=\"20\" y=\"60\" width=\"40\" height=\"20\""));
    assert_eq!(svg.element_count(), 3);
}

#[tokio::test]
async fn canvas_records_display_list_and_clears() {
    let mut canvas = CanvasController::new(space(), Palette::default());
    canvas.draw_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
    canvas.clear();
    assert!(canvas.display_list().commands.is_empty());

    canvas.draw_arc(Point2::new(50.0, 25.0), 10.0, 0.0, FRAC_PI_2, true);
    canvas.draw_text("label", Point2::new(0.0, 50.0), &TextOptions::default());
    let artifact = canvas.export().await.expect("canvas export");
    assert_eq!(artifact.media_type, "application/json");
    assert_eq!((artifact.width, artifact.height), (200.0, 100.0));

    let json = artifact.payload.as_text().expect("json payload");
    assert!(json.contains("\"op\":\"arc\""));
    let list: DisplayList = serde_json::from_str(json).expect("valid json");
    match &list.commands[0] {
        CanvasCommand::Arc {
            center,
            radius,
            start_angle,
            end_angle,
            anticlockwise,
        } => {
            assert_eq!(*center, [100.0, 50.0]);
            assert_eq!(*radius, 20.0);
            assert_eq!(*start_angle, 0.0);
            assert_eq!(*end_angle, -FRAC_PI_2);
            assert!(*anticlockwise);
        }
        other => panic!("unexpected command: {other:?}"),
    }
    match &list.commands[1] {
        CanvasCommand::Text { position, size, .. } => {
            assert_eq!(*position, [0.0, 0.0]);
            assert_eq!(*size, 5.0);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

/// Keeps the SVG handed over by the PDF backend.
#[derive(Default)]
struct CapturingEncoder {
    seen: Mutex<Option<String>>,
}

impl DocumentEncoder for CapturingEncoder {
    fn encode(&self, svg: &str) -> Result<Vec<u8>, EncoderError> {
        *self.seen.lock().unwrap() = Some(svg.to_string());
        Ok(b"%PDF-fake".to_vec())
    }
}

struct RejectingEncoder;

impl DocumentEncoder for RejectingEncoder {
    fn encode(&self, _svg: &str) -> Result<Vec<u8>, EncoderError> {
        Err(EncoderError("malformed document".into()))
    }
}

#[tokio::test]
async fn pdf_delegates_every_primitive_to_svg() {
    let encoder = Arc::new(CapturingEncoder::default());
    let mut pdf = PdfController::with_encoder(space(), Palette::default(), encoder.clone());
    draw_sample(&mut pdf);
    pdf.clear();

    let mut svg = SvgController::new(space(), Palette::default());
    draw_sample(&mut svg);

    let artifact = pdf.export().await.expect("pdf export");
    assert_eq!(artifact.format, "pdf");
    assert_eq!(artifact.payload, Payload::Binary(b"%PDF-fake".to_vec()));
    assert_eq!((artifact.width, artifact.height), (200.0, 100.0));

    let seen = encoder.seen.lock().unwrap().clone().expect("encoder called");
    assert_eq!(seen, svg.to_document());
}

#[tokio::test]
async fn pdf_encoder_failure_is_propagated() {
    let mut pdf = PdfController::with_encoder(space(), Palette::default(), Arc::new(RejectingEncoder));
    draw_sample(&mut pdf);
    let err = pdf.export().await.unwrap_err();
    match err {
        ExportError::Encoding { format, message } => {
            assert_eq!(format, "pdf");
            assert!(message.contains("malformed document"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn default_encoder_produces_a_pdf() {
    let mut pdf = PdfController::with_encoder(
        space(),
        Palette::default(),
        Arc::new(SvgToPdfEncoder::default()),
    );
    draw_sample(&mut pdf);
    let artifact = pdf.export().await.expect("pdf export");
    assert!(artifact.payload.as_bytes().starts_with(b"%PDF"));
}

#[tokio::test]
async fn every_format_exports_the_demo_drawing() {
    let mut drawing = Drawing::new();
    let ids = drawing.populate_demo(0.1);
    drawing.select(ids.circle).unwrap();
    let options = ExportOptions::default();

    for format in ExportFormat::ALL {
        let artifact = export_drawing(&drawing, format, &options)
            .await
            .unwrap_or_else(|err| panic!("{format} export failed: {err}"));
        assert_eq!(artifact.format, format.name());
        assert_eq!((artifact.width, artifact.height), (140.0, 100.0));
        assert!(!artifact.payload.is_empty());
    }
}

#[tokio::test]
async fn empty_drawing_cannot_be_exported() {
    let err = export_drawing(&Drawing::new(), ExportFormat::Svg, &ExportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Engine(EngineError::EmptyDrawing)));
}

#[tokio::test]
async fn artifacts_are_written_to_nested_directories() {
    let mut drawing = Drawing::new();
    drawing.populate_demo(0.1);
    let artifact = export_drawing(&drawing, ExportFormat::Dxf, &ExportOptions::default())
        .await
        .expect("dxf export");

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("drawing.dxf");
    write_artifact(&artifact, &path).await.expect("write");
    let written = std::fs::read(&path).expect("read back");
    assert_eq!(written, artifact.payload.as_bytes());
}

#[tokio::test]
async fn zero_span_arc_contributes_nothing_anywhere() {
    let arc = Entity::Arc(ArcEntity {
        center: Point2::new(50.0, 25.0),
        radius: 10.0,
        start_angle: 1.0,
        end_angle: 1.0,
        counter_clockwise: true,
        style: EntityStyle::default(),
    });
    assert_eq!(arc.bounding_box(), None);

    let mut svg = SvgController::new(space(), Palette::default());
    arc.draw(&mut svg);
    svg.draw_arc(Point2::new(50.0, 25.0), 10.0, 1.0, 1.0, false);
    assert_eq!(svg.element_count(), 0);

    let mut canvas = CanvasController::new(space(), Palette::default());
    canvas.draw_arc(Point2::new(50.0, 25.0), 10.0, 1.0, 1.0, true);
    assert!(
        canvas
            .display_list()
            .commands
            .iter()
            .all(|command| !matches!(command, CanvasCommand::Arc { .. }))
    );

    let mut dxf = DxfController::new(space(), Palette::default());
    arc.draw(&mut dxf);
    let artifact = dxf.export().await.expect("dxf export");
    let document = artifact.payload.as_text().expect("text payload");
    assert!(!document.contains("\nARC\n"));

    let mut drawing = Drawing::new();
    drawing.add(arc);
    let err = export_drawing(&drawing, ExportFormat::Svg, &ExportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Engine(EngineError::EmptyDrawing)));
}
