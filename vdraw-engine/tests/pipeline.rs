use vdraw_core::geometry::Point2;
use vdraw_engine::controller::{Artifact, DrawController, Exporter, Payload};
use vdraw_engine::drawing::{Drawing, EntityStyle};
use vdraw_engine::errors::ExportError;
use vdraw_engine::export::{ExportOptions, plan_space, render_and_export};
use vdraw_engine::style::{Color, ImageSource, LineStyle, TextOptions};
use vdraw_engine::transform::CoordinateSpace;

/// Records every primitive in target space as a line of text.
struct TraceExporter {
    space: CoordinateSpace,
    lines: Vec<String>,
    fail: bool,
}

impl TraceExporter {
    fn new(space: CoordinateSpace) -> Self {
        Self {
            space,
            lines: Vec::new(),
            fail: false,
        }
    }
}

impl DrawController for TraceExporter {
    fn coordinate_space(&self) -> &CoordinateSpace {
        &self.space
    }

    fn clear(&mut self) {
        self.lines.clear();
    }

    fn set_line_style(&mut self, _style: &LineStyle) {}

    fn set_fill_style(&mut self, _color: Color) {}

    fn draw_line(&mut self, start: Point2, end: Point2) {
        let (a, b) = (self.world_to_target(start), self.world_to_target(end));
        self.lines
            .push(format!("L {} {} {} {}", a.x(), a.y(), b.x(), b.y()));
    }

    fn draw_arc(&mut self, center: Point2, radius: f64, _: f64, _: f64, _: bool) {
        let c = self.world_to_target(center);
        let r = self.coordinate_space().length_to_target(radius);
        self.lines.push(format!("A {} {} {}", c.x(), c.y(), r));
    }

    fn draw_text(&mut self, label: &str, _: Point2, _: &TextOptions) {
        self.lines.push(format!("T {label}"));
    }

    fn draw_image(&mut self, _: &ImageSource, _: f64, _: f64, _: f64, _: f64, _: f64) {}

    fn fill_polygon(&mut self, points: &[Point2]) {
        self.lines.push(format!("P {}", points.len()));
    }
}

impl Exporter for TraceExporter {
    async fn export(self) -> Result<Artifact, ExportError> {
        if self.fail {
            return Err(ExportError::Encoding {
                format: "trace",
                message: "rejected".into(),
            });
        }
        let (width, height) = self.canvas_size();
        Ok(Artifact {
            format: "trace",
            media_type: "text/plain",
            width,
            height,
            payload: Payload::Text(self.lines.join("\n")),
        })
    }
}

fn sample_drawing() -> Drawing {
    let mut drawing = Drawing::new();
    drawing.add_line(
        Point2::new(0.0, 0.0),
        Point2::new(100.0, 50.0),
        EntityStyle::default(),
    );
    drawing.add_circle(Point2::new(50.0, 25.0), 10.0, EntityStyle::default());
    drawing
}

#[tokio::test]
async fn renders_every_entity_in_target_space() {
    let drawing = sample_drawing();
    let options = ExportOptions {
        margin: 0.0,
        pixels_per_unit: 2.0,
        ..ExportOptions::default()
    };
    let space = plan_space(&drawing, &options).expect("plan");
    let artifact = render_and_export(&drawing, TraceExporter::new(space))
        .await
        .expect("export");

    assert_eq!(artifact.width, 200.0);
    assert_eq!(artifact.height, 100.0);
    assert_eq!(
        artifact.payload.as_text(),
        Some("L 0 100 200 0\nA 100 50 20")
    );
}

#[tokio::test]
async fn encoder_failure_yields_no_artifact() {
    let drawing = sample_drawing();
    let space = plan_space(&drawing, &ExportOptions::default()).expect("plan");
    let mut exporter = TraceExporter::new(space);
    exporter.fail = true;
    let result = render_and_export(&drawing, exporter).await;
    assert!(matches!(result, Err(ExportError::Encoding { .. })));
}

#[test]
fn path_entities_render_as_chained_lines() {
    let mut drawing = Drawing::new();
    drawing.add_path("M 10 10 L 20 10 L 20 20 Z", 0.1, EntityStyle::default());
    let space = plan_space(&drawing, &ExportOptions::default()).expect("plan");
    let mut exporter = TraceExporter::new(space);
    drawing.render(&mut exporter);
    assert_eq!(exporter.lines.len(), 3);
    exporter.clear();
    assert!(exporter.lines.is_empty());
}
