use std::f64::consts::PI;
use std::fmt::Write as _;

use vdraw_core::geometry::Point2;
use vdraw_engine::arc;
use vdraw_engine::controller::{Artifact, DrawController, Exporter, Payload};
use vdraw_engine::errors::ExportError;
use vdraw_engine::style::{Color, ImageSource, LineStyle, Palette, TextAlign, TextOptions};
use vdraw_engine::transform::CoordinateSpace;


pub const MEDIA_TYPE: &str = "image/svg+xml";

/// 每个图元输出为一个 SVG 元素，样式取调用时的当前线型与填充。
#[derive(Debug)]
pub struct SvgController {
    space: CoordinateSpace,
    palette: Palette,
    stroke: LineStyle,
    fill: Color,
    elements: Vec<String>,
}

impl SvgController {
    pub fn new(space: CoordinateSpace, palette: Palette) -> Self {
        Self {
            space,
            palette,
            stroke: LineStyle::default(),
            fill: Color::BLACK,
            elements: Vec::new(),
        }
    }

    /// 已记录的元素数量。
    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// 生成完整的 SVG 文档，`viewBox` 即目标框。
    pub fn to_document(&self) -> String {
        let target = self.space.target();
        let (width, height) = self.space.target_size();
        let mut document = String::with_capacity(256 + self.elements.iter().map(String::len).sum::<usize>());
        document.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            document,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{}\" height=\"{}\" viewBox=\"{} {} {} {}\">",
            num(width),
            num(height),
            num(target.min().x()),
            num(target.min().y()),
            num(width),
            num(height),
        );
        for element in &self.elements {
            document.push_str("  ");
            document.push_str(element);
            document.push('\n');
        }
        document.push_str("</svg>\n");
        document
    }

    fn target(&self, point: Point2) -> Point2 {
        self.space.world_to_target(point)
    }

    fn stroke_attributes(&self) -> String {
        let color = self.stroke.resolved_color(&self.palette);
        let mut attributes = format!(
            "fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"",
            color.to_hex(),
            num(self.space.length_to_target(self.stroke.width))
        );
        if !color.is_opaque() {
            let _ = write!(attributes, " stroke-opacity=\"{}\"", num(color.opacity()));
        }
        if self.stroke.is_dashed() {
            let dash: Vec<String> = self
                .stroke
                .dash
                .iter()
                .map(|length| num(self.space.length_to_target(*length)))
                .collect();
            let _ = write!(attributes, " stroke-dasharray=\"{}\"", dash.join(" "));
        }
        attributes
    }

    fn fill_attributes(&self) -> String {
        let mut attributes = format!("fill=\"{}\" stroke=\"none\"", self.fill.to_hex());
        if !self.fill.is_opaque() {
            let _ = write!(attributes, " fill-opacity=\"{}\"", num(self.fill.opacity()));
        }
        attributes
    }
}

impl DrawController for SvgController {
    fn coordinate_space(&self) -> &CoordinateSpace {
        &self.space
    }

    /// SVG 文档没有可变画布，空操作。
    fn clear(&mut self) {}

    fn set_line_style(&mut self, style: &LineStyle) {
        self.stroke = style.clone();
    }

    fn set_fill_style(&mut self, color: Color) {
        self.fill = color;
    }

    fn draw_line(&mut self, start: Point2, end: Point2) {
        let (a, b) = (self.target(start), self.target(end));
        let element = format!(
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" {}/>",
            num(a.x()),
            num(a.y()),
            num(b.x()),
            num(b.y()),
            self.stroke_attributes()
        );
        self.elements.push(element);
    }

    fn draw_arc(
        &mut self,
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counter_clockwise: bool,
    ) {
        let Some(span) = arc::sweep(start_angle, end_angle, counter_clockwise) else {
            return;
        };
        let c = self.target(center);
        let r = self.space.length_to_target(radius.abs());
        if arc::is_full_turn(span) {
            let element = format!(
                "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" {}/>",
                num(c.x()),
                num(c.y()),
                num(r),
                self.stroke_attributes()
            );
            self.elements.push(element);
            return;
        }

        let on_arc = |angle: f64| {
            self.target(Point2::new(
                center.x() + radius.abs() * angle.cos(),
                center.y() + radius.abs() * angle.sin(),
            ))
        };
        let (from, to) = (on_arc(start_angle), on_arc(end_angle));
        // 目标坐标 Y 向下，世界中的逆时针在 SVG 中对应 sweep-flag = 0。
        let sweep_flag = if counter_clockwise { 0 } else { 1 };
        let large_arc = if span > PI { 1 } else { 0 };
        let element = format!(
            "<path d=\"M {} {} A {} {} 0 {} {} {} {}\" {}/>",
            num(from.x()),
            num(from.y()),
            num(r),
            num(r),
            large_arc,
            sweep_flag,
            num(to.x()),
            num(to.y()),
            self.stroke_attributes()
        );
        self.elements.push(element);
    }

    fn draw_text(&mut self, label: &str, base_point: Point2, options: &TextOptions) {
        let p = self.target(base_point);
        let anchor = match options.align {
            TextAlign::Start => "start",
            TextAlign::Middle => "middle",
            TextAlign::End => "end",
        };
        let color = self.stroke.resolved_color(&self.palette);
        let mut element = format!(
            "<text x=\"{}\" y=\"{}\" font-size=\"{}\" font-family=\"sans-serif\" text-anchor=\"{}\" fill=\"{}\"",
            num(p.x()),
            num(p.y()),
            num(self.space.length_to_target(options.height)),
            anchor,
            color.to_hex()
        );
        if options.rotation != 0.0 {
            let _ = write!(
                element,
                " transform=\"rotate({} {} {})\"",
                num(-options.rotation.to_degrees()),
                num(p.x()),
                num(p.y())
            );
        }
        let _ = write!(element, ">{}</text>", escape(label));
        self.elements.push(element);
    }

    fn draw_image(
        &mut self,
        image: &ImageSource,
        x_min: f64,
        y_min: f64,
        width: f64,
        height: f64,
        angle: f64,
    ) {
        let pivot = self.target(Point2::new(x_min, y_min));
        let w = self.space.length_to_target(width);
        let h = self.space.length_to_target(height);
        let mut element = format!(
            "<image href=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\"",
            escape(&image.href),
            num(pivot.x()),
            num(pivot.y() - h),
            num(w),
            num(h)
        );
        if angle != 0.0 {
            let _ = write!(
                element,
                " transform=\"rotate({} {} {})\"",
                num(-angle.to_degrees()),
                num(pivot.x()),
                num(pivot.y())
            );
        }
        element.push_str("/>");
        self.elements.push(element);
    }

    fn fill_polygon(&mut self, points: &[Point2]) {
        if points.len() < 3 {
            return;
        }
        let coords: Vec<String> = points
            .iter()
            .map(|point| {
                let p = self.target(*point);
                format!("{},{}", num(p.x()), num(p.y()))
            })
            .collect();
        let element = format!(
            "<polygon points=\"{}\" {}/>",
            coords.join(" "),
            self.fill_attributes()
        );
        self.elements.push(element);
    }
}

impl Exporter for SvgController {
    async fn export(self) -> Result<Artifact, ExportError> {
        let (width, height) = self.space.target_size();
        Ok(Artifact {
            format: "svg",
            media_type: MEDIA_TYPE,
            width,
            height,
            payload: Payload::Text(self.to_document()),
        })
    }
}

/// 保留 4 位小数并去掉多余的零。
pub(crate) fn num(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{rounded}")
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
