use serde::{Deserialize, Serialize};
use vdraw_core::geometry::Point2;
use vdraw_engine::arc;
use vdraw_engine::controller::{Artifact, DrawController, Exporter, Payload};
use vdraw_engine::errors::ExportError;
use vdraw_engine::style::{Color, ImageSource, LineStyle, Palette, TextAlign, TextOptions};
use vdraw_engine::transform::CoordinateSpace;

pub const MEDIA_TYPE: &str = "application/json";

/// 单条画布指令。角度为目标坐标下的弧度（Y 向下，正角顺时针）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CanvasCommand {
    Stroke {
        color: String,
        opacity: f64,
        width: f64,
        dash: Vec<f64>,
    },
    Fill {
        color: String,
        opacity: f64,
    },
    Line {
        from: [f64; 2],
        to: [f64; 2],
    },
    Arc {
        center: [f64; 2],
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    },
    Text {
        text: String,
        position: [f64; 2],
        size: f64,
        rotation: f64,
        align: TextAlign,
    },
    /// `(x, y)` 为旋转前的左上角，绕 `pivot` 旋转 `rotation`。
    Image {
        href: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rotation: f64,
        pivot: [f64; 2],
    },
    FillPolygon {
        points: Vec<[f64; 2]>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayList {
    pub width: f64,
    pub height: f64,
    pub commands: Vec<CanvasCommand>,
}

/// 把图元记录为目标坐标下的显示列表，供 2D 画布逐条重放。
#[derive(Debug)]
pub struct CanvasController {
    space: CoordinateSpace,
    palette: Palette,
    list: DisplayList,
}

impl CanvasController {
    pub fn new(space: CoordinateSpace, palette: Palette) -> Self {
        let (width, height) = space.target_size();
        Self {
            space,
            palette,
            list: DisplayList {
                width,
                height,
                commands: Vec::new(),
            },
        }
    }

    #[inline]
    pub fn display_list(&self) -> &DisplayList {
        &self.list
    }

    fn target(&self, point: Point2) -> [f64; 2] {
        let p = self.space.world_to_target(point);
        [p.x(), p.y()]
    }
}

impl DrawController for CanvasController {
    fn coordinate_space(&self) -> &CoordinateSpace {
        &self.space
    }

    fn clear(&mut self) {
        self.list.commands.clear();
    }

    fn set_line_style(&mut self, style: &LineStyle) {
        let color = style.resolved_color(&self.palette);
        let command = CanvasCommand::Stroke {
            color: color.to_hex(),
            opacity: color.opacity(),
            width: self.space.length_to_target(style.width),
            dash: style
                .dash
                .iter()
                .map(|length| self.space.length_to_target(*length))
                .collect(),
        };
        self.list.commands.push(command);
    }

    fn set_fill_style(&mut self, color: Color) {
        self.list.commands.push(CanvasCommand::Fill {
            color: color.to_hex(),
            opacity: color.opacity(),
        });
    }

    fn draw_line(&mut self, start: Point2, end: Point2) {
        let command = CanvasCommand::Line {
            from: self.target(start),
            to: self.target(end),
        };
        self.list.commands.push(command);
    }

    fn draw_arc(
        &mut self,
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counter_clockwise: bool,
    ) {
        if arc::sweep(start_angle, end_angle, counter_clockwise).is_none() {
            return;
        }
        // Y 轴反向后角度取反，世界中的逆时针在画布上仍是逆时针。
        let command = CanvasCommand::Arc {
            center: self.target(center),
            radius: self.space.length_to_target(radius.abs()),
            start_angle: -start_angle,
            end_angle: -end_angle,
            anticlockwise: counter_clockwise,
        };
        self.list.commands.push(command);
    }

    fn draw_text(&mut self, label: &str, base_point: Point2, options: &TextOptions) {
        let command = CanvasCommand::Text {
            text: label.to_string(),
            position: self.target(base_point),
            size: self.space.length_to_target(options.height),
            rotation: -options.rotation,
            align: options.align,
        };
        self.list.commands.push(command);
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
        let width = self.space.length_to_target(width);
        let height = self.space.length_to_target(height);
        self.list.commands.push(CanvasCommand::Image {
            href: image.href.clone(),
            x: pivot[0],
            y: pivot[1] - height,
            width,
            height,
            rotation: -angle,
            pivot,
        });
    }

    fn fill_polygon(&mut self, points: &[Point2]) {
        if points.len() < 3 {
            return;
        }
        let points = points.iter().map(|point| self.target(*point)).collect();
        self.list
            .commands
            .push(CanvasCommand::FillPolygon { points });
    }
}

impl Exporter for CanvasController {
    async fn export(self) -> Result<Artifact, ExportError> {
        let json = serde_json::to_string(&self.list).map_err(|err| ExportError::Encoding {
            format: "canvas",
            message: err.to_string(),
        })?;
        Ok(Artifact {
            format: "canvas",
            media_type: MEDIA_TYPE,
            width: self.list.width,
            height: self.list.height,
            payload: Payload::Text(json),
        })
    }
}
