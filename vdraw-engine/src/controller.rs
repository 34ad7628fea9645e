use std::future::Future;

use vdraw_core::geometry::{Point2, Vector2};

use crate::errors::ExportError;
use crate::style::{Color, ImageSource, LineStyle, TextOptions};
use crate::transform::CoordinateSpace;

/// 后端无关的绘图接口，可作为 `&mut dyn DrawController` 传给实体。
///
/// 几何参数都是世界坐标，由控制器换算到目标坐标；图元按调用顺序输出。
pub trait DrawController {
    fn coordinate_space(&self) -> &CoordinateSpace;

    /// 目标画幅的宽和高。
    fn canvas_size(&self) -> (f64, f64) {
        self.coordinate_space().target_size()
    }

    fn screen_scale(&self) -> f64 {
        self.coordinate_space().scale()
    }

    fn screen_offset(&self) -> Vector2 {
        self.coordinate_space().offset()
    }

    fn world_to_target(&self, point: Point2) -> Point2 {
        self.coordinate_space().world_to_target(point)
    }

    fn target_to_world(&self, point: Point2) -> Point2 {
        self.coordinate_space().target_to_world(point)
    }

    /// 清空画布。页面类后端没有可变画布，实现为空操作。
    fn clear(&mut self);

    fn set_line_style(&mut self, style: &LineStyle);

    fn set_fill_style(&mut self, color: Color);

    fn draw_line(&mut self, start: Point2, end: Point2);

    /// 角度为世界坐标下的弧度；`counter_clockwise` 指世界坐标（Y 向上）中的逆时针方向。
    fn draw_arc(
        &mut self,
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counter_clockwise: bool,
    );

    fn draw_text(&mut self, label: &str, base_point: Point2, options: &TextOptions);

    /// `(x_min, y_min)` 为图像左下角，图像绕该点逆时针旋转 `angle` 弧度。
    fn draw_image(
        &mut self,
        image: &ImageSource,
        x_min: f64,
        y_min: f64,
        width: f64,
        height: f64,
        angle: f64,
    );

    fn fill_polygon(&mut self, points: &[Point2]);
}

/// 可产出最终产物的控制器。`export` 消耗控制器，之后不能再绘制。
pub trait Exporter: DrawController + Send {
    fn export(self) -> impl Future<Output = Result<Artifact, ExportError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 一次导出的结果，附带嵌入时所需的画幅尺寸。
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub format: &'static str,
    pub media_type: &'static str,
    pub width: f64,
    pub height: f64,
    pub payload: Payload,
}
