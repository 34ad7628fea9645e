use std::sync::Arc;

use svg2pdf::usvg;
use thiserror::Error;
use tracing::{debug, warn};
use vdraw_core::geometry::{Point2, Vector2};
use vdraw_engine::controller::{Artifact, DrawController, Exporter, Payload};
use vdraw_engine::errors::ExportError;
use vdraw_engine::style::{Color, ImageSource, LineStyle, Palette, TextOptions};
use vdraw_engine::transform::CoordinateSpace;

use crate::svg::SvgController;

pub const MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
#[error("{0}")]
pub struct EncoderError(pub String);

/// 把 SVG 文档编码为目标文档字节流的外部协作者。编码在阻塞线程中执行。
pub trait DocumentEncoder: Send + Sync {
    fn encode(&self, svg: &str) -> Result<Vec<u8>, EncoderError>;
}

/// 基于 `usvg` 解析与 `svg2pdf` 转换的默认编码器。
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgToPdfEncoder {
    /// 为文字元素加载系统字体；关闭时文字在 PDF 中被忽略。
    pub load_system_fonts: bool,
}

impl SvgToPdfEncoder {
    pub fn with_system_fonts() -> Self {
        Self {
            load_system_fonts: true,
        }
    }
}

impl DocumentEncoder for SvgToPdfEncoder {
    fn encode(&self, svg: &str) -> Result<Vec<u8>, EncoderError> {
        let mut options = usvg::Options::default();
        if self.load_system_fonts {
            options.fontdb_mut().load_system_fonts();
        }
        let tree = usvg::Tree::from_str(svg, &options)
            .map_err(|err| EncoderError(format!("解析中间 SVG 失败: {err}")))?;
        svg2pdf::to_pdf(
            &tree,
            svg2pdf::ConversionOptions::default(),
            svg2pdf::PageOptions::default(),
        )
        .map_err(|err| EncoderError(format!("SVG 转 PDF 失败: {err}")))
    }
}

/// 内部持有一个 [`SvgController`] 并委托全部图元，导出时把 SVG 文档交给编码器。
pub struct PdfController {
    svg: SvgController,
    encoder: Arc<dyn DocumentEncoder>,
}

impl PdfController {
    pub fn new(space: CoordinateSpace, palette: Palette) -> Self {
        Self::with_encoder(
            space,
            palette,
            Arc::new(SvgToPdfEncoder::with_system_fonts()),
        )
    }

    pub fn with_encoder(
        space: CoordinateSpace,
        palette: Palette,
        encoder: Arc<dyn DocumentEncoder>,
    ) -> Self {
        Self {
            svg: SvgController::new(space, palette),
            encoder,
        }
    }
}

impl DrawController for PdfController {
    fn coordinate_space(&self) -> &CoordinateSpace {
        self.svg.coordinate_space()
    }

    fn canvas_size(&self) -> (f64, f64) {
        self.svg.canvas_size()
    }

    fn screen_scale(&self) -> f64 {
        self.svg.screen_scale()
    }

    fn screen_offset(&self) -> Vector2 {
        self.svg.screen_offset()
    }

    /// 页面输出没有可变画布，空操作。
    fn clear(&mut self) {}

    fn set_line_style(&mut self, style: &LineStyle) {
        self.svg.set_line_style(style);
    }

    fn set_fill_style(&mut self, color: Color) {
        self.svg.set_fill_style(color);
    }

    fn draw_line(&mut self, start: Point2, end: Point2) {
        self.svg.draw_line(start, end);
    }

    fn draw_arc(
        &mut self,
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counter_clockwise: bool,
    ) {
        self.svg
            .draw_arc(center, radius, start_angle, end_angle, counter_clockwise);
    }

    fn draw_text(&mut self, label: &str, base_point: Point2, options: &TextOptions) {
        self.svg.draw_text(label, base_point, options);
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
        self.svg
            .draw_image(image, x_min, y_min, width, height, angle);
    }

    fn fill_polygon(&mut self, points: &[Point2]) {
        self.svg.fill_polygon(points);
    }
}

impl Exporter for PdfController {
    async fn export(self) -> Result<Artifact, ExportError> {
        let (width, height) = self.svg.canvas_size();
        let document = self.svg.to_document();
        debug!(
            elements = self.svg.element_count(),
            svg_bytes = document.len(),
            "开始编码 PDF"
        );
        let encoder = Arc::clone(&self.encoder);
        let bytes = tokio::task::spawn_blocking(move || encoder.encode(&document))
            .await
            .map_err(|err| ExportError::Encoding {
                format: "pdf",
                message: format!("编码任务异常结束: {err}"),
            })?
            .map_err(|err| {
                warn!(error = %err, "PDF 编码失败");
                ExportError::Encoding {
                    format: "pdf",
                    message: err.to_string(),
                }
            })?;
        Ok(Artifact {
            format: "pdf",
            media_type: MEDIA_TYPE,
            width,
            height,
            payload: Payload::Binary(bytes),
        })
    }
}
