use tracing::debug;
use vdraw_core::geometry::Bounds2D;

use crate::controller::{Artifact, Exporter};
use crate::drawing::Drawing;
use crate::errors::{EngineError, ExportError};
use crate::style::Palette;
use crate::transform::CoordinateSpace;

/// 单次导出的可调参数。
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// 聚合包围盒四周追加的留白（世界单位）。
    pub margin: f64,
    /// 每个世界单位对应的目标单位数。
    pub pixels_per_unit: f64,
    pub palette: Palette,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            margin: 10.0,
            pixels_per_unit: 1.0,
            palette: Palette::default(),
        }
    }
}

/// 一次导出使用的世界框与目标框。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportFrames {
    pub world: Bounds2D,
    pub target: Bounds2D,
}

impl ExportFrames {
    pub fn coordinate_space(&self) -> Result<CoordinateSpace, EngineError> {
        CoordinateSpace::new(self.world, self.target)
    }
}

/// 由聚合包围盒推出导出画幅：世界框为包围盒外扩 `margin`，
/// 目标框以原点为左上角，尺寸为世界框乘以 `pixels_per_unit`。
pub fn plan_frames(bounds: Bounds2D, options: &ExportOptions) -> Result<ExportFrames, EngineError> {
    if bounds.is_empty() {
        return Err(EngineError::EmptyDrawing);
    }
    if !options.pixels_per_unit.is_finite() || options.pixels_per_unit <= 0.0 {
        return Err(EngineError::InvalidFrame {
            kind: "target",
            reason: "pixels per unit must be positive",
        });
    }
    let world = bounds.expand(options.margin.max(0.0));
    let target = Bounds2D::from_extents(
        0.0,
        0.0,
        world.width() * options.pixels_per_unit,
        world.height() * options.pixels_per_unit,
    );
    debug!(
        world_width = world.width(),
        world_height = world.height(),
        target_width = target.width(),
        target_height = target.height(),
        "导出画幅已确定"
    );
    Ok(ExportFrames { world, target })
}

/// 由图纸与导出参数直接构造坐标空间。
pub fn plan_space(drawing: &Drawing, options: &ExportOptions) -> Result<CoordinateSpace, EngineError> {
    plan_frames(drawing.bounds(), options)?.coordinate_space()
}

/// 将整张图纸绘制到控制器，然后等待其产出最终产物。
pub async fn render_and_export<E: Exporter>(
    drawing: &Drawing,
    mut controller: E,
) -> Result<Artifact, ExportError> {
    drawing.render(&mut controller);
    let artifact = controller.export().await?;
    debug!(
        format = artifact.format,
        bytes = artifact.payload.len(),
        "导出完成"
    );
    Ok(artifact)
}
