use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;
use vdraw_engine::controller::Artifact;
use vdraw_engine::drawing::Drawing;
use vdraw_engine::errors::ExportError;
use vdraw_engine::export::{ExportOptions, plan_space, render_and_export};

pub mod canvas;
pub mod dxf;
pub mod pdf;
pub mod svg;

use canvas::CanvasController;
use dxf::DxfController;
use pdf::PdfController;
use svg::SvgController;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unknown export format {0:?}, expected one of canvas, svg, pdf, dxf")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Canvas,
    Svg,
    Pdf,
    Dxf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Canvas,
        ExportFormat::Svg,
        ExportFormat::Pdf,
        ExportFormat::Dxf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Canvas => "canvas",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Dxf => "dxf",
        }
    }

    /// 写入磁盘时使用的扩展名；画布显示列表以 JSON 保存。
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Canvas => "json",
            other => other.name(),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        ExportFormat::ALL
            .into_iter()
            .find(|format| format.name() == lowered)
            .ok_or_else(|| FormatError::Unknown(s.to_string()))
    }
}

/// 为图纸规划画幅，创建对应后端的控制器，绘制并导出。
/// 每次调用都使用独立的坐标空间与控制器。
pub async fn export_drawing(
    drawing: &Drawing,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<Artifact, ExportError> {
    let space = plan_space(drawing, options)?;
    let palette = options.palette;
    match format {
        ExportFormat::Canvas => {
            render_and_export(drawing, CanvasController::new(space, palette)).await
        }
        ExportFormat::Svg => render_and_export(drawing, SvgController::new(space, palette)).await,
        ExportFormat::Pdf => render_and_export(drawing, PdfController::new(space, palette)).await,
        ExportFormat::Dxf => render_and_export(drawing, DxfController::new(space, palette)).await,
    }
}

/// 将产物写入 `path`，必要时创建父目录。
pub async fn write_artifact(artifact: &Artifact, path: &Path) -> Result<(), ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    tokio::fs::write(path, artifact.payload.as_bytes())
        .await
        .map_err(io_error)?;
    info!(
        format = artifact.format,
        path = %path.display(),
        bytes = artifact.payload.len(),
        "产物已写入"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("SVG".parse::<ExportFormat>().unwrap(), ExportFormat::Svg);
        assert_eq!(" dxf ".parse::<ExportFormat>().unwrap(), ExportFormat::Dxf);
        assert!(matches!(
            "png".parse::<ExportFormat>(),
            Err(FormatError::Unknown(_))
        ));
        assert_eq!(ExportFormat::Canvas.extension(), "json");
        assert_eq!(ExportFormat::Pdf.extension(), "pdf");
    }
}
