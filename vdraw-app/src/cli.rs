use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use vdraw_config::{AppConfig, ExportConfig, PaletteConfig};
use vdraw_engine::drawing::{Drawing, EntityStyle};
use vdraw_engine::errors::{EngineError, ExportError};
use vdraw_engine::export::ExportOptions;
use vdraw_engine::style::{Color, Palette};
use vdraw_io::{ExportFormat, FormatError, export_drawing, write_artifact};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("调色板配置无效: {0}")]
    Palette(#[source] EngineError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// 命令行对配置的覆盖项。
#[derive(Debug, Default, Clone)]
pub struct ExportRequest {
    pub formats: Option<Vec<ExportFormat>>,
    pub output_dir: Option<PathBuf>,
    pub extra_paths: Vec<String>,
}

/// 解析 `--format` 参数，`all` 表示全部格式。
pub fn parse_formats(raw: &str) -> Result<Vec<ExportFormat>, FormatError> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(ExportFormat::ALL.to_vec());
    }
    raw.split(',').map(str::parse::<ExportFormat>).collect()
}

pub fn export_options(export: &ExportConfig, palette: &PaletteConfig) -> Result<ExportOptions, CliError> {
    let palette = Palette {
        selected: Color::from_hex(&palette.selected).map_err(CliError::Palette)?,
        highlighted: Color::from_hex(&palette.highlighted).map_err(CliError::Palette)?,
    };
    Ok(ExportOptions {
        margin: export.margin,
        pixels_per_unit: export.pixels_per_unit,
        palette,
    })
}

/// 内置示例图纸，外加命令行传入的路径。选中圆、高亮三角形，用于展示调色板。
pub fn build_drawing(tolerance: f64, extra_paths: &[String]) -> Result<Drawing, EngineError> {
    let mut drawing = Drawing::new();
    let ids = drawing.populate_demo(tolerance);
    drawing.select(ids.circle)?;
    drawing.set_highlighted(Some(ids.polygon))?;

    let style = EntityStyle::stroke(Color::rgb(0x2e, 0x8b, 0x57), 0.5);
    for data in extra_paths {
        let id = drawing.add_path(data, tolerance, style.clone());
        info!(id = id.get(), "已加入命令行路径");
    }
    Ok(drawing)
}

/// 按配置与覆盖项导出全部请求的格式，返回写入的文件路径。
pub async fn run_export(config: &AppConfig, request: &ExportRequest) -> Result<Vec<PathBuf>, CliError> {
    let formats = match &request.formats {
        Some(formats) => formats.clone(),
        None => config
            .export
            .formats
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<ExportFormat>, _>>()?,
    };
    let output_dir = request
        .output_dir
        .clone()
        .unwrap_or_else(|| config.export.output_dir.clone());
    let options = export_options(&config.export, &config.palette)?;
    let drawing = build_drawing(config.export.flatness_tolerance, &request.extra_paths)
        .map_err(ExportError::from)?;
    info!(
        entities = drawing.len(),
        formats = formats.len(),
        output = %output_dir.display(),
        "开始导出"
    );

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let artifact = export_drawing(&drawing, format, &options).await?;
        let path = output_dir.join(format!(
            "{}.{}",
            config.export.file_stem,
            format.extension()
        ));
        write_artifact(&artifact, &path).await?;
        written.push(path);
    }
    Ok(written)
}
