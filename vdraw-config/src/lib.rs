use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 支持的导出格式名称。
pub const KNOWN_FORMATS: [&str; 4] = ["canvas", "svg", "pdf", "dxf"];

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
}

impl AppConfig {
    /// 从显式路径加载配置，并做一致性校验。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `VDRAW_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("VDRAW_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 校验导出参数与调色板。
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.export.validate()?;
        self.palette.validate()
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 导出流水线参数：页边距、平坦度容差与目标像素比例。
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "ExportConfig::default_margin")]
    pub margin: f64,
    #[serde(default = "ExportConfig::default_tolerance")]
    pub flatness_tolerance: f64,
    #[serde(default = "ExportConfig::default_pixels_per_unit")]
    pub pixels_per_unit: f64,
    #[serde(default = "ExportConfig::default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "ExportConfig::default_file_stem")]
    pub file_stem: String,
    #[serde(default = "ExportConfig::default_formats")]
    pub formats: Vec<String>,
}

impl ExportConfig {
    fn default_margin() -> f64 {
        10.0
    }

    fn default_tolerance() -> f64 {
        0.1
    }

    fn default_pixels_per_unit() -> f64 {
        1.0
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from("out")
    }

    fn default_file_stem() -> String {
        "drawing".to_string()
    }

    fn default_formats() -> Vec<String> {
        vec!["svg".to_string()]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ConfigError::invalid(
                "export.margin",
                format!("页边距必须为非负有限值（当前 {}）", self.margin),
            ));
        }
        if !self.flatness_tolerance.is_finite() || self.flatness_tolerance <= 0.0 {
            return Err(ConfigError::invalid(
                "export.flatness_tolerance",
                format!("平坦度容差必须为正数（当前 {}）", self.flatness_tolerance),
            ));
        }
        if !self.pixels_per_unit.is_finite() || self.pixels_per_unit <= 0.0 {
            return Err(ConfigError::invalid(
                "export.pixels_per_unit",
                format!("像素比例必须为正数（当前 {}）", self.pixels_per_unit),
            ));
        }
        if self.file_stem.trim().is_empty() {
            return Err(ConfigError::invalid("export.file_stem", "文件名不能为空"));
        }
        if let Some(unknown) = self
            .formats
            .iter()
            .find(|format| !KNOWN_FORMATS.contains(&format.to_ascii_lowercase().as_str()))
        {
            return Err(ConfigError::invalid(
                "export.formats",
                format!("未知的导出格式 {unknown:?}"),
            ));
        }
        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            margin: Self::default_margin(),
            flatness_tolerance: Self::default_tolerance(),
            pixels_per_unit: Self::default_pixels_per_unit(),
            output_dir: Self::default_output_dir(),
            file_stem: Self::default_file_stem(),
            formats: Self::default_formats(),
        }
    }
}

/// 选中与高亮状态使用的颜色（十六进制字符串）。
#[derive(Debug, Clone, Deserialize)]
pub struct PaletteConfig {
    #[serde(default = "PaletteConfig::default_selected")]
    pub selected: String,
    #[serde(default = "PaletteConfig::default_highlighted")]
    pub highlighted: String,
}

impl PaletteConfig {
    fn default_selected() -> String {
        "#ff6a00".to_string()
    }

    fn default_highlighted() -> String {
        "#1e90ff".to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("palette.selected", &self.selected),
            ("palette.highlighted", &self.highlighted),
        ] {
            if !is_hex_color(value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("颜色需为 #rgb / #rrggbb / #rrggbbaa 形式（当前 {value:?}）"),
                ));
            }
        }
        Ok(())
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            selected: Self::default_selected(),
            highlighted: Self::default_highlighted(),
        }
    }
}

fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.trim().strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|ch| ch.is_ascii_hexdigit())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置项 {field} 无效: {message}")]
    Invalid { field: &'static str, message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}
