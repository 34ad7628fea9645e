use std::path::PathBuf;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use vdraw_config::{AppConfig, ConfigError};

mod cli;

use cli::{ExportRequest, parse_formats};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;
    let mut request = ExportRequest::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            "--format" => {
                let Some(raw) = args.next() else {
                    eprintln!("`--format` 需要提供 canvas|svg|pdf|dxf|all");
                    std::process::exit(1);
                };
                match parse_formats(&raw) {
                    Ok(formats) => request.formats = Some(formats),
                    Err(err) => {
                        eprintln!("{err}");
                        std::process::exit(1);
                    }
                }
            }
            "--output" => {
                let Some(dir) = args.next() else {
                    eprintln!("`--output` 需要提供输出目录");
                    std::process::exit(1);
                };
                request.output_dir = Some(PathBuf::from(dir));
            }
            "--path" => {
                let Some(data) = args.next() else {
                    eprintln!("`--path` 需要提供路径数据");
                    std::process::exit(1);
                };
                request.extra_paths.push(data);
            }
            other => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
        }
    }

    let config = load_configuration(config_override);
    init_logging(&config);
    info!("启动 vdraw 导出");

    match cli::run_export(&config, &request).await {
        Ok(written) => {
            for path in written {
                println!("{}", path.display());
            }
        }
        Err(err) => {
            error!(error = %err, "导出失败");
            std::process::exit(1);
        }
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            eprintln!("加载指定配置失败: {err}");
            std::process::exit(1);
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Invalid { field, .. } => {
                        warn!(field, error = %err, "配置校验失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
