pub mod controller;
pub mod drawing;
pub mod export;
pub mod style;
pub mod transform;

/// 圆弧角度跨度的统一判定，实体包围盒与各后端共用。
pub mod arc {
    use std::f64::consts::TAU;

    const SPAN_EPSILON: f64 = 1e-12;

    /// 沿绘制方向从起始角扫到终止角的角度，范围 `(0, 2π]`。
    /// 起止角相同视为空弧返回 `None`；角度差达到一整圈时返回 `2π`。
    pub fn sweep(start: f64, end: f64, counter_clockwise: bool) -> Option<f64> {
        let raw = if counter_clockwise {
            end - start
        } else {
            start - end
        };
        if raw.abs() >= TAU - SPAN_EPSILON {
            return Some(TAU);
        }
        let span = raw.rem_euclid(TAU);
        if span <= SPAN_EPSILON {
            return None;
        }
        Some(span)
    }

    #[inline]
    pub fn is_full_turn(span: f64) -> bool {
        span >= TAU - SPAN_EPSILON
    }

}

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("drawing has no entity with a spatial extent")]
        EmptyDrawing,
        #[error("invalid {kind} frame: {reason}")]
        InvalidFrame {
            kind: &'static str,
            reason: &'static str,
        },
        #[error("entity with id {0} not found")]
        EntityNotFound(u64),
        #[error("invalid color literal {0:?}")]
        InvalidColor(String),
    }

    /// 导出阶段的错误。编码失败时不会返回任何部分产物。
    #[derive(Debug, Error)]
    pub enum ExportError {
        #[error(transparent)]
        Engine(#[from] EngineError),
        #[error("{format} encoding failed: {message}")]
        Encoding {
            format: &'static str,
            message: String,
        },
        #[error("writing artifact {path:?} failed: {source}")]
        Io {
            path: std::path::PathBuf,
            #[source]
            source: std::io::Error,
        },
    }
}
