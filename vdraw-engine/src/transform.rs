use vdraw_core::geometry::{Bounds2D, Point2, Vector2};

use crate::errors::EngineError;

/// 将 `num` 从 `[src_min, src_max]` 线性映射到 `[tgt_min, tgt_max]`。
///
/// 源区间反向时先交换端点；源区间长度为零时返回 `tgt_min`；区间外的输入按线性外推，不做截断。
pub fn map_range(num: f64, src_min: f64, src_max: f64, tgt_min: f64, tgt_max: f64) -> f64 {
    let (src_min, src_max) = if src_min > src_max {
        (src_max, src_min)
    } else {
        (src_min, src_max)
    };
    let span = src_max - src_min;
    if span <= 0.0 {
        return tgt_min;
    }
    tgt_min + (num - src_min) * (tgt_max - tgt_min) / span
}

/// 一次导出使用的坐标空间，构造后不可变。
///
/// 世界坐标 Y 轴向上，目标坐标（屏幕像素、页面）Y 轴向下，映射时 Y 轴反向。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateSpace {
    world: Bounds2D,
    target: Bounds2D,
}

impl CoordinateSpace {
    /// 世界框与目标框都必须非空且为有限值；零宽或零高的轴按退化规则映射。
    pub fn new(world: Bounds2D, target: Bounds2D) -> Result<Self, EngineError> {
        check_frame("world", &world)?;
        check_frame("target", &target)?;
        Ok(Self { world, target })
    }

    #[inline]
    pub fn world(&self) -> Bounds2D {
        self.world
    }

    #[inline]
    pub fn target(&self) -> Bounds2D {
        self.target
    }

    /// 目标框的宽和高。
    #[inline]
    pub fn target_size(&self) -> (f64, f64) {
        (self.target.width(), self.target.height())
    }

    pub fn world_to_target(&self, point: Point2) -> Point2 {
        let (world_min, world_max) = (self.world.min(), self.world.max());
        let (target_min, target_max) = (self.target.min(), self.target.max());
        Point2::new(
            map_range(
                point.x(),
                world_min.x(),
                world_max.x(),
                target_min.x(),
                target_max.x(),
            ),
            map_range(
                point.y(),
                world_min.y(),
                world_max.y(),
                target_max.y(),
                target_min.y(),
            ),
        )
    }

    pub fn target_to_world(&self, point: Point2) -> Point2 {
        let (world_min, world_max) = (self.world.min(), self.world.max());
        let (target_min, target_max) = (self.target.min(), self.target.max());
        Point2::new(
            map_range(
                point.x(),
                target_min.x(),
                target_max.x(),
                world_min.x(),
                world_max.x(),
            ),
            map_range(
                point.y(),
                target_min.y(),
                target_max.y(),
                world_max.y(),
                world_min.y(),
            ),
        )
    }

    /// 目标宽度与世界高度之比，沿用既有导出画幅的计算方式。
    /// 世界高度为零时返回 1.0。
    pub fn scale(&self) -> f64 {
        let height = self.world.height();
        if height <= 0.0 {
            return 1.0;
        }
        self.target.width() / height
    }

    /// 目标框的最小角，可直接用作屏幕平移量。
    #[inline]
    pub fn offset(&self) -> Vector2 {
        Vector2::from(self.target.min().as_vec2())
    }

    /// 世界长度换算为目标长度（半径、线宽、字高），按 X 轴比例；
    /// X 轴退化时改用 Y 轴，两轴都退化时原样返回。
    pub fn length_to_target(&self, length: f64) -> f64 {
        length * self.axis_ratio()
    }

    pub fn length_to_world(&self, length: f64) -> f64 {
        length / self.axis_ratio()
    }

    fn axis_ratio(&self) -> f64 {
        let (world_width, world_height) = (self.world.width(), self.world.height());
        if world_width > 0.0 && self.target.width() > 0.0 {
            self.target.width() / world_width
        } else if world_height > 0.0 && self.target.height() > 0.0 {
            self.target.height() / world_height
        } else {
            1.0
        }
    }
}

fn check_frame(kind: &'static str, frame: &Bounds2D) -> Result<(), EngineError> {
    if frame.is_empty() {
        return Err(EngineError::InvalidFrame {
            kind,
            reason: "bounds are empty",
        });
    }
    if !frame.is_finite() {
        return Err(EngineError::InvalidFrame {
            kind,
            reason: "bounds are not finite",
        });
    }
    Ok(())
}
