use std::f64::consts::TAU;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::geometry::Point2;

/// 递归细分的最大深度，深度达到上限时直接接受弦线，最多产生 2^16 段。
pub const MAX_SUBDIVISION_DEPTH: u32 = 16;

/// 单段椭圆弧允许的最大采样段数。
pub const MAX_ARC_SEGMENTS: usize = 4096;

/// 点到弦线 `a`–`b` 的垂直距离；弦线退化为一点时退回欧氏距离。
pub fn distance_to_chord(point: Point2, a: Point2, b: Point2) -> f64 {
    let chord = b.as_vec2() - a.as_vec2();
    let length = chord.length();
    let offset = point.as_vec2() - a.as_vec2();
    if length <= f64::EPSILON {
        return offset.length();
    }
    chord.perp_dot(offset).abs() / length
}

trait Subdivide: Sized + Copy {
    fn end(&self) -> Point2;
    fn is_flat(&self, tolerance: f64) -> bool;
    fn split(&self) -> (Self, Self);
}

#[derive(Debug, Clone, Copy)]
struct CubicBez {
    p0: Point2,
    p1: Point2,
    p2: Point2,
    p3: Point2,
}

impl Subdivide for CubicBez {
    fn end(&self) -> Point2 {
        self.p3
    }

    fn is_flat(&self, tolerance: f64) -> bool {
        let d1 = distance_to_chord(self.p1, self.p0, self.p3);
        let d2 = distance_to_chord(self.p2, self.p0, self.p3);
        d1.max(d2) < tolerance
    }

    fn split(&self) -> (Self, Self) {
        let p01 = self.p0.midpoint(self.p1);
        let p12 = self.p1.midpoint(self.p2);
        let p23 = self.p2.midpoint(self.p3);
        let p012 = p01.midpoint(p12);
        let p123 = p12.midpoint(p23);
        let mid = p012.midpoint(p123);
        (
            CubicBez {
                p0: self.p0,
                p1: p01,
                p2: p012,
                p3: mid,
            },
            CubicBez {
                p0: mid,
                p1: p123,
                p2: p23,
                p3: self.p3,
            },
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct QuadBez {
    p0: Point2,
    p1: Point2,
    p2: Point2,
}

impl Subdivide for QuadBez {
    fn end(&self) -> Point2 {
        self.p2
    }

    fn is_flat(&self, tolerance: f64) -> bool {
        distance_to_chord(self.p1, self.p0, self.p2) < tolerance
    }

    fn split(&self) -> (Self, Self) {
        let p01 = self.p0.midpoint(self.p1);
        let p12 = self.p1.midpoint(self.p2);
        let mid = p01.midpoint(p12);
        (
            QuadBez {
                p0: self.p0,
                p1: p01,
                p2: mid,
            },
            QuadBez {
                p0: mid,
                p1: p12,
                p2: self.p2,
            },
        )
    }
}

/// 显式工作栈版本的 de Casteljau 细分。左半段先出栈，保证输出顺序。
fn flatten_subdivided<C: Subdivide>(start: Point2, curve: C, tolerance: f64) -> Vec<Point2> {
    let mut points = vec![start];
    let mut stack = vec![(curve, 0u32)];
    while let Some((segment, depth)) = stack.pop() {
        if depth >= MAX_SUBDIVISION_DEPTH || segment.is_flat(tolerance) {
            points.push(segment.end());
            continue;
        }
        let (left, right) = segment.split();
        stack.push((right, depth + 1));
        stack.push((left, depth + 1));
    }
    points
}

/// 将三次贝塞尔曲线折线化。
///
/// 与其余折线化函数一样是纯函数；返回的折线首点、末点与曲线端点逐位相等。
pub fn flatten_cubic(p0: Point2, p1: Point2, p2: Point2, p3: Point2, tolerance: f64) -> Vec<Point2> {
    debug_assert!(tolerance > 0.0, "flatness tolerance must be positive");
    flatten_subdivided(p0, CubicBez { p0, p1, p2, p3 }, tolerance)
}

/// 将二次贝塞尔曲线折线化。
pub fn flatten_quadratic(p0: Point2, p1: Point2, p2: Point2, tolerance: f64) -> Vec<Point2> {
    debug_assert!(tolerance > 0.0, "flatness tolerance must be positive");
    flatten_subdivided(p0, QuadBez { p0, p1, p2 }, tolerance)
}

/// 端点形式描述的椭圆弧（路径 `A`/`a` 指令）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipticalArc {
    pub from: Point2,
    pub to: Point2,
    pub rx: f64,
    pub ry: f64,
    /// 椭圆 X 轴相对坐标系 X 轴的旋转角，单位为度。
    pub x_axis_rotation: f64,
    pub large_arc: bool,
    pub sweep: bool,
}

/// 端点参数化换算得到的中心参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcCenter {
    pub center: Point2,
    pub rx: f64,
    pub ry: f64,
    pub start_angle: f64,
    /// 带符号的角度跨度；`sweep == false` 时为负。
    pub sweep_angle: f64,
}

impl EllipticalArc {
    /// 端点到中心参数化。半径为零或两端点重合时返回 `None`，由调用者按退化情况处理。
    pub fn center_parameterization(&self) -> Option<ArcCenter> {
        let mut rx = self.rx.abs();
        let mut ry = self.ry.abs();
        if rx <= f64::EPSILON || ry <= f64::EPSILON || self.from == self.to {
            return None;
        }

        let phi = self.x_axis_rotation.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let from = self.from.as_vec2();
        let to = self.to.as_vec2();

        // 弦中点平移到原点后旋转到椭圆局部坐标系
        let half = (from - to) * 0.5;
        let x1 = cos_phi * half.x + sin_phi * half.y;
        let y1 = -sin_phi * half.x + cos_phi * half.y;

        let lambda = (x1 * x1) / (rx * rx) + (y1 * y1) / (ry * ry);
        if lambda > 1.0 {
            let factor = lambda.sqrt();
            rx *= factor;
            ry *= factor;
        }

        let sign = if self.large_arc == self.sweep { -1.0 } else { 1.0 };
        let rx2 = rx * rx;
        let ry2 = ry * ry;
        let denominator = rx2 * y1 * y1 + ry2 * x1 * x1;
        if denominator <= f64::EPSILON {
            return None;
        }
        let numerator = rx2 * ry2 - denominator;
        let coefficient = sign * (numerator / denominator).max(0.0).sqrt();
        let cx1 = coefficient * rx * y1 / ry;
        let cy1 = -coefficient * ry * x1 / rx;

        let mid = (from + to) * 0.5;
        let center = DVec2::new(
            cos_phi * cx1 - sin_phi * cy1 + mid.x,
            sin_phi * cx1 + cos_phi * cy1 + mid.y,
        );

        let u = DVec2::new((x1 - cx1) / rx, (y1 - cy1) / ry);
        let v = DVec2::new((-x1 - cx1) / rx, (-y1 - cy1) / ry);
        let start_angle = u.y.atan2(u.x);
        let mut sweep_angle = u.perp_dot(v).atan2(u.dot(v));
        if !self.sweep && sweep_angle > 0.0 {
            sweep_angle -= TAU;
        } else if self.sweep && sweep_angle < 0.0 {
            sweep_angle += TAU;
        }

        Some(ArcCenter {
            center: Point2::from_vec(center),
            rx,
            ry,
            start_angle,
            sweep_angle,
        })
    }

    /// 以给定容差折线化。
    pub fn flatten(&self, tolerance: f64) -> Vec<Point2> {
        flatten_arc(self, tolerance)
    }
}

/// 根据弦高误差计算所需段数：`ceil(|span| / (2·acos(1 − tol/r)))`，至少 1 段。
pub fn arc_segment_count(sweep_angle: f64, radius: f64, tolerance: f64) -> usize {
    let ratio = (1.0 - tolerance / radius).clamp(-1.0, 1.0);
    let step = 2.0 * ratio.acos();
    if !step.is_finite() || step <= f64::EPSILON {
        return MAX_ARC_SEGMENTS;
    }
    let count = (sweep_angle.abs() / step).ceil();
    if !count.is_finite() {
        return MAX_ARC_SEGMENTS;
    }
    (count as usize).clamp(1, MAX_ARC_SEGMENTS)
}

/// 将椭圆弧折线化。
///
/// 半径为零时退化为直线 `[from, to]`；两端点重合时整段弧被省略，只返回起点。
pub fn flatten_arc(arc: &EllipticalArc, tolerance: f64) -> Vec<Point2> {
    debug_assert!(tolerance > 0.0, "flatness tolerance must be positive");
    if arc.from == arc.to {
        return vec![arc.from];
    }
    let Some(params) = arc.center_parameterization() else {
        return vec![arc.from, arc.to];
    };

    let (sin_phi, cos_phi) = arc.x_axis_rotation.to_radians().sin_cos();
    let segments = arc_segment_count(params.sweep_angle, params.rx.max(params.ry), tolerance);
    let center = params.center.as_vec2();

    let mut points = Vec::with_capacity(segments + 1);
    points.push(arc.from);
    for i in 1..segments {
        let t = params.start_angle + params.sweep_angle * (i as f64 / segments as f64);
        let (sin_t, cos_t) = t.sin_cos();
        let local = DVec2::new(params.rx * cos_t, params.ry * sin_t);
        let world = DVec2::new(
            cos_phi * local.x - sin_phi * local.y,
            sin_phi * local.x + cos_phi * local.y,
        ) + center;
        points.push(Point2::from_vec(world));
    }
    points.push(arc.to);
    points
}
