pub mod curve;
pub mod path;

pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。世界坐标系中 Y 轴向上。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        pub const ORIGIN: Point2 = Point2(DVec2::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn midpoint(self, other: Point2) -> Point2 {
            Self((self.0 + other.0) * 0.5)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，用于平移与方向计算。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        pub const ZERO: Vector2 = Vector2(DVec2::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 有向直线段。同一路径中前一段的终点即后一段的起点（子路径之间除外）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct LineSegment {
        pub start: Point2,
        pub end: Point2,
    }

    impl LineSegment {
        #[inline]
        pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
            Self {
                start: Point2::new(x1, y1),
                end: Point2::new(x2, y2),
            }
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self { start, end }
        }

        #[inline]
        pub fn length(&self) -> f64 {
            self.start.distance(self.end)
        }

        #[inline]
        pub fn reversed(&self) -> Self {
            Self {
                start: self.end,
                end: self.start,
            }
        }

        #[inline]
        pub fn translate(&self, offset: Vector2) -> Self {
            Self {
                start: self.start.translate(offset),
                end: self.end.translate(offset),
            }
        }
    }

    /// 轴对齐边界框。`empty()` 为最宽的反向边界，表示“无内容”。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        /// 以两个角点构造边界框，自动按分量排序以满足 min ≤ max。
        #[inline]
        pub fn new(a: Point2, b: Point2) -> Self {
            Self {
                min: Point2::from_vec(a.as_vec2().min(b.as_vec2())),
                max: Point2::from_vec(a.as_vec2().max(b.as_vec2())),
            }
        }

        #[inline]
        pub fn from_extents(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
            Self::new(Point2::new(min_x, min_y), Point2::new(max_x, max_y))
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        #[inline]
        pub fn is_finite(&self) -> bool {
            self.min.is_finite() && self.max.is_finite()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        /// 分量取 min/max 的并集；任一方为空时结果等于另一方。
        pub fn union(mut self, other: &Bounds2D) -> Bounds2D {
            self.include_bounds(other);
            self
        }

        /// 四周各扩展 `margin`。空边界保持为空。
        pub fn expand(&self, margin: f64) -> Bounds2D {
            if self.is_empty() {
                return *self;
            }
            let delta = DVec2::splat(margin);
            Bounds2D::new(
                Point2::from_vec(self.min.as_vec2() - delta),
                Point2::from_vec(self.max.as_vec2() + delta),
            )
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            self.min.midpoint(self.max)
        }

        pub fn translate(&self, offset: Vector2) -> Bounds2D {
            if self.is_empty() {
                return *self;
            }
            Self {
                min: self.min.translate(offset),
                max: self.max.translate(offset),
            }
        }
    }

    impl Default for Bounds2D {
        fn default() -> Self {
            Self::empty()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn empty_bounds_absorbs_first_point() {
            let mut bounds = Bounds2D::empty();
            assert!(bounds.is_empty());
            bounds.include_point(Point2::new(3.0, -2.0));
            assert!(!bounds.is_empty());
            assert_eq!(bounds.min(), Point2::new(3.0, -2.0));
            assert_eq!(bounds.max(), Point2::new(3.0, -2.0));
            assert_eq!(bounds.width(), 0.0);
        }

        #[test]
        fn union_ignores_empty_side() {
            let a = Bounds2D::from_extents(0.0, 0.0, 10.0, 5.0);
            let merged = Bounds2D::empty().union(&a);
            assert_eq!(merged, a);

            let b = Bounds2D::from_extents(-5.0, 2.0, 3.0, 20.0);
            let merged = a.union(&b);
            assert_eq!(merged.min(), Point2::new(-5.0, 0.0));
            assert_eq!(merged.max(), Point2::new(10.0, 20.0));
        }

        #[test]
        fn expand_grows_every_side() {
            let bounds = Bounds2D::from_extents(0.0, 0.0, 10.0, 4.0).expand(2.0);
            assert_eq!(bounds.min(), Point2::new(-2.0, -2.0));
            assert_eq!(bounds.max(), Point2::new(12.0, 6.0));
            assert!(Bounds2D::empty().expand(5.0).is_empty());
        }

        #[test]
        fn new_orders_corners() {
            let bounds = Bounds2D::new(Point2::new(5.0, 1.0), Point2::new(-1.0, 7.0));
            assert_eq!(bounds.min(), Point2::new(-1.0, 1.0));
            assert_eq!(bounds.max(), Point2::new(5.0, 7.0));
        }
    }
}
