use std::collections::HashSet;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use tracing::debug;
use vdraw_core::geometry::{Bounds2D, LineSegment, Point2, Vector2};
use vdraw_core::path::segmentize;

use crate::controller::DrawController;
use crate::errors::EngineError;
use crate::style::{Color, ImageSource, LineStyle, TextOptions};

/// 导出核心只通过这组能力访问实体，不关心具体类型。
pub trait Drawable {
    fn draw(&self, controller: &mut dyn DrawController);

    /// 无空间范围的实体返回 `None`，聚合时被跳过。
    fn bounding_box(&self) -> Option<Bounds2D>;

    fn translate(&mut self, offset: Vector2);
}

/// 合并所有实体的包围盒。没有实体贡献范围时返回 [`Bounds2D::empty`]，调用方需按“空”处理。
pub fn aggregate_bounds<'a, D>(entities: impl IntoIterator<Item = &'a D>) -> Bounds2D
where
    D: Drawable + ?Sized + 'a,
{
    entities
        .into_iter()
        .filter_map(|entity| entity.bounding_box())
        .fold(Bounds2D::empty(), |bounds, entity_bounds| {
            bounds.union(&entity_bounds)
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(u64);

impl EntityId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// 实体自身的线型与可选填充色。
#[derive(Debug, Clone, PartialEq)]
pub struct EntityStyle {
    pub color: Color,
    pub width: f64,
    pub dash: Vec<f64>,
    pub fill: Option<Color>,
}

impl EntityStyle {
    pub fn stroke(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            ..Self::default()
        }
    }

    pub fn dashed(mut self, dash: impl Into<Vec<f64>>) -> Self {
        self.dash = dash.into();
        self
    }

    pub fn filled(mut self, fill: Color) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn line_style(&self, state: DrawState) -> LineStyle {
        LineStyle {
            color: self.color,
            width: self.width,
            dash: self.dash.clone(),
            is_highlighted: state.is_highlighted,
            is_selected: state.is_selected,
        }
    }
}

impl Default for EntityStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            dash: Vec::new(),
            fill: None,
        }
    }
}

/// 绘制时附带的交互状态。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawState {
    pub is_selected: bool,
    pub is_highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub start: Point2,
    pub end: Point2,
    pub style: EntityStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
    pub style: EntityStyle,
}

/// 圆弧，角度为弧度，`counter_clockwise` 为假时从起始角顺时针走到终止角。
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub counter_clockwise: bool,
    pub style: EntityStyle,
}

impl Arc {
    /// 沿绘制方向的角度跨度，空弧为 `None`。
    pub fn sweep(&self) -> Option<f64> {
        crate::arc::sweep(self.start_angle, self.end_angle, self.counter_clockwise)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point2>,
    pub closed: bool,
    pub style: EntityStyle,
}

/// 填充多边形：填充色取 `style.fill`，未设置时使用线色。
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub points: Vec<Point2>,
    pub style: EntityStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub position: Point2,
    pub content: String,
    pub options: TextOptions,
    pub style: EntityStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub source: ImageSource,
    /// 旋转前的左下角，同时是旋转中心。
    pub origin: Point2,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
    pub style: EntityStyle,
}

/// 路径实体，构造时按给定容差折线化一次。
///
/// `data` 与 `tolerance` 保留首次解析时的原文；平移只作用于 `segments`，
/// 累计位移记在 `offset`，即 `segments` 等于原文折线化后整体平移 `offset`。
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPath {
    pub data: String,
    pub tolerance: f64,
    pub offset: Vector2,
    pub segments: Vec<LineSegment>,
    pub style: EntityStyle,
}

impl VectorPath {
    pub fn parse(data: impl Into<String>, tolerance: f64, style: EntityStyle) -> Self {
        let data = data.into();
        let segments = segmentize(&data, tolerance);
        debug!(segments = segments.len(), tolerance, "路径已折线化");
        Self {
            data,
            tolerance,
            offset: Vector2::ZERO,
            segments,
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Line(Line),
    Circle(Circle),
    Arc(Arc),
    Polyline(Polyline),
    Polygon(Polygon),
    Text(Text),
    Image(Image),
    Path(VectorPath),
}

impl Entity {
    pub fn style(&self) -> &EntityStyle {
        match self {
            Entity::Line(line) => &line.style,
            Entity::Circle(circle) => &circle.style,
            Entity::Arc(arc) => &arc.style,
            Entity::Polyline(polyline) => &polyline.style,
            Entity::Polygon(polygon) => &polygon.style,
            Entity::Text(text) => &text.style,
            Entity::Image(image) => &image.style,
            Entity::Path(path) => &path.style,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Line(_) => "line",
            Entity::Circle(_) => "circle",
            Entity::Arc(_) => "arc",
            Entity::Polyline(_) => "polyline",
            Entity::Polygon(_) => "polygon",
            Entity::Text(_) => "text",
            Entity::Image(_) => "image",
            Entity::Path(_) => "path",
        }
    }

    /// 先设置线型再输出图元，选中/高亮状态经由线型传给控制器。
    pub fn draw_with(&self, controller: &mut dyn DrawController, state: DrawState) {
        let style = self.style();
        controller.set_line_style(&style.line_style(state));
        match self {
            Entity::Line(line) => controller.draw_line(line.start, line.end),
            Entity::Circle(circle) => {
                controller.draw_arc(circle.center, circle.radius, 0.0, TAU, true)
            }
            Entity::Arc(arc) => {
                if arc.sweep().is_some() {
                    controller.draw_arc(
                        arc.center,
                        arc.radius,
                        arc.start_angle,
                        arc.end_angle,
                        arc.counter_clockwise,
                    );
                }
            }
            Entity::Polyline(polyline) => {
                draw_polyline(controller, &polyline.points, polyline.closed)
            }
            Entity::Polygon(polygon) => {
                controller.set_fill_style(style.fill.unwrap_or(style.color));
                controller.fill_polygon(&polygon.points);
                draw_polyline(controller, &polygon.points, true);
            }
            Entity::Text(text) => controller.draw_text(&text.content, text.position, &text.options),
            Entity::Image(image) => controller.draw_image(
                &image.source,
                image.origin.x(),
                image.origin.y(),
                image.width,
                image.height,
                image.angle,
            ),
            Entity::Path(path) => {
                for segment in &path.segments {
                    controller.draw_line(segment.start, segment.end);
                }
            }
        }
    }
}

impl Drawable for Entity {
    fn draw(&self, controller: &mut dyn DrawController) {
        self.draw_with(controller, DrawState::default());
    }

    /// 文字退化为插入点。
    fn bounding_box(&self) -> Option<Bounds2D> {
        let mut bounds = Bounds2D::empty();
        match self {
            Entity::Line(line) => {
                bounds.include_point(line.start);
                bounds.include_point(line.end);
            }
            Entity::Circle(circle) => {
                let radius = circle.radius.abs();
                let center = circle.center;
                bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
            }
            Entity::Arc(arc) => arc_bounds(arc, &mut bounds),
            Entity::Polyline(Polyline { points, .. }) | Entity::Polygon(Polygon { points, .. }) => {
                for point in points {
                    bounds.include_point(*point);
                }
            }
            Entity::Text(text) => bounds.include_point(text.position),
            Entity::Image(image) => {
                for corner in image_corners(image) {
                    bounds.include_point(corner);
                }
            }
            Entity::Path(path) => {
                for segment in &path.segments {
                    bounds.include_point(segment.start);
                    bounds.include_point(segment.end);
                }
            }
        }
        if bounds.is_empty() { None } else { Some(bounds) }
    }

    fn translate(&mut self, offset: Vector2) {
        match self {
            Entity::Line(line) => {
                line.start = line.start.translate(offset);
                line.end = line.end.translate(offset);
            }
            Entity::Circle(circle) => circle.center = circle.center.translate(offset),
            Entity::Arc(arc) => arc.center = arc.center.translate(offset),
            Entity::Polyline(Polyline { points, .. }) | Entity::Polygon(Polygon { points, .. }) => {
                for point in points.iter_mut() {
                    *point = point.translate(offset);
                }
            }
            Entity::Text(text) => text.position = text.position.translate(offset),
            Entity::Image(image) => image.origin = image.origin.translate(offset),
            Entity::Path(path) => {
                for segment in path.segments.iter_mut() {
                    *segment = segment.translate(offset);
                }
                path.offset = Vector2(path.offset.0 + offset.0);
            }
        }
    }
}

fn draw_polyline(controller: &mut dyn DrawController, points: &[Point2], closed: bool) {
    for pair in points.windows(2) {
        controller.draw_line(pair[0], pair[1]);
    }
    if closed && points.len() > 2 {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            if first != last {
                controller.draw_line(*last, *first);
            }
        }
    }
}

/// 以 `origin` 为中心逆时针旋转 `angle` 后的四个角点。
pub fn image_corners(image: &Image) -> [Point2; 4] {
    let (sin, cos) = image.angle.sin_cos();
    let rotate = |dx: f64, dy: f64| {
        image
            .origin
            .translate(Vector2::new(dx * cos - dy * sin, dx * sin + dy * cos))
    };
    [
        rotate(0.0, 0.0),
        rotate(image.width, 0.0),
        rotate(image.width, image.height),
        rotate(0.0, image.height),
    ]
}

fn normalize_angle(angle: f64) -> f64 {
    let mut result = angle % TAU;
    if result < 0.0 {
        result += TAU;
    }
    result
}

fn arc_point(center: Point2, radius: f64, angle: f64) -> Point2 {
    center.translate(Vector2::new(radius * angle.cos(), radius * angle.sin()))
}

/// 起止角重合的空弧不绘制，也不贡献包围盒。
fn arc_bounds(arc: &Arc, bounds: &mut Bounds2D) {
    let Some(span) = arc.sweep() else {
        return;
    };
    let radius = arc.radius.abs();
    if radius <= f64::EPSILON {
        bounds.include_point(arc.center);
        return;
    }

    // 顺时针弧等价于从终止角逆时针走到起始角
    let start = normalize_angle(if arc.counter_clockwise {
        arc.start_angle
    } else {
        arc.end_angle
    });
    let end = start + span;
    bounds.include_point(arc_point(arc.center, radius, start));
    bounds.include_point(arc_point(arc.center, radius, end));

    const QUADRANTS: [f64; 4] = [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0];
    for base in QUADRANTS {
        let mut candidate = base;
        while candidate < start {
            candidate += TAU;
        }
        if candidate <= end {
            bounds.include_point(arc_point(arc.center, radius, candidate));
        }
    }
}

/// 演示图纸中各实体的 ID。
#[derive(Debug, Clone, Copy)]
pub struct DemoEntities {
    pub frame: EntityId,
    pub circle: EntityId,
    pub arc: EntityId,
    pub polygon: EntityId,
    pub path: EntityId,
    pub label: EntityId,
}

/// 有序实体集合，附带选中集与高亮实体。
#[derive(Debug, Default)]
pub struct Drawing {
    entities: Vec<(EntityId, Entity)>,
    next_entity_id: u64,
    selected: HashSet<EntityId>,
    highlighted: Option<EntityId>,
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: impl Into<Entity>) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.push((id, entity.into()));
        id
    }

    pub fn add_line(&mut self, start: Point2, end: Point2, style: EntityStyle) -> EntityId {
        self.add(Line { start, end, style })
    }

    pub fn add_circle(&mut self, center: Point2, radius: f64, style: EntityStyle) -> EntityId {
        self.add(Circle {
            center,
            radius,
            style,
        })
    }

    pub fn add_polygon(
        &mut self,
        points: impl IntoIterator<Item = Point2>,
        style: EntityStyle,
    ) -> EntityId {
        self.add(Polygon {
            points: points.into_iter().collect(),
            style,
        })
    }

    pub fn add_text(
        &mut self,
        position: Point2,
        content: impl Into<String>,
        options: TextOptions,
        style: EntityStyle,
    ) -> EntityId {
        self.add(Text {
            position,
            content: content.into(),
            options,
            style,
        })
    }

    /// 解析路径字符串并按 `tolerance` 折线化后加入图纸。
    pub fn add_path(&mut self, data: &str, tolerance: f64, style: EntityStyle) -> EntityId {
        self.add(VectorPath::parse(data, tolerance, style))
    }

    /// 删除实体并同步清理选中与高亮状态。
    pub fn remove(&mut self, id: EntityId) -> Result<Entity, EngineError> {
        let index = self
            .entities
            .iter()
            .position(|(entity_id, _)| *entity_id == id)
            .ok_or(EngineError::EntityNotFound(id.get()))?;
        self.selected.remove(&id);
        if self.highlighted == Some(id) {
            self.highlighted = None;
        }
        Ok(self.entities.remove(index).1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
        self.entities.iter()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .iter()
            .find_map(|(entity_id, entity)| (*entity_id == id).then_some(entity))
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, EngineError> {
        self.entities
            .iter_mut()
            .find_map(|(entity_id, entity)| (*entity_id == id).then_some(entity))
            .ok_or(EngineError::EntityNotFound(id.get()))
    }

    fn ensure_exists(&self, id: EntityId) -> Result<(), EngineError> {
        if self.entity(id).is_none() {
            return Err(EngineError::EntityNotFound(id.get()));
        }
        Ok(())
    }

    #[inline]
    pub fn selection_len(&self) -> usize {
        self.selected.len()
    }

    #[inline]
    pub fn is_selected(&self, id: EntityId) -> bool {
        self.selected.contains(&id)
    }

    /// 选中指定实体。若实体不存在则返回错误。
    pub fn select(&mut self, id: EntityId) -> Result<(), EngineError> {
        self.ensure_exists(id)?;
        self.selected.insert(id);
        Ok(())
    }

    /// 取消选中，返回之前是否处于选中状态。
    pub fn deselect(&mut self, id: EntityId) -> bool {
        self.selected.remove(&id)
    }

    /// 切换选中状态，返回切换后的状态。
    pub fn toggle_selection(&mut self, id: EntityId) -> Result<bool, EngineError> {
        self.ensure_exists(id)?;
        if self.selected.insert(id) {
            Ok(true)
        } else {
            self.selected.remove(&id);
            Ok(false)
        }
    }

    #[inline]
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    #[inline]
    pub fn selection(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.selected.iter().copied()
    }

    /// 设置（或以 `None` 取消）高亮实体。
    pub fn set_highlighted(&mut self, id: Option<EntityId>) -> Result<(), EngineError> {
        if let Some(id) = id {
            self.ensure_exists(id)?;
        }
        self.highlighted = id;
        Ok(())
    }

    #[inline]
    pub fn highlighted(&self) -> Option<EntityId> {
        self.highlighted
    }

    pub fn translate_entity(&mut self, id: EntityId, offset: Vector2) -> Result<(), EngineError> {
        self.entity_mut(id)?.translate(offset);
        Ok(())
    }

    /// 平移全部选中实体，返回移动的数量。
    pub fn translate_selection(&mut self, offset: Vector2) -> usize {
        let mut moved = 0;
        for (id, entity) in &mut self.entities {
            if self.selected.contains(id) {
                entity.translate(offset);
                moved += 1;
            }
        }
        moved
    }

    /// 全部实体的包围盒，没有实体贡献范围时为空。
    pub fn bounds(&self) -> Bounds2D {
        aggregate_bounds(self.entities.iter().map(|(_, entity)| entity))
    }

    pub fn selection_bounds(&self) -> Option<Bounds2D> {
        let bounds = aggregate_bounds(
            self.entities
                .iter()
                .filter(|(id, _)| self.selected.contains(id))
                .map(|(_, entity)| entity),
        );
        if bounds.is_empty() { None } else { Some(bounds) }
    }

    /// 按插入顺序绘制全部实体。
    pub fn render(&self, controller: &mut dyn DrawController) {
        for (id, entity) in &self.entities {
            let state = DrawState {
                is_selected: self.selected.contains(id),
                is_highlighted: self.highlighted == Some(*id),
            };
            entity.draw_with(controller, state);
        }
        debug!(
            entities = self.entities.len(),
            selected = self.selected.len(),
            "图纸已绘制"
        );
    }

    /// 为 CLI / 快速验证填充一组示例实体，返回关键实体 ID。
    pub fn populate_demo(&mut self, tolerance: f64) -> DemoEntities {
        use std::f64::consts::FRAC_PI_4;

        self.clear_selection();
        let ink = EntityStyle::stroke(Color::rgb(0x20, 0x20, 0x20), 0.5);
        let accent = EntityStyle::stroke(Color::rgb(0xc0, 0x30, 0x30), 0.35);

        let frame = self.add(Polyline {
            points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(120.0, 0.0),
                Point2::new(120.0, 80.0),
                Point2::new(0.0, 80.0),
            ],
            closed: true,
            style: ink.clone(),
        });
        let circle = self.add_circle(Point2::new(30.0, 40.0), 15.0, accent.clone());
        let arc = self.add(Arc {
            center: Point2::new(30.0, 40.0),
            radius: 22.0,
            start_angle: -FRAC_PI_4,
            end_angle: FRAC_PI_2 + FRAC_PI_4,
            counter_clockwise: true,
            style: accent.clone().dashed([2.0, 1.0]),
        });
        let polygon = self.add_polygon(
            [
                Point2::new(70.0, 15.0),
                Point2::new(100.0, 15.0),
                Point2::new(85.0, 40.0),
            ],
            ink.clone().filled(Color::rgba(0x1e, 0x90, 0xff, 0x80)),
        );
        let path = self.add_path(
            "M 60 55 C 70 75 90 35 105 60 Q 110 70 115 60 A 5 5 0 0 0 105 50",
            tolerance,
            ink.clone(),
        );
        let label = self.add_text(
            Point2::new(5.0, 72.0),
            "vdraw",
            TextOptions {
                height: 4.0,
                ..TextOptions::default()
            },
            ink,
        );

        let ids = DemoEntities {
            frame,
            circle,
            arc,
            polygon,
            path,
            label,
        };

        debug!(
            frame = ids.frame.get(),
            circle = ids.circle.get(),
            arc = ids.arc.get(),
            polygon = ids.polygon.get(),
            path = ids.path.get(),
            label = ids.label.get(),
            "已创建演示实体"
        );

        ids
    }
}

macro_rules! impl_into_entity {
    ($($shape:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$shape> for Entity {
                fn from(value: $shape) -> Self {
                    Entity::$variant(value)
                }
            }
        )*
    };
}

impl_into_entity! {
    Line => Line,
    Circle => Circle,
    Arc => Arc,
    Polyline => Polyline,
    Polygon => Polygon,
    Text => Text,
    Image => Image,
    VectorPath => Path,
}
