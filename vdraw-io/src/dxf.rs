use std::fmt::{Display, Write as _};

use tracing::debug;
use vdraw_core::geometry::{Point2, Vector2};
use vdraw_engine::arc;
use vdraw_engine::controller::{Artifact, DrawController, Exporter, Payload};
use vdraw_engine::errors::ExportError;
use vdraw_engine::style::{Color, ImageSource, LineStyle, Palette, TextAlign, TextOptions};
use vdraw_engine::transform::CoordinateSpace;

pub const MEDIA_TYPE: &str = "image/vnd.dxf";

/// R2004：组码 420 真彩色自该版本起定义。
const ACAD_VERSION: &str = "AC1018";
const LAYER: &str = "0";
const CONTINUOUS: &str = "CONTINUOUS";
const DASHED: &str = "DASHED";
const STANDARD: &str = "Standard";
const MODEL_SPACE: &str = "*Model_Space";
const PAPER_SPACE: &str = "*Paper_Space";
const DEFAULT_DASH: [f64; 2] = [5.0, 2.5];

/// 表、块与字典使用的固定句柄，实体句柄从 `FIRST_ENTITY` 起顺序分配。
mod handles {
    pub const BLOCK_RECORD_TABLE: u32 = 0x1;
    pub const LAYER_TABLE: u32 = 0x2;
    pub const STYLE_TABLE: u32 = 0x3;
    pub const LTYPE_TABLE: u32 = 0x5;
    pub const VIEW_TABLE: u32 = 0x6;
    pub const UCS_TABLE: u32 = 0x7;
    pub const VPORT_TABLE: u32 = 0x8;
    pub const APPID_TABLE: u32 = 0x9;
    pub const DIMSTYLE_TABLE: u32 = 0xA;
    pub const ROOT_DICTIONARY: u32 = 0xC;
    pub const GROUP_DICTIONARY: u32 = 0xD;
    pub const LAYER_0: u32 = 0x10;
    pub const STYLE_STANDARD: u32 = 0x11;
    pub const APPID_ACAD: u32 = 0x12;
    pub const LTYPE_BYBLOCK: u32 = 0x14;
    pub const LTYPE_BYLAYER: u32 = 0x15;
    pub const LTYPE_CONTINUOUS: u32 = 0x16;
    pub const LTYPE_DASHED: u32 = 0x17;
    pub const PAPER_SPACE_RECORD: u32 = 0x1B;
    pub const PAPER_SPACE_BLOCK: u32 = 0x1C;
    pub const PAPER_SPACE_END: u32 = 0x1D;
    pub const MODEL_SPACE_RECORD: u32 = 0x1F;
    pub const MODEL_SPACE_BLOCK: u32 = 0x20;
    pub const MODEL_SPACE_END: u32 = 0x21;
    pub const VPORT_ACTIVE: u32 = 0x29;
    pub const FIRST_ENTITY: u32 = 0x100;
}

/// `组码\n值\n` 形式的写入器。
#[derive(Debug, Default)]
struct DxfWriter {
    out: String,
}

impl DxfWriter {
    fn pair(&mut self, code: i32, value: impl Display) {
        let _ = write!(self.out, "{code}\n{value}\n");
    }

    fn real(&mut self, code: i32, value: f64) {
        let value = if value == 0.0 { 0.0 } else { value };
        let _ = write!(self.out, "{code}\n{value:.6}\n");
    }

    fn handle(&mut self, code: i32, handle: u32) {
        let _ = write!(self.out, "{code}\n{handle:X}\n");
    }

    fn point(&mut self, base_code: i32, point: (f64, f64)) {
        self.real(base_code, point.0);
        self.real(base_code + 10, point.1);
        self.real(base_code + 20, 0.0);
    }

    fn begin_section(&mut self, name: &str) {
        self.pair(0, "SECTION");
        self.pair(2, name);
    }

    fn end_section(&mut self) {
        self.pair(0, "ENDSEC");
    }

    fn begin_table(&mut self, name: &str, handle: u32, entries: usize) {
        self.pair(0, "TABLE");
        self.pair(2, name);
        self.handle(5, handle);
        self.handle(330, 0);
        self.pair(100, "AcDbSymbolTable");
        self.pair(70, entries);
    }

    fn table_entry(&mut self, kind: &str, handle: u32, table: u32, subclass: &str) {
        self.pair(0, kind);
        self.handle(5, handle);
        self.handle(330, table);
        self.pair(100, "AcDbSymbolTableRecord");
        self.pair(100, subclass);
    }

    fn end_table(&mut self) {
        self.pair(0, "ENDTAB");
    }

    fn line_type(&mut self, handle: u32, name: &str, description: &str, pattern: &[f64]) {
        self.table_entry(
            "LTYPE",
            handle,
            handles::LTYPE_TABLE,
            "AcDbLinetypeTableRecord",
        );
        self.pair(2, name);
        self.pair(70, 0);
        self.pair(3, description);
        self.pair(72, 65);
        self.pair(73, pattern.len());
        self.real(40, pattern.iter().map(|length| length.abs()).sum());
        for length in pattern {
            self.real(49, *length);
            self.pair(74, 0);
        }
    }

    fn block(&mut self, name: &str, record: u32, begin: u32, end: u32, paper_space: bool) {
        self.pair(0, "BLOCK");
        self.handle(5, begin);
        self.handle(330, record);
        self.pair(100, "AcDbEntity");
        if paper_space {
            self.pair(67, 1);
        }
        self.pair(8, LAYER);
        self.pair(100, "AcDbBlockBegin");
        self.pair(2, name);
        self.pair(70, 0);
        self.point(10, (0.0, 0.0));
        self.pair(3, name);
        self.pair(1, "");
        self.pair(0, "ENDBLK");
        self.handle(5, end);
        self.handle(330, record);
        self.pair(100, "AcDbEntity");
        if paper_space {
            self.pair(67, 1);
        }
        self.pair(8, LAYER);
        self.pair(100, "AcDbBlockEnd");
    }
}

/// DXF 后端：手写组码输出，坐标取目标坐标后再翻转回 Y 向上。
/// 实体都属于模型空间，句柄顺序分配。
#[derive(Debug)]
pub struct DxfController {
    space: CoordinateSpace,
    palette: Palette,
    stroke: LineStyle,
    fill: Color,
    entities: DxfWriter,
    entity_count: usize,
    next_handle: u32,
    dash_pattern: Option<Vec<f64>>,
}

impl DxfController {
    pub fn new(space: CoordinateSpace, palette: Palette) -> Self {
        Self {
            space,
            palette,
            stroke: LineStyle::default(),
            fill: Color::BLACK,
            entities: DxfWriter::default(),
            entity_count: 0,
            next_handle: handles::FIRST_ENTITY,
            dash_pattern: None,
        }
    }

    /// 世界点 → 目标点 → 翻转 Y 轴，使 DXF 中 Y 向上且与目标画幅同尺度。
    fn dxf_point(&self, point: Point2) -> (f64, f64) {
        let target = self.space.target();
        let p = self.space.world_to_target(point);
        (p.x(), target.min().y() + target.max().y() - p.y())
    }

    /// 写入实体公共部分，之后紧跟 `subclass` 标记与实体自身的组码。
    fn begin_entity(&mut self, kind: &str, subclass: &str, color: Color, dashed: bool) {
        self.entity_count += 1;
        let handle = self.next_handle;
        self.next_handle += 1;
        self.entities.pair(0, kind);
        self.entities.handle(5, handle);
        self.entities.handle(330, handles::MODEL_SPACE_RECORD);
        self.entities.pair(100, "AcDbEntity");
        self.entities.pair(8, LAYER);
        if dashed {
            self.entities.pair(6, DASHED);
        }
        self.entities.pair(62, color.nearest_aci());
        self.entities.pair(420, color.to_true_color());
        self.entities.pair(100, subclass);
    }

    fn begin_stroked(&mut self, kind: &str, subclass: &str) {
        let color = self.stroke.resolved_color(&self.palette);
        let dashed = self.stroke.is_dashed();
        self.begin_entity(kind, subclass, color, dashed);
    }

    fn write_document(&self) -> String {
        let mut doc = DxfWriter::default();
        let target = self.space.target();

        doc.begin_section("HEADER");
        doc.pair(9, "$ACADVER");
        doc.pair(1, ACAD_VERSION);
        doc.pair(9, "$HANDSEED");
        doc.handle(5, self.next_handle);
        doc.pair(9, "$INSUNITS");
        doc.pair(70, 0);
        doc.pair(9, "$EXTMIN");
        doc.point(10, (target.min().x(), target.min().y()));
        doc.pair(9, "$EXTMAX");
        doc.point(10, (target.max().x(), target.max().y()));
        doc.end_section();

        doc.begin_section("TABLES");
        self.write_tables(&mut doc);
        doc.end_section();

        doc.begin_section("BLOCKS");
        doc.block(
            MODEL_SPACE,
            handles::MODEL_SPACE_RECORD,
            handles::MODEL_SPACE_BLOCK,
            handles::MODEL_SPACE_END,
            false,
        );
        doc.block(
            PAPER_SPACE,
            handles::PAPER_SPACE_RECORD,
            handles::PAPER_SPACE_BLOCK,
            handles::PAPER_SPACE_END,
            true,
        );
        doc.end_section();

        doc.begin_section("ENTITIES");
        doc.out.push_str(&self.entities.out);
        doc.end_section();

        doc.begin_section("OBJECTS");
        doc.pair(0, "DICTIONARY");
        doc.handle(5, handles::ROOT_DICTIONARY);
        doc.handle(330, 0);
        doc.pair(100, "AcDbDictionary");
        doc.pair(281, 1);
        doc.pair(3, "ACAD_GROUP");
        doc.handle(350, handles::GROUP_DICTIONARY);
        doc.pair(0, "DICTIONARY");
        doc.handle(5, handles::GROUP_DICTIONARY);
        doc.handle(330, handles::ROOT_DICTIONARY);
        doc.pair(100, "AcDbDictionary");
        doc.pair(281, 1);
        doc.end_section();

        doc.pair(0, "EOF");
        doc.out
    }

    fn write_tables(&self, doc: &mut DxfWriter) {
        let target = self.space.target();

        doc.begin_table("VPORT", handles::VPORT_TABLE, 1);
        doc.table_entry(
            "VPORT",
            handles::VPORT_ACTIVE,
            handles::VPORT_TABLE,
            "AcDbViewportTableRecord",
        );
        doc.pair(2, "*Active");
        doc.pair(70, 0);
        doc.real(10, 0.0);
        doc.real(20, 0.0);
        doc.real(11, 1.0);
        doc.real(21, 1.0);
        doc.real(12, (target.min().x() + target.max().x()) / 2.0);
        doc.real(22, (target.min().y() + target.max().y()) / 2.0);
        doc.real(40, target.height().max(1.0));
        let aspect = if target.height() > 0.0 {
            target.width() / target.height()
        } else {
            1.0
        };
        doc.real(41, aspect);
        doc.end_table();

        let pattern: Vec<f64> = self
            .dash_pattern
            .clone()
            .unwrap_or_else(|| DEFAULT_DASH.to_vec())
            .into_iter()
            .enumerate()
            .map(|(index, length)| if index % 2 == 0 { length } else { -length })
            .collect();
        doc.begin_table("LTYPE", handles::LTYPE_TABLE, 4);
        doc.line_type(handles::LTYPE_BYBLOCK, "ByBlock", "", &[]);
        doc.line_type(handles::LTYPE_BYLAYER, "ByLayer", "", &[]);
        doc.line_type(handles::LTYPE_CONTINUOUS, CONTINUOUS, "Solid line", &[]);
        doc.line_type(handles::LTYPE_DASHED, DASHED, "Dashed __ __ __", &pattern);
        doc.end_table();

        doc.begin_table("LAYER", handles::LAYER_TABLE, 1);
        doc.table_entry(
            "LAYER",
            handles::LAYER_0,
            handles::LAYER_TABLE,
            "AcDbLayerTableRecord",
        );
        doc.pair(2, LAYER);
        doc.pair(70, 0);
        doc.pair(62, 7);
        doc.pair(6, CONTINUOUS);
        doc.end_table();

        doc.begin_table("STYLE", handles::STYLE_TABLE, 1);
        doc.table_entry(
            "STYLE",
            handles::STYLE_STANDARD,
            handles::STYLE_TABLE,
            "AcDbTextStyleTableRecord",
        );
        doc.pair(2, STANDARD);
        doc.pair(70, 0);
        doc.real(40, 0.0);
        doc.real(41, 1.0);
        doc.real(50, 0.0);
        doc.pair(71, 0);
        doc.real(42, 2.5);
        doc.pair(3, "txt");
        doc.pair(4, "");
        doc.end_table();

        doc.begin_table("VIEW", handles::VIEW_TABLE, 0);
        doc.end_table();
        doc.begin_table("UCS", handles::UCS_TABLE, 0);
        doc.end_table();

        doc.begin_table("APPID", handles::APPID_TABLE, 1);
        doc.table_entry(
            "APPID",
            handles::APPID_ACAD,
            handles::APPID_TABLE,
            "AcDbRegAppTableRecord",
        );
        doc.pair(2, "ACAD");
        doc.pair(70, 0);
        doc.end_table();

        doc.begin_table("DIMSTYLE", handles::DIMSTYLE_TABLE, 0);
        doc.pair(100, "AcDbDimStyleTable");
        doc.pair(71, 0);
        doc.end_table();

        doc.begin_table("BLOCK_RECORD", handles::BLOCK_RECORD_TABLE, 2);
        for (handle, name) in [
            (handles::MODEL_SPACE_RECORD, MODEL_SPACE),
            (handles::PAPER_SPACE_RECORD, PAPER_SPACE),
        ] {
            doc.table_entry(
                "BLOCK_RECORD",
                handle,
                handles::BLOCK_RECORD_TABLE,
                "AcDbBlockTableRecord",
            );
            doc.pair(2, name);
        }
        doc.end_table();
    }
}

impl DrawController for DxfController {
    fn coordinate_space(&self) -> &CoordinateSpace {
        &self.space
    }

    /// DXF 文件没有可变画布，空操作。
    fn clear(&mut self) {}

    fn set_line_style(&mut self, style: &LineStyle) {
        if style.is_dashed() && self.dash_pattern.is_none() {
            let mut pattern: Vec<f64> = style
                .dash
                .iter()
                .map(|length| self.space.length_to_target(length.abs()))
                .collect();
            if pattern.len() % 2 == 1 {
                pattern.extend_from_within(..);
            }
            self.dash_pattern = Some(pattern);
        }
        self.stroke = style.clone();
    }

    fn set_fill_style(&mut self, color: Color) {
        self.fill = color;
    }

    fn draw_line(&mut self, start: Point2, end: Point2) {
        let (a, b) = (self.dxf_point(start), self.dxf_point(end));
        self.begin_stroked("LINE", "AcDbLine");
        self.entities.point(10, a);
        self.entities.point(11, b);
    }

    fn draw_arc(
        &mut self,
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counter_clockwise: bool,
    ) {
        let Some(span) = arc::sweep(start_angle, end_angle, counter_clockwise) else {
            return;
        };
        let c = self.dxf_point(center);
        let r = self.space.length_to_target(radius.abs());
        if arc::is_full_turn(span) {
            self.begin_stroked("CIRCLE", "AcDbCircle");
            self.entities.point(10, c);
            self.entities.real(40, r);
            return;
        }
        // DXF 圆弧总是逆时针，顺时针弧交换起止角。
        let (from, to) = if counter_clockwise {
            (start_angle, end_angle)
        } else {
            (end_angle, start_angle)
        };
        self.begin_stroked("ARC", "AcDbCircle");
        self.entities.point(10, c);
        self.entities.real(40, r);
        self.entities.pair(100, "AcDbArc");
        self.entities.real(50, from.to_degrees().rem_euclid(360.0));
        self.entities.real(51, to.to_degrees().rem_euclid(360.0));
    }

    fn draw_text(&mut self, label: &str, base_point: Point2, options: &TextOptions) {
        let p = self.dxf_point(base_point);
        let justification = match options.align {
            TextAlign::Start => 0,
            TextAlign::Middle => 1,
            TextAlign::End => 2,
        };
        let color = self.stroke.resolved_color(&self.palette);
        self.begin_entity("TEXT", "AcDbText", color, false);
        self.entities.point(10, p);
        self.entities
            .real(40, self.space.length_to_target(options.height));
        self.entities.pair(1, label.replace(['\n', '\r'], " "));
        self.entities
            .real(50, options.rotation.to_degrees().rem_euclid(360.0));
        if justification != 0 {
            self.entities.pair(72, justification);
            self.entities.point(11, p);
        }
        self.entities.pair(100, "AcDbText");
    }

    /// 图像以闭合 LWPOLYLINE 外框表示。
    fn draw_image(
        &mut self,
        image: &ImageSource,
        x_min: f64,
        y_min: f64,
        width: f64,
        height: f64,
        angle: f64,
    ) {
        let origin = Point2::new(x_min, y_min);
        let (sin, cos) = angle.sin_cos();
        let corners: Vec<(f64, f64)> = [(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)]
            .into_iter()
            .map(|(dx, dy)| {
                self.dxf_point(origin.translate(Vector2::new(dx * cos - dy * sin, dx * sin + dy * cos)))
            })
            .collect();
        debug!(href = %image.href, "DXF 中图像以外框替代");
        self.begin_stroked("LWPOLYLINE", "AcDbPolyline");
        self.entities.pair(90, corners.len());
        self.entities.pair(70, 1);
        for (x, y) in corners {
            self.entities.real(10, x);
            self.entities.real(20, y);
        }
    }

    /// 实心 HATCH，单个多段线边界。
    fn fill_polygon(&mut self, points: &[Point2]) {
        if points.len() < 3 {
            return;
        }
        let vertices: Vec<(f64, f64)> = points.iter().map(|point| self.dxf_point(*point)).collect();
        self.begin_entity("HATCH", "AcDbHatch", self.fill, false);
        self.entities.point(10, (0.0, 0.0));
        self.entities.real(210, 0.0);
        self.entities.real(220, 0.0);
        self.entities.real(230, 1.0);
        self.entities.pair(2, "SOLID");
        self.entities.pair(70, 1);
        self.entities.pair(71, 0);
        self.entities.pair(91, 1);
        self.entities.pair(92, 2);
        self.entities.pair(72, 0);
        self.entities.pair(73, 1);
        self.entities.pair(93, vertices.len());
        for (x, y) in vertices {
            self.entities.real(10, x);
            self.entities.real(20, y);
        }
        self.entities.pair(97, 0);
        self.entities.pair(75, 0);
        self.entities.pair(76, 1);
        self.entities.pair(98, 0);
    }
}

impl Exporter for DxfController {
    async fn export(self) -> Result<Artifact, ExportError> {
        let (width, height) = self.space.target_size();
        let document = self.write_document();
        debug!(entities = self.entity_count, bytes = document.len(), "DXF 已生成");
        Ok(Artifact {
            format: "dxf",
            media_type: MEDIA_TYPE,
            width,
            height,
            payload: Payload::Text(document),
        })
    }
}
