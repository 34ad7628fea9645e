use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// 8 位 RGBA 颜色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// AutoCAD 颜色索引 1..=7 对应的基色。黑色与白色同属索引 7。
const ACI_BASE_COLORS: [(u8, [u8; 3]); 8] = [
    (1, [255, 0, 0]),
    (2, [255, 255, 0]),
    (3, [0, 255, 0]),
    (4, [0, 255, 255]),
    (5, [0, 0, 255]),
    (6, [255, 0, 255]),
    (7, [255, 255, 255]),
    (7, [0, 0, 0]),
];

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// 解析 `#rgb`、`#rrggbb` 或 `#rrggbbaa`。
    pub fn from_hex(value: &str) -> Result<Self, EngineError> {
        let invalid = || EngineError::InvalidColor(value.to_string());
        let digits = value.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };
        let short = |index: usize| channel(index..index + 1).map(|value| value * 17);
        match digits.len() {
            3 => Ok(Color::rgb(short(0)?, short(1)?, short(2)?)),
            6 => Ok(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Color::rgba(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(invalid()),
        }
    }

    /// `#rrggbb`，透明度单独由 [`Color::opacity`] 给出。
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    #[inline]
    pub fn opacity(self) -> f64 {
        f64::from(self.a) / 255.0
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// DXF 组码 420 使用的 24 位真彩色。
    #[inline]
    pub fn to_true_color(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// 欧氏距离最近的 AutoCAD 基色索引。
    pub fn nearest_aci(self) -> u8 {
        let distance = |rgb: [u8; 3]| {
            let dr = i32::from(self.r) - i32::from(rgb[0]);
            let dg = i32::from(self.g) - i32::from(rgb[1]);
            let db = i32::from(self.b) - i32::from(rgb[2]);
            dr * dr + dg * dg + db * db
        };
        ACI_BASE_COLORS
            .iter()
            .min_by_key(|(_, rgb)| distance(*rgb))
            .map(|(index, _)| *index)
            .unwrap_or(7)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl FromStr for Color {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            f.write_str(&self.to_hex())
        } else {
            write!(f, "{}{:02x}", self.to_hex(), self.a)
        }
    }
}

/// 选中与高亮时替换实体颜色的调色板。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub selected: Color,
    pub highlighted: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            selected: Color::rgb(0xff, 0x6a, 0x00),
            highlighted: Color::rgb(0x1e, 0x90, 0xff),
        }
    }
}

/// 控制器当前的线型。只影响之后绘制的图元。
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
    /// 虚线的实/空长度序列（世界单位），为空表示实线。
    pub dash: Vec<f64>,
    pub is_highlighted: bool,
    pub is_selected: bool,
}

impl LineStyle {
    pub fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            ..Self::default()
        }
    }

    /// 选中优先于高亮，两者都不成立时使用自身颜色。
    pub fn resolved_color(&self, palette: &Palette) -> Color {
        if self.is_selected {
            palette.selected
        } else if self.is_highlighted {
            palette.highlighted
        } else {
            self.color
        }
    }

    #[inline]
    pub fn is_dashed(&self) -> bool {
        self.dash.iter().any(|length| *length > 0.0)
    }
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            dash: Vec::new(),
            is_highlighted: false,
            is_selected: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Start,
    Middle,
    End,
}

/// 文字绘制参数：字高（世界单位）、旋转角（弧度，逆时针）与水平对齐。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOptions {
    pub height: f64,
    pub rotation: f64,
    pub align: TextAlign,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            height: 2.5,
            rotation: 0.0,
            align: TextAlign::Start,
        }
    }
}

/// 外部图像引用：文件路径或 data URI，附带像素尺寸。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub href: String,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl ImageSource {
    pub fn new(href: impl Into<String>, pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            href: href.into(),
            pixel_width,
            pixel_height,
        }
    }
}
