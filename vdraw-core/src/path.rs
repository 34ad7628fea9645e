use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::curve::{EllipticalArc, flatten_arc, flatten_cubic, flatten_quadratic};
use crate::geometry::{LineSegment, Point2, Vector2};

/// 闭合判定时视为同一点的距离。
const CLOSE_EPSILON: f64 = 1e-9;

/// 一条路径指令：指令字母及其后跟随的全部数值参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathCommand {
    pub letter: char,
    pub args: Vec<f64>,
}

impl PathCommand {
    #[inline]
    pub fn is_relative(&self) -> bool {
        self.letter.is_ascii_lowercase()
    }

    /// 每组参数的个数；不支持的指令返回 `None`。
    pub fn arity(&self) -> Option<usize> {
        match self.letter.to_ascii_uppercase() {
            'M' | 'L' => Some(2),
            'H' | 'V' => Some(1),
            'C' => Some(6),
            'Q' => Some(4),
            'A' => Some(7),
            'Z' => Some(0),
            _ => None,
        }
    }
}

/// 将路径字符串切分为指令序列。不校验参数个数。
pub fn tokenize(path: &str) -> Vec<PathCommand> {
    PathLexer::new(path).run()
}

fn is_command_letter(byte: u8) -> bool {
    byte.is_ascii_alphabetic() && byte != b'e' && byte != b'E'
}

struct PathLexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PathLexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn run(mut self) -> Vec<PathCommand> {
        let mut commands = Vec::new();
        // 第一个指令字母之前的内容没有归属，直接跳过
        while self.pos < self.bytes.len() && !is_command_letter(self.bytes[self.pos]) {
            self.pos += 1;
        }
        while self.pos < self.bytes.len() {
            let letter = char::from(self.bytes[self.pos]);
            self.pos += 1;
            let args = self.arguments();
            commands.push(PathCommand { letter, args });
        }
        commands
    }

    fn arguments(&mut self) -> Vec<f64> {
        let mut args = Vec::new();
        while let Some(&byte) = self.bytes.get(self.pos) {
            if is_command_letter(byte) {
                break;
            }
            match byte {
                b'0'..=b'9' | b'.' | b'+' | b'-' => match self.number() {
                    Some(value) => args.push(value),
                    None => self.pos += 1,
                },
                _ => self.pos += 1,
            }
        }
        args
    }

    /// 读取一个数值：可选符号、整数部分、小数部分、指数。
    /// 第二个小数点或新的符号都会开启下一个数值。
    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        let mut cursor = self.pos;
        if matches!(self.bytes.get(cursor), Some(b'+' | b'-')) {
            cursor += 1;
        }
        let mut digits = 0;
        while matches!(self.bytes.get(cursor), Some(b'0'..=b'9')) {
            cursor += 1;
            digits += 1;
        }
        if self.bytes.get(cursor) == Some(&b'.') {
            cursor += 1;
            while matches!(self.bytes.get(cursor), Some(b'0'..=b'9')) {
                cursor += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            return None;
        }
        if matches!(self.bytes.get(cursor), Some(b'e' | b'E')) {
            let mut exp = cursor + 1;
            if matches!(self.bytes.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            let exp_digits_start = exp;
            while matches!(self.bytes.get(exp), Some(b'0'..=b'9')) {
                exp += 1;
            }
            if exp > exp_digits_start {
                cursor = exp;
            } else {
                // 孤立的 e 不属于数值；跳过它，避免被当作指令字母
                let value = self.source[start..cursor].parse::<f64>().ok();
                self.pos = cursor + 1;
                return value;
            }
        }
        self.pos = cursor;
        self.source[start..cursor].parse::<f64>().ok()
    }
}

/// 线段化过程中的非致命问题。出现后该指令（或其残余参数）被丢弃，处理继续。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathDiagnostic {
    UnsupportedCommand {
        letter: char,
        index: usize,
    },
    MissingArguments {
        letter: char,
        index: usize,
        expected: usize,
        found: usize,
    },
    TrailingArguments {
        letter: char,
        index: usize,
        count: usize,
    },
}

impl fmt::Display for PathDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathDiagnostic::UnsupportedCommand { letter, index } => {
                write!(f, "unsupported path command '{letter}' at command #{index}")
            }
            PathDiagnostic::MissingArguments {
                letter,
                index,
                expected,
                found,
            } => write!(
                f,
                "path command '{letter}' at #{index} expects {expected} arguments, found {found}"
            ),
            PathDiagnostic::TrailingArguments {
                letter,
                index,
                count,
            } => write!(
                f,
                "discarded {count} trailing arguments of path command '{letter}' at #{index}"
            ),
        }
    }
}

/// 诊断信息的接收端。
pub trait PathDiagnostics {
    fn report(&mut self, diagnostic: PathDiagnostic);
}

impl PathDiagnostics for Vec<PathDiagnostic> {
    fn report(&mut self, diagnostic: PathDiagnostic) {
        self.push(diagnostic);
    }
}

/// 默认接收端：以 `warn` 级别写入 tracing。
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl PathDiagnostics for TracingDiagnostics {
    fn report(&mut self, diagnostic: PathDiagnostic) {
        warn!(%diagnostic, "路径指令已跳过");
    }
}

/// 将路径字符串转换为直线段序列，问题写入 tracing。
pub fn segmentize(path: &str, tolerance: f64) -> Vec<LineSegment> {
    segmentize_with(path, tolerance, &mut TracingDiagnostics)
}

/// 同 [`segmentize`]，诊断信息交给指定接收端。
pub fn segmentize_with(
    path: &str,
    tolerance: f64,
    diagnostics: &mut dyn PathDiagnostics,
) -> Vec<LineSegment> {
    let mut segmentizer = PathSegmentizer::new(tolerance, diagnostics);
    for (index, command) in tokenize(path).iter().enumerate() {
        segmentizer.apply(index, command);
    }
    segmentizer.segments
}

struct PathSegmentizer<'d> {
    tolerance: f64,
    diagnostics: &'d mut dyn PathDiagnostics,
    current: Point2,
    subpath_start: Point2,
    segments: Vec<LineSegment>,
}

impl<'d> PathSegmentizer<'d> {
    fn new(tolerance: f64, diagnostics: &'d mut dyn PathDiagnostics) -> Self {
        Self {
            tolerance,
            diagnostics,
            current: Point2::ORIGIN,
            subpath_start: Point2::ORIGIN,
            segments: Vec::new(),
        }
    }

    fn apply(&mut self, index: usize, command: &PathCommand) {
        let letter = command.letter;
        let Some(arity) = command.arity() else {
            self.diagnostics
                .report(PathDiagnostic::UnsupportedCommand { letter, index });
            return;
        };

        if arity == 0 {
            if !command.args.is_empty() {
                self.diagnostics.report(PathDiagnostic::TrailingArguments {
                    letter,
                    index,
                    count: command.args.len(),
                });
            }
            self.close_path();
            return;
        }

        let groups = command.args.chunks_exact(arity);
        let remainder = groups.remainder().len();
        if command.args.len() < arity {
            self.diagnostics.report(PathDiagnostic::MissingArguments {
                letter,
                index,
                expected: arity,
                found: command.args.len(),
            });
            return;
        }
        if remainder > 0 {
            self.diagnostics.report(PathDiagnostic::TrailingArguments {
                letter,
                index,
                count: remainder,
            });
        }

        let relative = command.is_relative();
        for (group_index, args) in groups.enumerate() {
            let kind = match letter.to_ascii_uppercase() {
                // 紧随 M 的坐标对按隐式 L 处理
                'M' if group_index > 0 => 'L',
                other => other,
            };
            self.apply_group(kind, relative, args);
        }
    }

    fn resolve(&self, relative: bool, x: f64, y: f64) -> Point2 {
        if relative {
            self.current.translate(Vector2::new(x, y))
        } else {
            Point2::new(x, y)
        }
    }

    fn apply_group(&mut self, kind: char, relative: bool, args: &[f64]) {
        match kind {
            'M' => {
                let target = self.resolve(relative, args[0], args[1]);
                self.current = target;
                self.subpath_start = target;
            }
            'L' => {
                let target = self.resolve(relative, args[0], args[1]);
                self.line_to(target);
            }
            'H' => {
                let x = if relative {
                    self.current.x() + args[0]
                } else {
                    args[0]
                };
                self.line_to(Point2::new(x, self.current.y()));
            }
            'V' => {
                let y = if relative {
                    self.current.y() + args[0]
                } else {
                    args[0]
                };
                self.line_to(Point2::new(self.current.x(), y));
            }
            'C' => {
                let c1 = self.resolve(relative, args[0], args[1]);
                let c2 = self.resolve(relative, args[2], args[3]);
                let end = self.resolve(relative, args[4], args[5]);
                let points = flatten_cubic(self.current, c1, c2, end, self.tolerance);
                self.push_polyline(&points, end);
            }
            'Q' => {
                let control = self.resolve(relative, args[0], args[1]);
                let end = self.resolve(relative, args[2], args[3]);
                let points = flatten_quadratic(self.current, control, end, self.tolerance);
                self.push_polyline(&points, end);
            }
            'A' => {
                let end = self.resolve(relative, args[5], args[6]);
                let arc = EllipticalArc {
                    from: self.current,
                    to: end,
                    rx: args[0],
                    ry: args[1],
                    x_axis_rotation: args[2],
                    large_arc: args[3] != 0.0,
                    sweep: args[4] != 0.0,
                };
                let points = flatten_arc(&arc, self.tolerance);
                self.push_polyline(&points, end);
            }
            _ => {}
        }
    }

    fn line_to(&mut self, target: Point2) {
        self.segments
            .push(LineSegment::from_points(self.current, target));
        self.current = target;
    }

    fn push_polyline(&mut self, points: &[Point2], end: Point2) {
        self.segments.extend(
            points
                .windows(2)
                .map(|pair| LineSegment::from_points(pair[0], pair[1])),
        );
        self.current = end;
    }

    fn close_path(&mut self) {
        if self.current.distance(self.subpath_start) > CLOSE_EPSILON {
            self.segments
                .push(LineSegment::from_points(self.current, self.subpath_start));
        }
        self.current = self.subpath_start;
    }
}
