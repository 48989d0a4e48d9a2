use std::fmt;

use egui::{Color32, Pos2, Rect, Vec2};
use serde::{de::Visitor, Deserialize, Deserializer, Serialize, Serializer};

pub type MarkerId = u64;

/// Surface-local coordinate in displayed pixels, origin at the background's top-left corner.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_pos2(self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }

    pub fn offset(self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color([u8; 4]);

impl Color {
    pub const RED: Self = Self([0xFF, 0x00, 0x00, 0xFF]);

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Parses `#rrggbb` or `#rrggbbaa`. The leading `#` is optional.
    pub fn from_hex(value: &str) -> Option<Self> {
        let digits = value.trim().trim_start_matches('#');
        if !digits.is_ascii() || (digits.len() != 6 && digits.len() != 8) {
            return None;
        }
        let channel = |idx: usize| u8::from_str_radix(&digits[idx..idx + 2], 16).ok();
        let alpha = if digits.len() == 8 { channel(6)? } else { 0xFF };
        Some(Self([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }

    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 0xFF {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    pub fn as_array(self) -> [u8; 4] {
        self.0
    }

    pub fn with_opacity(self, opacity: f32) -> Self {
        let [r, g, b, a] = self.0;
        let alpha = (a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self([r, g, b, alpha])
    }

    pub fn to_color32(self) -> Color32 {
        let [r, g, b, a] = self.0;
        Color32::from_rgba_unmultiplied(r, g, b, a)
    }

    pub fn from_color32(value: Color32) -> Self {
        let [r, g, b, a] = value.to_srgba_unmultiplied();
        Self([r, g, b, a])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ColorVisitor;

        impl<'de> Visitor<'de> for ColorVisitor {
            type Value = Color;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("hex color such as \"#ff0000\"")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Color::from_hex(value)
                    .ok_or_else(|| E::custom(format!("invalid color '{value}'")))
            }
        }

        deserializer.deserialize_str(ColorVisitor)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Circle,
    Plus,
    Minus,
    Equal,
    Check,
    Vr,
    Vc,
    Ar,
    Ac,
    Kr,
    Kc,
    Ad,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 12] = [
        MarkerKind::Circle,
        MarkerKind::Plus,
        MarkerKind::Minus,
        MarkerKind::Equal,
        MarkerKind::Check,
        MarkerKind::Vr,
        MarkerKind::Vc,
        MarkerKind::Ar,
        MarkerKind::Ac,
        MarkerKind::Kr,
        MarkerKind::Kc,
        MarkerKind::Ad,
    ];

    /// Resolves a tool-selection code. Unknown codes, `erase` included, yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Equal => "equal",
            Self::Check => "check",
            Self::Vr => "vr",
            Self::Vc => "vc",
            Self::Ar => "ar",
            Self::Ac => "ac",
            Self::Kr => "kr",
            Self::Kc => "kc",
            Self::Ad => "ad",
        }
    }

    /// Text drawn for glyph markers; `None` for the filled circle.
    pub fn glyph(self) -> Option<&'static str> {
        match self {
            Self::Circle => None,
            Self::Plus => Some("+"),
            Self::Minus => Some("-"),
            Self::Equal => Some("="),
            Self::Check => Some("✔"),
            Self::Vr => Some("VR"),
            Self::Vc => Some("VC"),
            Self::Ar => Some("AR"),
            Self::Ac => Some("AC"),
            Self::Kr => Some("KR"),
            Self::Kc => Some("KC"),
            Self::Ad => Some("AD"),
        }
    }
}

/// Positive/negative notes captured from the shared text inputs when a marker is placed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationText {
    pub positive: String,
    pub negative: String,
}

impl AnnotationText {
    pub fn new(positive: impl Into<String>, negative: impl Into<String>) -> Self {
        Self {
            positive: positive.into(),
            negative: negative.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub id: MarkerId,
    pub kind: MarkerKind,
    pub position: Point,
    pub color: Color,
    pub size: f32,
    pub text: AnnotationText,
}

impl Marker {
    pub fn bounds(&self) -> Rect {
        let origin = self.position.to_pos2();
        match self.kind.glyph() {
            None => Rect::from_min_size(origin, Vec2::splat(self.size)),
            Some(glyph) => {
                // Rough advance estimate; good enough for click targets.
                let chars = glyph.chars().count().max(1) as f32;
                let width = (chars * self.size * 0.6).max(self.size * 0.6);
                Rect::from_min_size(origin, Vec2::new(width, self.size * 1.2))
            }
        }
    }

    /// Exact hit test against the marker's visible region.
    pub fn contains(&self, point: Point) -> bool {
        match self.kind {
            MarkerKind::Circle => {
                let radius = self.size * 0.5;
                let center = self.position.offset(Vec2::splat(radius)).to_pos2();
                center.distance_sq(point.to_pos2()) <= radius * radius
            }
            _ => self.bounds().contains(point.to_pos2()),
        }
    }

    pub fn tooltip(&self) -> String {
        format!(
            "Positive Adj: {}, Negative Adj: {}",
            self.text.positive, self.text.negative
        )
    }
}

/// Appearance of a freehand stroke, fixed when the stroke starts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PenStyle {
    pub color: Color,
    pub opacity: f32,
    pub width: f32,
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            color: Color::rgba(0xFF, 0xEB, 0x3B, 0xFF),
            opacity: 0.4,
            width: 14.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stroke {
    pub points: Vec<Point>,
    pub color: Color,
    pub opacity: f32,
    pub width: f32,
}

impl Stroke {
    pub fn start(at: Point, pen: PenStyle) -> Self {
        Self {
            points: vec![at],
            color: pen.color,
            opacity: pen.opacity.clamp(0.0, 1.0),
            width: pen.width.max(0.5),
        }
    }

    pub fn paint_color(&self) -> Color {
        self.color.with_opacity(self.opacity)
    }
}

#[cfg(test)]
mod tests {
    use super::{AnnotationText, Color, Marker, MarkerKind, PenStyle, Point, Stroke};

    fn marker(kind: MarkerKind, size: f32) -> Marker {
        Marker {
            id: 1,
            kind,
            position: Point::new(100.0, 100.0),
            color: Color::RED,
            size,
            text: AnnotationText::default(),
        }
    }

    #[test]
    fn marker_codes_resolve_and_erase_is_rejected() {
        for kind in MarkerKind::ALL {
            assert_eq!(MarkerKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(MarkerKind::from_code("erase"), None);
        assert_eq!(MarkerKind::from_code("CIRCLE"), None);
        assert_eq!(MarkerKind::from_code(""), None);
    }

    #[test]
    fn color_hex_parses_and_formats() {
        assert_eq!(Color::from_hex("#ff0000"), Some(Color::RED));
        assert_eq!(Color::from_hex("FF0000"), Some(Color::RED));
        assert_eq!(
            Color::from_hex("#11223380").map(Color::as_array),
            Some([0x11, 0x22, 0x33, 0x80])
        );
        assert_eq!(Color::from_hex("#ff00"), None);
        assert_eq!(Color::from_hex("#gg0000"), None);
        assert_eq!(Color::RED.to_hex(), "#ff0000");
        assert_eq!(Color::rgba(1, 2, 3, 4).to_hex(), "#01020304");
    }

    #[test]
    fn color_round_trips_through_serde() {
        let json = serde_json::to_string(&Color::RED).expect("serialize color");
        assert_eq!(json, "\"#ff0000\"");
        let parsed: Color = serde_json::from_str("\"#00ff00\"").expect("parse color");
        assert_eq!(parsed, Color::rgba(0, 255, 0, 255));
        assert!(serde_json::from_str::<Color>("\"blue\"").is_err());
    }

    #[test]
    fn circle_hit_test_is_the_disc_not_the_box() {
        let circle = marker(MarkerKind::Circle, 20.0);
        assert!(circle.contains(Point::new(110.0, 110.0)));
        assert!(circle.contains(Point::new(100.5, 110.0)));
        // Box corner lies outside the disc.
        assert!(!circle.contains(Point::new(100.5, 100.5)));
        assert!(!circle.contains(Point::new(130.0, 110.0)));
    }

    #[test]
    fn glyph_hit_test_uses_text_box() {
        let glyph = marker(MarkerKind::Vr, 20.0);
        let bounds = glyph.bounds();
        assert_eq!(bounds.width(), 24.0);
        assert_eq!(bounds.height(), 24.0);
        assert!(glyph.contains(Point::new(123.0, 123.0)));
        assert!(!glyph.contains(Point::new(125.0, 110.0)));
    }

    #[test]
    fn tooltip_lists_both_notes() {
        let mut glyph = marker(MarkerKind::Plus, 16.0);
        glyph.text = AnnotationText::new("warm", "dusty");
        assert_eq!(glyph.tooltip(), "Positive Adj: warm, Negative Adj: dusty");
    }

    #[test]
    fn stroke_start_clamps_pen() {
        let stroke = Stroke::start(
            Point::new(1.0, 2.0),
            PenStyle {
                color: Color::RED,
                opacity: 3.0,
                width: 0.0,
            },
        );
        assert_eq!(stroke.points, vec![Point::new(1.0, 2.0)]);
        assert_eq!(stroke.opacity, 1.0);
        assert_eq!(stroke.width, 0.5);
        assert_eq!(stroke.paint_color(), Color::RED);
    }
}
