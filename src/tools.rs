use crate::annotation::{AnnotationText, Color, MarkerKind, PenStyle};
use crate::config::AppConfig;

/// Current values of the tool inputs, read at the moment of each gesture.
pub trait ToolInputs {
    fn kind_code(&self) -> &str;
    fn color(&self) -> Color;
    fn size(&self) -> f32;
    fn annotation_text(&self) -> AnnotationText;
    fn pen(&self) -> PenStyle;
}

/// Backing values for the toolbar and notes panel widgets.
#[derive(Clone, Debug)]
pub struct ToolSettings {
    pub kind_code: String,
    pub color: Color,
    pub size: f32,
    pub size_range: (f32, f32),
    pub positive: String,
    pub negative: String,
    pub notes: String,
    pub pen: PenStyle,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ToolSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let (min, max) = config.size_range();
        Self {
            kind_code: config.default_kind.clone(),
            color: config.default_color,
            size: config.default_size.clamp(min, max),
            size_range: (min, max),
            positive: String::new(),
            negative: String::new(),
            notes: String::new(),
            pen: config.pen,
        }
    }

    pub fn selected_kind(&self) -> Option<MarkerKind> {
        MarkerKind::from_code(&self.kind_code)
    }

    pub fn select_kind(&mut self, kind: MarkerKind) {
        self.kind_code = kind.code().to_string();
    }
}

impl ToolInputs for ToolSettings {
    fn kind_code(&self) -> &str {
        &self.kind_code
    }

    fn color(&self) -> Color {
        self.color
    }

    fn size(&self) -> f32 {
        self.size
    }

    fn annotation_text(&self) -> AnnotationText {
        AnnotationText::new(self.positive.clone(), self.negative.clone())
    }

    fn pen(&self) -> PenStyle {
        self.pen
    }
}
