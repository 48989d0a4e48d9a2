use egui::{vec2, Color32, Context, Rounding, Stroke, Visuals};

#[derive(Clone, Debug)]
pub struct AppTheme {
    pub surfaces: SurfaceTokens,
    pub text: TextTokens,
    pub layout: LayoutTokens,
}

#[derive(Clone, Debug)]
pub struct SurfaceTokens {
    pub app_bg: Color32,
    pub panel_bg: Color32,
    pub card_bg: Color32,
    pub canvas_bg: Color32,
    pub stroke_soft: Color32,
    pub accent: Color32,
    pub accent_soft: Color32,
    pub danger: Color32,
}

#[derive(Clone, Debug)]
pub struct TextTokens {
    pub primary: Color32,
    pub secondary: Color32,
    pub muted: Color32,
}

#[derive(Clone, Debug)]
pub struct LayoutTokens {
    pub space_1: f32,
    pub space_2: f32,
    pub space_3: f32,
    pub panel_padding: f32,
    pub toolbar_height: f32,
    pub action_bar_height: f32,
    pub notes_panel_width: f32,
    pub chip_h: f32,
    pub rounding: f32,
}

pub fn workbench_theme() -> AppTheme {
    AppTheme {
        surfaces: SurfaceTokens {
            app_bg: Color32::from_rgb(0x1A, 0x1C, 0x21),
            panel_bg: Color32::from_rgb(0x21, 0x23, 0x2A),
            card_bg: Color32::from_rgb(0x2A, 0x2D, 0x35),
            canvas_bg: Color32::from_rgb(0x14, 0x16, 0x1B),
            stroke_soft: Color32::from_rgba_unmultiplied(255, 255, 255, 30),
            accent: Color32::from_rgb(0x4D, 0x8D, 0xFF),
            accent_soft: Color32::from_rgb(0x2B, 0x41, 0x6B),
            danger: Color32::from_rgb(0xE5, 0x3E, 0x3E),
        },
        text: TextTokens {
            primary: Color32::from_rgb(0xF2, 0xF4, 0xF8),
            secondary: Color32::from_rgb(0xC0, 0xC6, 0xD2),
            muted: Color32::from_rgb(0x8A, 0x91, 0x9E),
        },
        layout: LayoutTokens {
            space_1: 4.0,
            space_2: 8.0,
            space_3: 12.0,
            panel_padding: 10.0,
            toolbar_height: 48.0,
            action_bar_height: 52.0,
            notes_panel_width: 280.0,
            chip_h: 28.0,
            rounding: 6.0,
        },
    }
}

pub fn apply_theme(ctx: &Context, theme: &AppTheme) {
    let mut visuals = Visuals::dark();
    visuals.panel_fill = theme.surfaces.panel_bg;
    visuals.window_fill = theme.surfaces.card_bg;
    visuals.extreme_bg_color = theme.surfaces.canvas_bg;
    visuals.selection.bg_fill = theme.surfaces.accent_soft;
    visuals.selection.stroke = Stroke::new(1.0, theme.surfaces.accent);
    visuals.error_fg_color = theme.surfaces.danger;
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, theme.surfaces.stroke_soft);
    visuals.widgets.inactive.rounding = Rounding::same(theme.layout.rounding);
    visuals.widgets.hovered.rounding = Rounding::same(theme.layout.rounding);
    visuals.widgets.active.rounding = Rounding::same(theme.layout.rounding);
    visuals.window_rounding = Rounding::same(theme.layout.rounding * 2.0);

    let mut style = (*ctx.style()).clone();
    style.visuals = visuals;
    style.spacing.item_spacing = vec2(theme.layout.space_2, theme.layout.space_2);
    style.spacing.button_padding = vec2(theme.layout.space_2, theme.layout.space_1);
    style.spacing.interact_size.y = theme.layout.chip_h;
    ctx.set_style(style);
}
