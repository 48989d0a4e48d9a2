use egui::{vec2, Align, ComboBox, Layout, Slider, Ui};

use crate::annotation::{Color, MarkerKind};
use crate::input::InputMode;
use crate::state::EditorState;
use crate::theme::AppTheme;
use crate::ui_controls;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ToolbarOutput {
    pub pick_catalog: Option<usize>,
    pub upload: bool,
    pub clear_all: bool,
}

pub fn kind_label(kind: MarkerKind) -> String {
    match kind.glyph() {
        None => format!("● {}", kind.code()),
        Some(glyph) if glyph.eq_ignore_ascii_case(kind.code()) => glyph.to_string(),
        Some(glyph) => format!("{glyph} {}", kind.code()),
    }
}

/// Which mode chips render as pressed.
pub fn chip_states(mode: InputMode) -> (bool, bool) {
    (mode == InputMode::Erase, mode == InputMode::Highlight)
}

pub fn show_toolbar(ui: &mut Ui, state: &mut EditorState, theme: &AppTheme) -> ToolbarOutput {
    let mut out = ToolbarOutput::default();

    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing = vec2(theme.layout.space_2, theme.layout.space_1);

        render_background_group(ui, state, &mut out);
        ui.separator();
        render_marker_group(ui, state);
        ui.separator();
        render_mode_group(ui, state, theme);

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            let enabled = !state.store.is_empty();
            let clear = ui.add_enabled_ui(enabled, |ui| {
                ui_controls::ghost_button(ui, theme, "Clear all", vec2(92.0, theme.layout.chip_h))
            });
            if clear.inner.clicked() {
                out.clear_all = true;
            }
        });
    });

    out
}

fn render_background_group(ui: &mut Ui, state: &EditorState, out: &mut ToolbarOutput) {
    let selected = state
        .background
        .as_ref()
        .map(|background| background.label.clone())
        .unwrap_or_else(|| "Choose background…".to_string());

    ComboBox::from_id_source("background_catalog")
        .selected_text(selected)
        .width(170.0)
        .show_ui(ui, |ui| {
            if state.config.backgrounds.is_empty() {
                ui.label("No backgrounds configured");
            }
            for (idx, entry) in state.config.backgrounds.iter().enumerate() {
                if ui.selectable_label(false, &entry.label).clicked() {
                    out.pick_catalog = Some(idx);
                }
            }
        });

    if ui.button("Upload…").on_hover_text("Use an image file as background").clicked() {
        out.upload = true;
    }
}

fn render_marker_group(ui: &mut Ui, state: &mut EditorState) {
    let current = state.tools.selected_kind();
    let selected = current
        .map(kind_label)
        .unwrap_or_else(|| state.tools.kind_code.clone());

    ComboBox::from_id_source("marker_kind")
        .selected_text(selected)
        .width(96.0)
        .show_ui(ui, |ui| {
            for kind in MarkerKind::ALL {
                if ui
                    .selectable_label(current == Some(kind), kind_label(kind))
                    .clicked()
                {
                    state.tools.select_kind(kind);
                }
            }
        });

    let mut color = state.tools.color.to_color32();
    if ui.color_edit_button_srgba(&mut color).changed() {
        state.tools.color = Color::from_color32(color);
    }

    let (min, max) = state.tools.size_range;
    ui.add(Slider::new(&mut state.tools.size, min..=max).text("Size"));
}

fn render_mode_group(ui: &mut Ui, state: &mut EditorState, theme: &AppTheme) {
    let (erasing, highlighting) = chip_states(state.mode());

    if ui_controls::mode_chip(ui, theme, "Erase", erasing)
        .on_hover_text("Click a marker to remove it")
        .clicked()
    {
        state.toggle_erase();
    }
    if ui_controls::mode_chip(ui, theme, "Highlight", highlighting)
        .on_hover_text("Draw freehand over the background")
        .clicked()
    {
        state.toggle_highlight();
    }

    if state.mode() != InputMode::Highlight {
        return;
    }

    let mut pen_color = state.tools.pen.color.to_color32();
    if ui.color_edit_button_srgba(&mut pen_color).changed() {
        state.tools.pen.color = Color::from_color32(pen_color);
    }
    ui.add(Slider::new(&mut state.tools.pen.opacity, 0.05..=1.0).text("Opacity"));
    ui.add(Slider::new(&mut state.tools.pen.width, 1.0..=60.0).text("Width"));
}
