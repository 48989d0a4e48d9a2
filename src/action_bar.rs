use egui::{vec2, Align, Layout, RichText, Ui};

use crate::export::ExportTarget;
use crate::state::EditorState;
use crate::theme::AppTheme;
use crate::ui_controls;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ActionBarOutput {
    pub export: Option<ExportTarget>,
}

pub fn can_export(has_background: bool, export_pending: bool) -> bool {
    has_background && !export_pending
}

pub fn status_line(state: &EditorState) -> String {
    let markers = state.store.marker_count();
    let strokes = state.store.stroke_count();
    format!(
        "{} · {markers} marker{} · {strokes} stroke{}",
        state.mode().label(),
        if markers == 1 { "" } else { "s" },
        if strokes == 1 { "" } else { "s" },
    )
}

pub fn show_action_bar(
    ui: &mut Ui,
    state: &mut EditorState,
    theme: &AppTheme,
    export_pending: bool,
    status: Option<&str>,
) -> ActionBarOutput {
    let action_h = theme.layout.chip_h + 4.0;
    let enabled = can_export(state.background.is_some(), export_pending);
    let mut out = ActionBarOutput::default();

    ui.horizontal_centered(|ui| {
        ui.label(RichText::new(status_line(state)).color(theme.text.secondary));
        if let Some(status) = status {
            ui.add_space(theme.layout.space_3);
            ui.label(RichText::new(status).color(theme.text.muted));
        }

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            let document = ui.add_enabled_ui(enabled, |ui| {
                ui_controls::primary_button(ui, theme, "Export PDF", vec2(112.0, action_h))
            });
            if document.inner.clicked() {
                out.export = Some(ExportTarget::Document);
            }

            let image = ui.add_enabled_ui(enabled, |ui| {
                ui_controls::ghost_button(ui, theme, "Export PNG", vec2(112.0, action_h))
            });
            if image.inner.clicked() {
                out.export = Some(ExportTarget::Image);
            }

            ui.add_space(theme.layout.space_3);
            ui.checkbox(&mut state.include_footer, "Include notes footer");
        });
    });

    out
}
