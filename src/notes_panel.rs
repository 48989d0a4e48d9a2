use egui::{TextEdit, Ui};

use crate::state::EditorState;
use crate::theme::AppTheme;
use crate::ui_controls;

const FIELD_ROWS: usize = 4;

/// Adjustment and notes text. Marker text is copied from here at placement time.
pub fn show_notes_panel(ui: &mut Ui, state: &mut EditorState, theme: &AppTheme) {
    let width = ui.available_width();

    ui_controls::section_label(ui, theme, "Positive Adj");
    ui.add(
        TextEdit::multiline(&mut state.tools.positive)
            .desired_rows(FIELD_ROWS)
            .desired_width(width)
            .hint_text("What helps"),
    );
    ui.add_space(theme.layout.space_3);

    ui_controls::section_label(ui, theme, "Negative Adj");
    ui.add(
        TextEdit::multiline(&mut state.tools.negative)
            .desired_rows(FIELD_ROWS)
            .desired_width(width)
            .hint_text("What hurts"),
    );
    ui.add_space(theme.layout.space_3);

    ui_controls::section_label(ui, theme, "Notes");
    ui.add(
        TextEdit::multiline(&mut state.tools.notes)
            .desired_rows(FIELD_ROWS * 2)
            .desired_width(width)
            .hint_text("Only exported when not empty"),
    );
}
