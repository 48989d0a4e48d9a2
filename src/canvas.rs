use egui::{
    Align2, Color32, Context, CursorIcon, FontId, Painter, Pos2, Rect, Response, Sense,
    Shape, Stroke, Ui, Vec2,
};

use crate::annotation::{Marker, MarkerKind};
use crate::export::{
    estimated_advance, footer_wrap_width, MetadataFooter, FOOTER_COLOR, FOOTER_FONT_SIZE,
    FOOTER_PADDING, FOOTER_RULE_WIDTH,
};
use crate::input::InputMode;
use crate::state::EditorState;
use crate::theme::AppTheme;

const CANVAS_MARGIN: f32 = 24.0;

/// Fits `image_size` inside `available`, centred, never upscaling past 1:1.
pub fn fit_rect(image_size: Vec2, available: Rect) -> Rect {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return Rect::NOTHING;
    }
    let room = (available.size() - Vec2::splat(CANVAS_MARGIN * 2.0)).max(Vec2::splat(1.0));
    let zoom = (room.x / image_size.x).min(room.y / image_size.y).min(1.0);
    Rect::from_center_size(available.center(), image_size * zoom)
}

pub fn show_canvas(ui: &mut Ui, ctx: &Context, state: &mut EditorState, theme: &AppTheme) {
    let Some((texture_id, image_size)) = state
        .background
        .as_mut()
        .map(|background| (background.ensure_texture(ctx), background.size_vec2()))
    else {
        state.geometry.display_mut().clear();
        state.geometry.recompute();
        empty_canvas(ui, theme);
        return;
    };

    let (canvas_rect, response) =
        ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    let image_rect = fit_rect(image_size, canvas_rect);

    state.geometry.display_mut().set_layout(image_rect);
    state.geometry.recompute();

    let painter = ui.painter_at(canvas_rect);
    painter.rect_filled(canvas_rect, theme.layout.rounding * 2.0, theme.surfaces.canvas_bg);
    painter.image(
        texture_id,
        image_rect,
        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );

    let surface = ui.painter_at(state.geometry.current_bounds().to_rect());
    draw_strokes(&surface, state);
    draw_markers(&surface, state);
    if let Some(footer) = state.footer.current() {
        draw_footer(&painter, footer, image_rect);
    }

    handle_pointer(ctx, state, &response, canvas_rect);
    if response.secondary_clicked() {
        if let Some(id) = response
            .interact_pointer_pos()
            .and_then(|pos| topmost_marker_at(state, pos))
            .map(|marker| marker.id)
        {
            state.remove_marker(id);
        }
    }
    show_marker_tooltip(ctx, state, response);
}

fn topmost_marker_at(state: &EditorState, screen: Pos2) -> Option<&Marker> {
    let local = state.geometry.to_local(screen)?;
    state
        .store
        .markers()
        .iter()
        .rev()
        .find(|marker| marker.contains(local))
}

fn empty_canvas(ui: &mut Ui, theme: &AppTheme) {
    let (rect, _) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, theme.layout.rounding * 2.0, theme.surfaces.canvas_bg);
    painter.rect_stroke(
        rect,
        theme.layout.rounding * 2.0,
        Stroke::new(1.0, theme.surfaces.stroke_soft),
    );
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        "Choose or upload a background to start",
        FontId::proportional(19.0),
        theme.text.secondary,
    );
}

fn draw_strokes(painter: &Painter, state: &EditorState) {
    for stroke in state.store.strokes() {
        let color = stroke.paint_color().to_color32();
        let points: Vec<Pos2> = stroke
            .points
            .iter()
            .map(|point| state.geometry.to_screen(*point))
            .collect();
        match points.as_slice() {
            [] => {}
            [dot] => {
                painter.circle_filled(*dot, stroke.width * 0.5, color);
            }
            _ => {
                painter.add(Shape::line(points, Stroke::new(stroke.width, color)));
            }
        }
    }
}

fn draw_markers(painter: &Painter, state: &EditorState) {
    for marker in state.store.markers() {
        draw_marker(painter, state, marker);
    }
}

fn draw_marker(painter: &Painter, state: &EditorState, marker: &Marker) {
    let origin = state.geometry.to_screen(marker.position);
    let color = marker.color.to_color32();
    match marker.kind {
        MarkerKind::Circle => {
            let radius = marker.size * 0.5;
            painter.circle_filled(origin + Vec2::splat(radius), radius, color);
        }
        kind => {
            let glyph = kind.glyph().unwrap_or_default();
            painter.text(
                origin,
                Align2::LEFT_TOP,
                glyph,
                FontId::proportional(marker.size),
                color,
            );
        }
    }
}

fn draw_footer(painter: &Painter, footer: &MetadataFooter, image_rect: Rect) {
    let layout = footer.layout(footer_wrap_width(image_rect.width()), &estimated_advance);
    let top = image_rect.bottom();
    let rule_y = top + layout.rule_y + FOOTER_RULE_WIDTH * 0.5;
    let red = FOOTER_COLOR.to_color32();
    painter.line_segment(
        [
            Pos2::new(image_rect.left(), rule_y),
            Pos2::new(image_rect.right(), rule_y),
        ],
        Stroke::new(FOOTER_RULE_WIDTH, red),
    );
    for line in &layout.lines {
        painter.text(
            Pos2::new(image_rect.left() + FOOTER_PADDING, top + line.y),
            Align2::LEFT_TOP,
            &line.text,
            FontId::proportional(FOOTER_FONT_SIZE),
            red,
        );
    }
}

fn handle_pointer(ctx: &Context, state: &mut EditorState, response: &Response, canvas_rect: Rect) {
    let (pressed, released, down, latest, has_pointer) = ctx.input(|input| {
        (
            input.pointer.primary_pressed(),
            input.pointer.primary_released(),
            input.pointer.primary_down(),
            input.pointer.latest_pos(),
            input.pointer.has_pointer(),
        )
    });

    if pressed && response.hovered() {
        if let Some(pos) = latest {
            state.pointer_down(pos);
        }
    } else if down && state.input.stroke_in_progress() {
        if let Some(pos) = latest {
            state.pointer_move(pos);
        }
    }

    if released {
        state.pointer_up();
    }

    let outside = latest.map_or(true, |pos| !canvas_rect.contains(pos));
    if state.input.stroke_in_progress() && (!has_pointer || outside) {
        state.pointer_left();
    }
}

fn show_marker_tooltip(ctx: &Context, state: &EditorState, response: Response) {
    let hovered = response
        .hover_pos()
        .and_then(|pos| topmost_marker_at(state, pos));

    let cursor = match (state.mode(), hovered.is_some()) {
        (InputMode::Erase, true) => CursorIcon::PointingHand,
        (InputMode::Erase, false) => CursorIcon::NotAllowed,
        (InputMode::Place | InputMode::Highlight, _) => CursorIcon::Crosshair,
    };
    if response.hovered() {
        ctx.set_cursor_icon(cursor);
    }

    if let Some(marker) = hovered {
        if !state.input.stroke_in_progress() {
            response.on_hover_text_at_pointer(marker.tooltip());
        }
    }
}
