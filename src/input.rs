use egui::Pos2;

use crate::annotation::MarkerId;
use crate::geometry::{BackgroundDisplay, SurfaceGeometryTracker};
use crate::store::{AnnotationStore, MarkerRequest, StrokeHandle};
use crate::tools::ToolInputs;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Place,
    Erase,
    Highlight,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Place => "Place",
            Self::Erase => "Erase",
            Self::Highlight => "Highlight",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureOutcome {
    Ignored,
    Placed(MarkerId),
    Erased(MarkerId),
    StrokeStarted,
    StrokeExtended,
    StrokeEnded,
}

/// Routes pointer gestures to the annotation store according to the active mode.
#[derive(Debug, Default)]
pub struct InputController {
    mode: InputMode,
    stroke: Option<StrokeHandle>,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn stroke_in_progress(&self) -> bool {
        self.stroke.is_some()
    }

    pub fn set_mode(&mut self, mode: InputMode, store: &mut AnnotationStore) {
        if mode == self.mode {
            return;
        }
        if self.mode == InputMode::Highlight {
            self.finish_stroke(store);
        }
        tracing::debug!(from = ?self.mode, to = ?mode, "input mode changed");
        self.mode = mode;
    }

    pub fn toggle_erase(&mut self, store: &mut AnnotationStore) {
        let next = if self.mode == InputMode::Erase {
            InputMode::Place
        } else {
            InputMode::Erase
        };
        self.set_mode(next, store);
    }

    pub fn toggle_highlight(&mut self, store: &mut AnnotationStore) {
        let next = if self.mode == InputMode::Highlight {
            InputMode::Place
        } else {
            InputMode::Highlight
        };
        self.set_mode(next, store);
    }

    /// Places a marker from the current tool inputs unless erasing.
    pub fn place_marker<D: BackgroundDisplay>(
        &self,
        screen: Pos2,
        store: &mut AnnotationStore,
        geometry: &SurfaceGeometryTracker<D>,
        tools: &dyn ToolInputs,
    ) -> GestureOutcome {
        if self.mode == InputMode::Erase {
            return GestureOutcome::Ignored;
        }
        let Some(position) = geometry.to_local(screen) else {
            return GestureOutcome::Ignored;
        };
        let request = MarkerRequest {
            position,
            kind_code: tools.kind_code().to_string(),
            color: tools.color(),
            size: tools.size(),
            text: tools.annotation_text(),
        };
        store
            .place_marker(request)
            .map(|marker| GestureOutcome::Placed(marker.id))
            .unwrap_or(GestureOutcome::Ignored)
    }

    pub fn pointer_down<D: BackgroundDisplay>(
        &mut self,
        screen: Pos2,
        store: &mut AnnotationStore,
        geometry: &SurfaceGeometryTracker<D>,
        tools: &dyn ToolInputs,
    ) -> GestureOutcome {
        let Some(position) = geometry.to_local(screen) else {
            return GestureOutcome::Ignored;
        };

        match self.mode {
            InputMode::Highlight => {
                self.finish_stroke(store);
                debug_assert!(!store.has_open_stroke());
                self.stroke = Some(store.begin_stroke(position, tools.pen()));
                GestureOutcome::StrokeStarted
            }
            InputMode::Erase => store
                .remove_marker_at(position)
                .map(GestureOutcome::Erased)
                .unwrap_or(GestureOutcome::Ignored),
            InputMode::Place => self.place_marker(screen, store, geometry, tools),
        }
    }

    pub fn pointer_move<D: BackgroundDisplay>(
        &mut self,
        screen: Pos2,
        store: &mut AnnotationStore,
        geometry: &SurfaceGeometryTracker<D>,
    ) -> GestureOutcome {
        let Some(handle) = self.stroke.as_ref() else {
            return GestureOutcome::Ignored;
        };
        let Some(position) = geometry.to_local_unclamped(screen) else {
            return GestureOutcome::Ignored;
        };
        store.extend_stroke(handle, position);
        GestureOutcome::StrokeExtended
    }

    pub fn pointer_up(&mut self, store: &mut AnnotationStore) -> GestureOutcome {
        if self.finish_stroke(store) {
            GestureOutcome::StrokeEnded
        } else {
            GestureOutcome::Ignored
        }
    }

    /// Global release: the pointer left the window or the gesture was lost.
    pub fn pointer_left(&mut self, store: &mut AnnotationStore) -> GestureOutcome {
        self.pointer_up(store)
    }

    pub fn clear_all(&mut self, store: &mut AnnotationStore) {
        self.finish_stroke(store);
        store.clear_all();
    }

    fn finish_stroke(&mut self, store: &mut AnnotationStore) -> bool {
        match self.stroke.take() {
            Some(handle) => {
                let points = store.stroke(&handle).map_or(0, |stroke| stroke.points.len());
                tracing::trace!(stroke = handle.id(), points, "ending stroke");
                store.end_stroke(handle);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use egui::{Pos2, Rect};

    use super::{GestureOutcome, InputController, InputMode};
    use crate::annotation::{AnnotationText, Color, PenStyle};
    use crate::geometry::{DisplayedBackground, SurfaceGeometryTracker};
    use crate::store::AnnotationStore;
    use crate::tools::ToolInputs;

    struct FixedTools {
        kind: &'static str,
    }

    impl ToolInputs for FixedTools {
        fn kind_code(&self) -> &str {
            self.kind
        }

        fn color(&self) -> Color {
            Color::RED
        }

        fn size(&self) -> f32 {
            20.0
        }

        fn annotation_text(&self) -> AnnotationText {
            AnnotationText::new("pos", "neg")
        }

        fn pen(&self) -> PenStyle {
            PenStyle::default()
        }
    }

    fn surface() -> SurfaceGeometryTracker<DisplayedBackground> {
        let mut geometry = SurfaceGeometryTracker::new(DisplayedBackground::default());
        geometry
            .display_mut()
            .set_layout(Rect::from_min_size(Pos2::new(100.0, 100.0), egui::vec2(400.0, 300.0)));
        geometry.recompute();
        geometry
    }

    const CIRCLE: FixedTools = FixedTools { kind: "circle" };

    #[test]
    fn place_mode_is_default_and_places_in_local_space() {
        let geometry = surface();
        let mut store = AnnotationStore::new();
        let mut input = InputController::new();
        assert_eq!(input.mode(), InputMode::Place);

        let outcome = input.pointer_down(Pos2::new(150.0, 180.0), &mut store, &geometry, &CIRCLE);
        assert!(matches!(outcome, GestureOutcome::Placed(_)));
        let marker = &store.markers()[0];
        assert_eq!((marker.position.x, marker.position.y), (50.0, 80.0));
        assert_eq!(marker.text, AnnotationText::new("pos", "neg"));
    }

    #[test]
    fn stacking_is_allowed_in_place_mode() {
        let geometry = surface();
        let mut store = AnnotationStore::new();
        let mut input = InputController::new();
        let at = Pos2::new(150.0, 150.0);
        input.pointer_down(at, &mut store, &geometry, &CIRCLE);
        input.pointer_down(at, &mut store, &geometry, &CIRCLE);
        assert_eq!(store.marker_count(), 2);
    }

    #[test]
    fn erase_removes_only_the_hit_marker() {
        let geometry = surface();
        let mut store = AnnotationStore::new();
        let mut input = InputController::new();
        input.pointer_down(Pos2::new(150.0, 150.0), &mut store, &geometry, &CIRCLE);
        input.pointer_down(Pos2::new(300.0, 300.0), &mut store, &geometry, &CIRCLE);
        let keep = store.markers()[1].id;

        input.toggle_erase(&mut store);
        assert_eq!(input.mode(), InputMode::Erase);

        let miss = input.pointer_down(Pos2::new(450.0, 120.0), &mut store, &geometry, &CIRCLE);
        assert_eq!(miss, GestureOutcome::Ignored);
        assert_eq!(store.marker_count(), 2);

        let hit = input.pointer_down(Pos2::new(160.0, 160.0), &mut store, &geometry, &CIRCLE);
        assert!(matches!(hit, GestureOutcome::Erased(_)));
        assert_eq!(store.marker_count(), 1);
        assert_eq!(store.markers()[0].id, keep);
    }

    #[test]
    fn erase_mode_blocks_direct_placement() {
        let geometry = surface();
        let mut store = AnnotationStore::new();
        let mut input = InputController::new();
        input.set_mode(InputMode::Erase, &mut store);
        let outcome = input.place_marker(Pos2::new(150.0, 150.0), &mut store, &geometry, &CIRCLE);
        assert_eq!(outcome, GestureOutcome::Ignored);
        assert_eq!(store.marker_count(), 0);
    }

    #[test]
    fn invalid_kind_is_a_silent_no_op() {
        let geometry = surface();
        let mut store = AnnotationStore::new();
        let mut input = InputController::new();
        let erase_code = FixedTools { kind: "erase" };
        let outcome = input.pointer_down(Pos2::new(150.0, 150.0), &mut store, &geometry, &erase_code);
        assert_eq!(outcome, GestureOutcome::Ignored);
        assert_eq!(store.marker_count(), 0);
    }

    #[test]
    fn gestures_without_surface_do_nothing() {
        let geometry = SurfaceGeometryTracker::new(DisplayedBackground::default());
        let mut store = AnnotationStore::new();
        let mut input = InputController::new();
        for mode in [InputMode::Place, InputMode::Erase, InputMode::Highlight] {
            input.set_mode(mode, &mut store);
            let outcome = input.pointer_down(Pos2::new(10.0, 10.0), &mut store, &geometry, &CIRCLE);
            assert_eq!(outcome, GestureOutcome::Ignored);
        }
        assert!(store.is_empty());
    }

    #[test]
    fn highlight_gesture_builds_one_stroke() {
        let geometry = surface();
        let mut store = AnnotationStore::new();
        let mut input = InputController::new();
        input.toggle_highlight(&mut store);

        assert_eq!(
            input.pointer_down(Pos2::new(110.0, 110.0), &mut store, &geometry, &CIRCLE),
            GestureOutcome::StrokeStarted
        );
        for x in [120.0, 130.0, 600.0] {
            assert_eq!(
                input.pointer_move(Pos2::new(x, 110.0), &mut store, &geometry),
                GestureOutcome::StrokeExtended
            );
        }
        assert_eq!(input.pointer_up(&mut store), GestureOutcome::StrokeEnded);
        assert_eq!(
            input.pointer_move(Pos2::new(140.0, 110.0), &mut store, &geometry),
            GestureOutcome::Ignored
        );

        let stroke = store.strokes().next().expect("stroke recorded");
        assert_eq!(stroke.points.len(), 4);
        assert_eq!(stroke.points[3].x, 500.0);
        assert_eq!(store.marker_count(), 0);
    }

    #[test]
    fn pointer_leaving_ends_open_stroke() {
        let geometry = surface();
        let mut store = AnnotationStore::new();
        let mut input = InputController::new();
        input.set_mode(InputMode::Highlight, &mut store);
        input.pointer_down(Pos2::new(110.0, 110.0), &mut store, &geometry, &CIRCLE);
        assert!(input.stroke_in_progress());

        assert_eq!(input.pointer_left(&mut store), GestureOutcome::StrokeEnded);
        assert!(!input.stroke_in_progress());
        assert!(!store.has_open_stroke());
        assert_eq!(input.pointer_left(&mut store), GestureOutcome::Ignored);
    }

    #[test]
    fn switching_modes_keeps_annotations() {
        let geometry = surface();
        let mut store = AnnotationStore::new();
        let mut input = InputController::new();
        input.pointer_down(Pos2::new(150.0, 150.0), &mut store, &geometry, &CIRCLE);
        input.toggle_highlight(&mut store);
        input.pointer_down(Pos2::new(110.0, 110.0), &mut store, &geometry, &CIRCLE);

        input.toggle_erase(&mut store);
        assert!(!input.stroke_in_progress());
        input.toggle_erase(&mut store);
        assert_eq!(input.mode(), InputMode::Place);

        assert_eq!(store.marker_count(), 1);
        assert_eq!(store.stroke_count(), 1);
    }

    #[test]
    fn clear_all_during_stroke_leaves_clean_state() {
        let geometry = surface();
        let mut store = AnnotationStore::new();
        let mut input = InputController::new();
        input.set_mode(InputMode::Highlight, &mut store);
        input.pointer_down(Pos2::new(110.0, 110.0), &mut store, &geometry, &CIRCLE);

        input.clear_all(&mut store);

        assert!(store.is_empty());
        assert!(!input.stroke_in_progress());
        assert_eq!(
            input.pointer_move(Pos2::new(120.0, 120.0), &mut store, &geometry),
            GestureOutcome::Ignored
        );
    }
}
