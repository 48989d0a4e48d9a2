use anyhow::Result;
use egui::Pos2;

use crate::annotation::MarkerId;
use crate::background::BackgroundImage;
use crate::config::AppConfig;
use crate::export::{ExportAdapter, FooterSlot, LiveView, MetadataFooter, RasterHandle, Rasterizer};
use crate::geometry::{DisplayedBackground, SurfaceGeometryTracker};
use crate::input::{GestureOutcome, InputController, InputMode};
use crate::store::AnnotationStore;
use crate::tools::ToolSettings;

pub struct EditorState {
    pub config: AppConfig,
    pub background: Option<BackgroundImage>,
    pub geometry: SurfaceGeometryTracker<DisplayedBackground>,
    pub store: AnnotationStore,
    pub input: InputController,
    pub tools: ToolSettings,
    pub footer: FooterSlot,
    pub include_footer: bool,
}

impl EditorState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            tools: ToolSettings::from_config(&config),
            config,
            background: None,
            geometry: SurfaceGeometryTracker::new(DisplayedBackground::default()),
            store: AnnotationStore::new(),
            input: InputController::new(),
            footer: FooterSlot::default(),
            include_footer: true,
        }
    }

    /// Swaps the background. Annotations stay; the surface is re-measured once the
    /// canvas lays the new image out.
    pub fn set_background(&mut self, background: BackgroundImage) {
        tracing::info!(
            label = %background.label,
            width = background.pixels.width(),
            height = background.pixels.height(),
            "background ready"
        );
        self.background = Some(background);
        self.geometry.display_mut().clear();
        self.geometry.recompute();
    }

    pub fn mode(&self) -> InputMode {
        self.input.mode()
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.input.set_mode(mode, &mut self.store);
    }

    pub fn toggle_erase(&mut self) {
        self.input.toggle_erase(&mut self.store);
    }

    pub fn toggle_highlight(&mut self) {
        self.input.toggle_highlight(&mut self.store);
    }

    pub fn pointer_down(&mut self, screen: Pos2) -> GestureOutcome {
        let outcome = self
            .input
            .pointer_down(screen, &mut self.store, &self.geometry, &self.tools);
        log_outcome(outcome);
        outcome
    }

    pub fn pointer_move(&mut self, screen: Pos2) -> GestureOutcome {
        self.input
            .pointer_move(screen, &mut self.store, &self.geometry)
    }

    pub fn pointer_up(&mut self) -> GestureOutcome {
        let outcome = self.input.pointer_up(&mut self.store);
        log_outcome(outcome);
        outcome
    }

    pub fn pointer_left(&mut self) -> GestureOutcome {
        let outcome = self.input.pointer_left(&mut self.store);
        log_outcome(outcome);
        outcome
    }

    /// Removes one marker by id; unknown ids are a no-op.
    pub fn remove_marker(&mut self, id: MarkerId) -> bool {
        let kind = self.store.find_marker(id).map(|marker| marker.kind);
        let removed = self.store.remove_marker(id);
        if removed {
            tracing::debug!(marker = id, ?kind, "marker removed");
        }
        removed
    }

    pub fn clear_all(&mut self) {
        self.input.clear_all(&mut self.store);
        tracing::info!("cleared all annotations");
    }

    pub fn metadata_footer(&self) -> MetadataFooter {
        MetadataFooter {
            positive: self.tools.positive.clone(),
            negative: self.tools.negative.clone(),
            notes: self.tools.notes.clone(),
        }
    }

    pub fn export_snapshot<R: Rasterizer + ?Sized>(
        &mut self,
        with_footer: bool,
        rasterizer: &R,
    ) -> Result<RasterHandle> {
        let footer = with_footer.then(|| self.metadata_footer());
        let adapter = ExportAdapter::new(self.config.export_scale());
        adapter.export_snapshot(
            LiveView {
                bounds: self.geometry.current_bounds(),
                background: self.background.as_ref().map(|background| &background.pixels),
                store: &self.store,
                footer_slot: &mut self.footer,
            },
            footer,
            rasterizer,
        )
    }
}

fn log_outcome(outcome: GestureOutcome) {
    match outcome {
        GestureOutcome::Ignored | GestureOutcome::StrokeExtended => {}
        GestureOutcome::Placed(id) => tracing::debug!(marker = id, "marker placed"),
        GestureOutcome::Erased(id) => tracing::debug!(marker = id, "marker erased"),
        GestureOutcome::StrokeStarted => tracing::trace!("stroke started"),
        GestureOutcome::StrokeEnded => tracing::trace!("stroke ended"),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use egui::{Pos2, Rect};
    use image::RgbaImage;

    use super::EditorState;
    use crate::background::BackgroundImage;
    use crate::config::AppConfig;
    use crate::export::{RasterHandle, RasterOptions, Rasterizer, SceneSnapshot};
    use crate::flatten::Flattener;
    use crate::input::{GestureOutcome, InputMode};

    struct BrokenRasterizer;

    impl Rasterizer for BrokenRasterizer {
        fn request(&self, _scene: SceneSnapshot, _options: RasterOptions) -> Result<RasterHandle> {
            Err(anyhow!("rasterizer unavailable"))
        }
    }

    fn ready_state() -> EditorState {
        let mut state = EditorState::new(AppConfig::default());
        state.set_background(BackgroundImage::new("test", RgbaImage::new(200, 100)));
        state
            .geometry
            .display_mut()
            .set_layout(Rect::from_min_size(Pos2::new(20.0, 20.0), egui::vec2(200.0, 100.0)));
        state.geometry.recompute();
        state
    }

    #[test]
    fn new_background_starts_with_no_surface_until_laid_out() {
        let mut state = ready_state();
        state.set_background(BackgroundImage::new("swap", RgbaImage::new(10, 10)));
        assert!(state.geometry.current_bounds().is_empty());
        assert_eq!(state.pointer_down(Pos2::new(30.0, 30.0)), GestureOutcome::Ignored);
    }

    #[test]
    fn swap_keeps_annotations() {
        let mut state = ready_state();
        state.pointer_down(Pos2::new(30.0, 30.0));
        state.set_background(BackgroundImage::new("swap", RgbaImage::new(10, 10)));
        assert_eq!(state.store.marker_count(), 1);
    }

    #[test]
    fn export_failure_leaves_view_as_it_was() {
        let mut state = ready_state();
        state.tools.positive = "clear\nskies".to_string();
        state.pointer_down(Pos2::new(50.0, 50.0));
        state.set_mode(InputMode::Highlight);
        state.pointer_down(Pos2::new(60.0, 60.0));
        state.pointer_move(Pos2::new(70.0, 70.0));
        state.pointer_up();
        let markers = state.store.markers().to_vec();
        let strokes: Vec<_> = state.store.strokes().cloned().collect();

        assert!(state.export_snapshot(true, &BrokenRasterizer).is_err());

        assert!(state.footer.current().is_none());
        assert_eq!(state.store.markers(), markers.as_slice());
        assert_eq!(state.store.strokes().cloned().collect::<Vec<_>>(), strokes);
        assert_eq!(state.mode(), InputMode::Highlight);
    }

    #[test]
    fn export_renders_with_configured_scale() {
        let mut state = ready_state();
        state.pointer_down(Pos2::new(50.0, 50.0));
        let image = state
            .export_snapshot(false, &Flattener::new(None))
            .expect("request accepted")
            .wait()
            .expect("rendered");
        assert_eq!((image.width(), image.height()), (400, 200));
    }

    #[test]
    fn remove_marker_by_id_is_idempotent() {
        let mut state = ready_state();
        let GestureOutcome::Placed(id) = state.pointer_down(Pos2::new(40.0, 40.0)) else {
            panic!("marker should be placed");
        };
        assert!(state.remove_marker(id));
        assert!(!state.remove_marker(id));
        assert_eq!(state.store.marker_count(), 0);
    }

    #[test]
    fn footer_text_comes_from_tool_inputs() {
        let mut state = ready_state();
        state.tools.positive = "p".to_string();
        state.tools.negative = "n".to_string();
        state.tools.notes = "x".to_string();
        let footer = state.metadata_footer();
        assert_eq!((footer.positive.as_str(), footer.negative.as_str()), ("p", "n"));
        assert_eq!(footer.notes, "x");
    }
}
