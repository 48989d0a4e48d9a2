use crate::annotation::{AnnotationText, Color, Marker, MarkerId, MarkerKind, PenStyle, Point, Stroke};

pub type StrokeId = u64;

/// Ticket for the stroke currently being drawn. Not `Clone`; `end_stroke` consumes it,
/// so the same handle cannot extend an ended stroke.
#[derive(Debug, PartialEq, Eq)]
pub struct StrokeHandle {
    id: StrokeId,
}

impl StrokeHandle {
    pub fn id(&self) -> StrokeId {
        self.id
    }
}

#[derive(Clone, Debug)]
pub struct MarkerRequest {
    pub position: Point,
    pub kind_code: String,
    pub color: Color,
    pub size: f32,
    pub text: AnnotationText,
}

/// Ordered markers (last placed is topmost) plus the freehand layer.
#[derive(Debug)]
pub struct AnnotationStore {
    markers: Vec<Marker>,
    strokes: Vec<(StrokeId, Stroke)>,
    open_stroke: Option<StrokeId>,
    next_marker_id: MarkerId,
    next_stroke_id: StrokeId,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            strokes: Vec::new(),
            open_stroke: None,
            next_marker_id: 1,
            next_stroke_id: 1,
        }
    }
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn strokes(&self) -> impl Iterator<Item = &Stroke> + '_ {
        self.strokes.iter().map(|(_, stroke)| stroke)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty() && self.strokes.is_empty()
    }

    pub(crate) fn has_open_stroke(&self) -> bool {
        self.open_stroke.is_some()
    }

    pub fn find_marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|marker| marker.id == id)
    }

    /// Appends a marker on top of the stack. Unknown kind codes are ignored.
    pub fn place_marker(&mut self, request: MarkerRequest) -> Option<&Marker> {
        let Some(kind) = MarkerKind::from_code(&request.kind_code) else {
            tracing::trace!(code = %request.kind_code, "ignoring placement with unknown marker kind");
            return None;
        };

        let id = self.next_marker_id;
        self.next_marker_id = self.next_marker_id.saturating_add(1);
        self.markers.push(Marker {
            id,
            kind,
            position: request.position,
            color: request.color,
            size: request.size,
            text: request.text,
        });
        self.markers.last()
    }

    /// Returns whether a marker was removed. Unknown ids are a no-op.
    pub fn remove_marker(&mut self, id: MarkerId) -> bool {
        let before = self.markers.len();
        self.markers.retain(|marker| marker.id != id);
        self.markers.len() != before
    }

    /// Removes the topmost marker whose hit region contains `position`.
    pub fn remove_marker_at(&mut self, position: Point) -> Option<MarkerId> {
        let index = self
            .markers
            .iter()
            .rposition(|marker| marker.contains(position))?;
        Some(self.markers.remove(index).id)
    }

    /// Empties markers and strokes, abandoning any open stroke.
    pub fn clear_all(&mut self) {
        self.markers.clear();
        self.strokes.clear();
        self.open_stroke = None;
    }

    pub fn begin_stroke(&mut self, start: Point, pen: PenStyle) -> StrokeHandle {
        if let Some(previous) = self.open_stroke.take() {
            tracing::debug!(stroke = previous, "closing stroke left open by a missed release");
        }
        let id = self.next_stroke_id;
        self.next_stroke_id = self.next_stroke_id.saturating_add(1);
        self.strokes.push((id, Stroke::start(start, pen)));
        self.open_stroke = Some(id);
        StrokeHandle { id }
    }

    pub fn extend_stroke(&mut self, handle: &StrokeHandle, position: Point) {
        if self.open_stroke != Some(handle.id) {
            debug_assert!(false, "extend_stroke on stroke {} which is not open", handle.id);
            return;
        }
        if let Some((_, stroke)) = self.strokes.iter_mut().rev().find(|(id, _)| *id == handle.id) {
            stroke.points.push(position);
        }
    }

    pub fn end_stroke(&mut self, handle: StrokeHandle) {
        if self.open_stroke == Some(handle.id) {
            self.open_stroke = None;
        }
    }

    pub fn stroke(&self, handle: &StrokeHandle) -> Option<&Stroke> {
        self.strokes
            .iter()
            .find(|(id, _)| *id == handle.id)
            .map(|(_, stroke)| stroke)
    }
}
