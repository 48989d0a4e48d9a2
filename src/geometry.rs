use egui::{Pos2, Rect, Vec2};

use crate::annotation::Point;

/// Displayed bounds of the background, in screen pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceBounds {
    pub width: f32,
    pub height: f32,
    pub origin_x: f32,
    pub origin_y: f32,
}

impl SurfaceBounds {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
        origin_x: 0.0,
        origin_y: 0.0,
    };

    pub fn from_rect(rect: Rect) -> Self {
        Self {
            width: rect.width().max(0.0),
            height: rect.height().max(0.0),
            origin_x: rect.min.x,
            origin_y: rect.min.y,
        }
    }

    pub fn to_rect(self) -> Rect {
        Rect::from_min_size(
            Pos2::new(self.origin_x, self.origin_y),
            Vec2::new(self.width, self.height),
        )
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains_local(self, point: Point) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.width && point.y <= self.height
    }
}

/// Whatever lays the background out on screen. `None` means no background is shown.
pub trait BackgroundDisplay {
    fn displayed_bounds(&self) -> Option<SurfaceBounds>;
}

/// Layout slot the canvas fills in every frame with the rect it drew the background into.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisplayedBackground {
    layout: Option<Rect>,
}

impl DisplayedBackground {
    pub fn set_layout(&mut self, rect: Rect) {
        self.layout = Some(rect);
    }

    pub fn clear(&mut self) {
        self.layout = None;
    }
}

impl BackgroundDisplay for DisplayedBackground {
    fn displayed_bounds(&self) -> Option<SurfaceBounds> {
        self.layout.map(SurfaceBounds::from_rect)
    }
}

/// Maps the background's on-screen bounds to the surface-local space markers and strokes live in.
pub struct SurfaceGeometryTracker<D> {
    display: D,
    bounds: SurfaceBounds,
}

impl<D: BackgroundDisplay> SurfaceGeometryTracker<D> {
    pub fn new(display: D) -> Self {
        let mut tracker = Self {
            display,
            bounds: SurfaceBounds::ZERO,
        };
        tracker.recompute();
        tracker
    }

    pub fn current_bounds(&self) -> SurfaceBounds {
        self.bounds
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Re-reads the display. Returns whether the bounds changed.
    pub fn recompute(&mut self) -> bool {
        let next = self
            .display
            .displayed_bounds()
            .filter(|bounds| !bounds.is_empty())
            .unwrap_or(SurfaceBounds::ZERO);
        let changed = next != self.bounds;
        if changed {
            tracing::debug!(
                width = next.width,
                height = next.height,
                origin_x = next.origin_x,
                origin_y = next.origin_y,
                "surface bounds recomputed"
            );
        }
        self.bounds = next;
        changed
    }

    /// Converts a screen position to surface-local coordinates.
    /// `None` when there is no surface or the position falls outside it.
    pub fn to_local(&self, screen: Pos2) -> Option<Point> {
        if self.bounds.is_empty() {
            return None;
        }
        let local = Point::new(screen.x - self.bounds.origin_x, screen.y - self.bounds.origin_y);
        self.bounds.contains_local(local).then_some(local)
    }

    /// Unclamped conversion, for continuing a stroke that wandered off the surface.
    pub fn to_local_unclamped(&self, screen: Pos2) -> Option<Point> {
        if self.bounds.is_empty() {
            return None;
        }
        Some(Point::new(
            screen.x - self.bounds.origin_x,
            screen.y - self.bounds.origin_y,
        ))
    }

    pub fn to_screen(&self, local: Point) -> Pos2 {
        Pos2::new(local.x + self.bounds.origin_x, local.y + self.bounds.origin_y)
    }
}
