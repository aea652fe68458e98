use crate::foundation::core::{Canvas, Point, Rect, Vec2, clamp_extent, lerp};
use crate::foundation::ease::Ease;

/// Duration of a fit-to-bounds camera transition.
const FIT_DURATION_MS: f64 = 550.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CameraMode {
    #[default]
    Orthographic,
    Orbit,
}

/// Camera parameters for one mode. `rotation_x` and `rotation_orbit` only
/// carry meaning in orbit mode and stay zero otherwise.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewState {
    pub target: Point,
    /// Power-of-two zoom: world units are scaled by `2^zoom` on screen.
    pub zoom: f64,
    pub rotation_x: f64,
    pub rotation_orbit: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            target: Point::ORIGIN,
            zoom: 0.0,
            rotation_x: 0.0,
            rotation_orbit: 0.0,
        }
    }
}

impl ViewState {
    pub fn scale(&self) -> f64 {
        2f64.powf(self.zoom)
    }

    fn blend(from: &ViewState, to: &ViewState, t: f64) -> ViewState {
        ViewState {
            target: Point::new(
                lerp(from.target.x, to.target.x, t),
                lerp(from.target.y, to.target.y, t),
            ),
            zoom: lerp(from.zoom, to.zoom, t),
            rotation_x: lerp(from.rotation_x, to.rotation_x, t),
            rotation_orbit: lerp(from.rotation_orbit, to.rotation_orbit, t),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ViewTransition {
    from: ViewState,
    to: ViewState,
    start_ms: f64,
    duration_ms: f64,
    ease: Ease,
}

/// View state per camera mode plus screen projection. Each mode's state
/// survives toggling to the other mode; only the target carries over.
#[derive(Clone, Debug)]
pub struct Viewport {
    mode: CameraMode,
    orthographic: ViewState,
    orbit: ViewState,
    canvas: Canvas,
    pan_enabled: bool,
    transition: Option<ViewTransition>,
}

impl Viewport {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            mode: CameraMode::Orthographic,
            orthographic: ViewState::default(),
            orbit: ViewState::default(),
            canvas,
            pan_enabled: true,
            transition: None,
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn set_canvas(&mut self, canvas: Canvas) {
        self.canvas = canvas;
    }

    pub fn view(&self) -> &ViewState {
        match self.mode {
            CameraMode::Orthographic => &self.orthographic,
            CameraMode::Orbit => &self.orbit,
        }
    }

    fn view_mut(&mut self) -> &mut ViewState {
        match self.mode {
            CameraMode::Orthographic => &mut self.orthographic,
            CameraMode::Orbit => &mut self.orbit,
        }
    }

    /// Switch camera modes. The saved state of the new mode is reapplied;
    /// only the look-at target carries over from the old mode.
    pub fn set_mode(&mut self, mode: CameraMode) {
        if mode == self.mode {
            return;
        }
        let target = self.view().target;
        self.mode = mode;
        self.view_mut().target = target;
        self.transition = None;
    }

    /// Whether interactive pan is currently honored. Disabled while a
    /// tree-element drag is in progress.
    pub fn set_pan_enabled(&mut self, enabled: bool) {
        self.pan_enabled = enabled;
    }

    pub fn pan_enabled(&self) -> bool {
        self.pan_enabled
    }

    /// Pan by a screen-space delta (pixels, y down).
    pub fn pan_by(&mut self, screen_delta: Vec2) {
        if !self.pan_enabled {
            return;
        }
        let scale = self.view().scale();
        let view = self.view_mut();
        view.target.x -= screen_delta.x / scale;
        view.target.y += screen_delta.y / scale;
        self.transition = None;
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.view_mut().zoom += delta;
        self.transition = None;
    }

    /// Orbit-mode rotation patch; ignored for the orthographic camera.
    pub fn rotate_by(&mut self, delta_orbit: f64, delta_x: f64) {
        if self.mode != CameraMode::Orbit {
            return;
        }
        let view = self.view_mut();
        view.rotation_orbit += delta_orbit;
        view.rotation_x += delta_x;
    }

    /// Start an eased transition that brings `bounds` (grown by `padding` on
    /// every side) fully into the canvas. Degenerate bounds are clamped.
    pub fn fit_to_bounds(&mut self, bounds: Rect, padding: f64, now_ms: f64) {
        let width = clamp_extent(bounds.width() + 2.0 * padding);
        let height = clamp_extent(bounds.height() + 2.0 * padding);
        let zoom = (self.canvas.width_f64() / width)
            .min(self.canvas.height_f64() / height)
            .log2();

        let from = *self.view();
        let to = ViewState {
            target: bounds.center(),
            zoom,
            ..from
        };
        self.transition = Some(ViewTransition {
            from,
            to,
            start_ms: now_ms,
            duration_ms: FIT_DURATION_MS,
            ease: Ease::InOutCubic,
        });
    }

    pub fn in_transition(&self) -> bool {
        self.transition.is_some()
    }

    /// Advance a running fit transition. Returns the current view.
    pub fn tick(&mut self, now_ms: f64) -> ViewState {
        if let Some(tr) = self.transition {
            let t = ((now_ms - tr.start_ms) / tr.duration_ms).clamp(0.0, 1.0);
            let blended = ViewState::blend(&tr.from, &tr.to, tr.ease.apply(t));
            *self.view_mut() = blended;
            if t >= 1.0 {
                self.transition = None;
            }
        }
        *self.view()
    }

    /// World to screen coordinates (pixels, origin top-left, y down).
    pub fn project(&self, point: Point) -> Point {
        let view = self.view();
        let scale = view.scale();
        let mut d = point - view.target;
        if self.mode == CameraMode::Orbit && view.rotation_orbit != 0.0 {
            let (sin, cos) = (-view.rotation_orbit).sin_cos();
            d = Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos);
        }
        Point::new(
            self.canvas.width_f64() / 2.0 + d.x * scale,
            self.canvas.height_f64() / 2.0 - d.y * scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(Canvas::new(800, 600))
    }

    #[test]
    fn project_centers_the_target() {
        let mut vp = viewport();
        vp.view_mut().target = Point::new(10.0, 20.0);
        let screen = vp.project(Point::new(10.0, 20.0));
        assert_eq!(screen, Point::new(400.0, 300.0));
    }

    #[test]
    fn project_respects_zoom_and_flips_y() {
        let mut vp = viewport();
        vp.view_mut().zoom = 1.0;
        let screen = vp.project(Point::new(10.0, 10.0));
        assert_eq!(screen, Point::new(400.0 + 20.0, 300.0 - 20.0));
    }

    #[test]
    fn fit_transition_reaches_bounds() {
        let mut vp = viewport();
        let bounds = Rect::new(-100.0, -100.0, 100.0, 100.0);
        vp.fit_to_bounds(bounds, 0.0, 0.0);
        assert!(vp.in_transition());

        // Halfway through the eased transition the camera is between states.
        let mid = vp.tick(FIT_DURATION_MS / 2.0);
        assert!(mid.zoom != 0.0);
        assert!(vp.in_transition());

        let done = vp.tick(FIT_DURATION_MS + 1.0);
        assert!(!vp.in_transition());
        assert_eq!(done.target, Point::new(0.0, 0.0));
        // 600px canvas over a 200-unit extent: zoom = log2(3).
        assert!((done.zoom - 3f64.log2()).abs() < 1e-12);
    }

    #[test]
    fn fit_handles_zero_extent_bounds() {
        let mut vp = viewport();
        vp.fit_to_bounds(Rect::new(5.0, 5.0, 5.0, 5.0), 0.0, 0.0);
        let done = vp.tick(FIT_DURATION_MS + 1.0);
        assert!(done.zoom.is_finite());
        assert_eq!(done.target, Point::new(5.0, 5.0));
    }

    #[test]
    fn mode_switch_preserves_saved_state_and_target() {
        let mut vp = viewport();
        vp.zoom_by(2.0);
        vp.view_mut().target = Point::new(50.0, 0.0);

        vp.set_mode(CameraMode::Orbit);
        assert_eq!(vp.view().zoom, 0.0);
        assert_eq!(vp.view().target, Point::new(50.0, 0.0));
        vp.rotate_by(0.5, 0.1);
        assert_eq!(vp.view().rotation_orbit, 0.5);

        vp.set_mode(CameraMode::Orthographic);
        assert_eq!(vp.view().zoom, 2.0);

        // Orbit state survived the round trip.
        vp.set_mode(CameraMode::Orbit);
        assert_eq!(vp.view().rotation_orbit, 0.5);
    }

    #[test]
    fn pan_is_suppressed_while_dragging() {
        let mut vp = viewport();
        vp.set_pan_enabled(false);
        vp.pan_by(Vec2::new(10.0, 10.0));
        assert_eq!(vp.view().target, Point::ORIGIN);
        vp.set_pan_enabled(true);
        vp.pan_by(Vec2::new(10.0, 10.0));
        assert_ne!(vp.view().target, Point::ORIGIN);
    }

    #[test]
    fn rotate_is_ignored_in_orthographic_mode() {
        let mut vp = viewport();
        vp.rotate_by(1.0, 1.0);
        assert_eq!(vp.view().rotation_orbit, 0.0);
    }
}
