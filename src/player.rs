use crate::foundation::core::{Canvas, Point, Vec2};
use crate::foundation::error::TreeMovieResult;
use crate::layout::radial::{BranchTransform, LayoutOptions};
use crate::playback::clock::{PlaybackClock, TickOutcome};
use crate::playback::controller::{FrameController, PlaybackOptions, RenderOutcome};
use crate::render::adapter::GpuAdapter;
use crate::scene::compare::{CompareOptions, Side};
use crate::state::hub::{AppState, StateHub, SubscriptionId};
use crate::tree::movie::Movie;
use crate::view::camera::{CameraMode, Viewport};

/// Everything a host embeds: the state hub, the frame controller and the
/// playback clock, wired together behind one facade. All methods are
/// synchronous; the host's event loop supplies timestamps and calls
/// [`tick`] from its frame scheduler while playback runs.
///
/// [`tick`]: MoviePlayer::tick
pub struct MoviePlayer {
    hub: StateHub,
    clock: PlaybackClock,
    controller: FrameController,
}

impl MoviePlayer {
    pub fn new(
        movie: Movie,
        adapter: Box<dyn GpuAdapter>,
        canvas: Canvas,
    ) -> TreeMovieResult<Self> {
        Self::with_options(
            movie,
            adapter,
            canvas,
            LayoutOptions::default(),
            PlaybackOptions::default(),
            CompareOptions::default(),
        )
    }

    pub fn with_options(
        movie: Movie,
        adapter: Box<dyn GpuAdapter>,
        canvas: Canvas,
        layout: LayoutOptions,
        playback: PlaybackOptions,
        compare: CompareOptions,
    ) -> TreeMovieResult<Self> {
        let clock = PlaybackClock::new(playback.duration_ms)?;
        let controller = FrameController::new(movie, adapter, canvas, layout, playback, compare)?;
        Ok(Self {
            hub: StateHub::new(),
            clock,
            controller,
        })
    }

    /// Parse a backend movie document and build a player for it.
    pub fn from_json(
        json: &str,
        adapter: Box<dyn GpuAdapter>,
        canvas: Canvas,
    ) -> TreeMovieResult<Self> {
        Self::new(Movie::from_json(json)?, adapter, canvas)
    }

    pub fn movie(&self) -> &Movie {
        self.controller.movie()
    }

    pub fn state(&self) -> &AppState {
        self.hub.state()
    }

    pub fn subscribe(
        &mut self,
        f: impl FnMut(&AppState, &AppState) + 'static,
    ) -> SubscriptionId {
        self.hub.subscribe(f)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.hub.unsubscribe(id)
    }

    // ---- playback ----

    pub fn play(&mut self, now_ms: f64) {
        self.clock.play(&mut self.hub, now_ms);
    }

    pub fn pause(&mut self) {
        self.clock.stop(&mut self.hub);
    }

    /// Host frame-scheduler entry point.
    pub fn tick(&mut self, now_ms: f64) -> TickOutcome {
        self.clock.tick(now_ms, &mut self.hub, &mut self.controller)
    }

    /// Timeline scrub: stops playback and renders `progress` immediately.
    pub fn scrub(&mut self, progress: f64, now_ms: f64) -> RenderOutcome {
        let outcome = self
            .clock
            .scrub(progress, &mut self.hub, &mut self.controller, now_ms);
        self.sync_index_from_progress();
        outcome
    }

    /// Show frame `index` statically.
    pub fn go_to_frame(&mut self, index: usize, now_ms: f64) -> RenderOutcome {
        self.clock.stop(&mut self.hub);
        self.hub.set_current_index(index);
        let frames = self.movie().frame_count();
        if frames > 1 {
            self.hub.set_progress(index as f64 / (frames - 1) as f64);
        }
        self.controller.render_static(index, &mut self.hub, now_ms)
    }

    pub fn next_frame(&mut self, now_ms: f64) -> RenderOutcome {
        let last = self.movie().frame_count().saturating_sub(1);
        let next = (self.hub.current_index() + 1).min(last);
        self.go_to_frame(next, now_ms)
    }

    pub fn previous_frame(&mut self, now_ms: f64) -> RenderOutcome {
        let prev = self.hub.current_index().saturating_sub(1);
        self.go_to_frame(prev, now_ms)
    }

    // ---- comparison ----

    /// Toggle side-by-side mode against the anchor frame `right_index`.
    pub fn set_comparison(
        &mut self,
        on: bool,
        right_index: Option<usize>,
        now_ms: f64,
    ) -> RenderOutcome {
        self.hub.set_comparison_mode(on, right_index);
        self.render_current(now_ms)
    }

    /// Begin dragging one comparison tree. Camera panning is suppressed for
    /// the duration so the two gestures never fight.
    pub fn begin_drag(&mut self, side: Side) {
        self.hub.begin_drag(side);
        self.controller.viewport_mut().set_pan_enabled(false);
    }

    /// Move the dragged tree by a screen-space delta.
    pub fn drag_by(&mut self, screen_delta: Vec2, now_ms: f64) -> RenderOutcome {
        if self.hub.dragging().is_none() {
            return RenderOutcome::Skipped;
        }
        let scale = self.controller.viewport().view().scale();
        self.hub
            .drag_by(Vec2::new(screen_delta.x / scale, -screen_delta.y / scale));
        self.render_current(now_ms)
    }

    pub fn end_drag(&mut self) {
        self.hub.end_drag();
        self.controller.viewport_mut().set_pan_enabled(true);
    }

    // ---- camera ----

    pub fn set_camera_mode(&mut self, mode: CameraMode) {
        self.controller.viewport_mut().set_mode(mode);
    }

    pub fn zoom_by(&mut self, delta: f64, now_ms: f64) -> RenderOutcome {
        self.controller.viewport_mut().zoom_by(delta);
        self.render_current(now_ms)
    }

    pub fn pan_by(&mut self, screen_delta: Vec2, now_ms: f64) -> RenderOutcome {
        self.controller.viewport_mut().pan_by(screen_delta);
        self.render_current(now_ms)
    }

    pub fn rotate_by(&mut self, delta_orbit: f64, delta_x: f64, now_ms: f64) -> RenderOutcome {
        self.controller.viewport_mut().rotate_by(delta_orbit, delta_x);
        self.render_current(now_ms)
    }

    pub fn viewport(&self) -> &Viewport {
        self.controller.viewport()
    }

    // ---- appearance and surface ----

    pub fn set_branch_transform(&mut self, transform: BranchTransform, now_ms: f64) -> RenderOutcome {
        self.controller.set_transform(transform);
        self.render_current(now_ms)
    }

    /// Surface resize. Mid-playback resizes only update the viewport; the
    /// next animated frame picks up the new size.
    pub fn resize(&mut self, canvas: Canvas, now_ms: f64) -> RenderOutcome {
        self.controller.resize(canvas, &mut self.hub, now_ms)
    }

    // ---- interaction ----

    /// Right-click on a node: record a context-menu request for the host UI.
    pub fn node_context_menu(&mut self, node_id: impl Into<String>, screen_position: Point) {
        let frame = self.hub.current_index();
        self.hub
            .show_node_context_menu(node_id.into(), screen_position, frame);
    }

    pub fn dismiss_context_menu(&mut self) {
        self.hub.clear_context_menu();
    }

    fn render_current(&mut self, now_ms: f64) -> RenderOutcome {
        if self.hub.playing() {
            // The running clock will render with the updated state.
            return RenderOutcome::Skipped;
        }
        self.controller
            .render_progress(self.hub.progress(), &mut self.hub, now_ms)
    }

    fn sync_index_from_progress(&mut self) {
        let frames = self.movie().frame_count();
        if frames > 1 {
            let span = (frames - 1) as f64;
            let index = (self.hub.progress() * span).floor() as usize;
            self.hub.set_current_index(index.min(frames - 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::adapter::RecordingAdapter;
    use crate::tree::node::TreeBuilder;
    use std::collections::HashMap;

    fn player() -> MoviePlayer {
        let names = ["A", "B", "C", "D"];
        let index: HashMap<String, u32> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as u32))
            .collect();
        let tree = |order: [usize; 4]| {
            let mut b = TreeBuilder::new(&index);
            let leaves: Vec<_> = order
                .iter()
                .map(|&i| b.leaf(names[i], Some(1.0)).unwrap())
                .collect();
            let lower = b.internal(None, Some(1.0), vec![leaves[2], leaves[3]]);
            let upper = b.internal(None, Some(1.0), vec![leaves[1], lower]);
            let root = b.internal(None, Some(1.0), vec![leaves[0], upper]);
            b.finish(root)
        };
        let movie = Movie::from_frames(
            vec![tree([0, 1, 2, 3]), tree([0, 2, 1, 3]), tree([3, 2, 1, 0])],
            names.iter().map(|s| s.to_string()).collect(),
        );
        MoviePlayer::new(
            movie,
            Box::new(RecordingAdapter::default()),
            Canvas::new(800, 600),
        )
        .unwrap()
    }

    #[test]
    fn frame_navigation_clamps_and_updates_progress() {
        let mut player = player();
        player.go_to_frame(1, 0.0);
        assert_eq!(player.state().current_index, 1);
        assert!((player.state().progress - 0.5).abs() < 1e-9);

        player.next_frame(1.0);
        player.next_frame(2.0);
        assert_eq!(player.state().current_index, 2);

        player.previous_frame(3.0);
        player.previous_frame(4.0);
        player.previous_frame(5.0);
        assert_eq!(player.state().current_index, 0);
    }

    #[test]
    fn scrub_stops_playback_and_tracks_index() {
        let mut player = player();
        player.play(0.0);
        assert!(player.state().playing);

        player.scrub(0.6, 100.0);
        assert!(!player.state().playing);
        assert_eq!(player.state().current_index, 1);
    }

    #[test]
    fn drag_suppresses_camera_pan() {
        let mut player = player();
        player.set_comparison(true, Some(2), 0.0);
        player.begin_drag(Side::Right);
        assert!(!player.viewport().pan_enabled());

        player.drag_by(Vec2::new(10.0, 0.0), 1.0);
        assert!(player.state().right_offset.x > 0.0);

        player.end_drag();
        assert!(player.viewport().pan_enabled());
        assert!(player.state().dragging.is_none());
    }

    #[test]
    fn drag_without_begin_is_ignored() {
        let mut player = player();
        assert_eq!(
            player.drag_by(Vec2::new(5.0, 5.0), 0.0),
            RenderOutcome::Skipped
        );
        assert_eq!(player.state().left_offset, Vec2::ZERO);
        assert_eq!(player.state().right_offset, Vec2::ZERO);
    }

    #[test]
    fn context_menu_records_node_and_frame() {
        let mut player = player();
        player.go_to_frame(2, 0.0);
        player.node_context_menu("A", Point::new(40.0, 60.0));

        let menu = player.state().context_menu.clone().unwrap();
        assert_eq!(menu.node_id, "A");
        assert_eq!(menu.frame, 2);

        player.dismiss_context_menu();
        assert!(player.state().context_menu.is_none());
    }

    #[test]
    fn transform_change_rerenders_when_idle() {
        let mut player = player();
        player.go_to_frame(0, 0.0);
        let outcome = player.set_branch_transform(BranchTransform::EqualDepth, 1.0);
        assert_eq!(outcome, RenderOutcome::Submitted);
    }

    #[test]
    fn full_playback_via_ticks() {
        let mut player = player();
        player.play(0.0);
        let mut now = 0.0;
        loop {
            now += 500.0;
            if player.tick(now) == TickOutcome::Finished {
                break;
            }
            assert!(now < 60_000.0, "playback never finished");
        }
        assert_eq!(player.state().progress, 1.0);
        assert!(!player.state().playing);
    }
}
