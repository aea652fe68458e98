use crate::foundation::error::{TreeMovieError, TreeMovieResult};
use crate::playback::controller::{FrameController, RenderOutcome};
use crate::state::hub::StateHub;

/// Where the clock is in its lifecycle. Transitions happen only through
/// [`PlaybackClock::play`], [`PlaybackClock::stop`], [`PlaybackClock::scrub`]
/// and the natural end of the movie inside [`PlaybackClock::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Playing,
    Scrubbing,
}

/// What the host should do after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; no further ticks needed until the next `play`.
    Idle,
    /// Frame handled (or dropped); schedule the next tick.
    Reschedule,
    /// The movie reached its end this tick and playback stopped.
    Finished,
}

/// Wall-clock driver for animated playback. The host calls [`tick`] from its
/// frame scheduler; the clock maps elapsed time to global progress, writes it
/// to the hub, and asks the controller to render. Setting `playing = false`
/// on the hub is the single cancellation signal: the next tick observes it
/// and goes idle without rendering.
///
/// [`tick`]: PlaybackClock::tick
#[derive(Clone, Copy, Debug)]
pub struct PlaybackClock {
    phase: PlaybackPhase,
    duration_ms: f64,
    start_ms: f64,
}

impl PlaybackClock {
    pub fn new(duration_ms: f64) -> TreeMovieResult<Self> {
        if !(duration_ms > 0.0) {
            return Err(TreeMovieError::validation("duration_ms must be > 0"));
        }
        Ok(Self {
            phase: PlaybackPhase::Idle,
            duration_ms,
            start_ms: 0.0,
        })
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Start or resume playback at `now_ms`. Resuming backdates the start
    /// timestamp so the hub's current progress is preserved; playback that
    /// already finished restarts from the beginning.
    pub fn play(&mut self, hub: &mut StateHub, now_ms: f64) {
        let resume_from = if hub.progress() >= 1.0 {
            0.0
        } else {
            hub.progress()
        };
        self.start_ms = now_ms - resume_from * self.duration_ms;
        self.phase = PlaybackPhase::Playing;
        hub.set_progress(resume_from);
        hub.set_playing(true);
        tracing::debug!(progress = resume_from, "playback started");
    }

    /// Stop playback, keeping the current progress for a later resume.
    pub fn stop(&mut self, hub: &mut StateHub) {
        self.phase = PlaybackPhase::Idle;
        hub.set_playing(false);
    }

    /// Jump to `progress` and render it immediately. Scrubbing preempts a
    /// running animation by clearing the playing flag first.
    pub fn scrub(
        &mut self,
        progress: f64,
        hub: &mut StateHub,
        controller: &mut FrameController,
        now_ms: f64,
    ) -> RenderOutcome {
        hub.set_playing(false);
        self.phase = PlaybackPhase::Scrubbing;
        hub.set_progress(progress);
        let outcome = controller.render_progress(hub.progress(), hub, now_ms);
        self.phase = PlaybackPhase::Idle;
        outcome
    }

    /// Advance the animation by one host frame.
    pub fn tick(
        &mut self,
        now_ms: f64,
        hub: &mut StateHub,
        controller: &mut FrameController,
    ) -> TickOutcome {
        if !hub.playing() {
            self.phase = PlaybackPhase::Idle;
            return TickOutcome::Idle;
        }
        // A frame still awaiting the GPU: try again next tick without
        // advancing the shared progress.
        if controller.is_in_flight() {
            return TickOutcome::Reschedule;
        }

        let progress = ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0);
        hub.set_progress(progress);
        controller.render_animated(hub, now_ms);

        if progress >= 1.0 {
            self.stop(hub);
            tracing::debug!("playback finished");
            return TickOutcome::Finished;
        }
        TickOutcome::Reschedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Canvas;
    use crate::layout::radial::LayoutOptions;
    use crate::playback::controller::PlaybackOptions;
    use crate::render::adapter::RecordingAdapter;
    use crate::scene::compare::CompareOptions;
    use crate::tree::movie::Movie;
    use crate::tree::node::TreeBuilder;
    use std::collections::HashMap;

    fn two_frame_controller() -> FrameController {
        let names = ["A", "B", "C"];
        let index: HashMap<String, u32> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as u32))
            .collect();
        let tree = |order: [usize; 3]| {
            let mut b = TreeBuilder::new(&index);
            let a = b.leaf(names[order[0]], Some(1.0)).unwrap();
            let c = b.leaf(names[order[1]], Some(1.0)).unwrap();
            let d = b.leaf(names[order[2]], Some(1.0)).unwrap();
            let inner = b.internal(None, Some(1.0), vec![c, d]);
            let root = b.internal(None, Some(1.0), vec![a, inner]);
            b.finish(root)
        };
        let movie = Movie::from_frames(
            vec![tree([0, 1, 2]), tree([2, 1, 0])],
            names.iter().map(|s| s.to_string()).collect(),
        );
        FrameController::new(
            movie,
            Box::new(RecordingAdapter::default()),
            Canvas::new(640, 480),
            LayoutOptions::default(),
            PlaybackOptions::default(),
            CompareOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_nonpositive_duration() {
        assert!(PlaybackClock::new(0.0).is_err());
        assert!(PlaybackClock::new(-5.0).is_err());
    }

    #[test]
    fn idle_until_play() {
        let mut clock = PlaybackClock::new(1000.0).unwrap();
        let mut hub = StateHub::new();
        let mut ctrl = two_frame_controller();
        assert_eq!(clock.tick(0.0, &mut hub, &mut ctrl), TickOutcome::Idle);
        assert_eq!(clock.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn playback_advances_progress_monotonically() {
        let mut clock = PlaybackClock::new(1000.0).unwrap();
        let mut hub = StateHub::new();
        let mut ctrl = two_frame_controller();
        clock.play(&mut hub, 0.0);

        let mut last = -1.0;
        for i in 0..10 {
            let now = i as f64 * 100.0;
            clock.tick(now, &mut hub, &mut ctrl);
            assert!(hub.progress() >= last);
            last = hub.progress();
        }
        assert!((last - 0.9).abs() < 1e-9);
    }

    #[test]
    fn finishes_and_stops_at_the_end() {
        let mut clock = PlaybackClock::new(1000.0).unwrap();
        let mut hub = StateHub::new();
        let mut ctrl = two_frame_controller();
        clock.play(&mut hub, 0.0);
        assert_eq!(clock.tick(1500.0, &mut hub, &mut ctrl), TickOutcome::Finished);
        assert_eq!(hub.progress(), 1.0);
        assert!(!hub.playing());
        assert_eq!(clock.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn clearing_playing_cancels_without_rendering() {
        let mut clock = PlaybackClock::new(1000.0).unwrap();
        let mut hub = StateHub::new();
        let mut ctrl = two_frame_controller();
        clock.play(&mut hub, 0.0);
        clock.tick(100.0, &mut hub, &mut ctrl);

        hub.set_playing(false);
        let before = hub.progress();
        assert_eq!(clock.tick(200.0, &mut hub, &mut ctrl), TickOutcome::Idle);
        assert_eq!(hub.progress(), before);
    }

    #[test]
    fn resume_keeps_progress() {
        let mut clock = PlaybackClock::new(1000.0).unwrap();
        let mut hub = StateHub::new();
        let mut ctrl = two_frame_controller();
        clock.play(&mut hub, 0.0);
        clock.tick(400.0, &mut hub, &mut ctrl);
        clock.stop(&mut hub);

        // Resume 5 seconds later; progress continues from 0.4.
        clock.play(&mut hub, 5000.0);
        clock.tick(5100.0, &mut hub, &mut ctrl);
        assert!((hub.progress() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn play_after_finish_restarts() {
        let mut clock = PlaybackClock::new(1000.0).unwrap();
        let mut hub = StateHub::new();
        let mut ctrl = two_frame_controller();
        clock.play(&mut hub, 0.0);
        clock.tick(2000.0, &mut hub, &mut ctrl);
        assert_eq!(hub.progress(), 1.0);

        clock.play(&mut hub, 3000.0);
        assert_eq!(hub.progress(), 0.0);
        clock.tick(3250.0, &mut hub, &mut ctrl);
        assert!((hub.progress() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn scrub_preempts_playback() {
        let mut clock = PlaybackClock::new(1000.0).unwrap();
        let mut hub = StateHub::new();
        let mut ctrl = two_frame_controller();
        clock.play(&mut hub, 0.0);
        clock.tick(100.0, &mut hub, &mut ctrl);

        clock.scrub(0.75, &mut hub, &mut ctrl, 150.0);
        assert!(!hub.playing());
        assert_eq!(hub.progress(), 0.75);
        assert_eq!(clock.tick(200.0, &mut hub, &mut ctrl), TickOutcome::Idle);
    }
}
