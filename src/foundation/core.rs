use crate::foundation::error::{TreeMovieError, TreeMovieResult};

pub use kurbo::{CubicBez, Point, Rect, Vec2};

use std::f64::consts::{PI, TAU};

/// Smallest extent used when clamping degenerate bounds or radii.
pub const MIN_EXTENT: f64 = 1e-6;

/// Index of a frame in the interpolation sequence.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub usize);

/// A position inside the movie expressed as a pair of frames and a local
/// blend factor: `from` at `t = 0`, `to` at `t = 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramePosition {
    pub from: FrameIndex,
    pub to: FrameIndex,
    pub t: f64,
}

impl FramePosition {
    /// Map a global progress value in `[0, 1]` onto a frame pair for a movie
    /// of `frame_count` frames.
    pub fn from_progress(progress: f64, frame_count: usize) -> TreeMovieResult<Self> {
        if frame_count == 0 {
            return Err(TreeMovieError::validation(
                "movie must contain at least one frame",
            ));
        }
        let p = progress.clamp(0.0, 1.0);
        let span = (frame_count - 1) as f64;
        let scaled = p * span;
        let mut i = scaled.floor() as usize;
        let mut t = scaled - i as f64;
        if i + 1 >= frame_count {
            i = frame_count.saturating_sub(1);
            t = 0.0;
        }
        Ok(Self {
            from: FrameIndex(i),
            to: FrameIndex((i + 1).min(frame_count - 1)),
            t,
        })
    }

    pub fn is_static(&self) -> bool {
        self.from == self.to || self.t <= f64::EPSILON
    }
}

/// Target drawing surface in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width_f64(self) -> f64 {
        f64::from(self.width)
    }

    pub fn height_f64(self) -> f64 {
        f64::from(self.height)
    }

    pub fn min_extent(self) -> f64 {
        self.width_f64().min(self.height_f64())
    }
}

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(a: f64) -> f64 {
    let mut w = a.rem_euclid(TAU);
    if w > PI {
        w -= TAU;
    }
    w
}

/// Signed shortest angular difference `to - from`, with `|delta| <= PI`.
pub fn shortest_angle_delta(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}

/// Shift `target` by whole turns so it lies within half a turn of `reference`.
pub fn unwrap_angle_near(target: f64, reference: f64) -> f64 {
    reference + shortest_angle_delta(reference, target)
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Cartesian point for polar coordinates around the world origin.
pub fn polar_to_cartesian(angle: f64, radius: f64) -> Point {
    Point::new(radius * angle.cos(), radius * angle.sin())
}

/// Clamp a length-like value away from zero (degenerate-bounds policy).
pub fn clamp_extent(v: f64) -> f64 {
    if !v.is_finite() || v < MIN_EXTENT {
        MIN_EXTENT
    } else {
        v
    }
}
