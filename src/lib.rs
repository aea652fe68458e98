#![forbid(unsafe_code)]

//! Animated rendering pipeline for tree movies: time-ordered sequences of
//! phylogenetic trees laid out radially, interpolated in polar coordinates,
//! and played back or compared side by side.
//!
//! The entry point for embedders is [`MoviePlayer`]; the individual stages
//! (layout, primitive building, interpolation, comparison, camera, state)
//! are public for hosts that wire their own pipeline.

pub mod foundation;
pub mod layout;
pub mod player;
pub mod playback;
pub mod render;
pub mod scene;
pub mod state;
pub mod tree;
pub mod view;

pub use foundation::core::{Canvas, FrameIndex, FramePosition, Point, Rect, Vec2};
pub use foundation::ease::Ease;
pub use foundation::error::{TreeMovieError, TreeMovieResult};
pub use layout::radial::{BranchTransform, LayoutOptions, RadialLayout};
pub use playback::clock::{PlaybackClock, PlaybackPhase, TickOutcome};
pub use playback::controller::{FrameController, PlaybackOptions, RenderOutcome};
pub use player::MoviePlayer;
pub use render::adapter::{GpuAdapter, LayerSet, RecordingAdapter, SceneLayer};
pub use scene::compare::{CompareOptions, ComparisonRenderer, ComparisonScene, Side};
pub use scene::interpolate::PolarInterpolator;
pub use scene::primitives::PrimitiveSet;
pub use state::hub::{AppState, StateHub, SubscriptionId};
pub use tree::movie::{Movie, MovieDocument};
pub use tree::node::{SplitSet, Tree, TreeBuilder};
pub use view::camera::{CameraMode, ViewState, Viewport};
