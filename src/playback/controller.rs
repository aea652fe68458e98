use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::core::{Canvas, FramePosition, Point};
use crate::foundation::ease::Ease;
use crate::foundation::error::{TreeMovieError, TreeMovieResult};
use crate::layout::radial::{BranchTransform, LayoutOptions, LeafAngles, RadialLayout};
use crate::render::adapter::{GpuAdapter, LayerSet, SceneLayer};
use crate::scene::compare::{CompareOptions, ComparisonRenderer, Side};
use crate::scene::interpolate::PolarInterpolator;
use crate::scene::primitives::PrimitiveSet;
use crate::state::hub::StateHub;
use crate::tree::movie::Movie;
use crate::view::camera::Viewport;

/// Local-t snap threshold: below this the controller renders the frame
/// statically instead of interpolating.
const SNAP_EPSILON: f64 = 1e-3;

/// Extra padding around bounds when auto-fitting, in world units.
const FIT_PADDING: f64 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlaybackOptions {
    /// Total playback duration over the whole movie.
    pub duration_ms: f64,
    /// Easing applied to the local blend factor of each frame pair.
    pub ease: Ease,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            duration_ms: 10_000.0,
            ease: Ease::InOutQuad,
        }
    }
}

impl PlaybackOptions {
    pub fn validate(&self) -> TreeMovieResult<()> {
        if !(self.duration_ms > 0.0) {
            return Err(TreeMovieError::validation("duration_ms must be > 0"));
        }
        Ok(())
    }
}

/// What happened to one requested frame. Render errors are absorbed here;
/// they never propagate as `Err` out of a render entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Layers reached the adapter.
    Submitted,
    /// A previous render was still awaiting the GPU; this frame was dropped.
    DroppedInFlight,
    /// Missing input or adapter failure; logged and skipped.
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    index: usize,
    width: u32,
    height: u32,
    transform: BranchTransform,
}

/// Canonical geometry of one frame: its primitives plus the leaf angles the
/// next frame aligns against. Each frame has exactly one layout per
/// `(canvas, transform)`, whatever pair it is rendered in.
struct FrameGeometry {
    set: PrimitiveSet,
    leaf_angles: LeafAngles,
}

/// Owns the render path: layout + primitive cache, interpolator, comparison
/// renderer, viewport, and the GPU adapter. Pulls indices and flags from the
/// state hub, pushes projected screen positions back.
pub struct FrameController {
    movie: Movie,
    adapter: Box<dyn GpuAdapter>,
    interpolator: PolarInterpolator,
    compare: ComparisonRenderer,
    viewport: Viewport,
    layout_opts: LayoutOptions,
    playback_opts: PlaybackOptions,
    cache: HashMap<CacheKey, Rc<FrameGeometry>>,
    current_pair: Option<(usize, usize)>,
    last_fit: Option<(usize, Option<usize>)>,
    ready: bool,
}

impl FrameController {
    pub fn new(
        movie: Movie,
        adapter: Box<dyn GpuAdapter>,
        canvas: Canvas,
        layout_opts: LayoutOptions,
        playback_opts: PlaybackOptions,
        compare_opts: CompareOptions,
    ) -> TreeMovieResult<Self> {
        layout_opts.validate()?;
        playback_opts.validate()?;
        compare_opts.validate()?;
        Ok(Self {
            movie,
            adapter,
            interpolator: PolarInterpolator::new(),
            compare: ComparisonRenderer::new(compare_opts),
            viewport: Viewport::new(canvas),
            layout_opts,
            playback_opts,
            cache: HashMap::new(),
            current_pair: None,
            last_fit: None,
            ready: false,
        })
    }

    pub fn movie(&self) -> &Movie {
        &self.movie
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn playback_options(&self) -> &PlaybackOptions {
        &self.playback_opts
    }

    /// True while a submitted frame is still pending on the GPU.
    pub fn is_in_flight(&self) -> bool {
        self.adapter.is_busy()
    }

    /// Switch the branch-length transform. Invalidates cached layouts since
    /// every radius depends on it.
    pub fn set_transform(&mut self, transform: BranchTransform) {
        if self.layout_opts.transform != transform {
            self.layout_opts.transform = transform;
            self.clear_cache();
        }
    }

    pub fn transform(&self) -> BranchTransform {
        self.layout_opts.transform
    }

    /// Drop all cached layouts and primitives.
    pub fn clear_cache(&mut self) {
        tracing::debug!(entries = self.cache.len(), "clearing render cache");
        self.cache.clear();
    }

    /// Resize the target surface. Re-renders immediately unless playback is
    /// running; mid-animation resizes only update the viewport so the camera
    /// does not jump.
    pub fn resize(&mut self, canvas: Canvas, hub: &mut StateHub, now_ms: f64) -> RenderOutcome {
        self.viewport.set_canvas(canvas);
        if hub.playing() {
            return RenderOutcome::Skipped;
        }
        self.render_static(hub.current_index(), hub, now_ms)
    }

    /// Render frame `index` with no interpolation.
    pub fn render_static(&mut self, index: usize, hub: &mut StateHub, now_ms: f64) -> RenderOutcome {
        self.render_pair(index, index, 0.0, hub, now_ms)
    }

    /// Map global progress `p` to a frame pair and an eased local t, snapping
    /// to a static render near pair boundaries and at the last frame.
    pub fn render_progress(&mut self, p: f64, hub: &mut StateHub, now_ms: f64) -> RenderOutcome {
        let position = match FramePosition::from_progress(p, self.movie.frame_count()) {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(error = %e, "cannot map progress to a frame");
                return RenderOutcome::Skipped;
            }
        };
        let t = self.playback_opts.ease.apply(position.t);
        if t <= SNAP_EPSILON || position.from == position.to {
            self.render_pair(position.from.0, position.from.0, 0.0, hub, now_ms)
        } else {
            self.render_pair(position.from.0, position.to.0, t, hub, now_ms)
        }
    }

    /// Clock-driven render of the hub's current global progress.
    pub fn render_animated(&mut self, hub: &mut StateHub, now_ms: f64) -> RenderOutcome {
        self.render_progress(hub.progress(), hub, now_ms)
    }

    /// Explicit interpolation render used by the timeline widget.
    pub fn render_scrub(
        &mut self,
        from: usize,
        to: usize,
        t: f64,
        hub: &mut StateHub,
        now_ms: f64,
    ) -> RenderOutcome {
        self.render_pair(from, to, t, hub, now_ms)
    }

    #[tracing::instrument(skip(self, hub))]
    fn render_pair(
        &mut self,
        from: usize,
        to: usize,
        t: f64,
        hub: &mut StateHub,
        now_ms: f64,
    ) -> RenderOutcome {
        if !self.ready {
            if let Err(e) = self.adapter.ensure_ready() {
                tracing::warn!(error = %e, "GPU adapter not ready; skipping frame");
                return RenderOutcome::Skipped;
            }
            self.ready = true;
        }
        if self.adapter.is_busy() {
            tracing::debug!(from, to, "previous frame still in flight; dropping");
            return RenderOutcome::DroppedInFlight;
        }
        if self.movie.frame(from).is_none() || self.movie.frame(to).is_none() {
            tracing::warn!(from, to, frames = self.movie.frame_count(), "missing frame index");
            return RenderOutcome::Skipped;
        }

        if self.current_pair != Some((from, to)) {
            self.interpolator.reset();
            self.current_pair = Some((from, to));
            hub.set_pair_key(self.movie.pair_key(to).map(str::to_string));
            hub.set_pivot_edge(self.movie.pivot_edge(to).cloned());
        }

        let (from_geom, to_geom) = match (self.frame_geometry(from), self.frame_geometry(to)) {
            (Some(f), Some(g)) => (f, g),
            _ => {
                tracing::warn!(from, to, "empty primitive lists; skipping frame");
                return RenderOutcome::Skipped;
            }
        };

        let t = if from == to { 0.0 } else { t };
        let blended = self
            .interpolator
            .interpolate(&from_geom.set, &to_geom.set, t);

        let layers = if hub.comparison_mode() {
            self.comparison_layers(blended, from, to, hub, now_ms)
        } else {
            self.maybe_auto_fit(&blended, (to, None), hub, now_ms);
            LayerSet::single(blended)
        };

        self.viewport.tick(now_ms);
        if let Err(e) = self.adapter.set_view(self.viewport.view()) {
            tracing::warn!(error = %e, "set_view failed");
        }

        if let Err(e) = self.adapter.submit_layers(&layers) {
            tracing::warn!(error = %e, "submit_layers failed; keeping previous frame");
            return RenderOutcome::Skipped;
        }

        self.publish_screen_positions(&layers, hub);
        RenderOutcome::Submitted
    }

    /// Build the two-tree comparison layer set: the (possibly interpolated)
    /// left tree against the right anchor frame, plus subtree connectors.
    fn comparison_layers(
        &mut self,
        left: PrimitiveSet,
        from: usize,
        to: usize,
        hub: &mut StateHub,
        now_ms: f64,
    ) -> LayerSet {
        let right_index = hub.state().compare_index.unwrap_or(to);
        let right = self
            .frame_geometry(right_index)
            .map(|geom| geom.set.clone())
            .unwrap_or_default();

        let solution = self
            .movie
            .pair_solution_for_frame(to)
            .or_else(|| self.movie.pair_solution_for_frame(from));

        let scene = self.compare.build(
            left,
            right,
            self.viewport.canvas(),
            self.viewport.view().zoom,
            hub.state().left_offset,
            hub.state().right_offset,
            solution,
        );

        let layers = LayerSet {
            layers: vec![
                SceneLayer {
                    side: Some(Side::Left),
                    primitives: scene.left,
                },
                SceneLayer {
                    side: Some(Side::Right),
                    primitives: scene.right,
                },
            ],
            connectors: scene.connectors,
        };

        // Fit when the compared pair changes, never mid-animation.
        if from == to {
            let mut all = layers.layers[0].primitives.clone();
            let mut right_copy = layers.layers[1].primitives.clone();
            all.nodes.append(&mut right_copy.nodes);
            all.labels.append(&mut right_copy.labels);
            all.extensions.append(&mut right_copy.extensions);
            self.maybe_auto_fit(&all, (to, Some(right_index)), hub, now_ms);
        }

        layers
    }

    /// Auto-fit policy: only when the shown indices changed, never while the
    /// clock is playing.
    fn maybe_auto_fit(
        &mut self,
        primitives: &PrimitiveSet,
        shown: (usize, Option<usize>),
        hub: &StateHub,
        now_ms: f64,
    ) {
        if hub.playing() || !hub.state().auto_fit_on_index_change {
            return;
        }
        if self.last_fit == Some(shown) {
            return;
        }
        if let Some(bounds) = primitives.bounds() {
            self.viewport.fit_to_bounds(bounds, FIT_PADDING, now_ms);
            self.last_fit = Some(shown);
        }
    }

    fn publish_screen_positions(&self, layers: &LayerSet, hub: &mut StateHub) {
        for layer in &layers.layers {
            let positions: HashMap<String, Point> = layer
                .primitives
                .nodes
                .iter()
                .map(|n| (n.id.clone(), self.viewport.project(n.position)))
                .collect();
            hub.set_screen_positions(layer.side.unwrap_or(Side::Left), positions);
        }
    }

    /// Canonical geometry for frame `index`, built on demand and cached by
    /// `(index, width, height, transform)`. Alignment is chained: frame k is
    /// laid out against frame k-1's leaf angles, excluding the moving
    /// subtree. A frame therefore has one geometry whether it is rendered as
    /// a `from`, a `to`, or a static frame, and the non-moving part of the
    /// tree holds still across the whole movie.
    fn frame_geometry(&mut self, index: usize) -> Option<Rc<FrameGeometry>> {
        let canvas = self.viewport.canvas();
        let transform = self.layout_opts.transform;
        let key_for = move |k: usize| CacheKey {
            index: k,
            width: canvas.width,
            height: canvas.height,
            transform,
        };

        let mut prev: Option<Rc<FrameGeometry>> = None;
        for k in 0..=index {
            if let Some(hit) = self.cache.get(&key_for(k)) {
                prev = Some(hit.clone());
                continue;
            }

            let tree = self.movie.frame(k)?;
            if tree.is_empty() {
                // An empty frame never renders; later frames align against
                // the last non-empty one.
                if k == index {
                    return None;
                }
                continue;
            }

            let layout = match &prev {
                Some(p) => RadialLayout::compute_aligned(
                    tree,
                    canvas,
                    &self.layout_opts,
                    Some(&p.leaf_angles),
                    self.movie.moving_taxa(k),
                ),
                None => RadialLayout::compute(tree, canvas, &self.layout_opts),
            };
            let set = PrimitiveSet::build(tree, &layout);
            if set.is_empty() {
                if k == index {
                    return None;
                }
                continue;
            }

            let entry = Rc::new(FrameGeometry {
                leaf_angles: layout.leaf_angles(tree),
                set,
            });
            self.cache.insert(key_for(k), entry.clone());
            prev = Some(entry);
        }

        self.cache.get(&key_for(index)).cloned()
    }
}
