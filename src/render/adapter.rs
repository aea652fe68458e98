use crate::foundation::error::TreeMovieResult;
use crate::scene::compare::{ConnectorPrimitive, Side};
use crate::scene::primitives::PrimitiveSet;
use crate::view::camera::ViewState;

/// One tree's primitives tagged with the side they belong to, for picking.
#[derive(Clone, Debug, Default)]
pub struct SceneLayer {
    pub side: Option<Side>,
    pub primitives: PrimitiveSet,
}

/// Everything submitted to the GPU for one frame. The adapter replaces its
/// previous layer set wholesale.
#[derive(Clone, Debug, Default)]
pub struct LayerSet {
    pub layers: Vec<SceneLayer>,
    pub connectors: Vec<ConnectorPrimitive>,
}

impl LayerSet {
    pub fn single(primitives: PrimitiveSet) -> Self {
        Self {
            layers: vec![SceneLayer {
                side: None,
                primitives,
            }],
            connectors: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|l| l.primitives.is_empty())
    }
}

/// Minimal capability set of a rendering backend. The frame controller owns
/// the adapter exclusively; the adapter never calls back into the pipeline.
pub trait GpuAdapter {
    /// Blocks until the device is usable. Render entry points call this once
    /// before their first submission.
    fn ensure_ready(&mut self) -> TreeMovieResult<()>;

    /// Replace the full layer set with `layers` and redraw.
    fn submit_layers(&mut self, layers: &LayerSet) -> TreeMovieResult<()>;

    /// Update the camera without touching geometry.
    fn set_view(&mut self, view: &ViewState) -> TreeMovieResult<()>;

    /// True while a previously submitted frame is still pending on the
    /// device. The controller drops new frames rather than queueing behind
    /// a busy backend; purely synchronous adapters keep the default.
    fn is_busy(&self) -> bool {
        false
    }
}

/// Test adapter that records every call and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    pub submissions: Vec<LayerSet>,
    pub views: Vec<ViewState>,
    pub ready_checks: usize,
    pub fail_ready: bool,
    pub fail_submit: bool,
    pub busy: bool,
}

impl GpuAdapter for RecordingAdapter {
    fn ensure_ready(&mut self) -> TreeMovieResult<()> {
        self.ready_checks += 1;
        if self.fail_ready {
            return Err(crate::foundation::error::TreeMovieError::render(
                "adapter never became ready",
            ));
        }
        Ok(())
    }

    fn submit_layers(&mut self, layers: &LayerSet) -> TreeMovieResult<()> {
        if self.fail_submit {
            return Err(crate::foundation::error::TreeMovieError::render(
                "submit_layers failed",
            ));
        }
        self.submissions.push(layers.clone());
        Ok(())
    }

    fn set_view(&mut self, view: &ViewState) -> TreeMovieResult<()> {
        self.views.push(view.clone());
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.busy
    }
}
