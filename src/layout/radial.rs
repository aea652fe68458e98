use std::collections::HashMap;

use crate::foundation::core::{
    Canvas, Point, clamp_extent, polar_to_cartesian, shortest_angle_delta,
};
use crate::foundation::error::{TreeMovieError, TreeMovieResult};
use crate::tree::node::{NodeId, SplitSet, Tree};

use std::f64::consts::TAU;

/// Fallback edge length when a node carries no branch length.
const DEFAULT_BRANCH_LENGTH: f64 = 1.0;

/// How branch lengths map to radial depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchTransform {
    /// Raw branch lengths.
    #[default]
    None,
    /// Every edge counts as one unit (pure topology).
    EqualDepth,
    /// Branch lengths divided by the tree's own maximum root-to-leaf path,
    /// keeping cumulative depths comparable across frames.
    Normalized,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayoutOptions {
    /// Canvas margin in pixels.
    pub margin: f64,
    /// Pixels reserved outside the leaf ring for extensions and labels.
    pub label_reserve: f64,
    /// Leaf ring to extension-line tip, in pixels.
    pub extension_gap: f64,
    /// Extension tip to label anchor, in pixels.
    pub label_padding: f64,
    /// Angular gap left open in the circle, in radians.
    pub angular_gap: f64,
    pub transform: BranchTransform,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            margin: 20.0,
            label_reserve: 60.0,
            extension_gap: 30.0,
            label_padding: 8.0,
            angular_gap: TAU / 36.0,
            transform: BranchTransform::None,
        }
    }
}

impl LayoutOptions {
    pub fn validate(&self) -> TreeMovieResult<()> {
        if self.margin < 0.0 || self.label_reserve < 0.0 {
            return Err(TreeMovieError::validation(
                "layout margin and label_reserve must be >= 0",
            ));
        }
        if self.extension_gap < 0.0 || self.label_padding < 0.0 {
            return Err(TreeMovieError::validation(
                "layout extension_gap and label_padding must be >= 0",
            ));
        }
        if !(0.0..TAU).contains(&self.angular_gap) {
            return Err(TreeMovieError::validation(
                "layout angular_gap must be in [0, TAU)",
            ));
        }
        Ok(())
    }
}

/// Leaf angles of a laid-out frame, keyed by taxon name. Used as the
/// cross-frame alignment reference.
pub type LeafAngles = HashMap<String, f64>;

/// Polar coordinates for every node of one tree, plus the three rings the
/// primitive builder needs.
#[derive(Clone, Debug, Default)]
pub struct RadialLayout {
    pub angles: Vec<f64>,
    pub radii: Vec<f64>,
    pub leaf_radius: f64,
    pub extension_radius: f64,
    pub label_radius: f64,
}

impl RadialLayout {
    /// Lay out `tree` for `canvas`. An empty tree yields a degenerate layout
    /// with zero radii; callers emit no records for it.
    pub fn compute(tree: &Tree, canvas: Canvas, opts: &LayoutOptions) -> Self {
        Self::compute_aligned(tree, canvas, opts, None, None)
    }

    /// Lay out `tree`, then rotate the whole layout so that non-excluded
    /// leaves sit as close as possible to their angles in `reference`. The
    /// excluded set is the moving subtree of the current transition; leaving
    /// it out keeps the static part of the tree visually stationary.
    #[tracing::instrument(skip_all, fields(leaves = tree.leaf_count()))]
    pub fn compute_aligned(
        tree: &Tree,
        canvas: Canvas,
        opts: &LayoutOptions,
        reference: Option<&LeafAngles>,
        excluded: Option<&SplitSet>,
    ) -> Self {
        if tree.is_empty() {
            return Self::default();
        }

        let leaf_radius = (canvas.min_extent() / 2.0 - opts.margin - opts.label_reserve).max(0.0);
        let extension_radius = leaf_radius + opts.extension_gap;
        let label_radius = extension_radius + opts.label_padding;

        let node_count = tree.nodes.len();
        let mut angles = vec![0.0; node_count];
        let mut radii = vec![0.0; node_count];

        // Leaves at equal angular spacing, full circle minus the gap.
        let leaves = tree.leaves_in_order();
        let step = (TAU - opts.angular_gap) / leaves.len() as f64;
        for (i, &leaf) in leaves.iter().enumerate() {
            angles[leaf] = i as f64 * step;
        }

        // Internal angles are the midpoint of the first and last child;
        // radii shrink with distance-above-leaf under the branch transform.
        let mut height = vec![0.0f64; node_count];
        for id in tree.postorder() {
            let node = tree.node(id);
            if node.is_leaf() {
                continue;
            }
            let first = node.children[0];
            let last = node.children[node.children.len() - 1];
            angles[id] = (angles[first] + angles[last]) / 2.0;
            height[id] = node
                .children
                .iter()
                .map(|&c| height[c] + edge_length(tree, c, opts.transform))
                .fold(0.0, f64::max);
        }

        let max_path = clamp_extent(tree.root.map(|r| height[r]).unwrap_or(0.0));
        for id in 0..node_count {
            radii[id] = leaf_radius * (1.0 - height[id] / max_path).max(0.0);
        }

        let mut layout = Self {
            angles,
            radii,
            leaf_radius,
            extension_radius,
            label_radius,
        };

        if let Some(reference) = reference {
            let rotation = layout.alignment_rotation(tree, reference, excluded);
            for a in &mut layout.angles {
                *a += rotation;
            }
        }

        layout
    }

    /// Rotation minimizing the summed squared angular difference of
    /// non-excluded leaves against the reference, i.e. the mean of the
    /// wrapped per-leaf deltas.
    fn alignment_rotation(
        &self,
        tree: &Tree,
        reference: &LeafAngles,
        excluded: Option<&SplitSet>,
    ) -> f64 {
        let mut sum = 0.0;
        let mut n = 0usize;
        for leaf in tree.leaves_in_order() {
            let node = tree.node(leaf);
            if let Some(ex) = excluded
                && node.split.indices().first().is_some_and(|&i| ex.contains(i))
            {
                continue;
            }
            let Some(name) = node.name.as_deref() else {
                continue;
            };
            let Some(&ref_angle) = reference.get(name) else {
                continue;
            };
            sum += shortest_angle_delta(self.angles[leaf], ref_angle);
            n += 1;
        }
        if n == 0 { 0.0 } else { sum / n as f64 }
    }

    pub fn angle(&self, id: NodeId) -> f64 {
        self.angles[id]
    }

    pub fn radius(&self, id: NodeId) -> f64 {
        self.radii[id]
    }

    /// World position of a node; the tree center is the world origin.
    pub fn position(&self, id: NodeId) -> Point {
        polar_to_cartesian(self.angles[id], self.radii[id])
    }

    pub fn leaf_angles(&self, tree: &Tree) -> LeafAngles {
        tree.leaves_in_order()
            .into_iter()
            .filter_map(|id| {
                tree.node(id)
                    .name
                    .clone()
                    .map(|name| (name, self.angles[id]))
            })
            .collect()
    }
}

fn edge_length(tree: &Tree, id: NodeId, transform: BranchTransform) -> f64 {
    match transform {
        BranchTransform::EqualDepth => DEFAULT_BRANCH_LENGTH,
        BranchTransform::None | BranchTransform::Normalized => tree
            .node(id)
            .length
            .filter(|l| l.is_finite() && *l >= 0.0)
            .unwrap_or(DEFAULT_BRANCH_LENGTH),
    }
}
