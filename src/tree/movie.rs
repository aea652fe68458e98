use std::collections::{BTreeMap, HashMap};

use crate::foundation::error::{TreeMovieError, TreeMovieResult};
use crate::tree::node::{NodeId, SplitSet, Tree, TreeBuilder};

/// One node of a tree as emitted by the interpolation pipeline.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TreeSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub children: Vec<TreeSource>,
}

/// Per-frame metadata linking an interpolation frame back to its anchor pair.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TreeMetadata {
    pub tree_name: String,
    /// Pipeline phase tag. Opaque to the interpolator; only the timeline
    /// widget gives these strings meaning.
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub tree_pair_key: Option<String>,
    #[serde(default)]
    pub step_in_pair: Option<u32>,
    /// Parenthesised comma list of leaf indices, e.g. `"(9,10,11)"`.
    #[serde(default)]
    pub s_edge_tracker: Option<String>,
}

/// Subtree mapping for one anchor-to-anchor transition. Each map sends a
/// solution id to groups of leaf indices; connectors pair groups that share a
/// solution id.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PairSolution {
    #[serde(default)]
    pub solution_to_source_map: BTreeMap<String, Vec<Vec<u32>>>,
    #[serde(default)]
    pub solution_to_destination_map: BTreeMap<String, Vec<Vec<u32>>>,
    #[serde(default)]
    pub jumping_subtree_solutions: Option<serde_json::Value>,
}

/// Raw movie document as produced by the precomputation backend.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct MovieDocument {
    #[serde(alias = "tree_list")]
    pub interpolated_trees: Vec<TreeSource>,
    #[serde(default)]
    pub tree_metadata: Vec<TreeMetadata>,
    #[serde(default)]
    pub sorted_leaves: Vec<String>,
    #[serde(default)]
    pub lattice_edge_tracking: Vec<Option<Vec<u32>>>,
    #[serde(default, alias = "tree_pair_solutions")]
    pub pair_solutions: BTreeMap<String, PairSolution>,
}

impl MovieDocument {
    pub fn from_json(json: &str) -> TreeMovieResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TreeMovieError::serde(format!("movie document: {e}")))
    }
}

/// The phase tag the pipeline puts on non-interpolated frames.
const PHASE_ORIGINAL: &str = "ORIGINAL";

/// A fully ingested tree movie: the interpolation frames plus everything the
/// renderer needs to pair frames, track the pivot edge, and draw connectors.
/// Immutable after construction.
#[derive(Clone, Debug, Default)]
pub struct Movie {
    frames: Vec<Tree>,
    metadata: Vec<TreeMetadata>,
    pivot_edges: Vec<Option<SplitSet>>,
    pair_solutions: BTreeMap<String, PairSolution>,
    sorted_leaves: Vec<String>,
}

impl Movie {
    pub fn from_document(doc: MovieDocument) -> TreeMovieResult<Self> {
        if doc.sorted_leaves.is_empty() && !doc.interpolated_trees.is_empty() {
            return Err(TreeMovieError::validation(
                "movie document has trees but no sorted_leaves ordering",
            ));
        }

        let leaf_index: HashMap<String, u32> = doc
            .sorted_leaves
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i as u32))
            .collect();

        let mut frames = Vec::with_capacity(doc.interpolated_trees.len());
        for (i, source) in doc.interpolated_trees.iter().enumerate() {
            let tree = build_tree(source, &leaf_index)
                .map_err(|e| TreeMovieError::validation(format!("frame {i}: {e}")))?;
            tree.validate()
                .map_err(|e| TreeMovieError::validation(format!("frame {i}: {e}")))?;
            frames.push(tree);
        }

        let mut metadata = doc.tree_metadata;
        metadata.resize_with(frames.len(), TreeMetadata::default);

        // Pivot edges come from explicit lattice tracking when present, with
        // the per-frame s_edge_tracker string as fallback. A malformed
        // tracker is an input inconsistency, not a fatal error.
        let mut pivot_edges = Vec::with_capacity(frames.len());
        for i in 0..frames.len() {
            let tracked = doc
                .lattice_edge_tracking
                .get(i)
                .cloned()
                .flatten()
                .map(SplitSet::new);
            let edge = tracked.or_else(|| {
                metadata[i].s_edge_tracker.as_deref().and_then(|raw| {
                    match SplitSet::parse_tracker(raw) {
                        Ok(set) if !set.is_empty() => Some(set),
                        Ok(_) => None,
                        Err(e) => {
                            tracing::warn!(frame = i, error = %e, "skipping malformed edge tracker");
                            None
                        }
                    }
                })
            });
            pivot_edges.push(edge);
        }

        Ok(Self {
            frames,
            metadata,
            pivot_edges,
            pair_solutions: doc.pair_solutions,
            sorted_leaves: doc.sorted_leaves,
        })
    }

    pub fn from_json(json: &str) -> TreeMovieResult<Self> {
        Self::from_document(MovieDocument::from_json(json)?)
    }

    /// Build a movie directly from trees; used by tests and by callers that
    /// precompute frames in-process.
    pub fn from_frames(frames: Vec<Tree>, sorted_leaves: Vec<String>) -> Self {
        let n = frames.len();
        let mut metadata = Vec::with_capacity(n);
        metadata.resize_with(n, TreeMetadata::default);
        Self {
            frames,
            metadata,
            pivot_edges: vec![None; n],
            pair_solutions: BTreeMap::new(),
            sorted_leaves,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&Tree> {
        self.frames.get(index)
    }

    pub fn metadata(&self, index: usize) -> Option<&TreeMetadata> {
        self.metadata.get(index)
    }

    pub fn sorted_leaves(&self) -> &[String] {
        &self.sorted_leaves
    }

    /// An anchor frame is an original (non-interpolated) tree.
    pub fn is_anchor(&self, index: usize) -> bool {
        self.metadata
            .get(index)
            .map(|m| m.phase == PHASE_ORIGINAL || m.tree_pair_key.is_none())
            .unwrap_or(false)
    }

    /// Split set of the edge being rearranged at `index`, if any.
    pub fn pivot_edge(&self, index: usize) -> Option<&SplitSet> {
        self.pivot_edges.get(index).and_then(|e| e.as_ref())
    }

    pub fn pair_key(&self, index: usize) -> Option<&str> {
        self.metadata
            .get(index)
            .and_then(|m| m.tree_pair_key.as_deref())
    }

    pub fn pair_solution(&self, key: &str) -> Option<&PairSolution> {
        self.pair_solutions.get(key)
    }

    /// Solution for the transition the frame at `index` belongs to.
    pub fn pair_solution_for_frame(&self, index: usize) -> Option<&PairSolution> {
        self.pair_key(index).and_then(|k| self.pair_solutions.get(k))
    }

    /// Number of anchor frames, i.e. how many real trees the movie walks
    /// through. Hosts use this for "step N of M" readouts.
    pub fn full_tree_count(&self) -> usize {
        (0..self.frames.len()).filter(|&i| self.is_anchor(i)).count()
    }

    /// Nearest anchor frames bracketing `index` (inclusive on both sides).
    pub fn anchor_pair_for(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.frames.len() {
            return None;
        }
        let before = (0..=index).rev().find(|&i| self.is_anchor(i))?;
        let after = (index..self.frames.len()).find(|&i| self.is_anchor(i))?;
        Some((before, after))
    }

    /// Leaves of the pivot edge at `index`, for layout-alignment exclusion.
    pub fn moving_taxa(&self, index: usize) -> Option<&SplitSet> {
        self.pivot_edge(index)
    }
}

fn build_tree(source: &TreeSource, leaf_index: &HashMap<String, u32>) -> TreeMovieResult<Tree> {
    fn build_node(
        source: &TreeSource,
        builder: &mut TreeBuilder<'_>,
    ) -> TreeMovieResult<NodeId> {
        if source.children.is_empty() {
            let name = source.name.as_deref().ok_or_else(|| {
                TreeMovieError::validation("leaf node has no taxon name")
            })?;
            builder.leaf(name, source.length)
        } else {
            let mut children = Vec::with_capacity(source.children.len());
            for child in &source.children {
                children.push(build_node(child, builder)?);
            }
            Ok(builder.internal(source.name.clone(), source.length, children))
        }
    }

    let mut builder = TreeBuilder::new(leaf_index);
    let root = build_node(source, &mut builder)?;
    Ok(builder.finish(root))
}
