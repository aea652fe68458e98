use crate::foundation::core::{Canvas, CubicBez, Point, Vec2, clamp_extent};
use crate::foundation::error::{TreeMovieError, TreeMovieResult};
use crate::scene::primitives::PrimitiveSet;
use crate::tree::movie::PairSolution;
use crate::tree::node::SplitSet;

/// Which tree a picked record belongs to in comparison mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Clipboard,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompareOptions {
    /// Gap between the two trees as a fraction of world-space canvas width.
    pub gap_fraction: f64,
    /// Pull-point distance as a multiple of the larger visual radius.
    /// Bundling connectors through points outside both trees keeps the
    /// curves clear of the tree bodies.
    pub pull_factor: f64,
    /// Font size used to estimate the longest label's width.
    pub font_size_px: f64,
    /// Average glyph width as a fraction of the font size.
    pub char_width_factor: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            gap_fraction: 0.1,
            pull_factor: 1.35,
            font_size_px: 12.0,
            char_width_factor: 0.6,
        }
    }
}

impl CompareOptions {
    pub fn validate(&self) -> TreeMovieResult<()> {
        if self.gap_fraction < 0.0 {
            return Err(TreeMovieError::validation("gap_fraction must be >= 0"));
        }
        if self.pull_factor < 1.0 {
            return Err(TreeMovieError::validation("pull_factor must be >= 1"));
        }
        Ok(())
    }
}

/// Cubic connector between corresponding subtrees of the two compared trees.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ConnectorPrimitive {
    pub id: String,
    pub solution_id: String,
    pub source_key: String,
    pub target_key: String,
    pub curve: CubicBez,
}

/// The two positioned primitive sets plus their connectors; records keep
/// their side tag for interactive picking.
#[derive(Clone, Debug, Default)]
pub struct ComparisonScene {
    pub left: PrimitiveSet,
    pub right: PrimitiveSet,
    pub connectors: Vec<ConnectorPrimitive>,
    pub left_offset: Vec2,
    pub right_offset: Vec2,
}

/// Lays out two already-built primitive sets side by side and bridges their
/// corresponding subtrees.
#[derive(Clone, Debug, Default)]
pub struct ComparisonRenderer {
    pub opts: CompareOptions,
}

impl ComparisonRenderer {
    pub fn new(opts: CompareOptions) -> Self {
        Self { opts }
    }

    /// Position `left` and `right` for `canvas` at the camera's `zoom` and
    /// build connectors from `solution`. Missing solution entries or
    /// unknown split keys shrink the connector list; they are never fatal.
    pub fn build(
        &self,
        mut left: PrimitiveSet,
        mut right: PrimitiveSet,
        canvas: Canvas,
        zoom: f64,
        user_left_offset: Vec2,
        user_right_offset: Vec2,
        solution: Option<&PairSolution>,
    ) -> ComparisonScene {
        let left_center = left.center();
        let right_center = right.center();
        let left_radius = self.visual_radius(&left, left_center);
        let right_radius = self.visual_radius(&right, right_center);

        // World-space width shrinks as the camera zooms in.
        let world_width = canvas.width_f64() / 2f64.powf(zoom);
        let gap = self.opts.gap_fraction * world_width;

        let left_offset = user_left_offset;
        let right_offset =
            Vec2::new(left_radius + gap + right_radius, 0.0) + user_right_offset;

        left.translate(left_offset);
        right.translate(right_offset);
        let left_center = left_center + left_offset;
        let right_center = right_center + right_offset;

        let connectors = match solution {
            Some(solution) => self.build_connectors(
                &left,
                &right,
                left_center,
                right_center,
                left_radius.max(right_radius),
                solution,
            ),
            None => Vec::new(),
        };

        ComparisonScene {
            left,
            right,
            connectors,
            left_offset,
            right_offset,
        }
    }

    /// Max distance from the center to any node, label anchor, or extension
    /// endpoint, plus an estimate of the longest label's rendered width.
    fn visual_radius(&self, set: &PrimitiveSet, center: Point) -> f64 {
        let geometry = set
            .nodes
            .iter()
            .map(|n| n.position)
            .chain(set.labels.iter().map(|l| l.anchor))
            .chain(set.extensions.iter().map(|e| e.target))
            .map(|p| (p - center).hypot())
            .fold(0.0, f64::max);
        let max_chars = set
            .labels
            .iter()
            .map(|l| l.text.chars().count())
            .max()
            .unwrap_or(0);
        let label_allowance =
            self.opts.char_width_factor * self.opts.font_size_px * max_chars as f64;
        clamp_extent(geometry + label_allowance)
    }

    /// One connector per (source group, destination group) pair sharing a
    /// solution id: the Cartesian product over the groups that resolve to a
    /// position on their side.
    fn build_connectors(
        &self,
        left: &PrimitiveSet,
        right: &PrimitiveSet,
        left_center: Point,
        right_center: Point,
        max_radius: f64,
        solution: &PairSolution,
    ) -> Vec<ConnectorPrimitive> {
        let pull_radius = self.opts.pull_factor * max_radius;
        let mut out = Vec::new();

        for (solution_id, source_groups) in &solution.solution_to_source_map {
            let Some(destination_groups) =
                solution.solution_to_destination_map.get(solution_id)
            else {
                tracing::warn!(solution_id, "pair solution has no destination groups");
                continue;
            };

            for source_group in source_groups {
                let source_key = SplitSet::new(source_group.clone()).key();
                let Some(source_pos) = position_by_split_key(left, &source_key) else {
                    continue;
                };
                for destination_group in destination_groups {
                    let target_key = SplitSet::new(destination_group.clone()).key();
                    let Some(target_pos) = position_by_split_key(right, &target_key) else {
                        continue;
                    };
                    let p1 = pull_point(left_center, source_pos, pull_radius);
                    let p2 = pull_point(right_center, target_pos, pull_radius);
                    out.push(ConnectorPrimitive {
                        id: format!("{solution_id}:{source_key}->{target_key}"),
                        solution_id: solution_id.clone(),
                        source_key: source_key.clone(),
                        target_key: target_key.clone(),
                        curve: CubicBez::new(source_pos, p1, p2, target_pos),
                    });
                }
            }
        }

        out
    }
}

fn position_by_split_key(set: &PrimitiveSet, key: &str) -> Option<Point> {
    set.nodes
        .iter()
        .find(|n| n.split_key == key)
        .map(|n| n.position)
}

/// Point at `radius` from `center`, in the direction of `through`.
fn pull_point(center: Point, through: Point, radius: f64) -> Point {
    let dir = through - center;
    let len = dir.hypot();
    if len < 1e-9 {
        return center + Vec2::new(radius, 0.0);
    }
    center + dir * (radius / len)
}
