use crate::foundation::core::{Point, Rect, Vec2, polar_to_cartesian, wrap_angle};
use crate::layout::radial::RadialLayout;
use crate::tree::node::{Tree, TreeNode};

use std::f64::consts::{FRAC_PI_2, PI};

/// Arc sample count for link paths. Fixed so that from/to paths always pair
/// up sample-for-sample during interpolation.
pub const ARC_SAMPLES: usize = 16;

/// Label anchoring side, mirroring the SVG `text-anchor` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TextAnchor {
    Start,
    End,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NodePrimitive {
    pub id: String,
    pub position: Point,
    pub angle: f64,
    pub radius: f64,
    pub is_leaf: bool,
    pub split_key: String,
    pub opacity: f64,
}

/// A parent-to-child edge: an arc along the parent's ring between the two
/// angles, then a straight spoke outward to the child.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LinkPrimitive {
    pub id: String,
    pub source: Point,
    pub target: Point,
    pub source_angle: f64,
    pub target_angle: f64,
    pub source_radius: f64,
    pub target_radius: f64,
    pub path: Vec<Point>,
    /// Split key of the child endpoint.
    pub split_key: String,
    pub opacity: f64,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LabelPrimitive {
    pub id: String,
    pub text: String,
    pub anchor: Point,
    pub angle: f64,
    pub radius: f64,
    pub text_anchor: TextAnchor,
    pub rotation: f64,
    pub opacity: f64,
}

/// Dotted line from a leaf out to the extension ring, keeping labels clear of
/// uneven leaf radii.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ExtensionPrimitive {
    pub id: String,
    pub source: Point,
    pub target: Point,
    pub angle: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub opacity: f64,
}

/// Typed drawable lists for one laid-out tree, in submission order.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PrimitiveSet {
    pub nodes: Vec<NodePrimitive>,
    pub links: Vec<LinkPrimitive>,
    pub labels: Vec<LabelPrimitive>,
    pub extensions: Vec<ExtensionPrimitive>,
}

/// Stable identity: taxon name for leaves, canonical split key otherwise.
/// Links take the id of their child endpoint.
pub fn stable_id(node: &TreeNode) -> String {
    if node.is_leaf() {
        node.name.clone().unwrap_or_else(|| node.split.key())
    } else {
        node.split.key()
    }
}

/// Sampled polyline for a link: `ARC_SAMPLES + 1` points along the parent's
/// ring, then the child endpoint.
pub fn link_path(
    source_angle: f64,
    source_radius: f64,
    target_angle: f64,
    target_radius: f64,
) -> Vec<Point> {
    let mut path = Vec::with_capacity(ARC_SAMPLES + 2);
    for i in 0..=ARC_SAMPLES {
        let t = i as f64 / ARC_SAMPLES as f64;
        let a = source_angle + (target_angle - source_angle) * t;
        path.push(polar_to_cartesian(a, source_radius));
    }
    path.push(polar_to_cartesian(target_angle, target_radius));
    path
}

/// Anchor side and glyph rotation for a leaf label at `angle`. Labels on the
/// left half of the circle anchor at their end and flip by half a turn so the
/// text never renders upside down.
pub fn label_orientation(angle: f64) -> (TextAnchor, f64) {
    let wrapped = wrap_angle(angle);
    if wrapped > -FRAC_PI_2 && wrapped <= FRAC_PI_2 {
        (TextAnchor::Start, angle)
    } else {
        (TextAnchor::End, angle + PI)
    }
}

impl PrimitiveSet {
    /// Walk a laid-out tree once and emit all four record lists. Pure.
    pub fn build(tree: &Tree, layout: &RadialLayout) -> Self {
        let mut set = Self::default();
        if tree.is_empty() || layout.angles.len() != tree.nodes.len() {
            return set;
        }

        for (id, node) in tree.nodes.iter().enumerate() {
            let angle = layout.angle(id);
            let radius = layout.radius(id);
            let position = polar_to_cartesian(angle, radius);
            let record_id = stable_id(node);

            set.nodes.push(NodePrimitive {
                id: record_id.clone(),
                position,
                angle,
                radius,
                is_leaf: node.is_leaf(),
                split_key: node.split.key(),
                opacity: 1.0,
            });

            if let Some(parent) = node.parent {
                let source_angle = layout.angle(parent);
                let source_radius = layout.radius(parent);
                set.links.push(LinkPrimitive {
                    id: record_id.clone(),
                    source: polar_to_cartesian(source_angle, source_radius),
                    target: position,
                    source_angle,
                    target_angle: angle,
                    source_radius,
                    target_radius: radius,
                    path: link_path(source_angle, source_radius, angle, radius),
                    split_key: node.split.key(),
                    opacity: 1.0,
                });
            }

            if node.is_leaf() {
                let text = node.name.clone().unwrap_or_default();
                let (text_anchor, rotation) = label_orientation(angle);
                set.extensions.push(ExtensionPrimitive {
                    id: record_id.clone(),
                    source: position,
                    target: polar_to_cartesian(angle, layout.extension_radius),
                    angle,
                    inner_radius: radius,
                    outer_radius: layout.extension_radius,
                    opacity: 1.0,
                });
                set.labels.push(LabelPrimitive {
                    id: record_id,
                    text,
                    anchor: polar_to_cartesian(angle, layout.label_radius),
                    angle,
                    radius: layout.label_radius,
                    text_anchor,
                    rotation,
                    opacity: 1.0,
                });
            }
        }

        set
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Mean of node positions; the visual center used by comparison mode.
    pub fn center(&self) -> Point {
        if self.nodes.is_empty() {
            return Point::ORIGIN;
        }
        let mut sum = Vec2::ZERO;
        for n in &self.nodes {
            sum += n.position.to_vec2();
        }
        (sum / self.nodes.len() as f64).to_point()
    }

    /// Bounding box over nodes, label anchors, and extension endpoints.
    pub fn bounds(&self) -> Option<Rect> {
        let mut points = self
            .nodes
            .iter()
            .map(|n| n.position)
            .chain(self.labels.iter().map(|l| l.anchor))
            .chain(self.extensions.iter().map(|e| e.target));
        let first = points.next()?;
        let mut rect = Rect::from_points(first, first);
        for p in points {
            rect = rect.union_pt(p);
        }
        Some(rect)
    }

    /// Translate every record, including sampled paths, by `offset`.
    pub fn translate(&mut self, offset: Vec2) {
        for n in &mut self.nodes {
            n.position += offset;
        }
        for l in &mut self.links {
            l.source += offset;
            l.target += offset;
            for p in &mut l.path {
                *p += offset;
            }
        }
        for label in &mut self.labels {
            label.anchor += offset;
        }
        for e in &mut self.extensions {
            e.source += offset;
            e.target += offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Canvas;
    use crate::layout::radial::LayoutOptions;
    use crate::tree::node::TreeBuilder;
    use std::collections::HashMap;

    fn small_tree() -> Tree {
        let index: HashMap<String, u32> = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as u32))
            .collect();
        let mut b = TreeBuilder::new(&index);
        let a = b.leaf("A", Some(1.0)).unwrap();
        let bb = b.leaf("B", Some(1.0)).unwrap();
        let c = b.leaf("C", Some(1.0)).unwrap();
        let bc = b.internal(None, Some(1.0), vec![bb, c]);
        let root = b.internal(None, None, vec![a, bc]);
        b.finish(root)
    }

    fn build_set() -> (Tree, PrimitiveSet) {
        let tree = small_tree();
        let layout = RadialLayout::compute(&tree, Canvas::new(600, 600), &LayoutOptions::default());
        let set = PrimitiveSet::build(&tree, &layout);
        (tree, set)
    }

    #[test]
    fn identity_rules() {
        let (_, set) = build_set();
        let ids: Vec<_> = set.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(ids.contains(&"A"));
        assert!(ids.contains(&"{1,2}"));
        assert!(ids.contains(&"{0,1,2}"));
        // Links carry the child endpoint's id; the root has no link.
        assert_eq!(set.links.len(), set.nodes.len() - 1);
        assert!(set.links.iter().any(|l| l.id == "{1,2}"));
        assert!(!set.links.iter().any(|l| l.id == "{0,1,2}"));
    }

    #[test]
    fn one_label_and_extension_per_leaf() {
        let (tree, set) = build_set();
        assert_eq!(set.labels.len(), tree.leaf_count());
        assert_eq!(set.extensions.len(), tree.leaf_count());
    }

    #[test]
    fn link_paths_have_fixed_sample_count() {
        let (_, set) = build_set();
        for link in &set.links {
            assert_eq!(link.path.len(), ARC_SAMPLES + 2);
            let first = link.path[0];
            assert!((first.x - link.source.x).abs() < 1e-9);
            assert!((first.y - link.source.y).abs() < 1e-9);
            let last = *link.path.last().unwrap();
            assert!((last.x - link.target.x).abs() < 1e-9);
            assert!((last.y - link.target.y).abs() < 1e-9);
        }
    }

    #[test]
    fn positions_are_polar_faithful() {
        let (_, set) = build_set();
        for n in &set.nodes {
            assert!((n.position.x - n.radius * n.angle.cos()).abs() < 1e-9);
            assert!((n.position.y - n.radius * n.angle.sin()).abs() < 1e-9);
        }
    }

    #[test]
    fn label_orientation_flips_on_left_half() {
        let (anchor, rot) = label_orientation(0.3);
        assert_eq!(anchor, TextAnchor::Start);
        assert_eq!(rot, 0.3);

        let (anchor, rot) = label_orientation(PI - 0.3);
        assert_eq!(anchor, TextAnchor::End);
        assert!((rot - (PI - 0.3 + PI)).abs() < 1e-12);

        // Boundary: exactly a quarter turn stays anchored at start.
        let (anchor, _) = label_orientation(FRAC_PI_2);
        assert_eq!(anchor, TextAnchor::Start);
    }

    #[test]
    fn empty_tree_emits_nothing() {
        let set = PrimitiveSet::build(&Tree::default(), &RadialLayout::default());
        assert!(set.is_empty());
        assert!(set.bounds().is_none());
    }

    #[test]
    fn translate_moves_everything() {
        let (_, mut set) = build_set();
        let before = set.bounds().unwrap();
        set.translate(Vec2::new(100.0, -50.0));
        let after = set.bounds().unwrap();
        assert!((after.x0 - before.x0 - 100.0).abs() < 1e-9);
        assert!((after.y0 - before.y0 + 50.0).abs() < 1e-9);
        for l in &set.links {
            assert!((l.path[0].x - l.source.x).abs() < 1e-9);
        }
    }
}
