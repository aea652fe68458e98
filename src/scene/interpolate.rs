use std::collections::HashMap;

use crate::foundation::core::{lerp, polar_to_cartesian, unwrap_angle_near};
use crate::scene::primitives::{
    ExtensionPrimitive, LabelPrimitive, LinkPrimitive, NodePrimitive, PrimitiveSet,
    label_orientation, link_path,
};

/// Unwrap baselines per record id, valid for one `(from, to)` frame pair.
/// Remembering the first-seen source angle keeps repeated interpolation calls
/// within a transition rotationally consistent: the target is always unwrapped
/// against the same baseline, so motion never takes the long way around and
/// never flips direction mid-animation.
#[derive(Debug, Default)]
struct AngleCache(HashMap<(&'static str, String), f64>);

impl AngleCache {
    fn baseline(&mut self, field: &'static str, id: &str, source: f64) -> f64 {
        *self
            .0
            .entry((field, id.to_string()))
            .or_insert(source)
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

/// Per-primitive polar blender between two primitive sets.
///
/// Pairing is by record id with three outcomes: update (both sides), enter
/// (target only, fading in), exit (source only, fading out). Radii blend
/// linearly, angles along the shortest signed difference, and Cartesian
/// positions are always rederived from the blended polar coordinates so the
/// motion follows arcs.
///
/// [`PolarInterpolator::reset`] must be called whenever the frame pair
/// changes; stale baselines would otherwise cause visible jumps.
#[derive(Debug, Default)]
pub struct PolarInterpolator {
    cache: AngleCache,
}

impl PolarInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.cache.clear();
    }

    pub fn interpolate(&mut self, from: &PrimitiveSet, to: &PrimitiveSet, t: f64) -> PrimitiveSet {
        // Same underlying frame: nothing to blend.
        let t = if std::ptr::eq(from, to) {
            0.0
        } else {
            t.clamp(0.0, 1.0)
        };

        PrimitiveSet {
            nodes: self.blend_nodes(&from.nodes, &to.nodes, t),
            links: self.blend_links(&from.links, &to.links, t),
            labels: self.blend_labels(&from.labels, &to.labels, t),
            extensions: self.blend_extensions(&from.extensions, &to.extensions, t),
        }
    }

    fn blend_angle(&mut self, field: &'static str, id: &str, source: f64, target: f64, t: f64) -> f64 {
        let baseline = self.cache.baseline(field, id, source);
        lerp(baseline, unwrap_angle_near(target, baseline), t)
    }

    fn blend_nodes(
        &mut self,
        from: &[NodePrimitive],
        to: &[NodePrimitive],
        t: f64,
    ) -> Vec<NodePrimitive> {
        let to_by_id: HashMap<&str, &NodePrimitive> =
            to.iter().map(|n| (n.id.as_str(), n)).collect();
        let mut out = Vec::with_capacity(from.len().max(to.len()));

        for src in from {
            match to_by_id.get(src.id.as_str()) {
                Some(dst) => {
                    let angle = self.blend_angle("node", &src.id, src.angle, dst.angle, t);
                    let radius = lerp(src.radius, dst.radius, t);
                    out.push(NodePrimitive {
                        id: src.id.clone(),
                        position: polar_to_cartesian(angle, radius),
                        angle,
                        radius,
                        is_leaf: dst.is_leaf,
                        split_key: dst.split_key.clone(),
                        opacity: 1.0,
                    });
                }
                None => out.push(NodePrimitive {
                    opacity: 1.0 - t,
                    ..src.clone()
                }),
            }
        }

        let from_ids: HashMap<&str, ()> = from.iter().map(|n| (n.id.as_str(), ())).collect();
        for dst in to {
            if !from_ids.contains_key(dst.id.as_str()) {
                out.push(NodePrimitive {
                    opacity: t,
                    ..dst.clone()
                });
            }
        }
        out
    }

    fn blend_links(
        &mut self,
        from: &[LinkPrimitive],
        to: &[LinkPrimitive],
        t: f64,
    ) -> Vec<LinkPrimitive> {
        let to_by_id: HashMap<&str, &LinkPrimitive> =
            to.iter().map(|l| (l.id.as_str(), l)).collect();
        let mut out = Vec::with_capacity(from.len().max(to.len()));

        for src in from {
            match to_by_id.get(src.id.as_str()) {
                Some(dst) => {
                    let source_angle =
                        self.blend_angle("link_src", &src.id, src.source_angle, dst.source_angle, t);
                    let target_angle =
                        self.blend_angle("link_dst", &src.id, src.target_angle, dst.target_angle, t);
                    let source_radius = lerp(src.source_radius, dst.source_radius, t);
                    let target_radius = lerp(src.target_radius, dst.target_radius, t);
                    out.push(LinkPrimitive {
                        id: src.id.clone(),
                        source: polar_to_cartesian(source_angle, source_radius),
                        target: polar_to_cartesian(target_angle, target_radius),
                        source_angle,
                        target_angle,
                        source_radius,
                        target_radius,
                        path: link_path(source_angle, source_radius, target_angle, target_radius),
                        split_key: dst.split_key.clone(),
                        opacity: 1.0,
                    });
                }
                None => out.push(LinkPrimitive {
                    opacity: 1.0 - t,
                    ..src.clone()
                }),
            }
        }

        let from_ids: HashMap<&str, ()> = from.iter().map(|l| (l.id.as_str(), ())).collect();
        for dst in to {
            if !from_ids.contains_key(dst.id.as_str()) {
                out.push(LinkPrimitive {
                    opacity: t,
                    ..dst.clone()
                });
            }
        }
        out
    }

    fn blend_labels(
        &mut self,
        from: &[LabelPrimitive],
        to: &[LabelPrimitive],
        t: f64,
    ) -> Vec<LabelPrimitive> {
        let to_by_id: HashMap<&str, &LabelPrimitive> =
            to.iter().map(|l| (l.id.as_str(), l)).collect();
        let mut out = Vec::with_capacity(from.len().max(to.len()));

        for src in from {
            match to_by_id.get(src.id.as_str()) {
                Some(dst) => {
                    let angle = self.blend_angle("label", &src.id, src.angle, dst.angle, t);
                    let rotation =
                        self.blend_angle("label_rot", &src.id, src.rotation, dst.rotation, t);
                    let radius = lerp(src.radius, dst.radius, t);
                    // Anchor side follows the blended angle so the flip
                    // happens exactly when the label crosses the vertical.
                    let (text_anchor, _) = label_orientation(angle);
                    out.push(LabelPrimitive {
                        id: src.id.clone(),
                        text: dst.text.clone(),
                        anchor: polar_to_cartesian(angle, radius),
                        angle,
                        radius,
                        text_anchor,
                        rotation,
                        opacity: 1.0,
                    });
                }
                None => out.push(LabelPrimitive {
                    opacity: 1.0 - t,
                    ..src.clone()
                }),
            }
        }

        let from_ids: HashMap<&str, ()> = from.iter().map(|l| (l.id.as_str(), ())).collect();
        for dst in to {
            if !from_ids.contains_key(dst.id.as_str()) {
                out.push(LabelPrimitive {
                    opacity: t,
                    ..dst.clone()
                });
            }
        }
        out
    }

    fn blend_extensions(
        &mut self,
        from: &[ExtensionPrimitive],
        to: &[ExtensionPrimitive],
        t: f64,
    ) -> Vec<ExtensionPrimitive> {
        let to_by_id: HashMap<&str, &ExtensionPrimitive> =
            to.iter().map(|e| (e.id.as_str(), e)).collect();
        let mut out = Vec::with_capacity(from.len().max(to.len()));

        for src in from {
            match to_by_id.get(src.id.as_str()) {
                Some(dst) => {
                    let angle = self.blend_angle("extension", &src.id, src.angle, dst.angle, t);
                    let inner = lerp(src.inner_radius, dst.inner_radius, t);
                    let outer = lerp(src.outer_radius, dst.outer_radius, t);
                    out.push(ExtensionPrimitive {
                        id: src.id.clone(),
                        source: polar_to_cartesian(angle, inner),
                        target: polar_to_cartesian(angle, outer),
                        angle,
                        inner_radius: inner,
                        outer_radius: outer,
                        opacity: 1.0,
                    });
                }
                None => out.push(ExtensionPrimitive {
                    opacity: 1.0 - t,
                    ..src.clone()
                }),
            }
        }

        let from_ids: HashMap<&str, ()> = from.iter().map(|e| (e.id.as_str(), ())).collect();
        for dst in to {
            if !from_ids.contains_key(dst.id.as_str()) {
                out.push(ExtensionPrimitive {
                    opacity: t,
                    ..dst.clone()
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::primitives::ARC_SAMPLES;
    use std::f64::consts::PI;

    fn node(id: &str, angle_deg: f64, radius: f64) -> NodePrimitive {
        let angle = angle_deg.to_radians();
        NodePrimitive {
            id: id.to_string(),
            position: polar_to_cartesian(angle, radius),
            angle,
            radius,
            is_leaf: true,
            split_key: format!("{{{id}}}"),
            opacity: 1.0,
        }
    }

    fn set_of(nodes: Vec<NodePrimitive>) -> PrimitiveSet {
        PrimitiveSet {
            nodes,
            ..PrimitiveSet::default()
        }
    }

    #[test]
    fn t0_and_t1_reproduce_endpoints() {
        let from = set_of(vec![node("A", 10.0, 100.0)]);
        let to = set_of(vec![node("A", 80.0, 150.0)]);
        let mut interp = PolarInterpolator::new();

        let at0 = interp.interpolate(&from, &to, 0.0);
        assert!((at0.nodes[0].angle - from.nodes[0].angle).abs() < 1e-12);
        assert!((at0.nodes[0].radius - 100.0).abs() < 1e-12);

        let at1 = interp.interpolate(&from, &to, 1.0);
        assert!((at1.nodes[0].angle - to.nodes[0].angle).abs() < 1e-12);
        assert!((at1.nodes[0].radius - 150.0).abs() < 1e-12);
    }

    #[test]
    fn angle_takes_shortest_path_across_wrap() {
        // 350 -> 10 degrees must pass through 0, not 180.
        let from = set_of(vec![node("A", 350.0, 100.0)]);
        let to = set_of(vec![node("A", 10.0, 100.0)]);
        let mut interp = PolarInterpolator::new();
        let mid = interp.interpolate(&from, &to, 0.5);
        let expected = 360.0f64.to_radians();
        assert!((mid.nodes[0].angle - expected).abs() < 1e-9);
    }

    #[test]
    fn direction_is_stable_across_repeated_calls() {
        let from = set_of(vec![node("A", 0.0, 100.0)]);
        let to = set_of(vec![node("A", 170.0, 100.0)]);
        let mut interp = PolarInterpolator::new();
        let mut prev = -1.0;
        for step in 0..=100 {
            let t = step as f64 / 100.0;
            let out = interp.interpolate(&from, &to, t);
            let angle = out.nodes[0].angle;
            assert!(angle >= prev - 1e-12, "monotone rotation violated at t={t}");
            prev = angle;
        }
        assert!((prev - 170.0f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn cartesian_is_derived_from_polar() {
        let from = set_of(vec![node("A", 0.0, 100.0)]);
        let to = set_of(vec![node("A", 90.0, 200.0)]);
        let mut interp = PolarInterpolator::new();
        for step in 1..10 {
            let t = step as f64 / 10.0;
            let out = interp.interpolate(&from, &to, t);
            let n = &out.nodes[0];
            assert!((n.position.x - n.radius * n.angle.cos()).abs() < 1e-9);
            assert!((n.position.y - n.radius * n.angle.sin()).abs() < 1e-9);
            // Polar fields themselves are linear in t.
            assert!((n.angle - t * PI / 2.0).abs() < 1e-9);
            assert!((n.radius - (100.0 + 100.0 * t)).abs() < 1e-9);
        }
    }

    #[test]
    fn enter_and_exit_fade() {
        let from = set_of(vec![node("A", 0.0, 100.0), node("gone", 45.0, 100.0)]);
        let to = set_of(vec![node("A", 0.0, 100.0), node("new", 90.0, 100.0)]);
        let mut interp = PolarInterpolator::new();
        let out = interp.interpolate(&from, &to, 0.3);

        let by_id: HashMap<&str, &NodePrimitive> =
            out.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        assert_eq!(by_id["A"].opacity, 1.0);
        assert!((by_id["gone"].opacity - 0.7).abs() < 1e-12);
        assert!((by_id["new"].opacity - 0.3).abs() < 1e-12);
        // Entering records sit at their target geometry.
        assert!((by_id["new"].angle - 90f64.to_radians()).abs() < 1e-12);
        // Exiting records stay at their source geometry.
        assert!((by_id["gone"].angle - 45f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn identical_sets_pass_through_for_any_t() {
        let set = set_of(vec![node("A", 30.0, 100.0)]);
        let mut interp = PolarInterpolator::new();
        let out = interp.interpolate(&set, &set, 0.7);
        assert!((out.nodes[0].angle - set.nodes[0].angle).abs() < 1e-12);
        assert_eq!(out.nodes[0].opacity, 1.0);
    }

    #[test]
    fn link_paths_are_resampled_per_call() {
        let mk_link = |angle_deg: f64| {
            let a = (angle_deg as f64).to_radians();
            LinkPrimitive {
                id: "x".to_string(),
                source: polar_to_cartesian(0.0, 50.0),
                target: polar_to_cartesian(a, 100.0),
                source_angle: 0.0,
                target_angle: a,
                source_radius: 50.0,
                target_radius: 100.0,
                path: link_path(0.0, 50.0, a, 100.0),
                split_key: "{1}".to_string(),
                opacity: 1.0,
            }
        };
        let from = PrimitiveSet {
            links: vec![mk_link(40.0)],
            ..PrimitiveSet::default()
        };
        let to = PrimitiveSet {
            links: vec![mk_link(80.0)],
            ..PrimitiveSet::default()
        };
        let mut interp = PolarInterpolator::new();
        let out = interp.interpolate(&from, &to, 0.5);
        let link = &out.links[0];
        assert_eq!(link.path.len(), ARC_SAMPLES + 2);
        assert!((link.target_angle - 60f64.to_radians()).abs() < 1e-9);
        // Arc samples stay on the source ring.
        for p in &link.path[..ARC_SAMPLES + 1] {
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert!((r - link.source_radius).abs() < 1e-9);
        }
    }

    #[test]
    fn label_rotation_unwraps_like_angles() {
        let mk_label = |angle_deg: f64| {
            let angle = (angle_deg as f64).to_radians();
            let (text_anchor, rotation) = label_orientation(angle);
            LabelPrimitive {
                id: "A".to_string(),
                text: "A".to_string(),
                anchor: polar_to_cartesian(angle, 120.0),
                angle,
                radius: 120.0,
                text_anchor,
                rotation,
                opacity: 1.0,
            }
        };
        let from = PrimitiveSet {
            labels: vec![mk_label(350.0)],
            ..PrimitiveSet::default()
        };
        let to = PrimitiveSet {
            labels: vec![mk_label(10.0)],
            ..PrimitiveSet::default()
        };
        let mut interp = PolarInterpolator::new();
        let out = interp.interpolate(&from, &to, 0.5);
        // Shortest path across the wrap, not halfway around the circle.
        assert!((out.labels[0].angle - 360f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_baselines() {
        let from = set_of(vec![node("A", 350.0, 100.0)]);
        let to = set_of(vec![node("A", 10.0, 100.0)]);
        let mut interp = PolarInterpolator::new();
        let _ = interp.interpolate(&from, &to, 0.5);
        interp.reset();
        // After reset the next pair starts from its own source baseline.
        let from2 = set_of(vec![node("A", 90.0, 100.0)]);
        let to2 = set_of(vec![node("A", 180.0, 100.0)]);
        let mid = interp.interpolate(&from2, &to2, 0.5);
        assert!((mid.nodes[0].angle - 135f64.to_radians()).abs() < 1e-9);
    }
}
