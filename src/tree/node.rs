use std::collections::HashMap;

use crate::foundation::error::{TreeMovieError, TreeMovieResult};

pub type NodeId = usize;

/// Ordered set of descendant-leaf indices. This is the stable identity of an
/// internal node: it survives re-layout and interpolation frames as long as
/// the subtree keeps the same leaves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SplitSet(Vec<u32>);

impl SplitSet {
    pub fn new(mut indices: Vec<u32>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self(indices)
    }

    pub fn singleton(index: u32) -> Self {
        Self(vec![index])
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.0.binary_search(&index).is_ok()
    }

    pub fn is_disjoint(&self, other: &SplitSet) -> bool {
        let mut a = self.0.iter().peekable();
        let mut b = other.0.iter().peekable();
        while let (Some(&&x), Some(&&y)) = (a.peek(), b.peek()) {
            match x.cmp(&y) {
                std::cmp::Ordering::Less => {
                    a.next();
                }
                std::cmp::Ordering::Greater => {
                    b.next();
                }
                std::cmp::Ordering::Equal => return false,
            }
        }
        true
    }

    pub fn union(&self, other: &SplitSet) -> SplitSet {
        let mut merged = Vec::with_capacity(self.0.len() + other.0.len());
        merged.extend_from_slice(&self.0);
        merged.extend_from_slice(&other.0);
        SplitSet::new(merged)
    }

    /// Canonical serialization used as a primitive id, e.g. `{3,5,9}`.
    pub fn key(&self) -> String {
        let mut s = String::with_capacity(self.0.len() * 3 + 2);
        s.push('{');
        for (i, idx) in self.0.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            s.push_str(&idx.to_string());
        }
        s.push('}');
        s
    }

    /// Parse the tracker form emitted by the interpolation pipeline, a
    /// parenthesised comma list such as `"(9,10,11)"`.
    pub fn parse_tracker(s: &str) -> TreeMovieResult<Self> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| {
                TreeMovieError::serde(format!("edge tracker '{s}' is not parenthesised"))
            })?;
        if inner.trim().is_empty() {
            return Ok(SplitSet::default());
        }
        let mut indices = Vec::new();
        for part in inner.split(',') {
            let idx: u32 = part.trim().parse().map_err(|_| {
                TreeMovieError::serde(format!("edge tracker '{s}' has non-numeric entry '{part}'"))
            })?;
            indices.push(idx);
        }
        Ok(SplitSet::new(indices))
    }
}

#[derive(Clone, Debug)]
pub struct TreeNode {
    /// Taxon name; present on leaves, usually absent on internal nodes.
    pub name: Option<String>,
    pub length: Option<f64>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub split: SplitSet,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Rooted node tree stored as an arena. Immutable after construction.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
    pub root: Option<NodeId>,
}

impl Tree {
    pub fn is_empty(&self) -> bool {
        self.root.is_none() || self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Leaves in in-order traversal (children visited in stored order).
    pub fn leaves_in_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                let node = &self.nodes[id];
                if node.is_leaf() {
                    out.push(id);
                } else {
                    for &child in node.children.iter().rev() {
                        stack.push(child);
                    }
                }
            }
        }
        out
    }

    /// All nodes, children before parents.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.root {
            let mut stack = vec![(root, false)];
            while let Some((id, expanded)) = stack.pop() {
                if expanded || self.nodes[id].is_leaf() {
                    out.push(id);
                } else {
                    stack.push((id, true));
                    for &child in self.nodes[id].children.iter().rev() {
                        stack.push((child, false));
                    }
                }
            }
        }
        out
    }

    pub fn find_by_split(&self, split: &SplitSet) -> Option<NodeId> {
        self.nodes.iter().position(|n| &n.split == split)
    }

    /// Check the split invariants: sibling splits are disjoint and a parent's
    /// split is the union of its children's.
    pub fn validate(&self) -> TreeMovieResult<()> {
        for (id, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                continue;
            }
            let mut union = SplitSet::default();
            for (i, &a) in node.children.iter().enumerate() {
                for &b in &node.children[i + 1..] {
                    if !self.nodes[a].split.is_disjoint(&self.nodes[b].split) {
                        return Err(TreeMovieError::validation(format!(
                            "node {id} has overlapping sibling splits"
                        )));
                    }
                }
                union = union.union(&self.nodes[a].split);
            }
            if union != node.split {
                return Err(TreeMovieError::validation(format!(
                    "node {id} split is not the union of its children"
                )));
            }
        }
        Ok(())
    }
}

/// Incremental tree builder used by movie ingestion. Leaf indices are taken
/// from the movie's canonical `sorted_leaves` ordering.
pub struct TreeBuilder<'a> {
    leaf_index: &'a HashMap<String, u32>,
    nodes: Vec<TreeNode>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(leaf_index: &'a HashMap<String, u32>) -> Self {
        Self {
            leaf_index,
            nodes: Vec::new(),
        }
    }

    pub fn leaf(&mut self, name: &str, length: Option<f64>) -> TreeMovieResult<NodeId> {
        let idx = self.leaf_index.get(name).copied().ok_or_else(|| {
            TreeMovieError::validation(format!("leaf '{name}' is not in sorted_leaves"))
        })?;
        self.nodes.push(TreeNode {
            name: Some(name.to_string()),
            length,
            parent: None,
            children: Vec::new(),
            split: SplitSet::singleton(idx),
        });
        Ok(self.nodes.len() - 1)
    }

    pub fn internal(
        &mut self,
        name: Option<String>,
        length: Option<f64>,
        children: Vec<NodeId>,
    ) -> NodeId {
        let mut split = SplitSet::default();
        for &child in &children {
            split = split.union(&self.nodes[child].split);
        }
        let id = self.nodes.len();
        for &child in &children {
            self.nodes[child].parent = Some(id);
        }
        self.nodes.push(TreeNode {
            name,
            length,
            parent: None,
            children,
            split,
        });
        id
    }

    pub fn finish(self, root: NodeId) -> Tree {
        Tree {
            nodes: self.nodes,
            root: Some(root),
        }
    }
}
