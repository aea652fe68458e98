use std::collections::HashMap;

use crate::foundation::core::{Point, Vec2};
use crate::scene::compare::Side;
use crate::tree::node::SplitSet;

/// Node-click payload routed to the UI boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextMenuRequest {
    pub node_id: String,
    pub position: Point,
    pub frame: usize,
}

/// Every piece of state that crosses a component boundary. Owned exclusively
/// by the [`StateHub`]; components read through getters and mutate through
/// setters, the UI subscribes.
#[derive(Clone, Debug, PartialEq)]
pub struct AppState {
    pub current_index: usize,
    pub playing: bool,
    /// Global animation progress in `[0, 1]`.
    pub progress: f64,
    pub comparison_mode: bool,
    /// Right-side anchor index while comparing.
    pub compare_index: Option<usize>,
    /// Honored only while not playing.
    pub auto_fit_on_index_change: bool,
    pub left_offset: Vec2,
    pub right_offset: Vec2,
    pub pivot_edge: Option<SplitSet>,
    pub tracked_subtree: Option<SplitSet>,
    pub current_pair_key: Option<String>,
    /// Side of a live tree-element drag, if any. Camera pan is disabled
    /// while this is set.
    pub dragging: Option<Side>,
    /// Projected screen positions per side, keyed by record id.
    pub screen_positions: HashMap<Side, HashMap<String, Point>>,
    pub context_menu: Option<ContextMenuRequest>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            current_index: 0,
            playing: false,
            progress: 0.0,
            comparison_mode: false,
            compare_index: None,
            auto_fit_on_index_change: true,
            left_offset: Vec2::ZERO,
            right_offset: Vec2::ZERO,
            pivot_edge: None,
            tracked_subtree: None,
            current_pair_key: None,
            dragging: None,
            screen_positions: HashMap::new(),
            context_menu: None,
        }
    }
}

type Subscriber = Box<dyn FnMut(&AppState, &AppState)>;

/// Central mutable store. Setters are individually atomic; each one clones
/// the previous state and hands `(state, prev_state)` to every subscriber,
/// so a single subscriber can diff many fields at once.
#[derive(Default)]
pub struct StateHub {
    state: AppState,
    subscribers: Vec<Option<Subscriber>>,
}

impl std::fmt::Debug for StateHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHub")
            .field("state", &self.state)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Handle returned by [`StateHub::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionId(usize);

impl StateHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn subscribe(&mut self, f: impl FnMut(&AppState, &AppState) + 'static) -> SubscriptionId {
        self.subscribers.push(Some(Box::new(f)));
        SubscriptionId(self.subscribers.len() - 1)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        if let Some(slot) = self.subscribers.get_mut(id.0) {
            *slot = None;
        }
    }

    fn commit(&mut self, mutate: impl FnOnce(&mut AppState)) {
        let prev = self.state.clone();
        mutate(&mut self.state);
        if self.state == prev {
            return;
        }
        for slot in &mut self.subscribers {
            if let Some(f) = slot {
                f(&self.state, &prev);
            }
        }
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn playing(&self) -> bool {
        self.state.playing
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn comparison_mode(&self) -> bool {
        self.state.comparison_mode
    }

    pub fn dragging(&self) -> Option<Side> {
        self.state.dragging
    }

    pub fn set_current_index(&mut self, index: usize) {
        self.commit(|s| s.current_index = index);
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.commit(|s| s.playing = playing);
    }

    pub fn set_progress(&mut self, progress: f64) {
        self.commit(|s| s.progress = progress.clamp(0.0, 1.0));
    }

    pub fn set_comparison_mode(&mut self, on: bool, compare_index: Option<usize>) {
        self.commit(|s| {
            s.comparison_mode = on;
            s.compare_index = if on { compare_index } else { None };
        });
    }

    pub fn set_auto_fit(&mut self, on: bool) {
        self.commit(|s| s.auto_fit_on_index_change = on);
    }

    pub fn set_left_offset(&mut self, offset: Vec2) {
        self.commit(|s| s.left_offset = offset);
    }

    pub fn set_right_offset(&mut self, offset: Vec2) {
        self.commit(|s| s.right_offset = offset);
    }

    pub fn set_pivot_edge(&mut self, edge: Option<SplitSet>) {
        self.commit(|s| s.pivot_edge = edge);
    }

    pub fn set_tracked_subtree(&mut self, subtree: Option<SplitSet>) {
        self.commit(|s| s.tracked_subtree = subtree);
    }

    pub fn set_pair_key(&mut self, key: Option<String>) {
        self.commit(|s| s.current_pair_key = key);
    }

    /// Begin a tree-element drag on `side`. While a drag is live, the
    /// camera must not pan.
    pub fn begin_drag(&mut self, side: Side) {
        self.commit(|s| s.dragging = Some(side));
    }

    /// Move the dragged side's pan offset by a world-space delta.
    pub fn drag_by(&mut self, delta: Vec2) {
        self.commit(|s| match s.dragging {
            Some(Side::Left) => s.left_offset += delta,
            Some(Side::Right) | Some(Side::Clipboard) => s.right_offset += delta,
            None => {}
        });
    }

    pub fn end_drag(&mut self) {
        self.commit(|s| s.dragging = None);
    }

    /// Replace the projected screen positions for one side.
    pub fn set_screen_positions(&mut self, side: Side, positions: HashMap<String, Point>) {
        self.commit(|s| {
            s.screen_positions.insert(side, positions);
        });
    }

    /// Hub action for node clicks: `(node, position, frame)`.
    pub fn show_node_context_menu(&mut self, node_id: String, position: Point, frame: usize) {
        self.commit(|s| {
            s.context_menu = Some(ContextMenuRequest {
                node_id,
                position,
                frame,
            });
        });
    }

    pub fn clear_context_menu(&mut self) {
        self.commit(|s| s.context_menu = None);
    }
}
