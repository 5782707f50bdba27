//! # Navigation / Scroll-Sync Engine
//!
//! Keeps a single "current index" consistent across programmatic
//! navigation, keyboard input, and passive visibility-driven scroll
//! detection.
//!
//! ## State
//!
//! ```text
//!            next/prev/goToSection (valid target)
//!   Idle ───────────────────────────────────────▶ Transitioning
//!    ▲                                                 │
//!    └──── complete_transition / tick after window ────┘
//!    └──── forced after window + stuck margin ─────────┘
//! ```
//!
//! While transitioning, visibility observations and keyboard input are
//! ignored so the observer cannot fight the animated scroll over
//! `current_index`.
//!
//! ## Registry
//!
//! Mounted sections register a [`NodeRef`] carrying their document
//! position. Indices follow document order, not registration order, and are
//! recomputed whenever membership changes. Unregistering only detaches the
//! node; the entry (and its title) is kept so a remount during a content
//! edit restores it. [`NavigationEngine::forget_section`] removes it fully.
//! A membership change keeps the cursor on the same section; only when the
//! current section itself leaves is the old index clamped into range.
//!
//! The engine never scrolls anything itself: it queues a [`ScrollRequest`]
//! that the host drains with [`NavigationEngine::take_scroll_request`].

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::keyboard::{FocusContext, NavAction};

/// Timing and threshold configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationConfig {
    /// Duration of one animated scroll transition.
    pub transition_window: Duration,
    /// Extra time after the window before a stuck transition is force-cleared.
    pub stuck_margin: Duration,
    /// Minimum visibility ratio for a section to become current.
    pub visibility_threshold: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            transition_window: Duration::from_millis(1000),
            stuck_margin: Duration::from_millis(500),
            visibility_threshold: 0.5,
        }
    }
}

/// Opaque handle to a mounted node, ordered by document position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Position of the node in document order.
    pub position: u64,
}

impl NodeRef {
    /// A node at `position` in document order.
    pub fn at(position: u64) -> Self {
        Self { position }
    }
}

/// Runtime registration of an on-screen section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionInfo {
    /// Section identifier.
    pub id: String,
    /// Position in the live registered set (meaningful only while mounted).
    pub index: usize,
    /// Mounted node, `None` after a soft unmount.
    pub node: Option<NodeRef>,
    /// Optional title for navigation menus.
    pub title: Option<String>,
}

impl SectionInfo {
    /// Whether the section currently has a mounted node.
    pub fn is_mounted(&self) -> bool {
        self.node.is_some()
    }
}

/// Observable navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    /// Index of the current section in the live registered set.
    pub current_index: usize,
    /// Transition guard: a programmatic scroll is in flight.
    pub is_transitioning: bool,
}

/// Instruction for the host to scroll a section into view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollRequest {
    /// Target section id.
    pub id: String,
    /// Target index.
    pub index: usize,
    /// Target node.
    pub node: NodeRef,
}

/// One visibility measurement from the host's intersection observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityEntry {
    /// Section id the measurement belongs to.
    pub id: String,
    /// Fraction of the section visible in the viewport, `0.0..=1.0`.
    pub ratio: f64,
}

/// The navigation state machine.
#[derive(Debug)]
pub struct NavigationEngine<C: Clock = SystemClock> {
    config: NavigationConfig,
    clock: C,
    registry: Vec<SectionInfo>,
    state: NavigationState,
    transition_started: Option<Instant>,
    pending_scroll: Option<ScrollRequest>,
}

impl NavigationEngine<SystemClock> {
    /// Engine on the wall clock with default configuration.
    pub fn new() -> Self {
        Self::with_clock(NavigationConfig::default(), SystemClock)
    }
}

impl Default for NavigationEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> NavigationEngine<C> {
    /// Engine with explicit configuration and time source.
    pub fn with_clock(config: NavigationConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            registry: Vec::new(),
            state: NavigationState::default(),
            transition_started: None,
            pending_scroll: None,
        }
    }

    /// Current navigation state.
    pub fn state(&self) -> NavigationState {
        self.state
    }

    /// Index of the current section.
    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    /// Whether a programmatic transition is in flight.
    pub fn is_transitioning(&self) -> bool {
        self.state.is_transitioning
    }

    /// Number of mounted sections.
    pub fn len(&self) -> usize {
        self.registry.iter().filter(|s| s.is_mounted()).count()
    }

    /// Whether no section is mounted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mounted sections in index order.
    pub fn sections(&self) -> Vec<&SectionInfo> {
        let mut live: Vec<&SectionInfo> = self.registry.iter().filter(|s| s.is_mounted()).collect();
        live.sort_by_key(|s| s.index);
        live
    }

    /// Registry entry for `id`, mounted or not.
    pub fn section(&self, id: &str) -> Option<&SectionInfo> {
        self.registry.iter().find(|s| s.id == id)
    }

    /// The current section, if any is mounted.
    pub fn current_section(&self) -> Option<&SectionInfo> {
        self.mounted_at(self.state.current_index)
    }

    /// Idempotent upsert of a mounted section.
    ///
    /// A `None` title keeps any title recorded by an earlier registration.
    pub fn register_section(&mut self, id: impl Into<String>, node: NodeRef, title: Option<String>) {
        let id = id.into();
        let anchor = self.current_id();
        match self.registry.iter_mut().find(|s| s.id == id) {
            Some(entry) => {
                entry.node = Some(node);
                if title.is_some() {
                    entry.title = title;
                }
            }
            None => self.registry.push(SectionInfo {
                id,
                index: 0,
                node: Some(node),
                title,
            }),
        }
        self.reindex(anchor);
    }

    /// Detach the node of `id`, keeping its metadata. Returns `false` if unknown.
    pub fn unregister_section(&mut self, id: &str) -> bool {
        let anchor = self.current_id();
        let Some(entry) = self.registry.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        entry.node = None;
        self.reindex(anchor);
        true
    }

    /// Remove `id` from the registry entirely. Returns `false` if unknown.
    pub fn forget_section(&mut self, id: &str) -> bool {
        let anchor = self.current_id();
        let before = self.registry.len();
        self.registry.retain(|s| s.id != id);
        let removed = self.registry.len() != before;
        if removed {
            self.reindex(anchor);
        }
        removed
    }

    /// Drop every registry entry whose id is not in `ids`.
    pub fn retain_sections<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        let keep: std::collections::HashSet<&str> = ids.into_iter().collect();
        let anchor = self.current_id();
        self.registry.retain(|s| keep.contains(s.id.as_str()));
        self.reindex(anchor);
    }

    /// Advance one section. No-op at the last section.
    pub fn next(&mut self) -> bool {
        let target = self.state.current_index + 1;
        if target >= self.len() {
            return false;
        }
        self.begin_transition(target)
    }

    /// Go back one section. No-op at the first section.
    pub fn prev(&mut self) -> bool {
        if self.state.current_index == 0 || self.is_empty() {
            return false;
        }
        self.begin_transition(self.state.current_index - 1)
    }

    /// Navigate to `index`. Out-of-range indices are a no-op.
    pub fn go_to_section(&mut self, index: usize) -> bool {
        if index >= self.len() {
            return false;
        }
        self.begin_transition(index)
    }

    /// Navigate to the section with `id`, if mounted.
    pub fn go_to_id(&mut self, id: &str) -> bool {
        match self.registry.iter().find(|s| s.id == id && s.is_mounted()) {
            Some(entry) => {
                let index = entry.index;
                self.begin_transition(index)
            }
            None => false,
        }
    }

    /// Take the most recent scroll instruction, if one is pending.
    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.pending_scroll.take()
    }

    /// Host callback: the programmatic scroll finished.
    pub fn complete_transition(&mut self) {
        self.clear_transition();
    }

    /// Timer callback: clear the guard once the animation window elapsed.
    ///
    /// Returns `true` if the guard was cleared by this call.
    pub fn tick(&mut self) -> bool {
        match self.transition_started {
            Some(started) if self.clock.now().duration_since(started) >= self.config.transition_window => {
                self.clear_transition();
                true
            }
            _ => false,
        }
    }

    /// Passive scroll update from visibility measurements.
    ///
    /// The most visible section at or above the threshold becomes current;
    /// ties keep the earlier entry. Returns the new index if it changed.
    pub fn observe(&mut self, entries: &[VisibilityEntry]) -> Option<usize> {
        self.expire_stuck_transition();
        if self.state.is_transitioning {
            return None;
        }

        let mut best: Option<(&VisibilityEntry, usize)> = None;
        for entry in entries {
            if !entry.ratio.is_finite() || entry.ratio < self.config.visibility_threshold {
                continue;
            }
            let Some(index) = self.mounted_index_of(&entry.id) else {
                continue;
            };
            if best.map_or(true, |(b, _)| entry.ratio > b.ratio) {
                best = Some((entry, index));
            }
        }

        let (_, index) = best?;
        if index == self.state.current_index {
            return None;
        }
        tracing::trace!(from = self.state.current_index, to = index, "scroll observer moved current section");
        self.state.current_index = index;
        Some(index)
    }

    /// Keyboard entry point. Suppressed while a text editor has focus or a
    /// transition is in flight. Returns `true` if navigation happened.
    pub fn handle_key(&mut self, key: &str, focus: FocusContext) -> bool {
        match NavAction::from_key(key) {
            Some(action) => self.handle_action(action, focus),
            None => false,
        }
    }

    /// Apply a keyboard action under the same suppression rules as [`Self::handle_key`].
    pub fn handle_action(&mut self, action: NavAction, focus: FocusContext) -> bool {
        self.expire_stuck_transition();
        if focus.captures_keys() || self.state.is_transitioning {
            return false;
        }
        match action {
            NavAction::Next => self.next(),
            NavAction::Prev => self.prev(),
            NavAction::First => self.go_to_section(0),
            NavAction::Last => match self.len() {
                0 => false,
                n => self.go_to_section(n - 1),
            },
        }
    }

    fn begin_transition(&mut self, target: usize) -> bool {
        let Some(entry) = self.mounted_at(target) else {
            return false;
        };
        let Some(node) = entry.node else {
            return false;
        };
        let request = ScrollRequest {
            id: entry.id.clone(),
            index: target,
            node,
        };
        tracing::trace!(from = self.state.current_index, to = target, "navigation transition started");
        self.pending_scroll = Some(request);
        self.state.current_index = target;
        self.state.is_transitioning = true;
        self.transition_started = Some(self.clock.now());
        true
    }

    fn clear_transition(&mut self) {
        self.state.is_transitioning = false;
        self.transition_started = None;
    }

    /// Force-clear a guard that outlived its animation window plus margin.
    fn expire_stuck_transition(&mut self) {
        if let Some(started) = self.transition_started {
            let cap = self.config.transition_window + self.config.stuck_margin;
            if self.clock.now().duration_since(started) >= cap {
                tracing::warn!("navigation transition exceeded its hard cap, clearing guard");
                self.clear_transition();
            }
        }
    }

    fn mounted_at(&self, index: usize) -> Option<&SectionInfo> {
        self.registry
            .iter()
            .find(|s| s.is_mounted() && s.index == index)
    }

    fn mounted_index_of(&self, id: &str) -> Option<usize> {
        self.registry
            .iter()
            .find(|s| s.id == id && s.is_mounted())
            .map(|s| s.index)
    }

    fn current_id(&self) -> Option<String> {
        self.current_section().map(|s| s.id.clone())
    }

    /// Recompute indices from document order. The cursor follows `anchor`
    /// while it is still mounted and is clamped into range otherwise.
    fn reindex(&mut self, anchor: Option<String>) {
        let mut live: Vec<(NodeRef, usize)> = self
            .registry
            .iter()
            .enumerate()
            .filter_map(|(slot, s)| s.node.map(|node| (node, slot)))
            .collect();
        live.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| self.registry[a.1].id.cmp(&self.registry[b.1].id)));
        for (index, (_, slot)) in live.iter().enumerate() {
            self.registry[*slot].index = index;
        }
        if let Some(index) = anchor.and_then(|id| self.mounted_index_of(&id)) {
            self.state.current_index = index;
            return;
        }
        let count = live.len();
        if count == 0 {
            self.state.current_index = 0;
        } else if self.state.current_index >= count {
            self.state.current_index = count - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn engine_with(n: u64) -> (NavigationEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let mut engine = NavigationEngine::with_clock(NavigationConfig::default(), clock.clone());
        for i in 0..n {
            engine.register_section(format!("s{i}"), NodeRef::at(i * 100), Some(format!("Slide {i}")));
        }
        (engine, clock)
    }

    fn seen(id: &str, ratio: f64) -> VisibilityEntry {
        VisibilityEntry {
            id: id.to_string(),
            ratio,
        }
    }

    #[test]
    fn go_to_out_of_range_is_noop() {
        let (mut nav, _) = engine_with(5);
        assert!(!nav.go_to_section(10));
        assert_eq!(nav.current_index(), 0);
        assert!(!nav.is_transitioning());
        assert!(nav.go_to_section(4));
        assert_eq!(nav.current_index(), 4);
        assert!(nav.is_transitioning());
    }

    #[test]
    fn indices_follow_document_order_not_registration_order() {
        let clock = ManualClock::new();
        let mut nav = NavigationEngine::with_clock(NavigationConfig::default(), clock);
        nav.register_section("c", NodeRef::at(300), None);
        nav.register_section("a", NodeRef::at(100), None);
        nav.register_section("b", NodeRef::at(200), None);
        let ids: Vec<&str> = nav.sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(nav.section("c").unwrap().index, 2);
    }

    #[test]
    fn register_is_idempotent_and_keeps_title() {
        let (mut nav, _) = engine_with(2);
        nav.register_section("s1", NodeRef::at(100), None);
        assert_eq!(nav.len(), 2);
        assert_eq!(nav.section("s1").unwrap().title.as_deref(), Some("Slide 1"));
    }

    #[test]
    fn unregister_is_soft() {
        let (mut nav, _) = engine_with(3);
        assert!(nav.unregister_section("s1"));
        assert_eq!(nav.len(), 2);
        assert_eq!(nav.section("s2").unwrap().index, 1);
        assert_eq!(nav.section("s1").unwrap().title.as_deref(), Some("Slide 1"));
        nav.register_section("s1", NodeRef::at(100), None);
        assert_eq!(nav.section("s1").unwrap().index, 1);
        assert_eq!(nav.section("s2").unwrap().index, 2);
        assert!(!nav.unregister_section("missing"));
    }

    #[test]
    fn forget_clamps_current_index() {
        let (mut nav, _) = engine_with(3);
        nav.go_to_section(2);
        nav.complete_transition();
        assert!(nav.forget_section("s2"));
        assert_eq!(nav.current_index(), 1);
        nav.retain_sections(["s0"]);
        assert_eq!(nav.len(), 1);
        assert_eq!(nav.current_index(), 0);
    }

    #[test]
    fn cursor_follows_its_section_when_others_come_and_go() {
        let (mut nav, _) = engine_with(4);
        nav.go_to_section(2);
        nav.complete_transition();

        nav.unregister_section("s0");
        assert_eq!(nav.current_index(), 1);
        assert_eq!(nav.current_section().unwrap().id, "s2");

        nav.register_section("s0", NodeRef::at(0), None);
        assert_eq!(nav.current_section().unwrap().id, "s2");
        nav.forget_section("s1");
        assert_eq!(nav.current_section().unwrap().id, "s2");
        nav.register_section("s9", NodeRef::at(50), None);
        assert_eq!(nav.current_index(), 2);
        assert_eq!(nav.current_section().unwrap().id, "s2");

        nav.unregister_section("s2");
        assert_eq!(nav.current_index(), 2);
        assert_eq!(nav.current_section().unwrap().id, "s3");
    }

    #[test]
    fn next_and_prev_stop_at_boundaries() {
        let (mut nav, _) = engine_with(2);
        assert!(!nav.prev());
        assert!(nav.next());
        nav.complete_transition();
        assert!(!nav.next());
        assert_eq!(nav.current_index(), 1);
        assert!(nav.prev());
        assert_eq!(nav.current_index(), 0);
    }

    #[test]
    fn navigation_queues_scroll_request() {
        let (mut nav, _) = engine_with(3);
        nav.go_to_section(2);
        let req = nav.take_scroll_request().unwrap();
        assert_eq!(req.id, "s2");
        assert_eq!(req.node, NodeRef::at(200));
        assert!(nav.take_scroll_request().is_none());
    }

    #[test]
    fn tick_clears_guard_after_window() {
        let (mut nav, clock) = engine_with(3);
        nav.next();
        clock.advance(Duration::from_millis(400));
        assert!(!nav.tick());
        assert!(nav.is_transitioning());
        clock.advance(Duration::from_millis(600));
        assert!(nav.tick());
        assert!(!nav.is_transitioning());
    }

    #[test]
    fn observer_picks_most_visible_above_threshold() {
        let (mut nav, _) = engine_with(4);
        let changed = nav.observe(&[seen("s1", 0.6), seen("s2", 0.9), seen("s3", 0.3)]);
        assert_eq!(changed, Some(2));
        assert_eq!(nav.current_index(), 2);
    }

    #[test]
    fn observer_ignores_entries_below_threshold() {
        let (mut nav, _) = engine_with(4);
        assert_eq!(nav.observe(&[seen("s1", 0.49), seen("s2", 0.2)]), None);
        assert_eq!(nav.current_index(), 0);
    }

    #[test]
    fn observer_ties_keep_first_entry() {
        let (mut nav, _) = engine_with(4);
        assert_eq!(nav.observe(&[seen("s3", 0.7), seen("s1", 0.7)]), Some(3));
    }

    #[test]
    fn observer_suppressed_during_transition() {
        let (mut nav, clock) = engine_with(4);
        nav.go_to_section(3);
        assert_eq!(nav.observe(&[seen("s1", 1.0)]), None);
        assert_eq!(nav.current_index(), 3);
        clock.advance(Duration::from_millis(1000));
        nav.tick();
        assert_eq!(nav.observe(&[seen("s1", 1.0)]), Some(1));
    }

    #[test]
    fn stuck_transition_is_force_cleared() {
        let (mut nav, clock) = engine_with(4);
        nav.go_to_section(3);
        clock.advance(Duration::from_millis(1500));
        assert_eq!(nav.observe(&[seen("s0", 1.0)]), Some(0));
        assert!(!nav.is_transitioning());
    }

    #[test]
    fn keyboard_suppressed_in_text_entry_and_during_transition() {
        let (mut nav, _) = engine_with(4);
        assert!(!nav.handle_key("ArrowDown", FocusContext::TextArea));
        assert!(!nav.handle_key("ArrowDown", FocusContext::ContentEditable));
        assert_eq!(nav.current_index(), 0);
        assert!(nav.handle_key("ArrowDown", FocusContext::None));
        assert!(!nav.handle_key("ArrowDown", FocusContext::None));
        assert_eq!(nav.current_index(), 1);
        nav.complete_transition();
        assert!(nav.handle_key("End", FocusContext::Other));
        assert_eq!(nav.current_index(), 3);
        nav.complete_transition();
        assert!(nav.handle_key("Home", FocusContext::None));
        assert_eq!(nav.current_index(), 0);
        assert!(!nav.handle_key("x", FocusContext::None));
    }

    #[test]
    fn empty_registry_never_navigates() {
        let clock = ManualClock::new();
        let mut nav = NavigationEngine::with_clock(NavigationConfig::default(), clock);
        assert!(!nav.next());
        assert!(!nav.prev());
        assert!(!nav.handle_key("End", FocusContext::None));
        assert!(nav.current_section().is_none());
    }

    #[test]
    fn state_serializes_camel_case() {
        let state = NavigationState {
            current_index: 2,
            is_transitioning: true,
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["currentIndex"], 2);
        assert_eq!(json["isTransitioning"], true);
    }
}
