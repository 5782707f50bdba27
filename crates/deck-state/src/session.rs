//! Presentation session: navigation plus the edit-mode toggle.
//!
//! Keyboard navigation is active only while presenting. In edit mode arrow
//! keys belong to the editing surface.

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::keyboard::FocusContext;
use crate::navigation::{NavigationConfig, NavigationEngine, NavigationState};

/// Snapshot of a session for status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Whether the editor UI is active.
    pub edit_mode: bool,
    /// Number of mounted sections.
    pub section_count: usize,
    /// Navigation state.
    #[serde(flatten)]
    pub navigation: NavigationState,
}

/// One viewer's presentation session.
#[derive(Debug)]
pub struct PresentationSession<C: Clock = SystemClock> {
    navigation: NavigationEngine<C>,
    edit_mode: bool,
}

impl PresentationSession<SystemClock> {
    /// Session on the wall clock, presenting.
    pub fn new() -> Self {
        Self::with_clock(NavigationConfig::default(), SystemClock)
    }
}

impl Default for PresentationSession<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> PresentationSession<C> {
    /// Session with explicit navigation configuration and clock.
    pub fn with_clock(config: NavigationConfig, clock: C) -> Self {
        Self {
            navigation: NavigationEngine::with_clock(config, clock),
            edit_mode: false,
        }
    }

    pub fn navigation(&self) -> &NavigationEngine<C> {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut NavigationEngine<C> {
        &mut self.navigation
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, on: bool) {
        if self.edit_mode != on {
            tracing::debug!(edit_mode = on, "edit mode changed");
        }
        self.edit_mode = on;
    }

    /// Flip edit mode and return the new value.
    pub fn toggle_edit_mode(&mut self) -> bool {
        self.set_edit_mode(!self.edit_mode);
        self.edit_mode
    }

    /// Route a key press. Ignored entirely while editing.
    pub fn handle_key(&mut self, key: &str, focus: FocusContext) -> bool {
        if self.edit_mode {
            return false;
        }
        self.navigation.handle_key(key, focus)
    }

    /// Drop navigation entries for sections no longer in the deck.
    pub fn retain_sections<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        self.navigation.retain_sections(ids);
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            edit_mode: self.edit_mode,
            section_count: self.navigation.len(),
            navigation: self.navigation.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::navigation::NodeRef;

    fn session() -> PresentationSession<ManualClock> {
        let mut s = PresentationSession::with_clock(NavigationConfig::default(), ManualClock::new());
        for i in 0..3u64 {
            s.navigation_mut()
                .register_section(format!("s{i}"), NodeRef::at(i), None);
        }
        s
    }

    #[test]
    fn keys_ignored_in_edit_mode() {
        let mut s = session();
        assert!(s.toggle_edit_mode());
        assert!(!s.handle_key("ArrowDown", FocusContext::None));
        assert_eq!(s.navigation().current_index(), 0);
        assert!(!s.toggle_edit_mode());
        assert!(s.handle_key("ArrowDown", FocusContext::None));
        assert_eq!(s.navigation().current_index(), 1);
    }

    #[test]
    fn status_reflects_navigation() {
        let mut s = session();
        s.navigation_mut().go_to_section(2);
        let status = s.status();
        assert_eq!(status.section_count, 3);
        assert_eq!(status.navigation.current_index, 2);
        assert!(status.navigation.is_transitioning);
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["currentIndex"], 2);
        assert_eq!(json["editMode"], false);
    }

    #[test]
    fn retain_drops_deleted_sections() {
        let mut s = session();
        s.retain_sections(["s0", "s2"]);
        assert_eq!(s.status().section_count, 2);
    }
}
