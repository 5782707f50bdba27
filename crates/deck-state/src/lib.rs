//! # deck-state: Client-Side State Machines
//!
//! Pure, synchronous state machines shared by every deckforge surface:
//!
//! - [`history`]: bounded linear undo/redo over immutable snapshots.
//! - [`navigation`]: current-section tracking with a transition guard
//!   that arbitrates between programmatic scrolls and visibility updates.
//! - [`keyboard`]: key-name mapping and focus classification.
//! - [`session`]: a viewer's navigation plus edit-mode toggle.
//!
//! Nothing here performs I/O. Time enters through the [`Clock`] trait so
//! the transition logic is deterministic under test.

pub mod clock;
pub mod history;
pub mod keyboard;
pub mod navigation;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use history::{History, HistoryStatus, SharedHistory, DEFAULT_MAX_HISTORY};
pub use keyboard::{FocusContext, NavAction};
pub use navigation::{
    NavigationConfig, NavigationEngine, NavigationState, NodeRef, ScrollRequest, SectionInfo,
    VisibilityEntry,
};
pub use session::{PresentationSession, SessionStatus};
