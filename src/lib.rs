//! Decision engine for the Tiny Decisions wheel.
//!
//! Participants enter candidate options, spin an evenly divided wheel and
//! receive a randomly selected winner that stays locked in for a cooldown.
//! Everything that carries an invariant lives in this library so it can be
//! tested natively; `main.rs` only renders and schedules timers.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod lock;
pub mod registry;
pub mod session;
pub mod spin;
pub mod storage;
pub mod suggest;
pub mod utils;

pub use lock::LockState;
pub use registry::OptionRegistry;
pub use session::{DecisionEngine, Effect, Event, HapticPattern, Mode, Outcome};
pub use spin::SpinPlan;
pub use storage::{KeyValueStore, MemoryStore, Records};

/// One candidate on the wheel. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WheelOption {
    pub id: String,
    pub text: String,
    pub color: String,
}

/// A completed spin, copied out of the registry at decision time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub winner: WheelOption,
    pub timestamp: u64,
}

/// A named snapshot of the registry contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedWheel {
    pub id: String,
    pub name: String,
    pub options: Vec<WheelOption>,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
}

/// Which guard produced an [`DecisionError::InsufficientOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Spin,
    DuoFirstPick,
    DuoSecondPick,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionError {
    /// A spin or duo hand-off was attempted below its minimum option count.
    InsufficientOptions {
        stage: Stage,
        needed: usize,
        found: usize,
    },
    /// Blank option text, blank names and the like. Callers treat it as a no-op.
    InvalidInput(&'static str),
    /// The key/value store could not be read or written.
    PersistenceUnavailable(String),
    /// The suggestion provider failed to produce labels.
    SuggestionProviderFailure(String),
}

impl fmt::Display for DecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionError::InsufficientOptions { stage, needed, found } => match stage {
                Stage::Spin => write!(f, "Add at least {} options! (currently {})", needed, found),
                Stage::DuoFirstPick => write!(
                    f,
                    "User A must add at least {} options (added {})",
                    needed, found
                ),
                Stage::DuoSecondPick => write!(
                    f,
                    "User B must add at least {} options! (added {})",
                    needed, found
                ),
            },
            DecisionError::InvalidInput(what) => write!(f, "Invalid input: {}", what),
            DecisionError::PersistenceUnavailable(reason) => {
                write!(f, "Storage unavailable: {}", reason)
            }
            DecisionError::SuggestionProviderFailure(reason) => {
                write!(f, "Suggestion provider failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for DecisionError {}
