//! Application-level configuration constants.

// Wheel capacity
pub const MAX_OPTIONS: usize = 12;
pub const MIN_SPIN_OPTIONS: usize = 2;
pub const MIN_DUO_PICKS: usize = 2;

// Segment palette, assigned by position modulo its length
pub const WHEEL_COLORS: [&str; 8] = [
    "#EF4444", // Red
    "#3B82F6", // Blue
    "#10B981", // Emerald
    "#F59E0B", // Amber
    "#8B5CF6", // Violet
    "#EC4899", // Pink
    "#06B6D4", // Cyan
    "#84CC16", // Lime
];

// Timing
pub const LOCK_DURATION_MS: u64 = 2 * 60 * 1000;
pub const SPIN_DURATION_MS: u32 = 4_000;
pub const COUNTDOWN_TICK_MS: u32 = 1_000;
pub const DUO_SYNC_DELAY_MS: u32 = 1_500;

// Spin geometry
pub const EXTRA_REVOLUTIONS: u32 = 5;
pub const JITTER_FRACTION: f64 = 0.4;

// Records
pub const HISTORY_LIMIT: usize = 50;
pub const ID_LEN: usize = 6;

// Seeds and fallbacks
pub const DEFAULT_OPTIONS: [&str; 3] = ["Pizza", "Sushi", "Tacos"];
pub const FALLBACK_SUGGESTIONS: [&str; 5] = ["Pizza", "Burgers", "Salad", "Sushi", "Tacos"];
pub const SUGGESTION_LIMIT: usize = 6;
pub const SUGGESTION_MODEL: &str = "gemini-2.5-flash";
pub const SUGGESTION_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// Haptics (milliseconds of vibration / pause)
pub const HAPTIC_SPIN_START_MS: u32 = 200;
pub const HAPTIC_DECISION_PATTERN: [u32; 3] = [100, 50, 100];

/// Keys under which records live in the key/value store.
pub mod keys {
    pub const LOCK: &str = "tiny_decisions_lock_state";
    pub const PROFILE: &str = "tiny_decisions_profile";
    pub const SAVED_WHEELS: &str = "tiny_decisions_saved_wheels";
    pub const HISTORY: &str = "tiny_decisions_history";
}
