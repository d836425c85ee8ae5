//! Post-decision cooldown.
//!
//! The unlock deadline is an absolute wall-clock instant fixed at creation and
//! never moved. Polling only refreshes the countdown text; the unlock instant
//! is whatever `now >= unlock_time` says at the moment it is checked.

use crate::config::LOCK_DURATION_MS;
use crate::storage::{KeyValueStore, Records};
use crate::utils::format_countdown;
use crate::WheelOption;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub winner: WheelOption,
    /// Epoch milliseconds at which the lock releases.
    pub unlock_time: u64,
}

impl LockState {
    /// Lock `winner` in for [`LOCK_DURATION_MS`] starting at `now_ms`.
    pub fn engage(winner: WheelOption, now_ms: u64) -> Self {
        Self {
            winner,
            unlock_time: now_ms + LOCK_DURATION_MS,
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.unlock_time
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.unlock_time.saturating_sub(now_ms)
    }

    pub fn countdown(&self, now_ms: u64) -> String {
        format_countdown(self.remaining_ms(now_ms))
    }
}

/// Read the persisted lock at start-up. A lock still in the future is returned
/// untouched; an expired one is deleted from the store.
pub fn restore<S: KeyValueStore>(records: &Records<S>, now_ms: u64) -> Option<LockState> {
    let lock = records.lock()?;
    if lock.is_expired(now_ms) {
        info!("Discarding expired lock on '{}'", lock.winner.text);
        records.clear_lock();
        return None;
    }
    info!(
        "Resuming lock on '{}' with {} remaining",
        lock.winner.text,
        lock.countdown(now_ms)
    );
    Some(lock)
}
