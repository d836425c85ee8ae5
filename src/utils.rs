//! Small helpers shared by the engine and the UI: clock, ids, label cleanup,
//! countdown formatting and the duo pairing ticket.

use crate::config::ID_LEN;
use crate::DecisionError;
use rand::Rng;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Wall-clock time in milliseconds since the Unix epoch.
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

/// Wall-clock time in milliseconds since the Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Short base-36 identifier, unique enough within one local session.
pub fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Trim a user-entered label, rejecting blank input.
pub fn normalize_label(input: &str, field_name: &'static str) -> Result<String, DecisionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DecisionError::InvalidInput(field_name));
    }
    Ok(trimmed.to_string())
}

/// Render remaining lock time as `m:ss`, flooring both parts.
///
/// # Examples
/// ```
/// use tiny_decisions::utils::format_countdown;
/// assert_eq!(format_countdown(60_000), "1:00");
/// assert_eq!(format_countdown(59_001), "0:59");
/// ```
pub fn format_countdown(remaining_ms: u64) -> String {
    let minutes = remaining_ms / 60_000;
    let seconds = (remaining_ms % 60_000) / 1_000;
    format!("{}:{:02}", minutes, seconds)
}

/// Rendezvous details shown while waiting for the second participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingTicket {
    pub session_id: String,
    pub url: String,
}

impl PairingTicket {
    /// `base_url` is origin + path; any query string on it is dropped.
    pub fn new<R: Rng + ?Sized>(base_url: &str, rng: &mut R) -> Self {
        let session_id = random_id(rng);
        let base = base_url.split('?').next().unwrap_or(base_url);
        Self {
            url: format!("{}?session={}", base, session_id),
            session_id,
        }
    }
}
