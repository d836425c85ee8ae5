//! Session state machine.
//!
//! The engine reacts to one [`Event`] at a time and never blocks. Anything
//! that has to happen later (spin completion, countdown ticks, the duo merge
//! overlay) is requested from the driver as an [`Effect`] and comes back as
//! another event. A refused guard is returned as [`Outcome::Refused`] and
//! leaves every piece of state untouched.

use crate::config::{
    COUNTDOWN_TICK_MS, DUO_SYNC_DELAY_MS, HAPTIC_DECISION_PATTERN, HAPTIC_SPIN_START_MS,
    MIN_DUO_PICKS, SPIN_DURATION_MS,
};
use crate::lock::{self, LockState};
use crate::registry::OptionRegistry;
use crate::spin::{plan_spin, SpinPlan};
use crate::storage::{KeyValueStore, Records};
use crate::utils::{normalize_label, random_id};
use crate::{DecisionError, HistoryEntry, SavedWheel, Stage, UserProfile, WheelOption};
use log::{debug, info, warn};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Solo,
    DuoSetup,
    DuoInputA,
    DuoInputB,
    Spinning,
    Locked,
    Profile,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AddOption(String),
    RemoveOption(String),
    /// Labels accepted from the suggestion provider.
    ApplySuggestions(Vec<String>),
    /// `forced_index` replays a known winner; `None` draws one.
    StartSpin { forced_index: Option<usize> },
    SpinComplete { ticket: u64 },
    /// The owner of the timers is going away.
    Teardown,
    /// Countdown refresh while a lock is held.
    Tick,
    StartDuo,
    CancelPairing,
    PairingComplete,
    FinishInput,
    SyncSettled,
    ExitDuo,
    OpenProfile,
    CloseProfile,
    SaveProfile(String),
    SaveWheel(String),
    LoadWheel(String),
    DeleteWheel(String),
    ClearHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticPattern {
    SpinStart,
    Decision,
}

impl HapticPattern {
    /// Alternating vibrate/pause durations in milliseconds.
    pub fn pulses(self) -> &'static [u32] {
        const SPIN_START: [u32; 1] = [HAPTIC_SPIN_START_MS];
        match self {
            HapticPattern::SpinStart => &SPIN_START,
            HapticPattern::Decision => &HAPTIC_DECISION_PATTERN,
        }
    }
}

/// Work the driver performs on the engine's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ScheduleSpinCompletion { ticket: u64, after_ms: u32 },
    CancelSpinCompletion,
    StartCountdown { period_ms: u32 },
    StopCountdown,
    ScheduleSyncSettled { after_ms: u32 },
    Haptic(HapticPattern),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Not applicable in the current state; nothing changed.
    Ignored,
    /// State changed; the driver must apply these effects in order.
    Applied(Vec<Effect>),
    /// A guard failed and should be shown to the user; nothing changed.
    Refused(DecisionError),
}

#[derive(Debug, Clone)]
struct InFlightSpin {
    ticket: u64,
    winner: WheelOption,
}

pub struct DecisionEngine<S, R> {
    records: Records<S>,
    rng: R,
    mode: Mode,
    registry: OptionRegistry,
    is_duo_session: bool,
    duo_split_index: usize,
    syncing: bool,
    lock: Option<LockState>,
    rotation_deg: f64,
    spin: Option<InFlightSpin>,
    last_ticket: u64,
    last_plan: Option<SpinPlan>,
    profile: Option<UserProfile>,
    saved_wheels: Vec<SavedWheel>,
    history: Vec<HistoryEntry>,
}

impl<S: KeyValueStore, R: Rng> DecisionEngine<S, R> {
    /// Build the initial session from whatever the store holds.
    ///
    /// An unexpired lock resumes in `Locked` with its original deadline; a
    /// missing profile starts onboarding in `Profile`; otherwise `Solo`.
    pub fn boot(store: S, mut rng: R, now_ms: u64) -> (Self, Vec<Effect>) {
        let records = Records::new(store);
        let lock = lock::restore(&records, now_ms);
        let profile = records.profile();
        let registry = OptionRegistry::seeded(&mut rng);

        let (mode, effects) = match (&lock, &profile) {
            (Some(_), _) => (
                Mode::Locked,
                vec![Effect::StartCountdown {
                    period_ms: COUNTDOWN_TICK_MS,
                }],
            ),
            (None, None) => (Mode::Profile, Vec::new()),
            (None, Some(_)) => (Mode::Solo, Vec::new()),
        };
        info!("Session starts in {:?}", mode);

        let engine = Self {
            saved_wheels: records.saved_wheels(),
            history: records.history(),
            records,
            rng,
            mode,
            registry,
            is_duo_session: false,
            duo_split_index: 0,
            syncing: false,
            lock,
            rotation_deg: 0.0,
            spin: None,
            last_ticket: 0,
            last_plan: None,
            profile,
        };
        (engine, effects)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &[WheelOption] {
        self.registry.options()
    }

    pub fn is_duo_session(&self) -> bool {
        self.is_duo_session
    }

    pub fn duo_split_index(&self) -> usize {
        self.duo_split_index
    }

    /// Options contributed by the participant currently entering.
    pub fn current_pick_count(&self) -> usize {
        match self.mode {
            Mode::DuoInputB => self.registry.len() - self.duo_split_index,
            _ => self.registry.len(),
        }
    }

    /// True while the "merging choices" overlay should show.
    pub fn is_syncing(&self) -> bool {
        self.syncing
    }

    pub fn lock_state(&self) -> Option<&LockState> {
        self.lock.as_ref()
    }

    pub fn rotation_deg(&self) -> f64 {
        self.rotation_deg
    }

    pub fn last_plan(&self) -> Option<&SpinPlan> {
        self.last_plan.as_ref()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn is_onboarding(&self) -> bool {
        self.profile.is_none()
    }

    pub fn saved_wheels(&self) -> &[SavedWheel] {
        &self.saved_wheels
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn records(&self) -> &Records<S> {
        &self.records
    }

    pub fn dispatch(&mut self, event: Event, now_ms: u64) -> Outcome {
        debug!("{:?} <- {:?}", self.mode, event);
        match event {
            Event::AddOption(text) => self.add_option(&text),
            Event::RemoveOption(id) => self.remove_option(&id),
            Event::ApplySuggestions(labels) => self.apply_suggestions(&labels),
            Event::StartSpin { forced_index } => self.start_spin(forced_index),
            Event::SpinComplete { ticket } => self.complete_spin(ticket, now_ms),
            Event::Teardown => self.teardown(),
            Event::Tick => self.tick(now_ms),
            Event::StartDuo => self.start_duo(),
            Event::CancelPairing => self.cancel_pairing(),
            Event::PairingComplete => self.pairing_complete(),
            Event::FinishInput => self.finish_input(),
            Event::SyncSettled => self.sync_settled(),
            Event::ExitDuo => self.exit_duo(now_ms),
            Event::OpenProfile => self.open_profile(),
            Event::CloseProfile => self.close_profile(now_ms),
            Event::SaveProfile(name) => self.save_profile(&name, now_ms),
            Event::SaveWheel(name) => self.save_wheel(&name, now_ms),
            Event::LoadWheel(id) => self.load_wheel(&id, now_ms),
            Event::DeleteWheel(id) => self.delete_wheel(&id),
            Event::ClearHistory => self.clear_history(),
        }
    }

    fn enter(&mut self, mode: Mode) {
        if self.mode != mode {
            info!("{:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    fn accepts_option_edits(&self) -> bool {
        !self.syncing && matches!(self.mode, Mode::Solo | Mode::DuoInputA | Mode::DuoInputB)
    }

    fn lock_active(&self, now_ms: u64) -> bool {
        self.lock.as_ref().is_some_and(|l| !l.is_expired(now_ms))
    }

    // ── option registry ────────────────────────────────────────────────

    fn add_option(&mut self, text: &str) -> Outcome {
        if !self.accepts_option_edits() {
            return Outcome::Ignored;
        }
        if self.registry.add(text, &mut self.rng) {
            Outcome::Applied(Vec::new())
        } else {
            Outcome::Ignored
        }
    }

    fn remove_option(&mut self, id: &str) -> Outcome {
        if !self.accepts_option_edits() {
            return Outcome::Ignored;
        }
        match self.registry.remove(id) {
            Some(pos) => {
                if pos < self.duo_split_index {
                    self.duo_split_index -= 1;
                }
                Outcome::Applied(Vec::new())
            }
            None => Outcome::Ignored,
        }
    }

    fn apply_suggestions(&mut self, labels: &[String]) -> Outcome {
        if self.mode != Mode::Solo || self.is_duo_session || self.syncing {
            return Outcome::Ignored;
        }
        if labels.iter().all(|l| l.trim().is_empty()) {
            return Outcome::Ignored;
        }
        self.registry.replace_with_labels(labels, &mut self.rng);
        Outcome::Applied(Vec::new())
    }

    // ── spin and lock ──────────────────────────────────────────────────

    fn start_spin(&mut self, forced_index: Option<usize>) -> Outcome {
        // the merged list is frozen until the overlay settles
        if self.mode != Mode::Solo || self.syncing {
            return Outcome::Ignored;
        }
        let plan = match plan_spin(self.registry.len(), self.rotation_deg, forced_index, &mut self.rng)
        {
            Ok(plan) => plan,
            Err(err) => {
                info!("Spin refused: {}", err);
                return Outcome::Refused(err);
            }
        };
        self.last_ticket += 1;
        let ticket = self.last_ticket;
        self.spin = Some(InFlightSpin {
            ticket,
            winner: self.registry.options()[plan.winner_index].clone(),
        });
        self.rotation_deg = plan.target_rotation_deg;
        self.last_plan = Some(plan);
        self.enter(Mode::Spinning);
        Outcome::Applied(vec![
            Effect::Haptic(HapticPattern::SpinStart),
            Effect::ScheduleSpinCompletion {
                ticket,
                after_ms: SPIN_DURATION_MS,
            },
        ])
    }

    fn complete_spin(&mut self, ticket: u64, now_ms: u64) -> Outcome {
        let matches = self.mode == Mode::Spinning
            && self.spin.as_ref().is_some_and(|s| s.ticket == ticket);
        if !matches {
            debug!("Ignoring stale spin completion #{}", ticket);
            return Outcome::Ignored;
        }
        let Some(spin) = self.spin.take() else {
            return Outcome::Ignored;
        };

        let lock = LockState::engage(spin.winner.clone(), now_ms);
        self.records.save_lock(&lock);
        self.history = self.records.push_history(HistoryEntry {
            id: random_id(&mut self.rng),
            winner: spin.winner,
            timestamp: now_ms,
        });
        info!("Decision '{}' locked until {}", lock.winner.text, lock.unlock_time);
        self.lock = Some(lock);
        self.enter(Mode::Locked);
        Outcome::Applied(vec![
            Effect::Haptic(HapticPattern::Decision),
            Effect::StartCountdown {
                period_ms: COUNTDOWN_TICK_MS,
            },
        ])
    }

    fn teardown(&mut self) -> Outcome {
        if self.spin.take().is_some() {
            info!("Abandoning in-flight spin");
            self.enter(Mode::Solo);
        }
        Outcome::Applied(vec![Effect::CancelSpinCompletion, Effect::StopCountdown])
    }

    fn tick(&mut self, now_ms: u64) -> Outcome {
        if !matches!(self.mode, Mode::Locked | Mode::Profile) {
            return Outcome::Ignored;
        }
        match &self.lock {
            Some(lock) if lock.is_expired(now_ms) => {}
            _ => return Outcome::Ignored,
        }
        self.release_lock();
        if self.mode == Mode::Locked {
            self.enter(Mode::Solo);
        }
        Outcome::Applied(vec![Effect::StopCountdown])
    }

    fn release_lock(&mut self) {
        if let Some(lock) = self.lock.take() {
            info!("Lock on '{}' released", lock.winner.text);
        }
        self.records.clear_lock();
    }

    // ── duo flow ───────────────────────────────────────────────────────

    fn start_duo(&mut self) -> Outcome {
        if self.mode != Mode::Solo {
            return Outcome::Ignored;
        }
        self.enter(Mode::DuoSetup);
        Outcome::Applied(Vec::new())
    }

    fn cancel_pairing(&mut self) -> Outcome {
        if self.mode != Mode::DuoSetup {
            return Outcome::Ignored;
        }
        self.enter(Mode::Solo);
        Outcome::Applied(Vec::new())
    }

    fn pairing_complete(&mut self) -> Outcome {
        if self.mode != Mode::DuoSetup {
            return Outcome::Ignored;
        }
        self.registry.clear();
        self.duo_split_index = 0;
        self.is_duo_session = true;
        self.enter(Mode::DuoInputA);
        Outcome::Applied(Vec::new())
    }

    fn finish_input(&mut self) -> Outcome {
        match self.mode {
            Mode::DuoInputA => {
                let found = self.registry.len();
                if found < MIN_DUO_PICKS {
                    return Outcome::Refused(DecisionError::InsufficientOptions {
                        stage: Stage::DuoFirstPick,
                        needed: MIN_DUO_PICKS,
                        found,
                    });
                }
                self.duo_split_index = found;
                self.enter(Mode::DuoInputB);
                Outcome::Applied(Vec::new())
            }
            Mode::DuoInputB => {
                let found = self.registry.len() - self.duo_split_index;
                if found < MIN_DUO_PICKS {
                    return Outcome::Refused(DecisionError::InsufficientOptions {
                        stage: Stage::DuoSecondPick,
                        needed: MIN_DUO_PICKS,
                        found,
                    });
                }
                self.syncing = true;
                self.enter(Mode::Solo);
                Outcome::Applied(vec![Effect::ScheduleSyncSettled {
                    after_ms: DUO_SYNC_DELAY_MS,
                }])
            }
            _ => Outcome::Ignored,
        }
    }

    fn sync_settled(&mut self) -> Outcome {
        if !self.syncing {
            return Outcome::Ignored;
        }
        self.syncing = false;
        Outcome::Applied(Vec::new())
    }

    fn exit_duo(&mut self, now_ms: u64) -> Outcome {
        if self.mode == Mode::Spinning || (self.mode == Mode::Profile && self.is_onboarding()) {
            return Outcome::Ignored;
        }
        self.is_duo_session = false;
        self.duo_split_index = 0;
        self.syncing = false;
        self.registry.reset(&mut self.rng);
        Outcome::Applied(self.settle_lock(now_ms))
    }

    // ── profile and records ────────────────────────────────────────────

    fn open_profile(&mut self) -> Outcome {
        if !matches!(self.mode, Mode::Solo | Mode::Locked) {
            return Outcome::Ignored;
        }
        self.enter(Mode::Profile);
        Outcome::Applied(Vec::new())
    }

    /// Back to `Locked` while the lock holds, otherwise release it and go to
    /// `Solo`. A held decision is never cut short.
    fn settle_lock(&mut self, now_ms: u64) -> Vec<Effect> {
        if self.lock_active(now_ms) {
            self.enter(Mode::Locked);
            return Vec::new();
        }
        let mut effects = Vec::new();
        if self.lock.is_some() {
            self.release_lock();
            effects.push(Effect::StopCountdown);
        }
        self.enter(Mode::Solo);
        effects
    }

    fn close_profile(&mut self, now_ms: u64) -> Outcome {
        if self.mode != Mode::Profile || self.is_onboarding() {
            return Outcome::Ignored;
        }
        Outcome::Applied(self.settle_lock(now_ms))
    }

    fn save_profile(&mut self, name: &str, now_ms: u64) -> Outcome {
        if self.mode != Mode::Profile {
            return Outcome::Ignored;
        }
        let Ok(name) = normalize_label(name, "profile name") else {
            return Outcome::Ignored;
        };
        let was_onboarding = self.is_onboarding();
        let profile = UserProfile { name };
        self.records.save_profile(&profile);
        self.profile = Some(profile);
        if was_onboarding {
            return Outcome::Applied(self.settle_lock(now_ms));
        }
        Outcome::Applied(Vec::new())
    }

    fn save_wheel(&mut self, name: &str, now_ms: u64) -> Outcome {
        if self.mode != Mode::Solo
            || self.is_duo_session
            || self.syncing
            || self.registry.is_empty()
        {
            return Outcome::Ignored;
        }
        let Ok(name) = normalize_label(name, "wheel name") else {
            return Outcome::Ignored;
        };
        let wheel = SavedWheel {
            id: random_id(&mut self.rng),
            name,
            options: self.registry.options().to_vec(),
            created_at: now_ms,
        };
        debug!("Saving wheel '{}' with {} options", wheel.name, wheel.options.len());
        self.saved_wheels = self.records.save_wheel(wheel);
        Outcome::Applied(Vec::new())
    }

    fn load_wheel(&mut self, id: &str, now_ms: u64) -> Outcome {
        if self.mode != Mode::Profile {
            return Outcome::Ignored;
        }
        let Some(wheel) = self.saved_wheels.iter().find(|w| w.id == id).cloned() else {
            warn!("No saved wheel with id '{}'", id);
            return Outcome::Ignored;
        };
        self.registry.replace_all(&wheel.options);
        self.is_duo_session = false;
        self.duo_split_index = 0;
        self.syncing = false;
        Outcome::Applied(self.settle_lock(now_ms))
    }

    fn delete_wheel(&mut self, id: &str) -> Outcome {
        if self.mode != Mode::Profile || !self.saved_wheels.iter().any(|w| w.id == id) {
            return Outcome::Ignored;
        }
        self.saved_wheels = self.records.delete_wheel(id);
        Outcome::Applied(Vec::new())
    }

    fn clear_history(&mut self) -> Outcome {
        if self.mode != Mode::Profile {
            return Outcome::Ignored;
        }
        self.records.clear_history();
        self.history.clear();
        Outcome::Applied(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{keys, DEFAULT_OPTIONS, HISTORY_LIMIT, LOCK_DURATION_MS, MAX_OPTIONS};
    use crate::storage::tests::BrokenStore;
    use crate::storage::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const T0: u64 = 1_700_000_000_000;

    type Engine = DecisionEngine<MemoryStore, StdRng>;

    fn store_with_profile() -> MemoryStore {
        let store = MemoryStore::default();
        store.set(keys::PROFILE, r#"{"name":"Ada"}"#).unwrap();
        store
    }

    fn solo_engine() -> Engine {
        let (engine, effects) =
            DecisionEngine::boot(store_with_profile(), StdRng::seed_from_u64(5), T0);
        assert_eq!(engine.mode(), Mode::Solo);
        assert!(effects.is_empty());
        engine
    }

    fn texts(engine: &Engine) -> Vec<&str> {
        engine.options().iter().map(|o| o.text.as_str()).collect()
    }

    fn spin_ticket(outcome: &Outcome) -> u64 {
        match outcome {
            Outcome::Applied(effects) => effects
                .iter()
                .find_map(|e| match e {
                    Effect::ScheduleSpinCompletion { ticket, .. } => Some(*ticket),
                    _ => None,
                })
                .expect("spin completion scheduled"),
            other => panic!("spin did not start: {:?}", other),
        }
    }

    fn lock_blob(winner: &str, unlock_time: u64) -> String {
        format!(
            r##"{{"winner":{{"id":"w1","text":"{}","color":"#EF4444"}},"unlockTime":{}}}"##,
            winner, unlock_time
        )
    }

    #[test]
    fn boot_without_profile_starts_onboarding() {
        let (engine, _) =
            DecisionEngine::boot(MemoryStore::default(), StdRng::seed_from_u64(1), T0);
        assert_eq!(engine.mode(), Mode::Profile);
        assert!(engine.is_onboarding());
        assert_eq!(texts(&engine), DEFAULT_OPTIONS);
    }

    #[test]
    fn boot_with_expired_lock_starts_solo_and_clears_it() {
        let store = store_with_profile();
        store.set(keys::LOCK, &lock_blob("Sushi", T0 - 1)).unwrap();

        let (engine, effects) = DecisionEngine::boot(store, StdRng::seed_from_u64(1), T0);
        assert_eq!(engine.mode(), Mode::Solo);
        assert!(effects.is_empty());
        assert!(engine.lock_state().is_none());
        assert_eq!(engine.records().store().get(keys::LOCK).unwrap(), None);
    }

    #[test]
    fn boot_with_future_lock_resumes_locked() {
        let store = store_with_profile();
        store.set(keys::LOCK, &lock_blob("Sushi", T0 + 60_000)).unwrap();

        let (engine, effects) = DecisionEngine::boot(store, StdRng::seed_from_u64(1), T0);
        assert_eq!(engine.mode(), Mode::Locked);
        assert_eq!(effects, vec![Effect::StartCountdown { period_ms: 1_000 }]);
        let lock = engine.lock_state().unwrap();
        assert_eq!(lock.winner.text, "Sushi");
        assert_eq!(lock.unlock_time, T0 + 60_000);
        assert_eq!(lock.remaining_ms(T0), 60_000);
        assert_eq!(lock.countdown(T0), "1:00");
    }

    #[test]
    fn locked_takes_precedence_over_onboarding() {
        let store = MemoryStore::default();
        store.set(keys::LOCK, &lock_blob("Tacos", T0 + 5_000)).unwrap();
        let (engine, _) = DecisionEngine::boot(store, StdRng::seed_from_u64(1), T0);
        assert_eq!(engine.mode(), Mode::Locked);
    }

    #[test]
    fn spin_with_one_option_is_refused() {
        let mut engine = solo_engine();
        let extra: Vec<String> = engine.options()[1..].iter().map(|o| o.id.clone()).collect();
        for id in extra {
            engine.dispatch(Event::RemoveOption(id), T0);
        }
        let outcome = engine.dispatch(Event::StartSpin { forced_index: None }, T0);
        assert!(matches!(
            outcome,
            Outcome::Refused(DecisionError::InsufficientOptions {
                stage: Stage::Spin,
                found: 1,
                ..
            })
        ));
        assert_eq!(engine.mode(), Mode::Solo);
        assert_eq!(engine.rotation_deg(), 0.0);
    }

    #[test]
    fn whitespace_and_overflow_adds_are_ignored() {
        let mut engine = solo_engine();
        assert_eq!(engine.dispatch(Event::AddOption("   ".into()), T0), Outcome::Ignored);
        for i in engine.options().len()..MAX_OPTIONS {
            engine.dispatch(Event::AddOption(format!("extra {}", i)), T0);
        }
        assert_eq!(engine.options().len(), MAX_OPTIONS);
        assert_eq!(engine.dispatch(Event::AddOption("13th".into()), T0), Outcome::Ignored);
        assert_eq!(engine.options().len(), MAX_OPTIONS);
    }

    #[test]
    fn full_spin_cycle_locks_records_and_releases() {
        let mut engine = solo_engine();
        let outcome = engine.dispatch(Event::StartSpin { forced_index: Some(1) }, T0);
        let ticket = spin_ticket(&outcome);
        assert!(matches!(&outcome, Outcome::Applied(e) if e[0] == Effect::Haptic(HapticPattern::SpinStart)));
        assert_eq!(engine.mode(), Mode::Spinning);
        assert_eq!(engine.last_plan().map(|p| p.winner_index), Some(1));
        assert!(engine.rotation_deg() > 0.0);

        // no second spin while one is in flight
        assert_eq!(engine.dispatch(Event::StartSpin { forced_index: None }, T0), Outcome::Ignored);

        let done = T0 + 4_000;
        let outcome = engine.dispatch(Event::SpinComplete { ticket }, done);
        assert_eq!(
            outcome,
            Outcome::Applied(vec![
                Effect::Haptic(HapticPattern::Decision),
                Effect::StartCountdown { period_ms: 1_000 },
            ])
        );
        assert_eq!(engine.mode(), Mode::Locked);
        let lock = engine.lock_state().unwrap().clone();
        assert_eq!(lock.winner.text, "Sushi");
        assert_eq!(lock.unlock_time, done + LOCK_DURATION_MS);
        assert_eq!(engine.records().lock(), Some(lock.clone()));
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.history()[0].winner.text, "Sushi");

        // completion fires once only
        assert_eq!(engine.dispatch(Event::SpinComplete { ticket }, done), Outcome::Ignored);

        // ticks before the deadline change nothing
        assert_eq!(engine.dispatch(Event::Tick, done + 1_000), Outcome::Ignored);
        assert_eq!(engine.mode(), Mode::Locked);

        let outcome = engine.dispatch(Event::Tick, lock.unlock_time);
        assert_eq!(outcome, Outcome::Applied(vec![Effect::StopCountdown]));
        assert_eq!(engine.mode(), Mode::Solo);
        assert!(engine.lock_state().is_none());
        assert_eq!(engine.records().lock(), None);

        // expiry transition happens exactly once
        assert_eq!(engine.dispatch(Event::Tick, lock.unlock_time + 1_000), Outcome::Ignored);
    }

    #[test]
    fn consecutive_spins_keep_rotating_forward() {
        let mut engine = solo_engine();
        let mut now = T0;
        let mut last_rotation = engine.rotation_deg();
        for _ in 0..3 {
            let ticket = spin_ticket(&engine.dispatch(Event::StartSpin { forced_index: None }, now));
            assert!(engine.rotation_deg() > last_rotation);
            last_rotation = engine.rotation_deg();
            now += 4_000;
            engine.dispatch(Event::SpinComplete { ticket }, now);
            now += LOCK_DURATION_MS;
            engine.dispatch(Event::Tick, now);
            assert_eq!(engine.mode(), Mode::Solo);
        }
        assert_eq!(engine.history().len(), 3);
    }

    #[test]
    fn teardown_suppresses_pending_completion() {
        let mut engine = solo_engine();
        let ticket = spin_ticket(&engine.dispatch(Event::StartSpin { forced_index: None }, T0));

        let outcome = engine.dispatch(Event::Teardown, T0 + 100);
        assert_eq!(
            outcome,
            Outcome::Applied(vec![Effect::CancelSpinCompletion, Effect::StopCountdown])
        );
        assert_eq!(engine.mode(), Mode::Solo);

        assert_eq!(engine.dispatch(Event::SpinComplete { ticket }, T0 + 4_000), Outcome::Ignored);
        assert!(engine.lock_state().is_none());
        assert!(engine.history().is_empty());
    }

    #[test]
    fn completion_from_an_older_spin_is_ignored() {
        let mut engine = solo_engine();
        let first = spin_ticket(&engine.dispatch(Event::StartSpin { forced_index: None }, T0));
        engine.dispatch(Event::Teardown, T0);
        let second = spin_ticket(&engine.dispatch(Event::StartSpin { forced_index: None }, T0));
        assert_ne!(first, second);

        assert_eq!(engine.dispatch(Event::SpinComplete { ticket: first }, T0), Outcome::Ignored);
        assert_eq!(engine.mode(), Mode::Spinning);
        assert!(matches!(
            engine.dispatch(Event::SpinComplete { ticket: second }, T0),
            Outcome::Applied(_)
        ));
    }

    #[test]
    fn history_keeps_fifty_most_recent_decisions() {
        let mut engine = solo_engine();
        let mut now = T0;
        for _ in 0..=HISTORY_LIMIT {
            let ticket = spin_ticket(&engine.dispatch(Event::StartSpin { forced_index: None }, now));
            now += 4_000;
            engine.dispatch(Event::SpinComplete { ticket }, now);
            now += LOCK_DURATION_MS;
            engine.dispatch(Event::Tick, now);
        }
        assert_eq!(engine.history().len(), HISTORY_LIMIT);
        assert!(engine.history().iter().all(|e| e.timestamp > T0 + 4_000));
    }

    #[test]
    fn duo_end_to_end() {
        let mut engine = solo_engine();
        assert_eq!(texts(&engine), ["Pizza", "Sushi", "Tacos"]);

        engine.dispatch(Event::StartDuo, T0);
        assert_eq!(engine.mode(), Mode::DuoSetup);
        engine.dispatch(Event::PairingComplete, T0);
        assert_eq!(engine.mode(), Mode::DuoInputA);
        assert!(engine.options().is_empty());
        assert!(engine.is_duo_session());

        engine.dispatch(Event::AddOption("Ramen".into()), T0);
        engine.dispatch(Event::AddOption("Curry".into()), T0);
        assert_eq!(engine.dispatch(Event::FinishInput, T0), Outcome::Applied(vec![]));
        assert_eq!(engine.mode(), Mode::DuoInputB);
        assert_eq!(engine.duo_split_index(), 2);

        engine.dispatch(Event::AddOption("Burgers".into()), T0);
        let outcome = engine.dispatch(Event::FinishInput, T0);
        assert_eq!(
            outcome,
            Outcome::Refused(DecisionError::InsufficientOptions {
                stage: Stage::DuoSecondPick,
                needed: 2,
                found: 1,
            })
        );
        assert_eq!(engine.mode(), Mode::DuoInputB);

        engine.dispatch(Event::AddOption("Waffles".into()), T0);
        let outcome = engine.dispatch(Event::FinishInput, T0);
        assert_eq!(
            outcome,
            Outcome::Applied(vec![Effect::ScheduleSyncSettled { after_ms: 1_500 }])
        );
        assert_eq!(engine.mode(), Mode::Solo);
        assert_eq!(texts(&engine), ["Ramen", "Curry", "Burgers", "Waffles"]);
        assert!(engine.is_duo_session());
        assert!(engine.is_syncing());

        engine.dispatch(Event::SyncSettled, T0 + 1_500);
        assert!(!engine.is_syncing());
    }

    fn merging_duo_engine() -> Engine {
        let mut engine = solo_engine();
        engine.dispatch(Event::StartDuo, T0);
        engine.dispatch(Event::PairingComplete, T0);
        for label in ["Ramen", "Curry"] {
            engine.dispatch(Event::AddOption(label.into()), T0);
        }
        engine.dispatch(Event::FinishInput, T0);
        for label in ["Burgers", "Waffles"] {
            engine.dispatch(Event::AddOption(label.into()), T0);
        }
        engine.dispatch(Event::FinishInput, T0);
        assert!(engine.is_syncing());
        engine
    }

    #[test]
    fn merged_list_is_frozen_until_sync_settles() {
        let mut engine = merging_duo_engine();
        let spin = Event::StartSpin { forced_index: None };

        assert_eq!(engine.dispatch(spin.clone(), T0 + 100), Outcome::Ignored);
        assert_eq!(engine.mode(), Mode::Solo);
        assert_eq!(engine.rotation_deg(), 0.0);
        assert_eq!(engine.dispatch(Event::AddOption("Pho".into()), T0 + 100), Outcome::Ignored);
        let first = engine.options()[0].id.clone();
        assert_eq!(engine.dispatch(Event::RemoveOption(first), T0 + 100), Outcome::Ignored);
        assert_eq!(engine.dispatch(Event::SaveWheel("Merged".into()), T0 + 100), Outcome::Ignored);
        assert_eq!(texts(&engine), ["Ramen", "Curry", "Burgers", "Waffles"]);

        engine.dispatch(Event::SyncSettled, T0 + 1_500);
        spin_ticket(&engine.dispatch(spin, T0 + 1_600));
        assert_eq!(engine.mode(), Mode::Spinning);
    }

    fn locked_duo_engine() -> Engine {
        let mut engine = merging_duo_engine();
        engine.dispatch(Event::SyncSettled, T0 + 1_500);
        let spin = engine.dispatch(Event::StartSpin { forced_index: None }, T0 + 2_000);
        let ticket = spin_ticket(&spin);
        engine.dispatch(Event::SpinComplete { ticket }, T0 + 5_000);
        assert_eq!(engine.mode(), Mode::Locked);
        engine.dispatch(Event::OpenProfile, T0 + 5_500);
        assert_eq!(engine.mode(), Mode::Profile);
        engine
    }

    #[test]
    fn exit_duo_from_profile_keeps_an_active_lock() {
        let mut engine = locked_duo_engine();
        let unlock_time = engine.lock_state().unwrap().unlock_time;

        assert_eq!(engine.dispatch(Event::ExitDuo, T0 + 6_000), Outcome::Applied(vec![]));
        assert_eq!(engine.mode(), Mode::Locked);
        assert!(!engine.is_duo_session());
        assert_eq!(engine.lock_state().unwrap().unlock_time, unlock_time);
        assert_eq!(
            engine.dispatch(Event::StartSpin { forced_index: None }, T0 + 6_000),
            Outcome::Ignored
        );

        assert_eq!(
            engine.dispatch(Event::Tick, unlock_time),
            Outcome::Applied(vec![Effect::StopCountdown])
        );
        assert_eq!(engine.mode(), Mode::Solo);
    }

    #[test]
    fn exit_duo_from_profile_after_expiry_releases_the_lock() {
        let mut engine = locked_duo_engine();
        let unlock_time = engine.lock_state().unwrap().unlock_time;

        assert_eq!(
            engine.dispatch(Event::ExitDuo, unlock_time),
            Outcome::Applied(vec![Effect::StopCountdown])
        );
        assert_eq!(engine.mode(), Mode::Solo);
        assert!(engine.lock_state().is_none());
        assert_eq!(engine.records().store().get(keys::LOCK).unwrap(), None);
    }

    #[test]
    fn no_exit_from_profile_shortens_an_active_lock() {
        let exits = [Event::ExitDuo, Event::CloseProfile, Event::SaveProfile("Lin".into())];
        for exit in exits {
            let mut engine = locked_duo_engine();
            let unlock_time = engine.lock_state().unwrap().unlock_time;
            engine.dispatch(exit.clone(), T0 + 6_000);
            if engine.mode() != Mode::Profile {
                assert_eq!(engine.mode(), Mode::Locked, "after {:?}", exit);
            }
            assert_eq!(engine.lock_state().map(|l| l.unlock_time), Some(unlock_time));
            let spin = engine.dispatch(Event::StartSpin { forced_index: None }, T0 + 7_000);
            assert_eq!(spin, Outcome::Ignored, "after {:?}", exit);
        }
    }

    #[test]
    fn first_pick_needs_two_options() {
        let mut engine = solo_engine();
        engine.dispatch(Event::StartDuo, T0);
        engine.dispatch(Event::PairingComplete, T0);
        engine.dispatch(Event::AddOption("Ramen".into()), T0);
        assert!(matches!(
            engine.dispatch(Event::FinishInput, T0),
            Outcome::Refused(DecisionError::InsufficientOptions {
                stage: Stage::DuoFirstPick,
                ..
            })
        ));
        assert_eq!(engine.mode(), Mode::DuoInputA);
    }

    #[test]
    fn removing_a_first_pick_moves_the_split() {
        let mut engine = solo_engine();
        engine.dispatch(Event::StartDuo, T0);
        engine.dispatch(Event::PairingComplete, T0);
        for label in ["Ramen", "Curry", "Pho"] {
            engine.dispatch(Event::AddOption(label.into()), T0);
        }
        engine.dispatch(Event::FinishInput, T0);
        engine.dispatch(Event::AddOption("Waffles".into()), T0);
        assert_eq!(engine.current_pick_count(), 1);

        let curry = engine.options()[1].id.clone();
        engine.dispatch(Event::RemoveOption(curry), T0);
        assert_eq!(engine.duo_split_index(), 2);
        assert_eq!(engine.current_pick_count(), 1);
        assert!(engine.duo_split_index() <= engine.options().len());
    }

    #[test]
    fn exit_duo_resets_to_seed_list() {
        let mut engine = solo_engine();
        engine.dispatch(Event::StartDuo, T0);
        engine.dispatch(Event::PairingComplete, T0);
        engine.dispatch(Event::AddOption("Ramen".into()), T0);

        engine.dispatch(Event::ExitDuo, T0);
        assert_eq!(engine.mode(), Mode::Solo);
        assert!(!engine.is_duo_session());
        assert_eq!(engine.duo_split_index(), 0);
        assert_eq!(texts(&engine), DEFAULT_OPTIONS);
    }

    #[test]
    fn exit_duo_is_ignored_while_spinning_and_keeps_a_lock() {
        let mut engine = solo_engine();
        let ticket = spin_ticket(&engine.dispatch(Event::StartSpin { forced_index: None }, T0));
        assert_eq!(engine.dispatch(Event::ExitDuo, T0), Outcome::Ignored);
        assert_eq!(engine.mode(), Mode::Spinning);

        engine.dispatch(Event::SpinComplete { ticket }, T0);
        engine.dispatch(Event::ExitDuo, T0);
        assert_eq!(engine.mode(), Mode::Locked);
    }

    #[test]
    fn cancel_pairing_returns_to_solo() {
        let mut engine = solo_engine();
        engine.dispatch(Event::StartDuo, T0);
        engine.dispatch(Event::CancelPairing, T0);
        assert_eq!(engine.mode(), Mode::Solo);
        assert_eq!(texts(&engine), DEFAULT_OPTIONS);
    }

    #[test]
    fn unlisted_triggers_are_noops() {
        let mut engine = solo_engine();
        assert_eq!(engine.dispatch(Event::FinishInput, T0), Outcome::Ignored);
        assert_eq!(engine.dispatch(Event::PairingComplete, T0), Outcome::Ignored);
        assert_eq!(engine.dispatch(Event::SpinComplete { ticket: 1 }, T0), Outcome::Ignored);
        assert_eq!(engine.dispatch(Event::CloseProfile, T0), Outcome::Ignored);
        assert_eq!(engine.mode(), Mode::Solo);
    }

    #[test]
    fn onboarding_saves_profile_and_closes() {
        let (mut engine, _) =
            DecisionEngine::boot(MemoryStore::default(), StdRng::seed_from_u64(1), T0);
        // cannot skip onboarding
        assert_eq!(engine.dispatch(Event::CloseProfile, T0), Outcome::Ignored);
        assert_eq!(engine.dispatch(Event::SaveProfile("  ".into()), T0), Outcome::Ignored);

        engine.dispatch(Event::SaveProfile(" Grace ".into()), T0);
        assert_eq!(engine.mode(), Mode::Solo);
        assert_eq!(engine.profile().unwrap().name, "Grace");
        assert_eq!(engine.records().profile().unwrap().name, "Grace");
    }

    #[test]
    fn profile_close_returns_to_active_lock() {
        let mut engine = solo_engine();
        let ticket = spin_ticket(&engine.dispatch(Event::StartSpin { forced_index: None }, T0));
        engine.dispatch(Event::SpinComplete { ticket }, T0);

        engine.dispatch(Event::OpenProfile, T0 + 1_000);
        assert_eq!(engine.mode(), Mode::Profile);
        engine.dispatch(Event::CloseProfile, T0 + 2_000);
        assert_eq!(engine.mode(), Mode::Locked);
    }

    #[test]
    fn lock_expiring_inside_profile_closes_to_solo() {
        let mut engine = solo_engine();
        let ticket = spin_ticket(&engine.dispatch(Event::StartSpin { forced_index: None }, T0));
        engine.dispatch(Event::SpinComplete { ticket }, T0);
        engine.dispatch(Event::OpenProfile, T0);

        let later = T0 + LOCK_DURATION_MS;
        assert_eq!(
            engine.dispatch(Event::Tick, later),
            Outcome::Applied(vec![Effect::StopCountdown])
        );
        assert_eq!(engine.mode(), Mode::Profile);
        engine.dispatch(Event::CloseProfile, later);
        assert_eq!(engine.mode(), Mode::Solo);
    }

    #[test]
    fn saved_wheels_round_trip_through_profile() {
        let mut engine = solo_engine();
        engine.dispatch(Event::AddOption("Waffles".into()), T0);
        assert_eq!(engine.dispatch(Event::SaveWheel("   ".into()), T0), Outcome::Ignored);
        engine.dispatch(Event::SaveWheel("Brunch".into()), T0);
        assert_eq!(engine.saved_wheels().len(), 1);
        let wheel = engine.saved_wheels()[0].clone();
        assert_eq!(wheel.options.len(), 4);
        assert_eq!(engine.records().saved_wheels(), vec![wheel.clone()]);

        engine.dispatch(Event::ApplySuggestions(vec!["Salad".into(), "Soup".into()]), T0);
        assert_eq!(texts(&engine), ["Salad", "Soup"]);

        engine.dispatch(Event::OpenProfile, T0);
        engine.dispatch(Event::LoadWheel(wheel.id.clone()), T0);
        assert_eq!(engine.mode(), Mode::Solo);
        assert_eq!(texts(&engine), ["Pizza", "Sushi", "Tacos", "Waffles"]);

        engine.dispatch(Event::OpenProfile, T0);
        engine.dispatch(Event::DeleteWheel(wheel.id), T0);
        assert!(engine.saved_wheels().is_empty());
    }

    #[test]
    fn clear_history_from_profile() {
        let mut engine = solo_engine();
        let ticket = spin_ticket(&engine.dispatch(Event::StartSpin { forced_index: None }, T0));
        engine.dispatch(Event::SpinComplete { ticket }, T0);
        engine.dispatch(Event::OpenProfile, T0);
        engine.dispatch(Event::ClearHistory, T0);
        assert!(engine.history().is_empty());
        assert!(engine.records().history().is_empty());
    }

    #[test]
    fn unavailable_storage_still_runs_a_session() {
        let (mut engine, _) = DecisionEngine::boot(BrokenStore, StdRng::seed_from_u64(2), T0);
        assert_eq!(engine.mode(), Mode::Profile);
        engine.dispatch(Event::SaveProfile("Ada".into()), T0);
        assert_eq!(engine.mode(), Mode::Solo);

        let ticket = spin_ticket(&engine.dispatch(Event::StartSpin { forced_index: None }, T0));
        engine.dispatch(Event::SpinComplete { ticket }, T0);
        assert_eq!(engine.mode(), Mode::Locked);
        assert_eq!(engine.history().len(), 1);

        engine.dispatch(Event::Tick, T0 + LOCK_DURATION_MS);
        assert_eq!(engine.mode(), Mode::Solo);
    }

    #[test]
    fn suggestions_are_not_applied_in_duo_sessions() {
        let mut engine = solo_engine();
        engine.dispatch(Event::StartDuo, T0);
        engine.dispatch(Event::PairingComplete, T0);
        for label in ["a", "b", "c", "d"] {
            engine.dispatch(Event::AddOption(label.into()), T0);
            if label == "b" {
                engine.dispatch(Event::FinishInput, T0);
            }
        }
        engine.dispatch(Event::FinishInput, T0);
        assert_eq!(engine.mode(), Mode::Solo);
        assert_eq!(
            engine.dispatch(Event::ApplySuggestions(vec!["Salad".into()]), T0),
            Outcome::Ignored
        );
        assert_eq!(engine.dispatch(Event::SaveWheel("Ours".into()), T0), Outcome::Ignored);
    }
}
