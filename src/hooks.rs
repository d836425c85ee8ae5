use gloo_timers::callback::{Interval, Timeout};
use rand::rngs::StdRng;
use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};
use tiny_decisions::session::{DecisionEngine, Effect, Event, HapticPattern, Outcome};
use tiny_decisions::storage::KeyValueStore;
use tiny_decisions::utils::{normalize_label, now_ms};
use wasm_bindgen::JsValue;
use web_sys::HtmlInputElement;
use yew::prelude::*;

pub type Engine = DecisionEngine<Box<dyn KeyValueStore>, StdRng>;

/// Holds the state and callbacks for a single-line label field.
#[derive(Clone)]
pub struct LabelInput {
    /// The current text content of the input field.
    pub text: String,
    /// Callback for the input's `oninput` event.
    pub on_text_input: Callback<InputEvent>,
    /// Commits on Enter.
    pub on_keydown: Callback<KeyboardEvent>,
    /// Trims the text and hands it to the submit callback. Blank text is dropped
    /// without clearing the field.
    pub on_commit: Callback<()>,
}

/// Custom hook for a text field whose committed value must be a non-blank label.
#[hook]
pub fn use_label_input(field_name: &'static str, on_submit: Callback<String>) -> LabelInput {
    let text_state_handle: UseStateHandle<String> = use_state(String::new);

    let on_text_input = {
        let text_setter = text_state_handle.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            text_setter.set(input.value());
        })
    };

    let on_commit = {
        let current_text_handle = text_state_handle.clone();
        Callback::from(move |_| {
            if let Ok(label) = normalize_label(current_text_handle.as_str(), field_name) {
                on_submit.emit(label);
                current_text_handle.set(String::new());
            }
        })
    };

    let on_keydown = {
        let on_commit = on_commit.clone();
        Callback::from(move |e: KeyboardEvent| {
            if e.key() == "Enter" {
                on_commit.emit(());
            }
        })
    };

    LabelInput {
        text: (*text_state_handle).clone(),
        on_text_input,
        on_keydown,
        on_commit,
    }
}

#[derive(Default)]
struct Timers {
    spin: Option<Timeout>,
    countdown: Option<Interval>,
    sync: Option<Timeout>,
}

// A handle may be released from inside its own callback, so the closure is
// dropped on the next microtask rather than in place.
fn retire_timeout(handle: Option<Timeout>) {
    if let Some(handle) = handle {
        let closure = handle.cancel();
        wasm_bindgen_futures::spawn_local(async move { drop(closure) });
    }
}

fn retire_interval(handle: Option<Interval>) {
    if let Some(handle) = handle {
        let closure = handle.cancel();
        wasm_bindgen_futures::spawn_local(async move { drop(closure) });
    }
}

fn vibrate(pattern: HapticPattern) {
    let navigator = gloo_utils::window().navigator();
    // not every browser exposes the Vibration API
    if !js_sys::Reflect::has(&navigator, &JsValue::from_str("vibrate")).unwrap_or(false) {
        return;
    }
    match pattern.pulses() {
        [single] => {
            navigator.vibrate_with_duration(*single);
        }
        pulses => {
            let steps: js_sys::Array = pulses.iter().map(|p| JsValue::from(*p)).collect();
            navigator.vibrate_with_pattern(&steps);
        }
    }
}

/// Owns the engine plus every browser timer it asked for, and re-renders the
/// component after each event.
pub struct Driver {
    engine: RefCell<Engine>,
    timers: RefCell<Timers>,
    pending: RefCell<Vec<Effect>>,
    notice: RefCell<Option<String>>,
    redraw: UseForceUpdateHandle,
}

impl Driver {
    pub fn engine(&self) -> Ref<'_, Engine> {
        self.engine.borrow()
    }

    /// Last refusal message, cleared by the next accepted event.
    pub fn notice(&self) -> Option<String> {
        self.notice.borrow().clone()
    }

    pub fn dismiss_notice(&self) {
        self.notice.replace(None);
        self.redraw.force_update();
    }

    pub fn dispatch(self: &Rc<Self>, event: Event) {
        let outcome = self.engine.borrow_mut().dispatch(event, now_ms());
        match outcome {
            Outcome::Applied(effects) => {
                self.notice.replace(None);
                self.apply(effects);
            }
            Outcome::Refused(err) => {
                log::info!("{}", err);
                self.notice.replace(Some(err.to_string()));
            }
            Outcome::Ignored => {}
        }
        // countdown text moves on every tick even when nothing else changed
        self.redraw.force_update();
    }

    fn apply(self: &Rc<Self>, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ScheduleSpinCompletion { ticket, after_ms } => {
                    let weak = Rc::downgrade(self);
                    let handle = Timeout::new(after_ms, move || {
                        emit(&weak, Event::SpinComplete { ticket });
                    });
                    retire_timeout(self.timers.borrow_mut().spin.replace(handle));
                }
                Effect::CancelSpinCompletion => {
                    retire_timeout(self.timers.borrow_mut().spin.take());
                }
                Effect::StartCountdown { period_ms } => {
                    let weak = Rc::downgrade(self);
                    let handle = Interval::new(period_ms, move || emit(&weak, Event::Tick));
                    retire_interval(self.timers.borrow_mut().countdown.replace(handle));
                }
                Effect::StopCountdown => {
                    retire_interval(self.timers.borrow_mut().countdown.take());
                }
                Effect::ScheduleSyncSettled { after_ms } => {
                    let weak = Rc::downgrade(self);
                    let handle = Timeout::new(after_ms, move || emit(&weak, Event::SyncSettled));
                    retire_timeout(self.timers.borrow_mut().sync.replace(handle));
                }
                Effect::Haptic(pattern) => vibrate(pattern),
            }
        }
    }

    fn shutdown(self: &Rc<Self>) {
        self.dispatch(Event::Teardown);
        retire_timeout(self.timers.borrow_mut().sync.take());
    }
}

fn emit(driver: &Weak<Driver>, event: Event) {
    if let Some(driver) = driver.upgrade() {
        driver.dispatch(event);
    }
}

/// Boots the engine once, applies its start-up effects after mount and tears
/// every timer down on unmount.
#[hook]
pub fn use_decision_engine<F>(boot: F) -> Rc<Driver>
where
    F: FnOnce() -> (Engine, Vec<Effect>),
{
    let redraw = use_force_update();
    let driver = use_state(move || {
        let (engine, pending) = boot();
        Rc::new(Driver {
            engine: RefCell::new(engine),
            timers: RefCell::default(),
            pending: RefCell::new(pending),
            notice: RefCell::new(None),
            redraw,
        })
    });

    {
        let driver = (*driver).clone();
        use_effect_with((), move |_| {
            let pending = driver.pending.take();
            driver.apply(pending);
            move || driver.shutdown()
        });
    }

    (*driver).clone()
}
