//! Main module for the Tiny Decisions web app using Yew.
//! Wires the engine driver, UI components and the suggestion request.

use log::{warn, Level, LevelFilter, Log, Metadata, Record};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;
use tiny_decisions::config::{MIN_DUO_PICKS, SPIN_DURATION_MS};
use tiny_decisions::session::{DecisionEngine, Effect, Event, Mode};
use tiny_decisions::storage::{BrowserStore, KeyValueStore, MemoryStore};
use tiny_decisions::suggest::{suggest_or_fallback, GeminiProvider};
use tiny_decisions::utils::{now_ms, PairingTicket};
use tiny_decisions::{HistoryEntry, LockState, SavedWheel, WheelOption};
use wasm_bindgen::JsValue;
use yew::prelude::*;

mod components;
mod hooks;

use components::{
    render_sync_overlay, DuoBanner, DuoLinkPanel, Header, LockedPanel, Notice, OptionEntry,
    OptionPills, ProfilePanel, SaveWheelForm, Wheel,
};
use hooks::{use_decision_engine, use_label_input, Driver, Engine};

// ──────────────────────────────────────────────────────────────────────────────
// Logging to the browser console

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn init_logging() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Helper functions

/// `localStorage` when the browser allows it, otherwise an in-memory store
/// that lasts for the page's lifetime.
fn open_store() -> Box<dyn KeyValueStore> {
    match BrowserStore::open() {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!("{}; decisions will not survive a reload", err);
            Box::new(MemoryStore::default())
        }
    }
}

fn boot_engine() -> (Engine, Vec<Effect>) {
    let rng = StdRng::from_rng(&mut rand::rng());
    DecisionEngine::boot(open_store(), rng, now_ms())
}

fn current_href() -> String {
    gloo_utils::window().location().href().unwrap_or_default()
}

fn on_event(driver: &Rc<Driver>, event: Event) -> Callback<()> {
    let driver = driver.clone();
    Callback::from(move |_| driver.dispatch(event.clone()))
}

fn on_text(driver: &Rc<Driver>, make: fn(String) -> Event) -> Callback<String> {
    let driver = driver.clone();
    Callback::from(move |text| driver.dispatch(make(text)))
}

/// Owned copy of what the view needs, taken once per render.
struct Snapshot {
    mode: Mode,
    options: Vec<WheelOption>,
    rotation_deg: f64,
    is_duo: bool,
    duo_split: usize,
    pick_count: usize,
    syncing: bool,
    onboarding: bool,
    lock: Option<LockState>,
    profile_name: Option<String>,
    saved_wheels: Vec<SavedWheel>,
    history: Vec<HistoryEntry>,
}

impl Snapshot {
    fn take(engine: &Engine) -> Self {
        Self {
            mode: engine.mode(),
            options: engine.options().to_vec(),
            rotation_deg: engine.rotation_deg(),
            is_duo: engine.is_duo_session(),
            duo_split: engine.duo_split_index(),
            pick_count: engine.current_pick_count(),
            syncing: engine.is_syncing(),
            onboarding: engine.is_onboarding(),
            lock: engine.lock_state().cloned(),
            profile_name: engine.profile().map(|p| p.name.clone()),
            saved_wheels: engine.saved_wheels().to_vec(),
            history: engine.history().to_vec(),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────

/// Topic box that replaces the current options with suggested ones.
#[derive(Properties, PartialEq)]
struct SuggestBarProps {
    on_labels: Callback<Vec<String>>,
}

#[function_component(SuggestBar)]
fn suggest_bar(props: &SuggestBarProps) -> Html {
    let loading = use_state(|| false);

    let on_topic = {
        let loading = loading.clone();
        let on_labels = props.on_labels.clone();
        Callback::from(move |topic: String| {
            if *loading {
                return;
            }
            loading.set(true);
            let loading = loading.clone();
            let on_labels = on_labels.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let provider = GeminiProvider::from_build_env();
                let labels = suggest_or_fallback(&provider, &topic).await;
                loading.set(false);
                on_labels.emit(labels);
            });
        })
    };
    let topic = use_label_input("topic", on_topic);

    html! {
        <div class="suggest-bar">
            <input type="text"
                placeholder="Need ideas? Type a topic"
                value={topic.text.clone()}
                disabled={*loading}
                oninput={topic.on_text_input.clone()}
                onkeydown={topic.on_keydown.clone()}
            />
            <button class="btn-secondary small" disabled={*loading}
                onclick={topic.on_commit.reform(|_| ())}>
                { if *loading { "Thinking..." } else { "Suggest" } }
            </button>
        </div>
    }
}

/// Primary application component: renders whichever screen the session mode calls for.
#[function_component(Main)]
fn main_component() -> Html {
    let driver = use_decision_engine(boot_engine);
    let pairing = use_state(|| None::<PairingTicket>);

    let view = Snapshot::take(&driver.engine());
    let notice = driver.notice();

    let on_profile = on_event(&driver, Event::OpenProfile);
    let on_exit_duo = on_event(&driver, Event::ExitDuo);
    let on_dismiss = {
        let driver = driver.clone();
        Callback::from(move |_| driver.dismiss_notice())
    };

    let body = match view.mode {
        Mode::Profile => html! {
            <ProfilePanel
                onboarding={view.onboarding}
                profile_name={view.profile_name.clone()}
                saved_wheels={view.saved_wheels.clone()}
                history={view.history.clone()}
                on_save_profile={on_text(&driver, Event::SaveProfile)}
                on_load_wheel={on_text(&driver, Event::LoadWheel)}
                on_delete_wheel={on_text(&driver, Event::DeleteWheel)}
                on_clear_history={on_event(&driver, Event::ClearHistory)}
                on_close={on_event(&driver, Event::CloseProfile)}
            />
        },
        Mode::DuoSetup => {
            let url = (*pairing).as_ref().map(|t| t.url.clone()).unwrap_or_default();
            html! {
                <DuoLinkPanel
                    {url}
                    on_paired={on_event(&driver, Event::PairingComplete)}
                    on_cancel={on_event(&driver, Event::CancelPairing)}
                />
            }
        }
        Mode::Locked => match view.lock.clone() {
            Some(lock) => {
                let remaining_ms = lock.remaining_ms(now_ms());
                html! {
                    <>
                        <Wheel options={view.options.clone()} rotation_deg={view.rotation_deg}
                            spinning={false} spin_ms={SPIN_DURATION_MS} />
                        <LockedPanel winner={lock.winner} {remaining_ms} />
                    </>
                }
            }
            None => html! {},
        },
        Mode::Solo | Mode::Spinning | Mode::DuoInputA | Mode::DuoInputB => {
            let spinning = view.mode == Mode::Spinning;
            let in_duo_input = matches!(view.mode, Mode::DuoInputA | Mode::DuoInputB);
            let solo_tools = view.mode == Mode::Solo && !view.is_duo;
            let locked_before = if view.mode == Mode::DuoInputB { view.duo_split } else { 0 };
            let placeholder = match view.mode {
                Mode::DuoInputA => "User A: add an option",
                Mode::DuoInputB => "User B: add an option",
                _ => "Add an option",
            };
            let on_start_duo = {
                let driver = driver.clone();
                let pairing = pairing.clone();
                Callback::from(move |_| {
                    pairing.set(Some(PairingTicket::new(&current_href(), &mut rand::rng())));
                    driver.dispatch(Event::StartDuo);
                })
            };
            let on_labels = {
                let driver = driver.clone();
                Callback::from(move |labels: Vec<String>| driver.dispatch(Event::ApplySuggestions(labels)))
            };
            let on_spin = on_event(&driver, Event::StartSpin { forced_index: None });

            html! {
                <>
                    <DuoBanner mode={view.mode} pick_count={view.pick_count} needed={MIN_DUO_PICKS}
                        on_finish={on_event(&driver, Event::FinishInput)} />
                    if !in_duo_input {
                        <Wheel options={view.options.clone()} rotation_deg={view.rotation_deg}
                            {spinning} spin_ms={SPIN_DURATION_MS} />
                        <button class="btn-primary spin-button" disabled={spinning || view.syncing}
                            onclick={on_spin.reform(|_| ())}>
                            { if spinning { "Spinning..." } else { "Spin" } }
                        </button>
                    }
                    <OptionEntry placeholder={placeholder} disabled={spinning}
                        on_add={on_text(&driver, Event::AddOption)} />
                    <OptionPills options={view.options.clone()} editable={!spinning}
                        {locked_before} on_remove={on_text(&driver, Event::RemoveOption)} />
                    if solo_tools {
                        <SuggestBar {on_labels} />
                        <SaveWheelForm on_save={on_text(&driver, Event::SaveWheel)} />
                        <button class="btn-secondary" onclick={on_start_duo}>{ "Decide together" }</button>
                    }
                    if view.syncing {
                        { render_sync_overlay() }
                    }
                </>
            }
        }
    };

    html! {
        <div class="app">
            <Header mode={view.mode} profile_name={view.profile_name.clone()} is_duo={view.is_duo}
                {on_profile} {on_exit_duo} />
            if let Some(message) = notice {
                <Notice {message} {on_dismiss} />
            }
            <main class="content">{ body }</main>
        </div>
    }
}

#[function_component]
pub fn App() -> Html {
    html! { <Main /> }
}

/// Entry point: installs the panic hook and logger, then renders the App.
fn main() {
    console_error_panic_hook::set_once();
    init_logging();
    yew::Renderer::<App>::new().render();
}
