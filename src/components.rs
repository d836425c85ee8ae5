//! Yew view components for the decision wheel.
//!
//! Components render from props only; every change goes back to the engine
//! through the callbacks they are given.

use crate::hooks::use_label_input;
use tiny_decisions::session::Mode;
use tiny_decisions::spin::segment_angle;
use tiny_decisions::utils::format_countdown;
use tiny_decisions::{HistoryEntry, SavedWheel, WheelOption};
use yew::prelude::*;

/// CSS `conic-gradient` painting one wedge per option, clockwise from the
/// pointer.
fn conic_gradient(options: &[WheelOption]) -> String {
    if options.is_empty() {
        return "#E5E7EB".to_string();
    }
    let seg = segment_angle(options.len());
    let stops = options
        .iter()
        .enumerate()
        .map(|(i, o)| format!("{} {:.3}deg {:.3}deg", o.color, i as f64 * seg, (i + 1) as f64 * seg))
        .collect::<Vec<_>>()
        .join(", ");
    format!("conic-gradient({})", stops)
}

/// Profile opens from the wheel or the lock screen only; a duo session can
/// be left from anywhere but mid-spin.
fn header_buttons(mode: Mode, is_duo: bool) -> (bool, bool) {
    let show_profile = matches!(mode, Mode::Solo | Mode::Locked);
    let show_exit_duo = is_duo && mode != Mode::Spinning;
    (show_profile, show_exit_duo)
}

#[derive(Properties, PartialEq)]
pub struct HeaderProps {
    pub mode: Mode,
    pub profile_name: Option<String>,
    pub is_duo: bool,
    pub on_profile: Callback<()>,
    pub on_exit_duo: Callback<()>,
}

#[function_component(Header)]
pub fn header(props: &HeaderProps) -> Html {
    let greeting = props
        .profile_name
        .as_ref()
        .map(|n| format!("Hi, {}", n))
        .unwrap_or_default();
    let (show_profile, show_exit_duo) = header_buttons(props.mode, props.is_duo);
    html! {
        <header class="app-header">
            <h1>{ "Tiny Decisions" }</h1>
            <span class="greeting">{ greeting }</span>
            if props.is_duo {
                <span class="badge linked">{ "Linked" }</span>
            }
            if show_exit_duo {
                <button class="btn-secondary small" onclick={props.on_exit_duo.reform(|_| ())}>
                    { "Exit Duo" }
                </button>
            }
            if show_profile {
                <button class="btn-secondary small" onclick={props.on_profile.reform(|_| ())}>
                    { "Profile" }
                </button>
            }
        </header>
    }
}

/// The wheel itself. `rotation_deg` is absolute; the CSS transition animates
/// from the previous value while `spinning` is set.
#[derive(Properties, PartialEq)]
pub struct WheelProps {
    pub options: Vec<WheelOption>,
    pub rotation_deg: f64,
    pub spinning: bool,
    pub spin_ms: u32,
}

#[function_component(Wheel)]
pub fn wheel(props: &WheelProps) -> Html {
    let transition = if props.spinning {
        format!("transform {}ms cubic-bezier(0.17, 0.67, 0.12, 0.99)", props.spin_ms)
    } else {
        "none".to_string()
    };
    let style = format!(
        "background: {}; transform: rotate({:.3}deg); transition: {};",
        conic_gradient(&props.options),
        props.rotation_deg,
        transition
    );
    let seg = segment_angle(props.options.len().max(1));

    html! {
        <div class="wheel-frame">
            <div class="wheel-pointer"></div>
            <div class="wheel" {style}>
                { props.options.iter().enumerate().map(|(i, o)| {
                    let center = (i as f64 + 0.5) * seg;
                    html! {
                        <span key={o.id.clone()} class="wedge-label"
                            style={format!("transform: rotate({:.3}deg) translateY(-38%);", center)}>
                            { &o.text }
                        </span>
                    }
                }).collect::<Html>() }
            </div>
        </div>
    }
}

/// Removable chips for the current options. In duo input, the first
/// participant's picks are shown but cannot be removed.
#[derive(Properties, PartialEq)]
pub struct OptionPillsProps {
    pub options: Vec<WheelOption>,
    pub editable: bool,
    #[prop_or_default]
    pub locked_before: usize,
    pub on_remove: Callback<String>,
}

#[function_component(OptionPills)]
pub fn option_pills(props: &OptionPillsProps) -> Html {
    if props.options.is_empty() {
        return html! { <p class="no-options">{ "No options yet" }</p> };
    }
    html! {
        <ul class="option-pills">
            { props.options.iter().enumerate().map(|(i, o)| {
                let removable = props.editable && i >= props.locked_before;
                let on_remove = {
                    let id = o.id.clone();
                    props.on_remove.reform(move |_| id.clone())
                };
                html! {
                    <li key={o.id.clone()} class="pill" style={format!("border-color: {};", o.color)}>
                        { &o.text }
                        if removable {
                            <button class="pill-remove" onclick={on_remove}>{ "×" }</button>
                        }
                    </li>
                }
            }).collect::<Html>() }
        </ul>
    }
}

#[derive(Properties, PartialEq)]
pub struct OptionEntryProps {
    pub placeholder: AttrValue,
    pub disabled: bool,
    pub on_add: Callback<String>,
}

#[function_component(OptionEntry)]
pub fn option_entry(props: &OptionEntryProps) -> Html {
    let input = use_label_input("option text", props.on_add.clone());
    html! {
        <div class="option-entry">
            <input type="text"
                maxlength="40"
                placeholder={props.placeholder.clone()}
                value={input.text.clone()}
                disabled={props.disabled}
                oninput={input.on_text_input.clone()}
                onkeydown={input.on_keydown.clone()}
            />
            <button class="btn-primary" disabled={props.disabled}
                onclick={input.on_commit.reform(|_| ())}>
                { "Add" }
            </button>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct LockedPanelProps {
    pub winner: WheelOption,
    pub remaining_ms: u64,
}

#[function_component(LockedPanel)]
pub fn locked_panel(props: &LockedPanelProps) -> Html {
    html! {
        <div class="locked-panel" style={format!("border-color: {};", props.winner.color)}>
            <p class="locked-caption">{ "The wheel has spoken" }</p>
            <h2 class="locked-winner">{ &props.winner.text }</h2>
            <p class="locked-countdown">
                { format!("Spin again in {}", format_countdown(props.remaining_ms)) }
            </p>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct DuoBannerProps {
    pub mode: Mode,
    pub pick_count: usize,
    pub needed: usize,
    pub on_finish: Callback<()>,
}

#[function_component(DuoBanner)]
pub fn duo_banner(props: &DuoBannerProps) -> Html {
    let (who, action) = match props.mode {
        Mode::DuoInputA => ("User A", "Pass to User B"),
        Mode::DuoInputB => ("User B", "Merge & Spin"),
        _ => return html! {},
    };
    html! {
        <div class="duo-banner">
            <span>{ format!("{}: add your picks ({}/{})", who, props.pick_count, props.needed) }</span>
            <button class="btn-primary small" onclick={props.on_finish.reform(|_| ())}>
                { action }
            </button>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct DuoLinkPanelProps {
    pub url: String,
    pub on_paired: Callback<()>,
    pub on_cancel: Callback<()>,
}

#[function_component(DuoLinkPanel)]
pub fn duo_link_panel(props: &DuoLinkPanelProps) -> Html {
    html! {
        <div class="duo-link-panel">
            <h2>{ "Decide together" }</h2>
            <p>{ "Share this link with your partner:" }</p>
            <input class="duo-link" type="text" readonly=true value={props.url.clone()} />
            <div class="button-row">
                <button class="btn-primary" onclick={props.on_paired.reform(|_| ())}>
                    { "Simulate connection" }
                </button>
                <button class="btn-secondary" onclick={props.on_cancel.reform(|_| ())}>
                    { "Cancel" }
                </button>
            </div>
        </div>
    }
}

pub fn render_sync_overlay() -> Html {
    html! {
        <div class="sync-overlay">
            <div class="spinner"></div>
            <p>{ "Merging choices..." }</p>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct NoticeProps {
    pub message: String,
    pub on_dismiss: Callback<()>,
}

#[function_component(Notice)]
pub fn notice(props: &NoticeProps) -> Html {
    html! {
        <div class="current-error compact" onclick={props.on_dismiss.reform(|_| ())}>
            { &props.message }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct SaveWheelFormProps {
    pub on_save: Callback<String>,
}

#[function_component(SaveWheelForm)]
pub fn save_wheel_form(props: &SaveWheelFormProps) -> Html {
    let input = use_label_input("wheel name", props.on_save.clone());
    html! {
        <div class="save-wheel">
            <input type="text"
                placeholder="Name this wheel"
                value={input.text.clone()}
                oninput={input.on_text_input.clone()}
                onkeydown={input.on_keydown.clone()}
            />
            <button class="btn-secondary small" onclick={input.on_commit.reform(|_| ())}>
                { "Save" }
            </button>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ProfilePanelProps {
    pub onboarding: bool,
    pub profile_name: Option<String>,
    pub saved_wheels: Vec<SavedWheel>,
    pub history: Vec<HistoryEntry>,
    pub on_save_profile: Callback<String>,
    pub on_load_wheel: Callback<String>,
    pub on_delete_wheel: Callback<String>,
    pub on_clear_history: Callback<()>,
    pub on_close: Callback<()>,
}

#[function_component(ProfilePanel)]
pub fn profile_panel(props: &ProfilePanelProps) -> Html {
    let name_input = use_label_input("profile name", props.on_save_profile.clone());

    let title = if props.onboarding {
        "Welcome! What should we call you?"
    } else {
        "Your profile"
    };
    let placeholder = props.profile_name.clone().unwrap_or_else(|| "Your name".to_string());

    html! {
        <div class="profile-panel">
            <h2>{ title }</h2>
            <div class="form-group">
                <input type="text"
                    placeholder={placeholder}
                    value={name_input.text.clone()}
                    oninput={name_input.on_text_input.clone()}
                    onkeydown={name_input.on_keydown.clone()}
                />
                <button class="btn-primary small" onclick={name_input.on_commit.reform(|_| ())}>
                    { "Save" }
                </button>
            </div>

            if !props.onboarding {
                <section class="saved-wheels">
                    <h3>{ "Saved wheels" }</h3>
                    if props.saved_wheels.is_empty() {
                        <p class="empty">{ "Nothing saved yet" }</p>
                    }
                    { props.saved_wheels.iter().map(|w| {
                        let load = { let id = w.id.clone(); props.on_load_wheel.reform(move |_| id.clone()) };
                        let delete = { let id = w.id.clone(); props.on_delete_wheel.reform(move |_| id.clone()) };
                        html! {
                            <div key={w.id.clone()} class="saved-wheel">
                                <span>{ format!("{} ({} options)", w.name, w.options.len()) }</span>
                                <button class="btn-secondary small" onclick={load}>{ "Load" }</button>
                                <button class="btn-secondary small" onclick={delete}>{ "Delete" }</button>
                            </div>
                        }
                    }).collect::<Html>() }
                </section>

                <section class="history">
                    <h3>{ "Recent decisions" }</h3>
                    <ol>
                        { props.history.iter().map(|entry| html! {
                            <li key={entry.id.clone()} style={format!("color: {};", entry.winner.color)}>
                                { &entry.winner.text }
                            </li>
                        }).collect::<Html>() }
                    </ol>
                    if !props.history.is_empty() {
                        <button class="btn-secondary small" onclick={props.on_clear_history.reform(|_| ())}>
                            { "Clear history" }
                        </button>
                    }
                </section>

                <button class="btn-secondary" onclick={props.on_close.reform(|_| ())}>{ "Back" }</button>
            }
        </div>
    }
}
