//! Topic-based option suggestions.
//!
//! A provider turns a free-text topic into a handful of short labels. The
//! engine never talks to a provider directly: the UI awaits
//! [`suggest_or_fallback`] and feeds the result back as
//! `Event::ApplySuggestions`.

use crate::config::{FALLBACK_SUGGESTIONS, SUGGESTION_ENDPOINT, SUGGESTION_LIMIT, SUGGESTION_MODEL};
use crate::DecisionError;
use futures::future::LocalBoxFuture;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

pub trait SuggestionProvider {
    fn suggest<'a>(&'a self, topic: &'a str)
        -> LocalBoxFuture<'a, Result<Vec<String>, DecisionError>>;
}

/// Matches a Markdown code fence wrapped around the payload.
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").unwrap());

/// Parse a JSON array of strings, tolerating a surrounding code fence.
/// Labels are trimmed, blanks dropped and the list capped at
/// [`SUGGESTION_LIMIT`].
pub fn parse_suggestions(raw: &str) -> Result<Vec<String>, DecisionError> {
    let body = CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());
    let labels: Vec<String> = serde_json::from_str(body.trim())
        .map_err(|e| DecisionError::SuggestionProviderFailure(format!("bad payload: {}", e)))?;
    Ok(labels
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .take(SUGGESTION_LIMIT)
        .collect())
}

pub fn fallback_suggestions() -> Vec<String> {
    FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

/// Ask `provider` for labels. Any failure yields the fixed fallback list;
/// an empty but successful answer is passed through so the caller can leave
/// the registry alone.
pub async fn suggest_or_fallback<P: SuggestionProvider + ?Sized>(
    provider: &P,
    topic: &str,
) -> Vec<String> {
    match provider.suggest(topic).await {
        Ok(labels) => {
            debug!("{} suggestions for '{}'", labels.len(), topic);
            labels
        }
        Err(err) => {
            warn!("Using fallback suggestions: {}", err);
            fallback_suggestions()
        }
    }
}

// ── Gemini ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn prompt_for(topic: &str) -> String {
    format!(
        "Give 5 short, distinct options for a decision wheel about: \"{}\". \
         Keep each option under 4 words. \
         Return ONLY a JSON array of strings.",
        topic
    )
}

fn request_body(prompt: &str) -> Result<String, DecisionError> {
    let request = GenerateRequest {
        contents: [Content {
            parts: [Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
        },
    };
    serde_json::to_string(&request)
        .map_err(|e| DecisionError::SuggestionProviderFailure(e.to_string()))
}

/// Pull the model's text out of a `generateContent` response.
fn extract_text(raw: &str) -> Result<String, DecisionError> {
    let response: GenerateResponse = serde_json::from_str(raw)
        .map_err(|e| DecisionError::SuggestionProviderFailure(format!("bad response: {}", e)))?;
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| DecisionError::SuggestionProviderFailure("empty response".into()))
}

fn js_failure(err: JsValue) -> DecisionError {
    DecisionError::SuggestionProviderFailure(format!("{:?}", err))
}

/// Google Gemini `generateContent` over the browser's `fetch`.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: Option<String>,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: SUGGESTION_MODEL.to_string(),
        }
    }

    /// Key baked in at build time through `GEMINI_API_KEY`, if any.
    pub fn from_build_env() -> Self {
        Self::new(option_env!("GEMINI_API_KEY").map(str::to_string))
    }

    async fn fetch_labels(&self, topic: &str) -> Result<Vec<String>, DecisionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DecisionError::SuggestionProviderFailure("no API key".into()))?;
        let window = web_sys::window()
            .ok_or_else(|| DecisionError::SuggestionProviderFailure("no window".into()))?;

        let url = format!(
            "{}/{}:generateContent?key={}",
            SUGGESTION_ENDPOINT, self.model, api_key
        );
        let body = request_body(&prompt_for(topic))?;

        let init = web_sys::RequestInit::new();
        init.set_method("POST");
        init.set_mode(web_sys::RequestMode::Cors);
        init.set_body(&JsValue::from_str(&body));
        let request = web_sys::Request::new_with_str_and_init(&url, &init).map_err(js_failure)?;
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(js_failure)?;

        let response: web_sys::Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_failure)?
            .dyn_into()
            .map_err(js_failure)?;
        if !response.ok() {
            return Err(DecisionError::SuggestionProviderFailure(format!(
                "HTTP {}",
                response.status()
            )));
        }
        let text = JsFuture::from(response.text().map_err(js_failure)?)
            .await
            .map_err(js_failure)?
            .as_string()
            .unwrap_or_default();

        parse_suggestions(&extract_text(&text)?)
    }
}

impl SuggestionProvider for GeminiProvider {
    fn suggest<'a>(
        &'a self,
        topic: &'a str,
    ) -> LocalBoxFuture<'a, Result<Vec<String>, DecisionError>> {
        Box::pin(self.fetch_labels(topic))
    }
}
