//! Ordered list of candidate options for the current session.

use crate::config::{DEFAULT_OPTIONS, MAX_OPTIONS, WHEEL_COLORS};
use crate::utils::{normalize_label, random_id};
use crate::WheelOption;
use log::debug;
use rand::Rng;

/// Palette colour for the option at `index`. Wraps after 8 entries.
pub fn color_for(index: usize) -> &'static str {
    WHEEL_COLORS[index % WHEEL_COLORS.len()]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionRegistry {
    options: Vec<WheelOption>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the default seed list.
    pub fn seeded<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut registry = Self::new();
        registry.reset(rng);
        registry
    }

    pub fn options(&self) -> &[WheelOption] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.options.len() >= MAX_OPTIONS
    }

    /// Append a trimmed option. Blank text or a full wheel is a silent no-op;
    /// returns whether anything was added.
    pub fn add<R: Rng + ?Sized>(&mut self, text: &str, rng: &mut R) -> bool {
        let Ok(text) = normalize_label(text, "option text") else {
            return false;
        };
        if self.is_full() {
            debug!("Wheel already holds {} options, ignoring '{}'", MAX_OPTIONS, text);
            return false;
        }
        let option = WheelOption {
            id: self.fresh_id(rng),
            text,
            color: color_for(self.options.len()).to_string(),
        };
        self.options.push(option);
        true
    }

    /// Remove by id, returning the position it occupied. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<usize> {
        let pos = self.options.iter().position(|o| o.id == id)?;
        self.options.remove(pos);
        Some(pos)
    }

    /// Wholesale replacement from plain labels (suggestions). Blank labels are
    /// skipped, the result is capped at [`MAX_OPTIONS`] and colours follow position.
    pub fn replace_with_labels<R, S>(&mut self, labels: &[S], rng: &mut R)
    where
        R: Rng + ?Sized,
        S: AsRef<str>,
    {
        self.options.clear();
        for label in labels {
            self.add(label.as_ref(), rng);
        }
    }

    /// Wholesale replacement from a snapshot (loading a saved wheel). Ids are
    /// kept, colours are re-derived by position.
    pub fn replace_all(&mut self, options: &[WheelOption]) {
        self.options = options
            .iter()
            .take(MAX_OPTIONS)
            .enumerate()
            .map(|(i, o)| WheelOption {
                id: o.id.clone(),
                text: o.text.clone(),
                color: color_for(i).to_string(),
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.options.clear();
    }

    /// Back to the default seed list.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.replace_with_labels(&DEFAULT_OPTIONS[..], rng);
    }

    fn fresh_id<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        loop {
            let id = random_id(rng);
            if !self.options.iter().any(|o| o.id == id) {
                return id;
            }
        }
    }
}
