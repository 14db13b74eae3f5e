//! Callback selector watching.
//!
//! An embedder can ask to be told when a selector starts or stops matching
//! anything in the document. Matches are counted per selector as element
//! styles change, and transitions are batched behind a zero-delay timer that
//! must expire twice before the embedder hears about them. A selector that
//! stops and starts matching within one batch is never reported.

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use lumen_common::warning::warn_once;
use serde::Serialize;
use strum_macros::Display;

use crate::selector::{ParsedSelector, parse_selector};

/// A cancellable one-shot timer with zero delay.
pub trait OneShotTimer {
    /// Arms the timer. The owner's fire handler runs once it expires.
    fn start_one_shot(&mut self);
    /// Disarms the timer.
    fn stop(&mut self);
    /// True while armed.
    fn is_active(&self) -> bool;
}

/// A [`OneShotTimer`] whose expiry is driven by hand.
///
/// Clones share the same timer, so the embedder can keep one handle and give
/// the other to the document.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    active: Rc<Cell<bool>>,
}

impl ManualTimer {
    /// A disarmed timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expires the timer. Returns false if it was not armed, in which case
    /// the fire handler must not run.
    pub fn expire(&self) -> bool {
        self.active.replace(false)
    }
}

impl OneShotTimer for ManualTimer {
    fn start_one_shot(&mut self) {
        self.active.set(true);
    }

    fn stop(&mut self) {
        self.active.set(false);
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// The embedder side of selector watching.
pub trait SelectorMatchClient {
    /// `added` selectors started matching, `removed` ones stopped.
    fn selector_match_changed(&mut self, added: &[String], removed: &[String]);
}

/// Where the watch is in its two-expiry debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum DebounceState {
    /// Nothing pending.
    #[default]
    Idle,
    /// Transitions pending, timer armed, no expiry yet.
    PendingFirstExpiry,
    /// Expired once and re-armed; the next expiry delivers.
    PendingSecondExpiry,
}

/// One delivered batch of selector transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SelectorMatchBatch {
    /// Selectors that started matching, sorted.
    pub added: Vec<String>,
    /// Selectors that stopped matching, sorted.
    pub removed: Vec<String>,
}

/// Per-document selector watch.
pub struct CssSelectorWatch {
    watched: Vec<ParsedSelector>,
    match_counts: HashMap<String, usize>,
    added: BTreeSet<String>,
    removed: BTreeSet<String>,
    state: DebounceState,
    timer: Box<dyn OneShotTimer>,
}

impl std::fmt::Debug for CssSelectorWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CssSelectorWatch")
            .field("watched", &self.watched)
            .field("match_counts", &self.match_counts)
            .field("added", &self.added)
            .field("removed", &self.removed)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CssSelectorWatch {
    /// A watch with nothing watched, driven by `timer`.
    #[must_use]
    pub fn new(timer: Box<dyn OneShotTimer>) -> Self {
        CssSelectorWatch {
            watched: Vec::new(),
            match_counts: HashMap::new(),
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
            state: DebounceState::Idle,
            timer,
        }
    }

    /// Replaces the watched selectors. Only compound selectors are accepted;
    /// everything else is dropped with a warning. Returns how many were kept.
    pub fn watch_css_selectors(&mut self, selectors: &[&str]) -> usize {
        self.watched.clear();
        for &raw in selectors {
            match parse_selector(raw) {
                Some(selector) => self.watched.push(selector),
                None => {
                    let _ = warn_once(
                        "SelectorWatch",
                        &format!("ignoring non-compound selector '{raw}'"),
                    );
                }
            }
        }
        self.watched.len()
    }

    /// Selectors currently watched.
    #[must_use]
    pub fn watched_selectors(&self) -> &[ParsedSelector] {
        &self.watched
    }

    /// Replaces the timer. An armed old timer is stopped first.
    pub fn set_timer(&mut self, timer: Box<dyn OneShotTimer>) {
        self.timer.stop();
        self.timer = timer;
        if self.state != DebounceState::Idle {
            self.timer.start_one_shot();
        }
    }

    /// Current debounce state.
    #[must_use]
    pub const fn state(&self) -> DebounceState {
        self.state
    }

    /// Number of elements currently matching `selector`.
    #[must_use]
    pub fn match_count(&self, selector: &str) -> usize {
        self.match_counts.get(selector).copied().unwrap_or(0)
    }

    /// Pending transitions as (added, removed).
    #[must_use]
    pub fn pending(&self) -> (Vec<String>, Vec<String>) {
        (
            self.added.iter().cloned().collect(),
            self.removed.iter().cloned().collect(),
        )
    }

    /// Applies one element's change in matched callback selectors.
    pub fn update_selector_matches(&mut self, removed: &[String], added: &[String]) {
        let mut should_update_timer = false;

        for selector in removed {
            let Some(count) = self.match_counts.get_mut(selector) else {
                continue;
            };
            *count -= 1;
            if *count > 0 {
                continue;
            }
            let _ = self.match_counts.remove(selector);
            should_update_timer = true;
            if !self.added.remove(selector) {
                let _ = self.removed.insert(selector.clone());
            }
        }

        for selector in added {
            let count = self.match_counts.entry(selector.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                continue;
            }
            should_update_timer = true;
            if !self.removed.remove(selector) {
                let _ = self.added.insert(selector.clone());
            }
        }

        if !should_update_timer {
            return;
        }

        if self.added.is_empty() && self.removed.is_empty() {
            if self.timer.is_active() {
                self.timer.stop();
            }
            self.state = DebounceState::Idle;
        } else {
            self.state = DebounceState::PendingFirstExpiry;
            if !self.timer.is_active() {
                self.timer.start_one_shot();
            }
        }
    }

    /// Timer fire handler.
    ///
    /// The first expiry only re-arms the timer. The second drains the pending
    /// sets and returns them for delivery.
    pub fn timer_fired(&mut self) -> Option<SelectorMatchBatch> {
        match self.state {
            DebounceState::Idle => {
                debug_assert!(self.added.is_empty() && self.removed.is_empty());
                None
            }
            DebounceState::PendingFirstExpiry => {
                self.state = DebounceState::PendingSecondExpiry;
                self.timer.start_one_shot();
                None
            }
            DebounceState::PendingSecondExpiry => {
                self.state = DebounceState::Idle;
                Some(SelectorMatchBatch {
                    added: std::mem::take(&mut self.added).into_iter().collect(),
                    removed: std::mem::take(&mut self.removed).into_iter().collect(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_count_above_one_is_not_a_transition() {
        let timer = ManualTimer::new();
        let mut watch = CssSelectorWatch::new(Box::new(timer.clone()));
        watch.update_selector_matches(&[], &strings(&[".a"]));
        watch.update_selector_matches(&[], &strings(&[".a"]));
        assert_eq!(watch.match_count(".a"), 2);

        watch.update_selector_matches(&strings(&[".a"]), &[]);
        assert_eq!(watch.pending(), (strings(&[".a"]), Vec::new()));
    }

    #[test]
    fn test_unknown_removal_is_ignored() {
        let timer = ManualTimer::new();
        let mut watch = CssSelectorWatch::new(Box::new(timer.clone()));
        watch.update_selector_matches(&strings(&[".never"]), &[]);
        assert_eq!(watch.state(), DebounceState::Idle);
        assert!(!timer.is_active());
    }

    #[test]
    fn test_rejects_combinators() {
        let mut watch = CssSelectorWatch::new(Box::new(ManualTimer::new()));
        assert_eq!(watch.watch_css_selectors(&["div.x", "div > p", "#y"]), 2);
        assert_eq!(watch.watched_selectors().len(), 2);
    }
}
