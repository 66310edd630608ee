//! Contextual trigger detection for the suggestion popup.
//!
//! Re-evaluated on every document or selection change. Only a single collapsed
//! caret can trigger, and only the text of the caret's line up to the caret is
//! considered. Checks run in a fixed order (slash, emoji, wiki-link) and the
//! first match wins.

use std::cell::OnceCell;
use std::sync::OnceLock;

use regex::Regex;

use crate::editing::Selection;
use crate::syntax::Span;

static SLASH_REGEX: OnceLock<Regex> = OnceLock::new();
static EMOJI_REGEX: OnceLock<Regex> = OnceLock::new();
static WIKI_REGEX: OnceLock<Regex> = OnceLock::new();

fn slash_regex() -> &'static Regex {
    SLASH_REGEX.get_or_init(|| Regex::new(r"^\s*/(\w*)$").expect("Invalid slash regex"))
}

fn emoji_regex() -> &'static Regex {
    EMOJI_REGEX.get_or_init(|| Regex::new(r"(?:^|\s):(\w*)$").expect("Invalid emoji regex"))
}

fn wiki_regex() -> &'static Regex {
    WIKI_REGEX
        .get_or_init(|| Regex::new(r"(?:^|\s)\[\[([^\[\]]*)$").expect("Invalid wiki-link regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Slash,
    Emoji,
    WikiLink,
}

impl Trigger {
    /// The literal text that opens the trigger.
    pub fn token(&self) -> &'static str {
        match self {
            Trigger::Slash => "/",
            Trigger::Emoji => ":",
            Trigger::WikiLink => "[[",
        }
    }
}

/// Screen position of the caret, as measured by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coords {
    pub left: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Caret coordinates measured on first use rather than during the update that
/// produced the trigger state.
#[derive(Debug, Clone, Default)]
pub struct LazyCoords {
    offset: usize,
    measured: OnceCell<Option<Coords>>,
}

impl LazyCoords {
    pub fn at(offset: usize) -> Self {
        Self {
            offset,
            measured: OnceCell::new(),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Runs `measure` at most once; later calls return the cached result.
    pub fn get_or_measure(&self, measure: impl FnOnce(usize) -> Option<Coords>) -> Option<Coords> {
        *self.measured.get_or_init(|| measure(self.offset))
    }

    pub fn is_measured(&self) -> bool {
        self.measured.get().is_some()
    }
}

impl PartialEq for LazyCoords {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriggerState {
    pub active: bool,
    pub trigger: Option<Trigger>,
    /// Text typed after the trigger token.
    pub query: String,
    /// From the trigger token to the caret; replaced when a suggestion is committed.
    pub range: Span,
    pub caret_coords: LazyCoords,
}

impl TriggerState {
    pub fn inactive() -> Self {
        Self::default()
    }

    fn active(trigger: Trigger, query: &str, range: Span) -> Self {
        Self {
            active: true,
            trigger: Some(trigger),
            query: query.to_string(),
            range,
            caret_coords: LazyCoords::at(range.end),
        }
    }
}

/// Detect the trigger immediately before the caret.
///
/// `doc_changed` is false when the re-check comes from caret movement alone;
/// a wiki-link trigger is then suppressed if `]]` follows the caret, so
/// clicking inside a finished link does not reopen the popup.
pub fn detect(text: &str, selection: &Selection, doc_changed: bool) -> TriggerState {
    let Some(caret) = selection.single_caret() else {
        return TriggerState::inactive();
    };
    if caret > text.len() || !text.is_char_boundary(caret) {
        return TriggerState::inactive();
    }

    let line_start = text[..caret].rfind('\n').map_or(0, |i| i + 1);
    let before = &text[line_start..caret];

    if let Some(caps) = slash_regex().captures(before) {
        let query = caps.get(1).map_or("", |m| m.as_str());
        let token = caps.get(1).map_or(before.len(), |m| m.start()) - Trigger::Slash.token().len();
        return TriggerState::active(Trigger::Slash, query, Span::new(line_start + token, caret));
    }

    if let Some(caps) = emoji_regex().captures(before) {
        let query = caps.get(1).map_or("", |m| m.as_str());
        let token = caps.get(1).map_or(before.len(), |m| m.start()) - Trigger::Emoji.token().len();
        return TriggerState::active(Trigger::Emoji, query, Span::new(line_start + token, caret));
    }

    if let Some(caps) = wiki_regex().captures(before) {
        if !doc_changed && text[caret..].starts_with("]]") {
            log::trace!("wiki-link trigger suppressed inside closed link at {caret}");
            return TriggerState::inactive();
        }
        let query = caps.get(1).map_or("", |m| m.as_str());
        let token =
            caps.get(1).map_or(before.len(), |m| m.start()) - Trigger::WikiLink.token().len();
        return TriggerState::active(Trigger::WikiLink, query, Span::new(line_start + token, caret));
    }

    TriggerState::inactive()
}

/// Receives every trigger evaluation (active or not), e.g. the suggestion list.
pub trait TriggerSink {
    fn trigger_changed(&mut self, state: &TriggerState);
}

/// Collects every evaluation.
impl TriggerSink for Vec<TriggerState> {
    fn trigger_changed(&mut self, state: &TriggerState) {
        self.push(state.clone());
    }
}

/// Keeps the last detected state and forwards each evaluation to a sink.
#[derive(Debug, Default)]
pub struct TriggerDetector {
    last: TriggerState,
}

impl TriggerDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TriggerState {
        &self.last
    }

    pub fn evaluate(
        &mut self,
        text: &str,
        selection: &Selection,
        doc_changed: bool,
        sink: &mut dyn TriggerSink,
    ) -> &TriggerState {
        let state = detect(text, selection, doc_changed);
        if state.trigger != self.last.trigger || state.active != self.last.active {
            log::debug!(
                "trigger {:?} -> {:?} (query {:?})",
                self.last.trigger,
                state.trigger,
                state.query
            );
        }
        self.last = state;
        sink.trigger_changed(&self.last);
        &self.last
    }

    /// Force the inactive state, e.g. after a suggestion is committed.
    pub fn close(&mut self, sink: &mut dyn TriggerSink) {
        self.last = TriggerState::inactive();
        sink.trigger_changed(&self.last);
    }
}
