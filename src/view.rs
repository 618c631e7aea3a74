//! The presentation boundary.
//!
//! A host supplies four mount points: the transcript, the quick-reply area,
//! the connection indicator and the input field. The session drives them
//! through these traits and never reaches into the host otherwise.

use crate::protocol::QuickReply;
use crate::render::{Bubble, TranscriptEntry};
use crate::transport::ConnectionState;

pub trait TranscriptView {
    fn append_entry(&mut self, entry: TranscriptEntry);
    fn scroll_to_bottom(&mut self);
}

pub trait OptionsView {
    /// Show one control per option, in order, and make the area visible.
    fn render_options(&mut self, options: &[QuickReply]);
    /// Remove every control and hide the area. Must be idempotent.
    fn clear_options(&mut self);
}

pub trait StatusView {
    fn set_indicator(&mut self, indicator: Indicator);
}

pub trait InputView {
    fn input_text(&self) -> String;
    fn set_input_text(&mut self, text: &str);
    fn focus_input(&mut self);
}

/// Everything a session needs from its host.
pub trait ChatView: TranscriptView + OptionsView + StatusView + InputView {}

impl<T: TranscriptView + OptionsView + StatusView + InputView> ChatView for T {}

/// Colour of the connection dot. Errors share the disconnected treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorTone {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub tone: IndicatorTone,
    pub label: &'static str,
}

impl Indicator {
    pub fn for_state(state: ConnectionState) -> Self {
        let (tone, label) = match state {
            ConnectionState::Connecting => (IndicatorTone::Disconnected, "Connecting…"),
            ConnectionState::Open => (IndicatorTone::Connected, "Connected"),
            ConnectionState::Closed => (IndicatorTone::Disconnected, "Disconnected"),
            ConnectionState::Errored => (IndicatorTone::Disconnected, "Error"),
        };
        Self { tone, label }
    }
}

/// A call made on a [`MemoryView`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCall {
    Entry(TranscriptEntry),
    ScrollToBottom,
    ShowOptions(Vec<QuickReply>),
    ClearOptions,
    Indicator(Indicator),
    SetInput(String),
    FocusInput,
}

/// Headless host that keeps the whole transcript in memory and records
/// every call it receives.
#[derive(Debug, Clone)]
pub struct MemoryView {
    pub calls: Vec<ViewCall>,
    pub options: Vec<QuickReply>,
    pub options_visible: bool,
    pub indicator: Indicator,
    pub input: String,
    pub scrolls: usize,
}

impl Default for MemoryView {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            options: Vec::new(),
            options_visible: false,
            indicator: Indicator::for_state(ConnectionState::Connecting),
            input: String::new(),
            scrolls: 0,
        }
    }
}

impl MemoryView {
    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.calls.iter().filter_map(|c| match c {
            ViewCall::Entry(e) => Some(e),
            _ => None,
        })
    }

    pub fn bubbles(&self) -> impl Iterator<Item = &Bubble> {
        self.entries().filter_map(|e| match e {
            TranscriptEntry::Bubble(b) => Some(b),
            TranscriptEntry::PropertyGrid(_) => None,
        })
    }
}

impl TranscriptView for MemoryView {
    fn append_entry(&mut self, entry: TranscriptEntry) {
        self.calls.push(ViewCall::Entry(entry));
    }

    fn scroll_to_bottom(&mut self) {
        self.scrolls += 1;
        self.calls.push(ViewCall::ScrollToBottom);
    }
}

impl OptionsView for MemoryView {
    fn render_options(&mut self, options: &[QuickReply]) {
        self.options = options.to_vec();
        self.options_visible = true;
        self.calls.push(ViewCall::ShowOptions(options.to_vec()));
    }

    fn clear_options(&mut self) {
        self.options.clear();
        self.options_visible = false;
        self.calls.push(ViewCall::ClearOptions);
    }
}

impl StatusView for MemoryView {
    fn set_indicator(&mut self, indicator: Indicator) {
        self.indicator = indicator;
        self.calls.push(ViewCall::Indicator(indicator));
    }
}

impl InputView for MemoryView {
    fn input_text(&self) -> String {
        self.input.clone()
    }

    fn set_input_text(&mut self, text: &str) {
        self.input = text.to_string();
        self.calls.push(ViewCall::SetInput(text.to_string()));
    }

    fn focus_input(&mut self) {
        self.calls.push(ViewCall::FocusInput);
    }
}
