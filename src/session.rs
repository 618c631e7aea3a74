//! The chat session controller.
//!
//! One [`SessionController`] owns the transport channel, the live option set
//! and the host view. Everything that can happen to a session, whether a
//! connection event or a user action, is a [`SessionEvent`] fed through
//! [`SessionController::handle`], one at a time and in arrival order. Each
//! event is fully rendered before the next is looked at.

use std::ops::ControlFlow;

use strum::Display;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::options::OptionDispatcher;
use crate::protocol::{InboundFrame, OutboundFrame, QuickReply};
use crate::render::{self, Side};
use crate::transport::{self, ChannelEvent, ConnectionState, FrameSink, TransportChannel, WsSink};
use crate::view::{ChatView, Indicator};

/// Something the user did in the host.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UserAction {
    /// The form was submitted with whatever is in the input field.
    Submit,
    /// The user edited the input field.
    EditInput(String),
    /// A quick-reply control carrying its own value/label pair.
    SelectOption(QuickReply),
    /// A quick-reply control picked by position in the live set.
    SelectOptionAt(usize),
    /// An example prompt was clicked; it only pre-fills the input.
    ExamplePrompt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Channel(ChannelEvent),
    User(UserAction),
    /// Stop [`SessionController::run`].
    Shutdown,
}

impl From<ChannelEvent> for SessionEvent {
    fn from(event: ChannelEvent) -> Self {
        SessionEvent::Channel(event)
    }
}

impl From<UserAction> for SessionEvent {
    fn from(action: UserAction) -> Self {
        SessionEvent::User(action)
    }
}

#[derive(Debug)]
pub struct SessionController<S, V> {
    channel: TransportChannel<S>,
    options: OptionDispatcher,
    view: V,
}

impl<V: ChatView> SessionController<WsSink, V> {
    /// Open a WebSocket session to `url`. Connection events are delivered on
    /// `events`, the same queue the host pushes user actions onto.
    pub fn connect(url: Url, view: V, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        info!(%url, "starting chat session");
        Self::new(transport::connect(url, events), view)
    }
}

impl<S: FrameSink, V: ChatView> SessionController<S, V> {
    pub fn new(channel: TransportChannel<S>, mut view: V) -> Self {
        view.set_indicator(Indicator::for_state(channel.state()));
        Self {
            channel,
            options: OptionDispatcher::new(),
            view,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn channel(&self) -> &TransportChannel<S> {
        &self.channel
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn options(&self) -> &[QuickReply] {
        self.options.active()
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// Process one event. Breaks only on [`SessionEvent::Shutdown`].
    pub fn handle(&mut self, event: SessionEvent) -> ControlFlow<()> {
        match event {
            SessionEvent::Channel(ChannelEvent::Message(raw)) => self.on_message(&raw),
            SessionEvent::Channel(lifecycle) => self.on_lifecycle(&lifecycle),
            SessionEvent::User(action) => self.on_user_action(action),
            SessionEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Drain `events` until shutdown or until every sender is gone.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        while let Some(event) = events.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }
        debug!(state = %self.state(), "chat session stopped");
        self
    }

    fn on_lifecycle(&mut self, event: &ChannelEvent) {
        let before = self.channel.state();
        let after = self.channel.observe(event);
        if before == after {
            return;
        }

        self.view.set_indicator(Indicator::for_state(after));
        if after == ConnectionState::Open {
            // Ask the backend for its greeting.
            self.channel.send(&OutboundFrame::start());
        }
    }

    fn on_message(&mut self, raw: &str) {
        match InboundFrame::decode(raw) {
            Ok(frame) => self.render_frame(&frame),
            Err(e) => warn!(error = %e, len = raw.len(), "dropping malformed frame"),
        }
    }

    /// Render one bot turn: its bubble, then its options, then its cards.
    pub fn render_frame(&mut self, frame: &InboundFrame) {
        render::append_bubble(&mut self.view, &frame.text, Side::Bot);
        self.options.show_options(&mut self.view, &frame.options);
        render::append_property_grid(&mut self.view, &frame.properties);
    }

    fn on_user_action(&mut self, action: UserAction) {
        debug!(%action, "user action");
        match action {
            UserAction::Submit => self.dispatch(None, None),
            UserAction::EditInput(text) => self.view.set_input_text(&text),
            UserAction::SelectOption(option) => self.choose(&option),
            UserAction::SelectOptionAt(index) => match self.options.get(index).cloned() {
                Some(option) => self.choose(&option),
                None => debug!(index, "no live option at index"),
            },
            UserAction::ExamplePrompt(prompt) => {
                if prompt.is_empty() {
                    return;
                }
                self.view.set_input_text(&prompt);
                self.view.focus_input();
            }
        }
    }

    fn choose(&mut self, option: &QuickReply) {
        self.dispatch(Some(option.value.as_str()), Some(option.label.as_str()));
    }

    /// The outbound path shared by typed text and chosen options.
    ///
    /// The text sent is `value` when it is non-empty, otherwise the trimmed
    /// input. A no-op when that is empty or the channel is not open. Otherwise
    /// the user bubble (`label`, or the text) and the option clear both happen
    /// before the send. The input is cleared unless a label was shown.
    fn dispatch(&mut self, value: Option<&str>, label: Option<&str>) {
        let text = match value.filter(|v| !v.is_empty()) {
            Some(v) => v.to_string(),
            None => self.view.input_text().trim().to_string(),
        };
        if text.is_empty() || !self.channel.is_open() {
            debug!(state = %self.channel.state(), empty = text.is_empty(), "nothing sent");
            return;
        }

        let label = label.filter(|l| !l.is_empty());
        render::append_bubble(&mut self.view, label.unwrap_or(&text), Side::User);
        self.options.clear_options(&mut self.view);
        self.channel.send(&OutboundFrame::new(&text));

        if label.is_none() {
            self.view.set_input_text("");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TranscriptEntry;
    use crate::transport::RecordingSink;
    use crate::view::{IndicatorTone, MemoryView, ViewCall};

    type TestSession = SessionController<RecordingSink, MemoryView>;

    fn session() -> TestSession {
        SessionController::new(
            TransportChannel::new(RecordingSink::default()),
            MemoryView::default(),
        )
    }

    fn open_session() -> TestSession {
        let mut s = session();
        let _ = s.handle(ChannelEvent::Open.into());
        s
    }

    fn sent(s: &TestSession) -> &[String] {
        &s.channel().sink().sent
    }

    fn message(raw: &str) -> SessionEvent {
        ChannelEvent::Message(raw.to_string()).into()
    }

    #[test]
    fn test_initial_indicator_is_connecting() {
        let s = session();
        assert_eq!(s.state(), ConnectionState::Connecting);
        assert_eq!(s.view().indicator.label, "Connecting…");
        assert_eq!(s.view().indicator.tone, IndicatorTone::Disconnected);
    }

    #[test]
    fn test_open_sends_start_once() {
        let mut s = open_session();
        assert_eq!(sent(&s), [r#"{"text":"start"}"#]);
        assert_eq!(s.view().indicator.label, "Connected");

        // A duplicate open is not a transition and sends nothing.
        let _ = s.handle(ChannelEvent::Open.into());
        assert_eq!(sent(&s).len(), 1);
    }

    #[test]
    fn test_error_then_close_indicator() {
        let mut s = open_session();
        let _ = s.handle(ChannelEvent::Errored("reset".into()).into());
        assert_eq!(s.view().indicator.label, "Error");
        let _ = s.handle(ChannelEvent::Closed.into());
        assert_eq!(s.state(), ConnectionState::Closed);
        assert_eq!(s.view().indicator.label, "Disconnected");
    }

    #[test]
    fn test_frame_renders_bubble_options_then_grid() {
        let mut s = open_session();
        let _ = s.handle(message(
            r#"{"text":"Found one","options":[{"label":"More","value":"more"}],
                "properties":[{"title":"Flat","location":"York"}]}"#,
        ));

        let calls: Vec<_> = s
            .view()
            .calls
            .iter()
            .filter(|c| !matches!(c, ViewCall::Indicator(_) | ViewCall::ScrollToBottom))
            .collect();
        assert!(matches!(calls[0], ViewCall::Entry(TranscriptEntry::Bubble(_))));
        assert!(matches!(calls[1], ViewCall::ClearOptions));
        assert!(matches!(calls[2], ViewCall::ShowOptions(_)));
        assert!(matches!(calls[3], ViewCall::Entry(TranscriptEntry::PropertyGrid(_))));
        assert_eq!(calls.len(), 4);
    }

    #[test]
    fn test_empty_frame_still_renders_bubble() {
        let mut s = open_session();
        let _ = s.handle(message("{}"));
        let bubbles: Vec<_> = s.view().bubbles().collect();
        assert_eq!(bubbles.len(), 1);
        assert!(bubbles[0].content.is_empty());
        assert_eq!(bubbles[0].side, Side::Bot);
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let mut s = open_session();
        let _ = s.handle(message("not json"));
        let _ = s.handle(message("null"));
        let _ = s.handle(message(r#"{"text": 5}"#));
        assert_eq!(s.view().entries().count(), 0);
        assert_eq!(s.state(), ConnectionState::Open);
    }

    #[test]
    fn test_submit_sends_trimmed_input_and_clears_it() {
        let mut s = open_session();
        let _ = s.handle(UserAction::EditInput("  2 beds in Leeds  ".into()).into());
        let _ = s.handle(UserAction::Submit.into());

        assert_eq!(sent(&s)[1], r#"{"text":"2 beds in Leeds"}"#);
        assert_eq!(s.view().input, "");
        let last = s.view().bubbles().last().unwrap();
        assert_eq!(last.side, Side::User);
        assert_eq!(last.plain_text(), "2 beds in Leeds");
    }

    #[test]
    fn test_submit_empty_is_noop() {
        let mut s = open_session();
        let _ = s.handle(UserAction::EditInput("   ".into()).into());
        let _ = s.handle(UserAction::Submit.into());
        assert_eq!(sent(&s).len(), 1);
        assert_eq!(s.view().entries().count(), 0);
    }

    #[test]
    fn test_submit_while_not_open_is_noop() {
        let mut s = session();
        let _ = s.handle(UserAction::EditInput("hello".into()).into());
        let _ = s.handle(UserAction::Submit.into());
        assert!(sent(&s).is_empty());
        assert_eq!(s.view().entries().count(), 0);
        // Input is left for the user.
        assert_eq!(s.view().input, "hello");
    }

    #[test]
    fn test_option_click_shows_label_sends_value() {
        let mut s = open_session();
        let _ = s.handle(message(
            r#"{"text":"Hi","options":[{"label":"Find a flat","value":"find_flat"}]}"#,
        ));
        let _ = s.handle(UserAction::EditInput("draft".into()).into());
        let _ = s.handle(UserAction::SelectOptionAt(0).into());

        assert_eq!(sent(&s)[1], r#"{"text":"find_flat"}"#);
        assert_eq!(s.view().bubbles().last().unwrap().plain_text(), "Find a flat");
        assert!(s.options().is_empty());
        assert!(!s.view().options_visible);
        // Choosing an option leaves typed input alone.
        assert_eq!(s.view().input, "draft");
    }

    #[test]
    fn test_option_without_label_shows_value() {
        let mut s = open_session();
        let _ = s.handle(UserAction::SelectOption(QuickReply::new("", "yes")).into());
        assert_eq!(s.view().bubbles().last().unwrap().plain_text(), "yes");
        assert_eq!(sent(&s)[1], r#"{"text":"yes"}"#);
    }

    #[test]
    fn test_option_without_value_sends_typed_input() {
        let mut s = open_session();
        let _ = s.handle(UserAction::EditInput("  typed  ".into()).into());
        let _ = s.handle(UserAction::SelectOption(QuickReply::new("Other", "")).into());

        assert_eq!(sent(&s)[1], r#"{"text":"typed"}"#);
        assert_eq!(s.view().bubbles().last().unwrap().plain_text(), "Other");
        // The label was shown, so the input is kept.
        assert_eq!(s.view().input, "  typed  ");
    }

    #[test]
    fn test_option_without_value_or_input_is_noop() {
        let mut s = open_session();
        let _ = s.handle(UserAction::SelectOption(QuickReply::new("Other", "")).into());
        assert_eq!(sent(&s).len(), 1);
        assert_eq!(s.view().entries().count(), 0);
    }

    #[test]
    fn test_option_without_label_clears_input() {
        let mut s = open_session();
        let _ = s.handle(UserAction::EditInput("draft".into()).into());
        let _ = s.handle(UserAction::SelectOption(QuickReply::new("", "yes")).into());
        assert_eq!(sent(&s)[1], r#"{"text":"yes"}"#);
        assert_eq!(s.view().input, "");
    }

    #[test]
    fn test_stale_option_index_is_noop() {
        let mut s = open_session();
        let _ = s.handle(UserAction::SelectOptionAt(3).into());
        assert_eq!(sent(&s).len(), 1);
    }

    #[test]
    fn test_typed_send_clears_live_options() {
        let mut s = open_session();
        let _ = s.handle(message(r#"{"options":[{"label":"A","value":"a"}]}"#));
        let _ = s.handle(UserAction::EditInput("something else".into()).into());
        let _ = s.handle(UserAction::Submit.into());
        assert!(s.options().is_empty());
        assert!(!s.view().options_visible);
    }

    #[test]
    fn test_example_prompt_prefills_without_sending() {
        let mut s = open_session();
        let _ = s.handle(UserAction::ExamplePrompt("Flats in Bristol".into()).into());
        assert_eq!(s.view().input, "Flats in Bristol");
        assert_eq!(s.view().calls.last(), Some(&ViewCall::FocusInput));
        assert_eq!(sent(&s).len(), 1);

        let _ = s.handle(UserAction::ExamplePrompt(String::new()).into());
        assert_eq!(s.view().input, "Flats in Bristol");
    }

    #[test]
    fn test_shutdown_breaks() {
        let mut s = session();
        assert!(s.handle(SessionEvent::Shutdown).is_break());
    }

    #[tokio::test]
    async fn test_run_processes_in_order() {
        let (tx, rx) = mpsc::unbounded_channel::<SessionEvent>();
        tx.send(ChannelEvent::Open.into()).unwrap();
        tx.send(message(r#"{"text":"one"}"#)).unwrap();
        tx.send(message(r#"{"text":"two"}"#)).unwrap();
        tx.send(SessionEvent::Shutdown).unwrap();
        tx.send(message(r#"{"text":"after shutdown"}"#)).unwrap();

        let s = session().run(rx).await;
        let texts: Vec<_> = s.view().bubbles().map(|b| b.plain_text()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }
}
