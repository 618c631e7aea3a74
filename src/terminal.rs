// ── Terminal host ───────────────────────────────────────────────────────────
//
// Line-oriented presentation host for the `rentchat` binary. Transcript
// entries are printed as they arrive, quick replies are listed as numbered
// lines, and stdin lines are translated into user actions.

use std::io::{self, Write};

use colored::{ColoredString, Colorize};

use crate::protocol::QuickReply;
use crate::render::{Bubble, Inline, PropertyCard, Side, TranscriptEntry};
use crate::session::UserAction;
use crate::view::{Indicator, IndicatorTone, InputView, OptionsView, StatusView, TranscriptView};

const INDENT: &str = "    ";

pub struct TerminalView<W: Write = io::Stdout> {
    out: W,
    input: String,
    /// Whether numbered options are on screen and still resolve.
    options_live: bool,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            input: String::new(),
            options_live: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print_bubble(&mut self, bubble: &Bubble) {
        let tag = match bubble.side {
            Side::User => "You".green().bold(),
            Side::Bot => "Bot".cyan().bold(),
        };
        let mut line = format!("{tag} › ");
        for inline in &bubble.content {
            match inline {
                Inline::Text(t) => line.push_str(t),
                Inline::Strong(t) => line.push_str(&t.as_str().bold().to_string()),
                Inline::LineBreak => {
                    line.push('\n');
                    line.push_str(INDENT);
                }
            }
        }
        let _ = writeln!(self.out, "{line}");
    }

    fn print_card(&mut self, card: &PropertyCard) {
        let _ = writeln!(self.out, "{INDENT}┌ {}", card.title.as_str().bold());
        for line in card.lines() {
            let _ = writeln!(self.out, "{INDENT}│ {}", line.dimmed());
        }
        if let Some(link) = &card.link {
            let _ = writeln!(self.out, "{INDENT}│ {} {}", link.label.yellow(), link.href.as_str().underline());
        }
        let _ = writeln!(self.out, "{INDENT}└");
    }
}

impl<W: Write> TranscriptView for TerminalView<W> {
    fn append_entry(&mut self, entry: TranscriptEntry) {
        match &entry {
            TranscriptEntry::Bubble(b) => self.print_bubble(b),
            TranscriptEntry::PropertyGrid(cards) => {
                for card in cards {
                    self.print_card(card);
                }
            }
        }
    }

    fn scroll_to_bottom(&mut self) {
        let _ = self.out.flush();
    }
}

impl<W: Write> OptionsView for TerminalView<W> {
    fn render_options(&mut self, options: &[QuickReply]) {
        for (i, option) in options.iter().enumerate() {
            let _ = writeln!(
                self.out,
                "{INDENT}{} {}",
                format!("[/{}]", i + 1).magenta(),
                option.display_label()
            );
        }
        self.options_live = !options.is_empty();
        let _ = self.out.flush();
    }

    // Printed lines cannot be taken back, so mark them as no longer usable.
    fn clear_options(&mut self) {
        if !std::mem::take(&mut self.options_live) {
            return;
        }
        let _ = writeln!(self.out, "{INDENT}{}", "(options expired)".dimmed());
        let _ = self.out.flush();
    }
}

impl<W: Write> StatusView for TerminalView<W> {
    fn set_indicator(&mut self, indicator: Indicator) {
        let dot: ColoredString = match indicator.tone {
            IndicatorTone::Connected => "●".green(),
            IndicatorTone::Disconnected => "●".red(),
        };
        let _ = writeln!(self.out, "{dot} {}", indicator.label.dimmed());
        let _ = self.out.flush();
    }
}

impl<W: Write> InputView for TerminalView<W> {
    fn input_text(&self) -> String {
        self.input.clone()
    }

    fn set_input_text(&mut self, text: &str) {
        self.input = text.to_string();
    }

    fn focus_input(&mut self) {
        let _ = writeln!(
            self.out,
            "{INDENT}{} {}  {}",
            "›".yellow(),
            self.input,
            "(Enter to send)".dimmed()
        );
        let _ = self.out.flush();
    }
}

/// What a line typed on stdin asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    /// Forward these actions to the session, in order.
    Actions(Vec<UserAction>),
    ListExamples,
    Quit,
    /// Feedback for the user that never reaches the session.
    Notice(String),
}

/// Translate one stdin line.
///
/// Plain text is typed into the input and submitted. An empty line submits
/// whatever the input already holds, which is how a pre-filled example prompt
/// gets sent. `/N` picks the N-th live option.
pub fn parse_line(line: &str, examples: &[String]) -> TerminalCommand {
    let line = line.trim_end_matches(['\r', '\n']);

    let Some(command) = line.strip_prefix('/') else {
        if line.trim().is_empty() {
            return TerminalCommand::Actions(vec![UserAction::Submit]);
        }
        return TerminalCommand::Actions(vec![
            UserAction::EditInput(line.to_string()),
            UserAction::Submit,
        ]);
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("quit" | "exit"), None) => TerminalCommand::Quit,
        (Some("examples"), None) => TerminalCommand::ListExamples,
        (Some("example"), Some(n)) => match pick(n, examples.len()) {
            Some(i) => TerminalCommand::Actions(vec![UserAction::ExamplePrompt(examples[i].clone())]),
            None => TerminalCommand::Notice(format!("No example prompt {n}.")),
        },
        (Some(n), None) if n.chars().all(|c| c.is_ascii_digit()) => match pick(n, usize::MAX) {
            Some(i) => TerminalCommand::Actions(vec![UserAction::SelectOptionAt(i)]),
            None => TerminalCommand::Notice(format!("No option {n}.")),
        },
        _ => TerminalCommand::Notice(format!(
            "Unknown command /{command}. Try /N, /examples, /example N or /quit."
        )),
    }
}

/// 1-based user index to 0-based, bounded by `len`.
fn pick(n: &str, len: usize) -> Option<usize> {
    let n: usize = n.parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

/// Numbered listing of the example prompts.
pub fn format_examples(examples: &[String]) -> String {
    if examples.is_empty() {
        return "No example prompts configured.".to_string();
    }
    examples
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{INDENT}/example {} {p}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
