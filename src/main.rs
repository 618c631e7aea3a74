use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tokio::sync::mpsc;

use rentchat::config::Config;
use rentchat::logging::{self, LogConfig, LogFormat};
use rentchat::terminal::{self, TerminalCommand, TerminalView};
use rentchat::{SessionController, SessionEvent};

#[derive(Debug, Parser)]
#[command(name = "rentchat", version, about = "Chat with the rental assistant from a terminal")]
struct Args {
    /// Backend host (and port) serving the chat endpoint
    #[arg(long, env = "RENTCHAT_HOST")]
    host: Option<String>,

    /// Connect with wss:// instead of ws://
    #[arg(long)]
    secure: bool,

    /// Path to config file (default: ~/.rentchat/config.toml)
    #[arg(short, long, env = "RENTCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format: pretty, compact or json
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config)?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if args.secure {
        config.secure = true;
    }

    let mut log_config = LogConfig::resolve(&config.logging);
    if let Some(format) = &args.log_format {
        log_config.format = LogFormat::parse(format);
    }
    logging::init(log_config);

    let url = config.endpoint()?;
    println!(
        "{} {}  {}",
        "rentchat".bold(),
        url,
        "(/examples for ideas, /quit to leave)".dimmed()
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let session = SessionController::connect(url, TerminalView::stdout(), tx.clone());

    // Stdin is read on a plain thread so a pending read never holds up exit.
    let examples = config.example_prompts.clone();
    std::thread::spawn(move || read_stdin(&tx, &examples));

    session.run(rx).await;
    Ok(())
}

fn read_stdin(events: &mpsc::UnboundedSender<SessionEvent>, examples: &[String]) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match terminal::parse_line(&line, examples) {
            TerminalCommand::Actions(actions) => {
                for action in actions {
                    if events.send(action.into()).is_err() {
                        return;
                    }
                }
            }
            TerminalCommand::ListExamples => println!("{}", terminal::format_examples(examples)),
            TerminalCommand::Notice(notice) => println!("{}", notice.dimmed()),
            TerminalCommand::Quit => break,
        }
    }
    let _ = events.send(SessionEvent::Shutdown);
}
