//! Terminal front end: stdin lines in, rendered frames out

use std::collections::HashSet;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error};

use assistant_bus::{Action, InboundSender, UiFrame, UiMessage, UserEvent};
use assistant_feedback::FeedbackKind;

use crate::examples::{example_actions, AGENT_ACTION, WORKFLOW_ACTION};

const HELP: &str = "Commands: /helpful /not_helpful /detailed /workflow /agent /quit";

fn example_action(name: &str) -> Option<Action> {
    example_actions().into_iter().find(|a| a.name == name)
}

/// Turn a typed line into a user event; blank lines produce nothing
pub fn parse_line(line: &str) -> Option<UserEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let event = match line {
        "/quit" | "/exit" => UserEvent::End,
        "/helpful" => UserEvent::Action(FeedbackKind::Helpful.action()),
        "/not_helpful" => UserEvent::Action(FeedbackKind::NotHelpful.action()),
        "/detailed" => UserEvent::Action(FeedbackKind::Detailed.action()),
        "/workflow" => UserEvent::Action(example_action(WORKFLOW_ACTION)?),
        "/agent" => UserEvent::Action(example_action(AGENT_ACTION)?),
        _ => UserEvent::message(line),
    };
    Some(event)
}

/// Command that triggers `action` from the keyboard
pub fn command_for(action: &Action) -> Option<&'static str> {
    if let Some(kind) = FeedbackKind::from_action(action) {
        return Some(match kind {
            FeedbackKind::Helpful => "/helpful",
            FeedbackKind::NotHelpful => "/not_helpful",
            FeedbackKind::Detailed => "/detailed",
        });
    }
    match action.name.as_str() {
        WORKFLOW_ACTION => Some("/workflow"),
        AGENT_ACTION => Some("/agent"),
        _ => None,
    }
}

/// Forward typed lines as user events; end of input ends the chat
pub async fn read_input<R>(reader: R, inbound: InboundSender)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(event) = parse_line(&line) else {
                    continue;
                };
                let done = event == UserEvent::End;
                if inbound.send(event).is_err() || done {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        }
    }

    debug!("Input closed");
    let _ = inbound.send(UserEvent::End);
}

/// Writes frames as plain text
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    streaming: HashSet<String>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn help() -> &'static str {
        HELP
    }

    fn write_actions<W: Write>(out: &mut W, message: &UiMessage) -> io::Result<()> {
        for action in &message.actions {
            match command_for(action) {
                Some(command) => writeln!(out, "  {command:<14} {}", action.label)?,
                None => writeln!(out, "  {}", action.label)?,
            }
        }
        Ok(())
    }

    pub fn render<W: Write>(&mut self, frame: &UiFrame, out: &mut W) -> io::Result<()> {
        match frame {
            UiFrame::Message(message) if message.content.is_empty() => {
                self.streaming.insert(message.id.clone());
                write!(out, "\n[{}] ", message.author)?;
            }
            UiFrame::Message(message) => {
                writeln!(out, "\n[{}] {}", message.author, message.content)?;
                Self::write_actions(out, message)?;
            }
            UiFrame::Token { message_id, token } => {
                if self.streaming.contains(message_id) {
                    write!(out, "{token}")?;
                }
            }
            UiFrame::Update(message) => {
                if self.streaming.remove(&message.id) {
                    writeln!(out)?;
                } else {
                    writeln!(out, "\n[{}] {}", message.author, message.content)?;
                }
                Self::write_actions(out, message)?;
            }
        }
        out.flush()
    }
}
