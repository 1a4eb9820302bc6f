//! Interactive line-based front-end.
//!
//! Plain text sets the topic and generates a script. Slash commands change the
//! language, request translations and redisplay the current view.

use std::io::Write;

use futures_util::future::join_all;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::controller::Controller;
use crate::render::render_view;
use crate::script::Language;

pub const HELP_TEXT: &str = "\
Type a topic to generate a script, or use a command:
  /generate              regenerate from the current topic
  /lang <language>       set the language for new scripts
  /translate <lang>...   translate the current script (or 'all')
  /show                  show the current script and translations
  /help                  show this help
  /quit                  exit";

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Set the topic and generate.
    Generate(String),
    /// Generate again from the current topic.
    Regenerate,
    SetLanguage(Language),
    /// Translate into each listed language; empty means every other language.
    Translate(Vec<Language>),
    Show,
    Help,
    Quit,
}

/// Parse one line of input.
///
/// Returns `Ok(None)` for blank lines and `Err` with a message for malformed
/// slash commands.
pub fn parse_input(input: &str) -> Result<Option<ReplCommand>, String> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.starts_with('/') {
        return parse_command(trimmed).map(Some);
    }

    Ok(Some(ReplCommand::Generate(trimmed.to_string())))
}

fn parse_command(input: &str) -> Result<ReplCommand, String> {
    let mut parts = input.split_whitespace();
    let name = parts.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    match name.as_str() {
        "/generate" | "/g" => Ok(ReplCommand::Regenerate),
        "/lang" | "/language" => match args.as_slice() {
            [lang] => lang.parse().map(ReplCommand::SetLanguage),
            _ => Err("Usage: /lang <bangla|hindi|hinglish>".to_string()),
        },
        "/translate" | "/t" => {
            if args.is_empty() {
                return Err("Usage: /translate <language>... | all".to_string());
            }
            if args.len() == 1 && args[0].eq_ignore_ascii_case("all") {
                return Ok(ReplCommand::Translate(Vec::new()));
            }
            let languages = args
                .iter()
                .map(|a| a.parse::<Language>())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ReplCommand::Translate(languages))
        }
        "/show" => Ok(ReplCommand::Show),
        "/help" | "/?" => Ok(ReplCommand::Help),
        "/quit" | "/exit" | "/q" => Ok(ReplCommand::Quit),
        other => Err(format!(
            "Unknown command: {}. Type /help for available commands.",
            other
        )),
    }
}

/// Apply a command to the controller and print the resulting view.
///
/// Returns false when the session should end.
pub async fn execute<W: Write>(
    controller: &Controller,
    command: ReplCommand,
    out: &mut W,
) -> std::io::Result<bool> {
    match command {
        ReplCommand::Generate(topic) => {
            controller.set_topic(topic);
            controller.generate().await;
            write!(out, "{}", render_view(&controller.state()))?;
        }
        ReplCommand::Regenerate => {
            controller.generate().await;
            write!(out, "{}", render_view(&controller.state()))?;
        }
        ReplCommand::SetLanguage(language) => {
            controller.set_language(language);
            writeln!(out, "Language set to {}.", language)?;
        }
        ReplCommand::Translate(languages) => {
            let state = controller.state();
            let Some(source) = state.script_language else {
                writeln!(out, "Generate a script first.")?;
                return Ok(true);
            };
            let targets: Vec<Language> = if languages.is_empty() {
                source.translation_targets().collect()
            } else {
                languages
            };
            join_all(targets.into_iter().map(|t| controller.translate(t))).await;
            write!(out, "{}", render_view(&controller.state()))?;
        }
        ReplCommand::Show => {
            write!(out, "{}", render_view(&controller.state()))?;
        }
        ReplCommand::Help => writeln!(out, "{}", HELP_TEXT)?,
        ReplCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Run the read-eval-print loop until `/quit` or end of input.
pub async fn run<R, W>(controller: &Controller, input: R, out: &mut W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        match parse_input(&line) {
            Ok(Some(command)) => {
                if !execute(controller, command, out).await? {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => writeln!(out, "{}", message)?,
        }
    }

    Ok(())
}
