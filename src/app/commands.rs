use std::io::Write;

use anyhow::Result;

use crate::blocks::SystemClipboard;
use crate::error::ReplError;
use crate::render::RenderMode;

use super::App;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Quit,
    Help,
    Copy(usize),
    Reprint(RenderMode),
    Invalid,
    Message(String),
    Empty,
}

pub(crate) fn parse_command(line: &str) -> Command {
    let normalized = line.trim().to_lowercase();
    if normalized.is_empty() {
        return Command::Empty;
    }
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    match tokens.as_slice() {
        ["q" | "quit" | "-q" | "--q"] => Command::Quit,
        ["-h" | "--h" | "--help"] => Command::Help,
        ["-c" | "--c", index] if index.chars().all(|c| c.is_ascii_digit()) => index
            .parse()
            .map(Command::Copy)
            .unwrap_or(Command::Invalid),
        ["-p" | "--p", mode] => RenderMode::parse(mode)
            .map(Command::Reprint)
            .unwrap_or(Command::Invalid),
        [first, ..] if looks_like_flag(first) => Command::Invalid,
        _ => Command::Message(line.to_string()),
    }
}

/// `-x` or `--x`, a dash run followed by exactly one character.
fn looks_like_flag(token: &str) -> bool {
    let rest = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'));
    matches!(rest, Some(rest) if rest.chars().count() == 1)
}

pub(crate) fn help_text() -> String {
    [
        "# Commands",
        "",
        "- `q` quit",
        "- `-h` show this help",
        "- `-c N` copy code block N of the last reply",
        "- `-p raw|lite` print the last reply again",
        "",
        "# Keys",
        "",
        "- `Enter` asks to send, then `y` sends and any other key goes back to editing",
        "- `Ctrl+N` newline, `Ctrl+R` clear input",
        "- `Ctrl+A` / `Ctrl+E` start / end, `Ctrl+W` delete word",
        "- `Esc` or `Ctrl+C` while waiting abandons the request",
        "- `Ctrl+C` / `Ctrl+D` at the prompt quit",
    ]
    .join("\n")
}

impl<W: Write> App<W> {
    /// Run a non-message command. Failures are reported on screen and the
    /// loop carries on.
    pub(super) fn run_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Quit => self.should_quit = true,
            Command::Help => {
                let width = self.columns();
                let help = self.renderer.render(&help_text(), Some(width));
                self.print(&format!("\n{}\n\n", help.text))?;
            }
            Command::Copy(index) => self.copy_block(index)?,
            Command::Reprint(mode) => match self.last_reply.clone() {
                Some(reply) => self.show_reply(&reply, mode, false)?,
                None => self.print_error("No response to print yet.")?,
            },
            Command::Invalid => self.print_error("invalid command")?,
            Command::Empty | Command::Message(_) => {}
        }
        Ok(())
    }

    fn copy_block(&mut self, index: usize) -> Result<()> {
        if let Err(err) = self.blocks.get(index) {
            return self.print_error(&err.to_string());
        }
        if self.clipboard.is_none() {
            match SystemClipboard::open() {
                Ok(clipboard) => self.clipboard = Some(Box::new(clipboard)),
                Err(err) => return self.print_error(&err.to_string()),
            }
        }
        let copied = match self.clipboard.as_deref_mut() {
            Some(clipboard) => self.blocks.copy_block(index, clipboard).map(|_| ()),
            None => Err(ReplError::Clipboard("not available".to_string())),
        };
        match copied {
            Ok(()) => self.print(&format!("Code block {index} copied to clipboard.\n")),
            Err(err) => {
                tracing::warn!(%err, index, "copy failed");
                self.print_error(&err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quit_and_help() {
        assert_eq!(parse_command(" Q "), Command::Quit);
        assert_eq!(parse_command("quit"), Command::Quit);
        assert_eq!(parse_command("--help"), Command::Help);
        assert_eq!(parse_command("-h"), Command::Help);
    }

    #[test]
    fn copy_takes_a_block_number() {
        assert_eq!(parse_command("-c 2"), Command::Copy(2));
        assert_eq!(parse_command("--c   10"), Command::Copy(10));
        assert_eq!(parse_command("-c two"), Command::Invalid);
        assert_eq!(parse_command("-c"), Command::Invalid);
        assert_eq!(
            parse_command("-c 99999999999999999999999"),
            Command::Invalid
        );
    }

    #[test]
    fn reprint_modes() {
        assert_eq!(parse_command("-p raw"), Command::Reprint(RenderMode::Raw));
        assert_eq!(parse_command("--p RICH"), Command::Reprint(RenderMode::Lite));
        assert_eq!(parse_command("-p fancy"), Command::Invalid);
    }

    #[test]
    fn flag_shaped_input_is_invalid() {
        assert_eq!(parse_command("-x"), Command::Invalid);
        assert_eq!(parse_command("--z something"), Command::Invalid);
    }

    #[test]
    fn everything_else_is_a_message() {
        assert_eq!(
            parse_command("  explain -- in bash "),
            Command::Message("  explain -- in bash ".to_string())
        );
        assert_eq!(
            parse_command("-verbose flags?"),
            Command::Message("-verbose flags?".to_string())
        );
        assert_eq!(parse_command("   "), Command::Empty);
    }

    #[test]
    fn help_lists_every_command() {
        let text = help_text();
        for needle in ["`q`", "`-h`", "`-c N`", "`-p raw|lite`"] {
            assert!(text.contains(needle), "{needle}");
        }
    }
}
