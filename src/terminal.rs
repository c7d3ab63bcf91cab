use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};

use crate::error::ReplError;

pub(crate) const FALLBACK_WIDTH: usize = 80;

pub(crate) fn terminal_width() -> Result<usize, ReplError> {
    match crossterm::terminal::size() {
        Ok((width, _)) if width > 0 => Ok(usize::from(width)),
        _ => Err(ReplError::TerminalSizeUnavailable),
    }
}

/// Current width, re-queried on every call so resizes are honoured.
pub(crate) fn live_width() -> usize {
    terminal_width().unwrap_or_else(|err| {
        tracing::debug!(%err, fallback = FALLBACK_WIDTH, "using fallback width");
        FALLBACK_WIDTH
    })
}

/// Raw mode for as long as the guard lives. Restores whatever mode was active
/// before, so nested guards are harmless.
pub(crate) struct RawModeGuard {
    enabled_here: bool,
}

impl RawModeGuard {
    pub(crate) fn acquire() -> io::Result<Self> {
        if is_raw_mode_enabled()? {
            return Ok(Self {
                enabled_here: false,
            });
        }
        enable_raw_mode()?;
        Ok(Self { enabled_here: true })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled_here {
            if let Err(err) = disable_raw_mode() {
                tracing::warn!(%err, "failed to leave raw mode");
            }
        }
    }
}

/// Session-wide terminal setup. Bracketed paste keeps pasted newlines from
/// submitting the prompt halfway through.
pub(crate) struct TerminalSession;

impl TerminalSession {
    pub(crate) fn start() -> io::Result<Self> {
        execute!(io::stdout(), EnableBracketedPaste)?;
        Ok(Self)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, DisableBracketedPaste).and_then(|_| stdout.flush()) {
            tracing::warn!(%err, "failed to restore terminal");
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Key {
    Char(char),
    Ctrl(char),
    Paste(String),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Esc,
    /// Ctrl-C. Raw mode swallows the signal, so it arrives as a key.
    Interrupt,
    /// Ctrl-D.
    Eof,
}

pub(crate) fn map_key(key: KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let mapped = match key.code {
        KeyCode::Char(c) if ctrl => match c.to_ascii_lowercase() {
            'c' => Key::Interrupt,
            'd' => Key::Eof,
            other => Key::Ctrl(other),
        },
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Char('\t'),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Esc => Key::Esc,
        _ => return None,
    };
    Some(mapped)
}

fn map_event(event: Event) -> Option<Key> {
    match event {
        Event::Key(key) => map_key(key),
        Event::Paste(text) => Some(Key::Paste(text)),
        _ => None,
    }
}

/// Block for one keystroke in raw mode.
pub(crate) fn read_key() -> io::Result<Key> {
    let _raw = RawModeGuard::acquire()?;
    loop {
        if let Some(key) = map_event(event::read()?) {
            return Ok(key);
        }
    }
}

/// Non-blocking variant: `None` when nothing arrives within `timeout`.
pub(crate) fn poll_key(timeout: Duration) -> io::Result<Option<Key>> {
    let _raw = RawModeGuard::acquire()?;
    if event::poll(timeout)? {
        return Ok(map_event(event::read()?));
    }
    Ok(None)
}

/// Where line editors and prompts get their keys from.
pub(crate) trait KeySource {
    fn next_key(&mut self) -> io::Result<Key>;

    /// Hold raw mode across a whole interaction rather than per key.
    fn raw_mode(&mut self) -> io::Result<Option<RawModeGuard>> {
        Ok(None)
    }
}

pub(crate) struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> io::Result<Key> {
        read_key()
    }

    fn raw_mode(&mut self) -> io::Result<Option<RawModeGuard>> {
        RawModeGuard::acquire().map(Some)
    }
}
