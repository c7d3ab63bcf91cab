use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::config::Settings;
use crate::error::ReplError;
use crate::providers::ChatMessage;
use crate::render::Highlighter;
use crate::spinner::Spinner;
use crate::terminal::{self, Key, KeySource, RawModeGuard, TerminalKeys};
use crate::transcript::TranscriptStore;

use super::commands::{parse_command, Command};
use super::confirm::Confirmation;
use super::input::{read_line, LineInput};
use super::worker::{spawn_completion, CompletionJob, WorkerEvent};
use super::{App, PROMPT};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const SPINNER_FRAME: Duration = Duration::from_millis(100);

pub(crate) fn run_app(settings: Settings, highlighter: Arc<Highlighter>) -> Result<()> {
    let store = match TranscriptStore::open_default() {
        Ok(store) => Some(store),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "chat history unavailable");
            None
        }
    };
    let mut app = App::new(settings, highlighter, store, io::stdout(), terminal::live_width)?;
    app.run(&mut TerminalKeys)
}

enum Submission {
    Sent,
    /// Failed or abandoned; the text goes back into the editor.
    Returned(String),
}

impl<W: Write> App<W> {
    pub(crate) fn run(&mut self, keys: &mut dyn KeySource) -> Result<()> {
        if !self.open_session(keys)? {
            tracing::info!("chat selection cancelled");
            return Ok(());
        }

        let mut draft = String::new();
        while !self.should_quit {
            let line = match read_line(&mut self.canvas, keys, &self.width, PROMPT, &draft)? {
                LineInput::Submitted(line) => line,
                LineInput::Interrupted => break,
            };
            draft.clear();
            match parse_command(&line) {
                Command::Message(text) => match self.confirm(keys)? {
                    Confirmation::Commit => {
                        if let Submission::Returned(text) = self.submit(text)? {
                            draft = text;
                        }
                    }
                    Confirmation::Edit => draft = line,
                },
                command => {
                    self.canvas.commit();
                    self.run_command(command)?;
                }
            }
        }
        self.canvas.commit();
        Ok(())
    }

    fn submit(&mut self, text: String) -> Result<Submission> {
        let mut messages = self.session.messages.clone();
        messages.push(ChatMessage::user(text.clone()));
        let job = CompletionJob {
            system_prompt: self.session.system_prompt.clone(),
            messages,
            want_title: self.session.id.is_none() && self.settings.ai_chat_titles,
        };
        let rx = spawn_completion(self.client.clone(), job);

        match self.await_reply(&rx)? {
            Some(WorkerEvent::Done { reply, title }) => {
                self.show_reply(&reply, self.settings.renderer, true)?;
                if let Err(err) = self.record_exchange(&text, &reply, title.as_deref()) {
                    tracing::warn!(error = %format!("{err:#}"), "could not save exchange");
                    self.print_error(&format!("Could not save chat: {err}"))?;
                }
                Ok(Submission::Sent)
            }
            Some(WorkerEvent::Failed(err)) => {
                self.print_error(&err.to_string())?;
                Ok(Submission::Returned(text))
            }
            None => {
                self.print_error("Request cancelled.")?;
                Ok(Submission::Returned(text))
            }
        }
    }

    /// Spin until the worker answers. Esc or Ctrl-C abandons the request and
    /// yields `None`.
    fn await_reply(&mut self, rx: &Receiver<WorkerEvent>) -> Result<Option<WorkerEvent>> {
        let raw = RawModeGuard::acquire()?;
        let mut spinner = Spinner::stdout("").with_delay(SPINNER_FRAME);
        spinner.start()?;
        let outcome = loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => break Some(event),
                Err(RecvTimeoutError::Disconnected) => {
                    break Some(WorkerEvent::Failed(ReplError::Api {
                        provider: self.client.vendor().as_str(),
                        message: "request worker stopped unexpectedly".to_string(),
                    }))
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
            if let Some(Key::Esc | Key::Interrupt) = terminal::poll_key(Duration::ZERO)? {
                tracing::info!("request abandoned");
                break None;
            }
        };
        spinner.stop()?;
        drop(raw);
        Ok(outcome)
    }
}
