use std::io::{Stdout, Write};
use std::sync::Arc;

use anyhow::Result;

use crate::blocks::{ClipboardSink, CodeBlocks};
use crate::canvas::Canvas;
use crate::config::Settings;
use crate::providers::{ChatClient, ChatMessage};
use crate::render::theme::{BOLD, RESET};
use crate::render::{rule, Accent, Highlighter, Renderer};
use crate::transcript::TranscriptStore;

const PROMPT: &str = ": ";
const HELP_HINT: &str = "\x1b[96m'q' to quit '-h' for help\x1b[0m";

mod commands;
mod confirm;
mod input;
mod runtime;
pub(crate) mod selector;
mod session;
mod text;
mod worker;

pub(crate) use runtime::run_app;

/// The chat being continued, or a fresh one that has not been saved yet.
#[derive(Debug, Default)]
struct ChatSession {
    id: Option<i64>,
    system_prompt: String,
    messages: Vec<ChatMessage>,
}

pub(crate) struct App<W: Write = Stdout> {
    settings: Settings,
    client: ChatClient,
    store: Option<TranscriptStore>,
    renderer: Renderer,
    canvas: Canvas<W>,
    blocks: CodeBlocks,
    clipboard: Option<Box<dyn ClipboardSink>>,
    session: ChatSession,
    last_reply: Option<String>,
    width: fn() -> usize,
    should_quit: bool,
}

impl<W: Write> App<W> {
    pub(crate) fn new(
        settings: Settings,
        highlighter: Arc<Highlighter>,
        store: Option<TranscriptStore>,
        out: W,
        width: fn() -> usize,
    ) -> Result<Self> {
        let client = ChatClient::new(&settings.model, settings.max_tokens)?;
        let theme = settings
            .theme
            .theme()
            .with_syntax_theme(settings.syntax_theme.as_deref());
        let renderer = Renderer::new(theme, highlighter)?;
        let session = ChatSession {
            id: None,
            system_prompt: settings.system_prompt.clone(),
            messages: Vec::new(),
        };
        Ok(Self {
            settings,
            client,
            store,
            renderer,
            canvas: Canvas::new(out),
            blocks: CodeBlocks::default(),
            clipboard: None,
            session,
            last_reply: None,
            width,
            should_quit: false,
        })
    }

    fn columns(&self) -> usize {
        (self.width)()
    }

    fn print(&mut self, text: &str) -> Result<()> {
        let width = self.columns();
        self.canvas.print(text, width)?;
        Ok(())
    }

    fn model_label(&self) -> String {
        format!(
            "{BOLD}{}{}:{RESET}",
            self.accent().code(),
            self.client.model()
        )
    }

    fn rule(&self) -> String {
        rule(self.accent(), self.columns())
    }

    fn accent(&self) -> Accent {
        match self.settings.accent.as_deref() {
            Some(name) => Accent::from_name(name),
            None => self.client.accent(),
        }
    }

    fn print_error(&mut self, message: &str) -> Result<()> {
        self.print(&format!("{}\n", Accent::Red.paint(message)))
    }
}
