use std::io::Write;

use anyhow::{Context, Result};

use crate::providers::{ChatMessage, Role};
use crate::render::theme::{BOLD, RESET};
use crate::render::RenderMode;
use crate::terminal::KeySource;

use super::selector::{run_selector, SelectableItem, Selector, SelectorState};
use super::{App, ChatSession, HELP_HINT};

impl<W: Write> App<W> {
    /// Pick a saved chat or start a new one. `false` means the user backed
    /// out and the program should exit untouched.
    pub(super) fn open_session(&mut self, keys: &mut dyn KeySource) -> Result<bool> {
        if self.settings.always_new_chat {
            self.greet()?;
            return Ok(true);
        }
        let items = match self.store.as_ref() {
            Some(store) => store.list_selectable_items()?,
            None => Vec::new(),
        };
        if items.is_empty() {
            self.greet()?;
            return Ok(true);
        }

        let mut selector = Selector::new(items, self.settings.page_size);
        let dim = |text: &str| self.renderer.theme().dim(text);
        let state = run_selector(&mut selector, &mut self.canvas, keys, &self.width, &dim)?;
        match state {
            SelectorState::Done(Some(item)) => self.resume(&item)?,
            SelectorState::Done(None) => self.greet()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub(super) fn greet(&mut self) -> Result<()> {
        let banner = format!(
            "\n{} How can I help you today? {HELP_HINT}\n{}\n",
            self.model_label(),
            self.rule()
        );
        self.print(&banner)
    }

    fn resume(&mut self, item: &SelectableItem) -> Result<()> {
        let Some(store) = self.store.as_ref() else {
            return self.greet();
        };
        let system_prompt = store.system_prompt(item.id)?;
        let messages = store.messages(item.id)?;
        let transcript = store.load_transcript(item.id)?;
        tracing::debug!(chat_id = item.id, messages = messages.len(), "resuming chat");

        let last_reply = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.clone());
        if let Some(reply) = last_reply.as_deref() {
            self.blocks.parse(reply);
        }
        self.last_reply = last_reply;
        self.session = ChatSession {
            id: Some(item.id),
            system_prompt,
            messages,
        };

        let width = self.columns();
        let rendered = self
            .renderer
            .render_mode(&transcript, self.settings.renderer, Some(width));
        let header = format!("\n{BOLD}{}:{RESET} {HELP_HINT}\n{}\n", item.label, self.rule());
        self.print(&header)?;
        if !rendered.text.is_empty() {
            self.print(&format!("\n{}\n\n{}\n", rendered.text, self.rule()))?;
        }
        Ok(())
    }

    /// Print a reply in `mode`, optionally under the model label, followed by
    /// a rule.
    pub(super) fn show_reply(&mut self, reply: &str, mode: RenderMode, labelled: bool) -> Result<()> {
        let width = self.columns();
        let rendered = self.renderer.render_mode(reply, mode, Some(width));
        tracing::debug!(
            mode = mode.as_str(),
            rows = rendered.rows,
            code_blocks = rendered.code_blocks,
            "reply rendered"
        );
        let label = if labelled {
            format!("{}\n", self.model_label())
        } else {
            String::new()
        };
        self.print(&format!("\n{label}{}\n\n{}\n", rendered.text, self.rule()))
    }

    /// Remember a finished exchange in memory and, when a store is open, on
    /// disk. A new chat is created on its first exchange.
    pub(super) fn record_exchange(
        &mut self,
        user: &str,
        reply: &str,
        title: Option<&str>,
    ) -> Result<()> {
        self.session.messages.push(ChatMessage::user(user));
        self.session.messages.push(ChatMessage::assistant(reply));
        self.blocks.parse(reply);
        self.last_reply = Some(reply.to_string());

        let Some(store) = self.store.as_ref() else {
            return Ok(());
        };
        let chat_id = match self.session.id {
            Some(id) => id,
            None => {
                let id = store
                    .create_chat(self.client.model(), title, &self.session.system_prompt)
                    .context("save new chat")?;
                self.session.id = Some(id);
                id
            }
        };
        store
            .append_exchange(chat_id, user, reply)
            .context("save exchange")
    }
}
