use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};

use crate::app::selector::SelectableItem;
use crate::config::data_dir;
use crate::providers::{ChatMessage, Role};

const DB_FILE: &str = "chats.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChatRecord {
    pub(crate) id: i64,
    pub(crate) title: Option<String>,
    pub(crate) model: String,
    pub(crate) system_prompt: String,
    pub(crate) created_at: i64,
}

impl ChatRecord {
    /// `YYMMDD_HHMMSS_<title or model>` in local time.
    pub(crate) fn label(&self) -> String {
        let stamp = DateTime::from_timestamp(self.created_at, 0)
            .map(|utc| utc.with_timezone(&Local).format("%y%m%d_%H%M%S").to_string())
            .unwrap_or_else(|| "000000_000000".to_string());
        let name = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.model);
        format!("{stamp}_{name}")
    }
}

/// Saved chats. Only the interactive loop talks to this; rendering and
/// selection work on the plain values it hands out.
pub(crate) struct TranscriptStore {
    conn: Connection,
}

impl TranscriptStore {
    pub(crate) fn open_default() -> Result<Self> {
        Self::open_at(&data_dir().join(DB_FILE))
    }

    pub(crate) fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create chat dir {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open chat db {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "foreign_keys", "ON").ok();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS chats (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              title TEXT,
              model TEXT NOT NULL,
              system_prompt TEXT NOT NULL,
              created_at INTEGER NOT NULL DEFAULT (unixepoch())
            );
            CREATE TABLE IF NOT EXISTS messages (
              chat_id INTEGER NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
              seq INTEGER NOT NULL,
              role TEXT NOT NULL,
              content TEXT NOT NULL,
              PRIMARY KEY (chat_id, seq)
            );
            ",
        )
        .context("init chat schema")?;
        Ok(Self { conn })
    }

    pub(crate) fn create_chat(
        &self,
        model: &str,
        title: Option<&str>,
        system_prompt: &str,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO chats(title, model, system_prompt) VALUES (?1, ?2, ?3)",
                params![title, model, system_prompt],
            )
            .context("insert chat")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Store one user/assistant pair atomically.
    pub(crate) fn append_exchange(&self, chat_id: i64, user: &str, assistant: &str) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin exchange tx")?;
        let next: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(seq), -1) + 1 FROM messages WHERE chat_id = ?1",
                params![chat_id],
                |row| row.get(0),
            )
            .context("next message seq")?;
        tx.execute(
            "INSERT INTO messages(chat_id, seq, role, content) VALUES (?1, ?2, ?3, ?4)",
            params![chat_id, next, Role::User.as_str(), user],
        )
        .context("insert user message")?;
        tx.execute(
            "INSERT INTO messages(chat_id, seq, role, content) VALUES (?1, ?2, ?3, ?4)",
            params![chat_id, next + 1, Role::Assistant.as_str(), assistant],
        )
        .context("insert assistant message")?;
        tx.commit().context("commit exchange tx")?;
        Ok(())
    }

    pub(crate) fn chat(&self, chat_id: i64) -> Result<Option<ChatRecord>> {
        self.conn
            .query_row(
                "SELECT id, title, model, system_prompt, created_at FROM chats WHERE id = ?1",
                params![chat_id],
                |row| {
                    Ok(ChatRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        model: row.get(2)?,
                        system_prompt: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .context("load chat")
    }

    pub(crate) fn system_prompt(&self, chat_id: i64) -> Result<String> {
        self.chat(chat_id)?
            .map(|chat| chat.system_prompt)
            .ok_or_else(|| anyhow!("chat {chat_id} not found"))
    }

    /// Newest first.
    pub(crate) fn chats(&self) -> Result<Vec<ChatRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, model, system_prompt, created_at
                 FROM chats
                 ORDER BY created_at DESC, id DESC",
            )
            .context("prepare chat list")?;
        let mut rows = stmt.query([]).context("query chat list")?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().context("scan chat row")? {
            out.push(ChatRecord {
                id: row.get(0).context("chat.id")?,
                title: row.get(1).context("chat.title")?,
                model: row.get(2).context("chat.model")?,
                system_prompt: row.get(3).context("chat.system_prompt")?,
                created_at: row.get(4).context("chat.created_at")?,
            });
        }
        Ok(out)
    }

    pub(crate) fn list_selectable_items(&self) -> Result<Vec<SelectableItem>> {
        Ok(self
            .chats()?
            .into_iter()
            .map(|chat| SelectableItem {
                id: chat.id,
                label: chat.label(),
            })
            .collect())
    }

    pub(crate) fn messages(&self, chat_id: i64) -> Result<Vec<ChatMessage>> {
        let mut stmt = self
            .conn
            .prepare("SELECT role, content FROM messages WHERE chat_id = ?1 ORDER BY seq")
            .context("prepare messages")?;
        let mut rows = stmt.query(params![chat_id]).context("query messages")?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().context("scan message row")? {
            let role: String = row.get(0).context("message.role")?;
            let content: String = row.get(1).context("message.content")?;
            let Some(role) = Role::parse(&role) else {
                tracing::warn!(chat_id, role, "skipping message with unknown role");
                continue;
            };
            out.push(ChatMessage { role, content });
        }
        Ok(out)
    }

    /// The chat as markdown: each prompt as `": {user}"`, each reply as is,
    /// separated by blank lines, with trailing whitespace trimmed. Replies stay
    /// at the start of their line so fenced blocks are recognised.
    pub(crate) fn load_transcript(&self, chat_id: i64) -> Result<String> {
        if self.chat(chat_id)?.is_none() {
            return Err(anyhow!("chat {chat_id} not found"));
        }
        let mut text = String::new();
        for message in self.messages(chat_id)? {
            match message.role {
                Role::User => text.push_str(&format!(": {}\n\n", message.content)),
                Role::Assistant => text.push_str(&format!("{}\n\n", message.content)),
            }
        }
        Ok(text.trim_end().to_string())
    }
}
