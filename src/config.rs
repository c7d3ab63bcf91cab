use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::app::selector::DEFAULT_PAGE_SIZE;
use crate::render::theme::default_theme;
use crate::render::{RenderMode, ThemePreset};

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_EDITOR: &str = "nano";

pub(crate) const DEFAULT_CONFIG: &str = r#"# gpt-repl settings

# Sent as the system message at the start of every new chat.
system_prompt = "You are a helpful assistant."

# gpt-* / o1* / o3* models go to OpenAI, claude-* models to Anthropic.
model = "gpt-4o"

# "lite" renders markdown, "raw" prints replies untouched.
renderer = "lite"

# Skip the chat picker and always start a new chat.
always_new_chat = false

# Ask the model for a short title when a chat is first saved.
ai_chat_titles = false

# fjord, graphite, solarized, aurora or ember.
theme = "fjord"

# Colour of the model label and rules. Defaults to the model's own colour.
# accent = "cyan"

# Any syntect default theme, e.g. "base16-ocean.dark" or "InspiredGitHub".
# syntax_theme = "base16-eighties.dark"

# Saved chats shown per page in the picker.
page_size = 5

max_tokens = 4096
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) system_prompt: String,
    pub(crate) model: String,
    pub(crate) renderer: RenderMode,
    pub(crate) always_new_chat: bool,
    pub(crate) ai_chat_titles: bool,
    pub(crate) theme: ThemePreset,
    pub(crate) accent: Option<String>,
    pub(crate) syntax_theme: Option<String>,
    pub(crate) page_size: usize,
    pub(crate) max_tokens: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_string(),
            model: "gpt-4o".to_string(),
            renderer: RenderMode::Lite,
            always_new_chat: false,
            ai_chat_titles: false,
            theme: default_theme(),
            accent: None,
            syntax_theme: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_tokens: 4096,
        }
    }
}

impl Settings {
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(text).context("parse config")?;
        settings.page_size = settings.page_size.max(1);
        Ok(settings)
    }

    /// Read `path`, writing the commented defaults first when it is missing.
    pub(crate) fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create config dir {}", parent.display()))?;
            }
            fs::write(path, DEFAULT_CONFIG)
                .with_context(|| format!("write default config {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote default config");
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }
}

/// Directory holding the config, chat database and log. `GPT_REPL_HOME`
/// overrides the default `~/.gpt-repl`.
pub(crate) fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("GPT_REPL_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".gpt-repl"),
        None => PathBuf::from(".gpt-repl"),
    }
}

pub(crate) fn config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

/// Open the config file in `$EDITOR`, creating it first if needed.
pub(crate) fn open_in_editor(path: &Path) -> Result<()> {
    Settings::load_or_init(path)?;
    let editor = std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("EDITOR is empty");
    };
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .with_context(|| format!("launch editor {program}"))?;
    if !status.success() {
        bail!("editor {program} exited with {status}");
    }
    Ok(())
}
