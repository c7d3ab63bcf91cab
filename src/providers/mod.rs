use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ReplError;
use crate::render::Accent;

pub(crate) mod anthropic;
pub(crate) mod openai;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const TITLE_WORD_LIMIT: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Vendor {
    OpenAi,
    Anthropic,
}

impl Vendor {
    /// Pick the vendor for `model` and the model id to send. `openai/` and
    /// `anthropic/` prefixes are accepted and stripped.
    pub(crate) fn from_model(model: &str) -> Result<(Self, String), ReplError> {
        let model = model.trim();
        let lower = model.to_lowercase();
        for (prefix, vendor) in [("openai/", Vendor::OpenAi), ("anthropic/", Vendor::Anthropic)] {
            if lower.starts_with(prefix) {
                if let Some(rest) = model.get(prefix.len()..) {
                    return Ok((vendor, rest.to_string()));
                }
            }
        }
        if ["gpt", "o1", "o3", "o4"].iter().any(|p| lower.starts_with(p)) {
            return Ok((Vendor::OpenAi, model.to_string()));
        }
        if lower.starts_with("claude") {
            return Ok((Vendor::Anthropic, model.to_string()));
        }
        Err(ReplError::UnknownModel(model.to_string()))
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "OpenAI",
            Vendor::Anthropic => "Anthropic",
        }
    }

    pub(crate) fn accent(&self, model: &str) -> Accent {
        match self {
            Vendor::OpenAi if model.starts_with("gpt-4") => Accent::Magenta,
            Vendor::OpenAi => Accent::Green,
            Vendor::Anthropic => Accent::Orange3,
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "OPENAI_API_KEY",
            Vendor::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn base_url_var(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "OPENAI_BASE_URL",
            Vendor::Anthropic => "ANTHROPIC_BASE_URL",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "https://api.openai.com/v1",
            Vendor::Anthropic => "https://api.anthropic.com",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    User,
    Assistant,
}

impl Role {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub(crate) role: Role,
    pub(crate) content: String,
}

impl ChatMessage {
    pub(crate) fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub(crate) fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Blocking chat-completion client. Cheap to clone onto a worker thread.
#[derive(Clone)]
pub(crate) struct ChatClient {
    vendor: Vendor,
    model: String,
    api_key: Option<String>,
    base_url: String,
    max_tokens: u32,
    http: reqwest::blocking::Client,
}

impl ChatClient {
    pub(crate) fn new(model: &str, max_tokens: u32) -> Result<Self> {
        let (vendor, model) = Vendor::from_model(model)?;
        let api_key = std::env::var(vendor.key_var())
            .ok()
            .filter(|key| !key.trim().is_empty());
        let base_url = std::env::var(vendor.base_url_var())
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| vendor.default_base_url().to_string());
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self {
            vendor,
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens,
            http,
        })
    }

    pub(crate) fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn accent(&self) -> Accent {
        self.vendor.accent(&self.model)
    }

    pub(crate) fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ReplError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(self.api_error(format!("{} is not set", self.vendor.key_var())));
        };
        let result = match self.vendor {
            Vendor::OpenAi => openai::complete(
                &self.http,
                &self.base_url,
                api_key,
                &self.model,
                system_prompt,
                messages,
            ),
            Vendor::Anthropic => anthropic::complete(
                &self.http,
                &self.base_url,
                api_key,
                &self.model,
                self.max_tokens,
                system_prompt,
                messages,
            ),
        };
        result.map_err(|message| {
            tracing::warn!(vendor = self.vendor.as_str(), %message, "completion failed");
            self.api_error(message)
        })
    }

    /// Ask for a short title summarising the first exchange of a chat.
    pub(crate) fn title_for(&self, user: &str, reply: &str) -> Result<String, ReplError> {
        let request = format!(
            "Write a title of at most {TITLE_WORD_LIMIT} words for a chat that starts with the \
             exchange below. Reply with the title only.\n\nUser: {user}\n\nAssistant: {reply}"
        );
        let raw = self.complete("You write short chat titles.", &[ChatMessage::user(request)])?;
        Ok(clean_title(&raw))
    }

    fn api_error(&self, message: String) -> ReplError {
        ReplError::Api {
            provider: self.vendor.as_str(),
            message,
        }
    }
}

/// Single line, quotes and trailing punctuation removed, capped at the word
/// limit.
pub(crate) fn clean_title(raw: &str) -> String {
    let line = raw.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    line.split_whitespace()
        .take(TITLE_WORD_LIMIT)
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '*' || c == '#')
        .trim()
        .to_string()
}

/// Pull an error message out of a JSON error body, falling back to the
/// status line.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn vendor_from_model_prefix() {
        assert_eq!(
            Vendor::from_model("gpt-4o").expect("openai"),
            (Vendor::OpenAi, "gpt-4o".to_string())
        );
        assert_eq!(
            Vendor::from_model("o3-mini").expect("openai").0,
            Vendor::OpenAi
        );
        assert_eq!(
            Vendor::from_model("Anthropic/claude-3-opus").expect("anthropic"),
            (Vendor::Anthropic, "claude-3-opus".to_string())
        );
        assert_eq!(
            Vendor::from_model("llama3"),
            Err(ReplError::UnknownModel("llama3".to_string()))
        );
    }

    #[test]
    fn accent_follows_vendor_and_model() {
        assert_eq!(Vendor::OpenAi.accent("gpt-4-turbo"), Accent::Magenta);
        assert_eq!(Vendor::OpenAi.accent("gpt-3.5-turbo"), Accent::Green);
        assert_eq!(Vendor::Anthropic.accent("claude-3-haiku"), Accent::Orange3);
    }

    #[test]
    fn titles_are_trimmed_to_six_words() {
        assert_eq!(
            clean_title("\n\"Rust lifetimes explained for busy people today.\"\nextra"),
            "Rust lifetimes explained for busy people"
        );
        assert_eq!(clean_title("  Quick sort.  "), "Quick sort");
    }

    #[test]
    fn error_message_prefers_json_body() {
        let body = r#"{"error":{"message":"bad key","type":"auth"}}"#;
        assert_eq!(
            error_message(reqwest::StatusCode::UNAUTHORIZED, body),
            "bad key"
        );
        assert_eq!(
            error_message(reqwest::StatusCode::BAD_GATEWAY, "<html>"),
            "HTTP 502 Bad Gateway"
        );
    }

    #[test]
    fn role_names_round_trip_through_storage_strings() {
        assert_eq!(Role::parse(Role::Assistant.as_str()), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
    }
}
