use serde_json::{json, Value};

use super::{error_message, ChatMessage};

const API_VERSION: &str = "2023-06-01";

pub(crate) fn request_body(
    model: &str,
    max_tokens: u32,
    system_prompt: &str,
    messages: &[ChatMessage],
) -> Value {
    let wire: Vec<Value> = messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();
    let mut body = json!({ "model": model, "max_tokens": max_tokens, "messages": wire });
    if !system_prompt.trim().is_empty() {
        body["system"] = Value::String(system_prompt.to_string());
    }
    body
}

/// Concatenate the text blocks of a messages response.
pub(crate) fn extract_reply(value: &Value) -> Option<String> {
    let parts: Vec<&str> = value
        .get("content")?
        .as_array()?
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.concat())
}

pub(crate) fn complete(
    http: &reqwest::blocking::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    max_tokens: u32,
    system_prompt: &str,
    messages: &[ChatMessage],
) -> std::result::Result<String, String> {
    let response = http
        .post(format!("{base_url}/v1/messages"))
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .json(&request_body(model, max_tokens, system_prompt, messages))
        .send()
        .map_err(|e| format!("request failed: {e}"))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| format!("read response failed: {e}"))?;
    if !status.is_success() {
        return Err(error_message(status, &body));
    }
    let value: Value =
        serde_json::from_str(&body).map_err(|e| format!("invalid response json: {e}"))?;
    extract_reply(&value).ok_or_else(|| "response had no text content".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn system_prompt_is_a_top_level_field() {
        let body = request_body("claude-3-haiku", 512, "Be brief.", &[ChatMessage::user("hi")]);
        assert_eq!(
            body,
            json!({
                "model": "claude-3-haiku",
                "max_tokens": 512,
                "system": "Be brief.",
                "messages": [{ "role": "user", "content": "hi" }]
            })
        );
    }

    #[test]
    fn reply_joins_text_blocks_only() {
        let value = json!({
            "content": [
                { "type": "text", "text": "one " },
                { "type": "tool_use", "name": "x" },
                { "type": "text", "text": "two" }
            ]
        });
        assert_eq!(extract_reply(&value), Some("one two".to_string()));
        assert_eq!(extract_reply(&json!({ "content": [] })), None);
    }
}
