use serde_json::{json, Value};

use super::{error_message, ChatMessage};

/// The system prompt travels as the first message.
pub(crate) fn request_body(model: &str, system_prompt: &str, messages: &[ChatMessage]) -> Value {
    let mut wire = Vec::with_capacity(messages.len() + 1);
    if !system_prompt.trim().is_empty() {
        wire.push(json!({ "role": "system", "content": system_prompt }));
    }
    wire.extend(
        messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
    );
    json!({ "model": model, "messages": wire })
}

pub(crate) fn extract_reply(value: &Value) -> Option<String> {
    value
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

pub(crate) fn complete(
    http: &reqwest::blocking::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    system_prompt: &str,
    messages: &[ChatMessage],
) -> std::result::Result<String, String> {
    let response = http
        .post(format!("{base_url}/chat/completions"))
        .bearer_auth(api_key)
        .json(&request_body(model, system_prompt, messages))
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
    extract_reply(&value).ok_or_else(|| "response had no message content".to_string())
}
