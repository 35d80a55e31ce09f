use std::time::Duration;

use serde_json::Value;
use serde_json::json;

/// Per-request budget for a single endpoint probe. A timeout is fatal for
/// that endpoint only; the surrounding probe continues.
pub const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(10);

/// Body excerpt kept when a 200 response is not valid JSON.
const SUCCESS_BODY_EXCERPT_CHARS: usize = 500;

/// Body excerpt kept for non-200 responses.
const ERROR_BODY_EXCERPT_CHARS: usize = 200;

/// Truncate to at most `limit` characters, respecting char boundaries.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Probe one endpoint with a bounded GET.
///
/// Never fails: transport problems fold into the returned record as
/// `{status: "error", error}` without a status code. A 200 response is
/// JSON-decoded with a truncated-text fallback; non-200 responses keep the
/// status code and an error excerpt.
pub async fn probe(client: &reqwest::Client, base_url: &str, path: &str) -> Value {
    let url = format!("{}{path}", base_url.trim_end_matches('/'));
    let response = match client.get(&url).timeout(ENDPOINT_TIMEOUT).send().await {
        Ok(response) => response,
        Err(err) => return json!({"status": "error", "error": err.to_string()}),
    };

    let status_code = response.status().as_u16();
    let headers: serde_json::Map<String, Value> = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect();
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => return json!({"status": "error", "error": err.to_string()}),
    };

    if status_code == 200 {
        let data = match serde_json::from_str::<Value>(&body) {
            Ok(value) => value,
            Err(_) => Value::String(truncate_chars(&body, SUCCESS_BODY_EXCERPT_CHARS).to_string()),
        };
        json!({
            "status": "success",
            "status_code": status_code,
            "data": data,
            "headers": headers,
        })
    } else {
        json!({
            "status": "error",
            "status_code": status_code,
            "error": truncate_chars(&body, ERROR_BODY_EXCERPT_CHARS),
        })
    }
}
