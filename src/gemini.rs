use crate::error::TranslateError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// Literary fiction trips the default filters constantly.
const RELAXED_SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub fn generate_content_endpoint(base_url: &str, model: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/models/{model}:generateContent")
}

pub fn generate_text(
    client: &reqwest::blocking::Client,
    endpoint: &str,
    api_key: &str,
    instructions: &str,
    input: &str,
    temperature: f32,
) -> Result<String, TranslateError> {
    let safety_settings = RELAXED_SAFETY_CATEGORIES
        .iter()
        .map(|category| serde_json::json!({ "category": category, "threshold": "BLOCK_NONE" }))
        .collect::<Vec<_>>();

    let body = serde_json::json!({
        "systemInstruction": { "parts": [{ "text": instructions }] },
        "contents": [{ "role": "user", "parts": [{ "text": input }] }],
        "safetySettings": safety_settings,
        "generationConfig": { "temperature": temperature },
    });

    let transport = |source| TranslateError::Transport {
        endpoint: endpoint.to_owned(),
        source,
    };
    let response = client
        .post(endpoint)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .map_err(transport)?;

    let status = response.status();
    let raw = response.text().map_err(transport)?;
    if !status.is_success() {
        let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
        return Err(TranslateError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(TranslateError::MalformedResponse)?;
    extract_output_text(&value)
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_output_text(value: &serde_json::Value) -> Result<String, TranslateError> {
    let candidate = value
        .get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|candidates| candidates.first());

    let Some(candidate) = candidate else {
        if let Some(reason) = value
            .pointer("/promptFeedback/blockReason")
            .and_then(|v| v.as_str())
        {
            return Err(TranslateError::Blocked {
                reason: reason.to_owned(),
            });
        }
        return Err(TranslateError::EmptyOutput);
    };

    let mut text = String::new();
    let parts = candidate
        .pointer("/content/parts")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();
    for part in parts {
        if part.get("thought").and_then(|v| v.as_bool()) == Some(true) {
            continue;
        }
        let Some(part_text) = part.get("text").and_then(|v| v.as_str()) else {
            continue;
        };
        text.push_str(part_text);
    }

    if text.trim().is_empty() {
        if let Some(reason) = candidate.get("finishReason").and_then(|v| v.as_str())
            && reason != "STOP"
        {
            return Err(TranslateError::Blocked {
                reason: reason.to_owned(),
            });
        }
        return Err(TranslateError::EmptyOutput);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_model() {
        assert_eq!(
            generate_content_endpoint("https://example.test/v1beta/", "gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn output_text_concatenates_non_thought_parts() {
        let value = serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "thinking...", "thought": true },
                    { "text": "Chapter 1\n" },
                    { "text": "Hello." }
                ]},
                "finishReason": "STOP"
            }]
        });
        assert_eq!(extract_output_text(&value).unwrap(), "Chapter 1\nHello.");
    }

    #[test]
    fn prompt_block_is_reported() {
        let value = serde_json::json!({ "promptFeedback": { "blockReason": "PROHIBITED_CONTENT" } });
        assert!(matches!(
            extract_output_text(&value),
            Err(TranslateError::Blocked { reason }) if reason == "PROHIBITED_CONTENT"
        ));
    }

    #[test]
    fn empty_candidate_is_an_error() {
        let value = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "  \n" }] }, "finishReason": "STOP" }]
        });
        assert!(matches!(
            extract_output_text(&value),
            Err(TranslateError::EmptyOutput)
        ));

        let value = serde_json::json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert!(matches!(
            extract_output_text(&value),
            Err(TranslateError::Blocked { reason }) if reason == "SAFETY"
        ));

        assert!(matches!(
            extract_output_text(&serde_json::json!({})),
            Err(TranslateError::EmptyOutput)
        ));
    }

    #[test]
    fn error_message_is_read_from_error_body() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(parse_error_message(raw).as_deref(), Some("API key not valid"));
        assert_eq!(parse_error_message("not json"), None);
    }
}
