use serde_json::Value;

/// Parses a model response as a single JSON object, tolerating a surrounding
/// markdown code fence. The error string is fed back to the model in the
/// repair prompt, so it keeps the parser's own message.
pub fn extract_json_object(text: &str) -> Result<Value, String> {
    let stripped = strip_code_fence(text.trim());

    let value: Value =
        serde_json::from_str(stripped).map_err(|e| format!("response is not valid JSON: {}", e))?;

    if !value.is_object() {
        return Err("response must be a single JSON object".to_string());
    }
    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json", "JSON", ...) up to the first newline.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_object() {
        let v = extract_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn parses_fenced_object() {
        let v = extract_json_object("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(v["a"], 1);
        let v = extract_json_object("```\n{\"b\": 2}\n```\n").unwrap();
        assert_eq!(v["b"], 2);
    }

    #[test]
    fn rejects_non_object_and_garbage() {
        assert!(extract_json_object("[1, 2, 3]").is_err());
        assert!(extract_json_object("I could not produce the item.").is_err());
    }
}
