//! Message template rendering.
//!
//! Token syntax is `{identifier}`. Each token is substituted with the
//! matching key from the event payload (flat string replace, no nesting,
//! no Markdown escaping). Tokens that survive substitution are replaced
//! with a visible placeholder so missing-data bugs show up in the
//! delivered message instead of a dangling `{key}`.

use serde_json::Value;

/// Render a template against a flat JSON object payload.
pub fn render(template: &str, data: &Value) -> String {
    let mut message = template.to_string();

    if let Value::Object(map) = data {
        for (key, value) in map {
            let token = format!("{{{}}}", key);
            if message.contains(&token) {
                message = message.replace(&token, &value_text(value));
            }
        }
    }

    mark_unmatched_tokens(&message)
}

/// Display form of a payload value. Strings render bare (no quotes);
/// everything else uses its JSON form.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace any remaining `{identifier}` token with `(missing: identifier)`.
/// Braces that do not wrap an identifier pass through untouched.
fn mark_unmatched_tokens(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];

        match tail.find('}') {
            Some(close)
                if close > 0
                    && tail[..close]
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                out.push_str("(missing: ");
                out.push_str(&tail[..close]);
                out.push(')');
                rest = &tail[close + 1..];
            }
            _ => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substitutes_all_tokens() {
        let message = render(
            "Hi {name}, car {make} {model}",
            &json!({"name": "Bob", "make": "BMW", "model": "M3"}),
        );
        assert_eq!(message, "Hi Bob, car BMW M3");
    }

    #[test]
    fn test_missing_key_becomes_visible_placeholder() {
        let message = render("Hi {name}, car {make}", &json!({"name": "Bob"}));
        assert_eq!(message, "Hi Bob, car (missing: make)");
    }

    #[test]
    fn test_repeated_token_replaced_everywhere() {
        let message = render("{username} / {username}", &json!({"username": "Ada"}));
        assert_eq!(message, "Ada / Ada");
    }

    #[test]
    fn test_numeric_values_render_bare() {
        let message = render("Price: ${price}", &json!({"price": 45000}));
        assert_eq!(message, "Price: $45000");
    }

    #[test]
    fn test_non_token_braces_pass_through() {
        let message = render("json looks like {\"a\": 1}", &json!({}));
        assert_eq!(message, "json looks like {\"a\": 1}");
    }

    #[test]
    fn test_non_object_payload_marks_everything_missing() {
        let message = render("{a}", &json!(["not", "an", "object"]));
        assert_eq!(message, "(missing: a)");
    }
}
