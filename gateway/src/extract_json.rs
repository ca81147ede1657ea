//! Tolerant JSON extraction for tool-call arguments. Some providers wrap the
//! arguments object in prose or markdown fences; scan for the first balanced
//! `{...}` span and parse that.

use serde_json::Value;

pub fn extract_json_object(raw: &str) -> Option<Value> {
    let bytes = raw.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    let candidate = &raw[start..end];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_bare_json_object() {
        let v = extract_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn parses_json_surrounded_by_prose() {
        let v = extract_json_object("sure, here you go:\n```json\n{\"a\": 1, \"b\": \"x\"}\n```\nhope that helps").unwrap();
        assert_eq!(v["a"], 1);
        assert_eq!(v["b"], "x");
    }

    #[test]
    fn handles_nested_braces_and_braces_in_strings() {
        let v = extract_json_object(r#"noise {"a": {"b": 2}, "c": "}not json{"} trailing"#).unwrap();
        assert_eq!(v["a"]["b"], 2);
        assert_eq!(v["c"], "}not json{");
    }

    #[test]
    fn returns_none_when_no_object_present() {
        assert!(extract_json_object("just some text").is_none());
    }

    #[test]
    fn returns_none_for_unbalanced_braces() {
        assert!(extract_json_object("{\"a\": 1").is_none());
    }
}
