use serde::de::DeserializeOwned;

/// Parses JSON, returning `None` instead of an error for missing or malformed input.
pub fn safe_parse_json<T: DeserializeOwned>(json: Option<&str>) -> Option<T> {
    serde_json::from_str(json?).ok()
}

/// `Some` only for strings that are present and non-empty.
pub fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

/// Splits a persisted multi-value (`"a,b,c"`) into its parts.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: u32,
    }

    #[test]
    fn parses_valid_json() {
        let user: Option<User> = safe_parse_json(Some(r#"{"name": "Alice", "age": 30}"#));
        assert_eq!(
            user,
            Some(User {
                name: "Alice".to_string(),
                age: 30
            })
        );
    }

    #[test]
    fn malformed_or_missing_json_is_none() {
        assert_eq!(safe_parse_json::<User>(Some(r#"{"name": "Alice", "age": }"#)), None);
        assert_eq!(safe_parse_json::<User>(None), None);
        assert_eq!(safe_parse_json::<User>(Some("")), None);
    }

    #[test]
    fn splitting_keeps_empty_segments() {
        assert_eq!(split_list("a,b"), vec!["a", "b"]);
        assert_eq!(split_list("a,,b"), vec!["a", "", "b"]);
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(Some("x")), Some("x"));
    }
}
