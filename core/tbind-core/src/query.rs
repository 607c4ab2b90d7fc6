//! Filter expression grammar.
//!
//! A query is a whitespace-separated list of `column:value` terms; a row
//! matches when every term matches. Whitespace, quotes, parentheses, `:` and
//! `\` inside a value are escaped with a backslash.

use crate::error::{TbError, TbResult};
use serde_json::Value;

const SPECIAL: &[char] = &['\\', '"', '\'', '(', ')', ':'];

/// Escape a value for use on the right-hand side of a term.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_whitespace() || SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render a single `column:value` term.
pub fn term(column: &str, value: &str) -> String {
    format!("{column}:{}", escape(value))
}

/// Render a JSON value the way it appears in a term.
///
/// Strings are used verbatim; numbers and booleans use their JSON text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Join terms into a query expression.
pub fn conjunction<I, S>(terms: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = terms
        .into_iter()
        .map(|t| t.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() { None } else { Some(joined) }
}

/// Parse a query expression into unescaped `(column, value)` pairs.
pub fn parse(query: &str) -> TbResult<Vec<(String, String)>> {
    let mut terms = Vec::new();
    let mut chars = query.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut column = String::new();
        let mut found_colon = false;
        while let Some(&c) = chars.peek() {
            if c == ':' {
                chars.next();
                found_colon = true;
                break;
            }
            if c.is_whitespace() {
                break;
            }
            column.push(c);
            chars.next();
        }
        if !found_colon || column.is_empty() {
            return Err(TbError::Query(format!(
                "expected 'column:value' term near '{column}' in '{query}'"
            )));
        }

        let mut value = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => value.push(escaped),
                    None => {
                        return Err(TbError::Query(format!("dangling escape in '{query}'")));
                    }
                },
                c if c.is_whitespace() => break,
                c => value.push(c),
            }
        }
        terms.push((column, value));
    }

    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escape_special_characters() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a b"), r"a\ b");
        assert_eq!(escape(r#"x:"y""#), r#"x\:\"y\""#);
    }

    #[test]
    fn parse_round_trips_escaped_terms() {
        let q = conjunction([term("_key", "new york"), term("rank", "3")]).unwrap();
        assert_eq!(q, r"_key:new\ york rank:3");
        let parsed = parse(&q).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("_key".to_string(), "new york".to_string()),
                ("rank".to_string(), "3".to_string())
            ]
        );
    }

    #[test]
    fn parse_empty_value() {
        assert_eq!(
            parse("title:").unwrap(),
            vec![("title".to_string(), String::new())]
        );
    }

    #[test]
    fn parse_rejects_bare_words() {
        assert!(matches!(parse("hello"), Err(TbError::Query(_))));
        assert!(matches!(parse(":x"), Err(TbError::Query(_))));
        assert!(matches!(parse(r"a:b\"), Err(TbError::Query(_))));
    }

    #[test]
    fn empty_conjunction_is_none() {
        assert_eq!(conjunction(Vec::<String>::new()), None);
    }

    #[test]
    fn value_text_renders_json() {
        assert_eq!(value_text(&json!("abc")), "abc");
        assert_eq!(value_text(&json!(42)), "42");
        assert_eq!(value_text(&json!(true)), "true");
    }
}
