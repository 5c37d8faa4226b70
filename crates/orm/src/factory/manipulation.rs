//! Regex manipulation of generated values

use regex::Regex;

use crate::backends::DatabaseValue;
use crate::error::{OrmError, OrmResult};
use super::definitions::Manipulation;

/// Compile a manipulation pattern; an empty pattern is invalid
pub fn compile_pattern(pattern: &str) -> OrmResult<Regex> {
    if pattern.is_empty() {
        return Err(OrmError::InvalidRegex {
            pattern: String::new(),
            message: "no pattern provided".to_string(),
        });
    }
    Regex::new(pattern).map_err(|e| OrmError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Rewrite bare `$N` group references as `${N}`, so `$1abc` means group 1
/// followed by `abc` rather than a group named `1abc`
fn normalize_replacement(replace_with: &str) -> String {
    let mut out = String::with_capacity(replace_with.len());
    let mut chars = replace_with.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push_str("$$");
            }
            Some(d) if d.is_ascii_digit() => {
                out.push_str("${");
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    out.push(d);
                    chars.next();
                }
                out.push('}');
            }
            _ => out.push('$'),
        }
    }
    out
}

/// Replace every match in a textual value.
///
/// Non-text values pass through untouched. An invalid pattern is logged and
/// the value is kept as is.
pub fn apply_manipulation(value: DatabaseValue, manipulation: &Manipulation) -> DatabaseValue {
    let (text, untyped) = match value {
        DatabaseValue::String(text) => (text, false),
        DatabaseValue::Untyped(text) => (text, true),
        other => return other,
    };

    let text = match compile_pattern(&manipulation.regex) {
        Ok(regex) => regex
            .replace_all(&text, normalize_replacement(&manipulation.replace_with).as_str())
            .into_owned(),
        Err(e) => {
            tracing::error!(target: "tabula::factory", "{}", e);
            text
        }
    };

    if untyped {
        DatabaseValue::Untyped(text)
    } else {
        DatabaseValue::String(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(regex: &str, replace_with: &str) -> Manipulation {
        Manipulation {
            regex: regex.to_string(),
            replace_with: replace_with.to_string(),
        }
    }

    #[test]
    fn test_replaces_every_match() {
        let value = apply_manipulation(DatabaseValue::from("a-b-c"), &rule("-", "_"));
        assert_eq!(value, DatabaseValue::from("a_b_c"));
    }

    #[test]
    fn test_capture_groups() {
        let value = apply_manipulation(
            DatabaseValue::from("jane.doe@example.com"),
            &rule(r"^([^@]+)@.*$", "$1@tabula.test"),
        );
        assert_eq!(value, DatabaseValue::from("jane.doe@tabula.test"));
    }

    #[test]
    fn test_group_followed_by_word_characters() {
        let value = apply_manipulation(DatabaseValue::from("abc-123"), &rule(r"^(\w+)-(\d+)$", "$2x$1"));
        assert_eq!(value, DatabaseValue::from("123xabc"));

        assert_eq!(normalize_replacement("$1abc"), "${1}abc");
        assert_eq!(normalize_replacement("${name} costs $$5"), "${name} costs $$5");
        assert_eq!(normalize_replacement("$name"), "$name");
    }

    #[test]
    fn test_untyped_text_stays_untyped() {
        let value = apply_manipulation(DatabaseValue::Untyped("Hello World".into()), &rule(r"\s+", "-"));
        assert_eq!(value, DatabaseValue::Untyped("Hello-World".into()));
    }

    #[test]
    fn test_invalid_pattern_keeps_value() {
        let value = apply_manipulation(DatabaseValue::from("keep me"), &rule("(unclosed", "x"));
        assert_eq!(value, DatabaseValue::from("keep me"));
        assert!(matches!(compile_pattern("(unclosed"), Err(OrmError::InvalidRegex { .. })));
        assert!(compile_pattern("").is_err());
    }

    #[test]
    fn test_non_text_is_untouched() {
        let value = apply_manipulation(DatabaseValue::Int32(1234), &rule("\\d", "0"));
        assert_eq!(value, DatabaseValue::Int32(1234));
    }
}
