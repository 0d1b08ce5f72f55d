//! Parser for the `key=value key2='quoted value' flag` configuration tags attached to model members.

use crate::error::ConfigError;
use std::collections::HashMap;

/// Parse a tag into a key/value map. Bare flags map to an empty string.
///
/// Tokens are separated by one or more spaces. A value that starts with `'` runs
/// to the next unescaped `'`; a doubled quote (`''`) inside it is a literal quote.
/// A token with an empty key (`=flag`) is stored as the flag `flag`.
/// An unterminated quote is an error.
pub fn parse_tag(tag: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut out = HashMap::new();
    let mut chars = tag.chars().peekable();

    loop {
        while chars.next_if_eq(&' ').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        let mut value = String::new();
        while let Some(c) = chars.next_if(|c| *c != ' ' && *c != '=') {
            key.push(c);
        }

        if chars.next_if_eq(&'=').is_some() {
            if chars.next_if_eq(&'\'').is_some() {
                loop {
                    match chars.next() {
                        None => {
                            return Err(ConfigError::UnterminatedQuote { tag: tag.to_string() });
                        }
                        Some('\'') => {
                            if chars.next_if_eq(&'\'').is_some() {
                                value.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some(c) => value.push(c),
                    }
                }
            }
            while let Some(c) = chars.next_if(|c| *c != ' ') {
                value.push(c);
            }
        }

        if key.is_empty() {
            if !value.is_empty() {
                out.insert(value, String::new());
            }
        } else {
            out.insert(key, value);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn key_value_and_flag() {
        let res = parse_tag("key=value only_key").unwrap();
        assert_eq!(res, map(&[("key", "value"), ("only_key", "")]));
    }

    #[test]
    fn quoted_value_keeps_spaces() {
        let res = parse_tag("key=value another=pair and='another one'").unwrap();
        assert_eq!(
            res,
            map(&[("key", "value"), ("another", "pair"), ("and", "another one")])
        );
    }

    #[rstest]
    #[case("", &[])]
    #[case("   ", &[])]
    #[case("-", &[("-", "")])]
    #[case("list  search", &[("list", ""), ("search", "")])]
    #[case("=flag", &[("flag", "")])]
    #[case("label='It''s here'", &[("label", "It's here")])]
    #[case("default=''", &[("default", "")])]
    #[case("key=a=b", &[("key", "a=b")])]
    #[case("list=Title width=3 ", &[("list", "Title"), ("width", "3")])]
    fn edge_cases(#[case] tag: &str, #[case] expected: &[(&str, &str)]) {
        assert_eq!(parse_tag(tag).unwrap(), map(expected));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = parse_tag("label='Blog post width=3").unwrap_err();
        assert!(matches!(err, ConfigError::UnterminatedQuote { .. }));
    }

    #[test]
    fn rendered_mapping_parses_back() {
        let original = map(&[
            ("label", "Published at"),
            ("width", "6"),
            ("list", ""),
            ("format", "%Y-%m-%d %H:%M"),
        ]);
        let rendered = original
            .iter()
            .map(|(k, v)| format!("{}='{}'", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(parse_tag(&rendered).unwrap(), original);
    }
}
