use crate::errors::{EngineError, Result};
use crate::parser::coerce;
use serde_json::{Map, Value};

/// Split a command line the way a POSIX shell would: quotes group, a
/// backslash escapes the next character outside single quotes.
pub fn split(line: &str) -> Result<Vec<String>> {
    shell_words::split(line).map_err(|e| EngineError::Syntax(e.to_string()))
}

/// Tokens sorted into positionals and options.
#[derive(Debug, Default, PartialEq)]
pub struct Classified {
    pub positional: Vec<Value>,
    pub options: Map<String, Value>,
}

impl Classified {
    fn set(&mut self, key: &str, value: Value) {
        if let Some(alias) = camel_case(key) {
            self.options.insert(alias, value.clone());
        }
        self.options.insert(key.to_string(), value);
    }
}

fn is_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && !coerce(token).is_number()
}

/// `booleans` are long flags that never take a value (`help`, `version`).
pub fn classify(tokens: &[String], booleans: &[&str]) -> Classified {
    let mut out = Classified::default();
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        if token == "--" {
            out.positional.extend(iter.by_ref().map(|t| coerce(t)));
            break;
        }
        if !is_flag(token) {
            out.positional.push(coerce(token));
            continue;
        }

        let (key, inline) = match token.strip_prefix("--") {
            Some(long) => match long.split_once('=') {
                Some((k, v)) => (k.to_string(), Some(coerce(v))),
                None => (long.to_string(), None),
            },
            None => {
                // -abc: all but the last are switches
                let shorts: Vec<char> = token[1..].chars().collect();
                let (last, init) = match shorts.split_last() {
                    Some(split) => split,
                    None => continue,
                };
                for c in init {
                    out.set(&c.to_string(), Value::Bool(true));
                }
                (last.to_string(), None)
            }
        };

        if let Some(value) = inline {
            out.set(&key, value);
            continue;
        }
        if let Some(negated) = key.strip_prefix("no-") {
            out.set(negated, Value::Bool(false));
            continue;
        }
        let takes_value = !booleans.contains(&key.as_str())
            && iter
                .peek()
                .map(|next| next.as_str() != "--" && !is_flag(next))
                .unwrap_or(false);
        if takes_value {
            if let Some(next) = iter.next() {
                out.set(&key, coerce(next));
            }
        } else {
            out.set(&key, Value::Bool(true));
        }
    }
    out
}

/// `dry-run` -> `dryRun`; `None` when the key has no dashes to fold.
pub fn camel_case(key: &str) -> Option<String> {
    if !key.contains('-') || key.starts_with('-') {
        return None;
    }
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn tokens(line: &str) -> Vec<String> {
        split(line).unwrap()
    }

    #[test]
    fn split_respects_quotes() {
        assert_eq!(
            tokens(r#"hello "big world" --name='a b'  x"#),
            vec!["hello", "big world", "--name=a b", "x"]
        );
        assert_eq!(tokens("   "), Vec::<String>::new());
        assert_eq!(tokens(r#"say """#), vec!["say", ""]);
    }

    #[test]
    fn split_reports_unterminated_quote() {
        let err = split("hello 'world").unwrap_err();
        assert_eq!(err.kind(), "syntax");
        assert!(split(r#"hello "world"#).is_err());
    }

    #[test]
    fn backslashes_escape_outside_quotes() {
        assert_eq!(tokens(r"hello big\ world"), vec!["hello", "big world"]);
        assert_eq!(tokens(r"hello 'a\'"), vec!["hello", r"a\"]);
        assert_eq!(tokens(r#"say "a \"b\" c""#), vec!["say", r#"a "b" c"#]);
    }

    #[test]
    fn oversized_negative_integers_stay_positional() {
        let c = classify(&tokens("add -99999999999999999999"), &[]);
        assert_eq!(c.positional.len(), 2);
        assert!(c.positional[1].is_number());
        assert!(c.options.is_empty());
    }

    #[test]
    fn classify_long_short_and_negated() {
        let c = classify(
            &tokens("hello world 123 --count 3 --dry-run -vx out --no-color --level=high"),
            &["help"],
        );
        assert_eq!(c.positional, vec![json!("hello"), json!("world"), json!(123)]);
        assert_eq!(
            Value::Object(c.options),
            json!({
                "count": 3,
                "dry-run": true,
                "dryRun": true,
                "v": true,
                "x": "out",
                "color": false,
                "level": "high"
            })
        );
    }

    #[test]
    fn boolean_flags_never_swallow_positionals() {
        let c = classify(&tokens("--help hello"), &["help"]);
        assert_eq!(c.positional, vec![json!("hello")]);
        assert_eq!(c.options.get("help"), Some(&json!(true)));
    }

    #[test]
    fn double_dash_ends_options() {
        let c = classify(&tokens("run -- --not-a-flag -5"), &[]);
        assert_eq!(
            c.positional,
            vec![json!("run"), json!("--not-a-flag"), json!(-5)]
        );
        assert!(c.options.is_empty());
    }

    #[test]
    fn negative_numbers_are_positional() {
        let c = classify(&tokens("move -5 --by -2"), &[]);
        assert_eq!(c.positional, vec![json!("move"), json!(-5)]);
        assert_eq!(c.options.get("by"), Some(&json!(-2)));
    }

    proptest! {
        #[test]
        fn plain_words_split_back_out(words in prop::collection::vec("[a-z][a-z0-9_]{0,7}", 0..8)) {
            let line = words.join("   ");
            prop_assert_eq!(split(&line).unwrap(), words);
        }

        #[test]
        fn integer_positionals_become_numbers(n in any::<i64>()) {
            let c = classify(&[n.to_string()], &[]);
            prop_assert_eq!(c.positional, vec![json!(n)]);
        }
    }
}
