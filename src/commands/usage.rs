use crate::errors::{EngineError, Result};
use crate::parser::{ParseError, Parser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Positional {
    pub name: String,
    pub required: bool,
    pub variadic: bool,
}

/// A parsed usage string such as `copy <src> [dst..]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub name: String,
    pub args: Vec<Positional>,
    raw: String,
}

impl Usage {
    pub fn required(&self) -> usize {
        self.args.iter().filter(|a| a.required).count()
    }

    /// The usage string as registered, whitespace-normalized.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

pub fn parse_usage(usage: &str) -> Result<Usage> {
    let invalid = |e: ParseError| EngineError::invalid_usage(usage, e.message());
    let mut p = Parser::new(usage);
    p.skip_ws();
    let name = p.parse_word().map_err(invalid)?.to_string();
    let mut args: Vec<Positional> = Vec::new();

    loop {
        p.skip_ws();
        if p.eof() {
            break;
        }
        let (close, required) = if p.consume_char('<') {
            ('>', true)
        } else if p.consume_char('[') {
            (']', false)
        } else {
            return Err(invalid("expected `<` or `[`".to_string().into()));
        };
        let inner = p.capture_until(close).map_err(invalid)?.trim();
        p.expect(close).map_err(invalid)?;

        let (arg_name, variadic) = match inner.strip_suffix("..") {
            Some(n) => (n.trim_end(), true),
            None => (inner, false),
        };
        let mut name_parser = Parser::new(arg_name);
        let parsed = name_parser.parse_word().map_err(invalid)?;
        if !name_parser.eof() {
            return Err(invalid(format!("bad argument name `{arg_name}`").into()));
        }

        if let Some(last) = args.last() {
            if last.variadic {
                return Err(invalid("variadic argument must be last".to_string().into()));
            }
            if required && !last.required {
                return Err(invalid(
                    format!("required argument `{parsed}` follows an optional one").into(),
                ));
            }
        }
        args.push(Positional {
            name: parsed.to_string(),
            required,
            variadic,
        });
    }

    let raw = usage.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(Usage { name, args, raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn arg(name: &str, required: bool, variadic: bool) -> Positional {
        Positional {
            name: name.into(),
            required,
            variadic,
        }
    }

    #[test]
    fn parses_required_optional_and_variadic() {
        let usage = parse_usage("copy  <src> [dst] [rest..]").unwrap();
        assert_eq!(usage.name, "copy");
        assert_eq!(
            usage.args,
            vec![
                arg("src", true, false),
                arg("dst", false, false),
                arg("rest", false, true)
            ]
        );
        assert_eq!(usage.required(), 1);
        assert_eq!(usage.as_str(), "copy <src> [dst] [rest..]");
    }

    #[test]
    fn bare_command() {
        let usage = parse_usage("serve").unwrap();
        assert!(usage.args.is_empty());
    }

    #[test]
    fn rejects_malformed_usage() {
        for bad in [
            "",
            "hello <name",
            "hello name",
            "hello <files..> <more>",
            "hello [opt] <req>",
            "hello <a b>",
        ] {
            let err = parse_usage(bad).unwrap_err();
            assert_eq!(err.kind(), "invalid_usage", "usage {bad:?}");
        }
    }
}
