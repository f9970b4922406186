//! Recursive-descent parser for the literal mapping syntax
//!
//! The document is a single mapping. Comments standing on their own line
//! inside the top-level mapping name the section for the keys after them.

use super::lexer::{Lexer, Token, TokenKind};
use super::value::{Entry, Mapping, Value};
use crate::errors::{ConfigError, Result};

/// Maximum nesting depth for containers
pub const MAX_DEPTH: usize = 64;

/// Parse a complete record
pub fn parse(input: &str) -> Result<Mapping> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(tokens);
    parser.document()
}

/// Turn a comment into a section heading, if it reads like one
///
/// `# ===== NPG params =====` yields `NPG params`; purely decorative
/// comments yield `None`.
pub fn section_heading(comment: &str) -> Option<String> {
    let trimmed = comment
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '(' && c != ')')
        .trim();
    if trimmed.chars().any(|c| c.is_alphabetic()) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn document(&mut self) -> Result<Mapping> {
        self.skip_comments();
        let mapping = match self.peek_kind() {
            Some(TokenKind::LBrace) => {
                self.advance();
                self.dict_body(true)?
            }
            Some(TokenKind::Ident(name)) if name == "dict" => {
                self.advance();
                self.dict_call(true)?
            }
            Some(_) => return Err(self.error_here("record must be a mapping")),
            None => return Err(self.error_at_end("empty input, expected a mapping")),
        };

        self.skip_comments();
        if self.pos < self.tokens.len() {
            return Err(self.error_here("unexpected content after the closing brace"));
        }
        Ok(mapping)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Skip comment tokens, returning the last own-line heading seen
    fn skip_comments(&mut self) -> Option<String> {
        let mut heading = None;
        while let Some(Token {
            kind: TokenKind::Comment { text, own_line },
            ..
        }) = self.peek()
        {
            if *own_line {
                if let Some(h) = section_heading(text) {
                    heading = Some(h);
                }
            }
            self.pos += 1;
        }
        heading
    }

    fn error_here(&self, message: impl Into<String>) -> ConfigError {
        match self.peek() {
            Some(token) => ConfigError::Parse {
                line: token.line,
                column: token.column,
                message: message.into(),
            },
            None => self.error_at_end(message),
        }
    }

    fn error_at_end(&self, message: impl Into<String>) -> ConfigError {
        let (line, column) = self
            .tokens
            .last()
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1));
        ConfigError::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: TokenKind, what: &str) -> Result<Token> {
        self.skip_comments();
        match self.peek_kind() {
            Some(kind) if *kind == expected => {}
            Some(_) => return Err(self.error_here(format!("expected {}", what))),
            None => {
                return Err(self.error_at_end(format!("expected {}, found end of input", what)))
            }
        }
        self.advance()
            .ok_or_else(|| self.error_at_end(format!("expected {}", what)))
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error_here(format!("nesting deeper than {} levels", MAX_DEPTH)));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn insert_unique(mapping: &mut Mapping, entry: Entry) -> Result<()> {
        if let Some(first) = mapping.entry(&entry.key) {
            return Err(ConfigError::DuplicateKey {
                key: entry.key,
                first_line: first.line,
                line: entry.line,
            });
        }
        mapping.push_entry(entry);
        Ok(())
    }

    /// Parse `key: value, ...}` after the opening brace
    fn dict_body(&mut self, top_level: bool) -> Result<Mapping> {
        self.enter()?;
        let mut mapping = Mapping::new();
        let mut section: Option<String> = None;

        loop {
            if let Some(heading) = self.skip_comments() {
                if top_level {
                    section = Some(heading);
                }
            }

            let key_token = match self.advance() {
                Some(Token {
                    kind: TokenKind::RBrace,
                    ..
                }) => break,
                Some(token) => token,
                None => return Err(self.error_at_end("unclosed '{'")),
            };
            let key = match key_token.kind {
                TokenKind::Str(key) => key,
                _ => {
                    return Err(ConfigError::Parse {
                        line: key_token.line,
                        column: key_token.column,
                        message: "mapping keys must be strings".to_string(),
                    })
                }
            };

            self.expect(TokenKind::Colon, "':' after key")?;
            let value = self.value()?;
            Self::insert_unique(
                &mut mapping,
                Entry {
                    key,
                    value,
                    section: section.clone(),
                    line: key_token.line,
                },
            )?;

            if let Some(heading) = self.skip_comments() {
                if top_level {
                    section = Some(heading);
                }
            }
            match self.advance() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => continue,
                Some(Token {
                    kind: TokenKind::RBrace,
                    ..
                }) => break,
                Some(token) => {
                    return Err(ConfigError::Parse {
                        line: token.line,
                        column: token.column,
                        message: "expected ',' or '}'".to_string(),
                    })
                }
                None => return Err(self.error_at_end("unclosed '{'")),
            }
        }

        self.leave();
        Ok(mapping)
    }

    /// Parse `(key=value, ...)` after the `dict` name
    fn dict_call(&mut self, top_level: bool) -> Result<Mapping> {
        self.expect(TokenKind::LParen, "'(' after dict")?;
        self.enter()?;
        let mut mapping = Mapping::new();
        let mut section: Option<String> = None;

        loop {
            if let Some(heading) = self.skip_comments() {
                if top_level {
                    section = Some(heading);
                }
            }
            let key_token = match self.advance() {
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => break,
                Some(token) => token,
                None => return Err(self.error_at_end("unclosed 'dict('")),
            };
            let key = match key_token.kind {
                TokenKind::Ident(name) => name,
                _ => {
                    return Err(ConfigError::Parse {
                        line: key_token.line,
                        column: key_token.column,
                        message: "expected keyword argument name".to_string(),
                    })
                }
            };

            self.expect(TokenKind::Equals, "'=' after keyword")?;
            let value = self.value()?;
            Self::insert_unique(
                &mut mapping,
                Entry {
                    key,
                    value,
                    section: section.clone(),
                    line: key_token.line,
                },
            )?;

            if let Some(heading) = self.skip_comments() {
                if top_level {
                    section = Some(heading);
                }
            }
            match self.advance() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => continue,
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => break,
                Some(token) => {
                    return Err(ConfigError::Parse {
                        line: token.line,
                        column: token.column,
                        message: "expected ',' or ')'".to_string(),
                    })
                }
                None => return Err(self.error_at_end("unclosed 'dict('")),
            }
        }

        self.leave();
        Ok(mapping)
    }

    /// Parse items up to `close`, returning them and whether a comma was seen
    fn sequence(&mut self, close: TokenKind, what: &str) -> Result<(Vec<Value>, bool)> {
        self.enter()?;
        let mut items = Vec::new();
        let mut saw_comma = false;

        loop {
            self.skip_comments();
            match self.peek_kind() {
                Some(kind) if *kind == close => {
                    self.advance();
                    break;
                }
                None => return Err(self.error_at_end(format!("unclosed {}", what))),
                _ => {}
            }

            items.push(self.value()?);

            self.skip_comments();
            match self.advance() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => saw_comma = true,
                Some(token) if token.kind == close => break,
                Some(token) => {
                    return Err(ConfigError::Parse {
                        line: token.line,
                        column: token.column,
                        message: format!("expected ',' or end of {}", what),
                    })
                }
                None => return Err(self.error_at_end(format!("unclosed {}", what))),
            }
        }

        self.leave();
        Ok((items, saw_comma))
    }

    fn value(&mut self) -> Result<Value> {
        self.skip_comments();
        let token = match self.advance() {
            Some(token) => token,
            None => return Err(self.error_at_end("expected a value, found end of input")),
        };

        match token.kind {
            TokenKind::Str(s) => Ok(Value::Str(s)),
            TokenKind::Int(i) => Ok(Value::Int(i)),
            TokenKind::Float(f) => Ok(Value::Float(f)),
            TokenKind::LBrace => Ok(Value::Dict(self.dict_body(false)?)),
            TokenKind::LBracket => {
                let (items, _) = self.sequence(TokenKind::RBracket, "list")?;
                Ok(Value::List(items))
            }
            TokenKind::LParen => {
                let (mut items, saw_comma) = self.sequence(TokenKind::RParen, "tuple")?;
                if items.len() == 1 && !saw_comma {
                    Ok(items.remove(0))
                } else {
                    Ok(Value::Tuple(items))
                }
            }
            TokenKind::Ident(name) => self.name(&name, token.line, token.column),
            _ => Err(ConfigError::Parse {
                line: token.line,
                column: token.column,
                message: "expected a value".to_string(),
            }),
        }
    }

    fn name(&mut self, name: &str, line: usize, column: usize) -> Result<Value> {
        match name {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::None),
            "dict" => Ok(Value::Dict(self.dict_call(false)?)),
            "float" => self.float_call(line, column),
            "int" => self.int_call(line, column),
            other => Err(ConfigError::Parse {
                line,
                column,
                message: format!("unsupported name '{}'", other),
            }),
        }
    }

    fn single_argument(&mut self, call: &str) -> Result<Value> {
        self.expect(TokenKind::LParen, &format!("'(' after {}", call))?;
        self.enter()?;
        let arg = self.value()?;
        self.leave();
        self.expect(TokenKind::RParen, &format!("')' closing {}(", call))?;
        Ok(arg)
    }

    fn float_call(&mut self, line: usize, column: usize) -> Result<Value> {
        let arg = self.single_argument("float")?;
        let parsed = match &arg {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
                "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                "nan" => Some(f64::NAN),
                other => other.parse::<f64>().ok(),
            },
            _ => None,
        };
        parsed.map(Value::Float).ok_or_else(|| ConfigError::Parse {
            line,
            column,
            message: format!("cannot convert {} to float", arg.type_name()),
        })
    }

    fn int_call(&mut self, line: usize, column: usize) -> Result<Value> {
        let arg = self.single_argument("int")?;
        match arg {
            Value::Int(i) => Ok(Value::Int(i)),
            Value::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                Ok(Value::Int(f.trunc() as i64))
            }
            Value::Bool(b) => Ok(Value::Int(b as i64)),
            other => Err(ConfigError::Parse {
                line,
                column,
                message: format!("cannot convert {} to int", other.type_name()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_follow_comments() {
        let text = "{\n# general inputs\n'env_name': 'x',\n'seed': 1,\n\n# dynamics learning\n'fit_lr': 1e-3, # learning rate\n}";
        let m = parse(text).unwrap();
        assert_eq!(m.entry("env_name").unwrap().section.as_deref(), Some("general inputs"));
        assert_eq!(m.entry("seed").unwrap().line, 4);
        assert_eq!(m.entry("fit_lr").unwrap().section.as_deref(), Some("dynamics learning"));
        assert_eq!(m.sections(), vec!["general inputs", "dynamics learning"]);
    }

    #[test]
    fn test_tuples_and_parentheses() {
        let m = parse("{'a': (32, 32), 'b': (64,), 'c': (7), 'd': ()}").unwrap();
        assert_eq!(m.get("a"), Some(&Value::Tuple(vec![Value::Int(32), Value::Int(32)])));
        assert_eq!(m.get("b"), Some(&Value::Tuple(vec![Value::Int(64)])));
        assert_eq!(m.get("c"), Some(&Value::Int(7)));
        assert_eq!(m.get("d"), Some(&Value::Tuple(vec![])));
    }

    #[test]
    fn test_nested_and_calls() {
        let m = parse(
            "{'filter_coefs': {'f1': 0.5, 'f2': 1.0,}, 'extra': dict(a=1, b=[True, None]), \
             'big': int(1e6), 'inf': float('-inf')}",
        )
        .unwrap();
        let coefs = m.get("filter_coefs").and_then(Value::as_mapping).unwrap();
        assert_eq!(coefs.get("f2"), Some(&Value::Float(1.0)));
        let extra = m.get("extra").and_then(Value::as_mapping).unwrap();
        assert_eq!(extra.get("b"), Some(&Value::List(vec![Value::Bool(true), Value::None])));
        assert_eq!(m.get("big"), Some(&Value::Int(1_000_000)));
        assert_eq!(m.get("inf"), Some(&Value::Float(f64::NEG_INFINITY)));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = parse("{\n'seed': 1,\n'num_iter': 5,\n'seed': 2,\n}").unwrap_err();
        match err {
            ConfigError::DuplicateKey { key, first_line, line } => {
                assert_eq!(key, "seed");
                assert_eq!(first_line, 2);
                assert_eq!(line, 4);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_nested_duplicates_rejected() {
        assert!(matches!(
            parse("{'c': {'f1': 1, 'f1': 2}}"),
            Err(ConfigError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_missing_comma_position() {
        let err = parse("{\n'a': 1\n'b': 2\n}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 3, column: 1, .. }));
    }

    #[test]
    fn test_non_string_key() {
        assert!(matches!(parse("{1: 2}"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_trailing_content_rejected() {
        assert!(parse("{'a': 1} {'b': 2}").is_err());
        assert!(parse("# header\n{'a': 1}\n# footer").is_ok());
    }

    #[test]
    fn test_unknown_name() {
        let err = parse("{'a': np.float32}").unwrap_err();
        assert!(err.to_string().contains("unsupported name 'np'"));
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{{'a': {}{}}}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(parse(&deep).is_err());
    }

    #[test]
    fn test_nested_calls_hit_depth_limit() {
        let n = 200_000;
        let deep = format!("{{'a': {}1{}}}", "float(".repeat(n), ")".repeat(n));
        assert!(matches!(parse(&deep), Err(ConfigError::Parse { .. })));

        let deep = format!("{{'a': {}1{}}}", "int(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(parse(&deep).is_err());
        let shallow = format!("{{'a': {}1{}}}", "float(".repeat(3), ")".repeat(3));
        assert_eq!(parse(&shallow).unwrap().get("a"), Some(&Value::Float(1.0)));
    }

    #[test]
    fn test_dict_call_record_keeps_sections() {
        let text = "dict(\n# general inputs\nenv_name='x',\n# NPG params\nstep_size=0.1,\n)";
        let m = parse(text).unwrap();
        assert_eq!(m.entry("env_name").unwrap().section.as_deref(), Some("general inputs"));
        assert_eq!(m.entry("step_size").unwrap().section.as_deref(), Some("NPG params"));

        let nested = parse("{'a': dict(\n# not a section\nb=1)}").unwrap();
        let inner = nested.get("a").and_then(Value::as_mapping).unwrap();
        assert_eq!(inner.entry("b").unwrap().section, None);
    }

    #[test]
    fn test_section_heading() {
        assert_eq!(section_heading(" ===== NPG params ===== ").as_deref(), Some("NPG params"));
        assert_eq!(section_heading("------"), None);
    }
}
