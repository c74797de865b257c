use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Context;
use rustyline::Helper;
use std::borrow::Cow;

use crate::lexer::token::KEYWORDS;

pub struct EzHelper;

impl Helper for EzHelper {}

impl Completer for EzHelper {
    type Candidate = Pair;

    /// Complete the keyword under the cursor.
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .char_indices()
            .rev()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
            .map_or(0, |(i, c)| i + c.len_utf8());
        let prefix = &line[start..pos];
        if prefix.is_empty() {
            return Ok((pos, vec![]));
        }
        let candidates = KEYWORDS
            .iter()
            .filter(|kw| kw.starts_with(prefix))
            .map(|kw| Pair {
                display: kw.to_string(),
                replacement: kw.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for EzHelper {
    type Hint = String;
    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for EzHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let mut result = String::with_capacity(line.len() + 64);
        let chars: Vec<char> = line.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            let ch = chars[i];

            // Comments
            if ch == '/' && i + 1 < len && chars[i + 1] == '/' {
                result.push_str("\x1b[90m");
                result.extend(&chars[i..]);
                result.push_str("\x1b[0m");
                break;
            }

            // String literals, either quote style
            if ch == '"' || ch == '\'' {
                result.push_str("\x1b[32m");
                result.push(ch);
                i += 1;
                while i < len && chars[i] != ch {
                    if chars[i] == '\\' && i + 1 < len {
                        result.push(chars[i]);
                        i += 1;
                    }
                    result.push(chars[i]);
                    i += 1;
                }
                if i < len {
                    result.push(chars[i]);
                    i += 1;
                }
                result.push_str("\x1b[0m");
                continue;
            }

            if ch.is_ascii_digit() {
                result.push_str("\x1b[36m");
                while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    result.push(chars[i]);
                    i += 1;
                }
                result.push_str("\x1b[0m");
                continue;
            }

            if ch.is_ascii_alphabetic() || ch == '_' {
                let mut word = String::new();
                while i < len && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    word.push(chars[i]);
                    i += 1;
                }
                if KEYWORDS.contains(&word.as_str()) {
                    result.push_str("\x1b[1;34m");
                    result.push_str(&word);
                    result.push_str("\x1b[0m");
                } else {
                    result.push_str(&word);
                }
                continue;
            }

            if "=!<>&|+-*/%".contains(ch) {
                result.push_str("\x1b[33m");
                result.push(ch);
                result.push_str("\x1b[0m");
                i += 1;
                continue;
            }

            result.push(ch);
            i += 1;
        }

        Cow::Owned(result)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Validator for EzHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}
