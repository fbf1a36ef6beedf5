//! Command line tokenizer
//!
//! Rules:
//! - Unescaped spaces, carriage returns and newlines separate tokens; tabs
//!   and other whitespace are ordinary characters
//! - `"` toggles a quoted span in which separators do not separate
//! - `\"` is a literal quote and does not toggle the span
//! - `\ ` is a literal space and never separates, even at the end of a token
//! - Unescaped quotes are stripped; `""` is an empty token
//! - Any other backslash is kept as written
//!
//! An odd number of unescaped quotes is rejected before any token is built.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("command contains unterminated quoted string")]
    MalformedQuoting,
}

/// A tokenized command: folded name plus verbatim arguments
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    /// Command name, folded for registry lookup
    pub name: String,
    /// Positional arguments, original case preserved
    pub args: Vec<String>,
}

impl CommandLine {
    /// Tokenize a raw line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, TokenizeError> {
        let mut tokens = tokenize(line)?.into_iter();

        Ok(tokens.next().map(|name| Self {
            name: fold_name(&name),
            args: tokens.collect(),
        }))
    }
}

/// Fold a command name for case-insensitive lookup
pub fn fold_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Split a raw line into tokens
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    if count_unescaped_quotes(line) % 2 == 1 {
        return Err(TokenizeError::MalformedQuoting);
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    // Distinguishes an empty quoted token from no token at all
    let mut started = false;
    let mut quoted = false;

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some('"') | Some(' ')) => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                started = true;
            }
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if is_separator(c) && !quoted => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }

    if started {
        tokens.push(current);
    }

    Ok(tokens)
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\r' | '\n')
}

fn count_unescaped_quotes(line: &str) -> usize {
    let mut count = 0;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
            }
            '"' => count += 1,
            _ => {}
        }
    }

    count
}
