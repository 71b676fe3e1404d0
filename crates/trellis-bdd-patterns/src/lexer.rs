//! Lexer turning pattern text into literal and placeholder tokens.
//!
//! Grammar notes: `\x` escapes the next character, `{{` and `}}` are literal
//! braces, `{name}` and `{name:hint}` are placeholders, and a `{` that does
//! not open a placeholder is kept as a stray brace token so the compiler can
//! check balance.

use crate::errors::{placeholder_error, PatternError};

/// Semantic unit of a step pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Literal text matched verbatim.
    Literal(String),
    /// A `{name}` or `{name:hint}` placeholder.
    Placeholder {
        /// Placeholder name as written.
        name: String,
        /// Optional type hint after the colon.
        hint: Option<String>,
    },
    /// A `{` that does not begin a placeholder.
    StrayOpen {
        /// Byte offset of the brace.
        at: usize,
    },
    /// A `}` outside any placeholder.
    StrayClose {
        /// Byte offset of the brace.
        at: usize,
    },
}

struct Cursor<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            text: pattern,
            bytes: pattern.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    /// Decode the character at the cursor. `pos` always sits on a char
    /// boundary: the lexer advances by whole characters and placeholder
    /// syntax is pure ASCII.
    fn next_char(&self) -> Option<char> {
        self.text.get(self.pos..)?.chars().next()
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek(0).is_some_and(&pred) {
            self.pos += 1;
        }
    }

    /// Read a placeholder starting at the current `{`.
    fn read_placeholder(&mut self) -> Result<Token, PatternError> {
        let open = self.pos;
        self.pos += 1;
        let name_start = self.pos;
        self.skip_while(|b| b.is_ascii_alphanumeric() || b == b'_');
        let name = String::from_utf8_lossy(&self.bytes[name_start..self.pos]).into_owned();

        // Whitespace between the name and `:` or `}` is malformed rather
        // than a stray brace, so report it as a placeholder issue.
        if self.peek(0).is_some_and(|b| b.is_ascii_whitespace()) {
            let mut lookahead = self.pos;
            while self
                .bytes
                .get(lookahead)
                .is_some_and(|b| b.is_ascii_whitespace())
            {
                lookahead += 1;
            }
            if matches!(self.bytes.get(lookahead), Some(b':' | b'}')) {
                return Err(placeholder_error(
                    "invalid placeholder in step pattern",
                    open,
                    Some(name),
                ));
            }
            self.pos = lookahead;
        }

        let hint = if self.peek(0) == Some(b':') {
            self.pos += 1;
            let hint_start = self.pos;
            self.skip_while(|b| b != b'}');
            let raw = std::str::from_utf8(&self.bytes[hint_start..self.pos]).map_err(|_| {
                placeholder_error(
                    "invalid placeholder in step pattern",
                    open,
                    Some(name.clone()),
                )
            })?;
            if raw.is_empty() || raw.contains(char::is_whitespace) || raw.contains(['{', '}']) {
                return Err(placeholder_error(
                    "invalid placeholder in step pattern",
                    open,
                    Some(name),
                ));
            }
            Some(raw.to_string())
        } else {
            // Without a hint, tolerate arbitrary text with balanced nested
            // braces between the name and the closing brace.
            let mut depth = 0usize;
            loop {
                match self.peek(0) {
                    Some(b'{') => {
                        depth += 1;
                        self.pos += 1;
                    }
                    Some(b'}') if depth > 0 => {
                        depth -= 1;
                        self.pos += 1;
                    }
                    Some(b'}') => break,
                    Some(_) => self.pos += 1,
                    None => {
                        return Err(placeholder_error(
                            "missing closing '}' for placeholder",
                            open,
                            Some(name),
                        ));
                    }
                }
            }
            None
        };

        if self.peek(0) != Some(b'}') {
            return Err(placeholder_error(
                "missing closing '}' for placeholder",
                open,
                Some(name),
            ));
        }
        self.pos += 1;
        Ok(Token::Placeholder { name, hint })
    }
}

pub(crate) fn lex(pattern: &str) -> Result<Vec<Token>, PatternError> {
    let mut cursor = Cursor::new(pattern);
    let mut tokens = Vec::new();
    let mut literal = String::new();

    fn flush(literal: &mut String, tokens: &mut Vec<Token>) {
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(literal)));
        }
    }

    while let Some(ch) = cursor.next_char() {
        match ch {
            '\\' => {
                cursor.pos += 1;
                match cursor.next_char() {
                    Some(escaped) => {
                        literal.push(escaped);
                        cursor.pos += escaped.len_utf8();
                    }
                    None => literal.push('\\'),
                }
            }
            '{' if cursor.peek(1) == Some(b'{') => {
                literal.push('{');
                cursor.pos += 2;
            }
            '{' => {
                let starts_name = cursor
                    .peek(1)
                    .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_');
                flush(&mut literal, &mut tokens);
                if starts_name {
                    tokens.push(cursor.read_placeholder()?);
                } else {
                    tokens.push(Token::StrayOpen { at: cursor.pos });
                    cursor.pos += 1;
                }
            }
            '}' if cursor.peek(1) == Some(b'}') => {
                literal.push('}');
                cursor.pos += 2;
            }
            '}' => {
                flush(&mut literal, &mut tokens);
                tokens.push(Token::StrayClose { at: cursor.pos });
                cursor.pos += 1;
            }
            _ => {
                literal.push(ch);
                cursor.pos += ch.len_utf8();
            }
        }
    }

    flush(&mut literal, &mut tokens);
    Ok(tokens)
}

/// List the placeholder names of a pattern in order of appearance.
///
/// # Errors
/// Returns [`PatternError`] when the pattern contains malformed placeholder
/// syntax.
///
/// # Examples
/// ```
/// use trellis_bdd_patterns::placeholder_names;
///
/// let names = placeholder_names("I eat {count:u32} of {item}")?;
/// assert_eq!(names, ["count", "item"]);
/// # Ok::<(), trellis_bdd_patterns::PatternError>(())
/// ```
pub fn placeholder_names(pattern: &str) -> Result<Vec<String>, PatternError> {
    Ok(lex(pattern)?
        .into_iter()
        .filter_map(|token| match token {
            Token::Placeholder { name, .. } => Some(name),
            _ => None,
        })
        .collect())
}
