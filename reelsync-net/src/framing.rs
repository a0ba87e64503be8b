//! Newline-delimited text framing for TCP messages.
//!
//! Wire format: `<command> <field> <field> ...\n`
//!
//! Fields are separated by single spaces. Names and paths are wrapped in
//! `"` so they may contain spaces. Inside a quoted field `\"` stands for a
//! quote and `\\` for a backslash; any other backslash is literal, which
//! keeps Windows paths such as `C:\clips\a.exr` readable by older peers.
//!
//! Annotation text travels between carets, `^like this^`, with no escapes.

use std::borrow::Cow;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("message field contains an embedded newline")]
    EmbeddedNewline,
    #[error("bare word {0:?} is empty or contains whitespace or a quote")]
    InvalidWord(String),
    #[error("quoted field is not terminated")]
    UnterminatedQuote,
    #[error("text {0:?} contains a caret")]
    InvalidText(String),
    #[error("caret-delimited text is not terminated")]
    UnterminatedCaret,
}

/// One outbound message field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Int(i64),
    Float(f64),
    Float32(f32),
    Quoted(&'a str),
    /// Free text between carets
    Caret(&'a str),
}

/// Encode a command and its fields as exactly one `\n`-terminated line.
pub fn encode(command: &str, fields: &[Field<'_>]) -> Result<Vec<u8>, CodecError> {
    check_word(command)?;

    let mut line = String::from(command);
    for field in fields {
        line.push(' ');
        match *field {
            Field::Int(v) => line.push_str(&v.to_string()),
            Field::Float(v) => line.push_str(&v.to_string()),
            Field::Float32(v) => line.push_str(&v.to_string()),
            Field::Quoted(s) => {
                if s.contains('\n') {
                    return Err(CodecError::EmbeddedNewline);
                }
                push_quoted(&mut line, s);
            }
            Field::Caret(s) => {
                if s.contains('\n') {
                    return Err(CodecError::EmbeddedNewline);
                }
                if s.contains('^') {
                    return Err(CodecError::InvalidText(s.to_string()));
                }
                line.push('^');
                line.push_str(s);
                line.push('^');
            }
        }
    }
    line.push('\n');
    Ok(line.into_bytes())
}

fn check_word(word: &str) -> Result<(), CodecError> {
    if word.contains('\n') {
        return Err(CodecError::EmbeddedNewline);
    }
    if word.is_empty() || word.starts_with('"') || word.contains(char::is_whitespace) {
        return Err(CodecError::InvalidWord(word.to_string()));
    }
    Ok(())
}

/// Backslashes are only doubled where a decoder would otherwise read them
/// as an escape: before `"`, before `\`, and at the end of the field.
fn push_quoted(line: &mut String, s: &str) {
    line.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => line.push_str("\\\""),
            '\\' => match chars.peek() {
                None | Some('"') | Some('\\') => line.push_str("\\\\"),
                Some(_) => line.push('\\'),
            },
            _ => line.push(c),
        }
    }
    line.push('"');
}

/// Split `buffer` into complete lines and the trailing partial line.
///
/// The `\n` delimiter is stripped; nothing else is. Invalid UTF-8 is
/// replaced rather than rejected so one bad byte cannot wedge a connection.
pub fn decode_lines(buffer: &[u8]) -> (Vec<String>, &[u8]) {
    let mut lines = Vec::new();
    let mut rest = buffer;
    while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
        lines.push(String::from_utf8_lossy(&rest[..pos]).into_owned());
        rest = &rest[pos + 1..];
    }
    (lines, rest)
}

/// Accumulates bytes across reads and yields complete lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let (lines, rest) = decode_lines(&self.pending);
        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        lines
    }

    /// Bytes of an incomplete line still waiting for its `\n`.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// One inbound field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Bare(&'a str),
    Quoted(Cow<'a, str>),
}

impl Token<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            Token::Bare(s) => s,
            Token::Quoted(s) => s,
        }
    }
}

/// Tokenizer over one decoded line.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Text not yet consumed, leading whitespace removed.
    pub fn rest(&self) -> &'a str {
        self.rest.trim_start()
    }

    /// The next field as caret-delimited text. `None` when no field is left
    /// or the next one does not open with a caret.
    pub fn caret(&mut self) -> Option<Result<&'a str, CodecError>> {
        let body = self.rest.trim_start().strip_prefix('^')?;
        match body.find('^') {
            Some(end) => {
                self.rest = &body[end + 1..];
                Some(Ok(&body[..end]))
            }
            None => {
                self.rest = "";
                Some(Err(CodecError::UnterminatedCaret))
            }
        }
    }

    fn quoted(&mut self) -> Result<Token<'a>, CodecError> {
        // self.rest starts just after the opening quote
        let body = self.rest;
        let mut owned: Option<String> = None;
        let mut chars = body.char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.rest = &body[i + 1..];
                    return Ok(Token::Quoted(match owned {
                        Some(s) => Cow::Owned(s),
                        None => Cow::Borrowed(&body[..i]),
                    }));
                }
                '\\' => {
                    let next = body[i + 1..].chars().next();
                    if let Some(escaped @ ('"' | '\\')) = next {
                        owned
                            .get_or_insert_with(|| body[..i].to_string())
                            .push(escaped);
                        chars.next();
                    } else if let Some(s) = owned.as_mut() {
                        s.push('\\');
                    }
                }
                _ => {
                    if let Some(s) = owned.as_mut() {
                        s.push(c);
                    }
                }
            }
        }
        self.rest = "";
        Err(CodecError::UnterminatedQuote)
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<Token<'a>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }
        if let Some(body) = self.rest.strip_prefix('"') {
            self.rest = body;
            return Some(self.quoted());
        }
        let end = self.rest.find(char::is_whitespace).unwrap_or(self.rest.len());
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(Ok(Token::Bare(word)))
    }
}
