//! Pattern tokenizer
//!
//! A token is a whole word (maximal run of `[A-Za-z0-9_]`) that starts with
//! an uppercase letter, is at least two characters long and contains no
//! lowercase letters. Everything else is literal text.

/// One piece of a pattern string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Token(String),
    Literal(String),
}

impl Segment {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Token(s) | Self::Literal(s) => s,
        }
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_token(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && word.len() >= 2
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Literal(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Literal(text.to_string()));
    }
}

/// Split `pattern` into tokens and literal runs. Adjacent literal text is
/// merged, so concatenating the segments yields the input.
pub fn tokenize(pattern: &str) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();

    let mut rest = pattern;
    while !rest.is_empty() {
        let word_start = rest.find(is_word).unwrap_or(rest.len());
        push_literal(&mut segments, &rest[..word_start]);
        rest = &rest[word_start..];
        if rest.is_empty() {
            break;
        }
        let word_end = rest.find(|c: char| !is_word(c)).unwrap_or(rest.len());
        let word = &rest[..word_end];
        if is_token(word) {
            segments.push(Segment::Token(word.to_string()));
        } else {
            push_literal(&mut segments, word);
        }
        rest = &rest[word_end..];
    }
    segments
}
