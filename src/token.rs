use std::fmt;
use std::str::FromStr;

use crate::Err;

/// Tag the segmenter gives sentence-final punctuation (. ? !)
pub const SENTENCE_FINAL_TAG: &str = "SF";

/// A morpheme and its part-of-speech tag, as produced by the segmenter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
  pub word: String,
  pub tag: String,
}

impl Token {
  pub fn new(word: impl Into<String>, tag: impl Into<String>) -> Self {
    Self {
      word: word.into(),
      tag: tag.into(),
    }
  }

  pub fn is_sentence_final(&self) -> bool {
    self.tag == SENTENCE_FINAL_TAG
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.word, self.tag)
  }
}

/// Parses `word:tag`. The last colon separates the tag, so `::SP` is a colon.
impl FromStr for Token {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().rsplit_once(':') {
      Some((word, tag)) if !tag.is_empty() => Ok(Self::new(word, tag)),
      _ => Err(format!("token needs a word:tag form, got {:?}", s).into()),
    }
  }
}

/// Parses a `word:tag;word:tag` token list. A `;` directly followed by `:`
/// is the semicolon morpheme itself rather than a separator.
pub fn parse_tokens(s: &str) -> Result<Vec<Token>, Err> {
  let mut tokens = Vec::new();
  let mut start = 0;
  let mut chars = s.char_indices().peekable();

  while let Some((idx, c)) = chars.next() {
    let next_is_colon = matches!(chars.peek(), Some((_, ':')));
    if c == ';' && !next_is_colon {
      push_token(&mut tokens, &s[start..idx])?;
      start = idx + 1;
    }
  }
  push_token(&mut tokens, &s[start..])?;

  Ok(tokens)
}

fn push_token(tokens: &mut Vec<Token>, part: &str) -> Result<(), Err> {
  if !part.trim().is_empty() {
    tokens.push(part.parse()?);
  }
  Ok(())
}

/// Joins tokens back into the `word:tag;word:tag` form tag patterns match against
pub fn join_tokens(tokens: &[Token]) -> String {
  tokens
    .iter()
    .map(|t| t.to_string())
    .collect::<Vec<_>>()
    .join(";")
}

/// Splits a stream holding several sentences after each sentence-final token.
/// Trailing tokens without a final punctuation mark form the last sentence.
pub fn split_sentences(tokens: Vec<Token>) -> Vec<Vec<Token>> {
  let mut sentences = Vec::new();
  let mut current = Vec::new();

  for token in tokens {
    let ends = token.is_sentence_final();
    current.push(token);
    if ends {
      sentences.push(std::mem::take(&mut current));
    }
  }
  if !current.is_empty() {
    sentences.push(current);
  }

  sentences
}
