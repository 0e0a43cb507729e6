use regex::Regex;
use std::fmt;

use crate::token::Token;

/// A whole-tag pattern, such as `NN.*` or `EC|ADVEC.*`
#[derive(Debug, Clone)]
pub struct TagPattern {
  source: String,
  re: Regex,
}

impl TagPattern {
  pub fn new(source: &str) -> Result<Self, regex::Error> {
    let re = Regex::new(&format!("^(?:{})$", source))?;
    Ok(Self {
      source: source.to_string(),
      re,
    })
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn matches(&self, tag: &str) -> bool {
    self.re.is_match(tag)
  }
}

impl PartialEq for TagPattern {
  fn eq(&self, other: &Self) -> bool {
    self.source == other.source
  }
}

impl fmt::Display for TagPattern {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "/{}/", self.source)
  }
}

/// Cursor checkpoint returned by [`Lexer::mark`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mark(pub usize);

/// Token-by-token access to a tagged sentence, with O(1) checkpoints for backtracking
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
  tokens: &'a [Token],
  cursor: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(tokens: &'a [Token]) -> Self {
    Self { tokens, cursor: 0 }
  }

  /// The token under the cursor, if it exists and its tag matches `pattern`
  pub fn peek(&self, pattern: Option<&TagPattern>) -> Option<&'a Token> {
    let token = self.tokens.get(self.cursor)?;
    match pattern {
      Some(p) if !p.matches(&token.tag) => None,
      _ => Some(token),
    }
  }

  /// Like `peek`, but moves past the token on success
  pub fn consume(&mut self, pattern: Option<&TagPattern>) -> Option<&'a Token> {
    let token = self.peek(pattern)?;
    self.cursor += 1;
    Some(token)
  }

  pub fn mark(&self) -> Mark {
    Mark(self.cursor)
  }

  pub fn restore_to(&mut self, mark: Mark) {
    debug_assert!(mark.0 <= self.tokens.len(), "mark past end of input");
    self.cursor = mark.0;
  }

  pub fn position(&self) -> usize {
    self.cursor
  }

  pub fn is_at_end(&self) -> bool {
    self.cursor >= self.tokens.len()
  }

  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  pub fn token_at(&self, idx: usize) -> Option<&'a Token> {
    self.tokens.get(idx)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::token::parse_tokens;

  #[test]
  fn test_whole_tag_matching() {
    let nng = TagPattern::new("NN").unwrap();
    assert!(!nng.matches("NNG"));
    let nouns = TagPattern::new("NN.*|NP").unwrap();
    assert!(nouns.matches("NNG"));
    assert!(nouns.matches("NP"));
    assert!(!nouns.matches("XNP"));
  }

  #[test]
  fn test_peek_consume_restore() {
    let tokens = parse_tokens("밥:NNG;을:JKO;먹:VV").unwrap();
    let mut lexer = Lexer::new(&tokens);
    let noun = TagPattern::new("NNG").unwrap();
    let object = TagPattern::new("JKO").unwrap();

    let start = lexer.mark();
    assert_eq!(lexer.peek(Some(&object)), None);
    assert_eq!(lexer.peek(Some(&noun)).map(|t| t.word.as_str()), Some("밥"));
    assert_eq!(lexer.position(), 0);

    assert!(lexer.consume(Some(&noun)).is_some());
    assert!(lexer.consume(Some(&noun)).is_none());
    assert_eq!(lexer.position(), 1);
    assert!(lexer.consume(None).is_some());
    assert!(lexer.consume(None).is_some());
    assert!(lexer.is_at_end());
    assert_eq!(lexer.consume(None), None);

    lexer.restore_to(start);
    assert_eq!(lexer.position(), 0);
  }
}
