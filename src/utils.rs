use regex::Regex;
use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

pub(crate) type Infallible<'a, T> = (T, &'a str);
pub(crate) type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// Try to consume a regex, returning None if it doesn't match at the start of `s`
pub(crate) fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  match re.find(s) {
    Some(m) if m.start() == 0 => {
      let (_, rest) = s.split_at(m.end());
      (Some(m.as_str()), rest)
    }
    _ => (None, s),
  }
}

/// Try to consume a regex, failing if it doesn't match
pub(crate) fn needed_re<'a>(re: &'static Regex, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", re, snippet(s)).into())
  }
}

/// Try to consume a char, returning None if it doesn't match
pub(crate) fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Try to consume a char, failing if it doesn't match
pub(crate) fn needed_char(c: char, s: &str) -> ParseResult<'_, char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", c, snippet(s)).into())
  }
}

/// Skips whitespace and `//` line comments
pub(crate) fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_COMMENT, r"^(\s|//[^\n]*)*");
  optional_re(&WHITESPACE_OR_COMMENT, s).1
}

/// Tries to parse a name made of letters, numbers, - and _
pub(crate) fn parse_name(s: &str) -> ParseResult<'_, &str> {
  regex_static!(NAME, r"^[a-zA-Z0-9\-_]+");
  needed_re(&NAME, s).map_err(|err| format!("name: {}", err).into())
}

/// Parses a double-quoted string, resolving `\"` and `\\` escapes
pub(crate) fn parse_string(s: &str) -> ParseResult<'_, String> {
  regex_static!(STRING, r#"^"(?:[^"\\]|\\.)*""#);
  let (quoted, rest) = needed_re(&STRING, s).map_err(|e| -> Err { format!("string: {}", e).into() })?;

  let mut out = String::with_capacity(quoted.len());
  let mut chars = quoted[1..quoted.len() - 1].chars();
  while let Some(c) = chars.next() {
    if c == '\\' {
      match chars.next() {
        Some('n') => out.push('\n'),
        Some(escaped) => out.push(escaped),
        None => break,
      }
    } else {
      out.push(c);
    }
  }
  Ok((out, rest))
}

/// First line of the remaining input, for error messages
pub(crate) fn snippet(s: &str) -> &str {
  let line = s.lines().next().unwrap_or("");
  match line.char_indices().nth(40) {
    Some((idx, _)) => &line[..idx],
    None => line,
  }
}
