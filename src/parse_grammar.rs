//! Simple recursive-descent parsing of grammar files
//!
//! ```text
//! %flatten MainClause;
//! Sentence -> SubordinateClause* MainClause SentenceEnd?;
//! MainClause -> (Predicate | Phrase MainClause);
//! SentenceEnd -> /SF/;
//! ```
use regex::Regex;

use crate::lexer::TagPattern;
use crate::rules::{Expr, Rule, rule};
use crate::utils::{
  needed_char, needed_re, optional_char, optional_re, parse_name, skip_whitespace, snippet,
  ParseResult,
};
use crate::Err;

/// Non-rule statements of a grammar file
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
  Start(String),
  Flatten(Vec<String>),
  Hide(Vec<String>),
}

/// Parses a str into a tuple of (rules, directives)
/// Errors if the grammar doesn't parse
pub fn parse(s: &str) -> Result<(Vec<Rule>, Vec<Directive>), Err> {
  let mut rules = Vec::new();
  let mut directives = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok((rules, directives));
    }
    if rem.starts_with('%') {
      let (directive, s) = parse_directive(rem)?;
      directives.push(directive);
      rem = s;
    } else {
      let (rule, s) = parse_rule(rem)?;
      rules.push(rule);
      rem = s;
    }
  }
}

/// Tries to parse a rule name: a letter followed by letters, numbers and _
fn parse_symbol_name(s: &str) -> ParseResult<'_, &str> {
  regex_static!(SYMBOL, r"^[a-zA-Z][a-zA-Z0-9_]*");
  needed_re(&SYMBOL, s).map_err(|e| format!("symbol: {}", e).into())
}

/// `%name arg arg ...;`
fn parse_directive(s: &str) -> ParseResult<'_, Directive> {
  let (_, s) = needed_char('%', s)?;
  let (name, s) = parse_name(s)?;

  let mut args = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if let (Some(_), s) = optional_char(';', rem) {
      rem = s;
      break;
    }
    let (arg, s) = parse_symbol_name(rem).map_err(|e| -> Err { format!("%{}: {}", name, e).into() })?;
    args.push(arg.to_string());
    rem = s;
  }

  let directive = match name {
    "start" if args.len() == 1 => Directive::Start(args.remove(0)),
    "start" => return Err(format!("%start takes exactly one rule name, got {}", args.len()).into()),
    "flatten" => Directive::Flatten(args),
    "hide" => Directive::Hide(args),
    other => return Err(format!("unknown directive %{}", other).into()),
  };
  Ok((directive, rem))
}

/// Symbol, arrow, body, terminated by ;
fn parse_rule(s: &str) -> ParseResult<'_, Rule> {
  #![allow(clippy::trivial_regex)]
  regex_static!(ARROW, "^->");

  let (name, s) = parse_symbol_name(s).map_err(|e| -> Err { format!("rule symbol: {}", e).into() })?;
  let s = skip_whitespace(s);
  let (_, s) = needed_re(&ARROW, s).map_err(|e| -> Err { format!("rule {} arrow: {}", name, e).into() })?;

  let (body, s) = parse_alternatives(s).map_err(|e| -> Err { format!("rule {}: {}", name, e).into() })?;
  let s = skip_whitespace(s);
  let (_, s) = needed_char(';', s).map_err(|e| -> Err { format!("rule {}: {}", name, e).into() })?;

  Ok((Rule::new(name, body), s))
}

/// `seq | seq | ...`: a single alternative is returned as is, several become a longest-of
fn parse_alternatives(s: &str) -> ParseResult<'_, Expr> {
  let mut alternatives = Vec::new();
  let mut rem = s;
  loop {
    let (alt, s) = parse_sequence(rem)?;
    alternatives.push(alt);
    let s = skip_whitespace(s);
    match optional_char('|', s) {
      (Some(_), s) => rem = s,
      (None, s) => {
        rem = s;
        break;
      }
    }
  }

  if alternatives.len() == 1 {
    Ok((alternatives.remove(0), rem))
  } else {
    Ok((Expr::Longest(alternatives), rem))
  }
}

/// One or more items, up to `;`, `|` or `)`
fn parse_sequence(s: &str) -> ParseResult<'_, Expr> {
  let mut items = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() || rem.starts_with([';', '|', ')']) {
      break;
    }
    let (item, s) = parse_item(rem)?;
    items.push(item);
    rem = s;
  }

  match items.len() {
    0 => Err(format!("expected at least one item at {}", snippet(rem)).into()),
    1 => Ok((items.remove(0), rem)),
    _ => Ok((Expr::Sequence(items), rem)),
  }
}

/// An atom with an optional `?`, `*` or `+` suffix
fn parse_item(s: &str) -> ParseResult<'_, Expr> {
  let (atom, s) = parse_atom(s)?;
  let expr = match s.chars().next() {
    Some('?') => Expr::Optional(Box::new(atom)),
    Some('*') => Expr::ZeroOrMore(Box::new(atom)),
    Some('+') => Expr::OneOrMore(Box::new(atom)),
    _ => return Ok((atom, s)),
  };
  Ok((expr, &s[1..]))
}

fn parse_atom(s: &str) -> ParseResult<'_, Expr> {
  if let (Some(_), s) = optional_char('(', s) {
    let (expr, s) = parse_alternatives(s)?;
    let s = skip_whitespace(s);
    let (_, s) = needed_char(')', s)?;
    Ok((expr, s))
  } else if s.starts_with('/') {
    parse_terminal(s)
  } else {
    let (name, s) = parse_symbol_name(s)?;
    Ok((rule(name), s))
  }
}

/// `/regex/`, matched against whole tags
fn parse_terminal(s: &str) -> ParseResult<'_, Expr> {
  regex_static!(TERMINAL, r"^/([^/\n]+)/");
  let (Some(slashed), rest) = optional_re(&TERMINAL, s) else {
    return Err(format!("unterminated tag pattern at {}", snippet(s)).into());
  };
  let source = &slashed[1..slashed.len() - 1];
  let pattern = TagPattern::new(source).map_err(|e| format!("tag pattern /{}/: {}", source, e))?;
  Ok((Expr::Terminal(pattern), rest))
}
