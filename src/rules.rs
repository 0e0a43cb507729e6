use std::fmt;

use crate::lexer::TagPattern;
use crate::Err;

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
  pub name: String,
}

impl Symbol {
  pub fn new(name: String) -> Self {
    Self { name }
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name)
  }
}

/// Reference from a rule body to a named production. `id` is filled in when
/// the grammar resolves names.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleRef {
  pub name: String,
  pub id: usize,
}

/// The body of a production, built from terminals, references and the five combinators
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  /// Consumes one token whose tag matches
  Terminal(TagPattern),
  Rule(RuleRef),
  Sequence(Vec<Expr>),
  Optional(Box<Expr>),
  ZeroOrMore(Box<Expr>),
  OneOrMore(Box<Expr>),
  /// Tries every alternative from the same position and keeps the one consuming the most tokens
  Longest(Vec<Expr>),
}

impl Expr {
  pub fn tag(pattern: &str) -> Result<Self, Err> {
    Ok(Self::Terminal(TagPattern::new(pattern)?))
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Terminal(_))
  }

  /// Names of every production this expression refers to
  pub fn references(&self) -> Vec<&str> {
    let mut names = Vec::new();
    self.collect_references(&mut names);
    names
  }

  fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
    match self {
      Self::Terminal(_) => {}
      Self::Rule(r) => names.push(&r.name),
      Self::Sequence(items) | Self::Longest(items) => {
        for item in items {
          item.collect_references(names);
        }
      }
      Self::Optional(e) | Self::ZeroOrMore(e) | Self::OneOrMore(e) => e.collect_references(names),
    }
  }

  pub(crate) fn references_mut(&mut self) -> Vec<&mut RuleRef> {
    let mut refs = Vec::new();
    self.collect_references_mut(&mut refs);
    refs
  }

  fn collect_references_mut<'a>(&'a mut self, refs: &mut Vec<&'a mut RuleRef>) {
    match self {
      Self::Terminal(_) => {}
      Self::Rule(r) => refs.push(r),
      Self::Sequence(items) | Self::Longest(items) => {
        for item in items {
          item.collect_references_mut(refs);
        }
      }
      Self::Optional(e) | Self::ZeroOrMore(e) | Self::OneOrMore(e) => e.collect_references_mut(refs),
    }
  }

  /// Writes the expression as a grammar-file item, parenthesizing sequences
  fn fmt_item(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Sequence(items) if items.len() > 1 => write!(f, "({})", self),
      _ => write!(f, "{}", self),
    }
  }
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Terminal(p) => write!(f, "{}", p),
      Self::Rule(r) => write!(f, "{}", r.name),
      Self::Sequence(items) => {
        for (idx, item) in items.iter().enumerate() {
          if idx > 0 {
            write!(f, " ")?;
          }
          item.fmt_item(f)?;
        }
        Ok(())
      }
      Self::Optional(e) => {
        e.fmt_item(f)?;
        write!(f, "?")
      }
      Self::ZeroOrMore(e) => {
        e.fmt_item(f)?;
        write!(f, "*")
      }
      Self::OneOrMore(e) => {
        e.fmt_item(f)?;
        write!(f, "+")
      }
      Self::Longest(alts) => {
        write!(f, "(")?;
        for (idx, alt) in alts.iter().enumerate() {
          if idx > 0 {
            write!(f, " | ")?;
          }
          write!(f, "{}", alt)?;
        }
        write!(f, ")")
      }
    }
  }
}

pub fn rule(name: &str) -> Expr {
  Expr::Rule(RuleRef {
    name: name.to_string(),
    id: usize::MAX,
  })
}

pub fn sequence(items: impl IntoIterator<Item = Expr>) -> Expr {
  Expr::Sequence(items.into_iter().collect())
}

pub fn optional(e: Expr) -> Expr {
  Expr::Optional(Box::new(e))
}

pub fn zero_or_more(e: Expr) -> Expr {
  Expr::ZeroOrMore(Box::new(e))
}

pub fn one_or_more(e: Expr) -> Expr {
  Expr::OneOrMore(Box::new(e))
}

pub fn longest(alternatives: impl IntoIterator<Item = Expr>) -> Expr {
  Expr::Longest(alternatives.into_iter().collect())
}

/// A named production
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
  pub symbol: Symbol,
  pub body: Expr,
}

impl Rule {
  pub fn new(name: impl Into<String>, body: Expr) -> Self {
    Self {
      symbol: Symbol::new(name.into()),
      body,
    }
  }

  pub fn symbol_str(&self) -> &str {
    &self.symbol.name
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} -> {};", self.symbol, self.body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display_round_trips_grammar_syntax() {
    let body = sequence(vec![
      zero_or_more(rule("Phrase")),
      longest(vec![
        rule("Predicate"),
        sequence(vec![rule("Phrase"), rule("Clause")]),
      ]),
      optional(Expr::tag("SF").unwrap()),
      one_or_more(sequence(vec![rule("A"), rule("B")])),
    ]);
    let r = Rule::new("Clause", body);
    assert_eq!(
      r.to_string(),
      "Clause -> Phrase* (Predicate | Phrase Clause) /SF/? (A B)+;"
    );
  }

  #[test]
  fn test_references() {
    let body = sequence(vec![rule("A"), optional(longest(vec![rule("B"), Expr::tag("X").unwrap()]))]);
    assert_eq!(body.references(), vec!["A", "B"]);
  }
}
