use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, trace};

use crate::grammar::Grammar;
use crate::lexer::{Lexer, Mark};
use crate::rules::Expr;
use crate::syntree::{Constituent, ParseTree, SynTree, Word};
use crate::token::Token;

/// Stack left before a production call grows a new segment
const RED_ZONE: usize = 100 * 1024;
/// Size of each new stack segment
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Why a sentence has no parse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("unexpected {token} at position {position}")]
  UnexpectedToken { position: usize, token: Token },
  #[error("unexpected end of input at position {position}")]
  UnexpectedEnd { position: usize },
  #[error("gave up after {steps} production attempts")]
  StepLimit { steps: usize },
}

impl ParseError {
  /// The furthest position the parser reached, when it got to finish
  pub fn furthest(&self) -> Option<usize> {
    match self {
      Self::UnexpectedToken { position, .. } | Self::UnexpectedEnd { position } => Some(*position),
      Self::StepLimit { .. } => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
  /// Remember (production, position) outcomes within a parse
  pub memoize: bool,
  /// Upper bound on production invocations
  pub max_steps: Option<usize>,
}

impl Default for ParseOptions {
  fn default() -> Self {
    Self {
      memoize: true,
      max_steps: None,
    }
  }
}

/// Backtracking recursive-descent run over one sentence.
///
/// Every production goes through the same harness: a recursion guard on
/// (production, position), the failure and success caches, then the body.
/// Outcomes computed while the guard fired somewhere below are not cached,
/// since they depend on which productions happened to be active.
pub struct Parser<'g, 't> {
  grammar: &'g Grammar,
  lexer: Lexer<'t>,
  options: ParseOptions,
  active: HashSet<(usize, Mark)>,
  failed: HashSet<(usize, Mark)>,
  succeeded: HashMap<(usize, Mark), (ParseTree, Mark)>,
  furthest: usize,
  guard_hits: usize,
  steps: usize,
  aborted: bool,
}

impl<'g, 't> Parser<'g, 't> {
  pub fn new(grammar: &'g Grammar, tokens: &'t [Token], options: ParseOptions) -> Self {
    Self {
      grammar,
      lexer: Lexer::new(tokens),
      options,
      active: HashSet::new(),
      failed: HashSet::new(),
      succeeded: HashMap::new(),
      furthest: 0,
      guard_hits: 0,
      steps: 0,
      aborted: false,
    }
  }

  /// Runs the named production at the cursor. None if it doesn't match or
  /// the grammar has no such production.
  pub fn parse_rule(&mut self, name: &str) -> Option<ParseTree> {
    let id = self.grammar.rule_id(name)?;
    self.apply(id)
  }

  pub fn parse_start(&mut self) -> Option<ParseTree> {
    self.apply(self.grammar.start)
  }

  pub fn position(&self) -> usize {
    self.lexer.position()
  }

  /// End of the furthest-reaching successful production
  pub fn furthest(&self) -> usize {
    self.furthest
  }

  pub fn exhausted(&self) -> bool {
    self.lexer.is_at_end()
  }

  pub fn steps(&self) -> usize {
    self.steps
  }

  /// True once the step budget ran out
  pub fn aborted(&self) -> bool {
    self.aborted
  }

  /// The failure to report for the current run state
  pub fn error(&self) -> ParseError {
    if self.aborted {
      return ParseError::StepLimit { steps: self.steps };
    }
    match self.lexer.token_at(self.furthest) {
      Some(token) => ParseError::UnexpectedToken {
        position: self.furthest,
        token: token.clone(),
      },
      None => ParseError::UnexpectedEnd {
        position: self.furthest,
      },
    }
  }

  fn apply(&mut self, id: usize) -> Option<ParseTree> {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || self.apply_rule(id))
  }

  fn apply_rule(&mut self, id: usize) -> Option<ParseTree> {
    self.steps += 1;
    if self.aborted {
      return None;
    }
    if let Some(max) = self.options.max_steps {
      if self.steps > max {
        debug!(max, "step budget exhausted");
        self.aborted = true;
        return None;
      }
    }

    let grammar = self.grammar;
    let rule = &grammar.rules[id];
    let mark = self.lexer.mark();
    let key = (id, mark);

    if self.active.contains(&key) {
      self.guard_hits += 1;
      trace!(rule = %rule.symbol, position = mark.0, "recursion guard");
      return None;
    }
    if self.options.memoize {
      if self.failed.contains(&key) {
        return None;
      }
      if let Some((node, end)) = self.succeeded.get(&key) {
        let (node, end) = (node.clone(), *end);
        self.lexer.restore_to(end);
        return Some(node);
      }
    }

    trace!(rule = %rule.symbol, position = mark.0, "attempt");
    let hits_before = self.guard_hits;
    self.active.insert(key);
    let children = self.eval(&rule.body);
    self.active.remove(&key);
    let cacheable = self.options.memoize && self.guard_hits == hits_before && !self.aborted;

    let children = match children {
      Some(children) if !children.is_empty() => children,
      _ => {
        self.lexer.restore_to(mark);
        if cacheable {
          self.failed.insert(key);
        }
        return None;
      }
    };

    let start = children.first().map_or(mark.0, |c| c.span().0);
    let end = self.lexer.mark();
    let node = SynTree::Branch(
      Constituent {
        value: rule.symbol.name.clone(),
        span: (start, end.0),
      },
      children,
    );

    self.furthest = self.furthest.max(end.0);
    if cacheable {
      self.succeeded.insert(key, (node.clone(), end));
    }
    Some(node)
  }

  /// `Some(vec![])` is a match of zero tokens, `None` a failure
  fn eval(&mut self, expr: &'g Expr) -> Option<Vec<ParseTree>> {
    match expr {
      Expr::Terminal(pattern) => {
        let at = self.lexer.position();
        let token = self.lexer.consume(Some(pattern))?;
        Some(vec![SynTree::Leaf(Word {
          value: token.clone(),
          span: (at, at + 1),
        })])
      }
      Expr::Rule(r) => self.apply(r.id).map(|node| vec![node]),
      Expr::Sequence(items) => {
        let mark = self.lexer.mark();
        let mut children = Vec::new();
        for item in items {
          match self.eval(item) {
            Some(mut matched) => children.append(&mut matched),
            None => {
              self.lexer.restore_to(mark);
              return None;
            }
          }
        }
        Some(children)
      }
      Expr::Optional(e) => Some(self.eval(e).unwrap_or_default()),
      Expr::ZeroOrMore(e) => Some(self.repeat(e).0),
      Expr::OneOrMore(e) => match self.repeat(e) {
        (_, 0) => None,
        (children, _) => Some(children),
      },
      Expr::Longest(alternatives) => {
        let mark = self.lexer.mark();
        let mut best: Option<(Vec<ParseTree>, Mark)> = None;
        for alt in alternatives {
          if let Some(children) = self.eval(alt) {
            let end = self.lexer.mark();
            match &best {
              Some((_, best_end)) if end <= *best_end => {}
              _ => best = Some((children, end)),
            }
          }
          self.lexer.restore_to(mark);
        }
        let (children, end) = best?;
        self.lexer.restore_to(end);
        Some(children)
      }
    }
  }

  /// Matches `expr` until it fails or stops making progress; returns the
  /// children and the number of successful iterations
  fn repeat(&mut self, expr: &'g Expr) -> (Vec<ParseTree>, usize) {
    let mut children = Vec::new();
    let mut count = 0;
    loop {
      let before = self.lexer.position();
      let Some(mut matched) = self.eval(expr) else {
        break;
      };
      children.append(&mut matched);
      count += 1;
      if self.lexer.position() == before {
        break;
      }
    }
    (children, count)
  }
}

/// Parses a whole sentence with the grammar's start production. Succeeds only
/// if every token is consumed.
pub fn parse(grammar: &Grammar, tokens: &[Token], options: ParseOptions) -> Result<ParseTree, ParseError> {
  let mut parser = Parser::new(grammar, tokens, options);
  let tree = parser.parse_start();

  let result = match tree {
    Some(tree) if !parser.aborted() && parser.exhausted() => Ok(tree),
    _ => Err(parser.error()),
  };
  match &result {
    Ok(_) => debug!(tokens = tokens.len(), steps = parser.steps(), "parsed"),
    Err(e) => debug!(tokens = tokens.len(), steps = parser.steps(), error = %e, "no parse"),
  }
  result
}

impl Grammar {
  pub fn parse(&self, tokens: &[Token], options: ParseOptions) -> Result<ParseTree, ParseError> {
    parse(self, tokens, options)
  }
}
