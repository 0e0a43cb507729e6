use std::fmt;

use crate::token::Token;

/// The tree the parser builds: productions over tagged tokens
pub type ParseTree = SynTree<String, Token>;

#[derive(Debug, PartialEq, Clone)]
pub struct Constituent<T> {
  pub value: T,
  pub span: (usize, usize),
}

impl<T> fmt::Display for Constituent<T>
where
  T: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}: {}", self.span.0, self.span.1, self.value)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Word<U> {
  pub value: U,
  pub span: (usize, usize),
}

impl<U> fmt::Display for Word<U>
where
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}: {}", self.span.0, self.span.1, self.value)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub enum SynTree<T, U> {
  Branch(Constituent<T>, Vec<SynTree<T, U>>),
  Leaf(Word<U>),
}

impl<T, U> SynTree<T, U> {
  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf(_))
  }

  pub fn is_branch(&self) -> bool {
    matches!(self, Self::Branch(_, _))
  }

  pub fn get_leaf(&self) -> Option<&Word<U>> {
    match self {
      Self::Leaf(w) => Some(w),
      _ => None,
    }
  }

  pub fn get_branch(&self) -> Option<(&Constituent<T>, &Vec<SynTree<T, U>>)> {
    match self {
      Self::Branch(c, cs) => Some((c, cs)),
      _ => None,
    }
  }

  pub fn into_branch(self) -> Option<(Constituent<T>, Vec<SynTree<T, U>>)> {
    match self {
      Self::Branch(c, cs) => Some((c, cs)),
      _ => None,
    }
  }

  pub fn span(&self) -> (usize, usize) {
    match self {
      Self::Branch(c, _) => c.span,
      Self::Leaf(w) => w.span,
    }
  }

  /// Children of a branch; a leaf has none
  pub fn children(&self) -> &[SynTree<T, U>] {
    match self {
      Self::Branch(_, cs) => cs,
      Self::Leaf(_) => &[],
    }
  }

  /// Leaves in left-to-right order
  pub fn leaves(&self) -> Vec<&Word<U>> {
    let mut out = Vec::new();
    self.collect_leaves(&mut out);
    out
  }

  fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Word<U>>) {
    match self {
      Self::Leaf(w) => out.push(w),
      Self::Branch(_, cs) => {
        for c in cs {
          c.collect_leaves(out);
        }
      }
    }
  }

  /// Number of branches on the longest root-to-leaf path
  pub fn depth(&self) -> usize {
    match self {
      Self::Leaf(_) => 0,
      Self::Branch(_, cs) => 1 + cs.iter().map(Self::depth).max().unwrap_or(0),
    }
  }

  /// Resets every branch span to the union of its children's spans, bottom-up.
  /// Childless branches keep their span.
  pub fn recompute_spans(&mut self) {
    if let Self::Branch(c, cs) = self {
      for child in cs.iter_mut() {
        child.recompute_spans();
      }
      if let (Some(first), Some(last)) = (cs.first(), cs.last()) {
        c.span = (first.span().0, last.span().1);
      }
    }
  }
}

impl<T, U> SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  /// One-line form, `[Label child child]` with leaves as their values
  pub fn bracketed(&self) -> String {
    match self {
      Self::Leaf(w) => w.value.to_string(),
      Self::Branch(c, cs) => {
        let mut s = format!("[{}", c.value);
        for child in cs {
          s.push(' ');
          s.push_str(&child.bracketed());
        }
        s.push(']');
        s
      }
    }
  }
}

impl ParseTree {
  /// The production name of a branch
  pub fn label(&self) -> Option<&str> {
    self.get_branch().map(|(c, _)| c.value.as_str())
  }
}

impl<T, U> fmt::Display for SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Leaf(t) => write!(f, "{}", t),
      Self::Branch(t, ts) => {
        write!(f, "({}", t)?;
        if ts.len() == 1 {
          write!(f, " ({}))", ts[0])
        } else {
          for t in ts.iter() {
            let fmt = t.to_string();
            for line in fmt.lines() {
              write!(f, "\n  {}", line)?;
            }
          }
          write!(f, ")")
        }
      }
    }
  }
}
