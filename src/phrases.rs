use std::collections::HashSet;
use std::fmt;

use crate::syntree::{ParseTree, SynTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhraseEntry {
  Word { word: String, tag: String },
  Label(String),
}

impl fmt::Display for PhraseEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Word { word, tag } => write!(f, "{}:{}", word, tag),
      Self::Label(label) => write!(f, "<{}>", label),
    }
  }
}

/// One entry list per top-level constituent: words in order, each node's
/// label after its children, `hidden` labels left out
pub fn phrase_list(tree: &ParseTree, hidden: &HashSet<String>) -> Vec<Vec<PhraseEntry>> {
  tree
    .children()
    .iter()
    .map(|child| {
      let mut entries = Vec::new();
      collect(child, hidden, &mut entries);
      entries
    })
    .collect()
}

fn collect(node: &ParseTree, hidden: &HashSet<String>, entries: &mut Vec<PhraseEntry>) {
  match node {
    SynTree::Leaf(w) => entries.push(PhraseEntry::Word {
      word: w.value.word.clone(),
      tag: w.value.tag.clone(),
    }),
    SynTree::Branch(c, children) => {
      for child in children {
        collect(child, hidden, entries);
      }
      if !hidden.contains(&c.value) {
        entries.push(PhraseEntry::Label(c.value.clone()));
      }
    }
  }
}
