use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::parse_grammar::{parse, Directive};
use crate::rules::Rule;
use crate::Err;

/// A set of named productions with resolved cross-references
#[derive(Debug, Clone)]
pub struct Grammar {
  pub start: usize,
  pub rules: Vec<Rule>,
  index: HashMap<String, usize>,
  flatten: HashSet<String>,
  hidden: HashSet<String>,
}

impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "%start {};", self.rules[self.start].symbol)?;
    for (directive, labels) in [("flatten", &self.flatten), ("hide", &self.hidden)] {
      if !labels.is_empty() {
        let mut labels = labels.iter().map(String::as_str).collect::<Vec<_>>();
        labels.sort_unstable();
        writeln!(f, "%{} {};", directive, labels.join(" "))?;
      }
    }
    for rule in self.rules.iter() {
      writeln!(f, "{}", rule)?;
    }
    Ok(())
  }
}

impl Grammar {
  /// Builds a grammar whose start symbol is the first rule
  pub fn new(rules: Vec<Rule>) -> Result<Self, Err> {
    if rules.is_empty() {
      return Err("empty ruleset".into());
    }

    let mut index = HashMap::with_capacity(rules.len());
    for (idx, rule) in rules.iter().enumerate() {
      if index.insert(rule.symbol.name.clone(), idx).is_some() {
        return Err(format!("rule {} is defined twice", rule.symbol).into());
      }
    }

    let mut rules = rules;
    for rule in rules.iter_mut() {
      let owner = rule.symbol.name.clone();
      for r in rule.body.references_mut() {
        r.id = *index
          .get(&r.name)
          .ok_or_else(|| format!("rule {} refers to undefined rule {}", owner, r.name))?;
      }
    }

    Ok(Self {
      start: 0,
      rules,
      index,
      flatten: HashSet::new(),
      hidden: HashSet::new(),
    })
  }

  pub fn with_start(mut self, name: &str) -> Result<Self, Err> {
    self.start = self.rule_id(name).ok_or_else(|| format!("unknown start rule {}", name))?;
    Ok(self)
  }

  /// Labels whose nodes are spliced into their parent after parsing
  pub fn with_flatten<I, S>(mut self, labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.flatten.extend(labels.into_iter().map(Into::into));
    self
  }

  /// Labels left out of the phrase list
  pub fn with_hidden<I, S>(mut self, labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.hidden.extend(labels.into_iter().map(Into::into));
    self
  }

  pub fn rule_id(&self, name: &str) -> Option<usize> {
    self.index.get(name).copied()
  }

  pub fn get(&self, name: &str) -> Option<&Rule> {
    self.rule_id(name).map(|id| &self.rules[id])
  }

  pub fn start_rule(&self) -> &Rule {
    &self.rules[self.start]
  }

  pub fn flattened(&self) -> &HashSet<String> {
    &self.flatten
  }

  pub fn hidden(&self) -> &HashSet<String> {
    &self.hidden
  }

  pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Err> {
    let path = path.as_ref();
    let src = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    src.parse()
  }
}

impl FromStr for Grammar {
  type Err = Err;

  /// Parses a grammar from a string. Assumes the first rule's symbol
  /// is the start symbol unless a `%start` directive names another.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (rules, directives) = parse(s)?;
    let mut grammar = Self::new(rules)?;

    for directive in directives {
      grammar = match directive {
        Directive::Start(name) => grammar.with_start(&name)?,
        Directive::Flatten(labels) => grammar.with_flatten(labels),
        Directive::Hide(labels) => grammar.with_hidden(labels),
      };
    }

    Ok(grammar)
  }
}
