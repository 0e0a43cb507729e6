use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

use crate::parse_tagmap;
use crate::syntree::ParseTree;
use crate::token::{join_tokens, parse_tokens, Token};
use crate::Err;

/// Hands out rule ordinals. Shared by every table in the process so a
/// synthetic tag names exactly one rule.
static NEXT_ORDINAL: AtomicUsize = AtomicUsize::new(1);

/// `OldLabel:NewLabel`: the node to rename above a leaf, and its new name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
  pub from: String,
  pub to: String,
}

impl FromStr for Rename {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once(':') {
      Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => Ok(Self {
        from: from.trim().to_string(),
        to: to.trim().to_string(),
      }),
      _ => Err(format!("rename needs an old:new form, got {:?}", s).into()),
    }
  }
}

impl fmt::Display for Rename {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.from, self.to)
  }
}

/// Glossary entry for a part-of-speech tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosEntry {
  pub label: String,
  pub description: String,
}

/// A rewrite rule over a window of `word:tag` tokens
#[derive(Debug, Clone)]
pub struct TagRule {
  pattern: String,
  re: Regex,
  replacement: String,
  base: String,
  span: usize,
  pub pos: Option<String>,
  pub label: Option<String>,
  pub description: Option<String>,
  pub rename: Option<Rename>,
  pub refs: Vec<String>,
  pub notes: Option<String>,
  ordinal: Option<usize>,
  order: usize,
}

impl TagRule {
  /// `pattern` is matched against the `;`-joined window it spans, `replacement`
  /// may use `${n}` captures and must give every produced token a tag.
  /// Alternatives in the pattern must all span the same number of tokens.
  pub fn new(pattern: &str, replacement: &str) -> Result<Self, Err> {
    let re = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| format!("pattern {:?}: {}", pattern, e))?;
    let span = pattern_span(pattern)
      .ok_or_else(|| format!("pattern {:?}: alternatives span different numbers of tokens", pattern))?;

    let mut base = None;
    for part in replacement.split(';') {
      match part.rsplit_once(':') {
        Some((_, tag)) if !tag.trim().is_empty() && !tag.contains('$') => base = Some(tag.trim()),
        _ => return Err(format!("replacement {:?}: {:?} has no literal tag", replacement, part).into()),
      }
    }
    let base = base.ok_or_else(|| format!("empty replacement for {:?}", pattern))?;

    Ok(Self {
      pattern: pattern.to_string(),
      re,
      replacement: replacement.to_string(),
      base: base.to_string(),
      span,
      pos: None,
      label: None,
      description: None,
      rename: None,
      refs: Vec::new(),
      notes: None,
      ordinal: None,
      order: 0,
    })
  }

  pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
    self.pos = Some(pos.into());
    self
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = Some(label.into());
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  pub fn with_rename(mut self, rename: Rename) -> Self {
    self.rename = Some(rename);
    self
  }

  pub fn with_refs<I, S>(mut self, refs: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.refs.extend(refs.into_iter().map(Into::into));
    self
  }

  pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
    self.notes = Some(notes.into());
    self
  }

  pub fn pattern(&self) -> &str {
    &self.pattern
  }

  pub fn replacement(&self) -> &str {
    &self.replacement
  }

  /// Number of tokens the pattern covers
  pub fn span(&self) -> usize {
    self.span
  }

  /// Tag of the replacement's last token, before any ordinal suffix
  pub fn base(&self) -> &str {
    &self.base
  }

  /// The glossary category: the declared part of speech, else the base tag
  pub fn category(&self) -> &str {
    self.pos.as_deref().unwrap_or(&self.base)
  }

  /// Set at registration for rules carrying a rename, references or a label
  pub fn ordinal(&self) -> Option<usize> {
    self.ordinal
  }

  fn has_metadata(&self) -> bool {
    self.rename.is_some() || !self.refs.is_empty() || self.label.is_some()
  }

  fn rewrite(&self, window: &str) -> Option<Vec<Token>> {
    let caps = self.re.captures(window)?;
    let mut expanded = String::new();
    caps.expand(&self.replacement, &mut expanded);
    match parse_tokens(&expanded) {
      Ok(tokens) if !tokens.is_empty() => Some(tokens),
      _ => {
        trace!(pattern = %self.pattern, %expanded, "replacement did not expand to tokens");
        None
      }
    }
  }
}

/// Number of `;`-separated tokens a pattern spans. Semicolons inside
/// character classes or escaped don't separate tokens. None if two
/// alternatives of a group span different numbers of tokens.
fn pattern_span(pattern: &str) -> Option<usize> {
  // one entry per open group: (separators of finished alternatives, separators so far)
  let mut groups: Vec<(Option<usize>, usize)> = vec![(None, 0)];
  let mut in_class = false;
  let mut escaped = false;

  fn close(alts: Option<usize>, current: usize) -> Option<usize> {
    match alts {
      Some(n) if n != current => None,
      _ => Some(current),
    }
  }

  for c in pattern.chars() {
    match c {
      _ if escaped => escaped = false,
      '\\' => escaped = true,
      _ if in_class => in_class = c != ']',
      '[' => in_class = true,
      '(' => groups.push((None, 0)),
      ')' if groups.len() > 1 => {
        let (alts, current) = groups.pop()?;
        let inner = close(alts, current)?;
        groups.last_mut()?.1 += inner;
      }
      '|' => {
        let (alts, current) = groups.last_mut()?;
        *alts = Some(close(*alts, *current)?);
        *current = 0;
      }
      ';' => groups.last_mut()?.1 += 1,
      _ => {}
    }
  }

  let (alts, current) = groups.pop()?;
  close(alts, current).map(|separators| separators + 1)
}

/// A tag minted by a metadata-bearing rule: `BASE#ORDINAL.OCCURRENCE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticTag<'a> {
  pub base: &'a str,
  pub ordinal: usize,
  pub occurrence: usize,
}

impl<'a> SyntheticTag<'a> {
  pub fn parse(tag: &'a str) -> Option<Self> {
    let (base, suffix) = tag.rsplit_once('#')?;
    let (ordinal, occurrence) = suffix.split_once('.')?;
    if base.is_empty() {
      return None;
    }
    Some(Self {
      base,
      ordinal: ordinal.parse().ok()?,
      occurrence: occurrence.parse().ok()?,
    })
  }
}

impl fmt::Display for SyntheticTag<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}#{}.{}", self.base, self.ordinal, self.occurrence)
  }
}

/// A citation attached to a word of the analyzed sentence
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
  pub word: String,
  pub tag: String,
  pub label: Option<String>,
  pub links: Vec<String>,
  pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct TagTableBuilder {
  rules: Vec<TagRule>,
  links: BTreeMap<String, String>,
  pos: BTreeMap<String, PosEntry>,
}

impl TagTableBuilder {
  /// `prefix:path` references expand to `url` followed by the path
  pub fn link(mut self, prefix: impl Into<String>, url: impl Into<String>) -> Self {
    self.links.insert(prefix.into(), url.into());
    self
  }

  pub fn pos(mut self, tag: impl Into<String>, label: impl Into<String>, description: impl Into<String>) -> Self {
    self.pos.insert(
      tag.into(),
      PosEntry {
        label: label.into(),
        description: description.into(),
      },
    );
    self
  }

  pub fn rule(mut self, mut rule: TagRule) -> Self {
    rule.order = self.rules.len();
    if rule.has_metadata() {
      rule.ordinal = Some(NEXT_ORDINAL.fetch_add(1, Ordering::Relaxed));
    }
    self.rules.push(rule);
    self
  }

  pub fn build(self) -> TagTable {
    let mut rules = self.rules;
    rules.sort_by(|a, b| {
      b.span
        .cmp(&a.span)
        .then_with(|| b.pattern.chars().count().cmp(&a.pattern.chars().count()))
        .then_with(|| a.order.cmp(&b.order))
    });

    let by_ordinal = rules
      .iter()
      .enumerate()
      .filter_map(|(idx, r)| r.ordinal.map(|ord| (ord, idx)))
      .collect();

    TagTable {
      rules,
      by_ordinal,
      links: self.links,
      pos: self.pos,
    }
  }
}

/// Ordered tag rewrite rules plus the lookups the tree normalizer and the
/// reference tables need. Immutable once built.
#[derive(Debug, Clone)]
pub struct TagTable {
  rules: Vec<TagRule>,
  by_ordinal: HashMap<usize, usize>,
  links: BTreeMap<String, String>,
  pos: BTreeMap<String, PosEntry>,
}

impl TagTable {
  pub fn builder() -> TagTableBuilder {
    TagTableBuilder::default()
  }

  /// Rules in the order they are applied
  pub fn rules(&self) -> &[TagRule] {
    &self.rules
  }

  /// Rewrites the tags of a sentence. Each rule makes one left-to-right pass,
  /// highest priority first; a replaced run is skipped, so no rule sees its
  /// own output.
  pub fn map_tags(&self, tokens: &[Token]) -> Vec<Token> {
    let mut tokens = tokens.to_vec();
    let mut occurrences: HashMap<usize, usize> = HashMap::new();

    for rule in self.rules.iter() {
      let mut idx = 0;
      while idx + rule.span <= tokens.len() {
        let window = join_tokens(&tokens[idx..idx + rule.span]);
        let Some(mut replacement) = rule.rewrite(&window) else {
          idx += 1;
          continue;
        };

        if let Some(ordinal) = rule.ordinal {
          let occurrence = occurrences.entry(ordinal).or_insert(0);
          *occurrence += 1;
          if let Some(head) = replacement.last_mut() {
            head.tag = SyntheticTag {
              base: &rule.base,
              ordinal,
              occurrence: *occurrence,
            }
            .to_string();
          }
        }

        debug!(%window, replacement = %join_tokens(&replacement), "tag rewrite");
        let len = replacement.len();
        tokens.splice(idx..idx + rule.span, replacement);
        idx += len;
      }
    }

    tokens
  }

  pub fn rule_by_ordinal(&self, ordinal: usize) -> Option<&TagRule> {
    self.by_ordinal.get(&ordinal).map(|&idx| &self.rules[idx])
  }

  /// The rule that minted a synthetic tag
  pub fn rule_for(&self, tag: &str) -> Option<&TagRule> {
    SyntheticTag::parse(tag).and_then(|s| self.rule_by_ordinal(s.ordinal))
  }

  pub fn rename_for(&self, tag: &str) -> Option<&Rename> {
    self.rule_for(tag).and_then(|r| r.rename.as_ref())
  }

  /// Expands a `prefix:path` citation through the link table; unknown
  /// prefixes are returned unchanged
  pub fn expand_link(&self, reference: &str) -> String {
    match reference.split_once(':') {
      Some((prefix, path)) => match self.links.get(prefix) {
        Some(url) => format!("{}{}", url, path),
        None => reference.to_string(),
      },
      None => reference.to_string(),
    }
  }

  /// Label and description for a tag. Synthetic tags prefer their rule's own
  /// text and fall back to the glossary entry for the rule's category.
  pub fn describe(&self, tag: &str) -> Option<PosEntry> {
    if let Some(rule) = self.rule_for(tag) {
      let fallback = self.pos.get(rule.category());
      let label = rule
        .label
        .clone()
        .or_else(|| fallback.map(|e| e.label.clone()))?;
      let description = rule
        .description
        .clone()
        .or_else(|| fallback.map(|e| e.description.clone()))
        .unwrap_or_default();
      return Some(PosEntry { label, description });
    }

    let base = SyntheticTag::parse(tag).map_or(tag, |s| s.base);
    self.pos.get(base).cloned()
  }

  /// Glossary entries for every tag used by `tokens`
  pub fn glossary_for(&self, tokens: &[Token]) -> BTreeMap<String, PosEntry> {
    tokens
      .iter()
      .filter_map(|t| self.describe(&t.tag).map(|e| (t.tag.clone(), e)))
      .collect()
  }

  /// One entry per leaf whose rule carries references or notes, in leaf order
  pub fn references(&self, tree: &ParseTree) -> Vec<Reference> {
    tree
      .leaves()
      .into_iter()
      .filter_map(|w| {
        let rule = self.rule_for(&w.value.tag)?;
        if rule.refs.is_empty() && rule.notes.is_none() {
          return None;
        }
        Some(Reference {
          word: w.value.word.clone(),
          tag: w.value.tag.clone(),
          label: rule.label.clone(),
          links: rule.refs.iter().map(|r| self.expand_link(r)).collect(),
          notes: rule.notes.clone(),
        })
      })
      .collect()
  }

  pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Err> {
    let path = path.as_ref();
    let src = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    src.parse()
  }
}

impl FromStr for TagTable {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(parse_tagmap::parse(s)?.build())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntree::{Constituent, SynTree, Word};

  fn tags(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().map(|t| t.tag.as_str()).collect()
  }

  #[test]
  fn test_longer_patterns_apply_first() {
    let table = TagTable::builder()
      .rule(TagRule::new("나:B", "나:Y").unwrap())
      .rule(TagRule::new("가:A;나:B", "가나:X").unwrap())
      .build();
    assert_eq!(table.rules()[0].pattern(), "가:A;나:B");

    let mapped = table.map_tags(&parse_tokens("가:A;나:B;나:B").unwrap());
    assert_eq!(join_tokens(&mapped), "가나:X;나:Y");
  }

  #[test]
  fn test_single_pass() {
    let table = TagTable::builder()
      .rule(TagRule::new("(.):A", "${1}:A;${1}:A").unwrap())
      .build();
    let mapped = table.map_tags(&parse_tokens("x:A;y:A").unwrap());
    assert_eq!(join_tokens(&mapped), "x:A;x:A;y:A;y:A");
  }

  #[test]
  fn test_occurrences_share_one_rule() {
    let table = TagTable::builder()
      .rule(
        TagRule::new("때문:NNB;에:JKB", "때문에:PRP")
          .unwrap()
          .with_rename("PrepositionalPhrase:BecausePhrase".parse().unwrap()),
      )
      .build();
    let mapped = table.map_tags(&parse_tokens("때문:NNB;에:JKB;밥:NNG;때문:NNB;에:JKB").unwrap());
    assert_eq!(mapped.len(), 3);

    let first = SyntheticTag::parse(&mapped[0].tag).unwrap();
    let second = SyntheticTag::parse(&mapped[2].tag).unwrap();
    assert_eq!(first.base, "PRP");
    assert_eq!((first.occurrence, second.occurrence), (1, 2));
    assert_ne!(mapped[0].tag, mapped[2].tag);
    assert_eq!(table.rename_for(&mapped[0].tag).unwrap().to, "BecausePhrase");
    assert_eq!(table.rename_for(&mapped[2].tag), table.rename_for(&mapped[0].tag));
    assert!(table.rule_for("NNG").is_none());
  }

  #[test]
  fn test_plain_rules_get_no_ordinal() {
    let table = TagTable::builder().rule(TagRule::new("및:MAG", "및:CON").unwrap()).build();
    assert_eq!(table.rules()[0].ordinal(), None);
    assert_eq!(tags(&table.map_tags(&parse_tokens("및:MAG").unwrap())), vec!["CON"]);
  }

  #[test]
  fn test_captures_and_merging() {
    let table = TagTable::builder()
      .rule(TagRule::new("([^:;]+):VA;게:EC", "${1}게:MAG").unwrap())
      .rule(TagRule::new("에:JKB;(대하|관하):VV;([^:]+):EC", "에 ${1}${2}:PRP").unwrap())
      .build();
    assert_eq!(table.rules()[0].span(), 3);

    let mapped = table.map_tags(&parse_tokens("맛있:VA;게:EC;이것:NP;에:JKB;대하:VV;여:EC").unwrap());
    assert_eq!(join_tokens(&mapped), "맛있게:MAG;이것:NP;에 대하여:PRP");
  }

  #[test]
  fn test_pattern_span_ignores_class_semicolons() {
    assert_eq!(pattern_span("([^:;]+):VA;게:EC"), Some(2));
    assert_eq!(pattern_span(r"a\;b:X"), Some(1));
    assert_eq!(pattern_span("기:(ETN|NNG)"), Some(1));
  }

  #[test]
  fn test_alternatives_must_span_alike() {
    assert_eq!(pattern_span("(a:A;b:B|c:C;d:D)"), Some(2));
    assert_eq!(pattern_span("x:X;(a:A;b:B|c:C;(d|e):D)"), Some(3));
    assert_eq!(pattern_span("(a:A;b:B|c:C)"), None);
    assert_eq!(pattern_span("a:A;b:B|c:C"), None);
    assert!(TagRule::new("(a:A;b:B|c:C)", "x:X").is_err());
    assert!(TagRule::new("(a:A;b:B|c:C;d:D)", "x:X").is_ok());
  }

  #[test]
  fn test_bad_rules() {
    assert!(TagRule::new("(:A", "a:B").is_err());
    assert!(TagRule::new("a:A", "b").is_err());
    assert!(TagRule::new("(.):A", "x:${1}").is_err());
    assert!("NoColon".parse::<Rename>().is_err());
    assert!("Old:".parse::<Rename>().is_err());
  }

  #[test]
  fn test_synthetic_tag_parse() {
    let tag = SyntheticTag::parse("PRP#12.3").unwrap();
    assert_eq!((tag.base, tag.ordinal, tag.occurrence), ("PRP", 12, 3));
    assert_eq!(tag.to_string(), "PRP#12.3");
    assert_eq!(SyntheticTag::parse("PRP"), None);
    assert_eq!(SyntheticTag::parse("#1.1"), None);
    assert_eq!(SyntheticTag::parse("PRP#x.1"), None);
  }

  #[test]
  fn test_references_describe_and_links() {
    let table = TagTable::builder()
      .link("ttmik", "https://talktomeinkorean.com/")
      .pos("PRP", "Prepositional suffix", "a suffix forming a prepositional phrase")
      .pos("NNG", "Noun", "general noun")
      .rule(
        TagRule::new("전:NNG;에:JKB", "전에:PRP")
          .unwrap()
          .with_refs(["ttmik:lessons/level-3-lesson-10", "wiki:전"])
          .with_notes("time before"),
      )
      .build();
    let mapped = table.map_tags(&parse_tokens("밥:NNG;전:NNG;에:JKB").unwrap());

    let tree = SynTree::Branch(
      Constituent {
        value: "S".to_string(),
        span: (0, 2),
      },
      mapped
        .iter()
        .enumerate()
        .map(|(idx, t)| {
          SynTree::Leaf(Word {
            value: t.clone(),
            span: (idx, idx + 1),
          })
        })
        .collect(),
    );

    let refs = table.references(&tree);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].word, "전에");
    assert_eq!(
      refs[0].links,
      vec!["https://talktomeinkorean.com/lessons/level-3-lesson-10", "wiki:전"]
    );
    assert_eq!(refs[0].notes.as_deref(), Some("time before"));

    let glossary = table.glossary_for(&mapped);
    assert_eq!(glossary["NNG"].label, "Noun");
    assert_eq!(glossary[&mapped[1].tag].label, "Prepositional suffix");
    assert_eq!(table.describe("XYZ"), None);
  }
}
