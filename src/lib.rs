#[macro_use]
extern crate lazy_static;

#[macro_use]
mod utils;

pub mod grammar;
pub mod korean;
pub mod lexer;
pub mod normalize;
pub mod parse_grammar;
pub mod parse_tagmap;
pub mod parser;
pub mod phrases;
pub mod rules;
pub mod syntree;
pub mod tagmap;
pub mod token;

use std::collections::BTreeMap;
use tracing::debug;

pub use crate::grammar::Grammar;
pub use crate::parser::{ParseError, ParseOptions, Parser};
pub use crate::phrases::PhraseEntry;
pub use crate::syntree::ParseTree;
pub use crate::tagmap::{PosEntry, Reference, TagTable};
pub use crate::token::Token;
pub use crate::utils::Err;

use crate::normalize::normalize;
use crate::phrases::phrase_list;
use crate::token::split_sentences;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
  /// Keep single-child nodes in the output tree
  pub full_detail: bool,
  pub parse: ParseOptions,
}

/// Everything known about one analyzed sentence
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
  pub tokens: Vec<Token>,
  /// `tokens` after tag synthesis
  pub mapped: Vec<Token>,
  pub tree: ParseTree,
  pub references: Vec<Reference>,
  pub glossary: BTreeMap<String, PosEntry>,
  pub phrases: Vec<Vec<PhraseEntry>>,
}

/// A grammar and the tag table that feeds it. Immutable, so one analyzer can
/// serve any number of threads.
#[derive(Debug, Clone)]
pub struct Analyzer {
  grammar: Grammar,
  tags: TagTable,
}

impl Analyzer {
  pub fn new(grammar: Grammar, tags: TagTable) -> Self {
    Self { grammar, tags }
  }

  /// The built-in Korean grammar and tag table
  pub fn korean() -> Result<Self, Err> {
    Ok(Self::new(korean::grammar()?, korean::tag_table()?))
  }

  pub fn grammar(&self) -> &Grammar {
    &self.grammar
  }

  pub fn tags(&self) -> &TagTable {
    &self.tags
  }

  /// Synthesizes tags, parses and normalizes a single sentence
  pub fn analyze(&self, tokens: &[Token], options: &Options) -> Result<Analysis, ParseError> {
    let mapped = self.tags.map_tags(tokens);
    let tree = self.grammar.parse(&mapped, options.parse)?;
    let tree = normalize(tree, self.grammar.flattened(), &self.tags, options.full_detail);
    debug!(tree = %tree.bracketed(), "normalized");

    Ok(Analysis {
      references: self.tags.references(&tree),
      glossary: self.tags.glossary_for(&mapped),
      phrases: phrase_list(&tree, self.grammar.hidden()),
      tokens: tokens.to_vec(),
      mapped,
      tree,
    })
  }

  /// Splits a token stream after each sentence-final mark and analyzes every
  /// sentence on its own
  pub fn analyze_text(&self, tokens: Vec<Token>, options: &Options) -> Vec<Result<Analysis, ParseError>> {
    split_sentences(tokens)
      .iter()
      .map(|sentence| self.analyze(sentence, options))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntree::SynTree;
  use crate::token::parse_tokens;

  fn find<'a>(tree: &'a ParseTree, label: &str) -> Option<&'a ParseTree> {
    if tree.label() == Some(label) {
      return Some(tree);
    }
    tree.children().iter().find_map(|c| find(c, label))
  }

  fn analyze(s: &str) -> Result<Analysis, ParseError> {
    let analyzer = Analyzer::korean().unwrap();
    analyzer.analyze(&parse_tokens(s).unwrap(), &Options::default())
  }

  #[test]
  fn test_noun_phrase_and_predicate() {
    let analysis = analyze("저:MM;작:VA;은:ETM;소년:NNG;밥:NNG;을:JKO;먹:VV;다:EF;.:SF").unwrap();
    let tree = &analysis.tree;

    assert_eq!(tree.label(), Some("Sentence"));
    assert_eq!(tree.span(), (0, 8));
    assert_eq!(
      tree.bracketed(),
      "[Sentence [NounPhrase 저:MM [AdjectivalPhrase [Adjective 작:VA 은:ETM] 소년:NNG]] \
       [Predicate [VerbPhrase [ObjectPhrase 밥:NNG 을:JKO] 먹:VV] 다:EF]]"
    );
    assert_eq!(tree.children()[0].span(), (0, 4));
    assert_eq!(tree.children()[1].span(), (4, 8));
    assert_eq!(find(tree, "ObjectPhrase").unwrap().span(), (4, 6));

    assert_eq!(analysis.phrases.len(), 2);
    assert_eq!(analysis.phrases[1].last(), Some(&PhraseEntry::Label("Predicate".into())));
    assert!(!analysis.phrases[0].contains(&PhraseEntry::Label("NounPhrase".into())));
    assert!(analysis.references.is_empty());
    assert_eq!(analysis.glossary["JKO"].label, "Object marker");
  }

  #[test]
  fn test_full_detail_keeps_chains() {
    let analyzer = Analyzer::korean().unwrap();
    let tokens = parse_tokens("밥:NNG;을:JKO;먹:VV;다:EF").unwrap();
    let options = Options {
      full_detail: true,
      ..Default::default()
    };

    let short = analyzer.analyze(&tokens, &Options::default()).unwrap().tree;
    let full = analyzer.analyze(&tokens, &options).unwrap().tree;
    assert_eq!(short.leaves(), full.leaves());
    assert!(full.depth() > short.depth());
    assert!(find(&full, "SimpleNoun").is_some());
    assert!(find(&full, "MainClause").is_none());
  }

  #[test]
  fn test_missing_ending_reports_end() {
    assert_eq!(
      analyze("밥:NNG;을:JKO;먹:VV").unwrap_err(),
      ParseError::UnexpectedEnd { position: 3 }
    );
  }

  #[test]
  fn test_unknown_tag_reports_token() {
    assert_eq!(
      analyze("밥:NNG;을:JKO;??:ZZ;먹:VV;다:EF;.:SF").unwrap_err(),
      ParseError::UnexpectedToken {
        position: 2,
        token: Token::new("??", "ZZ"),
      }
    );
  }

  #[test]
  fn test_because_renames_prepositional_phrase() {
    let analysis =
      analyze("중국:NNP;음식:NNG;을:JKO;좋아하:VV;기:ETN;때문:NNB;에:JKB;밥:NNG;을:JKO;먹:VV;었:EP;어요:EF;.:SF").unwrap();

    let because = find(&analysis.tree, "BecausePhrase").unwrap();
    assert_eq!(because.span(), (3, 6));
    assert!(find(&analysis.tree, "PrepositionalPhrase").is_none());

    assert_eq!(analysis.references.len(), 1);
    let reference = &analysis.references[0];
    assert_eq!(reference.word, "때문에");
    assert_eq!(reference.label.as_deref(), Some("because"));
    assert_eq!(
      reference.links,
      vec!["https://talktomeinkorean.com/", "https://www.howtostudykorean.com/"]
    );

    let nominalizer = analysis.mapped.iter().find(|t| t.word == "기").unwrap();
    assert_eq!(analysis.glossary[&nominalizer.tag].label, "nominalizer -기");
  }

  #[test]
  fn test_analyze_text_splits_sentences() {
    let analyzer = Analyzer::korean().unwrap();
    let tokens = parse_tokens("밥:NNG;을:JKO;먹:VV;다:EF;.:SF;가:VV;자:EF;!:SF;먹:VV").unwrap();
    let results = analyzer.analyze_text(tokens, &Options::default());

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert_eq!(results[2], Err(ParseError::UnexpectedEnd { position: 1 }));
  }

  #[test]
  fn test_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Analyzer>();

    let analyzer = Analyzer::korean().unwrap();
    let tokens = parse_tokens("제:NP;친구:NNG;는:JX;아주:MAG;예쁘:VA;ㄴ:ETM;차:NNG;를:JKO;사:VV;았:EP;어요:EF").unwrap();
    let expected = analyzer.analyze(&tokens, &Options::default()).unwrap();

    std::thread::scope(|s| {
      let handles = (0..4)
        .map(|_| s.spawn(|| analyzer.analyze(&tokens, &Options::default())))
        .collect::<Vec<_>>();
      for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), expected);
      }
    });
  }

  #[test]
  fn test_leaves_keep_token_order() {
    let tokens = parse_tokens("빵:NNG;네:MM;개:NNB;를:JKO;주:VV;세요:EF").unwrap();
    let analysis = analyze("빵:NNG;네:MM;개:NNB;를:JKO;주:VV;세요:EF").unwrap();
    let words = analysis
      .tree
      .leaves()
      .iter()
      .map(|w| w.value.clone())
      .collect::<Vec<_>>();
    assert_eq!(words, tokens);
    assert!(matches!(analysis.tree, SynTree::Branch(_, _)));
  }
}
