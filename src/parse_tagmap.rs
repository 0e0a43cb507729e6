//! Reader for tag table files
//!
//! ```text
//! link ttmik "https://talktomeinkorean.com/";
//! pos NNG "Noun" "general noun";
//! map "때문:NNB;에:JKB" -> "때문에:PRP" [
//!   label: "because", rename: "PrepositionalPhrase:BecausePhrase",
//!   refs: "ttmik:" "htsk:",
//! ];
//! ```
use regex::Regex;

use crate::tagmap::{TagRule, TagTable, TagTableBuilder};
use crate::utils::{needed_char, needed_re, optional_char, parse_name, parse_string, skip_whitespace, snippet, ParseResult};
use crate::Err;

/// Parses a tag table file into a builder, ready for more rules or `build()`
pub fn parse(s: &str) -> Result<TagTableBuilder, Err> {
  let mut builder = TagTable::builder();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok(builder);
    }

    let (keyword, s) = parse_name(rem)?;
    let s = skip_whitespace(s);
    rem = match keyword {
      "link" => {
        let (prefix, s) = parse_name(s)?;
        let (url, s) = parse_string(skip_whitespace(s))?;
        builder = builder.link(prefix, url);
        end_statement(s)?
      }
      "pos" => {
        let (tag, s) = parse_name(s)?;
        let (label, s) = parse_string(skip_whitespace(s))?;
        let (description, s) = parse_string(skip_whitespace(s))?;
        builder = builder.pos(tag, label, description);
        end_statement(s)?
      }
      "map" => {
        let (rule, s) = parse_map(s)?;
        builder = builder.rule(rule);
        end_statement(s)?
      }
      other => return Err(format!("unknown statement {:?} at {}", other, snippet(rem)).into()),
    };
  }
}

fn end_statement(s: &str) -> Result<&str, Err> {
  let (_, s) = needed_char(';', skip_whitespace(s))?;
  Ok(s)
}

/// `"pattern" -> "replacement" [attributes]`
fn parse_map(s: &str) -> ParseResult<'_, TagRule> {
  #![allow(clippy::trivial_regex)]
  regex_static!(ARROW, "^->");

  let (pattern, s) = parse_string(s)?;
  let s = skip_whitespace(s);
  let (_, s) = needed_re(&ARROW, s).map_err(|e| -> Err { format!("map {:?}: {}", pattern, e).into() })?;
  let (replacement, s) = parse_string(skip_whitespace(s))?;
  let mut rule = TagRule::new(&pattern, &replacement)?;

  let s = skip_whitespace(s);
  let (open, mut rem) = optional_char('[', s);
  if open.is_none() {
    return Ok((rule, s));
  }

  loop {
    rem = skip_whitespace(rem);
    if let (Some(_), s) = optional_char(']', rem) {
      return Ok((rule, s));
    }

    let (key, s) = parse_name(rem)?;
    let (_, s) = needed_char(':', skip_whitespace(s))?;
    let (values, s) = parse_values(s).map_err(|e| -> Err { format!("map {:?} {}: {}", pattern, key, e).into() })?;

    rule = match key {
      "pos" => rule.with_pos(single(key, values)?),
      "label" => rule.with_label(single(key, values)?),
      "description" => rule.with_description(single(key, values)?),
      "notes" => rule.with_notes(single(key, values)?),
      "rename" => rule.with_rename(single(key, values)?.parse()?),
      "refs" => rule.with_refs(values),
      other => return Err(format!("map {:?}: unknown attribute {}", pattern, other).into()),
    };

    rem = optional_char(',', skip_whitespace(s)).1;
  }
}

/// One or more quoted strings
fn parse_values(s: &str) -> ParseResult<'_, Vec<String>> {
  let (first, mut rem) = parse_string(skip_whitespace(s))?;
  let mut values = vec![first];
  loop {
    let s = skip_whitespace(rem);
    if !s.starts_with('"') {
      return Ok((values, rem));
    }
    let (value, s) = parse_string(s)?;
    values.push(value);
    rem = s;
  }
}

fn single(key: &str, mut values: Vec<String>) -> Result<String, Err> {
  if values.len() != 1 {
    return Err(format!("{} takes one value, got {}", key, values.len()).into());
  }
  Ok(values.remove(0))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::token::{join_tokens, parse_tokens};

  #[test]
  fn test_parse_table() {
    let table: TagTable = r#"
      // citations
      link ttmik "https://talktomeinkorean.com/";
      pos PRP "Prepositional suffix" "ends a prepositional phrase";

      map "및:MAG" -> "및:CON";
      map "때문:NNB;에:JKB" -> "때문에:PRP" [
        pos: "PRP",
        label: "because",
        rename: "PrepositionalPhrase:BecausePhrase",
        refs: "ttmik:lessons/because" "htsk:",
        notes: "reason",
      ];
    "#
    .parse()
    .unwrap();

    assert_eq!(table.rules().len(), 2);
    let because = &table.rules()[0];
    assert_eq!(because.span(), 2);
    assert_eq!(because.label.as_deref(), Some("because"));
    assert_eq!(because.rename.as_ref().unwrap().from, "PrepositionalPhrase");
    assert_eq!(because.refs.len(), 2);
    assert!(because.ordinal().is_some());
    assert!(table.rules()[1].ordinal().is_none());

    let mapped = table.map_tags(&parse_tokens("때문:NNB;에:JKB;및:MAG").unwrap());
    assert_eq!(mapped[1].tag, "CON");
    assert_eq!(
      table.expand_link(&because.refs[0]),
      "https://talktomeinkorean.com/lessons/because"
    );
    assert!(join_tokens(&mapped).starts_with("때문에:PRP#"));
  }

  #[test]
  fn test_parse_errors() {
    assert!(parse(r#"mapp "a:A" -> "a:B";"#).is_err());
    assert!(parse(r#"map "a:A" -> "a:B""#).is_err());
    assert!(parse(r#"map "a:A" "a:B";"#).is_err());
    assert!(parse(r#"map "(a:A" -> "a:B";"#).is_err());
    assert!(parse(r#"map "a:A" -> "a:B" [ rename: "Nope" ];"#).is_err());
    assert!(parse(r#"map "a:A" -> "a:B" [ colour: "red" ];"#).is_err());
    assert!(parse(r#"map "a:A" -> "a:B" [ label: "x" "y" ];"#).is_err());
    assert!(parse(r#"link ttmik;"#).is_err());
  }
}
