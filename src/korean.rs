//! The built-in Korean grammar and tag table

use crate::grammar::Grammar;
use crate::tagmap::TagTable;
use crate::Err;

pub const GRAMMAR: &str = include_str!("../data/korean.grammar");
pub const TAG_MAP: &str = include_str!("../data/korean.tagmap");

pub fn grammar() -> Result<Grammar, Err> {
  GRAMMAR.parse()
}

/// Builds a fresh table; every call registers new rule ordinals
pub fn tag_table() -> Result<TagTable, Err> {
  TAG_MAP.parse()
}
