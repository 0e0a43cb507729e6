use std::collections::HashSet;
use tracing::trace;

use crate::syntree::{ParseTree, SynTree};
use crate::tagmap::{Rename, TagTable};

/// Post-parse cleanup, in order: drop the sentence-final mark, splice out
/// `flatten` labels, apply the renames the tag table attaches to leaves, then
/// (unless `full_detail`) collapse single-child nodes below the root.
pub fn normalize(mut tree: ParseTree, flatten: &HashSet<String>, tags: &TagTable, full_detail: bool) -> ParseTree {
  drop_sentence_end(&mut tree);
  flatten_labels(&mut tree, flatten);
  remap_labels(&mut tree, tags);
  if !full_detail {
    tree = elide(tree);
  }
  tree.recompute_spans();
  tree
}

/// Removes a trailing `SF` leaf and any ancestors it leaves empty. The root stays.
pub fn drop_sentence_end(tree: &mut ParseTree) {
  if let SynTree::Branch(_, children) = tree {
    if children.last_mut().is_some_and(pop_sentence_end) {
      children.pop();
    }
  }
}

/// True if `node` should be removed from its parent
fn pop_sentence_end(node: &mut ParseTree) -> bool {
  match node {
    SynTree::Leaf(w) => w.value.is_sentence_final(),
    SynTree::Branch(_, children) => {
      if children.last_mut().is_some_and(pop_sentence_end) {
        children.pop();
        children.is_empty()
      } else {
        false
      }
    }
  }
}

/// Replaces every node labeled with one of `labels` by its children, bottom-up
pub fn flatten_labels(tree: &mut ParseTree, labels: &HashSet<String>) {
  if let SynTree::Branch(_, children) = tree {
    for mut child in std::mem::take(children) {
      flatten_labels(&mut child, labels);
      match child {
        SynTree::Branch(c, grandchildren) if labels.contains(&c.value) => children.extend(grandchildren),
        other => children.push(other),
      }
    }
  }
}

/// Renames the nearest ancestor of each synthetic-tagged leaf whose label
/// matches the leaf rule's `from` label. Each leaf renames at most one node;
/// a node can be renamed again by another leaf whose `from` is its new label.
pub fn remap_labels(tree: &mut ParseTree, tags: &TagTable) {
  let unclaimed = pending_renames(tree, tags);
  for rename in unclaimed {
    trace!(%rename, "no ancestor to rename");
  }
}

fn pending_renames<'a>(node: &mut ParseTree, tags: &'a TagTable) -> Vec<&'a Rename> {
  match node {
    SynTree::Leaf(w) => tags.rename_for(&w.value.tag).into_iter().collect(),
    SynTree::Branch(c, children) => {
      let mut pending = Vec::new();
      for child in children.iter_mut() {
        pending.extend(pending_renames(child, tags));
      }
      while let Some(idx) = pending.iter().position(|r| r.from == c.value) {
        let rename = pending.remove(idx);
        trace!(%rename, span = ?c.span, "rename");
        c.value = rename.to.clone();
      }
      pending
    }
  }
}

/// Collapses single-child nodes into their child everywhere below the root
pub fn elide(tree: ParseTree) -> ParseTree {
  match tree {
    SynTree::Branch(c, children) => SynTree::Branch(c, children.into_iter().map(collapse).collect()),
    leaf => leaf,
  }
}

fn collapse(node: ParseTree) -> ParseTree {
  match node {
    SynTree::Branch(_, mut children) if children.len() == 1 => collapse(children.remove(0)),
    SynTree::Branch(c, children) => SynTree::Branch(c, children.into_iter().map(collapse).collect()),
    leaf => leaf,
  }
}
