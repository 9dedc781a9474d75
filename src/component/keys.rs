//! Object keys with their leading comments.

use super::literal::{member_key, named_children};
use crate::languages::typescript::{Comment, SourceTree};
use crate::schema::PortDetail;
use tree_sitter::Node;

/// Every statically-named member of `object`, in source order, each with the
/// comment that immediately precedes it.
///
/// Computed keys, numeric keys and spreads are skipped.
pub fn extract_keys(tree: &SourceTree, object: Node, window: usize) -> Vec<PortDetail> {
    named_children(object)
        .into_iter()
        .filter_map(|member| {
            let name = member_key(tree, member)?;
            let comment =
                leading_comment(tree.comments(), member.start_byte(), window).map(Comment::value);
            Some(PortDetail { name, comment })
        })
        .collect()
}

/// The comment ending closest before `key_start`, if it ends no more than
/// `window` bytes before it.
///
/// `comments` must be in source order, which also orders them by end offset
/// since comments never overlap.
pub fn leading_comment(comments: &[Comment], key_start: usize, window: usize) -> Option<&Comment> {
    let before = comments.partition_point(|c| c.end < key_start);
    comments[..before]
        .last()
        .filter(|c| key_start - c.end <= window)
}
