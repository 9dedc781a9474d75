//! Helpers for reading statically-known values out of object literals.

use crate::languages::typescript::SourceTree;
use crate::schema::LiteralValue;
use tree_sitter::Node;

/// Named children of `node`, skipping comments.
pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Strip any number of wrapping parentheses.
pub(crate) fn unwrap_parens(mut node: Node) -> Node {
    while node.kind() == "parenthesized_expression" {
        match named_children(node).into_iter().next() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Static name of an object member: `key: v`, `"key": v`, `key() {}` or
/// shorthand `key`. Computed and numeric keys and spreads have none.
pub(crate) fn member_key(tree: &SourceTree, member: Node) -> Option<String> {
    match member.kind() {
        "pair" => key_name(tree, member.child_by_field_name("key")?),
        "method_definition" => key_name(tree, member.child_by_field_name("name")?),
        "shorthand_property_identifier" => Some(tree.text(member).to_string()),
        _ => None,
    }
}

fn key_name(tree: &SourceTree, key: Node) -> Option<String> {
    match key.kind() {
        "property_identifier" | "identifier" => Some(tree.text(key).to_string()),
        "string" => Some(string_value(tree, key)),
        _ => None,
    }
}

/// Value node of a `key: value` member.
pub(crate) fn pair_value(member: Node) -> Option<Node> {
    if member.kind() == "pair" {
        member.child_by_field_name("value")
    } else {
        None
    }
}

/// A literal value (string, number, boolean, null), if `node` is one.
pub(crate) fn literal_value(tree: &SourceTree, node: Node) -> Option<LiteralValue> {
    match node.kind() {
        "string" => Some(LiteralValue::String(string_value(tree, node))),
        "number" => Some(LiteralValue::Number(tree.text(node).to_string())),
        "true" => Some(LiteralValue::Bool(true)),
        "false" => Some(LiteralValue::Bool(false)),
        "null" => Some(LiteralValue::Null),
        _ => None,
    }
}

/// Decoded contents of a string literal node.
pub(crate) fn string_value(tree: &SourceTree, node: Node) -> String {
    let mut value = String::new();
    let mut cursor = node.walk();
    for part in node.named_children(&mut cursor) {
        match part.kind() {
            "string_fragment" => value.push_str(tree.text(part)),
            "escape_sequence" => decode_escape(tree.text(part), &mut value),
            _ => {}
        }
    }
    value
}

fn decode_escape(escape: &str, out: &mut String) {
    let body = escape.strip_prefix('\\').unwrap_or(escape);
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return;
    };
    let rest = chars.as_str();

    let decoded = match first {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'v' => Some('\u{b}'),
        '0' if rest.is_empty() => Some('\0'),
        // line continuation
        '\n' | '\r' | '\u{2028}' | '\u{2029}' => return,
        'x' => u32::from_str_radix(rest, 16).ok().and_then(char::from_u32),
        'u' => {
            let hex = rest.trim_start_matches('{').trim_end_matches('}');
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        }
        other => Some(other),
    };

    match decoded {
        Some(c) => out.push(c),
        None => out.push_str(escape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::typescript::{SourceParser, TsLanguage};

    fn first_string(source: &str) -> String {
        let mut parser = SourceParser::new(TsLanguage::Tsx).unwrap();
        let tree = parser.parse(source).unwrap();
        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            if node.kind() == "string" {
                return string_value(&tree, node);
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        panic!("no string literal in {source}");
    }

    #[test]
    fn test_string_value_plain() {
        assert_eq!(first_string(r#"x = "size";"#), "size");
        assert_eq!(first_string("x = 'size';"), "size");
        assert_eq!(first_string("x = '';"), "");
    }

    #[test]
    fn test_string_value_escapes() {
        assert_eq!(first_string(r#"x = "a\"b";"#), "a\"b");
        assert_eq!(first_string(r#"x = 'it\'s\n';"#), "it's\n");
        assert_eq!(first_string(r#"x = "A\x42\u{43}";"#), "ABC");
    }

    #[test]
    fn test_decode_escape_fallbacks() {
        let mut out = String::new();
        decode_escape(r"\q", &mut out);
        decode_escape(r"\xZZ", &mut out);
        assert_eq!(out, r"q\xZZ");
    }
}
