//! Tree-sitter based TypeScript/JavaScript source parser.
//!
//! Produces a syntax tree with every comment collected in source order, so
//! later passes can attach comments to object keys by byte position.

use camino::Utf8Path;
use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("tree-sitter initialization failed")]
    TreeSitterInit,
    #[error("failed to parse source")]
    ParseFailed,
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TsLanguage {
    TypeScript,
    /// TypeScript with JSX. Also accepts plain JavaScript and JSX.
    #[default]
    Tsx,
}

impl TsLanguage {
    /// Grammar for a file path. Only `.ts`-family files use the non-JSX
    /// grammar, where `<T>expr` casts are legal.
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some("ts") | Some("mts") | Some("cts") => TsLanguage::TypeScript,
            _ => TsLanguage::Tsx,
        }
    }
}

/// A comment found anywhere in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub start: usize,
    pub end: usize,
    /// Raw text including delimiters.
    pub text: String,
}

impl Comment {
    /// Comment body without delimiters, trimmed.
    pub fn value(&self) -> String {
        if let Some(line) = self.text.strip_prefix("//") {
            return line.trim().to_string();
        }
        let Some(block) = self
            .text
            .strip_prefix("/*")
            .and_then(|s| s.strip_suffix("*/"))
        else {
            return self.text.trim().to_string();
        };

        if let Some(doc) = block.strip_prefix('*') {
            // JSDoc: drop the leading `*` gutter on each line
            doc.lines()
                .map(|line| line.trim().trim_start_matches('*').trim())
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            block.trim().to_string()
        }
    }
}

/// A parsed module: the tree, the text it borrows from, and its comments.
pub struct SourceTree<'src> {
    source: &'src str,
    tree: Tree,
    comments: Vec<Comment>,
}

impl<'src> SourceTree<'src> {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn text(&self, node: Node) -> &'src str {
        &self.source[node.byte_range()]
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }
}

pub struct SourceParser {
    parser: Parser,
}

impl SourceParser {
    pub fn new(language: TsLanguage) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let ts_language = match language {
            TsLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
            TsLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX,
        };
        parser
            .set_language(&ts_language.into())
            .map_err(|_| ParseError::TreeSitterInit)?;
        Ok(Self { parser })
    }

    /// Parse a module, rejecting any source tree-sitter had to recover from.
    pub fn parse<'src>(&mut self, source: &'src str) -> Result<SourceTree<'src>, ParseError> {
        let tree = self.parse_tolerant(source)?;
        if tree.root_node().has_error() {
            return Err(syntax_error(tree.root_node(), source));
        }

        let comments = collect_comments(&tree, source);
        Ok(SourceTree {
            source,
            tree,
            comments,
        })
    }

    /// Parse without rejecting errors. Host documents being edited are
    /// rarely valid, but their template literals usually still are.
    pub fn parse_tolerant(&mut self, source: &str) -> Result<Tree, ParseError> {
        self.parser
            .parse(source, None)
            .ok_or(ParseError::ParseFailed)
    }
}

fn collect_comments(tree: &Tree, source: &str) -> Vec<Comment> {
    let mut comments = Vec::new();
    let mut cursor = tree.walk();

    // Pre-order walk; comments come out in source order.
    'walk: loop {
        let node = cursor.node();
        if node.kind() == "comment" {
            comments.push(Comment {
                start: node.start_byte(),
                end: node.end_byte(),
                text: source[node.byte_range()].to_string(),
            });
        }

        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    comments
}

fn syntax_error(root: Node, source: &str) -> ParseError {
    let Some(node) = first_error(root) else {
        return ParseError::Syntax {
            line: 1,
            column: 1,
            message: "invalid syntax".to_string(),
        };
    };

    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text = source[node.byte_range()].trim();
        match text.chars().next() {
            Some(c) => format!("unexpected `{}`", c),
            None => "unexpected end of input".to_string(),
        }
    };

    ParseError::Syntax {
        line: position.row + 1,
        column: position.column + 1,
        message,
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}
