//! Host documents: cursor positions, words, and embedded graphs.
//!
//! A graph lives either in its own `.fbp` file or inside a JavaScript or
//! TypeScript file as a template literal whose text starts with `# fbp`:
//!
//! ```text
//! const flow = `# fbp
//! Read(./read) OUT -> IN Log(log)
//! `;
//! ```

use crate::languages::typescript::{ParseError, SourceParser, TsLanguage};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use tree_sitter::Node;

/// Marker opening an embedded graph literal.
pub const EMBEDDED_GRAPH_MARKER: &str = "# fbp";

/// Zero-based line and character (Unicode scalar values) in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TextPosition {
    pub line: usize,
    pub character: usize,
}

impl TextPosition {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// The whole document is graph text.
    Graph,
    /// JavaScript or TypeScript that may embed graphs.
    Host(TsLanguage),
}

impl DocumentKind {
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some("js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts") => {
                DocumentKind::Host(TsLanguage::from_path(path))
            }
            _ => DocumentKind::Graph,
        }
    }
}

/// An open document as the editor sees it.
#[derive(Debug, Clone)]
pub struct HostDocument {
    pub path: Utf8PathBuf,
    pub text: String,
}

impl HostDocument {
    pub fn new(path: impl Into<Utf8PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_path(&self.path)
    }

    /// Text of every graph in the document.
    pub fn graphs(&self) -> Result<Vec<&str>, ParseError> {
        match self.kind() {
            DocumentKind::Graph => Ok(vec![self.text.as_str()]),
            DocumentKind::Host(language) => Ok(embedded_graphs(&self.text, language)?
                .into_iter()
                .map(|span| &self.text[span.start..span.end])
                .collect()),
        }
    }

    /// Byte offset of `position`. Characters past the end of a line clamp to
    /// the line end; lines past the end of the document have no offset.
    pub fn offset_at(&self, position: TextPosition) -> Option<usize> {
        let mut line_start = 0;
        for _ in 0..position.line {
            line_start += self.text[line_start..].find('\n')? + 1;
        }
        let line = &self.text[line_start..];
        let line = &line[..line.find('\n').unwrap_or(line.len())];
        let column = line
            .char_indices()
            .nth(position.character)
            .map_or(line.len(), |(i, _)| i);
        Some(line_start + column)
    }
}

/// A word and its byte range in the text it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// The `[A-Za-z0-9_]+` run touching `offset`, including a cursor placed
/// just after the word.
pub fn word_at(text: &str, offset: usize) -> Option<Word> {
    if offset > text.len() || !text.is_char_boundary(offset) {
        return None;
    }
    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map_or(offset, |(i, _)| i);
    let end = text[offset..]
        .char_indices()
        .find(|(_, c)| !is_word_char(*c))
        .map_or(text.len(), |(i, _)| offset + i);

    (start < end).then(|| Word {
        text: text[start..end].to_string(),
        start,
        end,
    })
}

/// Byte range of an embedded graph's text inside its host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphSpan {
    pub start: usize,
    pub end: usize,
}

/// The `# fbp` template literal containing `offset`, if any.
///
/// Host documents are parsed tolerantly: a file with an unrelated syntax
/// error elsewhere still yields its graphs.
pub fn embedded_graph_at(
    text: &str,
    offset: usize,
    language: TsLanguage,
) -> Result<Option<GraphSpan>, ParseError> {
    let mut parser = SourceParser::new(language)?;
    let tree = parser.parse_tolerant(text)?;
    Ok(find_template(tree.root_node(), text, offset))
}

fn find_template(node: Node, text: &str, offset: usize) -> Option<GraphSpan> {
    if offset < node.start_byte() || offset > node.end_byte() {
        return None;
    }

    if let Some(span) = graph_span(node, text)
        && span.start <= offset
        && offset <= span.end
    {
        return Some(span);
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(|child| find_template(child, text, offset))
}

/// Every `# fbp` template literal in a host document, in source order.
pub fn embedded_graphs(text: &str, language: TsLanguage) -> Result<Vec<GraphSpan>, ParseError> {
    let mut parser = SourceParser::new(language)?;
    let tree = parser.parse_tolerant(text)?;
    let mut spans = Vec::new();
    collect_templates(tree.root_node(), text, &mut spans);
    Ok(spans)
}

fn collect_templates(node: Node, text: &str, spans: &mut Vec<GraphSpan>) {
    if let Some(span) = graph_span(node, text) {
        spans.push(span);
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_templates(child, text, spans);
    }
}

/// The text span of `node` if it is a template literal opening with the marker.
fn graph_span(node: Node, text: &str) -> Option<GraphSpan> {
    if node.kind() != "template_string" {
        return None;
    }
    let span = GraphSpan {
        start: node.start_byte() + 1,
        end: node.end_byte().saturating_sub(1),
    };
    (span.start <= span.end
        && text[span.start..span.end]
            .trim_start()
            .starts_with(EMBEDDED_GRAPH_MARKER))
    .then_some(span)
}

/// Graph text around a cursor, and the word under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphContext {
    pub graph: String,
    /// Offsets relative to `graph`.
    pub word: Word,
}

/// Locate the graph and word under `position`.
///
/// Returns `None` when the cursor is not on a word, or, in a host file, not
/// inside an embedded graph.
pub fn graph_context(
    document: &HostDocument,
    position: TextPosition,
) -> Result<Option<GraphContext>, ParseError> {
    let Some(offset) = document.offset_at(position) else {
        return Ok(None);
    };

    let span = match document.kind() {
        DocumentKind::Graph => GraphSpan {
            start: 0,
            end: document.text.len(),
        },
        DocumentKind::Host(language) => match embedded_graph_at(&document.text, offset, language)? {
            Some(span) => span,
            None => return Ok(None),
        },
    };

    let graph = &document.text[span.start..span.end];
    Ok(word_at(graph, offset - span.start).map(|word| GraphContext {
        graph: graph.to_string(),
        word,
    }))
}
