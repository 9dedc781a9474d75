//! FBP graph notation parser.
//!
//! Only the process table matters for definition and hover, but the parser
//! reads the whole line-oriented notation so malformed graphs are reported
//! with a line number instead of silently losing processes:
//!
//! ```text
//! # comment
//! INPORT=Read.IN:FILENAME
//! 'config.json' -> IN Read(fs/read) OUT -> IN Parse(./parse:json)
//! Parse OUT[0] -> IN Log(@acme/kit/log)
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct GraphError {
    pub line: usize,
    pub message: String,
}

impl GraphError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A named process and the component implementing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessReference {
    pub name: String,
    /// `None` when the process is only ever referenced by name.
    pub component: Option<String>,
    /// Text after `:` in `Name(component:metadata)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortRef {
    pub process: String,
    pub port: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub source: PortRef,
    pub target: PortRef,
}

/// An initial packet: `'data' -> PORT Process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Initializer {
    pub data: String,
    pub target: PortRef,
}

/// A graph-level port exported from an inner process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedPort {
    pub name: String,
    pub process: String,
    pub port: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FbpGraph {
    pub processes: BTreeMap<String, ProcessReference>,
    pub connections: Vec<Connection>,
    pub initializers: Vec<Initializer>,
    pub inports: Vec<ExportedPort>,
    pub outports: Vec<ExportedPort>,
}

impl FbpGraph {
    /// Component reference of a process, if the process exists and names one.
    pub fn component_of(&self, process: &str) -> Option<&str> {
        self.processes.get(process)?.component.as_deref()
    }

    fn declare(&mut self, node: &NodeRef) {
        let entry = self
            .processes
            .entry(node.name.clone())
            .or_insert_with(|| ProcessReference {
                name: node.name.clone(),
                component: None,
                metadata: None,
            });
        if let Some(component) = &node.component {
            entry.component = Some(component.clone());
            entry.metadata = node.metadata.clone();
        }
    }
}

/// Turns graph text into a process table.
pub trait GraphParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<FbpGraph, GraphError>;
}

/// Parser for the line-oriented FBP notation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FbpParser;

impl GraphParser for FbpParser {
    fn parse(&self, text: &str) -> Result<FbpGraph, GraphError> {
        let tokens = tokenize(text)?;
        let mut graph = FbpGraph::default();
        for statement in tokens.split(|t| t.kind == TokenKind::Separator) {
            if !statement.is_empty() {
                parse_statement(statement, &mut graph)?;
            }
        }
        Ok(graph)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Word(String),
    /// Raw contents of `( ... )`.
    Group(String),
    Index(u32),
    Str(String),
    Arrow,
    Equals,
    Colon,
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    kind: TokenKind,
    line: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '/' | '@' | '$' | '-')
}

fn starts_arrow(chars: &Peekable<Chars>) -> bool {
    let mut ahead = chars.clone();
    ahead.next() == Some('-') && ahead.peek() == Some(&'>')
}

fn push(tokens: &mut Vec<Token>, kind: TokenKind, line: usize) {
    tokens.push(Token { kind, line });
}

fn tokenize(text: &str) -> Result<Vec<Token>, GraphError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                push(&mut tokens, TokenKind::Separator, line);
                line += 1;
                chars.next();
            }
            ',' | ';' => {
                push(&mut tokens, TokenKind::Separator, line);
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => while chars.next_if(|&c| c != '\n').is_some() {},
            '-' if starts_arrow(&chars) => {
                chars.next();
                chars.next();
                push(&mut tokens, TokenKind::Arrow, line);
            }
            '=' => {
                push(&mut tokens, TokenKind::Equals, line);
                chars.next();
            }
            ':' => {
                push(&mut tokens, TokenKind::Colon, line);
                chars.next();
            }
            '(' => {
                chars.next();
                let mut group = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some('\n') | None => return Err(GraphError::new(line, "unclosed `(`")),
                        Some(c) => group.push(c),
                    }
                }
                push(&mut tokens, TokenKind::Group(group), line);
            }
            '[' => {
                chars.next();
                let mut digits = String::new();
                while let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
                    digits.push(d);
                }
                if chars.next() != Some(']') || digits.is_empty() {
                    return Err(GraphError::new(line, "malformed port index"));
                }
                let index = digits
                    .parse()
                    .map_err(|_| GraphError::new(line, "port index out of range"))?;
                push(&mut tokens, TokenKind::Index(index), line);
            }
            '\'' => {
                chars.next();
                let start_line = line;
                let mut data = String::new();
                loop {
                    let c = chars
                        .next()
                        .ok_or_else(|| GraphError::new(start_line, "unterminated string"))?;
                    match c {
                        '\'' => break,
                        '\\' => {
                            let escaped = chars
                                .next()
                                .ok_or_else(|| GraphError::new(start_line, "unterminated string"))?;
                            if escaped != '\'' {
                                data.push('\\');
                            }
                            if escaped == '\n' {
                                line += 1;
                            }
                            data.push(escaped);
                        }
                        c => {
                            if c == '\n' {
                                line += 1;
                            }
                            data.push(c);
                        }
                    }
                }
                push(&mut tokens, TokenKind::Str(data), start_line);
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    // `-` belongs to the word unless it starts an arrow
                    if !is_word_char(c) || starts_arrow(&chars) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                push(&mut tokens, TokenKind::Word(word), line);
            }
            other => {
                return Err(GraphError::new(
                    line,
                    format!("unexpected character `{}`", other),
                ));
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeRef {
    name: String,
    component: Option<String>,
    metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Port {
    name: String,
    index: Option<u32>,
}

/// One element of a connection chain, between arrows.
#[derive(Debug)]
enum Atom {
    Node(NodeRef),
    Port(Port),
}

fn parse_statement(tokens: &[Token], graph: &mut FbpGraph) -> Result<(), GraphError> {
    let line = tokens[0].line;

    if let [
        Token {
            kind: TokenKind::Word(keyword),
            ..
        },
        Token {
            kind: TokenKind::Equals,
            ..
        },
        rest @ ..,
    ] = tokens
    {
        return parse_export(keyword, rest, line, graph);
    }

    let segments: Vec<&[Token]> = tokens.split(|t| t.kind == TokenKind::Arrow).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(GraphError::new(line, "arrow without an endpoint"));
    }

    if segments.len() == 1 {
        // Declaration-only statement: `Name(component)`
        for atom in parse_atoms(segments[0], line, true)? {
            match atom {
                Atom::Node(node) => graph.declare(&node),
                Atom::Port(port) => {
                    return Err(GraphError::new(
                        line,
                        format!("expected a process, found `{}`", port.name),
                    ));
                }
            }
        }
        return Ok(());
    }

    let last = segments.len() - 1;
    let mut pending: Option<Pending> = None;

    for (i, segment) in segments.iter().enumerate() {
        if i == 0 {
            if let [
                Token {
                    kind: TokenKind::Str(data),
                    ..
                },
            ] = *segment
            {
                pending = Some(Pending::Data(data.clone()));
                continue;
            }
        }

        let atoms = parse_atoms(segment, line, i == 0)?;
        let (in_port, node, out_port) = match (i, atoms.as_slice()) {
            (0, [Atom::Node(node), Atom::Port(out)]) => (None, node, Some(out)),
            (i, [Atom::Port(inp), Atom::Node(node)]) if i == last => (Some(inp), node, None),
            (i, [Atom::Port(inp), Atom::Node(node), Atom::Port(out)]) if i != 0 && i != last => {
                (Some(inp), node, Some(out))
            }
            _ => return Err(GraphError::new(line, "malformed connection")),
        };

        graph.declare(node);

        if let (Some(from), Some(inp)) = (pending.take(), in_port) {
            let target = PortRef {
                process: node.name.clone(),
                port: inp.name.clone(),
                index: inp.index,
            };
            match from {
                Pending::Data(data) => graph.initializers.push(Initializer { data, target }),
                Pending::Port(source) => graph.connections.push(Connection { source, target }),
            }
        }

        pending = out_port.map(|out| {
            Pending::Port(PortRef {
                process: node.name.clone(),
                port: out.name.clone(),
                index: out.index,
            })
        });
    }

    Ok(())
}

enum Pending {
    Data(String),
    Port(PortRef),
}

/// Group a segment's tokens into node references and ports.
///
/// A word followed by `( ... )` is always a node. Elsewhere the position in
/// the segment decides: `Node PORT` opens a chain, `PORT Node PORT` and
/// `PORT Node` continue it.
fn parse_atoms(segment: &[Token], line: usize, first: bool) -> Result<Vec<Atom>, GraphError> {
    let mut words: Vec<(String, Option<String>, Option<u32>)> = Vec::new();
    for token in segment {
        match &token.kind {
            TokenKind::Word(word) => words.push((word.clone(), None, None)),
            TokenKind::Group(group) => match words.last_mut() {
                Some(last) if last.1.is_none() && last.2.is_none() => {
                    last.1 = Some(group.clone())
                }
                _ => return Err(GraphError::new(line, "component without a process name")),
            },
            TokenKind::Index(index) => match words.last_mut() {
                Some(last) if last.1.is_none() && last.2.is_none() => last.2 = Some(*index),
                _ => return Err(GraphError::new(line, "port index without a port")),
            },
            TokenKind::Str(_) => {
                return Err(GraphError::new(line, "initial packet must start a connection"));
            }
            other => {
                return Err(GraphError::new(line, format!("unexpected {:?}", other)));
            }
        }
    }

    let node_position = match words.len() {
        1 => 0,
        2 if words[0].1.is_some() => 0,
        2 if words[1].1.is_some() => 1,
        2 if first => 0,
        2 => 1,
        3 => 1,
        _ => return Err(GraphError::new(line, "malformed connection")),
    };

    words
        .into_iter()
        .enumerate()
        .map(|(i, (name, group, index))| {
            if i == node_position {
                if index.is_some() {
                    return Err(GraphError::new(line, "process cannot have an index"));
                }
                Ok(Atom::Node(node_ref(name, group)))
            } else if group.is_some() {
                Err(GraphError::new(line, format!("`{}` is in a port position", name)))
            } else {
                Ok(Atom::Port(Port { name, index }))
            }
        })
        .collect()
}

fn node_ref(name: String, group: Option<String>) -> NodeRef {
    let (component, metadata) = match group {
        Some(group) => {
            let (component, metadata) = match group.split_once(':') {
                Some((component, metadata)) => (component, Some(metadata.trim().to_string())),
                None => (group.as_str(), None),
            };
            let component = component.trim();
            if component.is_empty() {
                (None, None)
            } else {
                (Some(component.to_string()), metadata)
            }
        }
        None => (None, None),
    };
    NodeRef {
        name,
        component,
        metadata,
    }
}

fn parse_export(
    keyword: &str,
    rest: &[Token],
    line: usize,
    graph: &mut FbpGraph,
) -> Result<(), GraphError> {
    let [
        Token {
            kind: TokenKind::Word(target),
            ..
        },
        Token {
            kind: TokenKind::Colon,
            ..
        },
        Token {
            kind: TokenKind::Word(name),
            ..
        },
    ] = rest
    else {
        return Err(GraphError::new(line, format!("expected {}=Process.PORT:NAME", keyword)));
    };

    let Some((process, port)) = target.rsplit_once('.') else {
        return Err(GraphError::new(line, format!("expected Process.PORT, found `{}`", target)));
    };

    let exported = ExportedPort {
        name: name.clone(),
        process: process.to_string(),
        port: port.to_string(),
    };
    graph.declare(&NodeRef {
        name: process.to_string(),
        component: None,
        metadata: None,
    });

    match keyword {
        "INPORT" => graph.inports.push(exported),
        "OUTPORT" => graph.outports.push(exported),
        other => return Err(GraphError::new(line, format!("unknown export `{}`", other))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> FbpGraph {
        FbpParser.parse(text).unwrap()
    }

    fn port(process: &str, port: &str) -> PortRef {
        PortRef {
            process: process.to_string(),
            port: port.to_string(),
            index: None,
        }
    }

    #[test]
    fn test_declarations_and_connections() {
        let graph = parse("Read(fs/read) OUT -> IN Parse(./parse)\nParse OUT -> IN Log(log)");
        assert_eq!(graph.component_of("Read"), Some("fs/read"));
        assert_eq!(graph.component_of("Parse"), Some("./parse"));
        assert_eq!(graph.component_of("Log"), Some("log"));
        assert_eq!(
            graph.connections,
            vec![
                Connection {
                    source: port("Read", "OUT"),
                    target: port("Parse", "IN"),
                },
                Connection {
                    source: port("Parse", "OUT"),
                    target: port("Log", "IN"),
                },
            ]
        );
    }

    #[test]
    fn test_chained_connection() {
        let graph = parse("A(a) OUT -> IN B(b) OUT -> IN C(c)");
        assert_eq!(graph.processes.len(), 3);
        assert_eq!(graph.connections.len(), 2);
        assert_eq!(graph.connections[1].source, port("B", "OUT"));
        assert_eq!(graph.connections[1].target, port("C", "IN"));
    }

    #[test]
    fn test_initial_packet_and_comments() {
        let graph = parse("# fbp\n'it\\'s -> data' -> IN Log(log) # trailing\n");
        assert_eq!(
            graph.initializers,
            vec![Initializer {
                data: "it's -> data".to_string(),
                target: port("Log", "IN"),
            }]
        );
    }

    #[test]
    fn test_metadata_and_indices() {
        let graph = parse("Split(@acme/kit/split:width=2) OUT[1] -> IN[0] Join(join)");
        let split = &graph.processes["Split"];
        assert_eq!(split.component.as_deref(), Some("@acme/kit/split"));
        assert_eq!(split.metadata.as_deref(), Some("width=2"));
        assert_eq!(graph.connections[0].source.index, Some(1));
        assert_eq!(graph.connections[0].target.index, Some(0));
    }

    #[test]
    fn test_exports() {
        let graph = parse("INPORT=Read.IN:FILENAME\nOUTPORT=Log.OUT:RESULT\nRead(read)");
        assert_eq!(graph.inports[0].name, "FILENAME");
        assert_eq!(graph.inports[0].process, "Read");
        assert_eq!(graph.outports[0].port, "OUT");
        assert_eq!(graph.component_of("Read"), Some("read"));
        assert_eq!(graph.component_of("Log"), None);
        assert!(graph.processes.contains_key("Log"));
    }

    #[test]
    fn test_separators_and_hyphenated_components() {
        let graph = parse("A(my-comp), B(other-comp); A OUT -> IN B");
        assert_eq!(graph.component_of("A"), Some("my-comp"));
        assert_eq!(graph.component_of("B"), Some("other-comp"));
        assert_eq!(graph.connections.len(), 1);
    }

    #[test]
    fn test_tight_arrows() {
        let graph = parse("A(a) OUT->IN B(b)");
        assert_eq!(graph.connections[0].target, port("B", "IN"));
    }

    #[test]
    fn test_redeclaration_replaces_component() {
        let graph = parse("A(first)\nA OUT -> IN B(b)\nA(second)");
        assert_eq!(graph.component_of("A"), Some("second"));
    }

    #[test]
    fn test_reference_without_component() {
        let graph = parse("A OUT -> IN B");
        assert_eq!(graph.processes.len(), 2);
        assert_eq!(graph.connections[0].source, port("A", "OUT"));
        assert_eq!(graph.component_of("A"), None);
        assert_eq!(graph.component_of("Missing"), None);
    }

    #[test]
    fn test_errors_carry_line() {
        let err = FbpParser.parse("A(a)\nA OUT -> \n").unwrap_err();
        assert_eq!(err.line, 2);

        let err = FbpParser.parse("\n\nA(a OUT -> IN B").unwrap_err();
        assert_eq!(err.line, 3);

        assert!(FbpParser.parse("'unterminated -> IN A").is_err());
        assert!(FbpParser.parse("A OUT -> IN B -> C").is_err());
        assert!(FbpParser.parse("EXPORT=A.B:C").is_err());
    }

    #[test]
    fn test_empty_graph() {
        assert_eq!(parse(""), FbpGraph::default());
        assert_eq!(parse("# just a comment\n\n"), FbpGraph::default());
    }
}
