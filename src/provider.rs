//! Definition and hover for processes in FBP graphs.
//!
//! Each request runs the full pipeline: graph text -> process -> component
//! file -> summary. Failures are turned into hover content or "no definition";
//! nothing escapes a request.

use crate::component::{self, AnalysisOptions};
use crate::config::Config;
use crate::document::{self, HostDocument, TextPosition};
use crate::graph::{FbpGraph, FbpParser, GraphError, GraphParser};
use crate::languages::typescript::{ParseError, TsLanguage};
use crate::npm::{ComponentResolver, Resolution};
use crate::schema::ComponentSummary;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    #[error("{source}")]
    Parse {
        path: Utf8PathBuf,
        source: ParseError,
    },
    #[error("{0}")]
    Graph(#[from] GraphError),
    #[error("{0}")]
    Host(ParseError),
}

/// Where "go to definition" lands: the start of the component module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionTarget {
    pub path: Utf8PathBuf,
    pub line: usize,
    pub character: usize,
}

impl DefinitionTarget {
    fn file_start(path: Utf8PathBuf) -> Self {
        Self {
            path,
            line: 0,
            character: 0,
        }
    }
}

/// Tooltip content for a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoverPayload {
    Component {
        process: String,
        component: String,
        path: Utf8PathBuf,
        summary: ComponentSummary,
    },
    /// `target` is the path (or, failing that, the process) that could not
    /// be loaded; `message` is the underlying error text.
    Error { target: String, message: String },
}

impl HoverPayload {
    pub fn to_markdown(&self) -> String {
        match self {
            HoverPayload::Component {
                process,
                component,
                summary,
                ..
            } => render_component(process, component, summary),
            HoverPayload::Error { target, message } => {
                format!("Error loading {}\n\n{}", target, message)
            }
        }
    }
}

fn render_component(process: &str, component: &str, summary: &ComponentSummary) -> String {
    let mut md = format!("**{}**\n\n*{}*\n\n", process, component);

    md.push_str("**Props**\n\n");
    for prop in &summary.props {
        let requirement = if prop.required { "required" } else { "optional" };
        md.push_str(&format!("- `{}` - {}", prop.name, requirement));
        if let Some(default) = &prop.default {
            md.push_str(&format!(", default: `{}`", default));
        }
        md.push_str("\n\n");
    }
    if summary.props.is_empty() {
        md.push_str("No props\n\n");
    }

    md.push_str("**Input ports**\n\n");
    for port in &summary.inports {
        push_port(&mut md, &port.inport_display_name(), port.comment.as_deref());
    }

    md.push_str("**Output ports**\n\n");
    for port in &summary.outports {
        push_port(&mut md, &port.outport_display_name(), port.comment.as_deref());
    }

    md
}

fn push_port(md: &mut String, display_name: &str, comment: Option<&str>) {
    md.push_str(&format!("`{}`\n\n", display_name));
    if let Some(comment) = comment {
        md.push_str(&format!("{}\n\n", comment));
    }
}

/// Per-session state: configuration and the graph parser in use.
pub struct Workspace {
    config: Config,
    resolver: ComponentResolver,
    graph_parser: Box<dyn GraphParser>,
}

impl Workspace {
    pub fn new(config: Config) -> Self {
        Self::with_graph_parser(config, FbpParser)
    }

    pub fn with_graph_parser(config: Config, graph_parser: impl GraphParser + 'static) -> Self {
        Self {
            resolver: ComponentResolver::new(config.resolve.clone()),
            config,
            graph_parser: Box::new(graph_parser),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve the process under the cursor to its component module.
    pub fn definition(
        &self,
        document: &HostDocument,
        position: TextPosition,
    ) -> Option<DefinitionTarget> {
        let (graph, name) = match self.graph_at(document, position) {
            Ok(Some(found)) => found,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("no definition: {}", e);
                return None;
            }
        };

        let component = graph.component_of(&name)?;
        match self.resolver.resolve(component, &document.path) {
            Resolution::Resolved(path) => Some(DefinitionTarget::file_start(path)),
            Resolution::Unresolved { candidates } => {
                tracing::debug!("`{}` unresolved, tried {:?}", component, candidates);
                None
            }
        }
    }

    /// Describe the process under the cursor.
    ///
    /// `None` when the cursor is not on a process name. Every failure after
    /// that point is reported inside the payload.
    pub fn hover(&self, document: &HostDocument, position: TextPosition) -> Option<HoverPayload> {
        match self.graph_at(document, position) {
            Ok(Some((graph, name))) => self.describe_process(&graph, &name, &document.path),
            Ok(None) => None,
            Err(e) => Some(HoverPayload::Error {
                target: document.path.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Hover content for process `name` of `graph`, resolved relative to
    /// the document at `document_path`.
    pub fn describe_process(
        &self,
        graph: &FbpGraph,
        name: &str,
        document_path: &Utf8Path,
    ) -> Option<HoverPayload> {
        let process = graph.processes.get(name)?;

        let Some(component) = process.component.as_deref() else {
            return Some(HoverPayload::Error {
                target: name.to_string(),
                message: format!("process `{}` does not name a component", name),
            });
        };

        let path = match self.resolver.resolve(component, document_path) {
            Resolution::Resolved(path) => path,
            unresolved => {
                let target = unresolved
                    .display_path()
                    .map_or_else(|| component.to_string(), |p| p.to_string());
                return Some(HoverPayload::Error {
                    target,
                    message: format!("component `{}` not found", component),
                });
            }
        };

        Some(match self.summarize_file(&path) {
            Ok(summary) => HoverPayload::Component {
                process: name.to_string(),
                component: component.to_string(),
                path,
                summary,
            },
            Err(e) => {
                tracing::warn!("failed to load {}: {}", path, e);
                HoverPayload::Error {
                    target: path.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    /// Read and summarize one component module.
    pub fn summarize_file(&self, path: &Utf8Path) -> Result<ComponentSummary, ProviderError> {
        let source = fs::read_to_string(path).map_err(|source| ProviderError::Read {
            path: path.to_owned(),
            source,
        })?;
        let options = AnalysisOptions {
            language: TsLanguage::from_path(path),
            ..self.config.analysis_options()
        };
        component::summarize_with(&source, &options).map_err(|source| ProviderError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    fn graph_at(
        &self,
        document: &HostDocument,
        position: TextPosition,
    ) -> Result<Option<(FbpGraph, String)>, ProviderError> {
        let Some(context) =
            document::graph_context(document, position).map_err(ProviderError::Host)?
        else {
            return Ok(None);
        };
        let graph = self.graph_parser.parse(&context.graph)?;
        Ok(Some((graph, context.word.text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ProcessReference;
    use crate::schema::{LiteralValue, PortDetail, PropDetail};

    const COMPONENT: &str = r#"
module.exports = {
  props: { size: { required: true, default: 10 }, label: {} },
  // packets to count
  _in(msg) {},
  out_: null,
};
"#;

    struct Project {
        _dir: tempfile::TempDir,
        root: Utf8PathBuf,
    }

    fn project() -> Project {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("package.json"), "{}").unwrap();
        fs::write(root.join("counter.node.js"), COMPONENT).unwrap();
        fs::create_dir_all(root.join("node_modules")).unwrap();
        fs::write(root.join("node_modules/broken.node.js"), "module.exports = {").unwrap();
        Project { _dir: dir, root }
    }

    fn graph_doc(project: &Project, text: &str) -> HostDocument {
        HostDocument::new(project.root.join("flow.fbp"), text)
    }

    const GRAPH: &str = "Count(./counter) OUT -> IN Bad(broken)\nBad OUT -> IN Gone(missing)\nBad OUT -> IN Anon";

    #[test]
    fn test_definition_relative() {
        let project = project();
        let doc = graph_doc(&project, GRAPH);
        let workspace = Workspace::new(Config::default());

        let target = workspace.definition(&doc, TextPosition::new(0, 2)).unwrap();
        assert_eq!(target.path, project.root.join("counter.node.js"));
        assert_eq!((target.line, target.character), (0, 0));
    }

    #[test]
    fn test_definition_none_cases() {
        let project = project();
        let doc = graph_doc(&project, GRAPH);
        let workspace = Workspace::new(Config::default());

        // port name, not a process
        assert_eq!(workspace.definition(&doc, TextPosition::new(0, 18)), None);
        // unresolved component
        assert_eq!(workspace.definition(&doc, TextPosition::new(1, 15)), None);
        // process without a component
        assert_eq!(workspace.definition(&doc, TextPosition::new(2, 16)), None);
    }

    #[test]
    fn test_hover_component() {
        let project = project();
        let doc = graph_doc(&project, GRAPH);
        let workspace = Workspace::new(Config::default());

        let hover = workspace.hover(&doc, TextPosition::new(0, 1)).unwrap();
        let HoverPayload::Component {
            process,
            component,
            path,
            summary,
        } = &hover
        else {
            panic!("expected component hover, got {hover:?}");
        };
        assert_eq!(process, "Count");
        assert_eq!(component, "./counter");
        assert_eq!(path, &project.root.join("counter.node.js"));
        assert_eq!(
            summary.props,
            vec![
                PropDetail {
                    name: "size".to_string(),
                    required: true,
                    default: Some(LiteralValue::Number("10".to_string())),
                },
                PropDetail::named("label"),
            ]
        );

        let md = hover.to_markdown();
        assert!(md.starts_with("**Count**\n\n*./counter*\n\n**Props**\n\n"));
        assert!(md.contains("- `size` - required, default: `10`\n\n"));
        assert!(md.contains("- `label` - optional\n\n"));
        assert!(md.contains("**Input ports**\n\n`IN`\n\npackets to count\n\n"));
        assert!(md.ends_with("**Output ports**\n\n`OUT`\n\n"));
    }

    #[test]
    fn test_hover_parse_error_is_reported() {
        let project = project();
        let doc = graph_doc(&project, GRAPH);
        let workspace = Workspace::new(Config::default());

        let hover = workspace.hover(&doc, TextPosition::new(0, 28)).unwrap();
        match &hover {
            HoverPayload::Error { target, message } => {
                assert_eq!(target, &project.root.join("node_modules/broken.node.js").to_string());
                assert!(message.starts_with("syntax error at "), "{message}");
            }
            other => panic!("expected error hover, got {other:?}"),
        }
        assert!(hover.to_markdown().starts_with("Error loading "));
    }

    #[test]
    fn test_hover_unresolved_names_path() {
        let project = project();
        let doc = graph_doc(&project, GRAPH);
        let workspace = Workspace::new(Config::default());

        let hover = workspace.hover(&doc, TextPosition::new(1, 15)).unwrap();
        assert_eq!(
            hover,
            HoverPayload::Error {
                target: project.root.join("missing.node.js").to_string(),
                message: "component `missing` not found".to_string(),
            }
        );
    }

    #[test]
    fn test_hover_without_component() {
        let project = project();
        let doc = graph_doc(&project, GRAPH);
        let workspace = Workspace::new(Config::default());

        let hover = workspace.hover(&doc, TextPosition::new(2, 16)).unwrap();
        assert!(matches!(hover, HoverPayload::Error { ref target, .. } if target == "Anon"));
    }

    #[test]
    fn test_hover_on_non_process_word() {
        let project = project();
        let doc = graph_doc(&project, GRAPH);
        let workspace = Workspace::new(Config::default());
        assert_eq!(workspace.hover(&doc, TextPosition::new(0, 18)), None);
    }

    #[test]
    fn test_hover_on_broken_graph() {
        let project = project();
        let doc = graph_doc(&project, "Count(./counter) OUT ->");
        let workspace = Workspace::new(Config::default());

        let hover = workspace.hover(&doc, TextPosition::new(0, 1)).unwrap();
        assert!(matches!(hover, HoverPayload::Error { .. }));
        assert_eq!(workspace.definition(&doc, TextPosition::new(0, 1)), None);
    }

    #[test]
    fn test_hover_in_embedded_graph() {
        let project = project();
        let text = "import x from 'y';\nexport const flow = `# fbp\nCount(./counter) OUT -> IN Bad(broken)\n`;\n";
        let doc = HostDocument::new(project.root.join("app.js"), text);
        let workspace = Workspace::new(Config::default());

        let hover = workspace.hover(&doc, TextPosition::new(2, 3)).unwrap();
        assert!(matches!(hover, HoverPayload::Component { ref process, .. } if process == "Count"));

        // outside the literal
        assert_eq!(workspace.hover(&doc, TextPosition::new(0, 8)), None);
    }

    #[test]
    fn test_read_failure_is_reported() {
        let workspace = Workspace::new(Config::default());
        let err = workspace
            .summarize_file(Utf8Path::new("/definitely/not/here.node.js"))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Read { .. }));
    }

    #[test]
    fn test_custom_graph_parser() {
        struct Fixed;
        impl GraphParser for Fixed {
            fn parse(&self, _text: &str) -> Result<FbpGraph, GraphError> {
                let mut graph = FbpGraph::default();
                graph.processes.insert(
                    "Count".to_string(),
                    ProcessReference {
                        name: "Count".to_string(),
                        component: Some("./counter".to_string()),
                        metadata: None,
                    },
                );
                Ok(graph)
            }
        }

        let project = project();
        let doc = graph_doc(&project, "Count anything");
        let workspace = Workspace::with_graph_parser(Config::default(), Fixed);
        assert!(workspace.definition(&doc, TextPosition::new(0, 0)).is_some());
    }

    #[test]
    fn test_no_props_markdown() {
        let hover = HoverPayload::Component {
            process: "P".to_string(),
            component: "c".to_string(),
            path: Utf8PathBuf::from("/c.node.js"),
            summary: ComponentSummary {
                props: vec![],
                inports: vec![],
                outports: vec![PortDetail {
                    name: "done_".to_string(),
                    comment: None,
                }],
            },
        };
        assert_eq!(
            hover.to_markdown(),
            "**P**\n\n*c*\n\n**Props**\n\nNo props\n\n**Input ports**\n\n**Output ports**\n\n`DONE`\n\n"
        );
    }

    #[test]
    fn test_full_markdown_layout() {
        let hover = HoverPayload::Component {
            process: "Split".to_string(),
            component: "./split".to_string(),
            path: Utf8PathBuf::from("/split.node.js"),
            summary: ComponentSummary {
                props: vec![
                    PropDetail {
                        name: "sep".to_string(),
                        required: true,
                        default: Some(LiteralValue::String(",".to_string())),
                    },
                    PropDetail::named("limit"),
                ],
                inports: vec![PortDetail {
                    name: "_in".to_string(),
                    comment: Some("text to split".to_string()),
                }],
                outports: vec![
                    PortDetail {
                        name: "part_".to_string(),
                        comment: None,
                    },
                    PortDetail {
                        name: "done_".to_string(),
                        comment: Some("after the last part".to_string()),
                    },
                ],
            },
        };
        assert_eq!(
            hover.to_markdown(),
            "**Split**\n\n*./split*\n\n\
             **Props**\n\n- `sep` - required, default: `,`\n\n- `limit` - optional\n\n\
             **Input ports**\n\n`IN`\n\ntext to split\n\n\
             **Output ports**\n\n`PART`\n\n`DONE`\n\nafter the last part\n\n"
        );
    }
}
