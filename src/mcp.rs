//! MCP (Model Context Protocol) server for fbp-lens.

use camino::{Utf8Path, Utf8PathBuf};
use fbp_lens::config::Config;
use fbp_lens::document::{HostDocument, TextPosition};
use fbp_lens::provider::Workspace;
use rmcp::handler::server::tool::cached_schema_for_type;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::schemars;
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use schemars::JsonSchema;
use serde::Deserialize;
use std::fs;
use std::sync::Arc;

pub fn cmd_mcp(config_path: Option<Utf8PathBuf>) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {}", e);
            return 1;
        }
    };
    rt.block_on(run_mcp_server(config_path))
}

async fn run_mcp_server(config_path: Option<Utf8PathBuf>) -> i32 {
    let service = LensService::new(config_path);
    let transport = rmcp::transport::io::stdio();

    let running_service = match service.serve(transport).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("MCP server error: {}", e);
            return 1;
        }
    };

    if let Err(e) = running_service.waiting().await {
        tracing::error!("MCP server task error: {}", e);
        return 1;
    }

    0
}

#[derive(Clone)]
struct LensService {
    config_path: Arc<Option<Utf8PathBuf>>,
}

impl LensService {
    fn new(config_path: Option<Utf8PathBuf>) -> Self {
        Self {
            config_path: Arc::new(config_path),
        }
    }

    /// A workspace configured for files under `path`'s directory.
    fn workspace_for(&self, path: &Utf8Path) -> Result<Workspace, String> {
        let dir = path.parent().unwrap_or(Utf8Path::new("."));
        let config =
            Config::discover(self.config_path.as_deref(), dir).map_err(|e| e.to_string())?;
        Ok(Workspace::new(config))
    }

    fn document(path: &Utf8Path, text: Option<String>) -> Result<HostDocument, String> {
        let text = match text {
            Some(text) => text,
            None => fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?,
        };
        Ok(HostDocument::new(path, text))
    }

    fn summary_impl(&self, path: String) -> Result<String, String> {
        let path = Utf8PathBuf::from(path);
        let workspace = self.workspace_for(&path)?;
        let summary = workspace.summarize_file(&path).map_err(|e| e.to_string())?;
        serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())
    }

    fn definition_impl(&self, params: PositionParams) -> Result<String, String> {
        let path = Utf8PathBuf::from(params.path);
        let workspace = self.workspace_for(&path)?;
        let document = Self::document(&path, params.text)?;
        let position = TextPosition::new(params.line, params.character);

        match workspace.definition(&document, position) {
            Some(target) => serde_json::to_string_pretty(&target).map_err(|e| e.to_string()),
            None => Err("No definition found".to_string()),
        }
    }

    fn hover_impl(&self, params: PositionParams, json: bool) -> Result<String, String> {
        let path = Utf8PathBuf::from(params.path);
        let workspace = self.workspace_for(&path)?;
        let document = Self::document(&path, params.text)?;
        let position = TextPosition::new(params.line, params.character);

        let Some(hover) = workspace.hover(&document, position) else {
            return Ok(String::new());
        };
        if json {
            serde_json::to_string_pretty(&hover).map_err(|e| e.to_string())
        } else {
            Ok(hover.to_markdown())
        }
    }
}

// === Parameter structs ===

#[derive(Debug, Deserialize, JsonSchema)]
struct SummaryParams {
    /// Path to a component module (e.g., "components/split.node.js")
    path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PositionParams {
    /// Path to a graph (.fbp) or a JS/TS file embedding one
    path: String,
    /// Zero-based line
    line: usize,
    /// Zero-based character within the line
    character: usize,
    /// Unsaved document contents (read from disk when omitted)
    text: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct HoverParams {
    #[serde(flatten)]
    position: PositionParams,
    /// Return the hover payload as JSON instead of markdown
    json: Option<bool>,
}

impl ServerHandler for LensService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "fbp-lens".to_string(),
                title: Some("FBP Lens".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "FBP Lens explains processes in flow-based programming graphs. \
                 Use 'summary' to read a component module's props and ports, \
                 'definition' to find the module behind a process, \
                 and 'hover' for a readable description of a process."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send {
        async move {
            Ok(ListToolsResult {
                tools: vec![
                    Tool::new(
                        "summary",
                        "Summarize a component module: props, input ports and output ports",
                        cached_schema_for_type::<SummaryParams>(),
                    ),
                    Tool::new(
                        "definition",
                        "Resolve the process at a position to its component module",
                        cached_schema_for_type::<PositionParams>(),
                    ),
                    Tool::new(
                        "hover",
                        "Describe the process at a position",
                        cached_schema_for_type::<HoverParams>(),
                    ),
                ],
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send {
        let this = self.clone();
        async move {
            let args_value = request
                .arguments
                .map(serde_json::Value::Object)
                .unwrap_or(serde_json::Value::Null);

            tracing::debug!("tool call: {}", request.name);

            let result = match request.name.as_ref() {
                "summary" => {
                    let params: SummaryParams = parse_params(args_value)?;
                    this.summary_impl(params.path)
                }
                "definition" => {
                    let params: PositionParams = parse_params(args_value)?;
                    this.definition_impl(params)
                }
                "hover" => {
                    let params: HoverParams = parse_params(args_value)?;
                    this.hover_impl(params.position, params.json.unwrap_or(false))
                }
                _ => {
                    return Err(McpError::invalid_params(
                        format!("Unknown tool: {}", request.name),
                        None,
                    ));
                }
            };

            match result {
                Ok(output) => Ok(CallToolResult::success(vec![Content::text(output)])),
                Err(e) => Ok(CallToolResult::error(vec![Content::text(e)])),
            }
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, McpError> {
    serde_json::from_value(value)
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("package.json"), "{}").unwrap();
        fs::write(
            root.join("log.node.js"),
            "module.exports = {\n  // line to print\n  _in() {},\n};\n",
        )
        .unwrap();
        (dir, root)
    }

    #[test]
    fn test_summary_tool() {
        let (_dir, root) = project();
        let service = LensService::new(None);
        let output = service
            .summary_impl(root.join("log.node.js").to_string())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["inports"][0]["name"], "_in");
        assert_eq!(value["inports"][0]["comment"], "line to print");
    }

    #[test]
    fn test_definition_and_hover_tools() {
        let (_dir, root) = project();
        let service = LensService::new(None);
        let position = || PositionParams {
            path: root.join("flow.fbp").to_string(),
            line: 0,
            character: 1,
            text: Some("Log(log)".to_string()),
        };

        let definition = service.definition_impl(position()).unwrap();
        assert!(definition.contains("log.node.js"));

        let hover = service.hover_impl(position(), false).unwrap();
        assert!(hover.starts_with("**Log**\n\n*log*"));
        assert!(hover.contains("`IN`\n\nline to print"));
    }

    #[test]
    fn test_missing_document_is_an_error() {
        let service = LensService::new(None);
        let params = PositionParams {
            path: "/definitely/not/here.fbp".to_string(),
            line: 0,
            character: 0,
            text: None,
        };
        assert!(service.definition_impl(params).is_err());
    }
}
