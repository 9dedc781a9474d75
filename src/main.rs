mod mcp;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use fbp_lens::config::Config;
use fbp_lens::document::{HostDocument, TextPosition};
use fbp_lens::graph::{FbpParser, GraphParser};
use fbp_lens::provider::Workspace;
use fbp_lens::schema::ComponentSummary;
use std::fs;

#[derive(Parser)]
#[command(name = "fbp-lens")]
#[command(about = "Go to definition and hover for FBP graph processes", long_about = None)]
struct Cli {
    /// Configuration file (defaults to .fbp-lens.toml lookup)
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a component module's props and ports
    Summary {
        /// Path to the .node.js file
        file: Utf8PathBuf,

        /// Print the summary as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the component module behind the process at a position
    Definition {
        /// Graph (.fbp) or JS/TS file embedding one
        doc: Utf8PathBuf,

        /// Line (1-based)
        #[arg(short, long)]
        line: usize,

        /// Column (1-based)
        #[arg(short, long)]
        column: usize,
    },

    /// Describe the process at a position
    Hover {
        /// Graph (.fbp) or JS/TS file embedding one
        doc: Utf8PathBuf,

        /// Line (1-based)
        #[arg(short, long)]
        line: usize,

        /// Column (1-based)
        #[arg(short, long)]
        column: usize,

        /// Print the hover payload as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the processes of every graph in a document
    Graph {
        /// Graph (.fbp) or JS/TS file embedding graphs
        doc: Utf8PathBuf,

        /// Print the parsed graphs as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Start MCP server for AI assistant integration (stdio transport)
    Mcp,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Summary { file, json } => cmd_summary(&file, json, config.as_deref()),
        Commands::Definition { doc, line, column } => {
            cmd_definition(&doc, line, column, config.as_deref())
        }
        Commands::Hover {
            doc,
            line,
            column,
            json,
        } => cmd_hover(&doc, line, column, json, config.as_deref()),
        Commands::Graph { doc, json } => cmd_graph(&doc, json),
        Commands::Mcp => {
            std::process::exit(mcp::cmd_mcp(config));
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn workspace_for(
    path: &Utf8Path,
    config: Option<&Utf8Path>,
) -> Result<Workspace, Box<dyn std::error::Error>> {
    let dir = path.parent().unwrap_or(Utf8Path::new("."));
    Ok(Workspace::new(Config::discover(config, dir)?))
}

fn read_document(path: &Utf8Path) -> Result<HostDocument, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
    Ok(HostDocument::new(path, text))
}

/// Convert a 1-based CLI position.
fn position(line: usize, column: usize) -> Result<TextPosition, Box<dyn std::error::Error>> {
    if line == 0 || column == 0 {
        return Err("line and column are 1-based".into());
    }
    Ok(TextPosition::new(line - 1, column - 1))
}

fn cmd_summary(
    file: &Utf8Path,
    json: bool,
    config: Option<&Utf8Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = workspace_for(file, config)?;
    let summary = workspace.summarize_file(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ComponentSummary) {
    println!("props:");
    for prop in &summary.props {
        let mut line = format!(
            "  {} ({})",
            prop.name,
            if prop.required { "required" } else { "optional" }
        );
        if let Some(default) = &prop.default {
            line.push_str(&format!(" = {}", default));
        }
        println!("{}", line);
    }

    println!("inports:");
    for port in &summary.inports {
        match &port.comment {
            Some(comment) => println!("  {} - {}", port.inport_display_name(), comment),
            None => println!("  {}", port.inport_display_name()),
        }
    }

    println!("outports:");
    for port in &summary.outports {
        match &port.comment {
            Some(comment) => println!("  {} - {}", port.outport_display_name(), comment),
            None => println!("  {}", port.outport_display_name()),
        }
    }
}

fn cmd_definition(
    doc: &Utf8Path,
    line: usize,
    column: usize,
    config: Option<&Utf8Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = workspace_for(doc, config)?;
    let document = read_document(doc)?;

    let target = workspace
        .definition(&document, position(line, column)?)
        .ok_or("no definition found")?;
    println!("{}:{}:{}", target.path, target.line + 1, target.character + 1);
    Ok(())
}

fn cmd_hover(
    doc: &Utf8Path,
    line: usize,
    column: usize,
    json: bool,
    config: Option<&Utf8Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = workspace_for(doc, config)?;
    let document = read_document(doc)?;

    let Some(hover) = workspace.hover(&document, position(line, column)?) else {
        eprintln!("No process at {}:{}:{}", doc, line, column);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&hover)?);
    } else {
        print!("{}", hover.to_markdown());
    }
    Ok(())
}

fn cmd_graph(doc: &Utf8Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let document = read_document(doc)?;
    let graphs = document
        .graphs()?
        .into_iter()
        .map(|text| FbpParser.parse(text))
        .collect::<Result<Vec<_>, _>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&graphs)?);
        return Ok(());
    }

    let mut count = 0;
    for graph in &graphs {
        for process in graph.processes.values() {
            match &process.component {
                Some(component) => println!("{} ({})", process.name, component),
                None => println!("{}", process.name),
            }
            count += 1;
        }
    }

    eprintln!("\n{} processes in {} graph(s)", count, graphs.len());
    Ok(())
}
