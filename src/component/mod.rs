//! Static component-summary extraction.
//!
//! Parses a component module, finds its exported object literal and reads
//! props and ports from the literal's structure. Nothing is executed and
//! nothing is cached: the summary is a pure function of the source text.

pub mod export;
pub mod keys;
mod literal;
pub mod props;

use crate::languages::typescript::{ParseError, SourceParser, TsLanguage};
use crate::schema::{ComponentSummary, Extraction, PortDetail, PropDetail};
use export::ExportForm;

/// Maximum distance in bytes between the end of a comment and the key it
/// documents.
pub const DEFAULT_COMMENT_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub comment_window: usize,
    pub language: TsLanguage,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            comment_window: DEFAULT_COMMENT_WINDOW,
            language: TsLanguage::Tsx,
        }
    }
}

/// Per-stage extraction outcome, before collapsing to a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentAnalysis {
    pub export: Extraction<ExportForm>,
    /// Every named key of the exported object, unclassified.
    pub keys: Vec<PortDetail>,
    pub props: Extraction<Vec<PropDetail>>,
}

impl ComponentAnalysis {
    pub fn into_summary(self) -> ComponentSummary {
        ComponentSummary::from_parts(self.props.unwrap_or_empty(), self.keys)
    }
}

/// Run every extraction stage, keeping absent and unanalyzable apart.
pub fn analyze(source: &str, options: &AnalysisOptions) -> Result<ComponentAnalysis, ParseError> {
    let mut parser = SourceParser::new(options.language)?;
    let tree = parser.parse(source)?;

    let analysis = match export::find_export(&tree) {
        Extraction::Found(found) => ComponentAnalysis {
            export: Extraction::Found(found.form),
            keys: keys::extract_keys(&tree, found.object, options.comment_window),
            props: props::extract_props(&tree, found.object),
        },
        Extraction::NotPresent => ComponentAnalysis {
            export: Extraction::NotPresent,
            keys: Vec::new(),
            props: Extraction::NotPresent,
        },
        Extraction::NotAnalyzable => ComponentAnalysis {
            export: Extraction::NotAnalyzable,
            keys: Vec::new(),
            props: Extraction::NotAnalyzable,
        },
    };

    if !analysis.export.is_found() {
        tracing::debug!(
            "no analyzable component export ({:?}); summary will be empty",
            analysis.export
        );
    }

    Ok(analysis)
}

/// Summarize a component module with default options.
///
/// Fails only on unparsable source. Export shapes that cannot be followed
/// statically produce an empty summary.
pub fn summarize(source: &str) -> Result<ComponentSummary, ParseError> {
    summarize_with(source, &AnalysisOptions::default())
}

pub fn summarize_with(
    source: &str,
    options: &AnalysisOptions,
) -> Result<ComponentSummary, ParseError> {
    analyze(source, options).map(ComponentAnalysis::into_summary)
}
