//! Component summary data model.
//!
//! These are the records the extractor produces for one component module and
//! that the hover provider renders. They carry no references into the parsed
//! tree, so a summary outlives the source it was extracted from.

use serde::{Serialize, Serializer};
use std::fmt;

/// One declared configuration property of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropDetail {
    pub name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<LiteralValue>,
}

impl PropDetail {
    /// A prop with no metadata (the array-of-names form).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: None,
        }
    }
}

/// A literal value copied out of the analyzed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralValue {
    /// Decoded string contents (quotes and escapes resolved).
    String(String),
    /// Numeric literal exactly as written, e.g. `5`, `1.5e3`, `0x10`.
    Number(String),
    Bool(bool),
    Null,
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => f.write_str(s),
            LiteralValue::Number(raw) => f.write_str(raw),
            LiteralValue::Bool(b) => write!(f, "{}", b),
            LiteralValue::Null => f.write_str("null"),
        }
    }
}

impl Serialize for LiteralValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LiteralValue::String(s) => serializer.serialize_str(s),
            LiteralValue::Number(raw) => match parse_js_number(raw) {
                Some(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                    serializer.serialize_i64(n as i64)
                }
                Some(n) if n.is_finite() => serializer.serialize_f64(n),
                _ => serializer.serialize_str(raw),
            },
            LiteralValue::Bool(b) => serializer.serialize_bool(*b),
            LiteralValue::Null => serializer.serialize_unit(),
        }
    }
}

/// Best-effort numeric value of a JS number literal.
fn parse_js_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    let cleaned = cleaned.strip_suffix('n').unwrap_or(&cleaned);
    let radix = |prefix_len: usize, radix: u32| {
        u64::from_str_radix(&cleaned[prefix_len..], radix)
            .ok()
            .map(|v| v as f64)
    };
    match cleaned.get(..2) {
        Some("0x") | Some("0X") => radix(2, 16),
        Some("0o") | Some("0O") => radix(2, 8),
        Some("0b") | Some("0B") => radix(2, 2),
        _ => cleaned.parse::<f64>().ok(),
    }
}

/// One key of the component's exported object, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortDetail {
    /// Raw key, including its `_` marker.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl PortDetail {
    pub fn is_inport(&self) -> bool {
        self.name.starts_with('_')
    }

    pub fn is_outport(&self) -> bool {
        self.name.ends_with('_')
    }

    /// `_size` -> `SIZE`
    pub fn inport_display_name(&self) -> String {
        let mut chars = self.name.chars();
        chars.next();
        chars.as_str().to_uppercase()
    }

    /// `done_` -> `DONE`
    pub fn outport_display_name(&self) -> String {
        let mut chars = self.name.chars();
        chars.next_back();
        chars.as_str().to_uppercase()
    }
}

/// The assembled result for one component module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComponentSummary {
    pub props: Vec<PropDetail>,
    pub inports: Vec<PortDetail>,
    pub outports: Vec<PortDetail>,
}

impl ComponentSummary {
    /// Classify the full key list into input and output ports.
    ///
    /// A key like `_x_` matches both conventions and lands in both lists.
    pub fn from_parts(props: Vec<PropDetail>, keys: Vec<PortDetail>) -> Self {
        let inports = keys.iter().filter(|k| k.is_inport()).cloned().collect();
        let outports = keys.into_iter().filter(|k| k.is_outport()).collect();
        Self {
            props,
            inports,
            outports,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty() && self.inports.is_empty() && self.outports.is_empty()
    }
}

/// Outcome of one extraction stage.
///
/// Stages keep "absent" and "present but not statically analyzable" apart;
/// only the summary boundary folds both into an empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction<T> {
    Found(T),
    NotPresent,
    NotAnalyzable,
}

impl<T> Extraction<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Extraction::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extraction<U> {
        match self {
            Extraction::Found(value) => Extraction::Found(f(value)),
            Extraction::NotPresent => Extraction::NotPresent,
            Extraction::NotAnalyzable => Extraction::NotAnalyzable,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Extraction::Found(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Default> Extraction<T> {
    pub fn unwrap_or_empty(self) -> T {
        self.found().unwrap_or_default()
    }
}
