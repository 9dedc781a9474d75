//! Locating the component export and normalizing it to an object literal.

use super::literal::{named_children, unwrap_parens};
use crate::languages::typescript::SourceTree;
use crate::schema::Extraction;
use serde::Serialize;
use tree_sitter::Node;

/// Which syntactic form exported the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportForm {
    /// `module.exports = <expr>`
    ModuleExports,
    /// `export default <expr>`
    DefaultExport,
}

/// The export statement that was used, and the object literal it denotes.
#[derive(Debug, Clone, Copy)]
pub struct ExportMatch<'t> {
    pub form: ExportForm,
    pub statement: Node<'t>,
    pub object: Node<'t>,
}

/// Body of a function value.
#[derive(Debug, Clone, Copy)]
pub enum FunctionBody<'t> {
    /// Arrow with an expression body, `() => expr`.
    Expression(Node<'t>),
    Block(Node<'t>),
}

/// Expression kinds the normalizer understands. Everything else is
/// `Unsupported` and never inspected further.
#[derive(Debug, Clone, Copy)]
pub enum ExprShape<'t> {
    Object(Node<'t>),
    Parenthesized(Node<'t>),
    Function { body: FunctionBody<'t> },
    Unsupported(&'static str),
}

impl<'t> ExprShape<'t> {
    pub fn classify(node: Node<'t>) -> Self {
        match node.kind() {
            "object" => ExprShape::Object(node),
            "parenthesized_expression" => match named_children(node).into_iter().next() {
                Some(inner) => ExprShape::Parenthesized(inner),
                None => ExprShape::Unsupported(node.kind()),
            },
            "arrow_function"
            | "function"
            | "function_expression"
            | "function_declaration"
            | "generator_function"
            | "generator_function_declaration" => match node.child_by_field_name("body") {
                Some(body) if body.kind() == "statement_block" => ExprShape::Function {
                    body: FunctionBody::Block(body),
                },
                Some(body) => ExprShape::Function {
                    body: FunctionBody::Expression(body),
                },
                None => ExprShape::Unsupported(node.kind()),
            },
            kind => ExprShape::Unsupported(kind),
        }
    }
}

/// The object literal an exported expression denotes, if it can be
/// determined statically.
pub fn normalize_to_object(node: Node) -> Option<Node> {
    match ExprShape::classify(node) {
        ExprShape::Object(object) => Some(object),
        ExprShape::Parenthesized(inner) => normalize_to_object(inner),
        ExprShape::Function {
            body: FunctionBody::Expression(body),
        } => {
            let body = unwrap_parens(body);
            (body.kind() == "object").then_some(body)
        }
        ExprShape::Function {
            body: FunctionBody::Block(block),
        } => first_returned_object(block),
        ExprShape::Unsupported(kind) => {
            tracing::debug!("export value of kind `{}` is not statically analyzable", kind);
            None
        }
    }
}

/// First top-level `return <object literal>` of a block. Nested blocks are
/// not searched and later returns are ignored.
fn first_returned_object(block: Node) -> Option<Node> {
    named_children(block)
        .into_iter()
        .filter(|statement| statement.kind() == "return_statement")
        .filter_map(|statement| named_children(statement).into_iter().next())
        .map(unwrap_parens)
        .find(|value| value.kind() == "object")
}

/// Find the component export among the module's top-level statements.
///
/// The first statement of either recognized form whose value normalizes to
/// an object literal wins, in source order. Statements that do not normalize
/// are skipped; if every candidate was skipped the shape is not analyzable.
pub fn find_export<'t>(tree: &'t SourceTree) -> Extraction<ExportMatch<'t>> {
    let mut skipped = false;

    for statement in named_children(tree.root()) {
        let Some((form, value)) = export_candidate(tree, statement) else {
            continue;
        };

        match normalize_to_object(value) {
            Some(object) => {
                tracing::debug!("component exported via {:?}", form);
                return Extraction::Found(ExportMatch {
                    form,
                    statement,
                    object,
                });
            }
            None => skipped = true,
        }
    }

    if skipped {
        Extraction::NotAnalyzable
    } else {
        Extraction::NotPresent
    }
}

fn export_candidate<'t>(tree: &SourceTree, statement: Node<'t>) -> Option<(ExportForm, Node<'t>)> {
    match statement.kind() {
        "expression_statement" => {
            let assignment = named_children(statement).into_iter().next()?;
            if assignment.kind() != "assignment_expression" {
                return None;
            }
            let left = assignment.child_by_field_name("left")?;
            is_module_exports(tree, left)
                .then(|| assignment.child_by_field_name("right"))
                .flatten()
                .map(|right| (ExportForm::ModuleExports, right))
        }
        "export_statement" => {
            let mut cursor = statement.walk();
            let is_default = statement
                .children(&mut cursor)
                .any(|child| child.kind() == "default");
            if !is_default {
                return None;
            }
            statement
                .child_by_field_name("value")
                .or_else(|| statement.child_by_field_name("declaration"))
                .map(|value| (ExportForm::DefaultExport, value))
        }
        _ => None,
    }
}

fn is_module_exports(tree: &SourceTree, node: Node) -> bool {
    if node.kind() != "member_expression" {
        return false;
    }
    let (Some(object), Some(property)) = (
        node.child_by_field_name("object"),
        node.child_by_field_name("property"),
    ) else {
        return false;
    };
    object.kind() == "identifier"
        && tree.text(object) == "module"
        && property.kind() == "property_identifier"
        && tree.text(property) == "exports"
}
