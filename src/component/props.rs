//! Interpretation of the component's `props` entry.

use super::literal::{literal_value, member_key, named_children, pair_value, string_value, unwrap_parens};
use crate::languages::typescript::SourceTree;
use crate::schema::{Extraction, PropDetail};
use tree_sitter::Node;

/// Props declared by the object literal's `props` entry.
///
/// Two shapes are understood: an array of name strings, or a map of
/// name -> `{ required, default }`. Any other value is not analyzable.
pub fn extract_props(tree: &SourceTree, object: Node) -> Extraction<Vec<PropDetail>> {
    // Last `props` key wins, as it would at runtime.
    let Some(member) = named_children(object)
        .into_iter()
        .rev()
        .find(|member| member_key(tree, *member).as_deref() == Some("props"))
    else {
        return Extraction::NotPresent;
    };

    let Some(value) = pair_value(member).map(unwrap_parens) else {
        return Extraction::NotAnalyzable;
    };

    match value.kind() {
        "array" => Extraction::Found(array_props(tree, value)),
        "object" => Extraction::Found(object_props(tree, value)),
        kind => {
            tracing::debug!("`props` of kind `{}` is not statically analyzable", kind);
            Extraction::NotAnalyzable
        }
    }
}

fn array_props(tree: &SourceTree, array: Node) -> Vec<PropDetail> {
    let mut props = Vec::new();
    for element in named_children(array) {
        if element.kind() == "string" {
            upsert(&mut props, PropDetail::named(string_value(tree, element)));
        }
    }
    props
}

fn object_props(tree: &SourceTree, object: Node) -> Vec<PropDetail> {
    let mut props = Vec::new();
    for member in named_children(object) {
        let Some(name) = member_key(tree, member) else {
            continue;
        };
        let mut detail = PropDetail::named(name);

        if let Some(descriptor) = pair_value(member)
            .map(unwrap_parens)
            .filter(|value| value.kind() == "object")
        {
            read_descriptor(tree, descriptor, &mut detail);
        }

        upsert(&mut props, detail);
    }
    props
}

/// One level of `{ required, default }`; nested values are not unwrapped.
fn read_descriptor(tree: &SourceTree, descriptor: Node, detail: &mut PropDetail) {
    for entry in named_children(descriptor) {
        let Some(value) = pair_value(entry) else {
            continue;
        };
        match member_key(tree, entry).as_deref() {
            Some("required") => detail.required = value.kind() == "true",
            Some("default") => detail.default = literal_value(tree, value),
            _ => {}
        }
    }
}

/// Duplicate names keep their first position and take the last value.
fn upsert(props: &mut Vec<PropDetail>, detail: PropDetail) {
    match props.iter_mut().find(|p| p.name == detail.name) {
        Some(existing) => *existing = detail,
        None => props.push(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::export::find_export;
    use crate::languages::typescript::{SourceParser, TsLanguage};
    use crate::schema::LiteralValue;

    fn props_of(source: &str) -> Extraction<Vec<PropDetail>> {
        let mut parser = SourceParser::new(TsLanguage::Tsx).unwrap();
        let tree = parser.parse(source).unwrap();
        let export = find_export(&tree).found().expect("export");
        extract_props(&tree, export.object)
    }

    fn prop(name: &str, required: bool, default: Option<LiteralValue>) -> PropDetail {
        PropDetail {
            name: name.to_string(),
            required,
            default,
        }
    }

    #[test]
    fn test_array_props() {
        assert_eq!(
            props_of(r#"module.exports = { props: ["a", "b"] };"#),
            Extraction::Found(vec![PropDetail::named("a"), PropDetail::named("b")])
        );
    }

    #[test]
    fn test_array_skips_non_strings() {
        assert_eq!(
            props_of(r#"module.exports = { props: ["a", 1, name, `tpl`, 'b'] };"#),
            Extraction::Found(vec![PropDetail::named("a"), PropDetail::named("b")])
        );
    }

    #[test]
    fn test_object_props_with_descriptor() {
        assert_eq!(
            props_of("module.exports = { props: { x: { required: true, default: 5 } } };"),
            Extraction::Found(vec![prop(
                "x",
                true,
                Some(LiteralValue::Number("5".to_string()))
            )])
        );
    }

    #[test]
    fn test_object_props_variants() {
        let source = r#"
export default {
  props: {
    color: { default: "red" },
    enabled: { required: false, default: true },
    count: { required: "yes", default: null },
    loose: {},
    bare: String,
    nested: { default: { deep: 1 } },
    computedDefault: { required: true, default: make() },
  },
};
"#;
        assert_eq!(
            props_of(source),
            Extraction::Found(vec![
                prop("color", false, Some(LiteralValue::String("red".to_string()))),
                prop("enabled", false, Some(LiteralValue::Bool(true))),
                prop("count", false, Some(LiteralValue::Null)),
                prop("loose", false, None),
                prop("bare", false, None),
                prop("nested", false, None),
                prop("computedDefault", true, None),
            ])
        );
    }

    #[test]
    fn test_string_keys() {
        let source = r#"module.exports = { "props": { "size": { "required": true } } };"#;
        assert_eq!(
            props_of(source),
            Extraction::Found(vec![prop("size", true, None)])
        );
    }

    #[test]
    fn test_duplicate_names_last_write_wins() {
        let source = "module.exports = { props: { a: { default: 1 }, b: {}, a: { default: 2 } } };";
        assert_eq!(
            props_of(source),
            Extraction::Found(vec![
                prop("a", false, Some(LiteralValue::Number("2".to_string()))),
                prop("b", false, None),
            ])
        );
    }

    #[test]
    fn test_missing_props() {
        assert_eq!(props_of("module.exports = { _in: 1 };"), Extraction::NotPresent);
    }

    #[test]
    fn test_unanalyzable_props() {
        assert_eq!(
            props_of("const p = []; module.exports = { props: p };"),
            Extraction::NotAnalyzable
        );
        assert_eq!(
            props_of("const props = []; module.exports = { props };"),
            Extraction::NotAnalyzable
        );
    }
}
