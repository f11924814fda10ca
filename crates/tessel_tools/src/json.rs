//! JSON rendering of syntax trees
//!
//! Each node is an object with its `children` array nested inside. The
//! output is written with an explicit stack, so nesting depth is bounded
//! only by memory.

use serde::Serialize;
use tessel::{Point, SyntaxNode, Tree};

/// The fields of one node, children excluded.
#[derive(Debug, Serialize)]
pub struct JsonNode {
    pub kind: String,
    pub named: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start: Point,
    pub end: Point,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub extra: bool,
    /// Source text of leaves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl JsonNode {
    #[must_use]
    pub fn new(node: &SyntaxNode, field: Option<&str>, source: &[u8]) -> Self {
        let text = if node.child_count() == 0 {
            source
                .get(node.byte_range())
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        } else {
            None
        };
        Self {
            kind: node.kind().to_string(),
            named: node.is_named(),
            field: field.map(str::to_string),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start: node.start_position(),
            end: node.end_position(),
            error: node.is_error(),
            extra: node.is_extra(),
            text,
        }
    }
}

/// JSON of the whole tree.
///
/// # Errors
///
/// Returns the serializer error, which does not occur for trees built by
/// the parser.
pub fn tree_to_json(tree: &Tree, source: &[u8]) -> serde_json::Result<String> {
    enum Step {
        Open(SyntaxNode, bool),
        Close,
    }

    let mut out = String::new();
    let mut steps = vec![Step::Open(tree.root_node(), true)];
    // Whether the innermost open `children` array already has an element.
    let mut has_sibling = vec![false];
    while let Some(step) = steps.pop() {
        let (node, root) = match step {
            Step::Close => {
                out.push_str("]}");
                has_sibling.pop();
                continue;
            }
            Step::Open(node, root) => (node, root),
        };
        if let Some(last) = has_sibling.last_mut() {
            if *last {
                out.push(',');
            }
            *last = true;
        }
        let field = if root { None } else { node.field_name() };
        let fields = serde_json::to_string(&JsonNode::new(&node, field, source))?;
        if node.child_count() == 0 {
            out.push_str(&fields);
            continue;
        }
        // Reopen the object to append the children.
        out.push_str(fields.strip_suffix('}').unwrap_or(&fields));
        out.push_str(",\"children\":[");
        has_sibling.push(false);
        steps.push(Step::Close);
        let children: Vec<SyntaxNode> = node.children().collect();
        steps.extend(children.into_iter().rev().map(|child| Step::Open(child, false)));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_tree_shape() {
        let language = tessel_p::load_language().unwrap();
        let source = b"let x = 1;";
        let tree = tessel::parse(&language, source, None);
        let value: serde_json::Value = serde_json::from_str(&tree_to_json(&tree, source).unwrap()).unwrap();

        assert_eq!(value["kind"], "source_file");
        assert_eq!(value["end_byte"], 10);
        let declaration = &value["children"][0]["children"][0];
        assert_eq!(declaration["kind"], "variable_declaration");
        let children = declaration["children"].as_array().unwrap();
        assert!(children.iter().any(|child| child["extra"] == true));
        let name = children.iter().find(|child| child["field"] == "name").unwrap();
        assert_eq!(name["kind"], "identifier");
        assert_eq!(name["text"], "x");
        assert_eq!(name["start"]["column"], 4);
        assert!(name.get("error").is_none());
    }
}
