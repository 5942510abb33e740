//! Deterministic JSON snapshots of the tree, for tests and debugging.

use crate::{Document, NodeId, NodeKind};
use serde_json::{json, Map, Value};

impl Document {
    /// Build a deterministic JSON representation of the tree.
    /// Schema:
    /// - Document: { "type":"document", "children":[ ... ] }
    /// - Element: { "type":"element", "name":"rect", "attrs": {..}, "children":[ ... ] }
    /// - Text: { "type":"text", "text":"..." }
    /// - Imported root: { "type":"imported", "children":[ ... ] }
    pub fn to_json_value(&self) -> Value {
        node_to_json(self, self.root())
    }

    /// Pretty JSON string for snapshots and test comparisons.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value()).unwrap_or_else(|_| String::from("{}"))
    }
}

fn node_to_json(doc: &Document, node: NodeId) -> Value {
    let children: Vec<Value> = doc.children(node).map(|c| node_to_json(doc, c)).collect();
    match doc.kind(node) {
        Some(NodeKind::Document) => json!({ "type": "document", "children": children }),
        Some(NodeKind::Element(data)) => {
            let mut attrs = Map::new();
            for a in &data.attrs {
                let key = match &a.ns {
                    Some(ns) => format!("{{{ns}}}{}", a.local),
                    None => a.local.clone(),
                };
                attrs.insert(key, Value::String(a.value.clone()));
            }
            let mut obj = Map::new();
            obj.insert("type".into(), Value::String("element".into()));
            obj.insert("name".into(), Value::String(data.name.clone()));
            obj.insert("attrs".into(), Value::Object(attrs));
            if let Some(root) = data.imported {
                obj.insert("imported".into(), node_to_json(doc, root));
            }
            obj.insert("children".into(), Value::Array(children));
            Value::Object(obj)
        }
        Some(NodeKind::Text { text }) => json!({ "type": "text", "text": text }),
        Some(NodeKind::ImportedRoot { .. }) => {
            json!({ "type": "imported", "children": children })
        }
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn snapshot_is_stable() {
        let mut doc = Document::new();
        let svg = doc.append_element(doc.root(), "svg");
        doc.set_attribute(svg, None, "width", "100");
        let rect = doc.append_element(svg, "rect");
        doc.set_attribute(rect, None, "fill", "red");

        let v = doc.to_json_value();
        assert_eq!(v["children"][0]["name"], "svg");
        assert_eq!(v["children"][0]["attrs"]["width"], "100");
        assert_eq!(v["children"][0]["children"][0]["attrs"]["fill"], "red");
    }
}
