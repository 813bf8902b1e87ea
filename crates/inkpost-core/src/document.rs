// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Arena-backed document tree.
//
// Nodes are addressed by `NodeId` (an index into the arena), which gives the
// embedding pipeline a stable, copyable handle for write-back. Detached
// subtrees stay in the arena but are no longer reachable from the root.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Stable handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Root,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub data: NodeData,
    pub children: Vec<NodeId>,
}

/// A document tree. Serialises to (and from) a nested JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TreeNode", into = "TreeNode")]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Root,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append an element as the last child of `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> NodeId {
        let attributes = attributes
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.push(
            parent,
            NodeData::Element {
                tag: tag.to_string(),
                attributes,
            },
        )
    }

    /// Append a text node as the last child of `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeData::Text(text.to_string()))
    }

    /// All nodes reachable from the root, in document (pre-)order.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// Tag name when `id` is an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Overwrite (or add) an attribute. No-op on non-element nodes.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let NodeData::Element { attributes, .. } = &mut self.nodes[id.0].data {
            let value = value.into();
            match attributes.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value,
                None => attributes.push((name.to_string(), value)),
            }
        }
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attribute(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Concatenated text of every text node below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current.0];
            if let NodeData::Text(text) = &node.data {
                out.push_str(text);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Replace a node in place, dropping its children.
    pub fn replace(&mut self, id: NodeId, data: NodeData) {
        let node = &mut self.nodes[id.0];
        node.data = data;
        node.children.clear();
    }

    /// Serialise the tree as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(self.root(), &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        match &node.data {
            NodeData::Root => {
                for child in &node.children {
                    self.write_html(*child, out);
                }
            }
            NodeData::Text(text) => out.push_str(&escape(text, false)),
            NodeData::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    let _ = write!(out, " {name}=\"{}\"", escape(value, true));
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "wbr"
    )
}

fn escape(raw: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// -- Nested serde form --------------------------------------------------------

/// Nested JSON form of a [`Document`], as produced by tree providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Root {
        #[serde(default)]
        children: Vec<TreeNode>,
    },
    Element {
        tag: String,
        /// JSON object; key order is kept.
        #[serde(default, with = "ordered_attributes")]
        attributes: Vec<(String, String)>,
        #[serde(default)]
        children: Vec<TreeNode>,
    },
    Text {
        value: String,
    },
}

impl From<TreeNode> for Document {
    fn from(tree: TreeNode) -> Self {
        let mut doc = Document::new();
        let root = doc.root();
        match tree {
            TreeNode::Root { children } => {
                for child in children {
                    doc.graft(root, child);
                }
            }
            other => doc.graft(root, other),
        }
        doc
    }
}

impl Document {
    fn graft(&mut self, parent: NodeId, tree: TreeNode) {
        match tree {
            // A nested root is flattened into its parent.
            TreeNode::Root { children } => {
                for child in children {
                    self.graft(parent, child);
                }
            }
            TreeNode::Text { value } => {
                self.push(parent, NodeData::Text(value));
            }
            TreeNode::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.push(
                    parent,
                    NodeData::Element { tag, attributes },
                );
                for child in children {
                    self.graft(id, child);
                }
            }
        }
    }

    fn to_tree(&self, id: NodeId) -> TreeNode {
        let node = &self.nodes[id.0];
        let children = || -> Vec<TreeNode> {
            node.children.iter().map(|c| self.to_tree(*c)).collect()
        };
        match &node.data {
            NodeData::Root => TreeNode::Root {
                children: children(),
            },
            NodeData::Text(value) => TreeNode::Text {
                value: value.clone(),
            },
            NodeData::Element { tag, attributes } => TreeNode::Element {
                tag: tag.clone(),
                attributes: attributes.clone(),
                children: children(),
            },
        }
    }
}

/// Attribute lists as JSON objects, in source order. A repeated key keeps
/// its first position and its last value.
mod ordered_attributes {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        attributes: &[(String, String)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(attributes.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, String)>, D::Error> {
        deserializer.deserialize_map(AttributeVisitor)
    }

    struct AttributeVisitor;

    impl<'de> Visitor<'de> for AttributeVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of attribute names to string values")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut attributes: Vec<(String, String)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, value)) = map.next_entry::<String, String>()? {
                match attributes.iter_mut().find(|(k, _)| *k == name) {
                    Some(slot) => slot.1 = value,
                    None => attributes.push((name, value)),
                }
            }
            Ok(attributes)
        }
    }
}

impl From<Document> for TreeNode {
    fn from(doc: Document) -> Self {
        doc.to_tree(doc.root())
    }
}
