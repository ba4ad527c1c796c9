//! Document tree handed over by the host.
//!
//! The shape follows mdast, so hosts that already hold a JSON syntax tree can
//! deserialize it directly: nodes are tagged by `type`, images carry `url`,
//! `alt` and `title`, raw markup nodes carry `value`.
//!
//! The pipeline only touches image nodes. It finds them with
//! [`Node::collect_images`], which borrows the tree immutably, and comes back
//! later through [`Node::node_at_mut`] using the recorded [`NodePath`].

use serde::{Deserialize, Serialize};

/// Child indices from the root to a node.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Root { children: Vec<Node> },
    Paragraph { children: Vec<Node> },
    Heading { depth: u8, children: Vec<Node> },
    Blockquote { children: Vec<Node> },
    Emphasis { children: Vec<Node> },
    Strong { children: Vec<Node> },
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        children: Vec<Node>,
    },
    Text { value: String },
    InlineCode { value: String },
    Image(ImageNode),
    /// Raw markup, emitted as-is.
    Html { value: String },
}

/// A Markdown image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageNode {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ImageNode {
    pub fn new(url: impl Into<String>, alt: Option<&str>) -> Self {
        Self {
            url: url.into(),
            alt: alt.map(str::to_string),
            title: None,
        }
    }

    /// Alt text, treating an empty string as missing.
    pub fn alt_text(&self) -> Option<&str> {
        self.alt.as_deref().filter(|alt| !alt.is_empty())
    }
}

impl Node {
    pub fn root(children: Vec<Node>) -> Self {
        Node::Root { children }
    }

    pub fn image(url: impl Into<String>, alt: Option<&str>) -> Self {
        Node::Image(ImageNode::new(url, alt))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            value: value.into(),
        }
    }

    pub fn html(value: impl Into<String>) -> Self {
        Node::Html {
            value: value.into(),
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root { children }
            | Node::Paragraph { children }
            | Node::Heading { children, .. }
            | Node::Blockquote { children }
            | Node::Emphasis { children }
            | Node::Strong { children }
            | Node::Link { children, .. } => children,
            Node::Text { .. } | Node::InlineCode { .. } | Node::Image(_) | Node::Html { .. } => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root { children }
            | Node::Paragraph { children }
            | Node::Heading { children, .. }
            | Node::Blockquote { children }
            | Node::Emphasis { children }
            | Node::Strong { children }
            | Node::Link { children, .. } => Some(children),
            Node::Text { .. }
            | Node::InlineCode { .. }
            | Node::Image(_)
            | Node::Html { .. } => None,
        }
    }

    /// Every image node in document (pre-)order, with its path.
    pub fn collect_images(&self) -> Vec<(NodePath, &ImageNode)> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        collect_images_into(self, &mut path, &mut found);
        found
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut node = self;
        for &index in path {
            node = node.children_mut()?.get_mut(index)?;
        }
        Some(node)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let mut node = self;
        for &index in path {
            node = node.children().get(index)?;
        }
        Some(node)
    }
}

fn collect_images_into<'a>(
    node: &'a Node,
    path: &mut NodePath,
    found: &mut Vec<(NodePath, &'a ImageNode)>,
) {
    if let Node::Image(image) = node {
        found.push((path.clone(), image));
        return;
    }
    for (index, child) in node.children().iter().enumerate() {
        path.push(index);
        collect_images_into(child, path, found);
        path.pop();
    }
}
