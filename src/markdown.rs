//! Markdown host adapter.
//!
//! Bridges Markdown source and the document tree the pipeline works on:
//!
//! - [`parse`] runs pulldown-cmark and keeps image references as
//!   [`Node::Image`]; everything between them is pre-rendered into
//!   [`Node::Html`] chunks.
//! - [`to_html`] renders a (possibly transformed) tree back to HTML with maud.
//!
//! Only the CommonMark core plus strikethrough and task lists is enabled. Those
//! render without cross-event state, so the source can be cut into chunks at
//! every image without changing the output.

use crate::document::{ImageNode, Node};
use maud::{Markup, PreEscaped, html};
use pulldown_cmark::{Event, Options as MdOptions, Parser, Tag, TagEnd, html as md_html};

/// Parse Markdown into a flat root of HTML chunks and image nodes.
pub fn parse(source: &str) -> Node {
    let parser = Parser::new_ext(
        source,
        MdOptions::ENABLE_STRIKETHROUGH | MdOptions::ENABLE_TASKLISTS,
    );

    let mut children = Vec::new();
    let mut pending: Vec<Event<'_>> = Vec::new();
    let mut image: Option<PendingImage> = None;

    for event in parser {
        if let Some(current) = image.as_mut() {
            match event {
                Event::Start(Tag::Image { .. }) => current.depth += 1,
                Event::End(TagEnd::Image) if current.depth > 0 => current.depth -= 1,
                Event::End(TagEnd::Image) => {
                    if let Some(done) = image.take() {
                        children.push(Node::Image(done.finish()));
                    }
                }
                Event::Text(text) | Event::Code(text) => current.alt.push_str(&text),
                Event::SoftBreak | Event::HardBreak => current.alt.push(' '),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => {
                flush(&mut pending, &mut children);
                image = Some(PendingImage {
                    url: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                    depth: 0,
                });
            }
            other => pending.push(other),
        }
    }
    flush(&mut pending, &mut children);

    Node::root(children)
}

/// An image whose alt text is still being collected.
struct PendingImage {
    url: String,
    title: String,
    alt: String,
    /// Images nested inside this image's alt text.
    depth: usize,
}

impl PendingImage {
    fn finish(self) -> ImageNode {
        ImageNode {
            url: self.url,
            alt: (!self.alt.is_empty()).then_some(self.alt),
            title: (!self.title.is_empty()).then_some(self.title),
        }
    }
}

fn flush(pending: &mut Vec<Event<'_>>, children: &mut Vec<Node>) {
    if pending.is_empty() {
        return;
    }
    let mut rendered = String::new();
    md_html::push_html(&mut rendered, pending.drain(..));
    children.push(Node::html(rendered));
}

/// Render a document tree to HTML.
///
/// Raw markup is emitted verbatim; text and attributes are escaped.
pub fn to_html(tree: &Node) -> String {
    render_node(tree).into_string()
}

fn render_node(node: &Node) -> Markup {
    match node {
        Node::Root { children } => render_children(children),
        Node::Paragraph { children } => html! { p { (render_children(children)) } },
        Node::Heading { depth, children } => {
            let inner = render_children(children);
            match depth {
                1 => html! { h1 { (inner) } },
                2 => html! { h2 { (inner) } },
                3 => html! { h3 { (inner) } },
                4 => html! { h4 { (inner) } },
                5 => html! { h5 { (inner) } },
                _ => html! { h6 { (inner) } },
            }
        }
        Node::Blockquote { children } => html! { blockquote { (render_children(children)) } },
        Node::Emphasis { children } => html! { em { (render_children(children)) } },
        Node::Strong { children } => html! { strong { (render_children(children)) } },
        Node::Link {
            url,
            title,
            children,
        } => html! { a href=(url) title=[title] { (render_children(children)) } },
        Node::Text { value } => html! { (value) },
        Node::InlineCode { value } => html! { code { (value) } },
        Node::Image(image) => html! {
            img src=(image.url) alt=(image.alt.as_deref().unwrap_or_default()) title=[&image.title];
        },
        Node::Html { value } => PreEscaped(value.clone()),
    }
}

fn render_children(children: &[Node]) -> Markup {
    html! {
        @for child in children {
            (render_node(child))
        }
    }
}
