//! Thin helpers over `markup5ever_rcdom` for the passes that need a real tree:
//! the fallback sanitizer, the iframe snapshot, the embed restorer and the
//! excerpt text extraction.

use crate::error::{AppError, AppResult};
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_fragment, Attribute, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::rc::Rc;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// An HTML fragment parsed the way a browser parses `div.innerHTML = html`.
pub struct Fragment {
    // Dropping the document clears every descendant's children, so the tree
    // owner has to outlive `root`.
    _dom: RcDom,
    root: Handle,
}

impl Fragment {
    pub fn parse(html: &str) -> Self {
        let context = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from("div"),
        );
        let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
            .one(html);

        // The fragment nodes hang off a synthetic <html> element.
        let root = dom
            .document
            .children
            .borrow()
            .first()
            .cloned()
            .unwrap_or_else(|| dom.document.clone());
        Self { _dom: dom, root }
    }

    pub fn root(&self) -> &Handle {
        &self.root
    }

    pub fn to_html(&self) -> AppResult<String> {
        serialize_children(&self.root)
    }
}

pub fn serialize_children(node: &Handle) -> AppResult<String> {
    let mut bytes = Vec::new();
    let handle: SerializableHandle = node.clone().into();
    serialize(
        &mut bytes,
        &handle,
        SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..Default::default()
        },
    )?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.into()))
}

pub fn element_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_ascii_lowercase()),
        _ => None,
    }
}

pub fn get_attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn set_attr(node: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| &*a.name.local == name) {
            Some(existing) => existing.value = StrTendril::from_slice(value),
            None => attrs.push(Attribute {
                name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
                value: StrTendril::from_slice(value),
            }),
        }
    }
}

pub fn remove_attr(node: &Handle, name: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs.borrow_mut().retain(|a| &*a.name.local != name);
    }
}

/// Descendant elements named `tag`, in document order.
pub fn elements_by_tag(root: &Handle, tag: &str) -> Vec<Handle> {
    elements_by_tag_outside(root, tag, |_| false)
}

/// Like [`elements_by_tag`], but never looks inside an element whose name
/// satisfies `skip`.
pub fn elements_by_tag_outside(
    root: &Handle,
    tag: &str,
    skip: impl Fn(&str) -> bool,
) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack: Vec<Handle> = root.children.borrow().iter().rev().cloned().collect();
    while let Some(node) = stack.pop() {
        let name = element_name(&node);
        if name.as_deref() == Some(tag) {
            found.push(node.clone());
        }
        if name.as_deref().is_some_and(|n| skip(n)) {
            continue;
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    found
}

pub fn detach(node: &Handle) {
    if let Some(parent) = node.parent.take().and_then(|weak| weak.upgrade()) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
}

/// Concatenated text of all descendant text nodes, skipping script and style.
pub fn text_content(root: &Handle) -> String {
    let mut out = String::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        match &node.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { name, .. } if matches!(&*name.local, "script" | "style") => {}
            _ => stack.extend(node.children.borrow().iter().rev().cloned()),
        }
    }
    out
}

/// Declarations of an inline `style` value, lowercased property names.
pub fn parse_style(value: &str) -> Vec<(String, String)> {
    value
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            if property.is_empty() || value.is_empty() {
                return None;
            }
            Some((property, value.to_string()))
        })
        .collect()
}

pub fn render_style(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(property, value)| format!("{}: {};", property, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Set `property` in the element's inline style, replacing an earlier value.
pub fn set_style_property(node: &Handle, property: &str, value: &str) {
    let mut declarations = get_attr(node, "style")
        .map(|s| parse_style(&s))
        .unwrap_or_default();
    match declarations.iter_mut().find(|(p, _)| p == property) {
        Some(existing) => existing.1 = value.to_string(),
        None => declarations.push((property.to_string(), value.to_string())),
    }
    set_attr(node, "style", &render_style(&declarations));
}
