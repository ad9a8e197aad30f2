//! Host document
//!
//! A flat stand-in for the page body: the elements declared by the page
//! (the mount point) plus whatever transient elements the host inserts.
//! The JS environment shim queries it through `document.getElementById`.

use std::sync::{Arc, Mutex, MutexGuard};

use boa_gc::{Finalize, Trace, empty_trace};

/// Handle to an element attached to a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub value: String,
    pub attributes: Vec<(String, String)>,
    pub style: String,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            value: String::new(),
            attributes: Vec::new(),
            style: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct Tree {
    next_id: u64,
    children: Vec<(NodeId, Element)>,
    selection: Option<NodeId>,
}

/// Shared, thread-safe document. Clones refer to the same tree.
#[derive(Clone, Default, Finalize)]
pub struct Document {
    tree: Arc<Mutex<Tree>>,
}

// Holds no GC-managed values.
unsafe impl Trace for Document {
    empty_trace!();
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page whose body holds one `div` per id.
    pub fn with_elements<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let document = Self::new();
        for id in ids {
            document.append_child(Element::new("div").with_id(id));
        }
        document
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        // The tree holds plain data, a poisoned lock leaves it consistent.
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append_child(&self, element: Element) -> NodeId {
        let mut tree = self.tree();
        tree.next_id += 1;
        let node = NodeId(tree.next_id);
        log::debug!("[Document] append <{}> as {:?}", element.tag, node);
        tree.children.push((node, element));
        node
    }

    pub fn remove_child(&self, node: NodeId) -> Option<Element> {
        let mut tree = self.tree();
        let index = tree.children.iter().position(|(id, _)| *id == node)?;
        if tree.selection == Some(node) {
            tree.selection = None;
        }
        let (_, element) = tree.children.remove(index);
        log::debug!("[Document] removed <{}> {:?}", element.tag, node);
        Some(element)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.tree().children.iter().any(|(id, _)| *id == node)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        self.tree()
            .children
            .iter()
            .find(|(_, e)| e.id.as_deref() == Some(id))
            .map(|(_, e)| e.clone())
    }

    pub fn has_element(&self, id: &str) -> bool {
        self.get_element_by_id(id).is_some()
    }

    /// Select the full value of `node`. Returns false if it is not attached.
    pub fn select(&self, node: NodeId) -> bool {
        let mut tree = self.tree();
        if tree.children.iter().any(|(id, _)| *id == node) {
            tree.selection = Some(node);
            true
        } else {
            false
        }
    }

    /// Text of the current selection.
    pub fn selection(&self) -> Option<String> {
        let tree = self.tree();
        let node = tree.selection?;
        tree.children
            .iter()
            .find(|(id, _)| *id == node)
            .map(|(_, e)| e.value.clone())
    }

    pub fn count_by_tag(&self, tag: &str) -> usize {
        self.tree()
            .children
            .iter()
            .filter(|(_, e)| e.tag.eq_ignore_ascii_case(tag))
            .count()
    }

    pub fn len(&self) -> usize {
        self.tree().children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn page_elements_are_found_by_id() {
        let document = Document::with_elements(["root", "footer"]);
        assert!(document.has_element("root"));
        assert!(document.has_element("footer"));
        assert!(!document.has_element("missing"));
        assert_eq!(document.count_by_tag("div"), 2);
    }

    #[test_log::test]
    fn removing_selected_node_clears_selection() {
        let document = Document::new();
        let node = document.append_child(Element::new("textarea").with_value("hello"));

        assert!(document.select(node));
        assert_eq!(document.selection().as_deref(), Some("hello"));

        let removed = document.remove_child(node).unwrap();
        assert_eq!(removed.value, "hello");
        assert!(!document.contains(node));
        assert_eq!(document.selection(), None);
        assert!(!document.select(node));
    }

    #[test_log::test]
    fn clones_share_the_tree() {
        let document = Document::new();
        let other = document.clone();
        other.append_child(Element::new("div").with_id("root"));
        assert!(document.has_element("root"));
    }

    #[test_log::test]
    fn attributes() {
        let element = Element::new("textarea").with_attribute("readonly", "");
        assert_eq!(element.attribute("readonly"), Some(""));
        assert_eq!(element.attribute("disabled"), None);
    }
}
