//! DOM tree for the lumen style engine.
//!
//! This crate provides an arena-based DOM tree structure following the
//! [DOM Living Standard](https://dom.spec.whatwg.org/), extended with the
//! per-node state a style and layout pipeline needs: style invalidation
//! levels, element rare data (shadow roots, tab index, pseudo-element slots)
//! and the document's top layer.
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all relationships,
//! providing O(1) access and traversal without borrow checker issues.
//! Pseudo-elements and shadow roots are ordinary arena nodes whose `parent`
//! points at their host, but they never appear in the host's `children`.
//!
//! Nodes are never freed. A removed subtree or a disposed pseudo-element
//! stays in the arena, detached, so a `NodeId` never comes to name a
//! different node. The arena therefore grows by one node per created
//! pseudo-element over the life of the document.

mod error;
mod flags;
mod rare_data;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

pub use error::DomError;
pub use flags::{NodeFlags, StyleChangeType};
pub use rare_data::{ElementRareData, PseudoElementSlots};

/// Map of attribute names to values for an element.
pub type AttributesMap = HashMap<String, String>;

/// A type-safe index into the DOM tree.
///
/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
/// "Each node has an associated node document..."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root document node is always at index 0.
    pub const ROOT: NodeId = NodeId(0);
}

/// [CSS Pseudo-Elements Level 4](https://www.w3.org/TR/css-pseudo-4/)
///
/// Identifies which pseudo-element a style or node belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum PseudoId {
    /// The element itself.
    #[default]
    #[strum(serialize = "")]
    NoPseudo,
    /// [§ 3.1 ::before](https://www.w3.org/TR/css-pseudo-4/#selectordef-before)
    #[strum(serialize = "::before")]
    Before,
    /// [§ 3.1 ::after](https://www.w3.org/TR/css-pseudo-4/#selectordef-after)
    #[strum(serialize = "::after")]
    After,
    /// [§ 4.1 ::backdrop](https://fullscreen.spec.whatwg.org/#::backdrop-pseudo-element)
    #[strum(serialize = "::backdrop")]
    Backdrop,
    /// [§ 2.2 ::first-letter](https://www.w3.org/TR/css-pseudo-4/#first-letter-pseudo)
    #[strum(serialize = "::first-letter")]
    FirstLetter,
    /// [§ 2.1 ::first-line](https://www.w3.org/TR/css-pseudo-4/#first-line-pseudo)
    ///
    /// Styled but never materialized as a node.
    #[strum(serialize = "::first-line")]
    FirstLine,
}

impl PseudoId {
    /// Pseudo-elements that get a node of their own, in slot order.
    pub const GENERATED: [PseudoId; 4] = [
        PseudoId::Before,
        PseudoId::After,
        PseudoId::Backdrop,
        PseudoId::FirstLetter,
    ];
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Node is an abstract interface that is used by all nodes in a tree."
///
/// Besides tree links, every node carries its style invalidation state.
#[derive(Debug, Clone)]
pub struct Node {
    /// "Each node has an associated node type"
    pub node_type: NodeType,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-parent)
    /// "An object that participates in a tree has a parent, which is either
    /// null or an object."
    ///
    /// For shadow roots and pseudo-elements this is the host element.
    pub parent: Option<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-child)
    /// "A node has an associated list of children"
    pub children: Vec<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-next-sibling)
    pub next_sibling: Option<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-previous-sibling)
    pub prev_sibling: Option<NodeId>,

    /// Pending style work for this node.
    pub style_change: StyleChangeType,

    /// Child-dirty bit, connectedness and top-layer membership.
    pub flags: NodeFlags,
}

impl Node {
    fn new(node_type: NodeType) -> Self {
        Node {
            node_type,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
            // A node starts without a layout representation.
            style_change: StyleChangeType::NeedsReattachStyleChange,
            flags: NodeFlags::empty(),
        }
    }
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Each node has an associated node type"
#[derive(Debug, Clone)]
pub enum NodeType {
    /// [§ 4.5 Interface Document](https://dom.spec.whatwg.org/#interface-document)
    Document,
    /// [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element)
    /// "Element nodes are simply known as elements."
    Element(ElementData),
    /// [§ 4.10 Interface Text](https://dom.spec.whatwg.org/#interface-text)
    /// "Text nodes are known as text."
    Text(String),
    /// [§ 4.7 Interface Comment](https://dom.spec.whatwg.org/#interface-comment)
    Comment(String),
    /// [§ 4.8 Interface ShadowRoot](https://dom.spec.whatwg.org/#interface-shadowroot)
    ShadowRoot,
    /// A generated pseudo-element owned by its host element.
    PseudoElement(PseudoId),
}

/// [§ 2.1.3 Namespaces](https://infra.spec.whatwg.org/#namespaces)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// The HTML namespace.
    #[default]
    Html,
    /// The SVG namespace.
    Svg,
}

/// Element-specific data.
///
/// Per [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element):
/// "Elements have an associated namespace, namespace prefix, local name, ..."
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// "An element's local name"
    pub tag_name: String,
    /// "An element's namespace"
    pub namespace: Namespace,
    /// "An element has an associated attribute list"
    pub attrs: AttributesMap,
    rare: Option<Box<ElementRareData>>,
}

impl ElementData {
    /// An HTML element with no attributes.
    #[must_use]
    pub fn new(tag_name: &str) -> Self {
        ElementData {
            tag_name: tag_name.to_string(),
            ..Self::default()
        }
    }

    /// An element in the SVG namespace.
    #[must_use]
    pub fn svg(tag_name: &str) -> Self {
        ElementData {
            namespace: Namespace::Svg,
            ..Self::new(tag_name)
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        let _ = self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    /// Returns the element's id attribute value if present.
    ///
    /// Per [§ 3.2.6 Global attributes](https://html.spec.whatwg.org/multipage/dom.html#global-attributes):
    /// "The id attribute specifies its element's unique identifier (ID)."
    #[must_use]
    pub fn id(&self) -> Option<&String> {
        self.attrs.get("id")
    }

    /// Returns the set of class names from the class attribute.
    ///
    /// "The class attribute, if specified, must have a value that is a set of
    /// space-separated tokens representing the various classes that the element belongs to."
    #[must_use]
    pub fn classes(&self) -> HashSet<&str> {
        self.attrs
            .get("class")
            .map(|list| list.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    /// [§ 3.2.6.6 Embedding custom non-visible data](https://html.spec.whatwg.org/multipage/dom.html#dom-dataset)
    ///
    /// Maps every `data-*` attribute to its camel-cased dataset key:
    /// "For each ASCII lower alpha in name that is preceded by a U+002D (-),
    /// remove the U+002D (-) and replace the character that followed it by
    /// the same character converted to ASCII uppercase."
    #[must_use]
    pub fn dataset(&self) -> BTreeMap<String, String> {
        self.attrs
            .iter()
            .filter_map(|(name, value)| {
                let rest = name.strip_prefix("data-")?;
                let mut key = String::with_capacity(rest.len());
                let mut chars = rest.chars().peekable();
                while let Some(c) = chars.next() {
                    if c == '-'
                        && let Some(next) = chars.peek().copied()
                        && next.is_ascii_lowercase()
                    {
                        key.push(next.to_ascii_uppercase());
                        let _ = chars.next();
                    } else {
                        key.push(c);
                    }
                }
                Some((key, value.clone()))
            })
            .collect()
    }

    /// True for elements in the SVG namespace.
    #[must_use]
    pub fn is_svg(&self) -> bool {
        self.namespace == Namespace::Svg
    }

    /// True if the rare-data side table has been allocated.
    #[must_use]
    pub const fn has_rare_data(&self) -> bool {
        self.rare.is_some()
    }

    /// The rare data, if it has been allocated.
    #[must_use]
    pub fn rare_data(&self) -> Option<&ElementRareData> {
        self.rare.as_deref()
    }

    /// Mutable rare data, allocating it on first use.
    pub fn ensure_rare_data(&mut self) -> &mut ElementRareData {
        self.rare.get_or_insert_with(Box::default)
    }
}

/// Arena-based DOM tree with O(1) node access and traversal.
///
/// [§ 4 Nodes](https://dom.spec.whatwg.org/#nodes)
///
/// "The DOM represents a document as a tree."
///
/// The tree also owns document-wide state that lives alongside the nodes:
/// the [top layer](https://fullscreen.spec.whatwg.org/#top-layer) and the
/// current fullscreen element.
#[derive(Debug, Clone)]
pub struct DomTree {
    /// All nodes in the tree, indexed by `NodeId`.
    /// The Document node is always at index 0 (`NodeId::ROOT`).
    nodes: Vec<Node>,

    /// [§ 2 Model](https://fullscreen.spec.whatwg.org/#model)
    /// "Each document has a top layer (an ordered set of elements)"
    top_layer: Vec<NodeId>,

    fullscreen_element: Option<NodeId>,
}

impl DomTree {
    /// Create a new DOM tree with just the Document node.
    #[must_use]
    pub fn new() -> Self {
        let mut document = Node::new(NodeType::Document);
        document.style_change = StyleChangeType::NoStyleChange;
        document.flags = NodeFlags::IS_CONNECTED;
        DomTree {
            nodes: vec![document],
            top_layer: Vec::new(),
            fullscreen_element: None,
        }
    }

    /// Get the root document node ID.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by its ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a mutable reference to a node by its ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Get the number of nodes in the arena, including detached ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (should always have at least the Document).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new node and return its ID.
    /// The node is not yet attached to the tree.
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(node_type));
        id
    }

    /// [§ 4.2.2 Append](https://dom.spec.whatwg.org/#concept-node-append)
    ///
    /// Appends a parentless `child` as the last child of `parent`, updating all
    /// relationships. No validity checks; see [`DomTree::pre_insert`].
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.parent(child).is_none(), "append_child of attached node");
        let prev_last_child = self.nodes[parent.0].children.last().copied();

        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);

        if let Some(prev_id) = prev_last_child {
            self.nodes[prev_id.0].next_sibling = Some(child);
            self.nodes[child.0].prev_sibling = Some(prev_id);
        }
        self.inserted_into(parent, child);
    }

    /// Inserts a parentless `child` into `parent` immediately before `reference`.
    ///
    /// Falls back to appending when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        debug_assert!(self.parent(child).is_none(), "insert_before of attached node");
        let Some(index) = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == reference)
        else {
            self.append_child(parent, child);
            return;
        };

        let prev = self.nodes[reference.0].prev_sibling;
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].prev_sibling = prev;
        self.nodes[child.0].next_sibling = Some(reference);
        self.nodes[reference.0].prev_sibling = Some(child);
        if let Some(prev_id) = prev {
            self.nodes[prev_id.0].next_sibling = Some(child);
        }
        self.inserted_into(parent, child);
    }

    /// [§ 4.2.3 Remove](https://dom.spec.whatwg.org/#concept-node-remove)
    ///
    /// Unlinks `child` from `parent`. The node stays in the arena, disconnected.
    /// Returns false if `child` was not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(index) = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == child)
        else {
            return false;
        };
        let _ = self.nodes[parent.0].children.remove(index);

        let prev = self.nodes[child.0].prev_sibling.take();
        let next = self.nodes[child.0].next_sibling.take();
        if let Some(prev_id) = prev {
            self.nodes[prev_id.0].next_sibling = next;
        }
        if let Some(next_id) = next {
            self.nodes[next_id.0].prev_sibling = prev;
        }
        self.nodes[child.0].parent = None;
        self.set_connected_recursive(child, false);
        true
    }

    /// [§ 4.2.3 Pre-insert](https://dom.spec.whatwg.org/#concept-node-pre-insert)
    ///
    /// "To pre-insert a node into a parent before a child, run these steps:
    /// 1. Ensure pre-insertion validity of node into parent before child.
    /// ...
    /// 4. Insert node into parent before referenceChild."
    ///
    /// A node that already has a parent is removed from it first.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::HierarchyRequest`] or [`DomError::NotFound`] when the
    /// [pre-insertion validity](https://dom.spec.whatwg.org/#concept-node-ensure-pre-insertion-validity)
    /// checks fail.
    pub fn pre_insert(
        &mut self,
        parent: NodeId,
        node: NodeId,
        child: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.ensure_pre_insertion_validity(parent, node, child)?;

        // "3. If referenceChild is node, then set referenceChild to node's next sibling."
        let reference = match child {
            Some(reference) if reference == node => self.next_sibling(node),
            other => other,
        };

        if let Some(old_parent) = self.parent(node)
            && !self.is_shadow_root(node)
        {
            let _ = self.remove_child(old_parent, node);
        }
        match reference {
            Some(reference) => self.insert_before(parent, node, reference),
            None => self.append_child(parent, node),
        }
        Ok(())
    }

    fn ensure_pre_insertion_validity(
        &self,
        parent: NodeId,
        node: NodeId,
        child: Option<NodeId>,
    ) -> Result<(), DomError> {
        let hierarchy = |reason| DomError::HierarchyRequest { parent, node, reason };

        // "1. If parent is not a Document, DocumentFragment, or Element node,
        //  then throw a "HierarchyRequestError" DOMException."
        match self.get(parent).map(|n| &n.node_type) {
            Some(NodeType::Document | NodeType::Element(_) | NodeType::ShadowRoot) => {}
            _ => return Err(hierarchy("parent cannot have children")),
        }

        // "2. If node is a host-including inclusive ancestor of parent, then
        //  throw a "HierarchyRequestError" DOMException."
        if node == parent || self.is_descendant_of(parent, node) {
            return Err(hierarchy("node is an ancestor of parent"));
        }

        // "3. If child is non-null and its parent is not parent, then throw a
        //  "NotFoundError" DOMException."
        if let Some(child) = child
            && self.parent(child) != Some(parent)
        {
            return Err(DomError::NotFound { parent, child });
        }

        // "4. If node is not a DocumentFragment, DocumentType, Element, or
        //  CharacterData node, then throw a "HierarchyRequestError" DOMException."
        let node_type = self.get(node).map(|n| &n.node_type);
        match node_type {
            Some(NodeType::Element(_) | NodeType::Text(_) | NodeType::Comment(_)) => {}
            _ => return Err(hierarchy("node cannot be inserted")),
        }

        // "5. If either node is a Text node and parent is a document ... then
        //  throw a "HierarchyRequestError" DOMException."
        if parent == NodeId::ROOT {
            if matches!(node_type, Some(NodeType::Text(_))) {
                return Err(hierarchy("text cannot be a child of the document"));
            }
            // "6. ... parent has an element child ..."
            if matches!(node_type, Some(NodeType::Element(_)))
                && self
                    .document_element()
                    .is_some_and(|existing| existing != node)
            {
                return Err(hierarchy("document already has a document element"));
            }
        }
        Ok(())
    }

    fn inserted_into(&mut self, parent: NodeId, child: NodeId) {
        if self.is_connected(parent) {
            self.set_connected_recursive(child, true);
        }
        if self.needs_style_recalc(child) || self.child_needs_style_recalc(child) {
            self.mark_ancestors_with_child_needs_style_recalc(child);
        }
    }

    fn set_connected_recursive(&mut self, id: NodeId, connected: bool) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.0];
            node.flags.set(NodeFlags::IS_CONNECTED, connected);
            stack.extend(node.children.iter().copied());
            if let NodeType::Element(data) = &node.node_type
                && let Some(rare) = data.rare_data()
            {
                stack.extend(rare.shadow_root);
                stack.extend(rare.pseudo_elements.iter().map(|(_, pseudo)| pseudo));
            }
        }
    }

    /// Get the parent of a node.
    ///
    /// For pseudo-elements and shadow roots this is the host element.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get all children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Get the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.first().copied())
    }

    /// Get the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.last().copied())
    }

    /// Get the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Get the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// [§ 4.2.6 Descendant](https://dom.spec.whatwg.org/#concept-tree-descendant)
    ///
    /// Check if `descendant` is a descendant of `ancestor`, crossing shadow
    /// and pseudo-element hosts.
    #[must_use]
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    /// Iterate over all ancestors of a node, from parent to root.
    #[must_use]
    pub const fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator {
            tree: self,
            current: Some(id),
            skip_self: true,
        }
    }

    /// Pre-order walk of `id` and its DOM descendants (no shadow roots or pseudos).
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Get element data if this node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Mutable element data if this node is an element.
    pub fn as_element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(|n| match &mut n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Get text content if this node is a text node.
    #[must_use]
    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// [§ 4.10 Interface CharacterData](https://dom.spec.whatwg.org/#concept-cd-replace)
    ///
    /// Replaces a text node's data. Returns false for non-text nodes.
    pub fn set_text_data(&mut self, id: NodeId, data: &str) -> bool {
        match self.get_mut(id).map(|n| &mut n.node_type) {
            Some(NodeType::Text(text)) => {
                data.clone_into(text);
                true
            }
            _ => false,
        }
    }

    /// True for element nodes.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.as_element(id).is_some()
    }

    /// True for text nodes.
    #[must_use]
    pub fn is_text(&self, id: NodeId) -> bool {
        self.as_text(id).is_some()
    }

    /// True for shadow root nodes.
    #[must_use]
    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        matches!(self.get(id).map(|n| &n.node_type), Some(NodeType::ShadowRoot))
    }

    /// True for generated pseudo-element nodes.
    #[must_use]
    pub fn is_pseudo_element(&self, id: NodeId) -> bool {
        self.pseudo_id(id) != PseudoId::NoPseudo
    }

    /// Which pseudo-element `id` is, or [`PseudoId::NoPseudo`] for ordinary nodes.
    #[must_use]
    pub fn pseudo_id(&self, id: NodeId) -> PseudoId {
        match self.get(id).map(|n| &n.node_type) {
            Some(NodeType::PseudoElement(pseudo)) => *pseudo,
            _ => PseudoId::NoPseudo,
        }
    }

    /// True for nodes that can carry a computed style: elements and pseudo-elements.
    #[must_use]
    pub fn is_element_like(&self, id: NodeId) -> bool {
        matches!(
            self.get(id).map(|n| &n.node_type),
            Some(NodeType::Element(_) | NodeType::PseudoElement(_))
        )
    }

    /// [§ 4.2.1 Document tree](https://dom.spec.whatwg.org/#connected)
    ///
    /// "An element is connected if its shadow-including root is a document."
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| n.flags.contains(NodeFlags::IS_CONNECTED))
    }

    /// [§ 3.1.1 The document element](https://html.spec.whatwg.org/multipage/dom.html#the-html-element-2)
    ///
    /// "The document element of a document is the element whose parent is that
    /// document, if it exists; otherwise null."
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .find(|&&id| self.is_element(id))
            .copied()
    }

    // --- Shadow trees ---------------------------------------------------

    /// [§ 4.9 attachShadow()](https://dom.spec.whatwg.org/#dom-element-attachshadow)
    ///
    /// Creates and returns a shadow root for `host`, or the existing one.
    /// Light-tree children of `host` stop taking part in the flat tree.
    pub fn attach_shadow(&mut self, host: NodeId) -> NodeId {
        if let Some(existing) = self.shadow_root(host) {
            return existing;
        }
        let root = self.alloc(NodeType::ShadowRoot);
        self.nodes[root.0].parent = Some(host);
        if let Some(data) = self.as_element_mut(host) {
            data.ensure_rare_data().shadow_root = Some(root);
        }
        if self.is_connected(host) {
            self.set_connected_recursive(root, true);
        }
        self.mark_ancestors_with_child_needs_style_recalc(root);
        root
    }

    /// The shadow root attached to `host`, if any.
    #[must_use]
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.as_element(host)
            .and_then(ElementData::rare_data)
            .and_then(|rare| rare.shadow_root)
    }

    /// [§ 4.2.2.2 Flat tree](https://drafts.csswg.org/css-scoping/#flat-tree)
    ///
    /// Parent of `id` in the flat tree (without slot assignment): a shadow
    /// root's children hang off its host, and the light children of a shadow
    /// host are not part of the flat tree at all.
    #[must_use]
    pub fn flat_tree_parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        if self.is_shadow_root(parent) {
            return self.parent(parent);
        }
        if self.is_pseudo_element(id) || self.is_shadow_root(id) {
            return Some(parent);
        }
        if self.shadow_root(parent).is_some() {
            return None;
        }
        Some(parent)
    }

    /// Children of `id` in the flat tree.
    #[must_use]
    pub fn flat_tree_children(&self, id: NodeId) -> &[NodeId] {
        match self.shadow_root(id) {
            Some(root) => self.children(root),
            None => self.children(id),
        }
    }

    /// Next sibling of `id` in the flat tree.
    #[must_use]
    pub fn flat_tree_next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.flat_tree_parent(id).and_then(|_| self.next_sibling(id))
    }

    /// Previous sibling of `id` in the flat tree.
    #[must_use]
    pub fn flat_tree_prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.flat_tree_parent(id).and_then(|_| self.prev_sibling(id))
    }

    // --- Rare data --------------------------------------------------------

    /// [§ 6.6.3 The tabindex attribute](https://html.spec.whatwg.org/multipage/interaction.html#attr-tabindex)
    ///
    /// The explicit override if one was set, otherwise the parsed attribute.
    #[must_use]
    pub fn tab_index(&self, id: NodeId) -> Option<i32> {
        let data = self.as_element(id)?;
        data.rare_data()
            .and_then(|rare| rare.tab_index)
            .or_else(|| data.attrs.get("tabindex")?.trim().parse().ok())
    }

    /// Sets the tab index override, allocating rare data on first use.
    pub fn set_tab_index(&mut self, id: NodeId, tab_index: i32) {
        if let Some(data) = self.as_element_mut(id) {
            data.ensure_rare_data().tab_index = Some(tab_index);
        }
    }

    /// True if `id` is an element whose rare data has been allocated.
    #[must_use]
    pub fn has_rare_data(&self, id: NodeId) -> bool {
        self.as_element(id).is_some_and(ElementData::has_rare_data)
    }

    // --- Pseudo-elements --------------------------------------------------

    /// Allocates a pseudo-element node hosted by `host`. The node is not yet
    /// stored in any slot.
    pub fn create_pseudo_element(&mut self, host: NodeId, pseudo: PseudoId) -> NodeId {
        debug_assert!(pseudo != PseudoId::NoPseudo);
        let id = self.alloc(NodeType::PseudoElement(pseudo));
        self.nodes[id.0].parent = Some(host);
        if self.is_connected(host) {
            self.nodes[id.0].flags.insert(NodeFlags::IS_CONNECTED);
        }
        id
    }

    /// The pseudo-element stored in `host`'s slot for `pseudo`.
    #[must_use]
    pub fn pseudo_element(&self, host: NodeId, pseudo: PseudoId) -> Option<NodeId> {
        self.as_element(host)?
            .rare_data()?
            .pseudo_elements
            .get(pseudo)
    }

    /// All populated pseudo-element slots of `host`.
    #[must_use]
    pub fn pseudo_elements(&self, host: NodeId) -> Vec<(PseudoId, NodeId)> {
        self.as_element(host)
            .and_then(ElementData::rare_data)
            .map(|rare| rare.pseudo_elements.iter().collect())
            .unwrap_or_default()
    }

    /// Replaces `host`'s slot for `pseudo`, returning the previous occupant.
    ///
    /// Clearing an empty slot does not allocate rare data.
    pub fn set_pseudo_element_slot(
        &mut self,
        host: NodeId,
        pseudo: PseudoId,
        element: Option<NodeId>,
    ) -> Option<NodeId> {
        let data = self.as_element_mut(host)?;
        if element.is_none() && !data.has_rare_data() {
            return None;
        }
        data.ensure_rare_data()
            .pseudo_elements
            .replace(pseudo, element)
    }

    /// Severs a disposed pseudo-element from its host and the document.
    pub fn clear_parent_or_shadow_host(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
            node.flags.remove(NodeFlags::IS_CONNECTED);
        }
    }

    // --- Style invalidation -----------------------------------------------

    /// The pending style change level of `id`.
    #[must_use]
    pub fn style_change_type(&self, id: NodeId) -> StyleChangeType {
        self.get(id)
            .map_or(StyleChangeType::NoStyleChange, |n| n.style_change)
    }

    /// True if `id` has any pending style change.
    #[must_use]
    pub fn needs_style_recalc(&self, id: NodeId) -> bool {
        self.style_change_type(id) != StyleChangeType::NoStyleChange
    }

    /// True if `id` has no layout representation and must be attached.
    #[must_use]
    pub fn needs_attach(&self, id: NodeId) -> bool {
        self.style_change_type(id) == StyleChangeType::NeedsReattachStyleChange
    }

    /// True if some descendant of `id` needs style recalc.
    #[must_use]
    pub fn child_needs_style_recalc(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| n.flags.contains(NodeFlags::CHILD_NEEDS_STYLE_RECALC))
    }

    /// Raises `id`'s pending change to at least `change` and marks its
    /// ancestors so recalc descends to it.
    pub fn set_needs_style_recalc(&mut self, id: NodeId, change: StyleChangeType) {
        debug_assert!(change != StyleChangeType::NoStyleChange);
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if change > node.style_change {
            node.style_change = change;
        }
        self.mark_ancestors_with_child_needs_style_recalc(id);
    }

    /// Overwrites the pending change level without touching ancestors.
    pub fn set_style_change(&mut self, id: NodeId, change: StyleChangeType) {
        if let Some(node) = self.get_mut(id) {
            node.style_change = change;
        }
    }

    /// Clears the pending change level.
    pub fn clear_needs_style_recalc(&mut self, id: NodeId) {
        self.set_style_change(id, StyleChangeType::NoStyleChange);
    }

    /// Sets the child-dirty bit on `id` alone.
    pub fn set_child_needs_style_recalc(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.flags.insert(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
        }
    }

    /// Clears the child-dirty bit on `id`.
    pub fn clear_child_needs_style_recalc(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.flags.remove(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
        }
    }

    /// Walks up from `id`'s parent setting the child-dirty bit, stopping at
    /// the first ancestor that already has it.
    pub fn mark_ancestors_with_child_needs_style_recalc(&mut self, id: NodeId) {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if self.child_needs_style_recalc(ancestor) {
                break;
            }
            self.set_child_needs_style_recalc(ancestor);
            current = self.parent(ancestor);
        }
    }

    // --- Top layer and fullscreen -----------------------------------------

    /// [§ 2 Model](https://fullscreen.spec.whatwg.org/#top-layer-add)
    ///
    /// "To add an element to a top layer, remove it from top layer and then
    /// append it to top layer."
    pub fn add_to_top_layer(&mut self, id: NodeId) {
        self.remove_from_top_layer(id);
        self.top_layer.push(id);
        if let Some(node) = self.get_mut(id) {
            node.flags.insert(NodeFlags::IS_IN_TOP_LAYER);
        }
    }

    /// Adds `id` to the top layer immediately before `before`, or at the end
    /// if `before` is not in the top layer.
    pub fn add_to_top_layer_before(&mut self, id: NodeId, before: NodeId) {
        self.remove_from_top_layer(id);
        match self.top_layer.iter().position(|&e| e == before) {
            Some(index) => self.top_layer.insert(index, id),
            None => self.top_layer.push(id),
        }
        if let Some(node) = self.get_mut(id) {
            node.flags.insert(NodeFlags::IS_IN_TOP_LAYER);
        }
    }

    /// Removes `id` from the top layer if present.
    pub fn remove_from_top_layer(&mut self, id: NodeId) {
        self.top_layer.retain(|&e| e != id);
        if let Some(node) = self.get_mut(id) {
            node.flags.remove(NodeFlags::IS_IN_TOP_LAYER);
        }
    }

    /// Top layer elements in paint order.
    #[must_use]
    pub fn top_layer_elements(&self) -> &[NodeId] {
        &self.top_layer
    }

    /// True if `id` is in the top layer.
    #[must_use]
    pub fn is_in_top_layer(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| n.flags.contains(NodeFlags::IS_IN_TOP_LAYER))
    }

    /// [§ 2 Model](https://fullscreen.spec.whatwg.org/#fullscreen-element)
    #[must_use]
    pub const fn fullscreen_element(&self) -> Option<NodeId> {
        self.fullscreen_element
    }

    /// Replaces the fullscreen element, returning the previous one.
    pub fn set_fullscreen_element(&mut self, element: Option<NodeId>) -> Option<NodeId> {
        std::mem::replace(&mut self.fullscreen_element, element)
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over ancestors of a node (parent to root).
pub struct AncestorIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
    skip_self: bool,
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.skip_self {
            self.skip_self = false;
            self.current = self.current.and_then(|id| self.tree.parent(id));
        }
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}
