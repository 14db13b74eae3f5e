//! Layout tree traversal.
//!
//! The layout tree is not isomorphic to the DOM: shadow trees are flattened,
//! pseudo-elements sit around their host's children, top layer elements hang
//! off the view, and a `::first-letter` box is placed next to the text run it
//! splits rather than under its host. These functions answer "where does this
//! node's box go" without mutating anything.

use lumen_dom::{DomTree, NodeId, PseudoId};

use super::tree::{LayoutId, LayoutTree};
use crate::first_letter::first_letter_text_layout_object;

/// Parent of `node` for layout purposes: its flat tree parent.
#[must_use]
pub fn parent(dom: &DomTree, node: NodeId) -> Option<NodeId> {
    dom.flat_tree_parent(node)
}

/// The layout object boxes for `node` are inserted under, ignoring the top
/// layer.
///
/// A `::first-letter` box goes under the parent of the text run it splits.
#[must_use]
pub fn layout_object_parent(dom: &DomTree, layout: &LayoutTree, node: NodeId) -> Option<LayoutId> {
    if dom.pseudo_id(node) == PseudoId::FirstLetter {
        let text = first_letter_text_layout_object(dom, layout, node)?;
        return layout.parent(text);
    }
    layout.layout_object(parent(dom, node)?)
}

/// [§ 2.1 Top layer](https://fullscreen.spec.whatwg.org/#top-layer)
///
/// The actual layout parent of `node`. Top layer elements are rendered as
/// children of the view, whatever their DOM ancestry.
#[must_use]
pub fn layout_parent_of(dom: &DomTree, layout: &LayoutTree, node: NodeId) -> Option<LayoutId> {
    if dom.is_in_top_layer(node) {
        return Some(LayoutId::VIEW);
    }
    layout_object_parent(dom, layout, node)
}

/// Next sibling of `node` in layout tree order.
///
/// `::before` comes before the host's flat children, `::after` after them;
/// the other pseudo-elements are followed by `::after`.
#[must_use]
pub fn next_sibling(dom: &DomTree, node: NodeId) -> Option<NodeId> {
    let pseudo = dom.pseudo_id(node);
    if pseudo != PseudoId::NoPseudo {
        let host = dom.parent(node)?;
        if pseudo == PseudoId::Before
            && let Some(&first) = dom.flat_tree_children(host).first()
        {
            return Some(first);
        }
        if pseudo == PseudoId::After {
            return None;
        }
        return dom.pseudo_element(host, PseudoId::After);
    }

    if let Some(next) = dom.flat_tree_next_sibling(node) {
        return Some(next);
    }
    let parent = parent(dom, node)?;
    if dom.is_element(parent) {
        return dom.pseudo_element(parent, PseudoId::After);
    }
    None
}

/// First layout object after `node` in layout tree order.
///
/// Top layer siblings are skipped: their boxes live under the view.
#[must_use]
pub fn next_sibling_layout_object(dom: &DomTree, layout: &LayoutTree, node: NodeId) -> Option<LayoutId> {
    let mut sibling = next_sibling(dom, node);
    while let Some(current) = sibling {
        if let Some(object) = layout.layout_object(current)
            && !dom.is_in_top_layer(current)
        {
            return Some(object);
        }
        sibling = next_sibling(dom, current);
    }
    None
}

/// First layout object of a top layer element after `element` in the top
/// layer.
#[must_use]
pub fn next_in_top_layer(dom: &DomTree, layout: &LayoutTree, element: NodeId) -> Option<LayoutId> {
    let top_layer = dom.top_layer_elements();
    let position = top_layer.iter().position(|&e| e == element)?;
    top_layer[position + 1..]
        .iter()
        .find_map(|&e| layout.layout_object(e))
}

/// The layout object a new box for `node` is inserted before.
///
/// `None` appends. A parent that is itself being attached gets its children
/// in order, so they are always appended.
#[must_use]
pub fn layout_next_sibling_of(dom: &DomTree, layout: &LayoutTree, node: NodeId) -> Option<LayoutId> {
    if dom.is_in_top_layer(node) {
        return next_in_top_layer(dom, layout, node);
    }
    if dom.pseudo_id(node) == PseudoId::FirstLetter {
        return first_letter_text_layout_object(dom, layout, node);
    }
    let parent = layout_object_parent(dom, layout, node)?;
    if let Some(parent_node) = layout.get(parent).and_then(|o| o.node)
        && dom.needs_attach(parent_node)
    {
        return None;
    }
    next_sibling_layout_object(dom, layout, node)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use lumen_dom::{ElementData, NodeType};

    use super::*;
    use crate::layout::LayoutObjectKind;
    use crate::style::ComputedStyle;

    fn element(dom: &mut DomTree, parent: NodeId, tag: &str) -> NodeId {
        let id = dom.alloc(NodeType::Element(ElementData::new(tag)));
        dom.append_child(parent, id);
        id
    }

    #[test]
    fn test_pseudo_element_sibling_order() {
        let mut dom = DomTree::new();
        let host = element(&mut dom, NodeId::ROOT, "div");
        let child = element(&mut dom, host, "span");
        let before = dom.create_pseudo_element(host, PseudoId::Before);
        let after = dom.create_pseudo_element(host, PseudoId::After);
        let _ = dom.set_pseudo_element_slot(host, PseudoId::Before, Some(before));
        let _ = dom.set_pseudo_element_slot(host, PseudoId::After, Some(after));

        assert_eq!(next_sibling(&dom, before), Some(child));
        assert_eq!(next_sibling(&dom, child), Some(after));
        assert_eq!(next_sibling(&dom, after), None);
    }

    #[test]
    fn test_before_without_children_is_followed_by_after() {
        let mut dom = DomTree::new();
        let host = element(&mut dom, NodeId::ROOT, "div");
        let before = dom.create_pseudo_element(host, PseudoId::Before);
        let after = dom.create_pseudo_element(host, PseudoId::After);
        let _ = dom.set_pseudo_element_slot(host, PseudoId::After, Some(after));
        assert_eq!(next_sibling(&dom, before), Some(after));
    }

    #[test]
    fn test_top_layer_reparents_to_view() {
        let mut dom = DomTree::new();
        let html = element(&mut dom, NodeId::ROOT, "html");
        let a = element(&mut dom, html, "div");
        let b = element(&mut dom, html, "div");
        let c = element(&mut dom, html, "div");

        let mut layout = LayoutTree::new(Rc::new(ComputedStyle::for_document()));
        let html_box = layout.create(LayoutObjectKind::BlockFlow, Some(html));
        layout.set_layout_object(html, Some(html_box));
        layout.add_child(LayoutId::VIEW, html_box, None);
        for node in [b, c] {
            let object = layout.create(LayoutObjectKind::BlockFlow, Some(node));
            layout.set_layout_object(node, Some(object));
        }

        dom.add_to_top_layer(b);
        dom.add_to_top_layer(c);
        assert_eq!(layout_parent_of(&dom, &layout, b), Some(LayoutId::VIEW));
        assert_eq!(layout_parent_of(&dom, &layout, a), Some(html_box));
        // Both later siblings live in the top layer.
        assert_eq!(next_sibling_layout_object(&dom, &layout, a), None);
        assert_eq!(
            layout_next_sibling_of(&dom, &layout, b),
            layout.layout_object(c)
        );
    }
}
