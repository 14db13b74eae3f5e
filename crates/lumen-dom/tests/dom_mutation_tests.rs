//! Tests for DOM tree mutation methods: remove_child, insert_before, pre_insert.

use lumen_dom::{DomError, DomTree, ElementData, NodeId, NodeType};

/// Helper to create an element node and return its NodeId.
fn alloc_element(tree: &mut DomTree, tag: &str) -> NodeId {
    tree.alloc(NodeType::Element(ElementData::new(tag)))
}

fn alloc_text(tree: &mut DomTree, text: &str) -> NodeId {
    tree.alloc(NodeType::Text(text.to_string()))
}

// ========== remove_child ==========

#[test]
fn test_remove_child_single_child() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, parent);

    let child = alloc_element(&mut tree, "p");
    tree.append_child(parent, child);

    assert_eq!(tree.children(parent).len(), 1);
    assert!(tree.remove_child(parent, child));

    assert_eq!(tree.children(parent).len(), 0);
    assert_eq!(tree.parent(child), None);
    assert_eq!(tree.prev_sibling(child), None);
    assert_eq!(tree.next_sibling(child), None);
}

#[test]
fn test_remove_child_middle_of_three() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, parent);

    let a = alloc_element(&mut tree, "a");
    let b = alloc_element(&mut tree, "b");
    let c = alloc_element(&mut tree, "c");
    tree.append_child(parent, a);
    tree.append_child(parent, b);
    tree.append_child(parent, c);

    assert!(tree.remove_child(parent, b));

    // a and c are siblings now
    assert_eq!(tree.children(parent), &[a, c]);
    assert_eq!(tree.next_sibling(a), Some(c));
    assert_eq!(tree.prev_sibling(c), Some(a));
}

#[test]
fn test_remove_child_not_a_child() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    let stranger = alloc_element(&mut tree, "span");
    tree.append_child(NodeId::ROOT, parent);

    assert!(!tree.remove_child(parent, stranger));
}

#[test]
fn test_remove_child_disconnects_subtree() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    let child = alloc_element(&mut tree, "p");
    let text = alloc_text(&mut tree, "hi");
    tree.append_child(NodeId::ROOT, parent);
    tree.append_child(parent, child);
    tree.append_child(child, text);
    assert!(tree.is_connected(text));

    let _ = tree.remove_child(parent, child);

    assert!(!tree.is_connected(child));
    assert!(!tree.is_connected(text));
    assert!(tree.is_connected(parent));
}

// ========== insert_before ==========

#[test]
fn test_insert_before_first_child() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, parent);

    let b = alloc_element(&mut tree, "b");
    tree.append_child(parent, b);

    let a = alloc_element(&mut tree, "a");
    tree.insert_before(parent, a, b);

    assert_eq!(tree.children(parent), &[a, b]);
    assert_eq!(tree.prev_sibling(a), None);
    assert_eq!(tree.next_sibling(a), Some(b));
    assert_eq!(tree.prev_sibling(b), Some(a));
}

#[test]
fn test_insert_before_middle() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, parent);

    let a = alloc_element(&mut tree, "a");
    let c = alloc_element(&mut tree, "c");
    tree.append_child(parent, a);
    tree.append_child(parent, c);

    let b = alloc_element(&mut tree, "b");
    tree.insert_before(parent, b, c);

    assert_eq!(tree.children(parent), &[a, b, c]);
    assert_eq!(tree.next_sibling(a), Some(b));
    assert_eq!(tree.prev_sibling(b), Some(a));
    assert_eq!(tree.next_sibling(b), Some(c));
    assert_eq!(tree.prev_sibling(c), Some(b));
}

// ========== pre_insert ==========

#[test]
fn test_pre_insert_moves_node_between_parents() {
    let mut tree = DomTree::new();
    let html = alloc_element(&mut tree, "html");
    tree.append_child(NodeId::ROOT, html);
    let first = alloc_element(&mut tree, "div");
    let second = alloc_element(&mut tree, "div");
    let moved = alloc_element(&mut tree, "span");
    tree.append_child(html, first);
    tree.append_child(html, second);
    tree.append_child(first, moved);

    tree.pre_insert(second, moved, None).unwrap();

    assert!(tree.children(first).is_empty());
    assert_eq!(tree.children(second), &[moved]);
    assert_eq!(tree.parent(moved), Some(second));
}

#[test]
fn test_pre_insert_rejects_ancestor() {
    let mut tree = DomTree::new();
    let outer = alloc_element(&mut tree, "div");
    let inner = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, outer);
    tree.append_child(outer, inner);

    let err = tree.pre_insert(inner, outer, None).unwrap_err();
    assert!(matches!(err, DomError::HierarchyRequest { .. }));
}

#[test]
fn test_pre_insert_rejects_text_parent() {
    let mut tree = DomTree::new();
    let text = alloc_text(&mut tree, "leaf");
    let div = alloc_element(&mut tree, "div");

    let err = tree.pre_insert(text, div, None).unwrap_err();
    assert!(matches!(err, DomError::HierarchyRequest { .. }));
}

#[test]
fn test_pre_insert_rejects_second_document_element() {
    let mut tree = DomTree::new();
    let html = alloc_element(&mut tree, "html");
    tree.pre_insert(NodeId::ROOT, html, None).unwrap();

    let other = alloc_element(&mut tree, "html");
    assert!(tree.pre_insert(NodeId::ROOT, other, None).is_err());

    let text = alloc_text(&mut tree, "stray");
    assert!(tree.pre_insert(NodeId::ROOT, text, None).is_err());
}

#[test]
fn test_pre_insert_reference_not_found() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    let elsewhere = alloc_element(&mut tree, "div");
    let stranger = alloc_element(&mut tree, "p");
    tree.append_child(NodeId::ROOT, parent);
    tree.append_child(parent, elsewhere);
    tree.append_child(elsewhere, stranger);

    let node = alloc_element(&mut tree, "span");
    let err = tree.pre_insert(parent, node, Some(stranger)).unwrap_err();
    assert_eq!(
        err,
        DomError::NotFound {
            parent,
            child: stranger
        }
    );
}

#[test]
fn test_pre_insert_before_itself_keeps_position() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, parent);
    let a = alloc_element(&mut tree, "a");
    let b = alloc_element(&mut tree, "b");
    let c = alloc_element(&mut tree, "c");
    tree.append_child(parent, a);
    tree.append_child(parent, b);
    tree.append_child(parent, c);

    tree.pre_insert(parent, b, Some(b)).unwrap();

    assert_eq!(tree.children(parent), &[a, b, c]);
}
