//! Integration tests for pseudo-element lifecycle: generated content,
//! creation and disposal as styles change, and `::first-letter` splitting.

use lumen_css::{DeclaredStyleResolver, Document, LayoutObjectKind, StyleDeclaration};
use lumen_dom::{ElementData, NodeId, PseudoId};

fn element(doc: &mut Document, parent: NodeId, data: ElementData) -> NodeId {
    let id = doc.create_element(data);
    doc.append_child(parent, id);
    id
}

fn text(doc: &mut Document, parent: NodeId, data: &str) -> NodeId {
    let id = doc.create_text(data);
    doc.append_child(parent, id);
    id
}

fn document(resolver: DeclaredStyleResolver) -> (Document, NodeId) {
    let mut doc = Document::new(resolver);
    let html = element(&mut doc, NodeId::ROOT, ElementData::new("html"));
    let body = element(&mut doc, html, ElementData::new("body"));
    (doc, body)
}

fn content(value: &str) -> StyleDeclaration {
    StyleDeclaration {
        content: Some(value.to_string()),
        ..StyleDeclaration::default()
    }
}

fn first_letter_resolver() -> DeclaredStyleResolver {
    let mut resolver = DeclaredStyleResolver::new();
    assert!(resolver.add_rule(
        "p::first-letter",
        StyleDeclaration {
            color: Some("red".to_string()),
            ..StyleDeclaration::default()
        }
    ));
    resolver
}

/// Text of the letter fragment under `pseudo`'s box and of its remaining
/// text fragment.
fn split(doc: &Document, pseudo: NodeId) -> (String, String) {
    let pseudo_box = doc.layout_object(pseudo).unwrap();
    let letter = doc.layout().children(pseudo_box)[0];
    let remaining = doc.remaining_text_layout_object(pseudo).unwrap();
    let text_of = |id| doc.layout().get(id).unwrap().as_text().unwrap().text();
    (text_of(letter), text_of(remaining))
}

#[test]
fn test_generated_content_surrounds_children() {
    let mut resolver = DeclaredStyleResolver::new();
    assert!(resolver.add_rule("div::before", content("<")));
    assert!(resolver.add_rule("div::after", content(">")));
    let (mut doc, body) = document(resolver);
    let div = element(&mut doc, body, ElementData::new("div"));
    let inner = text(&mut doc, div, "x");
    let _ = doc.recalc_style();

    let before = doc.pseudo_element(div, PseudoId::Before).unwrap();
    let after = doc.pseudo_element(div, PseudoId::After).unwrap();
    let before_box = doc.layout_object(before).unwrap();
    let div_box = doc.layout_object(div).unwrap();
    assert_eq!(
        doc.layout().children(div_box),
        &[
            before_box,
            doc.layout_object(inner).unwrap(),
            doc.layout_object(after).unwrap()
        ]
    );

    let generated = doc.layout().children(before_box)[0];
    let generated = doc.layout().get(generated).unwrap();
    assert!(generated.node.is_none());
    assert_eq!(generated.as_text().unwrap().text(), "<");
}

#[test]
fn test_before_without_content_is_not_created() {
    let mut resolver = DeclaredStyleResolver::new();
    assert!(resolver.add_rule(
        "div::before",
        StyleDeclaration {
            color: Some("blue".to_string()),
            ..StyleDeclaration::default()
        }
    ));
    let (mut doc, body) = document(resolver);
    let div = element(&mut doc, body, ElementData::new("div"));
    let _ = doc.recalc_style();

    assert!(doc.pseudo_element(div, PseudoId::Before).is_none());
}

#[test]
fn test_pseudo_element_follows_host_style() {
    let mut resolver = DeclaredStyleResolver::new();
    assert!(resolver.add_rule(".on::before", content("*")));
    let (mut doc, body) = document(resolver);
    let div = element(
        &mut doc,
        body,
        ElementData::new("div").with_attribute("class", "on"),
    );
    let _ = doc.recalc_style();
    let before = doc.pseudo_element(div, PseudoId::Before).unwrap();

    assert!(doc.set_attribute(div, "class", ""));
    let _ = doc.recalc_style();
    assert!(doc.pseudo_element(div, PseudoId::Before).is_none());
    assert!(doc.dom().parent(before).is_none());
    assert!(doc.layout_object(before).is_none());

    assert!(doc.add_class(div, "on"));
    let _ = doc.recalc_style();
    let recreated = doc.pseudo_element(div, PseudoId::Before).unwrap();
    assert_ne!(recreated, before);
    let div_box = doc.layout_object(div).unwrap();
    assert_eq!(doc.layout().children(div_box).len(), 1);
}

#[test]
fn test_detaching_host_disposes_its_pseudo_elements() {
    let mut resolver = DeclaredStyleResolver::new();
    assert!(resolver.add_rule("div::after", content("!")));
    let (mut doc, body) = document(resolver);
    let div = element(&mut doc, body, ElementData::new("div"));
    let _ = doc.recalc_style();
    let after = doc.pseudo_element(div, PseudoId::After).unwrap();

    assert!(doc.remove_child(body, div));
    assert!(doc.pseudo_element(div, PseudoId::After).is_none());
    assert!(doc.dom().parent(after).is_none());
}

#[test]
fn test_first_letter_splits_the_text_run() {
    let (mut doc, body) = document(first_letter_resolver());
    let p = element(&mut doc, body, ElementData::new("p"));
    let hello = text(&mut doc, p, "Hello");
    let _ = doc.recalc_style();

    let pseudo = doc.pseudo_element(p, PseudoId::FirstLetter).unwrap();
    let pseudo_box = doc.layout_object(pseudo).unwrap();
    let remaining = doc.remaining_text_layout_object(pseudo).unwrap();
    let p_box = doc.layout_object(p).unwrap();
    assert_eq!(doc.layout().children(p_box), &[pseudo_box, remaining]);
    assert_eq!(doc.layout_object(hello), Some(remaining));
    assert_eq!(
        doc.layout().get(pseudo_box).unwrap().kind,
        LayoutObjectKind::Inline
    );
    assert_eq!(split(&doc, pseudo), ("H".to_string(), "ello".to_string()));

    // The DOM text is never touched.
    assert_eq!(doc.dom().as_text(hello), Some("Hello"));
    assert_eq!(
        doc.layout_object(pseudo)
            .and_then(|b| doc.layout().style(b))
            .map(|style| style.inherited.color.clone()),
        Some("red".to_string())
    );
}

#[test]
fn test_first_letter_follows_text_changes() {
    let (mut doc, body) = document(first_letter_resolver());
    let p = element(&mut doc, body, ElementData::new("p"));
    let hello = text(&mut doc, p, "Hello");
    let _ = doc.recalc_style();

    assert!(doc.set_text(hello, "World"));
    let _ = doc.recalc_style();

    let pseudo = doc.pseudo_element(p, PseudoId::FirstLetter).unwrap();
    assert_eq!(split(&doc, pseudo), ("W".to_string(), "orld".to_string()));
}

#[test]
fn test_first_letter_goes_away_with_its_text() {
    let (mut doc, body) = document(first_letter_resolver());
    let p = element(&mut doc, body, ElementData::new("p"));
    let hello = text(&mut doc, p, "Hello");
    let _ = doc.recalc_style();
    let pseudo = doc.pseudo_element(p, PseudoId::FirstLetter).unwrap();

    assert!(doc.remove_child(p, hello));
    let _ = doc.recalc_style();

    assert!(doc.pseudo_element(p, PseudoId::FirstLetter).is_none());
    assert!(doc.dom().parent(pseudo).is_none());
    let p_box = doc.layout_object(p).unwrap();
    assert!(doc.layout().children(p_box).is_empty());
}

#[test]
fn test_first_letter_moves_to_a_new_text_run() {
    let (mut doc, body) = document(first_letter_resolver());
    let p = element(&mut doc, body, ElementData::new("p"));
    let hello = text(&mut doc, p, "Hello");
    let _ = doc.recalc_style();

    assert!(doc.remove_child(p, hello));
    let world = text(&mut doc, p, "World");
    let _ = doc.recalc_style();

    let pseudo = doc.pseudo_element(p, PseudoId::FirstLetter).unwrap();
    assert_eq!(
        doc.remaining_text_layout_object(pseudo),
        doc.layout_object(world)
    );
    assert_eq!(split(&doc, pseudo), ("W".to_string(), "orld".to_string()));
}

#[test]
fn test_no_first_letter_without_a_letter() {
    let (mut doc, body) = document(first_letter_resolver());
    let p = element(&mut doc, body, ElementData::new("p"));
    let dots = text(&mut doc, p, "... ");
    let _ = doc.recalc_style();

    assert!(doc.pseudo_element(p, PseudoId::FirstLetter).is_none());
    let text_box = doc.layout_object(dots).unwrap();
    assert_eq!(
        doc.layout().get(text_box).unwrap().as_text().unwrap().text(),
        "... "
    );
}
