//! Integration tests for style recalc: dirty-bit driven traversal, change
//! propagation and the reattach paths.

use lumen_css::style::{DisplayKeyword, Visibility};
use lumen_css::{
    DeclaredStyleResolver, Document, LayoutObjectKind, LifecycleState, StyleDeclaration,
    StyleRecalcChange,
};
use lumen_dom::{ElementData, NodeId, StyleChangeType};

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

/// `<html><body></body></html>` styled by `resolver`, not yet recalculated.
fn document(resolver: DeclaredStyleResolver) -> (Document, NodeId) {
    let mut doc = Document::new(resolver);
    let html = element(&mut doc, NodeId::ROOT, ElementData::new("html"));
    let body = element(&mut doc, html, ElementData::new("body"));
    (doc, body)
}

fn declaration(f: impl FnOnce(&mut StyleDeclaration)) -> StyleDeclaration {
    let mut declaration = StyleDeclaration::default();
    f(&mut declaration);
    declaration
}

#[test]
fn test_first_recalc_attaches_everything() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let div = element(&mut doc, body, ElementData::new("div"));
    let hello = text(&mut doc, div, "Hello");

    assert_eq!(doc.recalc_style(), StyleRecalcChange::Reattach);
    assert_eq!(doc.lifecycle(), LifecycleState::StyleClean);

    for node in [body, div, hello] {
        assert!(doc.layout_object(node).is_some(), "{node:?} has no box");
        assert!(!doc.dom().needs_style_recalc(node));
        assert!(!doc.dom().child_needs_style_recalc(node));
    }
    let div_box = doc.layout_object(div).unwrap();
    assert_eq!(
        doc.layout().get(div_box).unwrap().kind,
        LayoutObjectKind::BlockFlow
    );
    assert_eq!(doc.layout().children(div_box), &[doc.layout_object(hello).unwrap()]);
}

#[test]
fn test_clean_recalc_does_no_work() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let div = element(&mut doc, body, ElementData::new("div"));
    let _ = text(&mut doc, div, "Hello");
    let _ = doc.recalc_style();

    let stats = doc.stats();
    let snapshot = doc.layout_snapshot();
    assert_eq!(doc.recalc_style(), StyleRecalcChange::NoChange);
    assert_eq!(doc.stats(), stats);
    assert_eq!(doc.layout_snapshot(), snapshot);
}

#[test]
fn test_text_change_touches_only_the_text() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let div = element(&mut doc, body, ElementData::new("div"));
    let hello = text(&mut doc, div, "Hello");
    let _ = doc.recalc_style();
    let invocations = doc.stats().resolver_invocations;
    let text_box = doc.layout_object(hello).unwrap();

    assert!(doc.set_text(hello, "World"));
    assert!(doc.dom().child_needs_style_recalc(div));
    let _ = doc.recalc_style();

    assert_eq!(doc.stats().resolver_invocations, invocations);
    assert_eq!(doc.layout_object(hello), Some(text_box));
    let text = doc.layout().get(text_box).unwrap().as_text().unwrap().text();
    assert_eq!(text, "World");
}

#[test]
fn test_inherited_change_reaches_children() {
    let mut resolver = DeclaredStyleResolver::new();
    assert!(resolver.add_rule(".big", declaration(|d| d.font_size = Some(20.0))));
    let (mut doc, body) = document(resolver);
    let div = element(&mut doc, body, ElementData::new("div"));
    let span = element(&mut doc, div, ElementData::new("span"));
    let _ = doc.recalc_style();

    assert!(doc.add_class(div, "big"));
    let _ = doc.recalc_style();

    let style = doc.computed_style(span).unwrap();
    assert!((style.inherited.font_size - 20.0).abs() < f32::EPSILON);
}

#[test]
fn test_independent_inherit_skips_the_cascade_for_children() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let div = element(
        &mut doc,
        body,
        ElementData::new("div").with_attribute("class", "v"),
    );
    let span = element(&mut doc, div, ElementData::new("span"));
    let _ = text(&mut doc, span, "inner");
    let _ = doc.recalc_style();
    let invocations = doc.stats().resolver_invocations;

    assert!(doc.resolver_mut().add_rule(
        ".v",
        declaration(|d| d.visibility = Some(Visibility::Hidden))
    ));
    doc.set_needs_style_recalc(div, StyleChangeType::LocalStyleChange);
    let _ = doc.recalc_style();

    // Only the div itself went through the resolver.
    assert_eq!(doc.stats().resolver_invocations, invocations + 1);
    assert_eq!(
        doc.computed_style(span).unwrap().inherited.visibility,
        Visibility::Hidden
    );
}

#[test]
fn test_forced_recalc_escalates_to_force() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let _ = element(&mut doc, body, ElementData::new("div"));
    let _ = doc.recalc_style();

    assert_eq!(
        doc.recalc_style_from(StyleRecalcChange::Force),
        StyleRecalcChange::Force
    );
}

#[test]
fn test_reattach_is_reported_as_reattach() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let _ = element(&mut doc, body, ElementData::new("div"));
    let _ = doc.recalc_style();

    assert!(doc.resolver_mut().add_rule(
        "html",
        declaration(|d| d.display = Some(DisplayKeyword::None))
    ));
    doc.style_sheets_changed();
    assert_eq!(doc.recalc_style(), StyleRecalcChange::Reattach);
    assert!(doc.layout().children(doc.layout().view()).is_empty());
    assert!(doc.layout_object(body).is_none());
}

#[test]
fn test_display_none_round_trip() {
    let mut resolver = DeclaredStyleResolver::new();
    assert!(resolver.add_rule(
        ".hidden",
        declaration(|d| d.display = Some(DisplayKeyword::None))
    ));
    let (mut doc, body) = document(resolver);
    let div = element(&mut doc, body, ElementData::new("div"));
    let hello = text(&mut doc, div, "Hello");
    let _ = doc.recalc_style();

    assert!(doc.add_class(div, "hidden"));
    let _ = doc.recalc_style();
    assert!(doc.layout_object(div).is_none());
    assert!(doc.layout_object(hello).is_none());
    // The style of an element without a box is still available.
    assert!(doc.computed_style(div).unwrap().is_display_none());

    assert!(doc.set_attribute(div, "class", ""));
    let _ = doc.recalc_style();
    assert!(doc.layout_object(div).is_some());
    assert!(doc.layout_object(hello).is_some());
}

#[test]
fn test_shadow_tree_replaces_light_children() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let host = element(&mut doc, body, ElementData::new("div"));
    let light = element(&mut doc, host, ElementData::new("span"));
    let root = doc.attach_shadow(host);
    let shadow = element(&mut doc, root, ElementData::new("p"));
    let _ = doc.recalc_style();

    let host_box = doc.layout_object(host).unwrap();
    assert!(doc.layout_object(light).is_none());
    assert_eq!(
        doc.layout().children(host_box),
        &[doc.layout_object(shadow).unwrap()]
    );
}

#[test]
fn test_explicit_inherit_is_recomputed_when_parent_changes() {
    let mut resolver = DeclaredStyleResolver::new();
    assert!(resolver.add_rule("span", declaration(|d| d.color = Some("inherit".to_string()))));
    assert!(resolver.add_rule(".red", declaration(|d| d.color = Some("red".to_string()))));
    let (mut doc, body) = document(resolver);
    let div = element(&mut doc, body, ElementData::new("div"));
    let span = element(&mut doc, div, ElementData::new("span"));
    let _ = doc.recalc_style();

    assert!(doc.add_class(div, "red"));
    let _ = doc.recalc_style();
    assert_eq!(doc.computed_style(span).unwrap().inherited.color, "red");
}
