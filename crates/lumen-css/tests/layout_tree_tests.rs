//! Integration tests for layout tree attachment: box kinds, refusals,
//! sibling placement, multi-column flow threads, the top layer and
//! fullscreen.

use lumen_css::style::{ColumnSpan, DisplayKeyword};
use lumen_css::{
    DeclaredStyleResolver, Document, LayoutFlags, LayoutId, LayoutObjectKind, StyleDeclaration,
};
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

fn kind_of(doc: &Document, node: NodeId) -> Option<LayoutObjectKind> {
    let object = doc.layout_object(node)?;
    Some(doc.layout().get(object)?.kind.clone())
}

fn boxes(doc: &Document, nodes: &[NodeId]) -> Vec<LayoutId> {
    nodes
        .iter()
        .map(|&node| doc.layout_object(node).unwrap())
        .collect()
}

#[test]
fn test_svg_refuses_html_content() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let svg = element(&mut doc, body, ElementData::svg("svg"));
    let div = element(&mut doc, svg, ElementData::new("div"));
    let label = text(&mut doc, svg, "label");
    let group = element(&mut doc, svg, ElementData::svg("g"));
    let _ = doc.recalc_style();

    assert_eq!(kind_of(&doc, svg), Some(LayoutObjectKind::SvgRoot));
    assert_eq!(kind_of(&doc, group), Some(LayoutObjectKind::SvgContainer));
    assert!(doc.layout_object(div).is_none());
    assert!(doc.layout_object(label).is_none());
    // Refusing a box leaves the DOM alone.
    assert_eq!(doc.dom().children(svg), &[div, label, group]);
    assert!(!doc.dom().needs_style_recalc(div));
}

#[test]
fn test_svg_conditional_processing() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let svg = element(&mut doc, body, ElementData::svg("svg"));
    let french = element(
        &mut doc,
        svg,
        ElementData::svg("g").with_attribute("systemLanguage", "fr"),
    );
    let english = element(
        &mut doc,
        svg,
        ElementData::svg("g").with_attribute("systemLanguage", "en-GB"),
    );
    let _ = doc.recalc_style();

    assert!(doc.layout_object(french).is_none());
    assert!(doc.layout_object(english).is_some());
}

#[test]
fn test_menu_list_only_accepts_options() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let select = element(&mut doc, body, ElementData::new("select"));
    let option = element(&mut doc, select, ElementData::new("option"));
    let div = element(&mut doc, select, ElementData::new("div"));
    let _ = doc.recalc_style();

    assert_eq!(kind_of(&doc, select), Some(LayoutObjectKind::MenuList));
    assert!(doc.layout_object(option).is_some());
    assert!(doc.layout_object(div).is_none());
}

#[test]
fn test_whitespace_text_in_flex_container_has_no_box() {
    let mut resolver = DeclaredStyleResolver::new();
    assert!(resolver.add_rule(
        ".flex",
        StyleDeclaration {
            display: Some(DisplayKeyword::Flex),
            ..StyleDeclaration::default()
        }
    ));
    let (mut doc, body) = document(resolver);
    let flex = element(
        &mut doc,
        body,
        ElementData::new("div").with_attribute("class", "flex"),
    );
    let flex_space = text(&mut doc, flex, "  ");
    let block = element(&mut doc, body, ElementData::new("div"));
    let block_space = text(&mut doc, block, "  ");
    let _ = doc.recalc_style();

    assert_eq!(kind_of(&doc, flex), Some(LayoutObjectKind::FlexibleBox));
    assert!(doc.layout_object(flex_space).is_none());
    assert!(doc.layout_object(block_space).is_some());
}

#[test]
fn test_inserted_element_lands_between_its_siblings() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let first = element(&mut doc, body, ElementData::new("div"));
    let last = element(&mut doc, body, ElementData::new("div"));
    let _ = doc.recalc_style();

    let middle = doc.create_element(ElementData::new("div"));
    doc.insert_before(body, middle, last);
    let _ = doc.recalc_style();

    let body_box = doc.layout_object(body).unwrap();
    assert_eq!(
        doc.layout().children(body_box),
        boxes(&doc, &[first, middle, last]).as_slice()
    );

    assert!(doc.remove_child(body, middle));
    let _ = doc.recalc_style();
    assert_eq!(
        doc.layout().children(body_box),
        boxes(&doc, &[first, last]).as_slice()
    );
}

#[test]
fn test_list_item_gets_a_marker() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let ul = element(&mut doc, body, ElementData::new("ul"));
    let li = element(&mut doc, ul, ElementData::new("li"));
    let item = text(&mut doc, li, "item");
    let _ = doc.recalc_style();

    let li_box = doc.layout_object(li).unwrap();
    let children = doc.layout().children(li_box);
    assert_eq!(children.len(), 2);
    assert_eq!(
        doc.layout().get(children[0]).unwrap().kind,
        LayoutObjectKind::ListMarker
    );
    assert_eq!(Some(children[1]), doc.layout_object(item));
}

#[test]
fn test_column_spanner_inside_flow_thread() {
    let mut resolver = DeclaredStyleResolver::new();
    assert!(resolver.add_rule(
        ".cols",
        StyleDeclaration {
            column_count: Some(2),
            ..StyleDeclaration::default()
        }
    ));
    assert!(resolver.add_rule(
        ".span",
        StyleDeclaration {
            column_span: Some(ColumnSpan::All),
            ..StyleDeclaration::default()
        }
    ));
    let (mut doc, body) = document(resolver);
    let columns = element(
        &mut doc,
        body,
        ElementData::new("div").with_attribute("class", "cols"),
    );
    let spanner = element(
        &mut doc,
        columns,
        ElementData::new("p").with_attribute("class", "span"),
    );
    let paragraph = element(&mut doc, columns, ElementData::new("p"));
    // Outside a multi-column container column-span does nothing.
    let lone = element(
        &mut doc,
        body,
        ElementData::new("p").with_attribute("class", "span"),
    );
    let _ = doc.recalc_style();

    let columns_box = doc.layout_object(columns).unwrap();
    let flow_thread = doc.layout().flow_thread(columns_box).unwrap();
    assert_eq!(doc.layout().children(columns_box), &[flow_thread]);
    assert_eq!(
        doc.layout().children(flow_thread),
        boxes(&doc, &[spanner, paragraph]).as_slice()
    );

    let both = LayoutFlags::COLUMN_SPANNER | LayoutFlags::INSIDE_FLOW_THREAD;
    let flags = |node| {
        let object = doc.layout_object(node).unwrap();
        doc.layout().get(object).unwrap().flags
    };
    assert!(flags(spanner).contains(both));
    assert!(!flags(paragraph).contains(LayoutFlags::COLUMN_SPANNER));
    assert!(flags(paragraph).contains(LayoutFlags::INSIDE_FLOW_THREAD));
    assert!(!flags(lone).intersects(both));
}

#[test]
fn test_top_layer_element_and_backdrop_hang_off_the_view() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let dialog = element(&mut doc, body, ElementData::new("dialog"));
    let _ = doc.recalc_style();
    let view = doc.layout().view();
    let html_box = doc.layout().children(view)[0];

    doc.add_to_top_layer(dialog);
    let _ = doc.recalc_style();

    let backdrop = doc.pseudo_element(dialog, PseudoId::Backdrop).unwrap();
    let dialog_box = doc.layout_object(dialog).unwrap();
    let backdrop_box = doc.layout_object(backdrop).unwrap();
    assert_eq!(
        doc.layout().children(view),
        &[html_box, backdrop_box, dialog_box]
    );
    assert_eq!(
        doc.layout().get(backdrop_box).unwrap().style_type(),
        PseudoId::Backdrop
    );

    doc.remove_from_top_layer(dialog);
    let _ = doc.recalc_style();
    assert!(doc.pseudo_element(dialog, PseudoId::Backdrop).is_none());
    assert!(doc.dom().parent(backdrop).is_none());
    assert!(doc.dom().top_layer_elements().is_empty());
    assert_eq!(doc.layout().children(view), &[html_box]);
    let body_box = doc.layout_object(body).unwrap();
    assert_eq!(
        doc.layout().parent(doc.layout_object(dialog).unwrap()),
        Some(body_box)
    );
}

#[test]
fn test_fullscreen_element_is_wrapped() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let video = element(&mut doc, body, ElementData::new("div"));
    let _ = doc.recalc_style();
    let view = doc.layout().view();

    doc.request_fullscreen(video);
    let _ = doc.recalc_style();

    let video_box = doc.layout_object(video).unwrap();
    let wrapper = doc.layout().parent(video_box).unwrap();
    assert_eq!(
        doc.layout().get(wrapper).unwrap().kind,
        LayoutObjectKind::FullScreen
    );
    assert_eq!(doc.layout().parent(wrapper), Some(view));
    assert_eq!(doc.layout().children(view).last(), Some(&wrapper));

    doc.exit_fullscreen();
    let _ = doc.recalc_style();
    assert!(
        doc.layout()
            .get(wrapper)
            .is_none_or(|object| object.kind != LayoutObjectKind::FullScreen)
    );
    assert_eq!(doc.layout().children(view).len(), 1);
    assert_eq!(
        doc.layout().parent(doc.layout_object(video).unwrap()),
        doc.layout_object(body)
    );
}

#[test]
fn test_dump_is_indented_by_depth() {
    let (mut doc, body) = document(DeclaredStyleResolver::new());
    let _ = text(&mut doc, body, "Hi");
    let _ = doc.recalc_style();

    let dump = doc.dump_layout_tree();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines[0], "LayoutView #document");
    assert_eq!(lines[1], "  LayoutBlockFlow <html>");
    assert_eq!(lines[2], "    LayoutBlockFlow <body>");
    assert_eq!(lines[3], "      LayoutText #text \"Hi\"");
}
