//! Tests for the first-letter extent and for splitting a text run into
//! letter and remaining-text fragments.

use lumen_css::{DeclaredStyleResolver, Document, StyleDeclaration, first_letter_length};
use lumen_dom::{ElementData, NodeId, PseudoId};
use quickcheck_macros::quickcheck;

fn units(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// `<p>text</p>` with a `::first-letter` rule on `p`, recalculated.
fn paragraph(text: &str) -> (Document, NodeId) {
    let mut resolver = DeclaredStyleResolver::new();
    let _ = resolver.add_rule("p::first-letter", StyleDeclaration::default());
    let mut doc = Document::new(resolver);
    let html = doc.create_element(ElementData::new("html"));
    doc.append_child(NodeId::ROOT, html);
    let p = doc.create_element(ElementData::new("p"));
    doc.append_child(html, p);
    let run = doc.create_text(text);
    doc.append_child(p, run);
    let _ = doc.recalc_style();
    (doc, p)
}

#[test]
fn test_first_letter_length() {
    assert_eq!(first_letter_length(&units("")), 0);
    assert_eq!(first_letter_length(&units("Hello")), 1);
    assert_eq!(first_letter_length(&units("  Hello")), 3);
    assert_eq!(first_letter_length(&units("\"Hello")), 2);
    assert_eq!(first_letter_length(&units("... ")), 0);
    assert_eq!(first_letter_length(&units("H. Smith")), 2);
}

#[test]
fn test_space_after_punctuation_means_no_letter() {
    assert_eq!(first_letter_length(&units("\" Hello")), 0);
    assert_eq!(first_letter_length(&units("   ")), 0);
}

#[test]
fn test_leading_spaces_belong_to_the_letter() {
    let (doc, p) = paragraph("  Hi");
    let pseudo = doc.pseudo_element(p, PseudoId::FirstLetter).unwrap();
    let pseudo_box = doc.layout_object(pseudo).unwrap();
    let letter = doc.layout().children(pseudo_box)[0];
    let letter = doc.layout().get(letter).unwrap().as_text().unwrap();
    assert_eq!(letter.text(), "  H");
    assert_eq!(letter.start(), 0);
    assert_eq!(letter.len(), 3);
}

#[quickcheck]
#[allow(clippy::needless_pass_by_value)]
fn split_fragments_cover_the_text(text: String) -> bool {
    let expected = units(&text);
    let length = first_letter_length(&expected);
    let (doc, p) = paragraph(&text);
    let pseudo = doc.pseudo_element(p, PseudoId::FirstLetter);
    if length == 0 {
        return pseudo.is_none();
    }
    let Some(pseudo) = pseudo else {
        return false;
    };

    let text_of = |id| doc.layout().get(id).and_then(|o| o.as_text()).cloned();
    let Some(pseudo_box) = doc.layout_object(pseudo) else {
        return false;
    };
    let Some(letter) = doc.layout().children(pseudo_box).first().and_then(|&id| text_of(id))
    else {
        return false;
    };
    let Some(remaining) = doc
        .remaining_text_layout_object(pseudo)
        .and_then(text_of)
    else {
        return false;
    };

    let mut joined = letter.units().to_vec();
    joined.extend_from_slice(remaining.units());
    letter.len() == length && joined == expected
}
