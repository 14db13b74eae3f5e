//! `::first-letter` text splitting.
//!
//! [§ 2.3 The ::first-letter pseudo-element](https://www.w3.org/TR/css-pseudo-4/#first-letter-pseudo)
//!
//! "The ::first-letter pseudo-element represents the first typographic letter
//! unit on the first formatted line of its originating element, if it is not
//! preceded by any other content (such as images or inline tables) on its
//! line."
//!
//! The splitter finds the text run that supplies the first letter, measures
//! the letter in UTF-16 code units, and replaces the run's layout object with
//! two fragments over the same buffer: the letter (a child of the pseudo's
//! box) and the remaining text (in the run's old place). The DOM text node is
//! never touched.

use std::rc::Rc;

use lumen_dom::{DomTree, NodeId, PseudoId};
use unicode_categories::UnicodeCategories;

use crate::document::Document;
use crate::layout::{LayoutId, LayoutObjectKind, LayoutText, LayoutTree};
use crate::resolver::StyleResolver;
use crate::style::ComputedStyle;

const NO_BREAK_SPACE: u16 = 0x00A0;

/// Spaces that may precede the first letter.
fn is_space_for_first_letter(unit: u16) -> bool {
    matches!(unit, 0x20 | 0x09..=0x0D) || unit == NO_BREAK_SPACE
}

/// [§ 2.3](https://www.w3.org/TR/css-pseudo-4/#first-letter-pattern)
///
/// "Punctuation (i.e, characters that belong to the Punctuation (P*) Unicode
/// general category ...) that precedes or follows the first letter should be
/// included."
///
/// Only the open, close, initial quote, final quote and other categories
/// count. Dash and connector punctuation do not.
fn is_punctuation_for_first_letter(unit: u16) -> bool {
    char::from_u32(u32::from(unit)).is_some_and(|c| {
        c.is_punctuation_open()
            || c.is_punctuation_close()
            || c.is_punctuation_initial_quote()
            || c.is_punctuation_final_quote()
            || c.is_punctuation_other()
    })
}

/// Number of leading UTF-16 code units of `text` that form its first letter,
/// including leading spaces and the punctuation around the letter.
///
/// Returns 0 when no letter follows the leading spaces and punctuation. The
/// letter itself is a single code unit, so a surrogate pair or a base
/// character with combining marks is cut after its first unit.
#[must_use]
pub fn first_letter_length(text: &[u16]) -> usize {
    let len = text.len();
    let mut length = 0;

    while length < len && is_space_for_first_letter(text[length]) {
        length += 1;
    }
    while length < len && is_punctuation_for_first_letter(text[length]) {
        length += 1;
    }
    if length == len || is_space_for_first_letter(text[length]) {
        return 0;
    }

    // The letter.
    length += 1;

    while length < len && is_punctuation_for_first_letter(text[length]) {
        length += 1;
    }
    length
}

/// The text layout object that supplies the first letter of `element`, which
/// is either a `::first-letter` pseudo-element or its host.
///
/// Walks the layout children of the host's box in order. Already split
/// first-letter boxes, list markers and flex or grid containers are stepped
/// over, as are floats and out-of-flow boxes unless they style their own
/// first letter. Replaced content, buttons, menu lists and line breaks end
/// the search, as does a descendant box with its own first-letter style:
/// that box splits its own text when it attaches.
#[must_use]
pub fn first_letter_text_layout_object(
    dom: &DomTree,
    layout: &LayoutTree,
    element: NodeId,
) -> Option<LayoutId> {
    let host = if dom.pseudo_id(element) == PseudoId::FirstLetter {
        dom.parent(element)?
    } else {
        element
    };
    let container = layout.layout_object(host)?;
    let container_object = layout.get(container)?;
    if !container_object
        .style()
        .is_some_and(|s| s.has_pseudo_style(PseudoId::FirstLetter))
        || !layout.can_have_generated_children(container)
        || !(container_object.is_block_flow()
            || container_object.kind == LayoutObjectKind::Button)
    {
        return None;
    }

    let mut current = layout.first_child(container);
    while let Some(id) = current {
        let object = layout.get(id)?;
        if object.style_type() == PseudoId::FirstLetter {
            current = layout.next_sibling(id);
        } else if let Some(text) = object.as_text() {
            let units = if text.is_fragment() {
                &text.complete_text()[..]
            } else {
                text.units()
            };
            if first_letter_length(units) > 0 {
                break;
            }
            current = layout.next_sibling(id);
        } else if object.kind == LayoutObjectKind::ListMarker {
            current = layout.next_sibling(id);
        } else if object.is_floating_or_out_of_flow_positioned() {
            // A float that styles its own first letter supplies it.
            current = if object
                .style()
                .is_some_and(|s| s.has_pseudo_style(PseudoId::FirstLetter))
            {
                layout.first_child(id)
            } else {
                layout.next_sibling(id)
            };
        } else if object.is_atomic_inline_level()
            || matches!(
                object.kind,
                LayoutObjectKind::Button | LayoutObjectKind::MenuList | LayoutObjectKind::Br
            )
        {
            return None;
        } else if matches!(
            object.kind,
            LayoutObjectKind::FlexibleBox | LayoutObjectKind::Grid
        ) {
            current = layout.next_sibling(id);
        } else if object
            .style()
            .is_some_and(|s| s.has_pseudo_style(PseudoId::FirstLetter))
            && layout.can_have_generated_children(id)
        {
            return None;
        } else {
            current = layout.first_child(id);
        }
    }

    let found = current?;
    layout.get(found)?.is_text().then_some(found)
}

impl<R: StyleResolver> Document<R> {
    /// Splits the first-letter text run of `pseudo`'s host into a letter
    /// fragment (under the pseudo's box) and a remaining-text fragment (in
    /// the run's old position), then destroys the original run.
    pub(crate) fn attach_first_letter_text_layout_objects(&mut self, pseudo: NodeId) {
        let Some(pseudo_box) = self.layout.layout_object(pseudo) else {
            return;
        };
        let Some(text_box) = first_letter_text_layout_object(&self.dom, &self.layout, pseudo) else {
            return;
        };
        let Some(original) = self.layout.get(text_box) else {
            return;
        };
        let Some(text) = original.as_text() else {
            return;
        };
        let old_text: Rc<[u16]> = if text.is_fragment() {
            Rc::clone(text.complete_text())
        } else {
            text.units().into()
        };
        let text_node = original.node;
        let text_style = original.style().cloned();
        let length = first_letter_length(&old_text);
        let total = old_text.len();

        let mut remaining = LayoutText::fragment(Rc::clone(&old_text), length, total - length);
        remaining.first_letter = Some(pseudo);
        remaining.is_remaining_text = true;
        let remaining_box = match text_node {
            Some(node) => self.layout.create(LayoutObjectKind::Text(remaining), Some(node)),
            None => {
                let style = text_style
                    .clone()
                    .unwrap_or_else(|| Rc::new(ComputedStyle::default()));
                self.layout
                    .create_anonymous(LayoutObjectKind::Text(remaining), style)
            }
        };
        if let Some(style) = text_style {
            let _ = self.layout.set_style(remaining_box, style);
        }
        if let Some(node) = text_node {
            self.layout.set_layout_object(node, Some(remaining_box));
        }
        self.style_data_mut(pseudo).remaining_text = Some(remaining_box);

        let inside = self.layout.is_inside_flow_thread(pseudo_box);
        self.layout.set_inside_flow_thread(remaining_box, inside);
        let next = self.layout.next_sibling(pseudo_box);
        if let Some(parent) = self.layout.parent(pseudo_box) {
            self.layout.add_child(parent, remaining_box, next);
        }

        let letter_style = self
            .layout
            .style(pseudo_box)
            .cloned()
            .unwrap_or_else(|| Rc::new(ComputedStyle::default()));
        let mut letter = LayoutText::fragment(old_text, 0, length);
        letter.first_letter = Some(pseudo);
        let letter_box = self
            .layout
            .create_anonymous(LayoutObjectKind::Text(letter), Rc::clone(&letter_style));
        let _ = self.layout.set_style(letter_box, letter_style);
        self.layout.add_child(pseudo_box, letter_box, None);

        let orphaned = self.layout.destroy(text_box);
        self.clear_orphaned_first_letters(&orphaned);
        log::trace!(
            "split first letter of {pseudo:?}: {length} of {total} code units"
        );
    }

    /// Re-checks which text run supplies `pseudo`'s first letter.
    ///
    /// Returns true if the pseudo-element was reattached or disposed because
    /// the run changed, in which case no further update is needed.
    pub(crate) fn update_first_letter(&mut self, host: NodeId, pseudo: NodeId) -> bool {
        let text_box = first_letter_text_layout_object(&self.dom, &self.layout, pseudo);
        let remaining = self.remaining_text_layout_object(pseudo);
        if text_box.is_some() && text_box == remaining {
            return false;
        }
        if text_box.is_some() {
            log::debug!("first-letter text run of {host:?} moved, reattaching {pseudo:?}");
            self.reattach(pseudo);
        } else {
            log::debug!("first-letter text run of {host:?} is gone");
            self.set_pseudo_element(host, PseudoId::FirstLetter, None);
        }
        true
    }

    /// Re-slices the letter and remaining-text fragments of `pseudo` after
    /// the remaining text's complete text changed.
    pub(crate) fn update_text_fragments(&mut self, pseudo: NodeId) {
        let Some(remaining_box) = self.remaining_text_layout_object(pseudo) else {
            return;
        };
        let Some(old_text) = self
            .layout
            .get(remaining_box)
            .and_then(|o| o.as_text())
            .map(|t| Rc::clone(t.complete_text()))
        else {
            return;
        };
        let length = first_letter_length(&old_text);
        let total = old_text.len();
        self.layout
            .set_text_fragment(remaining_box, Rc::clone(&old_text), length, total - length);

        let Some(pseudo_box) = self.layout.layout_object(pseudo) else {
            return;
        };
        let letter_box = self.layout.children(pseudo_box).iter().copied().find(|&child| {
            self.layout
                .get(child)
                .and_then(|o| o.as_text())
                .is_some_and(|t| t.is_fragment() && t.first_letter == Some(pseudo))
        });
        if let Some(letter_box) = letter_box {
            self.layout.set_text_fragment(letter_box, old_text, 0, length);
        }
    }

    /// Gives the remaining text back its full string and severs the link in
    /// both directions.
    pub(crate) fn detach_first_letter(&mut self, pseudo: NodeId) {
        let Some(remaining_box) = self.style_data_mut(pseudo).remaining_text.take() else {
            return;
        };
        let node = self.layout.get(remaining_box).and_then(|o| o.node);
        let full_text: Option<Rc<[u16]>> = match node.and_then(|n| self.dom.as_text(n)) {
            Some(data) => Some(data.encode_utf16().collect()),
            None => self
                .layout
                .get(remaining_box)
                .and_then(|o| o.as_text())
                .map(|t| Rc::clone(t.complete_text())),
        };
        if let Some(full_text) = full_text {
            let len = full_text.len();
            self.layout.set_text_fragment(remaining_box, full_text, 0, len);
        }
        if let Some(text) = self.layout.text_mut(remaining_box) {
            text.first_letter = None;
            text.is_remaining_text = false;
        }
    }

    /// [§ 2.3](https://www.w3.org/TR/css-pseudo-4/#first-letter-styling)
    ///
    /// Style of `host`'s first letter, inheriting from the box that contains
    /// the letter rather than from the host.
    pub(crate) fn style_for_first_letter(
        &mut self,
        host: NodeId,
        container: LayoutId,
    ) -> Option<Rc<ComputedStyle>> {
        let container_style = self.layout.style(container).cloned()?;
        if let Some(host_style) = self.layout.layout_object(host).and_then(|b| self.layout.style(b)) {
            host_style.remove_cached_pseudo_style(PseudoId::FirstLetter);
        }
        self.uncached_pseudo_style(host, PseudoId::FirstLetter, &container_style)
            .map(Rc::new)
    }

    /// The remaining-text fragment of a `::first-letter` pseudo-element.
    #[must_use]
    pub fn remaining_text_layout_object(&self, pseudo: NodeId) -> Option<LayoutId> {
        self.style_data(pseudo).and_then(|data| data.remaining_text)
    }

    /// Drops the back-references of first-letter pseudo-elements whose
    /// remaining text was destroyed, and schedules them for recalc so they
    /// get cleaned up.
    pub(crate) fn clear_orphaned_first_letters(&mut self, orphaned: &[NodeId]) {
        for &pseudo in orphaned {
            self.style_data_mut(pseudo).remaining_text = None;
            if self.dom.parent(pseudo).is_some() {
                self.dom
                    .set_needs_style_recalc(pseudo, lumen_dom::StyleChangeType::LocalStyleChange);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn test_punctuation_classes() {
        assert!(is_punctuation_for_first_letter(u16::from(b'(')));
        assert!(is_punctuation_for_first_letter(u16::from(b'!')));
        assert!(is_punctuation_for_first_letter(0x00AB));
        assert!(!is_punctuation_for_first_letter(u16::from(b'-')));
        assert!(!is_punctuation_for_first_letter(u16::from(b'_')));
        assert!(!is_punctuation_for_first_letter(0xD83D));
    }

    #[test]
    fn test_trailing_punctuation_run() {
        assert_eq!(first_letter_length(&units("(A)!x")), 4);
        assert_eq!(first_letter_length(&units("\u{a0}a")), 2);
        assert_eq!(first_letter_length(&units("a-b")), 1);
    }

    #[test]
    fn test_surrogate_pair_is_split() {
        // U+1F600 is two code units; only the first is taken.
        assert_eq!(first_letter_length(&units("\u{1F600}ok")), 1);
    }
}
