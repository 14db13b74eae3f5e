//! Lazily allocated per-element storage.
//!
//! Most elements never need a tab-index override, a shadow root or generated
//! content, so those live behind an `Option<Box<ElementRareData>>` that is only
//! allocated the first time one of them is set.

use crate::{NodeId, PseudoId};

/// The four generated-content slots an element can own.
///
/// [CSS Pseudo-Elements Level 4](https://www.w3.org/TR/css-pseudo-4/)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PseudoElementSlots {
    before: Option<NodeId>,
    after: Option<NodeId>,
    first_letter: Option<NodeId>,
    backdrop: Option<NodeId>,
}

impl PseudoElementSlots {
    /// The pseudo-element currently stored for `pseudo`, if any.
    #[must_use]
    pub const fn get(&self, pseudo: PseudoId) -> Option<NodeId> {
        match pseudo {
            PseudoId::Before => self.before,
            PseudoId::After => self.after,
            PseudoId::FirstLetter => self.first_letter,
            PseudoId::Backdrop => self.backdrop,
            PseudoId::NoPseudo | PseudoId::FirstLine => None,
        }
    }

    /// Store `element` in the slot for `pseudo`, returning what was there.
    ///
    /// `::first-line` and "no pseudo" have no slot; storing into them is a
    /// no-op that returns `None`.
    pub fn replace(&mut self, pseudo: PseudoId, element: Option<NodeId>) -> Option<NodeId> {
        let slot = match pseudo {
            PseudoId::Before => &mut self.before,
            PseudoId::After => &mut self.after,
            PseudoId::FirstLetter => &mut self.first_letter,
            PseudoId::Backdrop => &mut self.backdrop,
            PseudoId::NoPseudo | PseudoId::FirstLine => return None,
        };
        std::mem::replace(slot, element)
    }

    /// Populated slots in `before, after, backdrop, first-letter` order.
    pub fn iter(&self) -> impl Iterator<Item = (PseudoId, NodeId)> + '_ {
        PseudoId::GENERATED
            .into_iter()
            .filter_map(|pseudo| self.get(pseudo).map(|id| (pseudo, id)))
    }

    /// True if no slot is populated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.before.is_none()
            && self.after.is_none()
            && self.first_letter.is_none()
            && self.backdrop.is_none()
    }
}

/// Sparse element state, owned by exactly one element.
#[derive(Debug, Clone, Default)]
pub struct ElementRareData {
    /// [§ 6.6.3 The tabindex attribute](https://html.spec.whatwg.org/multipage/interaction.html#attr-tabindex)
    ///
    /// Explicit override set through the API; wins over the attribute.
    pub tab_index: Option<i32>,

    /// [§ 4.2.2 Shadow trees](https://dom.spec.whatwg.org/#concept-shadow-tree)
    ///
    /// The shadow root attached to this element, if any.
    pub shadow_root: Option<NodeId>,

    /// Generated pseudo-elements hosted by this element.
    pub pseudo_elements: PseudoElementSlots,
}
