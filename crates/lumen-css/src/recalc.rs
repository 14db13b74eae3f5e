//! Style recalc
//!
//! [§ 4.4 Computed Values](https://www.w3.org/TR/css-cascade-4/#computed)
//!
//! Walks the dirty part of the flat tree top-down, recomputes the styles
//! that may have changed, and decides per element how far the change has
//! to travel: nowhere, into its pseudo-elements, into its children, or
//! into a rebuilt layout subtree.

use std::rc::Rc;

use lumen_dom::{NodeId, PseudoId, StyleChangeType};

use crate::animation::ElementAnimations;
use crate::document::{Document, LifecycleState};
use crate::first_letter::first_letter_text_layout_object;
use crate::layout::{LayoutId, LayoutObject, traversal};
use crate::resolver::StyleResolver;
use crate::style::{ComputedStyle, StyleRecalcChange};

impl<R: StyleResolver> Document<R> {
    /// Recalculates every dirty style in the document, starting with
    /// `change` at the root, and updates the layout tree to match.
    ///
    /// Returns the change propagated out of the document element.
    pub fn recalc_style_from(&mut self, change: StyleRecalcChange) -> StyleRecalcChange {
        debug_assert!(
            self.lifecycle != LifecycleState::InStyleRecalc,
            "style recalc is not reentrant"
        );
        self.lifecycle = LifecycleState::InStyleRecalc;

        let mut change = change;
        if self.dom.style_change_type(NodeId::ROOT) >= StyleChangeType::SubtreeStyleChange {
            change = change.max(StyleRecalcChange::Force);
        }
        if change >= StyleRecalcChange::Force {
            let document_style = self.resolver.style_for_document();
            let view_style = self.layout.style(LayoutId::VIEW).cloned();
            if self
                .resolver
                .propagation_diff(view_style.as_deref(), Some(&document_style))
                != StyleRecalcChange::NoChange
            {
                let _ = self.layout.set_style(LayoutId::VIEW, Rc::new(document_style));
            }
        }
        self.dom.clear_needs_style_recalc(NodeId::ROOT);

        let mut result = StyleRecalcChange::NoChange;
        if let Some(document_element) = self.dom.document_element()
            && self.should_call_recalc_style(document_element, change)
        {
            result = self.recalc_element_style(document_element, change);
        }

        self.dom.clear_child_needs_style_recalc(NodeId::ROOT);
        self.lifecycle = LifecycleState::StyleClean;
        log::debug!(
            "style recalc done: {} resolver invocations, {} styles changed",
            self.stats.resolver_invocations,
            self.stats.styles_changed
        );
        result
    }

    /// True if `node` has to be visited during a recalc carrying `change`.
    pub(crate) fn should_call_recalc_style(&self, node: NodeId, change: StyleRecalcChange) -> bool {
        change >= StyleRecalcChange::IndependentInherit
            || self.dom.needs_style_recalc(node)
            || self.dom.child_needs_style_recalc(node)
    }

    /// Recalculates `element` (an element or a pseudo-element) and the dirty
    /// part of its subtree.
    pub(crate) fn recalc_element_style(
        &mut self,
        element: NodeId,
        change: StyleRecalcChange,
    ) -> StyleRecalcChange {
        debug_assert_eq!(self.lifecycle, LifecycleState::InStyleRecalc);
        debug_assert!(
            traversal::parent(&self.dom, element)
                .is_none_or(|parent| !self.dom.needs_style_recalc(parent)),
            "parents are styled before their children"
        );

        let mut change = change;
        if change >= StyleRecalcChange::IndependentInherit || self.dom.needs_style_recalc(element) {
            // An element without a layout object keeps its style here; it is
            // resolved afresh, but its callback selectors are still counted.
            let stale_style = if change == StyleRecalcChange::IndependentInherit {
                None
            } else {
                self.take_stored_style(element)
            };
            if change >= StyleRecalcChange::IndependentInherit
                && let Some(animations) = self.element_animations_mut(element)
            {
                animations.set_animation_style_change(false);
            }
            if let Some(parent_style) = self.parent_computed_style(element) {
                change = self.recalc_own_style(element, change, &parent_style, stale_style);
            } else if let Some(stale_style) = stale_style
                && !self.dom.needs_attach(element)
            {
                self.update_callback_selectors(Some(&stale_style), None);
            }
            self.dom.clear_needs_style_recalc(element);
        }

        if self.dom.is_pseudo_element(element) {
            self.did_recalc_pseudo_style(element);
            return change;
        }

        let child_needs = self.dom.child_needs_style_recalc(element);
        if (change >= StyleRecalcChange::UpdatePseudoElements && change < StyleRecalcChange::Reattach)
            || child_needs
        {
            self.update_pseudo_element(element, PseudoId::Before, change);

            if change > StyleRecalcChange::UpdatePseudoElements || child_needs {
                if let Some(root) = self.dom.shadow_root(element)
                    && self.should_call_recalc_style(root, change)
                {
                    self.recalc_shadow_root(root, change);
                }
                self.recalc_descendant_styles(element, change);
            }

            self.update_pseudo_element(element, PseudoId::After, change);
            self.update_pseudo_element(element, PseudoId::Backdrop, change);
            // Children may have changed which text run holds the first
            // letter.
            let first_letter_change = if child_needs {
                StyleRecalcChange::Force
            } else {
                change
            };
            self.update_pseudo_element(element, PseudoId::FirstLetter, first_letter_change);
            self.dom.clear_child_needs_style_recalc(element);
        }
        change
    }

    fn recalc_shadow_root(&mut self, root: NodeId, change: StyleRecalcChange) {
        let change = if self.dom.style_change_type(root) >= StyleChangeType::SubtreeStyleChange {
            StyleRecalcChange::Force
        } else {
            change
        };
        self.dom.clear_needs_style_recalc(root);
        self.recalc_descendant_styles(root, change);
        self.dom.clear_child_needs_style_recalc(root);
    }

    /// Children are visited last to first: a text node's box is inserted
    /// before its next sibling's, so that one has to be up to date.
    fn recalc_descendant_styles(&mut self, parent: NodeId, change: StyleRecalcChange) {
        for child in self.dom.children(parent).to_vec().into_iter().rev() {
            if self.dom.is_text(child) {
                self.recalc_text_style(child, change);
            } else if self.dom.is_element(child) && self.should_call_recalc_style(child, change) {
                let _ = self.recalc_element_style(child, change);
            }
        }
    }

    fn recalc_own_style(
        &mut self,
        element: NodeId,
        change: StyleRecalcChange,
        parent_style: &Rc<ComputedStyle>,
        stale_style: Option<Rc<ComputedStyle>>,
    ) -> StyleRecalcChange {
        let old_style = if self.dom.needs_attach(element) {
            None
        } else {
            self.computed_style(element)
        };

        let new_style = self
            .propagate_inherited_properties(element, change, old_style.as_ref(), parent_style)
            .or_else(|| self.style_for_layout_object(element));
        let Some(mut new_style) = new_style else {
            debug_assert!(self.dom.is_pseudo_element(element));
            return StyleRecalcChange::Reattach;
        };

        if let Some(old_style) = &old_style {
            self.refresh_pseudo_style_cache(element, old_style, &new_style);
        }
        let local_change = self
            .resolver
            .propagation_diff(old_style.as_deref(), Some(&new_style));
        if local_change == StyleRecalcChange::NoChange {
            self.stats.styles_unchanged += 1;
        } else {
            self.stats.styles_changed += 1;
        }
        log::trace!("recalc {element:?}: {change} from parent, {local_change} locally");

        let old_style = match old_style {
            Some(old_style) if local_change < StyleRecalcChange::Reattach => old_style,
            _ => {
                // Detach only sees the layout object's style, so the stored
                // one is uncounted here before attach counts the new one.
                if let Some(stale_style) = &stale_style
                    && !self.dom.needs_attach(element)
                {
                    self.update_callback_selectors(Some(stale_style), None);
                }
                let had_layout_object = self.dom.needs_attach(element)
                    || self.layout.layout_object(element).is_some();
                self.reattach_with_style(element, Some(new_style));
                return if had_layout_object || self.layout.layout_object(element).is_some() {
                    StyleRecalcChange::Reattach
                } else {
                    StyleRecalcChange::ReattachNoLayoutObject
                };
            }
        };

        if local_change != StyleRecalcChange::NoChange {
            self.update_callback_selectors(Some(&old_style), Some(&new_style));
        }

        let result = if self.dom.style_change_type(element) >= StyleChangeType::SubtreeStyleChange {
            StyleRecalcChange::Force
        } else if change > StyleRecalcChange::Inherit || local_change > StyleRecalcChange::Inherit {
            change.max(local_change)
        } else if local_change < StyleRecalcChange::IndependentInherit {
            if old_style.has_child_dependent_flags() && self.dom.child_needs_style_recalc(element) {
                // The flags depend on children that are about to be restyled.
                StyleRecalcChange::Inherit
            } else {
                if old_style.has_child_dependent_flags() {
                    new_style = new_style.with_child_dependent_flags_from(&old_style);
                }
                if old_style.has_any_pseudo_style() || new_style.has_any_pseudo_style() {
                    StyleRecalcChange::UpdatePseudoElements
                } else {
                    local_change
                }
            }
        } else {
            local_change
        };

        match self.layout.layout_object(element) {
            Some(object) if local_change == StyleRecalcChange::NoChange => {
                self.layout.set_style_internal(object, new_style);
            }
            Some(object) => {
                let _ = self.layout.set_style(object, new_style);
            }
            None => self.store_style(element, new_style),
        }
        result
    }

    /// Fast path for a change in independent inherited properties only:
    /// copies the old style and takes those properties from the parent.
    fn propagate_inherited_properties(
        &self,
        element: NodeId,
        change: StyleRecalcChange,
        old_style: Option<&Rc<ComputedStyle>>,
        parent_style: &ComputedStyle,
    ) -> Option<Rc<ComputedStyle>> {
        if change != StyleRecalcChange::IndependentInherit || self.dom.needs_style_recalc(element) {
            return None;
        }
        if self
            .element_animations(element)
            .is_some_and(|animations| !animations.animations().is_empty())
        {
            return None;
        }
        let mut style = ComputedStyle::clone(old_style?);
        style.propagate_independent_inherited_properties(parent_style);
        Some(Rc::new(style))
    }

    /// Re-resolves the pseudo styles cached on `old` against `new`, so the
    /// diff can tell whether any of them changed.
    fn refresh_pseudo_style_cache(&mut self, element: NodeId, old: &ComputedStyle, new: &ComputedStyle) {
        for cached in old.cached_pseudo_styles() {
            if let Some(style) = self.uncached_pseudo_style(element, cached.style_type, new) {
                let _ = new.add_cached_pseudo_style(Rc::new(style));
            }
        }
    }

    /// The style `node`'s layout object gets.
    ///
    /// Elements reuse the base style saved by their animations while only
    /// animations changed, then have their animation flags applied.
    /// Pseudo-elements take their style from the host.
    pub(crate) fn style_for_layout_object(&mut self, node: NodeId) -> Option<Rc<ComputedStyle>> {
        let pseudo = self.dom.pseudo_id(node);
        if pseudo != PseudoId::NoPseudo {
            let host = self.dom.parent(node)?;
            if pseudo == PseudoId::FirstLetter {
                let text = first_letter_text_layout_object(&self.dom, &self.layout, node)?;
                let container = self.layout.parent(text)?;
                return self.style_for_first_letter(host, container);
            }
            return self.cached_pseudo_style(host, pseudo);
        }

        let reusable = self
            .element_animations(node)
            .and_then(ElementAnimations::base_computed_style)
            .cloned();
        let base = if let Some(base) = reusable {
            self.stats.base_styles_reused += 1;
            base
        } else {
            let parent_style = self.parent_computed_style(node);
            Rc::new(self.resolve_element_style(node, parent_style.as_deref()))
        };

        let Some(animations) = self.element_animations_mut(node) else {
            return Some(base);
        };
        animations.update_base_computed_style(&base);
        let mut style = ComputedStyle::clone(&base);
        animations.update_animation_flags(&mut style);
        Some(Rc::new(style))
    }

    /// Pushes a restyled pseudo-element's style into its generated text.
    fn did_recalc_pseudo_style(&mut self, pseudo: NodeId) {
        let Some(object) = self.layout.layout_object(pseudo) else {
            return;
        };
        let Some(style) = self.layout.style(object).cloned() else {
            return;
        };
        for child in self.layout.descendants(object) {
            if self.layout.get(child).is_some_and(LayoutObject::is_text) {
                let _ = self.layout.set_style(child, Rc::clone(&style));
            }
        }
    }

    fn recalc_text_style(&mut self, text: NodeId, change: StyleRecalcChange) {
        let needs_recalc = self.dom.needs_style_recalc(text);
        let Some(object) = self.layout.layout_object(text) else {
            if needs_recalc {
                self.reattach_text(text);
            }
            return;
        };

        if (change != StyleRecalcChange::NoChange || needs_recalc)
            && let Some(style) = traversal::parent(&self.dom, text)
                .and_then(|parent| self.computed_style(parent))
        {
            let _ = self.layout.set_style(object, style);
        }
        if needs_recalc {
            let data = self.dom.as_text(text).unwrap_or_default().to_string();
            if let Some(pseudo) = self.layout.set_text(object, &data) {
                self.update_text_fragments(pseudo);
            }
        }
        self.dom.clear_needs_style_recalc(text);
    }
}
