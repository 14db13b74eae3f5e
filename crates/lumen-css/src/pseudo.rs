//! Pseudo-element lifecycle
//!
//! [§ 1 Pseudo-Elements](https://www.w3.org/TR/css-pseudo-4/#intro)
//!
//! "Pseudo-elements represent abstract elements of the document beyond
//! those elements explicitly created by the document language."
//!
//! Each host has at most one pseudo-element per kind. They are created
//! lazily when the host's style asks for them and disposed when it no
//! longer does, or when the host is detached.

use std::rc::Rc;

use lumen_dom::{ElementData, NodeId, PseudoId};

use crate::document::Document;
use crate::first_letter::first_letter_text_layout_object;
use crate::resolver::{ElementStyleRequest, StyleResolver};
use crate::style::{ComputedStyle, DisplayValue, Position, StyleRecalcChange};

/// True if a pseudo-element styled with `style` generates a box.
///
/// `::before` and `::after` only do with a `content` value;
/// `::first-letter` and `::backdrop` always do unless hidden.
#[must_use]
pub fn pseudo_element_layout_object_is_needed(style: Option<&ComputedStyle>) -> bool {
    let Some(style) = style else {
        return false;
    };
    if style.is_display_none() {
        return false;
    }
    if matches!(style.style_type, PseudoId::FirstLetter | PseudoId::Backdrop) {
        return true;
    }
    style.content.is_some()
}

impl<R: StyleResolver> Document<R> {
    /// The `pseudo` pseudo-element of `host`, if it exists.
    #[must_use]
    pub fn pseudo_element(&self, host: NodeId, pseudo: PseudoId) -> Option<NodeId> {
        self.dom.pseudo_element(host, pseudo)
    }

    /// Brings `host`'s `pseudo` pseudo-element in line with the host's
    /// freshly recalculated style: restyles, disposes or creates it.
    pub(crate) fn update_pseudo_element(
        &mut self,
        host: NodeId,
        pseudo: PseudoId,
        change: StyleRecalcChange,
    ) {
        debug_assert!(!self.dom.needs_style_recalc(host));
        let element = self.dom.pseudo_element(host, pseudo);

        if let Some(element) = element
            && (change == StyleRecalcChange::UpdatePseudoElements
                || self.should_call_recalc_style(element, change))
        {
            if pseudo == PseudoId::FirstLetter && self.update_first_letter(host, element) {
                return;
            }
            if self.dom.needs_style_recalc(element)
                && let Some(host_style) = self
                    .layout
                    .layout_object(host)
                    .and_then(|object| self.layout.style(object))
            {
                host_style.remove_cached_pseudo_style(pseudo);
            }
            let change = if change == StyleRecalcChange::UpdatePseudoElements {
                StyleRecalcChange::Force
            } else {
                change
            };
            let _ = self.recalc_element_style(element, change);

            let still_needed = self.layout.layout_object(host).is_some() && {
                let style = self.cached_pseudo_style(host, pseudo);
                pseudo_element_layout_object_is_needed(style.as_deref())
            };
            if !still_needed {
                log::debug!("{pseudo} of {host:?} is no longer needed");
                self.set_pseudo_element(host, pseudo, None);
            }
        } else if let Some(element) = element
            && pseudo == PseudoId::FirstLetter
            && change >= StyleRecalcChange::UpdatePseudoElements
            && first_letter_text_layout_object(&self.dom, &self.layout, element).is_none()
        {
            self.set_pseudo_element(host, pseudo, None);
        } else if change >= StyleRecalcChange::UpdatePseudoElements {
            self.create_pseudo_element_if_needed(host, pseudo);
        }
    }

    /// Creates and attaches `host`'s `pseudo` pseudo-element if the host's
    /// style asks for one that generates a box.
    pub(crate) fn create_pseudo_element_if_needed(&mut self, host: NodeId, pseudo: PseudoId) {
        if self.dom.is_pseudo_element(host) || self.dom.pseudo_element(host, pseudo).is_some() {
            return;
        }
        let Some(host_box) = self.layout.layout_object(host) else {
            return;
        };
        let Some(host_style) = self.layout.style(host_box).cloned() else {
            return;
        };
        if !matches!(pseudo, PseudoId::FirstLetter | PseudoId::Backdrop)
            && !host_style.has_pseudo_style(pseudo)
        {
            return;
        }
        // [§ 4.1](https://fullscreen.spec.whatwg.org/#::backdrop-pseudo-element)
        // "Each element in a top layer has a ::backdrop pseudo-element."
        if pseudo == PseudoId::Backdrop && !self.dom.is_in_top_layer(host) {
            return;
        }
        if pseudo == PseudoId::FirstLetter
            && (self.dom.as_element(host).is_some_and(ElementData::is_svg)
                || first_letter_text_layout_object(&self.dom, &self.layout, host).is_none())
        {
            return;
        }
        if !self.layout.can_have_generated_children(host_box) {
            return;
        }

        let style = match host_style.cached_pseudo_style(pseudo) {
            Some(style) => style,
            None => {
                let Some(style) = self.uncached_pseudo_style(host, pseudo, &host_style) else {
                    return;
                };
                host_style.add_cached_pseudo_style(Rc::new(style))
            }
        };
        if !pseudo_element_layout_object_is_needed(Some(&style)) {
            return;
        }

        let element = self.dom.create_pseudo_element(host, pseudo);
        if pseudo == PseudoId::Backdrop {
            // The backdrop renders right below its host.
            self.dom.add_to_top_layer_before(element, host);
        }
        self.set_pseudo_element(host, pseudo, Some(element));
        log::trace!("created {pseudo} {element:?} for {host:?}");
        self.attach(element, None);
    }

    /// Puts `element` in `host`'s `pseudo` slot, disposing whatever was
    /// there.
    pub(crate) fn set_pseudo_element(&mut self, host: NodeId, pseudo: PseudoId, element: Option<NodeId>) {
        let previous = self.dom.set_pseudo_element_slot(host, pseudo, element);
        if let Some(previous) = previous
            && Some(previous) != element
        {
            self.dispose_pseudo_element(previous);
        }
    }

    fn dispose_pseudo_element(&mut self, element: NodeId) {
        log::trace!("disposing {} {element:?}", self.dom.pseudo_id(element));
        self.detach(element, false);
        if self.dom.is_in_top_layer(element) {
            self.dom.remove_from_top_layer(element);
        }
        self.dom.clear_parent_or_shadow_host(element);
        let _ = self.style_data.remove(&element);
    }

    /// Disposes every pseudo-element of `host`.
    pub(crate) fn clear_pseudo_elements(&mut self, host: NodeId) {
        for (pseudo, _) in self.dom.pseudo_elements(host) {
            self.set_pseudo_element(host, pseudo, None);
        }
    }

    /// `host`'s `pseudo` style, from the cache on the host's style or
    /// resolved and cached there.
    ///
    /// `None` if the host has no box, or (except for `::backdrop`) no rule
    /// targets that pseudo-element.
    pub(crate) fn cached_pseudo_style(
        &mut self,
        host: NodeId,
        pseudo: PseudoId,
    ) -> Option<Rc<ComputedStyle>> {
        let host_box = self.layout.layout_object(host)?;
        let host_style = self.layout.style(host_box).cloned()?;
        if pseudo != PseudoId::Backdrop && !host_style.has_pseudo_style(pseudo) {
            return None;
        }
        if let Some(cached) = host_style.cached_pseudo_style(pseudo) {
            return Some(cached);
        }
        let style = self.uncached_pseudo_style(host, pseudo, &host_style)?;
        Some(host_style.add_cached_pseudo_style(Rc::new(style)))
    }

    /// Resolves `host`'s `pseudo` style inheriting from `parent_style`,
    /// bypassing the cache.
    pub(crate) fn uncached_pseudo_style(
        &mut self,
        host: NodeId,
        pseudo: PseudoId,
        parent_style: &ComputedStyle,
    ) -> Option<ComputedStyle> {
        self.stats.resolver_invocations += 1;
        let request = ElementStyleRequest {
            dom: &self.dom,
            element: host,
            parent_style: Some(parent_style),
            watched_selectors: &[],
        };
        let mut style = self.resolver.pseudo_style_for_element(&request, pseudo)?;
        if pseudo == PseudoId::FirstLetter {
            // [§ 2.3](https://www.w3.org/TR/css-pseudo-4/#first-letter-styling)
            //
            // "A floated ::first-letter pseudo-element is a block box;
            // otherwise it is an inline box." It is never positioned.
            style.display = if style.is_floating() {
                DisplayValue::block()
            } else {
                DisplayValue::inline()
            };
            style.position = Position::Static;
        }
        Some(style)
    }
}
