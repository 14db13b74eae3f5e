//! Layout tree construction
//!
//! [§ 9.2 Controlling box generation](https://www.w3.org/TR/CSS2/visuren.html#box-gen)
//!
//! "The following sections describe the types of boxes that may be
//! generated in CSS 2.2. A box's type affects, in part, its behavior in the
//! visual formatting model."
//!
//! Attaching a node creates its layout object (if the node needs one) and
//! inserts it at the right place in the layout tree; detaching destroys it.
//! Both walk the node's pseudo-elements, shadow tree and children.

use std::rc::Rc;

use lumen_dom::{ElementData, NodeId, NodeType, PseudoId, StyleChangeType};

use super::traversal;
use super::tree::{LayoutId, LayoutObjectKind, LayoutText};
use crate::document::{Document, LifecycleState};
use crate::pseudo::pseudo_element_layout_object_is_needed;
use crate::resolver::StyleResolver;
use crate::style::{ComputedStyle, InnerDisplayType, OuterDisplayType};

/// [SVG 2 § 5.8.5 Conditional processing](https://www.w3.org/TR/SVG2/struct.html#ConditionalProcessing)
///
/// "If the attribute is not present, then its implicit evaluated value is
/// "true"." No extensions are supported, and the user language is English.
fn is_valid_svg_element(data: &ElementData) -> bool {
    for (name, value) in &data.attrs {
        if name.eq_ignore_ascii_case("requiredExtensions") && !value.trim().is_empty() {
            return false;
        }
        if name.eq_ignore_ascii_case("systemLanguage")
            && !value.split(',').map(str::trim).any(|language| {
                let language = language.to_ascii_lowercase();
                language == "en" || language.starts_with("en-")
            })
        {
            return false;
        }
    }
    true
}

/// Kind of box an element with `style` generates.
fn layout_object_kind_for(
    data: Option<&ElementData>,
    parent_is_svg: bool,
    style: &ComputedStyle,
) -> LayoutObjectKind {
    if let Some(data) = data {
        if data.is_svg() {
            return if data.tag_name == "svg" && !parent_is_svg {
                LayoutObjectKind::SvgRoot
            } else {
                LayoutObjectKind::SvgContainer
            };
        }
        match data.tag_name.to_ascii_lowercase().as_str() {
            "img" => return LayoutObjectKind::Image,
            "br" => return LayoutObjectKind::Br,
            "button" => return LayoutObjectKind::Button,
            "select" => return LayoutObjectKind::MenuList,
            _ => {}
        }
    }

    // [§ 9.7 Relationships between 'display', 'position', and 'float'](https://www.w3.org/TR/CSS2/visuren.html#dis-pos-flo)
    //
    // "Otherwise, if 'float' has a value other than 'none', the box is
    // floated and 'display' is set according to the table below."
    let blockified = style.is_floating() || style.is_out_of_flow_positioned();
    let display = style.display;
    if display.list_item {
        return LayoutObjectKind::ListItem;
    }
    match display.inner {
        InnerDisplayType::Flex => LayoutObjectKind::FlexibleBox,
        InnerDisplayType::Grid => LayoutObjectKind::Grid,
        InnerDisplayType::Flow
            if display.outer == OuterDisplayType::Inline && !blockified =>
        {
            LayoutObjectKind::Inline
        }
        _ => LayoutObjectKind::BlockFlow,
    }
}

/// [§ 16.6.1 The 'white-space' processing model](https://www.w3.org/TR/CSS2/text.html#white-space-model)
///
/// True if `text` is made only of collapsible white space.
fn is_whitespace_only(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_whitespace())
}

impl<R: StyleResolver> Document<R> {
    // --- Elements and pseudo-elements ------------------------------------

    /// Creates the layout objects of `element`, its pseudo-elements and its
    /// flat tree descendants.
    ///
    /// `resolved` is a style already computed for `element` during recalc;
    /// without it the style is resolved lazily, and only if the element can
    /// be rendered at all.
    pub(crate) fn attach(&mut self, element: NodeId, resolved: Option<Rc<ComputedStyle>>) {
        debug_assert!(self.dom.is_element_like(element));
        if self.dom.needs_attach(element) {
            self.clear_stored_style(element);
        }

        let style = self.create_layout_object_if_needed(element, resolved);
        if self.layout.layout_object(element).is_none()
            && let Some(style) = style
        {
            self.store_style(element, style);
        }

        self.add_callback_selectors(element);

        if self.layout.layout_object(element).is_none()
            && let Some(animations) = self.element_animations_mut(element)
        {
            animations.cancel_css_animations();
            animations.set_animation_style_change(false);
        }

        let pseudo = self.dom.pseudo_id(element);
        if pseudo != PseudoId::NoPseudo {
            if self.layout.layout_object(element).is_some() {
                match pseudo {
                    PseudoId::Before | PseudoId::After => self.attach_generated_content(element),
                    PseudoId::FirstLetter => self.attach_first_letter_text_layout_objects(element),
                    _ => {}
                }
            }
            self.dom.clear_needs_style_recalc(element);
            self.dom.clear_child_needs_style_recalc(element);
            return;
        }

        self.create_pseudo_element_if_needed(element, PseudoId::Before);

        if let Some(root) = self.dom.shadow_root(element) {
            self.attach_children(root);
            self.dom.clear_needs_style_recalc(root);
            self.dom.clear_child_needs_style_recalc(root);
        }
        self.attach_children(element);
        self.dom.clear_needs_style_recalc(element);
        self.dom.clear_child_needs_style_recalc(element);

        self.create_pseudo_element_if_needed(element, PseudoId::After);
        self.create_pseudo_element_if_needed(element, PseudoId::Backdrop);
        // The first letter is looked up in the children's boxes, so it comes
        // after them.
        self.create_pseudo_element_if_needed(element, PseudoId::FirstLetter);
    }

    fn attach_children(&mut self, parent: NodeId) {
        for child in self.dom.children(parent).to_vec() {
            if !self.dom.needs_attach(child) {
                continue;
            }
            if self.dom.is_element(child) {
                self.attach(child, None);
            } else if self.dom.is_text(child) {
                self.attach_text(child);
            } else {
                self.dom.clear_needs_style_recalc(child);
            }
        }
    }

    /// Destroys the layout objects of `element`, its pseudo-elements and its
    /// flat tree descendants, and marks them all for attach.
    ///
    /// `performing_reattach` keeps running animations alive: the element is
    /// about to get a new box.
    pub(crate) fn detach(&mut self, element: NodeId, performing_reattach: bool) {
        if self.dom.pseudo_id(element) == PseudoId::FirstLetter {
            self.detach_first_letter(element);
        }

        self.remove_callback_selectors(element);
        self.clear_pseudo_elements(element);

        if self.lifecycle != LifecycleState::InStyleRecalc {
            self.clear_stored_style(element);
        }

        if let Some(animations) = self.element_animations_mut(element) {
            if performing_reattach {
                animations.restart_animations_on_compositor();
            } else {
                animations.cancel_css_animations();
                animations.set_animation_style_change(false);
            }
            animations.clear_base_computed_style();
        }

        if let Some(root) = self.dom.shadow_root(element) {
            self.detach_children(root, performing_reattach);
            self.dom.set_style_change(root, StyleChangeType::NeedsReattachStyleChange);
            self.dom.clear_child_needs_style_recalc(root);
        }
        self.detach_children(element, performing_reattach);

        self.destroy_layout_object(element);
        self.dom
            .set_style_change(element, StyleChangeType::NeedsReattachStyleChange);
        self.dom.clear_child_needs_style_recalc(element);
    }

    fn detach_children(&mut self, parent: NodeId, performing_reattach: bool) {
        for child in self.dom.children(parent).to_vec() {
            match self.dom.get(child).map(|node| &node.node_type) {
                Some(NodeType::Text(_)) => self.detach_text(child),
                Some(NodeType::Element(_)) => self.detach(child, performing_reattach),
                Some(_) => self
                    .dom
                    .set_style_change(child, StyleChangeType::NeedsReattachStyleChange),
                None => {}
            }
        }
    }

    fn destroy_layout_object(&mut self, node: NodeId) {
        if let Some(object) = self.layout.layout_object(node) {
            let orphaned = self.layout.destroy(object);
            self.clear_orphaned_first_letters(&orphaned);
        }
        self.layout.set_layout_object(node, None);
    }

    /// Detaches `node` (unless it already awaits attach) and attaches it
    /// again.
    pub(crate) fn reattach(&mut self, node: NodeId) {
        self.reattach_with_style(node, None);
    }

    /// [`Document::reattach`] with a style computed during recalc.
    pub(crate) fn reattach_with_style(&mut self, node: NodeId, resolved: Option<Rc<ComputedStyle>>) {
        if self.dom.style_change_type(node) < StyleChangeType::NeedsReattachStyleChange {
            self.detach(node, true);
        }
        self.attach(node, resolved);
    }

    fn should_create_layout_object(&self, node: NodeId) -> bool {
        let Some(parent_box) = traversal::layout_object_parent(&self.dom, &self.layout, node) else {
            return false;
        };

        // [SVG 2 § 5.1](https://www.w3.org/TR/SVG2/struct.html#Groups)
        // SVG content below the outermost `svg` element only renders inside
        // SVG boxes, and HTML content never renders inside them.
        if let Some(data) = self.dom.as_element(node) {
            let parent_is_svg = self
                .layout
                .get(parent_box)
                .and_then(|parent| parent.node)
                .and_then(|parent| self.dom.as_element(parent))
                .is_some_and(ElementData::is_svg);
            if data.is_svg() {
                if (data.tag_name != "svg" && !parent_is_svg) || !is_valid_svg_element(data) {
                    return false;
                }
            } else if parent_is_svg {
                return false;
            }
        }

        traversal::layout_parent_of(&self.dom, &self.layout, node)
            .is_some_and(|parent| self.layout.can_have_children(parent))
    }

    fn layout_object_is_needed(&self, node: NodeId, style: &ComputedStyle) -> bool {
        if self.dom.is_pseudo_element(node) {
            return pseudo_element_layout_object_is_needed(Some(style));
        }
        !style.is_display_none()
    }

    /// Creates `node`'s layout object if it should have one, returning the
    /// style it was resolved with (if resolution happened).
    fn create_layout_object_if_needed(
        &mut self,
        node: NodeId,
        resolved: Option<Rc<ComputedStyle>>,
    ) -> Option<Rc<ComputedStyle>> {
        if !self.should_create_layout_object(node) {
            return resolved;
        }
        let style = match resolved {
            Some(style) => style,
            None => self.style_for_layout_object(node)?,
        };
        if !self.layout_object_is_needed(node, &style) {
            return Some(style);
        }
        self.create_layout_object(node, &style);
        Some(style)
    }

    fn create_layout_object(&mut self, node: NodeId, style: &Rc<ComputedStyle>) {
        let Some(parent_box) = traversal::layout_parent_of(&self.dom, &self.layout, node) else {
            return;
        };
        let parent_is_svg = self.layout.get(parent_box).is_some_and(|parent| {
            matches!(
                parent.kind,
                LayoutObjectKind::SvgRoot | LayoutObjectKind::SvgContainer
            )
        });
        let kind = layout_object_kind_for(self.dom.as_element(node), parent_is_svg, style);
        let object = self.layout.create(kind, Some(node));

        if !self.layout.is_child_allowed(parent_box, object, &self.dom) {
            log::trace!("{parent_box:?} does not accept a box for {node:?}");
            let _ = self.layout.destroy(object);
            return;
        }

        let inside = self.layout.children_inside_flow_thread(parent_box);
        self.layout.set_inside_flow_thread(object, inside);
        let next = traversal::layout_next_sibling_of(&self.dom, &self.layout, node);
        self.layout.set_layout_object(node, Some(object));
        let _ = self.layout.set_style(object, Rc::clone(style));

        // [§ 4 Fullscreen](https://fullscreen.spec.whatwg.org/#rendering)
        let inserted = if self.dom.fullscreen_element() == Some(node) {
            self.layout.wrap_in_full_screen(object)
        } else {
            object
        };
        self.layout.add_child(parent_box, inserted, next);
        if let Some(created) = self.layout.get(object) {
            log::trace!("created {} for {node:?}", created.kind.name());
        }
    }

    /// [§ 12.1 The :before and :after pseudo-elements](https://www.w3.org/TR/CSS2/generate.html#before-after-content)
    ///
    /// "Authors specify the style and location of generated content with the
    /// :before and :after pseudo-elements."
    fn attach_generated_content(&mut self, pseudo: NodeId) {
        let Some(pseudo_box) = self.layout.layout_object(pseudo) else {
            return;
        };
        let Some(style) = self.layout.style(pseudo_box).cloned() else {
            return;
        };
        let Some(content) = style.content.as_deref() else {
            return;
        };
        let text = self
            .layout
            .create_anonymous(LayoutObjectKind::Text(LayoutText::new(content)), Rc::clone(&style));
        if !self.layout.is_child_allowed(pseudo_box, text, &self.dom) {
            let _ = self.layout.destroy(text);
            return;
        }
        let inside = self.layout.is_inside_flow_thread(pseudo_box);
        self.layout.set_inside_flow_thread(text, inside);
        self.layout.add_child(pseudo_box, text, None);
    }

    // --- Text -------------------------------------------------------------

    /// Creates the layout object of text node `text` if it needs one.
    pub(crate) fn attach_text(&mut self, text: NodeId) {
        let style_parent_style = traversal::parent(&self.dom, text)
            .and_then(|parent| self.computed_style(parent));
        let layout_parent = traversal::layout_object_parent(&self.dom, &self.layout, text);
        if let (Some(style), Some(parent_box)) = (style_parent_style, layout_parent)
            && self.text_layout_object_is_needed(text, parent_box)
        {
            self.create_text_layout_object(text, parent_box, style);
        }
        self.dom.clear_needs_style_recalc(text);
        self.dom.clear_child_needs_style_recalc(text);
    }

    /// [§ 16.6.1](https://www.w3.org/TR/CSS2/text.html#white-space-model)
    ///
    /// "A sequence of collapsible spaces at the beginning of a line is
    /// removed." Whitespace-only runs produce no box where they could never
    /// be rendered.
    fn text_layout_object_is_needed(&self, text: NodeId, parent_box: LayoutId) -> bool {
        if !self.layout.can_have_children(parent_box) {
            return false;
        }
        let data = self.dom.as_text(text).unwrap_or_default();
        if data.is_empty() {
            return false;
        }
        if !is_whitespace_only(data) {
            return true;
        }
        !self.layout.get(parent_box).is_some_and(|parent| {
            matches!(
                parent.kind,
                LayoutObjectKind::FlexibleBox
                    | LayoutObjectKind::Grid
                    | LayoutObjectKind::MenuList
                    | LayoutObjectKind::SvgRoot
                    | LayoutObjectKind::SvgContainer
            )
        })
    }

    fn create_text_layout_object(&mut self, text: NodeId, parent_box: LayoutId, style: Rc<ComputedStyle>) {
        let data = self.dom.as_text(text).unwrap_or_default();
        let object = self
            .layout
            .create(LayoutObjectKind::Text(LayoutText::new(data)), Some(text));
        if !self.layout.is_child_allowed(parent_box, object, &self.dom) {
            let _ = self.layout.destroy(object);
            return;
        }
        let inside = self.layout.children_inside_flow_thread(parent_box);
        self.layout.set_inside_flow_thread(object, inside);
        let next = traversal::layout_next_sibling_of(&self.dom, &self.layout, text);
        self.layout.set_layout_object(text, Some(object));
        let _ = self.layout.set_style(object, style);
        self.layout.add_child(parent_box, object, next);
    }

    /// Destroys the layout object of text node `text` and marks it for
    /// attach.
    pub(crate) fn detach_text(&mut self, text: NodeId) {
        self.destroy_layout_object(text);
        self.dom
            .set_style_change(text, StyleChangeType::NeedsReattachStyleChange);
    }

    pub(crate) fn reattach_text(&mut self, text: NodeId) {
        if !self.dom.needs_attach(text) {
            self.detach_text(text);
        }
        self.attach_text(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{DisplayValue, Float};

    #[test]
    fn test_system_language() {
        assert!(is_valid_svg_element(&ElementData::svg("g")));
        assert!(is_valid_svg_element(
            &ElementData::svg("g").with_attribute("systemLanguage", "fr, en-US")
        ));
        assert!(!is_valid_svg_element(
            &ElementData::svg("g").with_attribute("systemLanguage", "fr")
        ));
        assert!(!is_valid_svg_element(
            &ElementData::svg("g").with_attribute("requiredExtensions", "http://example.org/ext")
        ));
    }

    #[test]
    fn test_floats_are_blockified() {
        let mut style = ComputedStyle {
            display: DisplayValue::inline(),
            ..ComputedStyle::default()
        };
        let span = ElementData::new("span");
        assert_eq!(
            layout_object_kind_for(Some(&span), false, &style),
            LayoutObjectKind::Inline
        );
        style.float = Float::Left;
        assert_eq!(
            layout_object_kind_for(Some(&span), false, &style),
            LayoutObjectKind::BlockFlow
        );
    }

    #[test]
    fn test_replaced_and_svg_kinds() {
        let style = ComputedStyle::default();
        assert_eq!(
            layout_object_kind_for(Some(&ElementData::new("select")), false, &style),
            LayoutObjectKind::MenuList
        );
        assert_eq!(
            layout_object_kind_for(Some(&ElementData::svg("svg")), false, &style),
            LayoutObjectKind::SvgRoot
        );
        assert_eq!(
            layout_object_kind_for(Some(&ElementData::svg("svg")), true, &style),
            LayoutObjectKind::SvgContainer
        );
        assert_eq!(
            layout_object_kind_for(None, false, &style),
            LayoutObjectKind::Inline
        );
    }

    #[test]
    fn test_whitespace_only() {
        assert!(is_whitespace_only(" \n\t"));
        assert!(!is_whitespace_only(" a "));
    }
}
