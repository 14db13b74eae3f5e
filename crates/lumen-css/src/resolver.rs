//! The style resolver seam and a declarative reference resolver.
//!
//! The recalc engine never runs the cascade itself. It asks a
//! [`StyleResolver`] for an element's style (or one of its pseudo-element
//! styles) and diffs the answer against what it had before.

use lumen_common::warning::warn_once;
use lumen_dom::{DomTree, NodeId, PseudoId};

use crate::selector::{MatchingContext, ParsedSelector, parse_selector};
use crate::style::{
    ComputedStyle, DisplayValue, Position, StyleDeclaration, StyleRecalcChange,
    default_display_for_element, style_propagation_diff,
};

/// Everything a resolver may look at to style one element.
#[derive(Debug, Clone, Copy)]
pub struct ElementStyleRequest<'a> {
    /// The document tree.
    pub dom: &'a DomTree,
    /// The element being styled (the host, for pseudo-element requests).
    pub element: NodeId,
    /// The style to inherit from.
    pub parent_style: Option<&'a ComputedStyle>,
    /// Selectors the embedder is watching; matches land in
    /// [`ComputedStyle::callback_selectors`].
    pub watched_selectors: &'a [ParsedSelector],
}

/// [§ 6 Cascading](https://www.w3.org/TR/css-cascade-4/#cascading)
///
/// Produces computed styles for elements and their pseudo-elements.
pub trait StyleResolver {
    /// Resolve the style of `request.element`.
    fn style_for_element(&mut self, request: &ElementStyleRequest<'_>) -> ComputedStyle;

    /// Resolve the style of `request.element`'s `pseudo` pseudo-element.
    ///
    /// `None` when no rule styles that pseudo-element.
    fn pseudo_style_for_element(
        &mut self,
        request: &ElementStyleRequest<'_>,
        pseudo: PseudoId,
    ) -> Option<ComputedStyle>;

    /// Style of the layout view.
    fn style_for_document(&mut self) -> ComputedStyle {
        ComputedStyle::for_document()
    }

    /// Compares an old and a new style, see [`style_propagation_diff`].
    fn propagation_diff(
        &self,
        old: Option<&ComputedStyle>,
        new: Option<&ComputedStyle>,
    ) -> StyleRecalcChange {
        style_propagation_diff(old, new)
    }
}

/// A style rule: one compound selector and its declarations.
#[derive(Debug, Clone)]
pub struct StyleRule {
    /// Which elements (and which of their pseudo-elements) the rule applies to.
    pub selector: ParsedSelector,
    /// The declared values.
    pub declaration: StyleDeclaration,
}

/// Resolver over an ordered list of [`StyleRule`]s plus user-agent defaults.
///
/// Rules are applied in ascending specificity, ties broken by source order.
#[derive(Debug, Clone, Default)]
pub struct DeclaredStyleResolver {
    rules: Vec<StyleRule>,
}

impl DeclaredStyleResolver {
    /// A resolver with no author rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule. Returns false (and warns once) if the selector is not
    /// a supported compound selector.
    pub fn add_rule(&mut self, selector: &str, declaration: StyleDeclaration) -> bool {
        let Some(selector) = parse_selector(selector) else {
            let _ = warn_once(
                "Style",
                &format!("ignoring rule with unsupported selector '{selector}'"),
            );
            return false;
        };
        self.rules.push(StyleRule {
            selector,
            declaration,
        });
        true
    }

    /// All rules in source order.
    #[must_use]
    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    /// [§ 6.4 Cascade Sorting Order](https://www.w3.org/TR/css-cascade-4/#cascade-sort)
    fn matched_rules(
        &self,
        dom: &DomTree,
        element: NodeId,
        pseudo: PseudoId,
        context: &mut MatchingContext,
    ) -> Vec<&StyleRule> {
        let mut matched: Vec<&StyleRule> = self
            .rules
            .iter()
            .filter(|rule| rule.selector.pseudo_element == pseudo)
            .filter(|rule| rule.selector.matches(dom, element, context))
            .collect();
        // Stable sort keeps source order among equal specificities.
        matched.sort_by_key(|rule| rule.selector.specificity);
        matched
    }
}

impl StyleResolver for DeclaredStyleResolver {
    fn style_for_element(&mut self, request: &ElementStyleRequest<'_>) -> ComputedStyle {
        let dom = request.dom;
        let mut style = ComputedStyle::inherit_from(request.parent_style, PseudoId::NoPseudo);

        if let Some(data) = dom.as_element(request.element) {
            let default_display = if data.is_svg() {
                Some(DisplayValue::inline())
            } else {
                default_display_for_element(&data.tag_name.to_ascii_lowercase())
            };
            match default_display {
                Some(display) => style.display = display,
                None => style.display_none = true,
            }
        }

        let mut context = MatchingContext::default();
        for rule in self.matched_rules(dom, request.element, PseudoId::NoPseudo, &mut context) {
            rule.declaration.apply_to(&mut style, request.parent_style);
        }
        style.affected_by_empty = context.affected_by_empty;
        style.empty_state = context.empty_state;

        for rule in &self.rules {
            let pseudo = rule.selector.pseudo_element;
            if pseudo != PseudoId::NoPseudo
                && !style.has_pseudo_style(pseudo)
                && rule
                    .selector
                    .matches(dom, request.element, &mut MatchingContext::default())
            {
                style.set_has_pseudo_style(pseudo);
            }
        }

        for watched in request.watched_selectors {
            if watched
                .matches(dom, request.element, &mut MatchingContext::default())
                && !style.callback_selectors.iter().any(|s| s == watched.text())
            {
                style.callback_selectors.push(watched.text().to_string());
            }
        }
        style
    }

    fn pseudo_style_for_element(
        &mut self,
        request: &ElementStyleRequest<'_>,
        pseudo: PseudoId,
    ) -> Option<ComputedStyle> {
        let mut context = MatchingContext::default();
        let matched = self.matched_rules(request.dom, request.element, pseudo, &mut context);
        if matched.is_empty() && pseudo != PseudoId::Backdrop {
            return None;
        }

        let mut style = ComputedStyle::inherit_from(request.parent_style, pseudo);
        if pseudo == PseudoId::Backdrop {
            // [§ 4.1 ::backdrop](https://fullscreen.spec.whatwg.org/#user-agent-level-style-sheet-defaults)
            // "::backdrop { position: fixed; inset: 0px; }"
            style.display = DisplayValue::block();
            style.position = Position::Fixed;
        }
        for rule in matched {
            rule.declaration.apply_to(&mut style, request.parent_style);
        }
        Some(style)
    }
}

#[cfg(test)]
mod tests {
    use lumen_dom::{ElementData, NodeType};

    use super::*;
    use crate::style::{DisplayKeyword, Float};

    fn request(dom: &DomTree, element: NodeId) -> ElementStyleRequest<'_> {
        ElementStyleRequest {
            dom,
            element,
            parent_style: None,
            watched_selectors: &[],
        }
    }

    #[test]
    fn test_specificity_then_source_order() {
        let mut dom = DomTree::new();
        let p = dom.alloc(NodeType::Element(
            ElementData::new("p").with_attribute("class", "note"),
        ));
        dom.append_child(NodeId::ROOT, p);

        let mut resolver = DeclaredStyleResolver::new();
        assert!(resolver.add_rule(
            ".note",
            StyleDeclaration {
                float: Some(Float::Left),
                ..StyleDeclaration::default()
            }
        ));
        assert!(resolver.add_rule(
            "p",
            StyleDeclaration {
                float: Some(Float::Right),
                display: Some(DisplayKeyword::Flex),
                ..StyleDeclaration::default()
            }
        ));
        assert!(resolver.add_rule(
            "*",
            StyleDeclaration {
                display: Some(DisplayKeyword::Grid),
                ..StyleDeclaration::default()
            }
        ));

        let style = resolver.style_for_element(&request(&dom, p));
        assert_eq!(style.float, Float::Left);
        assert_eq!(style.display, DisplayValue::flex());
    }

    #[test]
    fn test_pseudo_bits_and_pseudo_styles() {
        let mut dom = DomTree::new();
        let div = dom.alloc(NodeType::Element(ElementData::new("div")));
        dom.append_child(NodeId::ROOT, div);

        let mut resolver = DeclaredStyleResolver::new();
        assert!(resolver.add_rule(
            "div::before",
            StyleDeclaration {
                content: Some("*".to_string()),
                ..StyleDeclaration::default()
            }
        ));

        let style = resolver.style_for_element(&request(&dom, div));
        assert!(style.has_pseudo_style(PseudoId::Before));
        assert!(!style.has_pseudo_style(PseudoId::After));

        let before = resolver
            .pseudo_style_for_element(&request(&dom, div), PseudoId::Before)
            .unwrap();
        assert_eq!(before.style_type, PseudoId::Before);
        assert_eq!(before.content.as_deref(), Some("*"));
        assert!(
            resolver
                .pseudo_style_for_element(&request(&dom, div), PseudoId::After)
                .is_none()
        );
        assert!(
            resolver
                .pseudo_style_for_element(&request(&dom, div), PseudoId::Backdrop)
                .is_some()
        );
    }

    #[test]
    fn test_rejects_complex_selector() {
        let mut resolver = DeclaredStyleResolver::new();
        assert!(!resolver.add_rule("div p", StyleDeclaration::default()));
        assert!(resolver.rules().is_empty());
    }

    #[test]
    fn test_hidden_elements_are_display_none() {
        let mut dom = DomTree::new();
        let head = dom.alloc(NodeType::Element(ElementData::new("head")));
        dom.append_child(NodeId::ROOT, head);
        let style = DeclaredStyleResolver::new().style_for_element(&request(&dom, head));
        assert!(style.is_display_none());
    }
}
