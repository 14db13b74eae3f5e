//! Style recalc change strength and the propagation diff that produces it.

use lumen_dom::PseudoId;
use strum_macros::Display;

use super::computed::ComputedStyle;

/// How much style work an element was asked to do, and how much its children
/// must do after it.
///
/// Totally ordered by declaration order; call sites rely on `>=` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Display)]
pub enum StyleRecalcChange {
    /// Nothing changed.
    #[default]
    NoChange,
    /// The element's own style changed in a way children cannot observe.
    NoInherit,
    /// Only pseudo-element styles need to be revisited.
    UpdatePseudoElements,
    /// Only independent inherited properties changed; children can copy them
    /// without running the cascade.
    IndependentInherit,
    /// Inherited properties changed; children must recompute.
    Inherit,
    /// The whole subtree must recompute.
    Force,
    /// The element was detached and attached again.
    Reattach,
    /// The element was reattached and ended up without a layout object.
    ReattachNoLayoutObject,
}

/// [§ 4.4 Computed Values](https://www.w3.org/TR/css-cascade-4/#computed)
///
/// Compares an element's previous and freshly resolved styles and decides
/// what the element's subtree needs.
#[must_use]
pub fn style_propagation_diff(
    old: Option<&ComputedStyle>,
    new: Option<&ComputedStyle>,
) -> StyleRecalcChange {
    let (Some(old), Some(new)) = (old, new) else {
        return StyleRecalcChange::Reattach;
    };

    if old.display_none != new.display_none
        || (!old.display_none && old.display != new.display)
        || old.has_pseudo_style(PseudoId::FirstLetter) != new.has_pseudo_style(PseudoId::FirstLetter)
        || old.content != new.content
    {
        return StyleRecalcChange::Reattach;
    }

    if !old.inherited_equal(new) {
        if old.non_independent_inherited_equal(new) {
            return StyleRecalcChange::IndependentInherit;
        }
        return StyleRecalcChange::Inherit;
    }

    if old == new {
        return if diff_pseudo_styles(old, new) {
            StyleRecalcChange::NoInherit
        } else {
            StyleRecalcChange::NoChange
        };
    }

    if old.has_explicitly_inherited {
        return StyleRecalcChange::Inherit;
    }
    StyleRecalcChange::NoInherit
}

/// True if a pseudo style cached on `old` is missing from, or differs on, `new`.
fn diff_pseudo_styles(old: &ComputedStyle, new: &ComputedStyle) -> bool {
    old.cached_pseudo_styles().iter().any(|old_pseudo| {
        new.cached_pseudo_style(old_pseudo.style_type)
            .is_none_or(|new_pseudo| **old_pseudo != *new_pseudo)
    })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::style::{DisplayValue, Visibility};

    #[test]
    fn test_change_ordering() {
        assert!(StyleRecalcChange::NoChange < StyleRecalcChange::NoInherit);
        assert!(StyleRecalcChange::UpdatePseudoElements < StyleRecalcChange::IndependentInherit);
        assert!(StyleRecalcChange::Inherit < StyleRecalcChange::Force);
        assert!(StyleRecalcChange::Force < StyleRecalcChange::Reattach);
        assert_eq!(
            StyleRecalcChange::Reattach.max(StyleRecalcChange::Inherit),
            StyleRecalcChange::Reattach
        );
    }

    #[test]
    fn test_missing_side_reattaches() {
        let style = ComputedStyle::default();
        assert_eq!(
            style_propagation_diff(None, Some(&style)),
            StyleRecalcChange::Reattach
        );
        assert_eq!(
            style_propagation_diff(Some(&style), None),
            StyleRecalcChange::Reattach
        );
    }

    #[test]
    fn test_display_change_reattaches() {
        let old = ComputedStyle::default();
        let mut new = old.clone();
        new.display = DisplayValue::block();
        assert_eq!(
            style_propagation_diff(Some(&old), Some(&new)),
            StyleRecalcChange::Reattach
        );
    }

    #[test]
    fn test_visibility_is_independent() {
        let old = ComputedStyle::default();
        let mut new = old.clone();
        new.inherited.visibility = Visibility::Hidden;
        assert_eq!(
            style_propagation_diff(Some(&old), Some(&new)),
            StyleRecalcChange::IndependentInherit
        );

        new.inherited.color = "blue".to_string();
        assert_eq!(
            style_propagation_diff(Some(&old), Some(&new)),
            StyleRecalcChange::Inherit
        );
    }

    #[test]
    fn test_non_inherited_change() {
        let old = ComputedStyle::default();
        let mut new = old.clone();
        new.opacity = 0.5;
        assert_eq!(
            style_propagation_diff(Some(&old), Some(&new)),
            StyleRecalcChange::NoInherit
        );

        let mut explicit = old.clone();
        explicit.has_explicitly_inherited = true;
        let mut changed = explicit.clone();
        changed.opacity = 0.5;
        assert_eq!(
            style_propagation_diff(Some(&explicit), Some(&changed)),
            StyleRecalcChange::Inherit
        );
    }

    #[test]
    fn test_equal_styles_with_stale_pseudo_cache() {
        let old = ComputedStyle::default();
        let new = old.clone();
        assert_eq!(
            style_propagation_diff(Some(&old), Some(&new)),
            StyleRecalcChange::NoChange
        );

        let _ = old.add_cached_pseudo_style(Rc::new(ComputedStyle::inherit_from(
            None,
            PseudoId::Before,
        )));
        assert_eq!(
            style_propagation_diff(Some(&old), Some(&new)),
            StyleRecalcChange::NoInherit
        );
    }
}
