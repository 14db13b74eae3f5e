//! CSS Computed Style
//!
//! [§ 4.4 Computed Values](https://www.w3.org/TR/css-cascade-4/#computed)
//! "The computed value is the result of resolving the specified value..."
//!
//! A [`ComputedStyle`] is immutable once it has been published to an element
//! (it is shared behind an `Rc`). The one exception is the pseudo style cache,
//! a side table that lazily collects the resolved styles of the element's
//! pseudo-elements.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use lumen_dom::PseudoId;
use serde::Serialize;

use super::display::{DisplayValue, InnerDisplayType};
use super::values::{Float, Position, TextTransform, Visibility};

/// Initial value of `font-size` in px.
pub const DEFAULT_FONT_SIZE_PX: f32 = 16.0;

bitflags! {
    /// Which public pseudo-elements have matching rules for this element.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
    pub struct PseudoBits: u8 {
        /// `::before`
        const BEFORE = 1 << 0;
        /// `::after`
        const AFTER = 1 << 1;
        /// `::backdrop`
        const BACKDROP = 1 << 2;
        /// `::first-letter`
        const FIRST_LETTER = 1 << 3;
        /// `::first-line`
        const FIRST_LINE = 1 << 4;
    }
}

impl PseudoBits {
    /// The bit for `pseudo`, empty for [`PseudoId::NoPseudo`].
    #[must_use]
    pub const fn for_pseudo(pseudo: PseudoId) -> Self {
        match pseudo {
            PseudoId::NoPseudo => Self::empty(),
            PseudoId::Before => Self::BEFORE,
            PseudoId::After => Self::AFTER,
            PseudoId::Backdrop => Self::BACKDROP,
            PseudoId::FirstLetter => Self::FIRST_LETTER,
            PseudoId::FirstLine => Self::FIRST_LINE,
        }
    }
}

bitflags! {
    /// [Web Animations § 4.5.1](https://www.w3.org/TR/web-animations-1/#current)
    ///
    /// "Has a current animation on property group X" and "that animation runs
    /// on the compositor", per property group.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
    pub struct AnimationFlags: u8 {
        /// A current animation affects `opacity`.
        const HAS_CURRENT_OPACITY_ANIMATION = 1 << 0;
        /// A current animation affects `transform`, `rotate`, `scale` or `translate`.
        const HAS_CURRENT_TRANSFORM_ANIMATION = 1 << 1;
        /// A current animation affects `filter`.
        const HAS_CURRENT_FILTER_ANIMATION = 1 << 2;
        /// The opacity animation is running on the compositor.
        const RUNNING_OPACITY_ON_COMPOSITOR = 1 << 3;
        /// The transform animation is running on the compositor.
        const RUNNING_TRANSFORM_ON_COMPOSITOR = 1 << 4;
        /// The filter animation is running on the compositor.
        const RUNNING_FILTER_ON_COMPOSITOR = 1 << 5;
    }
}

/// [§ 3.3 Inherited Properties](https://www.w3.org/TR/css-cascade-4/#inheriting)
///
/// The inherited properties this engine tracks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InheritedProperties {
    /// [§ 3.1 'color'](https://www.w3.org/TR/css-color-4/#the-color-property)
    pub color: String,
    /// [§ 2.4 'font-size'](https://www.w3.org/TR/css-fonts-4/#font-size-prop), in px.
    pub font_size: f32,
    /// [§ 2.1 'text-transform'](https://www.w3.org/TR/css-text-3/#text-transform-property)
    pub text_transform: TextTransform,
    /// [§ 11.2 'visibility'](https://www.w3.org/TR/CSS2/visufx.html#visibility)
    ///
    /// An *independent* inherited property: it can be propagated to children
    /// without re-running the cascade for them.
    pub visibility: Visibility,
}

impl Default for InheritedProperties {
    fn default() -> Self {
        InheritedProperties {
            color: "canvastext".to_string(),
            font_size: DEFAULT_FONT_SIZE_PX,
            text_transform: TextTransform::None,
            visibility: Visibility::Visible,
        }
    }
}

/// Resolved pseudo-element styles hanging off an element's style.
///
/// Append-only per pseudo id (a later add for the same id is ignored until
/// the entry is removed). Cloning a style yields an empty cache.
#[derive(Debug, Default)]
pub struct PseudoStyleCache(RefCell<Vec<Rc<ComputedStyle>>>);

impl Clone for PseudoStyleCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

/// Computed styles for an element or pseudo-element.
///
/// [§ 4.4 Computed Values](https://www.w3.org/TR/css-cascade-4/#computed)
#[derive(Debug, Clone, Serialize)]
pub struct ComputedStyle {
    /// Which (pseudo-)element this style was resolved for.
    pub style_type: PseudoId,

    /// [§ 2 'display'](https://www.w3.org/TR/css-display-3/#the-display-properties)
    ///
    /// Meaningless while `display_none` is set.
    pub display: DisplayValue,

    /// [§ 2.6 display: none](https://www.w3.org/TR/css-display-3/#valdef-display-none)
    ///
    /// "The element and its descendants generate no boxes or text runs."
    pub display_none: bool,

    /// [§ 9.5.1 'float'](https://www.w3.org/TR/CSS2/visuren.html#float-position)
    pub float: Float,

    /// [§ 2 'position'](https://www.w3.org/TR/css-position-3/#position-property)
    pub position: Position,

    /// [§ 2 'content'](https://www.w3.org/TR/css-content-3/#content-property)
    ///
    /// Generated text for `::before`/`::after`; `None` is `content: none`.
    pub content: Option<String>,

    /// Inherited properties, copied from the parent unless declared.
    pub inherited: InheritedProperties,

    /// [§ 3.2 'opacity'](https://www.w3.org/TR/css-color-4/#transparency)
    pub opacity: f32,

    /// [§ 3.2 'column-count'](https://www.w3.org/TR/css-multicol-1/#cc)
    pub column_count: Option<u32>,

    /// [§ 6 'column-span: all'](https://www.w3.org/TR/css-multicol-1/#column-span)
    pub column_span_all: bool,

    /// Watched selectors this element matched, in match order.
    pub callback_selectors: Vec<String>,

    /// Pseudo-elements with matching rules.
    pub pseudo_bits: PseudoBits,

    /// Some rule's `:empty` was evaluated against this element.
    pub affected_by_empty: bool,

    /// Result of the last `:empty` evaluation (child-dependent).
    pub empty_state: bool,

    /// A declaration used the `inherit` keyword (child-dependent).
    pub has_explicitly_inherited: bool,

    /// Current-animation flags, written by the animation flag projector.
    pub animation_flags: AnimationFlags,

    #[serde(skip)]
    pub(crate) cached_pseudo_styles: PseudoStyleCache,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        ComputedStyle {
            style_type: PseudoId::NoPseudo,
            display: DisplayValue::inline(),
            display_none: false,
            float: Float::None,
            position: Position::Static,
            content: None,
            inherited: InheritedProperties::default(),
            opacity: 1.0,
            column_count: None,
            column_span_all: false,
            callback_selectors: Vec::new(),
            pseudo_bits: PseudoBits::empty(),
            affected_by_empty: false,
            empty_state: false,
            has_explicitly_inherited: false,
            animation_flags: AnimationFlags::empty(),
            cached_pseudo_styles: PseudoStyleCache::default(),
        }
    }
}

/// Equality ignores the pseudo style cache.
impl PartialEq for ComputedStyle {
    fn eq(&self, other: &Self) -> bool {
        self.style_type == other.style_type
            && self.display == other.display
            && self.display_none == other.display_none
            && self.float == other.float
            && self.position == other.position
            && self.content == other.content
            && self.inherited == other.inherited
            && self.opacity.to_bits() == other.opacity.to_bits()
            && self.column_count == other.column_count
            && self.column_span_all == other.column_span_all
            && self.callback_selectors == other.callback_selectors
            && self.pseudo_bits == other.pseudo_bits
            && self.affected_by_empty == other.affected_by_empty
            && self.empty_state == other.empty_state
            && self.has_explicitly_inherited == other.has_explicitly_inherited
            && self.animation_flags == other.animation_flags
    }
}

impl ComputedStyle {
    /// [§ 7.1 Initial Values](https://www.w3.org/TR/css-cascade-4/#initial-values)
    ///
    /// Style of the layout view: initial values, block display.
    #[must_use]
    pub fn for_document() -> Self {
        ComputedStyle {
            display: DisplayValue::block(),
            ..Self::default()
        }
    }

    /// [§ 7.2 Inheritance](https://www.w3.org/TR/css-cascade-4/#inheriting)
    ///
    /// "Inherited properties ... take the computed value of the parent";
    /// everything else starts from its initial value.
    #[must_use]
    pub fn inherit_from(parent: Option<&ComputedStyle>, style_type: PseudoId) -> Self {
        ComputedStyle {
            style_type,
            inherited: parent.map(|p| p.inherited.clone()).unwrap_or_default(),
            ..Self::default()
        }
    }

    /// True for `display: none`.
    #[must_use]
    pub const fn is_display_none(&self) -> bool {
        self.display_none
    }

    /// True for floated boxes.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        self.float != Float::None
    }

    /// True for absolutely or fixed positioned boxes.
    #[must_use]
    pub const fn is_out_of_flow_positioned(&self) -> bool {
        self.position.is_out_of_flow()
    }

    /// True for `display: flex` and `display: grid` containers.
    #[must_use]
    pub fn is_flex_or_grid(&self) -> bool {
        !self.display_none
            && matches!(
                self.display.inner,
                InnerDisplayType::Flex | InnerDisplayType::Grid
            )
    }

    /// [§ 3 The Multi-column Model](https://www.w3.org/TR/css-multicol-1/#the-multi-column-model)
    ///
    /// A `column-count` above one establishes a multi-column container.
    #[must_use]
    pub fn specifies_columns(&self) -> bool {
        self.column_count.is_some_and(|count| count > 1)
    }

    /// True if rules for `pseudo` matched this element.
    #[must_use]
    pub const fn has_pseudo_style(&self, pseudo: PseudoId) -> bool {
        self.pseudo_bits.contains(PseudoBits::for_pseudo(pseudo))
    }

    /// Records that rules for `pseudo` matched this element.
    pub fn set_has_pseudo_style(&mut self, pseudo: PseudoId) {
        self.pseudo_bits.insert(PseudoBits::for_pseudo(pseudo));
    }

    /// True if any public pseudo-element has matching rules.
    #[must_use]
    pub const fn has_any_pseudo_style(&self) -> bool {
        !self.pseudo_bits.is_empty()
    }

    /// Child-dependent flags force a revisit when children change.
    #[must_use]
    pub const fn has_child_dependent_flags(&self) -> bool {
        self.empty_state || self.has_explicitly_inherited
    }

    /// Carries child-dependent flags over from the previous style.
    pub fn copy_child_dependent_flags_from(&mut self, other: &ComputedStyle) {
        self.empty_state = other.empty_state;
        self.has_explicitly_inherited = other.has_explicitly_inherited;
    }

    /// `self` with `other`'s child-dependent flags, keeping the pseudo
    /// styles cached on `self` even when it has to be copied.
    #[must_use]
    pub fn with_child_dependent_flags_from(self: Rc<Self>, other: &ComputedStyle) -> Rc<Self> {
        let cached = self.cached_pseudo_styles();
        let mut style = Rc::unwrap_or_clone(self);
        style.copy_child_dependent_flags_from(other);
        for pseudo_style in cached {
            let _ = style.add_cached_pseudo_style(pseudo_style);
        }
        Rc::new(style)
    }

    /// True if independent inherited properties match.
    #[must_use]
    pub fn independent_inherited_equal(&self, other: &ComputedStyle) -> bool {
        self.inherited.visibility == other.inherited.visibility
    }

    /// True if inherited properties other than the independent ones match.
    #[must_use]
    pub fn non_independent_inherited_equal(&self, other: &ComputedStyle) -> bool {
        self.inherited.color == other.inherited.color
            && self.inherited.font_size.to_bits() == other.inherited.font_size.to_bits()
            && self.inherited.text_transform == other.inherited.text_transform
    }

    /// True if every inherited property matches.
    #[must_use]
    pub fn inherited_equal(&self, other: &ComputedStyle) -> bool {
        self.independent_inherited_equal(other) && self.non_independent_inherited_equal(other)
    }

    /// Copies the independent inherited properties from `parent`.
    pub fn propagate_independent_inherited_properties(&mut self, parent: &ComputedStyle) {
        self.inherited.visibility = parent.inherited.visibility;
    }

    /// The cached style for `pseudo`, if one has been resolved.
    #[must_use]
    pub fn cached_pseudo_style(&self, pseudo: PseudoId) -> Option<Rc<ComputedStyle>> {
        self.cached_pseudo_styles
            .0
            .borrow()
            .iter()
            .find(|style| style.style_type == pseudo)
            .cloned()
    }

    /// Caches `style` under its own style type and returns the cached entry,
    /// which is the existing one if the id was already cached.
    pub fn add_cached_pseudo_style(&self, style: Rc<ComputedStyle>) -> Rc<ComputedStyle> {
        if let Some(existing) = self.cached_pseudo_style(style.style_type) {
            return existing;
        }
        self.cached_pseudo_styles.0.borrow_mut().push(Rc::clone(&style));
        style
    }

    /// Drops the cached style for `pseudo`.
    pub fn remove_cached_pseudo_style(&self, pseudo: PseudoId) {
        self.cached_pseudo_styles
            .0
            .borrow_mut()
            .retain(|style| style.style_type != pseudo);
    }

    /// Snapshot of every cached pseudo style.
    #[must_use]
    pub fn cached_pseudo_styles(&self) -> Vec<Rc<ComputedStyle>> {
        self.cached_pseudo_styles.0.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_drops_pseudo_cache() {
        let style = ComputedStyle::default();
        let before = Rc::new(ComputedStyle::inherit_from(Some(&style), PseudoId::Before));
        let _ = style.add_cached_pseudo_style(before);
        assert!(style.cached_pseudo_style(PseudoId::Before).is_some());

        let copy = style.clone();
        assert!(copy.cached_pseudo_style(PseudoId::Before).is_none());
        assert_eq!(copy, style);
    }

    #[test]
    fn test_child_dependent_flags_keep_pseudo_cache_of_shared_style() {
        let mut old = ComputedStyle::default();
        old.empty_state = true;
        let new = Rc::new(ComputedStyle::default());
        let _ = new.add_cached_pseudo_style(Rc::new(ComputedStyle::inherit_from(
            None,
            PseudoId::Before,
        )));
        let shared = Rc::clone(&new);

        let updated = new.with_child_dependent_flags_from(&old);
        assert!(updated.empty_state);
        assert!(updated.cached_pseudo_style(PseudoId::Before).is_some());
        assert!(!shared.empty_state);
    }

    #[test]
    fn test_pseudo_cache_is_append_only_per_id() {
        let style = ComputedStyle::default();
        let first = Rc::new(ComputedStyle::inherit_from(None, PseudoId::After));
        let mut second = ComputedStyle::inherit_from(None, PseudoId::After);
        second.content = Some("x".to_string());

        let kept = style.add_cached_pseudo_style(Rc::clone(&first));
        let ignored = style.add_cached_pseudo_style(Rc::new(second));
        assert!(Rc::ptr_eq(&kept, &first));
        assert!(Rc::ptr_eq(&ignored, &first));

        style.remove_cached_pseudo_style(PseudoId::After);
        assert!(style.cached_pseudo_styles().is_empty());
    }

    #[test]
    fn test_inherit_from_copies_only_inherited() {
        let mut parent = ComputedStyle::for_document();
        parent.inherited.color = "red".to_string();
        parent.opacity = 0.5;
        let child = ComputedStyle::inherit_from(Some(&parent), PseudoId::NoPseudo);
        assert_eq!(child.inherited.color, "red");
        assert!((child.opacity - 1.0).abs() < f32::EPSILON);
    }
}
