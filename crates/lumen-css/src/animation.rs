//! Element animations and the animation flag projector.
//!
//! [Web Animations Level 1](https://www.w3.org/TR/web-animations-1/)
//!
//! Animations themselves are driven elsewhere; this module only tracks which
//! animations target an element, which phase they are in and whether the
//! compositor runs them, and projects that onto [`AnimationFlags`] on the
//! element's computed style.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::style::{AnimationFlags, ComputedStyle};

/// CSS properties an animation can target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CssProperty {
    /// `opacity`
    Opacity,
    /// `transform`
    Transform,
    /// `rotate`
    Rotate,
    /// `scale`
    Scale,
    /// `translate`
    Translate,
    /// `filter`
    Filter,
    /// `color`
    Color,
    /// `background-color`
    BackgroundColor,
    /// `width`
    Width,
    /// `height`
    Height,
}

/// Property groups the compositor can animate on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PropertyGroup {
    /// `opacity`
    Opacity,
    /// `transform` and the individual transform properties.
    Transform,
    /// `filter`
    Filter,
}

impl PropertyGroup {
    /// Members of the group.
    #[must_use]
    pub const fn properties(self) -> &'static [CssProperty] {
        match self {
            Self::Opacity => &[CssProperty::Opacity],
            Self::Transform => &[
                CssProperty::Transform,
                CssProperty::Rotate,
                CssProperty::Scale,
                CssProperty::Translate,
            ],
            Self::Filter => &[CssProperty::Filter],
        }
    }

    const fn current_flag(self) -> AnimationFlags {
        match self {
            Self::Opacity => AnimationFlags::HAS_CURRENT_OPACITY_ANIMATION,
            Self::Transform => AnimationFlags::HAS_CURRENT_TRANSFORM_ANIMATION,
            Self::Filter => AnimationFlags::HAS_CURRENT_FILTER_ANIMATION,
        }
    }

    const fn compositor_flag(self) -> AnimationFlags {
        match self {
            Self::Opacity => AnimationFlags::RUNNING_OPACITY_ON_COMPOSITOR,
            Self::Transform => AnimationFlags::RUNNING_TRANSFORM_ON_COMPOSITOR,
            Self::Filter => AnimationFlags::RUNNING_FILTER_ON_COMPOSITOR,
        }
    }
}

const GROUPS: [PropertyGroup; 3] = [
    PropertyGroup::Opacity,
    PropertyGroup::Transform,
    PropertyGroup::Filter,
];

impl CssProperty {
    /// The compositor property group this property belongs to.
    #[must_use]
    pub const fn group(self) -> Option<PropertyGroup> {
        match self {
            Self::Opacity => Some(PropertyGroup::Opacity),
            Self::Transform | Self::Rotate | Self::Scale | Self::Translate => {
                Some(PropertyGroup::Transform)
            }
            Self::Filter => Some(PropertyGroup::Filter),
            Self::Color | Self::BackgroundColor | Self::Width | Self::Height => None,
        }
    }
}

/// [§ 4.5.3 Animation effect phases](https://www.w3.org/TR/web-animations-1/#animation-effect-phases-and-states)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AnimationPhase {
    /// No timeline time; the animation does nothing.
    #[default]
    Idle,
    /// Before the active interval.
    Before,
    /// Inside the active interval.
    Active,
    /// After the active interval.
    After,
}

/// Where an animation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationOrigin {
    /// Declared through `animation-name`; cancelled when the element loses
    /// its box.
    Css,
    /// Created through `Element.animate()`.
    Script,
}

/// One animation targeting an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    /// Animation name, for diagnostics.
    pub name: String,
    /// Where the animation came from.
    pub origin: AnimationOrigin,
    /// Properties the keyframes touch.
    pub properties: Vec<CssProperty>,
    /// Current phase.
    pub phase: AnimationPhase,
    /// The compositor is running this animation.
    pub running_on_compositor: bool,
}

impl Animation {
    /// A CSS animation in the idle phase.
    #[must_use]
    pub fn css(name: &str, properties: &[CssProperty]) -> Self {
        Animation {
            name: name.to_string(),
            origin: AnimationOrigin::Css,
            properties: properties.to_vec(),
            phase: AnimationPhase::Idle,
            running_on_compositor: false,
        }
    }

    /// A script animation in the idle phase.
    #[must_use]
    pub fn script(name: &str, properties: &[CssProperty]) -> Self {
        Animation {
            origin: AnimationOrigin::Script,
            ..Self::css(name, properties)
        }
    }

    /// [§ 4.5.4 Relevant animations](https://www.w3.org/TR/web-animations-1/#current)
    ///
    /// "An animation effect is current if ... the animation effect is in the
    /// active phase"
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.phase == AnimationPhase::Active
    }

    /// True if the animation touches any property of `group`.
    #[must_use]
    pub fn affects(&self, group: PropertyGroup) -> bool {
        self.properties.iter().any(|p| p.group() == Some(group))
    }
}

/// [§ 5.4.2 The effect stack](https://www.w3.org/TR/web-animations-1/#the-effect-stack)
///
/// Answers compositor questions about the effects applied to one element.
pub trait EffectStack {
    /// True if some current animation of `property` runs on the compositor.
    fn has_active_animations_on_compositor(&self, property: CssProperty) -> bool;
}

/// Animation bookkeeping for one element.
///
/// While an animation style change is pending, the pre-animation style of the
/// last recalc (the *base* style) is kept so the next recalc can skip the
/// cascade and only reapply animation effects.
#[derive(Debug, Clone, Default)]
pub struct ElementAnimations {
    animations: Vec<Animation>,
    animation_style_change: bool,
    base_computed_style: Option<Rc<ComputedStyle>>,
}

impl ElementAnimations {
    /// Bookkeeping with no animations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All animations in creation order.
    #[must_use]
    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    /// Adds an animation and returns its index.
    pub fn add_animation(&mut self, animation: Animation) -> usize {
        self.animations.push(animation);
        self.animations.len() - 1
    }

    /// The animation at `index`.
    pub fn animation_mut(&mut self, index: usize) -> Option<&mut Animation> {
        self.animations.get_mut(index)
    }

    /// True if the pending style change came from animations alone.
    #[must_use]
    pub const fn is_animation_style_change(&self) -> bool {
        self.animation_style_change
    }

    /// Marks or clears an animation-only style change.
    pub const fn set_animation_style_change(&mut self, animation_style_change: bool) {
        self.animation_style_change = animation_style_change;
    }

    /// The reusable base style. Only available during an animation style
    /// change.
    #[must_use]
    pub fn base_computed_style(&self) -> Option<&Rc<ComputedStyle>> {
        if !self.animation_style_change {
            return None;
        }
        self.base_computed_style.as_ref()
    }

    /// Records the base style of the current recalc.
    ///
    /// Outside an animation style change the stored base is dropped. A base
    /// style that is replaced while reused must be identical to the old one.
    pub fn update_base_computed_style(&mut self, style: &Rc<ComputedStyle>) {
        if !self.animation_style_change {
            self.base_computed_style = None;
            return;
        }
        if let Some(base) = &self.base_computed_style {
            debug_assert!(
                **base == **style,
                "resolver produced a different base style during an animation style change"
            );
        }
        self.base_computed_style = Some(Rc::clone(style));
    }

    /// Drops the stored base style.
    pub fn clear_base_computed_style(&mut self) {
        self.base_computed_style = None;
    }

    /// [CSS Animations § 3](https://www.w3.org/TR/css-animations-1/#animations)
    ///
    /// "Setting the display property to none will terminate any running
    /// animation applied to the element and its descendants."
    pub fn cancel_css_animations(&mut self) {
        for animation in &mut self.animations {
            if animation.origin == AnimationOrigin::Css {
                animation.phase = AnimationPhase::Idle;
                animation.running_on_compositor = false;
            }
        }
    }

    /// Pulls compositor animations back to the main thread so they start
    /// again once the element has a new box.
    pub fn restart_animations_on_compositor(&mut self) {
        for animation in &mut self.animations {
            animation.running_on_compositor = false;
        }
    }

    /// Projects the current animations onto `style`'s animation flags.
    ///
    /// The compositor is only consulted for groups that have a current
    /// animation at all.
    pub fn update_animation_flags(&self, style: &mut ComputedStyle) {
        let mut flags = AnimationFlags::empty();
        for animation in self.animations.iter().filter(|a| a.is_current()) {
            for group in GROUPS {
                if animation.affects(group) {
                    flags.insert(group.current_flag());
                }
            }
        }

        for group in GROUPS {
            if flags.contains(group.current_flag())
                && group
                    .properties()
                    .iter()
                    .any(|&p| self.has_active_animations_on_compositor(p))
            {
                flags.insert(group.compositor_flag());
            }
        }
        style.animation_flags = flags;
    }
}

impl EffectStack for ElementAnimations {
    fn has_active_animations_on_compositor(&self, property: CssProperty) -> bool {
        self.animations.iter().any(|a| {
            a.is_current() && a.running_on_compositor && a.properties.contains(&property)
        })
    }
}
