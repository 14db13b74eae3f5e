//! Style invalidation, style recalc and layout tree attachment for lumen.
//!
//! # Scope
//!
//! This crate implements:
//! - **Style recalc** ([CSS Cascading Level 4 § 4.4](https://www.w3.org/TR/css-cascade-4/#computed))
//!   - Dirty-bit driven top-down recalc over the flat tree
//!   - Change propagation (independent inherit, inherit, force, reattach)
//!   - Pseudo-element style caching on the host
//!
//! - **Layout tree attachment** ([CSS 2.2 § 9.2](https://www.w3.org/TR/CSS2/visuren.html#box-gen))
//!   - Attach, detach and reattach of elements and text
//!   - Sibling placement across pseudo-elements, shadow trees and the top layer
//!   - Multi-column flow threads, column spanners and fullscreen wrappers
//!
//! - **Pseudo-elements** ([CSS Pseudo-Elements Level 4](https://www.w3.org/TR/css-pseudo-4/))
//!   - `::before`, `::after`, `::backdrop` and `::first-letter` lifecycle
//!   - First-letter extent and text fragment splitting
//!
//! - **Animations** ([Web Animations](https://www.w3.org/TR/web-animations-1/))
//!   - Base style reuse during animation-only recalcs
//!   - Per property group animation flags on computed styles
//!
//! - **Callback selectors**
//!   - Debounced reporting of which watched selectors started or stopped
//!     matching
//!
//! # Not Yet Implemented
//!
//! - Stylesheet parsing (rules are added programmatically)
//! - Complex selectors with combinators
//! - Geometry: layout objects are built and flagged, never laid out

/// Animation bookkeeping per element per [Web Animations](https://www.w3.org/TR/web-animations-1/).
pub mod animation;
/// The document: DOM, layout tree, style data and their invalidation entry points.
pub mod document;
/// `::first-letter` extent and text splitting per [CSS Pseudo-Elements Level 4 § 2.2](https://www.w3.org/TR/css-pseudo-4/#first-letter-pseudo).
pub mod first_letter;
/// Layout tree and its construction per [CSS 2.2 § 9](https://www.w3.org/TR/CSS2/visuren.html).
pub mod layout;
/// Pseudo-element lifecycle per [CSS Pseudo-Elements Level 4](https://www.w3.org/TR/css-pseudo-4/).
pub mod pseudo;
mod recalc;
/// Style resolution per [CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/).
pub mod resolver;
/// Compound selector parsing and matching per [Selectors Level 4](https://www.w3.org/TR/selectors-4/).
pub mod selector;
/// Debounced callback selector reporting.
pub mod selector_watch;
/// Computed style representation per [CSS Cascading Level 4](https://www.w3.org/TR/css-cascade-4/).
pub mod style;

// Re-exports for convenience
pub use animation::{Animation, AnimationPhase, CssProperty, ElementAnimations, PropertyGroup};
pub use document::{Document, LifecycleState, StyleEngineStats};
pub use first_letter::first_letter_length;
pub use layout::{LayoutFlags, LayoutId, LayoutObjectKind, LayoutSnapshot, LayoutTree};
pub use pseudo::pseudo_element_layout_object_is_needed;
pub use resolver::{DeclaredStyleResolver, ElementStyleRequest, StyleResolver};
pub use selector::{ParsedSelector, Specificity, parse_selector};
pub use selector_watch::{
    CssSelectorWatch, ManualTimer, OneShotTimer, SelectorMatchBatch, SelectorMatchClient,
};
pub use style::{
    AnimationFlags, ComputedStyle, DisplayValue, StyleDeclaration, StyleRecalcChange,
};
