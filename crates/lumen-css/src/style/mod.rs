//! CSS Computed Style representation
//!
//! This module implements the style values the recalc engine works with, per:
//! - [CSS Cascading and Inheritance Level 4](https://www.w3.org/TR/css-cascade-4/)
//! - [CSS Display Module Level 3](https://www.w3.org/TR/css-display-3/)
//! - [CSS Pseudo-Elements Level 4](https://www.w3.org/TR/css-pseudo-4/)

pub mod computed;
pub mod declaration;
mod display;
mod recalc_change;
mod values;

// Re-export all public types
pub use computed::{
    AnimationFlags, ComputedStyle, DEFAULT_FONT_SIZE_PX, InheritedProperties, PseudoBits,
};
pub use declaration::StyleDeclaration;
pub use display::{
    DisplayKeyword, DisplayValue, InnerDisplayType, OuterDisplayType, default_display_for_element,
};
pub use recalc_change::{StyleRecalcChange, style_propagation_diff};
pub use values::{ColumnSpan, Float, Position, TextTransform, Visibility};
