//! Keyword-valued properties the style engine inspects.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// [§ 9.5.1 'float'](https://www.w3.org/TR/CSS2/visuren.html#float-position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Float {
    /// "The box is not floated."
    #[default]
    None,
    /// "The element generates a block box that is floated to the left."
    Left,
    /// "Similar to 'left', except the box is floated to the right."
    Right,
}

/// [§ 2 'position'](https://www.w3.org/TR/css-position-3/#position-property)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Position {
    /// "The box is not a positioned box."
    #[default]
    Static,
    /// Offset relative to its in-flow position.
    Relative,
    /// Taken out of flow and positioned against its containing block.
    Absolute,
    /// Like absolute, but against the viewport.
    Fixed,
    /// Relative until a scroll threshold, then fixed.
    Sticky,
}

impl Position {
    /// [§ 3 Absolute positioning](https://www.w3.org/TR/css-position-3/#absolute-positioning-layout)
    ///
    /// True for positions that take the box out of flow.
    #[must_use]
    pub const fn is_out_of_flow(self) -> bool {
        matches!(self, Self::Absolute | Self::Fixed)
    }
}

/// [§ 2.1 'text-transform'](https://www.w3.org/TR/css-text-3/#text-transform-property)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TextTransform {
    /// No effects.
    #[default]
    None,
    /// "Puts the first typographic letter unit of each word ... in titlecase."
    Capitalize,
    /// "Puts all letters in uppercase."
    Uppercase,
    /// "Puts all letters in lowercase."
    Lowercase,
}

/// [§ 11.2 'visibility'](https://www.w3.org/TR/CSS2/visufx.html#visibility)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Visibility {
    /// "The generated box is visible."
    #[default]
    Visible,
    /// "The generated box is invisible (fully transparent, nothing is drawn),
    /// but still affects layout."
    Hidden,
    /// Hidden, and collapsed for table rows and columns.
    Collapse,
}

/// [§ 6 'column-span'](https://www.w3.org/TR/css-multicol-1/#column-span)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnSpan {
    /// "The element does not span multiple columns."
    #[default]
    None,
    /// "The element spans across all columns of the nearest multicol ancestor."
    All,
}
